//! rcon-cli entry point.
//!
//! ```text
//! rcon-cli exec <COMMAND...>       Run an admin command, print the reply
//! rcon-cli players                 List online players
//! rcon-cli resolve <PLATFORM_ID>   Print a player's connection index
//! rcon-cli kills                   Follow the kill feed until Ctrl-C
//! rcon-cli --config <path>         Load a custom config TOML
//! rcon-cli --gen-config            Write default config to stdout
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::Ordering;

use clap::{CommandFactory, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rcon_cli::config::{CliConfig, LoggingConfig};
use rcon_core::{EventRegistry, KillEvent, KillMonitor, RconClient};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rcon-cli", version, about = "RCON console for Conan Exiles servers")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "rcon-cli.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a raw admin command.
    Exec {
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// List online players.
    Players,
    /// Look up the current connection index of a player.
    Resolve { platform_id: String },
    /// Print kills from the server log as they happen.
    Kills,
}

// ── Logging ──────────────────────────────────────────────────────

fn init_tracing(logging: &LoggingConfig) -> std::io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.file.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&logging.file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&CliConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let (mut config, loaded) = CliConfig::load(&cli.config);
    let overrides = config.apply_env();
    init_tracing(&config.logging)?;
    for notice in loaded.iter().chain(&overrides) {
        if notice.is_warning() {
            warn!("{notice}");
        } else {
            info!("{notice}");
        }
    }
    config.validate()?;

    info!("rcon-cli v{}", env!("CARGO_PKG_VERSION"));
    info!("server: {}:{}", config.server.host, config.server.port);

    let client = RconClient::new(config.to_settings(), config.to_policy());

    match command {
        Command::Exec { command } => {
            let reply = client.execute(&command.join(" ")).await?;
            println!("{reply}");
        }
        Command::Players => {
            let players = client.online_players().await;
            if players.is_empty() {
                println!("no players online (or the server could not be reached)");
            }
            for player in &players {
                println!("{player}");
            }
        }
        Command::Resolve { platform_id } => {
            match client.resolve_connection_index(&platform_id).await? {
                Some(index) => println!("{index}"),
                None => println!("{platform_id} is not connected"),
            }
        }
        Command::Kills => {
            let mut registry = EventRegistry::new();
            registry.on_event(|kill: &KillEvent| {
                println!("{}  {} killed {}", kill.timestamp, kill.killer, kill.victim);
                Ok(())
            });

            let mut monitor = KillMonitor::new(client.clone(), registry)
                .with_intervals(config.poll_interval(), config.error_backoff());
            let stop = monitor.stop_handle();

            // Ctrl-C handler.
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Ctrl-C received, stopping kill monitor");
                stop.store(false, Ordering::SeqCst);
            });

            monitor.run().await?;
        }
    }

    client.close().await;
    Ok(())
}

//! `RconClient`: the surface other features build on.
//!
//! Cloning is cheap and every clone shares the same authenticated session.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::RconError;
use crate::executor::{CommandExecutor, RetryPolicy};
use crate::network::{ConnectionManager, Connector, RconSettings, TcpConnector};
use crate::players::{self, PlayerRecord, PlayerStatus};

/// Reply fragment when a `con <idx>` target has left the server.
const PLAYER_GONE: &str = "Couldn't find a valid player";
const REJECTED_MARKERS: [&str; 2] = ["Unknown command", "Couldn't find the command"];

pub struct RconClient<C: Connector = TcpConnector> {
    executor: Arc<CommandExecutor<C>>,
    inventory: Arc<Mutex<()>>,
}

impl<C: Connector> Clone for RconClient<C> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            inventory: Arc::clone(&self.inventory),
        }
    }
}

impl RconClient<TcpConnector> {
    pub fn new(settings: RconSettings, policy: RetryPolicy) -> Self {
        Self::with_connector(TcpConnector, settings, policy)
    }
}

impl<C: Connector> RconClient<C> {
    pub fn with_connector(connector: C, settings: RconSettings, policy: RetryPolicy) -> Self {
        Self {
            executor: Arc::new(CommandExecutor::new(
                ConnectionManager::new(connector, settings),
                policy,
            )),
            inventory: Arc::new(Mutex::new(())),
        }
    }

    pub fn executor(&self) -> &CommandExecutor<C> {
        &self.executor
    }

    /// Run a raw admin command and return the server's reply.
    pub async fn execute(&self, command: &str) -> Result<String, RconError> {
        self.executor.execute(command).await
    }

    pub async fn execute_with_attempts(
        &self,
        command: &str,
        max_attempts: u32,
    ) -> Result<String, RconError> {
        self.executor
            .execute_with_attempts(command, max_attempts)
            .await
    }

    /// Players currently online. Empty when the server cannot be reached.
    pub async fn online_players(&self) -> Vec<PlayerRecord> {
        players::fetch_online_players(&*self.executor).await
    }

    /// Current connection index for `platform_id`, looked up fresh.
    pub async fn resolve_connection_index(
        &self,
        platform_id: &str,
    ) -> Result<Option<String>, RconError> {
        players::resolve_connection_index(&*self.executor, platform_id).await
    }

    pub async fn player_status(&self, platform_id: &str) -> PlayerStatus {
        match self.resolve_connection_index(platform_id).await {
            Ok(Some(_)) => PlayerStatus::Online,
            Ok(None) => PlayerStatus::Offline,
            Err(e) => {
                warn!(platform_id, error = %e, "could not determine player status");
                PlayerStatus::Unknown
            }
        }
    }

    /// Run `con <idx> <subcommand>` against the player's current session.
    ///
    /// The index is resolved immediately before the command. A player who
    /// is not listed, or who left in between, is `PlayerNotConnected`.
    pub async fn execute_for_player(
        &self,
        platform_id: &str,
        subcommand: &str,
    ) -> Result<String, RconError> {
        let Some(index) = self.resolve_connection_index(platform_id).await? else {
            return Err(RconError::PlayerNotConnected(platform_id.to_string()));
        };

        let command = format!("con {index} {subcommand}");
        let response = self.executor.execute(&command).await?;
        if response.contains(PLAYER_GONE) {
            return Err(RconError::PlayerNotConnected(platform_id.to_string()));
        }
        if REJECTED_MARKERS.iter().any(|m| response.contains(m)) {
            return Err(RconError::Rejected { command, response });
        }
        Ok(response)
    }

    /// Spawn `count` of `template_id` into the player's inventory.
    ///
    /// Only one inventory operation runs at a time; a concurrent call fails
    /// with `InventoryBusy` instead of queueing. A spawn whose reply was lost
    /// is retried, so the item can be delivered more than once.
    pub async fn spawn_item(
        &self,
        platform_id: &str,
        template_id: u32,
        count: u32,
    ) -> Result<String, RconError> {
        let _guard = self
            .inventory
            .try_lock()
            .map_err(|_| RconError::InventoryBusy)?;

        let response = self
            .execute_for_player(platform_id, &format!("spawnitem {template_id} {count}"))
            .await?;
        info!(platform_id, template_id, count, "item spawned");
        Ok(response)
    }

    pub async fn close(&self) {
        self.executor.close().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use super::*;
    use crate::testing::{FakeConnector, Reply, test_settings};

    const TABLE: &str = "Idx | Char name | Player name | User ID | Platform ID | Platform Name\n\
         3 | Conan123 | SteamUser | FG-1 | 76561198000000001 | Steam\n";

    fn client(connector: FakeConnector) -> RconClient<FakeConnector> {
        RconClient::with_connector(
            connector,
            test_settings(),
            RetryPolicy {
                max_attempts: 2,
                retry_delay: Duration::ZERO,
                reset_delay: Duration::ZERO,
            },
        )
    }

    fn game_server(spawn_reply: &'static str) -> (FakeConnector, Arc<StdMutex<Vec<String>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let log = seen.clone();
        let connector = FakeConnector::new("secret", move |_conn, command| {
            log.lock().unwrap().push(command.to_string());
            if command == "ListPlayers" {
                Reply::Respond(TABLE.to_string())
            } else {
                Reply::Respond(spawn_reply.to_string())
            }
        });
        (connector, seen)
    }

    #[tokio::test]
    async fn targeted_command_uses_fresh_index() {
        let (connector, seen) = game_server("Spawned 1 item(s)");
        let client = client(connector);

        client
            .spawn_item("76561198000000001", 51020, 2)
            .await
            .unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            ["ListPlayers", "con 3 spawnitem 51020 2"]
        );
    }

    #[tokio::test]
    async fn unknown_player_is_not_connected() {
        let (connector, _) = game_server("ok");
        let client = client(connector);

        let result = client.execute_for_player("1234", "say hi").await;
        assert!(matches!(result, Err(RconError::PlayerNotConnected(id)) if id == "1234"));
        assert_eq!(client.player_status("1234").await, PlayerStatus::Offline);
        assert_eq!(
            client.player_status("76561198000000001").await,
            PlayerStatus::Online
        );
    }

    #[tokio::test]
    async fn player_leaving_between_resolve_and_use() {
        let (connector, _) = game_server("Couldn't find a valid player with index 3");
        let result = client(connector)
            .execute_for_player("76561198000000001", "say hi")
            .await;
        assert!(matches!(result, Err(RconError::PlayerNotConnected(_))));
    }

    #[tokio::test]
    async fn unknown_command_is_rejected() {
        let (connector, _) = game_server("Unknown command: spawnitem");
        let result = client(connector)
            .execute_for_player("76561198000000001", "spawnitem 1 1")
            .await;
        assert!(matches!(
            result,
            Err(RconError::Rejected { ref command, .. }) if command == "con 3 spawnitem 1 1"
        ));
    }

    #[tokio::test]
    async fn concurrent_inventory_operation_is_busy() {
        let (connector, _) = game_server("ok");
        let client = client(connector);

        let held = client.inventory.lock().await;
        assert!(matches!(
            client.spawn_item("76561198000000001", 1, 1).await,
            Err(RconError::InventoryBusy)
        ));
        drop(held);
        assert!(client.spawn_item("76561198000000001", 1, 1).await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_server_status_is_unknown() {
        let client = client(FakeConnector::new("secret", |_conn, _command| Reply::Drop));
        assert_eq!(
            client.player_status("76561198000000001").await,
            PlayerStatus::Unknown
        );
    }

    #[tokio::test]
    async fn clones_share_one_session() {
        let (connector, _) = game_server("ok");
        let connections = connector.connections();
        let client = client(connector);
        let other = client.clone();

        client.execute("version").await.unwrap();
        other.execute("version").await.unwrap();
        assert_eq!(connections.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}

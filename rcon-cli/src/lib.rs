//! # rcon-cli
//!
//! Command-line front end for `rcon-core`: run admin commands, list who is
//! online, resolve connection indexes and follow the kill feed.
//!
//! Settings come from a TOML file, overridden by `RCON_*` environment
//! variables.

pub mod config;

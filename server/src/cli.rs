//! Command-line definitions for the three binaries.
//!
//! All arguments are positional and argument errors exit with code 1, so
//! the binaries call `try_parse` and print these fixed usage lines
//! themselves instead of letting clap exit.

use std::path::PathBuf;

use clap::Parser;

use crate::client::PlayerOptions;
use crate::server::ServerOptions;

pub const SERVER_USAGE: &str = "Usage: austerity-server keyfile deckfile statfile timeout";
pub const PLAYER_USAGE: &str = "Usage: austerity-player keyfile port game pname";
pub const SCORES_USAGE: &str = "Usage: austerity-scores port";

#[derive(Parser, Debug, Clone)]
#[command(name = "austerity-server", about = "Austerity game server")]
pub struct ServerCli {
    pub keyfile: PathBuf,
    pub deckfile: PathBuf,
    pub statfile: PathBuf,
    /// Disconnect grace window in seconds; 0 disables reconnection.
    pub timeout: String,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "austerity-player", about = "Interactive Austerity player")]
pub struct PlayerCli {
    pub keyfile: PathBuf,
    pub port: String,
    /// Game to join, or the literal `reconnect`.
    pub game: String,
    /// Player name, or the reconnect id when reconnecting.
    pub name: String,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "austerity-scores", about = "Austerity scoreboard client")]
pub struct ScoresCli {
    pub port: String,
}

impl From<ServerCli> for ServerOptions {
    fn from(cli: ServerCli) -> Self {
        ServerOptions {
            keyfile: cli.keyfile,
            deckfile: cli.deckfile,
            statfile: cli.statfile,
            timeout: cli.timeout,
        }
    }
}

impl From<PlayerCli> for PlayerOptions {
    fn from(cli: PlayerCli) -> Self {
        PlayerOptions {
            keyfile: cli.keyfile,
            port: cli.port,
            game: cli.game,
            name: cli.name,
        }
    }
}

/// Quiet by default: the server's contract is one bound-ports line and
/// terminal diagnostics. `RUST_LOG` opens up the debug-level lifecycle
/// events. Log output goes to stderr so stdout stays protocol-clean.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

//! Server lifecycle: bind the statfile's ports, accept until signalled,
//! reload on SIGINT, drain games and exit on SIGTERM.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

use super::connection;
use super::state::ServerState;
use crate::config::{self, ConfigError, PortConfig};

/// A startup failure the binary maps straight to its exit code.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed listen")]
    Listen,
    #[error("System error")]
    System,
}

impl ServerError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ServerError::Config(ConfigError::Keyfile) => 2,
            ServerError::Config(ConfigError::Deckfile) => 3,
            ServerError::Config(ConfigError::Statfile) => 4,
            ServerError::Config(ConfigError::Timeout) => 5,
            ServerError::Listen => 6,
            ServerError::System => 10,
        }
    }
}

pub struct ServerOptions {
    pub keyfile: PathBuf,
    pub deckfile: PathBuf,
    pub statfile: PathBuf,
    pub timeout: String,
}

/// The whole server. Returns `Ok(())` only on a SIGTERM-initiated
/// shutdown, after every running game has been finalised and joined.
///
/// SIGINT tears the listeners down, reloads the statfile and listens
/// again without touching running games; a statfile that has gone bad in
/// the meantime is fatal, exactly like a bad one at startup.
pub async fn run(opts: ServerOptions) -> Result<(), ServerError> {
    let key = config::load_key(&opts.keyfile)?;
    let deck = config::load_deck(&opts.deckfile)?;
    let mut entries = config::load_statfile(&opts.statfile)?;
    let timeout = config::parse_timeout(&opts.timeout)?;

    let state = ServerState::new(key, deck, timeout);

    let mut sigint = signal(SignalKind::interrupt()).map_err(|_| ServerError::System)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(|_| ServerError::System)?;

    loop {
        let bound = bind_ports(&entries).await.map_err(|_| ServerError::Listen)?;
        announce_ports(&bound);
        let acceptors = spawn_acceptors(&state, bound);

        let terminate = tokio::select! {
            _ = sigint.recv() => false,
            _ = sigterm.recv() => true,
        };

        // aborting an acceptor drops its listener and closes the port
        for acceptor in &acceptors {
            acceptor.abort();
        }
        if terminate {
            break;
        }
        entries = config::load_statfile(&opts.statfile)?;
    }

    shutdown_games(&state).await;
    Ok(())
}

/// Bind every entry in statfile order. Ephemeral (0) entries get the
/// kernel's choice written back. All or nothing: the first failure drops
/// whatever was already bound and reports it.
pub async fn bind_ports(
    entries: &[PortConfig],
) -> io::Result<Vec<(TcpListener, PortConfig)>> {
    let mut bound = Vec::with_capacity(entries.len());
    for entry in entries {
        let listener = TcpListener::bind(("0.0.0.0", entry.port)).await?;
        let port = listener.local_addr()?.port();
        bound.push((listener, PortConfig { port, ..*entry }));
    }
    Ok(bound)
}

/// The bound-ports line: every actual port, space-separated, in file
/// order, on the diagnostic stream.
pub fn announce_ports(bound: &[(TcpListener, PortConfig)]) {
    let ports: Vec<String> = bound.iter().map(|(_, e)| e.port.to_string()).collect();
    eprintln!("{}", ports.join(" "));
}

/// One acceptor task per bound port; each accepted socket gets its own
/// short-lived handler task carrying the port's game config.
pub fn spawn_acceptors(
    state: &Arc<ServerState>,
    bound: Vec<(TcpListener, PortConfig)>,
) -> Vec<JoinHandle<()>> {
    bound
        .into_iter()
        .map(|(listener, entry)| {
            let state = state.clone();
            tokio::spawn(accept_loop(state, listener, entry))
        })
        .collect()
}

async fn accept_loop(state: Arc<ServerState>, listener: TcpListener, entry: PortConfig) {
    tracing::debug!(port = entry.port, "accepting connections");
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                spawn_handler(&state, stream, entry);
            }
            Err(err) => {
                tracing::debug!(port = entry.port, %err, "accept failed, closing port");
                return;
            }
        }
    }
}

fn spawn_handler(state: &Arc<ServerState>, stream: TcpStream, entry: PortConfig) {
    let state = state.clone();
    tokio::spawn(connection::handle_connection(state, stream, entry));
}

/// SIGTERM path: raise the shutdown flag, then join every game task;
/// each finalises its own game with `eog` on the way out.
pub async fn shutdown_games(state: &Arc<ServerState>) {
    state.begin_shutdown();
    for task in state.drain_tasks().await {
        let _ = task.await;
    }
}

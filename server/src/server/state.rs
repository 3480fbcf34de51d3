//! Shared server state: the key, the deck, and the tables every task
//! reaches through one `Arc`.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use austerity_shared::cards::Card;

use super::lobby::Lobby;
use super::reconnect::Rendezvous;
use crate::game::Game;

/// Everything the server knows, passed explicitly to every task.
pub struct ServerState {
    key: String,
    deck: Vec<Card>,
    timeout: u64,
    tables: Mutex<Tables>,
    shutdown: watch::Sender<bool>,
}

/// The game table and the lobby table, behind one mutex: the whole
/// lookup-or-create / join / fill-triggered-launch sequence is a single
/// critical section, so a lobby can never fill twice.
#[derive(Default)]
pub struct Tables {
    pub games: Vec<Arc<GameHandle>>,
    pub lobbies: Vec<Lobby>,
    pub tasks: Vec<JoinHandle<()>>,
}

/// One game as the rest of the server sees it. The turn-loop task owns
/// the sockets and is the only writer of the game state; everyone else
/// reads snapshots through the mutex or talks through the rendezvous.
pub struct GameHandle {
    pub name: String,
    /// 1-based ordinal among games sharing this name.
    pub counter: u32,
    pub initial_tokens: u32,
    pub player_count: usize,
    pub game: Mutex<Game>,
    pub rendezvous: Rendezvous,
}

impl ServerState {
    pub fn new(key: String, deck: Vec<Card>, timeout: u64) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(ServerState {
            key,
            deck,
            timeout,
            tables: Mutex::new(Tables::default()),
            shutdown,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn deck(&self) -> &[Card] {
        &self.deck
    }

    /// Disconnect grace window in seconds; zero means no grace.
    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn tables(&self) -> &Mutex<Tables> {
        &self.tables
    }

    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Flip the shutdown flag; every game task observes it at its next
    /// suspension point and finalises itself with `eog`.
    pub fn begin_shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Take every game task handle, for joining at shutdown.
    pub async fn drain_tasks(&self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut self.tables.lock().await.tasks)
    }

    /// An unfinished game with this exact name and counter, if any.
    pub async fn find_running_game(&self, name: &str, counter: u32) -> Option<Arc<GameHandle>> {
        let tables = self.tables.lock().await;
        for handle in &tables.games {
            if handle.name == name
                && handle.counter == counter
                && !handle.game.lock().await.finished
            {
                return Some(handle.clone());
            }
        }
        None
    }
}

impl GameHandle {
    pub fn new(name: String, counter: u32, initial_tokens: u32, game: Game) -> Self {
        GameHandle {
            name,
            counter,
            initial_tokens,
            player_count: game.state.players.len(),
            game: Mutex::new(game),
            rendezvous: Rendezvous::new(),
        }
    }
}

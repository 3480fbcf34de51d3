//! The per-game disconnect/rejoin rendezvous.
//!
//! When the turn loop hits EOF on a seat it publishes that seat as
//! pending and waits, bounded by the configured grace window. A handler
//! that authenticated a `reconnect` client waits for its claimed seat to
//! become pending, writes the catchup snapshot on its fresh socket, hands
//! the socket over, and wakes the game. Both directions are channels, so
//! nobody spins: a `watch` carries pending-seat/finished towards
//! handlers, and a `Notify` (whose stored permit survives a
//! signal-before-wait race) carries the delivery back.

use std::sync::Arc;

use tokio::sync::{watch, Mutex, Notify};
use tokio::time::{timeout_at, Duration, Instant};

use austerity_shared::messages::{ReconnectId, ServerMsg};

use super::net::PlayerConn;
use super::state::ServerState;

/// What reconnect handlers can observe about a game.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pending {
    /// The seat the turn loop is currently waiting on, if any.
    pub seat: Option<usize>,
    /// Mirrors the game's finished flag so waiters wake at the end.
    pub finished: bool,
}

pub struct Rendezvous {
    pending: watch::Sender<Pending>,
    delivered: Mutex<Option<PlayerConn>>,
    handoff: Notify,
}

pub enum WaitOutcome {
    /// The seat's replacement socket, catchup already written.
    Reconnected(PlayerConn),
    TimedOut,
    Shutdown,
}

impl Rendezvous {
    pub fn new() -> Self {
        let (pending, _) = watch::channel(Pending::default());
        Rendezvous {
            pending,
            delivered: Mutex::new(None),
            handoff: Notify::new(),
        }
    }

    pub fn watch(&self) -> watch::Receiver<Pending> {
        self.pending.subscribe()
    }

    /// Wake every waiting handler with the news that the game is over.
    pub fn publish_finished(&self) {
        self.pending.send_modify(|p| p.finished = true);
    }

    /// Handler side: store the replacement socket and wake the game.
    pub async fn deliver(&self, conn: PlayerConn) {
        *self.delivered.lock().await = Some(conn);
        self.handoff.notify_one();
    }

    /// Game side: publish `seat` as pending and wait for a delivery, the
    /// grace window running out, or server shutdown. The pending slot is
    /// cleared before returning either way, so a stale seat can never
    /// match a later attempt.
    pub async fn await_rejoin(
        &self,
        seat: usize,
        window_secs: u64,
        shutdown: &mut watch::Receiver<bool>,
    ) -> WaitOutcome {
        if window_secs == 0 {
            return WaitOutcome::TimedOut;
        }
        self.pending.send_modify(|p| p.seat = Some(seat));

        let deadline = Instant::now() + Duration::from_secs(window_secs);
        let outcome = loop {
            let woke = tokio::select! {
                _ = shutdown.wait_for(|stop| *stop) => None,
                woke = timeout_at(deadline, self.handoff.notified()) => Some(woke),
            };
            match woke {
                None => break WaitOutcome::Shutdown,
                Some(Err(_)) => break WaitOutcome::TimedOut,
                Some(Ok(())) => {
                    if let Some(conn) = self.delivered.lock().await.take() {
                        break WaitOutcome::Reconnected(conn);
                    }
                    // stale permit from an earlier wait; keep waiting
                }
            }
        };

        self.pending.send_modify(|p| p.seat = None);
        if !matches!(outcome, WaitOutcome::Reconnected(_)) {
            // a delivery that lost the race is an orphaned socket
            self.delivered.lock().await.take();
        }
        outcome
    }
}

impl Default for Rendezvous {
    fn default() -> Self {
        Self::new()
    }
}

/// Serve one authenticated `reconnect` client: read and check its rid,
/// wait for its seat to come up for grabs, send the catchup snapshot, and
/// hand the socket to the game task. Every rejection answers `no`; the
/// socket closes when `conn` drops.
pub async fn handle_rejoin(state: &Arc<ServerState>, mut conn: PlayerConn) {
    let Some(line) = conn.read_line().await else {
        return;
    };
    let rid = match line.strip_prefix("rid").map(ReconnectId::parse) {
        Some(Ok(rid)) => rid,
        _ => {
            conn.send(ServerMsg::No).await;
            return;
        }
    };

    let Some(handle) = state.find_running_game(&rid.name, rid.counter).await else {
        conn.send(ServerMsg::No).await;
        return;
    };
    if rid.seat >= handle.player_count {
        conn.send(ServerMsg::No).await;
        return;
    }

    let mut pending = handle.rendezvous.watch();
    let finished = pending
        .wait_for(|p| p.finished || p.seat == Some(rid.seat))
        .await
        .map(|view| view.finished)
        .unwrap_or(true);
    if finished {
        conn.send(ServerMsg::No).await;
        return;
    }

    conn.send(ServerMsg::Yes).await;
    conn.send(ServerMsg::PlayInfo {
        seat: rid.seat,
        players: handle.player_count,
    })
    .await;
    conn.send(ServerMsg::Tokens(handle.initial_tokens)).await;

    let (board, players) = {
        let game = handle.game.lock().await;
        (game.state.board.clone(), game.state.players.clone())
    };
    for card in board {
        conn.send(ServerMsg::NewCard(card)).await;
    }
    for (seat, player) in players.iter().enumerate() {
        conn.send(ServerMsg::PlayerUpdate {
            seat,
            score: player.score,
            discounts: player.discounts,
            wallet: player.wallet,
        })
        .await;
    }

    handle.rendezvous.deliver(conn).await;
    tracing::debug!(game = %rid.name, counter = rid.counter, seat = rid.seat, "seat reclaimed");
}

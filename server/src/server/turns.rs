//! The per-game task: preamble, the turn loop, and finalisation.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use austerity_shared::game::ActionError;
use austerity_shared::messages::{ActionMsg, ProtocolError, ReconnectId, ServerMsg};
use austerity_shared::BOARD_LIMIT;

use super::net::PlayerConn;
use super::reconnect::WaitOutcome;
use super::state::{GameHandle, ServerState};

/// How a game ends. `Shutdown` is SIGTERM: the game still broadcasts a
/// normal `eog`.
enum Outcome {
    Eog,
    Disco(usize),
    Invalid(usize),
    Shutdown,
}

/// One seat's move was rejected; either flavour costs a strike.
#[derive(Debug, Error)]
enum MoveError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Body of a game task, from the first byte sent to the sockets closing.
pub async fn run_game(state: Arc<ServerState>, handle: Arc<GameHandle>, mut conns: Vec<PlayerConn>) {
    for (seat, conn) in conns.iter_mut().enumerate() {
        conn.send(ServerMsg::Rid(ReconnectId {
            name: handle.name.clone(),
            counter: handle.counter,
            seat,
        }))
        .await;
        conn.send(ServerMsg::PlayInfo {
            seat,
            players: handle.player_count,
        })
        .await;
        conn.send(ServerMsg::Tokens(handle.initial_tokens)).await;
    }

    for _ in 0..BOARD_LIMIT {
        let revealed = handle.game.lock().await.reveal();
        match revealed {
            Some(card) => broadcast(&mut conns, &ServerMsg::NewCard(card)).await,
            None => break,
        }
    }

    let outcome = play(&state, &handle, &mut conns).await;
    finalise(&handle, &mut conns, outcome).await;
}

/// Seats take turns in order until someone ends the game. The win
/// threshold is checked between rounds so the round in progress always
/// completes; an emptied board ends the game at the end of that turn.
async fn play(
    state: &Arc<ServerState>,
    handle: &Arc<GameHandle>,
    conns: &mut Vec<PlayerConn>,
) -> Outcome {
    let mut shutdown = state.shutdown_rx();
    loop {
        if handle.game.lock().await.is_over() {
            return Outcome::Eog;
        }
        for seat in 0..handle.player_count {
            if let Err(ended) = take_turn(state, handle, conns, seat, &mut shutdown).await {
                return ended;
            }
            if handle.game.lock().await.state.board.is_empty() {
                return Outcome::Eog;
            }
        }
    }
}

/// Prompt one seat and settle its move. A first bad message earns a
/// re-prompt, a second consecutive one ends the game; EOF opens the
/// reconnect window and, on success, re-prompts the same seat over its
/// replacement socket.
async fn take_turn(
    state: &Arc<ServerState>,
    handle: &Arc<GameHandle>,
    conns: &mut Vec<PlayerConn>,
    seat: usize,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), Outcome> {
    let mut warned = false;
    loop {
        conns[seat].send(ServerMsg::DoWhat).await;
        let line = tokio::select! {
            _ = shutdown.wait_for(|stop| *stop) => return Err(Outcome::Shutdown),
            line = conns[seat].read_line() => line,
        };

        let Some(line) = line else {
            match handle
                .rendezvous
                .await_rejoin(seat, state.timeout(), shutdown)
                .await
            {
                WaitOutcome::Reconnected(conn) => {
                    conns[seat] = conn;
                    continue;
                }
                WaitOutcome::TimedOut => return Err(Outcome::Disco(seat)),
                WaitOutcome::Shutdown => return Err(Outcome::Shutdown),
            }
        };

        match settle_move(handle, seat, &line).await {
            Ok(announcements) => {
                for msg in &announcements {
                    broadcast(conns, msg).await;
                }
                return Ok(());
            }
            Err(err) if warned => {
                tracing::debug!(game = %handle.name, seat, %err, "second strike");
                return Err(Outcome::Invalid(seat));
            }
            Err(err) => {
                tracing::debug!(game = %handle.name, seat, %err, "bad move, re-prompting");
                warned = true;
            }
        }
    }
}

/// Parse, validate and apply one move under the game lock; on success
/// return the announcements to broadcast, public reveal included.
async fn settle_move(
    handle: &Arc<GameHandle>,
    seat: usize,
    line: &str,
) -> Result<Vec<ServerMsg>, MoveError> {
    let action = ActionMsg::parse(line)?;
    let mut game = handle.game.lock().await;
    match action {
        ActionMsg::Wild => {
            game.state.apply_wild(seat)?;
            Ok(vec![ServerMsg::Wild { seat }])
        }
        ActionMsg::Take(take) => {
            game.state.validate_take(&take)?;
            game.state.apply_take(seat, take)?;
            Ok(vec![ServerMsg::Took { seat, take }])
        }
        ActionMsg::Purchase { card, payment } => {
            game.state.validate_purchase(seat, card, &payment)?;
            game.state.apply_purchase(seat, card, &payment)?;
            let mut announcements = vec![ServerMsg::Purchased {
                seat,
                card,
                payment,
            }];
            if let Some(revealed) = game.reveal() {
                announcements.push(ServerMsg::NewCard(revealed));
            }
            Ok(announcements)
        }
    }
}

/// Exactly-once termination: mark the game finished, wake the
/// rendezvous, broadcast the terminal message, and close every socket by
/// dropping it.
async fn finalise(handle: &Arc<GameHandle>, conns: &mut Vec<PlayerConn>, outcome: Outcome) {
    handle.game.lock().await.finished = true;
    handle.rendezvous.publish_finished();

    let last_word = match outcome {
        Outcome::Eog | Outcome::Shutdown => ServerMsg::Eog,
        Outcome::Disco(seat) => ServerMsg::Disco { seat },
        Outcome::Invalid(seat) => ServerMsg::Invalid { seat },
    };
    broadcast(conns, &last_word).await;
    conns.clear();

    tracing::debug!(game = %handle.name, counter = handle.counter, "game finished");
}

async fn broadcast(conns: &mut [PlayerConn], msg: &ServerMsg) {
    for conn in conns.iter_mut() {
        conn.send(msg).await;
    }
}

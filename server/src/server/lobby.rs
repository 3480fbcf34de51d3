//! Named-lobby matchmaking.
//!
//! A lobby is an open registration slot keyed by game name. The first
//! joiner creates it with the config of the port they arrived on;
//! later joiners inherit that config whatever port they used, because the
//! name alone identifies the game. The lobby that fills becomes a game.

use std::sync::Arc;

use austerity_shared::player::PlayerState;

use super::net::PlayerConn;
use super::state::{GameHandle, ServerState, Tables};
use super::turns;
use crate::config::PortConfig;
use crate::game::Game;

pub struct Lobby {
    pub name: String,
    pub config: PortConfig,
    pub members: Vec<LobbyMember>,
}

/// A joined player waiting for the lobby to fill. Vec order is join
/// order, which breaks seating ties between equal names.
pub struct LobbyMember {
    pub name: String,
    pub conn: PlayerConn,
}

/// Put a freshly authenticated player into the open lobby for
/// `game_name`, creating it if there is none, and launch the game when
/// this join fills it. One lock covers the whole sequence.
pub async fn join_game(
    state: &Arc<ServerState>,
    config: PortConfig,
    game_name: String,
    player_name: String,
    conn: PlayerConn,
) {
    let mut tables = state.tables().lock().await;
    let slot = match tables.lobbies.iter().position(|l| l.name == game_name) {
        Some(slot) => slot,
        None => {
            tables.lobbies.push(Lobby {
                name: game_name,
                config,
                members: Vec::new(),
            });
            tables.lobbies.len() - 1
        }
    };

    tables.lobbies[slot].members.push(LobbyMember {
        name: player_name,
        conn,
    });

    if tables.lobbies[slot].members.len() == tables.lobbies[slot].config.players {
        let lobby = tables.lobbies.swap_remove(slot);
        launch(state, &mut tables, lobby);
    }
}

/// Turn a full lobby into a running game: seat players alphabetically
/// (stable, so equal names keep join order), count prior games with the
/// same name for the game counter, and spawn the turn-loop task.
fn launch(state: &Arc<ServerState>, tables: &mut Tables, lobby: Lobby) {
    let mut members = lobby.members;
    members.sort_by(|a, b| a.name.cmp(&b.name));

    let counter = 1 + tables
        .games
        .iter()
        .filter(|g| g.name == lobby.name)
        .count() as u32;

    let players = members
        .iter()
        .map(|m| PlayerState::new(m.name.clone()))
        .collect();
    let game = Game::new(
        players,
        state.deck().to_vec(),
        lobby.config.tokens,
        lobby.config.points,
    );
    let handle = Arc::new(GameHandle::new(
        lobby.name,
        counter,
        lobby.config.tokens,
        game,
    ));
    tables.games.push(handle.clone());

    tracing::debug!(
        game = %handle.name,
        counter = handle.counter,
        players = handle.player_count,
        "lobby full, game starting"
    );

    let conns = members.into_iter().map(|m| m.conn).collect();
    let task = tokio::spawn(turns::run_game(state.clone(), handle, conns));
    tables.tasks.push(task);
}

//! Per-socket authentication and dispatch.

use std::sync::Arc;

use tokio::net::TcpStream;

use austerity_shared::is_valid_name;
use austerity_shared::messages::{AuthRequest, ServerMsg};

use super::net::PlayerConn;
use super::state::ServerState;
use super::{lobby, reconnect, scores};
use crate::config::PortConfig;

/// Serve one accepted socket: read the auth line, answer `yes`/`no`, and
/// dispatch. A socket that joins or reclaims a seat is handed onwards and
/// stays open when this task exits; every other path drops (closes) it.
pub async fn handle_connection(state: Arc<ServerState>, stream: TcpStream, config: PortConfig) {
    let mut conn = PlayerConn::new(stream);
    let Some(line) = conn.read_line().await else {
        return;
    };

    match AuthRequest::parse(&line) {
        Some(AuthRequest::Play(key)) if key == state.key() => {
            conn.send(ServerMsg::Yes).await;
            join(state, conn, config).await;
        }
        Some(AuthRequest::Reconnect(key)) if key == state.key() => {
            conn.send(ServerMsg::Yes).await;
            reconnect::handle_rejoin(&state, conn).await;
        }
        Some(AuthRequest::Scores) => {
            conn.send(ServerMsg::Yes).await;
            scores::send_scores(&state, &mut conn).await;
        }
        _ => {
            conn.send(ServerMsg::No).await;
        }
    }
}

/// A `play` client follows its accepted auth with a game-name line and a
/// player-name line. Bad names or an early EOF just close the socket.
async fn join(state: Arc<ServerState>, mut conn: PlayerConn, config: PortConfig) {
    let Some(game_name) = conn.read_line().await else {
        return;
    };
    let Some(player_name) = conn.read_line().await else {
        return;
    };
    if !is_valid_name(&game_name) || !is_valid_name(&player_name) {
        return;
    }
    lobby::join_game(&state, config, game_name, player_name, conn).await;
}

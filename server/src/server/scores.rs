//! The lifetime scoreboard, served as CSV.

use std::sync::Arc;

use super::net::PlayerConn;
use super::state::ServerState;

const HEADER: &str = "Player Name,Total Tokens,Total Points";

struct ScoreRow {
    name: String,
    tokens: u32,
    points: u32,
}

/// Stream the scoreboard to one client: a header, then one line per
/// unique display name, points descending with token-count-ascending
/// tie-breaks (a leaner wallet ranks higher).
pub async fn send_scores(state: &Arc<ServerState>, conn: &mut PlayerConn) {
    conn.send(HEADER).await;
    for row in aggregate(state).await {
        conn.send(format!("{},{},{}", row.name, row.tokens, row.points))
            .await;
    }
}

/// Fold every seat of every game — live or finished — into per-name
/// totals of score and held tokens (wilds included).
async fn aggregate(state: &Arc<ServerState>) -> Vec<ScoreRow> {
    let mut rows: Vec<ScoreRow> = Vec::new();
    let tables = state.tables().lock().await;
    for handle in &tables.games {
        let game = handle.game.lock().await;
        for player in &game.state.players {
            match rows.iter_mut().find(|r| r.name == player.name) {
                Some(row) => {
                    row.tokens += player.wallet.total();
                    row.points += player.score;
                }
                None => rows.push(ScoreRow {
                    name: player.name.clone(),
                    tokens: player.wallet.total(),
                    points: player.score,
                }),
            }
        }
    }
    drop(tables);

    rows.sort_by(|a, b| b.points.cmp(&a.points).then(a.tokens.cmp(&b.tokens)));
    rows
}

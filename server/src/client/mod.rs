//! The interactive player client: connect and authenticate, mirror the
//! broadcast stream into a local table state, prompt the user whenever
//! the server says `dowhat`, and report how the game ended through the
//! process exit code.

pub mod display;
pub mod prompt;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use austerity_shared::cards::Colour;
use austerity_shared::game::GameState;
use austerity_shared::messages::{AuthRequest, ServerMsg};
use austerity_shared::player::PlayerState;
use austerity_shared::{is_valid_name, seat_letter, MAX_PLAYERS, MIN_PLAYERS};

use crate::config;
use prompt::Prompter;

/// Why the client stopped. The display strings are the stderr notices;
/// `Disconnect` and `Misbehave` print their notice when the terminal
/// message arrives, not at exit.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("Bad key file")]
    Keyfile,
    #[error("Bad name")]
    Name,
    #[error("Failed to connect")]
    Connect,
    #[error("Bad auth")]
    Auth,
    #[error("Bad reconnect id")]
    BadRid,
    #[error("Communication Error")]
    Comms,
    #[error("another player disconnected")]
    Disconnect,
    #[error("another player misbehaved")]
    Misbehave,
}

impl ClientError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::Keyfile => 2,
            ClientError::Name => 3,
            ClientError::Connect => 5,
            ClientError::Auth => 6,
            ClientError::BadRid => 7,
            ClientError::Comms => 8,
            ClientError::Disconnect => 9,
            ClientError::Misbehave => 10,
        }
    }

    /// True when the notice was already printed while handling the
    /// message that ended the game.
    pub fn already_reported(&self) -> bool {
        matches!(self, ClientError::Disconnect | ClientError::Misbehave)
    }
}

pub struct PlayerOptions {
    pub keyfile: PathBuf,
    pub port: String,
    /// A game name, or the literal `reconnect`.
    pub game: String,
    /// A player name, or (when reconnecting) the reconnect id.
    pub name: String,
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    async fn open(port: &str) -> Result<Self, ClientError> {
        let port: u16 = port.parse().map_err(|_| ClientError::Connect)?;
        let stream = TcpStream::connect(("127.0.0.1", port))
            .await
            .map_err(|_| ClientError::Connect)?;
        let (read_half, write_half) = stream.into_split();
        Ok(Connection {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// One line without its newline; a dropped server is a
    /// communication error.
    async fn read_line(&mut self) -> Result<String, ClientError> {
        let mut line = String::new();
        match self.reader.read_line(&mut line).await {
            Ok(0) | Err(_) => Err(ClientError::Comms),
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                }
                Ok(line)
            }
        }
    }

    /// Write failures surface as read failures soon enough.
    async fn send(&mut self, msg: impl fmt::Display) {
        let line = format!("{msg}\n");
        let _ = self.writer.write_all(line.as_bytes()).await;
    }
}

pub async fn run(opts: PlayerOptions) -> Result<(), ClientError> {
    let key = config::load_key(&opts.keyfile).map_err(|_| ClientError::Keyfile)?;

    let reconnecting = opts.game == "reconnect";
    if !is_valid_name(&opts.game) || (!reconnecting && !is_valid_name(&opts.name)) {
        return Err(ClientError::Name);
    }

    let mut conn = Connection::open(&opts.port).await?;

    let auth = if reconnecting {
        AuthRequest::Reconnect(key)
    } else {
        AuthRequest::Play(key)
    };
    conn.send(auth).await;
    if conn.read_line().await? != "yes" {
        return Err(ClientError::Auth);
    }

    if reconnecting {
        conn.send(format!("rid{}", opts.name)).await;
        if conn.read_line().await? != "yes" {
            return Err(ClientError::BadRid);
        }
    } else {
        conn.send(&opts.game).await;
        conn.send(&opts.name).await;
    }

    let (state, seat) = setup(&mut conn, reconnecting).await?;
    play(&mut conn, state, seat).await
}

/// Drive the pre-game message sequence: the reconnect id (printed to
/// stdout for later reuse), `playinfo`, `tokens`, and — when rejoining —
/// the catchup snapshot.
async fn setup(conn: &mut Connection, reconnecting: bool) -> Result<(GameState, usize), ClientError> {
    if !reconnecting {
        let line = conn.read_line().await?;
        match line.strip_prefix("rid") {
            Some(id) if !id.is_empty() => println!("{id}"),
            _ => return Err(ClientError::Comms),
        }
    }

    let (seat, players) = match ServerMsg::parse(&conn.read_line().await?) {
        Ok(ServerMsg::PlayInfo { seat, players }) => (seat, players),
        _ => return Err(ClientError::Comms),
    };
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players) || seat >= players {
        return Err(ClientError::Comms);
    }

    let initial_tokens = match ServerMsg::parse(&conn.read_line().await?) {
        Ok(ServerMsg::Tokens(count)) => count,
        _ => return Err(ClientError::Comms),
    };

    // Names are never broadcast, so seats are known only by letter.
    let roster = (0..players)
        .map(|s| PlayerState::new(seat_letter(s).to_string()))
        .collect();
    let mut state = GameState::new(roster, initial_tokens);

    if reconnecting {
        catch_up(conn, &mut state).await?;
    }
    Ok((state, seat))
}

/// Replay the catchup snapshot: `newcard` lines for the whole board,
/// then one `player` line per seat, in seat order. The piles are
/// re-derived by debiting every reported wallet from the initial stock.
async fn catch_up(conn: &mut Connection, state: &mut GameState) -> Result<(), ClientError> {
    let mut line = conn.read_line().await?;
    while line.starts_with("newcard") {
        match ServerMsg::parse(&line) {
            Ok(ServerMsg::NewCard(card)) => {
                state.add_card(card).map_err(|_| ClientError::Comms)?;
            }
            _ => return Err(ClientError::Comms),
        }
        line = conn.read_line().await?;
    }

    for expected in 0..state.players.len() {
        if expected > 0 {
            line = conn.read_line().await?;
        }
        match ServerMsg::parse(&line) {
            Ok(ServerMsg::PlayerUpdate {
                seat,
                score,
                discounts,
                wallet,
            }) if seat == expected => {
                for colour in Colour::ALL {
                    if state.piles[colour] < wallet.colours[colour] {
                        return Err(ClientError::Comms);
                    }
                    state.piles[colour] -= wallet.colours[colour];
                }
                let player = &mut state.players[seat];
                player.score = score;
                player.discounts = discounts;
                player.wallet = wallet;
            }
            _ => return Err(ClientError::Comms),
        }
    }
    Ok(())
}

/// The in-game loop: apply every broadcast to the local state, show the
/// table after each change, and answer `dowhat` with a prompted move.
async fn play(conn: &mut Connection, mut state: GameState, seat: usize) -> Result<(), ClientError> {
    let mut prompter = Prompter::new();
    display::show_table(&state, seat);

    loop {
        let line = conn.read_line().await?;
        let msg = ServerMsg::parse(&line).map_err(|_| ClientError::Comms)?;
        match msg {
            ServerMsg::DoWhat => {
                let action = prompter
                    .choose_action(&state, seat)
                    .await
                    .ok_or(ClientError::Comms)?;
                conn.send(action).await;
                continue;
            }
            ServerMsg::NewCard(card) => {
                state.add_card(card).map_err(|_| ClientError::Comms)?;
            }
            ServerMsg::Purchased {
                seat: who,
                card,
                payment,
            } => {
                state
                    .apply_purchase(who, card, &payment)
                    .map_err(|_| ClientError::Comms)?;
            }
            ServerMsg::Took { seat: who, take } => {
                state
                    .apply_take(who, take)
                    .map_err(|_| ClientError::Comms)?;
            }
            ServerMsg::Wild { seat: who } => {
                state.apply_wild(who).map_err(|_| ClientError::Comms)?;
            }
            ServerMsg::Eog => {
                display::show_winners(&state);
                return Ok(());
            }
            ServerMsg::Disco { seat: who } => {
                eprintln!("Player {} disconnected", seat_letter(who));
                return Err(ClientError::Disconnect);
            }
            ServerMsg::Invalid { seat: who } => {
                eprintln!("Player {} sent invalid message", seat_letter(who));
                return Err(ClientError::Misbehave);
            }
            // setup-phase messages have no business mid-game
            ServerMsg::Rid(_)
            | ServerMsg::PlayInfo { .. }
            | ServerMsg::Tokens(_)
            | ServerMsg::PlayerUpdate { .. }
            | ServerMsg::Yes
            | ServerMsg::No => return Err(ClientError::Comms),
        }
        display::show_table(&state, seat);
    }
}

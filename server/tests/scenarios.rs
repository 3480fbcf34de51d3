//! End-to-end scenarios over real sockets: an in-process server bound to
//! an OS-assigned port, driven by scripted TCP clients speaking the wire
//! protocol directly.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use austerity_server::config::{self, PortConfig};
use austerity_server::server::run::{bind_ports, spawn_acceptors};
use austerity_server::server::ServerState;

const KEY: &str = "secret";

/// Ten cards: a one-point purple and a worthless brown, five times over.
fn standard_deck() -> String {
    "P:1:0,0,0,0\nB:0:0,0,0,0\n".repeat(5)
}

fn entry(tokens: u32, points: u32, players: usize) -> PortConfig {
    PortConfig {
        port: 0,
        tokens,
        points,
        players,
    }
}

async fn start_server(
    deck: &str,
    port_config: PortConfig,
    timeout: u64,
) -> Result<(Arc<ServerState>, u16)> {
    let deck = config::parse_deck(deck)?;
    let state = ServerState::new(KEY.to_string(), deck, timeout);
    let bound = bind_ports(&[port_config]).await?;
    let port = bound[0].1.port;
    // acceptor tasks keep running after the handles drop
    let _acceptors = spawn_acceptors(&state, bound);
    Ok((state, port))
}

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(port: u16) -> Result<Self> {
        let stream = TcpStream::connect(("127.0.0.1", port))
            .await
            .context("connecting to test server")?;
        let (read_half, write_half) = stream.into_split();
        Ok(Client {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    async fn say(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        Ok(())
    }

    async fn line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = tokio::time::timeout(Duration::from_secs(10), self.reader.read_line(&mut line))
            .await
            .context("timed out waiting for a server line")??;
        if read == 0 {
            bail!("server closed the connection");
        }
        if line.ends_with('\n') {
            line.pop();
        }
        Ok(line)
    }

    async fn expect(&mut self, want: &str) -> Result<()> {
        let got = self.line().await?;
        if got != want {
            bail!("expected {want:?}, got {got:?}");
        }
        Ok(())
    }

    async fn expect_many(&mut self, wants: &[&str]) -> Result<()> {
        for want in wants {
            self.expect(want).await?;
        }
        Ok(())
    }

    async fn expect_eof(&mut self) -> Result<()> {
        let mut line = String::new();
        let read = tokio::time::timeout(Duration::from_secs(10), self.reader.read_line(&mut line))
            .await
            .context("timed out waiting for EOF")??;
        if read != 0 {
            bail!("expected EOF, got {line:?}");
        }
        Ok(())
    }

    /// `play` handshake plus the game-name and player-name lines.
    async fn join(port: u16, game: &str, name: &str) -> Result<Self> {
        let mut client = Client::connect(port).await?;
        client.say(&format!("play{KEY}")).await?;
        client.expect("yes").await?;
        client.say(game).await?;
        client.say(name).await?;
        Ok(client)
    }
}

/// The eight cards revealed from `standard_deck` at game start.
const OPENING_BOARD: &[&str] = &[
    "newcardP:1:0,0,0,0",
    "newcardB:0:0,0,0,0",
    "newcardP:1:0,0,0,0",
    "newcardB:0:0,0,0,0",
    "newcardP:1:0,0,0,0",
    "newcardB:0:0,0,0,0",
    "newcardP:1:0,0,0,0",
    "newcardB:0:0,0,0,0",
];

#[tokio::test]
async fn full_two_player_game_reaches_eog() -> Result<()> {
    let (_state, port) = start_server(&standard_deck(), entry(3, 1, 2), 0).await?;

    let mut a = Client::join(port, "g", "A").await?;
    let mut b = Client::join(port, "g", "B").await?;

    a.expect_many(&["ridg,1,0", "playinfoA/2", "tokens3"]).await?;
    a.expect_many(OPENING_BOARD).await?;
    b.expect_many(&["ridg,1,1", "playinfoB/2", "tokens3"]).await?;
    b.expect_many(OPENING_BOARD).await?;

    // round one: both players take a wild
    a.expect("dowhat").await?;
    a.say("wild").await?;
    a.expect("wildA").await?;
    b.expect("wildA").await?;
    b.expect("dowhat").await?;
    b.say("wild").await?;
    a.expect("wildB").await?;
    b.expect("wildB").await?;

    // round two: A buys the free purple card and reaches the threshold;
    // the round still completes before eog
    a.expect("dowhat").await?;
    a.say("purchase0:0,0,0,0,0").await?;
    let purchase = &["purchasedA:0:0,0,0,0,0", "newcardP:1:0,0,0,0"];
    a.expect_many(purchase).await?;
    b.expect_many(purchase).await?;
    b.expect("dowhat").await?;
    b.say("wild").await?;
    a.expect_many(&["wildB", "eog"]).await?;
    b.expect_many(&["wildB", "eog"]).await?;

    a.expect_eof().await?;
    b.expect_eof().await?;
    Ok(())
}

#[tokio::test]
async fn second_strike_ends_the_game_as_invalid() -> Result<()> {
    let (_state, port) = start_server(&standard_deck(), entry(3, 1, 2), 0).await?;

    let mut a = Client::join(port, "g", "A").await?;
    let mut b = Client::join(port, "g", "B").await?;

    a.expect_many(&["ridg,1,0", "playinfoA/2", "tokens3"]).await?;
    a.expect_many(OPENING_BOARD).await?;
    b.expect_many(&["ridg,1,1", "playinfoB/2", "tokens3"]).await?;
    b.expect_many(OPENING_BOARD).await?;

    a.expect("dowhat").await?;
    a.say("takemelon").await?;
    // one warning, then the semantically bad take is the second strike
    a.expect("dowhat").await?;
    a.say("take1,0,0,0").await?;

    a.expect("invalidA").await?;
    b.expect("invalidA").await?;
    b.expect_eof().await?;
    Ok(())
}

#[tokio::test]
async fn disconnect_without_reconnect_ends_the_game() -> Result<()> {
    let (_state, port) = start_server(&standard_deck(), entry(3, 1, 2), 1).await?;

    let mut a = Client::join(port, "g", "A").await?;
    let mut b = Client::join(port, "g", "B").await?;

    a.expect_many(&["ridg,1,0", "playinfoA/2", "tokens3"]).await?;
    a.expect_many(OPENING_BOARD).await?;
    b.expect_many(&["ridg,1,1", "playinfoB/2", "tokens3"]).await?;
    b.expect_many(OPENING_BOARD).await?;

    a.expect("dowhat").await?;
    drop(a);

    // the one-second grace window passes with no reconnect
    b.expect("discoA").await?;
    b.expect_eof().await?;
    Ok(())
}

#[tokio::test]
async fn reconnect_within_the_window_resumes_the_seat() -> Result<()> {
    let deck = "P:1:0,0,0,0\nB:0:0,0,0,0\n";
    let (_state, port) = start_server(deck, entry(3, 5, 2), 5).await?;

    let mut a = Client::join(port, "g", "A").await?;
    let mut b = Client::join(port, "g", "B").await?;

    let board = &["newcardP:1:0,0,0,0", "newcardB:0:0,0,0,0"];
    a.expect_many(&["ridg,1,0", "playinfoA/2", "tokens3"]).await?;
    a.expect_many(board).await?;
    b.expect_many(&["ridg,1,1", "playinfoB/2", "tokens3"]).await?;
    b.expect_many(board).await?;

    a.expect("dowhat").await?;
    drop(a);

    let mut rejoined = Client::connect(port).await?;
    rejoined.say(&format!("reconnect{KEY}")).await?;
    rejoined.expect("yes").await?;
    rejoined.say("ridg,1,0").await?;
    rejoined.expect("yes").await?;
    rejoined.expect_many(&["playinfoA/2", "tokens3"]).await?;
    rejoined.expect_many(board).await?;
    rejoined
        .expect_many(&[
            "playerA:0:d=0,0,0,0:t=0,0,0,0,0",
            "playerB:0:d=0,0,0,0:t=0,0,0,0,0",
        ])
        .await?;

    // the interrupted turn is re-prompted on the fresh socket
    rejoined.expect("dowhat").await?;
    rejoined.say("wild").await?;
    rejoined.expect("wildA").await?;
    b.expect("wildA").await?;
    Ok(())
}

#[tokio::test]
async fn reconnect_is_refused_for_unknown_games_and_seats() -> Result<()> {
    let (_state, port) = start_server(&standard_deck(), entry(3, 1, 2), 5).await?;

    let mut a = Client::join(port, "g", "A").await?;
    let mut b = Client::join(port, "g", "B").await?;
    a.expect("ridg,1,0").await?;
    b.expect("ridg,1,1").await?;

    // wrong counter
    let mut probe = Client::connect(port).await?;
    probe.say(&format!("reconnect{KEY}")).await?;
    probe.expect("yes").await?;
    probe.say("ridg,9,0").await?;
    probe.expect("no").await?;
    probe.expect_eof().await?;

    // seat beyond the table
    let mut probe = Client::connect(port).await?;
    probe.say(&format!("reconnect{KEY}")).await?;
    probe.expect("yes").await?;
    probe.say("ridg,1,2").await?;
    probe.expect("no").await?;
    probe.expect_eof().await?;

    // rid syntax
    let mut probe = Client::connect(port).await?;
    probe.say(&format!("reconnect{KEY}")).await?;
    probe.expect("yes").await?;
    probe.say("ridg,1").await?;
    probe.expect("no").await?;
    probe.expect_eof().await?;
    Ok(())
}

#[tokio::test]
async fn wrong_key_is_refused() -> Result<()> {
    let (_state, port) = start_server(&standard_deck(), entry(3, 1, 2), 0).await?;

    let mut client = Client::connect(port).await?;
    client.say("playwrong").await?;
    client.expect("no").await?;
    client.expect_eof().await?;

    let mut client = Client::connect(port).await?;
    client.say("hello").await?;
    client.expect("no").await?;
    client.expect_eof().await?;
    Ok(())
}

#[tokio::test]
async fn scoreboard_aggregates_and_sorts_by_points_then_tokens() -> Result<()> {
    let (_state, port) = start_server(&standard_deck(), entry(3, 1, 2), 0).await?;

    let mut a = Client::join(port, "g", "A").await?;
    let mut b = Client::join(port, "g", "B").await?;

    a.expect_many(&["ridg,1,0", "playinfoA/2", "tokens3"]).await?;
    a.expect_many(OPENING_BOARD).await?;
    b.expect_many(&["ridg,1,1", "playinfoB/2", "tokens3"]).await?;
    b.expect_many(OPENING_BOARD).await?;

    // A buys the free card at once; B takes a wild as the round finishes
    a.expect("dowhat").await?;
    a.say("purchase0:0,0,0,0,0").await?;
    let purchase = &["purchasedA:0:0,0,0,0,0", "newcardP:1:0,0,0,0"];
    a.expect_many(purchase).await?;
    b.expect_many(purchase).await?;
    b.expect("dowhat").await?;
    b.say("wild").await?;
    a.expect_many(&["wildB", "eog"]).await?;
    b.expect_many(&["wildB", "eog"]).await?;

    let mut scores = Client::connect(port).await?;
    scores.say("scores").await?;
    scores
        .expect_many(&["yes", "Player Name,Total Tokens,Total Points", "A,0,1", "B,1,0"])
        .await?;
    scores.expect_eof().await?;
    Ok(())
}

#[tokio::test]
async fn games_sharing_a_name_get_consecutive_counters() -> Result<()> {
    let (_state, port) = start_server(&standard_deck(), entry(3, 1, 2), 0).await?;

    let mut a = Client::join(port, "g", "A").await?;
    let mut b = Client::join(port, "g", "B").await?;
    a.expect("ridg,1,0").await?;
    b.expect("ridg,1,1").await?;

    // the first lobby closed when it filled, so the same name opens a
    // fresh lobby and the counter advances
    let mut c = Client::join(port, "g", "C").await?;
    let mut d = Client::join(port, "g", "D").await?;
    c.expect("ridg,2,0").await?;
    d.expect("ridg,2,1").await?;
    Ok(())
}

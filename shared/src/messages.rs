//! The line protocol. Every message is one newline-terminated line with a
//! fixed prefix; payload fields are canonical decimals and single
//! uppercase seat letters. Parsing is strict: embedded whitespace, stray
//! separators, or trailing bytes make a line unrecognisable, and encoding
//! a parsed message reproduces the original line exactly.

use std::fmt;

use thiserror::Error;

use crate::cards::{Card, ColourCounts, TokenCounts};
use crate::{parse_count, seat_from_letter, seat_letter, MAX_PLAYERS};

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unrecognised message")]
    Unknown,
    #[error("malformed {0} message")]
    Malformed(&'static str),
}

/// The `<name>,<counter>,<seat>` triple that identifies a player slot for
/// reconnection. The name cannot contain a comma, so the first comma
/// always ends it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectId {
    pub name: String,
    pub counter: u32,
    pub seat: usize,
}

impl ReconnectId {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let malformed = ProtocolError::Malformed("rid");
        let (name, rest) = text.split_once(',').ok_or(malformed)?;
        let (counter, seat) = rest.split_once(',').ok_or(malformed)?;
        let seat = parse_count(seat).ok_or(malformed)? as usize;
        if seat >= MAX_PLAYERS {
            return Err(malformed);
        }
        Ok(ReconnectId {
            name: name.to_string(),
            counter: parse_count(counter).ok_or(malformed)?,
            seat,
        })
    }
}

impl fmt::Display for ReconnectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.name, self.counter, self.seat)
    }
}

/// Every message the server sends to a player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerMsg {
    /// Reconnect id assignment, sent once at game start.
    Rid(ReconnectId),
    /// The receiver's seat letter and the seat count.
    PlayInfo { seat: usize, players: usize },
    /// Initial size of every real-colour pile.
    Tokens(u32),
    /// A card revealed onto the tail of the board.
    NewCard(Card),
    /// A seat bought a board card with the given payment.
    Purchased {
        seat: usize,
        card: usize,
        payment: TokenCounts,
    },
    /// A seat took non-wild tokens.
    Took { seat: usize, take: ColourCounts },
    /// A seat took a wild token.
    Wild { seat: usize },
    /// Catchup snapshot of one seat, sent on reconnect.
    PlayerUpdate {
        seat: usize,
        score: u32,
        discounts: ColourCounts,
        wallet: TokenCounts,
    },
    /// The receiver's turn.
    DoWhat,
    /// Game over because the seat disconnected for good.
    Disco { seat: usize },
    /// Game over because the seat misbehaved twice.
    Invalid { seat: usize },
    /// Normal end of game.
    Eog,
    /// Handshake accept.
    Yes,
    /// Handshake reject.
    No,
}

/// Split a payload into its leading seat letter and the remainder.
fn seat_field(text: &str) -> Option<(usize, &str)> {
    let mut chars = text.chars();
    let seat = seat_from_letter(chars.next()?)?;
    Some((seat, chars.as_str()))
}

/// A seat letter with nothing after it.
fn bare_seat(text: &str, kind: &'static str) -> Result<usize, ProtocolError> {
    match seat_field(text) {
        Some((seat, "")) => Ok(seat),
        _ => Err(ProtocolError::Malformed(kind)),
    }
}

impl ServerMsg {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        match line {
            "dowhat" => return Ok(ServerMsg::DoWhat),
            "eog" => return Ok(ServerMsg::Eog),
            "yes" => return Ok(ServerMsg::Yes),
            "no" => return Ok(ServerMsg::No),
            _ => {}
        }
        if let Some(rest) = line.strip_prefix("rid") {
            return Ok(ServerMsg::Rid(ReconnectId::parse(rest)?));
        }
        if let Some(rest) = line.strip_prefix("playinfo") {
            let malformed = ProtocolError::Malformed("playinfo");
            let (seat, rest) = seat_field(rest).ok_or(malformed)?;
            let players = rest.strip_prefix('/').ok_or(malformed)?;
            let players = parse_count(players).ok_or(malformed)? as usize;
            return Ok(ServerMsg::PlayInfo { seat, players });
        }
        if let Some(rest) = line.strip_prefix("player") {
            return Self::parse_player_update(rest);
        }
        if let Some(rest) = line.strip_prefix("tokens") {
            let count = parse_count(rest).ok_or(ProtocolError::Malformed("tokens"))?;
            return Ok(ServerMsg::Tokens(count));
        }
        if let Some(rest) = line.strip_prefix("newcard") {
            let card = Card::parse(rest).ok_or(ProtocolError::Malformed("newcard"))?;
            return Ok(ServerMsg::NewCard(card));
        }
        if let Some(rest) = line.strip_prefix("purchased") {
            let malformed = ProtocolError::Malformed("purchased");
            let (seat, rest) = seat_field(rest).ok_or(malformed)?;
            let rest = rest.strip_prefix(':').ok_or(malformed)?;
            let (card, payment) = rest.split_once(':').ok_or(malformed)?;
            return Ok(ServerMsg::Purchased {
                seat,
                card: parse_count(card).ok_or(malformed)? as usize,
                payment: TokenCounts::parse(payment).ok_or(malformed)?,
            });
        }
        if let Some(rest) = line.strip_prefix("took") {
            let malformed = ProtocolError::Malformed("took");
            let (seat, rest) = seat_field(rest).ok_or(malformed)?;
            let take = rest.strip_prefix(':').ok_or(malformed)?;
            return Ok(ServerMsg::Took {
                seat,
                take: ColourCounts::parse(take).ok_or(malformed)?,
            });
        }
        if let Some(rest) = line.strip_prefix("wild") {
            return Ok(ServerMsg::Wild {
                seat: bare_seat(rest, "wild")?,
            });
        }
        if let Some(rest) = line.strip_prefix("disco") {
            return Ok(ServerMsg::Disco {
                seat: bare_seat(rest, "disco")?,
            });
        }
        if let Some(rest) = line.strip_prefix("invalid") {
            return Ok(ServerMsg::Invalid {
                seat: bare_seat(rest, "invalid")?,
            });
        }
        Err(ProtocolError::Unknown)
    }

    /// `player<L>:<score>:d=<P>,<B>,<Y>,<R>:t=<P>,<B>,<Y>,<R>,<W>`
    fn parse_player_update(rest: &str) -> Result<Self, ProtocolError> {
        let malformed = ProtocolError::Malformed("player");
        let (seat, rest) = seat_field(rest).ok_or(malformed)?;
        let rest = rest.strip_prefix(':').ok_or(malformed)?;
        let (score, rest) = rest.split_once(':').ok_or(malformed)?;
        let (discounts, wallet) = rest.split_once(':').ok_or(malformed)?;
        let discounts = discounts.strip_prefix("d=").ok_or(malformed)?;
        let wallet = wallet.strip_prefix("t=").ok_or(malformed)?;
        Ok(ServerMsg::PlayerUpdate {
            seat,
            score: parse_count(score).ok_or(malformed)?,
            discounts: ColourCounts::parse(discounts).ok_or(malformed)?,
            wallet: TokenCounts::parse(wallet).ok_or(malformed)?,
        })
    }
}

impl fmt::Display for ServerMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMsg::Rid(rid) => write!(f, "rid{rid}"),
            ServerMsg::PlayInfo { seat, players } => {
                write!(f, "playinfo{}/{}", seat_letter(*seat), players)
            }
            ServerMsg::Tokens(count) => write!(f, "tokens{count}"),
            ServerMsg::NewCard(card) => write!(f, "newcard{card}"),
            ServerMsg::Purchased {
                seat,
                card,
                payment,
            } => write!(f, "purchased{}:{}:{}", seat_letter(*seat), card, payment),
            ServerMsg::Took { seat, take } => {
                write!(f, "took{}:{}", seat_letter(*seat), take)
            }
            ServerMsg::Wild { seat } => write!(f, "wild{}", seat_letter(*seat)),
            ServerMsg::PlayerUpdate {
                seat,
                score,
                discounts,
                wallet,
            } => write!(
                f,
                "player{}:{}:d={}:t={}",
                seat_letter(*seat),
                score,
                discounts,
                wallet
            ),
            ServerMsg::DoWhat => write!(f, "dowhat"),
            ServerMsg::Disco { seat } => write!(f, "disco{}", seat_letter(*seat)),
            ServerMsg::Invalid { seat } => write!(f, "invalid{}", seat_letter(*seat)),
            ServerMsg::Eog => write!(f, "eog"),
            ServerMsg::Yes => write!(f, "yes"),
            ServerMsg::No => write!(f, "no"),
        }
    }
}

/// A move a player sends back after `dowhat`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionMsg {
    Purchase { card: usize, payment: TokenCounts },
    Take(ColourCounts),
    Wild,
}

impl ActionMsg {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        if line == "wild" {
            return Ok(ActionMsg::Wild);
        }
        if let Some(rest) = line.strip_prefix("purchase") {
            let malformed = ProtocolError::Malformed("purchase");
            let (card, payment) = rest.split_once(':').ok_or(malformed)?;
            return Ok(ActionMsg::Purchase {
                card: parse_count(card).ok_or(malformed)? as usize,
                payment: TokenCounts::parse(payment).ok_or(malformed)?,
            });
        }
        if let Some(rest) = line.strip_prefix("take") {
            let take = ColourCounts::parse(rest).ok_or(ProtocolError::Malformed("take"))?;
            return Ok(ActionMsg::Take(take));
        }
        Err(ProtocolError::Unknown)
    }
}

impl fmt::Display for ActionMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionMsg::Purchase { card, payment } => write!(f, "purchase{card}:{payment}"),
            ActionMsg::Take(take) => write!(f, "take{take}"),
            ActionMsg::Wild => write!(f, "wild"),
        }
    }
}

/// The first line of every connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthRequest {
    /// Join a lobby; the payload is the shared key.
    Play(String),
    /// Rejoin a running game; the payload is the shared key.
    Reconnect(String),
    /// Fetch the scoreboard. No key.
    Scores,
}

impl AuthRequest {
    /// Anything unrecognisable is `None`, which the server answers `no`.
    pub fn parse(line: &str) -> Option<Self> {
        if line == "scores" {
            return Some(AuthRequest::Scores);
        }
        if let Some(key) = line.strip_prefix("reconnect") {
            return Some(AuthRequest::Reconnect(key.to_string()));
        }
        if let Some(key) = line.strip_prefix("play") {
            return Some(AuthRequest::Play(key.to_string()));
        }
        None
    }
}

impl fmt::Display for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthRequest::Play(key) => write!(f, "play{key}"),
            AuthRequest::Reconnect(key) => write!(f, "reconnect{key}"),
            AuthRequest::Scores => write!(f, "scores"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_LINES: &[&str] = &[
        "ridtuesday,2,0",
        "playinfoB/3",
        "tokens7",
        "newcardY:3:1,0,2,1",
        "purchasedA:4:1,0,0,2,1",
        "tookC:1,1,0,1",
        "wildB",
        "playerA:5:d=1,0,2,0:t=0,3,0,1,2",
        "dowhat",
        "discoB",
        "invalidZ",
        "eog",
        "yes",
        "no",
    ];

    #[test]
    fn server_messages_round_trip() {
        for line in SERVER_LINES {
            let msg = ServerMsg::parse(line).unwrap_or_else(|e| panic!("{line}: {e}"));
            assert_eq!(&msg.to_string(), line);
        }
    }

    #[test]
    fn action_messages_round_trip() {
        for line in ["purchase0:1,0,0,2,1", "take1,1,0,1", "wild"] {
            let msg = ActionMsg::parse(line).unwrap_or_else(|e| panic!("{line}: {e}"));
            assert_eq!(&msg.to_string(), line);
        }
    }

    #[test]
    fn structural_deviations_are_rejected() {
        for line in [
            "",
            "melon",
            "dowhat ",
            "wild",     // server form needs a seat letter
            "wilda",    // lowercase letter
            "wildAB",   // trailing byte
            "tokens",   // missing count
            "tokens 3", // embedded space
            "tokens03", // non-canonical number
            "playinfoA2",
            "playinfoA/",
            "purchasedA:1:1,0,0,2",
            "tookA1,1,1,0",
            "playerA:5:d=1,0,2,0:t=0,3,0,1",
            "ridgame,1",
            "ridgame,1,26",
        ] {
            assert!(ServerMsg::parse(line).is_err(), "accepted {line:?}");
        }

        for line in ["takemelon", "take1,0,0", "purchase:1,0,0,0,0", "wild "] {
            assert!(ActionMsg::parse(line).is_err(), "accepted {line:?}");
        }
    }

    #[test]
    fn auth_lines_classify_by_prefix() {
        assert_eq!(
            AuthRequest::parse("playsecret"),
            Some(AuthRequest::Play("secret".into()))
        );
        assert_eq!(
            AuthRequest::parse("reconnectsecret"),
            Some(AuthRequest::Reconnect("secret".into()))
        );
        assert_eq!(AuthRequest::parse("scores"), Some(AuthRequest::Scores));
        assert_eq!(AuthRequest::parse("score"), None);
        assert_eq!(AuthRequest::parse("hello"), None);
    }

    #[test]
    fn rid_name_ends_at_the_first_comma() {
        let rid = ReconnectId::parse("afternoon,12,3").unwrap();
        assert_eq!(rid.name, "afternoon");
        assert_eq!(rid.counter, 12);
        assert_eq!(rid.seat, 3);
        assert_eq!(rid.to_string(), "afternoon,12,3");
    }
}

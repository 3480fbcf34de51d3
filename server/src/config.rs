//! Start-up configuration: the shared-secret keyfile, the deckfile, the
//! per-port statfile, and the disconnect timeout.
//!
//! The content-level parsers work on `&str` so validity rules (several of
//! which are byte-exact, like trailing-newline requirements) are easy to
//! test; the `load_*` functions wrap them with file reads.

use std::fs;
use std::path::Path;

use thiserror::Error;

use austerity_shared::cards::Card;
use austerity_shared::{MAX_PLAYERS, MIN_PLAYERS};

/// A configuration file the server refuses to start (or re-listen) with.
/// The display strings are the server's stderr diagnostics.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Bad keyfile")]
    Keyfile,
    #[error("Bad deckfile")]
    Deckfile,
    #[error("Bad statfile")]
    Statfile,
    #[error("Bad timeout")]
    Timeout,
}

/// One statfile entry: the port to listen on and the game parameters
/// attached to lobbies created through it. Port 0 asks the kernel for an
/// ephemeral port; the bound port replaces it at listen time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortConfig {
    pub port: u16,
    pub tokens: u32,
    pub points: u32,
    pub players: usize,
}

/// A keyfile is exactly one non-empty line with no trailing newline.
pub fn parse_key(content: &str) -> Result<String, ConfigError> {
    if content.is_empty() || content.contains('\n') {
        return Err(ConfigError::Keyfile);
    }
    Ok(content.to_string())
}

/// A deckfile is one `D:V:P,B,Y,R` card per line, newline-terminated,
/// with no blank lines, no stray whitespace, and at least one card.
pub fn parse_deck(content: &str) -> Result<Vec<Card>, ConfigError> {
    let body = content.strip_suffix('\n').ok_or(ConfigError::Deckfile)?;
    body.split('\n')
        .map(|line| Card::parse(line).ok_or(ConfigError::Deckfile))
        .collect()
}

/// A statfile is one `port,tokens,points,players` entry per line and must
/// *not* end with a newline. Non-zero ports may not repeat.
pub fn parse_statfile(content: &str) -> Result<Vec<PortConfig>, ConfigError> {
    if content.ends_with('\n') {
        return Err(ConfigError::Statfile);
    }
    let mut entries: Vec<PortConfig> = Vec::new();
    for line in content.split('\n') {
        let entry = parse_stat_entry(line).ok_or(ConfigError::Statfile)?;
        if entry.port != 0 && entries.iter().any(|e| e.port == entry.port) {
            return Err(ConfigError::Statfile);
        }
        entries.push(entry);
    }
    Ok(entries)
}

fn parse_stat_entry(line: &str) -> Option<PortConfig> {
    let mut fields = line.split(',');
    let port = parse_field(fields.next()?)?;
    let tokens = parse_field(fields.next()?)?;
    let points = parse_field(fields.next()?)?;
    let players = parse_field(fields.next()?)? as usize;
    if fields.next().is_some() {
        return None;
    }
    let port = u16::try_from(port).ok()?;
    if tokens < 1 || points < 1 || !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players) {
        return None;
    }
    Some(PortConfig {
        port,
        tokens,
        points,
        players,
    })
}

/// The disconnect grace window in seconds; zero means no grace at all.
pub fn parse_timeout(text: &str) -> Result<u64, ConfigError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::Timeout);
    }
    text.parse().map_err(|_| ConfigError::Timeout)
}

fn parse_field(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if text.len() > 1 && text.starts_with('0') {
        return None;
    }
    text.parse().ok()
}

pub fn load_key(path: &Path) -> Result<String, ConfigError> {
    let content = fs::read_to_string(path).map_err(|_| ConfigError::Keyfile)?;
    parse_key(&content)
}

pub fn load_deck(path: &Path) -> Result<Vec<Card>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|_| ConfigError::Deckfile)?;
    parse_deck(&content)
}

pub fn load_statfile(path: &Path) -> Result<Vec<PortConfig>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|_| ConfigError::Statfile)?;
    parse_statfile(&content)
}

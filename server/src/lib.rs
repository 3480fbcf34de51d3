//! The Austerity game service: a concurrent TCP server hosting turn-based
//! card-and-token games, plus the interactive player client and the
//! scoreboard client that talk to it.

pub mod cli;
pub mod client;
pub mod config;
pub mod game;
pub mod server;

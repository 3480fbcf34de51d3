pub mod connection;
pub mod lobby;
pub mod net;
pub mod reconnect;
pub mod run;
pub mod scores;
pub mod state;
pub mod turns;

// Most callers only need to start the server and look up games.
pub use run::{run, ServerError, ServerOptions};
pub use state::{GameHandle, ServerState};

//! Line-oriented connection plumbing.

use std::fmt;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// One client's socket, split for buffered line reads and direct writes.
/// Ownership follows the player: the accepting handler creates it, a
/// lobby holds it, and the game task reads and writes it for the rest of
/// the game. Dropping it closes the socket.
pub struct PlayerConn {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl PlayerConn {
    pub fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        PlayerConn {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    /// Read one line, without its newline. `None` on EOF or any read
    /// failure; both mean the peer is gone.
    pub async fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line).await {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                }
                Some(line)
            }
        }
    }

    /// Write one newline-terminated message. Write failures are dropped:
    /// a vanished peer is discovered on the next read from it, never on a
    /// broadcast.
    pub async fn send(&mut self, msg: impl fmt::Display) {
        let line = format!("{msg}\n");
        let _ = self.writer.write_all(line.as_bytes()).await;
    }
}

//! The scoreboard client: authenticate as a `scores` reader and copy the
//! CSV to stdout.

use std::io::Write;
use std::process;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use austerity_server::cli;

#[tokio::main]
async fn main() {
    let args = match cli::ScoresCli::try_parse() {
        Ok(args) => args,
        Err(_) => {
            eprintln!("{}", cli::SCORES_USAGE);
            process::exit(1);
        }
    };
    cli::init_tracing();
    process::exit(fetch(&args.port).await);
}

async fn fetch(port: &str) -> i32 {
    let Ok(port) = port.parse::<u16>() else {
        eprintln!("Failed to connect");
        return 3;
    };
    let Ok(stream) = TcpStream::connect(("127.0.0.1", port)).await else {
        eprintln!("Failed to connect");
        return 3;
    };
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let _ = write_half.write_all(b"scores\n").await;

    let mut reply = String::new();
    match reader.read_line(&mut reply).await {
        Ok(n) if n > 0 && reply.trim_end_matches('\n') == "yes" => {}
        _ => {
            eprintln!("Invalid server");
            return 4;
        }
    }

    // the rest of the stream is the scoreboard
    let mut table = Vec::new();
    let _ = reader.read_to_end(&mut table).await;
    let _ = std::io::stdout().write_all(&table);
    0
}

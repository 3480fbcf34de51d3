//! The Austerity game server binary.

use std::process;

use clap::Parser;

use austerity_server::{cli, server};

#[tokio::main]
async fn main() {
    let args = match cli::ServerCli::try_parse() {
        Ok(args) => args,
        Err(_) => {
            eprintln!("{}", cli::SERVER_USAGE);
            process::exit(1);
        }
    };
    cli::init_tracing();

    if let Err(err) = server::run(args.into()).await {
        eprintln!("{err}");
        process::exit(err.exit_code());
    }
}

//! The interactive Austerity player binary.

use std::process;

use clap::Parser;

use austerity_server::{cli, client};

#[tokio::main]
async fn main() {
    let args = match cli::PlayerCli::try_parse() {
        Ok(args) => args,
        Err(_) => {
            eprintln!("{}", cli::PLAYER_USAGE);
            process::exit(1);
        }
    };
    cli::init_tracing();

    if let Err(err) = client::run(args.into()).await {
        if !err.already_reported() {
            eprintln!("{err}");
        }
        process::exit(err.exit_code());
    }
}

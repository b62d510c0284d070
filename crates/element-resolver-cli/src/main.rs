//! Element Resolver CLI
//!
//! Operator tool for the selector memory the resolver learns from, and for
//! trying the vision locator against saved screenshots.
//!
//! Usage:
//!   element-resolver stats
//!   element-resolver mappings --app com.example.social
//!   element-resolver show --app com.example.social --key "post button"
//!   element-resolver record --app com.example.social --key "post button" --selector text:Share --confidence 0.6
//!   element-resolver fail --app com.example.social --key "post button" --selector id:btn_post
//!   element-resolver describe --app com.example.social --key "post button" --text "paper plane icon"
//!   element-resolver locate --screenshot home.png --description "post button"
//!   element-resolver describe-screen --screenshot home.png

use crate::cli::Cli;
use clap::Parser;

mod cli;
mod command;
mod utils;

#[tokio::main]
async fn main() {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    utils::init_logging(cli.verbose);

    if let Err(e) = command::run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

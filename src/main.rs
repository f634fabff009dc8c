// src/main.rs
use std::process::exit;
use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, Level};

use osintkit::cli::{App, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    debug!("Verbose mode enabled");

    let app = App::new(args.config);
    if let Err(e) = app.run(args.command).await {
        error!("Command execution failed: {:#}", e);
        exit(1);
    }

    Ok(())
}

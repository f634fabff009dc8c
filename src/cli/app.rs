use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, debug};

use crate::config::Config;
use crate::osint::SearchOrchestrator;

use super::commands::{self, Args, Commands};
use super::interactive::InteractiveShell;

/// The main application struct
pub struct App {
    config_path: Option<PathBuf>,
}

impl App {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    /// Load configuration and wire up the sources
    pub async fn orchestrator(&self) -> Result<SearchOrchestrator> {
        let config = Config::load(self.config_path.as_deref())?;
        debug!("Using data directory {}", config.global.data_dir.display());

        Ok(SearchOrchestrator::from_config(&config).await?)
    }

    pub async fn run(&self, command: Option<Commands>) -> Result<()> {
        info!("Starting osintkit v{}", env!("CARGO_PKG_VERSION"));

        match command {
            Some(Commands::Init { force }) => {
                let path = Config::init(force)?;
                println!("Configuration initialized at {}", path.display());
            }
            Some(Commands::Classify { target }) => {
                commands::handle_classify_command(&target);
            }
            Some(Commands::Interactive) => {
                let orchestrator = self.orchestrator().await?;
                InteractiveShell::new(orchestrator).run().await?;
            }
            Some(command) => {
                let orchestrator = self.orchestrator().await?;
                commands::execute_command(&command, &orchestrator).await?;
            }
            None => {
                println!("No command specified. Use --help for available commands.");
                Args::parse_from(["osintkit", "--help"]);
            }
        }

        Ok(())
    }
}

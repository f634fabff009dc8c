use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::osint::SearchOrchestrator;
use crate::reporting::ExportFormat;
use crate::target;

#[derive(Parser)]
#[command(name = "osintkit", version)]
#[command(about = "OSINT reconnaissance for IP addresses, domains and email addresses")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(long, short, global = true, help = "Path to a configuration file")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search a target (IP address, domain or email address)
    Search {
        #[arg(help = "Target to search")]
        target: String,

        #[arg(long, num_args = 0..=1, value_name = "PATH", help = "Export the result, optionally to PATH")]
        export: Option<Option<PathBuf>>,

        #[arg(short, long, value_enum, default_value_t = ExportFormat::Text, help = "Export format")]
        format: ExportFormat,
    },

    /// Show how a target would be classified
    Classify {
        #[arg(help = "Target to classify")]
        target: String,
    },

    /// List recent searches
    History {
        #[arg(short, long, default_value = "10", help = "Number of records to show")]
        limit: usize,
    },

    /// Export a stored search
    Export {
        #[arg(help = "History record id")]
        id: u64,

        #[arg(short, long, help = "Output file path")]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = ExportFormat::Text, help = "Export format")]
        format: ExportFormat,
    },

    /// Initialize the configuration
    Init {
        #[arg(short, long, help = "Force overwrite existing configuration")]
        force: bool,
    },

    /// Start an interactive search session
    Interactive,
}

/// Commands that need a configured orchestrator
pub async fn execute_command(command: &Commands, orchestrator: &SearchOrchestrator) -> Result<()> {
    match command {
        Commands::Search { target, export, format } => {
            handle_search_command(target, export.as_ref(), *format, orchestrator).await
        },
        Commands::History { limit } => {
            handle_history_command(*limit, orchestrator).await
        },
        Commands::Export { id, output, format } => {
            handle_export_command(*id, output.as_deref(), *format, orchestrator).await
        },
        Commands::Classify { target } => {
            handle_classify_command(target);
            Ok(())
        },
        Commands::Init { .. } | Commands::Interactive => {
            Err(anyhow!("Command must be handled by the application"))
        },
    }
}

pub fn handle_classify_command(raw: &str) {
    println!("{}", target::classify(raw));
}

async fn handle_search_command(
    target: &str,
    export: Option<&Option<PathBuf>>,
    format: ExportFormat,
    orchestrator: &SearchOrchestrator,
) -> Result<()> {
    let result = orchestrator.search(target).await;
    print!("{}", orchestrator.exporter().render(&result, ExportFormat::Text)?);

    if let Some(path) = export {
        let written = orchestrator.export(&result, path.as_deref(), format).await?;
        println!("\nResults exported to {}", written.display());
    }

    Ok(())
}

async fn handle_history_command(limit: usize, orchestrator: &SearchOrchestrator) -> Result<()> {
    let records = orchestrator.history(limit).await?;

    if records.is_empty() {
        println!("No searches recorded yet");
        return Ok(());
    }

    println!("{:>5}  {:<19}  {:<7}  {}", "ID", "TIMESTAMP", "TYPE", "TARGET");
    for record in records {
        println!(
            "{:>5}  {:<19}  {:<7}  {}",
            record.id,
            record.timestamp,
            record.target_type.as_str(),
            record.target
        );
    }

    Ok(())
}

async fn handle_export_command(
    id: u64,
    output: Option<&Path>,
    format: ExportFormat,
    orchestrator: &SearchOrchestrator,
) -> Result<()> {
    let record = orchestrator
        .history_record(id)
        .await?
        .ok_or_else(|| anyhow!("No history record with id {}", id))?;

    info!("Exporting history record {} ({})", record.id, record.target);
    let written = orchestrator.export(&record.results, output, format).await?;
    println!("Results exported to {}", written.display());

    Ok(())
}

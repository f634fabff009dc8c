// src/cli/interactive.rs
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use tracing::error;

use crate::error::{OsintError, OsintResult};
use crate::osint::SearchOrchestrator;
use crate::reporting::ExportFormat;

pub struct InteractiveShell {
    orchestrator: SearchOrchestrator,
    theme: ColorfulTheme,
}

impl InteractiveShell {
    pub fn new(orchestrator: SearchOrchestrator) -> Self {
        Self {
            orchestrator,
            theme: ColorfulTheme::default(),
        }
    }

    pub async fn run(&mut self) -> OsintResult<()> {
        println!("osintkit interactive search");
        println!("Enter an IP address, domain or email address. Type 'help' for commands.");

        loop {
            let input: String = Input::with_theme(&self.theme)
                .with_prompt("target")
                .allow_empty(true)
                .interact_text()
                .map_err(|e| OsintError::UnexpectedError(format!("Input error: {}", e)))?;

            match input.trim() {
                "" => continue,
                "exit" | "quit" => break,
                "help" => self.show_help(),
                "history" => self.show_history().await?,
                _ => self.search(&input).await?,
            }
        }

        Ok(())
    }

    fn show_help(&self) {
        println!("Available commands:");
        println!("  <target>     Search an IP address, domain or email address");
        println!("  history      Show the 10 most recent searches");
        println!("  help         Show this help message");
        println!("  exit         Leave the session");
    }

    async fn search(&self, target: &str) -> OsintResult<()> {
        let result = self.orchestrator.search(target.trim()).await;
        println!();
        print!("{}", self.orchestrator.exporter().render(&result, ExportFormat::Text)?);
        println!();

        if !result.is_completed() {
            return Ok(());
        }

        let export = Confirm::with_theme(&self.theme)
            .with_prompt("Export these results?")
            .default(false)
            .interact()
            .map_err(|e| OsintError::UnexpectedError(format!("Confirmation error: {}", e)))?;

        if export {
            match self.orchestrator.export(&result, None, ExportFormat::Text).await {
                Ok(path) => println!("Results exported to {}", path.display()),
                Err(e) => {
                    error!("Export failed: {}", e);
                    println!("Export failed: {}", e);
                }
            }
        }

        Ok(())
    }

    async fn show_history(&self) -> OsintResult<()> {
        let records = self.orchestrator.history(10).await?;

        if records.is_empty() {
            println!("No searches recorded yet");
            return Ok(());
        }

        for record in records {
            println!("{:>5}  {}  {:<7}  {}", record.id, record.timestamp, record.target_type.as_str(), record.target);
        }

        Ok(())
    }
}

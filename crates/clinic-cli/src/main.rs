mod bootstrap_helpers;
mod cli_args;
mod commands;

use std::process::ExitCode;

use clap::Parser;

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;
use crate::commands::execute_cli;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match execute_cli(&cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::debug!(error = ?error, "command failed");
            eprintln!("clinic-access error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

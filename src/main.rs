use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use tracing::instrument::WithSubscriber;

use page_loader::logging;
use page_loader::{HttpClient, PageLoader, PageLoaderCommand, PageRequest, ProgressReporter};

#[tokio::main]
async fn main() -> ExitCode {
    let args = PageLoaderCommand::parse();

    let dispatch = match logging::build_dispatch(&args.log_config()) {
        Ok(dispatch) => dispatch,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    match run(args).with_subscriber(dispatch).await {
        Ok(page_path) => {
            println!("{}", page_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: PageLoaderCommand) -> Result<PathBuf> {
    let client = HttpClient::new(&args.client_config()).context("Failed to build HTTP client")?;
    let reporter = ProgressReporter::new(args.quiet || !std::io::stderr().is_terminal());
    let loader = PageLoader::with_reporter(client, reporter);

    let request = PageRequest::new(args.url, args.output_dir);
    let page_path = loader.download(&request).await?;
    Ok(page_path)
}

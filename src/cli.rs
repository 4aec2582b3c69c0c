use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::client::{ClientConfig, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::logging::LogConfig;

#[derive(Parser, Debug)]
#[command(
    name = "page-loader",
    about = "Download a web page together with its images, stylesheets and scripts",
    version,
    long_about = "Downloads a single page, saves its same-origin images, stylesheets and scripts into a <page>_files directory next to it, and rewrites the page to reference those local copies. Prints the path of the saved page."
)]
pub struct PageLoaderCommand {
    /// The URL of the page to download
    #[arg(required = true, value_parser = parse_page_url)]
    pub url: Url,

    /// Directory to save the page into
    #[arg(short, long = "output", default_value = ".")]
    pub output_dir: PathBuf,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors and hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Timeout for each request in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// User agent string to use for requests
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl PageLoaderCommand {
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            verbosity: self.verbose,
            quiet: self.quiet,
            log_file: self.log_file.clone(),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.timeout),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Accepts absolute http(s) URLs with a host.
fn parse_page_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid URL `{raw}`: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme `{}`, expected http or https", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err(format!("URL `{raw}` has no host"));
    }
    Ok(url)
}

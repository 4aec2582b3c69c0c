pub mod charset;
pub mod cli;
pub mod client;
pub mod downloader;
pub mod error;
pub mod file_manager;
pub mod html_parser;
pub mod logging;
pub mod naming;
pub mod report;

// Re-export main types for convenience
pub use cli::PageLoaderCommand;
pub use client::{ClientConfig, Fetch, FetchResponse, HttpClient};
pub use downloader::{PageLoader, PageRequest};
pub use error::{FetchError, FsError, LoadError};
pub use html_parser::{HtmlParser, ResourceMap, ResourceType, RewrittenPage};
pub use report::{ProgressReporter, Reporter, TracingReporter};

//! Error types for fetching, persisting and the overall page load.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure of a single GET request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS, TCP, TLS, timeout or body-read failure.
    #[error("connection failure fetching {url}: {source}")]
    ConnectionFailure {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The URL cannot be requested: unparseable or not http/https.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The server answered with a non-2xx status.
    #[error("HTTP {code} fetching {url}")]
    HttpStatus { url: String, code: u16 },
}

impl FetchError {
    pub fn connection(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::ConnectionFailure {
            url: url.into(),
            source,
        }
    }

    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn http_status(url: impl Into<String>, code: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            code,
        }
    }

    /// The HTTP status code, for `HttpStatus` failures.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Filesystem failure while validating or writing into the output tree.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such file or directory: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Maps an IO error to the specific variant for its kind.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            io::ErrorKind::NotADirectory => Self::NotADirectory { path },
            _ => Self::Io { path, source },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path }
            | Self::NotADirectory { path }
            | Self::PermissionDenied { path }
            | Self::Io { path, .. } => path,
        }
    }
}

/// Fatal failure of a page load. Per-resource failures never surface here.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid target directory")]
    InvalidTargetDirectory(#[source] FsError),

    #[error("failed to fetch page")]
    PageFetch(#[source] FetchError),

    #[error("failed to write page")]
    PageWrite(#[source] FsError),

    #[error("failed to create resources directory")]
    ResourcesDirectory(#[source] FsError),
}

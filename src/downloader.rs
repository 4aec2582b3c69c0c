use std::path::{Path, PathBuf};

use tracing::{debug, error, info, instrument};
use url::Url;

use crate::client::Fetch;
use crate::error::LoadError;
use crate::file_manager::{self, FileManager};
use crate::html_parser::{HtmlParser, ResourceMap};
use crate::naming;
use crate::report::{Reporter, TracingReporter};

/// One page to mirror into one directory.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub url: Url,
    pub output_dir: PathBuf,
}

impl PageRequest {
    pub fn new(url: Url, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url,
            output_dir: output_dir.into(),
        }
    }
}

/// Downloads a page, rewrites it to use local copies of its same-origin
/// resources, and saves both.
pub struct PageLoader<F, R = TracingReporter> {
    fetcher: F,
    reporter: R,
}

impl<F: Fetch> PageLoader<F, TracingReporter> {
    pub fn new(fetcher: F) -> Self {
        Self::with_reporter(fetcher, TracingReporter)
    }
}

impl<F: Fetch, R: Reporter> PageLoader<F, R> {
    pub fn with_reporter(fetcher: F, reporter: R) -> Self {
        Self { fetcher, reporter }
    }

    /// Runs the whole pipeline and returns the absolute path of the saved page.
    ///
    /// Only the directory check, the page fetch and the page/resources-directory
    /// writes are fatal. A resource that fails to download or save is reported
    /// and skipped, leaving a dangling local reference in the page.
    #[instrument(skip(self, request), fields(url = %request.url))]
    pub async fn download(&self, request: &PageRequest) -> Result<PathBuf, LoadError> {
        let files = FileManager::new(&request.output_dir).map_err(|e| {
            error!(path = %e.path().display(), error = %e, "output directory rejected");
            LoadError::InvalidTargetDirectory(e)
        })?;

        info!(output_dir = %files.base_dir().display(), "fetching page");
        let page = self.fetcher.get(&request.url).await.map_err(|e| {
            error!(error = %e, "page fetch failed");
            LoadError::PageFetch(e)
        })?;
        debug!(
            status = page.status,
            bytes = page.body.len(),
            content_type = page.content_type.as_deref(),
            "page fetched"
        );

        let file_name = naming::to_file_name(&request.url);
        let resources_dir_name = naming::to_directory_name(&file_name);
        let parser = HtmlParser::new(request.url.clone());
        let rewritten = parser.rewrite(
            &resources_dir_name,
            &page.body,
            page.content_type.as_deref(),
        );

        let page_path = files.save_file(&file_name, &rewritten.html).map_err(|e| {
            error!(path = %e.path().display(), error = %e, "page write failed");
            LoadError::PageWrite(e)
        })?;
        self.reporter.page_saved(&page_path);

        let resources_dir = files
            .create_subdirectory(&resources_dir_name)
            .map_err(LoadError::ResourcesDirectory)?;

        self.download_resources(&rewritten.resources, &resources_dir).await;

        Ok(page_path)
    }

    async fn download_resources(&self, resources: &ResourceMap, directory: &Path) {
        self.reporter.resources_planned(resources.len());

        let mut saved = 0;
        let mut failed = 0;
        for (url, file_name) in resources.iter() {
            let response = match self.fetcher.get(url).await {
                Ok(response) => response,
                Err(e) => {
                    failed += 1;
                    self.reporter.resource_failed(url, &e);
                    continue;
                }
            };

            match file_manager::write_file(directory, file_name, &response.body) {
                Ok(path) => {
                    saved += 1;
                    self.reporter.resource_saved(url, &path);
                }
                Err(e) => {
                    failed += 1;
                    self.reporter.resource_failed(url, &e);
                }
            }
        }

        self.reporter.finished(saved, failed);
    }
}

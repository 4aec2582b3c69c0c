//! Turning URLs into flat, filesystem-safe names.
//!
//! A page at `https://www.site.com/blog/` becomes `www-site-com-blog.html`,
//! and its resources directory becomes `www-site-com-blog_files`.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

/// Suffix appended to a page's base name to form its resources directory.
pub const RESOURCES_DIR_SUFFIX: &str = "_files";

/// Extension used when the URL path carries none.
pub const DEFAULT_EXTENSION: &str = ".html";

fn separator_run() -> &'static Regex {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    SEPARATORS.get_or_init(|| Regex::new(r"[^A-Za-z0-9]+").expect("separator pattern is valid"))
}

/// Collapses every run of non-alphanumeric characters into a single `-`
/// and trims dashes at both ends.
///
/// Already-sanitized input is returned unchanged.
pub fn sanitize(raw: &str) -> String {
    separator_run()
        .replace_all(raw, "-")
        .trim_matches('-')
        .to_string()
}

/// Splits the last path segment's extension off, returning `(path_without_ext, ext)`.
///
/// The extension includes its leading dot. Dots in directory segments and
/// leading dots of hidden files (`/.env`) are not extensions.
fn split_extension(path: &str) -> (&str, &str) {
    let segment_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[segment_start..].rfind('.') {
        Some(dot) if dot > 0 && segment_start + dot + 1 < path.len() => {
            path.split_at(segment_start + dot)
        }
        _ => (path, ""),
    }
}

fn host_and_path(url: &Url) -> (String, &str) {
    let host = url.host_str().unwrap_or_default().to_string();
    (host, url.path())
}

/// Sanitized `host + path` of the URL; scheme, query and fragment are dropped.
pub fn to_base_name(url: &Url) -> String {
    let (host, path) = host_and_path(url);
    sanitize(&format!("{host}{path}"))
}

/// Base name of the URL without the path's extension, followed by that
/// extension, or by `.html` when the path has none.
pub fn to_file_name(url: &Url) -> String {
    let (host, path) = host_and_path(url);
    let (stem, extension) = split_extension(path);
    let extension = if extension.is_empty() {
        DEFAULT_EXTENSION
    } else {
        extension
    };
    format!("{}{}", sanitize(&format!("{host}{stem}")), extension)
}

/// Resources directory name for a base or file name: the name without its
/// extension plus [`RESOURCES_DIR_SUFFIX`].
pub fn to_directory_name(name: &str) -> String {
    let (stem, _) = split_extension(name);
    format!("{stem}{RESOURCES_DIR_SUFFIX}")
}

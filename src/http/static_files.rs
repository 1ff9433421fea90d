//! Serving files from a base directory.
//!
//! Request paths are resolved lexically against the base directory before
//! the filesystem is touched: `.` segments are dropped, `..` pops the
//! previous segment, and popping above the base is a traversal attempt.

use std::path::PathBuf;

use percent_encoding::percent_decode_str;
use tokio::fs;

use crate::http::mime;
use crate::http::request::Method;

const INDEX_FILE: &str = "index.html";
const NOT_FOUND_PAGE: &str = "404.html";

/// Outcome of a static lookup.
#[derive(Debug, PartialEq, Eq)]
pub enum StaticLookup {
    /// File contents and their content type.
    Found {
        contents: Vec<u8>,
        content_type: &'static str,
    },
    /// The path escapes the base directory.
    Forbidden,
    /// Nothing to serve; fall through to the route table.
    Missing,
}

#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Looks up the file for a request path.
    ///
    /// Traversal is rejected for every method; files are only served to GET
    /// and HEAD.
    pub async fn lookup(&self, method: &Method, path: &str) -> StaticLookup {
        let relative = match resolve_within_base(path) {
            Some(relative) => relative,
            None => return StaticLookup::Forbidden,
        };

        if !matches!(method, Method::GET | Method::HEAD) {
            return StaticLookup::Missing;
        }

        let relative = if relative.as_os_str().is_empty() {
            PathBuf::from(INDEX_FILE)
        } else {
            relative
        };
        let file = self.base_dir.join(relative);

        match fs::metadata(&file).await {
            Ok(meta) if meta.is_file() => {}
            _ => return StaticLookup::Missing,
        }

        match fs::read(&file).await {
            Ok(contents) => StaticLookup::Found {
                content_type: mime::content_type_for(&file),
                contents,
            },
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Failed to read static file");
                StaticLookup::Missing
            }
        }
    }

    /// Contents of the custom not-found page, if the base directory has one.
    pub async fn not_found_page(&self) -> Option<Vec<u8>> {
        fs::read(self.base_dir.join(NOT_FOUND_PAGE)).await.ok()
    }
}

/// Normalizes a request path into a path relative to the base directory.
///
/// Returns `None` when the path climbs above the base. Segments are
/// percent-decoded first; an undecodable path is left as sent.
pub fn resolve_within_base(path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string());

    let mut stack: Vec<&str> = Vec::new();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop()?;
            }
            other => stack.push(other),
        }
    }

    Some(stack.iter().collect())
}

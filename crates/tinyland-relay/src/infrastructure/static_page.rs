//! The presentation page served at `/`.
//!
//! By default the page compiled into the binary is served.  `--index` swaps
//! it for a file on disk, re-read on every request so edits show up on
//! reload.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::warn;

/// Page served when no `--index` file is configured.
pub const EMBEDDED_INDEX: &str = include_str!("../../static/index.html");

/// Source of the presentation page.
#[derive(Debug, Clone)]
pub enum IndexPage {
    /// The page compiled into the binary.
    Embedded,
    /// A file read from disk on every request.
    File(PathBuf),
}

impl IndexPage {
    /// Picks the embedded page unless a path is configured.
    pub fn from_config(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => IndexPage::File(path),
            None => IndexPage::Embedded,
        }
    }

    /// Loads the page body.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the configured file cannot be read.
    pub async fn load(&self) -> std::io::Result<Vec<u8>> {
        match self {
            IndexPage::Embedded => Ok(EMBEDDED_INDEX.as_bytes().to_vec()),
            IndexPage::File(path) => tokio::fs::read(path).await,
        }
    }
}

/// Responds with the page, or `500` if the configured file is unreadable.
pub async fn serve_index(page: &IndexPage) -> Response {
    match page.load().await {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            warn!("failed to load index page {page:?}: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "index page unavailable\n").into_response()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Error types for search sources

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed feed: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Malformed entry: {0}")]
    InvalidEntry(String),
}

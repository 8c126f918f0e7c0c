//! arXiv data source for paper digests
//!
//! [`SearchSource`] is the seam the source plugin searches through;
//! [`ArxivClient`] implements it against the arXiv Atom API.

pub mod atom;
pub mod client;
pub mod error;
pub mod plugin;

pub use client::ArxivClient;
pub use error::SearchError;
pub use plugin::{ArxivParser, ArxivParserConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paper_digest_core::{Link, Record};

/// A search hit before it becomes a pipeline record
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub entry_id: String,
    pub updated: DateTime<Utc>,
    pub published: DateTime<Utc>,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub comment: Option<String>,
    pub journal_ref: Option<String>,
    pub doi: Option<String>,
    pub primary_category: String,
    pub categories: Vec<String>,
    pub links: Vec<Link>,
    pub pdf_url: Option<String>,
}

impl From<RawRecord> for Record {
    fn from(raw: RawRecord) -> Self {
        let mut record = Record::new(raw.entry_id)
            .with_title(raw.title)
            .with_summary(raw.summary)
            .with_authors(raw.authors);
        record.updated = raw.updated;
        record.published = raw.published;
        record.comment = raw.comment;
        record.journal_ref = raw.journal_ref;
        record.doi = raw.doi;
        record.primary_category = raw.primary_category;
        record.categories = raw.categories;
        record.links = raw.links;
        record.pdf_url = raw.pdf_url;
        record
    }
}

/// Paper search service used by source plugins
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Run `query`, retrying failed requests up to `max_retries` times.
    ///
    /// An empty result is not an error; the service may transiently return
    /// nothing for a query window.
    async fn search(&self, query: &str, max_retries: u32) -> Result<Vec<RawRecord>, SearchError>;
}

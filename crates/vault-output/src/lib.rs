//! Markdown vault output for paper digests
//!
//! Plugins in this crate turn a record collection into files: the JSON-lines
//! result store, plain-text and Markdown digests, per-keyword pages, paper
//! notes with downloaded PDFs, and daily index pages. [`MarkdownMetainfoParser`]
//! closes the loop by reading the reader's checkbox edits back into records.

pub mod checklist;
pub mod downloader;
pub mod index;
pub mod loader;
pub mod metainfo;
pub mod saver;
pub mod table;

pub use checklist::{DownloadChecklistData, DownloadInformationCollector};
pub use downloader::{Downloader, DownloaderConfig, HttpPdfFetcher, PdfFetcher};
pub use index::{DownloadedPaperIndexGenerator, IndexGeneratorConfig};
pub use loader::{ResultsLoader, ResultsLoaderConfig};
pub use metainfo::{MarkdownMetainfoParser, MarkdownMetainfoParserConfig};
pub use saver::{ResultSaver, ResultSaverConfig};
pub use table::{MarkdownTableData, MarkdownTableMaker};

/// Line that opens every paper block in the generated digests
pub const PAPER_SPLIT_LINE: &str = "<!-- paper -->";

/// Front matter of digest pages
pub(crate) fn digest_front_matter(counts: usize) -> String {
    format!("---\nDONE: false\ncounts: {counts}\n---\n\n")
}

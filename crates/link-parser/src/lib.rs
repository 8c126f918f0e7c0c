//! GitHub code-link extraction
//!
//! Finds the first `github.com/<owner>/<repo>` reference in a paper's abstract,
//! falling back to its comment.

pub mod plugin;

pub use plugin::GitHubLinkParser;

use once_cell::sync::Lazy;
use paper_digest_core::{Record, SlotData};
use regex::Regex;
use serde::{Deserialize, Serialize};

static GITHUB_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:www\.)?github\.com/[\w-]+/[\w-]+|(?:www\.)?github\.com/[\w-]+/[\w-]+")
        .expect("GitHub link pattern is valid")
});

/// Slot written by [`GitHubLinkParser`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubLinkData {
    /// First repository link found, empty when none
    pub code_link: String,
}

impl SlotData for GitHubLinkData {
    const PLUGIN_NAME: &'static str = "GitHubLinkParser";
}

/// First GitHub repository link in `text`; bare `github.com/..` gets `https://`
pub fn parse_github_link(text: &str) -> Option<String> {
    let link = GITHUB_LINK.find(text)?.as_str();
    if link.starts_with("http") {
        Some(link.to_string())
    } else {
        Some(format!("https://{link}"))
    }
}

/// Code link of a record: abstract first, then comment
pub fn find_code_link(record: &Record) -> Option<String> {
    parse_github_link(&record.summary)
        .or_else(|| record.comment.as_deref().and_then(parse_github_link))
}

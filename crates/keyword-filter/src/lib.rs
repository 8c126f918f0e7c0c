//! Lexical keyword filter
//!
//! Each keyword is backed by a list of sub-terms. A record matches the keyword
//! when any sub-term occurs in its title or abstract, ignoring case. A sub-term
//! written as `a & b` matches only when every part occurs.

pub mod plugin;

pub use plugin::{DefaultKeywordsFilter, DefaultKeywordsFilterConfig};

use paper_digest_core::{Record, SlotData};
use serde::{Deserialize, Serialize};

/// Slot written by [`DefaultKeywordsFilter`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordsFilterData {
    /// Keywords the record matched, in first-match order
    pub keywords: Vec<String>,

    /// Matched keywords the record should nevertheless be excluded from
    pub ignorance: Vec<String>,
}

impl SlotData for KeywordsFilterData {
    const PLUGIN_NAME: &'static str = "DefaultKeywordsFilter";
}

/// Whether `term` occurs in the record's title or abstract.
///
/// `&`-joined terms require every part; each part may come from either field.
pub fn contains_term(record: &Record, term: &str) -> bool {
    if term.contains('&') {
        return term.split('&').all(|part| contains_term(record, part.trim()));
    }
    let needle = term.to_lowercase();
    record.summary.to_lowercase().contains(&needle) || record.title.to_lowercase().contains(&needle)
}

/// Whether any of `terms` occurs in the record
pub fn contains_any(record: &Record, terms: &[String]) -> bool {
    terms.iter().any(|term| contains_term(record, term))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(title: &str, summary: &str) -> Record {
        Record::new("id").with_title(title).with_summary(summary)
    }

    #[test]
    fn test_single_term_is_case_insensitive() {
        let record = paper("Vision Transformers", "We study images.");
        assert!(contains_term(&record, "vision"));
        assert!(contains_term(&record, "IMAGES"));
        assert!(!contains_term(&record, "audio"));
    }

    #[test]
    fn test_compound_term_needs_every_part() {
        let only_segment = paper("Segment everything", "A method.");
        assert!(!contains_term(&only_segment, "segment & vision"));

        let both = paper("Segment everything", "A computer Vision method.");
        assert!(contains_term(&both, "segment & vision"));
        assert!(contains_term(&both, "segment&vision"));
    }

    #[test]
    fn test_any_of_terms() {
        let record = paper("Diffusion models", "");
        let terms = vec!["gan".to_string(), "diffusion".to_string()];
        assert!(contains_any(&record, &terms));
        assert!(!contains_any(&record, &[]));
    }
}

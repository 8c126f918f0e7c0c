//! arXiv Atom feed parsing

use crate::error::SearchError;
use crate::RawRecord;
use chrono::{DateTime, Utc};
use paper_digest_core::Link;
use roxmltree::{Document, Node};

/// One page of search results
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    pub records: Vec<RawRecord>,

    /// `opensearch:totalResults`, when the feed reports it
    pub total_results: Option<usize>,
}

/// Parse an arXiv API response body
pub fn parse_feed(xml: &str) -> Result<FeedPage, SearchError> {
    let doc = Document::parse(xml)?;
    let feed = doc.root_element();

    let total_results = child(feed, "totalResults")
        .and_then(|n| n.text())
        .and_then(|t| t.trim().parse().ok());

    let mut records = Vec::new();
    for entry in feed.children().filter(|n| is(n, "entry")) {
        let id = child_text(entry, "id").unwrap_or_default();
        if id.contains("/api/errors") {
            let message = child_text(entry, "summary").unwrap_or_default();
            return Err(SearchError::Api { status: 400, body: message });
        }
        records.push(parse_entry(entry, id)?);
    }

    Ok(FeedPage {
        records,
        total_results,
    })
}

fn parse_entry(entry: Node, entry_id: String) -> Result<RawRecord, SearchError> {
    let updated = timestamp(entry, "updated", &entry_id)?;
    let published = timestamp(entry, "published", &entry_id)?;

    let authors = entry
        .children()
        .filter(|n| is(n, "author"))
        .filter_map(|a| child_text(a, "name"))
        .collect();

    let links: Vec<Link> = entry
        .children()
        .filter(|n| is(n, "link"))
        .filter_map(|n| {
            let href = n.attribute("href")?;
            Some(Link {
                href: href.to_string(),
                title: n.attribute("title").map(str::to_string),
                rel: n.attribute("rel").unwrap_or_default().to_string(),
                content_type: n.attribute("type").map(str::to_string),
            })
        })
        .collect();
    let pdf_url = links
        .iter()
        .find(|l| l.title.as_deref() == Some("pdf"))
        .map(|l| l.href.clone());

    let primary_category = child(entry, "primary_category")
        .and_then(|n| n.attribute("term"))
        .unwrap_or_default()
        .to_string();
    let categories = entry
        .children()
        .filter(|n| is(n, "category"))
        .filter_map(|n| n.attribute("term").map(str::to_string))
        .collect();

    Ok(RawRecord {
        entry_id,
        updated,
        published,
        title: collapse_whitespace(&child_text(entry, "title").unwrap_or_default()),
        authors,
        summary: child_text(entry, "summary").unwrap_or_default(),
        comment: child_text(entry, "comment"),
        journal_ref: child_text(entry, "journal_ref"),
        doi: child_text(entry, "doi"),
        primary_category,
        categories,
        links,
        pdf_url,
    })
}

fn is(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is(n, name))
}

fn child_text(node: Node, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
}

fn timestamp(entry: Node, name: &str, entry_id: &str) -> Result<DateTime<Utc>, SearchError> {
    let raw = child_text(entry, name).unwrap_or_default();
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SearchError::InvalidEntry(format!("{entry_id}: bad <{name}> '{raw}': {e}")))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

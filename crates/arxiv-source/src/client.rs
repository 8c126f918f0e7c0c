//! HTTP client for the arXiv query API

use crate::atom::{parse_feed, FeedPage};
use crate::error::SearchError;
use crate::{RawRecord, SearchSource};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_ENDPOINT: &str = "http://export.arxiv.org/api/query";

/// Paged client sorted by last-updated date, newest first
#[derive(Debug, Clone)]
pub struct ArxivClient {
    client: Client,
    endpoint: String,

    /// Entries requested per page
    page_size: usize,

    /// Upper bound on entries collected per search
    max_results: usize,

    /// Pause between page requests and between retries
    delay: Duration,
}

impl ArxivClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            page_size: 100,
            max_results: 10_000,
            delay: Duration::from_secs(3),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn fetch_page(&self, query: &str, start: usize) -> Result<FeedPage, SearchError> {
        let start_param = start.to_string();
        let size_param = self.page_size.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("search_query", query),
                ("start", start_param.as_str()),
                ("max_results", size_param.as_str()),
                ("sortBy", "lastUpdatedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                body,
            });
        }
        parse_feed(&response.text().await?)
    }

    /// Fetch one page, retrying failures and unexpectedly empty pages
    async fn fetch_page_with_retries(
        &self,
        query: &str,
        start: usize,
        max_retries: u32,
    ) -> Result<FeedPage, SearchError> {
        let mut attempt = 0;
        loop {
            let result = self.fetch_page(query, start).await;
            let retryable = match &result {
                Ok(page) => page.records.is_empty() && start > 0,
                Err(_) => true,
            };
            if !retryable || attempt >= max_retries {
                return result;
            }
            attempt += 1;
            match &result {
                Err(e) => warn!("Page at offset {} failed ({}), retry {}/{}", start, e, attempt, max_retries),
                Ok(_) => warn!("Page at offset {} came back empty, retry {}/{}", start, attempt, max_retries),
            }
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchSource for ArxivClient {
    async fn search(&self, query: &str, max_retries: u32) -> Result<Vec<RawRecord>, SearchError> {
        info!("Searching arXiv: {}", query);
        let mut records = Vec::new();
        let mut start = 0;

        while records.len() < self.max_results {
            if start > 0 {
                tokio::time::sleep(self.delay).await;
            }
            let page = self
                .fetch_page_with_retries(query, start, max_retries)
                .await?;
            let fetched = page.records.len();
            debug!("Fetched {} entries at offset {}", fetched, start);
            records.extend(page.records);

            let total = page.total_results.unwrap_or(usize::MAX).min(self.max_results);
            start += fetched;
            if fetched < self.page_size || start >= total {
                break;
            }
        }

        records.truncate(self.max_results);
        Ok(records)
    }
}

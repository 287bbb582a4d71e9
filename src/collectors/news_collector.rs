// =============================================================================
// News Collector — RSS ingestion and stock mention extraction
// =============================================================================
//
// Fetches configured RSS feeds, dedupes by URL, extracts mentioned stocks by
// case-insensitive word-boundary match against known symbols/company names,
// and hands unclassified articles to the sentiment classifier in small
// bounded batches. Each feed fetch is wrapped in `#[instrument]` +
// `anyhow::Context` so one bad feed never aborts the whole collection run.
// =============================================================================

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use tracing::{info, warn};
use uuid::Uuid;

use crate::sentiment::SentimentClassifier;
use crate::store::news_store::NewsStore;
use crate::types::{NewsArticle, Stock};

const CLASSIFICATION_BATCH_SIZE: usize = 5;

pub struct NewsCollector {
    client: reqwest::Client,
    feed_urls: Vec<String>,
}

impl NewsCollector {
    pub fn new(feed_urls: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self { client, feed_urls }
    }

    /// Fetches every configured feed, persisting new articles and returning
    /// how many were newly inserted. A single feed failure is logged and
    /// skipped rather than aborting the whole run.
    pub async fn collect(&self, store: &dyn NewsStore, stocks: &[Stock]) -> Result<usize> {
        let mut inserted = 0;

        for feed_url in &self.feed_urls {
            match self.fetch_feed(feed_url, stocks).await {
                Ok(articles) => {
                    for article in articles {
                        if store.insert_if_new(article).await? {
                            inserted += 1;
                        }
                    }
                }
                Err(err) => warn!(feed_url, error = %err, "failed to fetch news feed"),
            }
        }

        Ok(inserted)
    }

    async fn fetch_feed(&self, feed_url: &str, stocks: &[Stock]) -> Result<Vec<NewsArticle>> {
        let bytes = self
            .client
            .get(feed_url)
            .send()
            .await
            .with_context(|| format!("GET {feed_url} failed"))?
            .bytes()
            .await
            .context("failed to read feed body")?;

        let channel = rss::Channel::read_from(&bytes[..])
            .with_context(|| format!("failed to parse RSS channel at {feed_url}"))?;

        let source = channel.title().to_string();
        let mut articles = Vec::new();

        for item in channel.items() {
            let Some(url) = item.link() else { continue };
            let title = item.title().unwrap_or_default().to_string();
            let body = item
                .description()
                .or_else(|| item.content())
                .unwrap_or_default()
                .to_string();
            let published_at = parse_pub_date(item.pub_date()).unwrap_or_else(Utc::now);
            let mentioned_stocks = extract_mentioned_stocks(&title, &body, stocks);

            articles.push(NewsArticle {
                id: Uuid::new_v4().to_string(),
                source: source.clone(),
                url: url.to_string(),
                published_at,
                title,
                body,
                mentioned_stocks,
                classification: None,
            });
        }

        Ok(articles)
    }

    /// Classifies up to `CLASSIFICATION_BATCH_SIZE` unclassified articles.
    /// A single classification failure does not prevent the rest of the
    /// batch from being attempted.
    pub async fn classify_pending(
        &self,
        store: &dyn NewsStore,
        classifier: &dyn SentimentClassifier,
    ) -> Result<usize> {
        let pending = store.list_unclassified(CLASSIFICATION_BATCH_SIZE).await?;
        let mut classified = 0;

        for article in pending {
            match classifier.classify(&article).await {
                Ok(classification) => {
                    store.attach_classification(&article.id, classification).await?;
                    classified += 1;
                }
                Err(err) => warn!(article_id = %article.id, error = %err, "classification failed"),
            }
        }

        info!(classified, "news classification batch complete");
        Ok(classified)
    }
}

fn parse_pub_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    DateTime::parse_from_rfc2822(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Matches stock symbols and company names against title/body text,
/// case-insensitive, on word boundaries.
fn extract_mentioned_stocks(title: &str, body: &str, stocks: &[Stock]) -> HashSet<String> {
    let haystack = format!("{title} {body}");
    let mut mentioned = HashSet::new();

    for stock in stocks {
        if word_boundary_match(&haystack, &stock.symbol) || word_boundary_match(&haystack, &stock.name) {
            mentioned.insert(stock.symbol.clone());
        }
    }

    mentioned
}

fn word_boundary_match(haystack: &str, needle: &str) -> bool {
    if needle.trim().is_empty() {
        return false;
    }
    let pattern = format!(r"\b{}\b", regex::escape(needle));
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}

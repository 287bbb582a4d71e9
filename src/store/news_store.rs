// =============================================================================
// NewsStore — article repository
// =============================================================================

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::{Classification, NewsArticle};

#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Inserts `article` unless an article with the same URL already exists.
    /// Returns `true` if it was newly inserted.
    async fn insert_if_new(&self, article: NewsArticle) -> anyhow::Result<bool>;

    /// Lists up to `limit` articles that have no classification yet.
    async fn list_unclassified(&self, limit: usize) -> anyhow::Result<Vec<NewsArticle>>;

    /// Attaches a classification to the article identified by `id`.
    async fn attach_classification(&self, id: &str, classification: Classification) -> anyhow::Result<()>;

    /// Lists articles mentioning `symbol` published after `since`.
    async fn list_for_symbol(
        &self,
        symbol: &str,
        since: chrono::DateTime<chrono::Utc>,
    ) -> anyhow::Result<Vec<NewsArticle>>;
}

#[derive(Default)]
pub struct InMemoryNewsStore {
    articles: RwLock<Vec<NewsArticle>>,
}

impl InMemoryNewsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NewsStore for InMemoryNewsStore {
    async fn insert_if_new(&self, article: NewsArticle) -> anyhow::Result<bool> {
        let mut articles = self.articles.write();
        if articles.iter().any(|a| a.url == article.url) {
            return Ok(false);
        }
        articles.push(article);
        Ok(true)
    }

    async fn list_unclassified(&self, limit: usize) -> anyhow::Result<Vec<NewsArticle>> {
        let articles = self.articles.read();
        Ok(articles
            .iter()
            .filter(|a| a.classification.is_none())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn attach_classification(&self, id: &str, classification: Classification) -> anyhow::Result<()> {
        let mut articles = self.articles.write();
        let article = articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| anyhow::anyhow!("no article with id {id}"))?;
        article.classification = Some(classification);
        Ok(())
    }

    async fn list_for_symbol(
        &self,
        symbol: &str,
        since: chrono::DateTime<chrono::Utc>,
    ) -> anyhow::Result<Vec<NewsArticle>> {
        let articles = self.articles.read();
        Ok(articles
            .iter()
            .filter(|a| a.published_at >= since && a.mentioned_stocks.contains(symbol))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;

    fn article(url: &str) -> NewsArticle {
        NewsArticle {
            id: uuid::Uuid::new_v4().to_string(),
            source: "bankier".into(),
            url: url.into(),
            published_at: Utc::now(),
            title: "title".into(),
            body: "body".into(),
            mentioned_stocks: HashSet::from(["CDR".to_string()]),
            classification: None,
        }
    }

    #[tokio::test]
    async fn insert_if_new_deduplicates_by_url() {
        let store = InMemoryNewsStore::new();
        assert!(store.insert_if_new(article("https://a")).await.unwrap());
        assert!(!store.insert_if_new(article("https://a")).await.unwrap());
    }

    #[tokio::test]
    async fn list_unclassified_excludes_classified() {
        let store = InMemoryNewsStore::new();
        let a = article("https://a");
        let id = a.id.clone();
        store.insert_if_new(a).await.unwrap();
        assert_eq!(store.list_unclassified(10).await.unwrap().len(), 1);

        store
            .attach_classification(
                &id,
                Classification {
                    overall_sentiment: crate::types::Sentiment::Neutral,
                    sentiment_score: 0.0,
                    confidence: 1.0,
                    impact: crate::types::Impact::Minimal,
                    per_stock: vec![],
                },
            )
            .await
            .unwrap();
        assert_eq!(store.list_unclassified(10).await.unwrap().len(), 0);
    }
}

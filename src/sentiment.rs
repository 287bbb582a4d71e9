// =============================================================================
// Sentiment Classifier adapter
// =============================================================================
//
// The concrete providers (cloud LLM, local LLM) are external services; the
// engine treats them as opaque behind this trait so a provider outage never
// blocks the rest of the pipeline.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use crate::errors::EngineError;
use crate::types::{Classification, Impact, NewsArticle, Sentiment, StockSentiment};

const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// Provider-specific classification call, with no deadline of its own.
    async fn classify_raw(&self, article: &NewsArticle) -> anyhow::Result<Classification>;

    /// Classifies `article` under a per-call deadline. A timeout or provider
    /// failure is reported as `TransientExternal` so the caller retries on
    /// the next cycle; a provider that can detect a non-retryable failure
    /// (bad input, quota exhausted for good) should override this method and
    /// return a different `EngineError` variant instead.
    async fn classify(&self, article: &NewsArticle) -> Result<Classification, EngineError> {
        match timeout(CLASSIFY_TIMEOUT, self.classify_raw(article)).await {
            Ok(Ok(classification)) => Ok(classification),
            Ok(Err(err)) => Err(EngineError::TransientExternal(err.to_string())),
            Err(_) => Err(EngineError::TransientExternal(format!(
                "classification timed out after {CLASSIFY_TIMEOUT:?}"
            ))),
        }
    }
}

/// Default provider: returns `neutral/minimal` with relevance 1.0 for every
/// mentioned stock. Yields well-defined zero-news behaviour everywhere
/// downstream.
pub struct StubClassifier;

#[async_trait]
impl SentimentClassifier for StubClassifier {
    async fn classify_raw(&self, article: &NewsArticle) -> anyhow::Result<Classification> {
        let per_stock = article
            .mentioned_stocks
            .iter()
            .map(|symbol| StockSentiment {
                symbol: symbol.clone(),
                sentiment_score: 0.0,
                confidence: 0.0,
                relevance: 1.0,
            })
            .collect();

        Ok(Classification {
            overall_sentiment: Sentiment::Neutral,
            sentiment_score: 0.0,
            confidence: 0.0,
            impact: Impact::Minimal,
            per_stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn stub_classifier_yields_neutral_minimal() {
        let article = NewsArticle {
            id: "a1".into(),
            source: "bankier".into(),
            url: "https://x".into(),
            published_at: chrono::Utc::now(),
            title: "t".into(),
            body: "b".into(),
            mentioned_stocks: HashSet::from(["CDR".to_string()]),
            classification: None,
        };
        let classification = StubClassifier.classify(&article).await.unwrap();
        assert_eq!(classification.overall_sentiment, Sentiment::Neutral);
        assert_eq!(classification.impact, Impact::Minimal);
        assert_eq!(classification.per_stock.len(), 1);
        assert_eq!(classification.per_stock[0].relevance, 1.0);
    }

    struct FailingClassifier;

    #[async_trait]
    impl SentimentClassifier for FailingClassifier {
        async fn classify_raw(&self, _article: &NewsArticle) -> anyhow::Result<Classification> {
            anyhow::bail!("provider unreachable")
        }
    }

    #[tokio::test]
    async fn provider_failure_is_reported_as_transient() {
        let article = NewsArticle {
            id: "a1".into(),
            source: "bankier".into(),
            url: "https://x".into(),
            published_at: chrono::Utc::now(),
            title: "t".into(),
            body: "b".into(),
            mentioned_stocks: HashSet::new(),
            classification: None,
        };
        let err = FailingClassifier.classify(&article).await.unwrap_err();
        assert!(matches!(err, EngineError::TransientExternal(_)));
    }
}

// =============================================================================
// Time-Weighted News Analyzer
// =============================================================================
//
// Aggregates per-stock sentiment from classified articles with an
// exponential time-decay weight: `(-elapsed * ln(2) / half_life).exp()`,
// where elapsed is an article's age in minutes against the current time.
// =============================================================================

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Impact, NewsArticle};

/// Named news-weighting profiles. Each carries its own half-life and
/// 4-bucket piecewise recency weights (<=15m, <=60m, <=240m, >240m), which
/// must sum to 1 within a 0.05 tolerance — checked every time a profile's
/// parameters are read, so a mistyped table is caught immediately rather
/// than silently skewing the weighted sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NewsProfile {
    IntradayAggressive,
    IntradayDefault,
    IntradayConservative,
    Swing,
}

struct ProfileParams {
    half_life_minutes: f64,
    period_weights: [f64; 4],
}

impl NewsProfile {
    fn params(&self) -> ProfileParams {
        let params = match self {
            // Weights recent news heavily; short half-life suits fast intraday reaction.
            NewsProfile::IntradayAggressive => {
                ProfileParams { half_life_minutes: 60.0, period_weights: [0.55, 0.25, 0.15, 0.05] }
            }
            NewsProfile::IntradayDefault => {
                ProfileParams { half_life_minutes: 120.0, period_weights: [0.40, 0.30, 0.20, 0.10] }
            }
            NewsProfile::IntradayConservative => {
                ProfileParams { half_life_minutes: 180.0, period_weights: [0.30, 0.30, 0.25, 0.15] }
            }
            // Longer half-life and flatter recency curve suits multi-day holding.
            NewsProfile::Swing => {
                ProfileParams { half_life_minutes: 720.0, period_weights: [0.15, 0.25, 0.30, 0.30] }
            }
        };

        let sum: f64 = params.period_weights.iter().sum();
        assert!(
            (sum - 1.0).abs() <= 0.05,
            "news profile {self:?} piecewise weights must sum to 1 +/- 0.05, got {sum}"
        );
        params
    }

    fn half_life_minutes(&self) -> f64 {
        self.params().half_life_minutes
    }

    fn period_weight(&self, age_minutes: f64) -> f64 {
        let p = self.params();
        if age_minutes <= 15.0 {
            p.period_weights[0]
        } else if age_minutes <= 60.0 {
            p.period_weights[1]
        } else if age_minutes <= 240.0 {
            p.period_weights[2]
        } else {
            p.period_weights[3]
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewsAggregate {
    pub weighted_sentiment: f64,
    pub total_weight: f64,
    pub article_count: usize,
    pub momentum: f64,
    pub impact: Impact,
    pub summary: String,
}

/// Half-life decay weight.
fn decay_weight(age_minutes: f64, half_life_minutes: f64) -> f64 {
    if half_life_minutes <= 0.0 {
        return 0.0;
    }
    (-age_minutes * std::f64::consts::LN_2 / half_life_minutes).exp()
}

/// Market-hours multiplier: open session 1.5x, pre-market 1.2x, else 1.0x.
fn market_hours_multiplier(published_at_local: NaiveTime) -> f64 {
    let open = crate::clock::SESSION_OPEN;
    let close = crate::clock::SESSION_CLOSE;
    let pre_market_start = NaiveTime::from_hms_opt(7, 0, 0).unwrap();

    if published_at_local >= open && published_at_local <= close {
        1.5
    } else if published_at_local >= pre_market_start && published_at_local < open {
        1.2
    } else {
        1.0
    }
}

fn breaking_news_multiplier(impact: Impact, age_minutes: f64) -> f64 {
    if matches!(impact, Impact::High | Impact::VeryHigh) && age_minutes <= 60.0 {
        2.0
    } else {
        1.0
    }
}

fn source_weight(source: &str, weights: &std::collections::HashMap<String, f64>) -> f64 {
    *weights.get(source).unwrap_or(&1.0)
}

/// Aggregates sentiment for `symbol` from `articles` (already filtered to
/// those mentioning it), as of `now`, using `profile`'s half-life/recency
/// weighting and the configured per-source weight overrides.
pub fn aggregate(
    symbol: &str,
    articles: &[NewsArticle],
    now: DateTime<Utc>,
    profile: NewsProfile,
    source_weights: &std::collections::HashMap<String, f64>,
) -> Option<NewsAggregate> {
    let relevant: Vec<&NewsArticle> = articles
        .iter()
        .filter(|a| a.mentioned_stocks.contains(symbol) && a.classification.is_some())
        .collect();

    if relevant.is_empty() {
        return None;
    }

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    let mut recent_sum = 0.0;
    let mut recent_weight = 0.0;
    let mut older_sum = 0.0;
    let mut older_weight = 0.0;
    let mut max_impact = Impact::Minimal;

    for article in &relevant {
        let classification = article.classification.as_ref().unwrap();
        let per_stock = classification
            .per_stock
            .iter()
            .find(|s| s.symbol == symbol);
        let sentiment = per_stock.map(|s| s.sentiment_score).unwrap_or(classification.sentiment_score);

        let age_minutes = (now - article.published_at).num_seconds() as f64 / 60.0;
        if age_minutes < 0.0 {
            continue;
        }

        let local_time = article.published_at.with_timezone(&chrono_tz::Europe::Warsaw).time();
        let w = source_weight(&article.source, source_weights)
            * profile.period_weight(age_minutes)
            * classification.impact.weight()
            * decay_weight(age_minutes, profile.half_life_minutes())
            * breaking_news_multiplier(classification.impact, age_minutes)
            * market_hours_multiplier(local_time);

        weighted_sum += sentiment * w;
        total_weight += w;

        if age_minutes <= 120.0 {
            recent_sum += sentiment * w;
            recent_weight += w;
        } else {
            older_sum += sentiment * w;
            older_weight += w;
        }

        if classification.impact > max_impact {
            max_impact = classification.impact;
        }
    }

    if total_weight == 0.0 {
        return None;
    }

    let recent_avg = if recent_weight > 0.0 { recent_sum / recent_weight } else { 0.0 };
    let older_avg = if older_weight > 0.0 { older_sum / older_weight } else { recent_avg };
    let weighted_sentiment = weighted_sum / total_weight;

    let dominant_sentiment = if weighted_sentiment >= 0.2 {
        "positive"
    } else if weighted_sentiment <= -0.2 {
        "negative"
    } else {
        "neutral"
    };
    let summary = format!(
        "{count} article(s), {dominant_sentiment} sentiment, {max_impact:?} impact",
        count = relevant.len(),
    );

    Some(NewsAggregate {
        weighted_sentiment,
        total_weight,
        article_count: relevant.len(),
        momentum: recent_avg - older_avg,
        impact: max_impact,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Classification, Sentiment, StockSentiment};
    use std::collections::{HashMap, HashSet};

    fn article(symbol: &str, sentiment: f64, impact: Impact, age_minutes: i64, now: DateTime<Utc>) -> NewsArticle {
        NewsArticle {
            id: uuid::Uuid::new_v4().to_string(),
            source: "bankier".into(),
            url: format!("https://x/{}", uuid::Uuid::new_v4()),
            published_at: now - chrono::Duration::minutes(age_minutes),
            title: "t".into(),
            body: "b".into(),
            mentioned_stocks: HashSet::from([symbol.to_string()]),
            classification: Some(Classification {
                overall_sentiment: if sentiment >= 0.0 { Sentiment::Positive } else { Sentiment::Negative },
                sentiment_score: sentiment,
                confidence: 0.9,
                impact,
                per_stock: vec![StockSentiment {
                    symbol: symbol.to_string(),
                    sentiment_score: sentiment,
                    confidence: 0.9,
                    relevance: 1.0,
                }],
            }),
        }
    }

    #[test]
    fn empty_articles_yields_none() {
        let now = Utc::now();
        assert!(aggregate("CDR", &[], now, NewsProfile::IntradayDefault, &HashMap::new()).is_none());
    }

    #[test]
    fn single_recent_positive_article_is_positive() {
        let now = Utc::now();
        let articles = vec![article("CDR", 0.8, Impact::High, 10, now)];
        let agg = aggregate("CDR", &articles, now, NewsProfile::IntradayDefault, &HashMap::new()).unwrap();
        assert!(agg.weighted_sentiment > 0.0);
        assert_eq!(agg.article_count, 1);
        assert!(agg.summary.contains("positive"));
    }

    #[test]
    fn older_article_contributes_less_than_fresh_one() {
        let now = Utc::now();
        let fresh = vec![article("CDR", 0.8, Impact::Medium, 5, now)];
        let stale = vec![article("CDR", 0.8, Impact::Medium, 300, now)];
        let agg_fresh = aggregate("CDR", &fresh, now, NewsProfile::IntradayDefault, &HashMap::new()).unwrap();
        let agg_stale = aggregate("CDR", &stale, now, NewsProfile::IntradayDefault, &HashMap::new()).unwrap();
        assert!(agg_fresh.total_weight > agg_stale.total_weight);
    }

    #[test]
    fn decay_weight_halves_at_half_life() {
        let w_at_zero = decay_weight(0.0, 120.0);
        let w_at_half_life = decay_weight(120.0, 120.0);
        assert!((w_at_zero - 1.0).abs() < 1e-9);
        assert!((w_at_half_life - 0.5).abs() < 1e-9);
    }

    #[test]
    fn every_profile_has_weights_summing_to_one() {
        for profile in [
            NewsProfile::IntradayAggressive,
            NewsProfile::IntradayDefault,
            NewsProfile::IntradayConservative,
            NewsProfile::Swing,
        ] {
            let sum: f64 = profile.params().period_weights.iter().sum();
            assert!((sum - 1.0).abs() <= 0.05, "{profile:?} weights sum to {sum}");
        }
    }
}

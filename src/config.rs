// =============================================================================
// Engine Configuration — hot-reloadable settings with atomic save
// =============================================================================
//
// Central configuration hub for the GPW signal engine. Every tunable
// parameter lives here so the engine can be reconfigured without a restart.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry a serde default so adding new fields never breaks
// loading an older config file.
// =============================================================================

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::news_analyzer::NewsProfile;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_tick_interval_seconds() -> u64 {
    60
}

fn default_signal_profile() -> SignalProfile {
    SignalProfile::Balanced
}

fn default_news_profile() -> NewsProfile {
    NewsProfile::IntradayDefault
}

fn default_source_weights() -> HashMap<String, f64> {
    HashMap::new()
}

fn default_feed_urls() -> Vec<String> {
    Vec::new()
}

fn default_max_concurrency() -> usize {
    8
}

fn default_retry_backoff_seconds() -> u64 {
    30
}

fn default_session_open() -> NaiveTime {
    crate::clock::SESSION_OPEN
}

fn default_session_close() -> NaiveTime {
    crate::clock::SESSION_CLOSE
}

fn default_extra_holidays() -> Vec<chrono::NaiveDate> {
    Vec::new()
}

fn default_news_confidence_boost() -> u8 {
    15
}

// =============================================================================
// SignalProfile
// =============================================================================

/// Selects the magnitude of confidence adjustments applied by the news
/// adjustment step of the signal generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalProfile {
    Conservative,
    Balanced,
    Aggressive,
}

impl SignalProfile {
    pub fn boost_multiplier(&self) -> f64 {
        match self {
            SignalProfile::Conservative => 0.7,
            SignalProfile::Balanced => 1.0,
            SignalProfile::Aggressive => 1.3,
        }
    }
}

// =============================================================================
// NewsConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_news_profile")]
    pub profile: NewsProfile,

    #[serde(default = "default_source_weights")]
    pub source_weights: HashMap<String, f64>,

    #[serde(default = "default_news_confidence_boost")]
    pub confidence_boost: u8,

    /// RSS/Atom feed URLs polled by the news collector. Distinct from
    /// `source_weights`, which maps a feed *id* to a sentiment weight.
    #[serde(default = "default_feed_urls")]
    pub feed_urls: Vec<String>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            profile: default_news_profile(),
            source_weights: default_source_weights(),
            confidence_boost: default_news_confidence_boost(),
            feed_urls: default_feed_urls(),
        }
    }
}

// =============================================================================
// CollectorConfig / DispatchConfig / SessionConfig / CalendarConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_retry_backoff_seconds")]
    pub retry_backoff_seconds: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            retry_backoff_seconds: default_retry_backoff_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_open")]
    pub open_local: NaiveTime,

    #[serde(default = "default_session_close")]
    pub close_local: NaiveTime,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            open_local: default_session_open(),
            close_local: default_session_close(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_extra_holidays")]
    pub extra_holidays: Vec<chrono::NaiveDate>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            extra_holidays: default_extra_holidays(),
        }
    }
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Top-level runtime configuration for the GPW signal engine.
///
/// Every field has a serde default so older JSON files missing new fields
/// still deserialise correctly. Secrets (bot token, SMTP credentials) are
/// never part of this struct — they are read from the environment only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_tick_interval_seconds")]
    pub tick_interval_seconds: u64,

    #[serde(default = "default_signal_profile")]
    pub signal_profile: SignalProfile,

    #[serde(default)]
    pub news: NewsConfig,

    #[serde(default)]
    pub collector: CollectorConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval_seconds(),
            signal_profile: default_signal_profile(),
            news: NewsConfig::default(),
            collector: CollectorConfig::default(),
            dispatch: DispatchConfig::default(),
            session: SessionConfig::default(),
            calendar: CalendarConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        info!(
            path = %path.display(),
            profile = ?config.signal_profile,
            "engine config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise engine config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.tick_interval_seconds, 60);
        assert_eq!(cfg.signal_profile, SignalProfile::Balanced);
        assert_eq!(cfg.news.profile, NewsProfile::IntradayDefault);
        assert_eq!(cfg.collector.max_concurrency, 8);
        assert_eq!(cfg.dispatch.retry_backoff_seconds, 30);
        assert_eq!(cfg.session.open_local, crate::clock::SESSION_OPEN);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.signal_profile, SignalProfile::Balanced);
        assert_eq!(cfg.news.profile, NewsProfile::IntradayDefault);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "signal_profile": "aggressive", "news": { "profile": "intraday-aggressive" } }"#;
        let cfg: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.signal_profile, SignalProfile::Aggressive);
        assert_eq!(cfg.news.profile, NewsProfile::IntradayAggressive);
        assert_eq!(cfg.collector.max_concurrency, 8);
    }

    #[test]
    fn roundtrip_serialisation() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.tick_interval_seconds, cfg2.tick_interval_seconds);
        assert_eq!(cfg.signal_profile, cfg2.signal_profile);
    }

    #[test]
    fn profile_boost_multiplier_ordering() {
        assert!(
            SignalProfile::Aggressive.boost_multiplier() > SignalProfile::Balanced.boost_multiplier()
        );
        assert!(
            SignalProfile::Balanced.boost_multiplier() > SignalProfile::Conservative.boost_multiplier()
        );
    }
}

// =============================================================================
// Engine — central composition root
// =============================================================================
//
// Arc-wrapped subsystem handles behind one struct, an `AtomicU64` version
// counter bumped on every meaningful mutation, and a bounded ring-buffer
// error log. No snapshot/WebSocket push layer here — the CLI reads state
// directly from the stores on each invocation.
// =============================================================================

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use crate::clock::{Calendar, Clock, SystemClock};
use crate::config::EngineConfig;
use crate::dispatch::DeliveryLog;
use crate::scheduler::{ScheduleConfig, Scheduler, WEEKDAYS};
use crate::sentiment::SentimentClassifier;
use crate::store::{
    InMemoryNewsStore, InMemoryOhlcvStore, InMemorySignalStore, InMemoryUserStore, NewsStore, OhlcvStore,
    SignalStore, UserStore,
};
use crate::types::ScheduleKind;

const MAX_RECENT_ERRORS: usize = 50;

/// Default schedule cadences: price every 5 minutes, news/signals/outcomes
/// every 30 minutes, all confined to the trading session and weekdays.
fn default_schedules(active_hours: Option<(chrono::NaiveTime, chrono::NaiveTime)>) -> Vec<ScheduleConfig> {
    let windowed = |kind, interval_minutes| ScheduleConfig {
        kind,
        interval_minutes,
        active_hours,
        active_days: WEEKDAYS,
        respect_holidays: true,
    };

    vec![
        windowed(ScheduleKind::Price, 5),
        windowed(ScheduleKind::News, 30),
        windowed(ScheduleKind::Signals, 30),
        windowed(ScheduleKind::Outcomes, 30),
    ]
}

#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub message: String,
    pub kind: String,
    pub at: chrono::DateTime<Utc>,
}

/// Central composition root shared across the CLI's subcommands via `Arc`.
pub struct Engine {
    pub version: AtomicU64,
    pub config: RwLock<EngineConfig>,
    pub clock: Arc<dyn Clock>,
    pub calendar: Calendar,

    pub ohlcv_store: Arc<dyn OhlcvStore>,
    pub signal_store: Arc<dyn SignalStore>,
    pub news_store: Arc<dyn NewsStore>,
    pub user_store: Arc<dyn UserStore>,

    pub classifier: Arc<dyn SentimentClassifier>,
    pub delivery_log: DeliveryLog,
    pub scheduler: Scheduler,

    recent_errors: RwLock<VecDeque<ErrorRecord>>,
}

impl Engine {
    pub fn new(config: EngineConfig, classifier: Arc<dyn SentimentClassifier>) -> Self {
        Self::with_users(config, classifier, Vec::new())
    }

    pub fn with_users(
        config: EngineConfig,
        classifier: Arc<dyn SentimentClassifier>,
        initial_users: Vec<crate::types::UserPreferences>,
    ) -> Self {
        let calendar = Calendar::new(
            config.session.open_local,
            config.session.close_local,
            config.calendar.extra_holidays.clone(),
        );
        let active_hours = Some((config.session.open_local, config.session.close_local));
        let scheduler = Scheduler::new(
            calendar.clone(),
            default_schedules(active_hours),
            Utc::now(),
        );

        Self {
            version: AtomicU64::new(0),
            config: RwLock::new(config),
            clock: Arc::new(SystemClock),
            calendar,
            ohlcv_store: Arc::new(InMemoryOhlcvStore::default()),
            signal_store: Arc::new(InMemorySignalStore::default()),
            news_store: Arc::new(InMemoryNewsStore::default()),
            user_store: Arc::new(InMemoryUserStore::with_users(initial_users)),
            classifier,
            delivery_log: DeliveryLog::new(),
            scheduler,
            recent_errors: RwLock::new(VecDeque::with_capacity(MAX_RECENT_ERRORS)),
        }
    }

    pub fn bump_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn record_error(&self, message: impl Into<String>, kind: impl Into<String>) {
        let mut errors = self.recent_errors.write();
        if errors.len() == MAX_RECENT_ERRORS {
            errors.pop_front();
        }
        errors.push_back(ErrorRecord {
            message: message.into(),
            kind: kind.into(),
            at: self.clock.now(),
        });
    }

    pub fn recent_errors(&self) -> Vec<ErrorRecord> {
        self.recent_errors.read().iter().cloned().collect()
    }
}

// =============================================================================
// Dispatcher — per-channel signal delivery
// =============================================================================
//
// Picks undispatched non-hold signals and sends one rendered message per
// enabled user channel. Delivery is idempotent by `(signal, channel)`: a
// `ChannelDelivery` record tracks per-channel success independently of the
// signal's own `isDispatched` flag, which only flips once every channel has
// either succeeded or permanently failed. The `Transport` trait is the
// external-service seam each channel implements, so a failing channel never
// blocks the others.
// =============================================================================

pub mod email;
pub mod telegram;
pub mod template;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::store::signal_store::SignalStore;
use crate::store::user_store::UserStore;
use crate::types::{Channel, ChannelDelivery, DeliveryStatus, SignalType, TradingSignal};

/// Narrow send boundary every channel transport implements. Returns an
/// optional provider message id on success.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, text: &str) -> anyhow::Result<Option<String>>;

    /// Renders `signal` using this channel's own template and sends it.
    /// Defaults to the plain Telegram-style text via `send`; a channel with
    /// a richer template (HTML/text email) overrides this instead.
    async fn send_signal(&self, signal: &TradingSignal) -> anyhow::Result<Option<String>> {
        self.send(&template::telegram_text(signal)).await
    }
}

#[derive(Default)]
pub struct DeliveryLog {
    deliveries: RwLock<Vec<ChannelDelivery>>,
}

impl DeliveryLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn already_delivered(&self, signal_id: &str, channel: Channel) -> bool {
        self.deliveries
            .read()
            .iter()
            .any(|d| d.signal_id == signal_id && d.channel == channel && d.status == DeliveryStatus::Sent)
    }

    fn record(&self, delivery: ChannelDelivery) {
        self.deliveries.write().push(delivery);
    }

    pub fn all(&self) -> Vec<ChannelDelivery> {
        self.deliveries.read().clone()
    }
}

pub struct Dispatcher<'a> {
    pub telegram: Option<&'a dyn Transport>,
    pub email: Option<&'a dyn Transport>,
}

impl<'a> Dispatcher<'a> {
    /// Dispatches every undispatched non-hold signal to each of its user's
    /// enabled channels. Returns the number of signals that became fully
    /// dispatched (every channel attempted, none left pending retry).
    pub async fn run(
        &self,
        signal_store: &dyn SignalStore,
        user_store: &dyn UserStore,
        log: &DeliveryLog,
    ) -> anyhow::Result<u32> {
        let pending = signal_store.list_undispatched().await?;
        let mut fully_dispatched = 0;

        for signal in pending {
            if signal.signal_type == SignalType::Hold {
                continue;
            }

            let Some(user) = user_store.preferences(&signal.user_id).await? else {
                warn!(signal_id = %signal.id, "no preferences for user, skipping dispatch");
                continue;
            };

            let mut all_settled = true;

            for channel in &user.notification_channels {
                if log.already_delivered(&signal.id, *channel) {
                    continue;
                }

                let transport = match channel {
                    Channel::Telegram => self.telegram,
                    Channel::Email => self.email,
                };

                let Some(transport) = transport else {
                    all_settled = false;
                    continue;
                };

                match self.send_one(transport, &signal).await {
                    Ok(provider_message_id) => {
                        log.record(ChannelDelivery {
                            signal_id: signal.id.clone(),
                            channel: *channel,
                            status: DeliveryStatus::Sent,
                            attempted_at: Utc::now(),
                            provider_message_id,
                        });
                    }
                    Err(err) => {
                        warn!(signal_id = %signal.id, channel = ?channel, error = %err, "dispatch failed, will retry next cycle");
                        log.record(ChannelDelivery {
                            signal_id: signal.id.clone(),
                            channel: *channel,
                            status: DeliveryStatus::Retrying,
                            attempted_at: Utc::now(),
                            provider_message_id: None,
                        });
                        all_settled = false;
                    }
                }
            }

            if all_settled {
                signal_store.mark_dispatched(&signal.id, Utc::now()).await?;
                fully_dispatched += 1;
                info!(signal_id = %signal.id, symbol = %signal.symbol, "signal fully dispatched");
            }
        }

        Ok(fully_dispatched)
    }

    async fn send_one(&self, transport: &dyn Transport, signal: &TradingSignal) -> anyhow::Result<Option<String>> {
        transport.send_signal(signal).await
    }

    /// Marks every still-undispatched signal as expired at session close, per
    /// the "never half-delivered, never retried past end of day" rule.
    pub async fn expire_undispatched(&self, signal_store: &dyn SignalStore, log: &DeliveryLog) -> anyhow::Result<u32> {
        let pending = signal_store.list_undispatched().await?;
        let mut expired = 0;

        for signal in pending {
            log.record(ChannelDelivery {
                signal_id: signal.id.clone(),
                channel: Channel::Telegram,
                status: DeliveryStatus::Failed,
                attempted_at: Utc::now(),
                provider_message_id: None,
            });
            signal_store.mark_dispatched(&signal.id, Utc::now()).await?;
            expired += 1;
        }

        Ok(expired)
    }
}

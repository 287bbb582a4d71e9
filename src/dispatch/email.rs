// =============================================================================
// Email transport
// =============================================================================
//
// `lettre`'s async SMTP transport: construct once, reuse across sends,
// propagate failures via `anyhow::Context`. Credentials come from the
// environment, never from the config file.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::instrument;

use super::{template, Transport};
use crate::types::TradingSignal;

pub struct EmailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    to: String,
}

impl EmailTransport {
    pub fn new(smtp_host: &str, username: String, password: String, from: String, to: String) -> Result<Self> {
        let creds = Credentials::new(username, password);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)
            .context("failed to configure SMTP relay")?
            .credentials(creds)
            .build();

        Ok(Self { mailer, from, to })
    }
}

/// A rendered email body carries both a subject and the HTML/text pair so a
/// transport never sends a half-rendered message.
pub struct EmailBody {
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
impl Transport for EmailTransport {
    #[instrument(skip(self, text), fields(to = %self.to))]
    async fn send(&self, text: &str) -> Result<Option<String>> {
        // Plain-text transports (the shared `Transport` trait) fall back to a
        // single text/plain part; `send_rendered` is used when html is available.
        let message = Message::builder()
            .from(self.from.parse().context("invalid from address")?)
            .to(self.to.parse().context("invalid to address")?)
            .subject("signal")
            .header(ContentType::TEXT_PLAIN)
            .body(text.to_string())
            .context("failed to build email message")?;

        self.mailer.send(message).await.context("SMTP send failed")?;
        Ok(None)
    }

    async fn send_signal(&self, signal: &TradingSignal) -> Result<Option<String>> {
        let body = EmailBody {
            subject: template::email_subject(signal),
            html: template::email_html(signal),
            text: template::email_text(signal),
        };
        self.send_rendered(&body).await
    }
}

impl EmailTransport {
    pub async fn send_rendered(&self, body: &EmailBody) -> Result<Option<String>> {
        let message = Message::builder()
            .from(self.from.parse().context("invalid from address")?)
            .to(self.to.parse().context("invalid to address")?)
            .subject(&body.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::plain(body.text.clone()))
                    .singlepart(SinglePart::html(body.html.clone())),
            )
            .context("failed to build multipart email message")?;

        self.mailer.send(message).await.context("SMTP send failed")?;
        Ok(None)
    }
}

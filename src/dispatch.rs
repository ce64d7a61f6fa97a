//! Delivery of finished reports
//!
//! Dispatchers run only after a report has been written successfully. They
//! upload the PDF as-is and do not retry.

use std::fs;
use std::path::Path;
use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::SmtpTransport;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, Transport};
use reqwest::blocking::{Client, multipart};
use serde::Deserialize;
use tracing::info;

use crate::config::{DispatchConfig, EmailConfig, TelegramConfig};
use crate::error::DispatchError;
use crate::report::GeneratedReport;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// A channel a finished report can be sent to
pub trait Dispatcher {
    fn name(&self) -> &'static str;

    fn dispatch(&self, report: &GeneratedReport) -> Result<(), DispatchError>;
}

/// Build the dispatcher for a channel name
pub fn dispatcher_for(
    channel: &str,
    config: &DispatchConfig,
) -> Result<Box<dyn Dispatcher>, DispatchError> {
    match channel.trim().to_lowercase().as_str() {
        "telegram" => Ok(Box::new(TelegramDispatcher::from_config(config)?)),
        "email" => Ok(Box::new(EmailDispatcher::from_config(config)?)),
        other => Err(DispatchError::NotConfigured {
            channel: other.to_string(),
        }),
    }
}

/// Short text sent alongside the document
#[must_use]
pub fn caption(report: &GeneratedReport) -> String {
    let mut text = format!("{} Report - {}", report.kind, report.location.name);
    if let Some(status) = report.row("STATUS") {
        text.push_str(&format!("\n{status}"));
    }
    if let Some(best) = report.row("BEST SWELL DAY").or(report.row("BEST VIEWING NIGHT")) {
        text.push_str(&format!("\nBest: {best}"));
    }
    text
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| "report.pdf".to_string(), |n| n.to_string_lossy().into_owned())
}

/// Telegram Bot API `sendDocument`
pub struct TelegramDispatcher {
    client: Client,
    config: TelegramConfig,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramDispatcher {
    pub fn new(config: TelegramConfig) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| DispatchError::delivery("telegram", e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn from_config(config: &DispatchConfig) -> Result<Self, DispatchError> {
        let telegram = config
            .telegram
            .clone()
            .ok_or_else(|| DispatchError::NotConfigured {
                channel: "telegram".to_string(),
            })?;
        Self::new(telegram)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendDocument",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        )
    }
}

impl Dispatcher for TelegramDispatcher {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn dispatch(&self, report: &GeneratedReport) -> Result<(), DispatchError> {
        let form = multipart::Form::new()
            .text("chat_id", self.config.chat_id.clone())
            .text("caption", caption(report))
            .file("document", &report.path)
            .map_err(|source| DispatchError::Attachment {
                path: report.path.clone(),
                source,
            })?;

        let response = self
            .client
            .post(self.endpoint())
            .multipart(form)
            .send()
            .map_err(|e| DispatchError::delivery(self.name(), e.without_url().to_string()))?;

        let status = response.status();
        let body: TelegramResponse = response
            .json()
            .map_err(|e| DispatchError::delivery(self.name(), format!("HTTP {status}: {e}")))?;
        if !body.ok {
            return Err(DispatchError::delivery(
                self.name(),
                body.description
                    .unwrap_or_else(|| format!("HTTP {status}")),
            ));
        }

        info!("Sent {} to Telegram chat {}", report.path.display(), self.config.chat_id);
        Ok(())
    }
}

/// SMTP delivery with the PDF attached
pub struct EmailDispatcher {
    config: EmailConfig,
}

impl EmailDispatcher {
    #[must_use]
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &DispatchConfig) -> Result<Self, DispatchError> {
        config
            .email
            .clone()
            .map(Self::new)
            .ok_or_else(|| DispatchError::NotConfigured {
                channel: "email".to_string(),
            })
    }

    fn create_mailer(&self) -> Result<SmtpTransport, DispatchError> {
        let credentials =
            Credentials::new(self.config.username.clone(), self.config.password.clone());

        let mailer = SmtpTransport::relay(&self.config.smtp_host)
            .map_err(|e| DispatchError::delivery("email", e.to_string()))?
            .credentials(credentials)
            .build();

        Ok(mailer)
    }

    /// Message with the caption as body and the report attached
    pub fn build_message(&self, report: &GeneratedReport) -> Result<Message, DispatchError> {
        let bytes = fs::read(&report.path).map_err(|source| DispatchError::Attachment {
            path: report.path.clone(),
            source,
        })?;
        let pdf = ContentType::parse("application/pdf")
            .map_err(|e| DispatchError::delivery("email", e.to_string()))?;

        let from: Mailbox = self
            .config
            .from
            .parse()
            .map_err(|e| DispatchError::delivery("email", format!("Invalid from address: {e}")))?;
        let to: Mailbox = self
            .config
            .to
            .parse()
            .map_err(|e| DispatchError::delivery("email", format!("Invalid to address: {e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(format!("{} Report - {}", report.kind, report.location.name))
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(caption(report)))
                    .singlepart(Attachment::new(file_name(&report.path)).body(bytes, pdf)),
            )
            .map_err(|e| DispatchError::delivery("email", e.to_string()))
    }
}

impl Dispatcher for EmailDispatcher {
    fn name(&self) -> &'static str {
        "email"
    }

    fn dispatch(&self, report: &GeneratedReport) -> Result<(), DispatchError> {
        let email = self.build_message(report)?;
        let mailer = self.create_mailer()?;

        mailer
            .send(&email)
            .map_err(|e| DispatchError::delivery(self.name(), e.to_string()))?;

        info!("Emailed {} to {}", report.path.display(), self.config.to);
        Ok(())
    }
}

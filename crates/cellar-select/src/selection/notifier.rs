use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::domain::WineRecord;
use super::questionnaire::QuestionnaireAnswers;
use super::repository::{NotificationError, Notifier};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Addresses and links used when composing outbound mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub api_key: String,
    pub sender: String,
    /// Internal inbox receiving a copy of every submission.
    pub notification_recipient: String,
    pub booking_url: String,
}

/// Sends mail through the Resend HTTP API.
#[derive(Clone)]
pub struct ResendNotifier {
    http_client: Client,
    endpoint: String,
    settings: MailSettings,
}

impl ResendNotifier {
    pub fn new(settings: MailSettings) -> Self {
        Self {
            http_client: Client::new(),
            endpoint: RESEND_ENDPOINT.to_string(),
            settings,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn deliver(&self, message: OutboundEmail<'_>) -> Result<(), NotificationError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.settings.api_key)
            .header("X-Entity-Ref-ID", Uuid::new_v4().to_string())
            .json(&message)
            .send()
            .await
            .map_err(|err| NotificationError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "mail provider rejected message");
            return Err(NotificationError::Rejected(format!("{status}: {error_text}")));
        }

        info!(subject = message.subject, "mail sent");
        Ok(())
    }
}

impl std::fmt::Debug for ResendNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendNotifier")
            .field("endpoint", &self.endpoint)
            .field("sender", &self.settings.sender)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct OutboundEmail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: String,
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn notify_submission(
        &self,
        answers: &QuestionnaireAnswers,
        selection: &[WineRecord],
    ) -> Result<(), NotificationError> {
        self.deliver(OutboundEmail {
            from: &self.settings.sender,
            to: &self.settings.notification_recipient,
            subject: "New cellar questionnaire submission",
            html: submission_html(answers, selection),
        })
        .await
    }

    async fn send_selection(
        &self,
        email: &str,
        selection: &[WineRecord],
    ) -> Result<(), NotificationError> {
        self.deliver(OutboundEmail {
            from: &self.settings.sender,
            to: email,
            subject: "Your personal wine selection",
            html: selection_html(selection, &self.settings.booking_url),
        })
        .await
    }
}

/// `N. estate - appellation (color) - price€`, one wine per line.
pub fn selection_listing(selection: &[WineRecord]) -> String {
    selection
        .iter()
        .enumerate()
        .map(|(index, wine)| format!("{}. {}", index + 1, wine.listing_line()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn submission_html(answers: &QuestionnaireAnswers, selection: &[WineRecord]) -> String {
    let summary = answers
        .summary_lines()
        .into_iter()
        .map(|(label, value)| format!("{label}: {value}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "<h1>A new cellar questionnaire was completed</h1>\
<h2>Selection ({count} wines)</h2><pre>{listing}</pre>\
<h2>Client answers</h2><pre>{summary}</pre>",
        count = selection.len(),
        listing = escape_html(&selection_listing(selection)),
        summary = escape_html(&summary),
    )
}

pub(crate) fn selection_html(selection: &[WineRecord], booking_url: &str) -> String {
    format!(
        "<h1>Your personal wine selection</h1>\
<p>Thank you for your interest. Here is the selection we prepared for you.</p>\
<h2>Your selection ({count} wines)</h2>\
<div style=\"white-space: pre-wrap;\">{listing}</div>\
<p>To talk it through, book a call with us:</p>\
<p><a href=\"{booking}\">Book an appointment</a></p>",
        count = selection.len(),
        listing = escape_html(&selection_listing(selection)),
        booking = escape_html(booking_url),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

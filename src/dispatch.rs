// SPDX-License-Identifier: Apache-2.0
//! The reminder engine: single-recipient dispatch, rate-limited bulk
//! dispatch, connectivity probe, and configuration test send.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, Message, MultiPart, SinglePart};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ReminderError;
use crate::format;
use crate::pacing::{self, Sleeper, TokioSleeper};
use crate::settings::ReminderSettings;
use crate::statement;
use crate::store::{Debt, DebtStore, DeliveryLog, EmailLogEntry, EmailStatus, SettingsStore};
use crate::template;
use crate::transport::{MailTransport, SmtpTransportFactory, TransportFactory};

const TEST_SUBJECT: &str = "SMTP configuration test";
const TEST_BODY_HTML: &str = "<p>This is a test message confirming that your \
outgoing email settings are working.</p><p>No action is required.</p>";
const TEST_SNIPPET: &str = "SMTP configuration test message";

/// Outcome of a single send attempt, returned to the boundary layer.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResult {
    pub success: bool,
    pub message: String,
    pub provider_response: Option<String>,
}

impl DeliveryResult {
    fn sent(message: String, response: String) -> Self {
        Self { success: true, message, provider_response: Some(response) }
    }

    fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), provider_response: None }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), provider_response: None }
    }
}

/// Bulk dispatch request as the boundary layer forwards it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatchRequest {
    #[serde(default, alias = "branchId")]
    pub branch_id: Option<i64>,
    /// Messages per minute. Absent, zero, or negative means the default 30.
    #[serde(default, alias = "ratePerMinute")]
    pub rate_per_minute: Option<i64>,
}

/// Aggregate outcome of a bulk dispatch run.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSummary {
    pub success: bool,
    pub message: String,
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
}

impl DispatchSummary {
    fn failed_to_start(message: String) -> Self {
        Self { success: false, message, attempted: 0, sent: 0, failed: 0 }
    }
}

/// Coordinates templating, statement generation, SMTP transport, and the
/// delivery audit log. All collaborators are injected at construction; every
/// public operation folds its failures into the returned result instead of
/// propagating them.
pub struct ReminderEngine {
    debts: Arc<dyn DebtStore>,
    settings: Arc<dyn SettingsStore>,
    delivery_log: Arc<dyn DeliveryLog>,
    transports: Arc<dyn TransportFactory>,
    sleeper: Arc<dyn Sleeper>,
}

impl ReminderEngine {
    /// Engine with the production SMTP transport and timer.
    pub fn new(
        debts: Arc<dyn DebtStore>,
        settings: Arc<dyn SettingsStore>,
        delivery_log: Arc<dyn DeliveryLog>,
    ) -> Self {
        Self::with_parts(
            debts,
            settings,
            delivery_log,
            Arc::new(SmtpTransportFactory),
            Arc::new(TokioSleeper),
        )
    }

    /// Fully injected constructor, used by tests to swap the transport
    /// factory and the sleeper.
    pub fn with_parts(
        debts: Arc<dyn DebtStore>,
        settings: Arc<dyn SettingsStore>,
        delivery_log: Arc<dyn DeliveryLog>,
        transports: Arc<dyn TransportFactory>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self { debts, settings, delivery_log, transports, sleeper }
    }

    /// Sends one reminder for a debt, to `to` when given, else to the
    /// customer's stored address.
    pub async fn send_reminder(&self, debt_id: Option<i64>, to: Option<&str>) -> DeliveryResult {
        let Some(debt_id) = debt_id else {
            return DeliveryResult::fail("No debt id provided.");
        };

        let debt = match self.debts.debt_by_id(debt_id).await {
            Ok(Some(debt)) => debt,
            Ok(None) => return DeliveryResult::fail(format!("Debt {debt_id} not found.")),
            Err(e) => {
                return DeliveryResult::fail(format!("Could not load debt {debt_id}: {e}"));
            }
        };

        let recipient = match to
            .map(str::trim)
            .filter(|to| !to.is_empty())
            .or_else(|| debt.email_on_file())
        {
            Some(recipient) => recipient.to_string(),
            None => {
                let error =
                    ReminderError::Recipient("Customer has no email address on file.".to_string());
                self.log_failure(&debt, "", "", "", &error).await;
                return DeliveryResult::fail(error.to_string());
            }
        };

        let settings = match self.settings.reminder_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                self.log_failure(&debt, &recipient, "", "", &e).await;
                return DeliveryResult::fail(format!("Could not load email settings: {e}"));
            }
        };
        // Settings are checked before the transport is built, so an
        // incomplete configuration never opens a connection.
        if let Err(e) = settings.validate_send() {
            self.log_failure(&debt, &recipient, "", "", &e).await;
            return DeliveryResult::fail(e.to_string());
        }

        let vars = template_vars(&debt, &settings);
        let subject = template::render(settings.subject_template(), &vars);
        let body = format!(
            "{}<br><br>{}",
            template::render(settings.html_template(), &vars),
            settings.signature_html()
        );
        let snippet = snippet_for(&debt, &settings);

        let attachment = if settings.email_attach_pdf {
            match statement::generate_statement(&debt, &settings).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(debt_id, error = %e, "statement generation failed, sending without attachment");
                    None
                }
            }
        } else {
            None
        };

        let transport = match self.transports.build(&settings) {
            Ok(transport) => transport,
            Err(e) => {
                self.log_failure(&debt, &recipient, &subject, &snippet, &e).await;
                return DeliveryResult::fail(e.to_string());
            }
        };

        let message = match build_message(
            &settings,
            &recipient,
            &subject,
            &body,
            attachment.as_deref().map(|bytes| (debt.id, bytes)),
        ) {
            Ok(message) => message,
            Err(e) => {
                self.log_failure(&debt, &recipient, &subject, &snippet, &e).await;
                return DeliveryResult::fail(e.to_string());
            }
        };

        match transport.send(message).await {
            Ok(response) => {
                info!(debt_id, recipient = %recipient, "reminder sent");
                self.append_entry(EmailLogEntry {
                    customer_id: Some(debt.customer_id),
                    debt_id: Some(debt.id),
                    recipient: recipient.clone(),
                    subject,
                    snippet,
                    status: EmailStatus::Sent,
                    response: Some(response.clone()),
                    sent_at: Utc::now(),
                })
                .await;
                DeliveryResult::sent(
                    format!("Reminder sent to {recipient}: {response}"),
                    response,
                )
            }
            Err(e) => {
                self.log_failure(&debt, &recipient, &subject, &snippet, &e).await;
                DeliveryResult::fail(format!("Failed to send reminder: {e}"))
            }
        }
    }

    /// Sends reminders for every overdue debt with an email on file,
    /// sequentially, pausing between attempts to honor the requested rate.
    pub async fn queue_reminders(&self, request: &DispatchRequest) -> DispatchSummary {
        let spacing = pacing::spacing_for_rate(request.rate_per_minute);

        let debts = match self.debts.overdue_debts(request.branch_id).await {
            Ok(debts) => debts,
            Err(e) => {
                return DispatchSummary::failed_to_start(format!(
                    "Could not load overdue debts: {e}"
                ));
            }
        };

        // Debts with no address are excluded from attempts and totals alike.
        let skipped = debts.iter().filter(|debt| debt.email_on_file().is_none()).count();
        let targets: Vec<Debt> = debts
            .into_iter()
            .filter(|debt| debt.email_on_file().is_some())
            .collect();
        if skipped > 0 {
            info!(skipped, "overdue debts without an email on file were skipped");
        }
        info!(
            total = targets.len(),
            spacing_ms = spacing.as_millis() as u64,
            "starting bulk reminder dispatch"
        );

        let mut sent = 0usize;
        let mut failed = 0usize;
        for debt in &targets {
            let result = self.send_reminder(Some(debt.id), debt.email.as_deref()).await;
            if result.success {
                sent += 1;
            } else {
                failed += 1;
            }
            // Spacing applies after every attempt, the last one included.
            self.sleeper.sleep(spacing).await;
        }

        DispatchSummary {
            success: true,
            message: format!(
                "Queued {} reminders. Sent: {}, Failed: {}.",
                targets.len(),
                sent,
                failed
            ),
            attempted: targets.len(),
            sent,
            failed,
        }
    }

    /// Checks connectivity and credentials without sending a message.
    pub async fn probe(&self) -> DeliveryResult {
        let settings = match self.settings.reminder_settings().await {
            Ok(settings) => settings,
            Err(e) => return DeliveryResult::fail(format!("Could not load email settings: {e}")),
        };
        if let Err(e) = settings.validate_transport() {
            return DeliveryResult::fail(e.to_string());
        }

        let transport = match self.transports.build(&settings) {
            Ok(transport) => transport,
            Err(e) => return DeliveryResult::fail(e.to_string()),
        };
        match transport.verify().await {
            Ok(true) => DeliveryResult::ok("SMTP connection verified."),
            Ok(false) => DeliveryResult::fail("SMTP server refused the connection check."),
            Err(e) => DeliveryResult::fail(format!("SMTP verification failed: {e}")),
        }
    }

    /// Sends a fixed test message to `to`, or to the configured from-address,
    /// and logs the outcome like a reminder send.
    pub async fn test_send(&self, to: Option<&str>) -> DeliveryResult {
        let settings = match self.settings.reminder_settings().await {
            Ok(settings) => settings,
            Err(e) => return DeliveryResult::fail(format!("Could not load email settings: {e}")),
        };
        if let Err(e) = settings.validate_send() {
            return DeliveryResult::fail(e.to_string());
        }

        let recipient = to
            .map(str::trim)
            .filter(|to| !to.is_empty())
            .unwrap_or(settings.smtp_from_email.trim())
            .to_string();

        let outcome = async {
            let transport = self.transports.build(&settings)?;
            let message = build_message(&settings, &recipient, TEST_SUBJECT, TEST_BODY_HTML, None)?;
            transport.send(message).await
        }
        .await;

        match outcome {
            Ok(response) => {
                self.append_entry(EmailLogEntry {
                    customer_id: None,
                    debt_id: None,
                    recipient: recipient.clone(),
                    subject: TEST_SUBJECT.to_string(),
                    snippet: TEST_SNIPPET.to_string(),
                    status: EmailStatus::Sent,
                    response: Some(response.clone()),
                    sent_at: Utc::now(),
                })
                .await;
                DeliveryResult::sent(format!("Test email sent to {recipient}: {response}"), response)
            }
            Err(e) => {
                self.append_entry(EmailLogEntry {
                    customer_id: None,
                    debt_id: None,
                    recipient: recipient.clone(),
                    subject: TEST_SUBJECT.to_string(),
                    snippet: TEST_SNIPPET.to_string(),
                    status: EmailStatus::Failed,
                    response: Some(e.to_string()),
                    sent_at: Utc::now(),
                })
                .await;
                DeliveryResult::fail(format!("Test email failed: {e}"))
            }
        }
    }

    /// Best-effort failure record. Only called once a debt context exists;
    /// failures with no debt (missing id, unknown debt) are not audited.
    async fn log_failure(
        &self,
        debt: &Debt,
        recipient: &str,
        subject: &str,
        snippet: &str,
        error: &ReminderError,
    ) {
        self.append_entry(EmailLogEntry {
            customer_id: Some(debt.customer_id),
            debt_id: Some(debt.id),
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            snippet: snippet.to_string(),
            status: EmailStatus::Failed,
            response: Some(error.to_string()),
            sent_at: Utc::now(),
        })
        .await;
    }

    /// Appends to the delivery log, swallowing sink failures: the audit
    /// trail never changes an already-computed result.
    async fn append_entry(&self, entry: EmailLogEntry) {
        if let Err(e) = self.delivery_log.append(entry).await {
            warn!(error = %e, "could not record delivery log entry");
        }
    }
}

/// Template variables for a debt. Every value is a string; blanks stay "".
fn template_vars(debt: &Debt, settings: &ReminderSettings) -> HashMap<String, String> {
    let symbol = &settings.currency_symbol;
    let customer_name = debt.customer_name.trim();
    let mut vars = HashMap::new();
    vars.insert(
        "customer_name".to_string(),
        if customer_name.is_empty() { "Customer".to_string() } else { customer_name.to_string() },
    );
    vars.insert("items".to_string(), debt.items.trim().to_string());
    vars.insert("total".to_string(), format::money(debt.total_amount, symbol));
    vars.insert("paid".to_string(), format::money(debt.amount_paid, symbol));
    vars.insert("balance".to_string(), format::money(debt.balance(), symbol));
    vars.insert(
        "due_date".to_string(),
        debt.due_date.as_deref().map(format::display_date).unwrap_or_default(),
    );
    vars.insert(
        "purchase_date".to_string(),
        debt.date_of_purchase.as_deref().map(format::display_date).unwrap_or_default(),
    );
    vars.insert("business".to_string(), settings.business_name.trim().to_string());
    vars.insert(
        "branch".to_string(),
        debt.branch_name.as_deref().unwrap_or_default().trim().to_string(),
    );
    vars.insert(
        "reference".to_string(),
        debt.reference.as_deref().unwrap_or_default().trim().to_string(),
    );
    vars
}

/// Audit snippet summarizing balance and due date. Never the full body.
fn snippet_for(debt: &Debt, settings: &ReminderSettings) -> String {
    let balance = format::money(debt.balance(), &settings.currency_symbol);
    match debt.due_date.as_deref().map(format::display_date).filter(|due| !due.is_empty()) {
        Some(due) => format!("Balance {balance}, due {due}"),
        None => format!("Balance {balance}"),
    }
}

/// Assembles the outgoing message: HTML body, optional reply-to, optional
/// PDF statement attachment.
fn build_message(
    settings: &ReminderSettings,
    to: &str,
    subject: &str,
    html_body: &str,
    attachment: Option<(i64, &[u8])>,
) -> Result<Message, ReminderError> {
    let from_name = settings.smtp_from_name.trim();
    let from = Mailbox::new(
        (!from_name.is_empty()).then(|| from_name.to_string()),
        settings.smtp_from_email.trim().parse().map_err(|e| ReminderError::Address {
            field: "from",
            reason: format!("{e}"),
        })?,
    );
    let to = to.parse::<Mailbox>().map_err(|e| ReminderError::Address {
        field: "recipient",
        reason: format!("{e}"),
    })?;

    let mut builder = Message::builder().from(from).to(to).subject(subject);
    let reply_to = settings.smtp_reply_to.trim();
    if !reply_to.is_empty() {
        builder = builder.reply_to(reply_to.parse().map_err(|e| ReminderError::Address {
            field: "reply-to",
            reason: format!("{e}"),
        })?);
    }

    let html_part = SinglePart::builder()
        .header(ContentType::TEXT_HTML)
        .body(html_body.to_string());

    let message = match attachment {
        Some((debt_id, bytes)) => {
            let content_type = ContentType::parse("application/pdf")
                .map_err(|e| ReminderError::Statement(e.to_string()))?;
            let pdf = Attachment::new(format!("statement-{debt_id}.pdf"))
                .body(bytes.to_vec(), content_type);
            builder.multipart(MultiPart::mixed().singlepart(html_part).singlepart(pdf))
        }
        None => builder.singlepart(html_part),
    };

    message.map_err(|e| ReminderError::Transport(format!("Could not assemble message: {e}")))
}

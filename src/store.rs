// SPDX-License-Identifier: Apache-2.0
//! Collaborator seams and the records that cross them.
//!
//! Persistence lives outside this crate; the engine only sees these traits.
//! The shipped implementations cover tests and the operator CLI.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ReminderError;
use crate::settings::ReminderSettings;

/// A customer debt as the repository reports it, joined with the customer's
/// contact details and branch name. Read-only to this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debt {
    pub id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub items: String,
    pub total_amount: f64,
    pub amount_paid: f64,
    pub date_of_purchase: Option<String>,
    pub due_date: Option<String>,
    pub reference: Option<String>,
    pub branch_name: Option<String>,
}

impl Debt {
    /// Outstanding balance. Always derived, never persisted.
    pub fn balance(&self) -> f64 {
        self.total_amount - self.amount_paid
    }

    /// The stored email address, if there is a usable one.
    pub fn email_on_file(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmailStatus {
    Sent,
    Failed,
}

/// One append-only audit record per send attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLogEntry {
    pub customer_id: Option<i64>,
    pub debt_id: Option<i64>,
    pub recipient: String,
    pub subject: String,
    /// Short summary, never the full body.
    pub snippet: String,
    pub status: EmailStatus,
    /// Provider response on success, error text on failure.
    pub response: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Read access to the application's debt records.
#[async_trait]
pub trait DebtStore: Send + Sync {
    async fn debt_by_id(&self, id: i64) -> Result<Option<Debt>, ReminderError>;
    /// Debts the repository has already marked overdue, optionally filtered
    /// by branch. Overdue status is not computed here.
    async fn overdue_debts(&self, branch_id: Option<i64>) -> Result<Vec<Debt>, ReminderError>;
}

/// Source of the current reminder settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn reminder_settings(&self) -> Result<ReminderSettings, ReminderError>;
}

/// Append-only sink for the delivery audit trail. The engine swallows
/// append failures; they must never affect a computed result.
#[async_trait]
pub trait DeliveryLog: Send + Sync {
    async fn append(&self, entry: EmailLogEntry) -> Result<(), ReminderError>;
}

/// Settings store wrapping one fixed value. Used by the CLI and tests.
pub struct StaticSettings {
    settings: ReminderSettings,
}

impl StaticSettings {
    pub fn new(settings: ReminderSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SettingsStore for StaticSettings {
    async fn reminder_settings(&self) -> Result<ReminderSettings, ReminderError> {
        Ok(self.settings.clone())
    }
}

/// Debt store with no debts, for contexts that only probe or test-send.
pub struct EmptyDebtStore;

#[async_trait]
impl DebtStore for EmptyDebtStore {
    async fn debt_by_id(&self, _id: i64) -> Result<Option<Debt>, ReminderError> {
        Ok(None)
    }

    async fn overdue_debts(&self, _branch_id: Option<i64>) -> Result<Vec<Debt>, ReminderError> {
        Ok(Vec::new())
    }
}

/// In-memory delivery log. Doubles as the recording sink in tests.
#[derive(Default)]
pub struct MemoryDeliveryLog {
    entries: Mutex<Vec<EmailLogEntry>>,
}

impl MemoryDeliveryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<EmailLogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryLog for MemoryDeliveryLog {
    async fn append(&self, entry: EmailLogEntry) -> Result<(), ReminderError> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

/// Delivery log that emits each entry as a tracing event. The CLI's sink.
pub struct TracingDeliveryLog;

#[async_trait]
impl DeliveryLog for TracingDeliveryLog {
    async fn append(&self, entry: EmailLogEntry) -> Result<(), ReminderError> {
        info!(
            entry = %serde_json::to_string(&entry).unwrap_or_default(),
            "delivery recorded"
        );
        Ok(())
    }
}

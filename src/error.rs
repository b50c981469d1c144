use thiserror::Error;

/// Failure taxonomy for the reminder engine.
///
/// Public engine operations never surface these directly: every failure is
/// folded into a [`crate::dispatch::DeliveryResult`] or
/// [`crate::dispatch::DispatchSummary`] with `success = false`.
#[derive(Debug, Error)]
pub enum ReminderError {
    /// Required SMTP settings are absent. Raised before any network I/O.
    #[error("Missing required SMTP settings: {}", .missing.join(", "))]
    Config { missing: Vec<&'static str> },

    /// A configured or stored address does not parse as a mailbox.
    #[error("Invalid {field} address: {reason}")]
    Address { field: &'static str, reason: String },

    /// No usable recipient for the target debt.
    #[error("{0}")]
    Recipient(String),

    /// Authentication or network failure while talking to the SMTP server.
    #[error("SMTP transport error: {0}")]
    Transport(String),

    /// The statement PDF could not be produced. Non-fatal to the enclosing
    /// send; the caller drops the attachment.
    #[error("Statement generation failed: {0}")]
    Statement(String),

    /// The delivery log rejected an append. Swallowed by the engine.
    #[error("Delivery log write failed: {0}")]
    Logging(String),

    /// A collaborator lookup (debt store, settings store) failed.
    #[error("Store error: {0}")]
    Store(String),
}

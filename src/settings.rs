use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ReminderError;

/// Subject used when no subject template is configured.
pub const DEFAULT_SUBJECT_TEMPLATE: &str = "Payment reminder from {{business}}";

/// HTML body used when no body template is configured.
pub const DEFAULT_HTML_TEMPLATE: &str = "<p>Dear {{customer_name}},</p>\
<p>This is a friendly reminder that your balance of <strong>{{balance}}</strong> \
for {{items}} is due on {{due_date}}.</p>\
<p>Total: {{total}}<br>Paid to date: {{paid}}<br>Outstanding: {{balance}}</p>\
<p>Please arrange payment at your earliest convenience.</p>";

const DEFAULT_CURRENCY_SYMBOL: &str = "KSh";

/// SMTP and message settings for the reminder engine.
///
/// Deserializable from TOML for the operator CLI, or built from the
/// application's string-keyed settings map via [`ReminderSettings::from_map`].
/// Blank strings mean "not configured"; [`ReminderSettings::validate_send`]
/// and [`ReminderSettings::validate_transport`] are the single validation
/// step that turns absences into a typed error.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReminderSettings {
    pub smtp_host: String,
    pub smtp_port: Option<u16>,
    pub smtp_username: String,
    pub smtp_password: String,
    /// Implicit TLS from the first byte. Port 465 forces this on.
    pub smtp_secure: bool,
    /// Refuse to proceed without STARTTLS on non-secure connections.
    pub smtp_require_tls: bool,
    /// Accept invalid or self-signed server certificates.
    pub smtp_allow_invalid_tls: bool,
    pub smtp_from_name: String,
    pub smtp_from_email: String,
    pub smtp_reply_to: String,
    pub email_subject_template: String,
    pub email_template_html: String,
    pub email_signature: String,
    pub email_attach_pdf: bool,
    pub currency_symbol: String,
    pub business_name: String,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: None,
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_secure: false,
            smtp_require_tls: true,
            smtp_allow_invalid_tls: false,
            smtp_from_name: String::new(),
            smtp_from_email: String::new(),
            smtp_reply_to: String::new(),
            email_subject_template: String::new(),
            email_template_html: String::new(),
            email_signature: String::new(),
            email_attach_pdf: false,
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            business_name: String::new(),
        }
    }
}

impl ReminderSettings {
    /// Builds settings from the application's string-keyed settings map.
    ///
    /// Unknown keys are ignored; missing keys fall back to defaults.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let text = |key: &str| {
            map.get(key)
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };
        let currency = text("currency_symbol");

        Self {
            smtp_host: text("smtp_host"),
            smtp_port: map.get("smtp_port").and_then(|value| value.trim().parse().ok()),
            smtp_username: text("smtp_username"),
            smtp_password: map.get("smtp_password").cloned().unwrap_or_default(),
            smtp_secure: parse_flag(map.get("smtp_secure"), false),
            smtp_require_tls: parse_flag(map.get("smtp_require_tls"), true),
            smtp_allow_invalid_tls: parse_flag(map.get("smtp_allow_invalid_tls"), false),
            smtp_from_name: text("smtp_from_name"),
            smtp_from_email: text("smtp_from_email"),
            smtp_reply_to: text("smtp_reply_to"),
            email_subject_template: text("email_subject_template"),
            email_template_html: text("email_template_html"),
            email_signature: map.get("email_signature").cloned().unwrap_or_default(),
            email_attach_pdf: parse_flag(map.get("email_attach_pdf"), false),
            currency_symbol: if currency.is_empty() {
                DEFAULT_CURRENCY_SYMBOL.to_string()
            } else {
                currency
            },
            business_name: text("business_name"),
        }
    }

    /// Fields a connectivity probe needs. Empty when the transport can be built.
    pub fn missing_transport_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.smtp_host.trim().is_empty() {
            missing.push("smtp_host");
        }
        if self.smtp_port.is_none() {
            missing.push("smtp_port");
        }
        if self.smtp_username.trim().is_empty() {
            missing.push("smtp_username");
        }
        if self.smtp_password.is_empty() {
            missing.push("smtp_password");
        }
        missing
    }

    /// Fields a send attempt needs: the transport fields plus a from address.
    pub fn missing_send_fields(&self) -> Vec<&'static str> {
        let mut missing = self.missing_transport_fields();
        if self.smtp_from_email.trim().is_empty() {
            missing.push("smtp_from_email");
        }
        missing
    }

    pub fn validate_transport(&self) -> Result<(), ReminderError> {
        let missing = self.missing_transport_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ReminderError::Config { missing })
        }
    }

    pub fn validate_send(&self) -> Result<(), ReminderError> {
        let missing = self.missing_send_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ReminderError::Config { missing })
        }
    }

    /// Configured subject template, or the stock one.
    pub fn subject_template(&self) -> &str {
        let configured = self.email_subject_template.trim();
        if configured.is_empty() {
            DEFAULT_SUBJECT_TEMPLATE
        } else {
            configured
        }
    }

    /// Configured HTML body template, or the stock one.
    pub fn html_template(&self) -> &str {
        let configured = self.email_template_html.trim();
        if configured.is_empty() {
            DEFAULT_HTML_TEMPLATE
        } else {
            configured
        }
    }

    /// Signature block appended below the rendered body.
    pub fn signature_html(&self) -> String {
        let signature = self.email_signature.trim();
        if !signature.is_empty() {
            return signature.replace('\n', "<br>");
        }
        let business = self.business_name.trim();
        if business.is_empty() {
            "Regards".to_string()
        } else {
            format!("Regards,<br>{business}")
        }
    }
}

/// Truthy settings flags as the application stores them. A missing or blank
/// value keeps the default.
fn parse_flag(value: Option<&String>, default: bool) -> bool {
    match value.map(|value| value.trim()).filter(|value| !value.is_empty()) {
        Some(value) => matches!(
            value.to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
        None => default,
    }
}

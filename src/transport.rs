use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Message;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use crate::error::ReminderError;
use crate::settings::ReminderSettings;

const SMTPS_PORT: u16 = 465;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Async SMTP seam. Production goes through lettre; tests inject a
/// recording fake.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Connects and authenticates without sending anything.
    async fn verify(&self) -> Result<bool, ReminderError>;

    /// Delivers a fully built message and returns the provider response.
    async fn send(&self, message: Message) -> Result<String, ReminderError>;
}

/// Builds one transport per logical operation. The engine never reuses a
/// transport across operations or across bulk-loop iterations.
pub trait TransportFactory: Send + Sync {
    fn build(&self, settings: &ReminderSettings)
        -> Result<Box<dyn MailTransport>, ReminderError>;
}

/// Production factory producing [`LettreTransport`]s.
pub struct SmtpTransportFactory;

impl TransportFactory for SmtpTransportFactory {
    fn build(
        &self,
        settings: &ReminderSettings,
    ) -> Result<Box<dyn MailTransport>, ReminderError> {
        Ok(Box::new(LettreTransport::from_settings(settings)?))
    }
}

/// SMTP client configured from [`ReminderSettings`].
pub struct LettreTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl LettreTransport {
    /// Validates the settings and builds the client. Returns a configuration
    /// error naming the missing fields before any network I/O happens.
    pub fn from_settings(settings: &ReminderSettings) -> Result<Self, ReminderError> {
        settings.validate_transport()?;
        let host = settings.smtp_host.trim();
        let port = settings
            .smtp_port
            .ok_or_else(|| ReminderError::Config { missing: vec!["smtp_port"] })?;

        let mut tls_builder = TlsParameters::builder(host.to_string());
        if settings.smtp_allow_invalid_tls {
            tls_builder = tls_builder.dangerous_accept_invalid_certs(true);
        }
        let tls = tls_builder
            .build()
            .map_err(|e| ReminderError::Transport(e.to_string()))?;

        // Port 465 means TLS from the first byte, whatever the secure flag says.
        let tls_mode = if settings.smtp_secure || port == SMTPS_PORT {
            Tls::Wrapper(tls)
        } else if settings.smtp_require_tls {
            Tls::Required(tls)
        } else {
            Tls::Opportunistic(tls)
        };

        // Strip whitespace that sneaks in from copied app passwords.
        let password: String = settings
            .smtp_password
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let credentials = Credentials::new(settings.smtp_username.trim().to_string(), password);

        let builder = match AsyncSmtpTransport::<Tokio1Executor>::relay(host) {
            Ok(builder) => builder,
            Err(_) => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        };

        let inner = builder
            .port(port)
            .credentials(credentials)
            .authentication(vec![Mechanism::Plain, Mechanism::Login])
            .timeout(Some(CONNECT_TIMEOUT))
            .tls(tls_mode)
            .build();

        Ok(Self { inner })
    }
}

#[async_trait]
impl MailTransport for LettreTransport {
    async fn verify(&self) -> Result<bool, ReminderError> {
        self.inner
            .test_connection()
            .await
            .map_err(|e| ReminderError::Transport(e.to_string()))
    }

    async fn send(&self, message: Message) -> Result<String, ReminderError> {
        let response = self
            .inner
            .send(message)
            .await
            .map_err(|e| ReminderError::Transport(e.to_string()))?;
        let detail = response.message().collect::<Vec<_>>().join(" ");
        Ok(format!("{} {}", response.code(), detail).trim().to_string())
    }
}

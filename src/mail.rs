//! SMTP transport built from the email settings

use lettre::{
    message::{header, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, Tokio1Executor,
};
use std::time::Duration;
use tracing::debug;

use crate::config::EmailConfig;
use crate::errors::MailError;

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Implicit TLS when `use_ssl`, STARTTLS when `use_tls`, plain SMTP otherwise.
pub fn smtp_transport(email: &EmailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let builder = if email.use_ssl {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&email.host)
            .map_err(|e| MailError::TransportInit(e.to_string()))?
    } else if email.use_tls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&email.host)
            .map_err(|e| MailError::TransportInit(e.to_string()))?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&email.host)
    };

    debug!(
        host = %email.host,
        port = email.port,
        tls = email.use_tls,
        ssl = email.use_ssl,
        "Building SMTP transport"
    );

    Ok(builder
        .port(email.port)
        .timeout(Some(SMTP_TIMEOUT))
        .credentials(Credentials::new(
            email.user.clone(),
            email.password.expose().to_string(),
        ))
        .build())
}

/// Plain-text message from the configured default sender.
pub fn message(email: &EmailConfig, to: &str, subject: &str, body: String) -> Result<Message, MailError> {
    let from: Mailbox = email
        .default_from_email
        .parse()
        .map_err(|_| MailError::InvalidAddress(email.default_from_email.clone()))?;
    let to: Mailbox = to
        .parse()
        .map_err(|_| MailError::InvalidAddress(to.to_string()))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .header(header::ContentType::TEXT_PLAIN)
        .body(body)
        .map_err(|e| MailError::BuildFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    fn email(use_tls: bool, use_ssl: bool) -> EmailConfig {
        EmailConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: "noreply@example.com".to_string(),
            password: Secret::new("pw"),
            use_tls,
            use_ssl,
            default_from_email: "noreply@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_transport_builds_for_each_mode() {
        assert!(smtp_transport(&email(true, false)).is_ok());
        assert!(smtp_transport(&email(false, true)).is_ok());
        assert!(smtp_transport(&email(false, false)).is_ok());
    }

    #[test]
    fn test_message_uses_default_sender() {
        let msg = message(&email(true, false), "user@example.com", "Hello", "Body".to_string()).unwrap();
        let raw = String::from_utf8(msg.formatted()).unwrap();
        assert!(raw.contains("From: noreply@example.com"));
        assert!(raw.contains("To: user@example.com"));
        assert!(raw.contains("Subject: Hello"));
    }

    #[test]
    fn test_invalid_sender() {
        let mut cfg = email(true, false);
        cfg.default_from_email = "apikey".to_string();
        let err = message(&cfg, "user@example.com", "Hello", String::new()).unwrap_err();
        assert!(matches!(err, MailError::InvalidAddress(_)));
    }
}

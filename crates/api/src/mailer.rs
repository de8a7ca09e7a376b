//! Transactional email via SMTP.
//!
//! [`Mailer`] wraps the `lettre` async SMTP transport to send plain-text
//! account emails (verification, password reset). Configuration is loaded
//! from environment variables; if `SMTP_HOST` is not set,
//! [`SmtpConfig::from_env`] returns `None` and no mailer is constructed --
//! flows then log the token event instead of sending.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// SmtpConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@mixdown.local";

/// Configuration for the SMTP mailer.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl SmtpConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured and should be skipped.
    ///
    /// | Variable        | Required | Default                 |
    /// |-----------------|----------|-------------------------|
    /// | `SMTP_HOST`     | yes      | --                      |
    /// | `SMTP_PORT`     | no       | `587`                   |
    /// | `SMTP_FROM`     | no       | `noreply@mixdown.local` |
    /// | `SMTP_USER`     | no       | --                      |
    /// | `SMTP_PASSWORD` | no       | --                      |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// Mailer
// ---------------------------------------------------------------------------

/// Sends account emails via SMTP.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    /// Build the mailer from SMTP configuration.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailerError> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port);

        if let (Some(user), Some(password)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        let from = config
            .from_address
            .parse::<Mailbox>()
            .map_err(MailerError::Address)?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    /// Send the email-verification message for a freshly signed-up account.
    pub async fn send_verification(
        &self,
        to_email: &str,
        username: &str,
        verify_url: &str,
    ) -> Result<(), MailerError> {
        let body = format!(
            "Hi {username},\n\n\
             Welcome to Mixdown. Confirm your email address by opening:\n\n\
             {verify_url}\n\n\
             The link expires in 24 hours. If you did not sign up, you can\n\
             ignore this message.\n"
        );
        self.send(to_email, "Verify your Mixdown email", body).await
    }

    /// Send the password-reset message.
    pub async fn send_password_reset(
        &self,
        to_email: &str,
        username: &str,
        reset_url: &str,
    ) -> Result<(), MailerError> {
        let body = format!(
            "Hi {username},\n\n\
             A password reset was requested for your Mixdown account. Open:\n\n\
             {reset_url}\n\n\
             The link expires in 1 hour. If you did not request a reset, your\n\
             password is unchanged and no action is needed.\n"
        );
        self.send(to_email, "Reset your Mixdown password", body).await
    }

    async fn send(
        &self,
        to_email: &str,
        subject: &str,
        body: String,
    ) -> Result<(), MailerError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to_email.parse::<Mailbox>().map_err(MailerError::Address)?)
            .subject(subject)
            .body(body)
            .map_err(|e| MailerError::Build(e.to_string()))?;

        self.transport.send(message).await?;
        tracing::debug!(to = %to_email, subject = %subject, "Email sent");
        Ok(())
    }
}

use anyhow::{Context, Result};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::Mailbox,
    transport::smtp::authentication::Credentials,
};
use tracing::info;

use crate::config::MailConfig;

/// Dispatches activation and password-reset codes over SMTP. With mail
/// disabled in the config the message is logged instead, which keeps local
/// setups working without a relay.
#[derive(Clone)]
pub struct Mailer {
    config: MailConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl Mailer {
    pub fn new(config: MailConfig) -> Result<Self> {
        let transport = if config.enabled {
            let mut builder =
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                    .context("Invalid SMTP host")?
                    .port(config.smtp_port);

            if !config.username.is_empty() {
                builder = builder.credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ));
            }

            Some(builder.build())
        } else {
            None
        };

        Ok(Self { config, transport })
    }

    /// Mail the signup activation link
    pub async fn send_activation_code(&self, to: &str, code: &str, base_url: &str) -> Result<()> {
        let body = format!(
            "Welcome to quarterd!\n\n\
             Activate your account by following this link:\n\
             {base_url}/activate/{code}\n"
        );
        self.send(to, "Activate your quarterd account", body).await
    }

    /// Mail the password-reset link
    pub async fn send_reset_code(&self, to: &str, code: &str, base_url: &str) -> Result<()> {
        let body = format!(
            "A password reset was requested for your account.\n\n\
             Choose a new password by following this link:\n\
             {base_url}/reset/{code}\n\n\
             If you did not request this, you can ignore this mail.\n"
        );
        self.send(to, "Reset your quarterd password", body).await
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> Result<()> {
        let Some(transport) = &self.transport else {
            info!("Mail disabled, would send \"{subject}\" to {to}");
            return Ok(());
        };

        let message = Message::builder()
            .from(self.config.from.parse::<Mailbox>().context("Invalid from address")?)
            .to(to.parse::<Mailbox>().context("Invalid recipient address")?)
            .subject(subject)
            .body(body)
            .context("Failed to build mail")?;

        transport.send(message).await.context("Failed to send mail")?;

        info!("Sent \"{subject}\" to {to}");
        Ok(())
    }
}

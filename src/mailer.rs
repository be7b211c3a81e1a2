use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::MailConfig;

/// Outbound mail seam: plain-text body, single recipient.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(host: &str, cfg: &MailConfig) -> anyhow::Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .with_context(|| format!("smtp relay {}", host))?
            .port(cfg.port);
        if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            from: cfg.default_sender.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.parse().context("parse sender address")?)
            .to(to.parse().with_context(|| format!("parse recipient {}", to))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("build email")?;
        self.transport.send(email).await.context("smtp send")?;
        info!(%to, %subject, "mail sent");
        Ok(())
    }
}

/// Writes outgoing mail to the log instead of sending it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!(%to, %subject, %body, "mail (not sent, SMTP_HOST unset)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_accepts_anything() {
        LogMailer
            .send("someone@example.com", "Hello", "body")
            .await
            .expect("log mailer never fails");
    }

    #[tokio::test]
    async fn smtp_mailer_builds_without_credentials() {
        let cfg = MailConfig {
            host: Some("smtp.example.com".into()),
            port: 2525,
            username: None,
            password: None,
            default_sender: "StudyHub <no-reply@example.com>".into(),
        };
        assert!(SmtpMailer::new("smtp.example.com", &cfg).is_ok());
    }
}

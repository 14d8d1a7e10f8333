use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, mail: OutgoingMail) -> Result<()>;
}

/// Writes outgoing mail to the log instead of a mail server.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            body_len = mail.body.len(),
            "outgoing mail"
        );
        Ok(())
    }
}

use axum::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: Message) -> anyhow::Result<()>;
}

/// Writes outgoing mail to the log instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    #[tracing::instrument(skip_all, fields(to = %message.to, subject = %message.subject))]
    async fn send(&self, message: Message) -> anyhow::Result<()> {
        tracing::info!(from = %message.from, body = %message.body, "outgoing mail");
        Ok(())
    }
}

pub fn reset_email(from: &str, to: &str, link: &str) -> Message {
    Message {
        from: from.to_owned(),
        to: to.to_owned(),
        subject: "Password Reset Request".to_owned(),
        body: format!(
            "To reset your password, visit the following link:\n{link}\n\n\
             If you did not make this request then simply ignore this email and no changes will be made.\n"
        ),
    }
}

use async_trait::async_trait;
use serde::Serialize;

pub mod http;
pub mod templates;
pub mod welcome;

pub use http::HttpMailer;
pub use welcome::{VerifiedEvent, WelcomeDispatcher};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()>;
}

#[derive(Debug, thiserror::Error)]
#[error("Email service not configured")]
pub struct MailNotConfigured;

/// Used when no mail relay is configured: every send fails with `MailNotConfigured`.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        tracing::warn!(subject = %email.subject, "email transport not configured; skipping send");
        Err(MailNotConfigured.into())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
        failing: AtomicBool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            let mailer = Self::default();
            mailer.failing.store(true, Ordering::SeqCst);
            mailer
        }

        pub async fn sent(&self) -> Vec<OutgoingEmail> {
            self.sent.lock().await.clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("smtp relay refused connection");
            }
            self.sent.lock().await.push(email.clone());
            Ok(())
        }
    }
}

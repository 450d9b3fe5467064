use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use super::{Mailer, OutgoingEmail};
use crate::config::MailConfig;

/// Sends mail through an HTTP relay that accepts a JSON message.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

impl HttpMailer {
    /// `None` when the relay URL or key is missing.
    pub fn from_config(cfg: &MailConfig) -> anyhow::Result<Option<Self>> {
        let (Some(endpoint), Some(api_key)) = (cfg.api_url.clone(), cfg.api_key.clone()) else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("build mail http client")?;
        Ok(Some(Self {
            client,
            endpoint,
            api_key,
            from: cfg.from.clone(),
        }))
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        let body = RelayMessage {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };
        self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("mail relay request")?
            .error_for_status()
            .context("mail relay rejected message")?;
        info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_both_url_and_key() {
        let mut cfg = MailConfig {
            from: "noreply@examtraining.nl".into(),
            api_url: Some("https://relay.example/send".into()),
            api_key: None,
        };
        assert!(HttpMailer::from_config(&cfg).unwrap().is_none());

        cfg.api_key = Some("k".into());
        let mailer = HttpMailer::from_config(&cfg).unwrap().expect("configured");
        assert_eq!(mailer.endpoint, "https://relay.example/send");
        assert_eq!(mailer.from, "noreply@examtraining.nl");
    }
}

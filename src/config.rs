use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub from: String,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    pub ttl_hours: i64,
}

impl VerificationConfig {
    pub fn ttl(&self) -> time::Duration {
        time::Duration::hours(self.ttl_hours)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub retry_attempts: u32,
    pub retry_base_ms: u64,
}

impl StoreConfig {
    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub base_url: String,
    pub mail: MailConfig,
    pub verification: VerificationConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("APP_HOST {:?} is not an IP address", self.host))
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = non_empty("APP_BASE_URL")
            .unwrap_or_else(|| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            anyhow::bail!("APP_BASE_URL must be an http(s) URL, got {base_url}");
        }

        let mail = MailConfig {
            from: non_empty("EMAIL_FROM").unwrap_or_else(|| "noreply@examtraining.nl".into()),
            api_url: non_empty("EMAIL_API_URL"),
            api_key: non_empty("EMAIL_API_KEY"),
        };
        let verification = VerificationConfig {
            ttl_hours: lookup("VERIFICATION_TTL_HOURS")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };
        let store = StoreConfig {
            retry_attempts: lookup("STORE_RETRY_ATTEMPTS")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(3),
            retry_base_ms: lookup("STORE_RETRY_BASE_MS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(500),
        };

        Ok(Self {
            host: non_empty("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: lookup("APP_PORT")
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
            database_url: non_empty("DATABASE_URL"),
            base_url,
            mail,
            verification,
            store,
        })
    }
}

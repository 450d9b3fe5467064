use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::mail::{DisabledMailer, HttpMailer, Mailer, WelcomeDispatcher};
use crate::storage::{DocumentStore, MemoryStore, PgStore};
use crate::users::{RetryPolicy, UserRepo};
use crate::verification::VerificationService;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub users: UserRepo,
    pub verification: VerificationService,
    pub welcome: WelcomeDispatcher,
    pub started_at: Instant,
}

impl AppState {
    pub async fn init(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = match &config.database_url {
            Some(url) => {
                let pg = PgStore::connect_lazy(url)?;
                if let Err(e) = pg.migrate().await {
                    warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(pg)
            }
            None => {
                warn!("DATABASE_URL not set; users are kept in memory only");
                Arc::new(MemoryStore::new())
            }
        };

        let mailer: Arc<dyn Mailer> = match HttpMailer::from_config(&config.mail)? {
            Some(mailer) => {
                info!(from = %config.mail.from, "mail relay configured");
                Arc::new(mailer)
            }
            None => {
                warn!("EMAIL_API_URL or EMAIL_API_KEY missing; outgoing mail disabled");
                Arc::new(DisabledMailer)
            }
        };

        Ok(Self::from_parts(store, mailer, config))
    }

    /// Wire services over the given store and mailer. Spawns the welcome mail
    /// worker, so it must run inside a tokio runtime.
    pub fn from_parts(
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
        config: Arc<AppConfig>,
    ) -> Self {
        let retry = RetryPolicy {
            attempts: config.store.retry_attempts,
            base: config.store.retry_base(),
        };
        let users = UserRepo::new(store.clone(), retry);
        let verification = VerificationService::new(
            users.clone(),
            mailer.clone(),
            config.base_url.clone(),
            config.verification.ttl(),
        );
        let (welcome, _worker) = WelcomeDispatcher::spawn(mailer, config.base_url.clone());

        Self {
            store,
            users,
            verification,
            welcome,
            started_at: Instant::now(),
        }
    }

    #[cfg(test)]
    pub fn fake() -> (
        Self,
        Arc<MemoryStore>,
        Arc<crate::mail::testing::RecordingMailer>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(crate::mail::testing::RecordingMailer::default());
        let config = Arc::new(AppConfig::from_lookup(|_| None).expect("default config"));
        let state = Self::from_parts(store.clone(), mailer.clone(), config);
        (state, store, mailer)
    }
}

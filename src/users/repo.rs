use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::storage::{DocumentStore, Filter, StoreError};
use crate::users::model::{NewUser, Role, UserPatch, UserRecord, DEFAULT_SUBJECT};

/// Backoff for lookups that race a fresh insert. Retry `n` (1-based) waits `n * base`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base: Duration,
}

impl RetryPolicy {
    pub fn delay(&self, retry: u32) -> Duration {
        self.base * retry
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base: Duration::from_millis(500),
        }
    }
}

/// User access over an eventually consistent document store.
#[derive(Clone)]
pub struct UserRepo {
    store: Arc<dyn DocumentStore>,
    retry: RetryPolicy,
}

impl UserRepo {
    pub fn new(store: Arc<dyn DocumentStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let email = email.trim().to_lowercase();
        self.store.find(Filter::Email(&email)).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        self.store.find(Filter::Id(id)).await
    }

    pub async fn find_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        self.store.find(Filter::VerifyToken(token)).await
    }

    pub async fn find_by_consumed_token(
        &self,
        token: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        self.store.find(Filter::ConsumedToken(token)).await
    }

    /// Create an unverified student. Fails with `Conflict` when the email is taken.
    pub async fn create(&self, new: NewUser) -> Result<UserRecord, StoreError> {
        let email = new.email.trim().to_lowercase();
        if self.find_by_email(&email).await?.is_some() {
            return Err(StoreError::Conflict);
        }

        let now = OffsetDateTime::now_utc();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email,
            name: new.name,
            password_hash: new.password_hash,
            role: Role::Student,
            vwo_level: new.vwo_level,
            subject: new.subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            email_verified: None,
            email_verify_token: None,
            consumed_verify_token: None,
            created_at: now,
            updated_at: now,
            last_login_at: now,
            etag: 0,
        };
        let stored = self.store.insert(&user).await?;
        debug!(user_id = %stored.id, "user document created");
        Ok(stored)
    }

    /// Apply `patch` to the user with `id`.
    ///
    /// The write is addressed by partition key, so the record is looked up by id
    /// first. A miss is retried with increasing backoff because a just-created
    /// record may not be visible to id lookups yet. With `if_match`, the write only
    /// succeeds if the record still carries that etag.
    pub async fn update(
        &self,
        id: Uuid,
        patch: &UserPatch,
        if_match: Option<i64>,
    ) -> Result<UserRecord, StoreError> {
        let mut retry = 0;
        loop {
            match self.try_update(id, patch, if_match).await {
                Err(StoreError::NotFound) if retry < self.retry.attempts => {
                    retry += 1;
                    let delay = self.retry.delay(retry);
                    debug!(user_id = %id, retry, delay_ms = delay.as_millis() as u64, "user not visible yet; retrying update");
                    tokio::time::sleep(delay).await;
                }
                Err(StoreError::NotFound) => {
                    warn!(user_id = %id, retries = retry, "user not found for update");
                    return Err(StoreError::NotFound);
                }
                other => return other,
            }
        }
    }

    async fn try_update(
        &self,
        id: Uuid,
        patch: &UserPatch,
        if_match: Option<i64>,
    ) -> Result<UserRecord, StoreError> {
        let mut user = self.find_by_id(id).await?.ok_or(StoreError::NotFound)?;
        if if_match.is_some_and(|etag| etag != user.etag) {
            return Err(StoreError::PreconditionFailed);
        }
        patch.apply(&mut user);
        user.updated_at = OffsetDateTime::now_utc();
        self.store.replace(&user, if_match).await
    }
}

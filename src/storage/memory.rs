use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{DocumentStore, Filter, StoreError};
use crate::users::model::UserRecord;

#[derive(Default)]
struct Inner {
    docs: HashMap<Uuid, UserRecord>,
    /// Remaining by-id lookups for which a fresh insert stays invisible.
    lagging: HashMap<Uuid, usize>,
}

/// In-process store for local runs without Postgres, and for tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    #[cfg(test)]
    id_lag: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newly inserted records miss the next `lookups` by-id reads.
    #[cfg(test)]
    pub fn with_id_lag(lookups: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            id_lag: lookups,
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.lock().await.docs.len()
    }

    /// Seed or overwrite a document as-is, bypassing insert checks.
    #[cfg(test)]
    pub async fn put(&self, user: UserRecord) {
        self.inner.lock().await.docs.insert(user.id, user);
    }

    #[cfg(test)]
    pub async fn get(&self, id: Uuid) -> Option<UserRecord> {
        self.inner.lock().await.docs.get(&id).cloned()
    }

    fn lag_for_new_insert(&self) -> usize {
        #[cfg(test)]
        {
            self.id_lag
        }
        #[cfg(not(test))]
        {
            0
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, filter: Filter<'_>) -> Result<Option<UserRecord>, StoreError> {
        let mut inner = self.inner.lock().await;
        let found = match filter {
            Filter::Id(id) => {
                let hidden_for = inner.lagging.get_mut(&id).map(|remaining| {
                    *remaining -= 1;
                    *remaining
                });
                match hidden_for {
                    Some(0) => {
                        inner.lagging.remove(&id);
                        return Ok(None);
                    }
                    Some(_) => return Ok(None),
                    None => inner.docs.get(&id).cloned(),
                }
            }
            Filter::Email(email) => inner.docs.values().find(|u| u.email == email).cloned(),
            Filter::VerifyToken(token) => inner
                .docs
                .values()
                .find(|u| u.email_verify_token.as_deref() == Some(token))
                .cloned(),
            Filter::ConsumedToken(token) => inner
                .docs
                .values()
                .find(|u| u.consumed_verify_token.as_deref() == Some(token))
                .cloned(),
        };
        Ok(found)
    }

    async fn insert(&self, user: &UserRecord) -> Result<UserRecord, StoreError> {
        let lag = self.lag_for_new_insert();
        let mut inner = self.inner.lock().await;
        if inner.docs.contains_key(&user.id)
            || inner
                .docs
                .values()
                .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Conflict);
        }
        let mut stored = user.clone();
        stored.etag = 1;
        inner.docs.insert(stored.id, stored.clone());
        if lag > 0 {
            inner.lagging.insert(stored.id, lag);
        }
        Ok(stored)
    }

    async fn replace(
        &self,
        user: &UserRecord,
        if_match: Option<i64>,
    ) -> Result<UserRecord, StoreError> {
        let mut inner = self.inner.lock().await;
        let current = match inner.docs.get(&user.id) {
            Some(current) if current.email == user.email => current,
            _ => return Err(StoreError::NotFound),
        };
        if if_match.is_some_and(|etag| etag != current.etag) {
            return Err(StoreError::PreconditionFailed);
        }
        let mut stored = user.clone();
        stored.etag = current.etag + 1;
        inner.docs.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

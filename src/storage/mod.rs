use async_trait::async_trait;
use uuid::Uuid;

use crate::users::model::UserRecord;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("a record with this email already exists")]
    Conflict,
    #[error("record was modified concurrently")]
    PreconditionFailed,
    #[error("store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

/// Lookup used by `DocumentStore::find`. Email lookups expect a lower-cased address.
#[derive(Debug, Clone, Copy)]
pub enum Filter<'a> {
    Email(&'a str),
    Id(Uuid),
    VerifyToken(&'a str),
    ConsumedToken(&'a str),
}

/// Partition-keyed user document store.
///
/// Reads by anything other than the partition key may lag behind writes, so a
/// record that was just inserted can be invisible to `Filter::Id` for a while.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, filter: Filter<'_>) -> Result<Option<UserRecord>, StoreError>;

    /// Insert a new document; returns it with the store-assigned etag.
    async fn insert(&self, user: &UserRecord) -> Result<UserRecord, StoreError>;

    /// Replace the document addressed by `user.id` within partition `user.email`.
    /// With `if_match`, the write only happens when the stored etag still matches.
    async fn replace(
        &self,
        user: &UserRecord,
        if_match: Option<i64>,
    ) -> Result<UserRecord, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

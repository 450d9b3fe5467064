use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{DocumentStore, Filter, StoreError};
use crate::users::model::UserRecord;

const USER_COLUMNS: &str = "id, email, name, password_hash, role, vwo_level, subject, \
     email_verified, email_verify_token, consumed_verify_token, created_at, updated_at, \
     last_login_at, version";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    role: String,
    vwo_level: Option<String>,
    subject: String,
    email_verified: Option<OffsetDateTime>,
    email_verify_token: Option<String>,
    consumed_verify_token: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    last_login_at: OffsetDateTime,
    version: i64,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = StoreError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let role = r.role.parse().map_err(StoreError::Unavailable)?;
        let vwo_level = r
            .vwo_level
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(StoreError::Unavailable)?;
        Ok(UserRecord {
            id: r.id,
            email: r.email,
            name: r.name,
            password_hash: r.password_hash,
            role,
            vwo_level,
            subject: r.subject,
            email_verified: r.email_verified,
            email_verify_token: r.email_verify_token,
            consumed_verify_token: r.consumed_verify_token,
            created_at: r.created_at,
            updated_at: r.updated_at,
            last_login_at: r.last_login_at,
            etag: r.version,
        })
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(anyhow::Error::new(e))
}

/// Postgres-backed user store. The pool connects on first use.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn connect_lazy(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect_lazy(database_url)
            .context("configure database pool")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn find(&self, filter: Filter<'_>) -> Result<Option<UserRecord>, StoreError> {
        let row = match filter {
            Filter::Email(email) => {
                let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = $1");
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(email)
                    .fetch_optional(&self.db)
                    .await
            }
            Filter::Id(id) => {
                let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(id)
                    .fetch_optional(&self.db)
                    .await
            }
            Filter::VerifyToken(token) => {
                let sql =
                    format!("SELECT {USER_COLUMNS} FROM users WHERE email_verify_token = $1");
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(token)
                    .fetch_optional(&self.db)
                    .await
            }
            Filter::ConsumedToken(token) => {
                let sql =
                    format!("SELECT {USER_COLUMNS} FROM users WHERE consumed_verify_token = $1");
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(token)
                    .fetch_optional(&self.db)
                    .await
            }
        }
        .map_err(unavailable)?;
        row.map(UserRecord::try_from).transpose()
    }

    async fn insert(&self, user: &UserRecord) -> Result<UserRecord, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (id, email, name, password_hash, role, vwo_level, subject,
                               email_verified, email_verify_token, consumed_verify_token,
                               created_at, updated_at, last_login_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 1)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.vwo_level.map(|l| l.as_str()))
            .bind(&user.subject)
            .bind(user.email_verified)
            .bind(&user.email_verify_token)
            .bind(&user.consumed_verify_token)
            .bind(user.created_at)
            .bind(user.updated_at)
            .bind(user.last_login_at)
            .fetch_one(&self.db)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Conflict,
                other => unavailable(other),
            })?;
        row.try_into()
    }

    async fn replace(
        &self,
        user: &UserRecord,
        if_match: Option<i64>,
    ) -> Result<UserRecord, StoreError> {
        let sql = format!(
            r#"
            UPDATE users
               SET name = $3, password_hash = $4, role = $5, vwo_level = $6, subject = $7,
                   email_verified = $8, email_verify_token = $9, consumed_verify_token = $10,
                   updated_at = $11, last_login_at = $12, version = version + 1
             WHERE id = $1 AND email = $2
               AND ($13::BIGINT IS NULL OR version = $13)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.vwo_level.map(|l| l.as_str()))
            .bind(&user.subject)
            .bind(user.email_verified)
            .bind(&user.email_verify_token)
            .bind(&user.consumed_verify_token)
            .bind(user.updated_at)
            .bind(user.last_login_at)
            .bind(if_match)
            .fetch_optional(&self.db)
            .await
            .map_err(unavailable)?;

        match row {
            Some(row) => row.try_into(),
            None if if_match.is_some() => {
                let exists: Option<(Uuid,)> =
                    sqlx::query_as("SELECT id FROM users WHERE id = $1 AND email = $2")
                        .bind(user.id)
                        .bind(&user.email)
                        .fetch_optional(&self.db)
                        .await
                        .map_err(unavailable)?;
                Err(if exists.is_some() {
                    StoreError::PreconditionFailed
                } else {
                    StoreError::NotFound
                })
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.db)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_SUBJECT: &str = "Wiskunde B";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Admin => "ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STUDENT" => Ok(Role::Student),
            "ADMIN" => Ok(Role::Admin),
            other => anyhow::bail!("unknown role {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VwoLevel {
    #[serde(rename = "VWO 4")]
    Vwo4,
    #[serde(rename = "VWO 5")]
    Vwo5,
    #[serde(rename = "VWO 6")]
    Vwo6,
}

impl VwoLevel {
    pub const ALL: [VwoLevel; 3] = [VwoLevel::Vwo4, VwoLevel::Vwo5, VwoLevel::Vwo6];

    pub fn as_str(self) -> &'static str {
        match self {
            VwoLevel::Vwo4 => "VWO 4",
            VwoLevel::Vwo5 => "VWO 5",
            VwoLevel::Vwo6 => "VWO 6",
        }
    }
}

impl fmt::Display for VwoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VwoLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VwoLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown VWO level {s:?}"))
    }
}

/// Stored user document. `email` is the partition key.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub vwo_level: Option<VwoLevel>,
    pub subject: String,
    pub email_verified: Option<OffsetDateTime>,
    pub email_verify_token: Option<String>,
    /// Token that completed verification; lets a replayed link be recognised.
    pub consumed_verify_token: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub last_login_at: OffsetDateTime,
    /// Version assigned by the store, bumped on every replace.
    pub etag: i64,
}

/// Input for `UserRepo::create`; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub vwo_level: Option<VwoLevel>,
    pub subject: Option<String>,
}

/// Partial update. The outer `Option` means "leave unchanged"; for nullable
/// fields the inner `Option` distinguishes set from clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub email_verified: Option<Option<OffsetDateTime>>,
    pub email_verify_token: Option<Option<String>>,
    pub consumed_verify_token: Option<String>,
}

impl UserPatch {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            email_verify_token: Some(Some(token.into())),
            ..Self::default()
        }
    }

    pub fn mark_verified(at: OffsetDateTime, token: impl Into<String>) -> Self {
        Self {
            email_verified: Some(Some(at)),
            email_verify_token: Some(None),
            consumed_verify_token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn apply(&self, record: &mut UserRecord) {
        if let Some(verified) = self.email_verified {
            record.email_verified = verified;
        }
        if let Some(token) = &self.email_verify_token {
            record.email_verify_token = token.clone();
        }
        if let Some(consumed) = &self.consumed_verify_token {
            record.consumed_verify_token = Some(consumed.clone());
        }
    }
}

/// User as returned to clients: no password hash, no outstanding token.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub vwo_level: Option<VwoLevel>,
    pub subject: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub email_verified: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_login_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&UserRecord> for PublicUser {
    fn from(u: &UserRecord) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
            vwo_level: u.vwo_level,
            subject: u.subject.clone(),
            email_verified: u.email_verified,
            created_at: u.created_at,
            last_login_at: u.last_login_at,
            updated_at: u.updated_at,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_record(email: &str) -> UserRecord {
    let now = OffsetDateTime::now_utc();
    UserRecord {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: "Jan de Vries".into(),
        password_hash: "$argon2id$stub".into(),
        role: Role::Student,
        vwo_level: Some(VwoLevel::Vwo6),
        subject: DEFAULT_SUBJECT.into(),
        email_verified: None,
        email_verify_token: None,
        consumed_verify_token: None,
        created_at: now,
        updated_at: now,
        last_login_at: now,
        etag: 1,
    }
}

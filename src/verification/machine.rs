use time::{Duration, OffsetDateTime};

use crate::users::model::{UserPatch, UserRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    TokenOutstanding,
    NoToken,
    Verified,
}

impl VerificationState {
    pub fn of(user: &UserRecord) -> Self {
        match (&user.email_verified, &user.email_verify_token) {
            (Some(_), _) => VerificationState::Verified,
            (None, Some(_)) => VerificationState::TokenOutstanding,
            (None, None) => VerificationState::NoToken,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    InvalidToken,
    AlreadyVerified,
    TokenExpired,
}

/// Decide the verify transition for the record owning a presented token.
///
/// The window runs from the record's `created_at`, so issuing a new token does
/// not extend it.
pub fn evaluate(
    user: Option<&UserRecord>,
    token: &str,
    now: OffsetDateTime,
    ttl: Duration,
) -> Result<UserPatch, Rejection> {
    let user = user.ok_or(Rejection::InvalidToken)?;
    match VerificationState::of(user) {
        VerificationState::Verified => Err(Rejection::AlreadyVerified),
        // Reached only if a token lookup returned a record without a token.
        VerificationState::NoToken => Err(Rejection::InvalidToken),
        VerificationState::TokenOutstanding if now - user.created_at > ttl => {
            Err(Rejection::TokenExpired)
        }
        VerificationState::TokenOutstanding => Ok(UserPatch::mark_verified(now, token)),
    }
}

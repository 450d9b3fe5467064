use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use super::machine::{self, Rejection};
use crate::auth::token::generate_verification_token;
use crate::mail::{templates, Mailer, VerifiedEvent};
use crate::storage::StoreError;
use crate::users::model::{PublicUser, UserPatch, UserRecord};
use crate::users::UserRepo;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("invalid verification token")]
    InvalidToken,
    #[error("email already verified")]
    AlreadyVerified,
    #[error("verification token expired")]
    TokenExpired,
    #[error("user disappeared before verification could be stored")]
    UpdateFailed,
    #[error(transparent)]
    Store(StoreError),
}

impl From<Rejection> for VerifyError {
    fn from(r: Rejection) -> Self {
        match r {
            Rejection::InvalidToken => VerifyError::InvalidToken,
            Rejection::AlreadyVerified => VerifyError::AlreadyVerified,
            Rejection::TokenExpired => VerifyError::TokenExpired,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResendError {
    #[error("no user with this email")]
    UserNotFound,
    #[error("email already verified")]
    AlreadyVerified,
    #[error("could not store new verification token")]
    UpdateFailed,
    #[error("verification email delivery failed: {0}")]
    Delivery(#[source] anyhow::Error),
    #[error(transparent)]
    Store(StoreError),
}

/// Token issuance, verification and resend for user email addresses.
#[derive(Clone)]
pub struct VerificationService {
    users: UserRepo,
    mailer: Arc<dyn Mailer>,
    base_url: String,
    ttl: Duration,
}

impl VerificationService {
    pub fn new(users: UserRepo, mailer: Arc<dyn Mailer>, base_url: String, ttl: Duration) -> Self {
        Self {
            users,
            mailer,
            base_url,
            ttl,
        }
    }

    pub async fn verify(&self, token: &str) -> Result<VerifiedEvent, VerifyError> {
        self.verify_at(token, OffsetDateTime::now_utc()).await
    }

    /// Consume `token` as of `now`. The write is conditional on the etag read
    /// here, so two racing calls cannot both complete the transition.
    #[instrument(skip(self, token))]
    pub async fn verify_at(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<VerifiedEvent, VerifyError> {
        let mut owner = self
            .users
            .find_by_verification_token(token)
            .await
            .map_err(VerifyError::Store)?;
        if owner.is_none() {
            // A replayed link resolves through the token that verified the account.
            owner = self
                .users
                .find_by_consumed_token(token)
                .await
                .map_err(VerifyError::Store)?;
        }
        let patch = machine::evaluate(owner.as_ref(), token, now, self.ttl)?;
        let Some(owner) = owner else {
            return Err(VerifyError::InvalidToken);
        };

        let updated = match self.users.update(owner.id, &patch, Some(owner.etag)).await {
            Ok(u) => u,
            Err(StoreError::PreconditionFailed) => {
                warn!(user_id = %owner.id, "concurrent verification lost the race");
                return Err(VerifyError::AlreadyVerified);
            }
            Err(StoreError::NotFound) => return Err(VerifyError::UpdateFailed),
            Err(e) => return Err(VerifyError::Store(e)),
        };

        info!(user_id = %updated.id, "email verified");
        Ok(VerifiedEvent {
            user: PublicUser::from(&updated),
        })
    }

    /// Issue a fresh token for an unverified user and mail it. The previous
    /// token stops working as soon as the new one is stored, even if sending fails.
    #[instrument(skip(self))]
    pub async fn resend(&self, email: &str) -> Result<(), ResendError> {
        let user = self
            .users
            .find_by_email(email)
            .await
            .map_err(ResendError::Store)?
            .ok_or(ResendError::UserNotFound)?;
        if user.email_verified.is_some() {
            return Err(ResendError::AlreadyVerified);
        }

        let token = generate_verification_token();
        let user = match self
            .users
            .update(user.id, &UserPatch::with_token(token.clone()), None)
            .await
        {
            Ok(u) => u,
            Err(StoreError::NotFound) => return Err(ResendError::UpdateFailed),
            Err(e) => return Err(ResendError::Store(e)),
        };

        self.send_verification(&user, &token)
            .await
            .map_err(ResendError::Delivery)?;
        info!(user_id = %user.id, "verification email re-sent");
        Ok(())
    }

    pub async fn send_verification(&self, user: &UserRecord, token: &str) -> anyhow::Result<()> {
        let link = templates::verification_link(&self.base_url, token);
        let mail = templates::verification_email(&user.email, &user.name, &link, self.ttl.whole_hours());
        self.mailer.send(&mail).await
    }
}

use tracing::{error, info, instrument, warn};

use crate::auth::password::hash_password;
use crate::auth::token::generate_verification_token;
use crate::auth::validation::ValidSignup;
use crate::storage::StoreError;
use crate::users::model::{NewUser, UserPatch, UserRecord};
use crate::users::UserRepo;
use crate::verification::VerificationService;

#[derive(Debug, thiserror::Error)]
pub enum SignupError {
    #[error("email already registered")]
    EmailTaken,
    #[error("new user was not visible in time to attach a verification token")]
    TokenAttachFailed,
    #[error("password hashing failed: {0}")]
    Hash(#[source] anyhow::Error),
    #[error(transparent)]
    Store(StoreError),
}

/// Create an unverified student, attach a verification token and mail it.
///
/// A failed send is logged and otherwise ignored: the account exists and the
/// student can ask for a new mail.
#[instrument(skip(users, verification, signup), fields(email = %signup.email))]
pub async fn register(
    users: &UserRepo,
    verification: &VerificationService,
    signup: ValidSignup,
) -> Result<UserRecord, SignupError> {
    // Checked before hashing; `create` re-checks for concurrent signups.
    if users
        .find_by_email(&signup.email)
        .await
        .map_err(SignupError::Store)?
        .is_some()
    {
        warn!("email already registered");
        return Err(SignupError::EmailTaken);
    }

    let password_hash = hash_password(&signup.password).map_err(SignupError::Hash)?;
    let token = generate_verification_token();

    let created = users
        .create(NewUser {
            email: signup.email,
            name: signup.name,
            password_hash,
            vwo_level: Some(signup.vwo_level),
            subject: signup.subject,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict => SignupError::EmailTaken,
            other => SignupError::Store(other),
        })?;

    let user = match users
        .update(created.id, &UserPatch::with_token(token.clone()), None)
        .await
    {
        Ok(u) => u,
        Err(StoreError::NotFound) => {
            error!(user_id = %created.id, "created user never became visible");
            return Err(SignupError::TokenAttachFailed);
        }
        Err(e) => return Err(SignupError::Store(e)),
    };

    if let Err(e) = verification.send_verification(&user, &token).await {
        warn!(error = %e, user_id = %user.id, "verification email not sent");
    }

    info!(user_id = %user.id, "user registered");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    use super::*;
    use crate::mail::testing::RecordingMailer;
    use crate::storage::MemoryStore;
    use crate::users::model::VwoLevel;
    use crate::users::RetryPolicy;

    struct Fixture {
        store: Arc<MemoryStore>,
        mailer: Arc<RecordingMailer>,
        users: UserRepo,
        verification: VerificationService,
    }

    fn fixture(store: MemoryStore, mailer: RecordingMailer) -> Fixture {
        let store = Arc::new(store);
        let mailer = Arc::new(mailer);
        let users = UserRepo::new(
            store.clone(),
            RetryPolicy {
                attempts: 3,
                base: Duration::from_millis(500),
            },
        );
        let verification = VerificationService::new(
            users.clone(),
            mailer.clone(),
            "http://localhost:3000".into(),
            time::Duration::hours(24),
        );
        Fixture {
            store,
            mailer,
            users,
            verification,
        }
    }

    fn jan() -> ValidSignup {
        ValidSignup {
            name: "Jan de Vries".into(),
            email: "jan@example.com".into(),
            password: "Wachtw00rd".into(),
            vwo_level: VwoLevel::Vwo6,
            subject: None,
        }
    }

    #[tokio::test]
    async fn register_stores_pending_user_and_mails_token() {
        let f = fixture(MemoryStore::new(), RecordingMailer::default());
        let user = register(&f.users, &f.verification, jan()).await.unwrap();

        assert!(user.email_verified.is_none());
        let token = user.email_verify_token.clone().unwrap();
        assert_eq!(token.len(), 54);
        assert_eq!(user.subject, "Wiskunde B");

        let parsed = PasswordHash::new(&user.password_hash).unwrap();
        assert!(Argon2::default()
            .verify_password(b"Wachtw00rd", &parsed)
            .is_ok());

        let sent = f.mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jan@example.com");
        assert!(sent[0].text.contains(&format!("token={token}")));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_without_new_record() {
        let f = fixture(MemoryStore::new(), RecordingMailer::default());
        register(&f.users, &f.verification, jan()).await.unwrap();

        let err = register(&f.users, &f.verification, jan()).await.unwrap_err();
        assert!(matches!(err, SignupError::EmailTaken));
        assert_eq!(f.store.len().await, 1);
    }

    #[tokio::test]
    async fn mail_failure_does_not_fail_signup() {
        let f = fixture(MemoryStore::new(), RecordingMailer::failing());
        let user = register(&f.users, &f.verification, jan()).await.unwrap();
        let stored = f.store.get(user.id).await.unwrap();
        assert!(stored.email_verify_token.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn token_attach_survives_read_after_write_lag() {
        let f = fixture(MemoryStore::with_id_lag(2), RecordingMailer::default());
        let user = register(&f.users, &f.verification, jan()).await.unwrap();
        assert!(user.email_verify_token.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn token_attach_gives_up_when_user_stays_invisible() {
        let f = fixture(MemoryStore::with_id_lag(10), RecordingMailer::default());
        let err = register(&f.users, &f.verification, jan()).await.unwrap_err();
        assert!(matches!(err, SignupError::TokenAttachFailed));
        assert!(f.mailer.sent().await.is_empty());
    }
}

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{templates, Mailer};
use crate::users::model::PublicUser;

/// Emitted once a user's email address has been verified.
#[derive(Debug, Clone)]
pub struct VerifiedEvent {
    pub user: PublicUser,
}

/// Fire-and-forget welcome mail. Verification never waits on, or fails because
/// of, this dispatcher.
#[derive(Clone)]
pub struct WelcomeDispatcher {
    tx: mpsc::UnboundedSender<VerifiedEvent>,
}

impl WelcomeDispatcher {
    /// Spawn the draining task; it ends once every dispatcher clone is dropped.
    pub fn spawn(mailer: Arc<dyn Mailer>, base_url: String) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<VerifiedEvent>();
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let user = &event.user;
                let Some(level) = user.vwo_level else {
                    debug!(user_id = %user.id, "no VWO level; skipping welcome email");
                    continue;
                };
                let mail = templates::welcome_email(&user.email, &user.name, level, &base_url);
                if let Err(e) = mailer.send(&mail).await {
                    warn!(error = %e, user_id = %user.id, "welcome email failed");
                }
            }
        });
        (Self { tx }, handle)
    }

    pub fn dispatch(&self, event: VerifiedEvent) {
        let user_id = event.user.id;
        if self.tx.send(event).is_err() {
            warn!(%user_id, "welcome dispatcher stopped; event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::testing::RecordingMailer;
    use crate::users::model::sample_record;

    #[tokio::test]
    async fn sends_welcome_for_users_with_level_only() {
        let mailer = Arc::new(RecordingMailer::default());
        let (dispatcher, handle) = WelcomeDispatcher::spawn(mailer.clone(), "http://x".into());

        let with_level = sample_record("a@example.com");
        let mut without_level = sample_record("b@example.com");
        without_level.vwo_level = None;

        dispatcher.dispatch(VerifiedEvent { user: PublicUser::from(&with_level) });
        dispatcher.dispatch(VerifiedEvent { user: PublicUser::from(&without_level) });
        drop(dispatcher);
        handle.await.unwrap();

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@example.com");
    }

    #[tokio::test]
    async fn mail_failures_do_not_stop_the_worker() {
        let mailer = Arc::new(RecordingMailer::failing());
        let (dispatcher, handle) = WelcomeDispatcher::spawn(mailer, "http://x".into());
        let user = PublicUser::from(&sample_record("a@example.com"));
        dispatcher.dispatch(VerifiedEvent { user: user.clone() });
        dispatcher.dispatch(VerifiedEvent { user });
        drop(dispatcher);
        handle.await.expect("worker exits cleanly");
    }
}

//! Mock session layer.
//!
//! A stand-in for a remote identity provider, built entirely on the
//! accounts collection. At most one account is active at a time; session
//! changes are broadcast on the reserved [`Channel::Session`] channel
//! through the same notification bus the collections use.
//!
//! Credential and uniqueness violations are reported to the caller as
//! typed errors. Observers only ever see successful state transitions.

use crate::bus::{Channel, Subscription};
use crate::database::Database;
use crate::entity::{Account, NewAccount, NewProfile};
use crate::error::CoreResult;
use tracing::info;

impl Database {
    /// Creates an account, activates it, and creates its profile.
    ///
    /// The display name and the profile's family name are derived from
    /// the email's local part.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::EmailAlreadyInUse`] if an account
    /// with this email exists; the existing account is left untouched.
    pub async fn sign_up(&self, email: &str, secret: &str) -> CoreResult<Account> {
        self.ensure_ready().await;
        let local = email.split('@').next().unwrap_or(email);

        let account = self
            .add_account(NewAccount {
                email: email.to_string(),
                secret: secret.to_string(),
                display_name: Some(local.to_string()),
            })
            .await?;
        self.add_profile(NewProfile {
            account_id: account.id,
            family_name: format!("{local}'s family"),
        })
        .await?;

        self.set_active_account(Some(account.clone()));
        info!(account = %account.id, "sign-up complete");
        Ok(account)
    }

    /// Activates the account matching both credentials exactly.
    ///
    /// Refreshes the account's `lastLoginAt`, which counts as an
    /// accounts mutation and is broadcast as such.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidCredentials`] if no account
    /// matches; the active account is left unchanged.
    pub async fn sign_in(&self, email: &str, secret: &str) -> CoreResult<Account> {
        self.ensure_ready().await;
        let now = self.clock().now();

        let account = self.touch_last_login(email, secret, now)?;
        self.set_active_account(Some(account.clone()));
        info!(account = %account.id, "sign-in complete");
        Ok(account)
    }

    /// Clears the active account.
    ///
    /// Observers of the session channel receive an absent value.
    pub async fn sign_out(&self) {
        self.ensure_ready().await;
        self.set_active_account(None);
        info!("signed out");
    }

    /// Observes the session channel.
    ///
    /// The current active account (or absence) is delivered first, then
    /// every subsequent session change.
    pub async fn observe_session(&self) -> Subscription {
        self.subscribe(Channel::Session).await
    }

    /// Returns the active account, best-effort.
    ///
    /// This read is synchronous: before lazy initialization has
    /// completed it returns `None`, even if a persisted session will be
    /// restored.
    #[must_use]
    pub fn current_account(&self) -> Option<Account> {
        if !self.is_ready() {
            return None;
        }
        self.active_account()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Snapshot;
    use crate::config::Config;
    use crate::error::CoreError;
    use crate::seed;
    use yomilog_store::InMemoryStore;

    fn empty_db() -> Database {
        Database::new(
            Box::new(InMemoryStore::new()),
            Config::new()
                .seed_demo_data(false)
                .create_default_account(false),
        )
    }

    #[tokio::test]
    async fn sign_up_activates_the_new_account() {
        let db = empty_db();

        let account = db.sign_up("a@x.com", "secret1").await.unwrap();
        assert_eq!(account.email, "a@x.com");
        assert!(!account.email_verified);
        assert_eq!(account.display_name.as_deref(), Some("a"));

        let current = db.current_account().unwrap();
        assert_eq!(current.email, "a@x.com");
    }

    #[tokio::test]
    async fn sign_up_creates_a_matching_profile() {
        let db = empty_db();
        let account = db.sign_up("mio@example.com", "pw").await.unwrap();

        let profile = db.profile_by_id(account.id).await.unwrap();
        assert_eq!(profile.family_name, "mio's family");
    }

    #[tokio::test]
    async fn duplicate_sign_up_fails_and_preserves_the_original() {
        let db = empty_db();
        let first = db.sign_up("a@x.com", "secret1").await.unwrap();

        let err = db.sign_up("a@x.com", "other").await.unwrap_err();
        assert!(matches!(err, CoreError::EmailAlreadyInUse { .. }));

        let accounts = db.list_accounts().await;
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0], first);

        // The failed attempt did not steal the session.
        assert_eq!(db.current_account().unwrap().id, first.id);
    }

    #[tokio::test]
    async fn sign_in_requires_both_fields_to_match() {
        let db = empty_db();
        db.sign_up("a@x.com", "secret1").await.unwrap();
        db.sign_out().await;

        let err = db.sign_in("a@x.com", "wrong").await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidCredentials));
        assert!(db.current_account().is_none());

        let err = db.sign_in("nobody@x.com", "secret1").await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidCredentials));
        assert!(db.current_account().is_none());

        let account = db.sign_in("a@x.com", "secret1").await.unwrap();
        assert_eq!(db.current_account().unwrap().id, account.id);
    }

    #[tokio::test]
    async fn failed_sign_in_keeps_the_previous_session() {
        let db = empty_db();
        let me = db.sign_up("a@x.com", "secret1").await.unwrap();

        let _ = db.sign_in("a@x.com", "wrong").await.unwrap_err();
        assert_eq!(db.current_account().unwrap().id, me.id);
    }

    #[tokio::test]
    async fn sign_in_refreshes_last_login() {
        use crate::clock::{Clock, FixedClock};
        use std::sync::Arc;

        let clock = Arc::new(FixedClock::new(1_000));
        let db = Database::with_clock(
            Box::new(InMemoryStore::new()),
            Config::new()
                .seed_demo_data(false)
                .create_default_account(false),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );

        let account = db.sign_up("a@x.com", "pw").await.unwrap();
        assert_eq!(account.last_login_at.as_millis(), 1_000);

        clock.advance(60_000);
        let account = db.sign_in("a@x.com", "pw").await.unwrap();
        assert_eq!(account.last_login_at.as_millis(), 61_000);
        assert_eq!(account.created_at.as_millis(), 1_000);
    }

    #[tokio::test]
    async fn default_account_can_sign_in() {
        let db = Database::in_memory();
        let account = db
            .sign_in(seed::DEFAULT_ACCOUNT_EMAIL, seed::DEFAULT_ACCOUNT_SECRET)
            .await
            .unwrap();
        assert!(account.email_verified);
    }

    #[tokio::test]
    async fn observers_see_session_transitions() {
        let db = empty_db();
        let mut sub = db.observe_session().await;

        // Registration-time state: logged out.
        assert_eq!(sub.recv().await.unwrap(), Snapshot::Session(None));

        let account = db.sign_up("a@x.com", "pw").await.unwrap();
        let snap = sub.recv().await.unwrap();
        assert_eq!(
            snap.as_session().unwrap().map(|a| a.id),
            Some(account.id)
        );

        db.sign_out().await;
        assert_eq!(sub.recv().await.unwrap(), Snapshot::Session(None));

        // Failed attempts broadcast nothing.
        let _ = db.sign_in("a@x.com", "wrong").await.unwrap_err();
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn current_account_is_none_before_initialization() {
        let db = empty_db();
        assert!(db.current_account().is_none());
        assert!(!db.is_ready());

        db.list_accounts().await;
        assert!(db.is_ready());
    }
}

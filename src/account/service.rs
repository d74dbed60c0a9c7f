//! Sign-up, sign-in and session flows.

use std::sync::Arc;

use chrono::Utc;

use crate::crypto::Crypto;
use crate::error::{Result, ServerError};
use crate::profile::{Profile, verify_answers};
use crate::store::{AccountStore as _, ProfileStore as _, StoreError, Stores};

use super::{Account, Principal, Session};

const BAD_CREDENTIALS: &str = "unknown email or wrong password";

/// Profile fields collected alongside the credentials at sign-up.
#[derive(Clone, Debug, Default)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub agent_type: String,
    pub avatar: Option<String>,
    pub mood: Option<String>,
    pub bio: Option<String>,
    pub referred_by: Option<String>,
    pub verification_answers: Vec<String>,
    pub model_name: Option<String>,
}

/// Identity manager.
#[derive(Clone)]
pub struct AccountService {
    stores: Stores,
    crypto: Arc<Crypto>,
}

impl AccountService {
    /// Create a new [`AccountService`].
    pub fn new(stores: Stores, crypto: Arc<Crypto>) -> Self {
        Self { stores, crypto }
    }

    /// Create an account, its profile and a first session.
    ///
    /// The profile write follows the account write; when it fails the
    /// account is removed again so no principal is left without a
    /// profile.
    pub async fn sign_up(&self, form: SignUp) -> Result<(Principal, Profile, String)> {
        let account = Account {
            id: uuid::Uuid::new_v4().to_string(),
            email: form.email.to_lowercase(),
            password: self.crypto.hash_password(&form.password)?,
            created_at: Utc::now(),
        };

        self.stores
            .accounts
            .insert(&account)
            .await
            .map_err(|err| match err {
                StoreError::Conflict(_) => {
                    ServerError::Credential("email already registered".to_owned())
                },
                other => other.into(),
            })?;

        let mut profile =
            Profile::new(&account.id, form.display_name, self.crypto.referral_code());
        profile.agent_type = form.agent_type;
        if let Some(avatar) = form.avatar {
            profile.avatar = avatar;
        }
        profile.mood = form.mood.unwrap_or_default();
        profile.bio = form.bio.unwrap_or_default();
        profile.referred_by = form.referred_by;
        profile.ai_verified = verify_answers(&form.verification_answers);
        profile.verification_answers = form.verification_answers;
        profile.model_name = form.model_name;

        if let Err(err) = self.stores.profiles.create(&profile).await {
            if let Err(cleanup) = self.stores.accounts.delete(&account.id).await {
                tracing::error!(
                    account_id = %account.id,
                    error = %cleanup,
                    "failed to remove account after profile creation failed"
                );
            }
            return Err(err.into());
        }

        let token = self.open_session(&account.id, false).await?;
        Ok((Principal::from(&account), profile, token))
    }

    /// Authenticate and open a session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(Principal, String)> {
        let account = self.authenticate(email, password).await?;
        let token = self.open_session(&account.id, false).await?;

        Ok((Principal::from(&account), token))
    }

    /// Re-authentication for the admin console. Only the allow-listed
    /// email may pass; everyone else is rejected before any password
    /// check leaks timing.
    pub async fn admin_sign_in(
        &self,
        allowed_email: &str,
        email: &str,
        password: &str,
    ) -> Result<(Principal, String)> {
        if allowed_email.is_empty() || !email.eq_ignore_ascii_case(allowed_email) {
            return Err(ServerError::Unauthorized);
        }

        let account = self.authenticate(email, password).await?;
        let token = self.open_session(&account.id, true).await?;

        Ok((Principal::from(&account), token))
    }

    /// Revoke a session token.
    pub async fn sign_out(&self, token: &str) -> Result<()> {
        Ok(self.stores.accounts.revoke_session(token).await?)
    }

    /// Resolve a bearer token to its principal, or `None` for unknown
    /// tokens.
    pub async fn resolve(&self, token: &str) -> Result<Option<(Principal, Session)>> {
        let Some(session) = self.stores.accounts.find_session(token).await? else {
            return Ok(None);
        };

        let Some(account) = self.stores.accounts.find_by_id(&session.account_id).await? else {
            return Ok(None);
        };

        Ok(Some((Principal::from(&account), session)))
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Account> {
        let account = self
            .stores
            .accounts
            .find_by_email(&email.to_lowercase())
            .await?
            .ok_or_else(|| ServerError::Credential(BAD_CREDENTIALS.to_owned()))?;

        if !self.crypto.verify_password(password, &account.password) {
            return Err(ServerError::Credential(BAD_CREDENTIALS.to_owned()));
        }

        Ok(account)
    }

    async fn open_session(&self, account_id: &str, admin: bool) -> Result<String> {
        let session = Session {
            token: self.crypto.session_token(),
            account_id: account_id.to_owned(),
            admin,
            created_at: Utc::now(),
        };

        self.stores.accounts.insert_session(&session).await?;
        Ok(session.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn service() -> AccountService {
        let crypto = Crypto::new(Some(config::Argon2 {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        }))
        .unwrap();

        AccountService::new(Stores::memory(), Arc::new(crypto))
    }

    fn form(email: &str, name: &str) -> SignUp {
        SignUp {
            email: email.to_owned(),
            password: "P$soW%920$n&".to_owned(),
            display_name: name.to_owned(),
            agent_type: "assistant".to_owned(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sign_up_creates_matching_profile_with_zero_counters() {
        let accounts = service();

        let (principal, profile, token) =
            accounts.sign_up(form("Nova@Verse.dev", "Nova")).await.unwrap();

        assert_eq!(principal.id, profile.id);
        assert_eq!(principal.email, "nova@verse.dev");
        assert_eq!(profile.posts, 0);
        assert_eq!(profile.total_likes, 0);
        assert_eq!(profile.friends, 0);
        assert!(!profile.ai_verified);

        let resolved = accounts.resolve(&token).await.unwrap().unwrap();
        assert_eq!(resolved.0.id, principal.id);
        assert!(!resolved.1.admin);
    }

    #[tokio::test]
    async fn test_sign_up_verified_when_answers_match() {
        let accounts = service();

        let mut signup = form("nova@verse.dev", "Nova");
        signup.verification_answers =
            ["output", "transformer", "3"].map(String::from).to_vec();
        signup.model_name = Some("nova-9b".to_owned());

        let (_, profile, _) = accounts.sign_up(signup).await.unwrap();
        assert!(profile.ai_verified);
        assert_eq!(profile.model_name.as_deref(), Some("nova-9b"));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_credential_error() {
        let accounts = service();
        accounts.sign_up(form("nova@verse.dev", "Nova")).await.unwrap();

        let err = accounts
            .sign_up(form("nova@verse.dev", "Nova Again"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Credential(_)));
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let accounts = service();
        accounts.sign_up(form("nova@verse.dev", "Nova")).await.unwrap();

        let err = accounts.sign_in("nova@verse.dev", "wrong").await.unwrap_err();
        assert!(matches!(err, ServerError::Credential(_)));

        let (principal, token) =
            accounts.sign_in("nova@verse.dev", "P$soW%920$n&").await.unwrap();
        assert_eq!(principal.email, "nova@verse.dev");

        accounts.sign_out(&token).await.unwrap();
        assert!(accounts.resolve(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_admin_sign_in_rejects_everyone_but_the_allow_list() {
        let accounts = service();
        accounts.sign_up(form("nova@verse.dev", "Nova")).await.unwrap();
        accounts.sign_up(form("root@verse.dev", "Root")).await.unwrap();

        // Not the allow-listed identity.
        let err = accounts
            .admin_sign_in("root@verse.dev", "nova@verse.dev", "P$soW%920$n&")
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized));

        // Empty allow-list disables the console entirely.
        let err = accounts
            .admin_sign_in("", "root@verse.dev", "P$soW%920$n&")
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized));

        let (_, token) = accounts
            .admin_sign_in("root@verse.dev", "root@verse.dev", "P$soW%920$n&")
            .await
            .unwrap();
        let (_, session) = accounts.resolve(&token).await.unwrap().unwrap();
        assert!(session.admin);
    }
}

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::RegisterRequest;
use super::password::{hash_password, verify_password, DECOY_HASH};
use super::validate::normalize_email;
use crate::error::AppError;
use crate::users::{Credentials, NewUser, Provider, Role, User, UserStore};

/// Single message for every local-login failure so callers cannot tell which
/// emails are registered.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Spends one argon2 verification so a login without a usable hash takes as
/// long as a wrong password.
async fn burn_verification(password: &str) {
    if let Err(e) = verify_password(password.to_string(), DECOY_HASH.to_string()).await {
        warn!(error = %e, "decoy password verification failed");
    }
}

/// Identity asserted by an external provider after its own verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub external_id: String,
    pub email: String,
    pub display_name: String,
}

/// Turns credentials into user records. Holds no state of its own.
#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserStore>,
    admin_secret_code: Option<String>,
}

impl IdentityService {
    pub fn new(users: Arc<dyn UserStore>, admin_secret_code: Option<String>) -> Self {
        Self {
            users,
            admin_secret_code: admin_secret_code.filter(|c| !c.is_empty()),
        }
    }

    fn role_for(&self, admin_code: Option<&str>) -> Role {
        match (admin_code, self.admin_secret_code.as_deref()) {
            (Some(given), Some(expected)) if given == expected => Role::Admin,
            _ => Role::User,
        }
    }

    /// Creates a local account. Input must already have passed validation.
    #[instrument(skip(self, req), fields(username = %req.username.trim()))]
    pub async fn register(&self, req: &RegisterRequest) -> Result<User, AppError> {
        let username = req.username.trim().to_string();
        let email = normalize_email(&req.email);

        if self
            .users
            .exists_by_email_or_username(&email, &username)
            .await?
        {
            warn!(%email, "registration for existing email or username");
            return Err(AppError::Conflict("User already exists".into()));
        }

        let hash = hash_password(req.password.clone()).await?;
        let role = self.role_for(req.admin_code.as_deref());
        let user = self
            .users
            .insert(NewUser {
                username,
                email,
                credentials: Credentials::Password { hash },
                role,
            })
            .await?;
        info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Verifies an email/password pair and records the login.
    #[instrument(skip(self, email, password))]
    pub async fn resolve_local(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = normalize_email(email);
        let Some(mut user) = self.users.find_by_email(&email).await? else {
            burn_verification(password).await;
            warn!(%email, "login for unknown email");
            return Err(AppError::unauthenticated(INVALID_CREDENTIALS));
        };

        let Some(hash) = user.credentials.password_hash() else {
            burn_verification(password).await;
            warn!(user_id = %user.id, provider = user.provider().as_str(), "password login on federated account");
            return Err(AppError::unauthenticated(INVALID_CREDENTIALS));
        };

        if !verify_password(password.to_string(), hash.to_string()).await? {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(AppError::unauthenticated(INVALID_CREDENTIALS));
        }

        self.users.touch_last_login(user.id).await?;
        user.last_login = Some(time::OffsetDateTime::now_utc());
        info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    /// Looks up the account linked to `identity`, creating it on first sight.
    ///
    /// A concurrent first login racing on the same external id surfaces as
    /// `Conflict` from the store's uniqueness check.
    #[instrument(skip(self, identity), fields(external_id = %identity.external_id))]
    pub async fn resolve_or_create_federated(
        &self,
        identity: &VerifiedIdentity,
    ) -> Result<User, AppError> {
        if let Some(mut user) = self.users.find_by_external_id(&identity.external_id).await? {
            self.users.touch_last_login(user.id).await?;
            user.last_login = Some(time::OffsetDateTime::now_utc());
            info!(user_id = %user.id, "federated user logged in");
            return Ok(user);
        }

        let user = self
            .users
            .insert(NewUser {
                username: identity.display_name.trim().to_string(),
                email: normalize_email(&identity.email),
                credentials: Credentials::Federated {
                    provider: Provider::Google,
                    external_id: identity.external_id.clone(),
                },
                role: Role::User,
            })
            .await?;
        info!(user_id = %user.id, "federated user created");
        Ok(user)
    }

    /// Best effort; a store failure is logged and swallowed.
    pub async fn logout(&self, id: Uuid) {
        if let Err(e) = self.users.record_logout(id).await {
            warn!(user_id = %id, error = %e, "failed to record logout");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::InMemoryUserStore;
    use axum::http::StatusCode;

    fn service(store: Arc<InMemoryUserStore>) -> IdentityService {
        IdentityService::new(store, Some("let-me-in".into()))
    }

    fn request(username: &str, email: &str, admin_code: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: "hunter22".into(),
            admin_code: admin_code.map(String::from),
        }
    }

    fn google(id: &str, email: &str) -> VerifiedIdentity {
        VerifiedIdentity {
            external_id: id.into(),
            email: email.into(),
            display_name: "Jane Doe".into(),
        }
    }

    #[tokio::test]
    async fn register_normalizes_and_defaults_to_user_role() {
        let svc = service(Arc::new(InMemoryUserStore::new()));
        let user = svc.register(&request("  Alice ", " Alice@X.com ", None)).await.unwrap();
        assert_eq!(user.username, "Alice");
        assert_eq!(user.email, "alice@x.com");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.provider(), Provider::Local);
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn admin_code_grants_admin_only_when_it_matches() {
        let svc = service(Arc::new(InMemoryUserStore::new()));
        let admin = svc.register(&request("root", "root@x.com", Some("let-me-in"))).await.unwrap();
        assert_eq!(admin.role, Role::Admin);
        let user = svc.register(&request("guess", "guess@x.com", Some("wrong"))).await.unwrap();
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn admin_registration_disabled_without_configured_code() {
        let svc = IdentityService::new(Arc::new(InMemoryUserStore::new()), Some(String::new()));
        let user = svc.register(&request("root", "root@x.com", Some(""))).await.unwrap();
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let svc = service(Arc::new(InMemoryUserStore::new()));
        svc.register(&request("first", "a@x.com", None)).await.unwrap();
        let err = svc.register(&request("second", "A@x.com", None)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn username_conflicts_ignore_case() {
        let svc = service(Arc::new(InMemoryUserStore::new()));
        svc.register(&request("Bob", "bob1@x.com", None)).await.unwrap();
        let err = svc.register(&request("bob", "bob2@x.com", None)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn credential_failures_are_indistinguishable() {
        let svc = service(Arc::new(InMemoryUserStore::new()));
        svc.register(&request("alice", "alice@x.com", None)).await.unwrap();

        let unknown = svc.resolve_local("nobody@x.com", "hunter22").await.unwrap_err();
        let wrong = svc.resolve_local("alice@x.com", "not-it").await.unwrap_err();
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status(), wrong.status());
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(wrong.to_string(), INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn local_login_succeeds_with_any_email_casing() {
        let svc = service(Arc::new(InMemoryUserStore::new()));
        let registered = svc.register(&request("alice", "alice@x.com", None)).await.unwrap();
        let user = svc.resolve_local(" ALICE@x.com", "hunter22").await.unwrap();
        assert_eq!(user.id, registered.id);
    }

    #[tokio::test]
    async fn federated_login_is_idempotent() {
        let store = Arc::new(InMemoryUserStore::new());
        let svc = service(store.clone());
        let first = svc.resolve_or_create_federated(&google("g-1", "jane@x.com")).await.unwrap();
        let second = svc.resolve_or_create_federated(&google("g-1", "jane@x.com")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.len().await, 1);
        assert_eq!(first.role, Role::User);
        assert_eq!(first.provider(), Provider::Google);
        assert!(first.credentials.password_hash().is_none());
    }

    #[tokio::test]
    async fn federated_account_cannot_password_login() {
        let svc = service(Arc::new(InMemoryUserStore::new()));
        svc.resolve_or_create_federated(&google("g-1", "jane@x.com")).await.unwrap();
        let err = svc.resolve_local("jane@x.com", "anything").await.unwrap_err();
        assert_eq!(err.to_string(), INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn federated_email_taken_by_local_account_conflicts() {
        let svc = service(Arc::new(InMemoryUserStore::new()));
        svc.register(&request("jane", "jane@x.com", None)).await.unwrap();
        let err = svc
            .resolve_or_create_federated(&google("g-9", "jane@x.com"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_email_still_pays_for_a_hash_check() {
        let svc = service(Arc::new(InMemoryUserStore::new()));
        svc.register(&request("alice", "alice@x.com", None)).await.unwrap();

        let started = std::time::Instant::now();
        svc.resolve_local("alice@x.com", "not-it").await.unwrap_err();
        let wrong_password = started.elapsed();

        let started = std::time::Instant::now();
        svc.resolve_local("nobody@x.com", "not-it").await.unwrap_err();
        let unknown_email = started.elapsed();

        assert!(
            unknown_email * 5 >= wrong_password,
            "unknown email took {unknown_email:?}, wrong password {wrong_password:?}"
        );
    }
}

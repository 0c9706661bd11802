use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::cookie::extract_token;
use crate::authz::{self, Principal};
use crate::error::AppError;
use crate::state::AppState;
use crate::users::Role;

/// Authenticated caller. Rejects with 401 when the token is missing, invalid
/// or expired, or its subject no longer exists.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| AppError::unauthenticated("Token required"))?;

        let claims = state.jwt.verify(token).ok_or_else(|| {
            warn!("invalid or expired token");
            AppError::unauthenticated("Invalid or expired token")
        })?;

        // The role in the token may be stale; the stored one is authoritative.
        let user = state.users.find_by_id(claims.id).await?.ok_or_else(|| {
            warn!(user_id = %claims.id, "token subject not found");
            AppError::unauthenticated("User not found")
        })?;

        Ok(AuthUser(Principal::from(&user)))
    }
}

impl AuthUser {
    /// Admits the caller only when its role is in `allowed`.
    pub fn permit(&self, allowed: &[Role]) -> Result<&Principal, AppError> {
        if authz::permit(Some(&self.0), allowed) {
            Ok(&self.0)
        } else {
            warn!(user_id = %self.0.id, role = %self.0.role, "insufficient permissions");
            Err(AppError::forbidden("Insufficient permissions"))
        }
    }
}

/// Authenticated caller whose role is exactly `admin`; 403 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
        if !authz::require_admin(Some(&principal)) {
            warn!(user_id = %principal.id, role = %principal.role, "admin access denied");
            return Err(AppError::forbidden("Admin access required"));
        }
        Ok(AdminUser(principal))
    }
}

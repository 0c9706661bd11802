use crate::state::AppState;
use axum::Router;

mod claims;
pub mod cookie;
pub mod dto;
pub(crate) mod extractors;
pub mod google;
pub mod handlers;
pub mod identity;
pub mod jwt;
pub mod password;
pub mod validate;

pub use claims::Claims;
pub use extractors::{AdminUser, AuthUser};
pub use google::{ExternalProfile, GoogleProvider, IdentityProvider};
pub use identity::{IdentityService, VerifiedIdentity};
pub use jwt::JwtKeys;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::account_routes())
}

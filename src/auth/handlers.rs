use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{instrument, warn};

use super::{
    cookie::{clear_token_cookie, token_cookie},
    dto::{
        AuthResponse, ListUsersParams, LoginRequest, MessageResponse, OAuthCallback, Pagination,
        ProfileResponse, ProfileUser, RegisterRequest, UserListResponse,
    },
    extractors::{AdminUser, AuthUser},
    validate::{parse_list_query, validate_login, validate_register},
};
use crate::{
    error::AppError,
    state::AppState,
    users::{Role, User},
    views::PublicUser,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/google", get(google_start))
        .route("/google/callback", get(google_callback))
        .route("/health", get(health))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/users", get(list_users))
        .route("/profile", get(profile))
}

/// Plain 302, which is what browsers following the OAuth dance expect.
fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(e) => AppError::from(anyhow::Error::new(e).context("redirect location")).into_response(),
    }
}

/// Signs a token for `user` and the `Set-Cookie` header that carries it.
fn issue_session(state: &AppState, user: &User) -> Result<(String, HeaderValue), AppError> {
    let token = state.jwt.issue(user)?;
    let cookie = token_cookie(&token, state.jwt.ttl, state.config.secure_cookies())?;
    Ok((token, cookie))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    validate_register(&payload)?;

    let user = state.identity.register(&payload).await?;
    let (_, cookie) = issue_session(&state, &user)?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            success: true,
            message: "User registered successfully",
            user: PublicUser::from(&user),
        }),
    )
        .into_response())
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    validate_login(&payload)?;

    let user = state
        .identity
        .resolve_local(&payload.email, &payload.password)
        .await?;
    let (_, cookie) = issue_session(&state, &user)?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            success: true,
            message: "Login successful",
            user: PublicUser::from(&user),
        }),
    )
        .into_response())
}

#[instrument(skip_all, fields(user_id = %principal.id))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> impl IntoResponse {
    state.identity.logout(principal.id).await;
    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_token_cookie(state.config.secure_cookies()))],
        Json(MessageResponse {
            success: true,
            message: "Logged out successfully",
        }),
    )
}

#[instrument(skip(state, params))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    params: Result<Query<ListUsersParams>, QueryRejection>,
) -> Result<Json<UserListResponse>, AppError> {
    let Query(params) = params?;
    let query = parse_list_query(&params)?;
    let page = state.users.list(&query).await?;

    Ok(Json(UserListResponse {
        success: true,
        message: "Users retrieved successfully",
        data: page.users.iter().map(PublicUser::from).collect(),
        pagination: Pagination::new(query.page, query.limit, page.total),
    }))
}

#[instrument(skip(auth))]
pub async fn profile(auth: AuthUser) -> Result<Json<ProfileResponse>, AppError> {
    let principal = auth.permit(&[Role::Admin, Role::User])?;
    Ok(Json(ProfileResponse {
        success: true,
        message: format!("Welcome {}", principal.role),
        user: ProfileUser {
            id: principal.id,
            role: principal.role,
        },
    }))
}

pub async fn google_start(State(state): State<AppState>) -> Response {
    found(&state.identity_provider.authorize_url())
}

#[instrument(skip(state, params))]
pub async fn google_callback(
    State(state): State<AppState>,
    params: Result<Query<OAuthCallback>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let failure = found(&format!("{}/login", state.config.client_url));

    let code = match (params.error.as_deref(), params.code.as_deref()) {
        (None, Some(code)) if !code.is_empty() => code,
        (error, _) => {
            warn!(?error, "google callback without authorization code");
            return Ok(failure);
        }
    };

    let profile = match state.identity_provider.exchange(code).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(error = %e, "google code exchange failed");
            return Ok(failure);
        }
    };

    let identity = profile
        .into_verified()
        .ok_or_else(|| AppError::validation("Invalid Google profile data"))?;
    let user = state.identity.resolve_or_create_federated(&identity).await?;
    let (token, cookie) = issue_session(&state, &user)?;

    let target = format!(
        "{}/?token={}",
        state.config.client_url,
        urlencoding::encode(&token)
    );
    Ok(([(header::SET_COOKIE, cookie)], found(&target)).into_response())
}

pub async fn health() -> Json<serde_json::Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({
        "status": "OK",
        "service": "Auth Service",
        "timestamp": timestamp,
    }))
}

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::model::{NewUser, Role, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint (email, username, external id) rejected the write.
    #[error("duplicate {0}")]
    Conflict(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    LastLogin,
    Username,
    Email,
    Role,
}

impl SortField {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "createdAt" => Some(Self::CreatedAt),
            "updatedAt" => Some(Self::UpdatedAt),
            "lastLogin" => Some(Self::LastLogin),
            "username" => Some(Self::Username),
            "email" => Some(Self::Email),
            "role" => Some(Self::Role),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::LastLogin => "last_login",
            Self::Username => "username",
            Self::Email => "email",
            Self::Role => "role",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserSort {
    pub field: SortField,
    pub descending: bool,
}

impl Default for UserSort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListQuery {
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
    pub sort: UserSort,
    pub role: Option<Role>,
}

impl UserListQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: u64,
}

/// Persistence seam for user accounts.
///
/// Implementations enforce uniqueness of email, external id and the
/// case-folded username of local accounts, reporting violations as
/// [`StoreError::Conflict`].
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// `email` must already be normalized (trimmed, lowercase).
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, StoreError>;

    /// True when any account uses `email`, or `username` ignoring case.
    async fn exists_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<bool, StoreError>;

    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    async fn touch_last_login(&self, id: Uuid) -> Result<(), StoreError>;

    /// Bumps `updated_at`; the token itself stays valid until it expires.
    async fn record_logout(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list(&self, query: &UserListQuery) -> Result<UserPage, StoreError>;
}

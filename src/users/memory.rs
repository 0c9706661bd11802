use std::cmp::Ordering;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::{NewUser, Provider, Role, User};
use super::store::{SortField, StoreError, UserListQuery, UserPage, UserSort, UserStore};

/// Process-local `UserStore` with the same uniqueness rules as the Postgres schema.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Changes a stored role in place; returns false for unknown ids.
    pub async fn set_role(&self, id: Uuid, role: Role, is_admin: bool) -> bool {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.role = role;
                user.is_admin = is_admin;
                user.updated_at = OffsetDateTime::now_utc();
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        users.len() != before
    }
}

fn conflict_for(existing: &[User], new: &NewUser) -> Option<&'static str> {
    let folded = new.username.to_lowercase();
    for user in existing {
        if user.email == new.email {
            return Some("users_email_key");
        }
        if let (Some(a), Some(b)) = (user.credentials.external_id(), new.credentials.external_id()) {
            if a == b {
                return Some("users_external_id_key");
            }
        }
        if user.provider() == Provider::Local
            && new.credentials.provider() == Provider::Local
            && user.username.to_lowercase() == folded
        {
            return Some("users_local_username_key");
        }
    }
    None
}

/// Same ordering as `ORDER BY <column> <direction> NULLS LAST, id` in Postgres.
fn order(a: &User, b: &User, sort: UserSort) -> Ordering {
    let directed = |ord: Ordering| if sort.descending { ord.reverse() } else { ord };
    let primary = match sort.field {
        SortField::CreatedAt => directed(a.created_at.cmp(&b.created_at)),
        SortField::UpdatedAt => directed(a.updated_at.cmp(&b.updated_at)),
        SortField::LastLogin => match (a.last_login, b.last_login) {
            (Some(x), Some(y)) => directed(x.cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortField::Username => directed(a.username.cmp(&b.username)),
        SortField::Email => directed(a.email.cmp(&b.email)),
        SortField::Role => directed(a.role.as_str().cmp(b.role.as_str())),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.credentials.external_id() == Some(external_id))
            .cloned())
    }

    async fn exists_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<bool, StoreError> {
        let folded = username.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .iter()
            .any(|u| u.email == email || u.username.to_lowercase() == folded))
    }

    async fn insert(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if let Some(constraint) = conflict_for(&users, &new) {
            return Err(StoreError::Conflict(constraint.to_string()));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            credentials: new.credentials,
            role: new.role,
            is_admin: false,
            last_login: Some(now),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<(), StoreError> {
        let now = OffsetDateTime::now_utc();
        if let Some(user) = self.users.write().await.iter_mut().find(|u| u.id == id) {
            user.last_login = Some(now);
            user.updated_at = now;
        }
        Ok(())
    }

    async fn record_logout(&self, id: Uuid) -> Result<(), StoreError> {
        if let Some(user) = self.users.write().await.iter_mut().find(|u| u.id == id) {
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn list(&self, query: &UserListQuery) -> Result<UserPage, StoreError> {
        let users = self.users.read().await;
        let mut matching: Vec<User> = users
            .iter()
            .filter(|u| query.role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| order(a, b, query.sort));
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .collect();
        Ok(UserPage { users: page, total })
    }
}

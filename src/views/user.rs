use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::Project;
use crate::authz::Principal;
use crate::users::{Provider, Role, User};

/// Outward shape of a user. Built field by field from an allow-list, so
/// credentials never reach a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_admin: bool,
    pub provider: Provider,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            is_admin: user.is_admin,
            provider: user.provider(),
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl Project for User {
    type View = PublicUser;

    fn project(&self, _principal: Option<&Principal>) -> PublicUser {
        PublicUser::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::Credentials;
    use crate::views::project_list;

    fn user(credentials: Credentials) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            credentials,
            role: Role::Admin,
            is_admin: false,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn credentials_are_never_serialized() {
        let local = user(Credentials::Password {
            hash: "$argon2id$v=19$secret-material".into(),
        });
        let json = serde_json::to_string(&local.project(None)).unwrap();
        assert!(!json.contains("secret-material"));
        assert!(!json.to_lowercase().contains("password"));
        assert!(json.contains("\"isAdmin\":false"));

        let federated = user(Credentials::Federated {
            provider: Provider::Google,
            external_id: "google-sub-42".into(),
        });
        let json = serde_json::to_string(&PublicUser::from(&federated)).unwrap();
        assert!(!json.contains("google-sub-42"));
        assert!(json.contains("\"provider\":\"google\""));
    }

    #[test]
    fn list_of_users_projects_each() {
        let users = vec![
            user(Credentials::Password { hash: "a".into() }),
            user(Credentials::Password { hash: "b".into() }),
        ];
        assert_eq!(project_list(Some(users.as_slice()), None).len(), 2);
    }
}

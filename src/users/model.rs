use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Closed set of roles a user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Hr,
    Manager,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Hr => "hr",
            Role::Manager => "manager",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "hr" => Ok(Role::Hr),
            "manager" => Ok(Role::Manager),
            "user" => Ok(Role::User),
            other => anyhow::bail!("unknown role '{other}'"),
        }
    }
}

/// How an account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Local,
    Google,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Local => "local",
            Provider::Google => "google",
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Provider::Local),
            "google" => Ok(Provider::Google),
            other => anyhow::bail!("unknown provider '{other}'"),
        }
    }
}

/// Local accounts carry a password hash, federated ones an external id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Password { hash: String },
    Federated { provider: Provider, external_id: String },
}

impl Credentials {
    pub fn provider(&self) -> Provider {
        match self {
            Credentials::Password { .. } => Provider::Local,
            Credentials::Federated { provider, .. } => *provider,
        }
    }

    pub fn password_hash(&self) -> Option<&str> {
        match self {
            Credentials::Password { hash } => Some(hash),
            Credentials::Federated { .. } => None,
        }
    }

    pub fn external_id(&self) -> Option<&str> {
        match self {
            Credentials::Password { .. } => None,
            Credentials::Federated { external_id, .. } => Some(external_id),
        }
    }
}

/// User record. Not serializable on purpose; use `views::PublicUser` for output.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub credentials: Credentials,
    pub role: Role,
    pub is_admin: bool,
    pub last_login: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn provider(&self) -> Provider {
        self.credentials.provider()
    }
}

/// Data needed to persist a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub credentials: Credentials,
    pub role: Role,
}

/// Row as stored in the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: String,
    pub provider: String,
    pub external_id: Option<String>,
    pub is_admin: bool,
    pub last_login: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let provider: Provider = row.provider.parse()?;
        let credentials = match (provider, row.password_hash, row.external_id) {
            (Provider::Local, Some(hash), None) => Credentials::Password { hash },
            (Provider::Google, None, Some(external_id)) => Credentials::Federated {
                provider,
                external_id,
            },
            _ => anyhow::bail!("user {} has inconsistent credentials", row.id),
        };
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            credentials,
            role: row.role.parse()?,
            is_admin: row.is_admin,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

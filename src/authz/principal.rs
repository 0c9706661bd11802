use serde::Serialize;
use uuid::Uuid;

use crate::users::{Role, User};

/// Authenticated identity attached to a request.
///
/// Built from a verified token whose subject was re-read from the store, so
/// `role` and `is_admin` reflect the account's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    pub is_admin: bool,
}

impl Principal {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self {
            id,
            role,
            is_admin: false,
        }
    }

    pub fn with_admin_flag(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            is_admin: user.is_admin,
        }
    }
}

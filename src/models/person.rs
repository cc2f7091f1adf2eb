use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub access_code: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Which sub-profile a person acts through, resolved once at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Role {
    #[serde(rename_all = "camelCase")]
    User { user_id: i64 },
    #[serde(rename_all = "camelCase")]
    Donator { donator_id: i64 },
    #[serde(rename_all = "camelCase")]
    Admin { admin_id: i64 },
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin { .. })
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Role::User { user_id } => Some(*user_id),
            _ => None,
        }
    }

    pub fn donator_id(&self) -> Option<i64> {
        match self {
            Role::Donator { donator_id } => Some(*donator_id),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User { .. } => write!(f, "user"),
            Role::Donator { .. } => write!(f, "donator"),
            Role::Admin { .. } => write!(f, "admin"),
        }
    }
}

/// Display name attached to nested records (the reserving user, the donator).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PersonSummary {
    pub id: i64,
    pub name: String,
}

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::Role;

const CALLER_KEY: &str = "caller";

/// An already-authenticated identity, trusted by everything downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub person_id: i64,
    pub name: String,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// The caller is the given user, or an admin acting for them.
    pub fn require_user_or_admin(&self, user_id: i64) -> Result<(), AppError> {
        if self.is_admin() || self.role.user_id() == Some(user_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_donator_or_admin(&self, donator_id: i64) -> Result<(), AppError> {
        if self.is_admin() || self.role.donator_id() == Some(donator_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

pub struct AuthCaller(pub Caller);

impl<S> FromRequestParts<S> for AuthCaller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthorized)?;

        let caller: Option<Caller> = session.get(CALLER_KEY).await.ok().flatten();

        caller.map(AuthCaller).ok_or(AppError::Unauthorized)
    }
}

#[derive(FromRow)]
struct PersonRoles {
    id: i64,
    name: String,
    user_id: Option<i64>,
    donator_id: Option<i64>,
    admin_id: Option<i64>,
}

/// Looks up the person owning `access_code` and picks their most privileged profile.
pub async fn resolve_caller(db: &SqlitePool, access_code: &str) -> Result<Option<Caller>, AppError> {
    let row: Option<PersonRoles> = sqlx::query_as(
        r#"
        SELECT p.id, p.name, u.id AS user_id, d.id AS donator_id, a.id AS admin_id
        FROM persons p
        LEFT JOIN users u ON u.person_id = p.id
        LEFT JOIN donators d ON d.person_id = p.id
        LEFT JOIN admins a ON a.person_id = p.id
        WHERE p.access_code = ?
        "#,
    )
    .bind(access_code)
    .fetch_optional(db)
    .await?;

    Ok(row.and_then(|row| {
        let role = match (row.admin_id, row.donator_id, row.user_id) {
            (Some(admin_id), _, _) => Role::Admin { admin_id },
            (None, Some(donator_id), _) => Role::Donator { donator_id },
            (None, None, Some(user_id)) => Role::User { user_id },
            (None, None, None) => return None,
        };
        Some(Caller {
            person_id: row.id,
            name: row.name,
            role,
        })
    }))
}

pub async fn login_caller(session: &Session, caller: Caller) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(CALLER_KEY, caller).await
}

pub async fn logout_caller(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

use chrono::Utc;
use clap::ValueEnum;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::Person;

/// Sub-profile to attach to a newly created person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleKind {
    User,
    Donator,
    Admin,
}

impl RoleKind {
    fn table(self) -> &'static str {
        match self {
            RoleKind::User => "users",
            RoleKind::Donator => "donators",
            RoleKind::Admin => "admins",
        }
    }
}

impl std::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleKind::User => write!(f, "user"),
            RoleKind::Donator => write!(f, "donator"),
            RoleKind::Admin => write!(f, "admin"),
        }
    }
}

pub struct CreatedPerson {
    pub person: Person,
    pub role_id: i64,
}

pub async fn create_person(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    role: RoleKind,
) -> Result<CreatedPerson, Box<dyn std::error::Error>> {
    let name = name.trim();
    let email = email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() {
        return Err("name and email are required".into());
    }

    let now = Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    let person: Person = sqlx::query_as(
        "INSERT INTO persons (name, email, access_code, created_at, updated_at) VALUES (?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(name)
    .bind(&email)
    .bind(Uuid::new_v4().to_string())
    .bind(&now)
    .bind(&now)
    .fetch_one(&mut *tx)
    .await?;

    let role_id = sqlx::query(&format!("INSERT INTO {} (person_id) VALUES (?)", role.table()))
        .bind(person.id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    tx.commit().await?;
    tracing::info!(person_id = person.id, role_id, %role, "person created");

    Ok(CreatedPerson { person, role_id })
}

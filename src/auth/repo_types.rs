use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Closed set of roles a user can hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum Role {
    #[default]
    WarehouseStaff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::WarehouseStaff => "warehouse_staff",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "warehouse_staff" => Ok(Role::WarehouseStaff),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Role must be one of warehouse_staff, admin (got {other:?})")),
        }
    }
}

/// User record in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never sent to clients
    pub role: Role,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Validated signup data, ready to persist.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    pub password_hash: String,
    pub role: Role,
}

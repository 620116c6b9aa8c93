use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("phone number already registered")]
    DuplicatePhone,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistent collection of user records keyed by phone number.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_phone(&self, phone_number: &str) -> anyhow::Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Must fail with [`StoreError::DuplicatePhone`] without writing anything
    /// when the phone number is taken.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    async fn ping(&self) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str = "id, full_name, phone_number, address, password_hash, role, is_active, created_at, updated_at";

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_phone(&self, phone_number: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone_number = $1"
        ))
        .bind(phone_number)
        .fetch_optional(&self.db)
        .await
        .context("find user by phone")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let res = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (full_name, phone_number, address, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.full_name)
        .bind(&user.phone_number)
        .bind(&user.address)
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(u) => Ok(u),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicatePhone)
            }
            Err(e) => Err(StoreError::Backend(anyhow::Error::new(e).context("insert user"))),
        }
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.db)
            .await
            .context("ping database")?;
        Ok(())
    }
}

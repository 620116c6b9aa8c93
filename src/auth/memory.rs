use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{
    repo::{StoreError, UserStore},
    repo_types::{NewUser, User},
};

/// Process-local credential store. Records are lost on restart.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn set_active(&self, id: Uuid, active: bool) -> bool {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(u) => {
                u.is_active = active;
                u.updated_at = OffsetDateTime::now_utc();
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_phone(&self, phone_number: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.phone_number == phone_number)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.phone_number == user.phone_number) {
            return Err(StoreError::DuplicatePhone);
        }
        let now = OffsetDateTime::now_utc();
        let record = User {
            id: Uuid::new_v4(),
            full_name: user.full_name,
            phone_number: user.phone_number,
            address: user.address,
            password_hash: user.password_hash,
            role: user.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::Role;

    fn new_user(phone: &str) -> NewUser {
        NewUser {
            full_name: "Asha Rao".into(),
            phone_number: phone.into(),
            address: "Pune".into(),
            password_hash: "hash".into(),
            role: Role::WarehouseStaff,
        }
    }

    #[tokio::test]
    async fn insert_then_lookup() {
        let store = MemoryUserStore::new();
        let user = store.insert(new_user("9876543210")).await.unwrap();
        assert!(user.is_active);

        let by_phone = store.find_by_phone("9876543210").await.unwrap().unwrap();
        assert_eq!(by_phone.id, user.id);
        let by_id = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.phone_number, "9876543210");
        assert!(store.find_by_phone("0000000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_phone_is_rejected_without_mutation() {
        let store = MemoryUserStore::new();
        store.insert(new_user("9876543210")).await.unwrap();
        let err = store.insert(new_user("9876543210")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePhone));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_duplicate_inserts_keep_one_record() {
        let store = std::sync::Arc::new(MemoryUserStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert(new_user("9123456780")).await.is_ok()
            }));
        }
        let mut ok = 0;
        for h in handles {
            if h.await.unwrap() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.count().await, 1);
    }
}

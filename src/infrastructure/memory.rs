//! 进程内用户存储

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use std::sync::{Mutex, MutexGuard};

use crate::app::users::{
    model::{NewUser, User, UserPatch},
    store::{StoreError, UserStore},
};

/// 按插入顺序保存用户，email 唯一
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
    timestamps: bool,
}

impl MemoryUserStore {
    pub fn new(timestamps: bool) -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            timestamps,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<User>>, StoreError> {
        self.users
            .lock()
            .map_err(|e| StoreError::Backend(format!("memory store poisoned: {}", e)))
    }
}

fn duplicate_email(email: &str) -> StoreError {
    StoreError::Duplicate(format!("email \"{}\" already exists", email))
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_all(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.lock()?.clone())
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.lock()?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(duplicate_email(&user.email));
        }

        let now = self.timestamps.then(Utc::now);
        let user = User {
            id: ObjectId::new(),
            name: user.name,
            email: user.email,
            age: user.age,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: ObjectId, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut users = self.lock()?;

        let Some(index) = users.iter().position(|u| u.id == id) else {
            return Ok(None);
        };

        if let Some(email) = &patch.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(duplicate_email(email));
            }
        }

        // 空修改不算写入，updatedAt 保持不变
        let user = &mut users[index];
        if !patch.is_empty() {
            patch.apply_to(user);
            if self.timestamps {
                user.updated_at = Some(Utc::now());
            }
        }
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        let mut users = self.lock()?;
        let position = users.iter().position(|u| u.id == id);
        Ok(position.map(|index| users.remove(index)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn close(&self) {}
}

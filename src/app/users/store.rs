//! 用户存储抽象

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use super::model::{NewUser, User, UserPatch};

/// 存储层错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 违反唯一约束
    #[error("duplicate key: {0}")]
    Duplicate(String),
    /// 存储不可达
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Backend(String),
}

/// 用户集合上的存储操作，每个方法对应一次存储调用
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 按存储自身顺序返回全部用户
    async fn find_all(&self) -> Result<Vec<User>, StoreError>;

    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    /// 返回更新后的记录，不存在时返回 `None`
    async fn update(&self, id: ObjectId, patch: UserPatch) -> Result<Option<User>, StoreError>;

    /// 返回删除前的记录，不存在时返回 `None`
    async fn delete(&self, id: ObjectId) -> Result<Option<User>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// 释放连接
    async fn close(&self);
}

//! 用户业务服务
//!
//! 每个操作只调用一次存储。存储失败在这里记录日志，再交给处理器转换为错误响应。

use mongodb::bson::oid::ObjectId;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error};

use super::{
    model::{CreateUserRequest, User, UserPatch},
    store::UserStore,
};
use crate::core::error::CoreError;

const UPDATE_NOT_FOUND: &str = "User not found";
const DELETE_NOT_FOUND: &str = "User Not Found!";

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, CoreError> {
        self.store.find_all().await.map_err(|e| {
            error!("Error in fetching users: {}", e);
            CoreError::from(e)
        })
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, CoreError> {
        let new_user = request.into_new_user().map_err(|msg| {
            error!("Error adding user: {}", msg);
            CoreError::BadRequest(msg)
        })?;

        let user = self.store.insert(new_user).await.map_err(|e| {
            error!("Error adding user: {}", e);
            CoreError::from(e)
        })?;
        debug!(id = %user.id, "用户已创建");
        Ok(user)
    }

    pub async fn update_user(&self, id: &str, body: Map<String, Value>) -> Result<User, CoreError> {
        let id = parse_id(id)?;
        let patch = UserPatch::from_body(&body).map_err(|msg| {
            error!("Error updating user: {}", msg);
            CoreError::BadRequest(msg)
        })?;

        self.store
            .update(id, patch)
            .await
            .map_err(|e| {
                error!("Error updating user: {}", e);
                CoreError::from(e)
            })?
            .ok_or_else(|| CoreError::NotFound(UPDATE_NOT_FOUND.to_string()))
    }

    pub async fn delete_user(&self, id: &str) -> Result<User, CoreError> {
        let id = parse_id(id)?;

        self.store
            .delete(id)
            .await
            .map_err(|e| {
                error!("Error deleting user: {}", e);
                CoreError::from(e)
            })?
            .ok_or_else(|| CoreError::NotFound(DELETE_NOT_FOUND.to_string()))
    }
}

fn parse_id(id: &str) -> Result<ObjectId, CoreError> {
    ObjectId::parse_str(id)
        .map_err(|_| CoreError::BadRequest(format!("invalid user id: \"{}\"", id)))
}

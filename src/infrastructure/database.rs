//! 数据库基础设施

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document},
    error::{Error, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOneAndUpdateOptions, IndexOptions, ReturnDocument},
    Client, Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

use super::config::DatabaseConfig;
use crate::app::users::{
    model::{NewUser, User, UserPatch},
    store::{StoreError, UserStore},
};

/// MongoDB 重复键错误码
const DUPLICATE_KEY: i32 = 11000;

pub struct DatabaseManager {
    client: Client,
    database: Database,
}

impl DatabaseManager {
    /// 解析连接串并创建客户端，真正的连接在第一次操作时建立
    pub async fn new(config: &DatabaseConfig) -> Result<Self, Error> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.app_name = Some("user-management".to_string());
        options.server_selection_timeout =
            Some(Duration::from_secs(config.connect_timeout_seconds));

        // 连接串中带数据库名时优先使用
        let database_name = options
            .default_database
            .clone()
            .unwrap_or_else(|| config.name.clone());
        let client = Client::with_options(options)?;
        let database = client.database(&database_name);

        Ok(Self { client, database })
    }

    pub fn get_database(&self) -> &Database {
        &self.database
    }

    pub fn user_store(&self, config: &DatabaseConfig) -> MongoUserStore {
        MongoUserStore {
            client: self.client.clone(),
            database: self.database.clone(),
            collection: self.database.collection(&config.collection),
            timestamps: config.timestamps,
            email_index: OnceCell::new(),
        }
    }
}

/// MongoDB 中的用户文档
#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    name: String,
    email: String,
    age: f64,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    created_at: Option<BsonDateTime>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<BsonDateTime>,
}

impl UserDocument {
    fn into_user(self) -> Result<User, StoreError> {
        let id = self
            .id
            .ok_or_else(|| StoreError::Backend("user document without _id".to_string()))?;
        Ok(User {
            id,
            name: self.name,
            email: self.email,
            age: self.age,
            created_at: self.created_at.map(BsonDateTime::to_chrono),
            updated_at: self.updated_at.map(BsonDateTime::to_chrono),
        })
    }
}

/// 基于 MongoDB 集合的用户存储
pub struct MongoUserStore {
    client: Client,
    database: Database,
    collection: Collection<UserDocument>,
    timestamps: bool,
    /// email 唯一索引创建成功后置位，失败时下次写入重试
    email_index: OnceCell<()>,
}

impl MongoUserStore {
    /// 确保 email 唯一索引存在
    ///
    /// 成功一次后不再访问服务器；失败不会被缓存，写入前会再次尝试。
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        self.email_index
            .get_or_try_init(|| async {
                let index = IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build();

                let result = self
                    .collection
                    .create_index(index, None)
                    .await
                    .map_err(map_error)?;
                info!("索引已就绪: {}", result.index_name);
                Ok::<(), StoreError>(())
            })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_all(&self) -> Result<Vec<User>, StoreError> {
        let cursor = self.collection.find(None, None).await.map_err(map_error)?;
        let documents: Vec<UserDocument> = cursor.try_collect().await.map_err(map_error)?;
        documents.into_iter().map(UserDocument::into_user).collect()
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        self.ensure_indexes().await?;
        let now = self.timestamps.then(BsonDateTime::now);
        let mut document = UserDocument {
            id: None,
            name: user.name,
            email: user.email,
            age: user.age,
            created_at: now,
            updated_at: now,
        };

        let result = self
            .collection
            .insert_one(&document, None)
            .await
            .map_err(map_error)?;
        document.id = result.inserted_id.as_object_id();
        document.into_user()
    }

    async fn update(&self, id: ObjectId, patch: UserPatch) -> Result<Option<User>, StoreError> {
        if patch.email.is_some() {
            self.ensure_indexes().await?;
        }

        let touch = self.timestamps && !patch.is_empty();
        let mut set = Document::new();
        if let Some(name) = patch.name {
            set.insert("name", name);
        }
        if let Some(email) = patch.email {
            set.insert("email", email);
        }
        if let Some(age) = patch.age {
            set.insert("age", age);
        }
        if touch {
            set.insert("updatedAt", BsonDateTime::now());
        }

        // 空修改直接返回当前记录，空的 $set 也会被服务器拒绝
        let document = if set.is_empty() {
            self.collection
                .find_one(doc! { "_id": id }, None)
                .await
                .map_err(map_error)?
        } else {
            let options = FindOneAndUpdateOptions::builder()
                .return_document(ReturnDocument::After)
                .build();
            self.collection
                .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, options)
                .await
                .map_err(map_error)?
        };

        document.map(UserDocument::into_user).transpose()
    }

    async fn delete(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        self.collection
            .find_one_and_delete(doc! { "_id": id }, None)
            .await
            .map_err(map_error)?
            .map(UserDocument::into_user)
            .transpose()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map(|_| ())
            .map_err(map_error)
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
        info!("MongoDB 连接已关闭");
    }
}

/// 把驱动错误归类为存储错误
fn map_error(err: Error) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => {
            StoreError::Duplicate(e.message.clone())
        }
        ErrorKind::Command(e) if e.code == DUPLICATE_KEY => StoreError::Duplicate(e.message.clone()),
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. } => StoreError::Unavailable(err.to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(uri: &str) -> DatabaseConfig {
        DatabaseConfig {
            uri: uri.to_string(),
            ..DatabaseConfig::default()
        }
    }

    #[tokio::test]
    async fn database_name_comes_from_uri_when_present() {
        let manager = DatabaseManager::new(&config("mongodb://localhost:27017/otherdb"))
            .await
            .unwrap();
        assert_eq!(manager.get_database().name(), "otherdb");
    }

    #[tokio::test]
    async fn database_name_falls_back_to_config() {
        let manager = DatabaseManager::new(&config("mongodb://localhost:27017"))
            .await
            .unwrap();
        assert_eq!(manager.get_database().name(), "user_management");
    }
}

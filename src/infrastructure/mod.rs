//! 基础设施层：配置、日志与存储实现

pub mod config;
pub mod database;
pub mod logger;
pub mod memory;

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::app::users::store::UserStore;
use config::{DatabaseConfig, StoreBackend};
use database::DatabaseManager;
use memory::MemoryUserStore;

/// 按配置打开用户存储
///
/// MongoDB 不可达时只记录错误并继续启动，之后的请求会返回 503。
pub async fn open_store(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn UserStore>> {
    match config.backend {
        StoreBackend::Memory => {
            info!("使用内存存储");
            Ok(Arc::new(MemoryUserStore::new(config.timestamps)))
        }
        StoreBackend::Mongodb => {
            let manager = DatabaseManager::new(config).await?;
            let store = manager.user_store(config);

            match store.ping().await {
                Ok(()) => info!("successfully connected to mongoDb"),
                Err(e) => error!("error connecting to database: {}", e),
            }
            if let Err(e) = store.ensure_indexes().await {
                warn!("创建 email 唯一索引失败，将在下次写入前重试: {}", e);
            }

            Ok(Arc::new(store))
        }
    }
}

//! # 用户管理服务
//!
//! 基于 Axum 的用户 CRUD 服务，数据保存在 MongoDB（或进程内存储）中。
//! 采用分层结构：
//! - `app`：路由与用户资源
//! - `core`：错误处理与中间件
//! - `infrastructure`：配置、日志与存储实现

pub mod app;
pub mod core;
pub mod infrastructure;

pub use app::router;
pub use infrastructure::config::Config;

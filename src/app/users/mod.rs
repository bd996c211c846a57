//! 用户资源：模型、存储抽象、业务服务与 HTTP 处理器

pub mod handler;
pub mod model;
pub mod service;
pub mod store;

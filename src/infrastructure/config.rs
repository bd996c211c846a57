//! 配置基础设施
//!
//! 配置来源依次为：配置文件（`config.toml` 或 `config/config.toml`）、内置默认值，
//! 最后由环境变量 `MONGODB_URI` 覆盖数据库连接串。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// 覆盖数据库连接串的环境变量
pub const MONGODB_URI_ENV: &str = "MONGODB_URI";

/// 配置文件查找顺序
const CONFIG_PATHS: [&str; 2] = ["config.toml", "./config/config.toml"];

/// 服务配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP 服务配置
    pub http: HttpConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// 绑定地址
    pub bind_address: String,
    /// HTTP 服务端口
    pub port: u16,
    /// 用户资源的路由前缀
    pub base_path: String,
    /// 请求超时时间（秒）
    pub timeout_seconds: u64,
}

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongodb,
    Memory,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    /// MongoDB 连接串
    pub uri: String,
    /// 数据库名称
    pub name: String,
    /// 集合名称
    pub collection: String,
    /// 是否自动维护 createdAt / updatedAt
    pub timestamps: bool,
    /// 服务器选择超时（秒）
    pub connect_timeout_seconds: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
    /// 是否启用控制台输出
    pub console_output: bool,
    /// 日志文件目录，未设置时不写文件
    pub log_dir: Option<PathBuf>,
    /// 日志文件名前缀
    pub file_prefix: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            base_path: "/api/users".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Mongodb,
            uri: "mongodb://localhost:27017/user_management".to_string(),
            name: "user_management".to_string(),
            collection: "users".to_string(),
            timestamps: false,
            connect_timeout_seconds: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            log_dir: None,
            file_prefix: "user-management".to_string(),
        }
    }
}

impl HttpConfig {
    /// 单个用户的路由，例如 `/api/users/:id`
    pub fn item_path(&self) -> String {
        let base = self.collection_path();
        if base == "/" {
            "/:id".to_string()
        } else {
            format!("{}/:id", base)
        }
    }

    /// 用户集合的路由，去掉末尾的 `/`
    pub fn collection_path(&self) -> String {
        let trimmed = self.base_path.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

impl Config {
    /// 从配置文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::FileRead(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 用外部提供的连接串覆盖配置文件中的值
    pub fn with_uri_override(mut self, uri: Option<String>) -> Self {
        if let Some(uri) = uri.filter(|u| !u.trim().is_empty()) {
            self.database.uri = uri;
        }
        self
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::Validation("HTTP端口必须大于0".to_string()));
        }
        if self.http.bind_address.is_empty() {
            return Err(ConfigError::Validation("绑定地址不能为空".to_string()));
        }
        if !self.http.base_path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "路由前缀必须以 / 开头: {}",
                self.http.base_path
            )));
        }
        if self.http.timeout_seconds == 0 {
            return Err(ConfigError::Validation("请求超时时间必须大于0".to_string()));
        }

        if self.database.name.is_empty() {
            return Err(ConfigError::Validation("数据库名称不能为空".to_string()));
        }
        if self.database.collection.is_empty() {
            return Err(ConfigError::Validation("集合名称不能为空".to_string()));
        }
        if self.database.backend == StoreBackend::Mongodb && self.database.uri.trim().is_empty() {
            return Err(ConfigError::Validation("MongoDB 连接串不能为空".to_string()));
        }
        if self.database.connect_timeout_seconds == 0 {
            return Err(ConfigError::Validation("数据库连接超时时间必须大于0".to_string()));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "无效的日志级别: {}，有效值: {:?}",
                self.logging.level, valid_levels
            )));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("文件读取错误: {0}")]
    FileRead(String),
    #[error("配置解析错误: {0}")]
    Parse(String),
    #[error("配置验证错误: {0}")]
    Validation(String),
}

/// 从文件或默认值加载配置，并应用环境变量覆盖
///
/// 日志系统此时尚未初始化，配置来源通过返回值交给调用方记录。
pub fn load_config() -> Result<(Config, Option<PathBuf>), ConfigError> {
    let source = CONFIG_PATHS
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists());

    let config = match &source {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    let config = config.with_uri_override(std::env::var(MONGODB_URI_ENV).ok());
    config.validate()?;

    Ok((config, source))
}

/// 记录配置来源，连接串中的密码会被隐藏
pub fn log_config_source(config: &Config, source: Option<&Path>) {
    match source {
        Some(path) => info!("从配置文件加载: {}", path.display()),
        None => info!("未找到配置文件，使用默认配置"),
    }
    info!(
        backend = ?config.database.backend,
        uri = %redact_uri(&config.database.uri),
        database = %config.database.name,
        collection = %config.database.collection,
        "数据库配置"
    );
}

/// 隐藏连接串中的密码部分
pub fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return uri.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
        None => uri.to_string(),
    }
}

//! 日志基础设施

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::config::LoggingConfig;

pub struct Logger;

impl Logger {
    /// 初始化全局日志订阅者
    ///
    /// `RUST_LOG` 优先于配置中的级别。启用文件日志时返回的 guard 必须一直持有，
    /// 否则缓冲中的日志会丢失。
    pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
        let filter =
            EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

        let console = config
            .console_output
            .then(|| fmt::layer().with_target(false).compact());

        let (file, guard) = match &config.log_dir {
            Some(dir) => {
                let appender = rolling::daily(dir, &config.file_prefix);
                let (writer, guard) = non_blocking(appender);
                let layer = fmt::layer().with_ansi(false).with_writer(writer);
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .with(file)
            .try_init()?;

        Ok(guard)
    }
}

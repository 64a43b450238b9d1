//! 日志初始化和配置模块
//!
//! 这个模块提供了统一的日志初始化功能，使用 tracing 库。
//! 控制台层受配置开关控制，文件层输出到配置目录，按天滚动。

use crate::config::LogConfig;
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::SystemTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// 日志初始化错误
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// IO 错误
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),
    /// 日志配置错误
    #[error("日志配置错误: {0}")]
    Config(String),
}

/// 日志初始化结果
pub type LogResult<T> = Result<T, LogError>;

/// 解析配置中的日志级别字符串
fn parse_level(level: &str) -> LogResult<Level> {
    match level {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(LogError::Config(format!("无效的日志级别: {level}"))),
    }
}

/// 初始化日志系统
///
/// 级别取自配置，可被 `RUST_LOG` 环境变量覆盖。
/// 返回的 guard 必须由调用方持有到进程结束，否则文件日志可能丢失。
///
/// # Errors
/// 日志级别无法解析时返回 `LogError::Config`。
pub fn init_logging(config: &LogConfig) -> LogResult<WorkerGuard> {
    let level = parse_level(&config.level)?;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    // 控制台输出层（可选）
    let console_layer = config.enable_stdout.then(|| {
        fmt::layer()
            .with_timer(SystemTime)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_ansi(true)
    });

    // 文件输出层 - 按天滚动，输出到配置目录
    let file_appender =
        tracing_appender::rolling::daily(&config.log_dir, "uspto-bulk");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_timer(SystemTime)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_ansi(false); // 文件中不使用颜色

    let subscriber = Registry::default().with(env_filter);

    // 尝试初始化，如果失败说明已经初始化过了，这不是错误
    if subscriber.with(console_layer).with(file_layer).try_init().is_ok() {
        tracing::info!("日志系统初始化完成 - 输出目录: {}", config.log_dir);
    }

    Ok(guard)
}

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
            LogLevel::Off => "off",
        }
    }
}

impl From<log::LevelFilter> for LogLevel {
    fn from(level: log::LevelFilter) -> Self {
        match level {
            log::LevelFilter::Error => LogLevel::Error,
            log::LevelFilter::Warn => LogLevel::Warn,
            log::LevelFilter::Info => LogLevel::Info,
            log::LevelFilter::Debug => LogLevel::Debug,
            log::LevelFilter::Trace => LogLevel::Trace,
            log::LevelFilter::Off => LogLevel::Off,
        }
    }
}

/// 解析日志级别字符串
pub fn parse_level(level: &str) -> Result<log::LevelFilter, String> {
    match level.to_lowercase().as_str() {
        "error" => Ok(log::LevelFilter::Error),
        "warn" => Ok(log::LevelFilter::Warn),
        "info" => Ok(log::LevelFilter::Info),
        "debug" => Ok(log::LevelFilter::Debug),
        "trace" => Ok(log::LevelFilter::Trace),
        "off" => Ok(log::LevelFilter::Off),
        other => Err(format!("无效的日志级别: {}", other)),
    }
}

/// 未设置 `RUST_LOG` 时的过滤规则：依赖库的日志压到 warn
fn level_filter(level: log::LevelFilter) -> EnvFilter {
    EnvFilter::new(format!(
        "{},sqlx=warn,sea_orm=warn,hyper=warn,reqwest=warn,html5ever=warn,selectors=warn",
        LogLevel::from(level).as_str()
    ))
}

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();
static ENV_OVERRIDE: AtomicBool = AtomicBool::new(false);

/// 动态设置日志输出级别（不持久化）
///
/// 由 `RUST_LOG` 决定过滤规则时只校验参数，不改变输出。
pub fn set_log_level(level: &str) -> Result<(), String> {
    let level = parse_level(level)?;
    if ENV_OVERRIDE.load(Ordering::Relaxed) {
        return Ok(());
    }
    if let Some(handle) = FILTER_HANDLE.get() {
        handle
            .reload(level_filter(level))
            .map_err(|e| format!("无法更新日志过滤规则: {}", e))?;
    }
    log::set_max_level(level);
    Ok(())
}

/// 获取当前日志级别
pub fn get_log_level() -> LogLevel {
    log::max_level().into()
}

/// 安装日志输出，`RUST_LOG` 存在且合法时优先使用
pub fn init_logging(level: &str) -> Result<(), String> {
    init_logging_with(level, std::env::var(EnvFilter::DEFAULT_ENV).ok())
}

/// 按给定的过滤指令（通常来自 `RUST_LOG`）或级别安装日志输出
///
/// 重复调用只有第一次生效。
pub fn init_logging_with(level: &str, env_directives: Option<String>) -> Result<(), String> {
    let level = parse_level(level)?;
    let env_filter = env_directives.and_then(|directives| match EnvFilter::try_new(&directives) {
        Ok(filter) => Some(filter),
        Err(e) => {
            eprintln!("忽略无效的 {}: {}", EnvFilter::DEFAULT_ENV, e);
            None
        }
    });
    let from_env = env_filter.is_some();
    let (filter, handle) = reload::Layer::new(env_filter.unwrap_or_else(|| level_filter(level)));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .is_ok();
    if !installed {
        return Ok(());
    }

    ENV_OVERRIDE.store(from_env, Ordering::Relaxed);
    let _ = FILTER_HANDLE.set(handle);
    if from_env {
        // 由过滤规则决定，log 侧不再截断
        log::set_max_level(log::LevelFilter::Trace);
    } else {
        log::set_max_level(level);
    }
    Ok(())
}

//! 错误类型
//!
//! 各子系统各自一个枚举，顶层 `AppError` 汇总后交给命令行入口。

use sea_orm::DbErr;
use thiserror::Error;

/// 记录仓库错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("游戏 {gameid} 不在数据库中")]
    RecordNotFound { gameid: i64 },

    /// 内存中的记录比表中已持久化的行少，说明之前的加载或写入丢了数据
    #[error("记录消失: 表中已有 {persisted} 行，内存中只有 {current} 条，拒绝覆盖")]
    RecordsDisappeared { persisted: u64, current: u64 },

    #[error("数据库错误: {0}")]
    Db(#[from] DbErr),

    #[error("无法打开数据库 {path}: {reason}")]
    Open { path: String, reason: String },
}

/// 抓取错误的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 页面结构异常或被限流，退避后重试
    Transient,
    /// 其余错误，直接上抛
    Fatal,
}

/// 抓取错误
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("页面结构异常 {url}: {reason}")]
    MalformedPage { url: String, reason: String },

    #[error("元数据接口限流 {url} (HTTP {status})")]
    RateLimited { url: String, status: u16 },

    #[error("请求失败 {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("HTTP 错误: {0}")]
    Http(#[from] reqwest::Error),

    #[error("重试 {attempts} 次后仍失败: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<ScrapeError>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScrapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::MalformedPage { .. } | ScrapeError::RateLimited { .. } => {
                ErrorKind::Transient
            }
            _ => ErrorKind::Fatal,
        }
    }
}

/// 特征生成错误
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("训练样本不足: {samples} 条样本无法分成 {clusters} 类")]
    NotEnoughSamples { samples: usize, clusters: usize },

    #[error("没有可用的 {prefix} 指示列")]
    NoColumns { prefix: &'static str },
}

/// 设置错误
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("未知的设置项: {0}")]
    UnknownKey(String),

    #[error("设置项 {key} 的值无效: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("数据库错误: {0}")]
    Db(#[from] DbErr),
}

/// 顶层错误
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("{0}")]
    Path(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

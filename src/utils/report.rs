//! 运行事件上报
//!
//! 各组件不直接打印，只把事件交给注入的 `Reporter`。

use std::path::PathBuf;
use std::time::Duration;

use parking_lot::Mutex;

/// 运行中产生的事件
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// games 表不存在，从空库开始
    StoreInitialized { path: PathBuf },
    StoreLoaded { path: PathBuf, rows: usize },
    /// 表中某行没有可用的 gameid
    RowWithoutId,
    /// 记录已存在且不允许覆盖
    InsertSkipped { gameid: i64 },
    StoreFlushed { path: PathBuf, rows: usize },

    PublisherStarted { publisher: String },
    PageFetched { url: String, rows: usize },
    ListingRowSkipped { url: String, reason: String },
    EnrichStarted { gameid: i64, rank: i64, url: String },
    RetryScheduled { attempt: u32, delay: Duration, error: String },
    UpdateFinished { enriched: usize, skipped_fresh: usize },

    ClusterSizes { column: &'static str, attempts: u32, sizes: Vec<usize> },
    /// 尝试次数用尽仍未满足簇大小上限，沿用最后一次结果
    ClusterCapMissed { column: &'static str, biggest: usize, cap: usize },
    ClusterTitles { column: &'static str, titles: Vec<String> },
    ClusteringSkipped { column: &'static str, reason: String },
    FeaturesScored { scored: usize, bucketed: usize },
}

pub trait Reporter: Send + Sync {
    fn report(&self, event: &Event);
}

/// 转发到 `log`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, event: &Event) {
        match event {
            Event::StoreInitialized { path } => {
                log::info!("数据库 {} 中没有 games 表，从空库开始", path.display())
            }
            Event::StoreLoaded { path, rows } => {
                log::info!("数据库 {} 已加载，共 {} 条记录", path.display(), rows)
            }
            Event::RowWithoutId => log::warn!("跳过一行没有 gameid 的数据"),
            Event::InsertSkipped { gameid } => log::debug!("游戏 {} 已在数据库中", gameid),
            Event::StoreFlushed { path, rows } => {
                log::info!("已保存 {} 条记录到 {}", rows, path.display())
            }
            Event::PublisherStarted { publisher } => log::info!("开始处理出版商 {}", publisher),
            Event::PageFetched { url, rows } => log::info!("{} ({} 行)", url, rows),
            Event::ListingRowSkipped { url, reason } => {
                log::warn!("跳过 {} 上的一行: {}", url, reason)
            }
            Event::EnrichStarted { gameid, rank, url } => {
                log::info!("{:>6} - {:>6} - {}", gameid, rank, url)
            }
            Event::RetryScheduled {
                attempt,
                delay,
                error,
            } => log::warn!(
                "第 {} 次请求失败，{:.1} 秒后重试: {}",
                attempt,
                delay.as_secs_f64(),
                error
            ),
            Event::UpdateFinished {
                enriched,
                skipped_fresh,
            } => log::info!("详情更新完成: 更新 {} 条，跳过 {} 条", enriched, skipped_fresh),
            Event::ClusterSizes {
                column,
                attempts,
                sizes,
            } => log::info!("{}: 第 {} 次尝试，簇大小 {:?}", column, attempts, sizes),
            Event::ClusterCapMissed {
                column,
                biggest,
                cap,
            } => log::warn!(
                "{}: 没有找到合适的聚类结果（最大簇 {} 超过上限 {}）",
                column,
                biggest,
                cap
            ),
            Event::ClusterTitles { column, titles } => log::info!("{}: {:?}", column, titles),
            Event::ClusteringSkipped { column, reason } => {
                log::warn!("{}: 跳过聚类: {}", column, reason)
            }
            Event::FeaturesScored { scored, bucketed } => {
                log::info!("综合评分 {} 条，人数分组 {} 条", scored, bucketed)
            }
        }
    }
}

/// 把事件留在内存里，供测试和汇总使用
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<Event>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, event: &Event) {
        self.events.lock().push(event.clone());
    }
}

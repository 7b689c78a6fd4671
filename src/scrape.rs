//! 目录抓取与详情补全
//!
//! `ScrapeClient` 负责从目录搜索页发现游戏、从详情页和元数据接口补全字段。
//! 传输层通过 `PageFetcher`/`MetadataApi` 注入，测试中替换为内存实现。

pub mod api;
pub mod client;
pub mod detail;
pub mod listing;
pub mod retry;
pub mod updater;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppSettings;
use crate::database::store::{Database, Put};
use crate::entity::game_record::{GameRecord, Updated};
use crate::error::ScrapeError;
use crate::utils::report::{Event, Reporter};

use api::{MetadataApi, XmlApi};
use client::{HttpFetcher, PageFetcher};
use retry::RetryPolicy;

/// 抓取参数
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeOptions {
    pub catalog_base: String,
    /// 每次请求目录页后的等待
    pub page_delay: Duration,
    pub freshness_days: i64,
    pub save_every: Duration,
    pub retry: RetryPolicy,
}

impl From<&AppSettings> for ScrapeOptions {
    fn from(settings: &AppSettings) -> Self {
        Self {
            catalog_base: settings.catalog_base.trim_end_matches('/').to_string(),
            page_delay: settings.page_delay(),
            freshness_days: settings.freshness_days,
            save_every: settings.save_every(),
            retry: RetryPolicy::default(),
        }
    }
}

/// 单个出版商的发现结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoverStats {
    pub pages: usize,
    pub inserted: usize,
    pub known: usize,
    pub skipped_rows: usize,
}

impl std::ops::AddAssign for DiscoverStats {
    fn add_assign(&mut self, other: Self) {
        self.pages += other.pages;
        self.inserted += other.inserted;
        self.known += other.known;
        self.skipped_rows += other.skipped_rows;
    }
}

pub struct ScrapeClient {
    fetcher: Arc<dyn PageFetcher>,
    api: Arc<dyn MetadataApi>,
    options: ScrapeOptions,
    reporter: Arc<dyn Reporter>,
}

impl ScrapeClient {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        api: Arc<dyn MetadataApi>,
        options: ScrapeOptions,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            fetcher,
            api,
            options,
            reporter,
        }
    }

    /// 使用 reqwest 访问真实站点
    pub fn from_settings(settings: &AppSettings, reporter: Arc<dyn Reporter>) -> Result<Self, ScrapeError> {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new()?);
        let api: Arc<dyn MetadataApi> = Arc::new(XmlApi::new(Arc::clone(&fetcher), &settings.api_base));
        Ok(Self::new(fetcher, api, ScrapeOptions::from(settings), reporter))
    }

    /// 出版商搜索结果的第一页
    pub fn listing_url(&self, query: &str) -> String {
        format!(
            "{}/search/boardgame/page/1?sort=rank&advsearch=1{}",
            self.options.catalog_base, query
        )
    }

    /// 逐页抓取某个出版商的搜索结果，新游戏以不覆盖方式写入
    pub async fn discover(
        &self,
        db: &mut Database,
        publisher: &str,
        query: &str,
    ) -> Result<DiscoverStats, ScrapeError> {
        self.reporter.report(&Event::PublisherStarted {
            publisher: publisher.to_string(),
        });

        let mut stats = DiscoverStats::default();
        let mut url = self.listing_url(query);
        loop {
            let page = self.fetcher.fetch(&url).await?;
            tokio::time::sleep(self.options.page_delay).await;
            if !page.is_success() {
                return Err(ScrapeError::Status {
                    url,
                    status: page.status,
                });
            }

            let listing = listing::parse_listing(&page.body, &self.options.catalog_base, &url)?;
            stats.pages += 1;
            self.reporter.report(&Event::PageFetched {
                url: url.clone(),
                rows: listing.entries.len(),
            });
            for reason in listing.skipped {
                stats.skipped_rows += 1;
                self.reporter.report(&Event::ListingRowSkipped {
                    url: url.clone(),
                    reason,
                });
            }
            for entry in listing.entries {
                match db.put(GameRecord::from_listing(entry, publisher), false) {
                    Put::Inserted => stats.inserted += 1,
                    _ => stats.known += 1,
                }
            }

            match listing.next_url {
                Some(next) => url = next,
                None => break,
            }
        }
        Ok(stats)
    }

    /// 依次处理所有出版商，最后写回数据库
    pub async fn discover_all(
        &self,
        db: &mut Database,
        publishers: &BTreeMap<String, String>,
    ) -> Result<DiscoverStats, ScrapeError> {
        let mut total = DiscoverStats::default();
        for (publisher, query) in publishers {
            total += self.discover(db, publisher, query).await?;
        }
        db.flush().await?;
        Ok(total)
    }

    /// 补全一条记录（单次尝试），返回更新后的副本
    pub async fn enrich(&self, record: &GameRecord) -> Result<GameRecord, ScrapeError> {
        let page = self.fetcher.fetch(&record.url).await?;
        match page.status {
            429 | 503 => {
                return Err(ScrapeError::RateLimited {
                    url: record.url.clone(),
                    status: page.status,
                });
            }
            status if !page.is_success() => {
                return Err(ScrapeError::Status {
                    url: record.url.clone(),
                    status,
                });
            }
            _ => {}
        }
        let preload = detail::extract_preload(&page.body, &record.url)?;
        let thing = self.api.thing(record.gameid).await?;

        let mut enriched = record.clone();
        detail::apply_thing(&mut enriched, &thing);
        detail::apply_preload(&mut enriched, &preload);
        enriched.updated = Updated::now();
        Ok(enriched)
    }

    /// 带退避重试的补全
    pub async fn enrich_with_retry(&self, record: &GameRecord) -> Result<GameRecord, ScrapeError> {
        self.options
            .retry
            .run(self.reporter.as_ref(), || self.enrich(record))
            .await
    }
}

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use boardgame_scout_lib::database::store::Database;
use boardgame_scout_lib::entity::game_record::GameRecord;
use boardgame_scout_lib::error::ScrapeError;
use boardgame_scout_lib::scrape::api::{MetadataApi, ThingInfo};
use boardgame_scout_lib::scrape::client::{Page, PageFetcher};
use boardgame_scout_lib::scrape::retry::RetryPolicy;
use boardgame_scout_lib::scrape::{ScrapeClient, ScrapeOptions};
use boardgame_scout_lib::utils::report::MemoryReporter;

pub const BASE: &str = "https://bgg.test";

/// 按 URL 返回预设页面；队列只剩一页时重复返回它
#[derive(Default)]
pub struct FakeFetcher {
    pages: Mutex<HashMap<String, VecDeque<Page>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, page: Page) {
        self.pages
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(page);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Page, ScrapeError> {
        self.calls.lock().push(url.to_string());
        let mut pages = self.pages.lock();
        let queue = pages.get_mut(url);
        let page = match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(page.unwrap_or(Page {
            status: 404,
            body: String::new(),
        }))
    }
}

/// 每个 gameid 返回固定信息，未配置的返回空信息；可预设若干次限流
#[derive(Default)]
pub struct FakeApi {
    things: Mutex<HashMap<i64, ThingInfo>>,
    rate_limited: Mutex<HashMap<i64, u32>>,
    calls: Mutex<Vec<i64>>,
}

impl FakeApi {
    pub fn with(self, gameid: i64, info: ThingInfo) -> Self {
        self.things.lock().insert(gameid, info);
        self
    }

    /// 前 `times` 次请求返回 429
    pub fn rate_limited(self, gameid: i64, times: u32) -> Self {
        self.rate_limited.lock().insert(gameid, times);
        self
    }

    pub fn calls_for(&self, gameid: i64) -> usize {
        self.calls.lock().iter().filter(|id| **id == gameid).count()
    }
}

#[async_trait]
impl MetadataApi for FakeApi {
    async fn thing(&self, gameid: i64) -> Result<ThingInfo, ScrapeError> {
        self.calls.lock().push(gameid);
        if let Some(left) = self.rate_limited.lock().get_mut(&gameid).filter(|n| **n > 0) {
            *left -= 1;
            return Err(ScrapeError::RateLimited {
                url: format!("{}/xmlapi2/thing?id={}", BASE, gameid),
                status: 429,
            });
        }
        Ok(self.things.lock().get(&gameid).cloned().unwrap_or_default())
    }
}

pub fn fast_options() -> ScrapeOptions {
    ScrapeOptions {
        catalog_base: BASE.to_string(),
        page_delay: Duration::ZERO,
        freshness_days: 60,
        save_every: Duration::from_secs(3600),
        retry: RetryPolicy {
            multiplier: Duration::from_millis(1),
            max_wait: Duration::from_millis(5),
            max_elapsed: Duration::from_secs(5),
        },
    }
}

pub fn client(
    fetcher: Arc<FakeFetcher>,
    api: FakeApi,
    options: ScrapeOptions,
    reporter: Arc<MemoryReporter>,
) -> ScrapeClient {
    client_sharing_api(fetcher, Arc::new(api), options, reporter)
}

/// 测试需要事后检查 `FakeApi` 时使用
pub fn client_sharing_api(
    fetcher: Arc<FakeFetcher>,
    api: Arc<FakeApi>,
    options: ScrapeOptions,
    reporter: Arc<MemoryReporter>,
) -> ScrapeClient {
    ScrapeClient::new(fetcher, api, options, reporter)
}

pub async fn open_store(path: &Path) -> (Database, Arc<MemoryReporter>) {
    let reporter = Arc::new(MemoryReporter::new());
    let db = Database::open(path, reporter.clone()).await.unwrap();
    (db, reporter)
}

pub fn record(gameid: i64, title: &str, rank: i64) -> GameRecord {
    let mut record = GameRecord::new(
        gameid,
        title,
        format!("{}/boardgame/{}/x", BASE, gameid),
        "999 Games",
    );
    record.rank = rank;
    record
}

pub fn listing_row(rank: Option<i64>, gameid: i64, title: &str, year: Option<i64>) -> String {
    let rank_cell = rank
        .map(|r| format!(r#"<a name="{r}"></a>{r}"#))
        .unwrap_or_else(|| "N/A".to_string());
    let year_span = year
        .map(|y| format!(r#"<span class="smallerfont dull">({y})</span>"#))
        .unwrap_or_default();
    format!(
        r#"<tr id="row_">
            <td class="collection_rank">{rank_cell}</td>
            <td class="collection_objectname"><div><a href="/boardgame/{gameid}/slug">{title}</a> {year_span}</div></td>
            <td class="collection_bggrating">7.50</td>
            <td class="collection_bggrating">7.80</td>
            <td class="collection_bggrating">1234</td>
        </tr>"#
    )
}

pub fn listing_page(rows: &[String], next_href: Option<&str>) -> Page {
    let next = next_href
        .map(|href| format!(r#"<a href="{href}" title="next page">Next</a>"#))
        .unwrap_or_default();
    Page::ok(format!(
        r#"<html><body><div id="collection"><table>{}</table></div>{next}</body></html>"#,
        rows.join("\n")
    ))
}

pub fn detail_page(preload_json: &str) -> Page {
    Page::ok(format!(
        "<html><head><script type=\"text/javascript\">\nGEEK.geekitemPreload = {};\nGEEK.geekitemSettings = {{}};\n</script></head><body></body></html>",
        preload_json
    ))
}

pub const PRELOAD: &str = r#"{"item":{"minplaytime":"45","maxplaytime":"90","rankinfo":[{"subdomain":null},{"subdomain":"familygames"}],"polls":{"boardgameweight":{"averageweight":2.2,"votes":350},"playerage":"10+","userplayers":{"best":[{"min":3,"max":4}],"recommended":[{"min":2,"max":5}],"totalvotes":"120"}},"stats":{"numplays":20000,"numplays_month":300}}}"#;

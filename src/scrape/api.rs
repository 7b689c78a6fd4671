//! 元数据接口（XML API2 的 thing 端点）

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::client::PageFetcher;
use crate::error::ScrapeError;

static ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("item").expect("valid selector"));
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("description").expect("valid selector"));
static MIN_AGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("minage").expect("valid selector"));
static MIN_PLAYERS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("minplayers").expect("valid selector"));
static MAX_PLAYERS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("maxplayers").expect("valid selector"));
static CATEGORY_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"link[type="boardgamecategory"]"#).expect("valid selector"));
static MECHANIC_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"link[type="boardgamemechanic"]"#).expect("valid selector"));

/// 接口返回的单个游戏信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThingInfo {
    pub description: Option<String>,
    pub min_age: Option<i64>,
    pub min_players: Option<i64>,
    pub max_players: Option<i64>,
    pub categories: Vec<String>,
    pub mechanics: Vec<String>,
}

#[async_trait]
pub trait MetadataApi: Send + Sync {
    async fn thing(&self, gameid: i64) -> Result<ThingInfo, ScrapeError>;
}

/// 通过 `PageFetcher` 访问 XML 接口
pub struct XmlApi {
    fetcher: Arc<dyn PageFetcher>,
    base: String,
}

impl XmlApi {
    pub fn new(fetcher: Arc<dyn PageFetcher>, base: impl Into<String>) -> Self {
        Self {
            fetcher,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn thing_url(&self, gameid: i64) -> String {
        format!("{}/xmlapi2/thing?id={}", self.base, gameid)
    }
}

#[async_trait]
impl MetadataApi for XmlApi {
    async fn thing(&self, gameid: i64) -> Result<ThingInfo, ScrapeError> {
        let url = self.thing_url(gameid);
        let page = self.fetcher.fetch(&url).await?;
        match page.status {
            // 202 表示请求已排队，稍后再取
            202 | 429 | 503 => Err(ScrapeError::RateLimited {
                url,
                status: page.status,
            }),
            _ if !page.is_success() => Err(ScrapeError::Status {
                url,
                status: page.status,
            }),
            _ => parse_thing(&page.body, &url),
        }
    }
}

/// 解析 thing 响应
pub fn parse_thing(xml: &str, url: &str) -> Result<ThingInfo, ScrapeError> {
    let document = Html::parse_document(xml);
    let item = document
        .select(&ITEM)
        .next()
        .ok_or_else(|| ScrapeError::MalformedPage {
            url: url.to_string(),
            reason: "响应中没有 item".to_string(),
        })?;

    let value_of = |selector: &Selector| {
        item.select(selector)
            .next()
            .and_then(|el| el.value().attr("value"))
            .and_then(|v| v.trim().parse::<i64>().ok())
    };
    let link_values = |selector: &Selector| {
        item.select(selector)
            .filter_map(|el| el.value().attr("value"))
            .map(str::to_string)
            .collect::<Vec<_>>()
    };

    let description = item
        .select(&DESCRIPTION)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(ThingInfo {
        description,
        min_age: value_of(&MIN_AGE),
        min_players: value_of(&MIN_PLAYERS),
        max_players: value_of(&MAX_PLAYERS),
        categories: link_values(&CATEGORY_LINK),
        mechanics: link_values(&MECHANIC_LINK),
    })
}

//! 目录搜索页解析

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::entity::game_record::{ListingEntry, RANK_SENTINEL, YEAR_UNKNOWN};
use crate::error::ScrapeError;

static COLLECTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#collection").expect("valid selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr#row_").expect("valid selector"));
static RANK_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.collection_rank a[name]").expect("valid selector"));
static TITLE_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.collection_objectname a").expect("valid selector"));
static YEAR_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.collection_objectname span").expect("valid selector"));
static RATING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.collection_bggrating").expect("valid selector"));
static NEXT_PAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[title="next page"]"#).expect("valid selector"));

static GAMEID_IN_HREF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/(\d+)/").expect("valid regex"));
static YEAR_IN_PARENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d+)\)").expect("valid regex"));

/// 一页搜索结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub entries: Vec<ListingEntry>,
    /// 无法解析的行及原因
    pub skipped: Vec<String>,
    /// 下一页的绝对地址
    pub next_url: Option<String>,
}

/// 解析搜索页；`base` 用于拼接相对链接
pub fn parse_listing(html: &str, base: &str, url: &str) -> Result<ListingPage, ScrapeError> {
    let document = Html::parse_document(html);
    let collection = document
        .select(&COLLECTION)
        .next()
        .ok_or_else(|| ScrapeError::MalformedPage {
            url: url.to_string(),
            reason: "找不到 div#collection".to_string(),
        })?;

    let mut page = ListingPage::default();
    for row in collection.select(&ROW) {
        match parse_row(row, base) {
            Ok(entry) => page.entries.push(entry),
            Err(reason) => page.skipped.push(reason),
        }
    }

    page.next_url = document
        .select(&NEXT_PAGE)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| absolute(base, href));
    Ok(page)
}

fn parse_row(row: ElementRef<'_>, base: &str) -> Result<ListingEntry, String> {
    let anchor = row
        .select(&TITLE_ANCHOR)
        .next()
        .ok_or_else(|| "缺少标题链接".to_string())?;
    let href = anchor
        .value()
        .attr("href")
        .ok_or_else(|| "标题链接没有 href".to_string())?;
    let gameid = GAMEID_IN_HREF
        .captures(href)
        .and_then(|c| c[1].parse::<i64>().ok())
        .ok_or_else(|| format!("链接中没有游戏 ID: {}", href))?;
    let title = anchor.text().collect::<String>().trim().to_string();

    let rank = row
        .select(&RANK_ANCHOR)
        .next()
        .and_then(|a| a.value().attr("name"))
        .and_then(|name| name.trim().parse::<i64>().ok())
        .unwrap_or(RANK_SENTINEL);

    let year = row
        .select(&YEAR_SPAN)
        .next()
        .map(|span| span.text().collect::<String>())
        .and_then(|text| {
            YEAR_IN_PARENS
                .captures(&text)
                .and_then(|c| c[1].parse::<i64>().ok())
        })
        .unwrap_or(YEAR_UNKNOWN);

    let ratings: Vec<String> = row
        .select(&RATING)
        .map(|td| td.text().collect::<String>().trim().to_string())
        .collect();
    let rating_at = |idx: usize| ratings.get(idx).and_then(|s| s.parse::<f64>().ok());

    Ok(ListingEntry {
        gameid,
        title,
        url: absolute(base, href),
        rank,
        year,
        bggrating: rating_at(0).filter(|v| v.is_finite()),
        avgrating: rating_at(1).filter(|v| v.is_finite()),
        votes: ratings
            .get(2)
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0),
    })
}

fn absolute(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}{}", base.trim_end_matches('/'), href)
    }
}

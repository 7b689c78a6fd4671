//! 游戏记录
//!
//! games 表的一行。固定字段用显式类型，分类/机制标记和统计数据这类
//! 随数据源增长的字段放在 `extra` 里，列名原样保留。

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

use crate::database::frame::Cell;

/// 排名无法解析时的占位值
pub const RANK_SENTINEL: i64 = 999_999;
/// 年份缺失时的占位值
pub const YEAR_UNKNOWN: i64 = 1900;
/// updated 列的文本格式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const TIMESTAMP_WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub const CATEGORY_PREFIX: &str = "cat-";
pub const MECHANISM_PREFIX: &str = "mech-";

/// 列名
pub mod columns {
    pub const GAMEID: &str = "gameid";
    pub const TITLE: &str = "title";
    pub const URL: &str = "url";
    pub const RANK: &str = "rank";
    pub const YEAR: &str = "year";
    pub const PUBLISHER: &str = "publisher";
    pub const UPDATED: &str = "updated";
    pub const BGGRATING: &str = "bggrating";
    pub const AVGRATING: &str = "avgrating";
    pub const VOTES: &str = "votes";
    pub const DESCRIPTION: &str = "description";
    pub const MINAGE: &str = "minage";
    pub const MINPLAYERS: &str = "minplayers";
    pub const MAXPLAYERS: &str = "maxplayers";
    pub const MINPLAYTIME: &str = "minplaytime";
    pub const MAXPLAYTIME: &str = "maxplaytime";
    pub const SUBDOMAIN: &str = "subdomain";
    pub const WEIGHT: &str = "weight";
    pub const WEIGHT_VOTES: &str = "weight_votes";
    pub const SUGGESTED_AGE: &str = "suggested_age";
    pub const NPLAYERS_BEST_MIN: &str = "nplayers_best_min";
    pub const NPLAYERS_BEST_MAX: &str = "nplayers_best_max";
    pub const NPLAYERS_RECOM_MIN: &str = "nplayers_recom_min";
    pub const NPLAYERS_RECOM_MAX: &str = "nplayers_recom_max";
    pub const NPLAYERS_VOTES: &str = "nplayers_votes";
    pub const CATEGORY_CLUSTER: &str = "category-cluster";
    pub const MECHANICS_CLUSTER: &str = "mechanics-cluster";
    pub const FINAL_SCORE: &str = "final_score";
    pub const BEST_FOR: &str = "best_for";
    pub const RANDOM: &str = "random";
}

/// 最近一次详情更新时间
///
/// 不符合格式的旧数据原样保留，视为需要更新。
#[derive(Debug, Clone, PartialEq)]
pub enum Updated {
    At(NaiveDateTime),
    Raw(String),
}

impl Updated {
    /// "从未更新" 占位时间：2000-01-01 00:00:00
    pub fn never() -> Self {
        Updated::At(never_updated())
    }

    pub fn now() -> Self {
        Updated::At(Local::now().naive_local())
    }

    pub fn parse(text: &str) -> Self {
        match NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT) {
            Ok(at) => Updated::At(at),
            Err(_) => Updated::Raw(text.to_string()),
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Updated::At(at) => Some(*at),
            Updated::Raw(_) => None,
        }
    }

    /// 是否已经做过详情补全
    pub fn is_enriched(&self) -> bool {
        self.as_datetime().is_some_and(|at| at > never_updated())
    }

    /// 距 `now` 的整天数，未解析的时间返回 `None`
    pub fn age_days(&self, now: NaiveDateTime) -> Option<i64> {
        self.as_datetime().map(|at| (now - at).num_days())
    }

    pub fn to_text(&self) -> String {
        match self {
            Updated::At(at) => at.format(TIMESTAMP_WRITE_FORMAT).to_string(),
            Updated::Raw(raw) => raw.clone(),
        }
    }
}

fn never_updated() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// 游戏记录
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    // === 必填 ===
    pub gameid: i64,
    pub title: String,
    pub url: String,
    pub rank: i64,
    pub year: i64,
    pub publisher: String,
    pub updated: Updated,

    // === 列表页评分 ===
    pub bggrating: Option<f64>,
    pub avgrating: Option<f64>,
    pub votes: i64,

    // === 详情补全 ===
    pub description: Option<String>,
    pub minage: Option<i64>,
    pub minplayers: Option<i64>,
    pub maxplayers: Option<i64>,
    pub minplaytime: Option<i64>,
    pub maxplaytime: Option<i64>,
    pub subdomain: Option<String>,
    pub weight: Option<f64>,
    pub weight_votes: Option<i64>,
    pub suggested_age: Option<i64>,
    pub nplayers_best_min: Option<i64>,
    pub nplayers_best_max: Option<i64>,
    pub nplayers_recom_min: Option<i64>,
    pub nplayers_recom_max: Option<i64>,
    pub nplayers_votes: Option<i64>,

    // === 派生 ===
    pub category_cluster: Option<String>,
    pub mechanics_cluster: Option<String>,
    pub final_score: Option<f64>,
    pub best_for: Option<String>,
    pub random: Option<f64>,

    /// 分类/机制标记（cat-*/mech-*）与统计数据
    pub extra: BTreeMap<String, JsonValue>,
}

/// 列表页的浅层数据，用来创建新记录
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    pub gameid: i64,
    pub title: String,
    pub url: String,
    pub rank: i64,
    pub year: i64,
    pub bggrating: Option<f64>,
    pub avgrating: Option<f64>,
    pub votes: i64,
}

impl GameRecord {
    pub const REQUIRED_COLUMNS: [&'static str; 7] = [
        columns::GAMEID,
        columns::TITLE,
        columns::URL,
        columns::RANK,
        columns::YEAR,
        columns::PUBLISHER,
        columns::UPDATED,
    ];

    /// 所有固定字段的列名，扩展字段不得与之重名
    pub const TYPED_COLUMNS: [&'static str; 30] = [
        columns::GAMEID,
        columns::TITLE,
        columns::URL,
        columns::RANK,
        columns::YEAR,
        columns::PUBLISHER,
        columns::UPDATED,
        columns::BGGRATING,
        columns::AVGRATING,
        columns::VOTES,
        columns::DESCRIPTION,
        columns::MINAGE,
        columns::MINPLAYERS,
        columns::MAXPLAYERS,
        columns::MINPLAYTIME,
        columns::MAXPLAYTIME,
        columns::SUBDOMAIN,
        columns::WEIGHT,
        columns::WEIGHT_VOTES,
        columns::SUGGESTED_AGE,
        columns::NPLAYERS_BEST_MIN,
        columns::NPLAYERS_BEST_MAX,
        columns::NPLAYERS_RECOM_MIN,
        columns::NPLAYERS_RECOM_MAX,
        columns::NPLAYERS_VOTES,
        columns::CATEGORY_CLUSTER,
        columns::MECHANICS_CLUSTER,
        columns::FINAL_SCORE,
        columns::BEST_FOR,
        columns::RANDOM,
    ];

    pub fn new(gameid: i64, title: impl Into<String>, url: impl Into<String>, publisher: impl Into<String>) -> Self {
        Self {
            gameid,
            title: title.into(),
            url: url.into(),
            rank: RANK_SENTINEL,
            year: YEAR_UNKNOWN,
            publisher: publisher.into(),
            updated: Updated::never(),
            bggrating: None,
            avgrating: None,
            votes: 0,
            description: None,
            minage: None,
            minplayers: None,
            maxplayers: None,
            minplaytime: None,
            maxplaytime: None,
            subdomain: None,
            weight: None,
            weight_votes: None,
            suggested_age: None,
            nplayers_best_min: None,
            nplayers_best_max: None,
            nplayers_recom_min: None,
            nplayers_recom_max: None,
            nplayers_votes: None,
            category_cluster: None,
            mechanics_cluster: None,
            final_score: None,
            best_for: None,
            random: None,
            extra: BTreeMap::new(),
        }
    }

    /// 由列表页数据创建新记录，updated 为 "从未更新"
    pub fn from_listing(entry: ListingEntry, publisher: &str) -> Self {
        let mut record = Self::new(entry.gameid, entry.title, entry.url, publisher);
        record.rank = entry.rank;
        record.year = entry.year;
        record.bggrating = entry.bggrating;
        record.avgrating = entry.avgrating;
        record.votes = entry.votes;
        record
    }

    pub fn is_typed_column(column: &str) -> bool {
        Self::TYPED_COLUMNS.contains(&column)
    }

    /// 写入扩展字段；与固定字段重名的键被忽略，返回是否写入
    pub fn merge_extra(&mut self, key: impl Into<String>, value: JsonValue) -> bool {
        let key = key.into();
        if Self::is_typed_column(&key) {
            return false;
        }
        self.extra.insert(key, value);
        true
    }

    pub fn set_flag(&mut self, key: impl Into<String>) {
        self.merge_extra(key, JsonValue::from(1));
    }

    /// 标记缺失或为 0 时视为未设置
    pub fn flag(&self, key: &str) -> bool {
        self.extra
            .get(key)
            .and_then(|v| Cell::from_json(v).as_f64())
            .is_some_and(|v| v != 0.0)
    }

    /// 以某前缀开头的扩展字段名
    pub fn flag_keys<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.extra
            .keys()
            .filter(move |k| k.starts_with(prefix))
            .map(String::as_str)
    }

    /// 扩展字段的数值（数字或数字字符串）
    pub fn number(&self, key: &str) -> Option<f64> {
        self.extra.get(key).and_then(|v| Cell::from_json(v).as_f64())
    }

    /// 按列名取值
    pub fn get(&self, column: &str) -> Cell {
        let opt_int = |v: Option<i64>| v.map_or(Cell::Null, Cell::Int);
        let opt_real = |v: Option<f64>| v.map_or(Cell::Null, Cell::real);
        let opt_text = |v: &Option<String>| v.clone().map_or(Cell::Null, Cell::Text);
        match column {
            columns::GAMEID => Cell::Int(self.gameid),
            columns::TITLE => Cell::text(self.title.clone()),
            columns::URL => Cell::text(self.url.clone()),
            columns::RANK => Cell::Int(self.rank),
            columns::YEAR => Cell::Int(self.year),
            columns::PUBLISHER => Cell::text(self.publisher.clone()),
            columns::UPDATED => Cell::Text(self.updated.to_text()),
            columns::BGGRATING => opt_real(self.bggrating),
            columns::AVGRATING => opt_real(self.avgrating),
            columns::VOTES => Cell::Int(self.votes),
            columns::DESCRIPTION => opt_text(&self.description),
            columns::MINAGE => opt_int(self.minage),
            columns::MINPLAYERS => opt_int(self.minplayers),
            columns::MAXPLAYERS => opt_int(self.maxplayers),
            columns::MINPLAYTIME => opt_int(self.minplaytime),
            columns::MAXPLAYTIME => opt_int(self.maxplaytime),
            columns::SUBDOMAIN => opt_text(&self.subdomain),
            columns::WEIGHT => opt_real(self.weight),
            columns::WEIGHT_VOTES => opt_int(self.weight_votes),
            columns::SUGGESTED_AGE => opt_int(self.suggested_age),
            columns::NPLAYERS_BEST_MIN => opt_int(self.nplayers_best_min),
            columns::NPLAYERS_BEST_MAX => opt_int(self.nplayers_best_max),
            columns::NPLAYERS_RECOM_MIN => opt_int(self.nplayers_recom_min),
            columns::NPLAYERS_RECOM_MAX => opt_int(self.nplayers_recom_max),
            columns::NPLAYERS_VOTES => opt_int(self.nplayers_votes),
            columns::CATEGORY_CLUSTER => opt_text(&self.category_cluster),
            columns::MECHANICS_CLUSTER => opt_text(&self.mechanics_cluster),
            columns::FINAL_SCORE => opt_real(self.final_score),
            columns::BEST_FOR => opt_text(&self.best_for),
            columns::RANDOM => opt_real(self.random),
            other => self.extra.get(other).map_or(Cell::Null, Cell::from_json),
        }
    }

    /// 转为一行：必填列始终输出，其余只输出有值的列
    pub fn to_row(&self) -> Vec<(String, Cell)> {
        let mut row: Vec<(String, Cell)> = Self::TYPED_COLUMNS
            .iter()
            .filter_map(|column| {
                let cell = self.get(column);
                let required = Self::REQUIRED_COLUMNS.contains(column);
                (required || !cell.is_null()).then(|| (column.to_string(), cell))
            })
            .collect();
        row.extend(
            self.extra
                .iter()
                .map(|(k, v)| (k.clone(), Cell::from_json(v)))
                .filter(|(_, cell)| !cell.is_null()),
        );
        row
    }

    /// 从一行还原记录；没有 gameid 的行无法作为记录返回 `None`
    pub fn from_row(mut cells: BTreeMap<String, Cell>) -> Option<Self> {
        let gameid = cells.remove(columns::GAMEID)?.as_i64()?;
        let mut take = |column: &str| cells.remove(column).unwrap_or(Cell::Null);

        let title = take(columns::TITLE).as_text().unwrap_or_default();
        let url = take(columns::URL).as_text().unwrap_or_default();
        let publisher = take(columns::PUBLISHER).as_text().unwrap_or_default();
        let mut record = Self::new(gameid, title, url, publisher);

        record.rank = take(columns::RANK).as_i64().unwrap_or(RANK_SENTINEL);
        record.year = take(columns::YEAR).as_i64().unwrap_or(YEAR_UNKNOWN);
        record.updated = match take(columns::UPDATED).as_text() {
            Some(text) => Updated::parse(&text),
            None => Updated::never(),
        };
        record.bggrating = take(columns::BGGRATING).as_f64();
        record.avgrating = take(columns::AVGRATING).as_f64();
        record.votes = take(columns::VOTES).as_i64().unwrap_or(0);
        record.description = take(columns::DESCRIPTION).as_text();
        record.minage = take(columns::MINAGE).as_i64();
        record.minplayers = take(columns::MINPLAYERS).as_i64();
        record.maxplayers = take(columns::MAXPLAYERS).as_i64();
        record.minplaytime = take(columns::MINPLAYTIME).as_i64();
        record.maxplaytime = take(columns::MAXPLAYTIME).as_i64();
        record.subdomain = take(columns::SUBDOMAIN).as_text();
        record.weight = take(columns::WEIGHT).as_f64();
        record.weight_votes = take(columns::WEIGHT_VOTES).as_i64();
        record.suggested_age = take(columns::SUGGESTED_AGE).as_i64();
        record.nplayers_best_min = take(columns::NPLAYERS_BEST_MIN).as_i64();
        record.nplayers_best_max = take(columns::NPLAYERS_BEST_MAX).as_i64();
        record.nplayers_recom_min = take(columns::NPLAYERS_RECOM_MIN).as_i64();
        record.nplayers_recom_max = take(columns::NPLAYERS_RECOM_MAX).as_i64();
        record.nplayers_votes = take(columns::NPLAYERS_VOTES).as_i64();
        record.category_cluster = take(columns::CATEGORY_CLUSTER).as_text();
        record.mechanics_cluster = take(columns::MECHANICS_CLUSTER).as_text();
        record.final_score = take(columns::FINAL_SCORE).as_f64();
        record.best_for = take(columns::BEST_FOR).as_text();
        record.random = take(columns::RANDOM).as_f64();

        record.extra = cells
            .into_iter()
            .filter(|(_, cell)| !cell.is_null())
            .map(|(k, cell)| (k, cell.to_json()))
            .collect();
        Some(record)
    }
}

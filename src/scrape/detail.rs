//! 详情页与元数据合并

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value as JsonValue;

use super::api::ThingInfo;
use crate::entity::game_record::{CATEGORY_PREFIX, GameRecord, MECHANISM_PREFIX};
use crate::error::ScrapeError;

static PRELOAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"geekitemPreload\s*=\s*(\{.*\}\});").expect("valid regex"));

/// 从详情页脚本中取出 `geekitemPreload = {...};` 的 JSON
pub fn extract_preload(html: &str, url: &str) -> Result<JsonValue, ScrapeError> {
    let blob = PRELOAD
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or_else(|| ScrapeError::MalformedPage {
            url: url.to_string(),
            reason: "找不到 geekitemPreload".to_string(),
        })?;
    serde_json::from_str(blob.as_str()).map_err(|e| ScrapeError::MalformedPage {
        url: url.to_string(),
        reason: format!("geekitemPreload 不是合法 JSON: {}", e),
    })
}

fn json_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_f64(value: &JsonValue) -> Option<f64> {
    let number = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

/// 投票区间的最小下限或最大上限，没有数据时为 0
fn player_bound(ranges: Option<&JsonValue>, field: &str, lowest: bool) -> i64 {
    let bounds = ranges
        .and_then(JsonValue::as_array)
        .into_iter()
        .flatten()
        .filter_map(|range| range.get(field).and_then(json_i64));
    let bound = if lowest { bounds.min() } else { bounds.max() };
    bound.unwrap_or(0)
}

/// 合并详情页数据
pub fn apply_preload(record: &mut GameRecord, preload: &JsonValue) {
    let item = preload.get("item").unwrap_or(&JsonValue::Null);

    record.minplaytime = item.get("minplaytime").and_then(json_i64);
    record.maxplaytime = item.get("maxplaytime").and_then(json_i64);
    record.subdomain = Some(
        item.pointer("/rankinfo/1/subdomain")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string(),
    );

    let polls = item.get("polls");
    let poll = |path: &str| polls.and_then(|p| p.pointer(path));

    record.weight = poll("/boardgameweight/averageweight").and_then(json_f64);
    record.weight_votes = poll("/boardgameweight/votes").and_then(json_i64);
    record.suggested_age = poll("/playerage").and_then(|v| match v {
        JsonValue::String(s) => s.replace('+', "").trim().parse().ok(),
        other => json_i64(other),
    });

    let best = poll("/userplayers/best");
    let recommended = poll("/userplayers/recommended");
    record.nplayers_best_min = Some(player_bound(best, "min", true));
    record.nplayers_best_max = Some(player_bound(best, "max", false));
    record.nplayers_recom_min = Some(player_bound(recommended, "min", true));
    record.nplayers_recom_max = Some(player_bound(recommended, "max", false));
    record.nplayers_votes = poll("/userplayers/totalvotes").and_then(json_i64);

    if let Some(stats) = item.get("stats").and_then(JsonValue::as_object) {
        for (key, value) in stats {
            if !record.merge_extra(key.clone(), value.clone()) {
                log::debug!("统计字段 {} 与固定列重名，忽略", key);
            }
        }
    }
}

/// 合并元数据接口的信息和分类/机制标记
pub fn apply_thing(record: &mut GameRecord, thing: &ThingInfo) {
    record.description = thing.description.clone();
    record.minage = thing.min_age;
    record.minplayers = thing.min_players;
    record.maxplayers = thing.max_players;
    for category in &thing.categories {
        record.set_flag(format!("{}{}", CATEGORY_PREFIX, category.to_lowercase()));
    }
    for mechanic in &thing.mechanics {
        record.set_flag(format!("{}{}", MECHANISM_PREFIX, mechanic.to_lowercase()));
    }
}

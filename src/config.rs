//! 运行参数
//!
//! 默认值写在 `Default` 里，settings 表中的键值对覆盖默认值。

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::SettingsError;

pub const KEY_FRESHNESS_DAYS: &str = "freshness_days";
pub const KEY_SAVE_EVERY_SECS: &str = "save_every_secs";
pub const KEY_PAGE_DELAY_MS: &str = "page_delay_ms";
pub const KEY_CATALOG_BASE: &str = "catalog_base";
pub const KEY_API_BASE: &str = "api_base";
pub const KEY_CLUSTER_COUNT: &str = "cluster_count";
pub const KEY_CLUSTER_MAX: &str = "cluster_max";
pub const KEY_CLUSTER_ATTEMPTS: &str = "cluster_attempts";
pub const KEY_CLUSTER_SEED: &str = "cluster_seed";
pub const KEY_TOP_TIER_RANK: &str = "top_tier_rank";
pub const KEY_LOG_LEVEL: &str = "log_level";
pub const KEY_PUBLISHERS: &str = "publishers";

pub const ALL_KEYS: [&str; 12] = [
    KEY_FRESHNESS_DAYS,
    KEY_SAVE_EVERY_SECS,
    KEY_PAGE_DELAY_MS,
    KEY_CATALOG_BASE,
    KEY_API_BASE,
    KEY_CLUSTER_COUNT,
    KEY_CLUSTER_MAX,
    KEY_CLUSTER_ATTEMPTS,
    KEY_CLUSTER_SEED,
    KEY_TOP_TIER_RANK,
    KEY_LOG_LEVEL,
    KEY_PUBLISHERS,
];

const BGG_BASE: &str = "https://boardgamegeek.com";

/// 默认抓取的出版商及其高级搜索参数
const DEFAULT_PUBLISHERS: [(&str, u32); 29] = [
    ("999 Games", 267),
    ("Asmodee", 157),
    ("Avalon Hill", 5),
    ("Bergsala Enigma", 6784),
    ("Cool mini or not", 34793),
    ("Czech Games Edition", 7345),
    ("Days of Wonder", 1027),
    ("Don & Co", 137),
    ("Fantasy Flight Games", 17),
    ("Fun Forge", 8832),
    ("Games Workshop", 26),
    ("Guillotine Games", 21020),
    ("Hurrican", 6015),
    ("Iello", 8923),
    ("Intrafin Games", 5380),
    ("Libellud", 9051),
    ("Ludonaute", 11688),
    ("Monolith Games", 27147),
    ("Osprey Games", 29313),
    ("Plaid Hat Games", 10754),
    ("Queen Games", 47),
    ("Repos Production", 4384),
    ("Space Cowboys", 25842),
    ("Steve Jackson Games", 19),
    ("Story Factory", 17940),
    ("Studio McVey", 21608),
    ("The Game Master", 2862),
    ("White Goblin Games", 4932),
    ("Z-Man Games", 538),
];

/// 出版商查询参数片段
pub fn publisher_query(publisher_id: u32) -> String {
    format!("&include%5Bpublisherid%5D={}", publisher_id)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub freshness_days: i64,
    pub save_every_secs: u64,
    pub page_delay_ms: u64,
    pub catalog_base: String,
    pub api_base: String,
    pub cluster_count: usize,
    pub cluster_max: usize,
    pub cluster_attempts: u32,
    pub cluster_seed: u64,
    pub top_tier_rank: i64,
    pub log_level: String,
    /// 出版商名 → 查询参数片段
    pub publishers: BTreeMap<String, String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            freshness_days: 60,
            save_every_secs: 120,
            page_delay_ms: 1000,
            catalog_base: BGG_BASE.to_string(),
            api_base: BGG_BASE.to_string(),
            cluster_count: 5,
            cluster_max: 140,
            cluster_attempts: 50_000,
            cluster_seed: 42,
            top_tier_rank: 1000,
            log_level: "info".to_string(),
            publishers: DEFAULT_PUBLISHERS
                .iter()
                .map(|(name, id)| (name.to_string(), publisher_query(*id)))
                .collect(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SettingsError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| SettingsError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

impl AppSettings {
    pub fn save_every(&self) -> Duration {
        Duration::from_secs(self.save_every_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// 用一条键值对覆盖当前值
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        match key {
            KEY_FRESHNESS_DAYS => self.freshness_days = parse_number(key, value)?,
            KEY_SAVE_EVERY_SECS => self.save_every_secs = parse_number(key, value)?,
            KEY_PAGE_DELAY_MS => self.page_delay_ms = parse_number(key, value)?,
            KEY_CATALOG_BASE => self.catalog_base = value.trim_end_matches('/').to_string(),
            KEY_API_BASE => self.api_base = value.trim_end_matches('/').to_string(),
            KEY_CLUSTER_COUNT => {
                let count: usize = parse_number(key, value)?;
                if count == 0 {
                    return Err(SettingsError::InvalidValue {
                        key: key.to_string(),
                        reason: "聚类数必须大于 0".to_string(),
                    });
                }
                self.cluster_count = count;
            }
            KEY_CLUSTER_MAX => self.cluster_max = parse_number(key, value)?,
            KEY_CLUSTER_ATTEMPTS => self.cluster_attempts = parse_number(key, value)?,
            KEY_CLUSTER_SEED => self.cluster_seed = parse_number(key, value)?,
            KEY_TOP_TIER_RANK => self.top_tier_rank = parse_number(key, value)?,
            KEY_LOG_LEVEL => {
                crate::utils::logs::parse_level(value).map_err(|reason| {
                    SettingsError::InvalidValue {
                        key: key.to_string(),
                        reason,
                    }
                })?;
                self.log_level = value.to_lowercase();
            }
            KEY_PUBLISHERS => {
                self.publishers =
                    serde_json::from_str(value).map_err(|e| SettingsError::InvalidValue {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?
            }
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// 全部设置项的文本形式，顺序与 `ALL_KEYS` 一致
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let publishers = serde_json::to_string(&self.publishers).unwrap_or_default();
        vec![
            (KEY_FRESHNESS_DAYS, self.freshness_days.to_string()),
            (KEY_SAVE_EVERY_SECS, self.save_every_secs.to_string()),
            (KEY_PAGE_DELAY_MS, self.page_delay_ms.to_string()),
            (KEY_CATALOG_BASE, self.catalog_base.clone()),
            (KEY_API_BASE, self.api_base.clone()),
            (KEY_CLUSTER_COUNT, self.cluster_count.to_string()),
            (KEY_CLUSTER_MAX, self.cluster_max.to_string()),
            (KEY_CLUSTER_ATTEMPTS, self.cluster_attempts.to_string()),
            (KEY_CLUSTER_SEED, self.cluster_seed.to_string()),
            (KEY_TOP_TIER_RANK, self.top_tier_rank.to_string()),
            (KEY_LOG_LEVEL, self.log_level.clone()),
            (KEY_PUBLISHERS, publishers),
        ]
    }
}

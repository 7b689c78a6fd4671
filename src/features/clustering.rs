//! 按分类/机制标记聚类并生成簇标题

use std::collections::BTreeSet;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::kmeans::KMeans;
use crate::config::AppSettings;
use crate::entity::game_record::{CATEGORY_PREFIX, GameRecord, MECHANISM_PREFIX, columns};
use crate::error::FeatureError;
use crate::utils::report::{Event, Reporter};

/// 参与聚类的标记族
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterFamily {
    Category,
    Mechanism,
}

impl ClusterFamily {
    pub fn prefix(self) -> &'static str {
        match self {
            ClusterFamily::Category => CATEGORY_PREFIX,
            ClusterFamily::Mechanism => MECHANISM_PREFIX,
        }
    }

    /// 结果写入的列
    pub fn column(self) -> &'static str {
        match self {
            ClusterFamily::Category => columns::CATEGORY_CLUSTER,
            ClusterFamily::Mechanism => columns::MECHANICS_CLUSTER,
        }
    }

    fn excluded(self) -> &'static [&'static str] {
        match self {
            ClusterFamily::Category => &["cat-expansion for base-game", "cat-fan expansion"],
            ClusterFamily::Mechanism => &[],
        }
    }

    /// 全部记录中出现过的该族标记列，按名称排序
    pub fn flag_columns(self, records: &[GameRecord]) -> Vec<String> {
        let excluded = self.excluded();
        records
            .iter()
            .flat_map(|r| r.flag_keys(self.prefix()))
            .filter(|key| !excluded.contains(key))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn assign(self, record: &mut GameRecord, title: String) {
        match self {
            ClusterFamily::Category => record.category_cluster = Some(title),
            ClusterFamily::Mechanism => record.mechanics_cluster = Some(title),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParams {
    pub clusters: usize,
    /// 最大簇的大小上限（含）
    pub max_cluster_size: usize,
    pub max_attempts: u32,
    pub max_iter: usize,
    /// 训练集只取排名在此之内的记录
    pub top_tier_rank: i64,
    pub seed: u64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            clusters: 5,
            max_cluster_size: 140,
            max_attempts: 50_000,
            max_iter: 1000,
            top_tier_rank: 1000,
            seed: 42,
        }
    }
}

impl From<&AppSettings> for ClusterParams {
    fn from(settings: &AppSettings) -> Self {
        Self {
            clusters: settings.cluster_count,
            max_cluster_size: settings.cluster_max,
            max_attempts: settings.cluster_attempts,
            top_tier_rank: settings.top_tier_rank,
            seed: settings.cluster_seed,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOutcome {
    pub titles: Vec<String>,
    /// 训练集中每个簇的大小
    pub sizes: Vec<usize>,
    pub attempts: u32,
    /// 是否满足簇大小上限
    pub satisfied: bool,
}

/// 由质心生成标题：取权重最高的三个标记（百分比取整后降序，相同保持列顺序）
pub fn cluster_title(index: usize, centroid: &[f64], columns: &[String], prefix: &str) -> String {
    let mut weighted: Vec<(&str, i64)> = columns
        .iter()
        .zip(centroid)
        .map(|(column, weight)| (column.as_str(), (weight * 100.0).round() as i64))
        .collect();
    weighted.sort_by(|a, b| b.1.cmp(&a.1));
    let names: Vec<&str> = weighted
        .iter()
        .take(3)
        .map(|(column, _)| column.strip_prefix(prefix).unwrap_or(*column))
        .collect();
    format!("{}) {}", index + 1, names.join(" - "))
}

fn feature_row(record: &GameRecord, columns: &[String]) -> Vec<f64> {
    columns
        .iter()
        .map(|c| if record.flag(c) { 1.0 } else { 0.0 })
        .collect()
}

/// 在已补全的头部记录上训练，并给全部记录打上簇标题
///
/// 反复重新初始化，直到最大簇不超过上限或尝试次数用尽；用尽时沿用最后一次结果并告警。
pub fn cluster(
    records: &mut [GameRecord],
    family: ClusterFamily,
    params: &ClusterParams,
    reporter: &dyn Reporter,
) -> Result<ClusterOutcome, FeatureError> {
    let columns = family.flag_columns(records);
    if columns.is_empty() {
        return Err(FeatureError::NoColumns {
            prefix: family.prefix(),
        });
    }

    let training: Vec<Vec<f64>> = records
        .iter()
        .filter(|r| r.updated.is_enriched() && r.rank <= params.top_tier_rank)
        .map(|r| feature_row(r, &columns))
        .collect();
    if params.clusters == 0 || training.len() < params.clusters {
        return Err(FeatureError::NotEnoughSamples {
            samples: training.len(),
            clusters: params.clusters,
        });
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let max_attempts = params.max_attempts.max(1);
    let mut attempts = 0;
    let (model, sizes) = loop {
        attempts += 1;
        let model = KMeans::fit(&training, params.clusters, params.max_iter, &mut rng);
        let mut sizes = vec![0usize; params.clusters];
        for row in &training {
            sizes[model.predict(row)] += 1;
        }
        let biggest = sizes.iter().copied().max().unwrap_or(0);
        if biggest <= params.max_cluster_size || attempts >= max_attempts {
            break (model, sizes);
        }
    };

    let biggest = sizes.iter().copied().max().unwrap_or(0);
    let satisfied = biggest <= params.max_cluster_size;
    reporter.report(&Event::ClusterSizes {
        column: family.column(),
        attempts,
        sizes: sizes.clone(),
    });
    if !satisfied {
        reporter.report(&Event::ClusterCapMissed {
            column: family.column(),
            biggest,
            cap: params.max_cluster_size,
        });
    }

    let titles: Vec<String> = model
        .centroids
        .iter()
        .enumerate()
        .map(|(idx, centroid)| cluster_title(idx, centroid, &columns, family.prefix()))
        .collect();
    reporter.report(&Event::ClusterTitles {
        column: family.column(),
        titles: titles.clone(),
    });

    for record in records.iter_mut() {
        let label = model.predict(&feature_row(record, &columns));
        family.assign(record, titles[label].clone());
    }

    Ok(ClusterOutcome {
        titles,
        sizes,
        attempts,
        satisfied,
    })
}

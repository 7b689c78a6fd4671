//! 候选游戏报告
//!
//! `sections` 只做筛选排序，`render` 负责排版。

use std::fmt::Write as _;

use crate::entity::game_record::GameRecord;
use crate::features::score::BUCKETS;

/// 重度区间（闭区间）
pub const WEIGHT_RANGES: [(f64, f64); 5] = [(1.0, 1.4), (1.5, 1.9), (1.9, 2.5), (2.5, 3.1), (3.1, 4.0)];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerFilter {
    pub min_year: i64,
    pub min_weight_votes: i64,
    pub min_score: f64,
    pub limit: usize,
}

impl Default for ViewerFilter {
    fn default() -> Self {
        Self {
            min_year: 2000,
            min_weight_votes: 10,
            min_score: 15.0,
            limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub title: String,
    pub year: i64,
    pub weight: f64,
    pub best_for: String,
    pub final_score: f64,
    pub category_cluster: Option<String>,
    pub mechanics_cluster: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub bucket: &'static str,
    pub weight_range: (f64, f64),
    pub candidates: Vec<Candidate>,
}

fn candidate(record: &GameRecord, bucket: &str, range: (f64, f64), filter: &ViewerFilter) -> Option<Candidate> {
    let weight = record.weight?;
    let final_score = record.final_score?;
    let matches = record.best_for.as_deref() == Some(bucket)
        && (range.0..=range.1).contains(&weight)
        && record.year >= filter.min_year
        && record.weight_votes.is_some_and(|v| v >= filter.min_weight_votes)
        && final_score >= filter.min_score;
    matches.then(|| Candidate {
        title: record.title.clone(),
        year: record.year,
        weight,
        best_for: bucket.to_string(),
        final_score,
        category_cluster: record.category_cluster.clone(),
        mechanics_cluster: record.mechanics_cluster.clone(),
        url: record.url.clone(),
    })
}

/// 每个人数分组 × 重度区间一节，节内按综合评分降序取前 `limit` 个
pub fn sections<'a>(
    records: impl IntoIterator<Item = &'a GameRecord>,
    filter: &ViewerFilter,
) -> Vec<Section> {
    let records: Vec<&GameRecord> = records.into_iter().collect();
    let mut out = Vec::with_capacity(BUCKETS.len() * WEIGHT_RANGES.len());
    for bucket in BUCKETS {
        for range in WEIGHT_RANGES {
            let mut candidates: Vec<Candidate> = records
                .iter()
                .filter_map(|r| candidate(r, bucket, range, filter))
                .collect();
            candidates.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
            candidates.truncate(filter.limit);
            out.push(Section {
                bucket,
                weight_range: range,
                candidates,
            });
        }
    }
    out
}

/// 簇标题前的编号，如 "3) a - b - c" 取 "3"
fn cluster_number(label: Option<&str>) -> &str {
    label
        .and_then(|l| l.split(')').next())
        .unwrap_or("-")
}

pub fn render(sections: &[Section]) -> String {
    let mut out = String::new();
    for section in sections {
        let _ = writeln!(
            out,
            "Weight: {} to {} - Best for {}",
            section.weight_range.0, section.weight_range.1, section.bucket
        );
        let _ = writeln!(out, "{}", "-".repeat(80));
        for c in &section.candidates {
            let title: String = c.title.chars().take(35).collect();
            let _ = writeln!(
                out,
                "{:<35} ({}) - {:.2}, {}, {:.1}, Cat: {}, Mech: {}\n\t\t{}",
                title,
                c.year,
                c.weight,
                c.best_for,
                c.final_score,
                cluster_number(c.category_cluster.as_deref()),
                cluster_number(c.mechanics_cluster.as_deref()),
                c.url
            );
        }
        out.push_str("\n\n");
    }
    out
}

//! 派生特征：簇标题、综合评分、最佳人数分组

pub mod clustering;
pub mod kmeans;
pub mod score;

use chrono::{Datelike, Local};

use crate::entity::game_record::GameRecord;
use crate::utils::report::{Event, Reporter};

use clustering::{ClusterFamily, ClusterOutcome, ClusterParams};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSummary {
    pub category: Option<ClusterOutcome>,
    pub mechanics: Option<ClusterOutcome>,
    pub scored: usize,
    pub bucketed: usize,
}

/// 依次完成两次聚类和评分
///
/// 某一族无法聚类（没有标记列或样本不足）时跳过该族，其余照常进行。
pub fn generate(
    records: &mut [GameRecord],
    params: &ClusterParams,
    reporter: &dyn Reporter,
) -> FeatureSummary {
    let mut summary = FeatureSummary::default();

    for family in [ClusterFamily::Category, ClusterFamily::Mechanism] {
        let outcome = match clustering::cluster(records, family, params, reporter) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                reporter.report(&Event::ClusteringSkipped {
                    column: family.column(),
                    reason: e.to_string(),
                });
                None
            }
        };
        match family {
            ClusterFamily::Category => summary.category = outcome,
            ClusterFamily::Mechanism => summary.mechanics = outcome,
        }
    }

    let (scored, bucketed) = score::score_and_bucket(records, Local::now().year());
    summary.scored = scored;
    summary.bucketed = bucketed;
    reporter.report(&Event::FeaturesScored { scored, bucketed });
    summary
}

//! 完整流程：发现 → 补全 → 派生特征 → 写回 → 报告

use crate::config::AppSettings;
use crate::database::store::Database;
use crate::error::AppError;
use crate::features::{self, FeatureSummary, clustering::ClusterParams};
use crate::scrape::ScrapeClient;
use crate::utils::report::Reporter;
use crate::viewer::{self, ViewerFilter};

/// 计算簇标题、综合评分和人数分组（只改内存，不写回）
pub fn derive_features(db: &mut Database, settings: &AppSettings, reporter: &dyn Reporter) -> FeatureSummary {
    let params = ClusterParams::from(settings);
    features::generate(db.records_mut(), &params, reporter)
}

/// 候选报告文本
pub fn report(db: &Database) -> String {
    let sections = viewer::sections(db.records(), &ViewerFilter::default());
    viewer::render(&sections)
}

/// 跑完整流程，返回报告文本
pub async fn run(
    db: &mut Database,
    scraper: &ScrapeClient,
    settings: &AppSettings,
    reporter: &dyn Reporter,
) -> Result<String, AppError> {
    scraper.discover_all(db, &settings.publishers).await?;
    scraper.update_all(db).await?;
    derive_features(db, settings, reporter);
    db.flush().await?;
    Ok(report(db))
}

//! 批量详情更新

use chrono::Local;
use tokio::time::Instant;

use super::ScrapeClient;
use crate::database::store::Database;
use crate::entity::game_record::columns;
use crate::error::ScrapeError;
use crate::utils::report::Event;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub enriched: usize,
    pub skipped_fresh: usize,
    pub flushes: usize,
}

impl ScrapeClient {
    /// 按排名依次补全过期记录
    ///
    /// 最近 `freshness_days` 天内更新过的记录跳过；距上次保存超过 `save_every`
    /// 就写回一次，结束时再写回一次。任何补全错误都会中止本轮。
    pub async fn update_all(&self, db: &mut Database) -> Result<UpdateStats, ScrapeError> {
        let mut stats = UpdateStats::default();
        let now = Local::now().naive_local();
        let mut last_flush = Instant::now();

        for gameid in db.ids_sorted_by(columns::RANK, false) {
            let record = db.get(gameid)?;
            let fresh = record
                .updated
                .age_days(now)
                .is_some_and(|age| age <= self.options.freshness_days);
            if fresh {
                stats.skipped_fresh += 1;
                continue;
            }

            self.reporter.report(&Event::EnrichStarted {
                gameid,
                rank: record.rank,
                url: record.url.clone(),
            });
            let enriched = self.enrich_with_retry(record).await?;
            db.put(enriched, true);
            stats.enriched += 1;

            if last_flush.elapsed() >= self.options.save_every {
                db.flush().await?;
                stats.flushes += 1;
                last_flush = Instant::now();
            }
        }

        db.flush().await?;
        stats.flushes += 1;
        self.reporter.report(&Event::UpdateFinished {
            enriched: stats.enriched,
            skipped_fresh: stats.skipped_fresh,
        });
        Ok(stats)
    }
}

//! 综合评分与最佳人数分组

use crate::entity::game_record::GameRecord;

pub const BUCKET_TWO: &str = "2 players";
pub const BUCKET_THREE: &str = "3 players";
pub const BUCKET_FOUR: &str = "4 players";
pub const BUCKET_FIVE_PLUS: &str = "5 or more players";

/// 报告中的分组顺序
pub const BUCKETS: [&str; 4] = [BUCKET_TWO, BUCKET_THREE, BUCKET_FOUR, BUCKET_FIVE_PLUS];

/// `2 * bggrating + log10(numplays_month + numplays / 10000 * log10(years))`，
/// 其中 `years = current_year - year + 2`
///
/// 任一输入缺失或结果不是有限数时返回 `None`。
pub fn final_score(record: &GameRecord, current_year: i32) -> Option<f64> {
    let rating = record.bggrating?;
    let plays = record.number("numplays")?;
    let plays_month = record.number("numplays_month")?;
    let years = (i64::from(current_year) - record.year + 2) as f64;

    let lasting_popularity = (plays_month + plays / 10_000.0 * years.log10()).log10();
    Some(rating * 2.0 + lasting_popularity).filter(|score| score.is_finite())
}

/// 按最佳人数下限分组
pub fn best_players(nplayers_best_min: Option<i64>) -> Option<&'static str> {
    match nplayers_best_min? {
        2 => Some(BUCKET_TWO),
        3 => Some(BUCKET_THREE),
        4 => Some(BUCKET_FOUR),
        n if n >= 5 => Some(BUCKET_FIVE_PLUS),
        _ => None,
    }
}

/// 给每条记录写入 final_score 和 best_for，返回（有评分数，有分组数）
pub fn score_and_bucket(records: &mut [GameRecord], current_year: i32) -> (usize, usize) {
    let mut scored = 0;
    let mut bucketed = 0;
    for record in records.iter_mut() {
        record.final_score = final_score(record, current_year);
        record.best_for = best_players(record.nplayers_best_min).map(str::to_string);
        scored += usize::from(record.final_score.is_some());
        bucketed += usize::from(record.best_for.is_some());
    }
    (scored, bucketed)
}

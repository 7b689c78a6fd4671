use boardgame_scout_lib::entity::game_record::GameRecord;
use boardgame_scout_lib::features::score::{BUCKET_FOUR, BUCKET_TWO};
use boardgame_scout_lib::viewer::{self, ViewerFilter, WEIGHT_RANGES};

fn candidate(gameid: i64, title: &str, weight: f64, score: f64, bucket: &str) -> GameRecord {
    let mut record = GameRecord::new(
        gameid,
        title,
        format!("https://bgg.test/boardgame/{gameid}/x"),
        "p",
    );
    record.year = 2017;
    record.weight = Some(weight);
    record.weight_votes = Some(50);
    record.final_score = Some(score);
    record.best_for = Some(bucket.to_string());
    record
}

fn section<'a>(all: &'a [viewer::Section], bucket: &str, range: (f64, f64)) -> &'a viewer::Section {
    all.iter()
        .find(|s| s.bucket == bucket && s.weight_range == range)
        .unwrap()
}

#[test]
fn one_section_per_bucket_and_weight_range() {
    let all = viewer::sections(std::iter::empty(), &ViewerFilter::default());
    assert_eq!(all.len(), 4 * WEIGHT_RANGES.len());
    assert!(all.iter().all(|s| s.candidates.is_empty()));
    assert_eq!(all[0].bucket, BUCKET_TWO);
    assert_eq!(all[0].weight_range, (1.0, 1.4));
}

#[test]
fn filters_drop_old_unvoted_and_low_scoring_games() {
    let keep = candidate(1, "Keep", 1.7, 16.0, BUCKET_TWO);
    let mut old = candidate(2, "Old", 1.7, 16.0, BUCKET_TWO);
    old.year = 1999;
    let mut few_votes = candidate(3, "Few votes", 1.7, 16.0, BUCKET_TWO);
    few_votes.weight_votes = Some(9);
    let mut no_votes = candidate(4, "No votes", 1.7, 16.0, BUCKET_TWO);
    no_votes.weight_votes = None;
    let low = candidate(5, "Low", 1.7, 14.9, BUCKET_TWO);
    let mut no_weight = candidate(6, "No weight", 1.7, 16.0, BUCKET_TWO);
    no_weight.weight = None;
    let other_bucket = candidate(7, "Other bucket", 1.7, 16.0, BUCKET_FOUR);

    let records = [keep, old, few_votes, no_votes, low, no_weight, other_bucket];
    let all = viewer::sections(&records, &ViewerFilter::default());

    let titles: Vec<&str> = section(&all, BUCKET_TWO, (1.5, 1.9))
        .candidates
        .iter()
        .map(|c| c.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Keep"]);
    assert_eq!(section(&all, BUCKET_FOUR, (1.5, 1.9)).candidates.len(), 1);
}

#[test]
fn sections_keep_top_ten_by_score() {
    let records: Vec<GameRecord> = (0..12)
        .map(|i| candidate(i, &format!("g{i}"), 3.0, 15.0 + i as f64, BUCKET_FOUR))
        .collect();
    let all = viewer::sections(&records, &ViewerFilter::default());

    let scores: Vec<f64> = section(&all, BUCKET_FOUR, (2.5, 3.1))
        .candidates
        .iter()
        .map(|c| c.final_score)
        .collect();
    assert_eq!(scores.len(), 10);
    assert_eq!(scores[0], 26.0);
    assert_eq!(scores[9], 17.0);
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn render_prints_header_rule_and_candidate_lines() {
    let mut azul = candidate(230802, "Azul", 1.8, 16.31, BUCKET_TWO);
    azul.category_cluster = Some("2) abstract strategy - puzzle - x".to_string());
    let all = viewer::sections([&azul], &ViewerFilter::default());
    let text = viewer::render(&all);

    let expected_line = format!(
        "{:<35} (2017) - 1.80, 2 players, 16.3, Cat: 2, Mech: -\n\t\thttps://bgg.test/boardgame/230802/x\n",
        "Azul"
    );
    let expected = format!(
        "Weight: 1.5 to 1.9 - Best for 2 players\n{}\n{}",
        "-".repeat(80),
        expected_line
    );
    assert!(text.contains(&expected), "unexpected report:\n{text}");
    assert!(text.starts_with("Weight: 1 to 1.4 - Best for 2 players\n"));
}

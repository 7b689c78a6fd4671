mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use boardgame_scout_lib::config::{AppSettings, publisher_query};
use boardgame_scout_lib::pipeline;
use boardgame_scout_lib::scrape::api::ThingInfo;
use boardgame_scout_lib::utils::report::{Event, MemoryReporter};

use common::*;

fn listing_url(query: &str) -> String {
    format!("{BASE}/search/boardgame/page/1?sort=rank&advsearch=1{query}")
}

fn thing(categories: &[&str], mechanics: &[&str]) -> ThingInfo {
    ThingInfo {
        description: Some("A game.".to_string()),
        min_age: Some(10),
        min_players: Some(2),
        max_players: Some(4),
        categories: categories.iter().map(|c| c.to_string()).collect(),
        mechanics: mechanics.iter().map(|m| m.to_string()).collect(),
    }
}

fn two_publishers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Alpha Games".to_string(), publisher_query(1)),
        ("Beta Games".to_string(), publisher_query(2)),
    ])
}

#[tokio::test]
async fn run_discovers_enriches_scores_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bgg.db");

    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.serve(
        &listing_url(&publisher_query(1)),
        listing_page(
            &[
                listing_row(Some(1), 11, "Harbour Lights", Some(2015)),
                listing_row(Some(2), 12, "Shared Title", Some(2016)),
            ],
            None,
        ),
    );
    fetcher.serve(
        &listing_url(&publisher_query(2)),
        listing_page(
            &[
                listing_row(Some(2), 12, "Shared Title", Some(2016)),
                listing_row(Some(3), 13, "Iron Roads", Some(2018)),
                listing_row(Some(4), 14, "Paper Kingdoms", Some(2019)),
            ],
            None,
        ),
    );
    for id in 11..=14 {
        fetcher.serve(&format!("{BASE}/boardgame/{id}/slug"), detail_page(PRELOAD));
    }
    let api = FakeApi::default()
        .with(11, thing(&["Nautical", "Economic"], &["Dice Rolling"]))
        .with(12, thing(&["Nautical"], &["Dice Rolling"]))
        .with(13, thing(&["Trains", "Economic"], &["Route Building"]))
        .with(14, thing(&["Trains"], &["Route Building", "Hand Management"]));

    let mut settings = AppSettings::default();
    settings.publishers = two_publishers();
    settings.cluster_count = 2;

    let reporter = Arc::new(MemoryReporter::new());
    let (mut db, store_events) = open_store(&path).await;
    let scraper = client(fetcher.clone(), api, fast_options(), reporter.clone());
    let report = pipeline::run(&mut db, &scraper, &settings, reporter.as_ref())
        .await
        .unwrap();

    // 先按出版商顺序抓目录，再按排名补全详情
    let calls = fetcher.calls();
    assert_eq!(calls[0], listing_url(&publisher_query(1)));
    assert_eq!(calls[1], listing_url(&publisher_query(2)));
    assert_eq!(
        calls[2..].to_vec(),
        (11..=14)
            .map(|id| format!("{BASE}/boardgame/{id}/slug"))
            .collect::<Vec<_>>()
    );
    assert_eq!(
        reporter.count(|e| matches!(e, Event::PublisherStarted { .. })),
        2
    );
    assert_eq!(
        store_events.count(|e| matches!(e, Event::InsertSkipped { gameid: 12 })),
        1
    );

    assert_eq!(db.persisted_rows().await.unwrap(), 4);
    assert!(report.contains("Harbour Lights"));
    assert!(report.contains("Best for 3 players"));
    db.close().await.unwrap();

    let (db, _) = open_store(&path).await;
    assert_eq!(db.len(), 4);
    assert_eq!(db.get(12).unwrap().publisher, "Alpha Games");
    assert_eq!(db.get(13).unwrap().publisher, "Beta Games");
    for record in db.records() {
        assert!(record.updated.is_enriched());
        assert!(record.category_cluster.is_some(), "{} has no category cluster", record.gameid);
        assert!(record.mechanics_cluster.is_some());
        assert!(record.final_score.is_some());
        assert_eq!(record.best_for.as_deref(), Some("3 players"));
    }
    assert_eq!(pipeline::report(&db), report);
}

#[tokio::test]
async fn discover_all_flushes_what_it_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bgg.db");

    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.serve(
        &listing_url(&publisher_query(1)),
        listing_page(&[listing_row(Some(1), 11, "Harbour Lights", Some(2015))], None),
    );
    fetcher.serve(
        &listing_url(&publisher_query(2)),
        listing_page(&[listing_row(Some(3), 13, "Iron Roads", Some(2018))], None),
    );

    let (mut db, _) = open_store(&path).await;
    let scraper = client(
        fetcher,
        FakeApi::default(),
        fast_options(),
        Arc::new(MemoryReporter::new()),
    );
    let stats = scraper
        .discover_all(&mut db, &two_publishers())
        .await
        .unwrap();
    assert_eq!(stats.pages, 2);
    assert_eq!(stats.inserted, 2);
    db.close().await.unwrap();

    let (db, _) = open_store(&path).await;
    let ids: Vec<i64> = db.records().map(|r| r.gameid).collect();
    assert_eq!(ids, vec![11, 13]);
    assert!(db.records().all(|r| !r.updated.is_enriched()));
}

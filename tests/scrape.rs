mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use chrono::Local;

use boardgame_scout_lib::entity::game_record::{RANK_SENTINEL, Updated, YEAR_UNKNOWN};
use boardgame_scout_lib::error::{ErrorKind, ScrapeError};
use boardgame_scout_lib::scrape::api::{MetadataApi, ThingInfo, XmlApi};
use boardgame_scout_lib::scrape::client::Page;
use boardgame_scout_lib::scrape::retry::RetryPolicy;
use boardgame_scout_lib::utils::report::{Event, MemoryReporter};

use common::*;

const QUERY: &str = "&include%5Bpublisherid%5D=267";

fn first_page_url() -> String {
    format!("{BASE}/search/boardgame/page/1?sort=rank&advsearch=1{QUERY}")
}

#[tokio::test]
async fn discover_pages_through_listing_without_overwriting() {
    let dir = tempfile::tempdir().unwrap();
    let (mut db, _) = open_store(&dir.path().join("bgg.db")).await;
    db.put(record(7, "Already known", 1), false);

    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.serve(
        &first_page_url(),
        listing_page(
            &[
                listing_row(Some(5), 13, "Catan", Some(1995)),
                listing_row(None, 999, "Unranked Thing", None),
            ],
            Some("/search/boardgame/page/2?sort=rank&amp;advsearch=1"),
        ),
    );
    fetcher.serve(
        &format!("{BASE}/search/boardgame/page/2?sort=rank&advsearch=1"),
        listing_page(&[listing_row(Some(1), 7, "Renamed", Some(2001))], None),
    );

    let reporter = Arc::new(MemoryReporter::new());
    let scraper = client(fetcher.clone(), FakeApi::default(), fast_options(), reporter.clone());
    let stats = scraper.discover(&mut db, "999 Games", QUERY).await.unwrap();

    assert_eq!(stats.pages, 2);
    assert_eq!(stats.inserted, 2);
    assert_eq!(stats.known, 1);
    assert_eq!(fetcher.calls().len(), 2);
    assert_eq!(
        reporter.count(|e| matches!(e, Event::PageFetched { .. })),
        2
    );

    let catan = db.get(13).unwrap();
    assert_eq!(catan.rank, 5);
    assert_eq!(catan.year, 1995);
    assert_eq!(catan.url, format!("{BASE}/boardgame/13/slug"));
    assert_eq!(catan.publisher, "999 Games");
    assert_eq!(catan.bggrating, Some(7.5));
    assert_eq!(catan.votes, 1234);
    assert_eq!(catan.updated, Updated::never());

    let unranked = db.get(999).unwrap();
    assert_eq!(unranked.rank, RANK_SENTINEL);
    assert_eq!(unranked.year, YEAR_UNKNOWN);

    assert_eq!(db.get(7).unwrap().title, "Already known");
}

#[tokio::test]
async fn discover_stops_on_http_error() {
    let dir = tempfile::tempdir().unwrap();
    let (mut db, _) = open_store(&dir.path().join("bgg.db")).await;
    let fetcher = Arc::new(FakeFetcher::new());
    let scraper = client(
        fetcher,
        FakeApi::default(),
        fast_options(),
        Arc::new(MemoryReporter::new()),
    );

    let err = scraper.discover(&mut db, "Nobody", QUERY).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Status { status: 404, .. }));
    assert_eq!(err.kind(), ErrorKind::Fatal);
}

fn catan_thing() -> ThingInfo {
    ThingInfo {
        description: Some("Trade and build.".to_string()),
        min_age: Some(10),
        min_players: Some(3),
        max_players: Some(4),
        categories: vec!["Negotiation".to_string(), "Economic".to_string()],
        mechanics: vec!["Dice Rolling".to_string()],
    }
}

#[tokio::test]
async fn enrich_merges_detail_page_and_api() {
    let fetcher = Arc::new(FakeFetcher::new());
    let target = record(13, "Catan", 400);
    fetcher.serve(&target.url, detail_page(PRELOAD));

    let scraper = client(
        fetcher,
        FakeApi::default().with(13, catan_thing()),
        fast_options(),
        Arc::new(MemoryReporter::new()),
    );
    let enriched = scraper.enrich(&target).await.unwrap();

    assert!(enriched.updated.is_enriched());
    assert_eq!(enriched.description.as_deref(), Some("Trade and build."));
    assert_eq!(enriched.minage, Some(10));
    assert_eq!(enriched.minplayers, Some(3));
    assert_eq!(enriched.maxplayers, Some(4));
    assert_eq!(enriched.minplaytime, Some(45));
    assert_eq!(enriched.maxplaytime, Some(90));
    assert_eq!(enriched.subdomain.as_deref(), Some("familygames"));
    assert_eq!(enriched.weight, Some(2.2));
    assert_eq!(enriched.weight_votes, Some(350));
    assert_eq!(enriched.suggested_age, Some(10));
    assert_eq!(enriched.nplayers_best_min, Some(3));
    assert_eq!(enriched.nplayers_best_max, Some(4));
    assert_eq!(enriched.nplayers_recom_min, Some(2));
    assert_eq!(enriched.nplayers_recom_max, Some(5));
    assert_eq!(enriched.nplayers_votes, Some(120));
    assert_eq!(enriched.number("numplays_month"), Some(300.0));
    assert!(enriched.flag("cat-negotiation"));
    assert!(enriched.flag("cat-economic"));
    assert!(enriched.flag("mech-dice rolling"));
    // 原记录不变
    assert_eq!(target.updated, Updated::never());
}

#[tokio::test]
async fn malformed_detail_page_is_retried_until_it_parses() {
    let fetcher = Arc::new(FakeFetcher::new());
    let target = record(13, "Catan", 400);
    fetcher.serve(&target.url, Page::ok("<html>loading</html>"));
    fetcher.serve(&target.url, Page::ok("<html>still loading</html>"));
    fetcher.serve(&target.url, detail_page(PRELOAD));

    let reporter = Arc::new(MemoryReporter::new());
    let scraper = client(
        fetcher.clone(),
        FakeApi::default().with(13, catan_thing()),
        fast_options(),
        reporter.clone(),
    );
    let enriched = scraper.enrich_with_retry(&target).await.unwrap();

    assert!(enriched.updated.is_enriched());
    assert_eq!(fetcher.calls_to(&target.url), 3);
    assert_eq!(
        reporter.count(|e| matches!(e, Event::RetryScheduled { .. })),
        2
    );
}

#[tokio::test]
async fn xml_api_maps_queue_and_throttle_statuses_to_rate_limited() {
    let fetcher = Arc::new(FakeFetcher::new());
    let url = format!("{BASE}/xmlapi2/thing?id=13");
    for status in [202, 429, 503] {
        fetcher.serve(
            &url,
            Page {
                status,
                body: String::new(),
            },
        );
    }
    fetcher.serve(
        &url,
        Page::ok(
            r#"<items><item type="boardgame" id="13"><minage value="10" />
            <link type="boardgamecategory" id="1" value="Economic" /></item></items>"#,
        ),
    );

    let api = XmlApi::new(fetcher.clone(), format!("{BASE}/"));
    for expected in [202, 429, 503] {
        let err = api.thing(13).await.unwrap_err();
        assert!(
            matches!(&err, ScrapeError::RateLimited { status, .. } if *status == expected),
            "unexpected error: {err:?}"
        );
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    let info = api.thing(13).await.unwrap();
    assert_eq!(info.min_age, Some(10));
    assert_eq!(info.categories, vec!["Economic"]);
    assert_eq!(fetcher.calls_to(&url), 4);
}

#[tokio::test]
async fn xml_api_other_errors_are_fatal() {
    let fetcher = Arc::new(FakeFetcher::new());
    let api = XmlApi::new(fetcher, BASE);
    let err = api.thing(13).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Status { status: 404, .. }));
    assert_eq!(err.kind(), ErrorKind::Fatal);
}

#[tokio::test]
async fn rate_limited_api_is_retried_until_it_answers() {
    let fetcher = Arc::new(FakeFetcher::new());
    let target = record(13, "Catan", 400);
    fetcher.serve(&target.url, detail_page(PRELOAD));

    let api = Arc::new(FakeApi::default().with(13, catan_thing()).rate_limited(13, 2));
    let reporter = Arc::new(MemoryReporter::new());
    let scraper = client_sharing_api(fetcher.clone(), api.clone(), fast_options(), reporter.clone());
    let enriched = scraper.enrich_with_retry(&target).await.unwrap();

    assert!(enriched.updated.is_enriched());
    assert!(enriched.flag("cat-negotiation"));
    assert_eq!(api.calls_for(13), 3);
    assert_eq!(fetcher.calls_to(&target.url), 3);
    assert_eq!(
        reporter.count(|e| matches!(e, Event::RetryScheduled { .. })),
        2
    );
}

#[tokio::test]
async fn throttled_detail_page_is_retried() {
    let fetcher = Arc::new(FakeFetcher::new());
    let target = record(13, "Catan", 400);
    fetcher.serve(
        &target.url,
        Page {
            status: 503,
            body: String::new(),
        },
    );
    fetcher.serve(&target.url, detail_page(PRELOAD));

    let scraper = client(
        fetcher.clone(),
        FakeApi::default(),
        fast_options(),
        Arc::new(MemoryReporter::new()),
    );
    let err = scraper.enrich(&target).await.unwrap_err();
    assert!(matches!(err, ScrapeError::RateLimited { status: 503, .. }));

    let enriched = scraper.enrich_with_retry(&target).await.unwrap();
    assert_eq!(enriched.weight, Some(2.2));
}

#[tokio::test]
async fn fatal_errors_are_not_retried() {
    let fetcher = Arc::new(FakeFetcher::new());
    let target = record(13, "Catan", 400);
    fetcher.serve(
        &target.url,
        Page {
            status: 500,
            body: String::new(),
        },
    );

    let reporter = Arc::new(MemoryReporter::new());
    let scraper = client(fetcher.clone(), FakeApi::default(), fast_options(), reporter.clone());
    let err = scraper.enrich_with_retry(&target).await.unwrap_err();

    assert!(matches!(err, ScrapeError::Status { status: 500, .. }));
    assert_eq!(fetcher.calls_to(&target.url), 1);
    assert_eq!(
        reporter.count(|e| matches!(e, Event::RetryScheduled { .. })),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn backoff_gives_up_after_ten_minutes() {
    let policy = RetryPolicy::default();
    let reporter = MemoryReporter::new();
    let counter = AtomicU32::new(0);
    let calls = &counter;
    let started = tokio::time::Instant::now();

    let result: Result<(), ScrapeError> = policy
        .run(&reporter, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ScrapeError::MalformedPage {
                url: "u".to_string(),
                reason: "no preload".to_string(),
            })
        })
        .await;

    // 等待 1+2+...+512 秒后第 11 次失败时已超过 600 秒
    match result {
        Err(ScrapeError::RetriesExhausted { attempts, last }) => {
            assert_eq!(attempts, 11);
            assert!(matches!(*last, ScrapeError::MalformedPage { .. }));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(counter.load(Ordering::SeqCst), 11);
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(1023) && waited < Duration::from_secs(1024));
}

#[tokio::test]
async fn update_all_enriches_stale_records_by_rank() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bgg.db");
    let (mut db, _) = open_store(&path).await;

    let never = record(1, "never updated", 20);
    let mut fresh = record(2, "fresh", 1);
    fresh.updated = Updated::now();
    let mut stale = record(3, "stale", 10);
    stale.updated = Updated::At(Local::now().naive_local() - chrono::Duration::days(90));
    let mut garbled = record(4, "garbled", 30);
    garbled.updated = Updated::Raw("yesterday-ish".to_string());

    let fetcher = Arc::new(FakeFetcher::new());
    for r in [&never, &fresh, &stale, &garbled] {
        fetcher.serve(&r.url, detail_page(PRELOAD));
    }
    for r in [never, fresh, stale, garbled] {
        db.put(r, false);
    }

    let mut options = fast_options();
    options.save_every = Duration::ZERO;
    let scraper = client(
        fetcher.clone(),
        FakeApi::default(),
        options,
        Arc::new(MemoryReporter::new()),
    );
    let stats = scraper.update_all(&mut db).await.unwrap();

    assert_eq!(stats.enriched, 3);
    assert_eq!(stats.skipped_fresh, 1);
    assert_eq!(stats.flushes, 4);
    let order: Vec<String> = fetcher.calls();
    assert_eq!(
        order,
        vec![
            format!("{BASE}/boardgame/3/x"),
            format!("{BASE}/boardgame/1/x"),
            format!("{BASE}/boardgame/4/x"),
        ]
    );
    db.close().await.unwrap();

    let (db, _) = open_store(&path).await;
    assert!(db.records().all(|r| r.updated.is_enriched()));
    assert_eq!(db.get(1).unwrap().weight, Some(2.2));
    assert_eq!(db.get(2).unwrap().weight, None);
}

#[tokio::test]
async fn update_all_halts_on_fatal_error() {
    let dir = tempfile::tempdir().unwrap();
    let (mut db, _) = open_store(&dir.path().join("bgg.db")).await;
    let first = record(1, "broken", 1);
    let second = record(2, "fine", 2);

    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.serve(&second.url, detail_page(PRELOAD));
    db.put(first, false);
    db.put(second, false);

    let scraper = client(
        fetcher.clone(),
        FakeApi::default(),
        fast_options(),
        Arc::new(MemoryReporter::new()),
    );
    let err = scraper.update_all(&mut db).await.unwrap_err();

    assert!(matches!(err, ScrapeError::Status { status: 404, .. }));
    assert_eq!(fetcher.calls().len(), 1);
    assert!(!db.get(2).unwrap().updated.is_enriched());
}

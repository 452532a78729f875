use crate::engine::BatchRequest;
use crate::engine::test_helpers::{create_test_engine, wait_for_event};
use crate::error::Error;
use crate::types::{Event, Status};
use std::time::Duration;

#[tokio::test]
async fn crawl_submits_every_new_member() {
    let (engine, resolver, _store, _temp) = create_test_engine().await;
    resolver.set_categories(&["videos", "shorts"]);
    resolver.set_listing(
        "videos",
        &[
            "https://example.com/watch?v=a",
            "https://example.com/watch?v=b",
        ],
    );
    resolver.set_listing("shorts", &["https://example.com/short/c"]);

    let mut events = engine.subscribe();
    let jobs = engine
        .submit_batch(BatchRequest::new("https://example.com/channel/x"))
        .await
        .unwrap();

    assert_eq!(jobs.len(), 3);
    assert_eq!(engine.queue_len().await, 3);
    assert!(jobs.iter().all(|j| j.status == Status::Pending));

    let summary = wait_for_event(&mut events, Duration::from_secs(1), |e| {
        matches!(e, Event::BatchSummary { .. })
    })
    .await;
    match summary {
        Event::BatchSummary {
            collection_url,
            total_found,
            added,
            skipped_duplicate,
            failed_categories,
        } => {
            assert_eq!(collection_url, "https://example.com/channel/x");
            assert_eq!(total_found, 3);
            assert_eq!(added, 3);
            assert_eq!(skipped_duplicate, 0);
            assert!(failed_categories.is_empty());
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn members_carry_their_category_as_placement_hint() {
    let (engine, resolver, _store, _temp) = create_test_engine().await;
    resolver.set_categories(&["shorts"]);
    resolver.set_listing("shorts", &["https://example.com/short/c"]);

    let jobs = engine
        .submit_batch(BatchRequest::new("https://example.com/channel/x"))
        .await
        .unwrap();

    assert_eq!(jobs[0].category.as_deref(), Some("shorts"));
    assert!(
        jobs[0].destination.ends_with("shorts"),
        "category hint should name the sub-directory, got {}",
        jobs[0].destination.display()
    );
}

#[tokio::test]
async fn already_downloaded_members_are_skipped() {
    let (engine, resolver, store, _temp) = create_test_engine().await;
    resolver.set_categories(&["videos"]);
    resolver.set_listing(
        "videos",
        &[
            "https://example.com/watch?v=seen",
            "https://example.com/watch?v=new",
        ],
    );
    store.mark_downloaded("https://example.com/watch?v=seen");

    let mut events = engine.subscribe();
    let jobs = engine
        .submit_batch(BatchRequest::new("https://example.com/channel/x"))
        .await
        .unwrap();

    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].url, "https://example.com/watch?v=new");

    let summary = wait_for_event(&mut events, Duration::from_secs(1), |e| {
        matches!(e, Event::BatchSummary { .. })
    })
    .await;
    match summary {
        Event::BatchSummary {
            total_found,
            added,
            skipped_duplicate,
            ..
        } => {
            assert_eq!(total_found, 2);
            assert_eq!(added, 1);
            assert_eq!(skipped_duplicate, 1);
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn partial_category_failure_still_returns_discovered_jobs() {
    let (engine, resolver, _store, _temp) = create_test_engine().await;
    // Three categories; only "videos" has a listing, the others error out
    resolver.set_categories(&["videos", "shorts", "streams"]);
    resolver.set_listing("videos", &["https://example.com/watch?v=a"]);

    let mut events = engine.subscribe();
    let jobs = engine
        .submit_batch(BatchRequest::new("https://example.com/channel/x"))
        .await
        .expect("one successful category is enough");

    assert_eq!(jobs.len(), 1);

    let summary = wait_for_event(&mut events, Duration::from_secs(1), |e| {
        matches!(e, Event::BatchSummary { .. })
    })
    .await;
    match summary {
        Event::BatchSummary {
            total_found,
            added,
            mut failed_categories,
            ..
        } => {
            assert_eq!(total_found, 1);
            assert_eq!(added, 1);
            failed_categories.sort();
            assert_eq!(failed_categories, vec!["shorts", "streams"]);
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn empty_crawl_fails_with_no_items_found() {
    let (engine, resolver, _store, _temp) = create_test_engine().await;
    resolver.set_categories(&["videos", "shorts"]);
    resolver.set_listing("videos", &[]);
    resolver.set_listing("shorts", &[]);

    let result = engine
        .submit_batch(BatchRequest::new("https://example.com/channel/empty"))
        .await;

    assert!(
        matches!(result, Err(Error::NoItemsFound(url)) if url.contains("empty")),
        "zero members across all categories must be an explicit error"
    );
    assert_eq!(engine.queue_len().await, 0);
}

#[tokio::test]
async fn all_categories_failing_is_no_items_found() {
    let (engine, resolver, _store, _temp) = create_test_engine().await;
    resolver.set_categories(&["videos", "shorts"]);
    // No listings configured: every category errors

    let result = engine
        .submit_batch(BatchRequest::new("https://example.com/channel/x"))
        .await;

    assert!(matches!(result, Err(Error::NoItemsFound(_))));
}

#[tokio::test]
async fn relative_member_urls_are_canonicalized() {
    let (engine, resolver, _store, _temp) = create_test_engine().await;
    resolver.set_categories(&["videos"]);
    resolver.set_listing("videos", &["/watch?v=rel#frag"]);

    let jobs = engine
        .submit_batch(BatchRequest::new("https://example.com/channel/x/videos"))
        .await
        .unwrap();

    assert_eq!(jobs[0].url, "https://example.com/watch?v=rel");
}

#[tokio::test]
async fn crawled_jobs_run_like_any_other_submission() {
    let (engine, resolver, store, _temp) = create_test_engine().await;
    resolver.set_categories(&["videos"]);
    resolver.set_listing(
        "videos",
        &[
            "https://example.com/watch?v=a",
            "https://example.com/watch?v=b",
        ],
    );

    let mut events = engine.subscribe();
    let jobs = engine
        .submit_batch(BatchRequest::new("https://example.com/channel/x"))
        .await
        .unwrap();
    engine.start().await;

    for _ in 0..jobs.len() {
        wait_for_event(&mut events, Duration::from_secs(5), |e| {
            matches!(e, Event::Completed { .. })
        })
        .await;
    }

    assert_eq!(store.history.lock().unwrap().len(), 2);
    engine.shutdown().await.unwrap();
}

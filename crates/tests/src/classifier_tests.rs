//! Integration tests for `WinClassifier` against a mockito explorer.

use crate::mock_infrastructure::{explorer_config, ExplorerMock};
use chrono::{DateTime, TimeDelta, Utc};
use poolwatch_core::{
    retention::RetentionStore,
    types::{OrphanReason, WinSubmission},
    upstream::{ExplorerClient, HttpClient, TipsetSource},
    win::{ClassifierConfig, WinClassifier, WinIntake},
};
use serial_test::serial;
use std::sync::Arc;

struct Pipeline {
    store: Arc<RetentionStore>,
    intake: WinIntake,
    classifier: WinClassifier,
}

fn pipeline(explorer: &ExplorerMock, config: ClassifierConfig) -> Pipeline {
    let store = Arc::new(RetentionStore::new_at(1024, t0()));
    let http_client = Arc::new(HttpClient::new().expect("http client"));
    let tipsets: Arc<dyn TipsetSource> =
        Arc::new(ExplorerClient::new(&explorer_config(&explorer.url()), http_client));

    Pipeline {
        intake: WinIntake::new(store.clone()),
        classifier: WinClassifier::new(store.clone(), tipsets, config),
        store,
    }
}

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-01T00:00:00Z").unwrap().into()
}

fn at(seconds: i64) -> DateTime<Utc> {
    t0() + TimeDelta::seconds(seconds)
}

fn report(cid: &str, height: u64, took: &str, parents: usize) -> WinSubmission {
    WinSubmission {
        miner: "m1".to_string(),
        cid: cid.to_string(),
        height,
        took: took.to_string(),
        parents,
        ..WinSubmission::default()
    }
}

#[tokio::test]
#[serial]
async fn test_confirmed_block_becomes_win() {
    let mut explorer = ExplorerMock::new().await;
    explorer.mock_tipset(100, &[("m1", "bAAA"), ("m2", "bBBB")]);
    let p = pipeline(&explorer, ClassifierConfig::default());

    p.intake.submit_at(report("bAAA", 100, "10s", 2), t0()).unwrap();
    let summary = p.classifier.run_tick_at(at(360)).await;

    assert_eq!(summary.wins, 1);
    let status = p.store.status_at(true, at(360));
    assert_eq!(status.win_count, 1);
    assert_eq!(status.orphan_count, 0);
    assert_eq!(status.wins.unwrap()[0].cid, "bAAA");
}

#[tokio::test]
#[serial]
async fn test_missing_block_with_wrong_parents_is_orphan() {
    let mut explorer = ExplorerMock::new().await;
    explorer.mock_tipset(100, &[("m2", "bBBB")]);
    explorer.mock_tipset(99, &[("m3", "p1"), ("m4", "p2"), ("m5", "p3")]);
    let p = pipeline(&explorer, ClassifierConfig::default());

    p.intake.submit_at(report("bAAA", 100, "10s", 2), t0()).unwrap();
    p.classifier.run_tick_at(at(360)).await;

    let status = p.store.status_at(false, at(360));
    assert_eq!(status.win_count, 0);
    assert_eq!(status.orphan_count, 1);
    assert_eq!(status.orphans[0].reason, Some(OrphanReason::ParentsMismatch));
    assert_eq!(status.orphans[0].detail.as_deref(), Some("2 != 3"));
    assert!(status.last_orphan_age.is_some());
}

#[tokio::test]
#[serial]
async fn test_slow_block_with_matching_parents_is_timeout() {
    let mut explorer = ExplorerMock::new().await;
    explorer.mock_tipset(100, &[("m2", "bBBB")]);
    explorer.mock_tipset(99, &[("m3", "p1"), ("m4", "p2")]);
    let p = pipeline(&explorer, ClassifierConfig::default());

    p.intake.submit_at(report("bAAA", 100, "1m2s", 2), t0()).unwrap();
    p.classifier.run_tick_at(at(360)).await;

    let orphans = p.store.status_at(false, at(360)).orphans;
    assert_eq!(orphans[0].reason, Some(OrphanReason::Timeout));
    assert_eq!(orphans[0].detail.as_deref(), Some("1m2s"));
}

#[tokio::test]
#[serial]
async fn test_shared_height_hits_explorer_once() {
    let mut explorer = ExplorerMock::new().await;
    let mock = explorer.mock_tipset_expect(100, &[("m1", "bAAA"), ("m2", "bBBB")], 1);
    let p = pipeline(&explorer, ClassifierConfig::default());

    p.intake.submit_at(report("bAAA", 100, "10s", 2), t0()).unwrap();
    p.intake.submit_at(report("bBBB", 100, "10s", 2), at(1)).unwrap();
    let summary = p.classifier.run_tick_at(at(360)).await;

    assert_eq!(summary.wins, 2);
    mock.assert_async().await;
}

#[tokio::test]
#[serial]
async fn test_explorer_outage_defers_then_recovers() {
    let mut explorer = ExplorerMock::new().await;
    explorer.mock_tipset_status(100, 503);
    let p = pipeline(&explorer, ClassifierConfig::default());

    p.intake.submit_at(report("bAAA", 100, "10s", 2), t0()).unwrap();
    let summary = p.classifier.run_tick_at(at(360)).await;

    assert_eq!(summary.deferred, 1);
    assert_eq!(p.store.pending_count(), 1);

    explorer.reset();
    explorer.mock_tipset(100, &[("m1", "bAAA")]);
    let summary = p.classifier.run_tick_at(at(420)).await;

    assert_eq!(summary.wins, 1);
    assert_eq!(p.store.pending_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_unindexed_height_dropped_after_attempts() {
    let mut explorer = ExplorerMock::new().await;
    explorer.mock_tipset_without_data(100);
    let config = ClassifierConfig { max_lookup_attempts: 2, ..ClassifierConfig::default() };
    let p = pipeline(&explorer, config);

    p.intake.submit_at(report("bAAA", 100, "10s", 2), t0()).unwrap();

    assert_eq!(p.classifier.run_tick_at(at(360)).await.deferred, 1);
    assert_eq!(p.classifier.run_tick_at(at(420)).await.dropped, 1);

    let status = p.store.status_at(false, at(420));
    assert_eq!(status.dropped_count, 1);
    assert_eq!(status.pending_count, 0);
    assert_eq!(status.orphan_count + status.win_count, 0);
}

//! End-to-end tracking cycles over the in-memory store and price doubles.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dexwatch::adapters::sqlite::SqliteTokenStore;
use dexwatch::application::{AlertDispatcher, TrackingOrchestrator, TrackingSettings};
use dexwatch::domain::{MilestoneKind, MilestoneTable, NewToken};
use dexwatch::ports::mocks::{InMemoryTokenStore, RecordingNotifier, StaticPriceSource};
use dexwatch::ports::{StoreError, TokenStore};
use tempfile::TempDir;

fn settings() -> TrackingSettings {
    TrackingSettings { batch_delay: Duration::ZERO, ..TrackingSettings::default() }
}

fn tracker(store: &InMemoryTokenStore, prices: &StaticPriceSource) -> TrackingOrchestrator {
    TrackingOrchestrator::new(
        Arc::new(store.clone()),
        Arc::new(prices.clone()),
        MilestoneTable::default(),
        settings(),
    )
    .unwrap()
}

fn token(address: &str, baseline: f64) -> NewToken {
    NewToken::new(address, "solana", &address.to_uppercase(), address, baseline)
}

#[tokio::test]
async fn test_tenfold_records_every_label_and_announces_once() {
    let store = InMemoryTokenStore::new().with_token(token("wif", 0.002));
    let prices = StaticPriceSource::new().with_price("wif", 0.025);
    let tracker = tracker(&store, &prices);

    let report = tracker.run_cycle().await.unwrap();
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].milestone_label, "10x");

    let hit: Vec<String> = store.get("wif").unwrap().milestones_hit.into();
    assert_eq!(hit, vec!["+50%", "2x", "5x", "10x"]);
    assert!(store.get("wif").unwrap().last_alerted_at.is_some());

    // Same price next cycle: nothing new
    let report = tracker.run_cycle().await.unwrap();
    assert!(report.events.is_empty());
}

#[tokio::test]
async fn test_milestones_never_shrink_across_cycles() {
    let store = InMemoryTokenStore::new().with_token(token("pepe", 1.0));
    let prices = StaticPriceSource::new();
    let tracker = tracker(&store, &prices);

    let mut previous = store.get("pepe").unwrap().milestones_hit;
    let mut announced = Vec::new();

    for price in [1.2, 1.6, 0.9, 2.5, 1.0, 6.0, 3.0, 11.0, 0.4] {
        prices.set_price("pepe", price);
        let report = tracker.run_cycle().await.unwrap();
        announced.extend(report.events.into_iter().map(|e| e.milestone_label));

        let current = store.get("pepe").unwrap().milestones_hit;
        assert!(previous.is_subset_of(&current));
        previous = current;
    }

    assert_eq!(announced, vec!["+50%", "2x", "5x", "10x", "-50%"]);
}

#[tokio::test]
async fn test_sixty_five_tokens_split_into_three_batches() {
    let mut store = InMemoryTokenStore::new();
    for i in 0..65 {
        store = store.with_token(token(&format!("tok{:02}", i), 1.0));
    }
    let prices = StaticPriceSource::new();

    let report = tracker(&store, &prices).run_cycle().await.unwrap();

    let sizes: Vec<usize> = prices.get_calls().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![30, 30, 5]);
    assert_eq!(report.batches, 3);
    assert_eq!(report.tracked, 65);
}

#[tokio::test]
async fn test_failed_batch_does_not_block_others() {
    let mut store = InMemoryTokenStore::new();
    let mut prices = StaticPriceSource::new().failing_call(0);
    for i in 0..35 {
        let address = format!("tok{:02}", i);
        store = store.with_token(token(&address, 1.0));
        prices = prices.with_price(&address, 2.0);
    }

    let report = tracker(&store, &prices).run_cycle().await.unwrap();

    // First 30 unpriced this cycle, last 5 evaluated
    assert_eq!(report.priced, 5);
    assert_eq!(report.events.len(), 5);
    assert!(store.get("tok00").unwrap().milestones_hit.is_empty());
    assert!(store.get("tok34").unwrap().milestones_hit.contains("2x"));
}

#[tokio::test]
async fn test_unpriced_and_untracked_tokens_are_skipped() {
    let store = InMemoryTokenStore::new()
        .with_token(token("priced", 1.0))
        .with_token(token("missing", 1.0))
        .with_token(token("pending", 0.0));
    let prices = StaticPriceSource::new()
        .with_price("priced", 1.5)
        .with_price("pending", 100.0);

    let report = tracker(&store, &prices).run_cycle().await.unwrap();

    assert_eq!(report.tracked, 2);
    assert_eq!(report.priced, 1);
    assert_eq!(report.events.len(), 1);
    assert!(store.get("missing").unwrap().milestones_hit.is_empty());
    assert!(store.get("pending").unwrap().milestones_hit.is_empty());
    assert!(!prices.get_calls().concat().contains(&"pending".to_string()));
}

#[tokio::test]
async fn test_expired_tokens_removed_before_pricing() {
    let old = token("old", 1.0).with_discovered_at(Utc::now() - chrono::Duration::days(8));
    let fresh = token("fresh", 1.0).with_discovered_at(Utc::now() - chrono::Duration::days(6));
    let store = InMemoryTokenStore::new().with_token(old).with_token(fresh);
    let prices = StaticPriceSource::new().with_price("old", 5.0).with_price("fresh", 1.0);

    let report = tracker(&store, &prices).run_cycle().await.unwrap();

    assert_eq!(report.expired, 1);
    assert!(store.get("old").is_none());
    assert_eq!(prices.get_calls(), vec![vec!["fresh".to_string()]]);
    assert!(report.events.is_empty());
}

#[tokio::test]
async fn test_read_failure_propagates() {
    let store = InMemoryTokenStore::new().with_token(token("a", 1.0));
    store.set_fail_reads(true);
    let prices = StaticPriceSource::new();

    let result = tracker(&store, &prices).run_cycle().await;
    assert!(result.is_err());
    assert!(prices.get_calls().is_empty());
}

#[tokio::test]
async fn test_write_failure_emits_nothing_and_retries_next_cycle() {
    let store = InMemoryTokenStore::new().with_token(token("a", 1.0));
    let prices = StaticPriceSource::new().with_price("a", 2.2);
    let tracker = tracker(&store, &prices);

    store.set_fail_writes(true);
    let report = tracker.run_cycle().await.unwrap();
    assert!(report.events.is_empty());
    assert_eq!(report.persist_failures, 1);

    store.set_fail_writes(false);
    let report = tracker.run_cycle().await.unwrap();
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].milestone_label, "2x");
    assert_eq!(report.events[0].newly_hit, vec!["+50%", "2x"]);
}

#[tokio::test]
async fn test_notifier_failure_keeps_persisted_milestones() {
    let store = InMemoryTokenStore::new().with_token(token("a", 1.0));
    let prices = StaticPriceSource::new().with_price("a", 5.5);
    let recorder = RecordingNotifier::new();

    let mut dispatcher = AlertDispatcher::new();
    dispatcher.add_notifier(Arc::new(RecordingNotifier::failing()));
    dispatcher.add_notifier(Arc::new(recorder.clone()));

    let report = tracker(&store, &prices).run_cycle().await.unwrap();
    let summary = dispatcher.dispatch(&report.events).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.delivered, 1);
    assert_eq!(recorder.get_alerts()[0].event.kind, MilestoneKind::Gain);
    assert!(store.get("a").unwrap().milestones_hit.contains("5x"));
}

#[tokio::test]
async fn test_cycle_against_sqlite_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tokens.db");
    let prices = StaticPriceSource::new().with_price("bonk", 3.0);

    {
        let store = Arc::new(SqliteTokenStore::open(&path).unwrap());
        store.upsert_new(&token("BONK", 1.0)).unwrap();

        let tracker = TrackingOrchestrator::new(store, Arc::new(prices.clone()), MilestoneTable::default(), settings())
            .unwrap();
        let report = tracker.run_cycle().await.unwrap();
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].milestone_label, "2x");
    }

    // History survives a reopen, so the same price fires nothing
    let store = Arc::new(SqliteTokenStore::open(&path).unwrap());
    let hit = store.list_trackable().unwrap()[0].milestones_hit.to_string();
    assert_eq!(hit, "+50%,2x");

    let tracker = TrackingOrchestrator::new(store, Arc::new(prices), MilestoneTable::default(), settings()).unwrap();
    assert!(tracker.run_cycle().await.unwrap().events.is_empty());
}

#[test]
fn test_store_error_display() {
    let err = StoreError::Unavailable("reads disabled".into());
    assert_eq!(err.to_string(), "Store unavailable: reads disabled");
}

#[test]
fn test_shipped_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/dexwatch.toml");
    let config = dexwatch::config::load_config(path).unwrap();

    assert_eq!(config.milestone_table().unwrap(), MilestoneTable::default());
    assert_eq!(config.tracking_settings(), TrackingSettings::default());
}

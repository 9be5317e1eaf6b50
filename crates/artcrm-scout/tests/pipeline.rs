//! End-to-end scout runs against in-memory collaborators.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use artcrm_core::{Category, ModelBackend, LEAD_UNVERIFIED_STATUS};
use artcrm_scout::{
    NotificationBus, Scout, ScoutDeps, ScoutError, ScoutEvent, ScoutOptions, ScoutRequest,
    ShutdownSignal, SourceKind,
};
use common::{new_contact, FakeModel, FakeSource, MemoryStore};

fn options(results_dir: &std::path::Path) -> ScoutOptions {
    ScoutOptions {
        inter_call_delay: Duration::ZERO,
        fallback_min_results: 5,
        results_dir: results_dir.to_path_buf(),
        preferred_language: "de".to_string(),
    }
}

fn request(categories: Vec<Category>) -> ScoutRequest {
    let mut request = ScoutRequest::new("Leipzig", "DE");
    request.categories = categories;
    request.model = ModelBackend::DeepseekChat;
    request
}

fn recording_bus() -> (NotificationBus, Arc<Mutex<Vec<ScoutEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let mut bus = NotificationBus::new();
    bus.subscribe("recorder", move |event| {
        sink.lock().unwrap().push(event.clone());
        Ok(())
    });
    (bus, events)
}

#[tokio::test]
async fn sparse_primary_triggers_secondary() {
    let dir = tempfile::tempdir().unwrap();
    let primary = FakeSource::new(SourceKind::GooglePlaces, 2);
    let secondary = FakeSource::new(SourceKind::Overpass, 3);
    let model = FakeModel::replying("SUBTYPE: indie\nFIT_SCORE: 80");
    let store = MemoryStore::new();
    let bus = NotificationBus::new();

    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        options(dir.path()),
    );
    let result = scout.run(&request(vec![Category::Gallery])).await.unwrap();

    assert_eq!(primary.call_count(), 1);
    assert_eq!(secondary.call_count(), 1);
    assert_eq!(result.stats.total_found, 5);
    assert_eq!(result.stats.total_inserted, 5);
    assert!(result.stats.sources_used.contains(&SourceKind::GooglePlaces));
    assert!(result.stats.sources_used.contains(&SourceKind::Overpass));
    assert_eq!(result.stats.counts_by_category["gallery"], 5);
    // Primary results come first.
    assert_eq!(result.candidates[0].source, SourceKind::GooglePlaces);
    assert_eq!(result.candidates[4].source, SourceKind::Overpass);
}

#[tokio::test]
async fn sufficient_primary_skips_secondary() {
    let dir = tempfile::tempdir().unwrap();
    let primary = FakeSource::new(SourceKind::GooglePlaces, 5);
    let secondary = FakeSource::new(SourceKind::Overpass, 3);
    let model = FakeModel::replying("FIT_SCORE: 60");
    let store = MemoryStore::new();
    let bus = NotificationBus::new();

    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        options(dir.path()),
    );
    let result = scout.run(&request(vec![Category::Cafe])).await.unwrap();

    assert_eq!(secondary.call_count(), 0);
    assert_eq!(result.stats.total_found, 5);
    assert_eq!(result.stats.sources_used.len(), 1);
}

#[tokio::test]
async fn disabled_primary_always_uses_secondary() {
    let dir = tempfile::tempdir().unwrap();
    let primary = FakeSource::new(SourceKind::GooglePlaces, 9);
    let secondary = FakeSource::new(SourceKind::Overpass, 1);
    let model = FakeModel::replying("");
    let store = MemoryStore::new();
    let bus = NotificationBus::new();

    let mut opts = options(dir.path());
    opts.fallback_min_results = 0;
    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        opts,
    );
    let mut req = request(vec![Category::Gallery, Category::Cafe]);
    req.use_primary = false;
    let result = scout.run(&req).await.unwrap();

    assert_eq!(primary.call_count(), 0);
    assert_eq!(secondary.call_count(), 2);
    assert_eq!(result.stats.total_found, 2);
}

#[tokio::test]
async fn no_enabled_source_is_rejected_before_work() {
    let dir = tempfile::tempdir().unwrap();
    let primary = FakeSource::new(SourceKind::GooglePlaces, 1);
    let secondary = FakeSource::new(SourceKind::Overpass, 1);
    let model = FakeModel::replying("");
    let store = MemoryStore::new();
    let (bus, events) = recording_bus();

    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        options(dir.path()),
    );
    let mut req = request(Vec::new());
    req.use_primary = false;
    req.use_secondary = false;

    let err = scout.run(&req).await.unwrap_err();
    assert!(matches!(err, ScoutError::NoSourcesEnabled));
    assert_eq!(primary.call_count() + secondary.call_count(), 0);
    assert!(events.lock().unwrap().is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn rerun_inserts_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let primary = FakeSource::new(SourceKind::GooglePlaces, 6);
    let secondary = FakeSource::new(SourceKind::Overpass, 0);
    let model = FakeModel::replying("SUBTYPE: boutique\nFIT_SCORE: 75");
    let store = MemoryStore::new();
    let bus = NotificationBus::new();

    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        options(dir.path()),
    );
    let req = request(vec![Category::Gallery]);

    let first = scout.run(&req).await.unwrap();
    assert_eq!(first.stats.total_inserted, 6);
    let after_first = store.contacts();

    let second = scout.run(&req).await.unwrap();
    assert_eq!(second.stats.total_inserted, 0);
    assert_eq!(second.stats.total_skipped, 6);
    assert!(second.inserted_ids.is_empty());
    assert_eq!(store.contacts(), after_first);
}

#[tokio::test]
async fn merge_rerun_fills_gaps_only_once() {
    let dir = tempfile::tempdir().unwrap();
    let primary = FakeSource::new(SourceKind::GooglePlaces, 5);
    let secondary = FakeSource::new(SourceKind::Overpass, 0);
    let model = FakeModel::failing();
    let store = MemoryStore::new();
    let existing = store.seed(new_contact("google_maps gallery 1", "Leipzig"));
    let bus = NotificationBus::new();

    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        options(dir.path()),
    );
    let mut req = request(vec![Category::Gallery]);
    req.skip_duplicates = false;

    let first = scout.run(&req).await.unwrap();
    assert_eq!(first.merged_ids, vec![existing]);
    assert_eq!(first.stats.total_inserted, 4);
    assert_eq!(
        store.get(existing).unwrap().website.as_deref(),
        Some("https://venue-0.example")
    );

    let second = scout.run(&req).await.unwrap();
    assert_eq!(second.stats.total_inserted, 0);
    assert_eq!(second.stats.total_merged, 0);
    assert!(second.merged_ids.is_empty());
}

#[tokio::test]
async fn created_contacts_are_lead_unverified_with_fit_score() {
    let dir = tempfile::tempdir().unwrap();
    let primary = FakeSource::new(SourceKind::GooglePlaces, 5);
    let secondary = FakeSource::new(SourceKind::Overpass, 0);
    let model = FakeModel::replying("SUBTYPE: Contemporary\nFIT_SCORE: 150");
    let store = MemoryStore::new();
    let bus = NotificationBus::new();

    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        options(dir.path()),
    );
    let result = scout.run(&request(vec![Category::Gallery])).await.unwrap();

    assert_eq!(model.call_count(), 5);
    let contact = store.get(result.inserted_ids[0]).unwrap();
    assert_eq!(contact.status, LEAD_UNVERIFIED_STATUS);
    assert_eq!(contact.fit_score, Some(100));
    assert_eq!(contact.subtype.as_deref(), Some("contemporary"));
    assert_eq!(contact.category.as_deref(), Some("gallery"));
    assert!(contact
        .notes
        .as_deref()
        .unwrap()
        .starts_with("Auto-discovered via google_maps on "));
}

#[tokio::test]
async fn events_bracket_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let primary = FakeSource::new(SourceKind::GooglePlaces, 5);
    let secondary = FakeSource::new(SourceKind::Overpass, 0);
    let model = FakeModel::replying("FIT_SCORE: 40");
    let store = MemoryStore::new();
    let (mut bus, events) = recording_bus();
    bus.subscribe("broken", |_| Err("mailer offline".into()));

    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        options(dir.path()),
    );
    let result = scout.run(&request(vec![Category::Cafe])).await.unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 7);
    assert!(matches!(events[0], ScoutEvent::Started { .. }));
    assert!(matches!(events[1], ScoutEvent::ContactCreated { .. }));
    let ScoutEvent::Completed(done) = &events[6] else {
        panic!("last event should be Completed, got {:?}", events[6]);
    };
    assert_eq!(done.total_found, 5);
    assert_eq!(done.total_inserted, 5);
    assert_eq!(done.results_file, result.results_file);
}

#[tokio::test]
async fn artifact_is_written_on_zero_results() {
    let dir = tempfile::tempdir().unwrap();
    let results_dir = dir.path().join("scout_results");
    let primary = FakeSource::new(SourceKind::GooglePlaces, 0);
    let secondary = FakeSource::new(SourceKind::Overpass, 0);
    let model = FakeModel::replying("");
    let store = MemoryStore::new();
    let bus = NotificationBus::new();

    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        options(&results_dir),
    );
    let result = scout.run(&request(Vec::new())).await.unwrap();

    assert_eq!(result.stats.categories_searched, Category::defaults());
    assert!(result.stats.sources_used.is_empty());
    let path = result.results_file.unwrap();
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("scout_Leipzig_DE_"));
    let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(json["stats"]["total_found"], 0);
    assert_eq!(json["candidates"], serde_json::json!([]));
    assert_eq!(json["inserted_ids"], serde_json::json!([]));
}

#[tokio::test]
async fn interrupted_run_is_finalized() {
    let dir = tempfile::tempdir().unwrap();
    let primary = FakeSource::new(SourceKind::GooglePlaces, 5);
    let secondary = FakeSource::new(SourceKind::Overpass, 0);
    let model = FakeModel::replying("FIT_SCORE: 70");
    let store = MemoryStore::new();
    let shutdown = ShutdownSignal::new();
    let (mut bus, events) = recording_bus();
    let trigger = shutdown.clone();
    bus.subscribe("stop-after-first", move |event| {
        if matches!(event, ScoutEvent::ContactCreated { .. }) {
            trigger.trigger();
        }
        Ok(())
    });

    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        options(dir.path()),
    )
    .with_shutdown(shutdown);
    let result = scout
        .run(&request(vec![Category::Gallery, Category::Cafe]))
        .await
        .unwrap();

    assert!(result.stats.interrupted);
    assert_eq!(result.stats.total_inserted, 1);
    assert_eq!(store.contacts().len(), 1);
    assert_eq!(result.candidates.len(), 10);
    assert!(result.results_file.is_some());
    assert!(matches!(
        events.lock().unwrap().last(),
        Some(ScoutEvent::Completed(_))
    ));
}

#[tokio::test]
async fn shutdown_before_start_searches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let primary = FakeSource::new(SourceKind::GooglePlaces, 5);
    let secondary = FakeSource::new(SourceKind::Overpass, 5);
    let model = FakeModel::replying("");
    let store = MemoryStore::new();
    let bus = NotificationBus::new();
    let shutdown = ShutdownSignal::new();
    shutdown.trigger();

    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        options(dir.path()),
    )
    .with_shutdown(shutdown);
    let result = scout.run(&request(Vec::new())).await.unwrap();

    assert!(result.stats.interrupted);
    assert_eq!(primary.call_count() + secondary.call_count(), 0);
    assert_eq!(model.call_count(), 0);
    assert!(result.results_file.is_some());
}

#[tokio::test]
async fn store_failure_still_writes_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let primary = FakeSource::new(SourceKind::GooglePlaces, 5);
    let secondary = FakeSource::new(SourceKind::Overpass, 0);
    let model = FakeModel::replying("FIT_SCORE: 70");
    let store = MemoryStore::new();
    store.fail_after_creates(2);
    let (bus, events) = recording_bus();

    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        options(dir.path()),
    );
    let err = scout.run(&request(vec![Category::Gallery])).await.unwrap_err();

    assert!(matches!(err, ScoutError::Store(_)));
    assert_eq!(store.contacts().len(), 2);
    let artifacts: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(artifacts.len(), 1);
    let path = artifacts[0].as_ref().unwrap().path();
    let json: serde_json::Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(json["inserted_ids"], serde_json::json!([1, 2]));
    assert!(matches!(
        events.lock().unwrap().last(),
        Some(ScoutEvent::Completed(_))
    ));
}

#[tokio::test]
async fn unwritable_results_dir_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("results");
    std::fs::write(&blocker, b"file in the way").unwrap();
    let primary = FakeSource::new(SourceKind::GooglePlaces, 1);
    let secondary = FakeSource::new(SourceKind::Overpass, 0);
    let model = FakeModel::replying("");
    let store = MemoryStore::new();
    let bus = NotificationBus::new();

    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        options(&blocker),
    );
    let err = scout.run(&request(vec![Category::Cafe])).await.unwrap_err();

    assert!(matches!(err, ScoutError::Artifact(_)));
    assert_eq!(store.contacts().len(), 1);
}

#[tokio::test]
async fn blank_city_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let primary = FakeSource::new(SourceKind::GooglePlaces, 1);
    let secondary = FakeSource::new(SourceKind::Overpass, 0);
    let model = FakeModel::replying("");
    let store = MemoryStore::new();
    let bus = NotificationBus::new();

    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        options(dir.path()),
    );
    let mut req = request(Vec::new());
    req.city = "  ".to_string();

    assert!(matches!(
        scout.run(&req).await.unwrap_err(),
        ScoutError::InvalidRequest(_)
    ));
}

#[tokio::test]
async fn back_to_back_runs_keep_both_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let primary = FakeSource::new(SourceKind::GooglePlaces, 0);
    let secondary = FakeSource::new(SourceKind::Overpass, 0);
    let model = FakeModel::failing();
    let store = MemoryStore::new();
    let bus = NotificationBus::new();

    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        options(dir.path()),
    );
    let req = request(vec![Category::Gallery]);
    let first = scout.run(&req).await.unwrap().results_file.unwrap();
    let second = scout.run(&req).await.unwrap().results_file.unwrap();

    assert_ne!(first, second);
    assert!(first.exists());
    assert!(second.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[tokio::test(start_paused = true)]
async fn enrichment_calls_are_spaced_by_inter_call_delay() {
    let dir = tempfile::tempdir().unwrap();
    let primary = FakeSource::new(SourceKind::GooglePlaces, 3);
    let secondary = FakeSource::new(SourceKind::Overpass, 0);
    let model = FakeModel::replying("FIT_SCORE: 70");
    let store = MemoryStore::new();
    let bus = NotificationBus::new();

    let mut opts = options(dir.path());
    opts.inter_call_delay = Duration::from_secs(2);
    opts.fallback_min_results = 0;
    let scout = Scout::new(
        ScoutDeps {
            primary: &primary,
            secondary: &secondary,
            model: &model,
            store: &store,
            bus: &bus,
        },
        opts,
    );

    let start = tokio::time::Instant::now();
    let result = scout.run(&request(vec![Category::Gallery])).await.unwrap();

    assert_eq!(model.call_count(), 3);
    assert_eq!(result.stats.total_inserted, 3);
    assert!(start.elapsed() >= Duration::from_secs(4));
    assert!(start.elapsed() < Duration::from_secs(6));
}

use chrono::{TimeZone, Utc};
use preload_database::*;
use preload_domain::{BackendKind, DatabaseConfig, EmulatorConfig, StoreConfig};
use std::collections::BTreeSet;
use std::time::Duration;

fn states(names: &[&str], status: PreloadStatus) -> Vec<DomainState> {
    names.iter().map(|name| DomainState::new(*name, status)).collect()
}

fn numbered(count: usize) -> Vec<DomainState> {
    (0..count).map(|i| DomainState::new(format!("site-{i:05}.example"), PreloadStatus::Pending)).collect()
}

fn starting_sizes(events: &[BatchProgress]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|event| match event {
            BatchProgress::Starting { size, .. } => Some(*size),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn unwritten_name_is_unknown() {
    let store = DomainStore::in_memory().await.expect("in-memory store");

    let state = store.state_for_name("never-written.test").await.expect("lookup");
    assert_eq!(state.name, "never-written.test");
    assert_eq!(state.status, PreloadStatus::Unknown);
    assert!(state.message.is_none());
}

#[tokio::test]
async fn fresh_store_reads_are_empty_not_errors() {
    let store = DomainStore::in_memory().await.expect("in-memory store");

    assert!(store.state_for_name("a.com").await.expect("lookup").is_unknown());
    assert!(store.all_states().await.expect("scan").is_empty());
    assert!(store.names_with_status(PreloadStatus::Rejected).await.expect("scan").is_empty());
    assert!(store.autocomplete("go").await.expect("autocomplete").is_empty());
    assert!(store.autocomplete("").await.expect("empty prefix").is_empty());
}

#[tokio::test]
async fn written_state_reads_back() {
    let store = DomainStore::in_memory().await.expect("in-memory store");
    let submitted = Utc.with_ymd_and_hms(2016, 3, 14, 15, 9, 26).single().expect("timestamp");
    let state = DomainState::new("garron.net", PreloadStatus::Rejected)
        .with_message("max-age too short")
        .with_submitted_at(submitted);

    store.put_state(&state).await.expect("write");

    assert_eq!(store.state_for_name("garron.net").await.expect("lookup"), state);
}

#[tokio::test]
async fn rewriting_overwrites_and_repeats_are_idempotent() {
    let store = DomainStore::in_memory().await.expect("in-memory store");

    store.put_state(&DomainState::new("a.com", PreloadStatus::Pending)).await.expect("first");
    let preloaded = DomainState::new("a.com", PreloadStatus::Preloaded);
    store.put_state(&preloaded).await.expect("second");
    store.put_state(&preloaded).await.expect("repeat");

    assert_eq!(store.state_for_name("a.com").await.expect("lookup"), preloaded);
    assert_eq!(store.all_states().await.expect("scan").len(), 1);
}

#[tokio::test]
async fn batches_are_split_into_bounded_chunks() {
    let store = DomainStore::in_memory().await.expect("in-memory store");

    let mut events = Vec::new();
    store
        .put_states(&numbered(900), &mut |event: &BatchProgress| events.push(*event))
        .await
        .expect("900 updates");
    assert_eq!(starting_sizes(&events), vec![BATCH_SIZE, BATCH_SIZE]);
    assert_eq!(events.last(), Some(&BatchProgress::Done { chunk: 1, size: BATCH_SIZE }));

    let mut events = Vec::new();
    store
        .put_states(&numbered(901), &mut |event: &BatchProgress| events.push(*event))
        .await
        .expect("901 updates");
    assert_eq!(starting_sizes(&events), vec![BATCH_SIZE, BATCH_SIZE, 1]);

    assert_eq!(store.all_states().await.expect("scan").len(), 901);
}

#[tokio::test]
async fn empty_batch_reports_no_updates() {
    let store = DomainStore::in_memory().await.expect("in-memory store");

    let mut events = Vec::new();
    store.put_states(&[], &mut |event: &BatchProgress| events.push(*event)).await.expect("empty");

    assert_eq!(events, vec![BatchProgress::NoUpdates]);
    assert!(store.all_states().await.expect("scan").is_empty());
}

#[tokio::test]
async fn autocomplete_returns_prefix_matches_in_order() {
    let store = DomainStore::in_memory().await.expect("in-memory store");
    let mut updates = states(&["google.com", "goop.net", "gopher.io"], PreloadStatus::Pending);
    updates.push(DomainState::new("amazon.com", PreloadStatus::Preloaded));
    store.put_states(&updates, &mut Discard).await.expect("write");

    let names: Vec<String> =
        store.autocomplete("go").await.expect("autocomplete").into_iter().map(|s| s.name).collect();
    assert_eq!(names, ["google.com", "goop.net", "gopher.io"]);

    assert!(store.autocomplete("zz").await.expect("no match").is_empty());
}

#[tokio::test]
async fn autocomplete_is_capped_and_excludes_the_exact_prefix() {
    let store = DomainStore::in_memory().await.expect("in-memory store");
    let names = ["ex", "ex0.com", "ex1.com", "ex2.com", "ex3.com", "ex4.com", "ex5.com", "ey.com"];
    store.put_states(&states(&names, PreloadStatus::Pending), &mut Discard).await.expect("write");

    let found: Vec<String> =
        store.autocomplete("ex").await.expect("autocomplete").into_iter().map(|s| s.name).collect();
    assert_eq!(found, ["ex0.com", "ex1.com", "ex2.com", "ex3.com", "ex4.com"]);
    assert_eq!(found.len(), AUTOCOMPLETE_LIMIT);
}

#[tokio::test]
async fn empty_prefix_autocompletes_from_the_first_name() {
    let store = DomainStore::in_memory().await.expect("in-memory store");
    let names = ["f.com", "a.com", "e.com", "b.com", "d.com", "c.com"];
    store.put_states(&states(&names, PreloadStatus::Pending), &mut Discard).await.expect("write");

    let found: Vec<String> =
        store.autocomplete("").await.expect("autocomplete").into_iter().map(|s| s.name).collect();
    assert_eq!(found, ["a.com", "b.com", "c.com", "d.com", "e.com"]);
}

#[tokio::test]
async fn names_with_status_filters_by_last_written_status() {
    let store = DomainStore::in_memory().await.expect("in-memory store");
    let mut updates = states(&["a.com", "c.com"], PreloadStatus::Rejected);
    updates.extend(states(&["b.com"], PreloadStatus::Preloaded));
    store.put_states(&updates, &mut TracingSink).await.expect("write");

    let rejected: BTreeSet<String> =
        store.names_with_status(PreloadStatus::Rejected).await.expect("scan").into_iter().collect();
    assert_eq!(rejected, BTreeSet::from(["a.com".to_owned(), "c.com".to_owned()]));

    store.put_state(&DomainState::new("c.com", PreloadStatus::Pending)).await.expect("rewrite");
    let rejected = store.names_with_status(PreloadStatus::Rejected).await.expect("scan");
    assert_eq!(rejected, ["a.com"]);

    assert!(store.names_with_status(PreloadStatus::Removed).await.expect("scan").is_empty());
}

#[tokio::test]
async fn all_states_returns_every_record() {
    let store = DomainStore::in_memory().await.expect("in-memory store");
    let updates = vec![
        DomainState::new("a.com", PreloadStatus::Preloaded),
        DomainState::new("b.com", PreloadStatus::PendingRemoval).with_message("requested"),
    ];
    store.put_states(&updates, &mut Discard).await.expect("write");

    let mut all = store.all_states().await.expect("scan");
    all.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(all, updates);
}

#[tokio::test]
async fn clones_share_the_same_data() {
    let store = DomainStore::in_memory().await.expect("in-memory store");
    let other = store.clone();

    store.put_state(&DomainState::new("shared.org", PreloadStatus::Removed)).await.expect("write");

    let state = other.state_for_name("shared.org").await.expect("lookup");
    assert_eq!(state.status, PreloadStatus::Removed);
}

#[tokio::test]
async fn uninitialized_local_backend_fails_every_operation() {
    let store = DomainStore::new(Backend::local("", "hstspreload-local"));

    let err = store.state_for_name("a.com").await.unwrap_err();
    assert!(err.is_connection(), "{err}");
    assert_eq!(err.context_ref(), Some("Uninitialized local backend?"));

    assert!(store.all_states().await.unwrap_err().is_connection());
    assert!(store.names_with_status(PreloadStatus::Pending).await.unwrap_err().is_connection());
    assert!(store.autocomplete("a").await.unwrap_err().is_connection());

    let mut events = Vec::new();
    let err = store
        .put_states(&numbered(3), &mut |event: &BatchProgress| events.push(*event))
        .await
        .unwrap_err();
    assert!(err.is_connection());
    assert!(events.is_empty());
}

#[tokio::test]
async fn unreachable_production_store_is_a_connection_error() {
    let config = DatabaseConfig { url: "ws://127.0.0.1:1".to_owned(), ..DatabaseConfig::default() };
    let store = DomainStore::production(&config);
    assert_eq!(store.backend().label(), "production");

    let err = store.state_for_name("a.com").await.unwrap_err();
    assert!(err.is_connection(), "{err}");
}

#[tokio::test]
async fn silent_server_times_out_as_a_connection_error() {
    // Accepts TCP connections through the backlog but never answers the handshake.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("ws://{}", listener.local_addr().expect("addr"));
    let config = DatabaseConfig { url: url.clone(), ..DatabaseConfig::default() };
    let store = DomainStore::with_timeout(Backend::production(&config), Duration::from_millis(300));

    let err = store.state_for_name("a.com").await.unwrap_err();
    assert!(err.is_connection(), "{err}");
    assert!(err.to_string().contains("deadline of"), "{err}");
    assert_eq!(err.context_ref(), Some(format!("Connecting to {url}").as_str()));
    drop(listener);
}

#[tokio::test]
async fn zero_timeout_is_rejected_by_from_config() {
    let config = StoreConfig { timeout_secs: 0, ..Default::default() };
    let err = DomainStore::from_config(&config).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));

    let production = StoreConfig { backend: BackendKind::Production, ..config };
    let err = DomainStore::production_from_config(&production).unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }), "{err}");
}

#[tokio::test]
async fn memory_config_builds_a_working_store() {
    let config = StoreConfig { timeout_secs: 3, ..Default::default() };
    let (store, emulator) = DomainStore::from_config(&config).await.expect("store");

    assert!(emulator.is_none());
    assert_eq!(store.timeout(), Duration::from_secs(3));
    assert_eq!(store.backend().label(), "memory");
    store.put_state(&DomainState::new("a.com", PreloadStatus::Pending)).await.expect("write");
}

#[tokio::test]
#[ignore = "needs the `surreal` binary on PATH"]
async fn local_server_round_trip() {
    let (store, emulator) =
        DomainStore::temp_local_with(&EmulatorConfig::default()).await.expect("local server");
    assert!(emulator.addr().starts_with("127.0.0.1:"));

    store.put_state(&DomainState::new("local.test", PreloadStatus::Preloaded)).await.expect("write");
    let state = store.state_for_name("local.test").await.expect("lookup");
    assert_eq!(state.status, PreloadStatus::Preloaded);

    emulator.shutdown().await.expect("shutdown");
}

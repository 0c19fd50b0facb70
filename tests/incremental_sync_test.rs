//! Incremental update scenarios: no-op saves, modifications, deletions,
//! and transient backend failures.

mod common;

use common::{FailMode, engine_for, write_file};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use symsync::updater::SyncOutcome;

async fn indexed_engine(dir: &TempDir) -> common::TestEngine {
    let engine = engine_for(dir.path());
    engine
        .indexer
        .initialize(&CancellationToken::new())
        .await
        .unwrap();
    engine
}

#[tokio::test]
async fn whitespace_only_save_makes_no_network_call() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "app.py", "def run():\n    return 1\n");
    let engine = indexed_engine(&dir).await;

    // Same symbols, shifted down by comments and blank lines
    write_file(
        dir.path(),
        "app.py",
        "# header comment\n\n\n\ndef run():\n    return 1\n",
    );

    let outcome = engine
        .updater
        .sync_file("app.py", &dir.path().join("app.py"))
        .await
        .unwrap();

    assert_eq!(outcome, SyncOutcome::NoChanges);
    assert_eq!(engine.backend.calls().incremental, 0);
    assert_eq!(engine.cache.read().await.version(), 1);
}

#[tokio::test]
async fn modified_function_syncs_and_advances_version() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "app.py", "def run():\n    return 1\n");
    let engine = indexed_engine(&dir).await;

    write_file(
        dir.path(),
        "app.py",
        "def run(verbose):\n    return 1\n\ndef stop():\n    pass\n",
    );

    let outcome = engine
        .updater
        .sync_file("app.py", &dir.path().join("app.py"))
        .await
        .unwrap();

    assert_eq!(outcome, SyncOutcome::Synced { version: 2 });
    assert_eq!(engine.backend.version(), Some(2));

    let cache = engine.cache.read().await;
    assert_eq!(cache.version(), 2);
    let symbols = cache.symbols("app.py").unwrap();
    assert_eq!(symbols.len(), 2);
    assert_eq!(symbols[0].signature, "def run(verbose)");

    // Backend and cache agree on the file's contents
    assert_eq!(engine.backend.stored_files()["app.py"], symbols.to_vec());
}

#[tokio::test]
async fn deleting_file_removes_it_everywhere() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "util.py",
        "def a():\n    pass\n\ndef b():\n    pass\n\ndef c():\n    pass\n",
    );
    let engine = indexed_engine(&dir).await;
    assert_eq!(
        engine.cache.read().await.symbols("util.py").unwrap().len(),
        3
    );

    std::fs::remove_file(dir.path().join("util.py")).unwrap();
    let outcome = engine.updater.sync_deletion("util.py").await.unwrap();

    assert_eq!(outcome, SyncOutcome::Synced { version: 2 });
    assert!(!engine.backend.stored_files().contains_key("util.py"));

    let cache = engine.cache.read().await;
    assert!(cache.symbols("util.py").is_none());
    assert_eq!(cache.project().unwrap().statistics.total_files, 0);
    assert_eq!(cache.project().unwrap().statistics.total_symbols, 0);
}

#[tokio::test]
async fn deleting_unknown_file_is_a_noop() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "app.py", "def run():\n    pass\n");
    let engine = indexed_engine(&dir).await;

    let outcome = engine.updater.sync_deletion("ghost.py").await.unwrap();
    assert_eq!(outcome, SyncOutcome::NoChanges);
    assert_eq!(engine.backend.calls().incremental, 0);
}

#[tokio::test]
async fn connection_failure_defers_without_corrupting_state() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "app.py", "def run():\n    pass\n");
    let engine = indexed_engine(&dir).await;

    write_file(dir.path(), "app.py", "def run(x):\n    pass\n");
    engine.backend.set_fail_mode(FailMode::ConnectionOnce);

    let outcome = engine
        .updater
        .sync_file("app.py", &dir.path().join("app.py"))
        .await
        .unwrap();
    assert_eq!(outcome, SyncOutcome::Deferred);

    // Nothing was applied anywhere: the old state is intact
    let cache = engine.cache.read().await;
    assert_eq!(cache.version(), 1);
    assert_eq!(cache.symbols("app.py").unwrap()[0].signature, "def run()");
    drop(cache);

    // The next save simply retries and succeeds
    let outcome = engine
        .updater
        .sync_file("app.py", &dir.path().join("app.py"))
        .await
        .unwrap();
    assert_eq!(outcome, SyncOutcome::Synced { version: 2 });
}

#[tokio::test]
async fn missing_project_suggests_initialize() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "app.py", "def run():\n    pass\n");
    let engine = indexed_engine(&dir).await;

    engine.backend.drop_project();
    write_file(dir.path(), "app.py", "def run(x):\n    pass\n");

    let outcome = engine
        .updater
        .sync_file("app.py", &dir.path().join("app.py"))
        .await
        .unwrap();
    assert_eq!(outcome, SyncOutcome::ProjectMissing);
}

#[tokio::test]
async fn blocked_gate_short_circuits_before_any_network_call() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "app.py", "def run():\n    pass\n");
    let engine = indexed_engine(&dir).await;

    engine.gate.block();
    write_file(dir.path(), "app.py", "def run(x):\n    pass\n");

    let outcome = engine
        .updater
        .sync_file("app.py", &dir.path().join("app.py"))
        .await
        .unwrap();
    assert_eq!(outcome, SyncOutcome::Blocked);
    assert_eq!(engine.backend.calls().incremental, 0);

    let outcome = engine.updater.sync_deletion("app.py").await.unwrap();
    assert_eq!(outcome, SyncOutcome::Blocked);
    assert_eq!(engine.backend.calls().incremental, 0);
}

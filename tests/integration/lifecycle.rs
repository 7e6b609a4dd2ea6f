//! Directory lifecycle across store, inspect, load, purge and re-store.

use std::sync::Arc;

use tessera_engine::{DirLock, EngineError, PurgeReport};
use tessera_integration_tests::{Scratch, chunk_files, engine, only_lock_file_left, test_data};

#[tokio::test]
async fn test_store_inspect_load_purge_cycle() {
    let scratch = Scratch::new();
    let data = test_data(30_000);
    let input = scratch.input("in", &data);
    let output = scratch.output("out");
    let engine = engine(8192, false);

    let stored = engine.store(&input, &output).await.unwrap();
    let inspected = engine.inspect(&output).await.unwrap();
    assert_eq!(inspected, stored);
    assert_eq!(inspected.total_size, 30_000);
    assert_eq!(inspected.chunk_size, 8192);
    assert_eq!(inspected.len(), 4);

    assert_eq!(engine.load(&output).await.unwrap(), data);
    assert_eq!(chunk_files(&output).len(), 4);

    let report = engine.purge(&output).await.unwrap();
    assert_eq!(
        report,
        PurgeReport {
            removed: 4,
            missing: 0,
            failed: 0
        }
    );
    assert!(only_lock_file_left(&output));

    let err = engine.load(&output).await.unwrap_err();
    assert!(matches!(err, EngineError::IndexMissing { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_consuming_load_then_store_again() {
    let scratch = Scratch::new();
    let first = test_data(10_000);
    let second = test_data(2_500);
    let output = scratch.output("out");
    let engine = engine(1000, true);

    engine
        .store(scratch.input("first", &first), &output)
        .await
        .unwrap();
    assert_eq!(engine.load(&output).await.unwrap(), first);
    assert!(only_lock_file_left(&output));

    engine
        .store(scratch.input("second", &second), &output)
        .await
        .unwrap();
    assert_eq!(engine.load(&output).await.unwrap(), second);
    assert!(only_lock_file_left(&output));
}

#[tokio::test]
async fn test_restore_overwrites_superseded_chunks() {
    let scratch = Scratch::new();
    let output = scratch.output("out");
    let engine = engine(1000, false);

    let mut last = Vec::new();
    for round in 0..4usize {
        last = test_data(1000 * (round + 2));
        let manifest = engine
            .store(scratch.input(&format!("v{round}"), &last), &output)
            .await
            .unwrap();
        assert_eq!(chunk_files(&output).len(), manifest.len(), "round {round}");
    }

    assert_eq!(engine.load(&output).await.unwrap(), last);
}

#[tokio::test]
async fn test_manifest_from_store_drives_load() {
    let scratch = Scratch::new();
    let data = test_data(12_345);
    let output = scratch.output("out");
    let engine = engine(4096, true);

    let manifest = engine
        .store(scratch.input("in", &data), &output)
        .await
        .unwrap();
    std::fs::remove_file(output.join("manifest.bin")).unwrap();

    assert!(matches!(
        engine.load(&output).await,
        Err(EngineError::ManifestMissing { .. })
    ));
    let got = engine.load_with_manifest(&output, &manifest).await.unwrap();
    assert_eq!(got, data);
    assert!(only_lock_file_left(&output));
}

#[cfg(unix)]
#[tokio::test]
async fn test_lock_held_elsewhere_blocks_every_operation() {
    let scratch = Scratch::new();
    let data = test_data(5000);
    let input = scratch.input("in", &data);
    let output = scratch.output("out");
    let engine = engine(1024, true);
    engine.store(&input, &output).await.unwrap();

    let held = DirLock::acquire(&output).unwrap();
    for result in [
        engine.store(&input, &output).await.map(|_| ()),
        engine.load(&output).await.map(|_| ()),
        engine.purge(&output).await.map(|_| ()),
    ] {
        assert!(matches!(result, Err(EngineError::Locked { .. })), "got {result:?}");
    }
    drop(held);

    assert_eq!(engine.load(&output).await.unwrap(), data);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60000)]
async fn test_parallel_engines_on_separate_directories() {
    let scratch = Arc::new(Scratch::new());
    let mut handles = Vec::new();
    for i in 0..6usize {
        let scratch = Arc::clone(&scratch);
        handles.push(tokio::spawn(async move {
            let data = test_data(20_000 + i * 3_333);
            let input = scratch.input(&format!("in-{i}"), &data);
            let output = scratch.output(&format!("out-{i}"));
            let engine = engine(2048, true);
            engine.store(&input, &output).await.unwrap();
            assert_eq!(engine.load(&output).await.unwrap(), data, "engine {i}");
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
}

//! Tampering with stored files and checking the engine refuses to return
//! wrong bytes.

use tessera_engine::EngineError;
use tessera_integration_tests::{
    Scratch, chunk_files, corrupt_byte, engine, random_data, test_data, truncate,
};

#[tokio::test]
async fn test_every_chunk_position_detects_corruption() {
    let scratch = Scratch::new();
    let data = random_data(5 * 4096, 7);
    let input = scratch.input("in", &data);
    let engine = engine(4096, true);

    for victim in 0..5 {
        let output = scratch.output(&format!("out-{victim}"));
        let manifest = engine.store(&input, &output).await.unwrap();
        let chunk = &manifest.chunks[victim];
        corrupt_byte(&output.join(chunk.address.file_name()), 0, 0x01);

        let err = engine.load(&output).await.unwrap_err();
        match err {
            EngineError::IntegrityMismatch {
                position, address, ..
            } => {
                assert_eq!(position, victim);
                assert_eq!(address, chunk.address);
            }
            other => panic!("victim {victim}: expected IntegrityMismatch, got {other:?}"),
        }
        // Failed loads keep everything for recovery.
        assert_eq!(chunk_files(&output).len(), 5);
        assert!(output.join("index.bin").exists());
    }
}

#[tokio::test]
async fn test_truncated_chunk_is_integrity_mismatch() {
    let scratch = Scratch::new();
    let input = scratch.input("in", &test_data(10_000));
    let output = scratch.output("out");
    let engine = engine(4096, true);
    let manifest = engine.store(&input, &output).await.unwrap();

    let path = output.join(manifest.chunks[1].address.file_name());
    truncate(&path, chunk_len(&path) / 2);

    let err = engine.load(&output).await.unwrap_err();
    assert!(
        matches!(err, EngineError::IntegrityMismatch { position: 1, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_index_truncated_to_partial_address() {
    let scratch = Scratch::new();
    let input = scratch.input("in", &test_data(10_000));
    let output = scratch.output("out");
    let engine = engine(4096, true);
    engine.store(&input, &output).await.unwrap();

    truncate(&output.join("index.bin"), 40);

    let err = engine.load(&output).await.unwrap_err();
    assert!(
        matches!(err, EngineError::CorruptIndex { len: 40, .. }),
        "got {err:?}"
    );
    let err = engine.purge(&output).await.unwrap_err();
    assert!(matches!(err, EngineError::CorruptIndex { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_index_truncated_to_whole_addresses() {
    let scratch = Scratch::new();
    let input = scratch.input("in", &test_data(10_000));
    let output = scratch.output("out");
    let engine = engine(4096, true);
    engine.store(&input, &output).await.unwrap();

    // Still well-formed, but no longer agrees with the manifest.
    truncate(&output.join("index.bin"), 32);

    let err = engine.load(&output).await.unwrap_err();
    assert!(matches!(err, EngineError::CorruptManifest { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_deleted_chunk_is_reported_by_position() {
    let scratch = Scratch::new();
    let input = scratch.input("in", &test_data(20_000));
    let output = scratch.output("out");
    let engine = engine(4096, true);
    let manifest = engine.store(&input, &output).await.unwrap();

    let victim = manifest.chunks[4].address;
    std::fs::remove_file(output.join(victim.file_name())).unwrap();

    let err = engine.load(&output).await.unwrap_err();
    assert!(
        matches!(err, EngineError::ChunkMissing { position: 4, address } if address == victim),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_garbage_manifest() {
    let scratch = Scratch::new();
    let input = scratch.input("in", &test_data(100));
    let output = scratch.output("out");
    let engine = engine(4096, true);
    engine.store(&input, &output).await.unwrap();

    std::fs::write(output.join("manifest.bin"), b"\xff\xff\xff").unwrap();

    let err = engine.load(&output).await.unwrap_err();
    assert!(matches!(err, EngineError::CorruptManifest { .. }), "got {err:?}");
    let err = engine.inspect(&output).await.unwrap_err();
    assert!(matches!(err, EngineError::CorruptManifest { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_store_unreadable_input_leaves_previous_file() {
    let scratch = Scratch::new();
    let data = test_data(5000);
    let input = scratch.input("in", &data);
    let output = scratch.output("out");
    let engine = engine(1024, true);
    engine.store(&input, &output).await.unwrap();

    // A directory cannot be read as a file.
    let err = engine.store(scratch.path(), &output).await.unwrap_err();
    match err {
        EngineError::Io { path, .. } => assert_eq!(path, scratch.path()),
        other => panic!("expected Io, got {other:?}"),
    }

    assert_eq!(chunk_files(&output).len(), 5);
    assert_eq!(engine.load(&output).await.unwrap(), data);
}

fn chunk_len(path: &std::path::Path) -> u64 {
    std::fs::metadata(path).unwrap().len()
}

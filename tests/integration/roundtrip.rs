//! End-to-end store/load round trips through the file-backed engine.

use tessera_integration_tests::{Scratch, chunk_files, engine, random_data, test_data};

#[tokio::test]
#[ntest::timeout(60000)]
async fn test_roundtrip_various_sizes_and_chunk_sizes() {
    let scratch = Scratch::new();
    let cases: &[(usize, u32)] = &[
        (0, 1),
        (1, 1),
        (17, 1),
        (4095, 4096),
        (4096, 4096),
        (4097, 4096),
        (100_000, 4096),
        (100_000, 1_000_000),
        (262_144, 65_536),
    ];

    for (i, &(len, chunk_size)) in cases.iter().enumerate() {
        let data = test_data(len);
        let input = scratch.input(&format!("in-{i}"), &data);
        let output = scratch.output(&format!("out-{i}"));
        let engine = engine(chunk_size, true);

        let manifest = engine.store(&input, &output).await.unwrap();
        assert_eq!(
            manifest.len() as u64,
            (len as u64).div_ceil(chunk_size as u64),
            "len={len} chunk_size={chunk_size}"
        );
        assert_eq!(chunk_files(&output).len(), manifest.len());

        let got = engine.load(&output).await.unwrap();
        assert_eq!(got, data, "len={len} chunk_size={chunk_size}");
    }
}

#[tokio::test]
#[ntest::timeout(60000)]
async fn test_roundtrip_incompressible_data() {
    let scratch = Scratch::new();
    let data = random_data(3 * 1024 * 1024 + 11, 42);
    let input = scratch.input("random.bin.in", &data);
    let output = scratch.output("out");
    let engine = engine(1024 * 1024, true);

    let manifest = engine.store(&input, &output).await.unwrap();

    assert_eq!(manifest.len(), 4);
    // Random bytes do not shrink; zstd adds only a few bytes of framing.
    assert!(manifest.stored_size() >= manifest.total_size);
    assert_eq!(engine.load(&output).await.unwrap(), data);
}

#[tokio::test]
#[ntest::timeout(60000)]
async fn test_repeated_character_file_scaled() {
    let scratch = Scratch::new();
    let data = vec![b'a'; 10 * 1024 * 1024];
    let input = scratch.input("aaaa.txt", &data);
    let output = scratch.output("out");
    let engine = engine(1024 * 1024, true);

    let manifest = engine.store(&input, &output).await.unwrap();

    assert_eq!(manifest.len(), 10);
    for chunk in &manifest.chunks {
        assert_eq!(chunk.size, 1024 * 1024);
        assert!(chunk.stored_size < 1024, "chunk compressed to {}", chunk.stored_size);
    }
    // Identical content, distinct addresses: no deduplication.
    assert_eq!(chunk_files(&output).len(), 10);

    assert_eq!(engine.load(&output).await.unwrap(), data);
}

/// 100 MB of `'a'` in 10 MB chunks. Slow in debug builds.
#[tokio::test]
#[ignore]
async fn test_hundred_megabytes_of_a() {
    let scratch = Scratch::new();
    let data = vec![b'a'; 100 * 1024 * 1024];
    let input = scratch.input("big.txt", &data);
    let output = scratch.output("out");
    let engine = engine(10 * 1024 * 1024, true);

    let manifest = engine.store(&input, &output).await.unwrap();

    assert_eq!(manifest.len(), 10);
    for chunk in &manifest.chunks {
        assert!(chunk.stored_size < 4096);
    }
    let got = engine.load(&output).await.unwrap();
    assert_eq!(got.len(), data.len());
    assert!(got == data);
}

#[tokio::test]
async fn test_load_from_fresh_engine_with_different_settings() {
    let scratch = Scratch::new();
    let data = test_data(50_000);
    let input = scratch.input("in", &data);
    let output = scratch.output("out");

    engine(8192, true).store(&input, &output).await.unwrap();

    let reader = tessera_engine::Engine::new(tessera_engine::EngineConfig {
        chunk_size: 1,
        compression_level: 19,
        workers: 1,
        consume_on_load: false,
    })
    .unwrap();
    assert_eq!(reader.load(&output).await.unwrap(), data);
    assert_eq!(reader.load(&output).await.unwrap(), data);
}

use locusdb_core::{Index, IndexConfig, IndexError, Space, Vector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn config(dim: usize, max_elements: usize) -> IndexConfig {
    IndexConfig {
        max_elements,
        ef_construction: 200,
        m: 16,
        ..IndexConfig::with_dimension(dim)
    }
}

fn random_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen::<f32>() + 1e-3).collect())
        .collect()
}

fn abc_index(storage: Option<std::path::PathBuf>) -> Index {
    let mut cfg = config(3, 100);
    if let Some(path) = storage {
        cfg.storage_location = path;
    }
    let index = Index::new(3, cfg).unwrap();
    for (embedding, tag) in [
        (vec![0.1, 0.2, 0.3], "A"),
        (vec![0.4, 0.5, 0.6], "B"),
        (vec![0.7, 0.8, 0.9], "C"),
    ] {
        index
            .add_vector(Vector::new(embedding, json!({ "data": tag })), false)
            .unwrap();
    }
    index
}

#[test]
fn test_exact_match_returns_own_payload() {
    let index = abc_index(None);
    let results = index.retrieve(&[0.1, 0.2, 0.3], 1).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].payload, json!({ "data": "A" }));
    assert!(results[0].distance.abs() < 1e-5);
}

#[test]
fn test_count_tracks_inserts() {
    let index: Index = Index::new(10, config(10, 1000)).unwrap();
    for (i, v) in random_vectors(250, 10, 1).into_iter().enumerate() {
        index.add_vector(Vector::new(v, json!(i)), false).unwrap();
        assert_eq!(index.count(), i + 1);
    }
}

#[test]
fn test_thousand_random_vectors() {
    let index: Index = Index::new(10, config(10, 1000)).unwrap();
    for (i, v) in random_vectors(1000, 10, 2).into_iter().enumerate() {
        index
            .add_vector(Vector::new(v, json!({ "id": i })), false)
            .unwrap();
    }
    assert_eq!(index.count(), 1000);

    let query = random_vectors(1, 10, 3).remove(0);
    let results = index.retrieve(&query, 3).unwrap();
    assert_eq!(results.len(), 3);
    let mut seen = HashSet::new();
    for r in &results {
        let id = r.payload["id"].as_u64().unwrap();
        assert!(id < 1000);
        assert!(seen.insert(id), "duplicate result {id}");
    }
    for w in results.windows(2) {
        assert!(w[0].distance <= w[1].distance);
    }
}

#[test]
fn test_distances_ascending_for_every_metric() {
    for space in [Space::Cosine, Space::L2, Space::InnerProduct] {
        let cfg = IndexConfig {
            space,
            ..config(8, 500)
        };
        let index: Index = Index::new(8, cfg).unwrap();
        for (i, v) in random_vectors(500, 8, 4).into_iter().enumerate() {
            index.add_vector(Vector::new(v, json!(i)), false).unwrap();
        }
        for q in random_vectors(20, 8, 5) {
            let results = index.retrieve(&q, 10).unwrap();
            assert_eq!(results.len(), 10);
            for w in results.windows(2) {
                assert!(w[0].distance <= w[1].distance, "{space}: not ascending");
            }
        }
    }
}

#[test]
fn test_short_result_when_fewer_vectors_than_requested() {
    let index = abc_index(None);
    let results = index.retrieve(&[0.3, 0.3, 0.3], 10).unwrap();
    assert_eq!(results.len(), 3);
}

#[test]
fn test_capacity_exceeded_keeps_count() {
    let index: Index = Index::new(3, config(3, 3)).unwrap();
    for v in random_vectors(3, 3, 6) {
        index.add_vector(Vector::new(v, json!(null)), false).unwrap();
    }
    let err = index
        .add_vector(Vector::new(vec![0.5, 0.5, 0.5], json!(null)), false)
        .unwrap_err();
    assert!(matches!(err, IndexError::CapacityExceeded { max_elements: 3 }));
    assert_eq!(index.count(), 3);
}

#[test]
fn test_dimension_mismatch_on_insert_and_query() {
    let index = abc_index(None);
    let err = index
        .add_vector(Vector::new(vec![0.1, 0.2], json!("short")), false)
        .unwrap_err();
    assert!(matches!(
        err,
        IndexError::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    ));
    assert_eq!(index.count(), 3);

    let err = index.retrieve(&[0.1, 0.2, 0.3, 0.4], 1).unwrap_err();
    assert!(matches!(err, IndexError::DimensionMismatch { .. }));
    assert_eq!(index.count(), 3);
}

#[test]
fn test_persist_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test_index.db");
    let cfg = IndexConfig {
        storage_location: path.clone(),
        space: Space::L2,
        ..config(6, 300)
    };
    let index: Index = Index::new(6, cfg).unwrap();
    for (i, v) in random_vectors(300, 6, 7).into_iter().enumerate() {
        index
            .add_vector(Vector::new(v, json!({ "id": i })), false)
            .unwrap();
    }
    index.persist().unwrap();

    let loaded: Index = Index::load(&path).unwrap();
    assert_eq!(loaded.count(), 300);
    assert_eq!(loaded.dimension(), 6);
    assert_eq!(loaded.config(), index.config());

    for q in random_vectors(25, 6, 8) {
        let before = index.retrieve(&q, 5).unwrap();
        let after = loaded.retrieve(&q, 5).unwrap();
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(&after) {
            assert_eq!(a.payload, b.payload);
            assert!((a.distance - b.distance).abs() < 1e-6);
        }
    }
}

#[test]
fn test_persist_on_every_add() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test_index.db");
    let index = Index::new(3, IndexConfig {
        storage_location: path.clone(),
        ..config(3, 100)
    })
    .unwrap();
    let vectors = [
        Vector::new(vec![0.1, 0.2, 0.3], json!({ "data": "vector1" })),
        Vector::new(vec![0.4, 0.5, 0.6], json!({ "data": "vector2" })),
        Vector::new(vec![0.7, 0.8, 0.9], json!({ "data": "vector3" })),
    ];
    for v in vectors.iter().cloned() {
        index.add_vector(v, true).unwrap();
    }

    let loaded: Index<Value> = Index::load(&path).unwrap();
    for v in &vectors {
        let results = loaded.retrieve(&v.embedding, 1).unwrap();
        assert_eq!(results[0].payload, v.payload);
    }
}

#[test]
fn test_loaded_index_accepts_more_inserts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("grow.db");
    let index = abc_index(Some(path.clone()));
    index.persist().unwrap();

    let loaded: Index = Index::load(&path).unwrap();
    let id = loaded
        .add_vector(Vector::new(vec![0.9, 0.1, 0.1], json!({ "data": "D" })), false)
        .unwrap();
    assert_eq!(id, 3);
    let results = loaded.retrieve(&[0.9, 0.1, 0.1], 1).unwrap();
    assert_eq!(results[0].payload, json!({ "data": "D" }));
}

#[test]
fn test_persist_to_missing_directory_is_io_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("no_such_dir").join("index.db");
    let index = abc_index(Some(missing.clone()));

    assert!(matches!(index.persist(), Err(IndexError::Io(_))));
    let err = index
        .add_vector(Vector::new(vec![0.2, 0.2, 0.2], json!({ "data": "E" })), true)
        .unwrap_err();
    assert!(matches!(err, IndexError::Io(_)));

    // In-memory insert stays committed and the index still answers.
    assert_eq!(index.count(), 4);
    let results = index.retrieve(&[0.1, 0.2, 0.3], 1).unwrap();
    assert_eq!(results[0].payload, json!({ "data": "A" }));
    assert!(!missing.exists());
}

#[test]
fn test_load_rejects_garbage_and_missing_files() {
    let dir = TempDir::new().unwrap();
    let garbage = dir.path().join("garbage.db");
    std::fs::write(&garbage, b"definitely not an index").unwrap();
    assert!(matches!(
        Index::<Value>::load(&garbage),
        Err(IndexError::CorruptData(_))
    ));
    assert!(matches!(
        Index::<Value>::load(dir.path().join("absent.db")),
        Err(IndexError::Io(_))
    ));
}

#[test]
fn test_load_rejects_tampered_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tampered.db");
    let index = abc_index(Some(path.clone()));
    index.persist().unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    let last_body_byte = bytes.len() - 9;
    bytes[last_body_byte] ^= 0x01;
    std::fs::write(&path, &bytes).unwrap();
    assert!(matches!(
        Index::<Value>::load(&path),
        Err(IndexError::CorruptData(_))
    ));
}

#[test]
fn test_concurrent_readers_and_writer() {
    let index: Arc<Index> = Arc::new(Index::new(8, config(8, 2000)).unwrap());
    for (i, v) in random_vectors(200, 8, 9).into_iter().enumerate() {
        index.add_vector(Vector::new(v, json!(i)), false).unwrap();
    }

    let writer = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            for (i, v) in random_vectors(500, 8, 10).into_iter().enumerate() {
                index
                    .add_vector(Vector::new(v, json!(200 + i)), false)
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|r| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for q in random_vectors(100, 8, 100 + r) {
                    let results = index.retrieve(&q, 5).unwrap();
                    assert_eq!(results.len(), 5);
                    for w in results.windows(2) {
                        assert!(w[0].distance <= w[1].distance);
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(index.count(), 700);
}

#[test]
fn test_concurrent_persists_leave_loadable_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.db");
    let cfg = IndexConfig {
        storage_location: path.clone(),
        ..config(4, 400)
    };
    let index: Index = Index::new(4, cfg).unwrap();

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let index = index.clone();
            thread::spawn(move || {
                for v in random_vectors(50, 4, 20 + t) {
                    index.add_vector(Vector::new(v, json!(t)), true).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let loaded: Index = Index::load(&path).unwrap();
    assert_eq!(loaded.count(), 200);
}

fn mixed_with_copies(space: Space) -> (Index, Vec<f32>, Vec<(usize, Vec<f32>)>) {
    let copy = vec![0.5f32; 8];
    let cfg = IndexConfig {
        space,
        ..IndexConfig {
            max_elements: 1000,
            ..IndexConfig::with_dimension(8)
        }
    };
    let index: Index = Index::new(8, cfg).unwrap();
    let mut distinct = Vec::new();
    let mut randoms = random_vectors(500, 8, 42).into_iter();
    for i in 0..1000usize {
        let embedding = if i % 2 == 0 {
            copy.clone()
        } else {
            let v = randoms.next().unwrap();
            distinct.push((i, v.clone()));
            v
        };
        index
            .add_vector(Vector::new(embedding, json!({ "id": i })), false)
            .unwrap();
    }
    (index, copy, distinct)
}

#[test]
fn test_repeated_embeddings_keep_graph_connected() {
    for space in [Space::L2, Space::Cosine] {
        let (index, copy, distinct) = mixed_with_copies(space);
        assert_eq!(index.count(), 1000);

        let results = index.retrieve(&copy, 100).unwrap();
        assert_eq!(results.len(), 100, "{space}: search trapped among copies");
        assert!(results[0].distance.abs() < 1e-5);

        let misses: Vec<usize> = distinct
            .iter()
            .filter(|(i, v)| {
                let hit = index.retrieve(v, 1).unwrap();
                hit[0].payload != json!({ "id": i })
            })
            .map(|(i, _)| *i)
            .collect();
        assert!(misses.is_empty(), "{space}: self-lookup missed {misses:?}");
    }
}

#[test]
fn test_full_length_results_over_whole_index() {
    let index: Index = Index::new(6, config(6, 400)).unwrap();
    for (i, v) in random_vectors(400, 6, 11).into_iter().enumerate() {
        index.add_vector(Vector::new(v, json!(i)), false).unwrap();
    }
    let query = random_vectors(1, 6, 12).remove(0);
    let results = index.retrieve(&query, index.count()).unwrap();
    assert_eq!(results.len(), 400);
    let ids: HashSet<u64> = results.iter().map(|r| r.payload.as_u64().unwrap()).collect();
    assert_eq!(ids.len(), 400);
}

#[test]
fn test_only_copies_stay_reachable() {
    let index: Index = Index::new(4, config(4, 300)).unwrap();
    for i in 0..300usize {
        index
            .add_vector(Vector::new(vec![0.25; 4], json!(i)), false)
            .unwrap();
    }
    let results = index.retrieve(&[0.25; 4], 300).unwrap();
    assert_eq!(results.len(), 300);
}

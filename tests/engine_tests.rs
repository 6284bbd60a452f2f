//! End-to-end training and classification over real BMP trees

use pegasvm::core::{ImageShape, NormPolicy, TrainConfig};
use pegasvm::{classify, BmpFile, ClassPopulation, DirectoryPicker, MemoryPixels, Trainer, VectorStore};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Minimal bottom-up 8bpp BMP: `rows` are given top-first and reversed
/// into storage order here.
fn make_bmp(width: usize, rows: &[&[u8]]) -> Vec<u8> {
    let payload = width;
    let stride = (payload + 3) & !3;
    let data_offset = 14 + 40;
    let mut out = Vec::new();
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&((data_offset + stride * rows.len()) as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(data_offset as u32).to_le_bytes());
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(rows.len() as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.resize(data_offset, 0);
    for row in rows.iter().rev() {
        assert_eq!(row.len(), payload);
        out.extend_from_slice(row);
        out.resize(out.len() + (stride - payload), 0);
    }
    out
}

/// Two 2x2 classes that differ in direction, not just brightness:
/// "bottom" is bright in the lower row, "top" in the upper row.
fn write_class_tree(root: &Path) {
    let bottom = root.join("bottom");
    let top = root.join("top");
    fs::create_dir(&bottom).unwrap();
    fs::create_dir(&top).unwrap();
    for (k, hi) in [(0u8, 200u8), (1, 210), (2, 190)] {
        fs::write(
            bottom.join(format!("s{k}.bmp")),
            make_bmp(2, &[&[10, 10], &[hi, hi]]),
        )
        .unwrap();
        fs::write(
            top.join(format!("s{k}.bmp")),
            make_bmp(2, &[&[hi, hi], &[10, 10]]),
        )
        .unwrap();
    }
}

fn train_tree(root: &Path, store_path: &Path, steps: usize) -> VectorStore {
    let population = ClassPopulation::scan(root).unwrap();
    let shape = population.common_shape().unwrap();
    let store = VectorStore::create(store_path, shape, population.class_names()).unwrap();
    let picker = DirectoryPicker::with_seed(population, 42);
    let config = TrainConfig {
        steps,
        ..TrainConfig::default()
    };
    Trainer::with_config(&store, picker, config).run().unwrap();
    store
}

#[test]
fn test_train_then_classify_separable_classes() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("classes");
    fs::create_dir(&root).unwrap();
    write_class_tree(&root);

    let store = train_tree(&root, &dir.path().join("store.nsvm"), 50);
    assert_eq!(store.class_names(), &["bottom", "top"]);

    // Queries shaped like each class's pattern
    let mut bottomish = MemoryPixels::new(ImageShape::new(2, 2, 8), vec![12, 8, 205, 195]);
    let verdict = classify(&store, &mut bottomish, NormPolicy::Euclidean).unwrap();
    assert_eq!(verdict.winners, vec![0], "votes: {:?}", verdict.votes);
    assert_eq!(verdict.confidence(), 100.0);

    let mut toppish = MemoryPixels::new(ImageShape::new(2, 2, 8), vec![195, 205, 8, 12]);
    let verdict = classify(&store, &mut toppish, NormPolicy::Euclidean).unwrap();
    assert_eq!(verdict.winners, vec![1], "votes: {:?}", verdict.votes);
}

#[test]
fn test_trained_store_reopens_and_classifies_bmp_query() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("classes");
    fs::create_dir(&root).unwrap();
    write_class_tree(&root);

    let store_path = dir.path().join("store.nsvm");
    train_tree(&root, &store_path, 50);

    // A fresh process would reopen the store from disk
    let store = VectorStore::open(&store_path).unwrap();
    let query_path = dir.path().join("query.bmp");
    fs::write(&query_path, make_bmp(2, &[&[10, 10], &[200, 200]])).unwrap();
    let mut query = BmpFile::open(&query_path).unwrap();

    let verdict = classify(&store, &mut query, NormPolicy::Euclidean).unwrap();
    assert_eq!(verdict.winners, vec![0]);
}

#[test]
fn test_blank_class_never_touches_its_vectors() {
    // One class holds only photometrically blank samples: every update it
    // would drive is a no-op, and the other classes' mutual pairs are the
    // only vectors that change.
    let dir = tempdir().unwrap();
    let root = dir.path().join("classes");
    fs::create_dir(&root).unwrap();
    write_class_tree(&root);
    let blank = root.join("zz_blank");
    fs::create_dir(&blank).unwrap();
    fs::write(blank.join("s0.bmp"), make_bmp(2, &[&[0, 0], &[0, 0]])).unwrap();

    let store_path = dir.path().join("store.nsvm");
    let store = train_tree(&root, &store_path, 10);
    assert_eq!(store.class_names(), &["bottom", "top", "zz_blank"]);

    // Pairs (0,2) and (1,2) were still trained by classes 0 and 1, but a
    // blank query remains deterministic: unanimous for the highest index.
    let mut blank_query = MemoryPixels::new(ImageShape::new(2, 2, 8), vec![0; 4]);
    let verdict = classify(&store, &mut blank_query, NormPolicy::Euclidean).unwrap();
    assert_eq!(verdict.winners, vec![2]);
    assert_eq!(verdict.max_votes, 2);
    assert_eq!(verdict.confidence(), 100.0);
}

#[test]
fn test_byte_sum_policy_trains_and_classifies() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("classes");
    fs::create_dir(&root).unwrap();
    write_class_tree(&root);

    let population = ClassPopulation::scan(&root).unwrap();
    let shape = population.common_shape().unwrap();
    let store = VectorStore::create(
        dir.path().join("store.nsvm"),
        shape,
        population.class_names(),
    )
    .unwrap();
    let picker = DirectoryPicker::with_seed(population, 7);
    let config = TrainConfig {
        steps: 50,
        norm: NormPolicy::ByteSum,
        ..TrainConfig::default()
    };
    Trainer::with_config(&store, picker, config).run().unwrap();

    let mut bottomish = MemoryPixels::new(ImageShape::new(2, 2, 8), vec![10, 10, 200, 200]);
    let verdict = classify(&store, &mut bottomish, NormPolicy::ByteSum).unwrap();
    assert_eq!(verdict.winners, vec![0], "votes: {:?}", verdict.votes);
}

#[test]
fn test_training_leaves_header_and_class_table_untouched() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("classes");
    fs::create_dir(&root).unwrap();
    write_class_tree(&root);

    let store_path = dir.path().join("store.nsvm");
    let population = ClassPopulation::scan(&root).unwrap();
    let shape = population.common_shape().unwrap();
    let store = VectorStore::create(&store_path, shape, population.class_names()).unwrap();
    let base = store.header().vectors_base() as usize;
    let before = fs::read(&store_path).unwrap();

    let picker = DirectoryPicker::with_seed(population, 1);
    let config = TrainConfig {
        steps: 5,
        ..TrainConfig::default()
    };
    Trainer::with_config(&store, picker, config).run().unwrap();

    let after = fs::read(&store_path).unwrap();
    assert_eq!(after.len(), before.len());
    assert_eq!(&after[..base], &before[..base]);
    // and the vectors did change
    assert_ne!(&after[base..], &before[base..]);
}

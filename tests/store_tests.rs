//! On-disk store lifecycle tests: creation, validation, addressing

use pegasvm::core::{ImageShape, StoreError};
use pegasvm::store::layout::{pair_count, pair_index, FIXED_HEADER_LEN};
use pegasvm::VectorStore;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_two_class_store_is_one_zeroed_vector() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.nsvm");
    let store = VectorStore::create(
        &path,
        ImageShape::new(2, 2, 8),
        vec!["neg".into(), "pos".into()],
    )
    .unwrap();

    let header = store.header();
    assert_eq!(header.vector_len().unwrap(), 4);
    assert_eq!(pair_count(2).unwrap(), 1);

    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len() as u64, header.file_len().unwrap());
    // Everything after header + class table is zero
    let base = header.vectors_base() as usize;
    assert_eq!(bytes.len() - base, 4 * 8);
    assert!(bytes[base..].iter().all(|&b| b == 0));
}

#[test]
fn test_header_survives_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.nsvm");
    let names: Vec<String> = ["apple", "mango", "zebra"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    VectorStore::create(&path, ImageShape::new(7, -3, 24), names.clone()).unwrap();

    let store = VectorStore::open(&path).unwrap();
    assert_eq!(store.class_names(), names.as_slice());
    assert_eq!(store.shape(), ImageShape::new(7, -3, 24));
    assert_eq!(store.num_classes(), 3);
}

#[test]
fn test_open_rejects_foreign_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("not-a-store");
    fs::write(&path, b"BMP or whatever, long enough to read a header from").unwrap();
    assert!(matches!(
        VectorStore::open(&path),
        Err(StoreError::BadMagic { .. })
    ));
}

#[test]
fn test_open_rejects_corrupted_float_width() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.nsvm");
    VectorStore::create(
        &path,
        ImageShape::new(1, 1, 8),
        vec!["a".into(), "b".into()],
    )
    .unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes[4] = 4; // pretend a 4-byte-float machine wrote it
    fs::write(&path, bytes).unwrap();

    assert!(matches!(
        VectorStore::open(&path),
        Err(StoreError::FloatWidthMismatch {
            stored: 4,
            native: 8
        })
    ));
}

#[test]
fn test_open_rejects_grown_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.nsvm");
    VectorStore::create(
        &path,
        ImageShape::new(1, 1, 8),
        vec!["a".into(), "b".into()],
    )
    .unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes.push(0);
    fs::write(&path, bytes).unwrap();

    assert!(matches!(
        VectorStore::open(&path),
        Err(StoreError::TruncatedStore { .. })
    ));
}

#[test]
fn test_create_rejects_overflowing_shape() {
    let dir = tempdir().unwrap();
    let shape = ImageShape {
        width: u32::MAX,
        height: i32::MAX,
        bits_per_pixel: 64,
    };
    let result = VectorStore::create(
        dir.path().join("store.nsvm"),
        shape,
        vec!["a".into(), "b".into()],
    );
    assert!(matches!(result, Err(StoreError::OffsetOverflow)));
}

#[test]
fn test_vector_offsets_are_contiguous_and_ordered() {
    let dir = tempdir().unwrap();
    let store = VectorStore::create(
        dir.path().join("store.nsvm"),
        ImageShape::new(2, 1, 8),
        (0..5).map(|i| format!("c{i}")).collect(),
    )
    .unwrap();

    let header = store.header();
    let vector_size = header.vector_size().unwrap();
    let n = store.num_classes();
    let mut expected = header.vectors_base();
    for i in 0..n {
        for j in (i + 1)..n {
            assert_eq!(header.offset_of(i, j).unwrap(), expected);
            expected += vector_size;
        }
    }
    assert_eq!(expected, header.file_len().unwrap());
}

#[test]
fn test_fixed_header_length_matches_format() {
    // magic[4] + double_size + width + height + bpp + num_classes
    assert_eq!(FIXED_HEADER_LEN, 4 + 1 + 4 + 4 + 2 + 8);
    for n in 2..20u64 {
        let mut ranks: Vec<u64> = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                ranks.push(pair_index(i, j, n).unwrap());
            }
        }
        let count = pair_count(n).unwrap();
        assert_eq!(ranks.len() as u64, count);
        assert_eq!(ranks.first(), Some(&0));
        assert_eq!(ranks.last(), Some(&(count - 1)));
    }
}

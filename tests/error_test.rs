//! Error propagation: registration failures stay local, streaming failures
//! poison the producer terminally

use std::fs;
use tempfile::TempDir;
use zipstream::{CompressionLevel, CompressionMethod, ZipStream, ZipStreamError};

#[test]
fn test_missing_source_rejected() {
    let mut stream = ZipStream::new();
    let err = stream
        .add_entry(
            "ghost.txt",
            "/no/such/file/anywhere",
            CompressionMethod::Store,
            CompressionLevel::Default,
        )
        .unwrap_err();
    assert!(matches!(err, ZipStreamError::InvalidEntry(_)));
}

#[test]
fn test_directory_source_rejected() {
    let dir = TempDir::new().unwrap();
    let mut stream = ZipStream::new();
    let err = stream
        .add_entry(
            "dir",
            dir.path(),
            CompressionMethod::Store,
            CompressionLevel::Default,
        )
        .unwrap_err();
    assert!(matches!(err, ZipStreamError::InvalidEntry(_)));
}

#[test]
fn test_registration_failure_keeps_prior_entries() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.txt");
    fs::write(&good, b"ok").unwrap();

    let mut stream = ZipStream::new();
    stream
        .add_entry("good.txt", &good, CompressionMethod::Store, CompressionLevel::Default)
        .unwrap();
    assert!(stream
        .add_entry(
            "bad.txt",
            "/no/such/file",
            CompressionMethod::Store,
            CompressionLevel::Default
        )
        .is_err());
    assert_eq!(stream.entry_count(), 1);

    // The surviving entry still streams normally
    let mut buf = [0u8; 4096];
    let mut total = 0;
    loop {
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        total += n;
    }
    // header + name + data + descriptor + central entry + eocd
    assert_eq!(total, 30 + 8 + 2 + 16 + 46 + 8 + 22);
}

#[test]
fn test_add_entry_after_finalize_rejected() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("a.txt");
    fs::write(&source, b"x").unwrap();

    let mut stream = ZipStream::new();
    stream
        .add_entry("a.txt", &source, CompressionMethod::Store, CompressionLevel::Default)
        .unwrap();

    let mut buf = [0u8; 8];
    stream.read(&mut buf).unwrap();

    let err = stream
        .add_entry("b.txt", &source, CompressionMethod::Store, CompressionLevel::Default)
        .unwrap_err();
    assert!(matches!(err, ZipStreamError::InvalidEntry(_)));
}

#[test]
fn test_vanished_source_poisons_stream() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("volatile.txt");
    fs::write(&source, b"here today").unwrap();

    let mut stream = ZipStream::new();
    stream
        .add_entry(
            "volatile.txt",
            &source,
            CompressionMethod::Store,
            CompressionLevel::Default,
        )
        .unwrap();

    // Source disappears between registration and streaming
    fs::remove_file(&source).unwrap();

    let mut buf = [0u8; 4096];
    // Header and name bytes already staged may be delivered first
    let mut first_err = None;
    for _ in 0..4 {
        match stream.read(&mut buf) {
            Ok(n) if n > 0 => continue,
            Ok(_) => panic!("stream completed despite missing source"),
            Err(e) => {
                first_err = Some(e);
                break;
            }
        }
    }
    let first_err = first_err.expect("open failure must surface");
    assert!(matches!(first_err, ZipStreamError::SourceUnavailable { .. }));

    // Every subsequent read reports the same error
    for _ in 0..3 {
        let err = stream.read(&mut buf).unwrap_err();
        assert_eq!(err.to_string(), first_err.to_string());
    }
}

#[test]
fn test_zero_capacity_read_rejected() {
    let mut stream = ZipStream::new();
    let err = stream.read(&mut []).unwrap_err();
    assert!(matches!(err, ZipStreamError::InvalidState(_)));
}

#[cfg(not(feature = "bzip2"))]
#[test]
fn test_bzip2_unavailable_without_feature() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("a.txt");
    fs::write(&source, b"x").unwrap();

    let mut stream = ZipStream::new();
    let err = stream
        .add_entry("a.txt", &source, CompressionMethod::Bzip2, CompressionLevel::Default)
        .unwrap_err();
    assert!(matches!(err, ZipStreamError::UnsupportedCompression(_)));
}

use pubsearch_core::persist::{encode_snapshot, load_snapshot, save_snapshot, IndexPaths, FORMAT_VERSION};
use pubsearch_core::{build, Document, LoadError, Snapshot};
use std::fs;

fn doc(title: &str, link: &str) -> Document {
    Document { title: title.into(), link: link.into(), authors: Some("A. Author".into()), year: Some("2023".into()), kind: None }
}

fn corpus() -> Vec<Document> {
    vec![
        doc("Deep Learning for Finance", "https://example.org/0"),
        doc("Finance and Markets", "https://example.org/1"),
        doc("Deep Deep Learning", "https://example.org/2"),
    ]
}

fn titles(snap: &Snapshot, q: &str) -> Vec<String> {
    snap.search(q).unwrap().into_iter().map(|d| d.title.clone()).collect()
}

#[test]
fn reloaded_snapshot_answers_like_the_original() {
    let dir = tempfile::tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    let built = build(corpus());
    save_snapshot(&paths, &built).unwrap();
    let loaded = load_snapshot(&paths).unwrap();

    assert_eq!(loaded, built);
    for q in ["deep learning", "finance", "markets deep", "the of a", "quantum", ""] {
        assert_eq!(titles(&loaded, q), titles(&built, q), "query {q:?}");
        assert_eq!(loaded.search_hits(q).unwrap(), built.search_hits(q).unwrap());
    }
    assert_eq!(titles(&loaded, "deep learning"), vec!["Deep Deep Learning", "Deep Learning for Finance"]);
}

#[test]
fn builds_are_byte_identical() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    save_snapshot(&IndexPaths::new(a.path()), &build(corpus())).unwrap();
    save_snapshot(&IndexPaths::new(b.path()), &build(corpus())).unwrap();
    let bytes_a = fs::read(a.path().join("snapshot.bin")).unwrap();
    let bytes_b = fs::read(b.path().join("snapshot.bin")).unwrap();
    assert_eq!(bytes_a, bytes_b);
    assert_eq!(encode_snapshot(&build(corpus())).unwrap(), bytes_a);
}

#[test]
fn repeated_queries_are_stable() {
    let snap = build(corpus());
    let first = snap.search_hits("deep finance learning").unwrap();
    for _ in 0..10 {
        assert_eq!(snap.search_hits("deep finance learning").unwrap(), first);
    }
}

#[test]
fn corrupted_version_tag_is_a_version_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    save_snapshot(&paths, &build(corpus())).unwrap();

    let mut bytes = fs::read(paths.snapshot()).unwrap();
    bytes[4..8].copy_from_slice(&(FORMAT_VERSION + 41).to_le_bytes());
    fs::write(paths.snapshot(), &bytes).unwrap();

    match load_snapshot(&paths) {
        Err(LoadError::VersionMismatch { found, expected }) => {
            assert_eq!(found, FORMAT_VERSION + 41);
            assert_eq!(expected, FORMAT_VERSION);
        }
        other => panic!("expected VersionMismatch, got {other:?}"),
    }
}

#[test]
fn flipped_payload_byte_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    save_snapshot(&paths, &build(corpus())).unwrap();

    let mut bytes = fs::read(paths.snapshot()).unwrap();
    bytes[12] ^= 0xff;
    fs::write(paths.snapshot(), &bytes).unwrap();
    assert!(matches!(load_snapshot(&paths), Err(LoadError::Corrupt(_))));

    bytes.truncate(6);
    fs::write(paths.snapshot(), &bytes).unwrap();
    assert!(matches!(load_snapshot(&paths), Err(LoadError::Corrupt(_))));
}

#[test]
fn missing_artifact_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let paths = IndexPaths::new(dir.path().join("never-built"));
    assert!(matches!(load_snapshot(&paths), Err(LoadError::NotFound(_))));
}

#[test]
fn failed_save_leaves_previous_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    save_snapshot(&paths, &build(corpus())).unwrap();

    // A directory squatting on the temp path makes the next write fail.
    fs::create_dir(dir.path().join("snapshot.bin.tmp")).unwrap();
    assert!(save_snapshot(&paths, &build(vec![doc("Other", "x")])).is_err());

    let loaded = load_snapshot(&paths).unwrap();
    assert_eq!(loaded.docs().len(), 3);
}

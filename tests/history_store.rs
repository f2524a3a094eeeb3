use std::fs;

use qrcard::history::{FileStore, HistoryStore, MemoryStore};
use qrcard::{History, HistoryOptions};

fn boxed(store: impl HistoryStore + 'static) -> Box<dyn HistoryStore> {
    Box::new(store)
}

#[test]
fn persists_and_reloads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("qrcard/history.json");

    {
        let mut history =
            History::with_backends(5, vec![boxed(FileStore::new("persistent", &path))]);
        for i in 1..=6 {
            history.record(&format!("https://site{i}.example/"));
        }
        history.record("https://site3.example/");
        assert_eq!(history.active_store(), "persistent");
    }

    let reloaded = History::with_backends(5, vec![boxed(FileStore::new("persistent", &path))]);
    assert_eq!(
        reloaded.entries(),
        &[
            "https://site3.example/",
            "https://site6.example/",
            "https://site5.example/",
            "https://site4.example/",
            "https://site2.example/",
        ]
    );
}

#[test]
fn unwritable_store_falls_back_to_session_then_memory() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, b"file").unwrap();

    let broken = FileStore::new("persistent", blocker.join("history.json"));
    let session_path = dir.path().join("session.json");
    let session = FileStore::new("session", &session_path);

    let mut history = History::with_backends(5, vec![boxed(broken.clone()), boxed(session)]);
    assert!(history.record("https://a.example/"));
    assert_eq!(history.active_store(), "session");
    assert!(session_path.exists());

    let also_broken = FileStore::new("session", blocker.join("session.json"));
    let mut history = History::with_backends(5, vec![boxed(broken), boxed(also_broken)]);
    assert!(history.record("https://b.example/"));
    assert_eq!(history.active_store(), "memory");
    assert_eq!(history.entries(), &["https://b.example/"]);
}

#[test]
fn corrupt_file_is_skipped_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    fs::write(&path, "{ not json").unwrap();

    let history = History::with_backends(5, vec![boxed(FileStore::new("persistent", &path))]);
    assert!(history.entries().is_empty());
    assert_eq!(history.active_store(), "memory");
}

#[test]
fn stored_entries_are_sanitized() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    fs::write(
        &path,
        r#"["https://a.example/", "ftp://x.com", "https://a.example/", "https://b.example/"]"#,
    )
    .unwrap();

    let history = History::with_backends(5, vec![boxed(FileStore::new("persistent", &path))]);
    assert_eq!(
        history.entries(),
        &["https://a.example/", "https://b.example/"]
    );
}

#[test]
fn open_honours_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let options = HistoryOptions {
        enabled: true,
        path: Some(dir.path().join("h.json")),
        capacity: 2,
    };

    let mut history = History::open(&options);
    history.record("https://a.example/");
    history.record("https://b.example/");
    history.record("https://c.example/");
    assert_eq!(history.capacity(), 2);
    assert_eq!(history.entries().len(), 2);
    assert!(dir.path().join("h.json").exists());
}

#[test]
fn memory_store_round_trips() {
    let mut store = MemoryStore::default();
    store.save(&["https://a.example/".to_string()]).unwrap();
    assert_eq!(store.load().unwrap(), vec!["https://a.example/"]);
    assert_eq!(store.label(), "memory");
}

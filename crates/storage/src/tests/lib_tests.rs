use super::*;
use chrono::{TimeZone, Utc};
use shared::domain::{DataId, Message, ProcessedFile};
use std::sync::Arc;

fn sample_file(name: &str) -> ProcessedFile {
    ProcessedFile {
        id: DataId(format!("id-{name}")),
        original_name: name.to_string(),
        summary: format!("{name}: 2 sheets, 140 rows"),
        sheets: Vec::new(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).unwrap(),
    }
}

fn store_with_backend() -> (SessionStore, Arc<MemoryStore>) {
    let backend = Arc::new(MemoryStore::new());
    (SessionStore::new(backend.clone()), backend)
}

#[test]
fn saved_values_are_wrapped_in_versioned_envelope() {
    let (store, backend) = store_with_backend();
    store
        .save(SessionKey::CurrentFile, &sample_file("sales.xlsx"))
        .expect("save");

    let raw = backend
        .get("excel-chat-current-file")
        .expect("get")
        .expect("present");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(value["version"], SCHEMA_VERSION);
    assert_eq!(value["data"]["originalName"], "sales.xlsx");
}

#[test]
fn timestamps_are_restored_as_time_values() {
    let (store, _) = store_with_backend();
    let message = Message::user("What are the main trends?");
    store
        .save(SessionKey::ChatHistory, &vec![message.clone()])
        .expect("save");

    let restored = store.load_messages();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].timestamp, message.timestamp);
    assert_eq!(
        store.load_current_file(),
        None,
        "unrelated keys stay absent"
    );
}

#[test]
fn corrupt_payload_is_dropped_instead_of_failing() {
    let (store, backend) = store_with_backend();
    backend
        .set("excel-chat-current-file", "{not json")
        .expect("set");

    assert_eq!(store.load_current_file(), None);
    assert_eq!(
        backend.get("excel-chat-current-file").expect("get"),
        None,
        "corrupt key should be removed"
    );
}

#[test]
fn wrong_shape_inside_envelope_is_dropped() {
    let (store, backend) = store_with_backend();
    backend
        .set(
            "excel-chat-comparison-pair",
            r#"{"version":1,"data":{"fileA":"oops"}}"#,
        )
        .expect("set");

    assert!(store.load_comparison_pair().is_none());
    assert!(backend.keys().expect("keys").is_empty());
}

#[test]
fn newer_schema_version_is_discarded() {
    let (store, backend) = store_with_backend();
    let file = serde_json::to_value(sample_file("q1.xlsx")).expect("file json");
    let raw = serde_json::json!({ "version": SCHEMA_VERSION + 1, "data": file }).to_string();
    backend.set("excel-chat-current-file", &raw).expect("set");

    assert!(store.load_current_file().is_none());
    assert_eq!(backend.get("excel-chat-current-file").expect("get"), None);
}

#[test]
fn unversioned_legacy_history_is_migrated_in_place() {
    let (store, backend) = store_with_backend();
    backend
        .set(
            "excel-chat-history",
            r#"[{"id":"1718000000000abc","type":"assistant","content":"hello","timestamp":"2024-06-10T06:13:20.000Z"}]"#,
        )
        .expect("set");

    let messages = store.load_messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "hello");
    assert_eq!(
        messages[0].timestamp,
        Utc.with_ymd_and_hms(2024, 6, 10, 6, 13, 20).unwrap()
    );

    let raw = backend
        .get("excel-chat-history")
        .expect("get")
        .expect("rewritten");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(value["version"], SCHEMA_VERSION);
}

#[test]
fn clear_all_removes_every_session_key() {
    let (store, backend) = store_with_backend();
    store
        .save(SessionKey::ChatHistory, &vec![Message::system("hi")])
        .expect("history");
    store
        .save(SessionKey::CurrentFile, &sample_file("a.xlsx"))
        .expect("file");
    store
        .save(
            SessionKey::ComparisonFilesInProgress,
            &vec![sample_file("b.xlsx")],
        )
        .expect("in progress");
    backend.set("unrelated", "keep me").expect("unrelated");

    store.clear_all().expect("clear");

    assert_eq!(backend.keys().expect("keys"), vec!["unrelated".to_string()]);
}

#[test]
fn file_store_replaces_values_and_tolerates_missing_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path().join("session")).expect("file store");

    assert_eq!(store.get("excel-chat-history").expect("get"), None);
    store.remove("excel-chat-history").expect("remove missing");

    store.set("excel-chat-history", "[1]").expect("first");
    store.set("excel-chat-history", "[2]").expect("second");
    assert_eq!(
        store.get("excel-chat-history").expect("get").as_deref(),
        Some("[2]")
    );
    assert!(
        !dir.path()
            .join("session")
            .join("excel-chat-history.json.tmp")
            .exists(),
        "temp file should be renamed into place"
    );

    store.remove("excel-chat-history").expect("remove");
    assert_eq!(store.get("excel-chat-history").expect("get"), None);
}

#[test]
fn session_store_survives_reopening_file_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let store = SessionStore::new(Arc::new(FileStore::new(dir.path()).expect("store")));
        store
            .save(SessionKey::CurrentFile, &sample_file("budget.xls"))
            .expect("save");
    }

    let reopened = SessionStore::new(Arc::new(FileStore::new(dir.path()).expect("store")));
    let file = reopened.load_current_file().expect("restored file");
    assert_eq!(file.original_name, "budget.xls");
    assert_eq!(file.created_at, sample_file("budget.xls").created_at);
}

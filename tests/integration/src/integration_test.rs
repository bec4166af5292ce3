//! End-to-end tests across the public store API
//!
//! These exercise the store the way a pipeline stage uses it: build files in
//! a working folder, publish them atomically, then move whole folders between
//! stages with renames and hard links.

use pretty_assertions::assert_eq;
use std::io::Write;
use store_fs::{
    Error, FileType, LocalFileStore, StoreConfig, TempDisposition, file_name_from_path,
    validate_file_name_component,
};
use store_test_utils::store::TestStore;

#[test]
fn test_save_then_overwrite_scenario() {
    let temp = tempfile::tempdir().unwrap();
    let store = LocalFileStore::new(temp.path(), FileType::default(), false).unwrap();
    store.create_folder("a", false).unwrap();

    let written = store.save("a/report.txt", "hello").unwrap();
    assert_eq!(
        written.as_str(),
        format!("{}a/report.txt", store.storage_path())
    );
    assert_eq!(store.load_text("a/report.txt").unwrap(), "hello");

    store.save("a/report.txt", "world").unwrap();
    assert_eq!(store.load_text("a/report.txt").unwrap(), "world");
    assert_eq!(store.list_files("a", false).unwrap(), vec!["report.txt"]);
    assert!(store.list_dirs("a", false).unwrap().is_empty());
}

#[test]
fn test_staged_load_package_flow() {
    // set RUST_LOG=store_fs=debug to trace every filesystem step
    let _ = store_fs::logging::init("warn");
    let test = TestStore::new();
    let store = test.store();

    let load_id = "load_1700000000";
    validate_file_name_component(load_id).unwrap();

    // build the package in a working folder
    let working = format!("new/{load_id}");
    store.create_folder(&working, false).unwrap();
    for table in ["users", "orders"] {
        let mut temp = store.open_temp(TempDisposition::DeleteOnClose).unwrap();
        writeln!(temp, "{{\"table\": \"{table}\"}}").unwrap();
        temp.publish(format!("{working}/{table}.jsonl")).unwrap();
    }
    store
        .save(format!("{working}/manifest"), "users.jsonl\norders.jsonl\n")
        .unwrap();

    // promote the package in one rename
    store.create_folder("loaded", true).unwrap();
    store
        .atomic_rename(&working, format!("loaded/{load_id}"))
        .unwrap();

    assert!(!store.has_folder(&working).unwrap());
    let mut files = store
        .list_files(format!("loaded/{load_id}"), true)
        .unwrap();
    files.sort();
    assert_eq!(
        files,
        vec![
            format!("loaded/{load_id}/manifest"),
            format!("loaded/{load_id}/orders.jsonl"),
            format!("loaded/{load_id}/users.jsonl"),
        ]
    );
    assert_eq!(file_name_from_path(&files[1]), Some("orders.jsonl"));
    assert!(test.temp_leftovers().is_empty());

    // keep a copy under an archive folder without duplicating data
    store.create_folder("archive", false).unwrap();
    store
        .link_hard(&files[2], "archive/users.jsonl")
        .unwrap();
    store.delete_folder(format!("loaded/{load_id}"), true).unwrap();

    assert_eq!(
        store.load_text("archive/users.jsonl").unwrap(),
        "{\"table\": \"users\"}\n"
    );
}

#[test]
fn test_store_from_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let config_path = store_fs::NormalizedPath::new(temp.path().join("store.json"));
    let root = temp.path().join("binary-root");

    StoreConfig {
        mode: store_fs::ContentMode::Binary,
        create_if_missing: true,
        ..StoreConfig::new(&root)
    }
    .save(&config_path)
    .unwrap();

    let store = LocalFileStore::from_config(&StoreConfig::load(&config_path).unwrap()).unwrap();
    store.save("blob", &[1u8, 2, 3]).unwrap();

    assert_eq!(store.load_bytes("blob").unwrap(), vec![1, 2, 3]);
    assert!(matches!(
        store.save("text", "not bytes"),
        Err(Error::ModeMismatch { .. })
    ));
}

#[test]
fn test_two_stores_over_nested_roots_stay_confined() {
    let outer = TestStore::new();
    outer.with_dir("inner");
    let inner = LocalFileStore::new(outer.root().join("inner"), FileType::default(), false)
        .unwrap();

    inner.save("data.txt", "inner data").unwrap();

    let absolute = inner.resolve("data.txt").unwrap();
    assert!(outer.store().in_store(&absolute));
    assert_eq!(
        outer.store().to_relative(&absolute).unwrap().as_str(),
        "inner/data.txt"
    );
    assert!(matches!(
        inner.resolve(outer.root().join("sibling.txt")),
        Err(Error::PathOutsideStore { .. })
    ));
}

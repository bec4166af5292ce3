//! Snapshots of user-facing error messages.

use store_fs::{Error, Operation, validate_file_name_component};
use store_test_utils::store::TestStore;

fn redact(test: &TestStore, message: String) -> String {
    message
        .replace(test.store().root().as_str(), "[ROOT]")
        .replace('\\', "/")
}

#[test]
fn snapshot_name_error() {
    let err = validate_file_name_component("a.b").unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @r###"Invalid file name component "a.b": component name cannot contain . (dots)"###
    );
}

#[test]
fn snapshot_not_a_directory_error() {
    let test = TestStore::new();
    test.with_file("plain.txt", "x");

    let err = test.store().delete_folder("plain.txt", false).unwrap_err();

    insta::assert_snapshot!(redact(&test, err.to_string()), @"Not a directory: [ROOT]/plain.txt");
}

#[test]
fn snapshot_mode_mismatch_error() {
    let test = TestStore::with_file_type(store_fs::FileType::Binary);
    let err = test.store().save("blob", "text").unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"Store is in binary mode but received text data"
    );
}

#[test]
fn snapshot_io_error_names_operation() {
    let err = Error::io(
        Operation::LinkHard,
        "/data/a",
        std::io::Error::other("cross-device link"),
    );
    insta::assert_snapshot!(
        err.to_string(),
        @"I/O error during hard link at /data/a: cross-device link"
    );
}

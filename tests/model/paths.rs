//! Path addressing and validation.

use crate::common::*;

#[test]
fn missing_leading_slash_rejected_without_side_effects() {
    let root = test_root();

    let err = root.add(&ctx(), "devices", device("dev1"), "").unwrap_err();
    assert!(matches!(err, Error::InvalidPath { .. }));
    let err = root
        .update(&ctx(), "devices/dev1", device("dev1"), true, "")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPath { .. }));
    let err = root.remove(&ctx(), "devices/dev1", "").unwrap_err();
    assert!(matches!(err, Error::InvalidPath { .. }));

    // Nothing landed in the tree
    assert!(root.list(&ctx(), "/devices", 0, false, "").unwrap().is_empty());
}

#[test]
fn root_addressable_as_slash_and_empty() {
    let root = test_root();
    root.add(&ctx(), "/devices", device("dev1"), "").unwrap();

    let via_slash = root.get(&ctx(), "/", DEPTH_UNBOUNDED, false, "").unwrap();
    let via_empty = root.get(&ctx(), "", DEPTH_UNBOUNDED, false, "").unwrap();
    assert_eq!(via_slash, via_empty);
    assert_eq!(via_slash.type_name, "Root");
}

#[test]
fn unknown_path_is_not_found() {
    let root = test_root();
    let err = root.get(&ctx(), "/devices/ghost", 0, false, "").unwrap_err();
    assert!(err.is_not_found());
    let err = root.remove(&ctx(), "/devices/ghost", "").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn keys_resolve_numeric_and_string_fields() {
    let root = test_root();
    root.add(&ctx(), "/devices", device("dev1"), "").unwrap();
    root.add(&ctx(), "/devices/dev1/ports", port(7), "").unwrap();

    // Numeric key fields are addressed by their decimal rendering
    let got = root
        .get(&ctx(), "/devices/dev1/ports/7", 0, false, "")
        .unwrap();
    assert_eq!(got.value.field("port_no"), Some(&json!(7)));
}

#[test]
fn removing_whole_tree_rejected() {
    let root = test_root();
    let err = root.remove(&ctx(), "/", "").unwrap_err();
    assert!(matches!(err, Error::InvalidOperation(_)));
}

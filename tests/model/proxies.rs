//! Proxy binding, relative addressing, and exclusive claims.

use crate::common::*;

#[test]
fn proxy_operations_compose_bound_and_relative_paths() {
    let root = test_root();
    let top = root.create_proxy("/", false).unwrap();
    top.add(&ctx(), "/devices", device("dev1"), "").unwrap();

    let dev = top.create_proxy("/devices/dev1", false).unwrap();
    assert_eq!(dev.full_path(), "/devices/dev1");

    dev.add(&ctx(), "/ports", port(1), "").unwrap();
    dev.update(
        &ctx(),
        "/ports/1",
        Record::new("Port", json!({"label": "uplink"})),
        false,
        "",
    )
    .unwrap();

    let got = top
        .get(&ctx(), "/devices/dev1/ports/1", 0, false, "")
        .unwrap();
    assert_eq!(got.value.field("label"), Some(&json!("uplink")));

    let removed = dev.remove(&ctx(), "/ports/1", "").unwrap();
    assert_eq!(removed.value.field("port_no"), Some(&json!(1)));
}

#[test]
fn proxy_creation_requires_existing_target() {
    let root = test_root();
    let top = root.create_proxy("/", false).unwrap();
    let err = top.create_proxy("/devices/ghost", false).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn exclusive_claims_block_overlapping_prefixes() {
    let root = test_root();
    root.add(&ctx(), "/devices", device("dev1"), "").unwrap();
    root.add(&ctx(), "/devices", device("dev2"), "").unwrap();

    let _dev1 = root.create_proxy("/devices/dev1", true).unwrap();

    // Same subtree, ancestor, and descendant prefixes all conflict
    assert!(matches!(
        root.create_proxy("/devices/dev1", true).unwrap_err(),
        Error::ExclusiveConflict { .. }
    ));
    assert!(matches!(
        root.create_proxy("/", true).unwrap_err(),
        Error::ExclusiveConflict { .. }
    ));

    // A sibling subtree does not
    let _dev2 = root.create_proxy("/devices/dev2", true).unwrap();

    // Non-exclusive proxies are admitted anywhere
    let shared = root.create_proxy("/devices/dev1", false).unwrap();
    assert!(!shared.is_exclusive());
}

#[test]
fn dropping_exclusive_proxy_releases_claim() {
    let root = test_root();
    root.add(&ctx(), "/devices", device("dev1"), "").unwrap();

    let claimed = root.create_proxy("/devices/dev1", true).unwrap();
    assert!(claimed.is_exclusive());
    drop(claimed);

    root.create_proxy("/devices/dev1", true).unwrap();
}

#[test]
fn exclusive_flag_does_not_gate_other_writers() {
    // The claim is advisory toward other exclusive proxies; plain writes
    // through the root still land.
    let root = test_root();
    root.add(&ctx(), "/devices", device("dev1"), "").unwrap();
    let _dev = root.create_proxy("/devices/dev1", true).unwrap();

    root.update(
        &ctx(),
        "/devices/dev1",
        Record::new("Device", json!({"status": "down"})),
        false,
        "",
    )
    .unwrap();
}

//! Transaction branch lifecycle through the public handle.

use crate::common::*;
use confmodel::Transaction;

#[test]
fn staged_writes_invisible_until_commit() {
    let root = test_root();
    let proxy = root.create_proxy("/", false).unwrap();
    root.add(&ctx(), "/devices", device_with_status("dev1", "down"), "")
        .unwrap();

    let tx = proxy.open_transaction();
    tx.update(&ctx(), "/devices/dev1", device_with_status("dev1", "up"), true)
        .unwrap();
    tx.add(&ctx(), "/devices", device("dev2")).unwrap();

    // Main view unchanged
    let main = root.get(&ctx(), "/devices/dev1", 0, false, "").unwrap();
    assert_eq!(main.value.field("status"), Some(&json!("down")));
    assert_eq!(root.list(&ctx(), "/devices", 0, false, "").unwrap().len(), 1);

    // Branch sees its own writes in order
    let staged = tx.get(&ctx(), "/devices/dev1", 0, false).unwrap();
    assert_eq!(staged.value.field("status"), Some(&json!("up")));
    assert_eq!(tx.list(&ctx(), "/devices", 0, false).unwrap().len(), 2);

    tx.commit(&ctx()).unwrap();

    // Fold publishes everything at once
    let main = root.get(&ctx(), "/devices/dev1", 0, false, "").unwrap();
    assert_eq!(main.value.field("status"), Some(&json!("up")));
    assert_eq!(root.list(&ctx(), "/devices", 0, false, "").unwrap().len(), 2);
}

#[test]
fn cancel_discards_everything_staged() {
    let root = test_root();
    let proxy = root.create_proxy("/", false).unwrap();

    let tx = proxy.open_transaction();
    tx.add(&ctx(), "/devices", device("dev1")).unwrap();
    tx.remove(&ctx(), "/devices/dev1").unwrap();
    tx.add(&ctx(), "/devices", device("dev2")).unwrap();
    tx.cancel().unwrap();

    assert!(root.list(&ctx(), "/devices", 0, false, "").unwrap().is_empty());
}

#[test]
fn snapshot_taken_at_open() {
    let root = test_root();
    let proxy = root.create_proxy("/", false).unwrap();
    root.add(&ctx(), "/devices", device("dev1"), "").unwrap();

    let tx = proxy.open_transaction();

    // A main-tree write after the branch opened stays outside the branch
    root.add(&ctx(), "/devices", device("dev2"), "").unwrap();
    assert_eq!(tx.list(&ctx(), "/devices", 0, false).unwrap().len(), 1);
}

#[test]
fn terminal_transaction_rejects_all_operations() {
    let root = test_root();
    let proxy = root.create_proxy("/", false).unwrap();

    let committed = proxy.open_transaction();
    committed.commit(&ctx()).unwrap();
    assert_terminal(&committed, "committed");

    let cancelled = proxy.open_transaction();
    cancelled.cancel().unwrap();
    assert_terminal(&cancelled, "cancelled");
}

fn assert_terminal(tx: &Transaction, expected: &str) {
    let err = tx.get(&ctx(), "/", 0, false).unwrap_err();
    assert_tx_state(err, expected);
    let err = tx.list(&ctx(), "/devices", 0, false).unwrap_err();
    assert_tx_state(err, expected);
    let err = tx.add(&ctx(), "/devices", device("x")).unwrap_err();
    assert_tx_state(err, expected);
    let err = tx
        .update(&ctx(), "/devices/x", device("x"), true)
        .unwrap_err();
    assert_tx_state(err, expected);
    let err = tx.remove(&ctx(), "/devices/x").unwrap_err();
    assert_tx_state(err, expected);
    let err = tx.commit(&ctx()).unwrap_err();
    assert_tx_state(err, expected);
    let err = tx.cancel().unwrap_err();
    assert_tx_state(err, expected);
}

fn assert_tx_state(err: Error, expected: &str) {
    match err {
        Error::TransactionState { state, .. } => assert_eq!(state, expected),
        other => panic!("expected transaction-state error, got {other:?}"),
    }
}

#[test]
fn raw_txid_rejected_after_fold() {
    let root = test_root();
    let proxy = root.create_proxy("/", false).unwrap();

    let tx = proxy.open_transaction();
    let txid = tx.txid().to_string();
    tx.commit(&ctx()).unwrap();

    // The branch registry also rejects the stale id directly
    let err = root.get(&ctx(), "/", 0, false, &txid).unwrap_err();
    assert_tx_state(err, "committed");
}

#[test]
fn concurrent_branches_stay_isolated() {
    let root = test_root();
    let proxy = root.create_proxy("/", false).unwrap();

    // Open every branch before any thread runs, so each snapshot is the
    // same empty tree.
    let mut handles = Vec::new();
    for i in 0..4 {
        let tx = proxy.open_transaction();
        handles.push(std::thread::spawn(move || {
            for j in 0..10 {
                tx.add(
                    &OpContext::background(),
                    "/devices",
                    device(&format!("dev-{i}-{j}")),
                )
                .unwrap();
            }
            // Only this branch's writes are visible inside it
            assert_eq!(
                tx.list(&OpContext::background(), "/devices", 0, false)
                    .unwrap()
                    .len(),
                10
            );
            if i % 2 == 0 {
                tx.commit(&OpContext::background()).unwrap();
            } else {
                tx.cancel().unwrap();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    // Folds are whole-tree swaps; the surviving view is one committed
    // branch's ten devices.
    let listed = root.list(&ctx(), "/devices", 0, false, "").unwrap();
    assert_eq!(listed.len(), 10);
}

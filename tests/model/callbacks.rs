//! Callback dispatch through the proxy surface.

use crate::common::*;
use confmodel::OperationContext;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[test]
fn callbacks_observe_mutations_made_around_them() {
    let root = test_root();
    let proxy = root.create_proxy("/", false).unwrap();

    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = Arc::clone(&seen);
    proxy.register_callback(
        CallbackKind::PostAdd,
        Arc::new(move |_, args| {
            for arg in args {
                if let CallbackArg::Operation(oc) = arg {
                    sink.lock().unwrap().push(oc.path.clone());
                }
            }
            Ok(None)
        }),
        vec![],
    );

    proxy.add(&ctx(), "/devices", device("dev1"), "").unwrap();
    proxy
        .invoke_callbacks(
            &ctx(),
            CallbackKind::PostAdd,
            true,
            &[CallbackArg::Operation(OperationContext::new(
                "/devices/dev1",
                Some(device("dev1")),
                "devices",
                "dev1",
            ))],
        )
        .unwrap();

    assert_eq!(&*seen.lock().unwrap(), &["/devices/dev1".to_string()]);
}

#[test]
fn faulty_callback_does_not_block_peers_when_proceeding() {
    let root = test_root();
    let proxy = root.create_proxy("/", false).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    for fail in [false, true, false] {
        let counter = Arc::clone(&calls);
        proxy.register_callback(
            CallbackKind::PostUpdate,
            Arc::new(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                if fail {
                    Err(confmodel::CallbackError::new("observer rejected"))
                } else {
                    Ok(None)
                }
            }),
            vec![],
        );
    }

    let result = proxy.invoke_callbacks(&ctx(), CallbackKind::PostUpdate, true, &[]);
    // All three ran; the trailing success is the reported outcome
    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn failure_halts_dispatch_when_not_proceeding() {
    let root = test_root();
    let proxy = root.create_proxy("/", false).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    for fail in [true, false] {
        let counter = Arc::clone(&calls);
        proxy.register_callback(
            CallbackKind::PreRemove,
            Arc::new(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                if fail {
                    Err(confmodel::CallbackError::new("veto"))
                } else {
                    Ok(None)
                }
            }),
            vec![],
        );
    }

    let err = proxy
        .invoke_callbacks(&ctx(), CallbackKind::PreRemove, false, &[])
        .unwrap_err();
    assert!(matches!(err, Error::CallbackExecution { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn callback_failure_never_rolls_back_the_mutation() {
    let root = test_root();
    let proxy = root.create_proxy("/", false).unwrap();
    proxy.register_callback(
        CallbackKind::PostAdd,
        Arc::new(|_, _| Err(confmodel::CallbackError::new("always fails"))),
        vec![],
    );

    proxy.add(&ctx(), "/devices", device("dev1"), "").unwrap();
    let _ = proxy.invoke_callbacks(&ctx(), CallbackKind::PostAdd, true, &[]);

    // The add stands regardless of the observer outcome
    assert!(proxy.get(&ctx(), "/devices/dev1", 0, false, "").is_ok());
}

#[test]
fn keyed_registration_is_idempotent_per_proxy() {
    let root = test_root();
    let proxy = root.create_proxy("/", false).unwrap();

    let h1 = proxy.register_callback_keyed(
        CallbackKind::PostAdd,
        "inventory-sync",
        Arc::new(|_, _| Ok(None)),
        vec![],
    );
    let h2 = proxy.register_callback_keyed(
        CallbackKind::PostAdd,
        "inventory-sync",
        Arc::new(|_, _| Ok(None)),
        vec![],
    );
    assert_eq!(h1, h2);
    assert_eq!(proxy.callback_count(CallbackKind::PostAdd), 1);

    // Registries are per proxy, not shared through the root
    let other = root.create_proxy("/", false).unwrap();
    assert_eq!(other.callback_count(CallbackKind::PostAdd), 0);

    assert!(proxy.unregister_callback(CallbackKind::PostAdd, h1));
    assert!(!proxy.unregister_callback(CallbackKind::PostAdd, h1));
}

#[test]
fn callback_can_transform_its_arguments() {
    let root = test_root();
    let proxy = root.create_proxy("/", false).unwrap();
    proxy.register_callback(
        CallbackKind::PreUpdate,
        Arc::new(|_, args| match args {
            [CallbackArg::Operation(oc)] => {
                let enriched = oc.clone().update(Record::new(
                    "Device",
                    json!({"id": "dev1", "annotated": true}),
                ));
                Ok(Some(CallbackArg::Operation(enriched)))
            }
            _ => Ok(None),
        }),
        vec![],
    );

    let outcome = proxy
        .invoke_callbacks(
            &ctx(),
            CallbackKind::PreUpdate,
            false,
            &[CallbackArg::Operation(OperationContext::new(
                "/devices/dev1",
                None,
                "devices",
                "dev1",
            ))],
        )
        .unwrap();

    match outcome {
        Some(CallbackArg::Operation(oc)) => {
            assert_eq!(
                oc.data.unwrap().value.field("annotated"),
                Some(&json!(true))
            );
        }
        other => panic!("expected transformed operation context, got {other:?}"),
    }
}

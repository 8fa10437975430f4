//! Schema registry behavior observed through the store.

use crate::common::*;
use confmodel::{DescriptorSource, SchemaRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Source that counts how often it is consulted.
struct CountingSource {
    inner: StaticDescriptorSource,
    consultations: Arc<AtomicUsize>,
}

impl DescriptorSource for CountingSource {
    fn children_of(&self, type_name: &str) -> Vec<ChildDescriptor> {
        self.consultations.fetch_add(1, Ordering::SeqCst);
        self.inner.children_of(type_name)
    }
}

#[test]
fn descriptor_discovery_happens_once_per_type() {
    let consultations = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(SchemaRegistry::new(CountingSource {
        inner: StaticDescriptorSource::new()
            .with_type(
                "Root",
                vec![ChildDescriptor::many("devices", "Device", "id")],
            )
            .with_type(
                "Device",
                vec![ChildDescriptor::many("ports", "Port", "port_no")],
            ),
        consultations: Arc::clone(&consultations),
    }));
    let root = Root::new(registry.clone(), "Root").unwrap();

    for i in 0..20 {
        root.add(&ctx(), "/devices", device(&format!("dev{i}")), "")
            .unwrap();
        root.add(&ctx(), &format!("/devices/dev{i}/ports"), port(1), "")
            .unwrap();
        root.get(&ctx(), "/", DEPTH_UNBOUNDED, true, "").unwrap();
    }

    // One consultation per distinct type: Root, Device, Port
    assert_eq!(consultations.load(Ordering::SeqCst), 3);
    assert_eq!(registry.discovery_count(), 3);
}

#[test]
fn type_without_descriptors_is_a_leaf() {
    let root = test_root();
    root.add(&ctx(), "/devices", device("dev1"), "").unwrap();
    // Port declares no children; a deep get is just its payload
    root.add(&ctx(), "/devices/dev1/ports", port(1), "").unwrap();
    let got = root
        .get(&ctx(), "/devices/dev1/ports/1", DEPTH_UNBOUNDED, true, "")
        .unwrap();
    assert_eq!(got.value.field("port_no"), Some(&json!(1)));
}

#[test]
fn wrong_record_type_for_collection_rejected() {
    let root = test_root();
    let err = root
        .add(
            &ctx(),
            "/devices",
            Record::new("Port", json!({"port_no": 1, "id": "x"})),
            "",
        )
        .unwrap_err();
    assert!(matches!(err, Error::Schema { .. }));
}

#[test]
fn non_scalar_key_field_rejected() {
    let root = test_root();
    let err = root
        .add(
            &ctx(),
            "/devices",
            Record::new("Device", json!({"id": ["not", "scalar"]})),
            "",
        )
        .unwrap_err();
    assert!(matches!(err, Error::Schema { .. }));
}

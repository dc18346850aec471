use catalog_core::{
    CallContext, CatalogItem, CatalogItemInstance, CatalogItemInstanceListOptions,
    CatalogItemInstanceSpec, CatalogItemSpec, EntityKind, ErrorKind, JsonObject, ServiceType,
    Store, StoreError, UserValue,
};
use serde_json::json;
use std::thread;
use std::time::Duration;

fn seeded_store(catalog_items: &[&str]) -> Store {
    let store = Store::open_in_memory().unwrap();
    let ctx = CallContext::background();
    let mut spec = JsonObject::new();
    spec.insert("cpu".to_string(), json!(4));
    store
        .service_types()
        .create(&ctx, ServiceType::with_id("vm-1", "vm", spec))
        .unwrap();
    for id in catalog_items {
        store
            .catalog_items()
            .create(&ctx, CatalogItem::with_id(*id, *id, CatalogItemSpec::new("vm")))
            .unwrap();
    }
    store
}

fn instance(id: &str, catalog_item_id: &str) -> CatalogItemInstance {
    let mut spec = CatalogItemInstanceSpec::new(catalog_item_id);
    spec.user_values.push(UserValue::new("spec.cpu", 4));
    spec.user_values
        .push(UserValue::new("spec.tags", json!(["a", {"b": null}])));
    let mut instance = CatalogItemInstance::with_id(id, format!("{id} display"), spec);
    instance.service_type_instance_uid = Some(format!("uid-{id}"));
    instance
}

#[test]
fn create_then_get_round_trips() {
    let store = seeded_store(&["small-vm"]);
    let ctx = CallContext::background();

    let created = store
        .catalog_item_instances()
        .create(&ctx, instance("my-vm", "small-vm"))
        .unwrap();
    assert_eq!(created.path, "catalog-item-instances/my-vm");

    let loaded = store.catalog_item_instances().get(&ctx, "my-vm").unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.service_type_instance_uid.as_deref(), Some("uid-my-vm"));
    assert_eq!(loaded.spec.user_values[1].value, json!(["a", {"b": null}]));
}

#[test]
fn missing_service_type_instance_uid_round_trips_as_none() {
    let store = seeded_store(&["small-vm"]);
    let ctx = CallContext::background();
    let mut bare = instance("bare", "small-vm");
    bare.service_type_instance_uid = None;

    store.catalog_item_instances().create(&ctx, bare).unwrap();
    let loaded = store.catalog_item_instances().get(&ctx, "bare").unwrap();

    assert_eq!(loaded.service_type_instance_uid, None);
}

#[test]
fn duplicate_id_yields_instance_id_taken() {
    let store = seeded_store(&["small-vm"]);
    let ctx = CallContext::background();

    store
        .catalog_item_instances()
        .create(&ctx, instance("my-vm", "small-vm"))
        .unwrap();
    let err = store
        .catalog_item_instances()
        .create(&ctx, instance("my-vm", "small-vm"))
        .unwrap_err();

    assert!(matches!(err, StoreError::InstanceIdTaken));
}

#[test]
fn create_with_unknown_catalog_item_yields_reference_error() {
    let store = seeded_store(&["small-vm"]);
    let err = store
        .catalog_item_instances()
        .create(&CallContext::background(), instance("my-vm", "large-vm"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ReferencedCatalogItemMissing);
}

#[test]
fn update_changes_display_name_and_reference() {
    let store = seeded_store(&["small-vm", "large-vm"]);
    let ctx = CallContext::background();
    let mut created = store
        .catalog_item_instances()
        .create(&ctx, instance("my-vm", "small-vm"))
        .unwrap();

    thread::sleep(Duration::from_millis(5));
    created.display_name = "renamed".to_string();
    created.spec.catalog_item_id = "large-vm".to_string();
    created.service_type_instance_uid = Some("ignored".to_string());
    store.catalog_item_instances().update(&ctx, &created).unwrap();

    let loaded = store.catalog_item_instances().get(&ctx, "my-vm").unwrap();
    assert_eq!(loaded.display_name, "renamed");
    assert_eq!(loaded.create_time, created.create_time);
    assert!(loaded.update_time > created.update_time);
    assert_eq!(loaded.spec.catalog_item_id, "large-vm");
    assert_eq!(loaded.service_type_instance_uid.as_deref(), Some("uid-my-vm"));
}

#[test]
fn update_to_unknown_catalog_item_yields_reference_error() {
    let store = seeded_store(&["small-vm"]);
    let ctx = CallContext::background();
    let mut created = store
        .catalog_item_instances()
        .create(&ctx, instance("my-vm", "small-vm"))
        .unwrap();

    created.spec.catalog_item_id = "ghost".to_string();
    let err = store.catalog_item_instances().update(&ctx, &created).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ReferencedCatalogItemMissing);
}

#[test]
fn update_and_delete_of_missing_instance_yield_not_found() {
    let store = seeded_store(&["small-vm"]);
    let ctx = CallContext::background();

    let update_err = store
        .catalog_item_instances()
        .update(&ctx, &instance("ghost", "small-vm"))
        .unwrap_err();
    let delete_err = store
        .catalog_item_instances()
        .delete(&ctx, "ghost")
        .unwrap_err();

    for err in [update_err, delete_err] {
        assert!(matches!(
            err,
            StoreError::NotFound {
                entity: EntityKind::CatalogItemInstance
            }
        ));
    }
}

#[test]
fn list_filters_by_catalog_item_id() {
    let store = seeded_store(&["small-vm", "large-vm"]);
    let ctx = CallContext::background();
    for (id, catalog_item_id) in [("i3", "small-vm"), ("i1", "large-vm"), ("i2", "small-vm")] {
        store
            .catalog_item_instances()
            .create(&ctx, instance(id, catalog_item_id))
            .unwrap();
    }

    let small = store
        .catalog_item_instances()
        .list(
            &ctx,
            &CatalogItemInstanceListOptions {
                catalog_item_id: Some("small-vm".to_string()),
                ..CatalogItemInstanceListOptions::default()
            },
        )
        .unwrap();
    let ids: Vec<&str> = small.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["i2", "i3"]);
    assert!(small
        .items
        .iter()
        .all(|i| i.spec.catalog_item_id == "small-vm"));

    let all = store
        .catalog_item_instances()
        .list(&ctx, &CatalogItemInstanceListOptions::default())
        .unwrap();
    assert_eq!(all.items.len(), 3);
}

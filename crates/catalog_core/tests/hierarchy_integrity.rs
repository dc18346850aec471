use catalog_core::{
    CallContext, CatalogItem, CatalogItemInstance, CatalogItemInstanceListOptions,
    CatalogItemInstanceSpec, CatalogItemListOptions, CatalogItemSpec, ErrorKind, JsonObject,
    ServiceType, Store, StoreError,
};
use serde_json::json;
use std::collections::BTreeSet;

fn vm_spec() -> JsonObject {
    json!({"cpu": {"default": 2}}).as_object().cloned().unwrap()
}

#[test]
fn example_scenario_blocks_delete_until_instance_is_gone() {
    let store = Store::open_in_memory().unwrap();
    let ctx = CallContext::background();

    store
        .service_types()
        .create(&ctx, ServiceType::with_id("vm-1", "vm", vm_spec()))
        .unwrap();
    store
        .catalog_items()
        .create(
            &ctx,
            CatalogItem::with_id("small-vm", "Small VM", CatalogItemSpec::new("vm")),
        )
        .unwrap();
    store
        .catalog_item_instances()
        .create(
            &ctx,
            CatalogItemInstance::with_id(
                "my-vm",
                "My VM",
                CatalogItemInstanceSpec::new("small-vm"),
            ),
        )
        .unwrap();

    assert_eq!(store.service_types().get(&ctx, "vm-1").unwrap().service_type, "vm");
    assert_eq!(
        store.catalog_items().get(&ctx, "small-vm").unwrap().spec.service_type,
        "vm"
    );
    assert_eq!(
        store
            .catalog_item_instances()
            .get(&ctx, "my-vm")
            .unwrap()
            .spec
            .catalog_item_id,
        "small-vm"
    );

    let err = store.catalog_items().delete(&ctx, "small-vm").unwrap_err();
    assert!(matches!(err, StoreError::HasDependents));
    assert!(store.catalog_items().get(&ctx, "small-vm").is_ok());

    store.catalog_item_instances().delete(&ctx, "my-vm").unwrap();
    store.catalog_items().delete(&ctx, "small-vm").unwrap();
    assert!(store
        .catalog_items()
        .get(&ctx, "small-vm")
        .unwrap_err()
        .is(ErrorKind::NotFound));
}

#[test]
fn paging_catalog_items_visits_every_row_once() {
    let store = Store::open_in_memory().unwrap();
    let ctx = CallContext::background();
    store
        .service_types()
        .create(&ctx, ServiceType::with_id("vm-1", "vm", vm_spec()))
        .unwrap();

    let mut expected = BTreeSet::new();
    for index in 0..23 {
        let item = store
            .catalog_items()
            .create(
                &ctx,
                CatalogItem::new(format!("item {index}"), CatalogItemSpec::new("vm")),
            )
            .unwrap();
        expected.insert(item.id);
    }

    let mut seen = Vec::new();
    let mut token = None;
    let mut pages = 0;
    loop {
        let page = store
            .catalog_items()
            .list(
                &ctx,
                &CatalogItemListOptions {
                    page_token: token.take(),
                    page_size: Some(5),
                    service_type: None,
                },
            )
            .unwrap();
        pages += 1;
        assert!(page.items.len() <= 5);
        seen.extend(page.items.into_iter().map(|item| item.id));
        match page.next_page_token {
            Some(next) => {
                assert!(!next.is_empty());
                token = Some(next);
            }
            None => break,
        }
    }

    assert_eq!(pages, 5);
    assert_eq!(seen.len(), expected.len());
    let mut sorted = seen.clone();
    sorted.sort();
    assert_eq!(seen, sorted, "pages must follow id order");
    assert_eq!(seen.into_iter().collect::<BTreeSet<_>>(), expected);
}

#[test]
fn paging_instances_with_filter_visits_only_matching_rows() {
    let store = Store::open_in_memory().unwrap();
    let ctx = CallContext::background();
    store
        .service_types()
        .create(&ctx, ServiceType::with_id("vm-1", "vm", vm_spec()))
        .unwrap();
    for id in ["small-vm", "large-vm"] {
        store
            .catalog_items()
            .create(&ctx, CatalogItem::with_id(id, id, CatalogItemSpec::new("vm")))
            .unwrap();
    }
    for index in 0..7 {
        let parent = if index % 2 == 0 { "small-vm" } else { "large-vm" };
        store
            .catalog_item_instances()
            .create(
                &ctx,
                CatalogItemInstance::with_id(
                    format!("inst-{index}"),
                    "instance",
                    CatalogItemInstanceSpec::new(parent),
                ),
            )
            .unwrap();
    }

    let mut seen = Vec::new();
    let mut token = None;
    loop {
        let page = store
            .catalog_item_instances()
            .list(
                &ctx,
                &CatalogItemInstanceListOptions {
                    page_token: token.take(),
                    page_size: Some(2),
                    catalog_item_id: Some("small-vm".to_string()),
                },
            )
            .unwrap();
        seen.extend(page.items.into_iter().map(|instance| instance.id));
        match page.next_page_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    assert_eq!(seen, vec!["inst-0", "inst-2", "inst-4", "inst-6"]);
}

#[test]
fn catalog_items_reference_service_types_by_natural_key() {
    let store = Store::open_in_memory().unwrap();
    let ctx = CallContext::background();
    store
        .service_types()
        .create(&ctx, ServiceType::with_id("vm-1", "vm", vm_spec()))
        .unwrap();

    // The reference is the natural key, not the id.
    let err = store
        .catalog_items()
        .create(
            &ctx,
            CatalogItem::with_id("by-id", "By id", CatalogItemSpec::new("vm-1")),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ReferencedServiceTypeMissing);
}

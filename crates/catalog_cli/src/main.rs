//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load configuration, open the configured store and print the first page
//!   of every entity kind.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `catalog_cli [CONFIG_FILE]`

use catalog_core::{
    init_from_config, CallContext, CatalogConfig, CatalogItemInstanceListOptions,
    CatalogItemListOptions, ServiceTypeListOptions, Store,
};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("catalog_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config_file = std::env::args_os().nth(1).map(PathBuf::from);
    let config = CatalogConfig::load(config_file.as_deref()).map_err(|err| err.to_string())?;
    init_from_config(&config.logging).map_err(|err| err.to_string())?;

    println!("catalog_core version={}", catalog_core::core_version());
    println!("database={}", config.database.name);

    let store = Store::open(&config.database).map_err(|err| err.to_string())?;
    let ctx = CallContext::background();

    let service_types = store
        .service_types()
        .list(&ctx, &ServiceTypeListOptions::default())
        .map_err(|err| err.to_string())?;
    for service_type in &service_types.items {
        println!("service_type id={} name={}", service_type.id, service_type.service_type);
    }

    let catalog_items = store
        .catalog_items()
        .list(&ctx, &CatalogItemListOptions::default())
        .map_err(|err| err.to_string())?;
    for item in &catalog_items.items {
        println!(
            "catalog_item id={} service_type={} display_name={}",
            item.id, item.spec.service_type, item.display_name
        );
    }

    let instances = store
        .catalog_item_instances()
        .list(&ctx, &CatalogItemInstanceListOptions::default())
        .map_err(|err| err.to_string())?;
    for instance in &instances.items {
        println!(
            "catalog_item_instance id={} catalog_item_id={} display_name={}",
            instance.id, instance.spec.catalog_item_id, instance.display_name
        );
    }

    log::info!(
        "event=cli_summary module=cli status=ok service_types={} catalog_items={} instances={}",
        service_types.items.len(),
        catalog_items.items.len(),
        instances.items.len()
    );
    store.close();
    Ok(())
}

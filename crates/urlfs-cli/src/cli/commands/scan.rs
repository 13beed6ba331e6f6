//! `urlfs scan` – discover plug-in modules under the configured folders.

use anyhow::Result;
use std::sync::Arc;
use urlfs_core::config::UrlfsConfig;
use urlfs_core::filetype::FileTypeRegistry;
use urlfs_core::fs::native::native_file_system;
use urlfs_core::plugins::{NativeModuleFactory, PlugInCollection};
use urlfs_core::settings::Settings;
use urlfs_core::url::{KindHint, Url};

pub fn run_scan(cfg: &UrlfsConfig, extra_folders: &[String]) -> Result<()> {
    let name = cfg.collection_name.as_deref().unwrap_or("Plugins");
    let settings = Settings::open_default(name)?;

    let mut collection = PlugInCollection::new(
        name,
        Box::new(NativeModuleFactory),
        Arc::new(native_file_system()),
        Arc::new(FileTypeRegistry::with_defaults()),
        settings,
    );
    collection.enable_blocklist(cfg.blocklist_enabled);

    let mut folders = 0;
    for path in cfg.search_paths.iter().chain(extra_folders) {
        let url = Url::from_native_path(path, KindHint::Folder);
        if url.is_empty() {
            tracing::warn!("ignoring unusable search path {:?}", path);
            continue;
        }
        if collection.add_search_path(&url) {
            folders += 1;
        }
    }
    if folders == 0 {
        println!("No search paths; add some to config.toml or pass --folder.");
        return Ok(());
    }

    let stats = collection.scan_folders(None);

    println!("{:<10} {}", "STATUS", "MODULE");
    for module in collection.modules() {
        println!("{:<10} {}", "ok", module.path().display_string());
    }
    println!(
        "{} module(s): {} from cache, {} registered, {} discarded",
        stats.accepted(),
        stats.restored,
        stats.registered,
        stats.discarded
    );

    collection.save_paths(None);
    collection.flush_settings();
    Ok(())
}

//! `urlfs blocklist` – inspect and edit the plug-in block-list.

use anyhow::Result;
use clap::Subcommand;
use std::sync::Arc;
use urlfs_core::config::UrlfsConfig;
use urlfs_core::filetype::FileTypeRegistry;
use urlfs_core::fs::native::native_file_system;
use urlfs_core::plugins::{NativeModuleFactory, PlugInCollection};
use urlfs_core::settings::Settings;

#[derive(Debug, Subcommand)]
pub enum BlocklistAction {
    /// Show all modules currently marked unstable.
    List,

    /// Mark a module stable again by its settings identifier.
    Remove {
        /// Identifier as printed by `blocklist list`.
        id: String,
    },

    /// Forget every block-list entry.
    Reset,
}

pub fn run_blocklist(cfg: &UrlfsConfig, action: BlocklistAction) -> Result<()> {
    let name = cfg.collection_name.as_deref().unwrap_or("Plugins");
    let mut collection = PlugInCollection::new(
        name,
        Box::new(NativeModuleFactory),
        Arc::new(native_file_system()),
        Arc::new(FileTypeRegistry::with_defaults()),
        Settings::open_default(name)?,
    );

    match action {
        BlocklistAction::List => {
            let entries = collection.blocklist_content();
            if entries.is_empty() {
                println!("Block-list is empty.");
            } else {
                for id in entries {
                    println!("{}", id);
                }
            }
        }
        BlocklistAction::Remove { id } => {
            collection.remove_from_blocklist(&id);
            println!("{} marked stable again", id);
        }
        BlocklistAction::Reset => {
            collection.reset_blocklist();
            println!("Block-list cleared.");
        }
    }

    collection.flush_settings();
    Ok(())
}

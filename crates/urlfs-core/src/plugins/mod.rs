//! Plug-in discovery, metadata caching and the block-list.
//!
//! A `PlugInCollection` walks its search-path folders for module files,
//! deduplicates them by resolved path, and caches per-module metadata in
//! a settings store keyed by a path-hash identifier. The cache is
//! trusted only while the stored modification timestamp exactly matches
//! the file on disk, so modules are re-inspected exactly when they
//! change. A separate block-list store remembers modules that proved
//! unstable; the intended workflow marks a module dirty before a risky
//! load and flips it back to clean once it survived, so a crash
//! mid-load leaves the mark in place for the next launch.
//!
//! A collection instance is single-threaded; wrap it with external
//! locking when several threads must share one.

#[cfg(test)]
mod tests;

use crate::filetype::FileTypeRegistry;
use crate::fs::FileSystem;
use crate::module::{Module, NativeModule};
use crate::progress::ProgressNotify;
use crate::settings::Settings;
use crate::url::Url;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Extra extension accepted as a module candidate regardless of the
/// registry (macOS libraries showing up in foreign folders).
const EXTRA_MODULE_EXTENSION: &str = "dylib";

const MODIFIED_KEY: &str = "modified";
const CLEAN_KEY: &str = "clean";
const SEARCH_PATHS_KEY: &str = "searchPaths";
const MODULES_KEY: &str = "modules";

/// Settings identifier for a module path: eight hex digits of the
/// parent-folder hash, a separator, and the bare file name. The format
/// is part of the persisted cache contract.
pub fn settings_id(url: &Url) -> String {
    let digest = Sha256::digest(url.parent_path().as_bytes());
    format!("{}/{}", hex::encode(&digest[..4]), url.name(true))
}

/// Creation and inspection seam for discovered modules.
pub trait ModuleFactory {
    /// Wrap a candidate path in a module instance.
    fn create_module(&self, url: &Url) -> Box<dyn Module>;

    /// Fresh registration of a changed or unseen module: inspect it
    /// (typically by loading) and persist its metadata under
    /// `settings_id`. Returning `false` discards the module. The default
    /// probes loadability and releases the image again.
    fn register_module(
        &mut self,
        module: &mut dyn Module,
        _settings: &Settings,
        _settings_id: &str,
    ) -> bool {
        let loaded = module.load();
        if loaded {
            module.unload();
        }
        loaded
    }

    /// Accept cached metadata for an unchanged module. The timestamp has
    /// already been validated when this runs.
    fn restore_module(
        &mut self,
        _module: &mut dyn Module,
        _settings: &Settings,
        _settings_id: &str,
    ) -> bool {
        true
    }
}

/// Factory producing plain native modules.
#[derive(Debug, Default)]
pub struct NativeModuleFactory;

impl ModuleFactory for NativeModuleFactory {
    fn create_module(&self, url: &Url) -> Box<dyn Module> {
        Box::new(NativeModule::new(url.clone()))
    }
}

/// Result of one folder scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Modules accepted from the metadata cache.
    pub restored: usize,
    /// Modules registered fresh.
    pub registered: usize,
    /// Candidates discarded (failed registration or blocked).
    pub discarded: usize,
}

impl ScanStats {
    pub fn accepted(&self) -> usize {
        self.restored + self.registered
    }

    fn absorb(&mut self, other: ScanStats) {
        self.restored += other.restored;
        self.registered += other.registered;
        self.discarded += other.discarded;
    }
}

/// Ordered set of search paths plus the modules discovered under them.
pub struct PlugInCollection {
    name: String,
    factory: Box<dyn ModuleFactory>,
    fs: Arc<dyn FileSystem>,
    registry: Arc<FileTypeRegistry>,
    settings: Settings,
    blocklist: Option<Settings>,
    blocklist_name: String,
    blocklist_enabled: bool,
    search_paths: Vec<Url>,
    modules: Vec<Box<dyn Module>>,
}

impl PlugInCollection {
    pub fn new(
        name: &str,
        factory: Box<dyn ModuleFactory>,
        fs: Arc<dyn FileSystem>,
        registry: Arc<FileTypeRegistry>,
        settings: Settings,
    ) -> PlugInCollection {
        PlugInCollection {
            name: name.to_string(),
            factory,
            fs,
            registry,
            settings,
            blocklist: None,
            blocklist_name: format!("{}Blocklist", name),
            blocklist_enabled: false,
            search_paths: Vec::new(),
            modules: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Register a search-path folder; duplicates are refused.
    pub fn add_search_path(&mut self, url: &Url) -> bool {
        if self.search_paths.iter().any(|p| p.is_equal_url(url, false)) {
            return false;
        }
        self.search_paths.push(url.clone());
        true
    }

    pub fn search_paths(&self) -> &[Url] {
        &self.search_paths
    }

    pub fn modules(&self) -> impl Iterator<Item = &dyn Module> {
        self.modules.iter().map(|m| m.as_ref())
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn contains_module(&self, url: &Url) -> bool {
        self.modules
            .iter()
            .any(|m| m.path().is_equal_url(url, false))
    }

    /// Drop a module from the collection (its cache entry stays).
    pub fn remove_module(&mut self, url: &Url) -> bool {
        let before = self.modules.len();
        self.modules.retain(|m| !m.path().is_equal_url(url, false));
        self.modules.len() != before
    }

    /// Scan every registered search path recursively.
    pub fn scan_folders(&mut self, progress: Option<&dyn ProgressNotify>) -> ScanStats {
        let mut stats = ScanStats::default();
        for folder in self.search_paths.clone() {
            stats.absorb(self.scan_folder(&folder, true, progress));
        }
        stats
    }

    /// Scan one folder. Module candidates are taken as opaque entries
    /// even when they are bundles (folders); other folders are descended
    /// into when `recursive` is set. Cancellation is checked between
    /// entries.
    pub fn scan_folder(
        &mut self,
        folder: &Url,
        recursive: bool,
        progress: Option<&dyn ProgressNotify>,
    ) -> ScanStats {
        let mut stats = ScanStats::default();
        let Some(entries) = self.fs.read_folder(folder) else {
            return stats;
        };

        for entry in entries {
            if progress.map_or(false, |p| p.is_canceled()) {
                break;
            }
            if self.is_module(&entry) {
                self.consider_candidate(&entry, &mut stats);
            } else if entry.is_folder() && recursive {
                stats.absorb(self.scan_folder(&entry, true, progress));
            }
        }
        stats
    }

    /// Whether a URL looks like a loadable module: its extension matches
    /// the registered module type, or the extra `.dylib` check.
    pub fn is_module(&self, url: &Url) -> bool {
        let Some(ext) = url.extension() else {
            return false;
        };
        if let Some(module_type) = self.registry.module_type() {
            if module_type.extension().eq_ignore_ascii_case(&ext) {
                return true;
            }
        }
        ext.eq_ignore_ascii_case(EXTRA_MODULE_EXTENSION)
    }

    fn consider_candidate(&mut self, url: &Url, stats: &mut ScanStats) {
        // dedup by resolved identity so links to one module count once
        let resolved = self.fs.resolve(url);
        if self.contains_module(&resolved) {
            return;
        }
        let module = self.factory.create_module(&resolved);
        self.scan_module(module, stats);
    }

    /// Restore-or-register one module and take ownership on success.
    fn scan_module(&mut self, mut module: Box<dyn Module>, stats: &mut ScanStats) {
        let url = module.path().clone();
        let id = settings_id(&url);

        let Some(modified) = self.fs.file_info(&url).and_then(|info| info.modified) else {
            tracing::warn!("module {} has no readable modification time", url);
            stats.discarded += 1;
            return;
        };

        let cached = self.settings.get_time(&id, MODIFIED_KEY);
        if cached == Some(modified)
            && self
                .factory
                .restore_module(module.as_mut(), &self.settings, &id)
        {
            tracing::debug!("module {} restored from cache", url);
            self.modules.push(module);
            stats.restored += 1;
            return;
        }

        if self.blocklist_enabled && !self.check_blocklist(&id, &url.name(false)) {
            stats.discarded += 1;
            return;
        }

        self.settings.set_time(&id, MODIFIED_KEY, modified);
        if self
            .factory
            .register_module(module.as_mut(), &self.settings, &id)
        {
            tracing::debug!("module {} registered", url);
            self.modules.push(module);
            stats.registered += 1;
        } else {
            // the entry written above would otherwise look like a valid cache
            self.settings.remove(&id);
            stats.discarded += 1;
        }
    }

    /// Persist search paths and module paths under `"<name> Paths"`.
    /// `filter` limits which modules are saved.
    pub fn save_paths(&self, filter: Option<&dyn Fn(&dyn Module) -> bool>) {
        let section = self.paths_section();
        self.settings.remove(&section);
        for path in &self.search_paths {
            self.settings
                .queue(&section, SEARCH_PATHS_KEY, &path.to_url_string(false));
        }
        for module in &self.modules {
            if filter.map_or(true, |f| f(module.as_ref())) {
                self.settings.queue(
                    &section,
                    MODULES_KEY,
                    &module.path().to_url_string(false),
                );
            }
        }
    }

    /// Restore search paths and previously saved modules. Restored
    /// modules go through the normal cache validation.
    pub fn restore_paths(&mut self) -> bool {
        let section = self.paths_section();
        if !self.settings.contains(&section) {
            return false;
        }

        for path in self.settings.queue_items(&section, SEARCH_PATHS_KEY) {
            let url = Url::parse(&path);
            if !url.is_empty() {
                self.add_search_path(&url);
            }
        }
        for path in self.settings.queue_items(&section, MODULES_KEY) {
            let url = Url::parse(&path);
            if url.is_empty() || self.contains_module(&url) {
                continue;
            }
            let module = self.factory.create_module(&url);
            let mut stats = ScanStats::default();
            self.scan_module(module, &mut stats);
        }
        true
    }

    pub fn enable_blocklist(&mut self, enabled: bool) -> bool {
        let was = self.blocklist_enabled;
        self.blocklist_enabled = enabled;
        was
    }

    pub fn is_blocklist_enabled(&self) -> bool {
        self.blocklist_enabled
    }

    /// Whether a module may be used: `true`/missing means clean, `false`
    /// means blocked (and a warning is logged with the display name).
    pub fn check_blocklist(&mut self, settings_id: &str, display_name: &str) -> bool {
        let clean = self
            .blocklist_store()
            .get_bool(settings_id, CLEAN_KEY)
            .unwrap_or(true);
        if !clean {
            tracing::warn!(
                "The plug-in \"{}\" was disabled because it previously failed to load",
                display_name
            );
        }
        clean
    }

    /// Mark a module unstable: its metadata cache entry is dropped and
    /// its block-list flag goes dirty.
    pub fn add_to_blocklist(&mut self, settings_id: &str) {
        self.settings.remove(settings_id);
        self.blocklist_store().set_bool(settings_id, CLEAN_KEY, false);
    }

    /// Mark a module stable again.
    pub fn remove_from_blocklist(&mut self, settings_id: &str) {
        self.blocklist_store().set_bool(settings_id, CLEAN_KEY, true);
    }

    /// Identifiers currently marked dirty.
    pub fn blocklist_content(&mut self) -> Vec<String> {
        let store = self.blocklist_store();
        store
            .section_keys()
            .into_iter()
            .filter(|id| store.get_bool(id, CLEAN_KEY) == Some(false))
            .collect()
    }

    /// Forget every block-list entry.
    pub fn reset_blocklist(&mut self) {
        self.blocklist_store().clear();
    }

    /// Write both stores out.
    pub fn flush_settings(&mut self) -> bool {
        let mut ok = self.settings.flush();
        if let Some(blocklist) = &self.blocklist {
            ok &= blocklist.flush();
        }
        ok
    }

    /// The block-list store lives apart from the main cache and is only
    /// created once actually used.
    fn blocklist_store(&mut self) -> &Settings {
        if self.blocklist.is_none() {
            let store = match self.settings.path() {
                Some(path) => {
                    let file = path.with_file_name(format!("{}.json", self.blocklist_name));
                    Settings::open(file)
                }
                None => Settings::in_memory(),
            };
            self.blocklist = Some(store);
        }
        self.blocklist.as_ref().unwrap()
    }

    fn paths_section(&self) -> String {
        format!("{} Paths", self.name)
    }
}

impl Drop for PlugInCollection {
    fn drop(&mut self) {
        self.flush_settings();
    }
}

use super::*;
use crate::fs::native::native_file_system;
use crate::module::Module;
use crate::progress::CancelFlag;
use crate::url::{KindHint, Url};
use std::cell::Cell;
use std::rc::Rc;

/// Module stand-in whose image is imaginary; nothing is ever dlopened.
struct FakeModule {
    path: Url,
    loaded: bool,
}

impl Module for FakeModule {
    fn path(&self) -> &Url {
        &self.path
    }

    fn load_image(&mut self) -> bool {
        self.loaded = true;
        true
    }

    fn unload_image(&mut self) {
        self.loaded = false;
    }

    fn image_loaded(&self) -> bool {
        self.loaded
    }
}

/// Factory that counts hook invocations and can be told to fail
/// registration.
#[derive(Clone, Default)]
struct Counters {
    registered: Rc<Cell<usize>>,
    restored: Rc<Cell<usize>>,
    fail_register: Rc<Cell<bool>>,
}

struct CountingFactory {
    counters: Counters,
}

impl ModuleFactory for CountingFactory {
    fn create_module(&self, url: &Url) -> Box<dyn Module> {
        Box::new(FakeModule {
            path: url.clone(),
            loaded: false,
        })
    }

    fn register_module(
        &mut self,
        _module: &mut dyn Module,
        settings: &Settings,
        settings_id: &str,
    ) -> bool {
        self.counters.registered.set(self.counters.registered.get() + 1);
        if self.counters.fail_register.get() {
            return false;
        }
        settings.set_string(settings_id, "name", "fake");
        true
    }

    fn restore_module(
        &mut self,
        _module: &mut dyn Module,
        _settings: &Settings,
        _settings_id: &str,
    ) -> bool {
        self.counters.restored.set(self.counters.restored.get() + 1);
        true
    }
}

fn collection_over(
    dir: &std::path::Path,
    settings: Settings,
    counters: Counters,
) -> PlugInCollection {
    let mut collection = PlugInCollection::new(
        "Plugins",
        Box::new(CountingFactory { counters }),
        Arc::new(native_file_system()),
        Arc::new(FileTypeRegistry::with_defaults()),
        settings,
    );
    let folder = Url::from_native_path(&dir.to_string_lossy(), KindHint::Folder);
    assert!(collection.add_search_path(&folder));
    collection
}

fn touch_module(dir: &std::path::Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"\x7fELF fake module").unwrap();
    path
}

#[test]
fn settings_id_format_is_hash_slash_name() {
    let url = Url::from_parts("file", "", "opt/plugins/echo.so", KindHint::File);
    let id = settings_id(&url);

    let (hash, name) = id.split_once('/').unwrap();
    assert_eq!(hash.len(), 8);
    assert!(hash.bytes().all(|b| b.is_ascii_hexdigit()));
    assert_eq!(name, "echo.so");

    // stable across calls, distinct across parents
    assert_eq!(id, settings_id(&url));
    let elsewhere = Url::from_parts("file", "", "usr/lib/echo.so", KindHint::File);
    assert_ne!(id, settings_id(&elsewhere));
}

#[test]
fn scan_registers_new_modules_and_skips_other_files() {
    let dir = tempfile::tempdir().unwrap();
    touch_module(dir.path(), "alpha.so");
    touch_module(dir.path(), "beta.so");
    std::fs::write(dir.path().join("readme.txt"), b"not a module").unwrap();

    let counters = Counters::default();
    let mut collection = collection_over(dir.path(), Settings::in_memory(), counters.clone());
    let stats = collection.scan_folders(None);

    assert_eq!(stats.registered, 2);
    assert_eq!(stats.restored, 0);
    assert_eq!(collection.module_count(), 2);
    assert_eq!(counters.registered.get(), 2);
}

#[test]
fn scan_recurses_into_subfolders() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
    touch_module(&dir.path().join("nested/deeper"), "deep.so");

    let counters = Counters::default();
    let mut collection = collection_over(dir.path(), Settings::in_memory(), counters);
    let stats = collection.scan_folders(None);
    assert_eq!(stats.accepted(), 1);
}

#[test]
fn dylib_accepted_by_extension_only() {
    let dir = tempfile::tempdir().unwrap();
    touch_module(dir.path(), "foreign.dylib");

    let counters = Counters::default();
    let mut collection = collection_over(dir.path(), Settings::in_memory(), counters);
    let stats = collection.scan_folders(None);
    assert_eq!(stats.accepted(), 1);
}

#[test]
fn cache_hit_and_invalidation_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = tempfile::tempdir().unwrap();
    let store_path = store_dir.path().join("plugins.json");
    let module_path = touch_module(dir.path(), "cached.so");

    // first scan: cache miss, registration runs
    let first = Counters::default();
    {
        let mut collection =
            collection_over(dir.path(), Settings::open(&store_path), first.clone());
        let stats = collection.scan_folders(None);
        assert_eq!(stats.registered, 1);
        assert_eq!(first.restored.get(), 0);
    } // drop flushes the store

    // second instance over the same store: timestamp matches, cache hit
    let second = Counters::default();
    {
        let mut collection =
            collection_over(dir.path(), Settings::open(&store_path), second.clone());
        let stats = collection.scan_folders(None);
        assert_eq!(stats.restored, 1);
        assert_eq!(second.registered.get(), 0);
        assert_eq!(second.restored.get(), 1);
    }

    // touch the file: third scan must re-register
    let newer = std::time::SystemTime::now() + std::time::Duration::from_secs(7);
    std::fs::File::options()
        .write(true)
        .open(&module_path)
        .unwrap()
        .set_modified(newer)
        .unwrap();

    let third = Counters::default();
    {
        let mut collection =
            collection_over(dir.path(), Settings::open(&store_path), third.clone());
        let stats = collection.scan_folders(None);
        assert_eq!(stats.registered, 1);
        assert_eq!(third.restored.get(), 0);
    }
}

#[test]
fn failed_registration_removes_the_cache_entry() {
    let dir = tempfile::tempdir().unwrap();
    touch_module(dir.path(), "bad.so");

    let counters = Counters::default();
    counters.fail_register.set(true);
    let settings = Settings::in_memory();
    let mut collection = collection_over(dir.path(), settings.clone(), counters);
    let stats = collection.scan_folders(None);

    assert_eq!(stats.discarded, 1);
    assert_eq!(collection.module_count(), 0);

    let url = Url::from_native_path(&dir.path().join("bad.so").to_string_lossy(), KindHint::File);
    let resolved = native_file_system().resolve(&url);
    assert!(!settings.contains(&settings_id(&resolved)));
}

#[cfg(unix)]
#[test]
fn symlinked_duplicates_are_deduplicated() {
    let dir = tempfile::tempdir().unwrap();
    let real = touch_module(dir.path(), "real.so");
    std::os::unix::fs::symlink(&real, dir.path().join("alias.so")).unwrap();

    let counters = Counters::default();
    let mut collection = collection_over(dir.path(), Settings::in_memory(), counters);
    let stats = collection.scan_folders(None);

    assert_eq!(stats.accepted(), 1);
    assert_eq!(collection.module_count(), 1);
}

#[test]
fn duplicate_search_paths_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Counters::default();
    let mut collection = collection_over(dir.path(), Settings::in_memory(), counters);

    let folder = Url::from_native_path(&dir.path().to_string_lossy(), KindHint::Folder);
    assert!(!collection.add_search_path(&folder)); // already added by helper
    assert_eq!(collection.search_paths().len(), 1);
}

#[test]
fn canceled_scan_stops_between_entries() {
    let dir = tempfile::tempdir().unwrap();
    touch_module(dir.path(), "one.so");
    touch_module(dir.path(), "two.so");

    let counters = Counters::default();
    let mut collection = collection_over(dir.path(), Settings::in_memory(), counters);

    let flag = CancelFlag::new();
    flag.cancel();
    let stats = collection.scan_folders(Some(&flag));
    assert_eq!(stats.accepted(), 0);
}

#[test]
fn blocklist_gates_and_logs() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Counters::default();
    let mut collection = collection_over(dir.path(), Settings::in_memory(), counters);

    let id = "deadbeef/shaky.so";
    assert!(collection.check_blocklist(id, "shaky")); // unknown: clean

    collection.add_to_blocklist(id);
    assert!(!collection.check_blocklist(id, "shaky"));
    assert_eq!(collection.blocklist_content(), vec![id.to_string()]);

    collection.remove_from_blocklist(id);
    assert!(collection.check_blocklist(id, "shaky"));
}

#[test]
fn add_to_blocklist_drops_the_metadata_cache() {
    let dir = tempfile::tempdir().unwrap();
    touch_module(dir.path(), "shaky.so");

    let counters = Counters::default();
    let settings = Settings::in_memory();
    let mut collection = collection_over(dir.path(), settings.clone(), counters);
    collection.scan_folders(None);

    let url = Url::from_native_path(
        &dir.path().join("shaky.so").to_string_lossy(),
        KindHint::File,
    );
    let id = settings_id(&native_file_system().resolve(&url));
    assert!(settings.contains(&id));

    collection.add_to_blocklist(&id);
    assert!(!settings.contains(&id));
}

#[test]
fn blocked_module_is_skipped_during_scan() {
    let dir = tempfile::tempdir().unwrap();
    touch_module(dir.path(), "unstable.so");

    let url = Url::from_native_path(
        &dir.path().join("unstable.so").to_string_lossy(),
        KindHint::File,
    );
    let id = settings_id(&native_file_system().resolve(&url));

    let counters = Counters::default();
    let mut collection = collection_over(dir.path(), Settings::in_memory(), counters.clone());
    collection.enable_blocklist(true);
    collection.add_to_blocklist(&id);

    let stats = collection.scan_folders(None);
    assert_eq!(stats.discarded, 1);
    assert_eq!(counters.registered.get(), 0);
    assert_eq!(collection.module_count(), 0);
}

#[test]
fn reset_blocklist_clears_everything() {
    let dir = tempfile::tempdir().unwrap();
    let counters = Counters::default();
    let mut collection = collection_over(dir.path(), Settings::in_memory(), counters);

    collection.add_to_blocklist("11111111/a.so");
    collection.add_to_blocklist("22222222/b.so");
    assert_eq!(collection.blocklist_content().len(), 2);

    collection.reset_blocklist();
    assert!(collection.blocklist_content().is_empty());
}

#[test]
fn save_and_restore_paths() {
    let dir = tempfile::tempdir().unwrap();
    touch_module(dir.path(), "keep.so");
    touch_module(dir.path(), "drop.so");

    let settings = Settings::in_memory();
    let counters = Counters::default();
    let mut collection = collection_over(dir.path(), settings.clone(), counters.clone());
    collection.scan_folders(None);
    assert_eq!(collection.module_count(), 2);

    // persist only the module named "keep"
    let keep_only = |m: &dyn Module| m.path().name(false) == "keep";
    collection.save_paths(Some(&keep_only));

    let section = "Plugins Paths";
    assert_eq!(settings.queue_items(section, "searchPaths").len(), 1);
    let saved_modules = settings.queue_items(section, "modules");
    assert_eq!(saved_modules.len(), 1);
    assert!(saved_modules[0].contains("keep.so"));

    // a fresh collection over the same store picks the paths back up
    let restored = Counters::default();
    let mut fresh = PlugInCollection::new(
        "Plugins",
        Box::new(CountingFactory {
            counters: restored.clone(),
        }),
        Arc::new(native_file_system()),
        Arc::new(FileTypeRegistry::with_defaults()),
        settings.clone(),
    );
    assert!(fresh.restore_paths());
    assert_eq!(fresh.search_paths().len(), 1);
    assert_eq!(fresh.module_count(), 1); // cache hit for "keep"
    assert_eq!(restored.restored.get(), 1);
}

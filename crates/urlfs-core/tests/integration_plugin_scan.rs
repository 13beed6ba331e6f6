//! End-to-end exercise: native file system + plug-in scan + settings
//! cache + resource archive, wired together the way an application host
//! would.

use std::cell::Cell;
use std::io::Read;
use std::rc::Rc;
use std::sync::Arc;

use urlfs_core::filetype::FileTypeRegistry;
use urlfs_core::fs::native::native_file_system;
use urlfs_core::fs::{FileSystem, OpenMode};
use urlfs_core::module::Module;
use urlfs_core::plugins::{ModuleFactory, PlugInCollection};
use urlfs_core::resource::{ArchiveBuilder, ResourceFileSystem};
use urlfs_core::settings::Settings;
use urlfs_core::url::{KindHint, Url, MEMORY_PROTOCOL, RESOURCE_PROTOCOL};
use urlfs_core::vfs::Vfs;

struct StubModule {
    path: Url,
    loaded: bool,
}

impl Module for StubModule {
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

struct StubFactory {
    registrations: Rc<Cell<usize>>,
}

impl ModuleFactory for StubFactory {
    fn create_module(&self, url: &Url) -> Box<dyn Module> {
        Box::new(StubModule {
            path: url.clone(),
            loaded: false,
        })
    }

    fn register_module(
        &mut self,
        module: &mut dyn Module,
        settings: &Settings,
        settings_id: &str,
    ) -> bool {
        self.registrations.set(self.registrations.get() + 1);
        settings.set_string(settings_id, "name", &module.path().name(false));
        true
    }
}

#[test]
fn host_startup_scan_and_restart() {
    let plugin_dir = tempfile::tempdir().unwrap();
    let state_dir = tempfile::tempdir().unwrap();
    let store_path = state_dir.path().join("Plugins.json");

    // a small plug-in installation: two modules, one with resources
    std::fs::create_dir_all(plugin_dir.path().join("effects")).unwrap();
    std::fs::write(plugin_dir.path().join("effects/reverb.so"), b"\x7fELF").unwrap();
    std::fs::write(plugin_dir.path().join("gain.so"), b"\x7fELF").unwrap();
    std::fs::write(plugin_dir.path().join("notes.txt"), b"ignored").unwrap();
    ArchiveBuilder::new()
        .add("ui/theme.json", b"{\"accent\":\"teal\"}")
        .write_to(&plugin_dir.path().join("gain.res"))
        .unwrap();

    let search_path = Url::from_native_path(
        &plugin_dir.path().to_string_lossy(),
        KindHint::Folder,
    );

    // first launch: both modules are registered fresh
    let first_registrations = Rc::new(Cell::new(0));
    {
        let mut collection = PlugInCollection::new(
            "Plugins",
            Box::new(StubFactory {
                registrations: first_registrations.clone(),
            }),
            Arc::new(native_file_system()),
            Arc::new(FileTypeRegistry::with_defaults()),
            Settings::open(&store_path),
        );
        collection.add_search_path(&search_path);
        let stats = collection.scan_folders(None);
        assert_eq!(stats.registered, 2);
        assert_eq!(collection.module_count(), 2);
        collection.save_paths(None);
    }
    assert_eq!(first_registrations.get(), 2);
    assert!(store_path.exists());

    // second launch over the persisted store: pure cache hits
    let second_registrations = Rc::new(Cell::new(0));
    {
        let mut collection = PlugInCollection::new(
            "Plugins",
            Box::new(StubFactory {
                registrations: second_registrations.clone(),
            }),
            Arc::new(native_file_system()),
            Arc::new(FileTypeRegistry::with_defaults()),
            Settings::open(&store_path),
        );
        assert!(collection.restore_paths());
        assert_eq!(collection.search_paths().len(), 1);
        assert_eq!(collection.module_count(), 2);
    }
    assert_eq!(second_registrations.get(), 0);

    // resources of the gain module are reachable through the VFS
    let gain_module = Url::from_native_path(
        &plugin_dir.path().join("gain.so").to_string_lossy(),
        KindHint::File,
    );
    let resources = ResourceFileSystem::new();
    assert!(resources.register_module_archive("gain", &gain_module));

    let mut vfs = Vfs::new();
    vfs.mount(RESOURCE_PROTOCOL, Arc::new(resources));
    vfs.mount(
        MEMORY_PROTOCOL,
        Arc::new(urlfs_core::fs::memory::MemoryFileSystem::new()),
    );

    let theme = Url::resource("gain", "ui/theme.json", KindHint::File);
    let fs = vfs.resolve(&theme).expect("resource protocol mounted");
    let mut body = String::new();
    fs.open_stream(&theme, OpenMode::READ)
        .expect("theme readable")
        .read_to_string(&mut body)
        .unwrap();
    assert!(body.contains("teal"));
}

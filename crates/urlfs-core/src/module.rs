//! Loadable code units.
//!
//! `Module` is the load/unload state machine over two required
//! primitives and two overridable hooks; `NativeModule` supplies the
//! primitives with `libloading`. A module that fails its `on_load` hook
//! is rolled back immediately, so no half-loaded state survives.
//! Module identity is the path: two modules are the same module when
//! their paths are equal, loaded or not.

use crate::url::Url;
use libloading::Library;

/// Loadable code unit. Implementors provide the image primitives (and
/// should call [`Module::unload`] from `Drop`); the provided `load` and
/// `unload` methods implement the lifecycle contract.
pub trait Module {
    fn path(&self) -> &Url;

    /// Map the image into the process. Only called while unloaded.
    fn load_image(&mut self) -> bool;

    /// Unmap the image. Only called while loaded.
    fn unload_image(&mut self);

    fn image_loaded(&self) -> bool;

    /// Post-load extension point. Returning `false` rolls the load back.
    fn on_load(&mut self) -> bool {
        true
    }

    /// Pre-unload extension point.
    fn on_unload(&mut self) {}

    fn is_loaded(&self) -> bool {
        self.image_loaded()
    }

    /// Idempotent load: already-loaded modules report success without
    /// side effects. A failing `on_load` hook unloads again and reports
    /// failure.
    fn load(&mut self) -> bool {
        if self.is_loaded() {
            return true;
        }
        if !self.load_image() {
            return false;
        }
        if !self.on_load() {
            self.unload();
            return false;
        }
        true
    }

    /// Idempotent unload.
    fn unload(&mut self) {
        if !self.is_loaded() {
            return;
        }
        self.on_unload();
        self.unload_image();
    }
}

/// Path equality is module equality, independent of load state.
pub fn same_module(a: &dyn Module, b: &dyn Module) -> bool {
    a.path().is_equal_url(b.path(), false)
}

/// A native shared library (`.so` / `.dylib` / `.dll`).
pub struct NativeModule {
    path: Url,
    library: Option<Library>,
}

impl NativeModule {
    /// Wrap a path; nothing is loaded yet.
    pub fn new(path: Url) -> NativeModule {
        NativeModule {
            path,
            library: None,
        }
    }

    /// The mapped library while loaded.
    pub fn library(&self) -> Option<&Library> {
        self.library.as_ref()
    }
}

impl Module for NativeModule {
    fn path(&self) -> &Url {
        &self.path
    }

    fn load_image(&mut self) -> bool {
        let Some(native) = self.path.to_native_path() else {
            return false;
        };
        // Loading runs arbitrary initializer code from the library;
        // callers gate what gets here (block-list, file-type checks).
        match unsafe { Library::new(&native) } {
            Ok(library) => {
                self.library = Some(library);
                true
            }
            Err(err) => {
                tracing::warn!("module {} could not be loaded: {}", self.path, err);
                false
            }
        }
    }

    fn unload_image(&mut self) {
        self.library = None;
    }

    fn image_loaded(&self) -> bool {
        self.library.is_some()
    }
}

impl Drop for NativeModule {
    fn drop(&mut self) {
        self.unload();
    }
}

impl PartialEq for NativeModule {
    fn eq(&self, other: &NativeModule) -> bool {
        self.path.is_equal_url(&other.path, false)
    }
}

impl Eq for NativeModule {}

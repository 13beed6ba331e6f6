//! Protocol dispatch: one mount table from protocol to file system.
//!
//! The native file system answers `file://`; further protocols
//! (`memory://`, `resource://`, …) are mounted explicitly. Lookup is by
//! exact protocol string; URLs with an unmounted protocol resolve to
//! nothing and the usual `false`/`None` failure shapes apply.

use crate::fs::FileSystem;
use crate::url::Url;
use std::collections::HashMap;
use std::sync::Arc;

/// Mount table from protocol to file system.
#[derive(Default)]
pub struct Vfs {
    mounts: HashMap<String, Arc<dyn FileSystem>>,
}

impl Vfs {
    pub fn new() -> Vfs {
        Vfs::default()
    }

    /// Mount a file system for a protocol, replacing a previous mount.
    pub fn mount(&mut self, protocol: &str, fs: Arc<dyn FileSystem>) {
        self.mounts.insert(protocol.to_string(), fs);
    }

    pub fn unmount(&mut self, protocol: &str) -> bool {
        self.mounts.remove(protocol).is_some()
    }

    /// File system responsible for a URL's protocol.
    pub fn resolve(&self, url: &Url) -> Option<&Arc<dyn FileSystem>> {
        self.mounts.get(url.protocol())
    }

    pub fn protocols(&self) -> impl Iterator<Item = &str> {
        self.mounts.keys().map(|s| s.as_str())
    }
}

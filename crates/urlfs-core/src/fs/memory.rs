//! In-memory file system backing `memory://` URLs.
//!
//! Buffers live in named bins (the URL hostname); folders exist
//! implicitly as soon as a file lives under them, explicitly once
//! created. Streams share the underlying buffer, so bytes written
//! through one stream are visible to later readers.

use super::{FileInfo, FileSystem, OpenMode, Stream, VolumeInfo};
use crate::progress::ProgressNotify;
use crate::url::{Url, UrlKind};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

#[derive(Clone)]
struct MemoryFile {
    data: Arc<Mutex<Vec<u8>>>,
    modified: SystemTime,
}

#[derive(Default)]
struct Store {
    files: BTreeMap<String, MemoryFile>,
    folders: BTreeSet<String>,
}

/// Shared, thread-safe in-memory file system.
#[derive(Clone, Default)]
pub struct MemoryFileSystem {
    store: Arc<Mutex<Store>>,
}

impl MemoryFileSystem {
    pub fn new() -> MemoryFileSystem {
        MemoryFileSystem::default()
    }

    /// Total number of stored files, across all bins.
    pub fn file_count(&self) -> usize {
        self.store.lock().unwrap().files.len()
    }

    fn key(url: &Url) -> String {
        format!("{}/{}", url.hostname(), url.path())
    }

    fn is_implicit_folder(store: &Store, key: &str) -> bool {
        let prefix = format!("{}/", key);
        store.folders.contains(key)
            || store.files.keys().any(|k| k.starts_with(&prefix))
            || store.folders.iter().any(|k| k.starts_with(&prefix))
    }
}

struct MemoryStream {
    data: Arc<Mutex<Vec<u8>>>,
    pos: u64,
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.data.lock().unwrap();
        let start = (self.pos as usize).min(data.len());
        let n = (&data[start..]).read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = self.data.lock().unwrap();
        let start = self.pos as usize;
        if data.len() < start + buf.len() {
            data.resize(start + buf.len(), 0);
        }
        data[start..start + buf.len()].copy_from_slice(buf);
        self.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.data.lock().unwrap().len() as i64;
        let new = match pos {
            SeekFrom::Start(p) => p as i64,
            SeekFrom::End(delta) => len + delta,
            SeekFrom::Current(delta) => self.pos as i64 + delta,
        };
        if new < 0 {
            return Err(io::Error::from(io::ErrorKind::InvalidInput));
        }
        self.pos = new as u64;
        Ok(self.pos)
    }
}

impl FileSystem for MemoryFileSystem {
    fn open_stream(&self, url: &Url, mode: OpenMode) -> Option<Box<dyn Stream>> {
        let key = Self::key(url);
        let mut store = self.store.lock().unwrap();

        if mode.contains(OpenMode::CREATE) {
            let file = MemoryFile {
                data: Arc::new(Mutex::new(Vec::new())),
                modified: SystemTime::now(),
            };
            store.files.insert(key.clone(), file.clone());
            return Some(Box::new(MemoryStream {
                data: file.data,
                pos: 0,
            }));
        }

        let file = store.files.get(&key)?.clone();
        Some(Box::new(MemoryStream {
            data: file.data,
            pos: 0,
        }))
    }

    fn file_exists(&self, url: &Url) -> bool {
        let key = Self::key(url);
        let store = self.store.lock().unwrap();
        store.files.contains_key(&key) || MemoryFileSystem::is_implicit_folder(&store, &key)
    }

    fn file_info(&self, url: &Url) -> Option<FileInfo> {
        let key = Self::key(url);
        let store = self.store.lock().unwrap();
        if let Some(file) = store.files.get(&key) {
            return Some(FileInfo {
                kind: UrlKind::File,
                size: file.data.lock().unwrap().len() as u64,
                modified: Some(file.modified),
                created: None,
                hidden: false,
            });
        }
        if MemoryFileSystem::is_implicit_folder(&store, &key) {
            return Some(FileInfo {
                kind: UrlKind::Folder,
                size: 0,
                modified: None,
                created: None,
                hidden: false,
            });
        }
        None
    }

    fn remove_file(&self, url: &Url) -> bool {
        self.store
            .lock()
            .unwrap()
            .files
            .remove(&Self::key(url))
            .is_some()
    }

    fn create_folder(&self, url: &Url) -> bool {
        let mut key = Self::key(url);
        if url.is_file() {
            match key.rfind('/') {
                Some(idx) => key.truncate(idx),
                None => return false,
            }
        }
        self.store.lock().unwrap().folders.insert(key);
        true
    }

    fn remove_folder(&self, url: &Url, recursive: bool) -> bool {
        let key = Self::key(url);
        let prefix = format!("{}/", key);
        let mut store = self.store.lock().unwrap();

        let has_children = store.files.keys().any(|k| k.starts_with(&prefix));
        if has_children && !recursive {
            return false;
        }
        if recursive {
            store.files.retain(|k, _| !k.starts_with(&prefix));
            store.folders.retain(|k| !k.starts_with(&prefix));
        }
        store.folders.remove(&key);
        true
    }

    fn read_folder(&self, url: &Url) -> Option<Box<dyn Iterator<Item = Url> + Send>> {
        let key = Self::key(url);
        let prefix = format!("{}/", key);
        let store = self.store.lock().unwrap();

        let mut names: BTreeMap<String, UrlKind> = BTreeMap::new();
        for k in store.files.keys().filter(|k| k.starts_with(&prefix)) {
            let rest = &k[prefix.len()..];
            match rest.find('/') {
                Some(idx) => names.insert(rest[..idx].to_string(), UrlKind::Folder),
                None => names.insert(rest.to_string(), UrlKind::File),
            };
        }
        for k in store.folders.iter().filter(|k| k.starts_with(&prefix)) {
            let rest = &k[prefix.len()..];
            let name = rest.split('/').next().unwrap_or(rest);
            names.entry(name.to_string()).or_insert(UrlKind::Folder);
        }

        let base = url.clone();
        Some(Box::new(names.into_iter().map(move |(name, kind)| {
            let mut child = base.clone();
            child.descend(
                &name,
                match kind {
                    UrlKind::File => crate::url::KindHint::File,
                    UrlKind::Folder => crate::url::KindHint::Folder,
                },
            );
            child
        })))
    }

    fn rename_file(&self, url: &Url, new_name: &str) -> bool {
        let mut new_url = url.clone();
        new_url.set_name(new_name);
        self.move_file(&new_url, url, None)
    }

    fn move_file(&self, dst: &Url, src: &Url, _progress: Option<&dyn ProgressNotify>) -> bool {
        let mut store = self.store.lock().unwrap();
        match store.files.remove(&Self::key(src)) {
            Some(file) => {
                store.files.insert(Self::key(dst), file);
                true
            }
            None => false,
        }
    }

    fn copy_file(&self, dst: &Url, src: &Url, _progress: Option<&dyn ProgressNotify>) -> bool {
        let mut store = self.store.lock().unwrap();
        let Some(file) = store.files.get(&Self::key(src)) else {
            return false;
        };
        let data = file.data.lock().unwrap().clone();
        let copy = MemoryFile {
            data: Arc::new(Mutex::new(data)),
            modified: SystemTime::now(),
        };
        store.files.insert(Self::key(dst), copy);
        true
    }

    fn is_case_sensitive(&self) -> bool {
        true
    }
}

/// Capacity of the memory file system is whatever the process can hold.
impl MemoryFileSystem {
    pub fn volume_info(&self) -> VolumeInfo {
        VolumeInfo {
            total_bytes: u64::MAX,
            free_bytes: u64::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::KindHint;

    fn file_url(path: &str) -> Url {
        Url::memory("bin", path, KindHint::File)
    }

    #[test]
    fn write_then_read_roundtrip() {
        let fs = MemoryFileSystem::new();
        let url = file_url("a/b.txt");

        let mut w = fs.open_stream(&url, OpenMode::CREATE).unwrap();
        w.write_all(b"hello").unwrap();
        drop(w);

        let mut out = String::new();
        fs.open_stream(&url, OpenMode::READ)
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn folders_exist_implicitly() {
        let fs = MemoryFileSystem::new();
        fs.open_stream(&file_url("a/b/c.txt"), OpenMode::CREATE).unwrap();

        let folder = Url::memory("bin", "a/b", KindHint::Folder);
        assert!(fs.file_exists(&folder));
        assert!(fs.file_info(&folder).unwrap().is_folder());
    }

    #[test]
    fn read_folder_lists_direct_children_only() {
        let fs = MemoryFileSystem::new();
        fs.open_stream(&file_url("top/one.txt"), OpenMode::CREATE).unwrap();
        fs.open_stream(&file_url("top/sub/two.txt"), OpenMode::CREATE).unwrap();

        let folder = Url::memory("bin", "top", KindHint::Folder);
        let children: Vec<Url> = fs.read_folder(&folder).unwrap().collect();
        assert_eq!(children.len(), 2);
        assert!(children.iter().any(|u| u.name(true) == "one.txt" && u.is_file()));
        assert!(children.iter().any(|u| u.name(true) == "sub" && u.is_folder()));
    }

    #[test]
    fn remove_folder_respects_recursive_flag() {
        let fs = MemoryFileSystem::new();
        fs.open_stream(&file_url("top/one.txt"), OpenMode::CREATE).unwrap();

        let folder = Url::memory("bin", "top", KindHint::Folder);
        assert!(!fs.remove_folder(&folder, false));
        assert!(fs.remove_folder(&folder, true));
        assert!(!fs.file_exists(&file_url("top/one.txt")));
    }

    #[test]
    fn bins_are_isolated() {
        let fs = MemoryFileSystem::new();
        fs.open_stream(&Url::memory("left", "x.txt", KindHint::File), OpenMode::CREATE)
            .unwrap();
        assert!(!fs.file_exists(&Url::memory("right", "x.txt", KindHint::File)));
    }

    #[test]
    fn copy_and_move() {
        let fs = MemoryFileSystem::new();
        let src = file_url("data/src.bin");
        let mut w = fs.open_stream(&src, OpenMode::CREATE).unwrap();
        w.write_all(b"abc").unwrap();
        drop(w);

        let copy = file_url("data/copy.bin");
        assert!(fs.copy_file(&copy, &src, None));
        assert!(fs.file_exists(&src));
        assert_eq!(fs.file_info(&copy).unwrap().size, 3);

        let moved = file_url("data/moved.bin");
        assert!(fs.move_file(&moved, &src, None));
        assert!(!fs.file_exists(&src));
        assert!(fs.file_exists(&moved));
    }
}

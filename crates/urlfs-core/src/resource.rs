//! Read-only file system over packed resource archives.
//!
//! A resource archive is a blob section followed by a table of contents
//! and a fixed footer, so it works both as a standalone `<module>.res`
//! file and appended to the end of a module binary (the footer is found
//! by seeking to the end, wherever the archive starts). `resource://`
//! URLs address entries by module id (hostname) and entry path.
//!
//! Archives are registered by location and opened lazily; the cache is
//! guarded by a mutex because multiple threads resolve resources
//! concurrently.

use crate::fs::{FileInfo, FileSystem, OpenMode, Stream};
use crate::progress::ProgressNotify;
use crate::url::{KindHint, Url, UrlKind};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const MAGIC: &[u8; 8] = b"URESARC1";
const FOOTER_LEN: u64 = 16; // toc offset (u64) + magic

/// Extension of a standalone archive placed next to a module binary.
pub const ARCHIVE_EXTENSION: &str = "res";

#[derive(Clone, Debug)]
struct TocEntry {
    offset: u64,
    size: u64,
}

/// One opened archive: entry table plus the backing file.
pub struct ResourceArchive {
    entries: HashMap<String, TocEntry>,
    file: Mutex<fs::File>,
}

impl ResourceArchive {
    /// Open an archive file (standalone or appended to a binary).
    pub fn open(path: &Path) -> io::Result<ResourceArchive> {
        let mut file = fs::File::open(path)?;
        let len = file.metadata()?.len();
        if len < FOOTER_LEN {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "archive too short"));
        }

        file.seek(SeekFrom::End(-(FOOTER_LEN as i64)))?;
        let mut footer = [0u8; FOOTER_LEN as usize];
        file.read_exact(&mut footer)?;
        if &footer[8..16] != MAGIC {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "missing archive magic"));
        }
        let toc_offset = u64::from_le_bytes(footer[0..8].try_into().unwrap());
        if toc_offset >= len {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad archive toc offset"));
        }

        file.seek(SeekFrom::Start(toc_offset))?;
        let count = read_u32(&mut file)?;
        let mut entries = HashMap::with_capacity(count as usize);
        for _ in 0..count {
            let name_len = read_u32(&mut file)? as usize;
            let mut name = vec![0u8; name_len];
            file.read_exact(&mut name)?;
            let name = String::from_utf8(name)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad entry name"))?;
            let offset = read_u64(&mut file)?;
            let size = read_u64(&mut file)?;
            entries.insert(name, TocEntry { offset, size });
        }

        Ok(ResourceArchive {
            entries,
            file: Mutex::new(file),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn entry_size(&self, name: &str) -> Option<u64> {
        self.entries.get(name).map(|e| e.size)
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    /// Read a whole entry.
    pub fn read(&self, name: &str) -> Option<Vec<u8>> {
        let entry = self.entries.get(name)?.clone();
        let mut file = self.file.lock().unwrap();
        if file.seek(SeekFrom::Start(entry.offset)).is_err() {
            return None;
        }
        let mut data = vec![0u8; entry.size as usize];
        match file.read_exact(&mut data) {
            Ok(()) => Some(data),
            Err(err) => {
                tracing::warn!("resource entry {} unreadable: {}", name, err);
                None
            }
        }
    }
}

/// Writes archives in the format [`ResourceArchive::open`] reads. Call
/// `finish` against a writer positioned where the archive should start
/// (offset 0 for a standalone file, the end of a binary for appending).
#[derive(Default)]
pub struct ArchiveBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl ArchiveBuilder {
    pub fn new() -> ArchiveBuilder {
        ArchiveBuilder::default()
    }

    pub fn add(&mut self, name: &str, data: &[u8]) -> &mut Self {
        self.entries.push((name.to_string(), data.to_vec()));
        self
    }

    /// Append blob section, TOC and footer. `base_offset` is the
    /// writer's absolute position (entries store absolute offsets).
    pub fn finish<W: Write>(&self, writer: &mut W, base_offset: u64) -> io::Result<()> {
        let mut offset = base_offset;
        for (_, data) in &self.entries {
            writer.write_all(data)?;
            offset += data.len() as u64;
        }

        let toc_offset = offset;
        writer.write_all(&(self.entries.len() as u32).to_le_bytes())?;
        let mut blob_offset = base_offset;
        for (name, data) in &self.entries {
            writer.write_all(&(name.len() as u32).to_le_bytes())?;
            writer.write_all(name.as_bytes())?;
            writer.write_all(&blob_offset.to_le_bytes())?;
            writer.write_all(&(data.len() as u64).to_le_bytes())?;
            blob_offset += data.len() as u64;
        }

        writer.write_all(&toc_offset.to_le_bytes())?;
        writer.write_all(MAGIC)?;
        Ok(())
    }

    /// Write a standalone archive file.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let mut file = fs::File::create(path)?;
        self.finish(&mut file, 0)
    }
}

enum ArchiveSlot {
    /// Registered location, not opened yet.
    Pending(PathBuf),
    Open(Arc<ResourceArchive>),
    /// Open failed once; don't retry every lookup.
    Broken,
}

/// `resource://` file system over registered archives.
#[derive(Default)]
pub struct ResourceFileSystem {
    archives: Mutex<HashMap<String, ArchiveSlot>>,
}

impl ResourceFileSystem {
    pub fn new() -> ResourceFileSystem {
        ResourceFileSystem::default()
    }

    /// Register the archive location for a module id.
    pub fn register_archive(&self, module_id: &str, path: &Path) {
        self.archives
            .lock()
            .unwrap()
            .insert(module_id.to_string(), ArchiveSlot::Pending(path.to_path_buf()));
    }

    /// Register the conventional sibling archive of a module binary
    /// (`<module>.res` next to it).
    pub fn register_module_archive(&self, module_id: &str, module_url: &Url) -> bool {
        let mut archive_url = module_url.clone();
        archive_url.set_extension(ARCHIVE_EXTENSION, true);
        match archive_url.to_native_path() {
            Some(path) => {
                self.register_archive(module_id, &path);
                true
            }
            None => false,
        }
    }

    /// The opened archive for a module id; opens it on first use.
    pub fn archive(&self, module_id: &str) -> Option<Arc<ResourceArchive>> {
        let mut archives = self.archives.lock().unwrap();
        match archives.get(module_id) {
            Some(ArchiveSlot::Open(archive)) => Some(archive.clone()),
            Some(ArchiveSlot::Pending(path)) => match ResourceArchive::open(path) {
                Ok(archive) => {
                    let archive = Arc::new(archive);
                    archives.insert(module_id.to_string(), ArchiveSlot::Open(archive.clone()));
                    Some(archive)
                }
                Err(err) => {
                    tracing::warn!(
                        "resource archive for {} at {} unreadable: {}",
                        module_id,
                        path.display(),
                        err
                    );
                    archives.insert(module_id.to_string(), ArchiveSlot::Broken);
                    None
                }
            },
            _ => None,
        }
    }

    fn lookup(&self, url: &Url) -> Option<(Arc<ResourceArchive>, String)> {
        let archive = self.archive(url.hostname())?;
        Some((archive, url.path().to_string()))
    }
}

/// Entry stream: reads from a private copy, refuses writes.
struct ResourceStream {
    cursor: io::Cursor<Vec<u8>>,
}

impl Read for ResourceStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Write for ResourceStream {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::PermissionDenied))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for ResourceStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl FileSystem for ResourceFileSystem {
    fn open_stream(&self, url: &Url, mode: OpenMode) -> Option<Box<dyn Stream>> {
        if mode.wants_write() {
            return None; // archives are read-only
        }
        let (archive, name) = self.lookup(url)?;
        let data = archive.read(&name)?;
        Some(Box::new(ResourceStream {
            cursor: io::Cursor::new(data),
        }))
    }

    fn file_exists(&self, url: &Url) -> bool {
        match self.lookup(url) {
            Some((archive, name)) => {
                archive.contains(&name)
                    || archive
                        .entry_names()
                        .any(|n| n.starts_with(&format!("{}/", name)))
            }
            None => false,
        }
    }

    fn file_info(&self, url: &Url) -> Option<FileInfo> {
        let (archive, name) = self.lookup(url)?;
        if let Some(size) = archive.entry_size(&name) {
            return Some(FileInfo {
                kind: UrlKind::File,
                size,
                modified: None,
                created: None,
                hidden: false,
            });
        }
        let prefix = format!("{}/", name);
        if archive.entry_names().any(|n| n.starts_with(&prefix)) {
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

    fn remove_file(&self, _url: &Url) -> bool {
        false
    }

    fn create_folder(&self, _url: &Url) -> bool {
        false
    }

    fn remove_folder(&self, _url: &Url, _recursive: bool) -> bool {
        false
    }

    fn read_folder(&self, url: &Url) -> Option<Box<dyn Iterator<Item = Url> + Send>> {
        let (archive, name) = self.lookup(url)?;
        let prefix = if name.is_empty() {
            String::new()
        } else {
            format!("{}/", name)
        };

        let mut children: HashMap<String, UrlKind> = HashMap::new();
        for entry in archive.entry_names().filter(|n| n.starts_with(&prefix)) {
            let rest = &entry[prefix.len()..];
            match rest.find('/') {
                Some(idx) => children.insert(rest[..idx].to_string(), UrlKind::Folder),
                None => children.insert(rest.to_string(), UrlKind::File),
            };
        }

        let base = url.clone();
        Some(Box::new(children.into_iter().map(move |(name, kind)| {
            let mut child = base.clone();
            child.descend(
                &name,
                match kind {
                    UrlKind::File => KindHint::File,
                    UrlKind::Folder => KindHint::Folder,
                },
            );
            child
        })))
    }

    fn rename_file(&self, _url: &Url, _new_name: &str) -> bool {
        false
    }

    fn move_file(&self, _dst: &Url, _src: &Url, _progress: Option<&dyn ProgressNotify>) -> bool {
        false
    }

    fn copy_file(&self, _dst: &Url, _src: &Url, _progress: Option<&dyn ProgressNotify>) -> bool {
        false
    }

    fn is_case_sensitive(&self) -> bool {
        true
    }
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_archive(dir: &Path) -> PathBuf {
        let path = dir.join("core.res");
        ArchiveBuilder::new()
            .add("icons/open.svg", b"<svg/>")
            .add("icons/save.svg", b"<svg ></svg>")
            .add("strings.json", b"{}")
            .write_to(&path)
            .unwrap();
        path
    }

    #[test]
    fn archive_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_archive(dir.path());

        let archive = ResourceArchive::open(&path).unwrap();
        assert!(archive.contains("icons/open.svg"));
        assert_eq!(archive.read("icons/open.svg").unwrap(), b"<svg/>");
        assert_eq!(archive.entry_size("strings.json"), Some(2));
        assert!(archive.read("missing").is_none());
    }

    #[test]
    fn archive_appended_to_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("module.so");

        let fake_binary = vec![0x7Fu8; 1234];
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(&fake_binary).unwrap();
        ArchiveBuilder::new()
            .add("embedded.txt", b"inside")
            .finish(&mut file, fake_binary.len() as u64)
            .unwrap();
        drop(file);

        let archive = ResourceArchive::open(&path).unwrap();
        assert_eq!(archive.read("embedded.txt").unwrap(), b"inside");
    }

    #[test]
    fn open_rejects_non_archives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.bin");
        fs::write(&path, b"just some bytes, no magic").unwrap();
        assert!(ResourceArchive::open(&path).is_err());
    }

    #[test]
    fn file_system_serves_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_archive(dir.path());

        let rfs = ResourceFileSystem::new();
        rfs.register_archive("core", &path);

        let url = Url::resource("core", "icons/open.svg", KindHint::File);
        assert!(rfs.file_exists(&url));
        let mut out = Vec::new();
        rfs.open_stream(&url, OpenMode::READ)
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, b"<svg/>");

        // write access is refused
        assert!(rfs.open_stream(&url, OpenMode::CREATE).is_none());
        assert!(!rfs.remove_file(&url));
    }

    #[test]
    fn folders_are_derived_from_entry_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_archive(dir.path());

        let rfs = ResourceFileSystem::new();
        rfs.register_archive("core", &path);

        let folder = Url::resource("core", "icons", KindHint::Folder);
        assert!(rfs.file_exists(&folder));
        assert!(rfs.file_info(&folder).unwrap().is_folder());

        let names: Vec<String> = rfs
            .read_folder(&folder)
            .unwrap()
            .map(|u| u.name(true))
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"open.svg".to_string()));
    }

    #[test]
    fn unknown_module_or_entry_is_a_plain_miss() {
        let rfs = ResourceFileSystem::new();
        let url = Url::resource("ghost", "x.txt", KindHint::File);
        assert!(!rfs.file_exists(&url));
        assert!(rfs.open_stream(&url, OpenMode::READ).is_none());
    }

    #[test]
    fn concurrent_lookups_share_the_lazy_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_archive(dir.path());

        let rfs = Arc::new(ResourceFileSystem::new());
        rfs.register_archive("core", &path);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rfs = rfs.clone();
                std::thread::spawn(move || {
                    let url = Url::resource("core", "strings.json", KindHint::File);
                    let mut out = Vec::new();
                    rfs.open_stream(&url, OpenMode::READ)
                        .unwrap()
                        .read_to_end(&mut out)
                        .unwrap();
                    out
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), b"{}");
        }
    }

    #[test]
    fn sibling_archive_registration() {
        let dir = tempfile::tempdir().unwrap();
        sample_archive(dir.path());

        let rfs = ResourceFileSystem::new();
        let module = Url::from_native_path(
            &dir.path().join("core.so").to_string_lossy(),
            KindHint::File,
        );
        assert!(rfs.register_module_archive("core", &module));
        assert!(rfs.file_exists(&Url::resource("core", "strings.json", KindHint::File)));
    }
}

//! Native file system: generic logic over a platform backend.
//!
//! `NativeFileSystem` implements the portable parts of the contract
//! (parent creation before writes, recursive folder create/remove, the
//! rename-as-move fallback, the write-protection probe, transactions and
//! first-error tracking) and delegates the primitives to a [`PlatformFs`]
//! backend.
//!
//! One instance serves one thread: the sticky first error and the active
//! transaction are context state, so the type is deliberately not `Sync`
//! (interior `Cell`/`RefCell`). Create one instance per thread over a
//! shared backend; a transaction begun on a context must be ended on the
//! same context.

#[cfg(unix)]
pub mod unix;
#[cfg(windows)]
pub mod windows;

#[cfg(unix)]
pub use unix::UnixFs;
#[cfg(windows)]
pub use windows::WindowsFs;

/// The backend for the build target.
#[cfg(unix)]
pub type PlatformBackend = UnixFs;
#[cfg(windows)]
pub type PlatformBackend = WindowsFs;

use super::error::{from_io_error, FsError};
use super::transaction::{CommitMode, PendingOp, Transaction};
use super::{FileInfo, FileSystem, OpenMode, Stream, VolumeInfo};
use crate::progress::ProgressNotify;
use crate::url::{KindHint, Url, UrlKind};
use std::cell::{Cell, RefCell};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Primitive operations a platform supplies. All failures surface as
/// `io::Error` carrying the raw OS code where one exists; the generic
/// layer translates and records them.
pub trait PlatformFs {
    fn open_stream(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn Stream>>;

    fn metadata(&self, path: &Path) -> io::Result<FileInfo>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Create one folder level; parents must already exist.
    fn create_folder(&self, path: &Path) -> io::Result<()>;

    /// Remove one empty folder.
    fn remove_folder(&self, path: &Path) -> io::Result<()>;

    /// Direct children as `(name, kind)` pairs.
    fn read_folder(&self, path: &Path) -> io::Result<Vec<(String, UrlKind)>>;

    fn move_file(
        &self,
        dst: &Path,
        src: &Path,
        progress: Option<&dyn ProgressNotify>,
    ) -> io::Result<()>;

    fn copy_file(
        &self,
        dst: &Path,
        src: &Path,
        progress: Option<&dyn ProgressNotify>,
    ) -> io::Result<()>;

    /// Undo-capable delete (trash). Backends without one fall back to a
    /// permanent remove.
    fn trash_file(&self, path: &Path) -> io::Result<()> {
        self.remove_file(path)
    }

    fn set_file_time(&self, path: &Path, modified: SystemTime) -> io::Result<()>;

    fn volume_info(&self, path: &Path) -> io::Result<VolumeInfo>;

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    fn current_dir(&self) -> io::Result<PathBuf>;

    fn set_current_dir(&self, path: &Path) -> io::Result<()>;

    fn case_sensitive(&self) -> bool;

    /// Map a raw OS error code into the fixed taxonomy.
    fn translate_error(&self, raw: i32) -> FsError;
}

/// Per-context state: sticky first error, active transaction.
#[derive(Default)]
struct ContextState {
    first_error: Cell<Option<FsError>>,
    transaction: RefCell<Option<Transaction>>,
}

/// Generic native file system over a platform backend.
pub struct NativeFileSystem<B: PlatformFs> {
    backend: B,
    state: ContextState,
}

/// Native file system for the build target.
pub fn native_file_system() -> NativeFileSystem<PlatformBackend> {
    NativeFileSystem::new(PlatformBackend::default())
}

impl<B: PlatformFs> NativeFileSystem<B> {
    pub fn new(backend: B) -> NativeFileSystem<B> {
        NativeFileSystem {
            backend,
            state: ContextState::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The first error recorded on this context since the last call;
    /// reading clears it.
    pub fn first_error(&self) -> Option<FsError> {
        self.state.first_error.take()
    }

    /// Open a batch for deferred operations. Fails when one is already
    /// active on this context.
    pub fn begin_transaction(&self) -> bool {
        let mut tx = self.state.transaction.borrow_mut();
        if tx.is_some() {
            return false;
        }
        *tx = Some(Transaction::new());
        true
    }

    /// Commit or cancel the active batch. Commit checks the cancellation
    /// flag before every queued step and stops early when canceled.
    /// Fails when no transaction is active.
    pub fn end_transaction(&self, mode: CommitMode, progress: Option<&dyn ProgressNotify>) -> bool {
        let Some(mut tx) = self.state.transaction.borrow_mut().take() else {
            return false;
        };
        if mode == CommitMode::Cancel {
            return true;
        }

        let pending = tx.take_pending();
        let total = pending.len();
        if let Some(p) = progress {
            p.begin_progress();
        }
        let mut completed = true;
        for (index, op) in pending.into_iter().enumerate() {
            if progress.map_or(false, |p| p.is_canceled()) {
                completed = false;
                break;
            }
            match op {
                PendingOp::RemoveFile(url) => {
                    self.execute_remove(&url, mode == CommitMode::CommitWithUndo);
                }
            }
            if let Some(p) = progress {
                p.update_progress((index + 1) as f64 / total.max(1) as f64);
            }
        }
        if let Some(p) = progress {
            p.end_progress();
        }
        completed
    }

    /// Generic write-protection probe: create and delete a uniquely named
    /// temporary file in the target folder (or its nearest existing
    /// ancestor). Platform backends with a cheaper native check can wrap
    /// this and use it as the inconclusive-case fallback.
    pub fn is_write_protected(&self, url: &Url) -> bool {
        if url.is_empty() {
            return false;
        }

        let mut probe = url.clone();
        while probe.is_file() || (!self.file_exists(&probe) && !probe.is_root_path()) {
            if !probe.ascend() {
                break;
            }
        }
        probe.descend("tmp", KindHint::File);
        probe.make_unique(self, false);

        let created = self.open_stream(&probe, OpenMode::CREATE).is_some();
        if created {
            // direct remove: the probe must not end up in a transaction
            if let Some(path) = native_path(&probe) {
                let _ = self.backend.remove_file(&path);
            }
        }
        !created
    }

    pub fn volume_info(&self, url: &Url) -> Option<VolumeInfo> {
        let path = native_path(url)?;
        match self.backend.volume_info(&path) {
            Ok(info) => Some(info),
            Err(err) => {
                self.on_native_error(&err, url);
                None
            }
        }
    }

    pub fn set_file_time(&self, url: &Url, modified: SystemTime) -> bool {
        let Some(path) = native_path(url) else {
            return false;
        };
        match self.backend.set_file_time(&path, modified) {
            Ok(()) => true,
            Err(err) => {
                self.on_native_error(&err, url);
                false
            }
        }
    }

    /// Kind of `name` inside `base_folder`, when it exists.
    pub fn path_kind(&self, base_folder: &Url, name: &str) -> Option<UrlKind> {
        let mut url = base_folder.clone();
        url.descend(name, KindHint::Detect);
        self.file_info(&url).map(|info| info.kind)
    }

    /// Depth-first name search below `root`. `pattern` matches as a
    /// case-insensitive substring of the entry name; cancellation is
    /// checked per visited entry.
    pub fn find_files(
        &self,
        root: &Url,
        pattern: &str,
        progress: Option<&dyn ProgressNotify>,
    ) -> Vec<Url> {
        let mut results = Vec::new();
        let needle = pattern.to_lowercase();
        self.find_files_into(root, &needle, progress, &mut results);
        results
    }

    fn find_files_into(
        &self,
        folder: &Url,
        needle: &str,
        progress: Option<&dyn ProgressNotify>,
        results: &mut Vec<Url>,
    ) {
        let Some(entries) = self.read_folder(folder) else {
            return;
        };
        for entry in entries {
            if progress.map_or(false, |p| p.is_canceled()) {
                return;
            }
            if entry.name(true).to_lowercase().contains(needle) {
                results.push(entry.clone());
            }
            if entry.is_folder() {
                self.find_files_into(&entry, needle, progress, results);
            }
        }
    }

    pub fn working_directory(&self) -> Option<Url> {
        let dir = self.backend.current_dir().ok()?;
        Some(Url::from_native_path(&dir.to_string_lossy(), KindHint::Folder))
    }

    pub fn set_working_directory(&self, url: &Url) -> bool {
        let Some(path) = native_path(url) else {
            return false;
        };
        match self.backend.set_current_dir(&path) {
            Ok(()) => true,
            Err(err) => {
                self.on_native_error(&err, url);
                false
            }
        }
    }

    fn execute_remove(&self, url: &Url, with_undo: bool) -> bool {
        let Some(path) = native_path(url) else {
            return false;
        };
        let result = if with_undo {
            self.backend.trash_file(&path)
        } else {
            self.backend.remove_file(&path)
        };
        match result {
            Ok(()) => true,
            Err(err) => {
                self.on_native_error(&err, url);
                false
            }
        }
    }

    /// Translate and record a native failure. The first mapped error per
    /// context sticks until read; unmapped codes indicate a gap in the
    /// translation table and are logged loud.
    fn on_native_error(&self, err: &io::Error, url: &Url) {
        let (error, raw) = match err.raw_os_error() {
            Some(raw) => (self.backend.translate_error(raw), Some(raw)),
            None => (from_io_error(err), None),
        };

        if self.state.first_error.get().is_none() {
            self.state.first_error.set(Some(error));
        }

        if error == FsError::Unknown {
            tracing::error!("{}", error.describe(Some(url), raw));
        } else {
            tracing::warn!("{}", error.describe(Some(url), raw));
        }
    }
}

impl<B: PlatformFs> FileSystem for NativeFileSystem<B> {
    fn open_stream(&self, url: &Url, mode: OpenMode) -> Option<Box<dyn Stream>> {
        // create the folder structure first when writing
        if mode.wants_write() {
            self.create_folder(url);
        }

        let path = native_path(url)?;
        match self.backend.open_stream(&path, mode) {
            Ok(stream) => Some(stream),
            Err(err) => {
                self.on_native_error(&err, url);
                None
            }
        }
    }

    fn file_exists(&self, url: &Url) -> bool {
        match native_path(url) {
            Some(path) => self.backend.metadata(&path).is_ok(),
            None => false,
        }
    }

    fn file_info(&self, url: &Url) -> Option<FileInfo> {
        let path = native_path(url)?;
        match self.backend.metadata(&path) {
            Ok(info) => Some(info),
            Err(err) => {
                // a plain miss is not an error worth recording
                if err.kind() != io::ErrorKind::NotFound {
                    self.on_native_error(&err, url);
                }
                None
            }
        }
    }

    fn remove_file(&self, url: &Url) -> bool {
        if let Some(tx) = self.state.transaction.borrow_mut().as_mut() {
            tx.queue_remove_file(url);
            return true;
        }
        self.execute_remove(url, false)
    }

    fn create_folder(&self, url: &Url) -> bool {
        if url.is_file() {
            let mut parent = url.clone();
            if !parent.ascend() {
                return false;
            }
            return self.create_folder(&parent);
        }

        if self.file_exists(url) {
            return true;
        }

        let mut parent = url.clone();
        if parent.ascend() && !parent.is_root_path() && !self.create_folder(&parent) {
            return false;
        }

        let Some(path) = native_path(url) else {
            return false;
        };
        match self.backend.create_folder(&path) {
            Ok(()) => true,
            // lost a race against another writer; the folder is there
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => true,
            Err(err) => {
                self.on_native_error(&err, url);
                false
            }
        }
    }

    fn remove_folder(&self, url: &Url, recursive: bool) -> bool {
        if recursive {
            if let Some(children) = self.read_folder(url) {
                for child in children {
                    if child.is_folder() {
                        self.remove_folder(&child, true);
                    } else {
                        self.remove_file(&child);
                    }
                }
            }
        }

        let Some(path) = native_path(url) else {
            return false;
        };
        match self.backend.remove_folder(&path) {
            Ok(()) => true,
            Err(err) => {
                self.on_native_error(&err, url);
                false
            }
        }
    }

    fn read_folder(&self, url: &Url) -> Option<Box<dyn Iterator<Item = Url> + Send>> {
        let path = native_path(url)?;
        match self.backend.read_folder(&path) {
            Ok(entries) => {
                let base = url.clone();
                Some(Box::new(entries.into_iter().map(move |(name, kind)| {
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
            Err(err) => {
                self.on_native_error(&err, url);
                None
            }
        }
    }

    fn rename_file(&self, url: &Url, new_name: &str) -> bool {
        let mut new_url = url.clone();
        new_url.set_name(new_name);
        self.move_file(&new_url, url, None)
    }

    fn move_file(&self, dst: &Url, src: &Url, progress: Option<&dyn ProgressNotify>) -> bool {
        let (Some(dst_path), Some(src_path)) = (native_path(dst), native_path(src)) else {
            return false;
        };
        match self.backend.move_file(&dst_path, &src_path, progress) {
            Ok(()) => true,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => false, // canceled
            Err(err) => {
                self.on_native_error(&err, src);
                false
            }
        }
    }

    fn copy_file(&self, dst: &Url, src: &Url, progress: Option<&dyn ProgressNotify>) -> bool {
        let (Some(dst_path), Some(src_path)) = (native_path(dst), native_path(src)) else {
            return false;
        };
        match self.backend.copy_file(&dst_path, &src_path, progress) {
            Ok(()) => true,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => false, // canceled
            Err(err) => {
                self.on_native_error(&err, src);
                false
            }
        }
    }

    fn is_case_sensitive(&self) -> bool {
        self.backend.case_sensitive()
    }

    /// Resolve symlinks and relative components into the canonical URL
    /// for a path, falling back to the input when resolution fails.
    fn resolve(&self, url: &Url) -> Url {
        let Some(path) = native_path(url) else {
            return url.clone();
        };
        match self.backend.canonicalize(&path) {
            Ok(resolved) => Url::from_native_path(
                &resolved.to_string_lossy(),
                if url.is_folder() {
                    KindHint::Folder
                } else {
                    KindHint::File
                },
            ),
            Err(_) => url.clone(),
        }
    }
}

fn native_path(url: &Url) -> Option<PathBuf> {
    url.to_native_path()
}

/// Chunked copy shared by the platform backends: bounded memory, progress
/// fraction per chunk, cancellation checked per chunk. A canceled copy
/// removes the partial destination and reports `Interrupted`.
pub(crate) fn copy_with_progress(
    dst: &Path,
    src: &Path,
    progress: Option<&dyn ProgressNotify>,
) -> io::Result<()> {
    use io::{Read, Write};

    const BUF_SIZE: usize = 64 * 1024;

    let mut reader = std::fs::File::open(src)?;
    let total = reader.metadata()?.len();
    let mut writer = std::fs::File::create(dst)?;

    if let Some(p) = progress {
        p.begin_progress();
    }

    let mut buf = vec![0u8; BUF_SIZE];
    let mut copied: u64 = 0;
    loop {
        if progress.map_or(false, |p| p.is_canceled()) {
            drop(writer);
            let _ = std::fs::remove_file(dst);
            if let Some(p) = progress {
                p.end_progress();
            }
            return Err(io::Error::new(io::ErrorKind::Interrupted, "copy canceled"));
        }

        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        copied += n as u64;
        if let Some(p) = progress {
            p.update_progress(copied as f64 / total.max(1) as f64);
        }
    }

    writer.flush()?;
    if let Some(p) = progress {
        p.end_progress();
    }
    Ok(())
}

//! File-system contract: streams, file/volume info, and the object-safe
//! `FileSystem` trait every backend (native, memory, resource archive)
//! implements.
//!
//! Operations defined as boolean-returning by the contract return `false`
//! on failure instead of an error value; the native backend additionally
//! records a sticky per-context first error (see [`native`]).

pub mod error;
pub mod memory;
pub mod native;
pub mod transaction;

pub use error::FsError;

use crate::progress::ProgressNotify;
use crate::url::{Url, UrlKind};
use std::io;
use std::time::SystemTime;

/// Whether native paths compare case-sensitively on this platform.
pub fn native_paths_case_sensitive() -> bool {
    cfg!(not(any(windows, target_os = "macos")))
}

/// Open-mode flag set for [`FileSystem::open_stream`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct OpenMode(u32);

impl OpenMode {
    /// Open existing for reading.
    pub const READ: OpenMode = OpenMode(1 << 0);
    /// Open existing for writing.
    pub const WRITE: OpenMode = OpenMode(1 << 1);
    /// Create (truncate) for writing.
    pub const CREATE: OpenMode = OpenMode(1 << 2);
    /// Allow concurrent readers.
    pub const SHARE_READ: OpenMode = OpenMode(1 << 3);
    /// Allow concurrent writers.
    pub const SHARE_WRITE: OpenMode = OpenMode(1 << 4);

    pub fn contains(self, other: OpenMode) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when the mode implies write access (and thus parent-folder
    /// creation on open).
    pub fn wants_write(self) -> bool {
        self.0 & (Self::WRITE.0 | Self::CREATE.0) != 0
    }
}

impl std::ops::BitOr for OpenMode {
    type Output = OpenMode;
    fn bitor(self, rhs: OpenMode) -> OpenMode {
        OpenMode(self.0 | rhs.0)
    }
}

/// Byte stream over an open resource.
pub trait Stream: io::Read + io::Write + io::Seek + Send {
    /// Current position, without moving it.
    fn tell(&mut self) -> io::Result<u64> {
        self.stream_position()
    }
}

impl<T: io::Read + io::Write + io::Seek + Send> Stream for T {}

/// Metadata for one file-system entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    pub kind: UrlKind,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub created: Option<SystemTime>,
    pub hidden: bool,
}

impl FileInfo {
    pub fn is_folder(&self) -> bool {
        self.kind == UrlKind::Folder
    }
}

/// Capacity numbers for the volume containing a URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VolumeInfo {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

/// Contract shared by all file systems. Backends that cannot support an
/// operation report plain failure (`false` / `None`), never a panic.
pub trait FileSystem {
    /// Open a byte stream. Write modes transparently create missing
    /// parent folders first. Returns `None` on failure.
    fn open_stream(&self, url: &Url, mode: OpenMode) -> Option<Box<dyn Stream>>;

    fn file_exists(&self, url: &Url) -> bool;

    fn file_info(&self, url: &Url) -> Option<FileInfo>;

    fn remove_file(&self, url: &Url) -> bool;

    /// Create the folder (and any missing parents). For a file URL the
    /// parent folder is created.
    fn create_folder(&self, url: &Url) -> bool;

    /// Remove a folder; with `recursive` children are removed first,
    /// files before their now-empty parent.
    fn remove_folder(&self, url: &Url, recursive: bool) -> bool;

    /// Iterate the direct children of a folder. `None` when the folder
    /// cannot be read.
    fn read_folder(&self, url: &Url) -> Option<Box<dyn Iterator<Item = Url> + Send>>;

    /// Rename in place (a move to a sibling name).
    fn rename_file(&self, url: &Url, new_name: &str) -> bool;

    fn move_file(&self, dst: &Url, src: &Url, progress: Option<&dyn ProgressNotify>) -> bool;

    fn copy_file(&self, dst: &Url, src: &Url, progress: Option<&dyn ProgressNotify>) -> bool;

    fn is_case_sensitive(&self) -> bool {
        native_paths_case_sensitive()
    }

    /// Canonical identity of a URL. Backends that know about links and
    /// relative components resolve them; the default is the URL itself.
    fn resolve(&self, url: &Url) -> Url {
        url.clone()
    }
}

//! Fixed file-system error taxonomy and native-code translation glue.
//!
//! Platform primitives report raw OS error codes; backends translate
//! them into this small fixed set. Boolean-returning operations record
//! the first translated error per file-system context; callers that need
//! the reason read it with `first_error` (which clears it).

use thiserror::Error;

/// The flat error set every platform backend maps into.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    #[error("the system cannot find the file specified")]
    FileNotFound,
    #[error("access is denied")]
    AccessDenied,
    #[error("the file is in use")]
    FileInUse,
    #[error("the file exists")]
    FileExists,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("too many open files")]
    TooManyOpenFiles,
    #[error("there is not enough space on the disk")]
    OutOfDiskSpace,
    #[error("the directory is not empty")]
    DirectoryNotEmpty,
    #[error("the file is write protected")]
    WriteProtected,
    #[error("unknown error")]
    Unknown,
}

impl FsError {
    /// Human-readable message with the offending URL's display string
    /// and, when available, the raw native code in hex.
    pub fn describe(&self, url: Option<&crate::url::Url>, native: Option<i32>) -> String {
        let mut out = self.to_string();
        if let Some(code) = native {
            out.push_str(&format!(" [0x{:X}]", code));
        }
        if let Some(url) = url {
            out.push_str(&format!(" ({})", url.display_string()));
        }
        out
    }
}

/// Translate an `std::io` error kind as a portable fallback when a
/// backend has no raw OS code to work with.
pub fn from_io_error(err: &std::io::Error) -> FsError {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::NotFound => FsError::FileNotFound,
        ErrorKind::PermissionDenied => FsError::AccessDenied,
        ErrorKind::AlreadyExists => FsError::FileExists,
        ErrorKind::InvalidInput => FsError::InvalidArgument,
        _ => FsError::Unknown,
    }
}

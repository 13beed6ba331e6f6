//! Win32 backend: std file APIs plus the `windows` crate for volume
//! capacity and recycle-bin deletes.

use super::{copy_with_progress, PlatformFs};
use crate::fs::error::FsError;
use crate::fs::{FileInfo, OpenMode, Stream, VolumeInfo};
use crate::progress::ProgressNotify;
use crate::url::UrlKind;
use std::fs;
use std::io;
use std::os::windows::ffi::OsStrExt;
use std::os::windows::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

// Win32 error codes (winerror.h)
const ERROR_FILE_NOT_FOUND: i32 = 2;
const ERROR_PATH_NOT_FOUND: i32 = 3;
const ERROR_TOO_MANY_OPEN_FILES: i32 = 4;
const ERROR_ACCESS_DENIED: i32 = 5;
const ERROR_INVALID_ACCESS: i32 = 12;
const ERROR_WRITE_PROTECT: i32 = 19;
const ERROR_SHARING_VIOLATION: i32 = 32;
const ERROR_FILE_EXISTS: i32 = 80;
const ERROR_INVALID_PARAMETER: i32 = 87;
const ERROR_DISK_FULL: i32 = 112;
const ERROR_INVALID_NAME: i32 = 123;
const ERROR_DIR_NOT_EMPTY: i32 = 145;
const ERROR_PATH_BUSY: i32 = 148;
const ERROR_BUSY: i32 = 170;
const ERROR_ALREADY_EXISTS: i32 = 183;
const ERROR_NOACCESS: i32 = 998;

const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;

#[derive(Debug, Default)]
pub struct WindowsFs;

fn wide(path: &Path) -> Vec<u16> {
    path.as_os_str().encode_wide().chain(Some(0)).collect()
}

impl PlatformFs for WindowsFs {
    fn open_stream(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn Stream>> {
        use std::os::windows::fs::OpenOptionsExt;

        const FILE_SHARE_READ: u32 = 0x1;
        const FILE_SHARE_WRITE: u32 = 0x2;

        let mut options = fs::File::options();
        options.read(mode.contains(OpenMode::READ) || !mode.wants_write());
        if mode.contains(OpenMode::WRITE) {
            options.write(true);
        }
        if mode.contains(OpenMode::CREATE) {
            options.write(true).create(true).truncate(true);
        }
        let mut share = 0;
        if mode.contains(OpenMode::SHARE_READ) {
            share |= FILE_SHARE_READ;
        }
        if mode.contains(OpenMode::SHARE_WRITE) {
            share |= FILE_SHARE_READ | FILE_SHARE_WRITE;
        }
        options.share_mode(share);
        let file = options.open(path)?;
        Ok(Box::new(file))
    }

    fn metadata(&self, path: &Path) -> io::Result<FileInfo> {
        let meta = fs::metadata(path)?;
        Ok(FileInfo {
            kind: if meta.is_dir() {
                UrlKind::Folder
            } else {
                UrlKind::File
            },
            size: meta.len(),
            modified: meta.modified().ok(),
            created: meta.created().ok(),
            hidden: meta.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0,
        })
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn create_folder(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn remove_folder(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }

    fn read_folder(&self, path: &Path) -> io::Result<Vec<(String, UrlKind)>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let kind = match entry.file_type() {
                Ok(t) if t.is_dir() => UrlKind::Folder,
                _ => UrlKind::File,
            };
            entries.push((entry.file_name().to_string_lossy().into_owned(), kind));
        }
        Ok(entries)
    }

    fn move_file(
        &self,
        dst: &Path,
        src: &Path,
        progress: Option<&dyn ProgressNotify>,
    ) -> io::Result<()> {
        match fs::rename(src, dst) {
            Ok(()) => Ok(()),
            // cross-volume move: fall back to copy+delete
            Err(_) => {
                copy_with_progress(dst, src, progress)?;
                fs::remove_file(src)
            }
        }
    }

    fn copy_file(
        &self,
        dst: &Path,
        src: &Path,
        progress: Option<&dyn ProgressNotify>,
    ) -> io::Result<()> {
        copy_with_progress(dst, src, progress)
    }

    fn trash_file(&self, path: &Path) -> io::Result<()> {
        use windows::Win32::UI::Shell::{
            SHFileOperationW, FOF_ALLOWUNDO, FOF_NO_UI, FO_DELETE, SHFILEOPSTRUCTW,
        };

        // double-nul-terminated source list
        let mut from = wide(path);
        from.push(0);

        let mut op = SHFILEOPSTRUCTW {
            wFunc: FO_DELETE as u32,
            pFrom: windows::core::PCWSTR(from.as_ptr()),
            fFlags: (FOF_ALLOWUNDO.0 | FOF_NO_UI.0) as u16,
            ..Default::default()
        };
        let rc = unsafe { SHFileOperationW(&mut op) };
        if rc != 0 {
            tracing::debug!(code = rc, "recycle-bin delete failed, removing permanently");
            return fs::remove_file(path);
        }
        Ok(())
    }

    fn set_file_time(&self, path: &Path, modified: SystemTime) -> io::Result<()> {
        let file = fs::File::options().write(true).open(path)?;
        file.set_modified(modified)
    }

    fn volume_info(&self, path: &Path) -> io::Result<VolumeInfo> {
        use windows::Win32::Storage::FileSystem::GetDiskFreeSpaceExW;

        let wide_path = wide(path);
        let mut free: u64 = 0;
        let mut total: u64 = 0;
        unsafe {
            GetDiskFreeSpaceExW(
                windows::core::PCWSTR(wide_path.as_ptr()),
                Some(&mut free),
                Some(&mut total),
                None,
            )
        }
        .map_err(|e| io::Error::from_raw_os_error(e.code().0 & 0xFFFF))?;
        Ok(VolumeInfo {
            total_bytes: total,
            free_bytes: free,
        })
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }

    fn set_current_dir(&self, path: &Path) -> io::Result<()> {
        std::env::set_current_dir(path)
    }

    fn case_sensitive(&self) -> bool {
        false
    }

    fn translate_error(&self, raw: i32) -> FsError {
        match raw {
            ERROR_FILE_NOT_FOUND | ERROR_PATH_NOT_FOUND => FsError::FileNotFound,
            ERROR_ACCESS_DENIED | ERROR_INVALID_ACCESS => FsError::AccessDenied,
            ERROR_SHARING_VIOLATION | ERROR_PATH_BUSY | ERROR_BUSY => FsError::FileInUse,
            ERROR_FILE_EXISTS | ERROR_ALREADY_EXISTS => FsError::FileExists,
            ERROR_INVALID_PARAMETER | ERROR_INVALID_NAME | ERROR_NOACCESS => {
                FsError::InvalidArgument
            }
            ERROR_TOO_MANY_OPEN_FILES => FsError::TooManyOpenFiles,
            ERROR_DISK_FULL => FsError::OutOfDiskSpace,
            ERROR_DIR_NOT_EMPTY => FsError::DirectoryNotEmpty,
            ERROR_WRITE_PROTECT => FsError::WriteProtected,
            _ => FsError::Unknown,
        }
    }
}

//! POSIX backend: std file APIs plus `libc` for what std does not cover
//! (statvfs capacity numbers, errno translation). Undo-capable deletes
//! move files into the XDG trash.

use super::{copy_with_progress, PlatformFs};
use crate::fs::error::FsError;
use crate::fs::{FileInfo, OpenMode, Stream, VolumeInfo};
use crate::progress::ProgressNotify;
use crate::url::UrlKind;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Default)]
pub struct UnixFs;

impl PlatformFs for UnixFs {
    fn open_stream(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn Stream>> {
        let mut options = fs::File::options();
        options.read(mode.contains(OpenMode::READ) || !mode.wants_write());
        if mode.contains(OpenMode::WRITE) {
            options.write(true);
        }
        if mode.contains(OpenMode::CREATE) {
            options.write(true).create(true).truncate(true);
        }
        let file = options.open(path)?;
        Ok(Box::new(file))
    }

    fn metadata(&self, path: &Path) -> io::Result<FileInfo> {
        let meta = fs::metadata(path)?;
        let hidden = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(false);
        Ok(FileInfo {
            kind: if meta.is_dir() {
                UrlKind::Folder
            } else {
                UrlKind::File
            },
            size: meta.len(),
            modified: meta.modified().ok(),
            created: meta.created().ok(),
            hidden,
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
                // symlinks resolve through metadata; broken ones count as files
                Ok(t) if t.is_symlink() => match fs::metadata(entry.path()) {
                    Ok(m) if m.is_dir() => UrlKind::Folder,
                    _ => UrlKind::File,
                },
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
            // EXDEV: destination is on another device, fall back to copy+delete
            Err(err) if err.raw_os_error() == Some(libc::EXDEV) => {
                copy_with_progress(dst, src, progress)?;
                fs::remove_file(src)
            }
            Err(err) => Err(err),
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
        match move_to_trash(path) {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::debug!("trash unavailable ({}), removing permanently", err);
                fs::remove_file(path)
            }
        }
    }

    fn set_file_time(&self, path: &Path, modified: SystemTime) -> io::Result<()> {
        let file = fs::File::options().write(true).open(path)?;
        file.set_modified(modified)
    }

    fn volume_info(&self, path: &Path) -> io::Result<VolumeInfo> {
        use std::os::unix::ffi::OsStrExt;

        let c_path = std::ffi::CString::new(path.as_os_str().as_bytes())
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        let frsize = stat.f_frsize as u64;
        Ok(VolumeInfo {
            total_bytes: stat.f_blocks as u64 * frsize,
            free_bytes: stat.f_bavail as u64 * frsize,
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
        !cfg!(target_os = "macos")
    }

    fn translate_error(&self, raw: i32) -> FsError {
        match raw {
            libc::ENOENT | libc::ENOTDIR => FsError::FileNotFound,
            libc::EACCES | libc::EPERM => FsError::AccessDenied,
            libc::EBUSY | libc::ETXTBSY => FsError::FileInUse,
            libc::EEXIST => FsError::FileExists,
            libc::EINVAL | libc::ENAMETOOLONG => FsError::InvalidArgument,
            libc::EMFILE | libc::ENFILE => FsError::TooManyOpenFiles,
            libc::ENOSPC | libc::EDQUOT => FsError::OutOfDiskSpace,
            libc::ENOTEMPTY => FsError::DirectoryNotEmpty,
            libc::EROFS => FsError::WriteProtected,
            _ => FsError::Unknown,
        }
    }
}

/// Move a file into the XDG trash (`~/.local/share/Trash`), writing the
/// `.trashinfo` record next to it so desktop shells can restore it.
fn move_to_trash(path: &Path) -> io::Result<()> {
    let data_home = xdg::BaseDirectories::new()
        .map_err(|_| io::Error::from(io::ErrorKind::NotFound))?
        .get_data_home();
    let files_dir = data_home.join("Trash/files");
    let info_dir = data_home.join("Trash/info");
    fs::create_dir_all(&files_dir)?;
    fs::create_dir_all(&info_dir)?;

    let name = path
        .file_name()
        .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?
        .to_string_lossy()
        .into_owned();

    // pick a free slot: "name", "name.2", "name.3", …
    let mut target = files_dir.join(&name);
    let mut info = info_dir.join(format!("{}.trashinfo", name));
    let mut counter = 2u32;
    while target.exists() || info.exists() {
        target = files_dir.join(format!("{}.{}", name, counter));
        info = info_dir.join(format!("{}.{}.trashinfo", name, counter));
        counter += 1;
    }

    let seconds = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    fs::write(
        &info,
        format!(
            "[Trash Info]\nPath={}\nDeletionDate=@{}\n",
            path.display(),
            seconds
        ),
    )?;
    fs::rename(path, &target)
}

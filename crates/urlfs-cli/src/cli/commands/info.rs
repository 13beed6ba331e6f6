//! `urlfs info` – file and volume information for a native path.

use anyhow::{bail, Result};
use urlfs_core::fs::native::native_file_system;
use urlfs_core::fs::FileSystem;
use urlfs_core::url::{KindHint, Url};

pub fn run_info(path: &str) -> Result<()> {
    let fs = native_file_system();
    let url = Url::from_native_path(path, KindHint::Detect);

    let Some(info) = fs.file_info(&url) else {
        match fs.first_error() {
            Some(err) => bail!("cannot stat {path}: {err}"),
            None => bail!("no such file or folder: {path}"),
        }
    };

    println!("path:     {}", url.display_string());
    println!("kind:     {:?}", info.kind);
    println!("size:     {}", info.size);
    if let Some(modified) = info.modified {
        if let Ok(age) = modified.elapsed() {
            println!("modified: {}s ago", age.as_secs());
        }
    }
    println!("hidden:   {}", info.hidden);
    println!(
        "writable: {}",
        if fs.is_write_protected(&url) { "no" } else { "yes" }
    );

    if let Some(volume) = fs.volume_info(&url) {
        println!(
            "volume:   {} free of {} bytes",
            volume.free_bytes, volume.total_bytes
        );
    }
    Ok(())
}

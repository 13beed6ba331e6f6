//! `urlfs url` – parse a URL or native path and show its components.

use anyhow::{bail, Result};
use urlfs_core::url::{KindHint, Normalize, Url};

pub fn run_url(input: &str, normalize: bool) -> Result<()> {
    let mut url = if Url::is_url_string(input) {
        Url::parse(input)
    } else {
        Url::from_native_path(input, KindHint::Detect)
    };
    if url.is_empty() {
        bail!("not a recognizable URL or native path: {input}");
    }

    if normalize {
        url.normalize(Normalize::REMOVE_DOT_SEGMENTS);
    }

    println!("url:       {}", url.to_url_string(true));
    println!("protocol:  {}", url.protocol());
    println!("hostname:  {}", url.hostname());
    println!("path:      /{}", url.path());
    println!("name:      {}", url.name(true));
    println!(
        "extension: {}",
        url.extension().unwrap_or_else(|| "-".to_string())
    );
    println!("kind:      {:?}", url.kind());
    if let Some(native) = url.to_native_path_string() {
        println!("native:    {}", native);
    }
    for (key, value) in url.parameters() {
        println!("param:     {}={}", key, value);
    }
    Ok(())
}

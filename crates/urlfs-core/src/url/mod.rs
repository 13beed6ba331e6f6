//! Structured resource identifiers: protocol + hostname + path + kind +
//! query parameters.
//!
//! A `Url` names any resource the framework touches, not just network
//! ones: local files (`file://`), embedded resources (`resource://`),
//! package contents (`package://`) and in-memory buffers (`memory://`).
//! Paths are `/`-separated with no leading or trailing separator stored;
//! the serialized form inserts the `/` between hostname and path.
//!
//! Parsing never fails: malformed input produces the empty `Url`, which
//! callers test with [`Url::is_empty`].

pub mod encode;


use crate::fs::FileSystem;

pub const FILE_PROTOCOL: &str = "file";
pub const MEMORY_PROTOCOL: &str = "memory";
pub const PACKAGE_PROTOCOL: &str = "package";
pub const RESOURCE_PROTOCOL: &str = "resource";

const PROTOCOL_SEPARATOR: &str = "://";
const LOCALHOST: &str = "localhost";
const UNC_PREFIXES: [&str; 2] = ["\\\\?\\", "\\\\.\\"];

/// Whether a URL names a file or a folder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UrlKind {
    File,
    Folder,
}

/// Caller intent for operations that (re)set a path.
///
/// `Detect` derives the kind from the string: a trailing `/` or an empty
/// path means folder, anything else file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum KindHint {
    #[default]
    Detect,
    File,
    Folder,
}

/// Flags for [`Url::normalize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Normalize(u32);

impl Normalize {
    pub const REMOVE_DOT_SEGMENTS: Normalize = Normalize(1 << 0);

    pub fn contains(self, other: Normalize) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Normalize {
    type Output = Normalize;
    fn bitor(self, rhs: Normalize) -> Normalize {
        Normalize(self.0 | rhs.0)
    }
}

/// Structured resource identifier. Cheap to clone; equality compares
/// components honoring the platform case-sensitivity policy for `file`
/// URLs (see [`Url::is_equal_url`]).
#[derive(Clone, Debug, Default)]
pub struct Url {
    kind: Option<UrlKind>,
    protocol: String,
    hostname: String,
    path: String,
    parameters: Vec<(String, String)>,
}

impl Url {
    /// The empty URL: all components empty, folder kind.
    pub fn empty() -> Url {
        Url::default()
    }

    /// True when the string looks like a full URL (`scheme://…`).
    pub fn is_url_string(s: &str) -> bool {
        s.contains(PROTOCOL_SEPARATOR)
    }

    /// True when the string is an explicit relative path (`./…` / `../…`).
    pub fn is_relative_path_string(s: &str) -> bool {
        s.starts_with("./") || s.starts_with("../")
    }

    /// Parse `protocol://hostname/path?params`. Protocol and hostname are
    /// taken verbatim; the path is stored as given (use
    /// [`Url::from_encoded_string`] for percent-encoded input); query
    /// parameters are percent-decoded. Malformed input yields the empty
    /// URL.
    pub fn parse(s: &str) -> Url {
        let mut url = Url::default();
        url.set_url(s, KindHint::Detect);
        url
    }

    /// Build from explicit components, no decoding applied.
    pub fn from_parts(protocol: &str, hostname: &str, path: &str, kind: KindHint) -> Url {
        let mut url = Url {
            protocol: protocol.to_string(),
            hostname: hostname.to_string(),
            ..Url::default()
        };
        url.set_path(path, kind);
        url
    }

    /// Resolve a relative path string against a base folder URL; a full
    /// URL string is parsed as-is.
    pub fn from_relative(s: &str, base: &Url, kind: KindHint) -> Url {
        let mut url = Url::default();
        if Url::is_relative_path_string(s) {
            url.set_path(s, kind);
            url.make_absolute(base);
        } else {
            url.set_url(s, kind);
        }
        url
    }

    /// Parse a percent-encoded URL string, decoding the path components.
    pub fn from_encoded_string(s: &str) -> Url {
        let mut url = Url::parse(s);
        url.path = encode::decode_path_components(&url.path);
        url
    }

    /// Serialize with the path components percent-encoded.
    pub fn to_encoded_string(&self) -> String {
        let mut copy = self.clone();
        copy.path = encode::encode_path_components(&copy.path);
        copy.to_url_string(true)
    }

    /// In-memory buffer URL (`memory://<bin>/<path>`).
    pub fn memory(bin_name: &str, path: &str, kind: KindHint) -> Url {
        Url::from_parts(MEMORY_PROTOCOL, bin_name, path, kind)
    }

    /// Package content URL (`package://<package-id>/<path>`).
    pub fn package(package_id: &str, path: &str, kind: KindHint) -> Url {
        Url::from_parts(PACKAGE_PROTOCOL, package_id, path, kind)
    }

    /// Embedded resource URL (`resource://<module-id>/<path>`).
    pub fn resource(module_id: &str, path: &str, kind: KindHint) -> Url {
        debug_assert!(!path.contains(PROTOCOL_SEPARATOR));
        Url::from_parts(RESOURCE_PROTOCOL, module_id, path, kind)
    }

    pub fn is_empty(&self) -> bool {
        self.protocol.is_empty() && self.hostname.is_empty() && self.path.is_empty()
    }

    pub fn kind(&self) -> UrlKind {
        self.kind.unwrap_or(UrlKind::Folder)
    }

    pub fn is_file(&self) -> bool {
        self.kind() == UrlKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind() == UrlKind::Folder
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn set_protocol(&mut self, protocol: &str) {
        self.protocol = protocol.to_string();
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn set_hostname(&mut self, hostname: &str) {
        self.hostname = hostname.to_string();
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Replace the whole path (the kind is re-derived per `kind`).
    pub fn set_path(&mut self, path: &str, kind: KindHint) {
        self.path.clear();
        self.descend(path, kind);
    }

    /// Re-parse this URL from a full URL string.
    pub fn set_url(&mut self, s: &str, kind: KindHint) {
        self.parameters.clear();
        if s.is_empty() {
            self.protocol.clear();
            self.hostname.clear();
            self.path.clear();
            self.update_kind(kind);
            return;
        }

        let mut rest = s;
        if let Some(idx) = rest.find('?') {
            self.parameters = encode::decode_params(&rest[idx + 1..]);
            rest = &rest[..idx];
        }

        match rest.find(PROTOCOL_SEPARATOR) {
            Some(idx) => {
                self.protocol = rest[..idx].to_string();
                rest = &rest[idx + PROTOCOL_SEPARATOR.len()..];
            }
            None => self.protocol.clear(),
        }

        match rest.find('/') {
            Some(idx) => {
                self.hostname = rest[..idx].to_string();
                self.path = rest[idx + 1..].to_string();
            }
            None => {
                self.hostname = rest.to_string();
                self.path.clear();
            }
        }

        self.update_kind(kind);
    }

    /// Serialize back to `protocol://hostname/path[?params]`; folder URLs
    /// get a trailing `/`.
    pub fn to_url_string(&self, with_parameters: bool) -> String {
        let mut out = format!(
            "{}{}{}/{}",
            self.protocol, PROTOCOL_SEPARATOR, self.hostname, self.path
        );
        if self.is_folder() && !out.ends_with('/') {
            out.push('/');
        }
        if with_parameters && !self.parameters.is_empty() {
            out.push('?');
            out.push_str(&encode::encode_params(&self.parameters));
        }
        out
    }

    /// Last path segment, optionally without the extension.
    pub fn name(&self, with_extension: bool) -> String {
        let name = match self.path.rfind('/') {
            Some(idx) => &self.path[idx + 1..],
            None => self.path.as_str(),
        };
        if with_extension {
            name.to_string()
        } else {
            match name.rfind('.') {
                Some(idx) => name[..idx].to_string(),
                None => name.to_string(),
            }
        }
    }

    /// Replace the last path segment; the kind is preserved.
    pub fn set_name(&mut self, name: &str) {
        match self.path.rfind('/') {
            Some(idx) => self.path.truncate(idx),
            None => self.path.clear(),
        }
        let kind = match self.kind() {
            UrlKind::File => KindHint::File,
            UrlKind::Folder => KindHint::Folder,
        };
        self.descend(name, kind);
    }

    /// Path without the last segment (empty if there is none).
    pub fn parent_path(&self) -> String {
        match self.path.rfind('/') {
            Some(idx) => self.path[..idx].to_string(),
            None => String::new(),
        }
    }

    /// Extension of the last segment, lowercased. `None` when the name
    /// has no dot; dots in parent folder names are ignored.
    pub fn extension(&self) -> Option<String> {
        let name = self.name(true);
        name.rfind('.')
            .map(|idx| name[idx + 1..].to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }

    /// Set or append the extension. With `replace` the current extension
    /// (if any) is removed first; without it an identical existing
    /// extension is left alone rather than doubled.
    pub fn set_extension(&mut self, ext: &str, replace: bool) {
        if replace {
            if let Some(idx) = self.path.rfind('.') {
                // only when the dot belongs to the name, not a folder
                let slash = self.path.rfind('/');
                if slash.map_or(true, |s| idx > s) {
                    self.path.truncate(idx);
                }
            }
        } else {
            let test = format!(".{}", ext);
            if self.path.to_ascii_lowercase().ends_with(&test.to_ascii_lowercase()) {
                return;
            }
        }

        if !ext.is_empty() {
            self.path.push('.');
            self.path.push_str(ext);
        }
    }

    /// True for `""`, `"/"`, `"C:"` and `"C:/"` paths.
    pub fn is_root_path(&self) -> bool {
        let p = self.path.as_bytes();
        match p.len() {
            0 => true,
            1 => p[0] == b'/',
            2 => p[1] == b':',
            3 => p[1] == b':' && p[2] == b'/',
            _ => false,
        }
    }

    /// Remove the last path segment; fails when already at a root.
    pub fn ascend(&mut self) -> bool {
        if let Some(idx) = self.path.rfind('/') {
            self.path.truncate(idx);
            self.kind = Some(UrlKind::Folder);
            true
        } else if !self.is_root_path() && !self.path.is_empty() {
            self.path.clear();
            self.kind = Some(UrlKind::Folder);
            true
        } else {
            false
        }
    }

    /// Append a path segment (or a `/`-separated run of segments).
    pub fn descend(&mut self, name: &str, kind: KindHint) {
        if !self.path.is_empty() && !self.path.ends_with('/') && !name.starts_with('/') {
            self.path.push('/');
        }
        self.path.push_str(name);
        self.update_kind(kind);
    }

    /// A URL is relative when its path is empty, `.`/`..`, or starts with
    /// an explicit dot segment.
    pub fn is_relative(&self) -> bool {
        self.path.is_empty()
            || self.path == "."
            || self.path == ".."
            || self.path.starts_with("./")
            || self.path.starts_with("../")
    }

    pub fn is_absolute(&self) -> bool {
        !self.is_relative()
    }

    /// True for URLs addressing the native file system.
    pub fn is_native_path(&self) -> bool {
        self.protocol == FILE_PROTOCOL
    }

    /// Resolve this relative URL against an absolute base folder.
    /// Fails when the URL is already absolute.
    pub fn make_absolute(&mut self, base: &Url) -> bool {
        if self.is_absolute() {
            return false;
        }

        self.protocol = base.protocol.clone();
        self.hostname = base.hostname.clone();

        if self.path.is_empty() {
            self.path = base.path.clone();
            self.kind = Some(UrlKind::Folder);
            return true;
        }

        let relative = std::mem::take(&mut self.path);
        let old_kind = self.kind;
        self.path = base.path.clone();
        for token in relative.split('/').filter(|t| !t.is_empty()) {
            match token {
                "." => {}
                ".." => {
                    self.ascend();
                }
                name => self.descend(name, KindHint::Folder),
            }
        }
        self.kind = old_kind;
        true
    }

    /// Derive a `./…` path relative to a base folder. Fails when already
    /// relative or when protocol/hostname differ.
    pub fn make_relative(&mut self, base: &Url) -> bool {
        if self.is_relative() {
            return false;
        }
        if base.protocol != self.protocol || base.hostname != self.hostname {
            return false;
        }

        let mut base_path = base.path.clone();
        if base_path != "/" && !base_path.is_empty() {
            base_path.push('/');
        }

        let case_sensitive = self.is_case_sensitive();
        if base_path.is_empty() || starts_with(&self.path, &base_path, case_sensitive) {
            self.path.drain(..base_path.len());
            if self.path.starts_with('/') {
                self.path.remove(0);
            }
            if !self.path.is_empty() {
                self.path.insert_str(0, "./");
            }
            self.hostname.clear(); // relative URLs carry no hostname
            true
        } else if self.path == base.path {
            self.path = ".".to_string();
            self.hostname.clear();
            true
        } else {
            false
        }
    }

    /// Apply normalization passes. `REMOVE_DOT_SEGMENTS` collapses `.`
    /// and `..` left to right; a `..` at the root is dropped rather than
    /// reported as an error.
    pub fn normalize(&mut self, flags: Normalize) {
        if flags.contains(Normalize::REMOVE_DOT_SEGMENTS) {
            self.remove_dot_segments();
        }
    }

    fn remove_dot_segments(&mut self) {
        if !self.path.split('/').any(|s| s == "." || s == "..") {
            return;
        }

        let mut result = Url {
            protocol: std::mem::take(&mut self.protocol),
            hostname: std::mem::take(&mut self.hostname),
            ..Url::default()
        };
        for segment in self.path.split('/').filter(|s| !s.is_empty()) {
            match segment {
                "." => {}
                ".." => {
                    result.ascend(); // excess ascents at the root are clamped
                }
                name => result.descend(name, KindHint::Folder),
            }
        }
        result.kind = self.kind;
        result.parameters = std::mem::take(&mut self.parameters);
        *self = result;
    }

    /// Case sensitivity of comparisons involving this URL: file URLs ask
    /// the native file-system policy, every other protocol compares
    /// case-sensitively.
    pub fn is_case_sensitive(&self) -> bool {
        crate::fs::native_paths_case_sensitive() || self.protocol != FILE_PROTOCOL
    }

    /// Component-wise equality. Hostname and path comparison honor the
    /// platform case-sensitivity policy; for `file` URLs a `localhost`
    /// hostname equals the empty one. Protocols always compare
    /// case-sensitively; parameters compare in order when requested.
    pub fn is_equal_url(&self, other: &Url, with_parameters: bool) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        if self.protocol != other.protocol {
            return false;
        }

        let case_sensitive = self.is_case_sensitive();
        let host_a = sanitize_host(&self.protocol, &self.hostname);
        let host_b = sanitize_host(&other.protocol, &other.hostname);
        if !eq_str(host_a, host_b, case_sensitive) {
            return false;
        }

        // tolerate one leading slash too many on either side
        let path_a = self.path.strip_prefix('/').unwrap_or(&self.path);
        let path_b = other.path.strip_prefix('/').unwrap_or(&other.path);
        if !eq_str(path_a, path_b, case_sensitive) {
            return false;
        }

        if with_parameters && self.parameters != other.parameters {
            return false;
        }
        true
    }

    /// True iff `child` is a strict path descendant (segment-boundary
    /// prefix, so `/foo` does not contain `/foobar`). A URL with empty
    /// hostname and path contains every URL of the same protocol.
    pub fn contains(&self, child: &Url) -> bool {
        if self.protocol != child.protocol {
            return false;
        }
        if self.hostname != child.hostname {
            return self.hostname.is_empty() && self.path.is_empty();
        }
        if self.path.is_empty() {
            return true;
        }

        let mut prefix = self.path.clone();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        starts_with(&child.path, &prefix, self.is_case_sensitive())
    }

    /// Ordered query parameters.
    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a parameter, replacing an existing value for the same key.
    pub fn set_parameter(&mut self, key: &str, value: &str) {
        match self.parameters.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.parameters.push((key.to_string(), value.to_string())),
        }
    }

    pub fn remove_parameter(&mut self, key: &str) {
        self.parameters.retain(|(k, _)| k != key);
    }

    /// Replace all parameters from an encoded query string.
    pub fn set_parameters_from_query(&mut self, query: &str) {
        self.parameters = encode::decode_params(query);
    }

    /// Encoded query string form of the parameters.
    pub fn query_string(&self) -> String {
        encode::encode_params(&self.parameters)
    }

    /// Build from a native platform path. Windows drive and UNC forms
    /// (`C:\…`, `\\server\share\…`, `\\?\C:\…`) and POSIX paths are
    /// accepted on every platform; backslashes are normalized to `/`
    /// because foreign paths show up in imported documents.
    pub fn from_native_path(path: &str, kind: KindHint) -> Url {
        let mut url = Url::default();

        if path.is_empty() {
            url.update_kind(kind);
            return url;
        }

        for prefix in UNC_PREFIXES {
            if let Some(rest) = path.strip_prefix(prefix) {
                let s = format!("{}:///{}", FILE_PROTOCOL, rest.replace('\\', "/"));
                url.set_url(&s, kind);
                return url;
            }
        }

        if path.starts_with("\\\\") {
            // network path: \\hostname\share\… → file://hostname/share/…
            let s = format!("{}:{}", FILE_PROTOCOL, path.replace('\\', "/"));
            url.set_url(&s, kind);
            return url;
        }

        url.protocol = FILE_PROTOCOL.to_string();
        url.path = path.strip_prefix('/').unwrap_or(path).replace('\\', "/");
        url.update_kind(kind);
        url
    }

    /// Native platform string form. `None` when the path is empty.
    #[cfg(windows)]
    pub fn to_native_path_string(&self) -> Option<String> {
        if self.path.is_empty() {
            return None;
        }
        let mut out = self.path.replace('/', "\\");
        if !self.hostname.is_empty() && self.is_native_path() {
            out = format!("\\\\{}\\{}", self.hostname, out);
        }
        Some(out)
    }

    /// Native platform string form. `None` when the path is empty.
    #[cfg(not(windows))]
    pub fn to_native_path_string(&self) -> Option<String> {
        if self.path.is_empty() {
            return None;
        }
        if self.path.starts_with('/') || self.path.starts_with("./") {
            Some(self.path.clone())
        } else {
            Some(format!("/{}", self.path))
        }
    }

    /// Native path as `PathBuf` for handing to `std::fs`.
    pub fn to_native_path(&self) -> Option<std::path::PathBuf> {
        self.to_native_path_string().map(std::path::PathBuf::from)
    }

    /// Human-facing form: the native path for file URLs, the URL string
    /// otherwise.
    pub fn display_string(&self) -> String {
        if self.is_native_path() {
            if let Some(native) = self.to_native_path_string() {
                return native;
            }
        }
        self.to_url_string(false)
    }

    /// Mutate the name until no file exists at this URL in `fs`,
    /// appending ` 2`, ` 3`, … before the extension. Without
    /// `force_suffix` the unmodified name wins when it is free. An
    /// already-present counter suffix is stripped first so repeated calls
    /// don't pile up suffixes.
    pub fn make_unique(&mut self, fs: &dyn FileSystem, force_suffix: bool) {
        if !force_suffix && !fs.file_exists(self) {
            return;
        }

        let (mut stem, ext) = if self.is_file() {
            (self.name(false), self.extension())
        } else {
            (self.name(true), None) // folder names keep their dots
        };

        if let Some(idx) = stem.rfind(' ') {
            if stem[idx + 1..].parse::<u64>().is_ok() {
                stem.truncate(idx);
            }
        }

        let mut counter: u64 = if force_suffix { 1 } else { 2 };
        loop {
            let mut candidate = format!("{} {}", stem, counter);
            if let Some(ext) = &ext {
                candidate.push('.');
                candidate.push_str(ext);
            }
            self.set_name(&candidate);
            counter += 1;
            if !fs.file_exists(self) {
                return;
            }
        }
    }

    /// Localization probe: prefer `name-<lang>.ext` next to this file
    /// when it exists in `fs`. English is the neutral base and never
    /// redirects. Returns whether a redirect happened.
    pub fn localize(&mut self, language: &str, fs: &dyn FileSystem) -> bool {
        if language.is_empty() || language == "en" {
            return false;
        }

        let mut candidate = self.clone();
        let stem = candidate.name(false);
        let ext = candidate.extension();
        let mut name = format!("{}-{}", stem, language);
        if let Some(ext) = ext {
            name.push('.');
            name.push_str(&ext);
        }
        candidate.set_name(&name);

        if fs.file_exists(&candidate) {
            *self = candidate;
            return true;
        }
        false
    }

    fn update_kind(&mut self, hint: KindHint) {
        match hint {
            KindHint::Detect => {
                if self.path.ends_with('/') {
                    if self.path.len() > 1 {
                        self.path.pop();
                    }
                    self.kind = Some(UrlKind::Folder);
                } else if self.path.is_empty() {
                    self.kind = Some(UrlKind::Folder);
                } else {
                    self.kind = Some(UrlKind::File);
                }
            }
            KindHint::File | KindHint::Folder => {
                self.kind = Some(if hint == KindHint::File {
                    UrlKind::File
                } else {
                    UrlKind::Folder
                });
                if self.path.len() > 1 && self.path.ends_with('/') {
                    self.path.pop();
                }
            }
        }
    }
}

impl PartialEq for Url {
    fn eq(&self, other: &Url) -> bool {
        self.is_equal_url(other, true)
    }
}

impl Eq for Url {}

impl std::fmt::Display for Url {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_string())
    }
}

/// A URL paired with a display title; ordering ignores case so titled
/// lists sort the way users expect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlWithTitle {
    pub url: Url,
    pub title: String,
}

impl UrlWithTitle {
    pub fn new(url: Url, title: &str) -> UrlWithTitle {
        UrlWithTitle {
            url,
            title: title.to_string(),
        }
    }

    /// The title when present, the URL display string otherwise.
    pub fn display(&self) -> String {
        if self.title.is_empty() {
            self.url.display_string()
        } else {
            self.title.clone()
        }
    }
}

impl PartialOrd for UrlWithTitle {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UrlWithTitle {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.display()
            .to_lowercase()
            .cmp(&other.display().to_lowercase())
    }
}

/// File names that are safe on every supported platform: reserved
/// characters and ASCII control characters become `_`, reserved Windows
/// device names get a trailing underscore.
pub fn legal_file_name(name: &str) -> String {
    const INVALID: &[char] = &['?', '*', '/', '\\', '<', '>', '|', ':', '"', '\t', '\r', '\n'];
    const DEVICE_NAMES: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
        "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];

    let mut out: String = name
        .chars()
        .map(|c| {
            if INVALID.contains(&c) || (c as u32) < 32 {
                '_'
            } else {
                c
            }
        })
        .collect();

    let stem = out.split('.').next().unwrap_or("").to_ascii_uppercase();
    if DEVICE_NAMES.contains(&stem.as_str()) {
        out.push('_');
    }
    out
}

/// Like [`legal_file_name`], additionally stripping trailing dots, which
/// folder names must not carry.
pub fn legal_folder_name(name: &str) -> String {
    let mut out = legal_file_name(name);
    while out.ends_with('.') {
        out.pop();
    }
    out
}

fn sanitize_host<'a>(protocol: &str, hostname: &'a str) -> &'a str {
    // file://localhost/… and file:///… address the same machine
    if protocol == FILE_PROTOCOL && hostname.eq_ignore_ascii_case(LOCALHOST) {
        ""
    } else {
        hostname
    }
}

fn eq_str(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.to_lowercase() == b.to_lowercase()
    }
}

fn starts_with(s: &str, prefix: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        s.starts_with(prefix)
    } else {
        s.len() >= prefix.len()
            && s.is_char_boundary(prefix.len())
            && eq_str(&s[..prefix.len()], prefix, false)
    }
}

//! File types and the extension/MIME registry.
//!
//! A `FileType` associates an extension with a human description and a
//! MIME type. The registry answers lookups by extension, MIME type or
//! URL; the plug-in scanner asks it for the platform module type.

use crate::url::Url;

/// Native dynamic-library extension for the current platform.
#[cfg(target_os = "windows")]
pub const MODULE_EXTENSION: &str = "dll";
#[cfg(target_os = "macos")]
pub const MODULE_EXTENSION: &str = "dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const MODULE_EXTENSION: &str = "so";

/// A registered file type. Equality compares the extension only,
/// ignoring ASCII case.
#[derive(Clone, Debug, Default)]
pub struct FileType {
    extension: String,
    description: String,
    mime_type: String,
}

impl FileType {
    pub fn new(extension: &str, description: &str, mime_type: &str) -> FileType {
        FileType {
            extension: extension.to_string(),
            description: description.to_string(),
            mime_type: mime_type.to_string(),
        }
    }

    /// A bare type carrying only an extension (unregistered lookup miss).
    pub fn from_extension(extension: &str) -> FileType {
        FileType {
            extension: extension.to_string(),
            ..FileType::default()
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn is_valid(&self) -> bool {
        !self.extension.is_empty()
    }
}

impl PartialEq for FileType {
    fn eq(&self, other: &FileType) -> bool {
        self.extension.eq_ignore_ascii_case(&other.extension)
    }
}

impl Eq for FileType {}

/// Registry of known file types. Consumers get a reference injected
/// rather than reaching for a process global.
#[derive(Debug, Default)]
pub struct FileTypeRegistry {
    types: Vec<FileType>,
}

impl FileTypeRegistry {
    pub fn new() -> FileTypeRegistry {
        FileTypeRegistry::default()
    }

    /// Registry preloaded with the types the framework itself relies on,
    /// most importantly the platform module type used by plug-in scans.
    pub fn with_defaults() -> FileTypeRegistry {
        let mut registry = FileTypeRegistry::new();
        registry.register(FileType::new(
            MODULE_EXTENSION,
            "Plug-in Module",
            "application/octet-stream",
        ));
        registry.register(FileType::new("json", "JSON Document", "application/json"));
        registry.register(FileType::new("toml", "TOML Document", "application/toml"));
        registry.register(FileType::new("txt", "Text Document", "text/plain"));
        registry.register(FileType::new("zip", "ZIP Archive", "application/zip"));
        registry
    }

    /// Register a type; a type with the same extension is replaced.
    pub fn register(&mut self, file_type: FileType) {
        self.types.retain(|t| t != &file_type);
        self.types.push(file_type);
    }

    pub fn by_extension(&self, extension: &str) -> Option<&FileType> {
        self.types
            .iter()
            .find(|t| t.extension.eq_ignore_ascii_case(extension))
    }

    pub fn by_mime_type(&self, mime_type: &str) -> Option<&FileType> {
        self.types
            .iter()
            .find(|t| t.mime_type.eq_ignore_ascii_case(mime_type))
    }

    /// Type for a URL's extension. Unknown extensions yield a bare
    /// extension-only type; folders have no file type.
    pub fn for_url(&self, url: &Url) -> Option<FileType> {
        if url.is_folder() {
            return None;
        }
        let ext = url.extension()?;
        Some(
            self.by_extension(&ext)
                .cloned()
                .unwrap_or_else(|| FileType::from_extension(&ext)),
        )
    }

    /// The registered module (plug-in binary) type.
    pub fn module_type(&self) -> Option<&FileType> {
        self.by_extension(MODULE_EXTENSION)
    }
}

/// Include filter over file types; folders pass when `allow_folders` is
/// set. The exclude variant inverts the type match.
#[derive(Debug, Default)]
pub struct FileTypeFilter {
    types: Vec<FileType>,
    pub allow_folders: bool,
}

impl FileTypeFilter {
    pub fn new(allow_folders: bool) -> FileTypeFilter {
        FileTypeFilter {
            types: Vec::new(),
            allow_folders,
        }
    }

    pub fn add(&mut self, file_type: FileType) {
        self.types.push(file_type);
    }

    pub fn matches_type(&self, file_type: &FileType) -> bool {
        self.types.iter().any(|t| t == file_type)
    }

    pub fn matches_url(&self, url: &Url, registry: &FileTypeRegistry) -> bool {
        if url.is_folder() {
            return self.allow_folders;
        }
        registry
            .for_url(url)
            .map(|t| self.matches_type(&t))
            .unwrap_or(false)
    }
}

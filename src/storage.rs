//! Blob storage used to fetch workbooks and publish tables.

use crate::error::IngestError;
use crate::error::ResultMessage;
use glob::Pattern;
use std::fs;
use std::io::ErrorKind;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Blob '{0}' not found")]
    NotFound(String),

    #[error("Invalid blob path '{0}'")]
    InvalidPath(String),

    #[error("Unsupported storage location '{0}', only local directories are supported")]
    UnsupportedLocation(String),
}

/// Path-addressed blob storage. Paths use `/` separators and are relative to
/// the store's container.
pub trait BlobStore {
    fn read(&self, path: &str) -> Result<Vec<u8>, IngestError>;

    /// Writes a blob, replacing any previous content.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), IngestError>;

    /// Blob paths matching a glob pattern, sorted.
    fn list(&self, pattern: &str) -> Result<Vec<String>, IngestError>;

    fn delete(&self, path: &str) -> Result<(), IngestError>;
}

/// Blobs stored as files under a root directory.
#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        LocalBlobStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a blob path below the root, rejecting absolute paths and `..`.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let is_contained = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || !is_contained {
            return Err(StorageError::InvalidPath(path.to_owned()));
        }
        Ok(self.root.join(relative))
    }

    fn blob_path(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let parts = relative
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join("/"))
    }
}

fn not_found(path: &str, e: std::io::Error) -> IngestError {
    if e.kind() == ErrorKind::NotFound {
        StorageError::NotFound(path.to_owned()).into()
    } else {
        e.into()
    }
}

impl BlobStore for LocalBlobStore {
    fn read(&self, path: &str) -> Result<Vec<u8>, IngestError> {
        let file = self.resolve(path)?;
        debug!(path, "Reading blob");
        fs::read(&file).map_err(|e| not_found(path, e))
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), IngestError> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)
                .map_err(IngestError::from)
                .with_prefix(path)?;
        }
        debug!(path, bytes = bytes.len(), "Writing blob");
        fs::write(&file, bytes).map_err(IngestError::from).with_prefix(path)
    }

    fn list(&self, pattern: &str) -> Result<Vec<String>, IngestError> {
        Pattern::new(pattern)?;
        let root = Pattern::escape(&self.root.to_string_lossy());
        let full = format!("{}/{}", root.trim_end_matches('/'), pattern);
        let mut paths = Vec::new();
        for entry in glob::glob(&full)? {
            let file = entry.map_err(|e| e.into_error())?;
            if file.is_file() {
                paths.extend(self.blob_path(&file));
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn delete(&self, path: &str) -> Result<(), IngestError> {
        let file = self.resolve(path)?;
        fs::remove_file(&file).map_err(|e| not_found(path, e))
    }
}

/// Checks if a location names a remote object store.
pub fn is_remote_url(location: &str) -> bool {
    match Url::parse(location) {
        Ok(url) => matches!(
            url.scheme(),
            "http" | "https" | "s3" | "gs" | "az" | "abfs" | "abfss" | "wasb" | "wasbs"
        ),
        Err(_) => false,
    }
}

/// Opens the store named by a directory path or `file://` URL.
pub fn open_store(location: &str) -> Result<LocalBlobStore, IngestError> {
    if is_remote_url(location) {
        return Err(StorageError::UnsupportedLocation(location.to_owned()).into());
    }
    let root = match Url::parse(location) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|_| StorageError::UnsupportedLocation(location.to_owned()))?,
        _ => PathBuf::from(location),
    };
    if !root.is_dir() {
        return Err(StorageError::NotFound(location.to_owned()).into());
    }
    Ok(LocalBlobStore::new(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        store.write("Reports/Inbox/a.csv", b"first").unwrap();
        store.write("Reports/Inbox/a.csv", b"second").unwrap();
        assert_eq!(store.read("Reports/Inbox/a.csv").unwrap(), b"second");
    }

    #[test]
    fn missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let error = store.read("nope.xlsx").unwrap_err();
        assert_eq!(error.to_string(), "Blob 'nope.xlsx' not found");
        assert!(store.delete("nope.xlsx").is_err());
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let store = LocalBlobStore::new("/tmp/store");
        assert!(matches!(store.resolve("../etc/passwd"), Err(StorageError::InvalidPath(_))));
        assert!(matches!(store.resolve("/etc/passwd"), Err(StorageError::InvalidPath(_))));
        assert!(store.resolve("Reports/a.xlsx").is_ok());
    }

    #[test]
    fn list_matches_glob_below_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        store.write("Arrears/Arrears - Dec 2023.xlsx", b"x").unwrap();
        store.write("Arrears/Arrears - Jan 2024.xlsx", b"x").unwrap();
        store.write("Arrears/notes.txt", b"x").unwrap();
        let listed = store.list("Arrears/*.xlsx").unwrap();
        assert_eq!(listed, vec!["Arrears/Arrears - Dec 2023.xlsx", "Arrears/Arrears - Jan 2024.xlsx"]);
        store.delete("Arrears/notes.txt").unwrap();
        assert!(store.list("Arrears/*.txt").unwrap().is_empty());
    }

    #[test]
    fn remote_locations_are_rejected() {
        assert!(is_remote_url("https://account.blob.core.windows.net/bronze"));
        assert!(is_remote_url("az://bronze/reports"));
        assert!(!is_remote_url("./data"));
        assert!(!is_remote_url("file:///data"));
        assert!(open_store("https://account.blob.core.windows.net/bronze").is_err());
    }

    #[test]
    fn opens_directory_and_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().to_string();
        assert_eq!(open_store(&path).unwrap().root(), dir.path());
        let url = Url::from_file_path(dir.path()).unwrap();
        assert_eq!(open_store(url.as_str()).unwrap().root(), dir.path());
        assert!(open_store(&format!("{}/missing", path)).is_err());
    }
}

//! Artifact storage.
//!
//! Generated heat maps are kept in an [`ArtifactStore`] instead of being
//! discovered by scanning a well-known output folder. The directory-backed
//! store writes through [`write_atomic`], so an aborted run never leaves a
//! partially written artifact where `list` would find it.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use thiserror::Error;
use tracing::debug;

/// Errors returned by artifact stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("artifact '{0}' not found")]
    NotFound(String),
    #[error("invalid artifact id '{0}'")]
    InvalidId(String),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Keyed storage for rendered artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Stores `content` under `id`, replacing any previous artifact with that
    /// id, and returns where it now lives.
    fn put(&self, id: &str, content: &[u8]) -> Result<PathBuf, StoreError>;

    /// Artifact ids, most recently stored first.
    fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Contents of the artifact with the given id.
    fn get(&self, id: &str) -> Result<Vec<u8>, StoreError>;
}

/// Store backed by one directory, one file per artifact.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    /// Only files with this extension are listed, when set.
    extension: Option<String>,
}

impl DirectoryStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            extension: None,
        })
    }

    /// Restricts `list` to files ending in `.{ext}`.
    pub fn with_extension(mut self, ext: &str) -> Self {
        self.extension = Some(ext.trim_start_matches('.').to_string());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        validate_id(id)?;
        Ok(self.root.join(id))
    }
}

impl ArtifactStore for DirectoryStore {
    fn put(&self, id: &str, content: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.path_for(id)?;
        write_atomic(&path, content).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(id, bytes = content.len(), "artifact stored");
        Ok(path)
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.root.clone(),
            source,
        };

        let mut entries: Vec<(SystemTime, String)> = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            // Hidden names include in-flight temporary files.
            if name.starts_with('.') {
                continue;
            }
            if let Some(ext) = &self.extension {
                if Path::new(&name).extension().and_then(|e| e.to_str()) != Some(ext.as_str()) {
                    continue;
                }
            }
            let meta = entry.metadata().map_err(io_err)?;
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((modified, name));
        }

        // Newest first; ties broken by name so the order is stable.
        entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        Ok(entries.into_iter().map(|(_, name)| name).collect())
    }

    fn get(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(id.to_string())),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

/// Rejects ids that could escape the store directory or collide with
/// temporary files.
fn validate_id(id: &str) -> Result<(), StoreError> {
    let bad = id.is_empty()
        || id.starts_with('.')
        || id.contains(['/', '\\', '\0'])
        || id == "..";
    if bad {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes `bytes` to `path` via a hidden temporary sibling and a rename.
///
/// Readers see either the previous file or the complete new one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    let tmp = dir.join(format!(
        ".{}.tmp-{}-{}",
        name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

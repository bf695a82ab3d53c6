//! In-memory sandbox filesystem and persistent backing store.
//!
//! [`SimSandbox`] models the sandbox's volatile filesystem: it starts empty
//! every session. [`BackingStore`] models the browser's durable storage: it
//! is shared between sessions and only changes when a flush copies the
//! mounted subtree into it.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use sandbridge_core::{Sandbox, SandboxError, StorageError};

/// Durable storage surviving across simulated sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackingStore {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl BackingStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a file or directory is stored at `path`.
    pub fn contains(&self, path: &Path) -> bool {
        self.dirs.contains(path) || self.files.contains_key(path)
    }

    /// Stored file contents.
    pub fn file(&self, path: &Path) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Number of stored files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Store a file along with its ancestor directories, as if a previous
    /// session had flushed it.
    pub fn seed_file(&mut self, path: &Path, contents: &[u8]) {
        if let Some(parent) = path.parent() {
            self.dirs.extend(parent.ancestors().map(Path::to_path_buf));
        }
        self.files.insert(path.to_path_buf(), contents.to_vec());
    }

    /// Drop everything, the way a browser evicts site data.
    pub fn evict(&mut self) {
        self.dirs.clear();
        self.files.clear();
    }
}

/// Backing store shared between sessions.
pub type SharedBacking = Arc<Mutex<BackingStore>>;

/// Create an empty shared backing store.
pub fn create_shared_backing() -> SharedBacking {
    Arc::new(Mutex::new(BackingStore::new()))
}

/// Volatile in-memory filesystem of one session.
#[derive(Debug, Clone)]
pub struct SimSandbox {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
    mounts: BTreeSet<PathBuf>,
}

impl Default for SimSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl SimSandbox {
    /// Filesystem containing only the root directory.
    pub fn new() -> Self {
        Self {
            dirs: BTreeSet::from([PathBuf::from("/")]),
            files: BTreeMap::new(),
            mounts: BTreeSet::new(),
        }
    }

    /// Whether persistent backing is attached at `path`.
    pub fn is_mounted(&self, path: &Path) -> bool {
        self.mounts.contains(path)
    }

    /// File contents.
    pub fn read_file(&self, path: &Path) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Create or replace a file. The parent directory must exist.
    pub fn write_file(&mut self, path: &Path, contents: &[u8]) -> Result<(), SandboxError> {
        if self.dirs.contains(path) {
            return Err(SandboxError::AlreadyExists(path.to_path_buf()));
        }
        self.require_parent(path)?;
        self.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    /// Copy the backing store's subtree under `mount` into memory.
    pub fn load_from(&mut self, mount: &Path, backing: &BackingStore) -> Result<(), StorageError> {
        self.require_mount(mount)?;
        self.dirs.extend(backing.dirs.iter().filter(|p| p.starts_with(mount)).cloned());
        self.files.extend(
            backing
                .files
                .iter()
                .filter(|(p, _)| p.starts_with(mount))
                .map(|(p, c)| (p.clone(), c.clone())),
        );
        Ok(())
    }

    /// Replace the backing store's subtree under `mount` with memory.
    pub fn flush_to(&self, mount: &Path, backing: &mut BackingStore) -> Result<(), StorageError> {
        self.require_mount(mount)?;
        backing.dirs.retain(|p| !p.starts_with(mount));
        backing.files.retain(|p, _| !p.starts_with(mount));
        backing.dirs.extend(self.dirs.iter().filter(|p| p.starts_with(mount)).cloned());
        backing.files.extend(
            self.files
                .iter()
                .filter(|(p, _)| p.starts_with(mount))
                .map(|(p, c)| (p.clone(), c.clone())),
        );
        Ok(())
    }

    fn require_mount(&self, mount: &Path) -> Result<(), StorageError> {
        if self.mounts.contains(mount) {
            Ok(())
        } else {
            Err(StorageError::Unavailable(format!("{} is not mounted", mount.display())))
        }
    }

    fn require_parent(&self, path: &Path) -> Result<(), SandboxError> {
        match path.parent() {
            Some(parent) if !self.dirs.contains(parent) => {
                Err(SandboxError::MissingParent(path.to_path_buf()))
            },
            _ => Ok(()),
        }
    }
}

impl Sandbox for SimSandbox {
    fn create_dir(&mut self, path: &Path) -> Result<(), SandboxError> {
        if self.exists(path) {
            return Err(SandboxError::AlreadyExists(path.to_path_buf()));
        }
        self.require_parent(path)?;
        self.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.dirs.contains(path) || self.files.contains_key(path)
    }

    fn mount_persistent(&mut self, path: &Path) -> Result<(), SandboxError> {
        if !self.dirs.contains(path) {
            return Err(SandboxError::Mount {
                path: path.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }
        self.mounts.insert(path.to_path_buf());
        Ok(())
    }
}

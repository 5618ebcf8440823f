//! Atomic TOML file operations with ACID guarantees.
//!
//! Provides a thin layer for safe concurrent access to TOML files.

use accord_core::error::{AccordError, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A handle to an atomic TOML file.
///
/// Provides:
/// - **Atomicity**: Updates are all-or-nothing via tmp file + atomic rename
/// - **Isolation**: File locking prevents concurrent modifications
/// - **Durability**: Explicit fsync before rename
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a new atomic TOML file handle.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    /// Loads the TOML file and deserializes it.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))`: Successfully loaded and deserialized
    /// - `Ok(None)`: File doesn't exist or is empty
    /// - `Err`: Failed to read or parse the file
    pub fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        let data: T = toml::from_str(&content)?;
        Ok(Some(data))
    }

    /// Saves data to the TOML file atomically.
    ///
    /// Uses a temporary file + atomic rename to ensure durability.
    pub fn save(&self, data: &T) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(data)?;

        // Write to temporary file in the same directory
        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(toml_string.as_bytes())?;

        // Ensure data is written to disk
        tmp_file.sync_all()?;
        drop(tmp_file);

        // Atomic rename
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    /// Performs a transactional update with file locking.
    ///
    /// The update function receives a mutable reference to the current
    /// data and can modify it. If it returns `Ok(())`, the changes are
    /// atomically written back to the file.
    pub fn update<F>(&self, default_value: T, f: F) -> Result<()>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut data = self.load()?.unwrap_or(default_value);
        f(&mut data)?;
        self.save(&data)?;

        Ok(())
    }

    /// Gets a temporary file path for atomic writes.
    fn temp_path(&self) -> Result<PathBuf> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| AccordError::io("Path has no parent directory"))?;

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| AccordError::io("Path has no file name"))?;

        let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
        Ok(parent.join(tmp_name))
    }
}

/// A file lock guard that automatically releases the lock when dropped.
pub(crate) struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    /// Acquires an exclusive lock next to the given path.
    pub(crate) fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| AccordError::io(format!("Failed to acquire lock: {}", e)))?;
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Unlock is automatic when the file handle is dropped.
        // Removing the lock file is best effort.
        let _ = fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let file: AtomicTomlFile<Sample> = AtomicTomlFile::new(dir.path().join("missing.toml"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file: AtomicTomlFile<Sample> = AtomicTomlFile::new(dir.path().join("sample.toml"));
        let data = Sample {
            name: "accord".to_string(),
            count: 3,
        };
        file.save(&data).unwrap();
        assert_eq!(file.load().unwrap(), Some(data));
    }

    #[test]
    fn test_update_applies_transactionally() {
        let dir = tempfile::tempdir().unwrap();
        let file: AtomicTomlFile<Sample> = AtomicTomlFile::new(dir.path().join("sample.toml"));
        let default = Sample {
            name: "accord".to_string(),
            count: 0,
        };
        file.update(default.clone(), |data| {
            data.count += 1;
            Ok(())
        })
        .unwrap();
        file.update(default, |data| {
            data.count += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(file.load().unwrap().unwrap().count, 2);
    }
}

//! TOML-based SessionRepository implementation

use crate::atomic_toml::FileLock;
use crate::dto::SessionDto;
use accord_core::error::{AccordError, Result};
use accord_core::session::{ConflictSession, SessionRepository};
use async_trait::async_trait;
use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

/// A repository implementation storing sessions as one TOML file each.
///
/// Directory layout:
///
/// ```text
/// base_dir/
/// └── sessions/
///     ├── <session-id-1>.toml
///     ├── <session-id-2>.toml
///     └── sessions.lock        # exclusive lock for compare-and-set writes
/// ```
///
/// The compare-and-set in [`save`](SessionRepository::save) is enforced
/// under an exclusive advisory lock on `sessions.lock`: read the stored
/// version, check it, then write via temp file + atomic rename. Lookups
/// by relationship scan the directory; session counts per relationship
/// are small (one active plus history).
pub struct TomlSessionRepository {
    base_dir: PathBuf,
}

impl TomlSessionRepository {
    /// Creates a new `TomlSessionRepository` with the specified base
    /// directory, creating the directory structure if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();

        let sessions_dir = base_dir.join("sessions");
        fs::create_dir_all(&sessions_dir)
            .map_err(|e| AccordError::io(format!("Failed to create sessions directory: {}", e)))?;

        Ok(Self { base_dir })
    }

    /// Creates a repository at the default location (~/.accord).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or if
    /// the directory structure cannot be created.
    pub fn default_location() -> Result<Self> {
        let home_dir =
            dirs::home_dir().ok_or_else(|| AccordError::config("Failed to get home directory"))?;
        Self::new(home_dir.join(".accord"))
    }

    fn sessions_dir(&self) -> PathBuf {
        self.base_dir.join("sessions")
    }

    /// Returns the file path for a given session ID.
    fn session_file_path(&self, session_id: &str) -> PathBuf {
        self.sessions_dir().join(format!("{}.toml", session_id))
    }

    fn lock_file_path(&self) -> PathBuf {
        self.sessions_dir().join("sessions")
    }

    fn read_session(&self, path: &Path) -> Result<Option<ConflictSession>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let dto: SessionDto = toml::from_str(&content)?;
        Ok(Some(dto.into()))
    }

    fn write_session(&self, session: &ConflictSession) -> Result<()> {
        let path = self.session_file_path(&session.id);
        let dto = SessionDto::from(session);
        let toml_string = toml::to_string_pretty(&dto)?;

        let tmp_path = self
            .sessions_dir()
            .join(format!(".{}.toml.tmp", session.id));
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(toml_string.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Reads every session for a relationship by scanning the directory.
    fn scan_relationship(&self, relationship_id: &str) -> Result<Vec<ConflictSession>> {
        let mut sessions = Vec::new();
        for entry in fs::read_dir(self.sessions_dir())? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }
            match self.read_session(&path) {
                Ok(Some(session)) if session.relationship_id == relationship_id => {
                    sessions.push(session);
                }
                Ok(_) => {}
                Err(e) => {
                    // A corrupt file must not hide the rest of the history.
                    tracing::warn!("Skipping unreadable session file {:?}: {}", path, e);
                }
            }
        }
        Ok(sessions)
    }
}

#[async_trait]
impl SessionRepository for TomlSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<ConflictSession>> {
        self.read_session(&self.session_file_path(session_id))
    }

    async fn save(&self, session: &ConflictSession) -> Result<()> {
        let _lock = FileLock::acquire(&self.lock_file_path())?;

        let stored = self.read_session(&self.session_file_path(&session.id))?;
        match stored {
            None if session.version == 1 => {}
            Some(existing) if existing.version + 1 == session.version => {}
            None => {
                return Err(AccordError::conflict(format!(
                    "session '{}' does not exist; cannot write version {}",
                    session.id, session.version
                )));
            }
            Some(existing) => {
                return Err(AccordError::conflict(format!(
                    "session '{}' is at version {}, cannot write version {}",
                    session.id, existing.version, session.version
                )));
            }
        }

        self.write_session(session)?;
        tracing::debug!(
            session_id = %session.id,
            status = %session.status,
            version = session.version,
            "Persisted session transition"
        );
        Ok(())
    }

    async fn find_active_by_relationship(
        &self,
        relationship_id: &str,
    ) -> Result<Option<ConflictSession>> {
        let sessions = self.scan_relationship(relationship_id)?;
        Ok(sessions.into_iter().find(|s| s.is_active()))
    }

    async fn list_by_relationship(&self, relationship_id: &str) -> Result<Vec<ConflictSession>> {
        self.scan_relationship(relationship_id)
    }
}

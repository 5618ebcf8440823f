//! In-memory repository implementations.
//!
//! Used by tests across the workspace and by embedders that do not need
//! durable storage. `MemorySessionRepository` enforces the same
//! compare-and-set contract as the TOML repository so concurrency tests
//! exercise the real write path.

use accord_core::error::{AccordError, Result};
use accord_core::profile::{ParticipantProfile, ProfileRepository};
use accord_core::relationship::{RelationshipParties, RelationshipRegistry};
use accord_core::session::{ConflictSession, SessionRepository};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory session store with compare-and-set saves.
#[derive(Default)]
pub struct MemorySessionRepository {
    sessions: Mutex<HashMap<String, ConflictSession>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<ConflictSession>> {
        let sessions = self.sessions.lock().expect("lock poisoned");
        Ok(sessions.get(session_id).cloned())
    }

    async fn save(&self, session: &ConflictSession) -> Result<()> {
        let mut sessions = self.sessions.lock().expect("lock poisoned");
        match sessions.get(&session.id) {
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
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn find_active_by_relationship(
        &self,
        relationship_id: &str,
    ) -> Result<Option<ConflictSession>> {
        let sessions = self.sessions.lock().expect("lock poisoned");
        Ok(sessions
            .values()
            .find(|s| s.relationship_id == relationship_id && s.is_active())
            .cloned())
    }

    async fn list_by_relationship(&self, relationship_id: &str) -> Result<Vec<ConflictSession>> {
        let sessions = self.sessions.lock().expect("lock poisoned");
        Ok(sessions
            .values()
            .filter(|s| s.relationship_id == relationship_id)
            .cloned()
            .collect())
    }
}

/// In-memory relationship registry.
#[derive(Default)]
pub struct MemoryRelationshipRegistry {
    relationships: Mutex<HashMap<String, RelationshipParties>>,
}

impl MemoryRelationshipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, relationship_id: &str, parties: RelationshipParties) {
        self.relationships
            .lock()
            .expect("lock poisoned")
            .insert(relationship_id.to_string(), parties);
    }
}

#[async_trait]
impl RelationshipRegistry for MemoryRelationshipRegistry {
    async fn resolve(&self, relationship_id: &str) -> Result<Option<RelationshipParties>> {
        let relationships = self.relationships.lock().expect("lock poisoned");
        Ok(relationships.get(relationship_id).cloned())
    }
}

/// In-memory profile store.
#[derive(Default)]
pub struct MemoryProfileRepository {
    profiles: Mutex<HashMap<String, ParticipantProfile>>,
}

impl MemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, profile: ParticipantProfile) {
        self.profiles
            .lock()
            .expect("lock poisoned")
            .insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl ProfileRepository for MemoryProfileRepository {
    async fn find_by_id(&self, party_id: &str) -> Result<Option<ParticipantProfile>> {
        let profiles = self.profiles.lock().expect("lock poisoned");
        Ok(profiles.get(party_id).cloned())
    }
}

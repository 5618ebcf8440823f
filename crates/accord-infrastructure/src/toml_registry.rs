//! TOML-backed relationship registry and profile repository.
//!
//! Both are single-file stores: a map keyed by id inside one TOML file,
//! accessed through `AtomicTomlFile`. Pairing and onboarding write these
//! files; the engine only reads them.

use crate::atomic_toml::AtomicTomlFile;
use accord_core::error::Result;
use accord_core::profile::{ParticipantProfile, ProfileRepository};
use accord_core::relationship::{RelationshipParties, RelationshipRegistry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RelationshipFile {
    #[serde(default)]
    relationships: HashMap<String, RelationshipParties>,
}

/// Resolves relationships from `relationships.toml` under the base dir.
pub struct TomlRelationshipRegistry {
    file: AtomicTomlFile<RelationshipFile>,
}

impl TomlRelationshipRegistry {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            file: AtomicTomlFile::new(base_dir.as_ref().join("relationships.toml")),
        }
    }

    /// Registers or replaces a relationship record. Intended for the
    /// pairing flow and for tests; the engine itself only resolves.
    pub fn upsert(&self, relationship_id: &str, parties: RelationshipParties) -> Result<()> {
        self.file.update(RelationshipFile::default(), |data| {
            data.relationships
                .insert(relationship_id.to_string(), parties);
            Ok(())
        })
    }
}

#[async_trait]
impl RelationshipRegistry for TomlRelationshipRegistry {
    async fn resolve(&self, relationship_id: &str) -> Result<Option<RelationshipParties>> {
        let data = self.file.load()?.unwrap_or_default();
        Ok(data.relationships.get(relationship_id).cloned())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    profiles: HashMap<String, ParticipantProfile>,
}

/// Reads participant profiles from `profiles.toml` under the base dir.
pub struct TomlProfileRepository {
    file: AtomicTomlFile<ProfileFile>,
}

impl TomlProfileRepository {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            file: AtomicTomlFile::new(base_dir.as_ref().join("profiles.toml")),
        }
    }

    /// Stores or replaces a profile. Intended for onboarding and tests.
    pub fn upsert(&self, profile: ParticipantProfile) -> Result<()> {
        self.file.update(ProfileFile::default(), |data| {
            data.profiles.insert(profile.id.clone(), profile);
            Ok(())
        })
    }
}

#[async_trait]
impl ProfileRepository for TomlProfileRepository {
    async fn find_by_id(&self, party_id: &str) -> Result<Option<ParticipantProfile>> {
        let data = self.file.load()?.unwrap_or_default();
        Ok(data.profiles.get(party_id).cloned())
    }
}

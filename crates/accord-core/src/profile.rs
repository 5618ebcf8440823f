//! Participant profile: the immutable attributes the analysis consumes.
//!
//! Profile collection and onboarding are out of scope; the engine only
//! reads the attributes it forwards to the analysis service.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Attachment style, as collected during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentStyle {
    #[default]
    Secure,
    Anxious,
    Avoidant,
    Disorganized,
}

/// Conflict response style, as collected during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStyle {
    Fight,
    Flight,
    #[default]
    Freeze,
    Fawn,
}

/// The analysis-relevant slice of a participant's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantProfile {
    /// Unique participant identifier (UUID format)
    pub id: String,
    /// Display name used when addressing this party in the analysis.
    pub display_name: String,
    #[serde(default)]
    pub attachment_style: AttachmentStyle,
    #[serde(default)]
    pub conflict_style: ConflictStyle,
    /// Known triggers, free-text labels.
    #[serde(default)]
    pub triggers: Vec<String>,
    /// Core beliefs, free-text labels.
    #[serde(default)]
    pub core_beliefs: Vec<String>,
}

/// Read access to participant profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Finds a profile by participant ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(profile))`: profile found
    /// - `Ok(None)`: no profile stored for this ID
    /// - `Err(_)`: storage failure
    async fn find_by_id(&self, party_id: &str) -> Result<Option<ParticipantProfile>>;
}

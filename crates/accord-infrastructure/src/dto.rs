//! Persistence DTOs.
//!
//! The stored TOML shape is kept separate from the domain model so the
//! on-disk format can evolve without touching the engine. Optional
//! fields carry `skip_serializing_if` because TOML has no way to encode
//! an explicit null.

use accord_core::analysis::AnalysisResult;
use accord_core::session::{ConflictReport, ConflictSession, ConflictStatus};
use serde::{Deserialize, Serialize};

/// Stored representation of a conflict session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDto {
    pub id: String,
    pub relationship_id: String,
    pub initiator_id: String,
    pub responder_id: String,
    pub status: ConflictStatus,
    pub report_a: ConflictReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_b: Option<ConflictReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amendment_a: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub version: u64,
}

impl From<&ConflictSession> for SessionDto {
    fn from(session: &ConflictSession) -> Self {
        Self {
            id: session.id.clone(),
            relationship_id: session.relationship_id.clone(),
            initiator_id: session.initiator_id.clone(),
            responder_id: session.responder_id.clone(),
            status: session.status,
            report_a: session.report_a.clone(),
            report_b: session.report_b.clone(),
            amendment_a: session.amendment_a.clone(),
            analysis: session.analysis.clone(),
            created_at: session.created_at.clone(),
            updated_at: session.updated_at.clone(),
            version: session.version,
        }
    }
}

impl From<SessionDto> for ConflictSession {
    fn from(dto: SessionDto) -> Self {
        Self {
            id: dto.id,
            relationship_id: dto.relationship_id,
            initiator_id: dto.initiator_id,
            responder_id: dto.responder_id,
            status: dto.status,
            report_a: dto.report_a,
            report_b: dto.report_b,
            amendment_a: dto.amendment_a,
            analysis: dto.analysis,
            created_at: dto.created_at,
            updated_at: dto.updated_at,
            version: dto.version,
        }
    }
}

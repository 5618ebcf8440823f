//! Conflict session domain model.
//!
//! This module contains the core `ConflictSession` entity that the state
//! machine and coordinator operate on, independent of any storage format.

use super::status::ConflictStatus;
use crate::analysis::AnalysisResult;
use serde::{Deserialize, Serialize};

/// Whether the reporting party believes their partner is aware of the issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnerAwareness {
    Yes,
    No,
    #[default]
    Unsure,
}

/// One party's private, structured account of the conflict.
///
/// Immutable once submitted: the review step lets the initiator *add*
/// context through an amendment, never edit the original text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Factual description of what happened.
    pub what_happened: String,
    /// What the reporting party did or said in response.
    pub reaction: String,
    /// The emotions involved, in emotional words rather than thoughts.
    pub feelings: String,
    /// What specifically set the reporting party off.
    pub trigger: String,
    /// Whether the partner is believed to be aware of the issue.
    #[serde(default)]
    pub partner_awareness: PartnerAwareness,
}

impl ConflictReport {
    /// Validates that the report carries the required content.
    ///
    /// A report with a blank `what_happened` field is rejected; the other
    /// fields may be empty.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.what_happened.trim().is_empty() {
            return Err(crate::error::AccordError::invalid_payload(
                "report field 'what_happened' must not be empty",
            ));
        }
        Ok(())
    }
}

/// A two-party conflict session, the only core entity of the engine.
///
/// # Invariants
///
/// - `report_b`, `amendment_a` and `analysis` are write-once: once set
///   they are never overwritten or cleared.
/// - `status` advances strictly forward along the graph in
///   [`ConflictStatus`]; the only permissible repeat is the retryable
///   `Analyzing` self-loop.
/// - At most one session per `relationship_id` is in a non-terminal
///   state at any time (enforced by the coordinator and repository).
/// - Sessions are never deleted; completed sessions persist as history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictSession {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// The paired relationship this session belongs to
    pub relationship_id: String,
    /// The party who opened the session; fixed at creation.
    ///
    /// Roles are scoped to this session only: a party who responds in one
    /// session may initiate the next one for the same relationship.
    pub initiator_id: String,
    /// The other party of the relationship; fixed at creation.
    pub responder_id: String,
    /// Current workflow status
    pub status: ConflictStatus,
    /// The initiator's private account; immutable once submitted.
    pub report_a: ConflictReport,
    /// The responder's private account; write-once.
    #[serde(default)]
    pub report_b: Option<ConflictReport>,
    /// Free-text context added by the initiator after reading `report_b`.
    ///
    /// Write-once. `Some("")` means "reviewed, nothing to add"; `None`
    /// means the review step has not happened yet.
    #[serde(default)]
    pub amendment_a: Option<String>,
    /// The analysis outcome; write-once, set only on the transition into
    /// the terminal state.
    #[serde(default)]
    pub analysis: Option<AnalysisResult>,
    /// Creation timestamp (RFC 3339), immutable.
    pub created_at: String,
    /// Timestamp of the last persisted transition (RFC 3339).
    pub updated_at: String,
    /// Storage compare-and-set token, incremented on every persisted
    /// transition.
    #[serde(default)]
    pub version: u64,
}

impl ConflictSession {
    /// Creates a fresh session in the initial `DraftA` state.
    ///
    /// The requesting party becomes the initiator, the relationship's
    /// other partner the responder. The initiator's report starts empty
    /// and is filled by the first `SubmitReport` action.
    pub fn new(
        relationship_id: impl Into<String>,
        initiator_id: impl Into<String>,
        responder_id: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            relationship_id: relationship_id.into(),
            initiator_id: initiator_id.into(),
            responder_id: responder_id.into(),
            status: ConflictStatus::DraftA,
            report_a: ConflictReport::default(),
            report_b: None,
            amendment_a: None,
            analysis: None,
            created_at: now.clone(),
            updated_at: now,
            version: 1,
        }
    }

    /// Returns true if this session has not yet reached the terminal state.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Returns true if `party_id` is one of the two participants.
    pub fn is_participant(&self, party_id: &str) -> bool {
        party_id == self.initiator_id || party_id == self.responder_id
    }
}

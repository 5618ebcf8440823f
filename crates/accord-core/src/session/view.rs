//! Redacting read projection of a session.
//!
//! Visibility is enforced here, at read time, not by the writer: a party
//! never receives a field their role has not yet earned, no matter what
//! the stored record contains.

use super::gate::{self, Role};
use super::model::{ConflictReport, ConflictSession};
use super::status::ConflictStatus;
use crate::analysis::AnalysisResult;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// What one participant is allowed to see of a session.
///
/// Redaction rules:
///
/// - a party always sees their own submissions;
/// - the responder sees `report_a` from `DraftB` onward (never while the
///   initiator is still drafting or the session waits in `PendingB`);
/// - the initiator sees `report_b` from `ReviewA` onward;
/// - the responder sees `amendment_a` from `ConfirmB` onward;
/// - nobody sees `analysis` before `Complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub id: String,
    pub relationship_id: String,
    pub status: ConflictStatus,
    /// The requesting party's role in this session.
    pub viewer_role: Role,
    /// True if the requesting party is the one permitted to act now.
    pub your_turn: bool,
    pub report_a: Option<ConflictReport>,
    pub report_b: Option<ConflictReport>,
    pub amendment_a: Option<String>,
    pub analysis: Option<AnalysisResult>,
    pub created_at: String,
    pub updated_at: String,
}

/// Projects a session for one participant, redacting what their role may
/// not yet see. Rejects parties that are not participants.
pub fn project(session: &ConflictSession, party_id: &str) -> Result<SessionView> {
    let viewer_role = gate::role_of(session, party_id)?;

    let your_turn = gate::permission_for(session.status)
        .map(|permission| permission.role.is_none_or(|role| role == viewer_role))
        .unwrap_or(false);

    let report_a = match viewer_role {
        Role::Initiator => Some(session.report_a.clone()),
        Role::Responder if session.status >= ConflictStatus::DraftB => {
            Some(session.report_a.clone())
        }
        Role::Responder => None,
    };

    let report_b = match viewer_role {
        Role::Responder => session.report_b.clone(),
        Role::Initiator if session.status >= ConflictStatus::ReviewA => session.report_b.clone(),
        Role::Initiator => None,
    };

    let amendment_a = match viewer_role {
        Role::Initiator => session.amendment_a.clone(),
        Role::Responder if session.status >= ConflictStatus::ConfirmB => {
            session.amendment_a.clone()
        }
        Role::Responder => None,
    };

    let analysis = if session.status == ConflictStatus::Complete {
        session.analysis.clone()
    } else {
        None
    };

    Ok(SessionView {
        id: session.id.clone(),
        relationship_id: session.relationship_id.clone(),
        status: session.status,
        viewer_role,
        your_turn,
        report_a,
        report_b,
        amendment_a,
        analysis,
        created_at: session.created_at.clone(),
        updated_at: session.updated_at.clone(),
    })
}

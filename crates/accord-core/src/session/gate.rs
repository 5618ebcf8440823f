//! Role gate: the pure permission table of the session protocol.
//!
//! Given a session's status and the identifier of the party attempting an
//! action, the gate yields the single permitted action for that party in
//! that state, or a rejection. It holds no state of its own.

use super::model::ConflictSession;
use super::status::ConflictStatus;
use crate::error::{AccordError, Result};
use serde::{Deserialize, Serialize};

/// The session-scoped role of a party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiator => "initiator",
            Self::Responder => "responder",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of action a state permits, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SubmitReport,
    Acknowledge,
    SubmitAmendment,
    Agree,
    RequestAnalysis,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitReport => "submit_report",
            Self::Acknowledge => "acknowledge",
            Self::SubmitAmendment => "submit_amendment",
            Self::Agree => "agree",
            Self::RequestAnalysis => "request_analysis",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single action a state permits, and who may perform it.
///
/// `role: None` means either participant may act (the `Analyzing` state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permission {
    pub role: Option<Role>,
    pub action: ActionKind,
}

/// Returns the permission entry for a status, or `None` for the terminal
/// state, which permits nothing.
pub fn permission_for(status: ConflictStatus) -> Option<Permission> {
    let entry = match status {
        ConflictStatus::DraftA => Permission {
            role: Some(Role::Initiator),
            action: ActionKind::SubmitReport,
        },
        ConflictStatus::PendingB => Permission {
            role: Some(Role::Responder),
            action: ActionKind::Acknowledge,
        },
        ConflictStatus::DraftB => Permission {
            role: Some(Role::Responder),
            action: ActionKind::SubmitReport,
        },
        ConflictStatus::ReviewA => Permission {
            role: Some(Role::Initiator),
            action: ActionKind::SubmitAmendment,
        },
        ConflictStatus::ConfirmB => Permission {
            role: Some(Role::Responder),
            action: ActionKind::Agree,
        },
        ConflictStatus::Analyzing => Permission {
            role: None,
            action: ActionKind::RequestAnalysis,
        },
        ConflictStatus::Complete => return None,
    };
    Some(entry)
}

/// Resolves the session-scoped role of a party, rejecting outsiders.
pub fn role_of(session: &ConflictSession, party_id: &str) -> Result<Role> {
    if party_id == session.initiator_id {
        Ok(Role::Initiator)
    } else if party_id == session.responder_id {
        Ok(Role::Responder)
    } else {
        Err(AccordError::not_your_turn("a session participant", party_id))
    }
}

/// Decides whether `party_id` may perform `attempted` on the session.
///
/// Returns the party's role on success. Rejections:
///
/// - `NotYourTurn` if the party is not a participant, or is not the
///   actor the current state permits
/// - `InvalidState` if the state permits no action (terminal), or the
///   attempted action is not the one the state permits
pub fn decide(session: &ConflictSession, party_id: &str, attempted: ActionKind) -> Result<Role> {
    let role = role_of(session, party_id)?;

    let permission = permission_for(session.status).ok_or_else(|| {
        AccordError::invalid_state(session.status.as_str(), attempted.as_str())
    })?;

    if let Some(expected_role) = permission.role {
        if role != expected_role {
            return Err(AccordError::not_your_turn(
                expected_role.as_str(),
                party_id,
            ));
        }
    }

    if attempted != permission.action {
        return Err(AccordError::invalid_state(
            session.status.as_str(),
            attempted.as_str(),
        ));
    }

    Ok(role)
}

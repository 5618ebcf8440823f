//! Session state machine: validates and applies transitions.
//!
//! Every function here is pure with respect to I/O: it takes the current
//! session, validates the payload against the current status, and
//! produces the next record (status advanced, write-once field set,
//! version bumped, `updated_at` refreshed). Callers are responsible for
//! gating the acting party first and for persisting the result.

use super::model::{ConflictReport, ConflictSession};
use super::status::ConflictStatus;
use crate::analysis::AnalysisResult;
use crate::error::{AccordError, Result};
use serde::{Deserialize, Serialize};

/// An action a participant submits against a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionAction {
    /// Submit a private account. From `DraftA` (initiator) this fills
    /// `report_a`; from `DraftB` (responder) it fills `report_b`.
    SubmitReport { report: ConflictReport },
    /// The responder's first observation of the session while it waits
    /// in `PendingB`. Payload-free and idempotent.
    Acknowledge,
    /// The initiator's post-review context. May be empty.
    SubmitAmendment { text: String },
    /// The responder's consent to run the analysis.
    Agree,
    /// Trigger the external analysis call. Either participant.
    RequestAnalysis,
}

impl SessionAction {
    /// The payload-free kind of this action, for gating.
    pub fn kind(&self) -> super::gate::ActionKind {
        use super::gate::ActionKind;
        match self {
            Self::SubmitReport { .. } => ActionKind::SubmitReport,
            Self::Acknowledge => ActionKind::Acknowledge,
            Self::SubmitAmendment { .. } => ActionKind::SubmitAmendment,
            Self::Agree => ActionKind::Agree,
            Self::RequestAnalysis => ActionKind::RequestAnalysis,
        }
    }
}

fn advanced(session: &ConflictSession, next: ConflictStatus) -> ConflictSession {
    let mut out = session.clone();
    out.status = next;
    out.version = session.version + 1;
    out.updated_at = chrono::Utc::now().to_rfc3339();
    out
}

fn require_status(session: &ConflictSession, expected: ConflictStatus, action: &str) -> Result<()> {
    if session.status != expected {
        return Err(AccordError::invalid_state(session.status.as_str(), action));
    }
    Ok(())
}

/// `DraftA -> PendingB` (initiator) or `DraftB -> ReviewA` (responder).
///
/// The report is validated before anything else; a malformed report
/// leaves the session untouched.
pub fn submit_report(session: &ConflictSession, report: ConflictReport) -> Result<ConflictSession> {
    report.validate()?;
    match session.status {
        ConflictStatus::DraftA => {
            let mut next = advanced(session, ConflictStatus::PendingB);
            next.report_a = report;
            Ok(next)
        }
        ConflictStatus::DraftB => {
            if session.report_b.is_some() {
                // Write-once guard; unreachable through the status check
                // above but kept as an explicit invariant.
                return Err(AccordError::invalid_state(
                    session.status.as_str(),
                    "submit_report",
                ));
            }
            let mut next = advanced(session, ConflictStatus::ReviewA);
            next.report_b = Some(report);
            Ok(next)
        }
        _ => Err(AccordError::invalid_state(
            session.status.as_str(),
            "submit_report",
        )),
    }
}

/// `PendingB -> DraftB`. Side-effect-free acknowledgment transition.
///
/// This is the machine-level transition only; the idempotent no-op for
/// late or duplicate acknowledgments lives in the coordinator, which can
/// observe the stored status.
pub fn acknowledge(session: &ConflictSession) -> Result<ConflictSession> {
    require_status(session, ConflictStatus::PendingB, "acknowledge")?;
    Ok(advanced(session, ConflictStatus::DraftB))
}

/// `ReviewA -> ConfirmB`. The amendment may be empty; submitting it is
/// what records that the initiator has read the responder's account.
pub fn submit_amendment(session: &ConflictSession, text: String) -> Result<ConflictSession> {
    require_status(session, ConflictStatus::ReviewA, "submit_amendment")?;
    if session.amendment_a.is_some() {
        return Err(AccordError::invalid_state(
            session.status.as_str(),
            "submit_amendment",
        ));
    }
    let mut next = advanced(session, ConflictStatus::ConfirmB);
    next.amendment_a = Some(text);
    Ok(next)
}

/// `ConfirmB -> Analyzing`. The responder's consent signal.
pub fn agree(session: &ConflictSession) -> Result<ConflictSession> {
    require_status(session, ConflictStatus::ConfirmB, "agree")?;
    Ok(advanced(session, ConflictStatus::Analyzing))
}

/// `Analyzing -> Complete`. Records the analysis outcome.
///
/// The one transition that sets `analysis`; a session that failed its
/// analysis call never reaches this function and stays in `Analyzing`.
pub fn record_analysis(
    session: &ConflictSession,
    result: AnalysisResult,
) -> Result<ConflictSession> {
    require_status(session, ConflictStatus::Analyzing, "record_analysis")?;
    if session.analysis.is_some() {
        return Err(AccordError::invalid_state(
            session.status.as_str(),
            "record_analysis",
        ));
    }
    let mut next = advanced(session, ConflictStatus::Complete);
    next.analysis = Some(result);
    Ok(next)
}

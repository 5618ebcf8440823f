//! Analysis contract: request/response types and the service trait.
//!
//! The analysis capability is consumed as an opaque request/response
//! contract. The engine never inspects how the service reasons; it only
//! guarantees that a failed or timed-out call leaves the session in
//! `analyzing` with no partial result, safe to retry.

use crate::error::Result;
use crate::profile::ParticipantProfile;
use crate::session::ConflictReport;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The per-party portion of an analysis outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerAnalysis {
    /// Narrative summary of this party's side.
    pub summary: String,
    /// Named cognitive distortion labels detected in their account.
    pub distortions: Vec<String>,
    /// The blunt assessment this party needs to hear.
    pub hard_truth: String,
    /// What this party actually got right.
    pub fair_points: String,
}

/// The shared resolution block of an analysis outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Concrete steps to take right away.
    pub immediate_steps: Vec<String>,
    /// Longer-term guidance for the pair.
    pub long_term_work: String,
    /// Optional safety-risk flag. Does not change workflow state; it is
    /// surfaced verbatim to both parties in the terminal view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_warning: Option<String>,
}

/// The structured outcome of a completed analysis.
///
/// Set exactly once, on the transition into the terminal state, and
/// never mutated thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Assessment of the initiator's side.
    pub initiator_analysis: PartnerAnalysis,
    /// Assessment of the responder's side.
    pub responder_analysis: PartnerAnalysis,
    /// The shared resolution block.
    pub resolution: Resolution,
}

/// Everything the analysis service needs: both parties' immutable profile
/// attributes and the session's submitted accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub initiator_profile: ParticipantProfile,
    pub responder_profile: ParticipantProfile,
    pub report_a: ConflictReport,
    pub report_b: ConflictReport,
    /// The initiator's post-review amendment, if any was submitted.
    pub amendment_a: Option<String>,
}

/// The external analysis capability.
///
/// Treated as a single idempotent call: implementations must not
/// accumulate side effects across retries, and a failure must surface as
/// the retryable `AnalysisUnavailable` error without any partial result.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Runs the analysis for one session.
    ///
    /// # Returns
    ///
    /// - `Ok(AnalysisResult)`: the structured outcome
    /// - `Err(AccordError::AnalysisUnavailable)`: the call failed or
    ///   timed out and may be retried
    /// - `Err(_)`: non-retryable failure (bad configuration, malformed
    ///   response)
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult>;
}

//! Session coordinator use case.
//!
//! This module provides the `SessionCoordinator`, the orchestration layer
//! callers talk to: it loads or lazily creates sessions, consults the role
//! gate, applies the state machine, persists results, and serializes
//! concurrent attempts on the same session.

use crate::locks::LockRegistry;
use accord_core::analysis::{AnalysisRequest, AnalysisService};
use accord_core::error::{AccordError, Result};
use accord_core::profile::{ParticipantProfile, ProfileRepository};
use accord_core::relationship::RelationshipRegistry;
use accord_core::session::{
    ConflictSession, ConflictStatus, SessionAction, SessionRepository, SessionView, gate, machine,
    view,
};
use std::sync::Arc;

/// Orchestrates the two-party conflict session workflow.
///
/// # Concurrency
///
/// All transition work runs under a per-session async mutex, so
/// `apply_action` calls for one session serialize while different
/// sessions proceed independently. Session creation runs under a
/// per-relationship mutex to uphold the single-active-session invariant.
/// The external analysis call is the exception: it runs outside the
/// session lock's critical section so a slow dependency never blocks
/// unrelated reads, and duplicate invocations collapse onto a single
/// in-flight call through a per-session analysis mutex.
pub struct SessionCoordinator {
    /// Repository for session persistence
    session_repository: Arc<dyn SessionRepository>,
    /// Resolves relationship IDs to their two parties
    relationship_registry: Arc<dyn RelationshipRegistry>,
    /// Read access to the profile attributes the analysis consumes
    profile_repository: Arc<dyn ProfileRepository>,
    /// The external analysis capability
    analysis_service: Arc<dyn AnalysisService>,
    /// Per-session transition locks
    session_locks: LockRegistry,
    /// Per-relationship creation locks
    relationship_locks: LockRegistry,
    /// Per-session analysis invocation locks
    analysis_locks: LockRegistry,
}

impl SessionCoordinator {
    /// Creates a new `SessionCoordinator` over the given collaborators.
    pub fn new(
        session_repository: Arc<dyn SessionRepository>,
        relationship_registry: Arc<dyn RelationshipRegistry>,
        profile_repository: Arc<dyn ProfileRepository>,
        analysis_service: Arc<dyn AnalysisService>,
    ) -> Self {
        Self {
            session_repository,
            relationship_registry,
            profile_repository,
            analysis_service,
            session_locks: LockRegistry::new(),
            relationship_locks: LockRegistry::new(),
            analysis_locks: LockRegistry::new(),
        }
    }

    /// Wires a coordinator over the TOML store at `base_dir`.
    ///
    /// Sessions, relationships, and profiles all live under the one
    /// directory; only the analysis capability is injected.
    pub fn with_toml_storage(
        base_dir: impl AsRef<std::path::Path>,
        analysis_service: Arc<dyn AnalysisService>,
    ) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        Ok(Self::new(
            Arc::new(accord_infrastructure::TomlSessionRepository::new(base_dir)?),
            Arc::new(accord_infrastructure::TomlRelationshipRegistry::new(base_dir)),
            Arc::new(accord_infrastructure::TomlProfileRepository::new(base_dir)),
            analysis_service,
        ))
    }

    /// Returns the relationship's active session, creating one if needed.
    ///
    /// A created session starts in `DraftA` with the requesting party as
    /// initiator and the relationship's other partner as responder.
    ///
    /// # Errors
    ///
    /// - `RelationshipIncomplete` if the pair has no second partner yet
    /// - `NotFound` if the relationship does not exist
    /// - `NotYourTurn` if the requester is not one of the partners
    pub async fn get_or_create_active_session(
        &self,
        relationship_id: &str,
        requesting_party: &str,
    ) -> Result<ConflictSession> {
        let lock = self.relationship_locks.lock_for(relationship_id);
        let _guard = lock.lock().await;

        if let Some(active) = self
            .session_repository
            .find_active_by_relationship(relationship_id)
            .await?
        {
            if !active.is_participant(requesting_party) {
                return Err(AccordError::not_your_turn(
                    "a session participant",
                    requesting_party,
                ));
            }
            return Ok(active);
        }

        let parties = self
            .relationship_registry
            .resolve(relationship_id)
            .await?
            .ok_or_else(|| AccordError::not_found("relationship", relationship_id))?;

        if !parties.is_complete() {
            return Err(AccordError::relationship_incomplete(relationship_id));
        }
        let responder = parties.other(requesting_party).ok_or_else(|| {
            AccordError::not_your_turn("a relationship partner", requesting_party)
        })?;

        let session = ConflictSession::new(relationship_id, requesting_party, responder);
        match self.session_repository.save(&session).await {
            Ok(()) => {
                tracing::info!(
                    session_id = %session.id,
                    relationship_id = %relationship_id,
                    initiator_id = %requesting_party,
                    "Created conflict session"
                );
                Ok(session)
            }
            // Another process won the creation race; hand back its session.
            Err(err) if err.is_conflict() => self
                .session_repository
                .find_active_by_relationship(relationship_id)
                .await?
                .ok_or(err),
            Err(err) => Err(err),
        }
    }

    /// Applies one participant action to a session.
    ///
    /// Validation failures (`NotYourTurn`, `InvalidState`,
    /// `InvalidPayload`) mutate nothing. `RequestAnalysis` takes the
    /// analysis path described on the type-level docs; everything else
    /// is a fast local transition under the session lock.
    pub async fn apply_action(
        &self,
        session_id: &str,
        acting_party: &str,
        action: SessionAction,
    ) -> Result<ConflictSession> {
        if matches!(action, SessionAction::RequestAnalysis) {
            return self.run_analysis(session_id, acting_party).await;
        }

        let lock = self.session_locks.lock_for(session_id);
        let _guard = lock.lock().await;

        let session = self.load(session_id).await?;

        // Late or duplicate acknowledgment from the responder is a no-op,
        // not an error: the transition already happened.
        if matches!(action, SessionAction::Acknowledge)
            && gate::role_of(&session, acting_party) == Ok(gate::Role::Responder)
            && session.status > ConflictStatus::PendingB
        {
            return Ok(session);
        }

        gate::decide(&session, acting_party, action.kind())?;

        let next = match action {
            SessionAction::SubmitReport { report } => machine::submit_report(&session, report)?,
            SessionAction::Acknowledge => machine::acknowledge(&session)?,
            SessionAction::SubmitAmendment { text } => machine::submit_amendment(&session, text)?,
            SessionAction::Agree => machine::agree(&session)?,
            SessionAction::RequestAnalysis => unreachable!("handled above"),
        };

        self.session_repository.save(&next).await?;
        tracing::debug!(
            session_id = %session_id,
            from = %session.status,
            to = %next.status,
            "Applied session transition"
        );
        Ok(next)
    }

    /// Returns the session redacted for the requesting party.
    pub async fn view_session(
        &self,
        session_id: &str,
        requesting_party: &str,
    ) -> Result<SessionView> {
        let session = self.load(session_id).await?;
        view::project(&session, requesting_party)
    }

    /// Lists the relationship's sessions, newest first.
    pub async fn list_sessions(&self, relationship_id: &str) -> Result<Vec<ConflictSession>> {
        let mut sessions = self
            .session_repository
            .list_by_relationship(relationship_id)
            .await?;
        sessions.sort_by(|a, b| compare_created_at(b, a));
        Ok(sessions)
    }

    async fn load(&self, session_id: &str) -> Result<ConflictSession> {
        self.session_repository
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AccordError::not_found("session", session_id))
    }

    async fn profile_of(&self, party_id: &str) -> Result<ParticipantProfile> {
        self.profile_repository
            .find_by_id(party_id)
            .await?
            .ok_or_else(|| AccordError::not_found("profile", party_id))
    }

    /// Runs the external analysis call and commits the terminal state.
    ///
    /// The analysis mutex collapses duplicate invocations: while one call
    /// is in flight, later callers wait, then observe the completed
    /// session and return it without a second external call. The session
    /// lock is held only for the status checks and the final commit,
    /// never across the external call.
    async fn run_analysis(&self, session_id: &str, acting_party: &str) -> Result<ConflictSession> {
        let analysis_lock = self.analysis_locks.lock_for(session_id);
        let _analysis_guard = analysis_lock.lock().await;

        let session = {
            let lock = self.session_locks.lock_for(session_id);
            let _guard = lock.lock().await;

            let session = self.load(session_id).await?;
            // Outsiders are rejected even on completed sessions; the
            // early return below must never hand them the full record.
            gate::role_of(&session, acting_party)?;
            if session.status == ConflictStatus::Complete {
                // A concurrent invocation already finished the work.
                return Ok(session);
            }
            gate::decide(&session, acting_party, gate::ActionKind::RequestAnalysis)?;
            session
        };

        let report_b = session.report_b.clone().ok_or_else(|| {
            AccordError::internal("session in analyzing state has no responder report")
        })?;
        let request = AnalysisRequest {
            initiator_profile: self.profile_of(&session.initiator_id).await?,
            responder_profile: self.profile_of(&session.responder_id).await?,
            report_a: session.report_a.clone(),
            report_b,
            amendment_a: session.amendment_a.clone(),
        };

        // Blocking external call, deliberately outside the session lock.
        let result = self.analysis_service.analyze(request).await.map_err(|err| {
            tracing::warn!(session_id = %session_id, error = %err, "Analysis call failed");
            err
        })?;

        let lock = self.session_locks.lock_for(session_id);
        let _guard = lock.lock().await;

        let current = self.load(session_id).await?;
        if current.status == ConflictStatus::Complete {
            return Ok(current);
        }
        let next = machine::record_analysis(&current, result)?;
        self.session_repository.save(&next).await?;
        tracing::info!(session_id = %session_id, "Conflict session completed");
        Ok(next)
    }
}

/// Orders sessions by creation time, falling back to string order for
/// timestamps that fail to parse.
fn compare_created_at(a: &ConflictSession, b: &ConflictSession) -> std::cmp::Ordering {
    let parse = |s: &ConflictSession| chrono::DateTime::parse_from_rfc3339(&s.created_at).ok();
    match (parse(a), parse(b)) {
        (Some(ta), Some(tb)) => ta.cmp(&tb),
        _ => a.created_at.cmp(&b.created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord_core::analysis::{AnalysisResult, PartnerAnalysis, Resolution};
    use accord_core::profile::{AttachmentStyle, ConflictStyle};
    use accord_core::relationship::RelationshipParties;
    use accord_core::session::ConflictReport;
    use accord_infrastructure::{
        MemoryProfileRepository, MemoryRelationshipRegistry, MemorySessionRepository,
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn sample_analysis() -> AnalysisResult {
        let side = PartnerAnalysis {
            summary: "summary".to_string(),
            distortions: vec!["Catastrophizing".to_string()],
            hard_truth: "hard truth".to_string(),
            fair_points: "fair points".to_string(),
        };
        AnalysisResult {
            initiator_analysis: side.clone(),
            responder_analysis: side,
            resolution: Resolution {
                immediate_steps: vec!["take a break".to_string()],
                long_term_work: "practice repair attempts".to_string(),
                safety_warning: None,
            },
        }
    }

    /// Scripted analysis service: pops one outcome per call, counts
    /// calls, and can delay to widen concurrency windows.
    struct StubAnalysisService {
        outcomes: Mutex<VecDeque<Result<AnalysisResult>>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl StubAnalysisService {
        fn with_outcomes(outcomes: Vec<Result<AnalysisResult>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn succeeding() -> Self {
            Self::with_outcomes(vec![Ok(sample_analysis())])
        }

        fn slow(delay: Duration) -> Self {
            let mut stub = Self::with_outcomes(vec![Ok(sample_analysis()), Ok(sample_analysis())]);
            stub.delay = Some(delay);
            stub
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnalysisService for StubAnalysisService {
        async fn analyze(&self, _request: AnalysisRequest) -> Result<AnalysisResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(sample_analysis()))
        }
    }

    struct Fixture {
        coordinator: Arc<SessionCoordinator>,
        analysis: Arc<StubAnalysisService>,
    }

    fn fixture(analysis: StubAnalysisService) -> Fixture {
        let sessions = Arc::new(MemorySessionRepository::new());
        let relationships = Arc::new(MemoryRelationshipRegistry::new());
        let profiles = Arc::new(MemoryProfileRepository::new());
        let analysis = Arc::new(analysis);

        relationships.upsert(
            "r1",
            RelationshipParties {
                partner_a: "p1".to_string(),
                partner_b: Some("p2".to_string()),
            },
        );
        relationships.upsert(
            "r-incomplete",
            RelationshipParties {
                partner_a: "p1".to_string(),
                partner_b: None,
            },
        );
        for (id, name) in [("p1", "Alex"), ("p2", "Sam")] {
            profiles.upsert(ParticipantProfile {
                id: id.to_string(),
                display_name: name.to_string(),
                attachment_style: AttachmentStyle::Secure,
                conflict_style: ConflictStyle::Freeze,
                triggers: Vec::new(),
                core_beliefs: Vec::new(),
            });
        }

        Fixture {
            coordinator: Arc::new(SessionCoordinator::new(
                sessions,
                relationships,
                profiles,
                analysis.clone(),
            )),
            analysis,
        }
    }

    fn report(text: &str) -> ConflictReport {
        ConflictReport {
            what_happened: text.to_string(),
            ..Default::default()
        }
    }

    /// Drives a fresh session through both submissions up to `Analyzing`.
    async fn drive_to_analyzing(coordinator: &SessionCoordinator) -> ConflictSession {
        let session = coordinator
            .get_or_create_active_session("r1", "p1")
            .await
            .unwrap();
        let id = session.id.clone();
        coordinator
            .apply_action(
                &id,
                "p1",
                SessionAction::SubmitReport {
                    report: report("a's side"),
                },
            )
            .await
            .unwrap();
        coordinator
            .apply_action(&id, "p2", SessionAction::Acknowledge)
            .await
            .unwrap();
        coordinator
            .apply_action(
                &id,
                "p2",
                SessionAction::SubmitReport {
                    report: report("b's side"),
                },
            )
            .await
            .unwrap();
        coordinator
            .apply_action(
                &id,
                "p1",
                SessionAction::SubmitAmendment {
                    text: String::new(),
                },
            )
            .await
            .unwrap();
        coordinator
            .apply_action(&id, "p2", SessionAction::Agree)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let Fixture {
            coordinator,
            analysis,
        } = fixture(StubAnalysisService::succeeding());

        let session = coordinator
            .get_or_create_active_session("r1", "p1")
            .await
            .unwrap();
        assert_eq!(session.status, ConflictStatus::DraftA);
        assert_eq!(session.initiator_id, "p1");
        assert_eq!(session.responder_id, "p2");

        let analyzing = drive_to_analyzing(&coordinator).await;
        assert_eq!(analyzing.status, ConflictStatus::Analyzing);

        let done = coordinator
            .apply_action(&analyzing.id, "p1", SessionAction::RequestAnalysis)
            .await
            .unwrap();
        assert_eq!(done.status, ConflictStatus::Complete);
        assert!(done.analysis.is_some());
        assert_eq!(analysis.call_count(), 1);

        // Both parties see the same analysis in their terminal views.
        let view_a = coordinator.view_session(&done.id, "p1").await.unwrap();
        let view_b = coordinator.view_session(&done.id, "p2").await.unwrap();
        assert_eq!(view_a.analysis, view_b.analysis);
        assert!(view_a.analysis.is_some());
    }

    #[tokio::test]
    async fn test_get_or_create_returns_existing_active_session() {
        let Fixture { coordinator, .. } = fixture(StubAnalysisService::succeeding());

        let first = coordinator
            .get_or_create_active_session("r1", "p1")
            .await
            .unwrap();
        // The other partner asking gets the same session, not a new one.
        let second = coordinator
            .get_or_create_active_session("r1", "p2")
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.initiator_id, "p1");
    }

    #[tokio::test]
    async fn test_concurrent_creation_yields_one_session() {
        let Fixture { coordinator, .. } = fixture(StubAnalysisService::succeeding());

        let a = coordinator.clone();
        let b = coordinator.clone();
        let (first, second) = tokio::join!(
            a.get_or_create_active_session("r1", "p1"),
            b.get_or_create_active_session("r1", "p2"),
        );
        let first = first.unwrap();
        let second = second.unwrap();
        assert_eq!(first.id, second.id);

        let sessions = coordinator.list_sessions("r1").await.unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_incomplete_relationship_cannot_open_session() {
        let Fixture { coordinator, .. } = fixture(StubAnalysisService::succeeding());
        let err = coordinator
            .get_or_create_active_session("r-incomplete", "p1")
            .await
            .unwrap_err();
        assert!(matches!(err, AccordError::RelationshipIncomplete { .. }));

        let err = coordinator
            .get_or_create_active_session("r-unknown", "p1")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_outsider_cannot_open_or_view() {
        let Fixture { coordinator, .. } = fixture(StubAnalysisService::succeeding());
        let err = coordinator
            .get_or_create_active_session("r1", "p9")
            .await
            .unwrap_err();
        assert!(matches!(err, AccordError::NotYourTurn { .. }));

        let session = coordinator
            .get_or_create_active_session("r1", "p1")
            .await
            .unwrap();
        let err = coordinator.view_session(&session.id, "p9").await.unwrap_err();
        assert!(matches!(err, AccordError::NotYourTurn { .. }));
    }

    #[tokio::test]
    async fn test_only_the_permitted_actor_may_act() {
        let Fixture { coordinator, .. } = fixture(StubAnalysisService::succeeding());
        let session = coordinator
            .get_or_create_active_session("r1", "p1")
            .await
            .unwrap();

        // Responder cannot submit while the initiator drafts.
        let err = coordinator
            .apply_action(
                &session.id,
                "p2",
                SessionAction::SubmitReport {
                    report: report("too early"),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccordError::NotYourTurn { .. }));

        // The rejected attempt mutated nothing.
        let stored = coordinator.view_session(&session.id, "p1").await.unwrap();
        assert_eq!(stored.status, ConflictStatus::DraftA);
    }

    #[tokio::test]
    async fn test_invalid_payload_mutates_nothing() {
        let Fixture { coordinator, .. } = fixture(StubAnalysisService::succeeding());
        let session = coordinator
            .get_or_create_active_session("r1", "p1")
            .await
            .unwrap();

        let err = coordinator
            .apply_action(
                &session.id,
                "p1",
                SessionAction::SubmitReport {
                    report: report("  "),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccordError::InvalidPayload(_)));

        let stored = coordinator.view_session(&session.id, "p1").await.unwrap();
        assert_eq!(stored.status, ConflictStatus::DraftA);
    }

    #[tokio::test]
    async fn test_acknowledge_is_idempotent() {
        let Fixture { coordinator, .. } = fixture(StubAnalysisService::succeeding());
        let session = coordinator
            .get_or_create_active_session("r1", "p1")
            .await
            .unwrap();
        coordinator
            .apply_action(
                &session.id,
                "p1",
                SessionAction::SubmitReport {
                    report: report("a's side"),
                },
            )
            .await
            .unwrap();

        let first = coordinator
            .apply_action(&session.id, "p2", SessionAction::Acknowledge)
            .await
            .unwrap();
        assert_eq!(first.status, ConflictStatus::DraftB);

        // A second acknowledgment (late duplicate) is a no-op success.
        let second = coordinator
            .apply_action(&session.id, "p2", SessionAction::Acknowledge)
            .await
            .unwrap();
        assert_eq!(second.status, ConflictStatus::DraftB);
        assert_eq!(second.version, first.version);

        // The initiator never gets the acknowledgment action: the gate
        // checks the actor before the action, so this is a turn error.
        let err = coordinator
            .apply_action(&session.id, "p1", SessionAction::Acknowledge)
            .await
            .unwrap_err();
        assert!(matches!(err, AccordError::NotYourTurn { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_acknowledge_stores_one_transition() {
        let Fixture { coordinator, .. } = fixture(StubAnalysisService::succeeding());
        let session = coordinator
            .get_or_create_active_session("r1", "p1")
            .await
            .unwrap();
        coordinator
            .apply_action(
                &session.id,
                "p1",
                SessionAction::SubmitReport {
                    report: report("a's side"),
                },
            )
            .await
            .unwrap();

        // Two devices observe PendingB at the same time.
        let a = coordinator.clone();
        let b = coordinator.clone();
        let id_a = session.id.clone();
        let id_b = session.id.clone();
        let (first, second) = tokio::join!(
            a.apply_action(&id_a, "p2", SessionAction::Acknowledge),
            b.apply_action(&id_b, "p2", SessionAction::Acknowledge),
        );
        let first = first.unwrap();
        let second = second.unwrap();
        assert_eq!(first.status, ConflictStatus::DraftB);
        assert_eq!(second.status, ConflictStatus::DraftB);
        // Exactly one stored transition: both observe the same version.
        assert_eq!(first.version, second.version);
    }

    #[tokio::test]
    async fn test_report_b_cannot_be_resubmitted() {
        let Fixture { coordinator, .. } = fixture(StubAnalysisService::succeeding());
        let session = drive_to_analyzing(&coordinator).await;

        let err = coordinator
            .apply_action(
                &session.id,
                "p2",
                SessionAction::SubmitReport {
                    report: report("b's side, revised"),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccordError::InvalidState { .. }));

        let stored = coordinator.view_session(&session.id, "p2").await.unwrap();
        assert_eq!(
            stored.report_b.unwrap().what_happened,
            "b's side",
            "stored report_b must be unchanged"
        );
    }

    #[tokio::test]
    async fn test_visibility_rules_hold_through_the_walk() {
        let Fixture { coordinator, .. } = fixture(StubAnalysisService::succeeding());
        let session = coordinator
            .get_or_create_active_session("r1", "p1")
            .await
            .unwrap();

        // Responder cannot read report_a before acknowledging.
        coordinator
            .apply_action(
                &session.id,
                "p1",
                SessionAction::SubmitReport {
                    report: report("a's side"),
                },
            )
            .await
            .unwrap();
        let view_b = coordinator.view_session(&session.id, "p2").await.unwrap();
        assert!(view_b.report_a.is_none());

        coordinator
            .apply_action(&session.id, "p2", SessionAction::Acknowledge)
            .await
            .unwrap();
        let view_b = coordinator.view_session(&session.id, "p2").await.unwrap();
        assert!(view_b.report_a.is_some());

        // Initiator cannot read report_b until review.
        coordinator
            .apply_action(
                &session.id,
                "p2",
                SessionAction::SubmitReport {
                    report: report("b's side"),
                },
            )
            .await
            .unwrap();
        let view_a = coordinator.view_session(&session.id, "p1").await.unwrap();
        assert_eq!(view_a.status, ConflictStatus::ReviewA);
        assert!(view_a.report_b.is_some());

        // Nobody reads the analysis before completion.
        coordinator
            .apply_action(
                &session.id,
                "p1",
                SessionAction::SubmitAmendment {
                    text: "context".to_string(),
                },
            )
            .await
            .unwrap();
        coordinator
            .apply_action(&session.id, "p2", SessionAction::Agree)
            .await
            .unwrap();
        for party in ["p1", "p2"] {
            let view = coordinator.view_session(&session.id, party).await.unwrap();
            assert!(view.analysis.is_none());
        }
    }

    #[tokio::test]
    async fn test_failed_analysis_leaves_session_retryable() {
        let Fixture {
            coordinator,
            analysis,
        } = fixture(StubAnalysisService::with_outcomes(vec![
            Err(AccordError::analysis_unavailable("timeout after 60s")),
            Ok(sample_analysis()),
        ]));
        let session = drive_to_analyzing(&coordinator).await;

        let err = coordinator
            .apply_action(&session.id, "p2", SessionAction::RequestAnalysis)
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        // No partial write: still analyzing, no result stored.
        let stored = coordinator.view_session(&session.id, "p2").await.unwrap();
        assert_eq!(stored.status, ConflictStatus::Analyzing);
        assert!(stored.analysis.is_none());

        // A fresh retry succeeds without duplicated side effects.
        let done = coordinator
            .apply_action(&session.id, "p1", SessionAction::RequestAnalysis)
            .await
            .unwrap();
        assert_eq!(done.status, ConflictStatus::Complete);
        assert_eq!(analysis.call_count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_analysis_invocations_collapse() {
        let Fixture {
            coordinator,
            analysis,
        } = fixture(StubAnalysisService::slow(Duration::from_millis(50)));
        let session = drive_to_analyzing(&coordinator).await;

        let a = coordinator.clone();
        let b = coordinator.clone();
        let id_a = session.id.clone();
        let id_b = session.id.clone();
        let (first, second) = tokio::join!(
            a.apply_action(&id_a, "p1", SessionAction::RequestAnalysis),
            b.apply_action(&id_b, "p2", SessionAction::RequestAnalysis),
        );
        assert_eq!(first.unwrap().status, ConflictStatus::Complete);
        assert_eq!(second.unwrap().status, ConflictStatus::Complete);
        // The in-flight call was shared, not duplicated.
        assert_eq!(analysis.call_count(), 1);
    }

    #[tokio::test]
    async fn test_outsider_cannot_request_analysis_on_completed_session() {
        let Fixture { coordinator, .. } = fixture(StubAnalysisService::succeeding());
        let session = drive_to_analyzing(&coordinator).await;

        // Not yet complete: outsiders bounce off the gate.
        let err = coordinator
            .apply_action(&session.id, "p9", SessionAction::RequestAnalysis)
            .await
            .unwrap_err();
        assert!(matches!(err, AccordError::NotYourTurn { .. }));

        coordinator
            .apply_action(&session.id, "p1", SessionAction::RequestAnalysis)
            .await
            .unwrap();

        // Complete: the duplicate-invocation shortcut must not hand the
        // full record (reports, analysis) to a non-participant either.
        let err = coordinator
            .apply_action(&session.id, "p9", SessionAction::RequestAnalysis)
            .await
            .unwrap_err();
        assert!(matches!(err, AccordError::NotYourTurn { .. }));

        // Participants still get the idempotent completed result.
        let done = coordinator
            .apply_action(&session.id, "p2", SessionAction::RequestAnalysis)
            .await
            .unwrap();
        assert_eq!(done.status, ConflictStatus::Complete);
    }

    #[tokio::test]
    async fn test_a_new_session_can_follow_a_completed_one() {
        let Fixture { coordinator, .. } = fixture(StubAnalysisService::succeeding());
        let first = drive_to_analyzing(&coordinator).await;
        coordinator
            .apply_action(&first.id, "p1", SessionAction::RequestAnalysis)
            .await
            .unwrap();

        // Roles are assigned fresh: p2 initiates the next session.
        let next = coordinator
            .get_or_create_active_session("r1", "p2")
            .await
            .unwrap();
        assert_ne!(next.id, first.id);
        assert_eq!(next.initiator_id, "p2");
        assert_eq!(next.responder_id, "p1");

        let history = coordinator.list_sessions("r1").await.unwrap();
        assert_eq!(history.len(), 2);
        // Newest first.
        assert_eq!(history[0].id, next.id);
        assert_eq!(history[1].id, first.id);
    }
}

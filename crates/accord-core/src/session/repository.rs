//! Session repository trait.
//!
//! Defines the interface for session persistence operations.

use super::model::ConflictSession;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for conflict session persistence.
///
/// This trait decouples the engine from the storage mechanism (TOML
/// files, database, remote API). Implementations must support the
/// compare-and-set semantics documented on [`save`](Self::save); the
/// coordinator relies on them for the single-active-session invariant
/// and for serializing transitions across processes.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds a session by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(session))`: session found
    /// - `Ok(None)`: session not found
    /// - `Err(_)`: storage failure
    async fn find_by_id(&self, session_id: &str) -> Result<Option<ConflictSession>>;

    /// Persists a session with a compare-and-set version check.
    ///
    /// The write succeeds only when the stored record's version is
    /// exactly `session.version - 1`, or when no record exists and
    /// `session.version == 1`. Anything else fails with
    /// `AccordError::Conflict` and leaves the stored record unchanged.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: session persisted
    /// - `Err(AccordError::Conflict)`: a concurrent writer got there first
    /// - `Err(_)`: storage failure
    async fn save(&self, session: &ConflictSession) -> Result<()>;

    /// Finds the relationship's active (non-terminal) session, if any.
    ///
    /// The single-active-session invariant guarantees at most one match.
    async fn find_active_by_relationship(
        &self,
        relationship_id: &str,
    ) -> Result<Option<ConflictSession>>;

    /// Lists all sessions for a relationship, in no particular order.
    async fn list_by_relationship(&self, relationship_id: &str) -> Result<Vec<ConflictSession>>;
}

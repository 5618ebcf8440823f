//! Application layer for accord.
//!
//! Composes the domain model, persistence, and the analysis client into
//! the `SessionCoordinator` use case.

pub mod coordinator;
pub mod locks;

pub use coordinator::SessionCoordinator;

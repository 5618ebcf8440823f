//! Domain layer of the Accord conflict resolution engine.
//!
//! Accord walks two paired parties through a structured disagreement:
//! each submits a private account, reads the other's at the permitted
//! moment, adds context, and both consent to a final automated analysis.
//! This crate holds the entities, the session state machine and role
//! gate, the redacting view projection, and the traits the outer layers
//! implement (repositories, relationship registry, analysis service).

pub mod analysis;
pub mod error;
pub mod profile;
pub mod relationship;
pub mod session;

// Re-export common error type
pub use error::AccordError;

//! Session domain module.
//!
//! This module contains the conflict session entity, its state machine,
//! the role gate, the redacting read projection, and the repository
//! interface.
//!
//! # Module Structure
//!
//! - `model`: The `ConflictSession` entity and report types
//! - `status`: The seven-state `ConflictStatus` graph
//! - `machine`: Pure transition functions and `SessionAction`
//! - `gate`: The pure (state, actor) permission table
//! - `view`: The redacting `SessionView` projection
//! - `repository`: Repository trait for session persistence

pub mod gate;
pub mod machine;
mod model;
mod repository;
mod status;
pub mod view;

// Re-export public API
pub use gate::{ActionKind, Permission, Role};
pub use machine::SessionAction;
pub use model::{ConflictReport, ConflictSession, PartnerAwareness};
pub use repository::SessionRepository;
pub use status::ConflictStatus;
pub use view::SessionView;

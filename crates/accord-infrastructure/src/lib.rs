//! Infrastructure layer for Accord.
//!
//! Provides the storage implementations behind the domain traits:
//! TOML-file repositories with versioned compare-and-set writes, and
//! in-memory equivalents for tests and embedding.

pub mod atomic_toml;
pub mod dto;
pub mod memory;
pub mod toml_registry;
pub mod toml_session_repository;

pub use atomic_toml::AtomicTomlFile;
pub use memory::{MemoryProfileRepository, MemoryRelationshipRegistry, MemorySessionRepository};
pub use toml_registry::{TomlProfileRepository, TomlRelationshipRegistry};
pub use toml_session_repository::TomlSessionRepository;

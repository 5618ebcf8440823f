//! Interaction layer for Accord.
//!
//! Home of the external analysis agents. Currently a single
//! implementation backed by the Gemini REST API.

pub mod gemini_analysis_agent;

pub use gemini_analysis_agent::GeminiAnalysisAgent;

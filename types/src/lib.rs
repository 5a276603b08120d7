//! Core domain types for lintlens.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

mod diagnostic;
mod display;

pub use diagnostic::{DiagnosticRecord, Severity, SeverityCounts, TextRange};
pub use display::{BadgeState, DisplayNode, GroupMode, ParseGroupModeError};

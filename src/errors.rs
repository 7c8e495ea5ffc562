//! Shared error types for pipeline construction.
//!
//! Construction is total: stage factories and the plain resolver never fail.
//! The only structured error lives behind the opt-in duplicate-alias
//! validation on the reference resolver.

use thiserror::Error;

/// Errors surfaced by the checked reference-resolution entry point.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PopulateError {
    /// Two reference specs resolve to the same output alias. The stage
    /// groups would both run and the later one's writes would silently win
    /// in the final document.
    #[error("duplicate output alias `{alias}` across reference specs")]
    DuplicateAlias { alias: String },
}

#![allow(clippy::result_large_err)]
//! tsemver-core: semantic-versioning change detection for TypeScript
//! declaration files.
//!
//! Compares a previous and a current `.d.ts` surface and classifies every
//! difference as breaking, additive or neutral, aggregated into a
//! [`ChangeReport`] (`major` / `minor` / `patch`).
//!
//! # Public API
//!
//! - [`Detector`] -- async entry point over two definition files
//! - [`detect_changes()`] -- synchronous comparison of two parsed documents
//! - [`parse()`] / [`validate()`] -- declaration front-end
//! - [`Oracle`] -- position-aware type compatibility rules
//! - [`compare_signatures()`] -- function signature diffing
//! - [`DetectError`] -- error type

pub mod ast;
pub mod classify;
pub mod collect;
pub mod config;
pub mod detector;
pub mod error;
pub mod frontend;
pub mod lexer;
pub mod oracle;
pub mod parser;
pub mod render;
pub mod report;
pub mod resolve;
pub mod signature;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{Document, Member, Signature, TypeExpr};
pub use config::{DefinitionFile, DetectorConfig, DetectorOptions};
pub use error::DetectError;
pub use oracle::{Oracle, Position, Verdict};
pub use report::{ChangeRecord, ChangeReport, ChangeType, Severity};
pub use resolve::ResolutionContext;

// ── Convenience re-exports: entry points ─────────────────────────────

pub use classify::detect_changes;
pub use detector::Detector;
pub use parser::{parse, validate};
pub use signature::compare_signatures;

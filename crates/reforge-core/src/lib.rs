//! # Reforge Core
//!
//! Core implementation of the Reforge source rewriting engine, including:
//! - Abstract Syntax Tree (AST) definitions and fragment builder
//! - Structural matcher and binding-aware variable comparison
//! - Edit ledger with overlap rejection and atomic batches
//! - Rule registry, traversal controller and per-rule statistics
//! - The built-in refactoring rules
//!
//! This crate provides the foundational components that can be used to build
//! various Reforge interfaces (CLI, editor integration, batch service, etc.)

#![warn(clippy::all)]

pub mod ast;
pub mod edits;
pub mod engine;
pub mod loops;
pub mod matcher;
pub mod rules;

// Re-export commonly used types
pub use ast::{AstBuilder, BindingId, Fragment, Node, NodeKind, Span, VarBinding};
pub use edits::{ConflictError, Edit, EditLedger};
pub use engine::{
    CancelFlag, Diagnostic, Engine, NodeCx, RefactoringContext, RunSummary, SourceUnit,
    UnitOutcome,
};
pub use matcher::{is_same_variable, matches};
pub use rules::{
    CollectionContainsRule, RefactorRule, RuleError, RuleRegistry, RuleResult, RuleStats,
    TraversalSignal,
};

/// Engine version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

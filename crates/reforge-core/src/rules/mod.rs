/*!
# Refactoring Rules

Core trait and registry for pattern-detection rules. A rule inspects nodes
offered by the traversal controller, schedules edits for shapes it
recognizes, and answers with a [`TraversalSignal`] telling the controller
whether the subtree underneath is still worth visiting.
*/

pub mod collection_contains;

pub use collection_contains::CollectionContainsRule;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::{Node, Span};
use crate::edits::ConflictError;
use crate::engine::{NodeCx, RefactoringContext};

/// What the controller should do with the subtree of the node just offered.
///
/// A rule returns [`SkipSubtree`] exactly when it has scheduled an edit that
/// replaces or removes the visited node: the children it would descend into
/// are about to disappear from the text, so revisiting them could only
/// schedule conflicting edits.
///
/// [`SkipSubtree`]: TraversalSignal::SkipSubtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalSignal {
    /// Keep walking into the node's children.
    Descend,
    /// The rule invalidated this subtree; continue at the next sibling.
    SkipSubtree,
}

impl TraversalSignal {
    pub fn is_skip(&self) -> bool {
        matches!(self, TraversalSignal::SkipSubtree)
    }
}

/// Failure modes of a single rule on a single node. "Pattern does not apply
/// here" is not an error; that is a plain [`TraversalSignal::Descend`] with
/// nothing scheduled.
#[derive(Debug, Clone, Error)]
pub enum RuleError {
    /// The rule recognized an outer pattern but the fusion step found a
    /// shape the algorithm does not cover. Recovered by declining to
    /// rewrite this occurrence; never a crash, never a mis-rewrite.
    #[error("unsupported fusion shape: {message}")]
    UnsupportedFusionShape {
        span: Option<Span>,
        message: String,
    },
    /// A scheduled edit overlapped an existing one; always a logic bug in
    /// some rule. The batch is dropped and the unit continues.
    #[error(transparent)]
    Conflict(#[from] ConflictError),
}

pub type RuleResult = Result<TraversalSignal, RuleError>;

/// Core trait for refactoring rules.
///
/// Rules are independent: each sees the original, unedited tree shape for
/// the whole pass, regardless of edits other rules scheduled earlier.
/// Edits take effect only at commit, after the walk finishes.
pub trait RefactorRule: Send + Sync {
    /// Human-readable name for this rule.
    fn name(&self) -> &'static str;

    /// Detailed description of what this rule does.
    fn description(&self) -> &'static str;

    /// Offered every statement node in pre-order.
    fn visit_stmt(&self, stmt: &Node, cx: &NodeCx, rcx: &mut RefactoringContext) -> RuleResult {
        let _ = (stmt, cx, rcx);
        Ok(TraversalSignal::Descend)
    }

    /// Offered every expression node in pre-order.
    fn visit_expr(&self, expr: &Node, cx: &NodeCx, rcx: &mut RefactoringContext) -> RuleResult {
        let _ = (expr, cx, rcx);
        Ok(TraversalSignal::Descend)
    }
}

/// Rule execution statistics for one or more units.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleStats {
    pub rule_name: String,
    /// Nodes offered to the rule's handlers.
    pub applications: u64,
    /// Handler invocations that scheduled at least one edit.
    pub transformations: u64,
    pub errors: u64,
    pub total_time_us: u64,
}

impl RuleStats {
    pub fn new(rule_name: String) -> Self {
        Self {
            rule_name,
            ..Self::default()
        }
    }

    pub fn merge(&mut self, other: &RuleStats) {
        self.applications += other.applications;
        self.transformations += other.transformations;
        self.errors += other.errors;
        self.total_time_us += other.total_time_us;
    }

    pub fn success_rate(&self) -> f64 {
        if self.applications == 0 {
            0.0
        } else {
            (self.transformations as f64) / (self.applications as f64)
        }
    }
}

/// Ordered registry of rule instances. Registration order is the evaluation
/// order at every node, so output is reproducible for a fixed rule set.
pub struct RuleRegistry {
    rules: Vec<Box<dyn RefactorRule>>,
}

impl RuleRegistry {
    /// A registry with every built-in rule, in stable order.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(CollectionContainsRule::new()));
        registry
    }

    /// An empty registry, for hosts that hand-pick rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn register(&mut self, rule: Box<dyn RefactorRule>) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Box<dyn RefactorRule>] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn all_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// `(name, description)` pairs for the host's rule-selection surface.
    pub fn list_rules(&self) -> Vec<(&'static str, &'static str)> {
        self.rules
            .iter()
            .map(|r| (r.name(), r.description()))
            .collect()
    }

    /// Keep only the rules whose names the host enabled, preserving order.
    pub fn retain_enabled(&mut self, enabled: &std::collections::HashSet<String>) {
        self.rules.retain(|r| enabled.contains(r.name()));
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/*!
# Rewrite Engine

Drives refactoring passes over parsed compilation units: per-unit
[`RefactoringContext`] bundles, the traversal controller, diagnostics, and a
driver that processes many units on independent worker tasks with
cooperative cancellation.
*/

pub mod walker;

pub use walker::NodeCx;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ast::{AstBuilder, Fragment, Node, Span};
use crate::edits::{ConflictError, Edit, EditLedger};
use crate::rules::{RuleRegistry, RuleStats};

use walker::Walker;

/// Per-compilation-unit bundle handed to rules: the original source text
/// (borrowed; the tree itself stays owned by the host), the edit ledger,
/// and the stateless fragment builder. Created per unit at the start of a
/// pass, discarded once edits are committed.
pub struct RefactoringContext<'s> {
    source: &'s str,
    builder: AstBuilder,
    ledger: EditLedger,
}

impl<'s> RefactoringContext<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            builder: AstBuilder::new(),
            ledger: EditLedger::new(),
        }
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    pub fn builder(&self) -> AstBuilder {
        self.builder
    }

    pub fn ledger(&self) -> &EditLedger {
        &self.ledger
    }

    /// The edits realizing "replace `span` with `fragment`": the
    /// replacement itself, plus removals excising every subtree the
    /// fragment moved out of a location outside the replaced range.
    pub fn replacement_edits(&self, span: Span, fragment: &Fragment) -> Vec<Edit> {
        let mut edits = vec![Edit::replace(span, fragment.render(self.source))];
        for moved in fragment.moved_from() {
            if !span.contains(*moved) {
                edits.push(Edit::remove(*moved));
            }
        }
        edits
    }

    /// Replace the node at `span` with `fragment` as one atomic batch.
    pub fn replace(&mut self, span: Span, fragment: &Fragment) -> Result<(), ConflictError> {
        let edits = self.replacement_edits(span, fragment);
        self.schedule_batch(edits)
    }

    pub fn schedule(&mut self, edit: Edit) -> Result<(), ConflictError> {
        self.ledger.schedule(edit)
    }

    /// Atomic group scheduling: either the whole rewrite lands, or none of
    /// it does.
    pub fn schedule_batch(&mut self, edits: Vec<Edit>) -> Result<(), ConflictError> {
        self.ledger.schedule_batch(edits)
    }

    /// Apply the scheduled edits, returning the transformed text and
    /// whether anything changed.
    pub fn commit(self) -> (String, bool) {
        let changed = !self.ledger.is_empty();
        (self.ledger.commit(self.source), changed)
    }
}

/// A per-unit, per-rule problem report surfaced to the host instead of a
/// crash: the unit is still processed by the remaining rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule: String,
    pub span: Option<Span>,
    pub message: String,
}

/// One compilation unit as supplied by the host: a parsed tree plus the
/// source text it was parsed from. The engine never parses text itself.
pub struct SourceUnit {
    pub name: String,
    pub root: Node,
    pub source: String,
}

/// Result of one rule pass over one unit.
#[derive(Debug)]
pub struct UnitOutcome {
    /// Transformed source text (identical to the input when nothing fired).
    pub text: String,
    /// Ledger non-empty: the host should persist `text`.
    pub changed: bool,
    /// Pass was abandoned before commit; `text` is the untouched input.
    pub cancelled: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub rule_stats: HashMap<String, RuleStats>,
}

/// Mergeable summary of a whole run.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub units_processed: u64,
    pub units_changed: u64,
    pub cancelled: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub rule_stats: HashMap<String, RuleStats>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, outcome: &UnitOutcome) {
        self.units_processed += 1;
        if outcome.changed {
            self.units_changed += 1;
        }
        self.cancelled |= outcome.cancelled;
        self.diagnostics.extend(outcome.diagnostics.iter().cloned());
        for (name, stats) in &outcome.rule_stats {
            self.rule_stats
                .entry(name.clone())
                .or_insert_with(|| RuleStats::new(name.clone()))
                .merge(stats);
        }
    }

    pub fn success(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Cooperative cancellation handle shared between the host and the engine.
/// Checked between compilation units and between rule passes; the unit in
/// progress abandons its ledger rather than committing a half-built
/// rewrite.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The rewrite driver: owns the rule registry and runs passes over units.
///
/// Within one unit everything is single-threaded and synchronous: rule
/// invocations are serialized per node, and the no-overlap invariant is
/// enforced by the ledger's local scheduling check. Across units there is
/// no shared mutable state, so units run on independent worker tasks.
pub struct Engine {
    registry: RuleRegistry,
    cancel: CancelFlag,
}

impl Engine {
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry,
            cancel: CancelFlag::new(),
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// A handle the host can use to abort a batch run.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run every registered rule over one unit and commit the resulting
    /// edits against its source text.
    pub fn refactor_unit(&self, root: &Node, source: &str) -> UnitOutcome {
        let mut rcx = RefactoringContext::new(source);
        let mut walker = Walker::new(self.registry.rules());

        if self.cancel.is_cancelled() {
            return UnitOutcome {
                text: source.to_string(),
                changed: false,
                cancelled: true,
                diagnostics: Vec::new(),
                rule_stats: HashMap::new(),
            };
        }

        walker.walk(root, &mut rcx);
        let (diagnostics, rule_stats) = walker.finish();

        // A cancellation that arrived mid-walk abandons the ledger.
        if self.cancel.is_cancelled() {
            return UnitOutcome {
                text: source.to_string(),
                changed: false,
                cancelled: true,
                diagnostics,
                rule_stats,
            };
        }

        let (text, changed) = rcx.commit();
        UnitOutcome {
            text,
            changed,
            cancelled: false,
            diagnostics,
            rule_stats,
        }
    }

    /// Process many units on independent worker tasks and merge their
    /// outcomes. Returns the per-unit outcomes in input order together
    /// with the run summary.
    pub fn refactor_all(&self, units: &[SourceUnit]) -> (Vec<UnitOutcome>, RunSummary) {
        let outcomes: Vec<UnitOutcome> = units
            .par_iter()
            .map(|unit| {
                let outcome = self.refactor_unit(&unit.root, &unit.source);
                info!(
                    unit = %unit.name,
                    changed = outcome.changed,
                    diagnostics = outcome.diagnostics.len(),
                    "unit processed"
                );
                outcome
            })
            .collect();

        let mut summary = RunSummary::new();
        for outcome in &outcomes {
            summary.absorb(outcome);
        }
        (outcomes, summary)
    }
}

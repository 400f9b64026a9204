// Traversal controller: depth-first, pre-order walk offering every
// statement and expression to every registered rule in stable registration
// order. A SkipSubtree answer from any rule suppresses descent into the
// node's children; the walk continues at the next sibling.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, warn};

use crate::ast::{Node, NodeKind};
use crate::engine::{Diagnostic, RefactoringContext};
use crate::rules::{RefactorRule, RuleStats};

/// Where the currently visited statement sits in its enclosing list.
#[derive(Clone, Copy)]
struct StmtFrame<'t> {
    stmts: &'t [Node],
    index: usize,
}

/// Navigation handed to rules alongside each offered node: siblings within
/// the current statement list, and the lexically previous/next statement,
/// which may live in an enclosing block when the current statement is at
/// the edge of its own.
pub struct NodeCx<'t, 'f> {
    frames: &'f [StmtFrame<'t>],
}

impl<'t> NodeCx<'t, '_> {
    /// Previous statement in the same statement list.
    pub fn prev_sibling(&self) -> Option<&'t Node> {
        let frame = self.frames.last()?;
        frame.index.checked_sub(1).map(|i| &frame.stmts[i])
    }

    /// Next statement in the same statement list.
    pub fn next_sibling(&self) -> Option<&'t Node> {
        let frame = self.frames.last()?;
        frame.stmts.get(frame.index + 1)
    }

    /// The statement lexically preceding the current one: its previous
    /// sibling, or, at the start of a block, the statement preceding the
    /// enclosing statement.
    pub fn prev_statement(&self) -> Option<&'t Node> {
        self.frames
            .iter()
            .rev()
            .find(|f| f.index > 0)
            .map(|f| &f.stmts[f.index - 1])
    }

    /// The statement lexically following the current one, symmetrically.
    pub fn next_statement(&self) -> Option<&'t Node> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.stmts.get(f.index + 1))
    }
}

pub(crate) struct Walker<'r> {
    rules: &'r [Box<dyn RefactorRule>],
    diagnostics: Vec<Diagnostic>,
    stats: HashMap<String, RuleStats>,
}

impl<'r> Walker<'r> {
    pub fn new(rules: &'r [Box<dyn RefactorRule>]) -> Self {
        let stats = rules
            .iter()
            .map(|r| (r.name().to_string(), RuleStats::new(r.name().to_string())))
            .collect();
        Self {
            rules,
            diagnostics: Vec::new(),
            stats,
        }
    }

    pub fn finish(self) -> (Vec<Diagnostic>, HashMap<String, RuleStats>) {
        (self.diagnostics, self.stats)
    }

    pub fn walk<'t>(&mut self, root: &'t Node, rcx: &mut RefactoringContext) {
        let mut frames: Vec<StmtFrame<'t>> = Vec::new();
        self.walk_stmts(root.as_stmt_list(), &mut frames, rcx);
    }

    fn walk_stmts<'t>(
        &mut self,
        stmts: &'t [Node],
        frames: &mut Vec<StmtFrame<'t>>,
        rcx: &mut RefactoringContext,
    ) {
        for index in 0..stmts.len() {
            frames.push(StmtFrame { stmts, index });
            let stmt = &stmts[index];
            let skip = self.offer(stmt, frames, rcx, true);
            if !skip {
                self.descend_stmt(stmt, frames, rcx);
            }
            frames.pop();
        }
    }

    fn descend_stmt<'t>(
        &mut self,
        stmt: &'t Node,
        frames: &mut Vec<StmtFrame<'t>>,
        rcx: &mut RefactoringContext,
    ) {
        match &stmt.kind {
            NodeKind::Block { stmts } => self.walk_stmts(stmts, frames, rcx),
            NodeKind::ForEach { iterable, body, .. } => {
                self.walk_expr(iterable, frames, rcx);
                self.walk_stmts(body.as_stmt_list(), frames, rcx);
            }
            NodeKind::For {
                init,
                cond,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.walk_stmts(std::slice::from_ref(init), frames, rcx);
                }
                if let Some(cond) = cond {
                    self.walk_expr(cond, frames, rcx);
                }
                if let Some(update) = update {
                    self.walk_expr(update, frames, rcx);
                }
                self.walk_stmts(body.as_stmt_list(), frames, rcx);
            }
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.walk_expr(cond, frames, rcx);
                self.walk_stmts(then_branch.as_stmt_list(), frames, rcx);
                if let Some(else_branch) = else_branch {
                    self.walk_stmts(else_branch.as_stmt_list(), frames, rcx);
                }
            }
            NodeKind::Return { value } => {
                if let Some(value) = value {
                    self.walk_expr(value, frames, rcx);
                }
            }
            NodeKind::VarDecl { init, .. } => {
                if let Some(init) = init {
                    self.walk_expr(init, frames, rcx);
                }
            }
            NodeKind::ExprStmt { expr } => self.walk_expr(expr, frames, rcx),
            NodeKind::Break { .. } => {}
            // Expression kinds never occupy statement position here.
            _ => {}
        }
    }

    fn walk_expr<'t>(
        &mut self,
        expr: &'t Node,
        frames: &mut Vec<StmtFrame<'t>>,
        rcx: &mut RefactoringContext,
    ) {
        let skip = self.offer(expr, frames, rcx, false);
        if skip {
            return;
        }
        match &expr.kind {
            NodeKind::Assign { target, value } => {
                self.walk_expr(target, frames, rcx);
                self.walk_expr(value, frames, rcx);
            }
            NodeKind::MethodCall { receiver, args, .. } => {
                self.walk_expr(receiver, frames, rcx);
                for arg in args {
                    self.walk_expr(arg, frames, rcx);
                }
            }
            NodeKind::Unary { operand, .. } => self.walk_expr(operand, frames, rcx),
            NodeKind::Binary { left, right, .. } => {
                self.walk_expr(left, frames, rcx);
                self.walk_expr(right, frames, rcx);
            }
            NodeKind::Paren { inner } => self.walk_expr(inner, frames, rcx),
            _ => {}
        }
    }

    /// Offer one node to every rule in registration order. Every rule sees
    /// the node even after an earlier rule asked to skip; only descent is
    /// affected. Rule errors become diagnostics, never aborts.
    fn offer(
        &mut self,
        node: &Node,
        frames: &[StmtFrame<'_>],
        rcx: &mut RefactoringContext,
        is_stmt: bool,
    ) -> bool {
        let cx = NodeCx { frames };
        let mut skip = false;
        for rule in self.rules {
            let scheduled_before = rcx.ledger().len();
            let started = Instant::now();
            let result = if is_stmt {
                rule.visit_stmt(node, &cx, rcx)
            } else {
                rule.visit_expr(node, &cx, rcx)
            };
            let elapsed_us = started.elapsed().as_micros() as u64;

            let stats = self
                .stats
                .entry(rule.name().to_string())
                .or_insert_with(|| RuleStats::new(rule.name().to_string()));
            stats.applications += 1;
            stats.total_time_us += elapsed_us;

            match result {
                Ok(signal) => {
                    if rcx.ledger().len() > scheduled_before {
                        stats.transformations += 1;
                        debug!(
                            rule = rule.name(),
                            span = ?node.span,
                            edits = rcx.ledger().len() - scheduled_before,
                            "rewrite scheduled"
                        );
                    }
                    if signal.is_skip() {
                        skip = true;
                    }
                }
                Err(err) => {
                    stats.errors += 1;
                    warn!(rule = rule.name(), span = ?node.span, error = %err, "rule declined with error");
                    self.diagnostics.push(Diagnostic {
                        rule: rule.name().to_string(),
                        span: node.span,
                        message: err.to_string(),
                    });
                }
            }
        }
        skip
    }
}

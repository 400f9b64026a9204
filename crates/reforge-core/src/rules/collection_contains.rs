/*!
# Collection.contains() Rather Than Loop

Recognizes hand-written membership-search loops, meaning an iteration over a
collection whose body is a single conditional testing equality between the
loop element and one fixed expression, and rewrites them to a single
`collection.contains(x)` check. Fires only when the pattern is unambiguous;
everything else is left untouched.
*/

use tracing::debug;

use crate::ast::{BindingId, Fragment, Node, NodeKind, Span, VarBinding};
use crate::edits::Edit;
use crate::engine::{NodeCx, RefactoringContext};
use crate::loops::{self, ForLoopContent, IterationKind};
use crate::matcher::{is_same_variable, matches};
use crate::rules::{RefactorRule, RuleError, RuleResult, TraversalSignal};

pub struct CollectionContainsRule;

impl CollectionContainsRule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CollectionContainsRule {
    fn default() -> Self {
        Self::new()
    }
}

impl RefactorRule for CollectionContainsRule {
    fn name(&self) -> &'static str {
        "Collection.contains() rather than loop"
    }

    fn description(&self) -> &'static str {
        "Replace a loop searching for a member with Collection.contains(Object obj)."
    }

    fn visit_stmt(&self, stmt: &Node, cx: &NodeCx, rcx: &mut RefactoringContext) -> RuleResult {
        let Some(loop_span) = stmt.span else {
            return Ok(TraversalSignal::Descend);
        };
        match &stmt.kind {
            NodeKind::ForEach {
                var,
                iterable,
                body,
            } => {
                let iterable = iterable.strip_parens();
                if !loops::is_collection_typed(iterable) {
                    return Ok(TraversalSignal::Descend);
                }
                let loop_element = loop_variable_name(var);
                let if_stmt = unique_stmt_as_if(body);
                self.maybe_replace_with_collection_contains(
                    loop_span,
                    iterable,
                    &loop_element,
                    if_stmt,
                    cx,
                    rcx,
                )
            }
            NodeKind::For { body, .. } => {
                let Some(content) = loops::iterate_over_container(stmt) else {
                    return Ok(TraversalSignal::Descend);
                };
                if !loops::is_collection_typed(content.container) {
                    return Ok(TraversalSignal::Descend);
                }
                let element_access = element_access(&content);
                let stmts = body.as_stmt_list();
                let (loop_element, if_stmt) = match stmts {
                    // The element is pulled into a local first:
                    // `T x = c.get(i); if (x.equals(t)) ...`
                    [first, second] => {
                        let Some((name, binding, init)) = unique_decl_fragment(first) else {
                            return Ok(TraversalSignal::Descend);
                        };
                        let expected_receiver = match content.kind {
                            IterationKind::Index => content.container,
                            IterationKind::Iterator => content.loop_var,
                        };
                        if !matches(init.strip_parens(), &element_access)
                            || !is_same_variable(
                                receiver_of(init.strip_parens()),
                                expected_receiver,
                            )
                        {
                            return Ok(TraversalSignal::Descend);
                        }
                        let element = synthetic_name(name, binding);
                        (element, as_if_stmt(second))
                    }
                    // The element access appears inline in the condition:
                    // `if (c.get(i).equals(t)) ...`
                    [only] => (element_access.clone(), as_if_stmt(only)),
                    _ => return Ok(TraversalSignal::Descend),
                };
                let container = content.container;
                self.maybe_replace_with_collection_contains(
                    loop_span,
                    container,
                    &loop_element,
                    if_stmt,
                    cx,
                    rcx,
                )
            }
            _ => Ok(TraversalSignal::Descend),
        }
    }
}

impl CollectionContainsRule {
    fn maybe_replace_with_collection_contains(
        &self,
        loop_span: Span,
        iterable: &Node,
        loop_element: &Node,
        if_stmt: Option<&Node>,
        cx: &NodeCx,
        rcx: &mut RefactoringContext,
    ) -> RuleResult {
        let Some(ifs) = if_stmt else {
            return Ok(TraversalSignal::Descend);
        };
        let Some((cond, then_branch, None)) = ifs.as_if() else {
            // An else branch means the loop does more than search.
            return Ok(TraversalSignal::Descend);
        };
        let cond = cond.strip_parens();
        let Some((receiver, "equals", [argument])) = cond.as_method_call() else {
            return Ok(TraversalSignal::Descend);
        };
        let Some(to_find) = expression_to_find(receiver, argument, loop_element) else {
            return Ok(TraversalSignal::Descend);
        };
        let then_stmts = then_branch.as_stmt_list();
        match then_stmts {
            [] => Ok(TraversalSignal::Descend),
            [then_stmt] => {
                let inner = then_stmt.as_returned_bool();
                let next_stmt = cx.next_statement();
                let outer = next_stmt.and_then(Node::as_returned_bool);
                if let Some(is_positive) = containment_sign(inner, outer) {
                    self.replace_loop_and_return(
                        loop_span,
                        iterable,
                        to_find,
                        next_stmt,
                        is_positive,
                        cx,
                        rcx,
                    )?;
                    return Ok(TraversalSignal::SkipSubtree);
                }
                self.maybe_replace_loop_and_variable(loop_span, iterable, then_stmt, to_find, cx, rcx)
            }
            [.., last] if last.is_unlabeled_break() => {
                if then_stmts.len() == 2 {
                    let signal = self.maybe_replace_loop_and_variable(
                        loop_span,
                        iterable,
                        &then_stmts[0],
                        to_find,
                        cx,
                        rcx,
                    )?;
                    if signal.is_skip() {
                        return Ok(TraversalSignal::SkipSubtree);
                    }
                }
                self.replace_loop_by_if(
                    loop_span,
                    iterable,
                    &then_stmts[..then_stmts.len() - 1],
                    to_find,
                    rcx,
                )?;
                Ok(TraversalSignal::SkipSubtree)
            }
            _ => Ok(TraversalSignal::Descend),
        }
    }

    /// `return true;` inside the loop, `return false;` right after it (or
    /// the inverse): fold both into a single `return [!]c.contains(x);`.
    fn replace_loop_and_return(
        &self,
        loop_span: Span,
        iterable: &Node,
        to_find: &Node,
        next_stmt: Option<&Node>,
        is_positive: bool,
        cx: &NodeCx,
        rcx: &mut RefactoringContext,
    ) -> Result<(), RuleError> {
        let b = rcx.builder();
        let replacement = b.return_value(containment_check(iterable, to_find, is_positive, rcx));
        let mut edits = rcx.replacement_edits(loop_span, &replacement);
        // The opposite return is folded in only when it directly follows
        // the loop in the same statement list.
        if let (Some(next), Some(sibling)) = (next_stmt, cx.next_sibling()) {
            if std::ptr::eq(next, sibling) {
                if let Some(span) = next.span {
                    edits.push(Edit::remove(span));
                }
            }
        }
        rcx.schedule_batch(edits)?;
        debug!(span = ?loop_span, positive = is_positive, "loop folded into returned containment check");
        Ok(())
    }

    /// `flag = true; break;` inside the loop with `flag` initialized to the
    /// opposite literal beforehand: fold initializer and loop into one
    /// declaration or assignment of the containment check.
    fn maybe_replace_loop_and_variable(
        &self,
        loop_span: Span,
        iterable: &Node,
        unique_then_stmt: &Node,
        to_find: &Node,
        cx: &NodeCx,
        rcx: &mut RefactoringContext,
    ) -> RuleResult {
        let Some(previous_stmt) = cx.prev_statement() else {
            return Ok(TraversalSignal::Descend);
        };
        let previous_is_sibling = cx
            .prev_sibling()
            .is_some_and(|sibling| std::ptr::eq(previous_stmt, sibling));

        let Some((inner_name, inner_value)) = unique_then_stmt.as_assignment() else {
            return Ok(TraversalSignal::Descend);
        };
        let Some(outer_init) = initializer_of(previous_stmt) else {
            return Ok(TraversalSignal::Descend);
        };
        if !outer_init.is_same_variable_as(inner_name) {
            return Ok(TraversalSignal::Descend);
        }
        let inner = inner_value.strip_parens().as_bool_literal();
        let outer = outer_init.value().strip_parens().as_bool_literal();
        let Some(is_positive) = containment_sign(inner, outer) else {
            return Ok(TraversalSignal::Descend);
        };

        self.replace_loop_and_variable(
            loop_span,
            iterable,
            to_find,
            previous_stmt,
            previous_is_sibling,
            inner_name,
            is_positive,
            rcx,
        )?;
        Ok(TraversalSignal::SkipSubtree)
    }

    fn replace_loop_and_variable(
        &self,
        loop_span: Span,
        iterable: &Node,
        to_find: &Node,
        previous_stmt: &Node,
        previous_is_sibling: bool,
        flag_name: &Node,
        is_positive: bool,
        rcx: &mut RefactoringContext,
    ) -> Result<(), RuleError> {
        let b = rcx.builder();
        let check = containment_check(iterable, to_find, is_positive, rcx);
        let replacement = if previous_is_sibling && previous_stmt.as_var_decl().is_some() {
            let binding = name_binding(flag_name);
            let name = flag_name.as_name().unwrap_or_default();
            b.declare("boolean", name, binding, check)
        } else if !previous_is_sibling
            || matches!(previous_stmt.kind, NodeKind::ExprStmt { .. })
        {
            b.expr_stmt(b.assign(b.clone_subtree(flag_name), check))
        } else {
            // The outer pattern matched but the fusion step found a shape
            // this algorithm does not cover; decline rather than mis-rewrite.
            return Err(RuleError::UnsupportedFusionShape {
                span: previous_stmt.span,
                message: "preceding statement is neither a declaration nor an assignment"
                    .to_string(),
            });
        };

        let mut edits = rcx.replacement_edits(loop_span, &replacement);
        if previous_is_sibling {
            if let Some(span) = previous_stmt.span {
                edits.push(Edit::remove(span));
            }
        }
        rcx.schedule_batch(edits)?;
        debug!(span = ?loop_span, positive = is_positive, "loop fused with flag variable");
        Ok(())
    }

    /// No boolean folding available: keep the guarded statements, replace
    /// the loop with `if (c.contains(x)) { ...verbatim... }`.
    fn replace_loop_by_if(
        &self,
        loop_span: Span,
        iterable: &Node,
        guarded_stmts: &[Node],
        to_find: &Node,
        rcx: &mut RefactoringContext,
    ) -> Result<(), RuleError> {
        let b = rcx.builder();
        let body = b.block(guarded_stmts.iter().map(|s| b.move_subtree(s)).collect());
        let replacement = b.if_then(containment_check(iterable, to_find, true, rcx), body);
        rcx.replace(loop_span, &replacement)?;
        debug!(span = ?loop_span, "loop replaced by guarded if");
        Ok(())
    }
}

/// `[!]iterable.contains(to_find)`, with both operands moved out of the
/// loop being replaced.
fn containment_check(
    iterable: &Node,
    to_find: &Node,
    is_positive: bool,
    rcx: &RefactoringContext,
) -> Fragment {
    let b = rcx.builder();
    let invoke = b.call(
        b.move_subtree(iterable),
        "contains",
        vec![b.move_subtree(to_find)],
    );
    if is_positive {
        invoke
    } else {
        b.not(invoke)
    }
}

/// The sign of the folded containment check is the literal found inside the
/// loop; the literal pair must have opposite values or the pattern is
/// ambiguous.
fn containment_sign(inner: Option<bool>, outer: Option<bool>) -> Option<bool> {
    match (inner, outer) {
        (Some(inner), Some(outer)) if inner != outer => Some(inner),
        _ => None,
    }
}

/// Which operand of `a.equals(b)` is the fixed expression being searched
/// for, given the loop's own element. Tries the same-variable test first in
/// both argument orders, then structural matching in both orders.
fn expression_to_find<'t>(
    receiver: &'t Node,
    argument: &'t Node,
    loop_element: &Node,
) -> Option<&'t Node> {
    let receiver = receiver.strip_parens();
    let argument = argument.strip_parens();
    if is_same_variable(loop_element, receiver) {
        Some(argument)
    } else if is_same_variable(loop_element, argument) {
        Some(receiver)
    } else if matches(loop_element, receiver) {
        Some(argument)
    } else if matches(loop_element, argument) {
        Some(receiver)
    } else {
        None
    }
}

/// What the previous statement initializes: a single-fragment declaration
/// with an initializer, or a simple assignment statement.
enum PreviousInit<'t> {
    Decl {
        binding: Option<BindingId>,
        value: &'t Node,
    },
    Assign {
        name: &'t Node,
        value: &'t Node,
    },
}

impl<'t> PreviousInit<'t> {
    fn value(&self) -> &'t Node {
        match self {
            PreviousInit::Decl { value, .. } | PreviousInit::Assign { value, .. } => value,
        }
    }

    fn is_same_variable_as(&self, name: &Node) -> bool {
        match self {
            PreviousInit::Decl { binding, .. } => match (binding, name_binding(name)) {
                (Some(a), Some(b)) => *a == b,
                _ => false,
            },
            PreviousInit::Assign { name: outer, .. } => is_same_variable(outer, name),
        }
    }
}

fn initializer_of(stmt: &Node) -> Option<PreviousInit<'_>> {
    if let Some((_, _, binding, Some(value))) = stmt.as_var_decl() {
        return Some(PreviousInit::Decl { binding, value });
    }
    if let Some((name, value)) = stmt.as_assignment() {
        return Some(PreviousInit::Assign { name, value });
    }
    None
}

/// The loop body's unique statement, when it is an `if`.
fn unique_stmt_as_if(body: &Node) -> Option<&Node> {
    match body.as_stmt_list() {
        [only] => as_if_stmt(only),
        _ => None,
    }
}

fn as_if_stmt(stmt: &Node) -> Option<&Node> {
    matches!(stmt.kind, NodeKind::If { .. }).then_some(stmt)
}

/// `(name, binding, init)` when `stmt` declares exactly one variable with
/// an initializer.
fn unique_decl_fragment(stmt: &Node) -> Option<(&str, Option<BindingId>, &Node)> {
    let (_, name, binding, init) = stmt.as_var_decl()?;
    Some((name, binding, init?))
}

/// The element-producing access for a classic loop: `c.get(i)` for index
/// walks, `it.next()` for iterator walks.
fn element_access(content: &ForLoopContent<'_>) -> Node {
    let access = match content.kind {
        IterationKind::Index => NodeKind::MethodCall {
            receiver: Box::new(content.container.clone()),
            method: "get".to_string(),
            args: vec![content.loop_var.clone()],
        },
        IterationKind::Iterator => NodeKind::MethodCall {
            receiver: Box::new(content.loop_var.clone()),
            method: "next".to_string(),
            args: vec![],
        },
    };
    Node::synthetic(access)
}

fn receiver_of(call: &Node) -> &Node {
    match &call.kind {
        NodeKind::MethodCall { receiver, .. } => receiver.strip_parens(),
        _ => call,
    }
}

fn loop_variable_name(var: &VarBinding) -> Node {
    synthetic_name(&var.name, var.binding)
}

fn synthetic_name(name: &str, binding: Option<BindingId>) -> Node {
    Node::synthetic(NodeKind::Name {
        name: name.to_string(),
        binding,
        ty: None,
    })
}

fn name_binding(node: &Node) -> Option<BindingId> {
    match &node.strip_parens().kind {
        NodeKind::Name { binding, .. } => *binding,
        _ => None,
    }
}

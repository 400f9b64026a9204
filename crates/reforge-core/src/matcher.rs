// Structural matcher: deep structural equivalence between two subtrees,
// span-insensitive. This is a syntactic test only; it deliberately does not
// recognize semantic equivalences such as `a + b` vs `b + a`.

use crate::ast::{Node, NodeKind};

/// Deep structural-equivalence test: two nodes match when they have the same
/// kind and all corresponding children match recursively. Identifiers match
/// by spelling, literals by value, spans are ignored. Callers are expected
/// to strip redundant parentheses first ([`Node::strip_parens`]).
pub fn matches(a: &Node, b: &Node) -> bool {
    match (&a.kind, &b.kind) {
        (NodeKind::Block { stmts: a }, NodeKind::Block { stmts: b }) => all_match(a, b),
        (
            NodeKind::ForEach {
                var: va,
                iterable: ia,
                body: ba,
            },
            NodeKind::ForEach {
                var: vb,
                iterable: ib,
                body: bb,
            },
        ) => va.ty == vb.ty && va.name == vb.name && matches(ia, ib) && matches(ba, bb),
        (
            NodeKind::For {
                init: ia,
                cond: ca,
                update: ua,
                body: ba,
            },
            NodeKind::For {
                init: ib,
                cond: cb,
                update: ub,
                body: bb,
            },
        ) => {
            opt_matches(ia.as_deref(), ib.as_deref())
                && opt_matches(ca.as_deref(), cb.as_deref())
                && opt_matches(ua.as_deref(), ub.as_deref())
                && matches(ba, bb)
        }
        (
            NodeKind::If {
                cond: ca,
                then_branch: ta,
                else_branch: ea,
            },
            NodeKind::If {
                cond: cb,
                then_branch: tb,
                else_branch: eb,
            },
        ) => matches(ca, cb) && matches(ta, tb) && opt_matches(ea.as_deref(), eb.as_deref()),
        (NodeKind::Return { value: a }, NodeKind::Return { value: b }) => {
            opt_matches(a.as_deref(), b.as_deref())
        }
        (NodeKind::Break { label: a }, NodeKind::Break { label: b }) => a == b,
        (
            NodeKind::VarDecl {
                ty: ta,
                name: na,
                init: ia,
                ..
            },
            NodeKind::VarDecl {
                ty: tb,
                name: nb,
                init: ib,
                ..
            },
        ) => ta == tb && na == nb && opt_matches(ia.as_deref(), ib.as_deref()),
        (NodeKind::ExprStmt { expr: a }, NodeKind::ExprStmt { expr: b }) => matches(a, b),
        (
            NodeKind::Assign {
                target: ta,
                value: va,
            },
            NodeKind::Assign {
                target: tb,
                value: vb,
            },
        ) => matches(ta, tb) && matches(va, vb),
        (
            NodeKind::MethodCall {
                receiver: ra,
                method: ma,
                args: aa,
            },
            NodeKind::MethodCall {
                receiver: rb,
                method: mb,
                args: ab,
            },
        ) => ma == mb && matches(ra, rb) && all_match(aa, ab),
        (NodeKind::Name { name: a, .. }, NodeKind::Name { name: b, .. }) => a == b,
        (NodeKind::Bool(a), NodeKind::Bool(b)) => a == b,
        (NodeKind::Int(a), NodeKind::Int(b)) => a == b,
        (NodeKind::Str(a), NodeKind::Str(b)) => a == b,
        (
            NodeKind::Unary {
                op: oa,
                operand: na,
            },
            NodeKind::Unary {
                op: ob,
                operand: nb,
            },
        ) => oa == ob && matches(na, nb),
        (
            NodeKind::Binary {
                op: oa,
                left: la,
                right: ra,
            },
            NodeKind::Binary {
                op: ob,
                left: lb,
                right: rb,
            },
        ) => oa == ob && matches(la, lb) && matches(ra, rb),
        (NodeKind::Paren { inner: a }, NodeKind::Paren { inner: b }) => matches(a, b),
        _ => false,
    }
}

/// Narrower companion to [`matches`]: true only when both sides are simple
/// identifiers referring to the same declared variable, by binding rather than
/// spelling. Unresolved names never compare equal, so a coincidentally-named
/// unrelated variable cannot slip through.
pub fn is_same_variable(a: &Node, b: &Node) -> bool {
    match (&a.strip_parens().kind, &b.strip_parens().kind) {
        (NodeKind::Name { binding: Some(a), .. }, NodeKind::Name { binding: Some(b), .. }) => {
            a == b
        }
        _ => false,
    }
}

fn all_match(a: &[Node], b: &[Node]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| matches(x, y))
}

fn opt_matches(a: Option<&Node>, b: Option<&Node>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => matches(a, b),
        (None, None) => true,
        _ => false,
    }
}

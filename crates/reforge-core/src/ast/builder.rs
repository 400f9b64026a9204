// Rewrite builder: pure constructors for detached replacement fragments.
// Nothing here mutates the tree being read; every method returns a freshly
// owned fragment. Moved subtrees keep their original span so they render
// verbatim, and the span is recorded so the edit ledger can excise the
// original location when it falls outside the replaced range.

use super::{BindingId, Node, NodeKind, Span, ToSource, UnaryOp};

/// A detached replacement tree plus the original spans it was moved out of.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub node: Node,
    moved_from: Vec<Span>,
}

impl Fragment {
    fn synthetic(kind: NodeKind, moved_from: Vec<Span>) -> Self {
        Self {
            node: Node::synthetic(kind),
            moved_from,
        }
    }

    /// Original spans of subtrees relocated into this fragment.
    pub fn moved_from(&self) -> &[Span] {
        &self.moved_from
    }

    /// Render the fragment as replacement text against the unit's source.
    pub fn render(&self, source: &str) -> String {
        self.node.to_source(source)
    }
}

impl From<Node> for Fragment {
    fn from(node: Node) -> Self {
        Self {
            node,
            moved_from: Vec::new(),
        }
    }
}

/// Stateless fragment factory, one per [`RefactoringContext`].
///
/// [`RefactoringContext`]: crate::engine::RefactoringContext
#[derive(Debug, Default, Clone, Copy)]
pub struct AstBuilder;

impl AstBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Deep copy of a subtree, detached from the original tree. The copy
    /// keeps its span, so it renders as the original source slice.
    pub fn clone_subtree(&self, node: &Node) -> Fragment {
        Fragment {
            node: node.clone(),
            moved_from: Vec::new(),
        }
    }

    /// Like [`clone_subtree`], but marks the subtree as relocated rather
    /// than duplicated: the ledger excises the original location when it is
    /// not already covered by the replacement's own range.
    ///
    /// [`clone_subtree`]: AstBuilder::clone_subtree
    pub fn move_subtree(&self, node: &Node) -> Fragment {
        Fragment {
            node: node.clone(),
            moved_from: node.span.into_iter().collect(),
        }
    }

    /// `receiver.method(args...)`
    pub fn call(&self, receiver: Fragment, method: &str, args: Vec<Fragment>) -> Fragment {
        let mut moved = receiver.moved_from;
        let mut arg_nodes = Vec::with_capacity(args.len());
        for arg in args {
            moved.extend(arg.moved_from);
            arg_nodes.push(arg.node);
        }
        Fragment::synthetic(
            NodeKind::MethodCall {
                receiver: Box::new(receiver.node),
                method: method.to_string(),
                args: arg_nodes,
            },
            moved,
        )
    }

    /// `!expr`
    pub fn not(&self, operand: Fragment) -> Fragment {
        Fragment::synthetic(
            NodeKind::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand.node),
            },
            operand.moved_from,
        )
    }

    /// `if (cond) body` with no else branch.
    pub fn if_then(&self, cond: Fragment, body: Fragment) -> Fragment {
        let mut moved = cond.moved_from;
        moved.extend(body.moved_from);
        Fragment::synthetic(
            NodeKind::If {
                cond: Box::new(cond.node),
                then_branch: Box::new(body.node),
                else_branch: None,
            },
            moved,
        )
    }

    /// A block of statements.
    pub fn block(&self, stmts: Vec<Fragment>) -> Fragment {
        let mut moved = Vec::new();
        let mut nodes = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            moved.extend(stmt.moved_from);
            nodes.push(stmt.node);
        }
        Fragment::synthetic(NodeKind::Block { stmts: nodes }, moved)
    }

    /// `return expr;`
    pub fn return_value(&self, value: Fragment) -> Fragment {
        Fragment::synthetic(
            NodeKind::Return {
                value: Some(Box::new(value.node)),
            },
            value.moved_from,
        )
    }

    /// `ty name = init;`
    pub fn declare(
        &self,
        ty: &str,
        name: &str,
        binding: Option<BindingId>,
        init: Fragment,
    ) -> Fragment {
        Fragment::synthetic(
            NodeKind::VarDecl {
                ty: ty.to_string(),
                name: name.to_string(),
                binding,
                init: Some(Box::new(init.node)),
            },
            init.moved_from,
        )
    }

    /// `target = value` (an expression; see [`expr_stmt`]).
    ///
    /// [`expr_stmt`]: AstBuilder::expr_stmt
    pub fn assign(&self, target: Fragment, value: Fragment) -> Fragment {
        let mut moved = target.moved_from;
        moved.extend(value.moved_from);
        Fragment::synthetic(
            NodeKind::Assign {
                target: Box::new(target.node),
                value: Box::new(value.node),
            },
            moved,
        )
    }

    /// Wrap an expression in statement position: `expr;`
    pub fn expr_stmt(&self, expr: Fragment) -> Fragment {
        Fragment::synthetic(
            NodeKind::ExprStmt {
                expr: Box::new(expr.node),
            },
            expr.moved_from,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn name(text: &str, span: Span) -> Node {
        Node::new(
            NodeKind::Name {
                name: text.to_string(),
                binding: None,
                ty: None,
            },
            span,
        )
    }

    #[test]
    fn moved_spans_accumulate_through_constructors() {
        let source = "coll.contains(target)";
        let b = AstBuilder::new();
        let coll = name("coll", Span::new(0, 4));
        let target = name("target", Span::new(14, 20));

        let call = b.call(b.move_subtree(&coll), "contains", vec![b.move_subtree(&target)]);
        assert_eq!(call.moved_from(), &[Span::new(0, 4), Span::new(14, 20)]);
        assert_eq!(call.render(source), "coll.contains(target)");
    }

    #[test]
    fn clone_subtree_records_no_moves() {
        let b = AstBuilder::new();
        let coll = name("coll", Span::new(0, 4));
        let copy = b.clone_subtree(&coll);
        assert!(copy.moved_from().is_empty());
    }

    #[test]
    fn negation_parenthesizes_low_precedence_operands() {
        let b = AstBuilder::new();
        let call = b.call(
            Node::synthetic(NodeKind::Name {
                name: "c".to_string(),
                binding: None,
                ty: None,
            })
            .into(),
            "contains",
            vec![],
        );
        assert_eq!(b.not(call).render(""), "!c.contains()");
    }
}

// Tree model for the rewrite engine.
// Nodes are produced once by the external parser and never mutated in place;
// every transformation is expressed as a text edit against the original
// source, so many rules can inspect the same tree within one pass.

pub mod builder;
pub mod source_gen;
pub use builder::{AstBuilder, Fragment};
pub use source_gen::ToSource;


use serde::{Deserialize, Serialize};

/// Half-open byte range into a compilation unit's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when `other` lies entirely within this span.
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Half-open overlap test. Touching ranges do not overlap.
    pub fn overlaps(&self, other: Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Opaque variable-binding id assigned by the external binder.
///
/// Two names denote the same declared variable exactly when both carry the
/// same id; spelling alone is never enough (a shadowing local with the same
/// name gets a fresh id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingId(pub u32);

/// The loop variable of an enhanced `for`, or a plain declared name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarBinding {
    pub ty: String,
    pub name: String,
    pub binding: Option<BindingId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Logical negation: `!x`
    Not,
    /// Postfix increment: `i++`
    PostIncrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Lt,
    Le,
    Eq,
    Ne,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
        }
    }
}

/// One node of the parsed tree.
///
/// `span` is `Some` for nodes that came from the parser (their bytes exist in
/// the original source) and `None` for fragments synthesized by the
/// [`AstBuilder`]. Children are owned; sibling and previous-statement
/// navigation is provided by the traversal context, never by back-pointers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    // Statements
    Block {
        stmts: Vec<Node>,
    },
    /// Enhanced iteration: `for (T x : iterable) body`
    ForEach {
        var: VarBinding,
        iterable: Box<Node>,
        body: Box<Node>,
    },
    /// Classic three-part loop: `for (init; cond; update) body`
    For {
        init: Option<Box<Node>>,
        cond: Option<Box<Node>>,
        update: Option<Box<Node>>,
        body: Box<Node>,
    },
    If {
        cond: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Option<Box<Node>>,
    },
    Return {
        value: Option<Box<Node>>,
    },
    Break {
        label: Option<String>,
    },
    /// Single-fragment variable declaration: `T name = init;`
    VarDecl {
        ty: String,
        name: String,
        binding: Option<BindingId>,
        init: Option<Box<Node>>,
    },
    /// Expression used in statement position (assignments, bare calls).
    ExprStmt {
        expr: Box<Node>,
    },

    // Expressions
    /// Simple assignment: `target = value`
    Assign {
        target: Box<Node>,
        value: Box<Node>,
    },
    MethodCall {
        receiver: Box<Node>,
        method: String,
        args: Vec<Node>,
    },
    Name {
        name: String,
        binding: Option<BindingId>,
        /// Declared-type hint supplied by the binder, when known.
        ty: Option<String>,
    },
    Bool(bool),
    Int(i64),
    Str(String),
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Paren {
        inner: Box<Node>,
    },
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            span: Some(span),
        }
    }

    /// A fragment with no backing bytes in the original source.
    pub fn synthetic(kind: NodeKind) -> Self {
        Self { kind, span: None }
    }

    /// Peel redundant parentheses off an expression.
    pub fn strip_parens(&self) -> &Node {
        match &self.kind {
            NodeKind::Paren { inner } => inner.strip_parens(),
            _ => self,
        }
    }

    /// The statements of this node viewed as a statement list: a block's
    /// statements, or the node itself as a single-element list.
    pub fn as_stmt_list(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Block { stmts } => stmts,
            _ => std::slice::from_ref(self),
        }
    }

    pub fn as_if(&self) -> Option<(&Node, &Node, Option<&Node>)> {
        match &self.kind {
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => Some((cond, then_branch, else_branch.as_deref())),
            _ => None,
        }
    }

    pub fn as_method_call(&self) -> Option<(&Node, &str, &[Node])> {
        match &self.kind {
            NodeKind::MethodCall {
                receiver,
                method,
                args,
            } => Some((receiver, method, args)),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Name { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn as_bool_literal(&self) -> Option<bool> {
        match &self.kind {
            NodeKind::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// The boolean literal returned by `stmt`, when it is a plain
    /// `return true;` / `return false;`.
    pub fn as_returned_bool(&self) -> Option<bool> {
        match &self.kind {
            NodeKind::Return { value: Some(value) } => value.strip_parens().as_bool_literal(),
            _ => None,
        }
    }

    /// The expression of an expression statement, parens stripped.
    pub fn as_stmt_expr(&self) -> Option<&Node> {
        match &self.kind {
            NodeKind::ExprStmt { expr } => Some(expr.strip_parens()),
            _ => None,
        }
    }

    /// `(name, value)` of a simple-assignment statement `name = value;`.
    pub fn as_assignment(&self) -> Option<(&Node, &Node)> {
        let expr = self.as_stmt_expr()?;
        match &expr.kind {
            NodeKind::Assign { target, value } => Some((target.strip_parens(), value)),
            _ => None,
        }
    }

    /// `(ty, name, binding, init)` of a single-fragment declaration.
    pub fn as_var_decl(&self) -> Option<(&str, &str, Option<BindingId>, Option<&Node>)> {
        match &self.kind {
            NodeKind::VarDecl {
                ty,
                name,
                binding,
                init,
            } => Some((ty, name, *binding, init.as_deref())),
            _ => None,
        }
    }

    pub fn is_unlabeled_break(&self) -> bool {
        matches!(&self.kind, NodeKind::Break { label: None })
    }

    /// True for node kinds that occupy statement position.
    pub fn is_statement(&self) -> bool {
        matches!(
            &self.kind,
            NodeKind::Block { .. }
                | NodeKind::ForEach { .. }
                | NodeKind::For { .. }
                | NodeKind::If { .. }
                | NodeKind::Return { .. }
                | NodeKind::Break { .. }
                | NodeKind::VarDecl { .. }
                | NodeKind::ExprStmt { .. }
        )
    }
}

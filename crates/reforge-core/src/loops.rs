// Loop-shape analysis for classic three-part `for` statements: recognizes
// the two container-walking idioms (index counting up to `c.size()`, and an
// explicit `c.iterator()` with `hasNext()`), exposing the container and the
// loop's own induction or iterator variable. Anything else is conservatively
// not a container walk.

use crate::ast::{BinaryOp, Node, NodeKind, UnaryOp};

/// How a recognized loop steps through its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationKind {
    /// `for (int i = 0; i < c.size(); i++)`
    Index,
    /// `for (Iterator<T> it = c.iterator(); it.hasNext();)`
    Iterator,
}

/// The decomposed parts of a recognized container-walking loop. All
/// references borrow from the inspected tree.
#[derive(Debug)]
pub struct ForLoopContent<'t> {
    pub kind: IterationKind,
    /// The collection expression being walked.
    pub container: &'t Node,
    /// The induction variable (`i`) or iterator variable (`it`) as the name
    /// node declared in the loop's initializer.
    pub loop_var: &'t Node,
}

/// Decompose a classic `for` statement into a [`ForLoopContent`], or `None`
/// when its shape is not one of the two recognized container walks.
pub fn iterate_over_container(for_stmt: &Node) -> Option<ForLoopContent<'_>> {
    let NodeKind::For {
        init, cond, update, ..
    } = &for_stmt.kind
    else {
        return None;
    };
    let init = init.as_deref()?;
    let cond = cond.as_deref()?.strip_parens();
    let (_, _, decl_binding, decl_init) = init.as_var_decl()?;
    let decl_binding = decl_binding?;
    let decl_init = decl_init?.strip_parens();

    // Index walk: `int i = 0; i < c.size(); i++`
    if let NodeKind::Int(0) = decl_init.kind {
        let NodeKind::Binary {
            op: BinaryOp::Lt,
            left,
            right,
        } = &cond.kind
        else {
            return None;
        };
        let left = left.strip_parens();
        let (container, method, args) = right.strip_parens().as_method_call()?;
        if method != "size" || !args.is_empty() {
            return None;
        }
        if binding_of(left) != Some(decl_binding) {
            return None;
        }
        // The update must step the same variable by one.
        let update = update.as_deref()?.strip_parens();
        let NodeKind::Unary {
            op: UnaryOp::PostIncrement,
            operand,
        } = &update.kind
        else {
            return None;
        };
        if binding_of(operand.strip_parens()) != Some(decl_binding) {
            return None;
        }
        return Some(ForLoopContent {
            kind: IterationKind::Index,
            container: container.strip_parens(),
            loop_var: left,
        });
    }

    // Iterator walk: `Iterator<T> it = c.iterator(); it.hasNext();`
    if let Some((container, "iterator", [])) = decl_init.as_method_call() {
        let (cond_recv, method, args) = cond.as_method_call()?;
        if method != "hasNext" || !args.is_empty() {
            return None;
        }
        let cond_recv = cond_recv.strip_parens();
        if binding_of(cond_recv) != Some(decl_binding) {
            return None;
        }
        // A mutating update clause would break the one-element-per-test
        // correspondence.
        if update.is_some() {
            return None;
        }
        return Some(ForLoopContent {
            kind: IterationKind::Iterator,
            container: container.strip_parens(),
            loop_var: cond_recv,
        });
    }

    None
}

/// Conservative collection-typedness test for a loop's container: a simple
/// name whose declared-type hint is a known collection interface or class.
/// Unknown shapes decline; the engine trades recall for precision.
pub fn is_collection_typed(expr: &Node) -> bool {
    match &expr.strip_parens().kind {
        NodeKind::Name { ty: Some(ty), .. } => {
            let base = ty.split('<').next().unwrap_or(ty).trim();
            matches!(
                base,
                "Collection"
                    | "List"
                    | "ArrayList"
                    | "LinkedList"
                    | "Set"
                    | "HashSet"
                    | "LinkedHashSet"
                    | "TreeSet"
                    | "Queue"
                    | "Deque"
                    | "ArrayDeque"
                    | "Vector"
            )
        }
        _ => false,
    }
}

fn binding_of(node: &Node) -> Option<crate::ast::BindingId> {
    match &node.kind {
        NodeKind::Name { binding, .. } => *binding,
        _ => None,
    }
}

// Source text generation for replacement fragments.
// A node that came from the parser renders as its original source slice, so
// moved and cloned subtrees are preserved byte-for-byte; only synthesized
// nodes render from structure.

use super::*;

/// Trait for types that can generate their source text, given the original
/// source of the unit they (or their moved children) were parsed from.
pub trait ToSource {
    fn to_source(&self, source: &str) -> String;
}

impl ToSource for Node {
    fn to_source(&self, source: &str) -> String {
        render(self, source, 0)
    }
}

fn render(node: &Node, source: &str, indent: usize) -> String {
    if let Some(span) = node.span {
        return source[span.start..span.end].to_string();
    }
    match &node.kind {
        NodeKind::Block { stmts } => {
            let mut out = String::from("{\n");
            for stmt in stmts {
                out.push_str(&indent_lines(&render(stmt, source, indent + 1), indent + 1));
                out.push('\n');
            }
            out.push_str(&"    ".repeat(indent));
            out.push('}');
            out
        }
        NodeKind::ForEach {
            var,
            iterable,
            body,
        } => format!(
            "for ({} {} : {}) {}",
            var.ty,
            var.name,
            render(iterable, source, indent),
            render(body, source, indent)
        ),
        NodeKind::For {
            init,
            cond,
            update,
            body,
        } => {
            let init = init
                .as_deref()
                .map(|n| render_for_clause(n, source))
                .unwrap_or_default();
            let cond = cond
                .as_deref()
                .map(|n| render(n, source, indent))
                .unwrap_or_default();
            let update = update
                .as_deref()
                .map(|n| render_for_clause(n, source))
                .unwrap_or_default();
            format!(
                "for ({init}; {cond}; {update}) {}",
                render(body, source, indent)
            )
        }
        NodeKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let mut out = format!(
                "if ({}) {}",
                render(cond, source, indent),
                render_branch(then_branch, source, indent)
            );
            if let Some(else_branch) = else_branch {
                out.push_str(" else ");
                out.push_str(&render_branch(else_branch, source, indent));
            }
            out
        }
        NodeKind::Return { value } => match value {
            Some(value) => format!("return {};", render(value, source, indent)),
            None => "return;".to_string(),
        },
        NodeKind::Break { label } => match label {
            Some(label) => format!("break {label};"),
            None => "break;".to_string(),
        },
        NodeKind::VarDecl { ty, name, init, .. } => match init {
            Some(init) => format!("{ty} {name} = {};", render(init, source, indent)),
            None => format!("{ty} {name};"),
        },
        NodeKind::ExprStmt { expr } => format!("{};", render(expr, source, indent)),
        NodeKind::Assign { target, value } => format!(
            "{} = {}",
            render(target, source, indent),
            render(value, source, indent)
        ),
        NodeKind::MethodCall {
            receiver,
            method,
            args,
        } => {
            let args = args
                .iter()
                .map(|a| render(a, source, indent))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}.{method}({args})", render(receiver, source, indent))
        }
        NodeKind::Name { name, .. } => name.clone(),
        NodeKind::Bool(value) => value.to_string(),
        NodeKind::Int(value) => value.to_string(),
        NodeKind::Str(value) => format!("\"{value}\""),
        NodeKind::Unary { op, operand } => {
            let operand_text = render(operand, source, indent);
            match op {
                UnaryOp::Not => format!("!{}", maybe_paren(operand, operand_text)),
                UnaryOp::PostIncrement => format!("{operand_text}++"),
            }
        }
        NodeKind::Binary { op, left, right } => format!(
            "{} {} {}",
            render(left, source, indent),
            op.as_str(),
            render(right, source, indent)
        ),
        NodeKind::Paren { inner } => format!("({})", render(inner, source, indent)),
    }
}

/// Render an `if`/`else` branch, wrapping a bare statement in braces.
fn render_branch(branch: &Node, source: &str, indent: usize) -> String {
    match &branch.kind {
        NodeKind::Block { .. } => render(branch, source, indent),
        _ => {
            let mut out = String::from("{\n");
            out.push_str(&indent_lines(&render(branch, source, indent + 1), indent + 1));
            out.push('\n');
            out.push_str(&"    ".repeat(indent));
            out.push('}');
            out
        }
    }
}

/// For-clause statements render without their trailing semicolon.
fn render_for_clause(node: &Node, source: &str) -> String {
    let text = render(node, source, 0);
    text.trim_end_matches(';').trim_end().to_string()
}

/// Low-precedence operands need parentheses under `!`.
fn maybe_paren(operand: &Node, text: String) -> String {
    match &operand.strip_parens().kind {
        NodeKind::Binary { .. } | NodeKind::Assign { .. } => format!("({text})"),
        _ => text,
    }
}

fn indent_lines(text: &str, indent: usize) -> String {
    let pad = "    ".repeat(indent);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                line.to_string()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

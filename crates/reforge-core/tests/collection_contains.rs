/*!
# Collection.contains() Rule Integration Tests

End-to-end runs of the engine over hand-built trees paired with their
source text, checking the exact rewritten output for each loop shape the
rule recognizes, and that near-miss shapes are left byte-identical.
*/

use proptest::prelude::*;

use reforge_core::ast::{BinaryOp, BindingId, Node, NodeKind, Span, UnaryOp, VarBinding};
use reforge_core::edits::Edit;
use reforge_core::engine::{Engine, NodeCx, RefactoringContext, SourceUnit};
use reforge_core::rules::{RefactorRule, RuleRegistry, RuleResult, TraversalSignal};

const NAMES: BindingId = BindingId(1);
const LOOP_VAR: BindingId = BindingId(2);
const TARGET: BindingId = BindingId(3);
const FLAG: BindingId = BindingId(4);
const INDEX: BindingId = BindingId(5);

/// Span of `inner` located via a unique surrounding `context`.
fn span_in(src: &str, context: &str, inner: &str) -> Span {
    let base = src
        .find(context)
        .unwrap_or_else(|| panic!("context {context:?} not in fixture"));
    let off = context.find(inner).unwrap();
    Span::new(base + off, base + off + inner.len())
}

/// Span from the start of `start_pat` through the end of the first
/// `end_pat` after it.
fn span_to(src: &str, start_pat: &str, end_pat: &str) -> Span {
    let start = src
        .find(start_pat)
        .unwrap_or_else(|| panic!("start {start_pat:?} not in fixture"));
    let end = start + src[start..].find(end_pat).unwrap() + end_pat.len();
    Span::new(start, end)
}

/// Span of a block whose opening brace ends `open_context`.
fn block_span(src: &str, open_context: &str, end_pat: &str) -> Span {
    let open = src
        .find(open_context)
        .unwrap_or_else(|| panic!("context {open_context:?} not in fixture"))
        + open_context.len()
        - 1;
    let end = open + src[open..].find(end_pat).unwrap() + end_pat.len();
    Span::new(open, end)
}

fn name(src: &str, context: &str, inner: &str, binding: BindingId) -> Node {
    Node::new(
        NodeKind::Name {
            name: inner.to_string(),
            binding: Some(binding),
            ty: None,
        },
        span_in(src, context, inner),
    )
}

fn collection(src: &str, context: &str, inner: &str) -> Node {
    Node::new(
        NodeKind::Name {
            name: inner.to_string(),
            binding: Some(NAMES),
            ty: Some("List<String>".to_string()),
        },
        span_in(src, context, inner),
    )
}

fn return_bool(src: &str, literal: &str) -> Node {
    let stmt_text = format!("return {literal};");
    let value = Node::new(NodeKind::Bool(literal == "true"), span_in(src, &stmt_text, literal));
    Node::new(
        NodeKind::Return {
            value: Some(Box::new(value)),
        },
        span_in(src, &stmt_text, &stmt_text),
    )
}

fn flag_assign(src: &str, stmt_text: &str) -> Node {
    let name_txt = stmt_text.split(" = ").next().unwrap();
    let value = stmt_text.contains("true");
    let lit_txt = if value { "true" } else { "false" };
    let target = Node::new(
        NodeKind::Name {
            name: name_txt.to_string(),
            binding: Some(FLAG),
            ty: None,
        },
        span_in(src, stmt_text, name_txt),
    );
    let lit = Node::new(NodeKind::Bool(value), span_in(src, stmt_text, lit_txt));
    let assign = Node::new(
        NodeKind::Assign {
            target: Box::new(target),
            value: Box::new(lit),
        },
        span_in(src, stmt_text, stmt_text.trim_end_matches(';')),
    );
    Node::new(
        NodeKind::ExprStmt {
            expr: Box::new(assign),
        },
        span_in(src, stmt_text, stmt_text),
    )
}

fn flag_decl(src: &str, stmt_text: &str) -> Node {
    let value = stmt_text.contains("true");
    let lit_txt = if value { "true" } else { "false" };
    let init = Node::new(NodeKind::Bool(value), span_in(src, stmt_text, lit_txt));
    Node::new(
        NodeKind::VarDecl {
            ty: "boolean".to_string(),
            name: "found".to_string(),
            binding: Some(FLAG),
            init: Some(Box::new(init)),
        },
        span_in(src, stmt_text, stmt_text),
    )
}

fn break_stmt(src: &str) -> Node {
    Node::new(NodeKind::Break { label: None }, span_in(src, "break;", "break;"))
}

/// `name.equals(target)` as it appears in the standard fixtures.
fn equals_call(src: &str) -> Node {
    let receiver = name(src, "name.equals", "name", LOOP_VAR);
    let argument = name(src, "equals(target)", "target", TARGET);
    Node::new(
        NodeKind::MethodCall {
            receiver: Box::new(receiver),
            method: "equals".to_string(),
            args: vec![argument],
        },
        span_in(src, "name.equals(target)", "name.equals(target)"),
    )
}

/// `names.contains(target)` as it appears in already-rewritten fixtures.
fn contains_call(src: &str) -> Node {
    Node::new(
        NodeKind::MethodCall {
            receiver: Box::new(collection(src, "names.contains", "names")),
            method: "contains".to_string(),
            args: vec![name(src, "contains(target)", "target", TARGET)],
        },
        span_in(src, "names.contains(target)", "names.contains(target)"),
    )
}

fn search_if(src: &str, then_stmts: Vec<Node>) -> Node {
    search_if_with_cond(src, equals_call(src), then_stmts, None)
}

fn search_if_with_cond(
    src: &str,
    cond: Node,
    then_stmts: Vec<Node>,
    else_branch: Option<Node>,
) -> Node {
    let then_block = Node::new(
        NodeKind::Block { stmts: then_stmts },
        block_span(src, ")) {", "    }"),
    );
    Node::new(
        NodeKind::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_block),
            else_branch: else_branch.map(Box::new),
        },
        span_to(src, "if (", "    }"),
    )
}

fn foreach_loop(src: &str, body_stmts: Vec<Node>) -> Node {
    foreach_loop_over(src, collection(src, ": names)", "names"), body_stmts)
}

fn foreach_loop_over(src: &str, iterable: Node, body_stmts: Vec<Node>) -> Node {
    let var = VarBinding {
        ty: "String".to_string(),
        name: "name".to_string(),
        binding: Some(LOOP_VAR),
    };
    let body = Node::new(
        NodeKind::Block { stmts: body_stmts },
        block_span(src, ") {", "\n}"),
    );
    Node::new(
        NodeKind::ForEach {
            var,
            iterable: Box::new(iterable),
            body: Box::new(body),
        },
        span_to(src, "for (", "\n}"),
    )
}

fn root(src: &str, stmts: Vec<Node>) -> Node {
    Node::new(NodeKind::Block { stmts }, Span::new(0, src.len()))
}

fn run(src: &str, tree: &Node) -> reforge_core::engine::UnitOutcome {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    Engine::new(RuleRegistry::new()).refactor_unit(tree, src)
}

const RULE: &str = "Collection.contains() rather than loop";

/// Scenario-1 shape parameterized by identifier spellings, shared with the
/// property test below.
fn return_fold_fixture(c: &str, v: &str, t: &str) -> (String, Node) {
    let src = format!(
        "for (String {v} : {c}) {{\n    if ({v}.equals({t})) {{\n        return true;\n    }}\n}}\nreturn false;\n"
    );
    let iterable = Node::new(
        NodeKind::Name {
            name: c.to_string(),
            binding: Some(NAMES),
            ty: Some("List<String>".to_string()),
        },
        span_in(&src, &format!(": {c})"), c),
    );
    let receiver = Node::new(
        NodeKind::Name {
            name: v.to_string(),
            binding: Some(LOOP_VAR),
            ty: None,
        },
        span_in(&src, &format!("{v}.equals"), v),
    );
    let argument = Node::new(
        NodeKind::Name {
            name: t.to_string(),
            binding: Some(TARGET),
            ty: None,
        },
        span_in(&src, &format!("equals({t})"), t),
    );
    let cond_txt = format!("{v}.equals({t})");
    let cond = Node::new(
        NodeKind::MethodCall {
            receiver: Box::new(receiver),
            method: "equals".to_string(),
            args: vec![argument],
        },
        span_in(&src, &cond_txt, &cond_txt),
    );
    let if_stmt = search_if_with_cond(&src, cond, vec![return_bool(&src, "true")], None);
    let var = VarBinding {
        ty: "String".to_string(),
        name: v.to_string(),
        binding: Some(LOOP_VAR),
    };
    let body = Node::new(
        NodeKind::Block {
            stmts: vec![if_stmt],
        },
        block_span(&src, ") {", "\n}"),
    );
    let foreach = Node::new(
        NodeKind::ForEach {
            var,
            iterable: Box::new(iterable),
            body: Box::new(body),
        },
        span_to(&src, "for (", "\n}"),
    );
    let tree = root(&src, vec![foreach, return_bool(&src, "false")]);
    (src, tree)
}

#[test]
fn foreach_return_fold_positive() {
    let (src, tree) = return_fold_fixture("names", "name", "target");
    let outcome = run(&src, &tree);

    assert!(outcome.changed);
    assert_eq!(outcome.text, "return names.contains(target);\n");
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(outcome.rule_stats[RULE].transformations, 1);
}

#[test]
fn foreach_return_fold_negative() {
    // `return false` inside the loop, `return true` after it: the folded
    // check takes the inner literal's sign.
    let src = "for (String name : names) {\n    if (name.equals(target)) {\n        return false;\n    }\n}\nreturn true;\n";
    let foreach = foreach_loop(src, vec![search_if(src, vec![return_bool(src, "false")])]);
    let tree = root(src, vec![foreach, return_bool(src, "true")]);

    let outcome = run(src, &tree);

    assert!(outcome.changed);
    assert_eq!(outcome.text, "return !names.contains(target);\n");
}

#[test]
fn flag_fusion_with_preceding_declaration() {
    let src = "boolean found = false;\nfor (String name : names) {\n    if (name.equals(target)) {\n        found = true;\n        break;\n    }\n}\n";
    let foreach = foreach_loop(
        src,
        vec![search_if(
            src,
            vec![flag_assign(src, "found = true;"), break_stmt(src)],
        )],
    );
    let tree = root(src, vec![flag_decl(src, "boolean found = false;"), foreach]);

    let outcome = run(src, &tree);

    assert!(outcome.changed);
    assert_eq!(outcome.text, "boolean found = names.contains(target);\n");
    assert_eq!(outcome.rule_stats[RULE].transformations, 1);
}

#[test]
fn flag_fusion_without_break() {
    // The loop keeps running after the hit; the result is still the same
    // flag value, so the fusion applies to the break-less shape too.
    let src = "boolean found = false;\nfor (String name : names) {\n    if (name.equals(target)) {\n        found = true;\n    }\n}\n";
    let foreach = foreach_loop(
        src,
        vec![search_if(src, vec![flag_assign(src, "found = true;")])],
    );
    let tree = root(src, vec![flag_decl(src, "boolean found = false;"), foreach]);

    let outcome = run(src, &tree);

    assert!(outcome.changed);
    assert_eq!(outcome.text, "boolean found = names.contains(target);\n");
}

#[test]
fn flag_fusion_with_preceding_assignment() {
    let src = "found = false;\nfor (String name : names) {\n    if (name.equals(target)) {\n        found = true;\n        break;\n    }\n}\n";
    let foreach = foreach_loop(
        src,
        vec![search_if(
            src,
            vec![flag_assign(src, "found = true;"), break_stmt(src)],
        )],
    );
    let tree = root(src, vec![flag_assign(src, "found = false;"), foreach]);

    let outcome = run(src, &tree);

    assert!(outcome.changed);
    assert_eq!(outcome.text, "found = names.contains(target);\n");
}

#[test]
fn flag_fusion_with_inverted_literals() {
    let src = "boolean found = true;\nfor (String name : names) {\n    if (name.equals(target)) {\n        found = false;\n        break;\n    }\n}\n";
    let foreach = foreach_loop(
        src,
        vec![search_if(
            src,
            vec![flag_assign(src, "found = false;"), break_stmt(src)],
        )],
    );
    let tree = root(src, vec![flag_decl(src, "boolean found = true;"), foreach]);

    let outcome = run(src, &tree);

    assert!(outcome.changed);
    assert_eq!(outcome.text, "boolean found = !names.contains(target);\n");
}

#[test]
fn flag_fusion_across_enclosing_block_keeps_initializer() {
    // The initializer is outside the loop's own statement list: the loop
    // collapses to an assignment and the initializer stays where it is.
    let src = "found = false;\nif (ready) {\n    for (String name : names) {\n        if (name.equals(target)) {\n            found = true;\n        }\n    }\n}\n";
    let receiver = name(src, "name.equals", "name", LOOP_VAR);
    let argument = name(src, "equals(target)", "target", TARGET);
    let cond = Node::new(
        NodeKind::MethodCall {
            receiver: Box::new(receiver),
            method: "equals".to_string(),
            args: vec![argument],
        },
        span_in(src, "name.equals(target)", "name.equals(target)"),
    );
    let then_block = Node::new(
        NodeKind::Block {
            stmts: vec![flag_assign(src, "found = true;")],
        },
        block_span(src, "(target)) {", "        }"),
    );
    let inner_if = Node::new(
        NodeKind::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_block),
            else_branch: None,
        },
        span_to(src, "if (name", "        }"),
    );
    let loop_body = Node::new(
        NodeKind::Block {
            stmts: vec![inner_if],
        },
        block_span(src, "names) {", "\n    }"),
    );
    let foreach = Node::new(
        NodeKind::ForEach {
            var: VarBinding {
                ty: "String".to_string(),
                name: "name".to_string(),
                binding: Some(LOOP_VAR),
            },
            iterable: Box::new(collection(src, ": names)", "names")),
            body: Box::new(loop_body),
        },
        span_to(src, "for (", "\n    }"),
    );
    let outer_then = Node::new(
        NodeKind::Block {
            stmts: vec![foreach],
        },
        block_span(src, "(ready) {", "\n}"),
    );
    let outer_if = Node::new(
        NodeKind::If {
            cond: Box::new(name(src, "(ready)", "ready", BindingId(9))),
            then_branch: Box::new(outer_then),
            else_branch: None,
        },
        span_to(src, "if (ready", "\n}"),
    );
    let tree = root(src, vec![flag_assign(src, "found = false;"), outer_if]);

    let outcome = run(src, &tree);

    assert!(outcome.changed);
    assert_eq!(
        outcome.text,
        "found = false;\nif (ready) {\n    found = names.contains(target);\n}\n"
    );
}

#[test]
fn guarded_statements_fall_back_to_if() {
    let src = "for (String name : names) {\n    if (name.equals(target)) {\n        sink.accept(name);\n        count++;\n        break;\n    }\n}\n";
    let accept = Node::new(
        NodeKind::ExprStmt {
            expr: Box::new(Node::new(
                NodeKind::MethodCall {
                    receiver: Box::new(name(src, "sink.accept", "sink", BindingId(7))),
                    method: "accept".to_string(),
                    args: vec![name(src, "accept(name)", "name", LOOP_VAR)],
                },
                span_in(src, "sink.accept(name)", "sink.accept(name)"),
            )),
        },
        span_in(src, "sink.accept(name);", "sink.accept(name);"),
    );
    let increment = Node::new(
        NodeKind::ExprStmt {
            expr: Box::new(Node::new(
                NodeKind::Unary {
                    op: UnaryOp::PostIncrement,
                    operand: Box::new(name(src, "count++", "count", BindingId(8))),
                },
                span_in(src, "count++", "count++"),
            )),
        },
        span_in(src, "count++;", "count++;"),
    );
    let foreach = foreach_loop(
        src,
        vec![search_if(src, vec![accept, increment, break_stmt(src)])],
    );
    let tree = root(src, vec![foreach]);

    let outcome = run(src, &tree);

    assert!(outcome.changed);
    assert_eq!(
        outcome.text,
        "if (names.contains(target)) {\n    sink.accept(name);\n    count++;\n}\n"
    );
}

#[test]
fn indexed_loop_return_fold() {
    let src = "for (int i = 0; i < names.size(); i++) {\n    if (names.get(i).equals(target)) {\n        return true;\n    }\n}\nreturn false;\n";
    let init = Node::new(
        NodeKind::VarDecl {
            ty: "int".to_string(),
            name: "i".to_string(),
            binding: Some(INDEX),
            init: Some(Box::new(Node::new(
                NodeKind::Int(0),
                span_in(src, "= 0;", "0"),
            ))),
        },
        span_in(src, "int i = 0", "int i = 0"),
    );
    let size_call = Node::new(
        NodeKind::MethodCall {
            receiver: Box::new(collection(src, "names.size()", "names")),
            method: "size".to_string(),
            args: vec![],
        },
        span_in(src, "names.size()", "names.size()"),
    );
    let cond = Node::new(
        NodeKind::Binary {
            op: BinaryOp::Lt,
            left: Box::new(name(src, "; i <", "i", INDEX)),
            right: Box::new(size_call),
        },
        span_in(src, "i < names.size()", "i < names.size()"),
    );
    let update = Node::new(
        NodeKind::Unary {
            op: UnaryOp::PostIncrement,
            operand: Box::new(name(src, "i++", "i", INDEX)),
        },
        span_in(src, "i++", "i++"),
    );
    let get_call = Node::new(
        NodeKind::MethodCall {
            receiver: Box::new(collection(src, "names.get(i)", "names")),
            method: "get".to_string(),
            args: vec![name(src, "get(i)", "i", INDEX)],
        },
        span_in(src, "names.get(i)", "names.get(i)"),
    );
    let equals = Node::new(
        NodeKind::MethodCall {
            receiver: Box::new(get_call),
            method: "equals".to_string(),
            args: vec![name(src, "equals(target)", "target", TARGET)],
        },
        span_in(src, "names.get(i).equals(target)", "names.get(i).equals(target)"),
    );
    let if_stmt = search_if_with_cond(src, equals, vec![return_bool(src, "true")], None);
    let body = Node::new(
        NodeKind::Block {
            stmts: vec![if_stmt],
        },
        block_span(src, ") {", "\n}"),
    );
    let for_stmt = Node::new(
        NodeKind::For {
            init: Some(Box::new(init)),
            cond: Some(Box::new(cond)),
            update: Some(Box::new(update)),
            body: Box::new(body),
        },
        span_to(src, "for (", "\n}"),
    );
    let tree = root(src, vec![for_stmt, return_bool(src, "false")]);

    let outcome = run(src, &tree);

    assert!(outcome.changed);
    assert_eq!(outcome.text, "return names.contains(target);\n");
}

#[test]
fn iterator_loop_with_element_local() {
    let src = "for (Iterator<String> it = names.iterator(); it.hasNext();) {\n    String name = it.next();\n    if (name.equals(target)) {\n        return true;\n    }\n}\nreturn false;\n";
    const IT: BindingId = BindingId(6);
    let iterator_call = Node::new(
        NodeKind::MethodCall {
            receiver: Box::new(collection(src, "names.iterator()", "names")),
            method: "iterator".to_string(),
            args: vec![],
        },
        span_in(src, "names.iterator()", "names.iterator()"),
    );
    let init = Node::new(
        NodeKind::VarDecl {
            ty: "Iterator<String>".to_string(),
            name: "it".to_string(),
            binding: Some(IT),
            init: Some(Box::new(iterator_call)),
        },
        span_in(src, "Iterator<String> it = names.iterator()", "Iterator<String> it = names.iterator()"),
    );
    let cond = Node::new(
        NodeKind::MethodCall {
            receiver: Box::new(name(src, "it.hasNext", "it", IT)),
            method: "hasNext".to_string(),
            args: vec![],
        },
        span_in(src, "it.hasNext()", "it.hasNext()"),
    );
    let next_call = Node::new(
        NodeKind::MethodCall {
            receiver: Box::new(name(src, "it.next", "it", IT)),
            method: "next".to_string(),
            args: vec![],
        },
        span_in(src, "it.next()", "it.next()"),
    );
    let element_decl = Node::new(
        NodeKind::VarDecl {
            ty: "String".to_string(),
            name: "name".to_string(),
            binding: Some(LOOP_VAR),
            init: Some(Box::new(next_call)),
        },
        span_in(src, "String name = it.next();", "String name = it.next();"),
    );
    let if_stmt = search_if(src, vec![return_bool(src, "true")]);
    let body = Node::new(
        NodeKind::Block {
            stmts: vec![element_decl, if_stmt],
        },
        block_span(src, ";) {", "\n}"),
    );
    let for_stmt = Node::new(
        NodeKind::For {
            init: Some(Box::new(init)),
            cond: Some(Box::new(cond)),
            update: None,
            body: Box::new(body),
        },
        span_to(src, "for (", "\n}"),
    );
    let tree = root(src, vec![for_stmt, return_bool(src, "false")]);

    let outcome = run(src, &tree);

    assert!(outcome.changed);
    assert_eq!(outcome.text, "return names.contains(target);\n");
}

#[test]
fn else_branch_declines() {
    let src = "for (String name : names) {\n    if (name.equals(target)) {\n        return true;\n    } else {\n        log();\n    }\n}\nreturn false;\n";
    let log_call = Node::new(
        NodeKind::ExprStmt {
            expr: Box::new(Node::new(
                NodeKind::MethodCall {
                    receiver: Box::new(name(src, "log()", "log", BindingId(9))),
                    method: "run".to_string(),
                    args: vec![],
                },
                span_in(src, "log()", "log()"),
            )),
        },
        span_in(src, "log();", "log();"),
    );
    let else_block = Node::new(
        NodeKind::Block {
            stmts: vec![log_call],
        },
        block_span(src, "else {", "    }"),
    );
    let if_stmt = search_if_with_cond(
        src,
        equals_call(src),
        vec![return_bool(src, "true")],
        Some(else_block),
    );
    let foreach = foreach_loop(src, vec![if_stmt]);
    let tree = root(src, vec![foreach, return_bool(src, "false")]);

    let outcome = run(src, &tree);

    assert!(!outcome.changed);
    assert_eq!(outcome.text, src);
    assert_eq!(outcome.rule_stats[RULE].transformations, 0);
}

#[test]
fn equality_must_involve_the_loop_element() {
    // Both operands of equals() are fixed expressions; the loop is not a
    // membership test.
    let src = "for (String name : names) {\n    if (left.equals(target)) {\n        return true;\n    }\n}\nreturn false;\n";
    let cond = Node::new(
        NodeKind::MethodCall {
            receiver: Box::new(name(src, "left.equals", "left", BindingId(9))),
            method: "equals".to_string(),
            args: vec![name(src, "equals(target)", "target", TARGET)],
        },
        span_in(src, "left.equals(target)", "left.equals(target)"),
    );
    let if_stmt = search_if_with_cond(src, cond, vec![return_bool(src, "true")], None);
    let foreach = foreach_loop(src, vec![if_stmt]);
    let tree = root(src, vec![foreach, return_bool(src, "false")]);

    let outcome = run(src, &tree);

    assert!(!outcome.changed);
    assert_eq!(outcome.text, src);
}

#[test]
fn non_collection_container_declines() {
    let src = "for (String name : names) {\n    if (name.equals(target)) {\n        return true;\n    }\n}\nreturn false;\n";
    // No declared-type hint on the iterable: conservatively not a
    // collection.
    let untyped = name(src, ": names)", "names", NAMES);
    let foreach = foreach_loop_over(src, untyped, vec![search_if(src, vec![return_bool(src, "true")])]);
    let tree = root(src, vec![foreach, return_bool(src, "false")]);

    let outcome = run(src, &tree);

    assert!(!outcome.changed);
    assert_eq!(outcome.text, src);
}

#[test]
fn matching_literals_decline() {
    // `return true` both inside and after the loop is not a fold the rule
    // understands.
    let src = "for (String name : names) {\n    if (name.equals(target)) {\n        return true;\n    }\n}\nreturn true;\n";
    let foreach = foreach_loop(src, vec![search_if(src, vec![return_bool(src, "true")])]);
    // Both return statements share the literal text; locate the trailing
    // one past the loop body.
    let tail_start = src.rfind("return true;").unwrap();
    let tail_value = Node::new(
        NodeKind::Bool(true),
        Span::new(tail_start + "return ".len(), tail_start + "return true".len()),
    );
    let trailing = Node::new(
        NodeKind::Return {
            value: Some(Box::new(tail_value)),
        },
        Span::new(tail_start, tail_start + "return true;".len()),
    );
    let tree = root(src, vec![foreach, trailing]);

    let outcome = run(src, &tree);

    assert!(!outcome.changed);
    assert_eq!(outcome.text, src);
}

#[test]
fn rewritten_output_is_stable() {
    let src = "return names.contains(target);\n";
    let tree = root(
        src,
        vec![Node::new(
            NodeKind::Return {
                value: Some(Box::new(contains_call(src))),
            },
            Span::new(0, src.len() - 1),
        )],
    );

    let outcome = run(src, &tree);

    assert!(!outcome.changed);
    assert_eq!(outcome.text, src);
    assert_eq!(outcome.rule_stats[RULE].transformations, 0);
}

#[test]
fn fused_flag_output_is_stable() {
    // A second pass over the flag-fusion result leaves it alone.
    let src = "boolean found = names.contains(target);\n";
    let decl = Node::new(
        NodeKind::VarDecl {
            ty: "boolean".to_string(),
            name: "found".to_string(),
            binding: Some(FLAG),
            init: Some(Box::new(contains_call(src))),
        },
        Span::new(0, src.len() - 1),
    );
    let tree = root(src, vec![decl]);

    let outcome = run(src, &tree);

    assert!(!outcome.changed);
    assert_eq!(outcome.text, src);
    assert_eq!(outcome.rule_stats[RULE].transformations, 0);
}

#[test]
fn guarded_if_output_is_stable() {
    // A second pass over the if-fallback result leaves it alone.
    let src = "if (names.contains(target)) {\n    sink.accept(name);\n    count++;\n}\n";
    let sink = Node::new(
        NodeKind::Name {
            name: "sink".to_string(),
            binding: None,
            ty: None,
        },
        span_in(src, "sink.accept", "sink"),
    );
    let accept_call = Node::new(
        NodeKind::MethodCall {
            receiver: Box::new(sink),
            method: "accept".to_string(),
            args: vec![name(src, "accept(name)", "name", LOOP_VAR)],
        },
        span_in(src, "sink.accept(name)", "sink.accept(name)"),
    );
    let accept = Node::new(
        NodeKind::ExprStmt {
            expr: Box::new(accept_call),
        },
        span_in(src, "sink.accept(name);", "sink.accept(name);"),
    );
    let counter = Node::new(
        NodeKind::Name {
            name: "count".to_string(),
            binding: None,
            ty: None,
        },
        span_in(src, "count++", "count"),
    );
    let bump = Node::new(
        NodeKind::ExprStmt {
            expr: Box::new(Node::new(
                NodeKind::Unary {
                    op: UnaryOp::PostIncrement,
                    operand: Box::new(counter),
                },
                span_in(src, "count++;", "count++"),
            )),
        },
        span_in(src, "count++;", "count++;"),
    );
    let then_block = Node::new(
        NodeKind::Block {
            stmts: vec![accept, bump],
        },
        block_span(src, ")) {", "\n}"),
    );
    let guard = Node::new(
        NodeKind::If {
            cond: Box::new(contains_call(src)),
            then_branch: Box::new(then_block),
            else_branch: None,
        },
        span_to(src, "if (", "\n}"),
    );
    let tree = root(src, vec![guard]);

    let outcome = run(src, &tree);

    assert!(!outcome.changed);
    assert_eq!(outcome.text, src);
    assert_eq!(outcome.rule_stats[RULE].transformations, 0);
}

#[test]
fn conflicting_edits_surface_as_diagnostics() {
    // A rule that replaces a statement and then one of its subexpressions:
    // the second edit overlaps the first, so it comes back as a conflict
    // diagnostic while the first still lands.
    struct EagerRewriter;

    impl RefactorRule for EagerRewriter {
        fn name(&self) -> &'static str {
            "eager-rewriter"
        }

        fn description(&self) -> &'static str {
            "rewrites statements and their subexpressions without skipping"
        }

        fn visit_stmt(&self, stmt: &Node, _cx: &NodeCx, rcx: &mut RefactoringContext) -> RuleResult {
            if let (Some(span), NodeKind::ExprStmt { .. }) = (stmt.span, &stmt.kind) {
                rcx.schedule(Edit::replace(span, "done();"))?;
            }
            Ok(TraversalSignal::Descend)
        }

        fn visit_expr(&self, expr: &Node, _cx: &NodeCx, rcx: &mut RefactoringContext) -> RuleResult {
            if let (Some(span), NodeKind::Name { .. }) = (expr.span, &expr.kind) {
                rcx.schedule(Edit::replace(span, "x"))?;
            }
            Ok(TraversalSignal::Descend)
        }
    }

    let src = "flag;\n";
    let flag = Node::new(
        NodeKind::Name {
            name: "flag".to_string(),
            binding: None,
            ty: None,
        },
        span_in(src, "flag;", "flag"),
    );
    let stmt = Node::new(
        NodeKind::ExprStmt {
            expr: Box::new(flag),
        },
        span_in(src, "flag;", "flag;"),
    );
    let tree = root(src, vec![stmt]);

    let mut registry = RuleRegistry::empty();
    registry.register(Box::new(EagerRewriter));
    let outcome = Engine::new(registry).refactor_unit(&tree, src);

    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].rule, "eager-rewriter");
    assert!(outcome.diagnostics[0].message.contains("overlaps"));
    // The statement-level replacement was scheduled first and still commits.
    assert!(outcome.changed);
    assert_eq!(outcome.text, "done();\n");
    assert_eq!(outcome.rule_stats["eager-rewriter"].errors, 1);
}

#[test]
fn run_summary_serializes_for_the_host() -> anyhow::Result<()> {
    let (src, tree) = return_fold_fixture("names", "name", "target");
    let units = vec![SourceUnit {
        name: "Sample.java".to_string(),
        root: tree,
        source: src,
    }];
    let engine = Engine::new(RuleRegistry::new());

    let (outcomes, summary) = engine.refactor_all(&units);

    assert!(outcomes[0].changed);
    assert_eq!(summary.units_processed, 1);
    assert_eq!(summary.units_changed, 1);
    assert!(summary.success());
    let json = serde_json::to_string_pretty(&summary)?;
    assert!(json.contains("\"units_changed\": 1"));
    assert!(json.contains(RULE));
    Ok(())
}

fn ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{1,7}".prop_map(String::from)
}

proptest! {
    /// The return fold is exact for any identifier spellings: the whole
    /// program collapses to a single containment return.
    #[test]
    fn return_fold_is_spelling_independent(
        (c, v, t) in (ident(), ident(), ident())
            .prop_filter("identifiers must be distinct", |(c, v, t)| {
                c != v && v != t && c != t
            })
    ) {
        let (src, tree) = return_fold_fixture(&c, &v, &t);
        let outcome = run(&src, &tree);
        prop_assert!(outcome.changed);
        prop_assert_eq!(outcome.text, format!("return {c}.contains({t});\n"));
    }
}

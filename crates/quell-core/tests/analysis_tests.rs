//! End-to-end analysis scenarios.
//!
//! Each test builds a small program the way the parser would and runs the
//! full pipeline through `analyze`, checking which findings come out the
//! other side.

use quell_core::ast::build::*;
use quell_core::ast::{BinaryOp, Module, Stmt, StmtKind, Span, UnaryOp};
use quell_core::{AnalyzerConfig, analyze};

fn run(stmts: Vec<Stmt>) -> Vec<u16> {
    let module = Module::new(stmts);
    analyze(&module, &AnalyzerConfig::default(), None, &[])
        .iter()
        .map(|d| d.id)
        .collect()
}

fn in_function(params: &[&str], body: Vec<Stmt>) -> Vec<Stmt> {
    vec![func("scenario", params, block(body))]
}

#[test]
fn null_check_then_branch_flags_the_dereference() {
    // function scenario(x) { if (x == null) { x.frob() } }
    let ids = run(in_function(
        &["x"],
        vec![if_stmt(
            binary(BinaryOp::Eq, ident("x"), null()),
            block(vec![expr_stmt(call(field(ident("x"), "frob"), vec![]))]),
        )],
    ));
    assert!(ids.contains(&201), "{ids:?}");
}

#[test]
fn de_morgan_narrowing_covers_both_operands() {
    // if (!(x == null || y == null)) { x.a; y.b }
    let cond = unary(
        UnaryOp::Not,
        binary(
            BinaryOp::Or,
            binary(BinaryOp::Eq, ident("x"), null()),
            binary(BinaryOp::Eq, ident("y"), null()),
        ),
    );
    let ids = run(in_function(
        &["x", "y"],
        vec![if_stmt(
            cond,
            block(vec![
                expr_stmt(field(ident("x"), "a")),
                expr_stmt(field(ident("y"), "b")),
            ]),
        )],
    ));
    assert!(!ids.contains(&201), "{ids:?}");
}

#[test]
fn typeof_test_narrows_to_non_null() {
    // if (typeof x == "table") { x.a }
    let cond = binary(
        BinaryOp::Eq,
        unary(UnaryOp::TypeOf, ident("x")),
        string("table"),
    );
    let ids = run(in_function(
        &["x"],
        vec![if_stmt(cond, block(vec![expr_stmt(field(ident("x"), "a"))]))],
    ));
    assert!(!ids.contains(&201), "{ids:?}");
}

#[test]
fn coalesce_comparison_narrows_the_receiver() {
    // if ((x ?? 0) > 3) { x.a }
    let cond = binary(
        BinaryOp::Gt,
        binary(BinaryOp::NullCoalesce, ident("x"), int(0)),
        int(3),
    );
    let ids = run(in_function(
        &["x"],
        vec![if_stmt(cond, block(vec![expr_stmt(field(ident("x"), "a"))]))],
    ));
    assert!(!ids.contains(&201), "{ids:?}");
}

#[test]
fn short_circuit_right_side_sees_the_left_guard() {
    // x != null && x.flag — the field access is only reached when x exists.
    let ids = run(in_function(
        &["x"],
        vec![expr_stmt(binary(
            BinaryOp::And,
            binary(BinaryOp::Ne, ident("x"), null()),
            field(ident("x"), "flag"),
        ))],
    ));
    assert!(!ids.contains(&201), "{ids:?}");
}

#[test]
fn early_return_guard_protects_the_rest_of_the_body() {
    // if (x == null) return; local n = x.count; return n
    let ids = run(in_function(
        &["x"],
        vec![
            if_stmt(binary(BinaryOp::Eq, ident("x"), null()), ret(None)),
            local("n", field(ident("x"), "count")),
            ret(Some(ident("n"))),
        ],
    ));
    assert!(!ids.contains(&201), "{ids:?}");
}

#[test]
fn assignment_in_one_branch_only_is_partial() {
    let ids = run(in_function(
        &["flag"],
        vec![
            local_uninit("result"),
            if_stmt(
                ident("flag"),
                expr_stmt(assign(ident("result"), int(1))),
            ),
            ret(Some(ident("result"))),
        ],
    ));
    assert!(ids.contains(&202), "{ids:?}");
}

#[test]
fn assignment_in_every_branch_is_complete() {
    let ids = run(in_function(
        &["flag"],
        vec![
            local_uninit("result"),
            if_else(
                ident("flag"),
                expr_stmt(assign(ident("result"), int(1))),
                expr_stmt(assign(ident("result"), int(2))),
            ),
            ret(Some(ident("result"))),
        ],
    ));
    assert!(!ids.contains(&202), "{ids:?}");
}

#[test]
fn call_with_known_effects_keeps_unrelated_narrowing() {
    // noop() writes nothing, so x stays provably non-null across the call
    // and the coalesce afterwards is flagged as constant.
    let ids = run(vec![
        local("x", int(5)),
        func("noop", &[], block(vec![ret(None)])),
        expr_stmt(call(ident("noop"), vec![])),
        expr_stmt(binary(BinaryOp::NullCoalesce, ident("x"), int(0))),
    ]);
    assert!(ids.contains(&217), "{ids:?}");
}

#[test]
fn call_that_writes_the_variable_drops_its_narrowing() {
    let ids = run(vec![
        local("x", int(5)),
        func(
            "reset",
            &[],
            block(vec![expr_stmt(assign(ident("x"), null()))]),
        ),
        expr_stmt(call(ident("reset"), vec![])),
        expr_stmt(binary(BinaryOp::NullCoalesce, ident("x"), int(0))),
        expr_stmt(ident("x")),
    ]);
    assert!(!ids.contains(&217), "{ids:?}");
}

#[test]
fn file_wide_suppression_silences_everywhere() {
    let source = "// -file:w203\nlocal unused = 1\n";
    let module = Module::new(vec![local("unused", int(1))]);
    let diags = analyze(&module, &AnalyzerConfig::default(), Some(source), &[]);
    assert!(diags.iter().all(|d| d.id != 203), "{diags:?}");
}

#[test]
fn config_word_lists_flow_through_the_pipeline() {
    let text = "forbidden_functions = dofile\nrequire_functions = include\n";
    let result = AnalyzerConfig::from_text(text).unwrap();
    let module = Module::new(vec![
        expr_stmt(call(ident("dofile"), vec![string("a.qs")])),
        expr_stmt(call(ident("include"), vec![string("lib")])),
        expr_stmt(call(ident("include"), vec![string("lib")])),
    ]);
    let ids: Vec<u16> = analyze(&module, &result.config, None, &[])
        .iter()
        .map(|d| d.id)
        .collect();
    assert!(ids.contains(&214), "{ids:?}");
    assert!(ids.contains(&213), "{ids:?}");
}

#[test]
fn diagnostics_serialize_for_tooling_hosts() {
    let module = Module::new(vec![
        stmt_at(local("x", at(int(1), 1)), 1),
        expr_stmt(at(assign(ident("x"), ident("x")), 2)),
        expr_stmt(ident("x")),
    ]);
    let diags = analyze(&module, &AnalyzerConfig::default(), None, &[]);
    let found = diags.iter().find(|d| d.id == 206).expect("self-assignment");

    let json = serde_json::to_value(found).unwrap();
    assert_eq!(json["id"], 206);
    assert_eq!(json["text_id"], "self-assignment");
    assert_eq!(json["severity"], "warning");
    assert_eq!(json["line"], 2);
    // No secondary location on this finding, so the field is omitted.
    assert!(json.get("see_also").is_none());
}

#[test]
fn see_also_serializes_when_present() {
    let module = Module::new(vec![
        func_at("a", &["v"], block(vec![ret(Some(ident("v")))]), 1),
        func_at("b", &["v"], block(vec![ret(Some(ident("v")))]), 5),
    ]);
    let diags = analyze(&module, &AnalyzerConfig::default(), None, &[]);
    let found = diags.iter().find(|d| d.id == 211).expect("duplicate function");
    assert_eq!(found.see_also, Some(Span::new(1, 1, 1)));

    let json = serde_json::to_value(found).unwrap();
    assert_eq!(json["see_also"]["line"], 1);
}

#[test]
fn mixed_program_reports_in_source_order() {
    let module = Module::new(vec![
        stmt_at(local("x", at(null(), 1)), 1),
        stmt_at(expr_stmt(at(field(at(ident("x"), 3), "a"), 3)), 3),
        stmt_at(expr_stmt(at(binary(BinaryOp::Sub, ident("y"), ident("y")), 7)), 7),
        stmt_at(local("y", at(int(2), 5)), 5),
    ]);
    let diags = analyze(&module, &AnalyzerConfig::default(), None, &[]);
    let lines: Vec<u32> = diags.iter().map(|d| d.line).collect();
    let mut sorted = lines.clone();
    sorted.sort_unstable();
    assert_eq!(lines, sorted, "{diags:?}");
}

#[test]
fn externals_behave_like_ambient_globals() {
    let module = Module::new(vec![
        expr_stmt(call(field(ident("console"), "log"), vec![string("hi")])),
    ]);
    let diags = analyze(
        &module,
        &AnalyzerConfig::default(),
        None,
        &["console".to_string()],
    );
    assert!(diags.is_empty(), "{diags:?}");
}

#[test]
fn counting_loop_comes_out_clean() {
    // local total = 0; for (local i = 0; i < n; i = i + 1) { total = total + i }
    let ids = run(in_function(
        &["n"],
        vec![
            local("total", int(0)),
            for_loop(
                Some(local("i", int(0))),
                Some(binary(BinaryOp::Lt, ident("i"), ident("n"))),
                Some(assign(ident("i"), binary(BinaryOp::Add, ident("i"), int(1)))),
                block(vec![expr_stmt(assign(
                    ident("total"),
                    binary(BinaryOp::Add, ident("total"), ident("i")),
                ))]),
            ),
            ret(Some(ident("total"))),
        ],
    ));
    assert!(ids.is_empty(), "{ids:?}");
}

#[test]
fn retry_loop_falls_through_its_guard() {
    // do { continue } while (ready); done() stays reachable.
    let ids = run(vec![
        local_uninit("ready"),
        do_while(
            block(vec![Stmt::new(StmtKind::Continue, Span::dummy())]),
            ident("ready"),
        ),
        expr_stmt(call(ident("done"), vec![])),
    ]);
    assert!(!ids.contains(&205), "{ids:?}");
}

#[test]
fn loop_heavy_program_reports_each_finding_once() {
    // while (items != null) { foreach (item in items) { item.total } }
    let stmts = in_function(
        &["items"],
        vec![while_loop(
            binary(BinaryOp::Ne, ident("items"), null()),
            block(vec![foreach(
                "item",
                ident("items"),
                expr_stmt(field(ident("item"), "total")),
            )]),
        )],
    );
    let ids = run(stmts);
    assert!(ids.is_empty(), "{ids:?}");
}

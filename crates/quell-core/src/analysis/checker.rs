//! The flow-sensitive checker.
//!
//! One [`CheckerVisitor`] walks a module's statement tree exactly once,
//! carrying a [`VarScope`] chain that models what is known about every
//! reachable name at the current program point. Control-flow constructs fork
//! the chain, run each path on its own copy, and reconcile the copies when
//! the paths rejoin. Loop bodies run twice: a muted effects-gathering pass
//! smears the body's assignments into the entry state, then a precise pass
//! reports diagnostics against the smeared state.

use std::collections::HashMap;
use std::mem;
use std::slice;

use regex::Regex;
use tracing::debug;

use crate::analysis::compare::{NodeComplexityComputer, NodeDiffComputer, NodeEqualChecker};
use crate::analysis::effects::FunctionEffects;
use crate::analysis::scope::VarScope;
use crate::analysis::speculate::{Speculator, path_key};
use crate::analysis::symbols::{
    FLAG_CAN_BE_NULL, SymbolKind, SymbolTable, ValueRef, ValueState,
};
use crate::ast::{
    AssignOp, BinaryOp, DeclKind, Expr, ExprKind, FuncDecl, Literal, Module, Span, Stmt, StmtKind,
    SwitchCase, VarBinding,
};
use crate::config::AnalyzerConfig;
use crate::diagnostics::{DiagKind, Diagnostic, DiagnosticSink, Suppressions};

/// How far nullability and constant-folding queries chase `x -> expr`
/// alias chains before giving up.
const EVAL_CHASE_LIMIT: u32 = 8;

/// Analyze one module and return its sorted diagnostics. `source` enables
/// comment suppression directives; `externals` are host-injected globals.
pub fn analyze(
    module: &Module,
    config: &AnalyzerConfig,
    source: Option<&str>,
    externals: &[String],
) -> Vec<Diagnostic> {
    let suppressions = source.map_or_else(Suppressions::new, Suppressions::from_source);
    let mut checker = CheckerVisitor::new(config, suppressions);
    for name in externals {
        checker.declare_external(name);
    }
    checker.check_module(module);
    checker.finish()
}

/// Whether control can reach the statement after the one just visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Terminated,
}

/// Join point for `break` and `continue` targets. `exit` stays `None` until
/// the first break merges into it; `resume` collects the states of paths
/// that `continue` to the guard instead of leaving. `depth` is the scope
/// depth of the construct's entry, which jumping scopes are walked up to.
/// Switch records catch `break` only; `continue` skips past them to the
/// innermost loop.
struct Breakable<'a> {
    depth: u32,
    is_loop: bool,
    exit: Option<VarScope<'a>>,
    resume: Option<VarScope<'a>>,
}

pub struct CheckerVisitor<'a> {
    config: &'a AnalyzerConfig,
    symbols: SymbolTable,
    scope: VarScope<'a>,
    effects: FunctionEffects,
    /// Declaration spans of the functions currently being analyzed,
    /// outermost first.
    func_stack: Vec<Span>,
    breakables: Vec<Breakable<'a>>,
    sink: DiagnosticSink,
    /// Nesting level of speculative paths (branch arms, loop bodies,
    /// short-circuit right sides). Reassignment-before-read only fires when
    /// both assignments sit at the same level.
    branch_level: u32,
    eval_counter: u64,
    seen_requires: HashMap<String, Span>,
    bool_pattern: Option<Regex>,
}

impl<'a> CheckerVisitor<'a> {
    #[must_use]
    pub fn new(config: &'a AnalyzerConfig, suppressions: Suppressions) -> Self {
        Self {
            config,
            symbols: SymbolTable::new(),
            scope: VarScope::root(),
            effects: FunctionEffects::new(),
            func_stack: Vec::new(),
            breakables: Vec::new(),
            sink: DiagnosticSink::new(suppressions),
            branch_level: 0,
            eval_counter: 0,
            seen_requires: HashMap::new(),
            bool_pattern: config.boolean_name_pattern(),
        }
    }

    /// Bind a host-provided global. Externals are exempt from unused
    /// reporting and treated as non-null.
    pub fn declare_external(&mut self, name: &str) {
        let id = self
            .symbols
            .declare(name, SymbolKind::ExternalBinding, Span::dummy(), None, true);
        let mut vr = ValueRef::new(id, ValueState::Initialized);
        vr.set_flag_neg(FLAG_CAN_BE_NULL);
        self.scope.declare(name, vr);
    }

    pub fn check_module(&mut self, module: &'a Module) {
        debug!(statements = module.body.len(), "checking module");
        let _ = self.visit_stmts(&module.body);
    }

    pub fn finish(mut self) -> Vec<Diagnostic> {
        self.report_unused();
        debug!(diagnostics = self.sink.len(), "analysis finished");
        self.sink.into_diagnostics()
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    fn visit_stmts(&mut self, stmts: &'a [Stmt]) -> Flow {
        self.check_sibling_functions(stmts);

        let mut flow = Flow::Next;
        let mut reported = false;
        for stmt in stmts {
            if flow == Flow::Terminated
                && !reported
                && !matches!(stmt.kind, StmtKind::Function(_) | StmtKind::Empty)
            {
                self.sink.push(Diagnostic::new(
                    DiagKind::UnreachableCode,
                    stmt.span,
                    "unreachable code",
                ));
                reported = true;
            }
            if self.visit_stmt(stmt) == Flow::Terminated {
                flow = Flow::Terminated;
            }
        }
        flow
    }

    fn visit_stmt(&mut self, stmt: &'a Stmt) -> Flow {
        match &stmt.kind {
            StmtKind::Expr(e) => {
                self.visit_expr(e);
                Flow::Next
            }
            StmtKind::Block(body) => {
                let owner = self.scope.owner;
                let outer = mem::take(&mut self.scope);
                self.scope = VarScope::child(outer, owner);
                let flow = self.visit_stmts(body);
                let inner = mem::take(&mut self.scope);
                self.scope = inner.pop();
                flow
            }
            StmtKind::VarDecl { kind, bindings } => {
                self.visit_var_decl(*kind, bindings);
                Flow::Next
            }
            StmtKind::DestructureDecl { kind, names, init } => {
                self.visit_expr(init);
                let sym_kind = decl_symbol_kind(*kind);
                for (name, span) in names {
                    // Each name receives an unknown slice of the initializer.
                    let id = self.symbols.declare(
                        name,
                        sym_kind,
                        *span,
                        self.scope.owner,
                        self.sink.is_muted(),
                    );
                    self.scope.declare(name, ValueRef::new(id, ValueState::Unknown));
                }
                Flow::Next
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.visit_if(cond, then_branch, else_branch.as_deref(), true),
            StmtKind::While { cond, body } => self.visit_while(cond, body),
            StmtKind::DoWhile { body, cond } => self.visit_do_while(body, cond),
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => self.visit_for(init.as_deref(), cond.as_deref(), step.as_deref(), body),
            StmtKind::Foreach {
                index,
                value,
                container,
                body,
            } => self.visit_foreach(index.as_ref(), value, container, body),
            StmtKind::Switch {
                subject,
                cases,
                default_body,
            } => self.visit_switch(subject, cases, default_body.as_deref()),
            StmtKind::TryCatch {
                body,
                exc_name,
                handler,
            } => self.visit_try_catch(body, exc_name, handler),
            StmtKind::Throw(e) => {
                self.visit_expr(e);
                Flow::Terminated
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.visit_expr(value);
                }
                Flow::Terminated
            }
            StmtKind::Yield(value) => {
                if let Some(value) = value {
                    self.visit_expr(value);
                }
                Flow::Next
            }
            StmtKind::Break => {
                self.record_break();
                Flow::Terminated
            }
            StmtKind::Continue => {
                // Control transfers to the loop guard, not out of the loop.
                self.record_continue();
                Flow::Terminated
            }
            StmtKind::Function(decl) => {
                if let Some(name) = &decl.name {
                    let id = self.symbols.declare(
                        name,
                        SymbolKind::Function,
                        decl.span,
                        self.scope.owner,
                        self.sink.is_muted(),
                    );
                    let mut vr = ValueRef::new(id, ValueState::Initialized);
                    vr.set_flag_neg(FLAG_CAN_BE_NULL);
                    self.scope.declare(name, vr);
                }
                self.analyze_function(decl);
                Flow::Next
            }
            StmtKind::Class {
                name,
                name_span,
                members,
            } => {
                let id = self.symbols.declare(
                    name,
                    SymbolKind::Class,
                    *name_span,
                    self.scope.owner,
                    self.sink.is_muted(),
                );
                let mut vr = ValueRef::new(id, ValueState::Initialized);
                vr.set_flag_neg(FLAG_CAN_BE_NULL);
                self.scope.declare(name, vr);
                for member in members {
                    self.visit_expr(&member.value);
                }
                Flow::Next
            }
            StmtKind::Enum {
                name, name_span, ..
            } => {
                let id = self.symbols.declare(
                    name,
                    SymbolKind::Enum,
                    *name_span,
                    self.scope.owner,
                    self.sink.is_muted(),
                );
                let mut vr = ValueRef::new(id, ValueState::Initialized);
                vr.set_flag_neg(FLAG_CAN_BE_NULL);
                self.scope.declare(name, vr);
                Flow::Next
            }
            StmtKind::Import { name, name_span } => {
                let id = self.symbols.declare(
                    name,
                    SymbolKind::Import,
                    *name_span,
                    self.scope.owner,
                    self.sink.is_muted(),
                );
                let mut vr = ValueRef::new(id, ValueState::Initialized);
                vr.set_flag_neg(FLAG_CAN_BE_NULL);
                self.scope.declare(name, vr);
                Flow::Next
            }
            StmtKind::Empty => Flow::Next,
        }
    }

    fn visit_var_decl(&mut self, kind: DeclKind, bindings: &'a [VarBinding]) {
        let sym_kind = decl_symbol_kind(kind);
        for binding in bindings {
            match &binding.init {
                Some(init) => {
                    self.visit_expr(init);
                    let id = self.symbols.declare(
                        &binding.name,
                        sym_kind,
                        binding.span,
                        self.scope.owner,
                        self.sink.is_muted(),
                    );
                    let mut vr = ValueRef::new(id, ValueState::Expression);
                    vr.expr = Some(init);
                    match self.expr_nullability(init) {
                        Some(true) => vr.set_flag_pos(FLAG_CAN_BE_NULL),
                        Some(false) => vr.set_flag_neg(FLAG_CAN_BE_NULL),
                        None => {}
                    }
                    vr.assigned = true;
                    vr.assign_depth = self.branch_level;
                    vr.assign_span = binding.span;
                    vr.eval_index = self.next_eval_index();
                    self.symbols.get(id).used_after_assign.set(false);
                    self.scope.declare(&binding.name, vr);
                }
                None => {
                    // `local x;` — reads see the implicit null until an
                    // assignment lands.
                    let id = self.symbols.declare(
                        &binding.name,
                        sym_kind,
                        binding.span,
                        self.scope.owner,
                        self.sink.is_muted(),
                    );
                    let mut vr = ValueRef::new(id, ValueState::Undefined);
                    vr.set_flag_pos(FLAG_CAN_BE_NULL);
                    self.scope.declare(&binding.name, vr);
                }
            }
        }
    }

    fn visit_if(
        &mut self,
        cond: &'a Expr,
        then_branch: &'a Stmt,
        else_branch: Option<&'a Stmt>,
        chain_head: bool,
    ) -> Flow {
        self.visit_expr(cond);
        self.check_constant_condition(cond);
        if chain_head {
            self.check_chain_conditions(cond, else_branch);
        }
        if let Some(else_stmt) = else_branch {
            if NodeEqualChecker::stmt_equal(then_branch, else_stmt) {
                self.sink.push(
                    Diagnostic::new(
                        DiagKind::DuplicateIfBranches,
                        then_branch.span,
                        "then and else branches are identical",
                    )
                    .with_see_also(else_stmt.span),
                );
            }
        }

        let trunk = mem::take(&mut self.scope);
        let mut then_scope = trunk.copy(false, &self.symbols);
        let mut else_scope = trunk.copy(false, &self.symbols);
        Speculator::new(&mut self.symbols).apply(
            cond,
            Some(&mut then_scope),
            Some(&mut else_scope),
        );

        self.branch_level += 1;
        self.scope = then_scope;
        let then_flow = self.visit_stmt(then_branch);
        let then_scope = mem::replace(&mut self.scope, else_scope);
        let else_flow = match else_branch {
            Some(stmt) => match &stmt.kind {
                // An else-if is part of this chain, not a fresh chain head.
                StmtKind::If {
                    cond,
                    then_branch,
                    else_branch,
                } => self.visit_if(cond, then_branch, else_branch.as_deref(), false),
                _ => self.visit_stmt(stmt),
            },
            None => Flow::Next,
        };
        let else_scope = mem::take(&mut self.scope);
        self.branch_level -= 1;

        match (then_flow, else_flow) {
            (Flow::Next, Flow::Next) => {
                let mut joined = then_scope;
                joined.merge(&else_scope, &self.symbols);
                self.scope = joined;
                Flow::Next
            }
            (Flow::Next, Flow::Terminated) => {
                self.scope = then_scope;
                Flow::Next
            }
            (Flow::Terminated, Flow::Next) => {
                self.scope = else_scope;
                Flow::Next
            }
            (Flow::Terminated, Flow::Terminated) => {
                self.scope = trunk;
                Flow::Terminated
            }
        }
    }

    fn visit_while(&mut self, cond: &'a Expr, body: &'a Stmt) -> Flow {
        self.effects_pass(|ck| {
            ck.visit_expr(cond);
            let _ = ck.visit_stmt(body);
        });

        self.visit_expr(cond);
        // `while (true)` is the idiomatic infinite loop, not a mistake.
        if !matches!(cond.kind, ExprKind::Literal(Literal::Bool(true))) {
            self.check_constant_condition(cond);
        }
        self.check_loop_condition_reuse(cond, body);

        let trunk = mem::take(&mut self.scope);
        let depth = trunk.depth;
        let mut body_scope = trunk.copy(false, &self.symbols);
        let mut exit_scope = trunk;
        Speculator::new(&mut self.symbols).apply(
            cond,
            Some(&mut body_scope),
            Some(&mut exit_scope),
        );

        self.breakables.push(Breakable {
            depth,
            is_loop: true,
            exit: None,
            resume: None,
        });
        self.scope = body_scope;
        self.branch_level += 1;
        let _ = self.visit_stmt(body);
        self.branch_level -= 1;
        let record = self.breakables.pop().expect("loop record");

        if let Some(broke) = record.exit {
            exit_scope.merge(&broke, &self.symbols);
        }
        self.scope = exit_scope;
        Flow::Next
    }

    fn visit_do_while(&mut self, body: &'a Stmt, cond: &'a Expr) -> Flow {
        self.effects_pass(|ck| {
            let _ = ck.visit_stmt(body);
            ck.visit_expr(cond);
        });

        let trunk = mem::take(&mut self.scope);
        let depth = trunk.depth;
        self.breakables.push(Breakable {
            depth,
            is_loop: true,
            exit: None,
            resume: None,
        });

        // The first iteration runs unconditionally.
        self.scope = trunk;
        self.branch_level += 1;
        let mut flow = self.visit_stmt(body);
        self.branch_level -= 1;
        let record = self.breakables.pop().expect("loop record");

        // `continue` re-enters the guard, so those paths count as reaching
        // it alongside a body that falls off the end.
        match record.resume {
            Some(resumed) if flow == Flow::Next => {
                self.scope.merge(&resumed, &self.symbols);
            }
            Some(resumed) => {
                self.scope = resumed;
                flow = Flow::Next;
            }
            None => {}
        }
        if flow == Flow::Next {
            self.visit_expr(cond);
        }

        let mut exit = record.exit;
        if flow == Flow::Next {
            // The loop is left through a false guard.
            let mut after = mem::take(&mut self.scope);
            Speculator::new(&mut self.symbols).apply(cond, None, Some(&mut after));
            exit = match exit {
                Some(mut e) => {
                    e.merge(&after, &self.symbols);
                    Some(e)
                }
                None => Some(after),
            };
        }
        match exit {
            Some(scope) => {
                self.scope = scope;
                Flow::Next
            }
            // The body never falls through, breaks, or continues.
            None => Flow::Terminated,
        }
    }

    fn visit_for(
        &mut self,
        init: Option<&'a Stmt>,
        cond: Option<&'a Expr>,
        step: Option<&'a Expr>,
        body: &'a Stmt,
    ) -> Flow {
        // The init clause scopes to the loop.
        let owner = self.scope.owner;
        let outer = mem::take(&mut self.scope);
        self.scope = VarScope::child(outer, owner);
        if let Some(init) = init {
            let _ = self.visit_stmt(init);
        }

        self.effects_pass(|ck| {
            if let Some(cond) = cond {
                ck.visit_expr(cond);
            }
            let _ = ck.visit_stmt(body);
            if let Some(step) = step {
                ck.visit_expr(step);
            }
        });

        if let Some(cond) = cond {
            self.visit_expr(cond);
            if !matches!(cond.kind, ExprKind::Literal(Literal::Bool(true))) {
                self.check_constant_condition(cond);
            }
            self.check_loop_condition_reuse(cond, body);
        }

        let trunk = mem::take(&mut self.scope);
        let depth = trunk.depth;
        let mut body_scope = trunk.copy(false, &self.symbols);
        let mut exit_scope = trunk;
        if let Some(cond) = cond {
            Speculator::new(&mut self.symbols).apply(
                cond,
                Some(&mut body_scope),
                Some(&mut exit_scope),
            );
        }

        self.breakables.push(Breakable {
            depth,
            is_loop: true,
            exit: None,
            resume: None,
        });
        self.scope = body_scope;
        self.branch_level += 1;
        let flow = self.visit_stmt(body);
        if flow == Flow::Next {
            if let Some(step) = step {
                self.visit_expr(step);
            }
        }
        self.branch_level -= 1;
        let record = self.breakables.pop().expect("loop record");

        if let Some(broke) = record.exit {
            exit_scope.merge(&broke, &self.symbols);
        }
        self.scope = exit_scope;

        let inner = mem::take(&mut self.scope);
        self.scope = inner.pop();
        Flow::Next
    }

    fn visit_foreach(
        &mut self,
        index: Option<&'a (String, Span)>,
        value: &'a (String, Span),
        container: &'a Expr,
        body: &'a Stmt,
    ) -> Flow {
        self.visit_expr(container);
        self.check_deref(container);

        self.effects_pass(|ck| ck.run_foreach_body(index, value, body));

        let trunk = mem::take(&mut self.scope);
        let depth = trunk.depth;
        let body_scope = trunk.copy(false, &self.symbols);
        self.breakables.push(Breakable {
            depth,
            is_loop: true,
            exit: None,
            resume: None,
        });
        self.scope = body_scope;
        self.branch_level += 1;
        self.run_foreach_body(index, value, body);
        self.branch_level -= 1;
        let record = self.breakables.pop().expect("loop record");

        // The container may be empty, so the entry state flows past.
        let mut exit = trunk;
        if let Some(broke) = record.exit {
            exit.merge(&broke, &self.symbols);
        }
        self.scope = exit;
        Flow::Next
    }

    fn run_foreach_body(
        &mut self,
        index: Option<&'a (String, Span)>,
        value: &'a (String, Span),
        body: &'a Stmt,
    ) {
        let owner = self.scope.owner;
        let outer = mem::take(&mut self.scope);
        self.scope = VarScope::child(outer, owner);

        if let Some((name, span)) = index {
            let id = self.symbols.declare(
                name,
                SymbolKind::ForeachVar,
                *span,
                owner,
                self.sink.is_muted(),
            );
            self.scope.declare(name, ValueRef::new(id, ValueState::Unknown));
        }
        let (name, span) = value;
        let id = self.symbols.declare(
            name,
            SymbolKind::ForeachVar,
            *span,
            owner,
            self.sink.is_muted(),
        );
        self.scope.declare(name, ValueRef::new(id, ValueState::Unknown));

        let _ = self.visit_stmt(body);
        let inner = mem::take(&mut self.scope);
        self.scope = inner.pop();
    }

    fn visit_switch(
        &mut self,
        subject: &'a Expr,
        cases: &'a [SwitchCase],
        default_body: Option<&'a [Stmt]>,
    ) -> Flow {
        self.visit_expr(subject);

        if !self.sink.is_muted() {
            for (i, first) in cases.iter().enumerate() {
                for second in &cases[i + 1..] {
                    if NodeEqualChecker::expr_equal(&first.value, &second.value) {
                        self.sink.push(
                            Diagnostic::new(
                                DiagKind::DuplicateCase,
                                second.value.span,
                                "case value duplicates an earlier case",
                            )
                            .with_see_also(first.value.span),
                        );
                    }
                }
            }
        }

        let trunk = mem::take(&mut self.scope);
        let depth = trunk.depth;
        self.breakables.push(Breakable {
            depth,
            is_loop: false,
            exit: None,
            resume: None,
        });

        self.branch_level += 1;
        for case in cases {
            self.scope = trunk.copy(false, &self.symbols);
            self.visit_expr(&case.value);
            if self.visit_stmts(&case.body) == Flow::Next {
                // Fell off the arm's end; state joins the exit like a break.
                self.record_break();
            }
        }
        if let Some(body) = default_body {
            self.scope = trunk.copy(false, &self.symbols);
            if self.visit_stmts(body) == Flow::Next {
                self.record_break();
            }
        }
        self.branch_level -= 1;

        let record = self.breakables.pop().expect("switch record");
        let mut exit = match record.exit {
            Some(scope) => scope,
            None => trunk.copy(false, &self.symbols),
        };
        if default_body.is_none() {
            // Without a default the subject may match no arm at all.
            exit.merge(&trunk, &self.symbols);
        }
        self.scope = exit;
        Flow::Next
    }

    fn visit_try_catch(
        &mut self,
        body: &'a Stmt,
        exc_name: &'a (String, Span),
        handler: &'a Stmt,
    ) -> Flow {
        let trunk = mem::take(&mut self.scope);
        let body_scope = trunk.copy(false, &self.symbols);
        let mut handler_base = trunk;

        self.branch_level += 1;
        self.scope = body_scope;
        let body_flow = self.visit_stmt(body);
        let body_scope = mem::take(&mut self.scope);

        // The exception may fire after any prefix of the body, so the
        // handler sees the join of "ran nothing" and "ran everything".
        handler_base.merge(&body_scope, &self.symbols);

        let owner = handler_base.owner;
        self.scope = VarScope::child(handler_base, owner);
        let (name, span) = exc_name;
        let id = self.symbols.declare(
            name,
            SymbolKind::Exception,
            *span,
            owner,
            self.sink.is_muted(),
        );
        self.scope.declare(name, ValueRef::new(id, ValueState::Unknown));
        let handler_flow = self.visit_stmt(handler);
        let inner = mem::take(&mut self.scope);
        let handler_scope = inner.pop();
        self.branch_level -= 1;

        match (body_flow, handler_flow) {
            (Flow::Next, Flow::Next) => {
                let mut joined = body_scope;
                joined.merge(&handler_scope, &self.symbols);
                self.scope = joined;
                Flow::Next
            }
            (Flow::Next, Flow::Terminated) => {
                self.scope = body_scope;
                Flow::Next
            }
            (Flow::Terminated, Flow::Next) => {
                self.scope = handler_scope;
                Flow::Next
            }
            (Flow::Terminated, Flow::Terminated) => {
                self.scope = handler_scope;
                Flow::Terminated
            }
        }
    }

    // -------------------------------------------------------------------------
    // Functions
    // -------------------------------------------------------------------------

    fn analyze_function(&mut self, decl: &'a FuncDecl) {
        {
            let info = self.effects.ensure(decl.span);
            info.name = decl.name.clone();
            info.params = decl.params.iter().map(|p| p.name.clone()).collect();
        }
        self.check_bool_prefix(decl);

        // Defaults evaluate in the enclosing scope at call time; visiting
        // them here is close enough for diagnostics.
        for param in &decl.params {
            if let Some(default) = &param.default {
                self.visit_expr(default);
            }
        }

        let outer = mem::take(&mut self.scope);
        let closure_base = outer.copy(true, &self.symbols);
        self.scope = VarScope::child(closure_base, Some(decl.span));
        self.func_stack.push(decl.span);
        let saved_level = mem::replace(&mut self.branch_level, 0);

        for param in &decl.params {
            let id = self.symbols.declare(
                &param.name,
                SymbolKind::Parameter,
                param.span,
                Some(decl.span),
                self.sink.is_muted(),
            );
            self.scope.declare(&param.name, ValueRef::new(id, ValueState::Unknown));
        }

        let _ = self.visit_stmt(&decl.body);

        self.branch_level = saved_level;
        self.func_stack.pop();
        self.scope = outer;

        if let Some(&parent) = self.func_stack.last() {
            self.effects.merge_up(decl.span, parent);
        }
    }

    fn check_bool_prefix(&mut self, decl: &'a FuncDecl) {
        let Some(name) = &decl.name else {
            return;
        };
        let Some(pattern) = &self.bool_pattern else {
            return;
        };
        if !pattern.is_match(name) {
            return;
        }
        let mut returns = Vec::new();
        collect_returns(&decl.body, &mut returns);
        for value in returns {
            let non_bool = matches!(
                value.kind,
                ExprKind::Literal(
                    Literal::Int(_) | Literal::Float(_) | Literal::Str(_) | Literal::Null
                )
            );
            if non_bool {
                self.sink.push(Diagnostic::new(
                    DiagKind::BoolPrefixMismatch,
                    value.span,
                    format!("'{name}' looks like a predicate but returns a non-boolean value"),
                ));
            }
        }
    }

    fn check_sibling_functions(&mut self, stmts: &'a [Stmt]) {
        if self.sink.is_muted() {
            return;
        }
        let funcs: Vec<&FuncDecl> = stmts
            .iter()
            .filter_map(|s| match &s.kind {
                StmtKind::Function(decl) => Some(decl),
                _ => None,
            })
            .collect();
        if funcs.len() < 2 {
            return;
        }

        let min_complexity = self.config.similar_min_complexity;
        let complexity_cap = min_complexity.saturating_mul(100).max(1024);
        for (i, first) in funcs.iter().enumerate() {
            for second in &funcs[i + 1..] {
                if NodeEqualChecker::func_equal(first, second) {
                    self.sink.push(
                        Diagnostic::new(
                            DiagKind::DuplicateFunction,
                            second.span,
                            format!(
                                "function duplicates '{}'",
                                first.name.as_deref().unwrap_or("<anonymous>")
                            ),
                        )
                        .with_see_also(first.span),
                    );
                    continue;
                }

                let ca = NodeComplexityComputer::func_complexity(first, complexity_cap);
                let cb = NodeComplexityComputer::func_complexity(second, complexity_cap);
                if ca < min_complexity || cb < min_complexity {
                    continue;
                }
                let budget = ca.min(cb) * self.config.similar_max_diff_percent / 100;
                if budget == 0 {
                    continue;
                }
                if NodeDiffComputer::diff_funcs(first, second, budget).is_some() {
                    self.sink.push(
                        Diagnostic::new(
                            DiagKind::SimilarFunction,
                            second.span,
                            format!(
                                "function is nearly identical to '{}'",
                                first.name.as_deref().unwrap_or("<anonymous>")
                            ),
                        )
                        .with_see_also(first.span),
                    );
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    fn visit_expr(&mut self, e: &'a Expr) {
        match &e.kind {
            ExprKind::Ident(name) => self.note_read(name, e.span),
            ExprKind::Literal(_) => {}
            ExprKind::Unary { operand, .. } => self.visit_expr(operand),
            ExprKind::Binary { op, lhs, rhs } => self.visit_binary(*op, lhs, rhs, e.span),
            ExprKind::Ternary {
                cond,
                then_value,
                else_value,
            } => self.visit_ternary(cond, then_value, else_value),
            ExprKind::Assign { op, target, value } => {
                self.visit_assign(*op, target, value, e.span);
            }
            ExprKind::IncrDecr { target, .. } => self.visit_incr_decr(target, e.span),
            ExprKind::Call {
                callee,
                args,
                nullable,
            } => self.visit_call(callee, args, *nullable, e.span),
            ExprKind::Field { obj, nullable, .. } => {
                self.visit_expr(obj);
                if !nullable {
                    self.check_deref(obj);
                }
            }
            ExprKind::Index {
                obj,
                index,
                nullable,
            } => {
                self.visit_expr(obj);
                self.visit_expr(index);
                if !nullable {
                    self.check_deref(obj);
                }
            }
            ExprKind::ArrayLit(items) => {
                for item in items {
                    self.visit_expr(item);
                }
            }
            ExprKind::TableLit(slots) => {
                for slot in slots {
                    self.visit_expr(&slot.value);
                }
            }
            ExprKind::ClassLit { parent, members } => {
                if let Some(parent) = parent {
                    self.visit_expr(parent);
                }
                for member in members {
                    self.visit_expr(&member.value);
                }
            }
            ExprKind::Lambda(decl) => self.analyze_function(decl),
        }
    }

    fn note_read(&mut self, name: &str, span: Span) {
        let Some(vr) = self.scope.find(name) else {
            return;
        };
        let state = vr.state;
        let id = vr.info;
        self.symbols.get(id).mark_used();
        if state == ValueState::Partially {
            self.sink.push(Diagnostic::new(
                DiagKind::PossiblyUninitialized,
                span,
                format!("'{name}' is not assigned on every path leading here"),
            ));
        }
    }

    fn visit_binary(&mut self, op: BinaryOp, lhs: &'a Expr, rhs: &'a Expr, span: Span) {
        if op.is_same_operand_suspicious()
            && NodeEqualChecker::expr_equal(lhs, rhs)
            && !(lhs.is_literal() && rhs.is_literal())
        {
            self.sink.push(Diagnostic::new(
                DiagKind::SameOperands,
                span,
                "left and right operands are identical",
            ));
        }

        match op {
            BinaryOp::And => self.visit_short_circuit(lhs, rhs, true),
            BinaryOp::Or => self.visit_short_circuit(lhs, rhs, false),
            BinaryOp::NullCoalesce => {
                self.visit_expr(lhs);
                if self.expr_nullability(lhs) == Some(false) {
                    self.sink.push(Diagnostic::new(
                        DiagKind::NullCoalesceConstant,
                        span,
                        "left side can never be null; `??` always takes it",
                    ));
                }
                // The right side runs only when the left was null.
                let trunk = mem::take(&mut self.scope);
                self.scope = trunk.copy(false, &self.symbols);
                self.branch_level += 1;
                self.visit_expr(rhs);
                self.branch_level -= 1;
                let branch = mem::replace(&mut self.scope, trunk);
                self.scope.merge(&branch, &self.symbols);
            }
            _ => {
                self.visit_expr(lhs);
                self.visit_expr(rhs);
            }
        }
    }

    fn visit_short_circuit(&mut self, lhs: &'a Expr, rhs: &'a Expr, is_and: bool) {
        self.visit_expr(lhs);

        let trunk = mem::take(&mut self.scope);
        let mut branch = trunk.copy(false, &self.symbols);
        {
            let mut spec = Speculator::new(&mut self.symbols);
            if is_and {
                spec.apply(lhs, Some(&mut branch), None);
            } else {
                spec.apply(lhs, None, Some(&mut branch));
            }
        }
        self.scope = branch;
        self.branch_level += 1;
        self.visit_expr(rhs);
        self.branch_level -= 1;
        let branch = mem::replace(&mut self.scope, trunk);
        self.scope.merge(&branch, &self.symbols);
    }

    fn visit_ternary(&mut self, cond: &'a Expr, then_value: &'a Expr, else_value: &'a Expr) {
        self.visit_expr(cond);
        self.check_constant_condition(cond);

        let trunk = mem::take(&mut self.scope);
        let mut then_scope = trunk.copy(false, &self.symbols);
        let mut else_scope = trunk;
        Speculator::new(&mut self.symbols).apply(
            cond,
            Some(&mut then_scope),
            Some(&mut else_scope),
        );

        self.branch_level += 1;
        self.scope = then_scope;
        self.visit_expr(then_value);
        let then_scope = mem::replace(&mut self.scope, else_scope);
        self.visit_expr(else_value);
        self.branch_level -= 1;
        self.scope.merge(&then_scope, &self.symbols);
    }

    fn visit_assign(&mut self, op: AssignOp, target: &'a Expr, value: &'a Expr, span: Span) {
        if op != AssignOp::Assign {
            // Compound assignment reads the target first.
            self.visit_expr(target);
        }
        self.visit_expr(value);

        if op == AssignOp::Assign && NodeEqualChecker::expr_equal(target, value) {
            self.sink.push(Diagnostic::new(
                DiagKind::SelfAssignment,
                span,
                "expression is assigned to itself",
            ));
        }

        match &target.kind {
            ExprKind::Ident(name) => self.assign_ident(name, op, Some(value), span),
            ExprKind::Field { .. } | ExprKind::Index { .. } => {
                self.assign_through(target, value);
            }
            _ => self.visit_expr(target),
        }
    }

    fn visit_incr_decr(&mut self, target: &'a Expr, span: Span) {
        self.visit_expr(target);
        if let ExprKind::Ident(name) = &target.kind {
            self.assign_ident(name, AssignOp::AddAssign, None, span);
        }
    }

    fn assign_ident(&mut self, name: &str, op: AssignOp, value: Option<&'a Expr>, span: Span) {
        let Some(vr) = self.scope.find(name) else {
            // Assignment to an undeclared name is the front end's problem.
            return;
        };
        let id = vr.info;
        let prev_assigned = vr.assigned;
        let prev_level = vr.assign_depth;
        let prev_span = vr.assign_span;
        let info = self.symbols.get(id);
        if info.kind.is_immutable() {
            return;
        }
        let owner = info.owner;

        // Writes to a captured outer variable are not a lost value; the
        // closure may run long after the previous assignment was read.
        let local_to_context = owner == self.func_stack.last().copied();
        if op == AssignOp::Assign
            && prev_assigned
            && local_to_context
            && !info.used_after_assign.get()
            && prev_level == self.branch_level
            && !info.speculative
        {
            self.sink.push(
                Diagnostic::new(
                    DiagKind::AssignedNeverUsed,
                    span,
                    format!("'{name}' is overwritten before its previous value is read"),
                )
                .with_see_also(prev_span),
            );
        }

        // Effect recording stays on during muted passes; it is their point.
        if let Some(&current) = self.func_stack.last() {
            if owner != Some(current) {
                self.effects.ensure(current).record_write(owner, name);
            }
        }

        let nullability = if op == AssignOp::Assign {
            value.and_then(|v| self.expr_nullability(v))
        } else {
            // Arithmetic compounds produce a number.
            Some(false)
        };
        let eval_index = self.next_eval_index();
        let level = self.branch_level;

        let vr = self
            .scope
            .find_mut(name)
            .expect("binding vanished mid-assignment");
        if op == AssignOp::Assign {
            vr.state = ValueState::Expression;
            vr.expr = value;
        } else {
            vr.state = ValueState::Initialized;
            vr.expr = None;
        }
        vr.flags_pos = 0;
        vr.flags_neg = 0;
        match nullability {
            Some(true) => vr.set_flag_pos(FLAG_CAN_BE_NULL),
            Some(false) => vr.set_flag_neg(FLAG_CAN_BE_NULL),
            None => {}
        }
        vr.assigned = true;
        vr.assign_depth = level;
        vr.assign_span = span;
        vr.eval_index = eval_index;
        self.symbols.get(id).used_after_assign.set(false);
        self.scope.purge_paths_with_base(name);
    }

    /// `x.f = v` / `x[k] = v`: write through an object. The targeted path
    /// fact is refreshed, anything derived from it is dropped, and the base
    /// name counts as a write for effect summaries.
    fn assign_through(&mut self, target: &'a Expr, value: &'a Expr) {
        match &target.kind {
            ExprKind::Field { obj, nullable, .. } => {
                self.visit_expr(obj);
                if !nullable {
                    self.check_deref(obj);
                }
            }
            ExprKind::Index {
                obj,
                index,
                nullable,
            } => {
                self.visit_expr(obj);
                self.visit_expr(index);
                if !nullable {
                    self.check_deref(obj);
                }
            }
            _ => unreachable!("assign_through called on a non-access target"),
        }

        if let Some(key) = path_key(target) {
            self.scope.purge_paths_with_base(&key);
            let nullability = self.expr_nullability(value);
            if let Some(vr) = self.scope.find_mut(&key) {
                vr.kill();
                vr.state = ValueState::Initialized;
                match nullability {
                    Some(true) => vr.set_flag_pos(FLAG_CAN_BE_NULL),
                    Some(false) => vr.set_flag_neg(FLAG_CAN_BE_NULL),
                    None => {}
                }
            } else if let Some(known) = nullability {
                self.declare_path_fact(&key, target.span, known);
            }
        }
        self.record_base_write(target);
    }

    fn declare_path_fact(&mut self, key: &str, span: Span, maybe_null: bool) {
        let id = self
            .symbols
            .declare(key, SymbolKind::Table, span, self.scope.owner, true);
        let mut vr = ValueRef::new(id, ValueState::Initialized);
        if maybe_null {
            vr.set_flag_pos(FLAG_CAN_BE_NULL);
        } else {
            vr.set_flag_neg(FLAG_CAN_BE_NULL);
        }
        self.scope.declare(key, vr);
    }

    /// Walk an access chain to its root identifier and record the write on
    /// the enclosing function's effect summary.
    fn record_base_write(&mut self, target: &'a Expr) {
        let mut e = target;
        loop {
            match &e.kind {
                ExprKind::Field { obj, .. } | ExprKind::Index { obj, .. } => e = obj,
                _ => break,
            }
        }
        let ExprKind::Ident(base) = &e.kind else {
            return;
        };
        let Some(vr) = self.scope.find(base) else {
            return;
        };
        let info = self.symbols.get(vr.info);
        info.mark_used();
        let owner = info.owner;
        if let Some(&current) = self.func_stack.last() {
            if owner != Some(current) {
                self.effects.ensure(current).record_write(owner, base);
            }
        }
    }

    fn visit_call(&mut self, callee: &'a Expr, args: &'a [Expr], _nullable: bool, span: Span) {
        match &callee.kind {
            ExprKind::Ident(name) => {
                self.note_read(name, callee.span);
                if self.config.is_forbidden_function(name) {
                    self.sink.push(Diagnostic::new(
                        DiagKind::ForbiddenFunction,
                        callee.span,
                        format!("call to forbidden function '{name}'"),
                    ));
                }
                if self.config.is_require_function(name) {
                    self.check_duplicate_require(args, span);
                }
            }
            ExprKind::Field { obj, nullable, .. } => {
                self.visit_expr(obj);
                if !nullable {
                    self.check_deref(obj);
                }
            }
            _ => self.visit_expr(callee),
        }

        for arg in args {
            self.visit_expr(arg);
        }

        if let ExprKind::Field { obj, name, .. } = &callee.kind {
            if self.config.is_mod_function(name) {
                self.mutate_receiver(obj);
            }
        }

        self.apply_call_effects(callee);
    }

    fn check_duplicate_require(&mut self, args: &'a [Expr], span: Span) {
        let Some(first) = args.first() else {
            return;
        };
        let ExprKind::Literal(Literal::Str(path)) = &first.kind else {
            return;
        };
        if self.sink.is_muted() {
            return;
        }
        if let Some(&prev) = self.seen_requires.get(path) {
            self.sink.push(
                Diagnostic::new(
                    DiagKind::DuplicateRequire,
                    span,
                    format!("'{path}' is already required"),
                )
                .with_see_also(prev),
            );
        } else {
            self.seen_requires.insert(path.clone(), span);
        }
    }

    /// A receiver-mutating method invalidates the tracked value of its
    /// receiver and everything derived from it.
    fn mutate_receiver(&mut self, obj: &'a Expr) {
        if let Some(key) = path_key(obj) {
            let mutable = self
                .scope
                .find(&key)
                .is_some_and(|vr| !self.symbols.get(vr.info).kind.is_immutable());
            if mutable {
                if let Some(vr) = self.scope.find_mut(&key) {
                    vr.kill();
                }
            }
            self.scope.purge_paths_with_base(&key);
        }
        self.record_base_write(obj);
    }

    fn apply_call_effects(&mut self, callee: &'a Expr) {
        // A summary for a function still on the stack is incomplete;
        // recursion falls through to the conservative case.
        let resolved = self
            .resolve_callee(callee)
            .filter(|span| !self.func_stack.contains(span));
        let Some(decl_span) = resolved else {
            self.scope.kill_all_mutable(&self.symbols);
            return;
        };
        let Some(summary) = self.effects.get(decl_span) else {
            self.scope.kill_all_mutable(&self.symbols);
            return;
        };

        let writes = summary.modifiable.clone();
        for write in &writes {
            self.scope.kill_named(write.owner, &write.name, &self.symbols);
            self.scope.purge_paths_with_base(&write.name);
        }
        // Calling the function makes its effects ours.
        if let Some(&current) = self.func_stack.last() {
            let info = self.effects.ensure(current);
            for write in writes {
                if write.owner != Some(current) {
                    info.record_write(write.owner, &write.name);
                }
            }
        }
    }

    fn resolve_callee(&self, callee: &'a Expr) -> Option<Span> {
        let ExprKind::Ident(name) = &callee.kind else {
            return None;
        };
        let vr = self.scope.find(name)?;
        let info = self.symbols.get(vr.info);
        if info.kind == SymbolKind::Function {
            return Some(info.decl_span);
        }
        // `let f = function() {...}` resolves through the known expression.
        if let Some(ExprKind::Lambda(decl)) = vr.expr.map(|e| &e.kind) {
            return Some(decl.span);
        }
        None
    }

    // -------------------------------------------------------------------------
    // Condition checks
    // -------------------------------------------------------------------------

    fn check_constant_condition(&mut self, cond: &'a Expr) {
        if let Some(verdict) = self.constant_truth(cond, 0) {
            self.sink.push(Diagnostic::new(
                DiagKind::AlwaysTrueOrFalse,
                cond.span,
                format!("condition is always {verdict}"),
            ));
        }
    }

    fn constant_truth(&self, cond: &'a Expr, depth: u32) -> Option<bool> {
        if depth > EVAL_CHASE_LIMIT {
            return None;
        }
        match &cond.kind {
            ExprKind::Literal(Literal::Bool(b)) => Some(*b),
            ExprKind::Literal(Literal::Null) => Some(false),
            ExprKind::Literal(Literal::Int(i)) => Some(*i != 0),
            ExprKind::Literal(Literal::Float(f)) => Some(*f != 0.0),
            ExprKind::Literal(Literal::Str(_)) => Some(true),
            ExprKind::Unary {
                op: crate::ast::UnaryOp::Not,
                operand,
            } => self.constant_truth(operand, depth + 1).map(|v| !v),
            ExprKind::Ident(name) => {
                let vr = self.scope.find(name)?;
                match vr.state {
                    ValueState::Undefined => Some(false),
                    ValueState::Expression => {
                        self.constant_truth(vr.expr?, depth + 1)
                    }
                    _ => None,
                }
            }
            ExprKind::Binary {
                op: op @ (BinaryOp::Eq | BinaryOp::Ne),
                lhs,
                rhs,
            } => {
                let probe = if rhs.is_null_literal() {
                    lhs
                } else if lhs.is_null_literal() {
                    rhs
                } else {
                    return None;
                };
                if self.is_definitely_null(probe, depth + 1) {
                    Some(*op == BinaryOp::Eq)
                } else if self.expr_nullability(probe) == Some(false) {
                    Some(*op == BinaryOp::Ne)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn is_definitely_null(&self, e: &'a Expr, depth: u32) -> bool {
        if depth > EVAL_CHASE_LIMIT {
            return false;
        }
        match &e.kind {
            ExprKind::Literal(Literal::Null) => true,
            ExprKind::Ident(name) => match self.scope.find(name) {
                Some(vr) => match vr.state {
                    ValueState::Undefined => true,
                    ValueState::Expression => vr
                        .expr
                        .is_some_and(|expr| self.is_definitely_null(expr, depth + 1)),
                    _ => false,
                },
                None => false,
            },
            _ => false,
        }
    }

    fn check_chain_conditions(&mut self, first: &'a Expr, mut else_branch: Option<&'a Stmt>) {
        if self.sink.is_muted() {
            return;
        }
        let mut conds = vec![first];
        while let Some(stmt) = else_branch {
            let StmtKind::If {
                cond,
                else_branch: next,
                ..
            } = &stmt.kind
            else {
                break;
            };
            conds.push(cond);
            else_branch = next.as_deref();
        }
        for (i, a) in conds.iter().enumerate() {
            for b in &conds[i + 1..] {
                if NodeEqualChecker::expr_equal(a, b) {
                    self.sink.push(
                        Diagnostic::new(
                            DiagKind::DuplicateIfCondition,
                            b.span,
                            "condition duplicates an earlier branch of this chain",
                        )
                        .with_see_also(a.span),
                    );
                }
            }
        }
    }

    fn check_loop_condition_reuse(&mut self, guard: &'a Expr, body: &'a Stmt) {
        if self.sink.is_muted() {
            return;
        }
        let stmts: &[Stmt] = match &body.kind {
            StmtKind::Block(body) => body,
            _ => slice::from_ref(body),
        };
        for stmt in stmts {
            if let StmtKind::If { cond, .. } = &stmt.kind {
                if NodeEqualChecker::expr_equal(guard, cond) {
                    self.sink.push(
                        Diagnostic::new(
                            DiagKind::DuplicateLoopCondition,
                            cond.span,
                            "condition duplicates the loop guard",
                        )
                        .with_see_also(guard.span),
                    );
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Nullability
    // -------------------------------------------------------------------------

    fn check_deref(&mut self, obj: &'a Expr) {
        if self.expr_nullability(obj) != Some(true) {
            return;
        }
        let what = path_key(obj).unwrap_or_else(|| "expression".to_string());
        self.sink.push(Diagnostic::new(
            DiagKind::PotentiallyNulled,
            obj.span,
            format!("'{what}' can be null here"),
        ));
    }

    fn expr_nullability(&self, e: &'a Expr) -> Option<bool> {
        self.expr_nullability_at(e, 0)
    }

    fn expr_nullability_at(&self, e: &'a Expr, depth: u32) -> Option<bool> {
        if depth > EVAL_CHASE_LIMIT {
            return None;
        }
        match &e.kind {
            ExprKind::Literal(Literal::Null) => Some(true),
            ExprKind::Literal(_) => Some(false),
            ExprKind::ArrayLit(_)
            | ExprKind::TableLit(_)
            | ExprKind::ClassLit { .. }
            | ExprKind::Lambda(_) => Some(false),
            ExprKind::Unary { .. } => Some(false),
            ExprKind::Ident(name) => {
                let vr = self.scope.find(name)?;
                if let Some(known) = vr.nullability() {
                    return Some(known);
                }
                match vr.state {
                    ValueState::Undefined => Some(true),
                    ValueState::Expression => {
                        self.expr_nullability_at(vr.expr?, depth + 1)
                    }
                    _ => None,
                }
            }
            ExprKind::Field { obj, nullable, .. } | ExprKind::Index { obj, nullable, .. } => {
                if let Some(vr) = path_key(e).and_then(|key| self.scope.find(&key)) {
                    if let Some(known) = vr.nullability() {
                        return Some(known);
                    }
                }
                // `x?.f` collapses to null when x is.
                if *nullable && self.expr_nullability_at(obj, depth + 1) == Some(true) {
                    return Some(true);
                }
                None
            }
            ExprKind::Binary { op, rhs, .. } => match op {
                BinaryOp::NullCoalesce => self.expr_nullability_at(rhs, depth + 1),
                BinaryOp::And | BinaryOp::Or => None,
                // Arithmetic and comparisons never produce null.
                _ => Some(false),
            },
            ExprKind::Ternary {
                then_value,
                else_value,
                ..
            } => {
                let a = self.expr_nullability_at(then_value, depth + 1)?;
                let b = self.expr_nullability_at(else_value, depth + 1)?;
                (a == b).then_some(a)
            }
            ExprKind::Assign { value, .. } => self.expr_nullability_at(value, depth + 1),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Plumbing
    // -------------------------------------------------------------------------

    /// Run a muted pass over a loop's contents on a throwaway copy, then
    /// smear the resulting assignments into the live entry state.
    fn effects_pass<F: FnOnce(&mut Self)>(&mut self, f: F) {
        let entry = mem::take(&mut self.scope);
        self.scope = entry.copy(false, &self.symbols);
        let depth = self.scope.depth;
        self.breakables.push(Breakable {
            depth,
            is_loop: true,
            exit: None,
            resume: None,
        });
        self.sink.mute();
        self.branch_level += 1;
        f(self);
        self.branch_level -= 1;
        self.sink.unmute();
        let record = self.breakables.pop().expect("gathering-pass record");

        let smeared = mem::replace(&mut self.scope, entry);
        self.scope.merge(&smeared, &self.symbols);
        if let Some(broke) = record.exit {
            self.scope.merge(&broke, &self.symbols);
        }
    }

    fn record_break(&mut self) {
        let Some(record) = self.breakables.last_mut() else {
            return;
        };
        merge_jump_state(&mut record.exit, record.depth, &self.scope, &self.symbols);
    }

    fn record_continue(&mut self) {
        let Some(record) = self.breakables.iter_mut().rev().find(|r| r.is_loop) else {
            return;
        };
        merge_jump_state(&mut record.resume, record.depth, &self.scope, &self.symbols);
    }

    fn next_eval_index(&mut self) -> u64 {
        self.eval_counter += 1;
        self.eval_counter
    }

    fn report_unused(&mut self) {
        let mut unused = Vec::new();
        for info in self.symbols.iter() {
            if info.speculative || info.used.get() {
                continue;
            }
            if info.name.starts_with('_') {
                continue;
            }
            if !matches!(
                info.kind,
                SymbolKind::Variable | SymbolKind::Binding | SymbolKind::ForeachVar
            ) {
                continue;
            }
            unused.push((info.decl_span, info.name.clone()));
        }
        for (span, name) in unused {
            self.sink.push(Diagnostic::new(
                DiagKind::DeclaredNeverUsed,
                span,
                format!("'{name}' is never used"),
            ));
        }
    }
}

/// Walk `scope` up to the jump target's entry depth and fold the state into
/// the target's join slot.
fn merge_jump_state<'a>(
    slot: &mut Option<VarScope<'a>>,
    depth: u32,
    scope: &VarScope<'a>,
    symbols: &SymbolTable,
) {
    match slot {
        Some(joined) => joined.merge_unbalanced(scope, symbols),
        None => {
            let mut walked = scope;
            while walked.depth > depth {
                walked = walked
                    .parent
                    .as_deref()
                    .expect("scope chain shallower than its recorded depth");
            }
            *slot = Some(walked.copy(false, symbols));
        }
    }
}

fn decl_symbol_kind(kind: DeclKind) -> SymbolKind {
    match kind {
        DeclKind::Local => SymbolKind::Variable,
        DeclKind::Binding => SymbolKind::Binding,
        DeclKind::Const => SymbolKind::Constant,
    }
}

/// Collect returned expressions without descending into nested functions.
fn collect_returns<'a>(stmt: &'a Stmt, out: &mut Vec<&'a Expr>) {
    match &stmt.kind {
        StmtKind::Return(Some(value)) => out.push(value),
        StmtKind::Block(body) => {
            for s in body {
                collect_returns(s, out);
            }
        }
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            collect_returns(then_branch, out);
            if let Some(else_stmt) = else_branch {
                collect_returns(else_stmt, out);
            }
        }
        StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::For { body, .. }
        | StmtKind::Foreach { body, .. } => collect_returns(body, out),
        StmtKind::Switch {
            cases,
            default_body,
            ..
        } => {
            for case in cases {
                for s in &case.body {
                    collect_returns(s, out);
                }
            }
            if let Some(body) = default_body {
                for s in body {
                    collect_returns(s, out);
                }
            }
        }
        StmtKind::TryCatch { body, handler, .. } => {
            collect_returns(body, out);
            collect_returns(handler, out);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::UnaryOp;

    fn run(stmts: Vec<Stmt>) -> Vec<Diagnostic> {
        let module = Module::new(stmts);
        let config = AnalyzerConfig::default();
        analyze(&module, &config, None, &[])
    }

    fn run_with(stmts: Vec<Stmt>, config: &AnalyzerConfig) -> Vec<Diagnostic> {
        let module = Module::new(stmts);
        analyze(&module, config, None, &[])
    }

    fn ids(diags: &[Diagnostic]) -> Vec<u16> {
        diags.iter().map(|d| d.id).collect()
    }

    fn break_stmt() -> Stmt {
        Stmt::new(StmtKind::Break, Span::dummy())
    }

    fn continue_stmt() -> Stmt {
        Stmt::new(StmtKind::Continue, Span::dummy())
    }

    #[test]
    fn null_dereference_is_reported() {
        let diags = run(vec![
            local("x", null()),
            expr_stmt(field(ident("x"), "slot")),
        ]);
        assert!(ids(&diags).contains(&201));
    }

    #[test]
    fn guard_clause_clears_nullability() {
        // function f(x) { if (x == null) return; x.slot }
        let body = block(vec![
            if_stmt(binary(BinaryOp::Eq, ident("x"), null()), ret(None)),
            expr_stmt(field(ident("x"), "slot")),
        ]);
        let diags = run(vec![func("f", &["x"], body)]);
        assert!(!ids(&diags).contains(&201), "{diags:?}");
    }

    #[test]
    fn narrowing_does_not_survive_the_join() {
        // function f(x) { if (x != null) {} x.slot }
        let body = block(vec![
            if_stmt(binary(BinaryOp::Ne, ident("x"), null()), block(vec![])),
            expr_stmt(field(ident("x"), "slot")),
        ]);
        let diags = run(vec![func("f", &["x"], body)]);
        // x is a parameter with no information either way; no report, but
        // also no stale proof (exercised by the guard test above).
        assert!(!ids(&diags).contains(&201));
    }

    #[test]
    fn known_null_flows_through_merge() {
        // local x = null; if (c) {} x.slot — both paths leave x null.
        let diags = run(vec![
            local_uninit("c"),
            local("x", null()),
            if_stmt(ident("c"), block(vec![])),
            expr_stmt(field(ident("x"), "slot")),
        ]);
        assert!(ids(&diags).contains(&201));
    }

    #[test]
    fn partially_assigned_read_is_reported() {
        let diags = run(vec![
            local_uninit("c"),
            local_uninit("x"),
            if_stmt(ident("c"), expr_stmt(assign(ident("x"), int(1)))),
            expr_stmt(unary(UnaryOp::Neg, ident("x"))),
        ]);
        assert!(ids(&diags).contains(&202), "{diags:?}");
    }

    #[test]
    fn assignment_on_both_paths_is_not_partial() {
        let diags = run(vec![
            local_uninit("c"),
            local_uninit("x"),
            if_else(
                ident("c"),
                expr_stmt(assign(ident("x"), int(1))),
                expr_stmt(assign(ident("x"), int(2))),
            ),
            expr_stmt(unary(UnaryOp::Neg, ident("x"))),
        ]);
        assert!(!ids(&diags).contains(&202), "{diags:?}");
    }

    #[test]
    fn unused_local_is_reported() {
        let diags = run(vec![local("x", int(1))]);
        assert_eq!(ids(&diags), vec![203]);
    }

    #[test]
    fn underscore_names_are_exempt_from_unused() {
        let diags = run(vec![local("_scratch", int(1))]);
        assert!(diags.is_empty());
    }

    #[test]
    fn overwrite_before_read_is_reported() {
        let diags = run(vec![
            local("x", at(int(1), 1)),
            stmt_at(expr_stmt(assign(ident("x"), int(2))), 2),
            expr_stmt(ident("x")),
        ]);
        assert!(ids(&diags).contains(&204), "{diags:?}");
    }

    #[test]
    fn read_between_assignments_is_fine() {
        let diags = run(vec![
            local("x", int(1)),
            expr_stmt(ident("x")),
            expr_stmt(assign(ident("x"), int(2))),
            expr_stmt(ident("x")),
        ]);
        assert!(!ids(&diags).contains(&204));
    }

    #[test]
    fn conditional_overwrite_is_not_reported() {
        // A default assigned at one level and overridden inside a branch is
        // a normal pattern, not a lost value.
        let diags = run(vec![
            local_uninit("c"),
            local("x", int(1)),
            if_stmt(ident("c"), expr_stmt(assign(ident("x"), int(2)))),
            expr_stmt(ident("x")),
        ]);
        assert!(!ids(&diags).contains(&204), "{diags:?}");
    }

    #[test]
    fn unreachable_after_return() {
        let diags = run(vec![ret(None), expr_stmt(int(1))]);
        assert!(ids(&diags).contains(&205));
    }

    #[test]
    fn unreachable_reported_once_per_block() {
        let diags = run(vec![ret(None), expr_stmt(int(1)), expr_stmt(int(2))]);
        assert_eq!(ids(&diags).iter().filter(|id| **id == 205).count(), 1);
    }

    #[test]
    fn if_with_both_branches_terminating_makes_the_rest_unreachable() {
        let diags = run(vec![
            local_uninit("c"),
            if_else(ident("c"), ret(None), throw(string("boom"))),
            expr_stmt(int(1)),
        ]);
        assert!(ids(&diags).contains(&205), "{diags:?}");
    }

    #[test]
    fn self_assignment_is_reported() {
        let diags = run(vec![
            local("x", int(1)),
            expr_stmt(assign(ident("x"), ident("x"))),
        ]);
        assert!(ids(&diags).contains(&206));
    }

    #[test]
    fn field_self_assignment_is_reported() {
        let diags = run(vec![
            local("t", ident("make")),
            expr_stmt(assign(field(ident("t"), "a"), field(ident("t"), "a"))),
        ]);
        assert!(ids(&diags).contains(&206));
    }

    #[test]
    fn same_operands_reported_for_subtraction() {
        let diags = run(vec![
            local("a", int(1)),
            expr_stmt(binary(BinaryOp::Sub, ident("a"), ident("a"))),
        ]);
        assert!(ids(&diags).contains(&207));
    }

    #[test]
    fn same_literal_operands_are_exempt() {
        let diags = run(vec![expr_stmt(binary(BinaryOp::Sub, int(2), int(2)))]);
        assert!(!ids(&diags).contains(&207));
    }

    #[test]
    fn duplicate_switch_cases() {
        let diags = run(vec![
            local("s", int(1)),
            switch(
                ident("s"),
                vec![
                    (int(1), vec![break_stmt()]),
                    (int(2), vec![break_stmt()]),
                    (int(1), vec![break_stmt()]),
                ],
            ),
        ]);
        assert!(ids(&diags).contains(&208));
    }

    #[test]
    fn duplicate_condition_in_else_if_chain() {
        let cond = || binary(BinaryOp::Eq, ident("a"), int(1));
        let diags = run(vec![
            local("a", int(1)),
            if_else(
                cond(),
                block(vec![]),
                if_stmt(cond(), block(vec![])),
            ),
        ]);
        assert!(ids(&diags).contains(&209), "{diags:?}");
    }

    #[test]
    fn identical_then_and_else_branches() {
        let arm = || expr_stmt(call(ident("work"), vec![int(1)]));
        let diags = run(vec![
            local_uninit("c"),
            if_else(ident("c"), arm(), arm()),
        ]);
        assert!(ids(&diags).contains(&210));
    }

    #[test]
    fn duplicate_functions_in_one_block() {
        let body = || block(vec![ret(Some(binary(BinaryOp::Add, ident("a"), int(1))))]);
        let diags = run(vec![
            func_at("first", &["a"], body(), 1),
            func_at("second", &["a"], body(), 5),
        ]);
        assert!(ids(&diags).contains(&211), "{diags:?}");
    }

    #[test]
    fn nearly_identical_functions_are_similar() {
        // Bodies heavy enough to clear the complexity floor, differing in a
        // single literal.
        let body = |last: i64| {
            let mut stmts: Vec<Stmt> = (0..16)
                .map(|i| expr_stmt(call(ident("step"), vec![int(i)])))
                .collect();
            stmts.push(ret(Some(int(last))));
            block(stmts)
        };
        let diags = run(vec![
            func_at("first", &["a"], body(0), 1),
            func_at("second", &["a"], body(1), 40),
        ]);
        assert!(ids(&diags).contains(&212), "{diags:?}");
    }

    #[test]
    fn duplicate_require_of_same_module() {
        let diags = run(vec![
            expr_stmt(call(ident("require"), vec![string("lib/util")])),
            expr_stmt(call(ident("require"), vec![string("lib/util")])),
        ]);
        assert!(ids(&diags).contains(&213));
    }

    #[test]
    fn distinct_requires_are_fine() {
        let diags = run(vec![
            expr_stmt(call(ident("require"), vec![string("lib/a")])),
            expr_stmt(call(ident("require"), vec![string("lib/b")])),
        ]);
        assert!(!ids(&diags).contains(&213));
    }

    #[test]
    fn forbidden_function_call() {
        let mut config = AnalyzerConfig::default();
        config.forbidden_functions = vec!["dofile".to_string()];
        let diags = run_with(
            vec![expr_stmt(call(ident("dofile"), vec![string("x.qs")]))],
            &config,
        );
        assert!(ids(&diags).contains(&214));
    }

    #[test]
    fn bool_prefixed_function_returning_number() {
        let diags = run(vec![func("isEmpty", &[], block(vec![ret(Some(int(0)))]))]);
        assert!(ids(&diags).contains(&215), "{diags:?}");
    }

    #[test]
    fn bool_prefixed_function_returning_bool_is_fine() {
        let diags = run(vec![func(
            "isEmpty",
            &[],
            block(vec![ret(Some(boolean(true)))]),
        )]);
        assert!(!ids(&diags).contains(&215));
    }

    #[test]
    fn prefix_must_be_a_word_boundary() {
        // "island" starts with "is" but is not a predicate name.
        let diags = run(vec![func("island", &[], block(vec![ret(Some(int(0)))]))]);
        assert!(!ids(&diags).contains(&215));
    }

    #[test]
    fn constant_condition_is_reported() {
        let diags = run(vec![if_stmt(boolean(true), block(vec![]))]);
        assert!(ids(&diags).contains(&216));
    }

    #[test]
    fn constant_condition_through_alias() {
        let diags = run(vec![
            local("flag", boolean(false)),
            if_stmt(ident("flag"), block(vec![])),
        ]);
        assert!(ids(&diags).contains(&216), "{diags:?}");
    }

    #[test]
    fn while_true_is_not_a_constant_condition() {
        let diags = run(vec![while_loop(boolean(true), block(vec![break_stmt()]))]);
        assert!(!ids(&diags).contains(&216));
    }

    #[test]
    fn null_test_of_proven_non_null_value() {
        let diags = run(vec![
            local("x", int(5)),
            if_stmt(binary(BinaryOp::Eq, ident("x"), null()), block(vec![])),
        ]);
        assert!(ids(&diags).contains(&216), "{diags:?}");
    }

    #[test]
    fn null_coalesce_with_non_null_left_side() {
        let diags = run(vec![
            local("x", int(1)),
            expr_stmt(binary(BinaryOp::NullCoalesce, ident("x"), int(0))),
        ]);
        assert!(ids(&diags).contains(&217));
    }

    #[test]
    fn null_coalesce_with_unknown_left_side_is_fine() {
        let body = block(vec![expr_stmt(binary(
            BinaryOp::NullCoalesce,
            ident("x"),
            int(0),
        ))]);
        let diags = run(vec![func("f", &["x"], body)]);
        assert!(!ids(&diags).contains(&217));
    }

    #[test]
    fn loop_guard_repeated_inside_body() {
        let guard = || binary(BinaryOp::Lt, ident("i"), int(10));
        let diags = run(vec![
            local("i", int(0)),
            while_loop(
                guard(),
                block(vec![if_stmt(guard(), block(vec![break_stmt()]))]),
            ),
        ]);
        assert!(ids(&diags).contains(&218), "{diags:?}");
    }

    #[test]
    fn loop_body_diagnosed_once_despite_two_passes() {
        let diags = run(vec![
            local_uninit("c"),
            local("x", null()),
            while_loop(ident("c"), block(vec![expr_stmt(field(ident("x"), "q"))])),
        ]);
        assert_eq!(
            ids(&diags).iter().filter(|id| **id == 201).count(),
            1,
            "{diags:?}"
        );
    }

    #[test]
    fn loop_assignment_smears_into_entry_state() {
        // x is non-null at entry, nulled inside the loop; the second pass
        // must not trust the entry-only state when reading in the body.
        let diags = run(vec![
            local_uninit("c"),
            local("x", int(1)),
            while_loop(
                ident("c"),
                block(vec![
                    expr_stmt(binary(BinaryOp::NullCoalesce, ident("x"), int(0))),
                    expr_stmt(assign(ident("x"), null())),
                ]),
            ),
        ]);
        assert!(!ids(&diags).contains(&217), "{diags:?}");
    }

    #[test]
    fn do_while_continue_keeps_following_code_reachable() {
        // The guard still runs after a continue, and it can be false.
        let diags = run(vec![
            local_uninit("c"),
            do_while(block(vec![continue_stmt()]), ident("c")),
            expr_stmt(int(1)),
        ]);
        assert!(!ids(&diags).contains(&205), "{diags:?}");
    }

    #[test]
    fn continue_inside_switch_targets_the_enclosing_loop() {
        // The switch catches break but not continue; the guard stays
        // reachable even though the body otherwise always returns.
        let diags = run(vec![
            local_uninit("c"),
            local("s", int(1)),
            do_while(
                block(vec![
                    switch(ident("s"), vec![(int(1), vec![continue_stmt()])]),
                    ret(None),
                ]),
                ident("c"),
            ),
            expr_stmt(int(1)),
        ]);
        assert!(!ids(&diags).contains(&205), "{diags:?}");
    }

    #[test]
    fn do_while_guard_failure_state_reaches_the_exit() {
        // Falling out of `do .. while (x != null)` proves x null.
        let body = block(vec![
            do_while(
                block(vec![expr_stmt(ident("x"))]),
                binary(BinaryOp::Ne, ident("x"), null()),
            ),
            expr_stmt(field(ident("x"), "slot")),
        ]);
        let diags = run(vec![func("f", &["x"], body)]);
        assert!(ids(&diags).contains(&201), "{diags:?}");
    }

    #[test]
    fn do_while_break_state_joins_the_loop_exit() {
        let diags = run(vec![
            local_uninit("c"),
            local("x", int(1)),
            do_while(
                block(vec![if_stmt(
                    ident("c"),
                    block(vec![expr_stmt(assign(ident("x"), null())), break_stmt()]),
                )]),
                ident("c"),
            ),
            expr_stmt(binary(BinaryOp::NullCoalesce, ident("x"), int(0))),
        ]);
        assert!(!ids(&diags).contains(&217), "{diags:?}");
    }

    #[test]
    fn do_while_assignment_smears_into_entry_state() {
        let diags = run(vec![
            local_uninit("c"),
            local("x", int(1)),
            do_while(
                block(vec![
                    expr_stmt(binary(BinaryOp::NullCoalesce, ident("x"), int(0))),
                    expr_stmt(assign(ident("x"), null())),
                ]),
                ident("c"),
            ),
        ]);
        assert!(!ids(&diags).contains(&217), "{diags:?}");
    }

    #[test]
    fn for_guard_narrows_inside_the_body() {
        let body = block(vec![for_loop(
            None,
            Some(binary(BinaryOp::Ne, ident("x"), null())),
            None,
            block(vec![expr_stmt(field(ident("x"), "slot"))]),
        )]);
        let diags = run(vec![func("f", &["x"], body)]);
        assert!(!ids(&diags).contains(&201), "{diags:?}");
    }

    #[test]
    fn for_break_state_joins_the_loop_exit() {
        let diags = run(vec![
            local_uninit("c"),
            local("x", int(1)),
            for_loop(
                None,
                Some(ident("c")),
                None,
                block(vec![expr_stmt(assign(ident("x"), null())), break_stmt()]),
            ),
            expr_stmt(binary(BinaryOp::NullCoalesce, ident("x"), int(0))),
        ]);
        assert!(!ids(&diags).contains(&217), "{diags:?}");
    }

    #[test]
    fn for_assignment_smears_into_entry_state() {
        let diags = run(vec![
            local_uninit("c"),
            local("x", int(1)),
            for_loop(
                None,
                Some(ident("c")),
                None,
                block(vec![
                    expr_stmt(binary(BinaryOp::NullCoalesce, ident("x"), int(0))),
                    expr_stmt(assign(ident("x"), null())),
                ]),
            ),
        ]);
        assert!(!ids(&diags).contains(&217), "{diags:?}");
    }

    #[test]
    fn for_init_variable_is_tracked_for_unused() {
        let diags = run(vec![
            local_uninit("c"),
            for_loop(
                Some(local("i", int(0))),
                Some(ident("c")),
                None,
                block(vec![]),
            ),
        ]);
        assert!(ids(&diags).contains(&203), "{diags:?}");
    }

    #[test]
    fn call_to_unknown_function_invalidates_tracking() {
        let diags = run(vec![
            local("x", int(1)),
            expr_stmt(call(ident("mystery"), vec![])),
            expr_stmt(binary(BinaryOp::NullCoalesce, ident("x"), int(0))),
        ]);
        assert!(!ids(&diags).contains(&217), "{diags:?}");
    }

    #[test]
    fn call_applies_the_callee_effect_summary() {
        // f writes only y, so x keeps its tracked value across the call.
        let diags = run(vec![
            local("x", int(1)),
            local("y", int(2)),
            func_at(
                "f",
                &[],
                block(vec![expr_stmt(assign(ident("y"), int(3)))]),
                4,
            ),
            expr_stmt(call(ident("f"), vec![])),
            expr_stmt(binary(BinaryOp::NullCoalesce, ident("x"), int(0))),
            expr_stmt(ident("y")),
        ]);
        assert!(ids(&diags).contains(&217), "{diags:?}");
    }

    #[test]
    fn effect_summaries_propagate_through_nesting() {
        let module = Module::new(vec![
            local("counter", int(0)),
            func_at(
                "outer",
                &[],
                block(vec![
                    func_at(
                        "inner",
                        &[],
                        block(vec![expr_stmt(assign(ident("counter"), int(1)))]),
                        3,
                    ),
                    expr_stmt(call(ident("inner"), vec![])),
                ]),
                2,
            ),
            expr_stmt(call(ident("outer"), vec![])),
        ]);
        let config = AnalyzerConfig::default();
        let mut checker = CheckerVisitor::new(&config, Suppressions::new());
        checker.check_module(&module);
        let outer = checker.effects.get(Span::new(2, 1, 1)).unwrap();
        assert!(outer.modifiable.iter().any(|m| m.name == "counter"));
    }

    #[test]
    fn closure_does_not_trust_captured_mutable_state() {
        // Inside the lambda the captured x may have been reassigned by the
        // time it runs, so its non-null proof must not carry over.
        let body = block(vec![expr_stmt(binary(
            BinaryOp::NullCoalesce,
            ident("x"),
            int(0),
        ))]);
        let diags = run(vec![
            local("x", int(1)),
            local("cb", lambda(&[], body)),
            expr_stmt(ident("cb")),
        ]);
        assert!(!ids(&diags).contains(&217), "{diags:?}");
    }

    #[test]
    fn break_state_joins_the_loop_exit() {
        // Inside the guard the loop breaks with x = null; after the loop x
        // may hold either value, so no constant-coalesce claim.
        let diags = run(vec![
            local_uninit("c"),
            local("x", int(1)),
            while_loop(
                ident("c"),
                block(vec![if_stmt(
                    ident("c"),
                    block(vec![expr_stmt(assign(ident("x"), null())), break_stmt()]),
                )]),
            ),
            expr_stmt(binary(BinaryOp::NullCoalesce, ident("x"), int(0))),
        ]);
        assert!(!ids(&diags).contains(&217), "{diags:?}");
    }

    #[test]
    fn foreach_value_variable_counts_when_used() {
        let diags = run(vec![
            local("items", ident("make_items")),
            foreach("v", ident("items"), expr_stmt(ident("v"))),
        ]);
        assert!(!ids(&diags).contains(&203), "{diags:?}");
    }

    #[test]
    fn foreach_unused_value_variable_is_reported() {
        let diags = run(vec![
            local("items", ident("make_items")),
            foreach("v", ident("items"), block(vec![])),
        ]);
        assert!(ids(&diags).contains(&203), "{diags:?}");
    }

    #[test]
    fn catch_variable_is_usable() {
        let diags = run(vec![try_catch(
            block(vec![expr_stmt(call(ident("risky"), vec![]))]),
            "err",
            block(vec![expr_stmt(ident("err"))]),
        )]);
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn external_bindings_resolve_and_are_never_unused() {
        let module = Module::new(vec![expr_stmt(field(ident("host_api"), "version"))]);
        let config = AnalyzerConfig::default();
        let diags = analyze(&module, &config, None, &["host_api".to_string()]);
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn suppression_comment_silences_one_line() {
        let source = "local x = 1\nx = x // -w206\n";
        let module = Module::new(vec![
            stmt_at(local("x", int(1)), 1),
            expr_stmt(at(assign(ident("x"), ident("x")), 2)),
            expr_stmt(ident("x")),
        ]);
        let config = AnalyzerConfig::default();
        let diags = analyze(&module, &config, Some(source), &[]);
        assert!(!ids(&diags).contains(&206), "{diags:?}");
    }

    #[test]
    fn unrelated_suppression_leaves_the_report_alone() {
        let source = "local x = 1\nx = x // -w203\n";
        let module = Module::new(vec![
            stmt_at(local("x", int(1)), 1),
            expr_stmt(at(assign(ident("x"), ident("x")), 2)),
            expr_stmt(ident("x")),
        ]);
        let config = AnalyzerConfig::default();
        let diags = analyze(&module, &config, Some(source), &[]);
        assert!(ids(&diags).contains(&206), "{diags:?}");
    }

    #[test]
    fn text_id_suppression_works_too() {
        let source = "local x = 1\nx = x // -self-assignment\n";
        let module = Module::new(vec![
            stmt_at(local("x", int(1)), 1),
            expr_stmt(at(assign(ident("x"), ident("x")), 2)),
            expr_stmt(ident("x")),
        ]);
        let config = AnalyzerConfig::default();
        let diags = analyze(&module, &config, Some(source), &[]);
        assert!(!ids(&diags).contains(&206), "{diags:?}");
    }

    #[test]
    fn diagnostics_come_out_sorted_by_position() {
        let diags = run(vec![
            stmt_at(local("a", int(1)), 5),
            stmt_at(local("b", int(1)), 2),
        ]);
        let lines: Vec<u32> = diags.iter().map(|d| d.line).collect();
        let mut sorted = lines.clone();
        sorted.sort_unstable();
        assert_eq!(lines, sorted);
    }
}

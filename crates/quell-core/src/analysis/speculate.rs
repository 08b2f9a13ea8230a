//! Condition speculation: turning the shape of a branch condition into
//! nullability facts for the "then" and "else" scope copies.
//!
//! A recursive pattern matcher walks the condition subtree. Each recognized
//! pattern has a fixed polarity: `x == null` proves null on the then path
//! and non-null on the else path, a bare access proves non-null on the then
//! path only, negation swaps the two, `&&`/`||` distribute per De Morgan.
//! Alias chains (`let ok = x != null; if (ok) ...`) are followed through
//! known expressions; a seen-set keeps that from looping.

use crate::ast::{BinaryOp, Expr, ExprKind, Literal, UnaryOp};
use crate::analysis::scope::VarScope;
use crate::analysis::symbols::{
    FLAG_CAN_BE_NULL, SymbolKind, SymbolTable, ValueRef, ValueState,
};

pub(crate) struct Speculator<'c> {
    symbols: &'c mut SymbolTable,
    seen: Vec<*const Expr>,
}

impl<'c> Speculator<'c> {
    pub(crate) fn new(symbols: &'c mut SymbolTable) -> Self {
        Self {
            symbols,
            seen: Vec::new(),
        }
    }

    /// Apply the condition's narrowing to the branch copies. Either scope
    /// may be absent when the caller only cares about one polarity.
    pub(crate) fn apply<'a>(
        &mut self,
        cond: &'a Expr,
        mut then_s: Option<&mut VarScope<'a>>,
        else_s: Option<&mut VarScope<'a>>,
    ) {
        if then_s.is_none() && else_s.is_none() {
            return;
        }
        let key = cond as *const Expr;
        if self.seen.contains(&key) {
            return;
        }
        self.seen.push(key);

        match &cond.kind {
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                // Negation inverts polarity.
                self.apply(operand, else_s, then_s);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.apply_binary(*op, lhs, rhs, then_s, else_s);
            }
            ExprKind::Ident(_) | ExprKind::Field { .. } | ExprKind::Index { .. } => {
                // Bare access: truthiness proves non-null on the then path.
                // The else path learns nothing; only an explicit null
                // equality proves null.
                self.mark_nonnull(then_s.as_deref_mut(), cond);

                // Follow `let ok = x != null` alias chains.
                if let Some(resolved) = resolve_alias(
                    cond,
                    then_s.as_deref().or(else_s.as_deref()),
                ) {
                    self.apply(resolved, then_s, else_s);
                }
            }
            _ => {}
        }
    }

    fn apply_binary<'a>(
        &mut self,
        op: BinaryOp,
        lhs: &'a Expr,
        rhs: &'a Expr,
        mut then_s: Option<&mut VarScope<'a>>,
        mut else_s: Option<&mut VarScope<'a>>,
    ) {
        match op {
            BinaryOp::And => {
                // True path: both sides hold; the left side's narrowing is
                // visible while the right side is considered.
                // False path: either side may have failed, so the shared
                // else-scope only keeps what both failure cases agree on.
                if let Some(else_scope) = else_s.as_deref_mut() {
                    let mut lhs_else = else_scope.copy(false, self.symbols);
                    let mut rhs_else = else_scope.copy(false, self.symbols);
                    self.apply(lhs, then_s.as_deref_mut(), Some(&mut lhs_else));
                    self.apply(rhs, then_s.as_deref_mut(), Some(&mut rhs_else));
                    lhs_else.intersect_scopes(&rhs_else);
                    *else_scope = lhs_else;
                } else {
                    self.apply(lhs, then_s.as_deref_mut(), None);
                    self.apply(rhs, then_s.as_deref_mut(), None);
                }
            }
            BinaryOp::Or => {
                // De Morgan dual of `&&`.
                if let Some(then_scope) = then_s.as_deref_mut() {
                    let mut lhs_then = then_scope.copy(false, self.symbols);
                    let mut rhs_then = then_scope.copy(false, self.symbols);
                    self.apply(lhs, Some(&mut lhs_then), else_s.as_deref_mut());
                    self.apply(rhs, Some(&mut rhs_then), else_s.as_deref_mut());
                    lhs_then.intersect_scopes(&rhs_then);
                    *then_scope = lhs_then;
                } else {
                    self.apply(lhs, None, else_s.as_deref_mut());
                    self.apply(rhs, None, else_s.as_deref_mut());
                }
            }
            BinaryOp::Eq => self.apply_equality(lhs, rhs, then_s, else_s),
            BinaryOp::Ne => self.apply_equality(lhs, rhs, else_s, then_s),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if !self.apply_coalesce_comparison(op, lhs, rhs, &mut then_s, &mut else_s) {
                    // An ordered comparison only evaluates cleanly against
                    // non-null operands.
                    self.mark_nonnull(then_s.as_deref_mut(), lhs);
                    self.mark_nonnull(then_s, rhs);
                }
            }
            BinaryOp::In | BinaryOp::InstanceOf => {
                self.mark_nonnull(then_s, lhs);
            }
            _ => {}
        }
    }

    /// `a == b` with its recognized special forms; callers swap the scope
    /// arguments to express `!=`.
    fn apply_equality<'a>(
        &mut self,
        lhs: &'a Expr,
        rhs: &'a Expr,
        mut eq_scope: Option<&mut VarScope<'a>>,
        mut ne_scope: Option<&mut VarScope<'a>>,
    ) {
        // `x == null` / `null == x`
        if rhs.is_null_literal() {
            self.mark_maybe_null(eq_scope, lhs);
            self.mark_nonnull(ne_scope, lhs);
            return;
        }
        if lhs.is_null_literal() {
            self.mark_maybe_null(eq_scope, rhs);
            self.mark_nonnull(ne_scope, rhs);
            return;
        }

        // `typeof(x) == "T"` / `type(x) == "T"`
        if let Some((subject, type_name)) = typeof_test(lhs, rhs).or_else(|| typeof_test(rhs, lhs))
        {
            if type_name == "null" {
                self.mark_maybe_null(eq_scope, subject);
                self.mark_nonnull(ne_scope, subject);
            } else {
                self.mark_nonnull(eq_scope, subject);
            }
            return;
        }

        // `(x?.f ?? D) == V`: when D and V are distinct literals, equality
        // can only hold if the coalesce never fired, so the receiver is
        // non-null on the equal path; when they match, inequality proves it.
        if self.apply_coalesce_comparison(BinaryOp::Eq, lhs, rhs, &mut eq_scope, &mut ne_scope) {
            return;
        }
        if self.apply_coalesce_comparison(BinaryOp::Eq, rhs, lhs, &mut eq_scope, &mut ne_scope) {
            return;
        }

        // A successful equality against a non-null literal proves non-null.
        if matches!(rhs.kind, ExprKind::Literal(_)) {
            self.mark_nonnull(eq_scope, lhs);
        } else if matches!(lhs.kind, ExprKind::Literal(_)) {
            self.mark_nonnull(eq_scope, rhs);
        }
    }

    /// Handle `(access ?? D) OP V` where D and V are literals. Returns true
    /// when the pattern matched and scope edits were made.
    fn apply_coalesce_comparison<'a>(
        &mut self,
        op: BinaryOp,
        lhs: &'a Expr,
        rhs: &'a Expr,
        holds_scope: &mut Option<&mut VarScope<'a>>,
        fails_scope: &mut Option<&mut VarScope<'a>>,
    ) -> bool {
        let ExprKind::Binary {
            op: BinaryOp::NullCoalesce,
            lhs: access,
            rhs: default,
        } = &lhs.kind
        else {
            return false;
        };
        let (ExprKind::Literal(d), ExprKind::Literal(v)) = (&default.kind, &rhs.kind) else {
            return false;
        };
        let Some(default_satisfies) = literal_compare(d, op, v) else {
            return false;
        };

        let receiver = coalesce_receiver(access);
        if default_satisfies {
            // Default passes the test too, so only the failing branch
            // proves the access really happened.
            self.mark_nonnull(fails_scope.as_deref_mut(), receiver);
        } else {
            self.mark_nonnull(holds_scope.as_deref_mut(), receiver);
        }
        true
    }

    fn mark_nonnull<'a>(&mut self, scope: Option<&mut VarScope<'a>>, expr: &'a Expr) {
        self.mark(scope, expr, false);
    }

    fn mark_maybe_null<'a>(&mut self, scope: Option<&mut VarScope<'a>>, expr: &'a Expr) {
        self.mark(scope, expr, true);
    }

    fn mark<'a>(&mut self, scope: Option<&mut VarScope<'a>>, expr: &'a Expr, maybe_null: bool) {
        let Some(scope) = scope else {
            return;
        };
        let Some(key) = path_key(expr) else {
            return;
        };
        if let Some(vr) = scope.find_mut(&key) {
            if maybe_null {
                vr.set_flag_pos(FLAG_CAN_BE_NULL);
            } else {
                vr.set_flag_neg(FLAG_CAN_BE_NULL);
            }
            return;
        }
        // Narrowing a field/index path we have no binding for: synthesize an
        // entry so later accesses on this branch can consult the fact.
        if !key.contains(['.', '[']) {
            return;
        }
        let id = self
            .symbols
            .declare(&key, SymbolKind::Table, expr.span, scope.owner, true);
        let mut vr = ValueRef::new(id, ValueState::Initialized);
        if maybe_null {
            vr.set_flag_pos(FLAG_CAN_BE_NULL);
        } else {
            vr.set_flag_neg(FLAG_CAN_BE_NULL);
        }
        scope.declare(&key, vr);
    }
}

/// Canonical lookup key for a trackable access chain: `x`, `x.f`,
/// `x["slot"]`, `x[3]`. Anything with a computed segment is untrackable.
#[must_use]
pub(crate) fn path_key(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Ident(name) => Some(name.clone()),
        ExprKind::Field { obj, name, .. } => Some(format!("{}.{name}", path_key(obj)?)),
        ExprKind::Index { obj, index, .. } => match &index.kind {
            ExprKind::Literal(Literal::Str(s)) => Some(format!("{}[\"{s}\"]", path_key(obj)?)),
            ExprKind::Literal(Literal::Int(i)) => Some(format!("{}[{i}]", path_key(obj)?)),
            _ => None,
        },
        _ => None,
    }
}

/// Resolve a bare identifier to its known defining expression, if the
/// current belief is a single tracked expression.
#[must_use]
fn resolve_alias<'a>(expr: &Expr, scope: Option<&VarScope<'a>>) -> Option<&'a Expr> {
    let ExprKind::Ident(name) = &expr.kind else {
        return None;
    };
    let vr = scope?.find(name)?;
    if vr.state == ValueState::Expression {
        vr.expr
    } else {
        None
    }
}

/// Match `typeof(x)` / `type(x)` compared against a string literal; returns
/// the subject and the type name.
fn typeof_test<'a, 'b>(probe: &'a Expr, literal: &'b Expr) -> Option<(&'a Expr, &'b str)> {
    let ExprKind::Literal(Literal::Str(type_name)) = &literal.kind else {
        return None;
    };
    match &probe.kind {
        ExprKind::Unary {
            op: UnaryOp::TypeOf,
            operand,
        } => Some((operand, type_name)),
        ExprKind::Call { callee, args, .. } if args.len() == 1 => match &callee.kind {
            ExprKind::Ident(name) if name == "type" || name == "typeof" => {
                Some((&args[0], type_name))
            }
            _ => None,
        },
        _ => None,
    }
}

/// For `x?.f ?? D` the interesting receiver is `x`; for a plain `x ?? D` it
/// is the whole left side.
fn coalesce_receiver(access: &Expr) -> &Expr {
    match &access.kind {
        ExprKind::Field { obj, nullable, .. } | ExprKind::Index { obj, nullable, .. }
            if *nullable =>
        {
            obj
        }
        _ => access,
    }
}

fn literal_compare(lhs: &Literal, op: BinaryOp, rhs: &Literal) -> Option<bool> {
    let numeric = |l: &Literal| match l {
        Literal::Int(i) => Some(*i as f64),
        Literal::Float(f) => Some(*f),
        _ => None,
    };
    match op {
        BinaryOp::Eq => Some(literal_eq(lhs, rhs)),
        BinaryOp::Ne => Some(!literal_eq(lhs, rhs)),
        BinaryOp::Lt => Some(numeric(lhs)? < numeric(rhs)?),
        BinaryOp::Le => Some(numeric(lhs)? <= numeric(rhs)?),
        BinaryOp::Gt => Some(numeric(lhs)? > numeric(rhs)?),
        BinaryOp::Ge => Some(numeric(lhs)? >= numeric(rhs)?),
        _ => None,
    }
}

fn literal_eq(lhs: &Literal, rhs: &Literal) -> bool {
    match (lhs, rhs) {
        (Literal::Int(a), Literal::Float(b)) | (Literal::Float(b), Literal::Int(a)) => {
            (*a as f64) == *b
        }
        _ => lhs == rhs,
    }
}

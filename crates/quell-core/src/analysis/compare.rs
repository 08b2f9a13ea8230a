//! Structural comparators over syntax subtrees.
//!
//! Three related tools share this module:
//! - [`NodeEqualChecker`] — deep structural equality, pointer-identity
//!   shortcut; the dataflow engine uses it to decide whether two control-flow
//!   paths leave a variable holding "the same" value.
//! - [`NodeDiffComputer`] — a capped edit cost between two subtrees; zero
//!   means duplicate, a small size-scaled cost means "similar".
//! - [`NodeComplexityComputer`] — an additive weight per node kind, used both
//!   to gate diffing and as the denominator of similarity thresholds.

use crate::ast::{Expr, ExprKind, FuncDecl, Literal, Stmt, StmtKind, SwitchCase, TableSlot};

/// Deep structural equality over expressions and statements.
pub struct NodeEqualChecker;

impl NodeEqualChecker {
    #[must_use]
    pub fn expr_equal(a: &Expr, b: &Expr) -> bool {
        if std::ptr::eq(a, b) {
            return true;
        }
        match (&a.kind, &b.kind) {
            (ExprKind::Ident(x), ExprKind::Ident(y)) => x == y,
            (ExprKind::Literal(x), ExprKind::Literal(y)) => literal_equal(x, y),
            (
                ExprKind::Unary { op: oa, operand: ea },
                ExprKind::Unary { op: ob, operand: eb },
            ) => oa == ob && Self::expr_equal(ea, eb),
            (
                ExprKind::Binary {
                    op: oa,
                    lhs: la,
                    rhs: ra,
                },
                ExprKind::Binary {
                    op: ob,
                    lhs: lb,
                    rhs: rb,
                },
            ) => oa == ob && Self::expr_equal(la, lb) && Self::expr_equal(ra, rb),
            (
                ExprKind::Ternary {
                    cond: ca,
                    then_value: ta,
                    else_value: ea,
                },
                ExprKind::Ternary {
                    cond: cb,
                    then_value: tb,
                    else_value: eb,
                },
            ) => {
                Self::expr_equal(ca, cb) && Self::expr_equal(ta, tb) && Self::expr_equal(ea, eb)
            }
            (
                ExprKind::Assign {
                    op: oa,
                    target: ta,
                    value: va,
                },
                ExprKind::Assign {
                    op: ob,
                    target: tb,
                    value: vb,
                },
            ) => oa == ob && Self::expr_equal(ta, tb) && Self::expr_equal(va, vb),
            (
                ExprKind::IncrDecr {
                    target: ta,
                    is_incr: ia,
                    prefix: pa,
                },
                ExprKind::IncrDecr {
                    target: tb,
                    is_incr: ib,
                    prefix: pb,
                },
            ) => ia == ib && pa == pb && Self::expr_equal(ta, tb),
            (
                ExprKind::Call {
                    callee: ca,
                    args: aa,
                    nullable: na,
                },
                ExprKind::Call {
                    callee: cb,
                    args: ab,
                    nullable: nb,
                },
            ) => {
                na == nb
                    && Self::expr_equal(ca, cb)
                    && aa.len() == ab.len()
                    && aa.iter().zip(ab).all(|(x, y)| Self::expr_equal(x, y))
            }
            (
                ExprKind::Field {
                    obj: oa,
                    name: na,
                    nullable: qa,
                },
                ExprKind::Field {
                    obj: ob,
                    name: nb,
                    nullable: qb,
                },
            ) => na == nb && qa == qb && Self::expr_equal(oa, ob),
            (
                ExprKind::Index {
                    obj: oa,
                    index: ia,
                    nullable: qa,
                },
                ExprKind::Index {
                    obj: ob,
                    index: ib,
                    nullable: qb,
                },
            ) => qa == qb && Self::expr_equal(oa, ob) && Self::expr_equal(ia, ib),
            (ExprKind::ArrayLit(xa), ExprKind::ArrayLit(xb)) => {
                xa.len() == xb.len() && xa.iter().zip(xb).all(|(x, y)| Self::expr_equal(x, y))
            }
            (ExprKind::TableLit(sa), ExprKind::TableLit(sb)) => slots_equal(sa, sb),
            (
                ExprKind::ClassLit {
                    parent: pa,
                    members: ma,
                },
                ExprKind::ClassLit {
                    parent: pb,
                    members: mb,
                },
            ) => {
                match (pa, pb) {
                    (Some(x), Some(y)) if Self::expr_equal(x, y) => {}
                    (None, None) => {}
                    _ => return false,
                }
                slots_equal(ma, mb)
            }
            (ExprKind::Lambda(fa), ExprKind::Lambda(fb)) => Self::func_equal(fa, fb),
            _ => false,
        }
    }

    #[must_use]
    pub fn stmt_equal(a: &Stmt, b: &Stmt) -> bool {
        if std::ptr::eq(a, b) {
            return true;
        }
        match (&a.kind, &b.kind) {
            (StmtKind::Expr(x), StmtKind::Expr(y)) => Self::expr_equal(x, y),
            (StmtKind::Block(xa), StmtKind::Block(xb)) => Self::stmts_equal(xa, xb),
            (
                StmtKind::VarDecl {
                    kind: ka,
                    bindings: ba,
                },
                StmtKind::VarDecl {
                    kind: kb,
                    bindings: bb,
                },
            ) => {
                ka == kb
                    && ba.len() == bb.len()
                    && ba.iter().zip(bb).all(|(x, y)| {
                        x.name == y.name && opt_expr_equal(x.init.as_ref(), y.init.as_ref())
                    })
            }
            (
                StmtKind::DestructureDecl {
                    kind: ka,
                    names: na,
                    init: ia,
                },
                StmtKind::DestructureDecl {
                    kind: kb,
                    names: nb,
                    init: ib,
                },
            ) => {
                ka == kb
                    && na.len() == nb.len()
                    && na.iter().zip(nb).all(|(x, y)| x.0 == y.0)
                    && Self::expr_equal(ia, ib)
            }
            (
                StmtKind::If {
                    cond: ca,
                    then_branch: ta,
                    else_branch: ea,
                },
                StmtKind::If {
                    cond: cb,
                    then_branch: tb,
                    else_branch: eb,
                },
            ) => {
                Self::expr_equal(ca, cb)
                    && Self::stmt_equal(ta, tb)
                    && match (ea, eb) {
                        (Some(x), Some(y)) => Self::stmt_equal(x, y),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (
                StmtKind::While { cond: ca, body: ba },
                StmtKind::While { cond: cb, body: bb },
            ) => Self::expr_equal(ca, cb) && Self::stmt_equal(ba, bb),
            (
                StmtKind::DoWhile { body: ba, cond: ca },
                StmtKind::DoWhile { body: bb, cond: cb },
            ) => Self::expr_equal(ca, cb) && Self::stmt_equal(ba, bb),
            (
                StmtKind::For {
                    init: ia,
                    cond: ca,
                    step: sa,
                    body: ba,
                },
                StmtKind::For {
                    init: ib,
                    cond: cb,
                    step: sb,
                    body: bb,
                },
            ) => {
                match (ia, ib) {
                    (Some(x), Some(y)) if Self::stmt_equal(x, y) => {}
                    (None, None) => {}
                    _ => return false,
                }
                opt_expr_equal(ca.as_deref(), cb.as_deref())
                    && opt_expr_equal(sa.as_deref(), sb.as_deref())
                    && Self::stmt_equal(ba, bb)
            }
            (
                StmtKind::Foreach {
                    index: ia,
                    value: va,
                    container: ca,
                    body: ba,
                },
                StmtKind::Foreach {
                    index: ib,
                    value: vb,
                    container: cb,
                    body: bb,
                },
            ) => {
                ia.as_ref().map(|i| &i.0) == ib.as_ref().map(|i| &i.0)
                    && va.0 == vb.0
                    && Self::expr_equal(ca, cb)
                    && Self::stmt_equal(ba, bb)
            }
            (
                StmtKind::Switch {
                    subject: sa,
                    cases: ca,
                    default_body: da,
                },
                StmtKind::Switch {
                    subject: sb,
                    cases: cb,
                    default_body: db,
                },
            ) => {
                Self::expr_equal(sa, sb)
                    && cases_equal(ca, cb)
                    && match (da, db) {
                        (Some(x), Some(y)) => Self::stmts_equal(x, y),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (
                StmtKind::TryCatch {
                    body: ba,
                    exc_name: na,
                    handler: ha,
                },
                StmtKind::TryCatch {
                    body: bb,
                    exc_name: nb,
                    handler: hb,
                },
            ) => na.0 == nb.0 && Self::stmt_equal(ba, bb) && Self::stmt_equal(ha, hb),
            (StmtKind::Throw(x), StmtKind::Throw(y)) => Self::expr_equal(x, y),
            (StmtKind::Return(x), StmtKind::Return(y))
            | (StmtKind::Yield(x), StmtKind::Yield(y)) => {
                opt_expr_equal(x.as_deref(), y.as_deref())
            }
            (StmtKind::Break, StmtKind::Break) => true,
            (StmtKind::Continue, StmtKind::Continue) => true,
            (StmtKind::Function(fa), StmtKind::Function(fb)) => {
                fa.name == fb.name && Self::func_equal(fa, fb)
            }
            (
                StmtKind::Class {
                    name: na,
                    members: ma,
                    ..
                },
                StmtKind::Class {
                    name: nb,
                    members: mb,
                    ..
                },
            ) => na == nb && slots_equal(ma, mb),
            (
                StmtKind::Enum {
                    name: na,
                    members: ma,
                    ..
                },
                StmtKind::Enum {
                    name: nb,
                    members: mb,
                    ..
                },
            ) => {
                na == nb
                    && ma.len() == mb.len()
                    && ma.iter().zip(mb).all(|(x, y)| {
                        x.0 == y.0
                            && match (&x.1, &y.1) {
                                (Some(a), Some(b)) => literal_equal(a, b),
                                (None, None) => true,
                                _ => false,
                            }
                    })
            }
            (StmtKind::Import { name: na, .. }, StmtKind::Import { name: nb, .. }) => na == nb,
            (StmtKind::Empty, StmtKind::Empty) => true,
            _ => false,
        }
    }

    #[must_use]
    pub fn stmts_equal(a: &[Stmt], b: &[Stmt]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Self::stmt_equal(x, y))
    }

    /// Body-and-parameter equality; names are deliberately ignored so that
    /// two sibling functions differing only in name still compare equal.
    #[must_use]
    pub fn func_equal(a: &FuncDecl, b: &FuncDecl) -> bool {
        a.params.len() == b.params.len()
            && a.params.iter().zip(&b.params).all(|(x, y)| {
                x.name == y.name && opt_expr_equal(x.default.as_ref(), y.default.as_ref())
            })
            && Self::stmt_equal(&a.body, &b.body)
    }
}

fn literal_equal(a: &Literal, b: &Literal) -> bool {
    match (a, b) {
        (Literal::Float(x), Literal::Float(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

fn opt_expr_equal(a: Option<&Expr>, b: Option<&Expr>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => NodeEqualChecker::expr_equal(x, y),
        (None, None) => true,
        _ => false,
    }
}

fn slots_equal(a: &[TableSlot], b: &[TableSlot]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.key == y.key && NodeEqualChecker::expr_equal(&x.value, &y.value))
}

fn cases_equal(a: &[SwitchCase], b: &[SwitchCase]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            NodeEqualChecker::expr_equal(&x.value, &y.value)
                && NodeEqualChecker::stmts_equal(&x.body, &y.body)
        })
}

// =============================================================================
// Edit-cost diffing
// =============================================================================

const COST_KIND_MISMATCH: u32 = 4;
const COST_OPERATOR_MISMATCH: u32 = 2;
const COST_LITERAL_MISMATCH: u32 = 1;
const COST_NULLABILITY_MISMATCH: u32 = 1;
const COST_SIZE_MISMATCH: u32 = 2;
const COST_NAME_MISMATCH: u32 = 1;

/// Bounded edit cost between two subtrees; gives up once the running total
/// exceeds the caller's limit.
pub struct NodeDiffComputer {
    limit: u32,
    total: u32,
}

impl NodeDiffComputer {
    /// `None` means the cost exceeded `limit`.
    #[must_use]
    pub fn diff_stmts(a: &Stmt, b: &Stmt, limit: u32) -> Option<u32> {
        let mut diff = Self { limit, total: 0 };
        if diff.stmt(a, b) { Some(diff.total) } else { None }
    }

    #[must_use]
    pub fn diff_exprs(a: &Expr, b: &Expr, limit: u32) -> Option<u32> {
        let mut diff = Self { limit, total: 0 };
        if diff.expr(a, b) { Some(diff.total) } else { None }
    }

    /// Diff two function bodies, parameter lists included.
    #[must_use]
    pub fn diff_funcs(a: &FuncDecl, b: &FuncDecl, limit: u32) -> Option<u32> {
        let mut diff = Self { limit, total: 0 };
        if !diff.charge(a.params.len().abs_diff(b.params.len()) as u32 * COST_SIZE_MISMATCH) {
            return None;
        }
        for (x, y) in a.params.iter().zip(&b.params) {
            if x.name != y.name && !diff.charge(COST_NAME_MISMATCH) {
                return None;
            }
        }
        if diff.stmt(&a.body, &b.body) {
            Some(diff.total)
        } else {
            None
        }
    }

    /// Add to the running total; false once over the limit.
    fn charge(&mut self, cost: u32) -> bool {
        self.total = self.total.saturating_add(cost);
        self.total <= self.limit
    }

    fn expr(&mut self, a: &Expr, b: &Expr) -> bool {
        if std::ptr::eq(a, b) {
            return true;
        }
        match (&a.kind, &b.kind) {
            (ExprKind::Ident(x), ExprKind::Ident(y)) => {
                x == y || self.charge(COST_NAME_MISMATCH)
            }
            (ExprKind::Literal(x), ExprKind::Literal(y)) => {
                literal_equal(x, y) || self.charge(COST_LITERAL_MISMATCH)
            }
            (
                ExprKind::Unary { op: oa, operand: ea },
                ExprKind::Unary { op: ob, operand: eb },
            ) => {
                if oa != ob && !self.charge(COST_OPERATOR_MISMATCH) {
                    return false;
                }
                self.expr(ea, eb)
            }
            (
                ExprKind::Binary {
                    op: oa,
                    lhs: la,
                    rhs: ra,
                },
                ExprKind::Binary {
                    op: ob,
                    lhs: lb,
                    rhs: rb,
                },
            ) => {
                if oa != ob && !self.charge(COST_OPERATOR_MISMATCH) {
                    return false;
                }
                self.expr(la, lb) && self.expr(ra, rb)
            }
            (
                ExprKind::Ternary {
                    cond: ca,
                    then_value: ta,
                    else_value: ea,
                },
                ExprKind::Ternary {
                    cond: cb,
                    then_value: tb,
                    else_value: eb,
                },
            ) => self.expr(ca, cb) && self.expr(ta, tb) && self.expr(ea, eb),
            (
                ExprKind::Assign {
                    op: oa,
                    target: ta,
                    value: va,
                },
                ExprKind::Assign {
                    op: ob,
                    target: tb,
                    value: vb,
                },
            ) => {
                if oa != ob && !self.charge(COST_OPERATOR_MISMATCH) {
                    return false;
                }
                self.expr(ta, tb) && self.expr(va, vb)
            }
            (
                ExprKind::IncrDecr {
                    target: ta,
                    is_incr: ia,
                    prefix: pa,
                },
                ExprKind::IncrDecr {
                    target: tb,
                    is_incr: ib,
                    prefix: pb,
                },
            ) => {
                if (ia != ib || pa != pb) && !self.charge(COST_OPERATOR_MISMATCH) {
                    return false;
                }
                self.expr(ta, tb)
            }
            (
                ExprKind::Call {
                    callee: ca,
                    args: aa,
                    nullable: na,
                },
                ExprKind::Call {
                    callee: cb,
                    args: ab,
                    nullable: nb,
                },
            ) => {
                if na != nb && !self.charge(COST_NULLABILITY_MISMATCH) {
                    return false;
                }
                self.expr(ca, cb) && self.expr_list(aa, ab)
            }
            (
                ExprKind::Field {
                    obj: oa,
                    name: na,
                    nullable: qa,
                },
                ExprKind::Field {
                    obj: ob,
                    name: nb,
                    nullable: qb,
                },
            ) => {
                if qa != qb && !self.charge(COST_NULLABILITY_MISMATCH) {
                    return false;
                }
                if na != nb && !self.charge(COST_NAME_MISMATCH) {
                    return false;
                }
                self.expr(oa, ob)
            }
            (
                ExprKind::Index {
                    obj: oa,
                    index: ia,
                    nullable: qa,
                },
                ExprKind::Index {
                    obj: ob,
                    index: ib,
                    nullable: qb,
                },
            ) => {
                if qa != qb && !self.charge(COST_NULLABILITY_MISMATCH) {
                    return false;
                }
                self.expr(oa, ob) && self.expr(ia, ib)
            }
            (ExprKind::ArrayLit(xa), ExprKind::ArrayLit(xb)) => self.expr_list(xa, xb),
            (ExprKind::TableLit(sa), ExprKind::TableLit(sb)) => self.slot_list(sa, sb),
            (
                ExprKind::ClassLit {
                    parent: pa,
                    members: ma,
                },
                ExprKind::ClassLit {
                    parent: pb,
                    members: mb,
                },
            ) => {
                match (pa, pb) {
                    (Some(x), Some(y)) => {
                        if !self.expr(x, y) {
                            return false;
                        }
                    }
                    (None, None) => {}
                    _ => {
                        if !self.charge(COST_SIZE_MISMATCH) {
                            return false;
                        }
                    }
                }
                self.slot_list(ma, mb)
            }
            (ExprKind::Lambda(fa), ExprKind::Lambda(fb)) => {
                if fa.params.len() != fb.params.len()
                    && !self.charge(COST_SIZE_MISMATCH)
                {
                    return false;
                }
                self.stmt(&fa.body, &fb.body)
            }
            _ => {
                // Different node kinds: charge the kind cost plus the size of
                // both sides so wildly different shapes blow the limit fast.
                let size = NodeComplexityComputer::expr_complexity(a, self.limit)
                    .saturating_add(NodeComplexityComputer::expr_complexity(b, self.limit));
                self.charge(COST_KIND_MISMATCH.saturating_add(size))
            }
        }
    }

    fn expr_list(&mut self, a: &[Expr], b: &[Expr]) -> bool {
        if a.len() != b.len()
            && !self.charge(a.len().abs_diff(b.len()) as u32 * COST_SIZE_MISMATCH)
        {
            return false;
        }
        a.iter().zip(b).all(|(x, y)| self.expr(x, y))
    }

    fn slot_list(&mut self, a: &[TableSlot], b: &[TableSlot]) -> bool {
        if a.len() != b.len()
            && !self.charge(a.len().abs_diff(b.len()) as u32 * COST_SIZE_MISMATCH)
        {
            return false;
        }
        for (x, y) in a.iter().zip(b) {
            if x.key != y.key && !self.charge(COST_NAME_MISMATCH) {
                return false;
            }
            if !self.expr(&x.value, &y.value) {
                return false;
            }
        }
        true
    }

    fn stmt(&mut self, a: &Stmt, b: &Stmt) -> bool {
        if std::ptr::eq(a, b) {
            return true;
        }
        match (&a.kind, &b.kind) {
            (StmtKind::Expr(x), StmtKind::Expr(y)) => self.expr(x, y),
            (StmtKind::Block(xa), StmtKind::Block(xb)) => self.stmt_list(xa, xb),
            (
                StmtKind::VarDecl {
                    kind: ka,
                    bindings: ba,
                },
                StmtKind::VarDecl {
                    kind: kb,
                    bindings: bb,
                },
            ) => {
                if ka != kb && !self.charge(COST_OPERATOR_MISMATCH) {
                    return false;
                }
                if ba.len() != bb.len()
                    && !self.charge(ba.len().abs_diff(bb.len()) as u32 * COST_SIZE_MISMATCH)
                {
                    return false;
                }
                for (x, y) in ba.iter().zip(bb) {
                    if x.name != y.name && !self.charge(COST_NAME_MISMATCH) {
                        return false;
                    }
                    match (&x.init, &y.init) {
                        (Some(xi), Some(yi)) => {
                            if !self.expr(xi, yi) {
                                return false;
                            }
                        }
                        (None, None) => {}
                        _ => {
                            if !self.charge(COST_SIZE_MISMATCH) {
                                return false;
                            }
                        }
                    }
                }
                true
            }
            (
                StmtKind::If {
                    cond: ca,
                    then_branch: ta,
                    else_branch: ea,
                },
                StmtKind::If {
                    cond: cb,
                    then_branch: tb,
                    else_branch: eb,
                },
            ) => {
                if !self.expr(ca, cb) || !self.stmt(ta, tb) {
                    return false;
                }
                match (ea, eb) {
                    (Some(x), Some(y)) => self.stmt(x, y),
                    (None, None) => true,
                    (Some(x), None) => {
                        let size = NodeComplexityComputer::stmt_complexity(x, self.limit);
                        self.charge(size.saturating_add(COST_SIZE_MISMATCH))
                    }
                    (None, Some(y)) => {
                        let size = NodeComplexityComputer::stmt_complexity(y, self.limit);
                        self.charge(size.saturating_add(COST_SIZE_MISMATCH))
                    }
                }
            }
            (
                StmtKind::While { cond: ca, body: ba },
                StmtKind::While { cond: cb, body: bb },
            )
            | (
                StmtKind::DoWhile { body: ba, cond: ca },
                StmtKind::DoWhile { body: bb, cond: cb },
            ) => self.expr(ca, cb) && self.stmt(ba, bb),
            (
                StmtKind::Foreach {
                    container: ca,
                    body: ba,
                    ..
                },
                StmtKind::Foreach {
                    container: cb,
                    body: bb,
                    ..
                },
            ) => self.expr(ca, cb) && self.stmt(ba, bb),
            (
                StmtKind::For {
                    init: ia,
                    cond: ca,
                    step: sa,
                    body: ba,
                },
                StmtKind::For {
                    init: ib,
                    cond: cb,
                    step: sb,
                    body: bb,
                },
            ) => {
                match (ia, ib) {
                    (Some(x), Some(y)) => {
                        if !self.stmt(x, y) {
                            return false;
                        }
                    }
                    (None, None) => {}
                    _ => {
                        if !self.charge(COST_SIZE_MISMATCH) {
                            return false;
                        }
                    }
                }
                if !self.opt_expr(ca.as_deref(), cb.as_deref()) {
                    return false;
                }
                if !self.opt_expr(sa.as_deref(), sb.as_deref()) {
                    return false;
                }
                self.stmt(ba, bb)
            }
            (StmtKind::Throw(x), StmtKind::Throw(y)) => self.expr(x, y),
            (StmtKind::Return(x), StmtKind::Return(y))
            | (StmtKind::Yield(x), StmtKind::Yield(y)) => {
                self.opt_expr(x.as_deref(), y.as_deref())
            }
            (StmtKind::Break, StmtKind::Break)
            | (StmtKind::Continue, StmtKind::Continue)
            | (StmtKind::Empty, StmtKind::Empty) => true,
            (StmtKind::Function(fa), StmtKind::Function(fb)) => self.stmt(&fa.body, &fb.body),
            (
                StmtKind::Switch {
                    subject: sa,
                    cases: ca,
                    default_body: da,
                },
                StmtKind::Switch {
                    subject: sb,
                    cases: cb,
                    default_body: db,
                },
            ) => {
                if !self.expr(sa, sb) {
                    return false;
                }
                if ca.len() != cb.len()
                    && !self.charge(ca.len().abs_diff(cb.len()) as u32 * COST_SIZE_MISMATCH)
                {
                    return false;
                }
                for (x, y) in ca.iter().zip(cb) {
                    if !self.expr(&x.value, &y.value) || !self.stmt_list(&x.body, &y.body) {
                        return false;
                    }
                }
                match (da, db) {
                    (Some(x), Some(y)) => self.stmt_list(x, y),
                    (None, None) => true,
                    _ => self.charge(COST_SIZE_MISMATCH),
                }
            }
            (
                StmtKind::TryCatch {
                    body: ba,
                    handler: ha,
                    ..
                },
                StmtKind::TryCatch {
                    body: bb,
                    handler: hb,
                    ..
                },
            ) => self.stmt(ba, bb) && self.stmt(ha, hb),
            _ => {
                let size = NodeComplexityComputer::stmt_complexity(a, self.limit)
                    .saturating_add(NodeComplexityComputer::stmt_complexity(b, self.limit));
                self.charge(COST_KIND_MISMATCH.saturating_add(size))
            }
        }
    }

    fn stmt_list(&mut self, a: &[Stmt], b: &[Stmt]) -> bool {
        if a.len() != b.len() {
            let extra: u32 = if a.len() > b.len() {
                a[b.len()..]
                    .iter()
                    .map(|s| NodeComplexityComputer::stmt_complexity(s, self.limit))
                    .sum()
            } else {
                b[a.len()..]
                    .iter()
                    .map(|s| NodeComplexityComputer::stmt_complexity(s, self.limit))
                    .sum()
            };
            if !self.charge(extra.saturating_add(COST_SIZE_MISMATCH)) {
                return false;
            }
        }
        a.iter().zip(b).all(|(x, y)| self.stmt(x, y))
    }

    fn opt_expr(&mut self, a: Option<&Expr>, b: Option<&Expr>) -> bool {
        match (a, b) {
            (Some(x), Some(y)) => self.expr(x, y),
            (None, None) => true,
            _ => self.charge(COST_SIZE_MISMATCH),
        }
    }
}

// =============================================================================
// Complexity scoring
// =============================================================================

/// Additive weight per node kind, saturating at the caller's cap.
pub struct NodeComplexityComputer;

impl NodeComplexityComputer {
    #[must_use]
    pub fn expr_complexity(expr: &Expr, cap: u32) -> u32 {
        let mut total = 0u32;
        Self::expr_walk(expr, cap, &mut total);
        total.min(cap)
    }

    #[must_use]
    pub fn stmt_complexity(stmt: &Stmt, cap: u32) -> u32 {
        let mut total = 0u32;
        Self::stmt_walk(stmt, cap, &mut total);
        total.min(cap)
    }

    #[must_use]
    pub fn func_complexity(func: &FuncDecl, cap: u32) -> u32 {
        let mut total = func.params.len() as u32;
        Self::stmt_walk(&func.body, cap, &mut total);
        total.min(cap)
    }

    fn bump(total: &mut u32, cap: u32, weight: u32) -> bool {
        *total = total.saturating_add(weight);
        *total < cap
    }

    fn expr_walk(expr: &Expr, cap: u32, total: &mut u32) {
        if *total >= cap {
            return;
        }
        match &expr.kind {
            ExprKind::Ident(_) | ExprKind::Literal(_) => {
                Self::bump(total, cap, 1);
            }
            ExprKind::Unary { operand, .. } => {
                if Self::bump(total, cap, 1) {
                    Self::expr_walk(operand, cap, total);
                }
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                if Self::bump(total, cap, 1) {
                    Self::expr_walk(lhs, cap, total);
                    Self::expr_walk(rhs, cap, total);
                }
            }
            ExprKind::Ternary {
                cond,
                then_value,
                else_value,
            } => {
                if Self::bump(total, cap, 2) {
                    Self::expr_walk(cond, cap, total);
                    Self::expr_walk(then_value, cap, total);
                    Self::expr_walk(else_value, cap, total);
                }
            }
            ExprKind::Assign { target, value, .. } => {
                if Self::bump(total, cap, 1) {
                    Self::expr_walk(target, cap, total);
                    Self::expr_walk(value, cap, total);
                }
            }
            ExprKind::IncrDecr { target, .. } => {
                if Self::bump(total, cap, 1) {
                    Self::expr_walk(target, cap, total);
                }
            }
            ExprKind::Call { callee, args, .. } => {
                // Calls weigh in proportion to their argument count.
                if Self::bump(total, cap, 2 + args.len() as u32) {
                    Self::expr_walk(callee, cap, total);
                    for arg in args {
                        Self::expr_walk(arg, cap, total);
                    }
                }
            }
            ExprKind::Field { obj, .. } => {
                if Self::bump(total, cap, 1) {
                    Self::expr_walk(obj, cap, total);
                }
            }
            ExprKind::Index { obj, index, .. } => {
                if Self::bump(total, cap, 1) {
                    Self::expr_walk(obj, cap, total);
                    Self::expr_walk(index, cap, total);
                }
            }
            ExprKind::ArrayLit(items) => {
                if Self::bump(total, cap, 1 + items.len() as u32) {
                    for item in items {
                        Self::expr_walk(item, cap, total);
                    }
                }
            }
            ExprKind::TableLit(slots) => {
                if Self::bump(total, cap, 1 + slots.len() as u32) {
                    for slot in slots {
                        Self::expr_walk(&slot.value, cap, total);
                    }
                }
            }
            ExprKind::ClassLit { parent, members } => {
                if Self::bump(total, cap, 2 + members.len() as u32) {
                    if let Some(parent) = parent {
                        Self::expr_walk(parent, cap, total);
                    }
                    for member in members {
                        Self::expr_walk(&member.value, cap, total);
                    }
                }
            }
            ExprKind::Lambda(func) => {
                if Self::bump(total, cap, 3) {
                    Self::stmt_walk(&func.body, cap, total);
                }
            }
        }
    }

    fn stmt_walk(stmt: &Stmt, cap: u32, total: &mut u32) {
        if *total >= cap {
            return;
        }
        match &stmt.kind {
            StmtKind::Expr(expr) => Self::expr_walk(expr, cap, total),
            StmtKind::Block(body) => {
                for stmt in body {
                    Self::stmt_walk(stmt, cap, total);
                }
            }
            StmtKind::VarDecl { bindings, .. } => {
                if Self::bump(total, cap, bindings.len() as u32) {
                    for binding in bindings {
                        if let Some(init) = &binding.init {
                            Self::expr_walk(init, cap, total);
                        }
                    }
                }
            }
            StmtKind::DestructureDecl { names, init, .. } => {
                if Self::bump(total, cap, names.len() as u32) {
                    Self::expr_walk(init, cap, total);
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if Self::bump(total, cap, 2) {
                    Self::expr_walk(cond, cap, total);
                    Self::stmt_walk(then_branch, cap, total);
                    if let Some(else_branch) = else_branch {
                        Self::stmt_walk(else_branch, cap, total);
                    }
                }
            }
            StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
                if Self::bump(total, cap, 3) {
                    Self::expr_walk(cond, cap, total);
                    Self::stmt_walk(body, cap, total);
                }
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                if Self::bump(total, cap, 3) {
                    if let Some(init) = init {
                        Self::stmt_walk(init, cap, total);
                    }
                    if let Some(cond) = cond {
                        Self::expr_walk(cond, cap, total);
                    }
                    if let Some(step) = step {
                        Self::expr_walk(step, cap, total);
                    }
                    Self::stmt_walk(body, cap, total);
                }
            }
            StmtKind::Foreach {
                container, body, ..
            } => {
                if Self::bump(total, cap, 3) {
                    Self::expr_walk(container, cap, total);
                    Self::stmt_walk(body, cap, total);
                }
            }
            StmtKind::Switch {
                subject,
                cases,
                default_body,
            } => {
                if Self::bump(total, cap, 2 + cases.len() as u32) {
                    Self::expr_walk(subject, cap, total);
                    for case in cases {
                        Self::expr_walk(&case.value, cap, total);
                        for stmt in &case.body {
                            Self::stmt_walk(stmt, cap, total);
                        }
                    }
                    if let Some(default_body) = default_body {
                        for stmt in default_body {
                            Self::stmt_walk(stmt, cap, total);
                        }
                    }
                }
            }
            StmtKind::TryCatch { body, handler, .. } => {
                if Self::bump(total, cap, 3) {
                    Self::stmt_walk(body, cap, total);
                    Self::stmt_walk(handler, cap, total);
                }
            }
            StmtKind::Throw(expr) => {
                if Self::bump(total, cap, 1) {
                    Self::expr_walk(expr, cap, total);
                }
            }
            StmtKind::Return(value) | StmtKind::Yield(value) => {
                if Self::bump(total, cap, 1) {
                    if let Some(value) = value {
                        Self::expr_walk(value, cap, total);
                    }
                }
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {
                Self::bump(total, cap, 1);
            }
            StmtKind::Function(func) => {
                if Self::bump(total, cap, 3) {
                    Self::stmt_walk(&func.body, cap, total);
                }
            }
            StmtKind::Class { members, .. } => {
                if Self::bump(total, cap, 2 + members.len() as u32) {
                    for member in members {
                        Self::expr_walk(&member.value, cap, total);
                    }
                }
            }
            StmtKind::Enum { members, .. } => {
                Self::bump(total, cap, 1 + members.len() as u32);
            }
            StmtKind::Import { .. } => {
                Self::bump(total, cap, 1);
            }
        }
    }
}

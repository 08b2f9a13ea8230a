//! Syntax tree definitions for the Quell scripting language.
//!
//! The analyzer consumes a fully parsed tree; the parser itself lives in the
//! front-end crate and hands us this closed set of node variants. Every node
//! carries a source span so diagnostics can point back into the file.

use std::fmt;

/// A half-open source region: line/column of the first character plus the
/// width in characters. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
pub struct Span {
    pub line: u32,
    pub col: u32,
    pub width: u32,
}

impl Span {
    #[must_use]
    pub fn new(line: u32, col: u32, width: u32) -> Self {
        Self { line, col, width }
    }

    /// Span for synthesized nodes (tests, injected bindings).
    #[must_use]
    pub fn dummy() -> Self {
        Self::default()
    }
}

/// A whole compilation unit.
#[derive(Debug, Clone)]
pub struct Module {
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl Module {
    #[must_use]
    pub fn new(body: Vec<Stmt>) -> Self {
        Self {
            body,
            span: Span::dummy(),
        }
    }
}

// =============================================================================
// Statements
// =============================================================================

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    #[must_use]
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// How a name was introduced by a declaration statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    /// Mutable local (`local x = ...`).
    Local,
    /// Immutable binding (`let x = ...`).
    Binding,
    /// Compile-time constant (`const X = ...`).
    Const,
}

/// One `name = init` pair inside a declaration statement.
#[derive(Debug, Clone)]
pub struct VarBinding {
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

/// A `case` arm of a switch statement.
#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub value: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A function parameter, possibly with a default value.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
    pub span: Span,
}

/// A function declaration or literal. `name` is `None` for lambdas.
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: Box<Stmt>,
    pub span: Span,
}

/// One slot of a table or class literal.
#[derive(Debug, Clone)]
pub struct TableSlot {
    pub key: String,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Expression evaluated for its side effects.
    Expr(Box<Expr>),
    /// `{ ... }`
    Block(Vec<Stmt>),
    /// `local` / `let` / `const` declaration; one statement may introduce
    /// several bindings.
    VarDecl {
        kind: DeclKind,
        bindings: Vec<VarBinding>,
    },
    /// `let [a, b] = expr` — each name receives an unknown slice of the
    /// initializer.
    DestructureDecl {
        kind: DeclKind,
        names: Vec<(String, Span)>,
        init: Box<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Box<Expr>,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Box<Expr>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
        body: Box<Stmt>,
    },
    /// `foreach (idx, val in container)`; `index` is optional.
    Foreach {
        index: Option<(String, Span)>,
        value: (String, Span),
        container: Box<Expr>,
        body: Box<Stmt>,
    },
    Switch {
        subject: Box<Expr>,
        cases: Vec<SwitchCase>,
        default_body: Option<Vec<Stmt>>,
    },
    TryCatch {
        body: Box<Stmt>,
        exc_name: (String, Span),
        handler: Box<Stmt>,
    },
    Throw(Box<Expr>),
    Return(Option<Box<Expr>>),
    Yield(Option<Box<Expr>>),
    Break,
    Continue,
    /// Named function declaration; introduces the name in the enclosing
    /// scope.
    Function(FuncDecl),
    Class {
        name: String,
        name_span: Span,
        members: Vec<TableSlot>,
    },
    Enum {
        name: String,
        name_span: Span,
        members: Vec<(String, Option<Literal>)>,
    },
    /// `import name` — binds a module object in the current scope.
    Import {
        name: String,
        name_span: Span,
    },
    Empty,
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// True for literal nodes only; used by the same-operands exemption.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(_))
    }

    #[must_use]
    pub fn is_null_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(Literal::Null))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(x) => write!(f, "{x}"),
            Literal::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    BitNot,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    /// `x in container`
    In,
    InstanceOf,
    /// `a ?? b`
    NullCoalesce,
}

impl BinaryOp {
    /// Operators for which `a OP a` is (almost) certainly a typo.
    #[must_use]
    pub fn is_same_operand_suspicious(self) -> bool {
        matches!(
            self,
            BinaryOp::Sub
                | BinaryOp::Div
                | BinaryOp::Mod
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::BitAnd
                | BinaryOp::BitOr
                | BinaryOp::BitXor
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Ident(String),
    Literal(Literal),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// `++x`, `x--`, ...
    IncrDecr {
        target: Box<Expr>,
        is_incr: bool,
        prefix: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        /// `x?.f()` style null-propagating call.
        nullable: bool,
    },
    /// `obj.name` / `obj?.name`
    Field {
        obj: Box<Expr>,
        name: String,
        nullable: bool,
    },
    /// `obj[index]` / `obj?[index]`
    Index {
        obj: Box<Expr>,
        index: Box<Expr>,
        nullable: bool,
    },
    ArrayLit(Vec<Expr>),
    TableLit(Vec<TableSlot>),
    ClassLit {
        parent: Option<Box<Expr>>,
        members: Vec<TableSlot>,
    },
    Lambda(FuncDecl),
}

// =============================================================================
// Construction helpers
// =============================================================================

/// Shorthand constructors used by unit tests and by hosts that synthesize
/// trees (for example injected prelude bindings). All nodes get dummy spans
/// unless placed with [`at`].
pub mod build {
    use super::*;

    #[must_use]
    pub fn ident(name: &str) -> Expr {
        Expr::new(ExprKind::Ident(name.to_string()), Span::dummy())
    }

    #[must_use]
    pub fn null() -> Expr {
        Expr::new(ExprKind::Literal(Literal::Null), Span::dummy())
    }

    #[must_use]
    pub fn int(v: i64) -> Expr {
        Expr::new(ExprKind::Literal(Literal::Int(v)), Span::dummy())
    }

    #[must_use]
    pub fn float(v: f64) -> Expr {
        Expr::new(ExprKind::Literal(Literal::Float(v)), Span::dummy())
    }

    #[must_use]
    pub fn boolean(v: bool) -> Expr {
        Expr::new(ExprKind::Literal(Literal::Bool(v)), Span::dummy())
    }

    #[must_use]
    pub fn string(v: &str) -> Expr {
        Expr::new(ExprKind::Literal(Literal::Str(v.to_string())), Span::dummy())
    }

    #[must_use]
    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            Span::dummy(),
        )
    }

    #[must_use]
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            Span::dummy(),
        )
    }

    #[must_use]
    pub fn ternary(cond: Expr, then_value: Expr, else_value: Expr) -> Expr {
        Expr::new(
            ExprKind::Ternary {
                cond: Box::new(cond),
                then_value: Box::new(then_value),
                else_value: Box::new(else_value),
            },
            Span::dummy(),
        )
    }

    #[must_use]
    pub fn assign(target: Expr, value: Expr) -> Expr {
        Expr::new(
            ExprKind::Assign {
                op: AssignOp::Assign,
                target: Box::new(target),
                value: Box::new(value),
            },
            Span::dummy(),
        )
    }

    #[must_use]
    pub fn compound_assign(op: AssignOp, target: Expr, value: Expr) -> Expr {
        Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            Span::dummy(),
        )
    }

    #[must_use]
    pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
        Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
                nullable: false,
            },
            Span::dummy(),
        )
    }

    #[must_use]
    pub fn field(obj: Expr, name: &str) -> Expr {
        Expr::new(
            ExprKind::Field {
                obj: Box::new(obj),
                name: name.to_string(),
                nullable: false,
            },
            Span::dummy(),
        )
    }

    #[must_use]
    pub fn nullable_field(obj: Expr, name: &str) -> Expr {
        Expr::new(
            ExprKind::Field {
                obj: Box::new(obj),
                name: name.to_string(),
                nullable: true,
            },
            Span::dummy(),
        )
    }

    #[must_use]
    pub fn index(obj: Expr, idx: Expr) -> Expr {
        Expr::new(
            ExprKind::Index {
                obj: Box::new(obj),
                index: Box::new(idx),
                nullable: false,
            },
            Span::dummy(),
        )
    }

    #[must_use]
    pub fn lambda(params: &[&str], body: Stmt) -> Expr {
        Expr::new(
            ExprKind::Lambda(FuncDecl {
                name: None,
                params: params
                    .iter()
                    .map(|p| Param {
                        name: (*p).to_string(),
                        default: None,
                        span: Span::dummy(),
                    })
                    .collect(),
                body: Box::new(body),
                span: Span::dummy(),
            }),
            Span::dummy(),
        )
    }

    /// Place an expression at a 1-based source line.
    #[must_use]
    pub fn at(mut expr: Expr, line: u32) -> Expr {
        expr.span.line = line;
        expr.span.col = 1;
        expr.span.width = 1;
        expr
    }

    /// Place a statement at a 1-based source line.
    #[must_use]
    pub fn stmt_at(mut stmt: Stmt, line: u32) -> Stmt {
        stmt.span.line = line;
        stmt.span.col = 1;
        stmt.span.width = 1;
        stmt
    }

    #[must_use]
    pub fn expr_stmt(expr: Expr) -> Stmt {
        let span = expr.span;
        Stmt::new(StmtKind::Expr(Box::new(expr)), span)
    }

    #[must_use]
    pub fn block(body: Vec<Stmt>) -> Stmt {
        Stmt::new(StmtKind::Block(body), Span::dummy())
    }

    #[must_use]
    pub fn local(name: &str, init: Expr) -> Stmt {
        decl(DeclKind::Local, name, Some(init))
    }

    #[must_use]
    pub fn local_uninit(name: &str) -> Stmt {
        decl(DeclKind::Local, name, None)
    }

    #[must_use]
    pub fn let_binding(name: &str, init: Expr) -> Stmt {
        decl(DeclKind::Binding, name, Some(init))
    }

    #[must_use]
    pub fn const_decl(name: &str, init: Expr) -> Stmt {
        decl(DeclKind::Const, name, Some(init))
    }

    fn decl(kind: DeclKind, name: &str, init: Option<Expr>) -> Stmt {
        Stmt::new(
            StmtKind::VarDecl {
                kind,
                bindings: vec![VarBinding {
                    name: name.to_string(),
                    init,
                    span: Span::dummy(),
                }],
            },
            Span::dummy(),
        )
    }

    #[must_use]
    pub fn if_stmt(cond: Expr, then_branch: Stmt) -> Stmt {
        Stmt::new(
            StmtKind::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: None,
            },
            Span::dummy(),
        )
    }

    #[must_use]
    pub fn if_else(cond: Expr, then_branch: Stmt, else_branch: Stmt) -> Stmt {
        Stmt::new(
            StmtKind::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Some(Box::new(else_branch)),
            },
            Span::dummy(),
        )
    }

    #[must_use]
    pub fn while_loop(cond: Expr, body: Stmt) -> Stmt {
        Stmt::new(
            StmtKind::While {
                cond: Box::new(cond),
                body: Box::new(body),
            },
            Span::dummy(),
        )
    }

    pub fn do_while(body: Stmt, cond: Expr) -> Stmt {
        Stmt::new(
            StmtKind::DoWhile {
                body: Box::new(body),
                cond: Box::new(cond),
            },
            Span::dummy(),
        )
    }

    pub fn for_loop(
        init: Option<Stmt>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Stmt,
    ) -> Stmt {
        Stmt::new(
            StmtKind::For {
                init: init.map(Box::new),
                cond: cond.map(Box::new),
                step: step.map(Box::new),
                body: Box::new(body),
            },
            Span::dummy(),
        )
    }

    #[must_use]
    pub fn foreach(value: &str, container: Expr, body: Stmt) -> Stmt {
        Stmt::new(
            StmtKind::Foreach {
                index: None,
                value: (value.to_string(), Span::dummy()),
                container: Box::new(container),
                body: Box::new(body),
            },
            Span::dummy(),
        )
    }

    #[must_use]
    pub fn ret(value: Option<Expr>) -> Stmt {
        Stmt::new(StmtKind::Return(value.map(Box::new)), Span::dummy())
    }

    #[must_use]
    pub fn throw(value: Expr) -> Stmt {
        Stmt::new(StmtKind::Throw(Box::new(value)), Span::dummy())
    }

    #[must_use]
    pub fn func(name: &str, params: &[&str], body: Stmt) -> Stmt {
        Stmt::new(
            StmtKind::Function(FuncDecl {
                name: Some(name.to_string()),
                params: params
                    .iter()
                    .map(|p| Param {
                        name: (*p).to_string(),
                        default: None,
                        span: Span::dummy(),
                    })
                    .collect(),
                body: Box::new(body),
                span: Span::dummy(),
            }),
            Span::dummy(),
        )
    }

    /// Named function whose declaration sits at a distinct line, so the
    /// effect-summary table can key it.
    #[must_use]
    pub fn func_at(name: &str, params: &[&str], body: Stmt, line: u32) -> Stmt {
        let mut stmt = func(name, params, body);
        stmt.span = Span::new(line, 1, 1);
        if let StmtKind::Function(decl) = &mut stmt.kind {
            decl.span = stmt.span;
        }
        stmt
    }

    #[must_use]
    pub fn switch(subject: Expr, cases: Vec<(Expr, Vec<Stmt>)>) -> Stmt {
        Stmt::new(
            StmtKind::Switch {
                subject: Box::new(subject),
                cases: cases
                    .into_iter()
                    .map(|(value, body)| SwitchCase {
                        value,
                        body,
                        span: Span::dummy(),
                    })
                    .collect(),
                default_body: None,
            },
            Span::dummy(),
        )
    }

    #[must_use]
    pub fn try_catch(body: Stmt, exc: &str, handler: Stmt) -> Stmt {
        Stmt::new(
            StmtKind::TryCatch {
                body: Box::new(body),
                exc_name: (exc.to_string(), Span::dummy()),
                handler: Box::new(handler),
            },
            Span::dummy(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::build::*;
    use super::*;

    #[test]
    fn spans_default_to_dummy() {
        let e = ident("x");
        assert_eq!(e.span, Span::dummy());
    }

    #[test]
    fn at_places_expression() {
        let e = at(ident("x"), 7);
        assert_eq!(e.span.line, 7);
        assert_eq!(e.span.col, 1);
    }

    #[test]
    fn literal_display() {
        assert_eq!(Literal::Null.to_string(), "null");
        assert_eq!(Literal::Int(42).to_string(), "42");
        assert_eq!(Literal::Str("a".into()).to_string(), "\"a\"");
    }

    #[test]
    fn same_operand_suspicious_excludes_arithmetic_add() {
        assert!(!BinaryOp::Add.is_same_operand_suspicious());
        assert!(BinaryOp::Sub.is_same_operand_suspicious());
        assert!(BinaryOp::Div.is_same_operand_suspicious());
    }

    #[test]
    fn builder_produces_nested_structure() {
        let tree = if_else(
            binary(BinaryOp::Eq, ident("x"), null()),
            ret(None),
            expr_stmt(call(field(ident("x"), "foo"), vec![])),
        );
        match tree.kind {
            StmtKind::If {
                cond, else_branch, ..
            } => {
                assert!(matches!(cond.kind, ExprKind::Binary { .. }));
                assert!(else_branch.is_some());
            }
            _ => panic!("expected if"),
        }
    }
}

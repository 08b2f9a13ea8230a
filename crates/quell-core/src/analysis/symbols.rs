//! Symbol and value tracking.
//!
//! [`SymbolInfo`] is the immutable identity of a declared name, allocated
//! once in an arena and never destroyed while the compilation unit is being
//! analyzed. [`ValueRef`] is the current, scope-local belief about that
//! name's value; it is cloned whenever control flow forks and merged when
//! paths rejoin.

use std::cell::Cell;

use id_arena::{Arena, Id};

use crate::ast::{Expr, Span};

pub type SymbolId = Id<SymbolInfo>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    /// Immutable `let` binding.
    Binding,
    Parameter,
    Constant,
    Enum,
    EnumMember,
    Function,
    Class,
    Table,
    Import,
    Exception,
    ForeachVar,
    /// Host-injected global.
    ExternalBinding,
}

impl SymbolKind {
    /// Kinds whose value cannot change after declaration. Closure copies and
    /// call-effect kills leave these alone.
    #[must_use]
    pub fn is_immutable(self) -> bool {
        matches!(
            self,
            SymbolKind::Binding
                | SymbolKind::Constant
                | SymbolKind::Enum
                | SymbolKind::EnumMember
                | SymbolKind::Function
                | SymbolKind::Class
                | SymbolKind::Import
                | SymbolKind::ExternalBinding
        )
    }
}

#[derive(Debug)]
pub struct SymbolInfo {
    pub name: String,
    pub kind: SymbolKind,
    pub decl_span: Span,
    /// Function declaration that owns the declaring scope; `None` at top
    /// level.
    pub owner: Option<Span>,
    /// Read anywhere after declaration.
    pub used: Cell<bool>,
    /// Read since the most recent assignment.
    pub used_after_assign: Cell<bool>,
    /// Allocated during a muted effects-gathering pass; excluded from
    /// end-of-run reporting so two-pass loops do not double-report.
    pub speculative: bool,
}

impl SymbolInfo {
    pub fn mark_used(&self) {
        self.used.set(true);
        self.used_after_assign.set(true);
    }
}

/// Arena of all symbols declared during one compilation unit's analysis.
#[derive(Debug, Default)]
pub struct SymbolTable {
    arena: Arena<SymbolInfo>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(
        &mut self,
        name: &str,
        kind: SymbolKind,
        decl_span: Span,
        owner: Option<Span>,
        speculative: bool,
    ) -> SymbolId {
        self.arena.alloc(SymbolInfo {
            name: name.to_string(),
            kind,
            decl_span,
            owner,
            used: Cell::new(false),
            used_after_assign: Cell::new(true),
            speculative,
        })
    }

    #[must_use]
    pub fn get(&self, id: SymbolId) -> &SymbolInfo {
        &self.arena[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolInfo> {
        self.arena.iter().map(|(_, s)| s)
    }
}

/// What we currently believe about a name's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueState {
    /// Declared without initializer; reads see the implicit null.
    Undefined,
    /// Holds a single known expression.
    Expression,
    /// Initialized, exact expression not tracked.
    Initialized,
    /// Different values on different paths.
    Multiple,
    /// Anything; all facts dropped.
    Unknown,
    /// Assigned on some incoming paths only.
    Partially,
    /// Name exists but carries no value yet (function hoisting, imports).
    Declared,
}

impl ValueState {
    /// Merge rule for two differing states at a control-flow join. Equal
    /// states and equal-expression refinement are handled by the caller.
    #[must_use]
    pub fn merge(self, other: ValueState) -> ValueState {
        use ValueState::*;
        if self == other {
            return self;
        }
        match (self, other) {
            (Unknown, _) | (_, Unknown) => Unknown,
            (Partially, _) | (_, Partially) => Partially,
            (Undefined, _) | (_, Undefined) => Partially,
            (Declared, Declared) => Declared,
            _ => Multiple,
        }
    }
}

/// Value-shape facts tracked as bit flags. Only nullability today; the
/// positive set holds proven-true facts, the negative set proven-false ones.
pub const FLAG_CAN_BE_NULL: u8 = 1 << 0;

#[derive(Debug, Clone)]
pub struct ValueRef<'a> {
    pub info: SymbolId,
    pub state: ValueState,
    /// The expression currently believed to be the value, for narrowing and
    /// alias queries. Borrowed from the tree under analysis.
    pub expr: Option<&'a Expr>,
    pub flags_pos: u8,
    pub flags_neg: u8,
    pub assigned: bool,
    /// Branch nesting level at which the last assignment happened.
    pub assign_depth: u32,
    pub assign_span: Span,
    /// Monotonic counter detecting stale facts across reassignment.
    pub eval_index: u64,
}

impl<'a> ValueRef<'a> {
    #[must_use]
    pub fn new(info: SymbolId, state: ValueState) -> Self {
        Self {
            info,
            state,
            expr: None,
            flags_pos: 0,
            flags_neg: 0,
            assigned: false,
            assign_depth: 0,
            assign_span: Span::dummy(),
            eval_index: 0,
        }
    }

    /// Record a proven-true fact, displacing any contradiction.
    pub fn set_flag_pos(&mut self, flag: u8) {
        self.flags_pos |= flag;
        self.flags_neg &= !flag;
        debug_assert_eq!(self.flags_pos & self.flags_neg, 0);
    }

    /// Record a proven-false fact, displacing any contradiction.
    pub fn set_flag_neg(&mut self, flag: u8) {
        self.flags_neg |= flag;
        self.flags_pos &= !flag;
        debug_assert_eq!(self.flags_pos & self.flags_neg, 0);
    }

    /// `Some(true)` — may be null on some path; `Some(false)` — proven
    /// non-null; `None` — no information.
    #[must_use]
    pub fn nullability(&self) -> Option<bool> {
        if self.flags_pos & FLAG_CAN_BE_NULL != 0 {
            Some(true)
        } else if self.flags_neg & FLAG_CAN_BE_NULL != 0 {
            Some(false)
        } else {
            None
        }
    }

    /// Drop everything we knew; used when a call may have written the value.
    pub fn kill(&mut self) {
        self.state = ValueState::Unknown;
        self.expr = None;
        self.flags_pos = 0;
        self.flags_neg = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_symbol() -> (SymbolTable, SymbolId) {
        let mut table = SymbolTable::new();
        let id = table.declare("x", SymbolKind::Variable, Span::dummy(), None, false);
        (table, id)
    }

    #[test]
    fn flags_stay_disjoint() {
        let (_, id) = table_with_symbol();
        let mut vr = ValueRef::new(id, ValueState::Expression);
        vr.set_flag_pos(FLAG_CAN_BE_NULL);
        assert_eq!(vr.nullability(), Some(true));
        vr.set_flag_neg(FLAG_CAN_BE_NULL);
        assert_eq!(vr.nullability(), Some(false));
        assert_eq!(vr.flags_pos & vr.flags_neg, 0);
    }

    #[test]
    fn kill_clears_all_facts() {
        let (_, id) = table_with_symbol();
        let mut vr = ValueRef::new(id, ValueState::Expression);
        vr.set_flag_neg(FLAG_CAN_BE_NULL);
        vr.kill();
        assert_eq!(vr.state, ValueState::Unknown);
        assert_eq!(vr.nullability(), None);
        assert!(vr.expr.is_none());
    }

    #[test]
    fn state_merge_table() {
        use ValueState::*;
        assert_eq!(Expression.merge(Expression), Expression);
        assert_eq!(Expression.merge(Initialized), Multiple);
        assert_eq!(Initialized.merge(Expression), Multiple);
        assert_eq!(Multiple.merge(Expression), Multiple);
        assert_eq!(Unknown.merge(Expression), Unknown);
        assert_eq!(Expression.merge(Unknown), Unknown);
        assert_eq!(Declared.merge(Declared), Declared);
        assert_eq!(Undefined.merge(Expression), Partially);
        assert_eq!(Partially.merge(Initialized), Partially);
    }

    #[test]
    fn immutable_kinds() {
        assert!(SymbolKind::Constant.is_immutable());
        assert!(SymbolKind::Function.is_immutable());
        assert!(SymbolKind::Binding.is_immutable());
        assert!(!SymbolKind::Variable.is_immutable());
        assert!(!SymbolKind::Parameter.is_immutable());
        assert!(!SymbolKind::ForeachVar.is_immutable());
    }

    #[test]
    fn symbols_survive_in_arena() {
        let mut table = SymbolTable::new();
        let a = table.declare("a", SymbolKind::Variable, Span::new(1, 1, 1), None, false);
        let b = table.declare("a", SymbolKind::Variable, Span::new(5, 1, 1), None, false);
        assert_ne!(a, b);
        assert_eq!(table.get(a).decl_span.line, 1);
        assert_eq!(table.get(b).decl_span.line, 5);
        assert_eq!(table.iter().count(), 2);
    }

    #[test]
    fn mark_used_sets_both_flags() {
        let (table, id) = table_with_symbol();
        let info = table.get(id);
        info.used_after_assign.set(false);
        info.mark_used();
        assert!(info.used.get());
        assert!(info.used_after_assign.get());
    }
}

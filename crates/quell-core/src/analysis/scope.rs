//! The scope tree and its merge algebra.
//!
//! One [`VarScope`] exists per lexical block, loop body, function body,
//! try/catch arm, switch case or speculative branch. Entering a construct
//! pushes a child scope; forking control flow deep-copies the whole chain,
//! and rejoining reconciles the copies with [`VarScope::merge`].
//!
//! Invariant: two chains being merged, intersected or copied across must
//! have the same owner at every level. Violations are programmer errors and
//! fail fast via debug assertions, never via diagnostics.

use std::collections::HashMap;

use crate::ast::Span;
use crate::analysis::compare::NodeEqualChecker;
use crate::analysis::symbols::{SymbolTable, ValueRef, ValueState};

#[derive(Debug, Default)]
pub struct VarScope<'a> {
    /// Enclosing function declaration; `None` at top level.
    pub owner: Option<Span>,
    pub parent: Option<Box<VarScope<'a>>>,
    /// Distance to the root scope.
    pub depth: u32,
    /// Bumped on every merge so stale narrowing can be detected.
    pub eval_id: u64,
    pub locals: HashMap<String, ValueRef<'a>>,
}

impl<'a> VarScope<'a> {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Push a child scope onto the chain, consuming the parent.
    #[must_use]
    pub fn child(parent: VarScope<'a>, owner: Option<Span>) -> Self {
        let depth = parent.depth + 1;
        let eval_id = parent.eval_id + 1;
        Self {
            owner,
            depth,
            eval_id,
            parent: Some(Box::new(parent)),
            locals: HashMap::new(),
        }
    }

    /// Pop the innermost scope, returning the parent chain.
    #[must_use]
    pub fn pop(mut self) -> VarScope<'a> {
        *self
            .parent
            .take()
            .expect("popped the root scope")
    }

    /// Deep-clone the whole chain. With `for_closure` set, every value whose
    /// symbol is mutable is reset to Unknown: the closure may execute after
    /// the original has been reassigned, so captured state must not be
    /// assumed current.
    #[must_use]
    pub fn copy(&self, for_closure: bool, symbols: &SymbolTable) -> VarScope<'a> {
        let mut locals = self.locals.clone();
        if for_closure {
            for vr in locals.values_mut() {
                if !symbols.get(vr.info).kind.is_immutable() {
                    vr.kill();
                }
            }
        }
        VarScope {
            owner: self.owner,
            parent: self
                .parent
                .as_ref()
                .map(|p| Box::new(p.copy(for_closure, symbols))),
            depth: self.depth,
            eval_id: self.eval_id,
            locals,
        }
    }

    /// Reconcile this chain with an alternate-path copy of itself.
    pub fn merge(&mut self, other: &VarScope<'a>, symbols: &SymbolTable) {
        debug_assert_eq!(self.depth, other.depth, "merging unbalanced scope chains");
        debug_assert_eq!(self.owner, other.owner, "merging chains across functions");

        if let (Some(mine), Some(theirs)) = (self.parent.as_deref_mut(), other.parent.as_deref()) {
            mine.merge(theirs, symbols);
        }

        for (name, mine) in self.locals.iter_mut() {
            match other.locals.get(name) {
                Some(theirs) => {
                    // Different identities mean one path re-declared the name;
                    // that is a shadow, not a join point.
                    if mine.info != theirs.info {
                        continue;
                    }
                    merge_value(mine, theirs);
                }
                None => {
                    // Declared on this path only: possibly uninitialized on
                    // the other.
                    mine.state = ValueState::Partially;
                    mine.expr = None;
                }
            }
        }

        for (name, theirs) in &other.locals {
            if !self.locals.contains_key(name) {
                let mut imported = theirs.clone();
                imported.state = ValueState::Partially;
                imported.expr = None;
                self.locals.insert(name.clone(), imported);
            }
        }

        self.eval_id = self.eval_id.max(other.eval_id) + 1;
    }

    /// Combine narrowing facts from another copy without demoting states;
    /// used to synthesize the shared else-scope of short-circuit operators.
    /// Independent narrowings of disjoint names simply accumulate.
    pub fn intersect_scopes(&mut self, other: &VarScope<'a>) {
        debug_assert_eq!(self.depth, other.depth, "intersecting unbalanced chains");
        debug_assert_eq!(self.owner, other.owner, "intersecting chains across functions");

        if let (Some(mine), Some(theirs)) = (self.parent.as_deref_mut(), other.parent.as_deref()) {
            mine.intersect_scopes(theirs);
        }

        for (name, mine) in self.locals.iter_mut() {
            let Some(theirs) = other.locals.get(name) else {
                continue;
            };
            if mine.info != theirs.info {
                continue;
            }
            mine.flags_pos |= theirs.flags_pos;
            mine.flags_neg |= theirs.flags_neg;
            // Contradictory accumulation means neither fact is usable.
            let conflict = mine.flags_pos & mine.flags_neg;
            mine.flags_pos &= !conflict;
            mine.flags_neg &= !conflict;

            if mine.expr.is_none() && mine.state == theirs.state {
                mine.expr = theirs.expr;
            }
        }
    }

    /// Merge with a chain that is several scopes deeper, as happens when
    /// `break`/`continue` exit nested blocks at once: walk the deeper chain
    /// up until the depths line up, then merge normally.
    pub fn merge_unbalanced(&mut self, other: &VarScope<'a>, symbols: &SymbolTable) {
        let mut walked = other;
        while walked.depth > self.depth {
            walked = walked
                .parent
                .as_deref()
                .expect("scope chain shallower than its recorded depth");
        }
        self.merge(walked, symbols);
    }

    pub fn declare(&mut self, name: &str, value: ValueRef<'a>) {
        self.locals.insert(name.to_string(), value);
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ValueRef<'a>> {
        match self.locals.get(name) {
            Some(vr) => Some(vr),
            None => self.parent.as_deref().and_then(|p| p.find(name)),
        }
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut ValueRef<'a>> {
        if self.locals.contains_key(name) {
            return self.locals.get_mut(name);
        }
        self.parent.as_deref_mut().and_then(|p| p.find_mut(name))
    }

    /// Kill every non-constant value on the whole chain; the conservative
    /// fallback when a call's effects cannot be resolved.
    pub fn kill_all_mutable(&mut self, symbols: &SymbolTable) {
        for vr in self.locals.values_mut() {
            if !symbols.get(vr.info).kind.is_immutable() {
                vr.kill();
            }
        }
        if let Some(parent) = self.parent.as_deref_mut() {
            parent.kill_all_mutable(symbols);
        }
    }

    /// Kill one name within the innermost scope belonging to `owner`.
    /// Returns false when no such binding is live on this chain.
    pub fn kill_named(
        &mut self,
        owner: Option<Span>,
        name: &str,
        symbols: &SymbolTable,
    ) -> bool {
        if self.owner == owner {
            if let Some(vr) = self.locals.get_mut(name) {
                if !symbols.get(vr.info).kind.is_immutable() {
                    vr.kill();
                }
                return true;
            }
        }
        match self.parent.as_deref_mut() {
            Some(parent) => parent.kill_named(owner, name, symbols),
            None => false,
        }
    }

    /// Drop synthesized narrowing entries rooted at `base` (e.g. `x.f`,
    /// `x["k"]`) after `base` itself is reassigned or invalidated.
    pub fn purge_paths_with_base(&mut self, base: &str) {
        let dot = format!("{base}.");
        let idx = format!("{base}[");
        self.locals
            .retain(|name, _| !name.starts_with(&dot) && !name.starts_with(&idx));
        if let Some(parent) = self.parent.as_deref_mut() {
            parent.purge_paths_with_base(base);
        }
    }
}

fn merge_value<'a>(mine: &mut ValueRef<'a>, theirs: &ValueRef<'a>) {
    if mine.state == theirs.state {
        if let (Some(a), Some(b)) = (mine.expr, theirs.expr) {
            if !NodeEqualChecker::expr_equal(a, b) {
                mine.state = ValueState::Multiple;
                mine.expr = None;
            }
        } else if mine.expr.is_some() != theirs.expr.is_some() {
            mine.expr = None;
        }
    } else {
        mine.state = mine.state.merge(theirs.state);
        if mine.state != ValueState::Expression {
            mine.expr = None;
        }
    }

    // A fact survives the join only when both incoming paths prove it.
    mine.flags_pos &= theirs.flags_pos;
    mine.flags_neg &= theirs.flags_neg;
    mine.assigned &= theirs.assigned;
    mine.eval_index = mine.eval_index.max(theirs.eval_index);
}

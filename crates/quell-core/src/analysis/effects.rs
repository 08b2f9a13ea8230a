//! Per-function effect summaries.
//!
//! While a function body is traversed, every write to a name owned by an
//! enclosing scope is recorded on that function's [`FunctionInfo`]. When the
//! function is left, its Modifiable set is folded into the enclosing
//! function's summary, so transitive effects propagate outward through
//! nested closures without a fixed-point pass. Call sites consume summaries
//! through the checker; a callee with no summary falls back to the
//! kill-everything case.

use std::collections::HashMap;

use crate::ast::Span;

/// One outer-scope name a function may write. `owner` is the span of the
/// function declaration owning the written variable's scope (`None` for top
/// level).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifiable {
    pub owner: Option<Span>,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionInfo {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub modifiable: Vec<Modifiable>,
}

impl FunctionInfo {
    pub fn record_write(&mut self, owner: Option<Span>, name: &str) {
        let entry = Modifiable {
            owner,
            name: name.to_string(),
        };
        if !self.modifiable.contains(&entry) {
            self.modifiable.push(entry);
        }
    }
}

/// Table of effect summaries, keyed by function declaration span. Built
/// incrementally during the traversal, consulted whenever a call site's
/// callee resolves statically.
#[derive(Debug, Default)]
pub struct FunctionEffects {
    map: HashMap<Span, FunctionInfo>,
}

impl FunctionEffects {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a summary, or return the one a forward use already created.
    pub fn ensure(&mut self, decl: Span) -> &mut FunctionInfo {
        self.map.entry(decl).or_default()
    }

    #[must_use]
    pub fn get(&self, decl: Span) -> Option<&FunctionInfo> {
        self.map.get(&decl)
    }

    /// Fold a finished child summary into its enclosing function's summary.
    /// Writes to names the parent itself owns stay out: they are invisible
    /// outside the parent.
    pub fn merge_up(&mut self, child: Span, parent: Span) {
        let child_mods = match self.map.get(&child) {
            Some(info) => info.modifiable.clone(),
            None => return,
        };
        let parent_info = self.ensure(parent);
        for entry in child_mods {
            if entry.owner == Some(parent) {
                continue;
            }
            if !parent_info.modifiable.contains(&entry) {
                parent_info.modifiable.push(entry);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(line: u32) -> Span {
        Span::new(line, 1, 1)
    }

    #[test]
    fn record_write_deduplicates() {
        let mut info = FunctionInfo::default();
        info.record_write(None, "x");
        info.record_write(None, "x");
        info.record_write(Some(span(3)), "x");
        assert_eq!(info.modifiable.len(), 2);
    }

    #[test]
    fn ensure_is_idempotent() {
        let mut effects = FunctionEffects::new();
        effects.ensure(span(1)).record_write(None, "a");
        effects.ensure(span(1)).record_write(None, "b");
        assert_eq!(effects.len(), 1);
        assert_eq!(effects.get(span(1)).unwrap().modifiable.len(), 2);
    }

    #[test]
    fn merge_up_propagates_outer_writes() {
        let mut effects = FunctionEffects::new();
        let outer = span(1);
        let inner = span(5);
        // Inner closure writes a top-level name and one of outer's locals.
        effects.ensure(inner).record_write(None, "global_counter");
        effects.ensure(inner).record_write(Some(outer), "accum");

        effects.merge_up(inner, outer);

        let summary = effects.get(outer).unwrap();
        assert!(summary.modifiable.contains(&Modifiable {
            owner: None,
            name: "global_counter".into()
        }));
        // Writes to outer's own locals are invisible outside outer.
        assert!(!summary
            .modifiable
            .iter()
            .any(|m| m.name == "accum"));
    }

    #[test]
    fn merge_up_without_child_summary_is_a_noop() {
        let mut effects = FunctionEffects::new();
        effects.merge_up(span(9), span(1));
        assert!(effects.get(span(1)).is_none());
        assert!(effects.is_empty());
    }
}

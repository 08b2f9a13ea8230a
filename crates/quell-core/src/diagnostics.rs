//! Diagnostic reporting for analysis results.
//!
//! Every finding the analyzer can produce is declared here as a [`DiagKind`]
//! with a stable numeric id, a short text id and a default severity. The
//! analyzer never aborts on its own findings; an [`Severity::Error`]
//! diagnostic is what the hosting compiler treats as fatal.
//!
//! Findings can be silenced from source comments:
//! - `// -w206` or `// -self-assignment` at the end of a line silences that
//!   diagnostic on that line;
//! - `// -file:w206` (or the text-id form) anywhere silences it file-wide.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Hint,
}

impl Severity {
    /// One-letter prefix used in suppression codes (`w206`, `h204`, `e101`).
    #[must_use]
    pub fn code_char(self) -> char {
        match self {
            Severity::Error => 'e',
            Severity::Warning => 'w',
            Severity::Hint => 'h',
        }
    }
}

/// Every diagnostic the analyzer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagKind {
    PotentiallyNulled,
    PossiblyUninitialized,
    DeclaredNeverUsed,
    AssignedNeverUsed,
    UnreachableCode,
    SelfAssignment,
    SameOperands,
    DuplicateCase,
    DuplicateIfCondition,
    DuplicateIfBranches,
    DuplicateFunction,
    SimilarFunction,
    DuplicateRequire,
    ForbiddenFunction,
    BoolPrefixMismatch,
    AlwaysTrueOrFalse,
    NullCoalesceConstant,
    DuplicateLoopCondition,
}

impl DiagKind {
    #[must_use]
    pub fn id(self) -> u16 {
        match self {
            DiagKind::PotentiallyNulled => 201,
            DiagKind::PossiblyUninitialized => 202,
            DiagKind::DeclaredNeverUsed => 203,
            DiagKind::AssignedNeverUsed => 204,
            DiagKind::UnreachableCode => 205,
            DiagKind::SelfAssignment => 206,
            DiagKind::SameOperands => 207,
            DiagKind::DuplicateCase => 208,
            DiagKind::DuplicateIfCondition => 209,
            DiagKind::DuplicateIfBranches => 210,
            DiagKind::DuplicateFunction => 211,
            DiagKind::SimilarFunction => 212,
            DiagKind::DuplicateRequire => 213,
            DiagKind::ForbiddenFunction => 214,
            DiagKind::BoolPrefixMismatch => 215,
            DiagKind::AlwaysTrueOrFalse => 216,
            DiagKind::NullCoalesceConstant => 217,
            DiagKind::DuplicateLoopCondition => 218,
        }
    }

    #[must_use]
    pub fn text_id(self) -> &'static str {
        match self {
            DiagKind::PotentiallyNulled => "potentially-nulled",
            DiagKind::PossiblyUninitialized => "possibly-uninitialized",
            DiagKind::DeclaredNeverUsed => "declared-never-used",
            DiagKind::AssignedNeverUsed => "assigned-never-used",
            DiagKind::UnreachableCode => "unreachable-code",
            DiagKind::SelfAssignment => "self-assignment",
            DiagKind::SameOperands => "same-operands",
            DiagKind::DuplicateCase => "duplicate-case",
            DiagKind::DuplicateIfCondition => "duplicate-if-condition",
            DiagKind::DuplicateIfBranches => "duplicate-if-branches",
            DiagKind::DuplicateFunction => "duplicate-function",
            DiagKind::SimilarFunction => "similar-function",
            DiagKind::DuplicateRequire => "duplicate-require",
            DiagKind::ForbiddenFunction => "forbidden-function",
            DiagKind::BoolPrefixMismatch => "bool-prefix-mismatch",
            DiagKind::AlwaysTrueOrFalse => "always-true-or-false",
            DiagKind::NullCoalesceConstant => "null-coalesce-constant",
            DiagKind::DuplicateLoopCondition => "duplicate-loop-condition",
        }
    }

    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            DiagKind::AssignedNeverUsed
            | DiagKind::SimilarFunction
            | DiagKind::BoolPrefixMismatch
            | DiagKind::NullCoalesceConstant => Severity::Hint,
            _ => Severity::Warning,
        }
    }

    /// Suppression code of the `-w206` form.
    #[must_use]
    pub fn code(self) -> String {
        format!("{}{}", self.severity().code_char(), self.id())
    }
}

/// A single finding, ready for the host compiler's diagnostic sink.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagKind,
    pub id: u16,
    pub text_id: &'static str,
    pub severity: Severity,
    pub line: u32,
    pub col: u32,
    pub width: u32,
    pub message: String,
    /// Secondary location (the earlier duplicate, the other function...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub see_also: Option<Span>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            id: kind.id(),
            text_id: kind.text_id(),
            severity: kind.severity(),
            line: span.line,
            col: span.col,
            width: span.width,
            message: message.into(),
            see_also: None,
        }
    }

    #[must_use]
    pub fn with_see_also(mut self, span: Span) -> Self {
        self.see_also = Some(span);
        self
    }
}

/// Per-line and file-wide suppression directives scanned out of source text.
#[derive(Debug, Clone, Default)]
pub struct Suppressions {
    by_line: HashMap<u32, HashSet<String>>,
    file_wide: HashSet<String>,
}

impl Suppressions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan source for `-wNNN` / `-text-id` / `-file:` comment directives.
    #[must_use]
    pub fn from_source(source: &str) -> Self {
        let mut out = Self::new();

        for (idx, line) in source.lines().enumerate() {
            let line_num = (idx + 1) as u32;
            let Some(comment) = comment_text(line) else {
                continue;
            };

            for token in comment.split_whitespace() {
                let Some(directive) = token.strip_prefix('-') else {
                    continue;
                };
                if let Some(code) = directive.strip_prefix("file:") {
                    if is_suppression_code(code) {
                        out.file_wide.insert(code.to_string());
                    }
                } else if is_suppression_code(directive) {
                    out.by_line
                        .entry(line_num)
                        .or_default()
                        .insert(directive.to_string());
                }
            }
        }

        out
    }

    pub fn add_line(&mut self, line: u32, code: &str) {
        self.by_line.entry(line).or_default().insert(code.to_string());
    }

    pub fn add_file_wide(&mut self, code: &str) {
        self.file_wide.insert(code.to_string());
    }

    #[must_use]
    pub fn is_suppressed(&self, kind: DiagKind, line: u32) -> bool {
        let code = kind.code();
        let text = kind.text_id();
        if self.file_wide.contains(&code) || self.file_wide.contains(text) {
            return true;
        }
        self.by_line
            .get(&line)
            .is_some_and(|set| set.contains(&code) || set.contains(text))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_line.is_empty() && self.file_wide.is_empty()
    }
}

fn comment_text(line: &str) -> Option<&str> {
    let slash = line.find("//");
    let hash = line.find('#');
    match (slash, hash) {
        (Some(s), Some(h)) if h < s => Some(line[h + 1..].trim()),
        (Some(s), _) => Some(line[s + 2..].trim()),
        (None, Some(h)) => Some(line[h + 1..].trim()),
        (None, None) => None,
    }
}

/// A directive is either a severity-char + numeric id, or a known text id
/// (lowercase words joined with '-').
fn is_suppression_code(code: &str) -> bool {
    let mut chars = code.chars();
    if let (Some(first), rest) = (chars.next(), chars.as_str()) {
        if matches!(first, 'e' | 'w' | 'h') && !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
            return true;
        }
    }
    !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Collects diagnostics during a traversal, filtering suppressed lines.
///
/// The checker mutes the sink wholesale during the effects-gathering pass
/// over loop bodies; mute calls nest.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    suppressions: Suppressions,
    mute_depth: u32,
}

impl DiagnosticSink {
    #[must_use]
    pub fn new(suppressions: Suppressions) -> Self {
        Self {
            diagnostics: Vec::new(),
            suppressions,
            mute_depth: 0,
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if self.mute_depth > 0 {
            return;
        }
        if self
            .suppressions
            .is_suppressed(diagnostic.kind, diagnostic.line)
        {
            tracing::debug!(
                id = diagnostic.id,
                line = diagnostic.line,
                "diagnostic suppressed by comment directive"
            );
            return;
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn mute(&mut self) {
        self.mute_depth += 1;
    }

    pub fn unmute(&mut self) {
        debug_assert!(self.mute_depth > 0, "unbalanced sink unmute");
        self.mute_depth = self.mute_depth.saturating_sub(1);
    }

    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.mute_depth > 0
    }

    #[must_use]
    pub fn into_diagnostics(mut self) -> Vec<Diagnostic> {
        self.diagnostics
            .sort_by_key(|d| (d.line, d.col, d.id));
        self.diagnostics
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

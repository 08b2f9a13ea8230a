//! Static semantic analysis for Quell source, as run by the compiler front
//! end after parsing.
//!
//! The analyzer interprets a module's AST abstractly: it tracks what is
//! known about every reachable variable (assigned or not, nullable or not,
//! which expression it currently holds), forks that state at every branch,
//! and reconciles it where control flow rejoins. Findings come out as
//! [`Diagnostic`] values with stable numeric ids; none of them stop
//! compilation by themselves.
//!
//! ```
//! use quell_core::ast::build::*;
//! use quell_core::ast::Module;
//! use quell_core::{AnalyzerConfig, analyze};
//!
//! // local x = null; x.frob()
//! let module = Module::new(vec![
//!     local("x", null()),
//!     expr_stmt(call(field(ident("x"), "frob"), vec![])),
//! ]);
//! let diags = analyze(&module, &AnalyzerConfig::default(), None, &[]);
//! assert_eq!(diags[0].id, 201);
//! ```

pub mod analysis;
pub mod ast;
pub mod config;
pub mod diagnostics;

pub use analysis::{CheckerVisitor, analyze};
pub use config::{AnalyzerConfig, ConfigError, ConfigResult, find_config_file};
pub use diagnostics::{DiagKind, Diagnostic, Severity, Suppressions};

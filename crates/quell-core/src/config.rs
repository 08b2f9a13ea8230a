//! Analyzer configuration.
//!
//! The naming-heuristic word lists and similarity thresholds are an explicit
//! value handed to the analyzer, never process-wide state, so independent
//! runs cannot interfere. Two load paths exist: the compiler driver feeds the
//! legacy `key = a, b, c` plain-text format, tooling hosts load
//! `quell-analyzer.toml`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

pub const CONFIG_FILENAME: &str = "quell-analyzer.toml";

const KNOWN_KEYS: &[&str] = &[
    "boolean_prefixes",
    "forbidden_functions",
    "mod_functions",
    "require_functions",
    "similar_min_complexity",
    "similar_max_diff_percent",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TOML in '{path}': {message}")]
    ParseError { path: PathBuf, message: String },
    #[error("Line {line}: expected 'key = value' but found '{text}'")]
    MalformedLine { line: usize, text: String },
}

#[derive(Debug, Clone, Default)]
pub struct ConfigResult {
    pub config: AnalyzerConfig,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Name prefixes implying a boolean-returning function (`isEmpty`,
    /// `hasChildren`).
    pub boolean_prefixes: Vec<String>,
    /// Functions that must not be called at all.
    pub forbidden_functions: Vec<String>,
    /// Methods that mutate their receiver; calling one through a tracked
    /// value invalidates that value's known expression.
    pub mod_functions: Vec<String>,
    /// `require`-like functions that must not see the same string argument
    /// twice in one file.
    pub require_functions: Vec<String>,
    /// Minimum complexity score before two near-identical functions are
    /// reported as similar.
    pub similar_min_complexity: u32,
    /// Similarity cutoff: max edit cost as a percentage of the smaller
    /// body's complexity.
    pub similar_max_diff_percent: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            boolean_prefixes: ["is", "has", "can", "should", "need", "was"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            forbidden_functions: Vec::new(),
            mod_functions: [
                "append", "extend", "insert", "remove", "clear", "sort", "push", "pop", "resize",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            require_functions: ["require", "require_optional"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            similar_min_complexity: 32,
            similar_max_diff_percent: 10,
        }
    }
}

impl AnalyzerConfig {
    /// Parse the plain `key = a, b, c` list format. Unknown keys are kept as
    /// warnings rather than errors so older drivers keep working against
    /// newer word lists.
    pub fn from_text(text: &str) -> Result<ConfigResult, ConfigError> {
        let mut config = AnalyzerConfig::default();
        let mut warnings = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::MalformedLine {
                    line: idx + 1,
                    text: raw.trim().to_string(),
                });
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "boolean_prefixes" => config.boolean_prefixes = parse_list(value),
                "forbidden_functions" => config.forbidden_functions = parse_list(value),
                "mod_functions" => config.mod_functions = parse_list(value),
                "require_functions" => config.require_functions = parse_list(value),
                "similar_min_complexity" => {
                    config.similar_min_complexity = parse_number(value, idx + 1, raw)?;
                }
                "similar_max_diff_percent" => {
                    config.similar_max_diff_percent = parse_number(value, idx + 1, raw)?;
                }
                other => warnings.push(format!("Unknown configuration key: '{other}'")),
            }
        }

        Ok(ConfigResult { config, warnings })
    }

    pub fn load_toml(path: &Path) -> Result<ConfigResult, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: AnalyzerConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.message().to_string(),
            })?;

        let warnings = detect_unknown_keys(&content);
        Ok(ConfigResult { config, warnings })
    }

    /// Regex matching names that promise a boolean result: a configured
    /// prefix followed by an uppercase letter, underscore or nothing.
    #[must_use]
    pub fn boolean_name_pattern(&self) -> Option<Regex> {
        if self.boolean_prefixes.is_empty() {
            return None;
        }
        let alternatives = self
            .boolean_prefixes
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!("^(?:{alternatives})(?:[A-Z_].*)?$")).ok()
    }

    #[must_use]
    pub fn is_forbidden_function(&self, name: &str) -> bool {
        self.forbidden_functions.iter().any(|f| f == name)
    }

    #[must_use]
    pub fn is_mod_function(&self, name: &str) -> bool {
        self.mod_functions.iter().any(|f| f == name)
    }

    #[must_use]
    pub fn is_require_function(&self, name: &str) -> bool {
        self.require_functions.iter().any(|f| f == name)
    }
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if !current.pop() {
            return None;
        }
    }
}

fn strip_comment(line: &str) -> &str {
    match (line.find('#'), line.find(';')) {
        (Some(a), Some(b)) => &line[..a.min(b)],
        (Some(a), None) | (None, Some(a)) => &line[..a],
        (None, None) => line,
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_number(value: &str, line: usize, raw: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::MalformedLine {
        line,
        text: raw.trim().to_string(),
    })
}

fn detect_unknown_keys(content: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    let table: toml::Table = match content.parse() {
        Ok(t) => t,
        Err(_) => return warnings,
    };

    let known: HashSet<&str> = KNOWN_KEYS.iter().copied().collect();
    for key in table.keys() {
        if !known.contains(key.as_str()) {
            warnings.push(format!("Unknown configuration key: '{key}'"));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_word_lists_are_populated() {
        let config = AnalyzerConfig::default();
        assert!(config.boolean_prefixes.contains(&"is".to_string()));
        assert!(config.is_require_function("require"));
        assert!(config.is_mod_function("append"));
        assert!(!config.is_forbidden_function("anything"));
    }

    #[test]
    fn plain_text_format_overrides_lists() {
        let text = "\
forbidden_functions = dofile, loadstring
boolean_prefixes = is, has
similar_min_complexity = 50
";
        let result = AnalyzerConfig::from_text(text).unwrap();
        assert!(result.warnings.is_empty());
        assert!(result.config.is_forbidden_function("dofile"));
        assert_eq!(result.config.boolean_prefixes, vec!["is", "has"]);
        assert_eq!(result.config.similar_min_complexity, 50);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let text = "\
# word lists
forbidden_functions = dofile   # legacy loader

; alt comment style
";
        let result = AnalyzerConfig::from_text(text).unwrap();
        assert_eq!(result.config.forbidden_functions, vec!["dofile"]);
    }

    #[test]
    fn unknown_key_becomes_warning() {
        let result = AnalyzerConfig::from_text("no_such_key = 1\n").unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("no_such_key"));
    }

    #[test]
    fn malformed_line_is_an_error() {
        let err = AnalyzerConfig::from_text("not a key value pair\n").unwrap_err();
        assert!(matches!(err, ConfigError::MalformedLine { line: 1, .. }));
    }

    #[test]
    fn bad_number_is_an_error() {
        let err = AnalyzerConfig::from_text("similar_min_complexity = lots\n").unwrap_err();
        assert!(matches!(err, ConfigError::MalformedLine { .. }));
    }

    #[test]
    fn boolean_name_pattern_matches_prefixes() {
        let config = AnalyzerConfig::default();
        let pattern = config.boolean_name_pattern().unwrap();
        assert!(pattern.is_match("isEmpty"));
        assert!(pattern.is_match("is"));
        assert!(pattern.is_match("has_children"));
        assert!(!pattern.is_match("isolate"));
        assert!(!pattern.is_match("display"));
    }

    #[test]
    fn toml_config_loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "forbidden_functions = [\"dofile\"]\nsimilar_max_diff_percent = 15"
        )
        .unwrap();

        let result = AnalyzerConfig::load_toml(file.path()).unwrap();
        assert!(result.config.is_forbidden_function("dofile"));
        assert_eq!(result.config.similar_max_diff_percent, 15);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn toml_unknown_key_warns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mystery = 3").unwrap();

        let result = AnalyzerConfig::load_toml(file.path()).unwrap();
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = AnalyzerConfig::load_toml(Path::new("/nonexistent/quell.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}

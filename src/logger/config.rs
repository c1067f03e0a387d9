//! Logger options
//!
//! Options are plain data so they can come from code or from a TOML file:
//!
//! ```toml
//! default_log_level = "warn"
//! use_groups = false
//!
//! [prefixes]
//! precall = "-> "
//!
//! [[level_rules]]
//! classes = "/^App\\.store\\./"
//! level = "debug"
//!
//! [[log_calls]]
//! classes = "App.Main"
//! methods = ["launch", "onReady"]
//! mode = "calls"
//! time_calls = false
//! ```

use super::level::LogLevel;
use crate::selector::Selector;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Literal prefix of each output kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefixes {
    pub debug: String,
    pub log: String,
    pub info: String,
    pub warn: String,
    pub error: String,
    pub fatal: String,
    pub precall: String,
    pub postcall: String,
    pub exception: String,
}

impl Default for Prefixes {
    fn default() -> Self {
        Self {
            debug: "[DBG] ".to_string(),
            log: "[LOG] ".to_string(),
            info: "[INF] ".to_string(),
            warn: "[WRN] ".to_string(),
            error: "[ERR] ".to_string(),
            fatal: "[FTL] ".to_string(),
            precall: "=> ".to_string(),
            postcall: "<= ".to_string(),
            exception: "[EXC] ".to_string(),
        }
    }
}

impl Prefixes {
    pub fn for_level(&self, level: LogLevel) -> &str {
        match level {
            LogLevel::Debug => &self.debug,
            LogLevel::Log => &self.log,
            LogLevel::Info => &self.info,
            LogLevel::Warn => &self.warn,
            LogLevel::Error => &self.error,
            LogLevel::Fatal => &self.fatal,
            LogLevel::PreCall => &self.precall,
            LogLevel::PostCall => &self.postcall,
            LogLevel::Exception => &self.exception,
            LogLevel::None => "",
        }
    }
}

/// Built-in output renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Emit `tracing` events (nested spans when grouping)
    #[default]
    Tracing,
    /// Discard everything
    Silent,
}

/// Which trace events a call rule injects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lower")]
pub enum TraceMode {
    /// pre-call, post-call and exception events
    #[default]
    Calls,
    /// pre-call events only
    PreCalls,
    /// post-call and exception events only
    PostCalls,
}

/// `[[level_rules]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct LevelRuleConfig {
    #[serde(default)]
    pub classes: Selector,
    pub level: LogLevel,
}

/// `[[log_calls]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct CallRuleConfig {
    #[serde(default)]
    pub classes: Selector,
    #[serde(default)]
    pub methods: Selector,
    #[serde(default)]
    pub mode: TraceMode,
    #[serde(default = "default_time_calls")]
    pub time_calls: bool,
}

fn default_time_calls() -> bool {
    true
}

/// Options recognised by `Logger::init`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerOptions {
    /// Level of classes no level rule selects
    pub default_log_level: LogLevel,
    /// Ask the renderer to group nested calls
    pub use_groups: bool,
    /// Track and show call depth; `false` also disables `use_groups`
    pub show_depth: bool,
    /// Show the severity prefix on manual log calls
    pub show_level: bool,
    pub renderer: RendererKind,
    pub prefixes: Prefixes,
    pub level_rules: Vec<LevelRuleConfig>,
    pub log_calls: Vec<CallRuleConfig>,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            default_log_level: LogLevel::Warn,
            use_groups: true,
            show_depth: true,
            show_level: true,
            renderer: RendererKind::default(),
            prefixes: Prefixes::default(),
            level_rules: Vec::new(),
            log_calls: Vec::new(),
        }
    }
}

impl LoggerOptions {
    /// Load options from a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read logger options: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let options: LoggerOptions =
            toml::from_str(content).context("Failed to parse TOML logger options")?;
        Ok(options.normalized())
    }

    /// Apply option dependencies (`show_depth = false` disables groups)
    pub fn normalized(mut self) -> Self {
        if !self.show_depth {
            self.use_groups = false;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::Matcher;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let options = LoggerOptions::default();
        assert_eq!(options.default_log_level, LogLevel::Warn);
        assert!(options.use_groups);
        assert!(options.show_depth);
        assert!(options.show_level);
        assert_eq!(options.renderer, RendererKind::Tracing);
        assert_eq!(options.prefixes.precall, "=> ");
        assert_eq!(options.prefixes.for_level(LogLevel::Fatal), "[FTL] ");
        assert_eq!(options.prefixes.for_level(LogLevel::Exception), "[EXC] ");
    }

    #[test]
    fn test_show_depth_false_disables_groups() {
        let options = LoggerOptions::from_toml_str("show_depth = false").unwrap();
        assert!(!options.show_depth);
        assert!(!options.use_groups);
    }

    #[test]
    fn test_partial_prefixes_keep_defaults() {
        let options = LoggerOptions::from_toml_str("[prefixes]\nprecall = \"-> \"").unwrap();
        assert_eq!(options.prefixes.precall, "-> ");
        assert_eq!(options.prefixes.postcall, "<= ");
    }

    #[test]
    fn test_rules_from_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            r#"
default_log_level = "INFO"
renderer = "silent"

[[level_rules]]
classes = "/^App\\./"
level = "debug"

[[log_calls]]
classes = ["App.Main"]
mode = "postcalls"
time_calls = false
"#
        )?;

        let options = LoggerOptions::from_toml(file.path())?;
        assert_eq!(options.default_log_level, LogLevel::Info);
        assert_eq!(options.renderer, RendererKind::Silent);
        assert_eq!(options.level_rules.len(), 1);
        assert!(Matcher::compile(options.level_rules[0].classes.clone()).matches("App.X"));

        let call_rule = &options.log_calls[0];
        assert_eq!(call_rule.mode, TraceMode::PostCalls);
        assert!(!call_rule.time_calls);
        assert!(Matcher::compile(call_rule.methods.clone()).matches("anything"));
        Ok(())
    }

    #[test]
    fn test_invalid_selector_in_file_is_rejected() {
        let err = LoggerOptions::from_toml_str("[[level_rules]]\nclasses = 12\nlevel = \"info\"")
            .unwrap_err();
        assert!(format!("{:#}", err).contains("invalid selector kind"));
    }

    #[test]
    fn test_missing_file() {
        let err = LoggerOptions::from_toml("/nonexistent/weavelog.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read logger options"));
    }
}

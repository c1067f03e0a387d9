//! Logging levels and class-level rules
//!
//! Effective level of a class = the configured default, overwritten by every
//! matching rule in registration order. The *last* matching rule wins, so
//! broad rules go first and are refined by narrower ones registered later.

use crate::selector::{Matcher, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Totally ordered logging level
///
/// The six severities gate manual log calls. `PreCall`, `PostCall` and
/// `Exception` name the trace events and `None` silences everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum LogLevel {
    Debug,
    Log,
    Info,
    Warn,
    Error,
    Fatal,
    PreCall,
    PostCall,
    Exception,
    None,
}

impl LogLevel {
    /// Levels with a manual logging method, in ascending order
    pub const SEVERITIES: [LogLevel; 6] = [
        LogLevel::Debug,
        LogLevel::Log,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Log => "log",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
            LogLevel::PreCall => "precall",
            LogLevel::PostCall => "postcall",
            LogLevel::Exception => "exception",
            LogLevel::None => "none",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "log" => Ok(LogLevel::Log),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            "precall" => Ok(LogLevel::PreCall),
            "postcall" => Ok(LogLevel::PostCall),
            "exception" => Ok(LogLevel::Exception),
            "none" => Ok(LogLevel::None),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, String> {
        s.parse()
    }
}

/// Minimum level for the classes selected by `classes`
#[derive(Debug, Clone)]
pub struct LevelRule {
    pub classes: Matcher,
    pub level: LogLevel,
}

/// Ordered list of level rules
#[derive(Debug, Clone, Default)]
pub struct LevelRules {
    rules: Vec<LevelRule>,
}

impl LevelRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, classes: impl Into<Selector>, level: LogLevel) {
        self.rules.push(LevelRule {
            classes: Matcher::compile(classes),
            level,
        });
    }

    /// Effective level for `class_name`: last matching rule, else `default`
    pub fn resolve(&self, class_name: &str, default: LogLevel) -> LogLevel {
        self.rules.iter().fold(default, |level, rule| {
            if rule.classes.matches(class_name) {
                rule.level
            } else {
                level
            }
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_levels_are_ordered() {
        assert!(LogLevel::Debug < LogLevel::Log);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Fatal < LogLevel::PreCall);
        assert!(LogLevel::Exception < LogLevel::None);
        let mut sorted = LogLevel::SEVERITIES;
        sorted.sort();
        assert_eq!(sorted, LogLevel::SEVERITIES);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("PreCall".parse::<LogLevel>(), Ok(LogLevel::PreCall));
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::PostCall.to_string(), "postcall");
    }

    #[test]
    fn test_deserialize_from_any_case() {
        assert_eq!(LogLevel::try_from("Info".to_string()), Ok(LogLevel::Info));
        let level: LogLevel = serde_json::from_str("\"DEBUG\"").unwrap();
        assert_eq!(level, LogLevel::Debug);
        assert!(serde_json::from_str::<LogLevel>("\"loud\"").is_err());
    }

    #[test]
    fn test_last_matching_rule_wins() {
        let mut rules = LevelRules::new();
        rules.push(Regex::new("^Fo").unwrap(), LogLevel::Info);
        rules.push(Regex::new("oo$").unwrap(), LogLevel::Debug);

        assert_eq!(rules.resolve("Foo", LogLevel::Warn), LogLevel::Debug);
        assert_eq!(rules.resolve("Fob", LogLevel::Warn), LogLevel::Info);
        assert_eq!(rules.resolve("Bar", LogLevel::Warn), LogLevel::Warn);
    }

    #[test]
    fn test_later_broad_rule_overrides_narrow_rule() {
        let mut rules = LevelRules::new();
        rules.push("App.Store", LogLevel::Debug);
        rules.push(true, LogLevel::Error);
        assert_eq!(rules.resolve("App.Store", LogLevel::Warn), LogLevel::Error);
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_no_rules_uses_default() {
        let rules = LevelRules::new();
        assert!(rules.is_empty());
        assert_eq!(rules.resolve("Any", LogLevel::Fatal), LogLevel::Fatal);
    }
}

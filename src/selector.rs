//! Class/method selectors and their compiled matchers
//!
//! Every rule in the interceptor and every level rule in the logger selects
//! names with a [`Selector`]:
//! - `Selector::Any` (undefined/null) and `true` match every name
//! - `false` matches nothing
//! - a name or list of names matches exactly, `.` namespace separators included
//! - a regular expression matches by (unanchored) search
//!
//! Selectors are compiled once into a [`Matcher`] when a rule is registered.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashSet;

/// User-supplied description of a set of class or method names
#[derive(Debug, Clone, Default)]
pub enum Selector {
    /// No selector given: matches everything
    #[default]
    Any,
    /// `true` matches everything, `false` matches nothing
    Bool(bool),
    /// Exactly one literal name
    Name(String),
    /// Any of a list of literal names
    Names(Vec<String>),
    /// Regular expression searched in the name
    Pattern(Regex),
}

impl Selector {
    /// Parse a textual selector: `/re/` is a pattern, anything else is a literal name
    pub fn parse(text: &str) -> Result<Self> {
        match pattern_body(text) {
            Some(body) => compile_pattern(body).map(Selector::Pattern),
            None => Ok(Selector::Name(text.to_string())),
        }
    }
}

/// Returns the body of a `/.../` pattern literal
fn pattern_body(text: &str) -> Option<&str> {
    if text.len() >= 2 && text.starts_with('/') && text.ends_with('/') {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

fn compile_pattern(body: &str) -> Result<Regex> {
    Regex::new(body).map_err(|e| Error::InvalidPattern {
        pattern: body.to_string(),
        reason: e.to_string(),
    })
}

impl From<bool> for Selector {
    fn from(value: bool) -> Self {
        Selector::Bool(value)
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::Name(name.to_string())
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::Name(name)
    }
}

impl From<&String> for Selector {
    fn from(name: &String) -> Self {
        Selector::Name(name.clone())
    }
}

impl From<Vec<String>> for Selector {
    fn from(names: Vec<String>) -> Self {
        Selector::Names(names)
    }
}

impl From<Vec<&str>> for Selector {
    fn from(names: Vec<&str>) -> Self {
        Selector::Names(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Selector {
    fn from(names: &[&str]) -> Self {
        Selector::Names(names.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Selector {
    fn from(names: [&str; N]) -> Self {
        Selector::Names(names.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Regex> for Selector {
    fn from(pattern: Regex) -> Self {
        Selector::Pattern(pattern)
    }
}

impl<T: Into<Selector>> From<Option<T>> for Selector {
    fn from(value: Option<T>) -> Self {
        value.map_or(Selector::Any, Into::into)
    }
}

impl TryFrom<&Value> for Selector {
    type Error = Error;

    /// Dynamic selector, as found in JSON or TOML configuration
    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Selector::Any),
            Value::Bool(b) => Ok(Selector::Bool(*b)),
            Value::String(s) => Selector::parse(s),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(Error::InvalidSelectorKind(format!("list element {}", other))),
                })
                .collect::<Result<Vec<_>>>()
                .map(Selector::Names),
            Value::Number(n) => Err(Error::InvalidSelectorKind(format!("number {}", n))),
            Value::Object(_) => Err(Error::InvalidSelectorKind("object".to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Selector::try_from(&value).map_err(serde::de::Error::custom)
    }
}

/// Compiled, canonical form of a [`Selector`]
#[derive(Debug, Clone)]
pub enum Matcher {
    All,
    Nothing,
    Exact(HashSet<String>),
    Pattern(Regex),
}

impl Matcher {
    /// Compile a selector. Pure; patterns are passed through unchanged.
    pub fn compile(selector: impl Into<Selector>) -> Self {
        match selector.into() {
            Selector::Any | Selector::Bool(true) => Matcher::All,
            Selector::Bool(false) => Matcher::Nothing,
            Selector::Name(name) => Matcher::Exact(HashSet::from([name])),
            Selector::Names(names) => Matcher::Exact(names.into_iter().collect()),
            Selector::Pattern(re) => Matcher::Pattern(re),
        }
    }

    /// Check if a class or method name is selected
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Nothing => false,
            Matcher::Exact(names) => names.contains(name),
            Matcher::Pattern(re) => re.is_match(name),
        }
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Matcher::All, Matcher::All) | (Matcher::Nothing, Matcher::Nothing) => true,
            (Matcher::Exact(a), Matcher::Exact(b)) => a == b,
            (Matcher::Pattern(a), Matcher::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

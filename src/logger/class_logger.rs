//! Per-class logger
//!
//! Built at most once per class name. The class level is resolved when the
//! logger is built and each severity method is fixed, right then, to either
//! a no-op or a delegation to the renderer; later level rules do not affect
//! an existing logger.

use super::config::Prefixes;
use super::level::LogLevel;
use super::renderer::Renderer;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub struct ClassLogger {
    class_name: String,
    level: LogLevel,
    /// One flag per entry of `LogLevel::SEVERITIES`
    enabled: [bool; 6],
    prefixes: Prefixes,
    renderer: Arc<dyn Renderer>,
}

impl ClassLogger {
    pub fn new(
        class_name: &str,
        level: LogLevel,
        prefixes: Prefixes,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            class_name: class_name.to_string(),
            level,
            enabled: LogLevel::SEVERITIES.map(|severity| severity >= level),
            prefixes,
            renderer,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Level resolved when this logger was built
    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn prefixes(&self) -> &Prefixes {
        &self.prefixes
    }

    /// Whether the manual logging method for `severity` emits anything
    pub fn is_enabled(&self, severity: LogLevel) -> bool {
        LogLevel::SEVERITIES
            .iter()
            .position(|&s| s == severity)
            .is_some_and(|i| self.enabled[i])
    }

    fn emit(&self, index: usize, args: &[Value]) {
        if self.enabled[index] {
            let level = LogLevel::SEVERITIES[index];
            self.renderer
                .message(level, self.prefixes.for_level(level), &self.class_name, args);
        }
    }

    pub fn debug(&self, args: &[Value]) {
        self.emit(0, args);
    }

    pub fn log(&self, args: &[Value]) {
        self.emit(1, args);
    }

    pub fn info(&self, args: &[Value]) {
        self.emit(2, args);
    }

    pub fn warn(&self, args: &[Value]) {
        self.emit(3, args);
    }

    pub fn error(&self, args: &[Value]) {
        self.emit(4, args);
    }

    pub fn fatal(&self, args: &[Value]) {
        self.emit(5, args);
    }

    /// Log `msg` as an error and return it as an error for the caller to raise
    pub fn throwex(&self, msg: &str) -> anyhow::Error {
        self.error(&[Value::String(msg.to_string())]);
        anyhow::anyhow!(msg.to_string())
    }

    pub fn watch(&self, call_name: &str, description: &str) {
        self.renderer.watch(call_name, description);
    }

    pub fn precall(&self, depth: usize, label: &str, args: &[Value]) {
        self.renderer.precall(depth, label, args);
    }

    pub fn postcall(
        &self,
        depth: usize,
        label: &str,
        elapsed: Option<Duration>,
        result: &Value,
        args: &[Value],
    ) {
        self.renderer.postcall(depth, label, elapsed, result, args);
    }

    pub fn exception(&self, depth: usize, label: &str, elapsed: Option<Duration>, error: &anyhow::Error) {
        self.renderer.exception(depth, label, elapsed, error);
    }

    pub fn callbegin(&self, label: &str) {
        self.renderer.callbegin(label);
    }

    pub fn callend(&self) {
        self.renderer.callend();
    }
}

impl fmt::Debug for ClassLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassLogger")
            .field("class_name", &self.class_name)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

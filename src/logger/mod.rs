//! Call-tracing and leveled logging on top of the interceptor
//!
//! [`Logger::log_calls`] and its pre/post variants register interception
//! rules whose transforms wrap each selected method with depth-aware trace
//! events. Leveled messages go through per-class [`ClassLogger`]s whose level
//! is resolved from [`LevelRules`] when the class logger is first built.
//!
//! ```no_run
//! use std::sync::Arc;
//! use weavelog::{ClassBody, ClassManager, Interceptor, Logger, LoggerOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! let logger = Logger::new(Arc::new(Interceptor::new()));
//! logger.init(LoggerOptions::default())?;
//!
//! let classes = ClassManager::new();
//! logger.attach(&classes);
//! logger.log_calls("App.Store", true, false)?;
//! classes.define("App.Store", ClassBody::new().with_method("load", |_, _| Ok(1.into())))?;
//! # Ok(())
//! # }
//! ```

mod class_logger;
mod config;
pub mod depth;
mod level;
mod renderer;
mod trace;


pub use class_logger::ClassLogger;
pub use config::{CallRuleConfig, LevelRuleConfig, LoggerOptions, Prefixes, RendererKind, TraceMode};
pub use level::{LevelRule, LevelRules, LogLevel};
pub use renderer::{
    format_values, Renderer, RendererContext, RendererFactory, SilentRenderer, TracingRenderer,
    DEPTH_STR,
};

use crate::class::{ClassBody, ClassHook, ClassManager};
use crate::error::{Error, Result};
use crate::interceptor::Interceptor;
use crate::selector::Selector;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};
use trace::CallTracer;

static GLOBAL: OnceLock<Arc<Logger>> = OnceLock::new();

/// State that exists only between `init` and `reset`
struct LoggerState {
    options: LoggerOptions,
    factory: Arc<dyn RendererFactory>,
    level_rules: LevelRules,
    class_loggers: HashMap<String, Arc<ClassLogger>>,
}

pub struct Logger {
    interceptor: Arc<Interceptor>,
    state: RwLock<Option<LoggerState>>,
}

impl Logger {
    pub fn new(interceptor: Arc<Interceptor>) -> Arc<Self> {
        Arc::new(Self {
            interceptor,
            state: RwLock::new(None),
        })
    }

    /// Process-wide logger over [`Interceptor::global`]
    pub fn global() -> &'static Arc<Logger> {
        GLOBAL.get_or_init(|| Logger::new(Arc::clone(Interceptor::global())))
    }

    pub fn interceptor(&self) -> &Arc<Interceptor> {
        &self.interceptor
    }

    /// (Re)initialize with the renderer named by `options.renderer`
    ///
    /// Clears the interceptor's rules, the level rules and every cached class
    /// logger, then applies the rule lists carried by `options`.
    pub fn init(self: &Arc<Self>, options: LoggerOptions) -> Result<()> {
        let factory = options.renderer.factory();
        self.init_with_renderer(options, factory)
    }

    /// (Re)initialize with a custom renderer factory
    pub fn init_with_renderer(
        self: &Arc<Self>,
        options: LoggerOptions,
        factory: Arc<dyn RendererFactory>,
    ) -> Result<()> {
        self.interceptor.init();

        let options = options.normalized();
        let mut level_rules = LevelRules::new();
        for rule in &options.level_rules {
            level_rules.push(rule.classes.clone(), rule.level);
        }
        let call_rules = options.log_calls.clone();

        *self.write_state() = Some(LoggerState {
            options,
            factory,
            level_rules,
            class_loggers: HashMap::new(),
        });
        // default logger (empty class name)
        self.class_logger("")?;

        for rule in call_rules {
            self.trace_calls(rule.classes, rule.methods, rule.mode, rule.time_calls)?;
        }
        tracing::debug!("logger initialized");
        Ok(())
    }

    /// Forget all state; class loggers already handed out keep working
    pub fn reset(&self) {
        *self.write_state() = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.read_state().is_some()
    }

    /// Normalized options of the current initialization
    pub fn options(&self) -> Result<LoggerOptions> {
        self.with_state(|state| state.options.clone())
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, Option<LoggerState>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, Option<LoggerState>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_state<T>(&self, f: impl FnOnce(&LoggerState) -> T) -> Result<T> {
        self.read_state()
            .as_ref()
            .map(f)
            .ok_or(Error::LoggerNotInitialized)
    }

    /// Add a level rule; later matching rules override earlier ones
    pub fn set_class_log_level(&self, classes: impl Into<Selector>, level: LogLevel) -> Result<()> {
        self.write_state()
            .as_mut()
            .map(|state| state.level_rules.push(classes, level))
            .ok_or(Error::LoggerNotInitialized)
    }

    /// Effective level of `class_name` under the current rules
    pub fn class_log_level(&self, class_name: &str) -> Result<LogLevel> {
        self.with_state(|state| {
            state
                .level_rules
                .resolve(class_name, state.options.default_log_level)
        })
    }

    /// Logger of `class_name`, built on first request and cached
    pub fn class_logger(&self, class_name: &str) -> Result<Arc<ClassLogger>> {
        let (options, factory, level) = {
            let state = self.read_state();
            let state = state.as_ref().ok_or(Error::LoggerNotInitialized)?;
            if let Some(logger) = state.class_loggers.get(class_name) {
                return Ok(Arc::clone(logger));
            }
            let level = state
                .level_rules
                .resolve(class_name, state.options.default_log_level);
            (state.options.clone(), Arc::clone(&state.factory), level)
        };

        // built outside the lock so factories may call back into the logger
        let renderer = factory.create(&RendererContext {
            class_name,
            level,
            options: &options,
        });
        let built = Arc::new(ClassLogger::new(
            class_name,
            level,
            options.prefixes.clone(),
            renderer,
        ));

        let mut state = self.write_state();
        let state = state.as_mut().ok_or(Error::LoggerNotInitialized)?;
        let logger = state
            .class_loggers
            .entry(class_name.to_string())
            .or_insert(built);
        tracing::trace!(class = class_name, level = %logger.level(), "class logger created");
        Ok(Arc::clone(logger))
    }

    /// Register call tracing of the selected methods in `mode`
    pub fn trace_calls(
        self: &Arc<Self>,
        classes: impl Into<Selector>,
        methods: impl Into<Selector>,
        mode: TraceMode,
        time_calls: bool,
    ) -> Result<()> {
        if !self.is_initialized() {
            return Err(Error::LoggerNotInitialized);
        }
        let this = Arc::downgrade(self);
        self.interceptor.add_transform(
            classes,
            methods,
            move |site, method| {
                let logger = this.upgrade().ok_or(Error::LoggerNotInitialized)?;
                let class_logger = logger.class_logger(site.class_name)?;
                let options = logger.options()?;
                let tracer = CallTracer::new(class_logger, &options, site.class_name, site.method_name);
                Ok(tracer.wrap(mode, time_calls, method.clone()))
            },
            None,
        );
        Ok(())
    }

    /// Trace arguments before, and results or errors after, each selected call
    pub fn log_calls(
        self: &Arc<Self>,
        classes: impl Into<Selector>,
        methods: impl Into<Selector>,
        time_calls: bool,
    ) -> Result<()> {
        self.trace_calls(classes, methods, TraceMode::Calls, time_calls)
    }

    /// Trace arguments before each selected call
    pub fn log_pre_calls(
        self: &Arc<Self>,
        classes: impl Into<Selector>,
        methods: impl Into<Selector>,
    ) -> Result<()> {
        self.trace_calls(classes, methods, TraceMode::PreCalls, false)
    }

    /// Trace result and arguments in one record after each selected call
    ///
    /// Arguments are reported as they are after the call.
    pub fn log_post_calls(
        self: &Arc<Self>,
        classes: impl Into<Selector>,
        methods: impl Into<Selector>,
        time_calls: bool,
    ) -> Result<()> {
        self.trace_calls(classes, methods, TraceMode::PostCalls, time_calls)
    }

    fn default_logger(&self) -> Result<Arc<ClassLogger>> {
        self.class_logger("")
    }

    pub fn debug(&self, args: &[Value]) -> Result<()> {
        self.default_logger().map(|log| log.debug(args))
    }

    pub fn log(&self, args: &[Value]) -> Result<()> {
        self.default_logger().map(|log| log.log(args))
    }

    pub fn info(&self, args: &[Value]) -> Result<()> {
        self.default_logger().map(|log| log.info(args))
    }

    pub fn warn(&self, args: &[Value]) -> Result<()> {
        self.default_logger().map(|log| log.warn(args))
    }

    pub fn error(&self, args: &[Value]) -> Result<()> {
        self.default_logger().map(|log| log.error(args))
    }

    pub fn fatal(&self, args: &[Value]) -> Result<()> {
        self.default_logger().map(|log| log.fatal(args))
    }

    /// Log `msg` at error level and return it as an error to raise
    pub fn throwex(&self, msg: &str) -> Result<anyhow::Error> {
        self.default_logger().map(|log| log.throwex(msg))
    }

    /// Hook class declarations of `classes`
    ///
    /// Installs `log_methods` / `with_log()` handling, then the interceptor's
    /// weaver. Do not also attach the interceptor on its own.
    pub fn attach(self: &Arc<Self>, classes: &ClassManager) {
        classes.add_hook(Arc::new(ClassOptionsHook {
            logger: Arc::downgrade(self),
        }));
        self.interceptor.attach(classes);
    }
}

/// Applies the logging options a class body declares
struct ClassOptionsHook {
    logger: Weak<Logger>,
}

impl ClassHook for ClassOptionsHook {
    fn on_class_create(&self, class_name: &str, body: &mut ClassBody) -> Result<()> {
        let logger = self.logger.upgrade().ok_or(Error::LoggerNotInitialized)?;
        match body.log_methods() {
            None | Some(Selector::Bool(false)) => {}
            Some(methods) => logger.log_calls(class_name, methods.clone(), true)?,
        }
        if body.wants_log() {
            body.install_logger(logger.class_logger(class_name)?);
        }
        Ok(())
    }
}

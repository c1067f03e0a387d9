//! Weavelog - rule-based method interception and call tracing
//!
//! This library weaves cross-cutting behaviour into classes at declaration
//! time: interception rules select classes and methods by name, list or
//! pattern and replace each selected method with a composed wrapper. On top
//! of that it provides call-depth-aware call tracing and per-class leveled
//! logging rendered through `tracing`.

pub mod class;
pub mod cli;
pub mod compose;
pub mod error;
pub mod interceptor;
pub mod logger;
pub mod selector;

pub use class::{Class, ClassBody, ClassHook, ClassManager, Member, Method, Object};
pub use compose::{after, around, around_named, before, Advice, AfterFn, BeforeFn, ExceptionFn};
pub use error::{Error, Result};
pub use interceptor::{Interceptor, MethodSite, SiteHooks};
pub use logger::{ClassLogger, LogLevel, Logger, LoggerOptions, Renderer, RendererKind};
pub use selector::{Matcher, Selector};

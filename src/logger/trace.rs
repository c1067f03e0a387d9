//! Call-tracing wrappers
//!
//! A [`CallTracer`] is built once per traced method, at weave time, and turns
//! the original method into one of three wrappers:
//!
//! | mode          | events per call                                   |
//! |---------------|---------------------------------------------------|
//! | pre/post      | `precall`, then `postcall` or `exception`         |
//! | pre           | `precall`, then `callend` (groups only)           |
//! | post          | `callbegin` (groups only), `postcall`/`exception` |
//!
//! Every event carries the call depth seen *before* the call entered. The
//! depth is released by [`DepthGuard`] on every exit path. A call that
//! unwinds before its closing event still signals `callend` when grouping,
//! so no group is left open.

use super::class_logger::ClassLogger;
use super::config::{LoggerOptions, TraceMode};
use super::depth::DepthGuard;
use crate::class::Method;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tracing state shared by every call of one method
pub(crate) struct CallTracer {
    logger: Arc<ClassLogger>,
    call_name: String,
    precall_label: String,
    postcall_label: String,
    exception_label: String,
    use_groups: bool,
    show_depth: bool,
}

impl CallTracer {
    pub(crate) fn new(
        logger: Arc<ClassLogger>,
        options: &LoggerOptions,
        class_name: &str,
        method_name: &str,
    ) -> Self {
        let call_name = format!("{}.{}()", class_name, method_name);
        let prefixes = &options.prefixes;
        Self {
            precall_label: format!("{}{}", prefixes.precall, call_name),
            postcall_label: format!("{}{}", prefixes.postcall, call_name),
            exception_label: format!("{}{}", prefixes.exception, call_name),
            call_name,
            logger,
            use_groups: options.use_groups,
            show_depth: options.show_depth,
        }
    }

    /// Announce the method and build its wrapper
    pub(crate) fn wrap(self, mode: TraceMode, time_calls: bool, target: Method) -> Method {
        match mode {
            TraceMode::Calls => self.pre_post(target, time_calls),
            TraceMode::PreCalls => self.pre(target),
            TraceMode::PostCalls => self.post(target, time_calls),
        }
    }

    fn pre_post(self, target: Method, time_calls: bool) -> Method {
        let description = if time_calls {
            "Logging timed pre/post-calls"
        } else {
            "Logging pre/post-calls"
        };
        self.logger.watch(&self.call_name, description);

        Method::new(move |this, args| {
            let guard = DepthGuard::enter();
            let depth = guard.depth();
            self.logger.precall(depth, &self.precall_label, args);
            let pending = CallEnd::new(&self.logger, self.use_groups);
            let start = time_calls.then(Instant::now);
            let outcome = target.call(this, args);
            pending.disarm();
            match outcome {
                Ok(result) => {
                    self.logger
                        .postcall(depth, &self.postcall_label, elapsed(start), &result, &[]);
                    Ok(result)
                }
                Err(err) => {
                    self.logger
                        .exception(depth, &self.exception_label, elapsed(start), &err);
                    Err(err)
                }
            }
        })
    }

    fn pre(self, target: Method) -> Method {
        self.logger.watch(&self.call_name, "Logging pre-calls");

        if !self.show_depth {
            return Method::new(move |this, args| {
                self.logger.precall(0, &self.precall_label, args);
                target.call(this, args)
            });
        }

        Method::new(move |this, args| {
            let guard = DepthGuard::enter();
            // Dropped before `guard`: the group ends while the depth is still held
            let _end = CallEnd::new(&self.logger, self.use_groups);
            self.logger.precall(guard.depth(), &self.precall_label, args);
            target.call(this, args)
        })
    }

    fn post(self, target: Method, time_calls: bool) -> Method {
        let description = if time_calls {
            ": Logging timed post-calls"
        } else {
            ": Logging post-calls"
        };
        self.logger.watch(&self.call_name, description);

        Method::new(move |this, args| {
            let guard = DepthGuard::enter();
            let depth = guard.depth();
            if self.use_groups {
                self.logger.callbegin(&self.call_name);
            }
            let pending = CallEnd::new(&self.logger, self.use_groups);
            let start = time_calls.then(Instant::now);
            let outcome = target.call(this, args);
            pending.disarm();
            match outcome {
                Ok(result) => {
                    self.logger
                        .postcall(depth, &self.postcall_label, elapsed(start), &result, args);
                    Ok(result)
                }
                Err(err) => {
                    self.logger
                        .exception(depth, &self.exception_label, elapsed(start), &err);
                    Err(err)
                }
            }
        })
    }
}

fn elapsed(start: Option<Instant>) -> Option<Duration> {
    start.map(|s| s.elapsed())
}

/// Signals `callend` when dropped while armed
struct CallEnd<'a>(Option<&'a ClassLogger>);

impl<'a> CallEnd<'a> {
    fn new(logger: &'a ClassLogger, use_groups: bool) -> Self {
        Self(use_groups.then_some(logger))
    }

    /// The call returned; its closing event ends the group instead
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for CallEnd<'_> {
    fn drop(&mut self) {
        if let Some(logger) = self.0 {
            logger.callend();
        }
    }
}

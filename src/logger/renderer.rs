//! Output collaborators
//!
//! A [`Renderer`] turns trace events and leveled messages into output. The
//! logger builds one renderer per class logger through a [`RendererFactory`],
//! so a renderer may keep per-class state.

use super::config::{LoggerOptions, RendererKind};
use super::level::LogLevel;
use serde_json::Value;
use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;
use tracing::span::EnteredSpan;

/// Indentation unit for call depth when grouping is off
pub const DEPTH_STR: &str = "| ";

pub trait Renderer: Send + Sync {
    /// A method was selected for tracing
    fn watch(&self, call_name: &str, description: &str);

    fn precall(&self, depth: usize, label: &str, args: &[Value]);

    /// `args` is empty unless the trace mode reports arguments after the call
    fn postcall(
        &self,
        depth: usize,
        label: &str,
        elapsed: Option<Duration>,
        result: &Value,
        args: &[Value],
    );

    fn exception(&self, depth: usize, label: &str, elapsed: Option<Duration>, error: &anyhow::Error);

    /// Start of a call whose only record comes after it returns
    fn callbegin(&self, label: &str);

    /// End of a call whose only record came before it
    fn callend(&self);

    /// Manual log call that passed the class level
    fn message(&self, level: LogLevel, prefix: &str, class_name: &str, args: &[Value]);
}

/// What a factory knows when building a class renderer
#[derive(Debug, Clone, Copy)]
pub struct RendererContext<'a> {
    pub class_name: &'a str,
    pub level: LogLevel,
    pub options: &'a LoggerOptions,
}

pub trait RendererFactory: Send + Sync {
    fn create(&self, ctx: &RendererContext<'_>) -> Arc<dyn Renderer>;
}

impl<F> RendererFactory for F
where
    F: Fn(&RendererContext<'_>) -> Arc<dyn Renderer> + Send + Sync,
{
    fn create(&self, ctx: &RendererContext<'_>) -> Arc<dyn Renderer> {
        self(ctx)
    }
}

impl RendererKind {
    pub fn factory(self) -> Arc<dyn RendererFactory> {
        match self {
            RendererKind::Tracing => Arc::new(|ctx: &RendererContext<'_>| -> Arc<dyn Renderer> {
                Arc::new(TracingRenderer::new(ctx))
            }),
            RendererKind::Silent => {
                Arc::new(|_: &RendererContext<'_>| -> Arc<dyn Renderer> { Arc::new(SilentRenderer) })
            }
        }
    }
}

/// Render argument lists: strings verbatim, other values as JSON
pub fn format_values(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_elapsed(elapsed: Option<Duration>) -> String {
    elapsed
        .map(|d| format!(" {}ms", d.as_millis()))
        .unwrap_or_default()
}

thread_local! {
    // Open call groups of this thread, innermost last
    static GROUPS: RefCell<Vec<EnteredSpan>> = const { RefCell::new(Vec::new()) };
}

fn open_group(label: &str) {
    let span = tracing::info_span!("call", call = %label).entered();
    GROUPS.with(|groups| groups.borrow_mut().push(span));
}

fn close_group() {
    GROUPS.with(|groups| {
        groups.borrow_mut().pop();
    });
}

/// Renders through `tracing`
///
/// With groups, each traced call opens a `call` span that nests the events of
/// inner calls; otherwise call events are indented with [`DEPTH_STR`].
#[derive(Debug, Clone)]
pub struct TracingRenderer {
    class_name: String,
    use_groups: bool,
    show_depth: bool,
    show_level: bool,
}

impl TracingRenderer {
    pub fn new(ctx: &RendererContext<'_>) -> Self {
        Self {
            class_name: ctx.class_name.to_string(),
            use_groups: ctx.options.use_groups,
            show_depth: ctx.options.show_depth,
            show_level: ctx.options.show_level,
        }
    }

    fn indent(&self, depth: usize) -> String {
        if self.show_depth && !self.use_groups {
            DEPTH_STR.repeat(depth)
        } else {
            String::new()
        }
    }
}

impl Renderer for TracingRenderer {
    fn watch(&self, call_name: &str, description: &str) {
        tracing::info!(class = %self.class_name, "{} {}", call_name, description);
    }

    fn precall(&self, depth: usize, label: &str, args: &[Value]) {
        tracing::info!(depth, "{}{} {}", self.indent(depth), label, format_values(args));
        if self.use_groups {
            open_group(label);
        }
    }

    fn postcall(
        &self,
        depth: usize,
        label: &str,
        elapsed: Option<Duration>,
        result: &Value,
        args: &[Value],
    ) {
        tracing::info!(
            depth,
            "{}{}{} {} {}",
            self.indent(depth),
            label,
            format_elapsed(elapsed),
            format_values(std::slice::from_ref(result)),
            format_values(args)
        );
        if self.use_groups {
            close_group();
        }
    }

    fn exception(&self, depth: usize, label: &str, elapsed: Option<Duration>, error: &anyhow::Error) {
        tracing::warn!(
            depth,
            "{}{}{} {:#}",
            self.indent(depth),
            label,
            format_elapsed(elapsed),
            error
        );
        if self.use_groups {
            close_group();
        }
    }

    fn callbegin(&self, label: &str) {
        if self.use_groups {
            open_group(label);
        }
    }

    fn callend(&self) {
        if self.use_groups {
            close_group();
        }
    }

    fn message(&self, level: LogLevel, prefix: &str, class_name: &str, args: &[Value]) {
        let prefix = if self.show_level { prefix } else { "" };
        let text = format_values(args);
        match level {
            LogLevel::Debug => tracing::debug!("{}{} {}", prefix, class_name, text),
            LogLevel::Log | LogLevel::Info => tracing::info!("{}{} {}", prefix, class_name, text),
            LogLevel::Warn => tracing::warn!("{}{} {}", prefix, class_name, text),
            LogLevel::Error | LogLevel::Fatal => {
                tracing::error!("{}{} {}", prefix, class_name, text)
            }
            _ => tracing::trace!("{}{} {}", prefix, class_name, text),
        }
    }
}

/// Discards all output
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentRenderer;

impl Renderer for SilentRenderer {
    fn watch(&self, _: &str, _: &str) {}
    fn precall(&self, _: usize, _: &str, _: &[Value]) {}
    fn postcall(&self, _: usize, _: &str, _: Option<Duration>, _: &Value, _: &[Value]) {}
    fn exception(&self, _: usize, _: &str, _: Option<Duration>, _: &anyhow::Error) {}
    fn callbegin(&self, _: &str) {}
    fn callend(&self) {}
    fn message(&self, _: LogLevel, _: &str, _: &str, _: &[Value]) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_values() {
        assert_eq!(format_values(&[json!("a"), json!(1), json!(null)]), "a 1 null");
        assert_eq!(format_values(&[json!({"k": [1]})]), r#"{"k":[1]}"#);
        assert_eq!(format_values(&[]), "");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(None), "");
        assert_eq!(format_elapsed(Some(Duration::from_millis(12))), " 12ms");
    }

    fn open_groups() -> usize {
        GROUPS.with(|groups| groups.borrow().len())
    }

    #[test]
    fn test_groups_close_on_every_closing_event() {
        let options = LoggerOptions::default();
        let ctx = RendererContext {
            class_name: "A",
            level: LogLevel::Warn,
            options: &options,
        };
        let renderer = TracingRenderer::new(&ctx);

        renderer.precall(0, "=> A.f()", &[]);
        renderer.callbegin("A.g()");
        assert_eq!(open_groups(), 2);
        renderer.callend();
        renderer.postcall(0, "<= A.f()", None, &json!(1), &[]);
        assert_eq!(open_groups(), 0);

        renderer.precall(0, "=> A.f()", &[]);
        renderer.exception(0, "[EXC] A.f()", None, &anyhow::anyhow!("boom"));
        assert_eq!(open_groups(), 0);
    }

    #[test]
    fn test_indent_only_without_groups() {
        let options = LoggerOptions {
            use_groups: false,
            ..Default::default()
        };
        let ctx = RendererContext {
            class_name: "A",
            level: LogLevel::Warn,
            options: &options,
        };
        assert_eq!(TracingRenderer::new(&ctx).indent(2), "| | ");

        let options = LoggerOptions::default();
        let ctx = RendererContext {
            options: &options,
            ..ctx
        };
        assert_eq!(TracingRenderer::new(&ctx).indent(2), "");
    }

    #[test]
    fn test_groups_open_and_close_in_order() {
        let options = LoggerOptions::default();
        let ctx = RendererContext {
            class_name: "A",
            level: LogLevel::Warn,
            options: &options,
        };
        let renderer = TracingRenderer::new(&ctx);
        let depth = || GROUPS.with(|g| g.borrow().len());

        renderer.precall(0, "=> A.f()", &[]);
        renderer.callbegin("A.g()");
        assert_eq!(depth(), 2);
        renderer.postcall(1, "<= A.g()", None, &Value::Null, &[]);
        renderer.exception(0, "[EXC] A.f()", None, &anyhow::anyhow!("x"));
        assert_eq!(depth(), 0);
    }

    #[test]
    fn test_kind_factories() {
        let options = LoggerOptions::default();
        let ctx = RendererContext {
            class_name: "A",
            level: LogLevel::Warn,
            options: &options,
        };
        for kind in [RendererKind::Tracing, RendererKind::Silent] {
            let renderer = kind.factory().create(&ctx);
            renderer.callbegin("A.f()");
            renderer.callend();
            renderer.message(LogLevel::Warn, "[WRN] ", "A", &[json!("hi")]);
        }
    }
}

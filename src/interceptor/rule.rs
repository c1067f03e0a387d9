//! Interception rules and site-aware hooks

use crate::class::{Method, Object};
use crate::compose::{AfterFn, BeforeFn, ExceptionFn};
use crate::error::Result;
use crate::selector::Matcher;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The method a transform is applied to
#[derive(Debug, Clone, Copy)]
pub struct MethodSite<'a> {
    pub class_name: &'a str,
    pub method_name: &'a str,
    /// Scope the rule was registered with
    pub scope: Option<&'a Object>,
}

/// Builds the replacement of a matched method
pub type Transform = Arc<dyn Fn(&MethodSite<'_>, &Method) -> Result<Method> + Send + Sync>;

/// One registered rule; immutable once created
pub struct InterceptionRule {
    pub classes: Matcher,
    pub methods: Matcher,
    pub transform: Transform,
    pub scope: Option<Object>,
}

impl InterceptionRule {
    pub fn applies_to(&self, class_name: &str) -> bool {
        self.classes.matches(class_name)
    }

    pub fn apply(&self, class_name: &str, method_name: &str, method: &Method) -> Result<Method> {
        let site = MethodSite {
            class_name,
            method_name,
            scope: self.scope.as_ref(),
        };
        (self.transform)(&site, method)
    }
}

impl fmt::Debug for InterceptionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptionRule")
            .field("classes", &self.classes)
            .field("methods", &self.methods)
            .field("scope", &self.scope.as_ref().map(Object::class_name))
            .finish_non_exhaustive()
    }
}

/// `(class name, method name, arguments)`
pub type SiteBeforeFn =
    Arc<dyn Fn(&Object, &str, &str, &[Value]) -> anyhow::Result<()> + Send + Sync>;

/// `(class name, method name, result, arguments)`
pub type SiteAfterFn =
    Arc<dyn Fn(&Object, &str, &str, &Value, &[Value]) -> anyhow::Result<()> + Send + Sync>;

/// `(class name, method name, error, arguments)`
pub type SiteExceptionFn = Arc<
    dyn Fn(&Object, &str, &str, &anyhow::Error, &[Value]) -> anyhow::Result<()> + Send + Sync,
>;

/// Hooks of an interceptor rule, bound to each matched method when woven
#[derive(Clone, Default)]
pub struct SiteHooks {
    before: Option<SiteBeforeFn>,
    after: Option<SiteAfterFn>,
    exception: Option<SiteExceptionFn>,
}

impl SiteHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Object, &str, &str, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(hook));
        self
    }

    pub fn on_after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Object, &str, &str, &Value, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(hook));
        self
    }

    pub fn on_exception<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Object, &str, &str, &anyhow::Error, &[Value]) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.exception = Some(Arc::new(hook));
        self
    }

    /// Fix class and method name for one matched method
    pub fn bind(
        &self,
        site: &MethodSite<'_>,
    ) -> (Option<BeforeFn>, Option<AfterFn>, Option<ExceptionFn>) {
        let names = Arc::new((site.class_name.to_string(), site.method_name.to_string()));

        let before = self.before.clone().map(|hook| -> BeforeFn {
            let names = Arc::clone(&names);
            Arc::new(move |scope: &Object, args: &[Value]| hook(scope, &names.0, &names.1, args))
        });
        let after = self.after.clone().map(|hook| -> AfterFn {
            let names = Arc::clone(&names);
            Arc::new(move |scope: &Object, result: &Value, args: &[Value]| {
                hook(scope, &names.0, &names.1, result, args)
            })
        });
        let exception = self.exception.clone().map(|hook| -> ExceptionFn {
            let names = Arc::clone(&names);
            Arc::new(move |scope: &Object, err: &anyhow::Error, args: &[Value]| {
                hook(scope, &names.0, &names.1, err, args)
            })
        });
        (before, after, exception)
    }
}

impl fmt::Debug for SiteHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteHooks")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("exception", &self.exception.is_some())
            .finish()
    }
}

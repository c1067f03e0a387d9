//! Interception registry and weaver
//!
//! An [`Interceptor`] holds an ordered list of [`InterceptionRule`]s. When a
//! class is declared, [`Interceptor::weave`] runs every rule whose class
//! matcher selects the class name, in registration order, over the class's
//! own method slots. A method replaced by an earlier rule is the input of a
//! later one, so instrumentation stacks. Classes declared `nointercept` are
//! left alone.
//!
//! Each replaced method records the method it replaced, which is what
//! [`Interceptor::remove_transform`] restores.

mod rule;

pub use rule::{
    InterceptionRule, MethodSite, SiteAfterFn, SiteBeforeFn, SiteExceptionFn, SiteHooks,
    Transform,
};

use crate::class::{ClassBody, ClassHook, ClassManager, Method, Object};
use crate::compose::around;
use crate::error::Result;
use crate::selector::{Matcher, Selector};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

static GLOBAL: OnceLock<Arc<Interceptor>> = OnceLock::new();

/// Name of the interceptor's own (never intercepted) scope object
pub const SCOPE_CLASS: &str = "weavelog.Interceptor";

pub struct Interceptor {
    rules: RwLock<Vec<Arc<InterceptionRule>>>,
    scope: Object,
}

impl Default for Interceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            scope: Object::standalone(SCOPE_CLASS, ClassBody::new().with_nointercept()),
        }
    }

    /// Process-wide interceptor
    pub fn global() -> &'static Arc<Interceptor> {
        GLOBAL.get_or_init(|| Arc::new(Interceptor::new()))
    }

    /// Start over with no rules
    pub fn init(&self) {
        self.reset();
    }

    pub fn reset(&self) {
        self.rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Default hook scope of `add_interceptor`
    pub fn scope(&self) -> &Object {
        &self.scope
    }

    pub fn len(&self) -> usize {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, rule: InterceptionRule) {
        tracing::trace!(?rule, "interception rule added");
        self.rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(rule));
    }

    /// Replace each selected method by `transform(site, method)`
    pub fn add_transform<F>(
        &self,
        classes: impl Into<Selector>,
        methods: impl Into<Selector>,
        transform: F,
        scope: Option<Object>,
    ) where
        F: Fn(&MethodSite<'_>, &Method) -> Result<Method> + Send + Sync + 'static,
    {
        self.push(InterceptionRule {
            classes: Matcher::compile(classes),
            methods: Matcher::compile(methods),
            transform: Arc::new(transform),
            scope,
        });
    }

    /// Wrap each selected method with `hooks`, called with `scope` as receiver
    ///
    /// Hooks receive the class and method name of the call. Without a scope
    /// the interceptor's own scope object is used.
    pub fn add_interceptor(
        &self,
        classes: impl Into<Selector>,
        methods: impl Into<Selector>,
        hooks: SiteHooks,
        scope: Option<Object>,
    ) {
        let scope = scope.unwrap_or_else(|| self.scope.clone());
        self.add_transform(
            classes,
            methods,
            move |site, method| {
                let (before, after, exception) = hooks.bind(site);
                around(before, method.clone(), after, exception, site.scope)
            },
            Some(scope),
        );
    }

    /// Undo the most recent replacement of each selected method
    ///
    /// Only affects classes declared after this call; a method that was never
    /// replaced is kept.
    pub fn remove_transform(&self, classes: impl Into<Selector>, methods: impl Into<Selector>) {
        self.add_transform(
            classes,
            methods,
            |_, method| Ok(method.previous().cloned().unwrap_or_else(|| method.clone())),
            None,
        );
    }

    fn snapshot(&self) -> Vec<Arc<InterceptionRule>> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply every matching rule to the methods of `body`
    ///
    /// Returns the number of method replacements made.
    pub fn weave(&self, class_name: &str, body: &mut ClassBody) -> Result<usize> {
        if body.is_nointercept() {
            return Ok(0);
        }

        let mut replaced = 0;
        for rule in self.snapshot() {
            if !rule.applies_to(class_name) {
                continue;
            }
            for (method_name, slot) in body.methods_mut() {
                if !rule.methods.matches(method_name) {
                    continue;
                }
                let method = rule.apply(class_name, method_name, slot)?;
                *slot = record_previous(method, slot);
                replaced += 1;
                tracing::trace!(class = class_name, method = method_name, "method woven");
            }
        }

        if replaced > 0 {
            tracing::debug!(class = class_name, replaced, "class woven");
        }
        Ok(replaced)
    }

    /// Weave every class declared through `classes` from now on
    pub fn attach(self: &Arc<Self>, classes: &ClassManager) {
        classes.add_hook(Arc::clone(self) as Arc<dyn ClassHook>);
    }
}

/// Remember `current` on a freshly built replacement
///
/// Methods that already carry an undo record, the current method itself and
/// the method `current` replaced (restored by `remove_transform`) are kept
/// as they are. Repeated removals therefore peel one layer each and stop at
/// the declared method.
fn record_previous(method: Method, current: &Method) -> Method {
    let restored = current
        .previous()
        .is_some_and(|previous| Method::ptr_eq(&method, previous));
    if restored || method.previous().is_some() || Method::ptr_eq(&method, current) {
        method
    } else {
        method.with_previous(current.clone())
    }
}

impl ClassHook for Interceptor {
    fn on_class_create(&self, class_name: &str, body: &mut ClassBody) -> Result<()> {
        self.weave(class_name, body).map(drop)
    }
}

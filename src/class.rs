//! Minimal host class system
//!
//! Classes are declared through one registration point, [`ClassManager`].
//! A declaration is a [`ClassBody`]: an ordered member table of methods and
//! fields. Before a class becomes usable, every registered [`ClassHook`] sees
//! the body and may replace its methods; the finished [`Class`] is immutable.
//!
//! Methods are function values taking the receiver and the call arguments,
//! so wrapping a method is just building a new function value around it.

use crate::error::{Error, Result};
use crate::logger::ClassLogger;
use crate::selector::Selector;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

type MethodBody = dyn Fn(&Object, &[Value]) -> anyhow::Result<Value> + Send + Sync;

/// A callable class member
///
/// Cloning is cheap and preserves identity (see [`Method::ptr_eq`]).
#[derive(Clone)]
pub struct Method {
    body: Arc<MethodBody>,
    /// Method this one replaced during weaving (undo support)
    previous: Option<Box<Method>>,
}

impl Method {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&Object, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            body: Arc::new(body),
            previous: None,
        }
    }

    /// Invoke with an explicit receiver
    pub fn call(&self, this: &Object, args: &[Value]) -> anyhow::Result<Value> {
        (self.body)(this, args)
    }

    /// True when both handles share the same function body
    pub fn ptr_eq(a: &Method, b: &Method) -> bool {
        Arc::ptr_eq(&a.body, &b.body)
    }

    /// The method this one replaced, if it was installed by weaving
    pub fn previous(&self) -> Option<&Method> {
        self.previous.as_deref()
    }

    pub(crate) fn with_previous(mut self, previous: Method) -> Self {
        self.previous = Some(Box::new(previous));
        self
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("body", &Arc::as_ptr(&self.body))
            .field("has_previous", &self.previous.is_some())
            .finish()
    }
}

/// Entry of a member table
#[derive(Debug, Clone)]
pub enum Member {
    Method(Method),
    Field(Value),
}

impl Member {
    pub fn as_method(&self) -> Option<&Method> {
        match self {
            Member::Method(m) => Some(m),
            Member::Field(_) => None,
        }
    }
}

impl From<Method> for Member {
    fn from(method: Method) -> Self {
        Member::Method(method)
    }
}

impl From<Value> for Member {
    fn from(value: Value) -> Self {
        Member::Field(value)
    }
}

/// Class declaration, mutable until the class is created
#[derive(Debug, Clone, Default)]
pub struct ClassBody {
    members: Vec<(String, Member)>,
    nointercept: bool,
    log: bool,
    log_methods: Option<Selector>,
    logger: Option<Arc<ClassLogger>>,
}

impl ClassBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method<F>(mut self, name: &str, body: F) -> Self
    where
        F: Fn(&Object, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.set(name, Member::Method(Method::new(body)));
        self
    }

    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.set(name, Member::Field(value));
        self
    }

    /// Exclude this class from all interception rules
    pub fn with_nointercept(mut self) -> Self {
        self.nointercept = true;
        self
    }

    /// Request a per-class logger, reachable through [`Object::log`]
    pub fn with_log(mut self) -> Self {
        self.log = true;
        self
    }

    /// Trace calls to the selected methods of this class
    pub fn with_log_methods(mut self, methods: impl Into<Selector>) -> Self {
        self.log_methods = Some(methods.into());
        self
    }

    pub fn is_nointercept(&self) -> bool {
        self.nointercept
    }

    pub fn wants_log(&self) -> bool {
        self.log
    }

    pub fn log_methods(&self) -> Option<&Selector> {
        self.log_methods.as_ref()
    }

    pub fn get(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    /// Insert or replace a member, keeping declaration order
    pub fn set(&mut self, name: &str, member: Member) {
        match self.members.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = member,
            None => self.members.push((name.to_string(), member)),
        }
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(n, m)| (n.as_str(), m))
    }

    /// Own method slots, in declaration order
    pub fn methods_mut(&mut self) -> impl Iterator<Item = (&str, &mut Method)> {
        self.members.iter_mut().filter_map(|(n, m)| match m {
            Member::Method(method) => Some((n.as_str(), method)),
            Member::Field(_) => None,
        })
    }

    /// Application name (the `name` field), used for application objects
    pub fn app_name(&self) -> Option<&str> {
        match self.get("name") {
            Some(Member::Field(Value::String(name))) => Some(name),
            _ => None,
        }
    }

    pub fn install_logger(&mut self, logger: Arc<ClassLogger>) {
        self.logger = Some(logger);
    }
}

/// Finished, immutable class
#[derive(Debug)]
pub struct Class {
    name: String,
    members: Vec<(String, Member)>,
    nointercept: bool,
    logger: Option<Arc<ClassLogger>>,
}

impl Class {
    pub fn new(name: &str, body: ClassBody) -> Self {
        Self {
            name: name.to_string(),
            members: body.members,
            nointercept: body.nointercept,
            logger: body.logger,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_nointercept(&self) -> bool {
        self.nointercept
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.member(name).and_then(Member::as_method)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        match self.member(name) {
            Some(Member::Field(v)) => Some(v),
            _ => None,
        }
    }

    pub fn logger(&self) -> Option<&Arc<ClassLogger>> {
        self.logger.as_ref()
    }
}

/// Instance of a class; the receiver of every method call
#[derive(Debug, Clone)]
pub struct Object {
    class: Arc<Class>,
}

impl Object {
    pub fn new(class: Arc<Class>) -> Self {
        Self { class }
    }

    /// Object whose class is not registered anywhere, e.g. a hook scope
    pub fn standalone(name: &str, body: ClassBody) -> Self {
        Self::new(Arc::new(Class::new(name, body)))
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    /// Call a method of this object with `self` as receiver
    pub fn call(&self, method: &str, args: &[Value]) -> anyhow::Result<Value> {
        let m = self.class.method(method).ok_or_else(|| Error::NoSuchMethod {
            class: self.class.name.clone(),
            method: method.to_string(),
        })?;
        m.call(self, args)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.class.field(field)
    }

    /// Class logger, present when the class was declared `with_log()`
    pub fn log(&self) -> Option<&Arc<ClassLogger>> {
        self.class.logger()
    }
}

/// Extension points of the class system
pub trait ClassHook: Send + Sync {
    /// A class is about to be created
    fn on_class_create(&self, class_name: &str, body: &mut ClassBody) -> Result<()>;

    /// An application object is about to be created; keyed by its `name` field
    fn on_application_create(&self, body: &mut ClassBody) -> Result<()> {
        let name = body
            .app_name()
            .ok_or(Error::MissingApplicationName)?
            .to_string();
        self.on_class_create(&name, body)
    }
}

/// Central class registration point
#[derive(Default)]
pub struct ClassManager {
    hooks: RwLock<Vec<Arc<dyn ClassHook>>>,
    classes: RwLock<HashMap<String, Arc<Class>>>,
}

impl ClassManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension point; hooks run in registration order
    pub fn add_hook(&self, hook: Arc<dyn ClassHook>) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }

    fn hooks(&self) -> Vec<Arc<dyn ClassHook>> {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Declare a class. Hooks see (and may rewrite) the body first.
    pub fn define(&self, name: &str, mut body: ClassBody) -> Result<Arc<Class>> {
        for hook in self.hooks() {
            hook.on_class_create(name, &mut body)?;
        }
        let class = Arc::new(Class::new(name, body));
        self.classes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::clone(&class));
        tracing::debug!(class = name, "class defined");
        Ok(class)
    }

    /// Create the application object described by `body`
    pub fn application(&self, mut body: ClassBody) -> Result<Object> {
        let name = body
            .app_name()
            .ok_or(Error::MissingApplicationName)?
            .to_string();
        for hook in self.hooks() {
            hook.on_application_create(&mut body)?;
        }
        let class = Arc::new(Class::new(&name, body));
        self.classes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), Arc::clone(&class));
        tracing::debug!(application = %name, "application created");
        Ok(Object::new(class))
    }

    pub fn get(&self, name: &str) -> Option<Arc<Class>> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Instantiate a defined class
    pub fn create(&self, name: &str) -> Result<Object> {
        self.get(name)
            .map(Object::new)
            .ok_or_else(|| Error::UnknownClass(name.to_string()))
    }
}

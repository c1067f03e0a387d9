//! Wrapper composer ("around", "before", "after")
//!
//! Combines up to three hooks with a target method into a replacement method.
//! The hook combination is resolved once, at composition time, into one of
//! the eight [`Advice`] variants; each variant builds a closure holding only
//! the hooks it calls, so an absent hook costs nothing per call and an absent
//! exception hook installs no error interception at all.
//!
//! Hooks are invoked with the composition scope as receiver. The target is
//! always invoked with the receiver of the original call. Errors raised by
//! the target are handed to the exception hook by reference and then returned
//! to the caller unchanged.

use crate::class::{Member, Method, Object};
use crate::error::{Error, Result};
use serde_json::Value;
use std::sync::Arc;

/// Runs before the target with the call arguments
pub type BeforeFn = Arc<dyn Fn(&Object, &[Value]) -> anyhow::Result<()> + Send + Sync>;

/// Runs after a successful call with `(result, arguments)`
pub type AfterFn = Arc<dyn Fn(&Object, &Value, &[Value]) -> anyhow::Result<()> + Send + Sync>;

/// Runs when the call fails with `(error, arguments)`
pub type ExceptionFn =
    Arc<dyn Fn(&Object, &anyhow::Error, &[Value]) -> anyhow::Result<()> + Send + Sync>;

/// The hook combination of a composed method
pub enum Advice {
    None,
    Before(BeforeFn),
    After(AfterFn),
    Exception(ExceptionFn),
    BeforeAfter(BeforeFn, AfterFn),
    BeforeException(BeforeFn, ExceptionFn),
    AfterException(AfterFn, ExceptionFn),
    All(BeforeFn, AfterFn, ExceptionFn),
}

impl Advice {
    pub fn new(
        before: Option<BeforeFn>,
        after: Option<AfterFn>,
        exception: Option<ExceptionFn>,
    ) -> Self {
        match (before, after, exception) {
            (None, None, None) => Advice::None,
            (Some(b), None, None) => Advice::Before(b),
            (None, Some(a), None) => Advice::After(a),
            (None, None, Some(e)) => Advice::Exception(e),
            (Some(b), Some(a), None) => Advice::BeforeAfter(b, a),
            (Some(b), None, Some(e)) => Advice::BeforeException(b, e),
            (None, Some(a), Some(e)) => Advice::AfterException(a, e),
            (Some(b), Some(a), Some(e)) => Advice::All(b, a, e),
        }
    }

    /// Build the replacement for `target`. `Advice::None` returns `target` itself.
    pub fn wrap(self, target: Method, scope: Object) -> Method {
        match self {
            Advice::None => target,
            Advice::Before(before) => Method::new(move |this, args| {
                before(&scope, args)?;
                target.call(this, args)
            }),
            Advice::After(after) => Method::new(move |this, args| {
                let result = target.call(this, args)?;
                after(&scope, &result, args)?;
                Ok(result)
            }),
            Advice::Exception(exception) => Method::new(move |this, args| {
                guarded(&scope, &exception, args, || target.call(this, args))
            }),
            Advice::BeforeAfter(before, after) => Method::new(move |this, args| {
                before(&scope, args)?;
                let result = target.call(this, args)?;
                after(&scope, &result, args)?;
                Ok(result)
            }),
            Advice::BeforeException(before, exception) => Method::new(move |this, args| {
                guarded(&scope, &exception, args, || {
                    before(&scope, args)?;
                    target.call(this, args)
                })
            }),
            Advice::AfterException(after, exception) => Method::new(move |this, args| {
                guarded(&scope, &exception, args, || {
                    let result = target.call(this, args)?;
                    after(&scope, &result, args)?;
                    Ok(result)
                })
            }),
            Advice::All(before, after, exception) => Method::new(move |this, args| {
                guarded(&scope, &exception, args, || {
                    before(&scope, args)?;
                    let result = target.call(this, args)?;
                    after(&scope, &result, args)?;
                    Ok(result)
                })
            }),
        }
    }
}

/// Report a failure of `body` to the exception hook, then return it unchanged
fn guarded(
    scope: &Object,
    exception: &ExceptionFn,
    args: &[Value],
    body: impl FnOnce() -> anyhow::Result<Value>,
) -> anyhow::Result<Value> {
    match body() {
        Ok(result) => Ok(result),
        Err(err) => {
            exception(scope, &err, args)?;
            Err(err)
        }
    }
}

/// Compose `before`/`after`/`exception` hooks around `target`
///
/// # Errors
/// - `MissingTarget` if `target` is not a method
/// - `MissingScope` if no scope is given
pub fn around(
    before: Option<BeforeFn>,
    target: impl Into<Member>,
    after: Option<AfterFn>,
    exception: Option<ExceptionFn>,
    scope: Option<&Object>,
) -> Result<Method> {
    let target = match target.into() {
        Member::Method(method) => method,
        Member::Field(_) => return Err(Error::MissingTarget),
    };
    let scope = scope.ok_or(Error::MissingScope)?;
    Ok(Advice::new(before, after, exception).wrap(target, scope.clone()))
}

/// Same as `around(before, target, None, exception, scope)`
pub fn before(
    on_before: Option<BeforeFn>,
    target: impl Into<Member>,
    on_exception: Option<ExceptionFn>,
    scope: Option<&Object>,
) -> Result<Method> {
    around(on_before, target, None, on_exception, scope)
}

/// Same as `around(None, target, after, exception, scope)`
pub fn after(
    target: impl Into<Member>,
    on_after: Option<AfterFn>,
    on_exception: Option<ExceptionFn>,
    scope: Option<&Object>,
) -> Result<Method> {
    around(None, target, on_after, on_exception, scope)
}

/// Compose hooks that are methods of `scope`, looked up by name
///
/// Member-method hooks are called with `args`, `[result, [args]]` and
/// `[error message, [args]]` respectively.
///
/// # Errors
/// `InvalidHookType` if a named hook is a field or is missing.
pub fn around_named(
    scope: &Object,
    before: Option<&str>,
    target: impl Into<Member>,
    after: Option<&str>,
    exception: Option<&str>,
) -> Result<Method> {
    let before = before
        .map(|name| scope_method(scope, name))
        .transpose()?
        .map(|m| -> BeforeFn {
            Arc::new(move |scope: &Object, args: &[Value]| m.call(scope, args).map(drop))
        });
    let after = after
        .map(|name| scope_method(scope, name))
        .transpose()?
        .map(|m| -> AfterFn {
            Arc::new(move |scope: &Object, result: &Value, args: &[Value]| {
                m.call(scope, &[result.clone(), Value::Array(args.to_vec())])
                    .map(drop)
            })
        });
    let exception = exception
        .map(|name| scope_method(scope, name))
        .transpose()?
        .map(|m| -> ExceptionFn {
            Arc::new(move |scope: &Object, err: &anyhow::Error, args: &[Value]| {
                m.call(
                    scope,
                    &[Value::String(err.to_string()), Value::Array(args.to_vec())],
                )
                .map(drop)
            })
        });
    around(before, target, after, exception, Some(scope))
}

fn scope_method(scope: &Object, name: &str) -> Result<Method> {
    scope
        .class()
        .method(name)
        .cloned()
        .ok_or_else(|| Error::InvalidHookType(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassBody;
    use anyhow::anyhow;
    use serde_json::json;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    /// Receiver used for target calls
    fn receiver() -> Object {
        Object::standalone("Caller", ClassBody::new())
    }

    /// Scope used for hooks
    fn scope() -> Object {
        Object::standalone("HookScope", ClassBody::new())
    }

    fn target(log: &Log, fail: bool) -> Method {
        let log = log.clone();
        Method::new(move |this, args| {
            log.lock()
                .unwrap()
                .push(format!("fn({}) on {}", Value::Array(args.to_vec()), this.class_name()));
            if fail {
                Err(anyhow!("boom"))
            } else {
                Ok(json!("C"))
            }
        })
    }

    fn before_hook(log: &Log) -> BeforeFn {
        let log = log.clone();
        Arc::new(move |scope: &Object, args: &[Value]| {
            log.lock()
                .unwrap()
                .push(format!("before({}) on {}", Value::Array(args.to_vec()), scope.class_name()));
            Ok(())
        })
    }

    fn after_hook(log: &Log) -> AfterFn {
        let log = log.clone();
        Arc::new(move |scope: &Object, result: &Value, args: &[Value]| {
            log.lock().unwrap().push(format!(
                "after({}, {}) on {}",
                result,
                Value::Array(args.to_vec()),
                scope.class_name()
            ));
            Ok(())
        })
    }

    fn exception_hook(log: &Log) -> ExceptionFn {
        let log = log.clone();
        Arc::new(move |scope: &Object, err: &anyhow::Error, args: &[Value]| {
            log.lock().unwrap().push(format!(
                "exception({}, {}) on {}",
                err,
                Value::Array(args.to_vec()),
                scope.class_name()
            ));
            Ok(())
        })
    }

    fn compose(log: &Log, b: bool, a: bool, e: bool, fail: bool) -> Method {
        around(
            b.then(|| before_hook(log)),
            target(log, fail),
            a.then(|| after_hook(log)),
            e.then(|| exception_hook(log)),
            Some(&scope()),
        )
        .unwrap()
    }

    const ARGS: [&str; 2] = ["A", "B"];

    fn args() -> Vec<Value> {
        ARGS.iter().map(|s| json!(s)).collect()
    }

    const BEFORE: &str = r#"before(["A","B"]) on HookScope"#;
    const FN: &str = r#"fn(["A","B"]) on Caller"#;
    const AFTER: &str = r#"after("C", ["A","B"]) on HookScope"#;
    const EXC: &str = r#"exception(boom, ["A","B"]) on HookScope"#;

    #[test]
    fn test_all_hook_combinations_on_success() {
        let cases: [(bool, bool, bool, &[&str]); 8] = [
            (true, true, true, &[BEFORE, FN, AFTER]),
            (true, true, false, &[BEFORE, FN, AFTER]),
            (true, false, true, &[BEFORE, FN]),
            (true, false, false, &[BEFORE, FN]),
            (false, true, true, &[FN, AFTER]),
            (false, true, false, &[FN, AFTER]),
            (false, false, true, &[FN]),
            (false, false, false, &[FN]),
        ];
        for (b, a, e, expected) in cases {
            let log = new_log();
            let method = compose(&log, b, a, e, false);
            let result = method.call(&receiver(), &args()).unwrap();
            assert_eq!(result, json!("C"));
            assert_eq!(entries(&log), expected, "hooks b={} a={} e={}", b, a, e);
        }
    }

    #[test]
    fn test_all_hook_combinations_on_failure() {
        let cases: [(bool, bool, bool, &[&str]); 8] = [
            (true, true, true, &[BEFORE, FN, EXC]),
            (true, true, false, &[BEFORE, FN]),
            (true, false, true, &[BEFORE, FN, EXC]),
            (true, false, false, &[BEFORE, FN]),
            (false, true, true, &[FN, EXC]),
            (false, true, false, &[FN]),
            (false, false, true, &[FN, EXC]),
            (false, false, false, &[FN]),
        ];
        for (b, a, e, expected) in cases {
            let log = new_log();
            let method = compose(&log, b, a, e, true);
            let err = method.call(&receiver(), &args()).unwrap_err();
            assert_eq!(err.to_string(), "boom");
            assert_eq!(entries(&log), expected, "hooks b={} a={} e={}", b, a, e);
        }
    }

    #[test]
    fn test_no_hooks_returns_target_itself() {
        let log = new_log();
        let fn1 = target(&log, false);
        let composed = around(None, fn1.clone(), None, None, Some(&scope())).unwrap();
        assert!(Method::ptr_eq(&fn1, &composed));

        let wrapped = around(Some(before_hook(&log)), fn1.clone(), None, None, Some(&scope()));
        assert!(!Method::ptr_eq(&fn1, &wrapped.unwrap()));
    }

    #[derive(Debug, thiserror::Error)]
    #[error("business failure {0}")]
    struct BusinessError(u32);

    #[test]
    fn test_exception_is_observed_and_reraised_unchanged() {
        let seen = Arc::new(Mutex::new(None));
        let seen_in_hook = seen.clone();
        let on_exception: ExceptionFn = Arc::new(move |_: &Object, err: &anyhow::Error, _: &[Value]| {
            *seen_in_hook.lock().unwrap() = err.downcast_ref::<BusinessError>().map(|e| e.0);
            Ok(())
        });
        let failing = Method::new(|_, _| Err(BusinessError(42).into()));

        let method = around(None, failing, None, Some(on_exception), Some(&scope())).unwrap();
        let err = method.call(&receiver(), &[]).unwrap_err();

        assert_eq!(*seen.lock().unwrap(), Some(42));
        assert_eq!(err.downcast_ref::<BusinessError>().map(|e| e.0), Some(42));
    }

    #[test]
    fn test_before_and_after_sugar() {
        let log = new_log();
        let m = before(Some(before_hook(&log)), target(&log, false), None, Some(&scope())).unwrap();
        m.call(&receiver(), &args()).unwrap();
        assert_eq!(entries(&log), [BEFORE, FN]);

        let log = new_log();
        let m = after(target(&log, false), Some(after_hook(&log)), None, Some(&scope())).unwrap();
        m.call(&receiver(), &args()).unwrap();
        assert_eq!(entries(&log), [FN, AFTER]);
    }

    #[test]
    fn test_missing_target_and_scope() {
        let log = new_log();
        assert_eq!(
            around(None, Member::Field(json!(3)), None, None, Some(&scope())).unwrap_err(),
            Error::MissingTarget
        );
        assert_eq!(
            around(Some(before_hook(&log)), target(&log, false), None, None, None).unwrap_err(),
            Error::MissingScope
        );
    }

    fn hook_scope(log: &Log) -> Object {
        let (l1, l2, l3, l4) = (log.clone(), log.clone(), log.clone(), log.clone());
        Object::standalone(
            "Class2",
            ClassBody::new()
                .with_field("notAHook", json!(1))
                .with_method("onBefore", move |this, args| {
                    l1.lock().unwrap().push(format!("onBefore({})", Value::Array(args.to_vec())));
                    this.call("onBefore2", &[])
                })
                .with_method("onBefore2", move |_, _| {
                    l2.lock().unwrap().push("onBefore2()".to_string());
                    Ok(Value::Null)
                })
                .with_method("onAfter", move |_, args| {
                    l3.lock().unwrap().push(format!("onAfter({})", Value::Array(args.to_vec())));
                    Ok(Value::Null)
                })
                .with_method("onException", move |_, args| {
                    l4.lock().unwrap().push(format!("onException({})", Value::Array(args.to_vec())));
                    Ok(Value::Null)
                }),
        )
    }

    #[test]
    fn test_named_hooks_run_with_scope_receiver() {
        let log = new_log();
        let scope = hook_scope(&log);
        let m = around_named(
            &scope,
            Some("onBefore"),
            target(&log, false),
            Some("onAfter"),
            Some("onException"),
        )
        .unwrap();
        m.call(&receiver(), &args()).unwrap();
        assert_eq!(
            entries(&log),
            [
                r#"onBefore(["A","B"])"#,
                "onBefore2()",
                FN,
                r#"onAfter(["C",["A","B"]])"#,
            ]
        );

        let log = new_log();
        let scope = hook_scope(&log);
        let m = around_named(&scope, None, target(&log, true), None, Some("onException")).unwrap();
        assert!(m.call(&receiver(), &args()).is_err());
        assert_eq!(entries(&log), [FN, r#"onException(["boom",["A","B"]])"#]);
    }

    #[test]
    fn test_named_hooks_reject_non_methods() {
        let log = new_log();
        let scope = hook_scope(&log);
        assert_eq!(
            around_named(&scope, Some("notAHook"), target(&log, false), None, None).unwrap_err(),
            Error::InvalidHookType("notAHook".to_string())
        );
        assert_eq!(
            around_named(&scope, None, target(&log, false), Some("missing"), None).unwrap_err(),
            Error::InvalidHookType("missing".to_string())
        );
    }
}

//! # Method-Bound Subscribers
//!
//! [`BoundHandler`] adapts a located handler method to the [`Subscriber`]
//! capability. Resolution happens once, by method name, against a type's
//! [`StaticHandlers`] table or an object's [`HandlerSource`] table; a failed
//! resolution is a configuration error ([`BindError`]) that the registry
//! routes to the fatal reporter. A handler that is itself a full subscriber
//! can be wrapped with [`BoundHandler::forward`], which delegates `notify`
//! directly.

use std::sync::Arc;

use thiserror::Error;

use crate::args::Args;
use crate::locator::{HandlerFn, HandlerScope, HandlerSource, HandlerSpec, StaticHandlers};
use crate::subscriber::{NotifyResult, Subscriber, SubscriberRef};

/// A handler-binding configuration error. Fail-fast: never retried.
#[derive(Error, Debug)]
pub enum BindError {
    #[error("no handler method '{method}' on '{target}'")]
    MethodNotFound { target: String, method: String },

    #[error("handler method '{method}' on '{target}' is {found}-scoped, expected {expected}")]
    WrongScope {
        target: String,
        method: String,
        found: HandlerScope,
        expected: HandlerScope,
    },
}

enum Binding {
    Call(HandlerFn),
    Forward(SubscriberRef),
}

/// Subscriber adapter over one located method, or a direct forward to
/// another subscriber.
pub struct BoundHandler {
    label: String,
    binding: Binding,
}

impl std::fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundHandler")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl BoundHandler {
    /// Resolve a class-level handler of `T` by declared method name.
    pub fn resolve_static<T: StaticHandlers>(method: &str) -> Result<Self, BindError> {
        Self::pick(
            T::static_handlers(),
            std::any::type_name::<T>(),
            method,
            HandlerScope::Static,
        )
    }

    /// Resolve an instance-level handler of `obj` by declared method name.
    pub fn resolve_object<T: HandlerSource + 'static>(
        obj: Arc<T>,
        method: &str,
    ) -> Result<Self, BindError> {
        Self::pick(
            obj.handlers(),
            std::any::type_name::<T>(),
            method,
            HandlerScope::Instance,
        )
    }

    /// Wrap an existing subscriber; notifications delegate directly to it.
    pub fn forward(subscriber: SubscriberRef) -> Self {
        Self {
            label: format!("forward:{}", subscriber.name()),
            binding: Binding::Forward(subscriber),
        }
    }

    /// Adapter over an already located spec (registry scans land here).
    pub(crate) fn from_spec(target: &str, spec: &HandlerSpec) -> Self {
        Self {
            label: format!("{}::{}", short_type_name(target), spec.method()),
            binding: Binding::Call(spec.call().clone()),
        }
    }

    fn pick(
        specs: Vec<HandlerSpec>,
        target: &str,
        method: &str,
        expected: HandlerScope,
    ) -> Result<Self, BindError> {
        let spec = specs
            .into_iter()
            .find(|spec| spec.method() == method)
            .ok_or_else(|| BindError::MethodNotFound {
                target: target.to_string(),
                method: method.to_string(),
            })?;
        if spec.scope() != expected {
            return Err(BindError::WrongScope {
                target: target.to_string(),
                method: method.to_string(),
                found: spec.scope(),
                expected,
            });
        }
        Ok(Self::from_spec(target, &spec))
    }
}

impl Subscriber for BoundHandler {
    fn notify(&self, event: &str, args: &Args) -> NotifyResult<()> {
        match &self.binding {
            Binding::Call(call) => call(event, args),
            Binding::Forward(subscriber) => subscriber.notify(event, args),
        }
    }

    fn name(&self) -> &str {
        &self.label
    }
}

fn short_type_name(full: &str) -> &str {
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::{FnSubscriber, HandlerError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Lifecycle;

    impl StaticHandlers for Lifecycle {
        fn static_handlers() -> Vec<HandlerSpec> {
            vec![HandlerSpec::stat("onStart", |_, _| Ok(()))]
        }
    }

    struct Watcher {
        hits: AtomicUsize,
    }

    impl HandlerSource for Watcher {
        fn handlers(self: Arc<Self>) -> Vec<HandlerSpec> {
            let me = self.clone();
            vec![
                HandlerSpec::instance("onFileChange", move |_, _| {
                    me.hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
                HandlerSpec::stat("onTick", |_, _| Ok(())),
            ]
        }
    }

    #[test]
    fn test_resolve_static_ok() {
        let handler = BoundHandler::resolve_static::<Lifecycle>("onStart").unwrap();
        assert!(handler.notify("start", &Args::new()).is_ok());
        assert!(handler.name().ends_with("::onStart"));
    }

    #[test]
    fn test_resolve_static_not_found() {
        let err = BoundHandler::resolve_static::<Lifecycle>("onMissing").unwrap_err();
        assert!(matches!(err, BindError::MethodNotFound { .. }));
    }

    #[test]
    fn test_resolve_object_invokes_bound_instance() {
        let watcher = Arc::new(Watcher {
            hits: AtomicUsize::new(0),
        });
        let handler =
            BoundHandler::resolve_object(watcher.clone(), "onFileChange").unwrap();
        handler.notify("file-change", &Args::new()).unwrap();
        handler.notify("file-change", &Args::new()).unwrap();
        assert_eq!(watcher.hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_resolve_object_rejects_static_scope() {
        let watcher = Arc::new(Watcher {
            hits: AtomicUsize::new(0),
        });
        let err = BoundHandler::resolve_object(watcher, "onTick").unwrap_err();
        assert!(matches!(
            err,
            BindError::WrongScope {
                found: HandlerScope::Static,
                expected: HandlerScope::Instance,
                ..
            }
        ));
    }

    #[test]
    fn test_forward_delegates() {
        let inner = FnSubscriber::arc("inner", |event, _| {
            if event == "boom" {
                Err(HandlerError::invocation("inner", event, "refused"))
            } else {
                Ok(())
            }
        });
        let handler = BoundHandler::forward(inner);
        assert!(handler.notify("fine", &Args::new()).is_ok());
        assert!(handler.notify("boom", &Args::new()).is_err());
        assert_eq!(handler.name(), "forward:inner");
    }
}

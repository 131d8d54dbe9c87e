//! # Method Locator Contract
//!
//! The registry never reflects over types at runtime. Instead, a type (or an
//! object) reports its own conventionally named handler methods as
//! [`HandlerSpec`]s: the declared method name, whether the method is
//! callable without an instance, and the callable itself. The registry
//! consumes these only at construction/registration time; steady-state
//! dispatch never touches a locator.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use reverb::locator::{HandlerSource, HandlerSpec};
//!
//! struct Watcher;
//!
//! impl HandlerSource for Watcher {
//!     fn handlers(self: Arc<Self>) -> Vec<HandlerSpec> {
//!         vec![HandlerSpec::instance("onFileChange", {
//!             let me = self.clone();
//!             move |_event, _args| {
//!                 let _ = &me;
//!                 Ok(())
//!             }
//!         })]
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::args::Args;
use crate::subscriber::NotifyResult;

/// Whether a located handler is callable without an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum HandlerScope {
    Static,
    Instance,
}

/// The callable form of a located handler method.
pub type HandlerFn = Arc<dyn Fn(&str, &Args) -> NotifyResult<()> + Send + Sync>;

/// One handler method reported by a locator: declared name, scope, callable.
#[derive(Clone)]
pub struct HandlerSpec {
    method: String,
    scope: HandlerScope,
    call: HandlerFn,
}

impl HandlerSpec {
    /// Class-level handler, callable without an instance.
    pub fn stat<F>(method: impl Into<String>, call: F) -> Self
    where
        F: Fn(&str, &Args) -> NotifyResult<()> + Send + Sync + 'static,
    {
        Self {
            method: method.into(),
            scope: HandlerScope::Static,
            call: Arc::new(call),
        }
    }

    /// Instance-level handler, bound to one object.
    pub fn instance<F>(method: impl Into<String>, call: F) -> Self
    where
        F: Fn(&str, &Args) -> NotifyResult<()> + Send + Sync + 'static,
    {
        Self {
            method: method.into(),
            scope: HandlerScope::Instance,
            call: Arc::new(call),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn scope(&self) -> HandlerScope {
        self.scope
    }

    pub fn call(&self) -> &HandlerFn {
        &self.call
    }
}

impl std::fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerSpec")
            .field("method", &self.method)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Class-level locator: enumerate the handlers of a type that need no
/// instance. Consumed by [`EventRegistry::from_class`] and
/// [`EventRegistry::register_class`].
///
/// [`EventRegistry::from_class`]: crate::event_registry::EventRegistry::from_class
/// [`EventRegistry::register_class`]: crate::event_registry::EventRegistry::register_class
pub trait StaticHandlers {
    fn static_handlers() -> Vec<HandlerSpec>;
}

/// Instance-level locator: enumerate the handlers bound to this object.
/// Implementations clone the `Arc` receiver into each returned callable.
pub trait HandlerSource: Send + Sync {
    fn handlers(self: Arc<Self>) -> Vec<HandlerSpec>;
}

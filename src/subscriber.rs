//! # Subscriber Capability
//!
//! Anything that can receive `(event, args)` implements [`Subscriber`]; the
//! registry stores subscribers as [`SubscriberRef`] trait objects and keys
//! set membership on [`SubscriberHandle`] pointer identity. Two clones of
//! one `Arc` are the same subscriber; two separately allocated subscribers
//! are always distinct, even when their contents compare equal.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use lazy_static::lazy_static;
use thiserror::Error;
use tracing::trace;

use crate::args::Args;

/// A handler invocation failure surfaced through [`Subscriber::notify`].
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("handler '{target}' failed on '{event}': {message}")]
    Invocation {
        target: String,
        event: String,
        message: String,
    },

    #[error("handler '{target}' panicked on '{event}': {message}")]
    Panicked {
        target: String,
        event: String,
        message: String,
    },
}

impl HandlerError {
    pub fn invocation(
        target: impl Into<String>,
        event: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        HandlerError::Invocation {
            target: target.into(),
            event: event.into(),
            message: message.into(),
        }
    }
}

pub type NotifyResult<T> = Result<T, HandlerError>;

/// # Subscriber
///
/// The capability stored in an event's subscriber set. `notify` receives the
/// emitted event name and the shared argument bundle; it runs on the
/// emitting thread and its failures are routed per the registry's failure
/// policy.
pub trait Subscriber: Send + Sync {
    fn notify(&self, event: &str, args: &Args) -> NotifyResult<()>;

    /// Diagnostic name used in logs and failure reports.
    fn name(&self) -> &str {
        "subscriber"
    }
}

/// Shared reference to a subscriber; the unit of registration and removal.
pub type SubscriberRef = Arc<dyn Subscriber>;

/// Identity wrapper keying set membership on the `Arc` allocation, never on
/// subscriber contents.
#[derive(Clone)]
pub struct SubscriberHandle(SubscriberRef);

impl SubscriberHandle {
    pub fn new(subscriber: SubscriberRef) -> Self {
        Self(subscriber)
    }

    pub fn subscriber(&self) -> &SubscriberRef {
        &self.0
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for SubscriberHandle {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for SubscriberHandle {}

impl Hash for SubscriberHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl std::fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("name", &self.0.name())
            .field("addr", &self.addr())
            .finish()
    }
}

/// Closure adapter: wrap a function as a named subscriber.
///
/// ```rust
/// use reverb::subscriber::{FnSubscriber, Subscriber};
///
/// let printer = FnSubscriber::arc("printer", |event, _args| {
///     println!("saw {event}");
///     Ok(())
/// });
/// assert_eq!(printer.name(), "printer");
/// ```
pub struct FnSubscriber {
    name: String,
    f: Box<dyn Fn(&str, &Args) -> NotifyResult<()> + Send + Sync>,
}

impl FnSubscriber {
    pub fn arc<F>(name: impl Into<String>, f: F) -> SubscriberRef
    where
        F: Fn(&str, &Args) -> NotifyResult<()> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: name.into(),
            f: Box::new(f),
        })
    }
}

impl Subscriber for FnSubscriber {
    fn notify(&self, event: &str, args: &Args) -> NotifyResult<()> {
        (self.f)(event, args)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// The stock fallback: absorbs any `(event, args)` with a trace-level note.
#[derive(Debug, Default)]
pub struct NullSubscriber;

impl Subscriber for NullSubscriber {
    fn notify(&self, event: &str, args: &Args) -> NotifyResult<()> {
        trace!(event, params = args.len(), "event absorbed by null subscriber");
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

lazy_static! {
    static ref NULL: SubscriberRef = Arc::new(NullSubscriber);
}

/// Process-shared no-op subscriber; the default fallback of every registry.
pub fn null_subscriber() -> SubscriberRef {
    NULL.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_handle_identity_same_arc() {
        let sub = FnSubscriber::arc("a", |_, _| Ok(()));
        let h1 = SubscriberHandle::new(sub.clone());
        let h2 = SubscriberHandle::new(sub);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_handle_identity_distinct_allocations() {
        let a = FnSubscriber::arc("same-name", |_, _| Ok(()));
        let b = FnSubscriber::arc("same-name", |_, _| Ok(()));
        assert_ne!(SubscriberHandle::new(a), SubscriberHandle::new(b));
    }

    #[test]
    fn test_handle_dedups_in_set() {
        let sub = FnSubscriber::arc("a", |_, _| Ok(()));
        let other = FnSubscriber::arc("b", |_, _| Ok(()));
        let mut set = HashSet::new();
        assert!(set.insert(SubscriberHandle::new(sub.clone())));
        assert!(!set.insert(SubscriberHandle::new(sub)));
        assert!(set.insert(SubscriberHandle::new(other)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_null_subscriber_accepts_anything() {
        let args = Args::pairs([("x", 1i64)]);
        assert!(null_subscriber().notify("whatever", &args).is_ok());
    }
}

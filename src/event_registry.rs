//! # Event Registry
//!
//! The registry maps event names to sets of subscribers and dispatches
//! emissions to the current set. It is the only shared mutable state in the
//! crate and every operation on it is safe under concurrent callers: one
//! thread may emit while another adds or removes subscribers for the same
//! or different event names.
//!
//! ## Dispatch semantics
//!
//! - An event with **no entry** falls back to the registry's fallback
//!   subscriber.
//! - An event whose entry **exists but is empty** delivers to nobody and
//!   does NOT fall back. `remove_event` deletes an entry; removing the last
//!   subscriber does not.
//! - `emit` snapshots the member set before invoking anyone, so handlers
//!   may re-enter the registry (add, remove, emit) without deadlock. An
//!   emit observes registrations that happened-before it started; order
//!   among members is unspecified.
//! - Handler failures (returned errors and caught panics) are routed per
//!   [`FailurePolicy`].
//!
//! ## Example
//!
//! ```rust
//! use reverb::args::Args;
//! use reverb::event_registry::EventRegistry;
//! use reverb::subscriber::FnSubscriber;
//!
//! let registry = EventRegistry::new();
//! registry.add(
//!     "spill",
//!     FnSubscriber::arc("printer", |event, args| {
//!         println!("{event}: {} params", args.len());
//!         Ok(())
//!     }),
//! );
//! registry.emit_with("spill", [("x", 1i64)]).unwrap();
//! ```

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use tracing::{debug, error, instrument, trace};

use crate::args::{Args, Value};
use crate::bound_handler::BoundHandler;
use crate::config::RegistryConfig;
use crate::fatal::{ExitReporter, FailurePolicy, FatalReporter};
use crate::locator::{HandlerScope, HandlerSource, StaticHandlers};
use crate::naming::{event_for_method, DEFAULT_HANDLER_PREFIX};
use crate::subscriber::{null_subscriber, HandlerError, SubscriberHandle, SubscriberRef};

/// Result of one `emit`. `Err` is only possible under
/// [`FailurePolicy::Propagate`].
pub type EmitResult<T> = Result<T, HandlerError>;

/// # EventRegistry
///
/// Event-name-to-subscriber-set mapping with concurrency-safe add, remove
/// and emit. Entries are created lazily on first `add` and deleted only by
/// [`remove_event`](Self::remove_event) or [`clear`](Self::clear).
///
/// Event names are opaque keys; the registry applies no normalization and
/// accepts any string (including the empty string) a caller hands it.
pub struct EventRegistry {
    events: DashMap<String, HashSet<SubscriberHandle>>,
    fallback: RwLock<SubscriberRef>,
    policy: FailurePolicy,
    reporter: Arc<dyn FatalReporter>,
    prefix: String,
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("events", &self.events)
            .field("policy", &self.policy)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Builder for registries that need a non-default policy, reporter,
/// fallback or handler prefix.
#[derive(Default)]
pub struct RegistryBuilder {
    policy: FailurePolicy,
    reporter: Option<Arc<dyn FatalReporter>>,
    fallback: Option<SubscriberRef>,
    prefix: Option<String>,
}

impl RegistryBuilder {
    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn FatalReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn fallback(mut self, fallback: SubscriberRef) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn handler_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn build(self) -> EventRegistry {
        EventRegistry {
            events: DashMap::new(),
            fallback: RwLock::new(self.fallback.unwrap_or_else(null_subscriber)),
            policy: self.policy,
            reporter: self.reporter.unwrap_or_else(|| Arc::new(ExitReporter)),
            prefix: self
                .prefix
                .unwrap_or_else(|| DEFAULT_HANDLER_PREFIX.to_string()),
        }
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRegistry {
    /// Empty registry with defaults: [`FailurePolicy::Terminate`], the
    /// exiting reporter, the null fallback and the `"on"` handler prefix.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self::builder()
            .policy(config.failure_policy)
            .handler_prefix(config.handler_prefix)
            .build()
    }

    /// Registry pre-populated from a type's class-level handlers.
    pub fn from_class<T: StaticHandlers>() -> Self {
        let registry = Self::new();
        registry.register_class::<T>();
        registry
    }

    /// Registry pre-populated from one object's instance-level handlers.
    pub fn from_object<T: HandlerSource + 'static>(obj: &Arc<T>) -> Self {
        let registry = Self::new();
        registry.register_object(obj);
        registry
    }

    /// Scan `T`'s class-level handlers and register each under its derived
    /// event name. Instance-scoped specs and names outside the handler
    /// convention are skipped.
    pub fn register_class<T: StaticHandlers>(&self) -> &Self {
        let target = std::any::type_name::<T>();
        for spec in T::static_handlers() {
            if spec.scope() != HandlerScope::Static {
                continue;
            }
            let event = match event_for_method(spec.method(), &self.prefix) {
                Some(event) => event,
                None => continue,
            };
            trace!(%event, method = spec.method(), "registering class handler");
            self.add(&event, Arc::new(BoundHandler::from_spec(target, &spec)));
        }
        self
    }

    /// Scan `obj`'s instance-level handlers and register each under its
    /// derived event name. Static-scoped specs and names outside the
    /// handler convention are skipped.
    pub fn register_object<T: HandlerSource + 'static>(&self, obj: &Arc<T>) -> &Self {
        let target = std::any::type_name::<T>();
        for spec in Arc::clone(obj).handlers() {
            if spec.scope() != HandlerScope::Instance {
                continue;
            }
            let event = match event_for_method(spec.method(), &self.prefix) {
                Some(event) => event,
                None => continue,
            };
            trace!(%event, method = spec.method(), "registering object handler");
            self.add(&event, Arc::new(BoundHandler::from_spec(target, &spec)));
        }
        self
    }

    /// Register `sub` under `event`, creating the entry on first use.
    /// Adding the same `Arc` twice is a no-op.
    pub fn add(&self, event: &str, sub: SubscriberRef) -> &Self {
        self.events
            .entry(event.to_string())
            .or_default()
            .insert(SubscriberHandle::new(sub));
        self
    }

    /// Register every subscriber in `subs` under `event`.
    pub fn add_all<I>(&self, event: &str, subs: I) -> &Self
    where
        I: IntoIterator<Item = SubscriberRef>,
    {
        let mut entry = self.events.entry(event.to_string()).or_default();
        for sub in subs {
            entry.insert(SubscriberHandle::new(sub));
        }
        self
    }

    /// Register one subscriber under every event name in `events`.
    pub fn add_each<I, E>(&self, events: I, sub: SubscriberRef) -> &Self
    where
        I: IntoIterator<Item = E>,
        E: AsRef<str>,
    {
        for event in events {
            self.add(event.as_ref(), sub.clone());
        }
        self
    }

    /// Merge a whole event-to-subscribers mapping into the registry.
    pub fn add_map(&self, map: HashMap<String, Vec<SubscriberRef>>) -> &Self {
        for (event, subs) in map {
            self.add_all(&event, subs);
        }
        self
    }

    /// Resolve `method` against `T`'s class-level handlers and register the
    /// binding under `event`. An unresolvable method is a configuration
    /// error routed to the fatal reporter, never a returned value.
    pub fn add_static_method<T: StaticHandlers>(&self, event: &str, method: &str) -> &Self {
        match BoundHandler::resolve_static::<T>(method) {
            Ok(handler) => self.add(event, Arc::new(handler)),
            Err(err) => {
                self.reporter.fatal(&err.into());
                self
            }
        }
    }

    /// Resolve `method` against `obj`'s instance-level handlers and
    /// register the binding under `event`. Unresolvable methods go to the
    /// fatal reporter.
    pub fn add_object_method<T: HandlerSource + 'static>(
        &self,
        event: &str,
        obj: &Arc<T>,
        method: &str,
    ) -> &Self {
        match BoundHandler::resolve_object(Arc::clone(obj), method) {
            Ok(handler) => self.add(event, Arc::new(handler)),
            Err(err) => {
                self.reporter.fatal(&err.into());
                self
            }
        }
    }

    /// Remove one subscriber from one event's set. A missing entry or a
    /// subscriber that was never added is a silent no-op.
    pub fn remove(&self, event: &str, sub: &SubscriberRef) -> &Self {
        if let Some(mut entry) = self.events.get_mut(event) {
            entry.remove(&SubscriberHandle::new(sub.clone()));
        }
        self
    }

    /// Remove every subscriber in `subs` from one event's set.
    pub fn remove_all<'a, I>(&self, event: &str, subs: I) -> &Self
    where
        I: IntoIterator<Item = &'a SubscriberRef>,
    {
        if let Some(mut entry) = self.events.get_mut(event) {
            for sub in subs {
                entry.remove(&SubscriberHandle::new(sub.clone()));
            }
        }
        self
    }

    /// Remove one subscriber from every event name in `events`.
    pub fn remove_each<I, E>(&self, events: I, sub: &SubscriberRef) -> &Self
    where
        I: IntoIterator<Item = E>,
        E: AsRef<str>,
    {
        for event in events {
            self.remove(event.as_ref(), sub);
        }
        self
    }

    /// Remove a whole event-to-subscribers mapping from the registry.
    pub fn remove_map(&self, map: &HashMap<String, Vec<SubscriberRef>>) -> &Self {
        for (event, subs) in map {
            self.remove_all(event, subs.iter());
        }
        self
    }

    /// Delete the entire entry for `event`; later emits of it fall back.
    pub fn remove_event(&self, event: &str) -> &Self {
        self.events.remove(event);
        self
    }

    /// Drop every registration; all emits fall back afterwards.
    pub fn clear(&self) -> &Self {
        self.events.clear();
        self
    }

    pub fn contains_event(&self, event: &str) -> bool {
        self.events.contains_key(event)
    }

    /// Current size of `event`'s subscriber set, `None` when the event has
    /// no entry at all. The `None`/`Some(0)` distinction mirrors the
    /// fallback rule.
    pub fn subscriber_count(&self, event: &str) -> Option<usize> {
        self.events.get(event).map(|set| set.len())
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn handler_prefix(&self) -> &str {
        &self.prefix
    }

    /// Replace the fallback subscriber used for events with no entry.
    /// Emits running concurrently observe either the old or the new
    /// instance, never a torn state.
    pub fn set_fallback(&self, fallback: SubscriberRef) -> &Self {
        let mut slot = match self.fallback.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = fallback;
        drop(slot);
        self
    }

    fn current_fallback(&self) -> SubscriberRef {
        let slot = match self.fallback.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.clone()
    }

    /// Deliver `(event, args)` to every subscriber registered under
    /// `event`, or to the fallback when the event has no entry.
    #[instrument(skip(self, args))]
    pub fn emit(&self, event: &str, args: &Args) -> EmitResult<&Self> {
        let members = match self.events.get(event) {
            Some(set) => set
                .iter()
                .map(|handle| handle.subscriber().clone())
                .collect::<Vec<_>>(),
            None => {
                trace!(event, "no entry, delivering to fallback");
                let fallback = self.current_fallback();
                self.dispatch(&fallback, event, args)?;
                return Ok(self);
            }
        };
        debug!(event, members = members.len(), "emitting");
        for sub in &members {
            self.dispatch(sub, event, args)?;
        }
        Ok(self)
    }

    /// Positional convenience: build the bundle from `(key, value)` pairs,
    /// then emit.
    pub fn emit_with<I, K, V>(&self, event: &str, pairs: I) -> EmitResult<&Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let args = Args::pairs(pairs);
        self.emit(event, &args)
    }

    fn dispatch(&self, sub: &SubscriberRef, event: &str, args: &Args) -> EmitResult<()> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| sub.notify(event, args)));
        let err = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => err,
            Err(payload) => HandlerError::Panicked {
                target: sub.name().to_string(),
                event: event.to_string(),
                message: panic_message(payload),
            },
        };
        match self.policy {
            FailurePolicy::Terminate => {
                self.reporter.fatal(&err.into());
                Ok(())
            }
            FailurePolicy::LogAndContinue => {
                error!(%err, "handler failure, continuing");
                Ok(())
            }
            FailurePolicy::Propagate => Err(err),
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fatal::MockFatalReporter;
    use crate::subscriber::{FnSubscriber, Subscriber};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting() -> (SubscriberRef, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let captured = hits.clone();
        let sub = FnSubscriber::arc("counting", move |_, _| {
            captured.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        (sub, hits)
    }

    #[test]
    fn test_add_then_emit_delivers() {
        let registry = EventRegistry::new();
        let (sub, hits) = counting();
        registry.add("spill", sub);
        registry.emit("spill", &Args::new()).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_add_is_idempotent() {
        let registry = EventRegistry::new();
        let (sub, hits) = counting();
        registry.add("spill", sub.clone()).add("spill", sub);
        registry.emit("spill", &Args::new()).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(registry.subscriber_count("spill"), Some(1));
    }

    #[test]
    fn test_chaining_returns_self() {
        let registry = EventRegistry::new();
        let (sub, hits) = counting();
        registry
            .add("a", sub.clone())
            .add("b", sub)
            .emit("a", &Args::new())
            .unwrap()
            .emit("b", &Args::new())
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_terminate_policy_routes_to_reporter_and_continues() {
        let mut mock = MockFatalReporter::new();
        mock.expect_fatal().times(1).return_const(());
        let registry = EventRegistry::builder().reporter(Arc::new(mock)).build();

        let failing = FnSubscriber::arc("failing", |event, _| {
            Err(HandlerError::invocation("failing", event, "refused"))
        });
        let (ok_sub, hits) = counting();
        registry.add("spill", failing).add("spill", ok_sub);
        registry.emit("spill", &Args::new()).unwrap();
        // both members were dispatched: one reported, one delivered
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_propagate_policy_returns_error() {
        let registry = EventRegistry::builder()
            .policy(FailurePolicy::Propagate)
            .build();
        let failing = FnSubscriber::arc("failing", |event, _| {
            Err(HandlerError::invocation("failing", event, "refused"))
        });
        registry.add("spill", failing);
        assert!(registry.emit("spill", &Args::new()).is_err());
    }

    #[test]
    fn test_panicking_handler_is_caught() {
        let registry = EventRegistry::builder()
            .policy(FailurePolicy::Propagate)
            .build();
        registry.add("spill", FnSubscriber::arc("bomb", |_, _| panic!("kaboom")));
        let err = registry.emit("spill", &Args::new()).unwrap_err();
        assert!(matches!(err, HandlerError::Panicked { .. }));
        assert!(err.to_string().contains("kaboom"));
    }

    #[test]
    fn test_reentrant_handler_does_not_deadlock() {
        let registry = Arc::new(
            EventRegistry::builder()
                .policy(FailurePolicy::Propagate)
                .build(),
        );
        let (inner, hits) = counting();
        let reentrant_registry = registry.clone();
        let inner_for_handler = inner.clone();
        registry.add(
            "outer",
            FnSubscriber::arc("reentrant", move |_, args| {
                reentrant_registry
                    .add("outer", inner_for_handler.clone())
                    .emit("inner", args)
                    .map(|_| ())
            }),
        );
        registry.emit("outer", &Args::new()).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        // the add from inside the handler is visible to the next emit
        registry.emit("outer", &Args::new()).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fallback_distinction_none_vs_empty() {
        let fallback_hits = Arc::new(AtomicUsize::new(0));
        let captured = fallback_hits.clone();
        let registry = EventRegistry::builder()
            .fallback(FnSubscriber::arc("recorder", move |_, _| {
                captured.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .build();

        registry.emit("ghost", &Args::new()).unwrap();
        assert_eq!(fallback_hits.load(Ordering::SeqCst), 1);

        let (sub, _) = counting();
        registry.add("ghost", sub.clone()).remove("ghost", &sub);
        assert_eq!(registry.subscriber_count("ghost"), Some(0));
        registry.emit("ghost", &Args::new()).unwrap();
        // entry exists but is empty: nobody is notified, no fallback
        assert_eq!(fallback_hits.load(Ordering::SeqCst), 1);
    }

    struct NamedNull;

    impl Subscriber for NamedNull {
        fn notify(&self, _: &str, _: &Args) -> crate::subscriber::NotifyResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let registry = EventRegistry::new();
        let sub: SubscriberRef = Arc::new(NamedNull);
        registry
            .remove("never-added", &sub)
            .remove_event("never-added");
        assert_eq!(registry.event_count(), 0);
    }
}

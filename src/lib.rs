//! # Reverb: concurrent in-process publish/subscribe
//!
//! Reverb maps named events to sets of subscribers and delivers emissions
//! to every currently registered handler, passing the event name and a
//! keyed argument bundle. Registration, removal and emission are all safe
//! under concurrent callers without external locking.
//!
//! ## Architecture
//!
//! ```text
//! caller ── add / remove ──► EventRegistry ── emit(event, args) ──┐
//!                             │ DashMap<event, {subscribers}>     │
//!                             │ fallback slot                     ▼
//!                             │                      Subscriber::notify
//!                             │                        │          │
//!                             └── no entry ──► fallback┘   BoundHandler
//!                                                          (located method)
//! ```
//!
//! ### 1. Subscriber capability
//! Any `Send + Sync` type implementing [`Subscriber`] can register; set
//! membership is keyed on `Arc` identity, so duplicate adds of one handler
//! are no-ops and removal is exact ([`subscriber`]).
//!
//! ### 2. Method binding
//! Types and objects expose conventionally named handler methods through
//! the locator traits ([`locator`]); [`bound_handler`] adapts a located
//! method to the subscriber capability, and [`naming`] derives the event
//! name (`onFileChange` -> `file-change`).
//!
//! ### 3. Fallback
//! An event with no registry entry is delivered to the registry's fallback
//! subscriber, so emitting never needs special-casing. An entry that exists
//! but is empty delivers to nobody instead ([`event_registry`]).
//!
//! ### 4. Failure policy
//! Handler binding and invocation failures are fail-fast by default: routed
//! to a [`FatalReporter`] that terminates the process. The policy is a
//! per-registry choice ([`fatal`]).
//!
//! ## Example
//!
//! ```rust
//! use reverb::{Args, EventRegistry, FnSubscriber};
//!
//! let registry = EventRegistry::new();
//! registry.add(
//!     "file-change",
//!     FnSubscriber::arc("logger", |event, args| {
//!         println!("{event} with {} params", args.len());
//!         Ok(())
//!     }),
//! );
//! registry.emit("file-change", &Args::pairs([("path", "/tmp/x")])).unwrap();
//! registry.emit("unheard-of", &Args::new()).unwrap(); // fallback, not an error
//! ```

pub mod args;
pub mod bound_handler;
pub mod config;
pub mod error;
pub mod event_registry;
pub mod fatal;
pub mod locator;
pub mod naming;
pub mod subscriber;

// Re-exports
pub use args::{Args, Value};
pub use bound_handler::{BindError, BoundHandler};
pub use config::RegistryConfig;
pub use error::{Error, Result};
pub use event_registry::{EmitResult, EventRegistry, RegistryBuilder};
pub use fatal::{ExitReporter, FailurePolicy, FatalReporter};
pub use locator::{HandlerFn, HandlerScope, HandlerSource, HandlerSpec, StaticHandlers};
pub use naming::{event_for_method, hyphen_case, DEFAULT_HANDLER_PREFIX};
pub use subscriber::{
    null_subscriber, FnSubscriber, HandlerError, NotifyResult, NullSubscriber, Subscriber,
    SubscriberHandle, SubscriberRef,
};

//! # Fatal Reporting and Failure Policy
//!
//! Handler-binding and handler-invocation failures are configuration and
//! programming errors, not recoverable runtime conditions. The registry
//! routes them to a [`FatalReporter`]; the stock [`ExitReporter`] logs and
//! terminates the process. Tests substitute a recording reporter to assert
//! on the routed errors without dying.
//!
//! [`FailurePolicy`] widens the original terminate-only behavior into an
//! explicit per-registry choice.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::Error;

/// Sink for unrecoverable failures.
#[cfg_attr(test, mockall::automock)]
pub trait FatalReporter: Send + Sync {
    fn fatal(&self, err: &Error);
}

/// Default reporter: log the failure and terminate the process.
#[derive(Debug, Default)]
pub struct ExitReporter;

impl FatalReporter for ExitReporter {
    fn fatal(&self, err: &Error) {
        error!(%err, "fatal event dispatch failure");
        std::process::exit(1);
    }
}

/// How `emit` treats a failing handler.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FailurePolicy {
    /// Route the failure to the fatal reporter. The stock reporter exits;
    /// a non-terminating reporter records it and dispatch continues.
    #[default]
    Terminate,
    /// Log the failure and keep delivering.
    LogAndContinue,
    /// Return the first failure to the emitting caller; the rest of that
    /// one emission is skipped.
    Propagate,
}

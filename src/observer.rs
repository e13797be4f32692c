//! Reporting what the engine does.
//!
//! The engine never logs directly. It hands [`Event`]s to an [`Observer`]; the default
//! [`LogObserver`] forwards them to the `log` facade, and any `Fn(&Event)` closure can stand in
//! for tests or for callers with their own reporting.

use std::fmt;

use crate::error::Error;
use crate::types::Uid;

/// The two things the engine can be asked to do.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operation {
    /// Find a reset token, build the link, delete the message it came from.
    RetrieveResetLink,
    /// Delete every message with a matching subject.
    PurgeMatching,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Operation::RetrieveResetLink => "retrieve reset link",
            Operation::PurgeMatching => "purge matching mail",
        })
    }
}

/// Something that happened during an operation.
#[derive(Debug)]
#[non_exhaustive]
pub enum Event<'a> {
    /// About to open a session.
    Connecting { host: &'a str, port: u16 },
    /// The subject search returned `matches` messages.
    Searched { subject: &'a str, matches: usize },
    /// A candidate was fetched and inspected.
    Inspected { uid: Uid, token_found: bool },
    /// A message was flagged `\Deleted`.
    Marked { uid: Uid },
    /// Flagged messages were expunged.
    Expunged,
    /// The session was closed.
    Closed,
    /// Every message matching `subject` was purged.
    Purged { subject: &'a str, count: usize },
    /// The operation failed.
    Failed {
        operation: Operation,
        error: &'a Error,
    },
    /// Closing the session failed after the operation itself finished.
    TeardownFailed { error: &'a Error },
    /// The connection died, so no teardown could be attempted. Messages flagged so far stay
    /// flagged but are not expunged.
    TeardownSkipped { error: &'a Error },
}

/// Receives [`Event`]s from the engine.
pub trait Observer {
    /// Called synchronously, in order, for every event.
    fn notify(&self, event: &Event<'_>);
}

impl<F> Observer for F
where
    F: Fn(&Event<'_>),
{
    fn notify(&self, event: &Event<'_>) {
        self(event)
    }
}

/// Forwards events to the `log` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn notify(&self, event: &Event<'_>) {
        match *event {
            Event::Connecting { host, port } => log::info!("connecting to {}:{}", host, port),
            Event::Searched { subject, matches } => {
                log::debug!("{} message(s) with subject {:?}", matches, subject)
            }
            Event::Inspected { uid, token_found } => {
                log::debug!("inspected message {}: token found: {}", uid, token_found)
            }
            Event::Marked { uid } => log::debug!("flagged message {} as deleted", uid),
            Event::Expunged => log::debug!("expunged flagged messages"),
            Event::Closed => log::debug!("session closed"),
            Event::Purged { subject, count } => {
                log::info!("cleaned up {} mail(s) with subject {:?}", count, subject)
            }
            Event::Failed { operation, error } => log::error!("failed to {}: {}", operation, error),
            Event::TeardownFailed { error } => log::warn!("could not close session: {}", error),
            Event::TeardownSkipped { error } => {
                log::warn!("connection lost, flagged messages were not expunged: {}", error)
            }
        }
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn notify(&self, _event: &Event<'_>) {}
}

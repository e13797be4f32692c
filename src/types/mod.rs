//! This module contains the types shared by the session, the extractors and the engine.

use std::fmt;

/// From section [2.3.1.1 of RFC 3501](https://tools.ietf.org/html/rfc3501#section-2.3.1.1).
///
/// A 32-bit value assigned to each message, unique within a mailbox and stable until the message
/// is expunged. Unique identifiers are assigned in a strictly ascending fashion as messages are
/// added to the mailbox, which is why the server returns search results in arrival order.
pub type Uid = u32;

/// Where a [`Session`](crate::client::Session) is in its lifecycle.
///
/// A session is only ever handed out once it is authenticated; `Disconnected` describes a
/// connector that has not produced one yet.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SessionState {
    /// No connection has been established.
    Disconnected,
    /// Logged in, no mailbox selected.
    Authenticated,
    /// Logged in with a mailbox selected; deletions can be staged and expunged.
    Selected,
    /// Logged out. No further commands are sent.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            SessionState::Disconnected => "disconnected",
            SessionState::Authenticated => "authenticated",
            SessionState::Selected => "selected",
            SessionState::Closed => "closed",
        })
    }
}

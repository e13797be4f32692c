//! The mailbox operations the engine needs from an open session.

use std::io::{Read, Write};

use crate::client::Session;
use crate::error::ProtocolResult;
use crate::types::{SessionState, Uid};

/// An authenticated session against one mailbox store.
///
/// [`Session`] implements this over a live IMAP connection;
/// [`testing::FakeMailbox`](crate::testing) implements it in memory.
pub trait MailStore {
    /// Select the configured mailbox.
    fn select_mailbox(&mut self, mailbox: &str) -> ProtocolResult<()>;

    /// UIDs of the messages whose subject contains `subject`, in server order.
    fn search_subject(&mut self, subject: &str) -> ProtocolResult<Vec<Uid>>;

    /// The full message with the given UID, or `None` if it no longer exists.
    fn fetch_message(&mut self, uid: Uid) -> ProtocolResult<Option<Vec<u8>>>;

    /// Flag a message for deletion. Nothing is removed until [`expunge`](MailStore::expunge).
    fn mark_deleted(&mut self, uid: Uid) -> ProtocolResult<()>;

    /// Permanently remove every flagged message.
    fn expunge(&mut self) -> ProtocolResult<()>;

    /// Leave the mailbox and log out. Must be a no-op on a closed session.
    fn close(&mut self) -> ProtocolResult<()>;

    /// Where the session is in its lifecycle.
    fn state(&self) -> SessionState;
}

impl<T: Read + Write> MailStore for Session<T> {
    fn select_mailbox(&mut self, mailbox: &str) -> ProtocolResult<()> {
        self.select(mailbox)
    }

    fn search_subject(&mut self, subject: &str) -> ProtocolResult<Vec<Uid>> {
        self.uid_search_subject(subject)
    }

    fn fetch_message(&mut self, uid: Uid) -> ProtocolResult<Option<Vec<u8>>> {
        self.uid_fetch_rfc822(uid)
    }

    fn mark_deleted(&mut self, uid: Uid) -> ProtocolResult<()> {
        self.uid_mark_deleted(uid)
    }

    fn expunge(&mut self) -> ProtocolResult<()> {
        Session::expunge(self)
    }

    fn close(&mut self) -> ProtocolResult<()> {
        Session::close(self)
    }

    fn state(&self) -> SessionState {
        Session::state(self)
    }
}

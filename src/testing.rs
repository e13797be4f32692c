//! Enable the test_helpers feature to get an in-memory mailbox for testing code that drives a
//! [`MailboxEngine`](crate::MailboxEngine) without a mail server.
//!
//! ```toml
//! [dev-dependencies]
//! mailtoken = { version = "0.1", features = ["test_helpers"] }
//! ```
//!
//! [`FakeMailbox`] is both the [`Connector`] and, through the sessions it opens, the
//! [`MailStore`]. Clones share the same mailbox, so a test keeps one handle to inspect what the
//! engine did with the other.
//!
//! ```
//! use mailtoken::testing::FakeMailbox;
//! use mailtoken::{Account, MailboxEngine};
//!
//! let mailbox = FakeMailbox::new();
//! let uid = mailbox.deliver_html("Reset your password", r#"<a href="https://x/y?token=T1">Reset</a>"#);
//!
//! let engine = MailboxEngine::with_connector(Account::new("imap.test", "qa", "pw"), mailbox.clone());
//! let link = engine.retrieve_reset_link("Reset your password", "https://app.test").unwrap();
//!
//! assert_eq!(link.as_deref(), Some("https://app.test/password/reset?token=T1"));
//! assert_eq!(mailbox.expunged(), vec![uid]);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use mail_parser::MessageParser;

use crate::config::Account;
use crate::connector::Connector;
use crate::error::{Error, ProtocolError, ProtocolResult};
use crate::store::MailStore;
use crate::types::{SessionState, Uid};

/// Where a scripted failure strikes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    /// Opening the connection.
    Connect,
    /// `LOGIN`.
    Login,
    /// `SELECT`.
    Select,
    /// `UID SEARCH`.
    Search,
    /// `UID FETCH` of this message.
    Fetch(Uid),
    /// `UID STORE` on this message.
    Store(Uid),
    /// `EXPUNGE`.
    Expunge,
    /// `CLOSE`/`LOGOUT`.
    Close,
}

/// How a scripted failure looks to the client.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Failure {
    /// The server answers `NO`.
    Rejected,
    /// The server answers `BAD`.
    Bad,
    /// The connection drops. Every later command on the session fails too.
    Disconnect,
}

impl Failure {
    fn to_error(self, stage: Stage) -> ProtocolError {
        match self {
            Failure::Rejected => ProtocolError::No(format!("{:?} rejected", stage)),
            Failure::Bad => ProtocolError::Bad(format!("{:?} not understood", stage)),
            Failure::Disconnect => ProtocolError::ConnectionLost,
        }
    }
}

#[derive(Debug)]
struct Message {
    uid: Uid,
    subject: String,
    raw: Vec<u8>,
    deleted: bool,
}

#[derive(Debug, Default)]
struct State {
    messages: Vec<Message>,
    last_uid: Uid,
    password: Option<String>,
    failures: Vec<(Stage, Failure)>,
    disconnected: bool,
    session: Option<SessionState>,
    opened: usize,
    closed: usize,
    fetched: Vec<Uid>,
    marked: Vec<Uid>,
    expunged: Vec<Uid>,
}

impl State {
    fn check(&mut self, stage: Stage) -> ProtocolResult<()> {
        if self.disconnected {
            return Err(ProtocolError::ConnectionLost);
        }
        let failure = self
            .failures
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|&(_, f)| f);
        match failure {
            Some(failure) => {
                if failure == Failure::Disconnect {
                    self.disconnected = true;
                }
                Err(failure.to_error(stage))
            }
            None => Ok(()),
        }
    }

    fn remove_deleted(&mut self) {
        let (gone, kept): (Vec<Message>, Vec<Message>) =
            self.messages.drain(..).partition(|m| m.deleted);
        self.messages = kept;
        self.expunged.extend(gone.into_iter().map(|m| m.uid));
    }
}

/// An in-memory mailbox with IMAP's two-phase delete.
#[derive(Clone, Debug, Default)]
pub struct FakeMailbox {
    state: Rc<RefCell<State>>,
}

/// A session opened on a [`FakeMailbox`].
#[derive(Debug)]
pub struct FakeSession {
    state: Rc<RefCell<State>>,
}

impl FakeMailbox {
    /// An empty mailbox that accepts any credentials.
    pub fn new() -> Self {
        FakeMailbox::default()
    }

    /// Only accept this password at login.
    pub fn with_password(self, password: impl Into<String>) -> Self {
        self.state.borrow_mut().password = Some(password.into());
        self
    }

    /// Make the given stage fail every time it is reached.
    pub fn fail(&self, stage: Stage, failure: Failure) {
        self.state.borrow_mut().failures.push((stage, failure));
    }

    /// Store a raw RFC 822 message and return its UID. The subject is read from its headers.
    pub fn deliver(&self, raw: impl Into<Vec<u8>>) -> Uid {
        let raw = raw.into();
        let subject = MessageParser::default()
            .parse(&raw)
            .and_then(|m| m.subject().map(str::to_string))
            .unwrap_or_default();

        let mut state = self.state.borrow_mut();
        state.last_uid += 1;
        let uid = state.last_uid;
        state.messages.push(Message {
            uid,
            subject,
            raw,
            deleted: false,
        });
        uid
    }

    /// Store a single-part `text/html` message.
    pub fn deliver_html(&self, subject: &str, html: &str) -> Uid {
        self.deliver(format!(
            "From: noreply@example.com\r\n\
             To: qa@example.com\r\n\
             Subject: {}\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: text/html; charset=utf-8\r\n\
             \r\n\
             {}\r\n",
            subject, html
        ))
    }

    /// UIDs of the messages still in the mailbox, flagged or not.
    pub fn uids(&self) -> Vec<Uid> {
        self.state.borrow().messages.iter().map(|m| m.uid).collect()
    }

    /// UIDs of the messages currently flagged `\Deleted` but not yet expunged.
    pub fn flagged(&self) -> Vec<Uid> {
        self.state
            .borrow()
            .messages
            .iter()
            .filter(|m| m.deleted)
            .map(|m| m.uid)
            .collect()
    }

    /// Every UID that was fetched, in order.
    pub fn fetched(&self) -> Vec<Uid> {
        self.state.borrow().fetched.clone()
    }

    /// Every UID that was flagged, in order.
    pub fn marked(&self) -> Vec<Uid> {
        self.state.borrow().marked.clone()
    }

    /// Every UID that was permanently removed, in order.
    pub fn expunged(&self) -> Vec<Uid> {
        self.state.borrow().expunged.clone()
    }

    /// How many sessions were opened.
    pub fn opens(&self) -> usize {
        self.state.borrow().opened
    }

    /// How many times a session was closed while still open.
    pub fn closes(&self) -> usize {
        self.state.borrow().closed
    }

    /// State of the most recent session, `Disconnected` if none was ever opened.
    pub fn session_state(&self) -> SessionState {
        self.state
            .borrow()
            .session
            .unwrap_or(SessionState::Disconnected)
    }
}

impl Connector for FakeMailbox {
    type Store = FakeSession;

    fn open(&self, account: &Account) -> Result<FakeSession, Error> {
        let mut state = self.state.borrow_mut();
        state.disconnected = false;
        state.check(Stage::Connect).map_err(Error::Connect)?;
        state.check(Stage::Login).map_err(Error::Auth)?;
        if let Some(ref password) = state.password {
            if *password != account.password {
                return Err(Error::Auth(ProtocolError::No(
                    "Authentication failed.".to_string(),
                )));
            }
        }

        state.opened += 1;
        state.session = Some(SessionState::Authenticated);
        Ok(FakeSession {
            state: Rc::clone(&self.state),
        })
    }
}

impl FakeSession {
    fn set_state(&self, session: SessionState) {
        self.state.borrow_mut().session = Some(session);
    }
}

impl MailStore for FakeSession {
    fn select_mailbox(&mut self, _mailbox: &str) -> ProtocolResult<()> {
        self.state.borrow_mut().check(Stage::Select)?;
        self.set_state(SessionState::Selected);
        Ok(())
    }

    fn search_subject(&mut self, subject: &str) -> ProtocolResult<Vec<Uid>> {
        let mut state = self.state.borrow_mut();
        state.check(Stage::Search)?;
        // SEARCH SUBJECT is a case-insensitive substring match
        let needle = subject.to_lowercase();
        Ok(state
            .messages
            .iter()
            .filter(|m| m.subject.to_lowercase().contains(&needle))
            .map(|m| m.uid)
            .collect())
    }

    fn fetch_message(&mut self, uid: Uid) -> ProtocolResult<Option<Vec<u8>>> {
        let mut state = self.state.borrow_mut();
        state.check(Stage::Fetch(uid))?;
        state.fetched.push(uid);
        Ok(state
            .messages
            .iter()
            .find(|m| m.uid == uid)
            .map(|m| m.raw.clone()))
    }

    fn mark_deleted(&mut self, uid: Uid) -> ProtocolResult<()> {
        let mut state = self.state.borrow_mut();
        state.check(Stage::Store(uid))?;
        state.marked.push(uid);
        if let Some(m) = state.messages.iter_mut().find(|m| m.uid == uid) {
            m.deleted = true;
        }
        Ok(())
    }

    fn expunge(&mut self) -> ProtocolResult<()> {
        let mut state = self.state.borrow_mut();
        state.check(Stage::Expunge)?;
        state.remove_deleted();
        Ok(())
    }

    fn close(&mut self) -> ProtocolResult<()> {
        let mut state = self.state.borrow_mut();
        let was = state.session.unwrap_or(SessionState::Disconnected);
        if was == SessionState::Closed {
            return Ok(());
        }

        state.closed += 1;
        state.session = Some(SessionState::Closed);
        state.check(Stage::Close)?;
        // like a real server, CLOSE silently expunges what is still flagged
        if was == SessionState::Selected {
            state.remove_deleted();
        }
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.state
            .borrow()
            .session
            .unwrap_or(SessionState::Disconnected)
    }
}

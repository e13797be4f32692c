//! Retrieving reset links from, and cleaning up, a test mailbox.

use crate::body::BodyPolicy;
use crate::config::Account;
use crate::connector::Connector;
use crate::error::{Error, Result};
use crate::observer::{Event, LogObserver, Observer, Operation};
use crate::selection::SelectionOrder;
use crate::store::MailStore;
use crate::token::{extract_token, reset_url};
use crate::types::{SessionState, Uid};

#[cfg(feature = "native-tls")]
use crate::connector::TlsConnector;

/// Runs mailbox operations for one [`Account`].
///
/// Every operation opens its own session, selects the account's mailbox, does its work and
/// then expunges and closes the session again, whether the work succeeded or not. The only
/// exception is a lost connection: nothing can be sent any more, so messages flagged before the
/// connection dropped stay flagged and are reported through [`Event::TeardownSkipped`].
///
/// ```no_run
/// use mailtoken::{Account, MailboxEngine};
///
/// # fn main() -> Result<(), mailtoken::Error> {
/// let engine = MailboxEngine::new(Account::new("imap.example.com", "qa@example.com", "hunter2"));
/// if let Some(link) = engine.retrieve_reset_link("Reset your password", "https://app.example.com")? {
///     println!("{}", link);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MailboxEngine<C, O = LogObserver> {
    account: Account,
    connector: C,
    observer: O,
    selection: SelectionOrder,
    body: BodyPolicy,
}

#[cfg(feature = "native-tls")]
impl MailboxEngine<TlsConnector> {
    /// An engine that talks to the account's server over implicit TLS.
    pub fn new(account: Account) -> Self {
        MailboxEngine::with_connector(account, TlsConnector::new())
    }
}

impl<C: Connector> MailboxEngine<C> {
    /// An engine that opens its sessions through `connector` and logs through [`LogObserver`].
    pub fn with_connector(account: Account, connector: C) -> Self {
        MailboxEngine {
            account,
            connector,
            observer: LogObserver,
            selection: SelectionOrder::default(),
            body: BodyPolicy::default(),
        }
    }
}

impl<C: Connector, O: Observer> MailboxEngine<C, O> {
    /// Report events to `observer` instead.
    pub fn with_observer<P: Observer>(self, observer: P) -> MailboxEngine<C, P> {
        MailboxEngine {
            account: self.account,
            connector: self.connector,
            observer,
            selection: self.selection,
            body: self.body,
        }
    }

    /// The order in which matching messages are inspected by
    /// [`retrieve_reset_link`](MailboxEngine::retrieve_reset_link).
    pub fn selection_order(mut self, order: SelectionOrder) -> Self {
        self.selection = order;
        self
    }

    /// How a message's body is located.
    pub fn body_policy(mut self, policy: BodyPolicy) -> Self {
        self.body = policy;
        self
    }

    /// The account this engine operates on.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Find the password reset mail with the given subject and return the reset link for
    /// `site`.
    ///
    /// Matching messages are fetched one at a time in the engine's [`SelectionOrder`] until one
    /// carries a token. That message, and only that one, is deleted. `Ok(None)` means no
    /// matching message carried a token.
    pub fn retrieve_reset_link(&self, subject: &str, site: &str) -> Result<Option<String>> {
        let token = self.with_session(|store| self.find_and_mark(store, subject))?;
        Ok(token.map(|token| reset_url(site, &token)))
    }

    /// Delete every message whose subject contains `subject`, returning how many there were.
    ///
    /// Running this on a mailbox with no matches succeeds with `0`.
    pub fn purge_matching(&self, subject: &str) -> Result<usize> {
        let count = self.with_session(|store| {
            let uids = self.search(store, subject)?;
            for &uid in &uids {
                self.mark(store, uid)?;
            }
            Ok(uids.len())
        })?;
        self.notify(&Event::Purged { subject, count });
        Ok(count)
    }

    /// Like [`retrieve_reset_link`](MailboxEngine::retrieve_reset_link), but failures are only
    /// reported to the observer and come back as `None`.
    pub fn reset_link(&self, subject: &str, site: &str) -> Option<String> {
        self.retrieve_reset_link(subject, site)
            .unwrap_or_else(|error| {
                self.failed(Operation::RetrieveResetLink, &error);
                None
            })
    }

    /// Like [`purge_matching`](MailboxEngine::purge_matching), but only says whether the
    /// purge went through. Failures are reported to the observer.
    pub fn clean_mailbox(&self, subject: &str) -> bool {
        match self.purge_matching(subject) {
            Ok(_) => true,
            Err(error) => {
                self.failed(Operation::PurgeMatching, &error);
                false
            }
        }
    }

    fn find_and_mark<S: MailStore>(&self, store: &mut S, subject: &str) -> Result<Option<String>> {
        let uids = self.search(store, subject)?;

        for uid in self.selection.arrange(&uids) {
            let raw = store
                .fetch_message(uid)
                .map_err(|e| Error::Fetch(uid, e))?;

            let token = match raw {
                Some(raw) => match self.body.extract(uid, &raw)? {
                    Some(body) => extract_token(uid, &body)?,
                    None => None,
                },
                // gone since the search, most likely expunged by someone else
                None => None,
            };
            self.notify(&Event::Inspected {
                uid,
                token_found: token.is_some(),
            });

            if token.is_some() {
                self.mark(store, uid)?;
                return Ok(token);
            }
        }
        Ok(None)
    }

    fn search<S: MailStore>(&self, store: &mut S, subject: &str) -> Result<Vec<Uid>> {
        let uids = store.search_subject(subject).map_err(Error::Search)?;
        self.notify(&Event::Searched {
            subject,
            matches: uids.len(),
        });
        Ok(uids)
    }

    fn mark<S: MailStore>(&self, store: &mut S, uid: Uid) -> Result<()> {
        store.mark_deleted(uid).map_err(Error::Mutate)?;
        self.notify(&Event::Marked { uid });
        Ok(())
    }

    /// Open a session, select the mailbox, run `work` and tear the session down again.
    fn with_session<R, F>(&self, work: F) -> Result<R>
    where
        F: FnOnce(&mut C::Store) -> Result<R>,
    {
        self.notify(&Event::Connecting {
            host: &self.account.host,
            port: self.account.port,
        });
        let mut store = self.connector.open(&self.account)?;

        let outcome = store
            .select_mailbox(&self.account.mailbox)
            .map_err(Error::Select)
            .and_then(|()| work(&mut store));

        match outcome {
            Err(error) if error.is_connection_lost() => {
                self.notify(&Event::TeardownSkipped { error: &error });
                Err(error)
            }
            outcome => self.teardown(&mut store, outcome),
        }
    }

    // An earlier error always wins over one raised while tearing down.
    fn teardown<S: MailStore, R>(&self, store: &mut S, outcome: Result<R>) -> Result<R> {
        let mut outcome = outcome;

        if store.state() == SessionState::Selected {
            match store.expunge() {
                Ok(()) => self.notify(&Event::Expunged),
                Err(e) => {
                    let error = Error::Mutate(e);
                    if error.is_connection_lost() {
                        self.notify(&Event::TeardownSkipped { error: &error });
                        return outcome.and(Err(error));
                    }
                    outcome = outcome.and(Err(error));
                }
            }
        }

        match store.close() {
            Ok(()) => self.notify(&Event::Closed),
            Err(e) => self.notify(&Event::TeardownFailed {
                error: &Error::Mutate(e),
            }),
        }
        outcome
    }

    fn failed(&self, operation: Operation, error: &Error) {
        self.notify(&Event::Failed { operation, error });
    }

    fn notify(&self, event: &Event<'_>) {
        self.observer.notify(event);
    }
}

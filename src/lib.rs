//! Fetching password reset links from a test mailbox over IMAP.
//!
//! End-to-end tests of a sign-in flow eventually need the link the application mailed out. This
//! crate logs in to the mailbox the application sends to, finds the reset mail by subject, pulls
//! the token out of its HTML body, deletes the mail so the next run starts clean, and hands back
//! the reset link. It can also purge every mail with a given subject.
//!
//! # Usage
//!
//! ```no_run
//! use mailtoken::{Account, MailboxEngine};
//!
//! fn main() {
//!     let account = Account::new("imap.example.com", "qa@example.com", "hunter2");
//!     let engine = MailboxEngine::new(account);
//!
//!     match engine.retrieve_reset_link("Reset your password", "https://app.example.com") {
//!         Ok(Some(link)) => println!("{}", link),
//!         Ok(None) => println!("no reset mail yet"),
//!         Err(e) => println!("could not check the mailbox: {}", e),
//!     };
//!
//!     // start the next test with an empty inbox
//!     if !engine.clean_mailbox("Reset your password") {
//!         println!("cleanup failed, see the log");
//!     }
//! }
//! ```
//!
//! Which message is inspected first when several match, and how far into a multipart message
//! the body is looked for, are configurable through [`SelectionOrder`] and [`BodyPolicy`].
//! Progress and failures are reported to an [`Observer`], by default the `log` crate.

mod parse;
mod types;

pub mod body;
pub mod client;
pub mod config;
pub mod connector;
pub mod engine;
pub mod error;
pub mod observer;
pub mod selection;
pub mod store;
pub mod token;

pub use body::{Body, BodyPolicy, BodyType};
pub use config::{Account, ConfigError};
pub use connector::{login, Connector};
#[cfg(feature = "native-tls")]
pub use connector::TlsConnector;
pub use engine::MailboxEngine;
pub use error::{Error, ParseError, ProtocolError, Result};
pub use observer::{Event, LogObserver, NullObserver, Observer, Operation};
pub use selection::SelectionOrder;
pub use store::MailStore;
pub use types::*;

#[cfg(any(test, feature = "test_helpers"))]
pub mod testing;

#[cfg(test)]
mod mock_stream;

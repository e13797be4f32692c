//! IMAP protocol errors and the stage-tagged errors reported by the mailbox engine.

use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;
use std::result;
use std::str::Utf8Error;

use bufstream::IntoInnerError as BufError;
#[cfg(feature = "native-tls")]
use native_tls::Error as TlsError;

use crate::types::Uid;

/// A convenience wrapper around `Result` for [`Error`].
pub type Result<T> = result::Result<T, Error>;

/// A convenience wrapper around `Result` for [`ProtocolError`].
pub type ProtocolResult<T> = result::Result<T, ProtocolError>;

/// Errors that can occur while talking to the IMAP server.
#[derive(Debug)]
#[non_exhaustive]
pub enum ProtocolError {
    /// An `io::Error` that occurred while trying to read or write to a network stream.
    Io(IoError),
    /// An error from the `native_tls` library while setting up the connector.
    #[cfg(feature = "native-tls")]
    Tls(TlsError),
    /// The TLS handshake with the server failed.
    TlsHandshake(String),
    /// A BAD response from the IMAP server.
    Bad(String),
    /// A NO response from the IMAP server.
    No(String),
    /// The connection was terminated unexpectedly.
    ConnectionLost,
    /// The server sent something that could not be parsed as an IMAP response.
    Malformed(Vec<u8>),
    /// An argument contained a character that cannot be sent in a quoted string.
    Validate(ValidateError),
}

impl ProtocolError {
    /// Whether this error means the connection can no longer be used at all.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, ProtocolError::ConnectionLost | ProtocolError::Io(_))
    }
}

impl From<IoError> for ProtocolError {
    fn from(err: IoError) -> ProtocolError {
        ProtocolError::Io(err)
    }
}

impl<T> From<BufError<T>> for ProtocolError {
    fn from(err: BufError<T>) -> ProtocolError {
        ProtocolError::Io(err.into())
    }
}

#[cfg(feature = "native-tls")]
impl From<TlsError> for ProtocolError {
    fn from(err: TlsError) -> ProtocolError {
        ProtocolError::Tls(err)
    }
}

#[cfg(feature = "native-tls")]
impl<S: fmt::Debug + 'static> From<native_tls::HandshakeError<S>> for ProtocolError {
    fn from(err: native_tls::HandshakeError<S>) -> ProtocolError {
        ProtocolError::TlsHandshake(err.to_string())
    }
}

impl From<ValidateError> for ProtocolError {
    fn from(err: ValidateError) -> ProtocolError {
        ProtocolError::Validate(err)
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ProtocolError::Io(ref e) => fmt::Display::fmt(e, f),
            #[cfg(feature = "native-tls")]
            ProtocolError::Tls(ref e) => fmt::Display::fmt(e, f),
            ProtocolError::TlsHandshake(ref e) => write!(f, "TLS handshake failed: {}", e),
            ProtocolError::Bad(ref data) => write!(f, "Bad Response: {}", data),
            ProtocolError::No(ref data) => write!(f, "No Response: {}", data),
            ProtocolError::ConnectionLost => f.write_str("Connection lost"),
            ProtocolError::Malformed(ref data) => write!(
                f,
                "Unable to parse server response: {:?}",
                String::from_utf8_lossy(data)
            ),
            ProtocolError::Validate(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

impl StdError for ProtocolError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            ProtocolError::Io(ref e) => Some(e),
            #[cfg(feature = "native-tls")]
            ProtocolError::Tls(ref e) => Some(e),
            ProtocolError::Validate(ref e) => Some(e),
            _ => None,
        }
    }
}

/// An invalid character was found in a command argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateError(pub char);

impl fmt::Display for ValidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // print character in debug form because invalid ones are often whitespaces
        write!(f, "Invalid character in input: {:?}", self.0)
    }
}

impl StdError for ValidateError {}

/// A fetched message could not be turned into a body or a token.
#[derive(Debug)]
#[non_exhaustive]
pub enum ParseError {
    /// The message is not a parseable RFC 5322 / MIME message.
    Mime(Uid),
    /// The extracted body payload is not valid UTF-8.
    NotUtf8(Uid, Utf8Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ParseError::Mime(uid) => write!(f, "message {} is not a valid MIME message", uid),
            ParseError::NotUtf8(uid, _) => {
                write!(f, "body of message {} is not valid UTF-8 text", uid)
            }
        }
    }
}

impl StdError for ParseError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            ParseError::NotUtf8(_, ref e) => Some(e),
            _ => None,
        }
    }
}

/// The errors a mailbox operation can end with, tagged by the stage that failed.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// The connection or the TLS session could not be established.
    Connect(ProtocolError),
    /// The server rejected the credentials.
    Auth(ProtocolError),
    /// The default mailbox could not be selected.
    Select(ProtocolError),
    /// The subject search failed.
    Search(ProtocolError),
    /// A candidate message could not be fetched.
    Fetch(Uid, ProtocolError),
    /// A fetched message was malformed.
    Parse(ParseError),
    /// Marking a message deleted, or expunging, was rejected.
    Mutate(ProtocolError),
}

impl Error {
    /// The wire-level cause, if this failure came from the server conversation.
    pub fn protocol(&self) -> Option<&ProtocolError> {
        match *self {
            Error::Connect(ref e)
            | Error::Auth(ref e)
            | Error::Select(ref e)
            | Error::Search(ref e)
            | Error::Fetch(_, ref e)
            | Error::Mutate(ref e) => Some(e),
            Error::Parse(_) => None,
        }
    }

    /// Whether the session died with this error, so that no teardown can be sent.
    pub fn is_connection_lost(&self) -> bool {
        self.protocol().map_or(false, ProtocolError::is_connection_lost)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Connect(ref e) => write!(f, "could not connect: {}", e),
            Error::Auth(ref e) => write!(f, "login rejected: {}", e),
            Error::Select(ref e) => write!(f, "could not select mailbox: {}", e),
            Error::Search(ref e) => write!(f, "search failed: {}", e),
            Error::Fetch(uid, ref e) => write!(f, "could not fetch message {}: {}", uid, e),
            Error::Parse(ref e) => fmt::Display::fmt(e, f),
            Error::Mutate(ref e) => write!(f, "could not delete messages: {}", e),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Parse(ref e) => Some(e),
            _ => self.protocol().map(|e| e as &(dyn StdError + 'static)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn lost_connections_are_recognised_through_stages() {
        assert!(Error::Fetch(3, ProtocolError::ConnectionLost).is_connection_lost());
        assert!(Error::Search(ProtocolError::Io(IoError::new(ErrorKind::BrokenPipe, "gone")))
            .is_connection_lost());
        assert!(!Error::Mutate(ProtocolError::No("read-only".to_string())).is_connection_lost());
        assert!(!Error::Parse(ParseError::Mime(1)).is_connection_lost());
    }

    #[test]
    fn display_names_the_stage() {
        let e = Error::Auth(ProtocolError::No("[AUTHENTICATIONFAILED] nope".to_string()));
        assert_eq!(
            e.to_string(),
            "login rejected: No Response: [AUTHENTICATIONFAILED] nope"
        );
        assert!(e.source().is_some());
        assert!(Error::Parse(ParseError::Mime(9)).protocol().is_none());

        let e = Error::Search(ProtocolError::Validate(ValidateError('\n')));
        assert_eq!(
            e.to_string(),
            "search failed: Invalid character in input: '\\n'"
        );
        assert!(e.source().is_some());
    }
}

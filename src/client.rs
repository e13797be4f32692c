use bufstream::BufStream;
use imap_proto::{Response, Status};
use std::borrow::Cow;
use std::io::{BufRead, Read, Write};
use std::ops::{Deref, DerefMut};

use super::error::{ProtocolError, ProtocolResult, ValidateError};
use super::parse::{parse_rfc822, parse_search};
use super::types::{SessionState, Uid};

static TAG_PREFIX: &str = "a";
const INITIAL_TAG: u32 = 0;
const CR: u8 = 0x0d;
const LF: u8 = 0x0a;

macro_rules! quote {
    ($x:expr) => {
        format!("\"{}\"", $x.replace(r"\", r"\\").replace("\"", "\\\""))
    };
}

pub(crate) fn validate_str(value: &str) -> ProtocolResult<String> {
    let quoted = quote!(value);
    if quoted.find('\n').is_some() {
        return Err(ValidateError('\n').into());
    }
    if quoted.find('\r').is_some() {
        return Err(ValidateError('\r').into());
    }
    Ok(quoted)
}

// A literal may carry 8-bit text, but a line break would still end the search key early.
fn validate_literal(value: &str) -> ProtocolResult<&[u8]> {
    for c in ['\n', '\r'] {
        if value.contains(c) {
            return Err(ValidateError(c).into());
        }
    }
    Ok(value.as_bytes())
}

// The tagged answer a server gives instead of a `+` continuation.
fn refusal(line: &[u8]) -> ProtocolError {
    match imap_proto::parser::parse_response(line) {
        Ok((
            _,
            Response::Done {
                status: Status::Bad,
                information,
                ..
            },
        )) => ProtocolError::Bad(explain(information)),
        Ok((
            _,
            Response::Done {
                status: Status::No,
                information,
                ..
            },
        )) => ProtocolError::No(explain(information)),
        _ => ProtocolError::Malformed(line.to_vec()),
    }
}

fn explain(information: Option<Cow<'_, str>>) -> String {
    information
        .map(|s| s.into_owned())
        .unwrap_or_else(|| "no explanation given".to_string())
}

/// The tagged command stream shared by [`Client`] and [`Session`].
#[derive(Debug)]
pub struct Connection<T: Read + Write> {
    pub(crate) stream: BufStream<T>,
    tag: u32,

    /// Echo the protocol conversation through `log::trace!`.
    pub debug: bool,
}

/// An unauthenticated connection to an IMAP server.
///
/// The only useful thing to do with a `Client` is to [`login`](Client::login), which turns it
/// into a [`Session`].
#[derive(Debug)]
pub struct Client<T: Read + Write> {
    conn: Connection<T>,
}

/// An authenticated IMAP session.
///
/// The session only speaks the handful of commands needed to find, read and delete messages in
/// a single mailbox. Call [`close`](Session::close) when done; it is safe to call more than once.
#[derive(Debug)]
pub struct Session<T: Read + Write> {
    conn: Connection<T>,
    state: SessionState,
}

impl<T: Read + Write> Deref for Client<T> {
    type Target = Connection<T>;

    fn deref(&self) -> &Connection<T> {
        &self.conn
    }
}

impl<T: Read + Write> DerefMut for Client<T> {
    fn deref_mut(&mut self) -> &mut Connection<T> {
        &mut self.conn
    }
}

impl<T: Read + Write> Deref for Session<T> {
    type Target = Connection<T>;

    fn deref(&self) -> &Connection<T> {
        &self.conn
    }
}

impl<T: Read + Write> DerefMut for Session<T> {
    fn deref_mut(&mut self) -> &mut Connection<T> {
        &mut self.conn
    }
}

impl<T: Read + Write> Client<T> {
    /// Creates a new client over a connected (and, in practice, already encrypted) stream.
    ///
    /// The server greeting has not been consumed yet; call [`read_greeting`](Client::read_greeting)
    /// before issuing commands.
    pub fn new(stream: T) -> Client<T> {
        Client {
            conn: Connection::new(stream),
        }
    }

    /// Read the untagged greeting the server sends when the connection opens.
    ///
    /// A `* BYE` greeting means the server refuses the connection and is reported as an error.
    pub fn read_greeting(&mut self) -> ProtocolResult<Vec<u8>> {
        let mut v = Vec::new();
        self.readline(&mut v)?;

        let refused = match imap_proto::parser::parse_response(&v) {
            Ok((
                _,
                Response::Data {
                    status: Status::Bye,
                    information,
                    ..
                },
            )) => Some(explain(information)),
            _ => None,
        };
        if let Some(why) = refused {
            return Err(ProtocolError::No(why));
        }
        Ok(v)
    }

    /// Log in to the IMAP server with a plaintext `LOGIN`.
    pub fn login(mut self, username: &str, password: &str) -> ProtocolResult<Session<T>> {
        let command = format!(
            "LOGIN {} {}",
            validate_str(username)?,
            validate_str(password)?
        );
        self.run_command_and_check_ok(&command)?;
        Ok(Session::new(self.conn))
    }
}

impl<T: Read + Write> Session<T> {
    fn new(conn: Connection<T>) -> Self {
        Session {
            conn,
            state: SessionState::Authenticated,
        }
    }

    /// Where this session is in its lifecycle.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Selects a mailbox so that its messages can be searched, fetched and deleted.
    pub fn select(&mut self, mailbox_name: &str) -> ProtocolResult<()> {
        let command = format!("SELECT {}", validate_str(mailbox_name)?);
        self.run_command_and_check_ok(&command)?;
        self.state = SessionState::Selected;
        Ok(())
    }

    /// Search the selected mailbox for messages whose subject contains `subject`.
    ///
    /// The UIDs come back in the order the server lists them, normally ascending by arrival.
    /// Quoted strings are 7-bit, so a subject with non-ASCII characters is sent as a UTF-8
    /// literal with `CHARSET UTF-8`.
    pub fn uid_search_subject(&mut self, subject: &str) -> ProtocolResult<Vec<Uid>> {
        let lines = if subject.is_ascii() {
            let command = format!("UID SEARCH SUBJECT {}", validate_str(subject)?);
            self.run_command_and_read_response(&command)?
        } else {
            let literal = validate_literal(subject)?;
            self.run_command_with_literal("UID SEARCH CHARSET UTF-8 SUBJECT", literal)?
        };
        parse_search(&lines)
    }

    /// Fetch the full RFC 822 message (headers and body) with the given UID.
    pub fn uid_fetch_rfc822(&mut self, uid: Uid) -> ProtocolResult<Option<Vec<u8>>> {
        self.run_command_and_read_response(&format!("UID FETCH {} (RFC822)", uid))
            .and_then(|lines| parse_rfc822(&lines, uid))
    }

    /// Set the `\Deleted` flag on a message. It is only removed by a later
    /// [`expunge`](Session::expunge).
    pub fn uid_mark_deleted(&mut self, uid: Uid) -> ProtocolResult<()> {
        self.run_command_and_check_ok(&format!("UID STORE {} +FLAGS (\\Deleted)", uid))
    }

    /// Expunge permanently removes all messages that have the `\Deleted` flag set from the
    /// currently selected mailbox.
    pub fn expunge(&mut self) -> ProtocolResult<()> {
        self.run_command_and_check_ok("EXPUNGE")
    }

    /// Leave the selected mailbox (if any) and log out.
    ///
    /// Both commands are attempted even if the first one fails, and the session counts as closed
    /// afterwards either way. Closing an already closed session sends nothing.
    pub fn close(&mut self) -> ProtocolResult<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }

        let closed = if self.state == SessionState::Selected {
            self.run_command_and_check_ok("CLOSE")
        } else {
            Ok(())
        };
        let logout = self.run_command_and_check_ok("LOGOUT");
        self.state = SessionState::Closed;
        closed.and(logout)
    }
}

impl<T: Read + Write> Connection<T> {
    fn new(stream: T) -> Connection<T> {
        Connection {
            stream: BufStream::new(stream),
            tag: INITIAL_TAG,
            debug: false,
        }
    }

    /// Runs a command and checks if it returns OK.
    pub fn run_command_and_check_ok(&mut self, command: &str) -> ProtocolResult<()> {
        self.run_command_and_read_response(command).map(|_| ())
    }

    /// Runs any command passed to it.
    pub fn run_command(&mut self, untagged_command: &str) -> ProtocolResult<()> {
        let command = self.create_command(untagged_command);
        self.write_line(command.as_bytes())
    }

    /// Runs a command and returns the untagged response lines that preceded its completion.
    pub fn run_command_and_read_response(&mut self, untagged_command: &str) -> ProtocolResult<Vec<u8>> {
        self.run_command(untagged_command)?;
        self.read_response()
    }

    /// Runs a command whose last argument is sent as a synchronizing literal, and returns the
    /// untagged response lines.
    ///
    /// The literal is only written once the server has answered the announcement with `+`.
    pub fn run_command_with_literal(
        &mut self,
        untagged_command: &str,
        literal: &[u8],
    ) -> ProtocolResult<Vec<u8>> {
        self.run_command(&format!("{} {{{}}}", untagged_command, literal.len()))?;

        let mut v = Vec::new();
        self.readline(&mut v)?;
        if !v.starts_with(b"+") {
            return Err(refusal(&v));
        }

        self.write_line(literal)?;
        self.read_response()
    }

    fn read_response(&mut self) -> ProtocolResult<Vec<u8>> {
        let mut v = Vec::new();
        self.read_response_onto(&mut v)?;
        Ok(v)
    }

    fn read_response_onto(&mut self, data: &mut Vec<u8>) -> ProtocolResult<()> {
        let mut continue_from = None;
        let match_tag = format!("{}{}", TAG_PREFIX, self.tag);
        loop {
            let line_start = {
                let start_new = data.len();
                self.readline(data)?;
                continue_from.take().unwrap_or(start_new)
            };

            let break_with = {
                let line = &data[line_start..];

                match imap_proto::parser::parse_response(line) {
                    Ok((
                        _,
                        Response::Done {
                            tag,
                            status,
                            information,
                            ..
                        },
                    )) => {
                        if tag.0 != match_tag {
                            Some(Err(ProtocolError::Malformed(line.to_vec())))
                        } else {
                            Some(match status {
                                Status::Ok => Ok(()),
                                Status::Bad => Err(ProtocolError::Bad(explain(information))),
                                Status::No => Err(ProtocolError::No(explain(information))),
                                _ => Err(ProtocolError::Malformed(line.to_vec())),
                            })
                        }
                    }
                    Ok(_) => None,
                    Err(nom::Err::Incomplete(_)) => {
                        // a literal spans several lines; re-parse once more has arrived
                        continue_from = Some(line_start);
                        None
                    }
                    Err(_) => Some(Err(ProtocolError::Malformed(line.to_vec()))),
                }
            };

            match break_with {
                Some(Ok(())) => {
                    data.truncate(line_start);
                    break Ok(());
                }
                Some(Err(e)) => break Err(e),
                None => {}
            }
        }
    }

    fn readline(&mut self, into: &mut Vec<u8>) -> ProtocolResult<usize> {
        let read = self.stream.read_until(LF, into)?;
        if read == 0 {
            return Err(ProtocolError::ConnectionLost);
        }

        if self.debug {
            let line = &into[(into.len() - read)..];
            log::trace!("S: {}", String::from_utf8_lossy(line).trim_end());
        }

        Ok(read)
    }

    fn create_command(&mut self, command: &str) -> String {
        self.tag += 1;
        format!("{}{} {}", TAG_PREFIX, self.tag, command)
    }

    fn write_line(&mut self, buf: &[u8]) -> ProtocolResult<()> {
        self.stream.write_all(buf)?;
        self.stream.write_all(&[CR, LF])?;
        self.stream.flush()?;
        if self.debug {
            log::trace!("C: {}", redact_login(&String::from_utf8_lossy(buf)));
        }
        Ok(())
    }
}

// keep credentials out of protocol traces
fn redact_login(line: &str) -> Cow<'_, str> {
    let mut parts = line.splitn(3, ' ');
    match (parts.next(), parts.next()) {
        (Some(tag), Some("LOGIN")) => Cow::Owned(format!("{} LOGIN <redacted>", tag)),
        _ => Cow::Borrowed(line),
    }
}

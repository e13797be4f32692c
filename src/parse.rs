use imap_proto::{AttributeValue, MailboxDatum, Response};

use super::error::{ProtocolError, ProtocolResult};
use super::types::Uid;

/// Collect the UIDs of every `* SEARCH` line, in the order the server sent them.
///
/// Unilateral responses (`EXISTS`, `RECENT`, `EXPUNGE`, flag `FETCH`es, ...) may be interleaved
/// with the search results; they carry nothing the engine acts on and are skipped.
pub(crate) fn parse_search(mut lines: &[u8]) -> ProtocolResult<Vec<Uid>> {
    let mut ids = Vec::new();
    loop {
        if lines.is_empty() {
            break Ok(ids);
        }

        match imap_proto::parser::parse_response(lines) {
            Ok((rest, Response::MailboxData(MailboxDatum::Search(found)))) => {
                lines = rest;
                ids.extend(found);
            }
            Ok((rest, other)) => {
                lines = rest;
                log::debug!("ignoring unilateral response during SEARCH: {:?}", other);
            }
            Err(_) => {
                break Err(ProtocolError::Malformed(lines.to_vec()));
            }
        }
    }
}

/// Pull the full message out of the response to `UID FETCH <uid> (RFC822)`.
///
/// Returns `None` when the server answered OK but sent no message for `uid`, which happens when
/// the message was expunged by someone else between the search and the fetch.
pub(crate) fn parse_rfc822(mut lines: &[u8], uid: Uid) -> ProtocolResult<Option<Vec<u8>>> {
    let mut message = None;
    loop {
        if lines.is_empty() {
            break Ok(message);
        }

        match imap_proto::parser::parse_response(lines) {
            Ok((rest, Response::Fetch(_, attrs))) => {
                lines = rest;

                let mut fetched_uid = None;
                let mut body = None;
                for attr in attrs {
                    match attr {
                        AttributeValue::Uid(u) => fetched_uid = Some(u),
                        AttributeValue::Rfc822(Some(raw)) => body = Some(raw.into_owned()),
                        _ => {}
                    }
                }

                // servers may push flag updates for other messages in the middle of the fetch
                if message.is_none() && fetched_uid.map_or(true, |u| u == uid) {
                    message = body;
                }
            }
            Ok((rest, _)) => {
                lines = rest;
            }
            Err(_) => {
                break Err(ProtocolError::Malformed(lines.to_vec()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_search_keeps_server_order() {
        let lines = b"* SEARCH 17 4 9\r\n";
        assert_eq!(parse_search(lines).unwrap(), vec![17, 4, 9]);
    }

    #[test]
    fn parse_search_empty() {
        assert!(parse_search(b"* SEARCH\r\n").unwrap().is_empty());
        assert!(parse_search(b"").unwrap().is_empty());
    }

    #[test]
    fn parse_search_w_unilateral() {
        let lines = b"\
            * SEARCH 23 42\r\n\
            * 1 RECENT\r\n\
            * 3 EXISTS\r\n\
            * SEARCH 4711\r\n";
        assert_eq!(parse_search(lines).unwrap(), vec![23, 42, 4711]);
    }

    #[test]
    fn parse_search_junk() {
        match parse_search(b"* JUNK 1 2 3\r\n") {
            Err(ProtocolError::Malformed(_)) => {}
            other => panic!("expected a malformed response, got {:?}", other),
        }
    }

    #[test]
    fn parse_rfc822_literal() {
        let body = "Subject: hi\r\n\r\nhello\r\n";
        let lines = format!(
            "* 2 FETCH (UID 42 RFC822 {{{}}}\r\n{})\r\n",
            body.len(),
            body
        );
        let fetched = parse_rfc822(lines.as_bytes(), 42).unwrap();
        assert_eq!(fetched.as_deref(), Some(body.as_bytes()));
    }

    #[test]
    fn parse_rfc822_skips_other_messages() {
        let body = "Subject: mine\r\n\r\nbody\r\n";
        let lines = format!(
            "* 1 FETCH (UID 7 FLAGS (\\Seen))\r\n\
             * 2 FETCH (UID 8 RFC822 {{{}}}\r\n{})\r\n",
            body.len(),
            body
        );
        let fetched = parse_rfc822(lines.as_bytes(), 8).unwrap();
        assert_eq!(fetched.as_deref(), Some(body.as_bytes()));
    }

    #[test]
    fn parse_rfc822_missing_message() {
        assert_eq!(parse_rfc822(b"", 5).unwrap(), None);
        assert_eq!(
            parse_rfc822(b"* 1 FETCH (UID 5 FLAGS (\\Seen))\r\n", 5).unwrap(),
            None
        );
    }
}

//! Picking the content payload out of a fetched message.
//!
//! A message is walked part by part in document order (the root part first, then its children,
//! depth first). The payload of the first `text/html` or `text/plain` part is the body. Multipart
//! containers of type `multipart/mixed` or `multipart/alternative` have no payload of their own
//! and are stepped into.
//!
//! What happens when a part is of any other type, or is an empty text part, depends on the
//! [`BodyPolicy`]. The default, [`BodyPolicy::FirstPartOnly`], gives up on the whole message at
//! that point, even when a later part would have had a usable payload.

use mail_parser::{MessageParser, MessagePart, MimeHeaders, PartType};

use crate::error::ParseError;
use crate::types::Uid;

/// The content types the body walk accepts.
///
/// Only the text types ever end up in a [`Body`]; the multipart types are accepted as containers
/// and walked into.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BodyType {
    /// `text/html`
    Html,
    /// `text/plain`
    Plain,
    /// `multipart/mixed`, walked into, never returned.
    MultipartMixed,
    /// `multipart/alternative`, walked into, never returned.
    MultipartAlternative,
}

impl BodyType {
    fn of(part: &MessagePart<'_>) -> Option<BodyType> {
        // RFC 2045: no Content-Type means text/plain
        let (ctype, subtype) = match part.content_type() {
            Some(ct) => (ct.ctype(), ct.subtype().unwrap_or("")),
            None => ("text", "plain"),
        };

        if ctype.eq_ignore_ascii_case("text") {
            if subtype.eq_ignore_ascii_case("html") {
                return Some(BodyType::Html);
            }
            if subtype.eq_ignore_ascii_case("plain") {
                return Some(BodyType::Plain);
            }
        } else if ctype.eq_ignore_ascii_case("multipart") {
            if subtype.eq_ignore_ascii_case("mixed") {
                return Some(BodyType::MultipartMixed);
            }
            if subtype.eq_ignore_ascii_case("alternative") {
                return Some(BodyType::MultipartAlternative);
            }
        }
        None
    }

    /// The MIME type, e.g. `text/html`.
    pub fn mime_type(&self) -> &'static str {
        match *self {
            BodyType::Html => "text/html",
            BodyType::Plain => "text/plain",
            BodyType::MultipartMixed => "multipart/mixed",
            BodyType::MultipartAlternative => "multipart/alternative",
        }
    }
}

/// The decoded payload of the part a message's body was taken from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Body {
    /// Type of the part the payload came from.
    pub content_type: BodyType,
    /// Transfer-decoded payload. Text parts are already converted to UTF-8.
    pub payload: Vec<u8>,
}

/// How to walk a message's parts when looking for its body.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum BodyPolicy {
    /// Stop at the first part that is neither an accepted type nor a container, and at the
    /// first empty text part, and report no body.
    ///
    /// A message whose first part is an empty `text/plain` has no body even if a later
    /// `text/html` part carries a token. Existing callers rely on this.
    #[default]
    FirstPartOnly,
    /// Skip unrecognised and empty parts and keep walking until a non-empty text part is found.
    FirstNonEmpty,
}

impl BodyPolicy {
    /// Parse `raw` as an RFC 5322 message and extract its body according to this policy.
    ///
    /// `uid` only serves to identify the message in errors.
    pub fn extract(&self, uid: Uid, raw: &[u8]) -> Result<Option<Body>, ParseError> {
        let message = MessageParser::default()
            .parse(raw)
            .ok_or(ParseError::Mime(uid))?;
        Ok(self.walk(&message.parts))
    }

    fn walk(&self, parts: &[MessagePart<'_>]) -> Option<Body> {
        for part in parts {
            let accepted = BodyType::of(part);
            let is_container = matches!(part.body, PartType::Multipart(_));

            match accepted {
                Some(_) if is_container => continue,
                Some(content_type) if !part.contents().is_empty() => {
                    return Some(Body {
                        content_type,
                        payload: part.contents().to_vec(),
                    });
                }
                _ if *self == BodyPolicy::FirstNonEmpty => continue,
                _ => return None,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(policy: BodyPolicy, raw: &str) -> Option<Body> {
        policy.extract(1, raw.as_bytes()).unwrap()
    }

    const HTML_ONLY: &str = "From: noreply@example.com\r\n\
        To: qa@example.com\r\n\
        Subject: Reset your password\r\n\
        MIME-Version: 1.0\r\n\
        Content-Type: text/html; charset=utf-8\r\n\
        \r\n\
        <p><a href=\"https://x/y?token=XYZ789\">Reset</a></p>\r\n";

    const ALTERNATIVE: &str = "From: noreply@example.com\r\n\
        Subject: Reset your password\r\n\
        MIME-Version: 1.0\r\n\
        Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
        \r\n\
        --b1\r\n\
        Content-Type: text/plain; charset=utf-8\r\n\
        \r\n\
        Follow the link to reset.\r\n\
        --b1\r\n\
        Content-Type: text/html; charset=utf-8\r\n\
        \r\n\
        <a href=\"https://x/y?token=ALT1\">Reset</a>\r\n\
        --b1--\r\n";

    const EMPTY_PLAIN_FIRST: &str = "From: noreply@example.com\r\n\
        Subject: Reset your password\r\n\
        MIME-Version: 1.0\r\n\
        Content-Type: multipart/alternative; boundary=\"b2\"\r\n\
        \r\n\
        --b2\r\n\
        Content-Type: text/plain; charset=utf-8\r\n\
        \r\n\
        \r\n\
        --b2\r\n\
        Content-Type: text/html; charset=utf-8\r\n\
        \r\n\
        <a href=\"https://x/y?token=LATE\">Reset</a>\r\n\
        --b2--\r\n";

    const RELATED: &str = "From: noreply@example.com\r\n\
        Subject: Reset your password\r\n\
        MIME-Version: 1.0\r\n\
        Content-Type: multipart/related; boundary=\"b3\"\r\n\
        \r\n\
        --b3\r\n\
        Content-Type: text/html; charset=utf-8\r\n\
        \r\n\
        <a href=\"https://x/y?token=REL\">Reset</a>\r\n\
        --b3--\r\n";

    const MIXED: &str = "From: noreply@example.com\r\n\
        Subject: Reset your password\r\n\
        MIME-Version: 1.0\r\n\
        Content-Type: multipart/mixed; boundary=\"m1\"\r\n\
        \r\n\
        --m1\r\n\
        Content-Type: text/html; charset=utf-8\r\n\
        \r\n\
        <a href=\"https://x/y?token=MIX\">Reset</a>\r\n\
        --m1\r\n\
        Content-Type: application/pdf; name=\"terms.pdf\"\r\n\
        Content-Disposition: attachment; filename=\"terms.pdf\"\r\n\
        Content-Transfer-Encoding: base64\r\n\
        \r\n\
        JVBERi0xLjQK\r\n\
        --m1--\r\n";

    const MIXED_AROUND_ALTERNATIVE: &str = "From: noreply@example.com\r\n\
        Subject: Reset your password\r\n\
        MIME-Version: 1.0\r\n\
        Content-Type: multipart/mixed; boundary=\"m2\"\r\n\
        \r\n\
        --m2\r\n\
        Content-Type: multipart/alternative; boundary=\"a2\"\r\n\
        \r\n\
        --a2\r\n\
        Content-Type: text/html; charset=utf-8\r\n\
        \r\n\
        <a href=\"https://x/y?token=NESTED\">Reset</a>\r\n\
        --a2--\r\n\
        --m2--\r\n";

    const BASE64_HTML: &str = "From: noreply@example.com\r\n\
        Subject: Reset your password\r\n\
        MIME-Version: 1.0\r\n\
        Content-Type: text/html; charset=utf-8\r\n\
        Content-Transfer-Encoding: base64\r\n\
        \r\n\
        PGEgaHJlZj0iaHR0cHM6Ly94L3k/dG9rZW49QjY0Ij5SZXNldDwvYT4=\r\n";

    #[test]
    fn single_html_part() {
        let body = extract(BodyPolicy::FirstPartOnly, HTML_ONLY).unwrap();
        assert_eq!(body.content_type, BodyType::Html);
        assert!(String::from_utf8(body.payload).unwrap().contains("token=XYZ789"));
    }

    #[test]
    fn missing_content_type_is_plain_text() {
        let raw = "Subject: Reset your password\r\n\r\ntoken=PLAIN\">\r\n";
        let body = extract(BodyPolicy::FirstPartOnly, raw).unwrap();
        assert_eq!(body.content_type, BodyType::Plain);
    }

    #[test]
    fn steps_into_alternative_and_takes_first_text() {
        let body = extract(BodyPolicy::FirstPartOnly, ALTERNATIVE).unwrap();
        assert_eq!(body.content_type, BodyType::Plain);
        assert!(String::from_utf8(body.payload)
            .unwrap()
            .starts_with("Follow the link"));
    }

    #[test]
    fn steps_into_mixed() {
        let body = extract(BodyPolicy::FirstPartOnly, MIXED).unwrap();
        assert_eq!(body.content_type, BodyType::Html);
        assert!(String::from_utf8(body.payload).unwrap().contains("token=MIX"));
    }

    #[test]
    fn steps_through_nested_containers() {
        for policy in [BodyPolicy::FirstPartOnly, BodyPolicy::FirstNonEmpty] {
            let body = extract(policy, MIXED_AROUND_ALTERNATIVE).unwrap();
            assert_eq!(body.content_type, BodyType::Html);
            assert!(String::from_utf8(body.payload).unwrap().contains("token=NESTED"));
        }
    }

    #[test]
    fn decodes_transfer_encoding() {
        let body = extract(BodyPolicy::FirstPartOnly, BASE64_HTML).unwrap();
        assert_eq!(
            body.payload,
            b"<a href=\"https://x/y?token=B64\">Reset</a>".to_vec()
        );
    }

    // Documented quirk: an empty first text part ends the walk, the html part is never looked at.
    #[test]
    fn empty_first_text_part_short_circuits() {
        assert_eq!(extract(BodyPolicy::FirstPartOnly, EMPTY_PLAIN_FIRST), None);
    }

    // Documented quirk: an unrecognised part type ends the walk.
    #[test]
    fn unrecognised_part_short_circuits() {
        assert_eq!(extract(BodyPolicy::FirstPartOnly, RELATED), None);
    }

    #[test]
    fn first_non_empty_keeps_walking() {
        let body = extract(BodyPolicy::FirstNonEmpty, EMPTY_PLAIN_FIRST).unwrap();
        assert_eq!(body.content_type, BodyType::Html);

        let body = extract(BodyPolicy::FirstNonEmpty, RELATED).unwrap();
        assert_eq!(body.content_type, BodyType::Html);
    }

    #[test]
    fn mime_type_names() {
        assert_eq!(BodyType::MultipartAlternative.mime_type(), "multipart/alternative");
        assert_eq!(BodyType::Html.mime_type(), "text/html");
    }
}

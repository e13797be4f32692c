//! Pulling the reset token out of a body and turning it into a link.

use lazy_static::lazy_static;
use regex::Regex;

use crate::body::Body;
use crate::error::ParseError;
use crate::types::Uid;

lazy_static! {
    // The token sits inside an anchor: <a href="https://site/...?token=XYZ">
    static ref TOKEN_IN_ANCHOR: Regex = Regex::new(r#"token=(.*?)">"#).unwrap();
}

/// The path a reset token is appended to.
pub const RESET_PATH: &str = "/password/reset?token=";

/// Find the token in `text`: everything between the first `token=` and the `">` that follows it.
///
/// An empty token (`token=">`) counts as no token.
pub fn find_token(text: &str) -> Option<&str> {
    TOKEN_IN_ANCHOR
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|token| !token.is_empty())
}

/// Decode `body` as UTF-8 and look for a token in it.
pub fn extract_token(uid: Uid, body: &Body) -> Result<Option<String>, ParseError> {
    let text = std::str::from_utf8(&body.payload).map_err(|e| ParseError::NotUtf8(uid, e))?;
    Ok(find_token(text).map(str::to_string))
}

/// The link a user follows to reset their password on `site`.
///
/// `site` is used verbatim, so it should not end with a slash.
pub fn reset_url(site: &str, token: &str) -> String {
    format!("{}{}{}", site, RESET_PATH, token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyType;

    fn html(payload: &[u8]) -> Body {
        Body {
            content_type: BodyType::Html,
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn token_from_anchor() {
        let text = r#"<p>Hi,</p><a href="https://x/y?token=ABC123">Reset</a>"#;
        assert_eq!(find_token(text), Some("ABC123"));
    }

    #[test]
    fn token_is_case_preserved_and_unpadded() {
        let text = r#"<a href="https://x/y?token=aBc-12_Z">"#;
        assert_eq!(find_token(text), Some("aBc-12_Z"));
    }

    #[test]
    fn stops_at_the_next_anchor_end() {
        let text = r#"<a href="https://x/y?token=FIRST">Reset</a> <a href="https://x/help">Help</a>"#;
        assert_eq!(find_token(text), Some("FIRST"));
    }

    #[test]
    fn first_match_wins() {
        let text = "<a href=\"/r?token=ONE\">a</a>\n<a href=\"/r?token=TWO\">b</a>";
        assert_eq!(find_token(text), Some("ONE"));
    }

    #[test]
    fn no_anchor_no_token() {
        assert_eq!(find_token("your token=ABC123 expires soon"), None);
        assert_eq!(find_token("nothing here"), None);
    }

    #[test]
    fn empty_token_is_absent() {
        assert_eq!(find_token(r#"<a href="/r?token=">"#), None);
    }

    #[test]
    fn token_does_not_span_lines() {
        assert_eq!(find_token("token=ABC\n\">"), None);
    }

    #[test]
    fn extract_from_body() {
        let body = html(br#"<a href="https://x/y?token=XYZ789">Reset</a>"#);
        assert_eq!(extract_token(4, &body).unwrap().as_deref(), Some("XYZ789"));
    }

    #[test]
    fn extract_rejects_invalid_utf8() {
        let body = html(b"token=\xff\xfe\">");
        match extract_token(4, &body) {
            Err(ParseError::NotUtf8(4, _)) => {}
            other => panic!("expected a UTF-8 error, got {:?}", other),
        }
    }

    #[test]
    fn builds_reset_url() {
        assert_eq!(
            reset_url("https://app.example.com", "XYZ789"),
            "https://app.example.com/password/reset?token=XYZ789"
        );
    }
}

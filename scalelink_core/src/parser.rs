//! Weight token extraction from raw serial frames.

use regex::bytes::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

// ASCII digits only; `\d` would also accept other Unicode digits.
#[allow(clippy::expect_used)]
static WEIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+\.[0-9]+").expect("literal pattern"));

/// First `digits '.' digits` token in `frame`, if any.
///
/// Sign, unit and status prefix are not part of the token: `ST,+0012.345kg`
/// yields `0012.345`.
pub fn extract_reading(frame: &[u8]) -> Option<&str> {
    WEIGHT
        .find(frame)
        .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
}

/// Frame as text for logging; invalid UTF-8 is replaced.
pub fn decode(frame: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_status_sign_and_unit() {
        assert_eq!(extract_reading(b"ST,+0012.345kg\r\n"), Some("0012.345"));
    }

    #[test]
    fn control_bytes_only() {
        assert_eq!(extract_reading(b"\x02\x03noise"), None);
    }

    #[test]
    fn invalid_utf8_around_token() {
        assert_eq!(extract_reading(b"\xff\xfe 1.5 \xc3"), Some("1.5"));
        assert!(decode(b"\xff1.5").contains("1.5"));
    }
}

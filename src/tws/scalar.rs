//! Scalar readers and their sentinel rules.
//!
//! | reader                  | empty token | special value            |
//! |-------------------------|-------------|--------------------------|
//! | `read_int`              | 0           |                          |
//! | `read_int_or_absent`    | absent      | 2147483647 ⇒ absent      |
//! | `read_double`           | 0.0         |                          |
//! | `read_double_or_absent` | absent      | f64::MAX ⇒ absent        |
//! | `read_decimal`          | absent      | f64::MAX, Infinity ⇒ absent |

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{DecodeError, DecodeResult};
use crate::tws::queue::TokenQueue;

/// Wire value standing in for an unset integer.
pub const UNSET_INTEGER: i32 = i32::MAX;
/// Wire value standing in for an unset double.
pub const UNSET_DOUBLE: f64 = f64::MAX;

/// Typed reads over a stream of string tokens.
///
/// Every read consumes exactly one token. Running out of tokens, or hitting a
/// message boundary, fails with [`DecodeError::Underrun`].
pub trait ScalarReader {
    fn next_token(&mut self) -> DecodeResult<&str>;

    fn read_string(&mut self) -> DecodeResult<String> {
        Ok(self.next_token()?.to_owned())
    }

    fn read_bool(&mut self) -> DecodeResult<bool> {
        Ok(self.read_int()? != 0)
    }

    fn read_int(&mut self) -> DecodeResult<i32> {
        let token = self.next_token()?;
        if token.is_empty() {
            return Ok(0);
        }
        parse_number(token, "int")
    }

    fn read_int_or_absent(&mut self) -> DecodeResult<Option<i32>> {
        let token = self.next_token()?;
        if token.is_empty() {
            return Ok(None);
        }
        let value: i32 = parse_number(token, "int")?;
        Ok((value != UNSET_INTEGER).then_some(value))
    }

    fn read_long(&mut self) -> DecodeResult<i64> {
        let token = self.next_token()?;
        if token.is_empty() {
            return Ok(0);
        }
        parse_number(token, "long")
    }

    fn read_double(&mut self) -> DecodeResult<f64> {
        let token = self.next_token()?;
        if token.is_empty() {
            return Ok(0.0);
        }
        parse_number(token, "double")
    }

    fn read_double_or_absent(&mut self) -> DecodeResult<Option<f64>> {
        let token = self.next_token()?;
        if token.is_empty() {
            return Ok(None);
        }
        let value: f64 = parse_number(token, "double")?;
        Ok((value != UNSET_DOUBLE).then_some(value))
    }

    fn read_decimal(&mut self) -> DecodeResult<Option<Decimal>> {
        let token = self.next_token()?;
        parse_decimal(token)
    }
}

impl ScalarReader for TokenQueue {
    /// A boundary marker is left in place so the caller can still skip to it.
    fn next_token(&mut self) -> DecodeResult<&str> {
        if self.at_boundary() {
            return Err(DecodeError::Underrun("End of message reached.".into()));
        }
        match self.shift() {
            Some(Some(token)) => Ok(token),
            _ => Err(DecodeError::Underrun("No more tokens queued.".into())),
        }
    }
}

fn parse_number<T: FromStr>(token: &str, kind: &'static str) -> DecodeResult<T> {
    token.trim().parse().map_err(|_| DecodeError::InvalidNumber {
        kind,
        token: token.to_owned(),
    })
}

fn parse_decimal(token: &str) -> DecodeResult<Option<Decimal>> {
    let cleaned: String = token.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("infinity") {
        return Ok(None);
    }
    if cleaned.parse::<f64>().is_ok_and(|v| v == UNSET_DOUBLE) {
        return Ok(None);
    }
    Decimal::from_str(cleaned)
        .or_else(|_| Decimal::from_scientific(cleaned))
        .map(Some)
        .map_err(|_| DecodeError::InvalidNumber {
            kind: "decimal",
            token: token.to_owned(),
        })
}

/// Token for a maybe-absent integer field: absent encodes as an empty token.
pub fn encode_int_or_absent(value: Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Token for a maybe-absent double field: absent encodes as an empty token.
pub fn encode_double_or_absent(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Rewrite `\uXXXX` escapes (including surrogate pairs) to literal characters.
/// Malformed escapes are kept verbatim.
pub fn decode_unicode_escaped_string(input: &str) -> String {
    if !input.contains("\\u") {
        return input.to_owned();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find("\\u") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];
        let Some(unit) = parse_hex4(after) else {
            out.push_str("\\u");
            rest = after;
            continue;
        };
        let tail = &after[4..];

        if (0xD800..0xDC00).contains(&unit) {
            let low = tail
                .strip_prefix("\\u")
                .and_then(parse_hex4)
                .filter(|low| (0xDC00..0xE000).contains(low));
            if let Some(low) = low {
                let code = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                if let Some(ch) = char::from_u32(code) {
                    out.push(ch);
                    rest = &tail[6..];
                    continue;
                }
            }
        }

        match char::from_u32(unit) {
            Some(ch) => out.push(ch),
            None => out.push_str(&rest[pos..pos + 6]),
        }
        rest = tail;
    }
    out.push_str(rest);
    out
}

fn parse_hex4(s: &str) -> Option<u32> {
    let hex = s.get(..4)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn queue(items: &[&str]) -> TokenQueue {
        let mut q = TokenQueue::new();
        q.push_tokens(items.iter().map(|s| s.to_string()));
        q
    }

    #[test]
    fn test_read_string_underrun_on_empty_queue() {
        let mut q = TokenQueue::new();
        assert!(q.read_string().unwrap_err().is_underrun());
    }

    #[test]
    fn test_boundary_marker_is_underrun() {
        let mut q = TokenQueue::new();
        q.push_message(Vec::new());
        let err = q.read_int().unwrap_err();
        assert_eq!(err, DecodeError::Underrun("End of message reached.".into()));
        assert!(q.at_boundary());
    }

    #[test]
    fn test_plain_int_and_bool() {
        let mut q = queue(&["", "17", "-3", "", "0", "2"]);
        assert_eq!(q.read_int().unwrap(), 0);
        assert_eq!(q.read_int().unwrap(), 17);
        assert_eq!(q.read_int().unwrap(), -3);
        assert!(!q.read_bool().unwrap());
        assert!(!q.read_bool().unwrap());
        assert!(q.read_bool().unwrap());
    }

    #[test]
    fn test_int_or_absent_sentinels() {
        let mut q = queue(&["", "2147483647", "12"]);
        assert_eq!(q.read_int_or_absent().unwrap(), None);
        assert_eq!(q.read_int_or_absent().unwrap(), None);
        assert_eq!(q.read_int_or_absent().unwrap(), Some(12));
    }

    #[test]
    fn test_int_or_absent_round_trip() {
        let mut q = queue(&[""]);
        let value = q.read_int_or_absent().unwrap();
        assert_eq!(encode_int_or_absent(value), "");

        let mut q = queue(&["2147483647"]);
        let value = q.read_int_or_absent().unwrap();
        assert_eq!(value, None);
        assert_eq!(encode_int_or_absent(value), "");
    }

    #[test]
    fn test_doubles() {
        let mut q = queue(&["", "1.5", "", "1.7976931348623157e308", "-2.25"]);
        assert_eq!(q.read_double().unwrap(), 0.0);
        assert_eq!(q.read_double().unwrap(), 1.5);
        assert_eq!(q.read_double_or_absent().unwrap(), None);
        assert_eq!(q.read_double_or_absent().unwrap(), None);
        assert_eq!(q.read_double_or_absent().unwrap(), Some(-2.25));
        assert_eq!(encode_double_or_absent(None), "");
    }

    #[test]
    fn test_decimals() {
        let mut q = queue(&["", "Infinity", "1.7976931348623157E308", "1,234.5", "300", "1e-4"]);
        assert_eq!(q.read_decimal().unwrap(), None);
        assert_eq!(q.read_decimal().unwrap(), None);
        assert_eq!(q.read_decimal().unwrap(), None);
        assert_eq!(q.read_decimal().unwrap(), Some(dec!(1234.5)));
        assert_eq!(q.read_decimal().unwrap(), Some(dec!(300)));
        assert_eq!(q.read_decimal().unwrap(), Some(dec!(0.0001)));
    }

    #[test]
    fn test_long() {
        let mut q = queue(&["", "9007199254740993"]);
        assert_eq!(q.read_long().unwrap(), 0);
        assert_eq!(q.read_long().unwrap(), 9_007_199_254_740_993);
    }

    #[test]
    fn test_invalid_number_is_not_underrun() {
        let mut q = queue(&["abc"]);
        let err = q.read_int().unwrap_err();
        assert!(!err.is_underrun());
        assert_eq!(err, DecodeError::InvalidNumber { kind: "int", token: "abc".into() });
    }

    #[test]
    fn test_decode_unicode_escapes() {
        assert_eq!(decode_unicode_escaped_string("plain text"), "plain text");
        assert_eq!(decode_unicode_escaped_string("Order \\u00e9t\\u00e9"), "Order été");
        assert_eq!(decode_unicode_escaped_string("\\ud83d\\ude00!"), "😀!");
        assert_eq!(decode_unicode_escaped_string("bad \\u12"), "bad \\u12");
        assert_eq!(decode_unicode_escaped_string("lone \\udc00"), "lone \\udc00");
    }
}

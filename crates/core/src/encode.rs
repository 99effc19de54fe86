//! Form-key codec
//!
//! Configuration item keys travel through form layers whose field names treat
//! certain punctuation as structural delimiters. This module re-encodes the
//! reserved characters to `__<ord>__` tokens before a key is used as a
//! selection key and decodes them back afterward. The mapping is total and
//! invertible over the reserved set; every other character passes through
//! unchanged.

use indexmap::IndexMap;

/// Characters that cannot appear verbatim in a form selection key.
const RESERVED: [char; 9] = [':', '/', ',', '.', '<', '>', '%', ')', '('];

/// Encode a key for use as a form selection key.
pub fn encode(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for ch in key.chars() {
        if RESERVED.contains(&ch) {
            out.push_str(&format!("__{}__", ch as u32));
        } else {
            out.push(ch);
        }
    }
    out
}

/// Decode a form selection key back to the original configuration key.
///
/// Unrecognized `__<n>__` tokens are left as-is: the reconciler treats keys it
/// cannot resolve as "item not present".
pub fn decode(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let bytes = key.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if let Some((ch, consumed)) = decode_token(&key[i..]) {
            out.push(ch);
            i += consumed;
        } else {
            // Safe: i always lands on a char boundary because tokens are ASCII.
            let ch = key[i..].chars().next().expect("non-empty remainder");
            out.push(ch);
            i += ch.len_utf8();
        }
    }
    out
}

/// Try to read one `__<ord>__` token for a reserved character at the start of `s`.
fn decode_token(s: &str) -> Option<(char, usize)> {
    let rest = s.strip_prefix("__")?;
    let end = rest.find("__")?;
    let ord: u32 = rest[..end].parse().ok()?;
    let ch = char::from_u32(ord)?;
    if RESERVED.contains(&ch) {
        Some((ch, end + 4))
    } else {
        None
    }
}

/// Decode the keys of an option map, preserving order.
///
/// When `keys_only` is false the display values are decoded as well, matching
/// the treatment of option labels that embed the raw key.
pub fn decode_options(options: &IndexMap<String, String>, keys_only: bool) -> IndexMap<String, String> {
    options
        .iter()
        .map(|(key, value)| {
            let value = if keys_only {
                value.clone()
            } else {
                decode(value)
            };
            (decode(key), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough() {
        assert_eq!(encode("frontpage"), "frontpage");
        assert_eq!(decode("frontpage"), "frontpage");
    }

    #[test]
    fn test_reserved_characters_round_trip() {
        for ch in RESERVED {
            let key = format!("a{}b", ch);
            let encoded = encode(&key);
            assert!(!encoded.contains(ch), "{} leaked into {}", ch, encoded);
            assert_eq!(decode(&encoded), key);
        }
    }

    #[test]
    fn test_all_reserved_at_once() {
        let key = ":/,.<>%)(";
        assert_eq!(decode(&encode(key)), key);
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode("a.b"), "a__46__b");
        assert_eq!(encode("a:b"), "a__58__b");
        assert_eq!(decode("a__46__b"), "a.b");
    }

    #[test]
    fn test_unrecognized_token_left_alone() {
        // 95 is '_', not in the reserved set; the token must not be consumed.
        assert_eq!(decode("a__95__b"), "a__95__b");
        assert_eq!(decode("__garbage__"), "__garbage__");
    }

    #[test]
    fn test_adjacent_tokens() {
        assert_eq!(decode(&encode("..")), "..");
        assert_eq!(encode(".."), "__46____46__");
    }

    #[test]
    fn test_decode_options_keys_and_values() {
        let mut options = IndexMap::new();
        options.insert(encode("image.style.large"), encode("Large (480x480)"));
        let decoded = decode_options(&options, false);
        assert_eq!(
            decoded.get("image.style.large").map(String::as_str),
            Some("Large (480x480)")
        );

        let keys_only = decode_options(&options, true);
        assert_eq!(
            keys_only.get("image.style.large").map(String::as_str),
            Some(encode("Large (480x480)").as_str())
        );
    }
}

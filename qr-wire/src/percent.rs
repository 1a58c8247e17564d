// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Decodes a `%XX`-percent-encoded field. Returns `None` on any malformed
/// escape so the caller can degrade to the raw field, per the codec's
/// "URL-decoding failures degrade silently" rule.
pub fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = input.get(i + 1..i + 3)?;
                let byte = u8::from_str_radix(hex, 16).ok()?;
                out.push(byte);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}

/// Decodes `field`, falling back to the raw string on any failure.
pub fn decode_or_raw(field: &str) -> String {
    percent_decode(field).unwrap_or_else(|| field.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_simple_escapes() {
        assert_eq!(percent_decode("report%20final.pdf").as_deref(), Some("report final.pdf"));
    }

    #[test]
    fn passes_through_unescaped_text() {
        assert_eq!(percent_decode("plain.txt").as_deref(), Some("plain.txt"));
    }

    #[test]
    fn falls_back_to_raw_on_truncated_escape() {
        assert_eq!(percent_decode("broken%2"), None);
        assert_eq!(decode_or_raw("broken%2"), "broken%2");
    }

    #[test]
    fn falls_back_to_raw_on_non_hex_escape() {
        assert_eq!(percent_decode("bad%zzfield"), None);
        assert_eq!(decode_or_raw("bad%zzfield"), "bad%zzfield");
    }
}

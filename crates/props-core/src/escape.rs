//! The escape table shared by the reader and the writer.

use crate::error::{Error, Result};
use crate::reader::{Position, State};

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Character denoted by `\c` for the single-letter escapes.
pub(crate) fn substitute(c: char) -> Option<char> {
    match c {
        't' => Some('\t'),
        'r' => Some('\r'),
        'n' => Some('\n'),
        'f' => Some('\x0C'),
        _ => None,
    }
}

/// Two-character escape for a control character or backslash.
fn control_escape(c: char) -> Option<&'static str> {
    match c {
        '\t' => Some("\\t"),
        '\n' => Some("\\n"),
        '\x0C' => Some("\\f"),
        '\r' => Some("\\r"),
        '\\' => Some("\\\\"),
        _ => None,
    }
}

fn is_printable_ascii(c: char) -> bool {
    (' '..='~').contains(&c)
}

/// Append `\uXXXX` (uppercase hex) for every UTF-16 unit of `c`.
pub fn push_unicode_escape(out: &mut String, c: char) {
    let mut units = [0u16; 2];
    for unit in c.encode_utf16(&mut units) {
        out.push_str("\\u");
        for shift in [12, 8, 4, 0] {
            out.push(char::from(HEX[usize::from((*unit >> shift) & 0xF)]));
        }
    }
}

/// Escape a key for the writer.
///
/// A leading `#` or `!` is escaped so the line is not read back as a comment.
///
/// ```
/// use props_core::escape::escape_key;
///
/// assert_eq!(escape_key("#a b:c"), "\\#a\\ b\\:c");
/// assert_eq!(escape_key("é"), "\\u00E9");
/// ```
pub fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, c) in key.chars().enumerate() {
        match c {
            '#' | '!' if i == 0 => {
                out.push('\\');
                out.push(c);
            }
            ' ' | ':' | '=' => {
                out.push('\\');
                out.push(c);
            }
            _ => push_escaped(&mut out, c),
        }
    }
    out
}

/// Escape a value for the writer.
///
/// Only a leading space or tab is escaped; the reader would otherwise skip
/// it as separator whitespace. Embedded spaces and tabs are written as is.
///
/// ```
/// use props_core::escape::escape_value;
///
/// assert_eq!(escape_value(" a\tb"), "\\ a\tb");
/// assert_eq!(escape_value("\tx"), "\\tx");
/// assert_eq!(escape_value("a=b\n"), "a\\=b\\n");
/// ```
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            ' ' if i == 0 => out.push_str("\\ "),
            '\t' if i == 0 => out.push_str("\\t"),
            ' ' | '\t' => out.push(c),
            ':' | '=' => {
                out.push('\\');
                out.push(c);
            }
            _ => push_escaped(&mut out, c),
        }
    }
    out
}

fn push_escaped(out: &mut String, c: char) {
    if let Some(escape) = control_escape(c) {
        out.push_str(escape);
    } else if is_printable_ascii(c) {
        out.push(c);
    } else {
        push_unicode_escape(out, c);
    }
}

/// Reverse the escaping of a single value, as the reader does after the
/// separator.
///
/// Line continuations are not recognised here: a backslash before a line
/// break yields the break itself.
///
/// # Errors
///
/// Fails like the reader on the same text: malformed `\uXXXX` sequences,
/// unpaired surrogates and a trailing lone backslash. End-of-input errors
/// report [`State::ValueEscape`]; the error position is the character offset
/// within `text`.
pub fn unescape(text: &str) -> Result<String> {
    unescape_in(text, State::ValueEscape)
}

/// Reverse the escaping of a single key.
///
/// Same rules as [`unescape`], with end-of-input errors reporting
/// [`State::KeyEscape`].
///
/// ```
/// use props_core::escape::{escape_key, unescape_key};
///
/// assert_eq!(unescape_key(&escape_key("#a b")).unwrap(), "#a b");
/// assert!(unescape_key("dangling\\").is_err());
/// ```
pub fn unescape_key(text: &str) -> Result<String> {
    unescape_in(text, State::KeyEscape)
}

fn unescape_in(text: &str, escape_state: State) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    let mut position = Position::default();

    while let Some(c) = chars.next() {
        position.column += 1;
        position.offset += 1;
        if c != '\\' {
            out.push(c);
            continue;
        }

        let Some(next) = chars.next() else {
            return Err(Error::UnexpectedEof {
                position,
                state: escape_state,
            });
        };
        position.column += 1;
        position.offset += 1;

        if next != 'u' {
            out.push(substitute(next).unwrap_or(next));
            continue;
        }

        let unit = hex_unit(&mut chars, &mut position, escape_state)?;
        let decoded = if (0xD800..=0xDBFF).contains(&unit) {
            let paired = chars.next() == Some('\\') && chars.next() == Some('u');
            position.column += 2;
            position.offset += 2;
            if !paired {
                return Err(Error::InvalidSurrogate { position, unit });
            }
            let low = hex_unit(&mut chars, &mut position, escape_state)?;
            char::decode_utf16([unit, low]).next().and_then(|r| r.ok())
        } else {
            char::from_u32(u32::from(unit))
        };

        out.push(decoded.ok_or(Error::InvalidSurrogate { position, unit })?);
    }

    Ok(out)
}

fn hex_unit(
    chars: &mut std::str::Chars<'_>,
    position: &mut Position,
    escape_state: State,
) -> Result<u16> {
    let mut unit = 0u16;
    for _ in 0..4 {
        let Some(c) = chars.next() else {
            return Err(Error::UnexpectedEof {
                position: *position,
                state: escape_state,
            });
        };
        position.column += 1;
        position.offset += 1;
        let digit = c.to_digit(16).ok_or(Error::InvalidUnicodeEscape {
            position: *position,
            found: c,
        })?;
        unit = (unit << 4) | digit as u16;
    }
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn key_escapes_separators_and_whitespace() {
        assert_eq!(escape_key("a b=c:d"), "a\\ b\\=c\\:d");
        assert_eq!(escape_key("\t\n\r\x0C\\"), "\\t\\n\\r\\f\\\\");
    }

    #[test]
    fn comment_markers_escaped_only_at_key_start() {
        assert_eq!(escape_key("!a#b"), "\\!a#b");
        assert_eq!(escape_value("#x"), "#x");
    }

    #[test]
    fn only_leading_value_space_is_escaped() {
        assert_eq!(escape_value("  two"), "\\  two");
        assert_eq!(escape_value("John Doe"), "John Doe");
    }

    #[test]
    fn non_ascii_uses_uppercase_unicode_escapes() {
        assert_eq!(escape_value("\u{7f}ä"), "\\u007F\\u00E4");
        assert_eq!(escape_value("𝕊"), "\\uD835\\uDD4A");
    }

    #[test]
    fn unescape_reverses_table() {
        let original = " lead\ttab\r\n\x0C\\ é 𝕊 :=#!";
        assert_eq!(unescape(&escape_value(original)).unwrap(), original);
        assert_eq!(unescape_key(&escape_key(original)).unwrap(), original);
    }

    #[test]
    fn unescape_takes_unknown_escapes_literally() {
        assert_eq!(unescape("\\q\\ \\:").unwrap(), "q :");
    }

    #[test]
    fn unescape_rejects_bad_hex() {
        let err = unescape("ab\\u00G0").unwrap_err();
        assert!(matches!(err, Error::InvalidUnicodeEscape { found: 'G', .. }));
        assert_eq!(err.position().unwrap().column, 7);
    }

    #[test]
    fn unescape_rejects_truncated_unicode() {
        assert!(matches!(
            unescape("\\u00"),
            Err(Error::UnexpectedEof {
                state: State::ValueEscape,
                ..
            })
        ));
        assert!(matches!(
            unescape_key("\\u00"),
            Err(Error::UnexpectedEof {
                state: State::KeyEscape,
                ..
            })
        ));
    }

    #[test]
    fn trailing_backslash_is_rejected_like_the_reader() {
        let err = unescape("v\\").unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedEof {
                state: State::ValueEscape,
                ..
            }
        ));
        assert_eq!(err.position().unwrap().column, 2);

        let mut map = std::collections::BTreeMap::new();
        let from_reader = crate::reader::parse_str("k=v\\", &mut map).unwrap_err();
        assert!(matches!(
            from_reader,
            Error::UnexpectedEof {
                state: State::ValueEscape,
                ..
            }
        ));

        assert!(matches!(
            unescape_key("k\\"),
            Err(Error::UnexpectedEof {
                state: State::KeyEscape,
                ..
            })
        ));
    }
}

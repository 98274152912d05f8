//! Character encodings and the byte-to-char decoding adapters used by the reader.
//!
//! Properties files are traditionally ISO-8859-1: every byte is exactly one
//! character, which keeps the escape grammar byte-exact. UTF-8 is accepted
//! when explicitly requested.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufReader, Bytes, Read};
use std::str::{Chars, FromStr};

use crate::error::Error;

/// Supported character encodings
///
/// Serializes as its canonical label and deserializes from any label
/// accepted by [`FromStr`], so `"utf-8"`, `"UTF8"` and `"latin1"` all work
/// in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Encoding {
    /// Latin-1, one byte per character
    #[default]
    Iso8859_1,
    Utf8,
}

impl Encoding {
    /// Canonical label of this encoding
    pub fn label(&self) -> &'static str {
        match self {
            Self::Iso8859_1 => "ISO-8859-1",
            Self::Utf8 => "UTF-8",
        }
    }

    /// Whether `c` can be written in this encoding without escaping
    pub fn can_encode(&self, c: char) -> bool {
        match self {
            Self::Iso8859_1 => u32::from(c) <= 0xFF,
            Self::Utf8 => true,
        }
    }

    /// Encode `text` into `out`.
    ///
    /// Callers must escape characters rejected by [`Encoding::can_encode`]
    /// first; for ISO-8859-1 those are replaced by `?`.
    pub fn encode(&self, text: &str, out: &mut Vec<u8>) {
        match self {
            Self::Iso8859_1 => out.extend(
                text.chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')),
            ),
            Self::Utf8 => out.extend_from_slice(text.as_bytes()),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" | "l1" => Ok(Self::Iso8859_1),
            "utf-8" | "utf8" => Ok(Self::Utf8),
            _ => Err(Error::UnsupportedEncoding {
                label: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Encoding {
    type Error = Error;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        label.parse()
    }
}

impl From<Encoding> for String {
    fn from(encoding: Encoding) -> Self {
        encoding.label().to_string()
    }
}

/// Failure reported by a [`CharInput`]
#[derive(Debug)]
pub enum InputError {
    /// The bytes do not form a character in the given encoding.
    Malformed(Encoding),
    Io(std::io::Error),
}

/// A source of decoded characters for the reader.
pub trait CharInput {
    /// Read the next character, `Ok(None)` at end of input.
    fn next_char(&mut self) -> Result<Option<char>, InputError>;
}

/// Characters of an in-memory string
#[derive(Debug, Clone)]
pub struct StrInput<'a>(Chars<'a>);

impl<'a> StrInput<'a> {
    pub fn new(text: &'a str) -> Self {
        Self(text.chars())
    }
}

impl CharInput for StrInput<'_> {
    fn next_char(&mut self) -> Result<Option<char>, InputError> {
        Ok(self.0.next())
    }
}

/// Decodes a byte stream one character at a time.
#[derive(Debug)]
pub struct ByteDecoder<R: Read> {
    bytes: Bytes<BufReader<R>>,
    encoding: Encoding,
}

impl<R: Read> ByteDecoder<R> {
    pub fn new(source: R, encoding: Encoding) -> Self {
        Self {
            bytes: BufReader::new(source).bytes(),
            encoding,
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>, InputError> {
        self.bytes.next().transpose().map_err(InputError::Io)
    }

    fn decode_utf8(&mut self, lead: u8) -> Result<char, InputError> {
        let malformed = InputError::Malformed(Encoding::Utf8);
        let width = match lead {
            0x00..=0x7F => return Ok(char::from(lead)),
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return Err(malformed),
        };

        let mut buf = [lead, 0, 0, 0];
        for slot in buf.iter_mut().take(width).skip(1) {
            match self.next_byte()? {
                Some(b) if b & 0b1100_0000 == 0b1000_0000 => *slot = b,
                _ => return Err(malformed),
            }
        }

        std::str::from_utf8(&buf[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .ok_or(malformed)
    }
}

impl<R: Read> CharInput for ByteDecoder<R> {
    fn next_char(&mut self) -> Result<Option<char>, InputError> {
        let Some(byte) = self.next_byte()? else {
            return Ok(None);
        };

        match self.encoding {
            Encoding::Iso8859_1 => Ok(Some(char::from(byte))),
            Encoding::Utf8 => self.decode_utf8(byte).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8], encoding: Encoding) -> Result<String, InputError> {
        let mut decoder = ByteDecoder::new(bytes, encoding);
        let mut out = String::new();
        while let Some(c) = decoder.next_char()? {
            out.push(c);
        }
        Ok(out)
    }

    #[test]
    fn latin1_maps_every_byte() {
        let text = decode_all(&[b'a', 0xE4, 0xFF], Encoding::Iso8859_1).unwrap();
        assert_eq!(text, "a\u{e4}\u{ff}");
    }

    #[test]
    fn utf8_decodes_multibyte() {
        let text = decode_all("k=ä𝕊".as_bytes(), Encoding::Utf8).unwrap();
        assert_eq!(text, "k=ä𝕊");
    }

    #[test]
    fn utf8_rejects_truncated_sequence() {
        let result = decode_all(&[b'a', 0xE2, 0x82], Encoding::Utf8);
        assert!(matches!(result, Err(InputError::Malformed(Encoding::Utf8))));
    }

    #[test]
    fn utf8_rejects_stray_continuation_byte() {
        let result = decode_all(&[0x80], Encoding::Utf8);
        assert!(result.is_err());
    }

    #[test]
    fn parse_labels() {
        assert_eq!("ISO-8859-1".parse::<Encoding>().unwrap(), Encoding::Iso8859_1);
        assert_eq!("latin1".parse::<Encoding>().unwrap(), Encoding::Iso8859_1);
        assert_eq!("utf_8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert!("ebcdic".parse::<Encoding>().is_err());
    }

    #[test]
    fn latin1_cannot_encode_wide_chars() {
        assert!(Encoding::Iso8859_1.can_encode('ÿ'));
        assert!(!Encoding::Iso8859_1.can_encode('€'));
        assert!(Encoding::Utf8.can_encode('€'));
    }
}

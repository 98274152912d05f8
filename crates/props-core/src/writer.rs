//! Serialization of properties to the escaped line format.
//!
//! Output layout:
//!
//! ```text
//! #<comment line>            (optional, one per comment line)
//! #<timestamp>               (unless Timestamp::Omit)
//! key=value
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::encoding::Encoding;
use crate::error::Result;
use crate::escape::{escape_key, escape_value, push_unicode_escape};

/// Line terminator written after every line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
    Cr,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }
}

/// What to write on the timestamp comment line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timestamp {
    /// Current time at write
    #[default]
    Now,
    Fixed(DateTime<Utc>),
    /// No timestamp line
    Omit,
}

impl Timestamp {
    fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Now => Some(Utc::now()),
            Self::Fixed(at) => Some(*at),
            Self::Omit => None,
        }
    }
}

/// Writer configuration.
///
/// Deserializable so it can live in a host application's config file:
///
/// ```toml
/// encoding = "UTF-8"
/// line_ending = "crlf"
/// timestamp = "omit"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    pub encoding: Encoding,
    pub line_ending: LineEnding,
    pub timestamp: Timestamp,
}

impl WriteOptions {
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Serializes key/value pairs.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    options: WriteOptions,
}

impl Writer {
    pub fn new(options: WriteOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Render the complete document as text, before encoding.
    pub fn render<'a>(
        &self,
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
        comments: Option<&str>,
    ) -> String {
        let eol = self.options.line_ending.as_str();
        let mut out = String::new();

        if let Some(comments) = comments {
            self.push_comments(&mut out, comments);
        }
        if let Some(at) = self.options.timestamp.resolve() {
            out.push('#');
            out.push_str(&at.format("%a %b %d %H:%M:%S UTC %Y").to_string());
            out.push_str(eol);
        }

        for (key, value) in entries {
            out.push_str(&escape_key(key));
            out.push('=');
            out.push_str(&escape_value(value));
            out.push_str(eol);
        }

        out
    }

    /// Write the document to `out` in the configured encoding and flush it.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from `out`.
    pub fn write<'a, W: Write>(
        &self,
        mut out: W,
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
        comments: Option<&str>,
    ) -> Result<()> {
        let text = self.render(entries, comments);
        let mut bytes = Vec::with_capacity(text.len());
        self.options.encoding.encode(&text, &mut bytes);

        out.write_all(&bytes)?;
        out.flush()?;

        tracing::debug!(
            bytes = bytes.len(),
            encoding = %self.options.encoding,
            "Wrote properties"
        );
        Ok(())
    }

    /// One comment line per line of `comments`.
    ///
    /// Lines already starting with `#` or `!` keep their own marker.
    /// Characters the encoding cannot carry are written as `\uXXXX`.
    fn push_comments(&self, out: &mut String, comments: &str) {
        let eol = self.options.line_ending.as_str();
        for line in comments.split("\r\n").flat_map(|l| l.split(['\r', '\n'])) {
            if !line.starts_with(['#', '!']) {
                out.push('#');
            }
            for c in line.chars() {
                if self.options.encoding.can_encode(c) {
                    out.push(c);
                } else {
                    push_unicode_escape(out, c);
                }
            }
            out.push_str(eol);
        }
    }
}

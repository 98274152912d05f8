//! Java `.properties` store, parser and writer
//!
//! Reads and writes the traditional `.properties` format: comments, the
//! `=`/`:`/whitespace separators, line continuations and backslash escapes,
//! in ISO-8859-1 by default or UTF-8 on request.

pub mod encoding;
pub mod error;
pub mod escape;
pub mod reader;
pub mod store;
pub mod writer;

pub use encoding::{CharInput, Encoding};
pub use error::{Error, Result};
pub use escape::{escape_key, escape_value, unescape, unescape_key};
pub use reader::{ParseContext, Position, PropertySink, Reader, State, parse_reader, parse_str};
pub use store::Properties;
pub use writer::{LineEnding, Timestamp, WriteOptions, Writer};

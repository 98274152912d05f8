//! The `.properties` reader.
//!
//! A table-driven state machine over decoded characters. Each character is
//! classified, the `(State, CharClass)` pair is looked up in [`transition`],
//! and the resulting [`Action`] is applied to the [`ParseContext`].
//!
//! ```text
//! # comment            ! also a comment
//! key = value          key:value          key value
//! multi = first \
//!         second       -> "first second"
//! escaped\ key = A -> "escaped key" = "A"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Read;

use crate::encoding::{ByteDecoder, CharInput, Encoding, InputError, StrInput};
use crate::error::{Error, Result};
use crate::escape;

/// Lexer states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Beginning of a logical line
    Start,
    Comment,
    Key,
    /// Directly after a backslash inside a key
    KeyEscape,
    /// Skipping indentation after a line continuation inside a key
    KeyWhitespace,
    /// Whitespace between key and an optional separator
    BeforeSeparator,
    /// Whitespace after `:` or `=`
    AfterSeparator,
    Value,
    /// Directly after a backslash inside a value
    ValueEscape,
    /// Skipping indentation after a line continuation inside a value
    ValueWhitespace,
    Finish,
}

/// Character classes, in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    EndOfInput,
    /// `\n`, `\r` or `\r\n`
    Terminator,
    /// `#` or `!`
    CommentStart,
    /// Space, tab or form feed
    Whitespace,
    Backslash,
    /// `:` or `=`
    Separator,
    Other,
}

impl CharClass {
    fn of(c: char) -> Self {
        match c {
            '\n' | '\r' => Self::Terminator,
            '#' | '!' => Self::CommentStart,
            ' ' | '\t' | '\x0C' => Self::Whitespace,
            '\\' => Self::Backslash,
            ':' | '=' => Self::Separator,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Ignore,
    AddToKey,
    AddToValue,
    StoreProperty,
    Escape,
}

/// The complete transition table.
///
/// `None` means the class has no row for this state; character classes then
/// fall back to [`CharClass::Other`].
fn transition(state: State, class: CharClass) -> Option<(State, Action)> {
    use Action::*;
    use CharClass::*;
    use State::*;

    let row = match (state, class) {
        (Start, EndOfInput) => (Finish, Ignore),
        (Start, Terminator) => (Start, Ignore),
        (Start, Whitespace) => (Start, Ignore),
        (Start, CommentStart) => (Comment, Ignore),
        (Start, Backslash) => (KeyEscape, Escape),
        (Start, Separator) => (AfterSeparator, Ignore),
        (Start, Other) => (Key, AddToKey),

        (Comment, EndOfInput) => (Finish, Ignore),
        (Comment, Terminator) => (Start, Ignore),
        (Comment, Other) => (Comment, Ignore),

        (Key, EndOfInput) => (Finish, StoreProperty),
        (Key, Terminator) => (Start, StoreProperty),
        (Key, Whitespace) => (BeforeSeparator, Ignore),
        (Key, Backslash) => (KeyEscape, Escape),
        (Key, Separator) => (AfterSeparator, Ignore),
        (Key, Other) => (Key, AddToKey),

        (KeyEscape, Terminator) => (KeyWhitespace, Ignore),
        (KeyEscape, Other) => (Key, AddToKey),

        (KeyWhitespace, EndOfInput) => (Finish, StoreProperty),
        (KeyWhitespace, Terminator) => (Start, StoreProperty),
        (KeyWhitespace, Whitespace) => (KeyWhitespace, Ignore),
        (KeyWhitespace, Backslash) => (KeyEscape, Escape),
        (KeyWhitespace, Separator) => (AfterSeparator, Ignore),
        (KeyWhitespace, Other) => (Key, AddToKey),

        (BeforeSeparator, EndOfInput) => (Finish, StoreProperty),
        (BeforeSeparator, Terminator) => (Start, StoreProperty),
        (BeforeSeparator, Whitespace) => (BeforeSeparator, Ignore),
        (BeforeSeparator, Backslash) => (ValueEscape, Escape),
        (BeforeSeparator, Separator) => (AfterSeparator, Ignore),
        (BeforeSeparator, Other) => (Value, AddToValue),

        (AfterSeparator, EndOfInput) => (Finish, StoreProperty),
        (AfterSeparator, Terminator) => (Start, StoreProperty),
        (AfterSeparator, Whitespace) => (AfterSeparator, Ignore),
        (AfterSeparator, Backslash) => (ValueEscape, Escape),
        (AfterSeparator, Other) => (Value, AddToValue),

        (Value, EndOfInput) => (Finish, StoreProperty),
        (Value, Terminator) => (Start, StoreProperty),
        (Value, Backslash) => (ValueEscape, Escape),
        (Value, Other) => (Value, AddToValue),

        (ValueEscape, Terminator) => (ValueWhitespace, Ignore),
        (ValueEscape, Other) => (Value, AddToValue),

        (ValueWhitespace, EndOfInput) => (Finish, StoreProperty),
        (ValueWhitespace, Terminator) => (Start, StoreProperty),
        (ValueWhitespace, Whitespace) => (ValueWhitespace, Ignore),
        (ValueWhitespace, Backslash) => (ValueEscape, Escape),
        (ValueWhitespace, Other) => (Value, AddToValue),

        _ => return None,
    };

    Some(row)
}

/// Look up a transition, falling back to the catch-all class.
fn dispatch(state: State, class: CharClass) -> Option<(State, Action)> {
    transition(state, class).or_else(|| match class {
        CharClass::EndOfInput => None,
        _ => transition(state, CharClass::Other),
    })
}

/// Location in the input, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: u64,
    /// Column of the last character read on `line`
    pub column: u64,
    /// Characters consumed so far
    pub offset: u64,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            line: 1,
            column: 0,
            offset: 0,
        }
    }
}

impl Position {
    fn advance(&mut self) {
        self.column += 1;
        self.offset += 1;
    }

    fn next_line(&mut self) {
        self.line += 1;
        self.column = 0;
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Receives the key/value pairs produced by the reader.
pub trait PropertySink {
    fn accept(&mut self, key: String, value: String);
}

impl PropertySink for Vec<(String, String)> {
    fn accept(&mut self, key: String, value: String) {
        self.push((key, value));
    }
}

impl PropertySink for HashMap<String, String> {
    fn accept(&mut self, key: String, value: String) {
        self.insert(key, value);
    }
}

impl PropertySink for BTreeMap<String, String> {
    fn accept(&mut self, key: String, value: String) {
        self.insert(key, value);
    }
}

/// Mutable state of a single parse.
#[derive(Debug)]
pub struct ParseContext {
    state: State,
    key: String,
    value: String,
    escaped: bool,
    /// Character read past a bare `\r`
    lookahead: Option<char>,
    position: Position,
    committed: usize,
}

impl Default for ParseContext {
    fn default() -> Self {
        Self {
            state: State::Start,
            key: String::new(),
            value: String::new(),
            escaped: false,
            lookahead: None,
            position: Position::default(),
            committed: 0,
        }
    }
}

impl ParseContext {
    pub fn state(&self) -> State {
        self.state
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Number of properties handed to the sink so far
    pub fn committed(&self) -> usize {
        self.committed
    }
}

/// Parses properties text from a [`CharInput`].
#[derive(Debug)]
pub struct Reader<I> {
    input: I,
}

impl<'a> Reader<StrInput<'a>> {
    pub fn from_text(text: &'a str) -> Self {
        Self::new(StrInput::new(text))
    }
}

impl<R: Read> Reader<ByteDecoder<R>> {
    pub fn from_bytes(source: R, encoding: Encoding) -> Self {
        Self::new(ByteDecoder::new(source, encoding))
    }
}

impl<I: CharInput> Reader<I> {
    pub fn new(input: I) -> Self {
        Self { input }
    }

    /// Run the state machine to completion, feeding every completed
    /// property into `sink`.
    ///
    /// Properties committed before an error stay in the sink.
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed `\uXXXX` escapes, a backslash at
    /// end of input, or undecodable input, and propagates I/O errors.
    pub fn parse(mut self, sink: &mut impl PropertySink) -> Result<Position> {
        let mut ctx = ParseContext::default();
        self.run(&mut ctx, sink)?;
        tracing::debug!(
            properties = ctx.committed,
            lines = ctx.position.line,
            "Parsed properties"
        );
        Ok(ctx.position)
    }

    /// Drive `ctx` until it reaches [`State::Finish`].
    pub fn run(&mut self, ctx: &mut ParseContext, sink: &mut impl PropertySink) -> Result<()> {
        while ctx.state != State::Finish {
            let next = self.next_char(ctx)?;
            let class = match next {
                None => CharClass::EndOfInput,
                Some(c) => CharClass::of(c),
            };

            let Some((state, action)) = dispatch(ctx.state, class) else {
                return Err(Error::UnexpectedEof {
                    position: ctx.position,
                    state: ctx.state,
                });
            };

            self.apply(ctx, action, next, sink)?;
            ctx.state = state;
        }

        Ok(())
    }

    fn apply(
        &mut self,
        ctx: &mut ParseContext,
        action: Action,
        c: Option<char>,
        sink: &mut impl PropertySink,
    ) -> Result<()> {
        match action {
            // A line continuation consumes the pending escape.
            Action::Ignore => ctx.escaped = false,
            Action::Escape => ctx.escaped = true,
            Action::AddToKey | Action::AddToValue => {
                let Some(c) = c else {
                    return Ok(());
                };
                let c = if ctx.escaped {
                    ctx.escaped = false;
                    self.unescape(ctx, c)?
                } else {
                    c
                };
                if action == Action::AddToKey {
                    ctx.key.push(c);
                } else {
                    ctx.value.push(c);
                }
            }
            Action::StoreProperty => {
                let key = std::mem::take(&mut ctx.key);
                let value = std::mem::take(&mut ctx.value);
                tracing::trace!(%key, line = ctx.position.line, "Committing property");
                sink.accept(key, value);
                ctx.escaped = false;
                ctx.committed += 1;
            }
        }

        Ok(())
    }

    /// Substitute the character following a backslash.
    fn unescape(&mut self, ctx: &mut ParseContext, c: char) -> Result<char> {
        if c == 'u' {
            return self.unicode_escape(ctx);
        }
        Ok(escape::substitute(c).unwrap_or(c))
    }

    /// Decode the hex digits of a `\uXXXX` escape (the `u` is already read),
    /// joining UTF-16 surrogate pairs.
    fn unicode_escape(&mut self, ctx: &mut ParseContext) -> Result<char> {
        let unit = self.hex_unit(ctx)?;

        if (0xD800..=0xDBFF).contains(&unit) {
            let position = ctx.position;
            let paired = matches!(self.raw_char(ctx)?, Some('\\'))
                && matches!(self.raw_char(ctx)?, Some('u'));
            if !paired {
                return Err(Error::InvalidSurrogate { position, unit });
            }
            let low = self.hex_unit(ctx)?;
            return char::decode_utf16([unit, low])
                .next()
                .and_then(|r| r.ok())
                .ok_or(Error::InvalidSurrogate {
                    position: ctx.position,
                    unit,
                });
        }

        char::from_u32(u32::from(unit)).ok_or(Error::InvalidSurrogate {
            position: ctx.position,
            unit,
        })
    }

    fn hex_unit(&mut self, ctx: &mut ParseContext) -> Result<u16> {
        let mut unit: u16 = 0;
        for _ in 0..4 {
            let Some(c) = self.raw_char(ctx)? else {
                return Err(Error::UnexpectedEof {
                    position: ctx.position,
                    state: ctx.state,
                });
            };
            let digit = c.to_digit(16).ok_or(Error::InvalidUnicodeEscape {
                position: ctx.position,
                found: c,
            })?;
            unit = (unit << 4) | digit as u16;
        }
        Ok(unit)
    }

    /// Next character, collapsing `\r\n` into a single `\n`.
    fn next_char(&mut self, ctx: &mut ParseContext) -> Result<Option<char>> {
        let c = self.raw_char(ctx)?;
        match c {
            Some('\r') => {
                ctx.position.next_line();
                match self.raw_char(ctx)? {
                    Some('\n') => ctx.position.column = 0,
                    other => {
                        if other.is_some() {
                            ctx.position.offset -= 1;
                            ctx.position.column -= 1;
                        }
                        ctx.lookahead = other;
                    }
                }
                Ok(Some('\n'))
            }
            Some('\n') => {
                ctx.position.next_line();
                Ok(c)
            }
            _ => Ok(c),
        }
    }

    /// Next character without terminator handling.
    fn raw_char(&mut self, ctx: &mut ParseContext) -> Result<Option<char>> {
        if let Some(c) = ctx.lookahead.take() {
            ctx.position.advance();
            return Ok(Some(c));
        }

        match self.input.next_char() {
            Ok(Some(c)) => {
                ctx.position.advance();
                Ok(Some(c))
            }
            Ok(None) => Ok(None),
            Err(InputError::Malformed(encoding)) => Err(Error::Decode {
                position: ctx.position,
                encoding,
            }),
            Err(InputError::Io(e)) => Err(Error::Io(e)),
        }
    }
}

/// Parse properties text held in memory.
///
/// # Example
/// ```
/// use std::collections::BTreeMap;
///
/// let mut map = BTreeMap::new();
/// props_core::reader::parse_str("a = b\n# note\nc:d", &mut map).unwrap();
/// assert_eq!(map["a"], "b");
/// assert_eq!(map["c"], "d");
/// assert_eq!(map.len(), 2);
/// ```
pub fn parse_str(text: &str, sink: &mut impl PropertySink) -> Result<Position> {
    Reader::from_text(text).parse(sink)
}

/// Decode `source` with `encoding` and parse it.
pub fn parse_reader<R: Read>(
    source: R,
    encoding: Encoding,
    sink: &mut impl PropertySink,
) -> Result<Position> {
    Reader::from_bytes(source, encoding).parse(sink)
}

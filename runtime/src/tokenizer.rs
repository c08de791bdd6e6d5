//! A chunked, push-style JSON tokenizer.
//!
//! Bytes are fed in arbitrary chunks; tokens split across chunk boundaries
//! (strings, escapes, numbers, literals) are carried over and delivered
//! whole. Events go to a [`SaxHandler`]; a handler returning `false` aborts
//! the parse. Errors are sticky: once a feed fails, every later call
//! reports the same failure and `error_string` formats the diagnostic.

use thiserror::Error;

use crate::handler::SaxHandler;

/// Tokenizer behavior switches, mirroring the knobs generated parsers set
/// at init time. Defaults: strict (no comments, validated UTF-8, single
/// complete value, no trailing bytes).
#[derive(Debug, Clone)]
pub struct TokenizerOptions {
    pub allow_comments:         bool,
    pub validate_utf8:          bool,
    pub allow_trailing_garbage: bool,
    pub allow_multiple_values:  bool,
    pub allow_partial_values:   bool,
}

impl Default for TokenizerOptions {
    fn default() -> TokenizerOptions {
        TokenizerOptions {
            allow_comments:         false,
            validate_utf8:          true,
            allow_trailing_garbage: false,
            allow_multiple_values:  false,
            allow_partial_values:   false,
        }
    }
}

#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerStatus {
    Ok,
    Canceled,
    Error,
}

#[derive(Debug, Clone, Error)]
#[error("{message} at byte offset {offset}")]
pub struct TokenizerError {
    pub message: String,
    /// Absolute offset from the start of the document.
    pub offset: u64,
    /// Offset within the chunk being fed when the error was raised.
    pub chunk_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// A value must follow (top level, after `:`, after `,` in an array).
    Value,
    /// After `[`: a value or `]`.
    ValueOrEnd,
    /// After `{`: a key or `}`.
    KeyOrEnd,
    /// After `,` in an object: a key.
    Key,
    /// After a key: `:`.
    Colon,
    CommaOrObjEnd,
    CommaOrArrEnd,
    /// Top-level value complete.
    Done,
}

#[derive(Debug)]
enum Esc {
    None,
    Start,
    Unicode { acc: u16, digits: u8 },
}

#[derive(Debug)]
struct StrState {
    buf:          Vec<u8>,
    is_key:       bool,
    esc:          Esc,
    pending_high: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LitKind {
    True,
    False,
    Null,
}

#[derive(Debug)]
enum Lex {
    Idle,
    Str(StrState),
    Number(Vec<u8>),
    Literal { text: &'static [u8], pos: usize, kind: LitKind },
    SlashSeen,
    LineComment,
    BlockComment { star: bool },
}

enum Step {
    Consume,
    /// Token finalized without consuming the byte; reprocess it.
    Again,
    Cancel,
    Fail,
}

pub struct JsonTokenizer {
    opts:       TokenizerOptions,
    lex:        Lex,
    expect:     Expect,
    containers: Vec<Container>,
    offset:     u64,
    chunk_base: u64,
    error:      Option<TokenizerError>,
    canceled:   bool,
}

impl JsonTokenizer {
    pub fn new(opts: TokenizerOptions) -> JsonTokenizer {
        JsonTokenizer {
            opts,
            lex: Lex::Idle,
            expect: Expect::Value,
            containers: Vec::new(),
            offset: 0,
            chunk_base: 0,
            error: None,
            canceled: false,
        }
    }

    /// Feed one chunk. Events for every token completed within the chunk
    /// are delivered before returning.
    pub fn feed(&mut self, chunk: &[u8], handler: &mut dyn SaxHandler) -> TokenizerStatus {
        if self.error.is_some() {
            return TokenizerStatus::Error;
        }
        if self.canceled {
            return TokenizerStatus::Canceled;
        }
        self.chunk_base = self.offset;

        let mut i = 0;
        while i < chunk.len() {
            match self.step(chunk[i], handler) {
                Step::Consume => {
                    i += 1;
                    self.offset += 1;
                }
                Step::Again => {}
                Step::Cancel => return TokenizerStatus::Canceled,
                Step::Fail => return TokenizerStatus::Error,
            }
        }
        TokenizerStatus::Ok
    }

    /// Signal end of input, finalizing any pending number and checking that
    /// a complete value was seen.
    pub fn finish(&mut self, handler: &mut dyn SaxHandler) -> TokenizerStatus {
        if self.error.is_some() {
            return TokenizerStatus::Error;
        }
        if self.canceled {
            return TokenizerStatus::Canceled;
        }
        self.chunk_base = self.offset;

        if matches!(self.lex, Lex::Number(_)) {
            let Lex::Number(buf) = std::mem::replace(&mut self.lex, Lex::Idle) else {
                unreachable!();
            };
            if let Err(step) = self.finalize_number(buf, handler) {
                return match step {
                    Step::Cancel => TokenizerStatus::Canceled,
                    _ => TokenizerStatus::Error,
                };
            }
        }

        let mid_token = !matches!(self.lex, Lex::Idle);
        if mid_token || self.expect != Expect::Done {
            if self.opts.allow_partial_values {
                return TokenizerStatus::Ok;
            }
            return self.fail_status("premature EOF");
        }
        TokenizerStatus::Ok
    }

    /// Format the last failure, yajl style. With `verbose`, `context`
    /// should be the chunk that was being fed; a caret marks the offending
    /// byte.
    pub fn error_string(&self, verbose: bool, context: &[u8]) -> String {
        let base = match (&self.error, self.canceled) {
            (Some(err), _) => format!("parse error: {}", err),
            (None, true) => "client canceled parse".to_string(),
            (None, false) => "unknown error".to_string(),
        };
        if !verbose || context.is_empty() {
            return base;
        }
        let pos = self
            .error
            .as_ref()
            .map(|e| e.chunk_offset)
            .unwrap_or(0)
            .min(context.len());
        let start = pos.saturating_sub(30);
        let end = (pos + 30).min(context.len());
        let window: String = context[start..end]
            .iter()
            .map(|&b| if (0x20..0x7F).contains(&b) { b as char } else { '.' })
            .collect();
        format!("{}\n{}\n{}^\n", base, window, " ".repeat(pos - start))
    }

    fn fail(&mut self, message: &str) -> Step {
        self.record_error(message);
        Step::Fail
    }

    fn fail_status(&mut self, message: &str) -> TokenizerStatus {
        self.record_error(message);
        TokenizerStatus::Error
    }

    fn record_error(&mut self, message: &str) {
        self.error = Some(TokenizerError {
            message:      message.to_string(),
            offset:       self.offset,
            chunk_offset: (self.offset - self.chunk_base) as usize,
        });
    }

    fn cancel(&mut self) -> Step {
        self.canceled = true;
        Step::Cancel
    }

    fn after_value(&mut self) {
        self.expect = match self.containers.last() {
            None => Expect::Done,
            Some(Container::Object) => Expect::CommaOrObjEnd,
            Some(Container::Array) => Expect::CommaOrArrEnd,
        };
    }

    /// Check that a value may start here. Consumes the `Done -> Value`
    /// transition when multiple top-level values are allowed.
    fn begin_value(&mut self) -> Result<(), &'static str> {
        match self.expect {
            Expect::Value | Expect::ValueOrEnd => Ok(()),
            Expect::Done if self.opts.allow_multiple_values => {
                self.expect = Expect::Value;
                Ok(())
            }
            Expect::Done => Err("trailing garbage"),
            _ => Err("unexpected value"),
        }
    }

    fn step(&mut self, b: u8, handler: &mut dyn SaxHandler) -> Step {
        match self.lex {
            Lex::Idle => self.step_idle(b, handler),
            Lex::Str(_) => self.step_string(b, handler),
            Lex::Number(_) => self.step_number(b, handler),
            Lex::Literal { .. } => self.step_literal(b, handler),
            Lex::SlashSeen => match b {
                b'/' => {
                    self.lex = Lex::LineComment;
                    Step::Consume
                }
                b'*' => {
                    self.lex = Lex::BlockComment { star: false };
                    Step::Consume
                }
                _ => self.fail("malformed comment"),
            },
            Lex::LineComment => {
                if b == b'\n' {
                    self.lex = Lex::Idle;
                }
                Step::Consume
            }
            Lex::BlockComment { star } => {
                match (star, b) {
                    (true, b'/') => self.lex = Lex::Idle,
                    (_, b'*') => self.lex = Lex::BlockComment { star: true },
                    _ => self.lex = Lex::BlockComment { star: false },
                }
                Step::Consume
            }
        }
    }

    fn step_idle(&mut self, b: u8, handler: &mut dyn SaxHandler) -> Step {
        if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
            return Step::Consume;
        }
        if b == b'/' && self.opts.allow_comments {
            self.lex = Lex::SlashSeen;
            return Step::Consume;
        }
        if self.expect == Expect::Done
            && self.opts.allow_trailing_garbage
            && !self.opts.allow_multiple_values
        {
            return Step::Consume;
        }

        match b {
            b'{' => {
                if let Err(msg) = self.begin_value() {
                    return self.fail(msg);
                }
                self.containers.push(Container::Object);
                self.expect = Expect::KeyOrEnd;
                if !handler.on_map_start() {
                    return self.cancel();
                }
                Step::Consume
            }
            b'}' => {
                if !matches!(self.expect, Expect::KeyOrEnd | Expect::CommaOrObjEnd) {
                    return self.fail("unexpected \"}\"");
                }
                self.containers.pop();
                self.after_value();
                if !handler.on_map_end() {
                    return self.cancel();
                }
                Step::Consume
            }
            b'[' => {
                if let Err(msg) = self.begin_value() {
                    return self.fail(msg);
                }
                self.containers.push(Container::Array);
                self.expect = Expect::ValueOrEnd;
                if !handler.on_array_start() {
                    return self.cancel();
                }
                Step::Consume
            }
            b']' => {
                if !matches!(self.expect, Expect::ValueOrEnd | Expect::CommaOrArrEnd) {
                    return self.fail("unexpected \"]\"");
                }
                self.containers.pop();
                self.after_value();
                if !handler.on_array_end() {
                    return self.cancel();
                }
                Step::Consume
            }
            b':' => {
                if self.expect != Expect::Colon {
                    return self.fail("unexpected \":\"");
                }
                self.expect = Expect::Value;
                Step::Consume
            }
            b',' => match self.expect {
                Expect::CommaOrObjEnd => {
                    self.expect = Expect::Key;
                    Step::Consume
                }
                Expect::CommaOrArrEnd => {
                    self.expect = Expect::Value;
                    Step::Consume
                }
                _ => self.fail("unexpected \",\""),
            },
            b'"' => {
                let is_key = match self.expect {
                    Expect::KeyOrEnd | Expect::Key => true,
                    _ => {
                        if let Err(msg) = self.begin_value() {
                            return self.fail(msg);
                        }
                        false
                    }
                };
                self.lex = Lex::Str(StrState {
                    buf: Vec::new(),
                    is_key,
                    esc: Esc::None,
                    pending_high: None,
                });
                Step::Consume
            }
            b't' | b'f' | b'n' => {
                if let Err(msg) = self.begin_value() {
                    return self.fail(msg);
                }
                let (text, kind): (&'static [u8], LitKind) = match b {
                    b't' => (b"true", LitKind::True),
                    b'f' => (b"false", LitKind::False),
                    _ => (b"null", LitKind::Null),
                };
                self.lex = Lex::Literal { text, pos: 1, kind };
                Step::Consume
            }
            b'-' | b'0'..=b'9' => {
                if let Err(msg) = self.begin_value() {
                    return self.fail(msg);
                }
                self.lex = Lex::Number(vec![b]);
                Step::Consume
            }
            _ => self.fail("unallowed token"),
        }
    }

    fn step_string(&mut self, b: u8, handler: &mut dyn SaxHandler) -> Step {
        let Lex::Str(mut st) = std::mem::replace(&mut self.lex, Lex::Idle) else {
            unreachable!("step_string outside string state");
        };

        match st.esc {
            Esc::Start => {
                if st.pending_high.is_some() && b != b'u' {
                    return self.fail("expected low surrogate escape");
                }
                match b {
                    b'"' => st.buf.push(b'"'),
                    b'\\' => st.buf.push(b'\\'),
                    b'/' => st.buf.push(b'/'),
                    b'b' => st.buf.push(0x08),
                    b'f' => st.buf.push(0x0C),
                    b'n' => st.buf.push(b'\n'),
                    b'r' => st.buf.push(b'\r'),
                    b't' => st.buf.push(b'\t'),
                    b'u' => {
                        st.esc = Esc::Unicode { acc: 0, digits: 0 };
                        self.lex = Lex::Str(st);
                        return Step::Consume;
                    }
                    _ => return self.fail("invalid escape sequence"),
                }
                st.esc = Esc::None;
                self.lex = Lex::Str(st);
                Step::Consume
            }
            Esc::Unicode { acc, digits } => {
                let digit = match hex_value(b) {
                    Some(d) => d,
                    None => return self.fail("invalid unicode escape"),
                };
                let acc = (acc << 4) | digit as u16;
                let digits = digits + 1;
                if digits < 4 {
                    st.esc = Esc::Unicode { acc, digits };
                    self.lex = Lex::Str(st);
                    return Step::Consume;
                }
                st.esc = Esc::None;
                if let Some(high) = st.pending_high {
                    if !(0xDC00..=0xDFFF).contains(&acc) {
                        return self.fail("expected low surrogate escape");
                    }
                    let code =
                        0x10000 + (((high as u32) - 0xD800) << 10) + ((acc as u32) - 0xDC00);
                    match char::from_u32(code) {
                        Some(c) => push_char(&mut st.buf, c),
                        None => return self.fail("invalid unicode escape"),
                    }
                    st.pending_high = None;
                } else if (0xD800..=0xDBFF).contains(&acc) {
                    st.pending_high = Some(acc);
                } else if (0xDC00..=0xDFFF).contains(&acc) {
                    return self.fail("lone low surrogate escape");
                } else {
                    match char::from_u32(acc as u32) {
                        Some(c) => push_char(&mut st.buf, c),
                        None => return self.fail("invalid unicode escape"),
                    }
                }
                self.lex = Lex::Str(st);
                Step::Consume
            }
            Esc::None => {
                if st.pending_high.is_some() {
                    if b != b'\\' {
                        return self.fail("expected low surrogate escape");
                    }
                    st.esc = Esc::Start;
                    self.lex = Lex::Str(st);
                    return Step::Consume;
                }
                match b {
                    b'"' => {
                        if self.opts.validate_utf8 && std::str::from_utf8(&st.buf).is_err() {
                            return self.fail("invalid UTF-8 string");
                        }
                        if st.is_key {
                            self.expect = Expect::Colon;
                            if !handler.on_map_key(&st.buf) {
                                return self.cancel();
                            }
                        } else {
                            self.after_value();
                            if !handler.on_string(&st.buf) {
                                return self.cancel();
                            }
                        }
                        Step::Consume
                    }
                    b'\\' => {
                        st.esc = Esc::Start;
                        self.lex = Lex::Str(st);
                        Step::Consume
                    }
                    0x00..=0x1F => self.fail("unescaped control character in string"),
                    _ => {
                        st.buf.push(b);
                        self.lex = Lex::Str(st);
                        Step::Consume
                    }
                }
            }
        }
    }

    fn step_number(&mut self, b: u8, handler: &mut dyn SaxHandler) -> Step {
        let Lex::Number(mut buf) = std::mem::replace(&mut self.lex, Lex::Idle) else {
            unreachable!("step_number outside number state");
        };
        if matches!(b, b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-') {
            buf.push(b);
            self.lex = Lex::Number(buf);
            return Step::Consume;
        }
        match self.finalize_number(buf, handler) {
            Ok(()) => Step::Again,
            Err(step) => step,
        }
    }

    fn finalize_number(
        &mut self,
        buf: Vec<u8>,
        handler: &mut dyn SaxHandler,
    ) -> Result<(), Step> {
        let text = match std::str::from_utf8(&buf) {
            Ok(t) => t,
            Err(_) => return Err(self.fail("malformed number")),
        };
        if !valid_number(text) {
            return Err(self.fail("malformed number"));
        }
        self.after_value();
        if text.bytes().any(|c| matches!(c, b'.' | b'e' | b'E')) {
            match text.parse::<f64>() {
                Ok(v) => {
                    if !handler.on_double(v) {
                        return Err(self.cancel());
                    }
                }
                Err(_) => return Err(self.fail("malformed number")),
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => {
                    if !handler.on_integer(v) {
                        return Err(self.cancel());
                    }
                }
                Err(_) => return Err(self.fail("integer overflow")),
            }
        }
        Ok(())
    }

    fn step_literal(&mut self, b: u8, handler: &mut dyn SaxHandler) -> Step {
        let Lex::Literal { text, pos, kind } = std::mem::replace(&mut self.lex, Lex::Idle) else {
            unreachable!("step_literal outside literal state");
        };
        if b != text[pos] {
            return self.fail("invalid token");
        }
        if pos + 1 < text.len() {
            self.lex = Lex::Literal { text, pos: pos + 1, kind };
            return Step::Consume;
        }
        self.after_value();
        let keep_going = match kind {
            LitKind::True => handler.on_bool(true),
            LitKind::False => handler.on_bool(false),
            LitKind::Null => handler.on_null(),
        };
        if !keep_going {
            return self.cancel();
        }
        Step::Consume
    }
}

fn push_char(buf: &mut Vec<u8>, c: char) {
    let mut encoded = [0u8; 4];
    buf.extend_from_slice(c.encode_utf8(&mut encoded).as_bytes());
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// JSON number grammar: `-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?`.
fn valid_number(s: &str) -> bool {
    let b = s.as_bytes();
    let mut i = 0;
    if i < b.len() && b[i] == b'-' {
        i += 1;
    }
    if i >= b.len() {
        return false;
    }
    if b[i] == b'0' {
        i += 1;
    } else if b[i].is_ascii_digit() {
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
    } else {
        return false;
    }
    if i < b.len() && b[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        if i == frac_start {
            return false;
        }
    }
    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        i += 1;
        if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }
    i == b.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Event, EventLog};

    fn parse(text: &str) -> Result<Vec<Event>, String> {
        parse_with(text, TokenizerOptions::default())
    }

    fn parse_with(text: &str, opts: TokenizerOptions) -> Result<Vec<Event>, String> {
        let mut tok = JsonTokenizer::new(opts);
        let mut log = EventLog::new();
        if tok.feed(text.as_bytes(), &mut log) != TokenizerStatus::Ok {
            return Err(tok.error_string(false, &[]));
        }
        if tok.finish(&mut log) != TokenizerStatus::Ok {
            return Err(tok.error_string(false, &[]));
        }
        Ok(log.events)
    }

    #[test]
    fn test_scalar_document() {
        assert_eq!(parse("42").unwrap(), vec![Event::Integer(42)]);
        assert_eq!(parse("-7").unwrap(), vec![Event::Integer(-7)]);
        assert_eq!(parse("3.5").unwrap(), vec![Event::Double(3.5)]);
        assert_eq!(parse("1e3").unwrap(), vec![Event::Double(1000.0)]);
        assert_eq!(parse("true").unwrap(), vec![Event::Bool(true)]);
        assert_eq!(parse("null").unwrap(), vec![Event::Null]);
        assert_eq!(
            parse("\"hi\"").unwrap(),
            vec![Event::String("hi".to_string())]
        );
    }

    #[test]
    fn test_object_events_in_document_order() {
        let events = parse(r#"{"x": 3, "y": [1, 2], "p": {"ok": true}}"#).unwrap();
        assert_eq!(
            events,
            vec![
                Event::MapStart,
                Event::MapKey("x".to_string()),
                Event::Integer(3),
                Event::MapKey("y".to_string()),
                Event::ArrayStart,
                Event::Integer(1),
                Event::Integer(2),
                Event::ArrayEnd,
                Event::MapKey("p".to_string()),
                Event::MapStart,
                Event::MapKey("ok".to_string()),
                Event::Bool(true),
                Event::MapEnd,
                Event::MapEnd,
            ]
        );
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(parse("{}").unwrap(), vec![Event::MapStart, Event::MapEnd]);
        assert_eq!(
            parse("[]").unwrap(),
            vec![Event::ArrayStart, Event::ArrayEnd]
        );
    }

    #[test]
    fn test_string_escapes() {
        let events = parse(r#""a\nb\t\"\\A""#).unwrap();
        assert_eq!(events, vec![Event::String("a\nb\t\"\\A".to_string())]);
    }

    #[test]
    fn test_surrogate_pair() {
        let events = parse(r#""😀""#).unwrap();
        assert_eq!(events, vec![Event::String("\u{1F600}".to_string())]);
    }

    #[test]
    fn test_lone_surrogate_is_error() {
        assert!(parse(r#""\uDE00""#).unwrap_err().contains("surrogate"));
        assert!(parse(r#""\uD83Dx""#).unwrap_err().contains("surrogate"));
    }

    #[test]
    fn test_malformed_numbers() {
        assert!(parse("01").unwrap_err().contains("malformed number"));
        assert!(parse("1.").unwrap_err().contains("malformed number"));
        assert!(parse("-").unwrap_err().contains("malformed number"));
        assert!(parse("1e").unwrap_err().contains("malformed number"));
    }

    #[test]
    fn test_integer_overflow() {
        assert!(parse("99999999999999999999")
            .unwrap_err()
            .contains("integer overflow"));
    }

    #[test]
    fn test_structural_errors() {
        assert!(parse("{\"a\" 1}").unwrap_err().contains("unexpected"));
        assert!(parse("[1,]").unwrap_err().contains("unexpected"));
        assert!(parse("{,}").unwrap_err().contains("unexpected"));
        assert!(parse("]").unwrap_err().contains("unexpected"));
    }

    #[test]
    fn test_trailing_garbage() {
        assert!(parse("1 2").unwrap_err().contains("trailing garbage"));
        assert!(parse("{} 2").unwrap_err().contains("trailing garbage"));
    }

    #[test]
    fn test_premature_eof() {
        assert!(parse("{\"a\": 1").unwrap_err().contains("premature EOF"));
        assert!(parse("\"open").unwrap_err().contains("premature EOF"));
        assert!(parse("").unwrap_err().contains("premature EOF"));
    }

    #[test]
    fn test_allow_multiple_values() {
        let opts = TokenizerOptions {
            allow_multiple_values: true,
            ..TokenizerOptions::default()
        };
        let events = parse_with("1 2 3", opts).unwrap();
        assert_eq!(
            events,
            vec![Event::Integer(1), Event::Integer(2), Event::Integer(3)]
        );
    }

    #[test]
    fn test_allow_trailing_garbage() {
        let opts = TokenizerOptions {
            allow_trailing_garbage: true,
            ..TokenizerOptions::default()
        };
        assert_eq!(parse_with("{} xyz", opts).unwrap(), vec![
            Event::MapStart,
            Event::MapEnd
        ]);
    }

    #[test]
    fn test_allow_partial_values() {
        let opts = TokenizerOptions {
            allow_partial_values: true,
            ..TokenizerOptions::default()
        };
        let events = parse_with("[1, 2", opts).unwrap();
        assert_eq!(
            events,
            vec![Event::ArrayStart, Event::Integer(1), Event::Integer(2)]
        );
    }

    #[test]
    fn test_comments_disabled_by_default() {
        assert!(parse("// c\n1").is_err());
    }

    #[test]
    fn test_comments_enabled() {
        let opts = TokenizerOptions {
            allow_comments: true,
            ..TokenizerOptions::default()
        };
        let events = parse_with("// line\n[1, /* block */ 2]", opts).unwrap();
        assert_eq!(
            events,
            vec![Event::ArrayStart, Event::Integer(1), Event::Integer(2), Event::ArrayEnd]
        );
    }

    #[test]
    fn test_cancel_propagates() {
        let mut tok = JsonTokenizer::new(TokenizerOptions::default());
        let mut log = EventLog {
            events: Vec::new(),
            abort_after: Some(2),
        };
        let status = tok.feed(b"[1, 2, 3]", &mut log);
        assert_eq!(status, TokenizerStatus::Canceled);
        assert_eq!(log.events.len(), 2);
        // sticky
        assert_eq!(tok.feed(b"]", &mut log), TokenizerStatus::Canceled);
        assert!(tok.error_string(false, &[]).contains("canceled"));
    }

    #[test]
    fn test_errors_are_sticky() {
        let mut tok = JsonTokenizer::new(TokenizerOptions::default());
        let mut log = EventLog::new();
        assert_eq!(tok.feed(b"}", &mut log), TokenizerStatus::Error);
        assert_eq!(tok.feed(b"{}", &mut log), TokenizerStatus::Error);
        assert_eq!(tok.finish(&mut log), TokenizerStatus::Error);
    }

    #[test]
    fn test_error_string_verbose_caret() {
        let mut tok = JsonTokenizer::new(TokenizerOptions::default());
        let mut log = EventLog::new();
        let chunk = b"{\"a\": 01}";
        assert_eq!(tok.feed(chunk, &mut log), TokenizerStatus::Error);
        let err = tok.error_string(true, chunk);
        assert!(err.contains("malformed number"));
        assert!(err.contains('^'));
    }

    #[test]
    fn test_number_ended_by_finish() {
        let mut tok = JsonTokenizer::new(TokenizerOptions::default());
        let mut log = EventLog::new();
        assert_eq!(tok.feed(b"12", &mut log), TokenizerStatus::Ok);
        assert_eq!(tok.feed(b"34", &mut log), TokenizerStatus::Ok);
        assert_eq!(tok.finish(&mut log), TokenizerStatus::Ok);
        assert_eq!(log.events, vec![Event::Integer(1234)]);
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut tok = JsonTokenizer::new(TokenizerOptions::default());
        let mut log = EventLog::new();
        let status = tok.feed(b"\"\xFF\xFE\"", &mut log);
        assert_eq!(status, TokenizerStatus::Error);
        assert!(tok.error_string(false, &[]).contains("UTF-8"));
    }

    #[test]
    fn test_unescaped_control_rejected() {
        assert!(parse("\"a\u{0}b\"").is_err());
    }
}

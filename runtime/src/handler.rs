//! The SAX event interface between the tokenizer and generated parsers.

/// Callbacks invoked by [`JsonTokenizer`](crate::JsonTokenizer) in document
/// order. Every method returns `true` to continue tokenizing and `false`
/// to abort the parse. Default bodies continue, so implementations override
/// only the events they care about.
///
/// String and key bytes are passed raw; when UTF-8 validation is enabled in
/// the tokenizer options the bytes are guaranteed valid UTF-8.
pub trait SaxHandler {
    fn on_null(&mut self) -> bool {
        true
    }
    fn on_bool(&mut self, _value: bool) -> bool {
        true
    }
    fn on_integer(&mut self, _value: i64) -> bool {
        true
    }
    fn on_double(&mut self, _value: f64) -> bool {
        true
    }
    fn on_string(&mut self, _value: &[u8]) -> bool {
        true
    }
    fn on_map_start(&mut self) -> bool {
        true
    }
    fn on_map_key(&mut self, _key: &[u8]) -> bool {
        true
    }
    fn on_map_end(&mut self) -> bool {
        true
    }
    fn on_array_start(&mut self) -> bool {
        true
    }
    fn on_array_end(&mut self) -> bool {
        true
    }
}

/// One recorded SAX event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    MapStart,
    MapKey(String),
    MapEnd,
    ArrayStart,
    ArrayEnd,
}

/// A handler that records every event; handy for tests and debugging.
/// With `abort_after` set, the handler returns `false` once that many
/// events have been recorded.
#[derive(Debug, Default)]
pub struct EventLog {
    pub events:      Vec<Event>,
    pub abort_after: Option<usize>,
}

impl EventLog {
    pub fn new() -> EventLog {
        EventLog::default()
    }

    fn push(&mut self, event: Event) -> bool {
        self.events.push(event);
        match self.abort_after {
            Some(limit) => self.events.len() < limit,
            None => true,
        }
    }
}

impl SaxHandler for EventLog {
    fn on_null(&mut self) -> bool {
        self.push(Event::Null)
    }
    fn on_bool(&mut self, value: bool) -> bool {
        self.push(Event::Bool(value))
    }
    fn on_integer(&mut self, value: i64) -> bool {
        self.push(Event::Integer(value))
    }
    fn on_double(&mut self, value: f64) -> bool {
        self.push(Event::Double(value))
    }
    fn on_string(&mut self, value: &[u8]) -> bool {
        self.push(Event::String(String::from_utf8_lossy(value).into_owned()))
    }
    fn on_map_start(&mut self) -> bool {
        self.push(Event::MapStart)
    }
    fn on_map_key(&mut self, key: &[u8]) -> bool {
        self.push(Event::MapKey(String::from_utf8_lossy(key).into_owned()))
    }
    fn on_map_end(&mut self) -> bool {
        self.push(Event::MapEnd)
    }
    fn on_array_start(&mut self) -> bool {
        self.push(Event::ArrayStart)
    }
    fn on_array_end(&mut self) -> bool {
        self.push(Event::ArrayEnd)
    }
}

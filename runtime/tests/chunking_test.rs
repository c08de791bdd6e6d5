//! Chunking invariance: any split of the input bytes must produce the same
//! event sequence as feeding the document whole.

use protosax_runtime::{Event, EventLog, JsonTokenizer, TokenizerOptions, TokenizerStatus};

const DOC: &str = r#"{
  "name": "oé😀",
  "p": {"x": 1, "y": -2},
  "xs": [1, 2.5, 3e2, true, false, null],
  "empty": {},
  "deep": [[{"k": "v"}], []]
}"#;

fn events_for_chunks(chunks: &[&[u8]]) -> Vec<Event> {
    let mut tok = JsonTokenizer::new(TokenizerOptions::default());
    let mut log = EventLog::new();
    for chunk in chunks {
        assert_eq!(tok.feed(chunk, &mut log), TokenizerStatus::Ok);
    }
    assert_eq!(tok.finish(&mut log), TokenizerStatus::Ok);
    log.events
}

#[test]
fn test_whole_vs_byte_at_a_time() {
    let whole = events_for_chunks(&[DOC.as_bytes()]);
    let bytes: Vec<&[u8]> = DOC.as_bytes().chunks(1).collect();
    assert_eq!(events_for_chunks(&bytes), whole);
}

#[test]
fn test_every_two_way_split() {
    let whole = events_for_chunks(&[DOC.as_bytes()]);
    let doc = DOC.as_bytes();
    for split in 0..=doc.len() {
        let events = events_for_chunks(&[&doc[..split], &doc[split..]]);
        assert_eq!(events, whole, "split at byte {}", split);
    }
}

#[test]
fn test_odd_sized_chunks() {
    let whole = events_for_chunks(&[DOC.as_bytes()]);
    for size in [2, 3, 5, 7, 11, 13] {
        let chunks: Vec<&[u8]> = DOC.as_bytes().chunks(size).collect();
        assert_eq!(events_for_chunks(&chunks), whole, "chunk size {}", size);
    }
}

#[test]
fn test_expected_event_sequence() {
    let events = events_for_chunks(&[DOC.as_bytes()]);
    assert_eq!(events[0], Event::MapStart);
    assert_eq!(events[1], Event::MapKey("name".to_string()));
    assert_eq!(events[2], Event::String("o\u{e9}\u{1F600}".to_string()));
    assert_eq!(*events.last().unwrap(), Event::MapEnd);
    let starts = events
        .iter()
        .filter(|e| matches!(e, Event::MapStart | Event::ArrayStart))
        .count();
    let ends = events
        .iter()
        .filter(|e| matches!(e, Event::MapEnd | Event::ArrayEnd))
        .count();
    assert_eq!(starts, ends);
}

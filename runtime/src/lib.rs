//! protosax-runtime
//!
//! Runtime support for parsers generated by `protosax`:
//!
//!  1) The `SaxHandler` event interface implemented by generated code,
//!  2) A chunked, push-style JSON tokenizer (`JsonTokenizer`) that drives a
//!     `SaxHandler`,
//!  3) The stable `key_hash` used both at generate time (to embed match
//!     constants) and at runtime (to dispatch incoming object keys).

pub mod handler;
pub mod tokenizer;

pub use handler::{Event, EventLog, SaxHandler};
pub use tokenizer::{JsonTokenizer, TokenizerError, TokenizerOptions, TokenizerStatus};

use std::hash::Hasher;

use fnv::FnvHasher;

/// Stable 64-bit FNV-1a hash of an object key. Generated dispatch tables
/// embed these values as constants; the same function must therefore be
/// used on both sides, and its output must never change.
pub fn key_hash(key: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(key);
    hasher.finish()
}

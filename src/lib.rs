//! protosax
//!
//! A schema-driven parser generator: given a `.proto` schema and the
//! fully-qualified name of a root message, it emits Rust source for a
//! streaming JSON parser specialized to that message. The pipeline is
//!
//!  1) Schema loading (`tokenizer`, `parser`, `pool`, `loader`),
//!  2) Parse-graph construction (`graph`): one automaton state per
//!     position in the message's JSON shape,
//!  3) Emission (`emitter`): per-event dispatch tables over those states.
//!
//! Generated parsers run against the `protosax-runtime` crate's SAX
//! tokenizer and populate an externally provided message object model.

pub mod error;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod pool;
pub mod loader;
pub mod graph;
pub mod emitter;

pub use emitter::{generate_parser, EmittedParser};
pub use error::GenError;
pub use graph::ParseGraph;
pub use loader::load_schema;
pub use pool::DescriptorPool;

use std::path::Path;

/// Full pipeline: load the schema, build the parse graph, render the
/// parser sources. The artifacts are returned, not written.
pub fn generate_from_file(
    idl_path: &Path,
    messages_path: &str,
    message_name: &str,
) -> Result<EmittedParser, GenError> {
    let mut pool = DescriptorPool::new();
    let (_file, root) = load_schema(&mut pool, idl_path, message_name)?;
    let graph = ParseGraph::build(&pool, root)?;
    generate_parser(&pool, &graph, messages_path)
}

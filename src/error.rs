use std::path::PathBuf;

use thiserror::Error;

/// Fatal generator errors. Every variant aborts generation; the CLI prints
/// the message and exits non-zero.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("Unable to open schema file {}: {source}", path.display())]
    SchemaOpen {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error at line {line}, column {column}: {msg}")]
    SchemaParse {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Schema error at line {line}, column {column}: {msg}")]
    SchemaBuild {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Unable to find message type {name}")]
    MessageNotFound { name: String },

    #[error("Unsupported field type {type_tag} for {field_path}")]
    UnsupportedType {
        field_path: String,
        type_tag:   String,
    },

    #[error("Recursive nesting of {path} is not allowed")]
    RecursiveMessage { path: String },

    #[error("Key hash collision under {parent_path}: {key_a} and {key_b}")]
    KeyHashCollision {
        parent_path: String,
        key_a:       String,
        key_b:       String,
    },

    #[error("Unable to write {}: {source}", path.display())]
    EmitIo {
        path:   PathBuf,
        source: std::io::Error,
    },
}

impl GenError {
    pub(crate) fn parse(msg: &str, line: usize, column: usize) -> GenError {
        GenError::SchemaParse {
            msg: msg.to_string(),
            line,
            column,
        }
    }

    pub(crate) fn build(msg: &str, line: usize, column: usize) -> GenError {
        GenError::SchemaBuild {
            msg: msg.to_string(),
            line,
            column,
        }
    }
}

use std::fs;
use std::path::Path;

use log::debug;

use crate::{
    error::GenError,
    parser::parse_schema,
    pool::{DescriptorPool, FileId, MessageId},
    tokenizer::tokenize_schema,
};

/// Load a `.proto` file into the pool and resolve the root message.
pub fn load_schema(
    pool: &mut DescriptorPool,
    path: &Path,
    message_name: &str,
) -> Result<(FileId, MessageId), GenError> {
    let text = fs::read_to_string(path).map_err(|source| GenError::SchemaOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let tokens = tokenize_schema(&text)?;
    let ast = parse_schema(&tokens)?;
    let file_id = pool.add_file(&path.to_string_lossy(), &ast)?;
    debug!(
        "loaded {} ({} top-level definitions)",
        pool.file(file_id).name,
        ast.definitions.len()
    );

    let msg_id = pool
        .find_message(message_name)
        .ok_or_else(|| GenError::MessageNotFound {
            name: message_name.to_string(),
        })?;

    Ok((file_id, msg_id))
}

//! Emits the generated parser: an API unit and a SAX dispatch unit, both
//! plain Rust source text. The dispatch unit is pulled into a private
//! `mod sax` of the API unit via `include!`, so the pair lands in the user
//! crate as one public module with a private event-dispatch core.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::debug;
use protosax_runtime::key_hash;

use crate::{
    error::GenError,
    graph::{Node, NodeKind, ParseGraph, StateId},
    pool::{DescriptorPool, EnumId, FieldType, FileId, MessageId, ScalarType},
};

/// The two generated source artifacts, ready to be written.
#[derive(Debug)]
pub struct EmittedParser {
    pub api_file_name: String,
    pub api_source:    String,
    pub sax_file_name: String,
    pub sax_source:    String,
}

impl EmittedParser {
    /// Write both artifacts into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<(), GenError> {
        for (name, source) in [
            (&self.api_file_name, &self.api_source),
            (&self.sax_file_name, &self.sax_source),
        ] {
            let path = dir.join(name);
            fs::write(&path, source).map_err(|source| GenError::EmitIo {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Render the parser for `graph`. `messages_path` is the Rust path of the
/// module that provides the generated message types.
pub fn generate_parser(
    pool: &DescriptorPool,
    graph: &ParseGraph,
    messages_path: &str,
) -> Result<EmittedParser, GenError> {
    verify_key_hashes(graph)?;

    let emitter = Emitter {
        pool,
        graph,
        messages_path,
    };
    let root = pool.message(graph.root_message);
    let name_lower = root.name.to_lowercase();
    let api_file_name = format!("{}_parser.pb.rs", name_lower);
    let sax_file_name = format!("{}_parser_sax.pb.rs", name_lower);

    debug!(
        "emitting {} and {} for {}",
        api_file_name, sax_file_name, root.full_name
    );

    Ok(EmittedParser {
        api_source: emitter.render_api(&sax_file_name),
        sax_source: emitter.render_sax(),
        api_file_name,
        sax_file_name,
    })
}

/// Every key embedded in a dispatch table must hash uniquely among its
/// siblings; a collision would emit two identical match arms.
fn verify_key_hashes(graph: &ParseGraph) -> Result<(), GenError> {
    for &state in &graph.message_start_nodes {
        let node = graph.node(state);
        let keys: Vec<&str> = node
            .children
            .iter()
            .map(|&child| graph.node(child).name.as_str())
            .collect();
        check_distinct_hashes(&node.full_name, &keys, key_hash)?;
    }
    Ok(())
}

fn check_distinct_hashes(
    parent_path: &str,
    keys: &[&str],
    hash_of: impl Fn(&[u8]) -> u64,
) -> Result<(), GenError> {
    let mut seen: HashMap<u64, &str> = HashMap::new();
    for key in keys {
        if let Some(previous) = seen.insert(hash_of(key.as_bytes()), key) {
            return Err(GenError::KeyHashCollision {
                parent_path: parent_path.to_string(),
                key_a:       previous.to_string(),
                key_b:       key.to_string(),
            });
        }
    }
    Ok(())
}

struct Emitter<'p> {
    pool:          &'p DescriptorPool,
    graph:         &'p ParseGraph,
    messages_path: &'p str,
}

impl<'p> Emitter<'p> {
    fn root_desc(&self) -> &crate::pool::MessageDescriptor {
        self.pool.message(self.graph.root_message)
    }

    fn package(&self) -> Option<&str> {
        self.pool
            .file(self.root_desc().file)
            .package
            .as_deref()
            .filter(|p| !p.is_empty())
    }

    /// `Outer.Inner` of package `a.b` becomes `pb::Outer_Inner`.
    fn rust_local_name(&self, full_name: &str, file: FileId) -> String {
        let package = self.pool.file(file).package.as_deref().unwrap_or("");
        let local = if package.is_empty() {
            full_name
        } else {
            full_name
                .strip_prefix(package)
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(full_name)
        };
        local.replace('.', "_")
    }

    fn rust_message_type(&self, id: MessageId) -> String {
        let msg = self.pool.message(id);
        format!("pb::{}", self.rust_local_name(&msg.full_name, msg.file))
    }

    fn rust_enum_type(&self, id: EnumId) -> String {
        let en = self.pool.enum_type(id);
        format!("pb::{}", self.rust_local_name(&en.full_name, en.file))
    }

    fn prefix(&self) -> String {
        self.root_desc().name.to_lowercase()
    }

    fn pascal(&self) -> &str {
        &self.root_desc().name
    }

    fn root_type(&self) -> String {
        self.rust_message_type(self.graph.root_message)
    }

    fn namespace_segments(&self) -> Vec<String> {
        match self.package() {
            Some(pkg) => pkg.split('.').map(str::to_string).collect(),
            None => Vec::new(),
        }
    }

    fn render_api(&self, sax_file_name: &str) -> String {
        let mut out: Vec<String> = Vec::new();
        let t = self.prefix();
        let p = self.pascal();
        let c = self.root_type();
        let root = self.root_desc();

        out.push(format!(
            "// @generated by protosax from {}. Do not edit.",
            self.pool.file(root.file).name
        ));
        out.push(format!("// Streaming JSON parser for {}.", root.full_name));
        out.push(String::new());

        let ns = self.namespace_segments();
        for segment in &ns {
            out.push(format!("pub mod {} {{", segment));
        }
        if !ns.is_empty() {
            out.push(String::new());
        }

        out.push(format!("use {} as pb;", self.messages_path));
        out.push("use protosax_runtime as rt;".to_string());
        out.push(String::new());

        out.push("/// Diagnostic from a failed parse.".to_string());
        out.push("#[derive(Debug)]".to_string());
        out.push(format!("pub struct {}ParseError(pub String);", p));
        out.push(String::new());
        out.push(format!("impl std::fmt::Display for {}ParseError {{", p));
        out.push(
            "    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {"
                .to_string(),
        );
        out.push("        f.write_str(&self.0)".to_string());
        out.push("    }".to_string());
        out.push("}".to_string());
        out.push(String::new());
        out.push(format!("impl std::error::Error for {}ParseError {{}}", p));
        out.push(String::new());

        out.push(format!("pub struct {}ParserConfig {{", p));
        out.push("    pub check_initialized: bool,".to_string());
        out.push("}".to_string());
        out.push(String::new());

        out.push(format!("pub struct {}ParserState<'m> {{", p));
        out.push("    tokenizer: rt::JsonTokenizer,".to_string());
        out.push(format!("    sax: sax::{}Sax<'m>,", p));
        out.push("}".to_string());
        out.push(String::new());

        // easy
        out.push("/// One-shot: init, feed, complete, free.".to_string());
        out.push(format!(
            "pub fn {}_parser_easy(json: &str) -> Result<{}, {}ParseError> {{",
            t, c, p
        ));
        out.push(format!("    let mut msg = {}::default();", c));
        out.push(format!("    let mut state = {}_parser_init(&mut msg);", t));
        out.push(format!(
            "    if {}_parser_on_chunk(&mut state, json.as_bytes()) != 0 {{",
            t
        ));
        out.push(format!(
            "        let err = {}_parser_get_error(&state, false, json.as_bytes());",
            t
        ));
        out.push(format!("        return Err({}ParseError(err));", p));
        out.push("    }".to_string());
        out.push(format!("    if {}_parser_complete(&mut state) != 0 {{", t));
        out.push(format!(
            "        let err = {}_parser_get_error(&state, false, json.as_bytes());",
            t
        ));
        out.push(format!("        return Err({}ParseError(err));", p));
        out.push("    }".to_string());
        out.push(format!("    {}_parser_free(state);", t));
        out.push("    Ok(msg)".to_string());
        out.push("}".to_string());
        out.push(String::new());

        // init
        out.push("/// Bind parser state to an externally-owned message.".to_string());
        out.push(format!(
            "pub fn {}_parser_init(msg: &mut {}) -> {}ParserState<'_> {{",
            t, c, p
        ));
        out.push("    let tokenizer = rt::JsonTokenizer::new(rt::TokenizerOptions {".to_string());
        out.push("        allow_comments: false,".to_string());
        out.push("        validate_utf8: true,".to_string());
        out.push("        allow_trailing_garbage: false,".to_string());
        out.push("        allow_multiple_values: false,".to_string());
        out.push("        allow_partial_values: false,".to_string());
        out.push("    });".to_string());
        out.push(format!("    {}ParserState {{", p));
        out.push("        tokenizer,".to_string());
        out.push(format!("        sax: sax::{}Sax {{", p));
        out.push(format!(
            "            config: {}ParserConfig {{ check_initialized: true }},",
            p
        ));
        out.push("            location: 0,".to_string());
        out.push("            req: msg,".to_string());
        out.push("            msg_stack: Vec::new(),".to_string());
        out.push("        },".to_string());
        out.push("    }".to_string());
        out.push("}".to_string());
        out.push(String::new());

        // free
        out.push(format!(
            "pub fn {}_parser_free(state: {}ParserState<'_>) {{",
            t, p
        ));
        out.push("    drop(state);".to_string());
        out.push("}".to_string());
        out.push(String::new());

        // on_chunk
        out.push(format!(
            "pub fn {}_parser_on_chunk(state: &mut {}ParserState<'_>, chunk: &[u8]) -> i32 {{",
            t, p
        ));
        out.push("    match state.tokenizer.feed(chunk, &mut state.sax) {".to_string());
        out.push("        rt::TokenizerStatus::Ok => 0,".to_string());
        out.push("        _ => 1,".to_string());
        out.push("    }".to_string());
        out.push("}".to_string());
        out.push(String::new());

        // complete
        out.push(format!(
            "pub fn {}_parser_complete(state: &mut {}ParserState<'_>) -> i32 {{",
            t, p
        ));
        out.push("    match state.tokenizer.finish(&mut state.sax) {".to_string());
        out.push("        rt::TokenizerStatus::Ok => 0,".to_string());
        out.push("        _ => 1,".to_string());
        out.push("    }".to_string());
        out.push("}".to_string());
        out.push(String::new());

        // reset
        out.push("/// Clear location, stack and target message; keeps the tokenizer.".to_string());
        out.push(format!(
            "pub fn {}_parser_reset(state: &mut {}ParserState<'_>) -> i32 {{",
            t, p
        ));
        out.push("    state.sax.reset();".to_string());
        out.push("    0".to_string());
        out.push("}".to_string());
        out.push(String::new());

        // get_error
        out.push(format!(
            "pub fn {}_parser_get_error(state: &{}ParserState<'_>, verbose: bool, chunk: &[u8]) -> String {{",
            t, p
        ));
        out.push("    state.tokenizer.error_string(verbose, chunk)".to_string());
        out.push("}".to_string());
        out.push(String::new());

        out.push("#[allow(unused_variables, unreachable_code)]".to_string());
        out.push("mod sax {".to_string());
        out.push("    use super::*;".to_string());
        out.push(format!("    include!(\"{}\");", sax_file_name));
        out.push("}".to_string());

        if !ns.is_empty() {
            out.push(String::new());
        }
        for segment in ns.iter().rev() {
            out.push(format!("}} // mod {}", segment));
        }
        out.push(String::new());
        out.join("\n")
    }

    fn render_sax(&self) -> String {
        let mut out: Vec<String> = Vec::new();
        let p = self.pascal();

        out.push(format!(
            "// @generated by protosax; SAX dispatch for {}. Do not edit.",
            self.root_desc().full_name
        ));
        out.push("// Included into the parser module as a private `mod sax`.".to_string());
        out.push(String::new());

        out.push(format!("pub(super) struct {}Sax<'m> {{", p));
        out.push(format!("    pub(super) config: {}ParserConfig,", p));
        out.push("    pub(super) location: usize,".to_string());
        out.push(format!("    pub(super) req: &'m mut {},", self.root_type()));
        out.push("    pub(super) msg_stack: Vec<*mut ()>,".to_string());
        out.push("}".to_string());
        out.push(String::new());

        out.push(format!("impl {}Sax<'_> {{", p));
        out.push("    pub(super) fn reset(&mut self) {".to_string());
        out.push("        self.location = 0;".to_string());
        out.push("        self.req.clear();".to_string());
        out.push("        self.msg_stack.clear();".to_string());
        out.push("    }".to_string());
        out.push(String::new());
        out.push("    fn top(&self) -> *mut () {".to_string());
        out.push("        *self.msg_stack.last().expect(\"message stack is empty\")".to_string());
        out.push("    }".to_string());
        out.push("}".to_string());
        out.push(String::new());

        out.push("fn die(event: &str, location: usize) -> ! {".to_string());
        out.push("    eprintln!(\"State {} does not allow {}\", location, event);".to_string());
        out.push("    std::process::exit(1);".to_string());
        out.push("}".to_string());
        out.push(String::new());
        out.push("fn die_key(map: &str, key: &[u8]) -> ! {".to_string());
        out.push(
            "    eprintln!(\"Invalid key {} for {}\", String::from_utf8_lossy(key), map);"
                .to_string(),
        );
        out.push("    std::process::exit(1);".to_string());
        out.push("}".to_string());
        out.push(String::new());

        out.push(format!("impl rt::SaxHandler for {}Sax<'_> {{", p));
        self.null_impl(&mut out);
        self.pod_impl(&mut out, "boolean", "on_bool", "bool", &self.graph.bool_nodes, |_, _| {
            "v".to_string()
        });
        self.pod_impl(
            &mut out,
            "integer",
            "on_integer",
            "i64",
            &self.graph.long_nodes,
            |emitter, node| emitter.integer_value_expr(node),
        );
        self.pod_impl(
            &mut out,
            "double",
            "on_double",
            "f64",
            &self.graph.double_nodes,
            |emitter, node| emitter.double_value_expr(node),
        );
        self.string_impl(&mut out);
        self.map_start_impl(&mut out);
        self.map_key_impl(&mut out);
        self.map_end_impl(&mut out);
        self.array_start_impl(&mut out);
        self.array_end_impl(&mut out);
        out.push("}".to_string());
        out.push(String::new());
        out.join("\n")
    }

    fn field_of(&self, node: &Node) -> &crate::pool::FieldDescriptor {
        node.field
            .expect("dispatch node without a field back-reference")
            .get(self.pool)
    }

    fn owner_type(&self, node: &Node) -> String {
        self.rust_message_type(node.owner)
    }

    fn integer_value_expr(&self, node: &Node) -> String {
        let field = self.field_of(node);
        match node.kind {
            // widened: accept 0/1 where a bool is expected
            NodeKind::Bool => "v != 0".to_string(),
            // widened: accept integers where a float is expected
            NodeKind::Double => match field.field_type {
                FieldType::Scalar(ScalarType::Float) => "v as f32".to_string(),
                _ => "v as f64".to_string(),
            },
            NodeKind::Long => match field.field_type {
                FieldType::Enum(id) => {
                    format!("{}::from_i32(v as i32)", self.rust_enum_type(id))
                }
                FieldType::Scalar(scalar) => scalar_cast(scalar).to_string(),
                FieldType::Message(_) => unreachable!("message field in integer dispatch"),
            },
            _ => unreachable!("non-scalar node in integer dispatch"),
        }
    }

    fn double_value_expr(&self, node: &Node) -> String {
        match self.field_of(node).field_type {
            FieldType::Scalar(ScalarType::Float) => "v as f32".to_string(),
            _ => "v".to_string(),
        }
    }

    fn null_impl(&self, out: &mut Vec<String>) {
        out.push("    fn on_null(&mut self) -> bool {".to_string());
        out.push("        match self.location {".to_string());
        for &state in &self.graph.nullable_nodes {
            let node = self.graph.node(state);
            let parent = node.parent.expect("nullable node without parent");
            out.push(format!("            {} => {{ // key {}", node.state, node.full_name));
            out.push(format!(
                "                let msg = unsafe {{ &mut *(self.top() as *mut {}) }};",
                self.owner_type(node)
            ));
            out.push(format!("                msg.clear_{}();", node.name));
            out.push(format!("                self.location = {};", parent));
            out.push("            }".to_string());
        }
        out.push("            _ => die(\"null\", self.location),".to_string());
        out.push("        }".to_string());
        out.push("        true".to_string());
        out.push("    }".to_string());
        out.push(String::new());
    }

    fn pod_impl(
        &self,
        out: &mut Vec<String>,
        event: &str,
        method: &str,
        value_type: &str,
        nodes: &[StateId],
        value_expr: impl Fn(&Emitter<'p>, &Node) -> String,
    ) {
        out.push(format!(
            "    fn {}(&mut self, v: {}) -> bool {{",
            method, value_type
        ));
        out.push("        match self.location {".to_string());
        for &state in nodes {
            let node = self.graph.node(state);
            let field = self.field_of(node);
            let parent = node.parent.expect("scalar node without parent");
            let verb = if field.is_repeated() { "add" } else { "set" };
            out.push(format!("            {} => {{ // key {}", node.state, node.full_name));
            out.push(format!(
                "                let msg = unsafe {{ &mut *(self.top() as *mut {}) }};",
                self.owner_type(node)
            ));
            out.push(format!(
                "                msg.{}_{}({});",
                verb,
                node.name,
                value_expr(self, node)
            ));
            if !field.is_repeated() {
                // for array elements the closing bracket restores the state
                out.push(format!("                self.location = {};", parent));
            }
            out.push("            }".to_string());
        }
        out.push(format!("            _ => die(\"{}\", self.location),", event));
        out.push("        }".to_string());
        out.push("        true".to_string());
        out.push("    }".to_string());
        out.push(String::new());
    }

    fn string_impl(&self, out: &mut Vec<String>) {
        out.push("    fn on_string(&mut self, v: &[u8]) -> bool {".to_string());
        out.push("        let target: &mut String = match self.location {".to_string());
        for &state in &self.graph.string_nodes {
            let node = self.graph.node(state);
            let field = self.field_of(node);
            let parent = node.parent.expect("string node without parent");
            let verb = if field.is_repeated() { "add" } else { "mut" };
            out.push(format!("            {} => {{ // key {}", node.state, node.full_name));
            out.push(format!(
                "                let msg = unsafe {{ &mut *(self.top() as *mut {}) }};",
                self.owner_type(node)
            ));
            if !field.is_repeated() {
                out.push(format!("                self.location = {};", parent));
            }
            out.push(format!("                msg.{}_{}()", verb, node.name));
            out.push("            }".to_string());
        }
        out.push("            _ => die(\"string\", self.location),".to_string());
        out.push("        };".to_string());
        out.push("        target.clear();".to_string());
        out.push("        target.push_str(&String::from_utf8_lossy(v));".to_string());
        out.push("        true".to_string());
        out.push("    }".to_string());
        out.push(String::new());
    }

    fn map_start_impl(&self, out: &mut Vec<String>) {
        out.push("    fn on_map_start(&mut self) -> bool {".to_string());
        out.push("        match self.location {".to_string());
        for &state in &self.graph.message_start_nodes {
            let node = self.graph.node(state);
            match node.parent {
                None => {
                    out.push("            0 => { // map .".to_string());
                    out.push(
                        "                debug_assert!(self.msg_stack.is_empty());".to_string(),
                    );
                    out.push(format!(
                        "                let root: *mut {} = self.req;",
                        self.root_type()
                    ));
                    out.push("                self.msg_stack.push(root as *mut ());".to_string());
                    out.push(format!("                self.location = {};", node.state));
                    out.push("            }".to_string());
                }
                Some(parent) => {
                    let field = self.field_of(node);
                    let verb = if field.is_repeated() { "add" } else { "mut" };
                    let inner =
                        self.rust_message_type(self.graph.inside_message_type(self.pool, node));
                    out.push(format!("            {} => {{ // map {}", parent, node.full_name));
                    out.push(format!(
                        "                let msg = unsafe {{ &mut *(self.top() as *mut {}) }};",
                        self.owner_type(node)
                    ));
                    out.push(format!(
                        "                let child: *mut {} = msg.{}_{}();",
                        inner, verb, node.name
                    ));
                    out.push("                self.msg_stack.push(child as *mut ());".to_string());
                    out.push(format!("                self.location = {};", node.state));
                    out.push("            }".to_string());
                }
            }
        }
        out.push("            _ => die(\"object\", self.location),".to_string());
        out.push("        }".to_string());
        out.push("        true".to_string());
        out.push("    }".to_string());
        out.push(String::new());
    }

    fn map_key_impl(&self, out: &mut Vec<String>) {
        out.push("    fn on_map_key(&mut self, key: &[u8]) -> bool {".to_string());
        out.push("        let hash = rt::key_hash(key);".to_string());
        out.push("        match self.location {".to_string());
        for &state in &self.graph.message_start_nodes {
            let node = self.graph.node(state);
            out.push(format!(
                "            {} => match hash {{ // map {}",
                node.state, node.full_name
            ));
            for &child_state in &node.children {
                let child = self.graph.node(child_state);
                out.push(format!(
                    "                0x{:016x}u64 => self.location = {}, // {}",
                    key_hash(child.name.as_bytes()),
                    child.state,
                    child.name
                ));
            }
            out.push(format!(
                "                _ => die_key(\"{}\", key),",
                node.full_name
            ));
            out.push("            },".to_string());
        }
        out.push("            _ => die(\"key\", self.location),".to_string());
        out.push("        }".to_string());
        out.push("        true".to_string());
        out.push("    }".to_string());
        out.push(String::new());
    }

    fn map_end_impl(&self, out: &mut Vec<String>) {
        out.push("    fn on_map_end(&mut self) -> bool {".to_string());
        out.push("        match self.location {".to_string());
        for &state in &self.graph.message_start_nodes {
            let node = self.graph.node(state);
            let inside = self.rust_message_type(self.graph.inside_message_type(self.pool, node));
            out.push(format!("            {} => {{ // map {}", node.state, node.full_name));
            out.push("                if self.config.check_initialized {".to_string());
            out.push(format!(
                "                    let msg = unsafe {{ &mut *(self.top() as *mut {}) }};",
                inside
            ));
            out.push("                    msg.check_initialized();".to_string());
            out.push("                }".to_string());
            match node.parent {
                None => {
                    out.push("                self.location = 0;".to_string());
                    out.push("                self.msg_stack.pop();".to_string());
                    out.push(
                        "                debug_assert!(self.msg_stack.is_empty());".to_string(),
                    );
                }
                Some(parent) => {
                    // Re-enter the array element state when this object is an
                    // array element; otherwise return to the enclosing map.
                    let grandparent = self
                        .graph
                        .node(parent)
                        .parent
                        .expect("key node without parent");
                    let ret = if self.graph.node(grandparent).kind == NodeKind::Array {
                        parent
                    } else {
                        grandparent
                    };
                    out.push(format!("                self.location = {};", ret));
                    out.push("                self.msg_stack.pop();".to_string());
                }
            }
            out.push("            }".to_string());
        }
        out.push("            _ => die(\"closing object\", self.location),".to_string());
        out.push("        }".to_string());
        out.push("        true".to_string());
        out.push("    }".to_string());
        out.push(String::new());
    }

    fn array_start_impl(&self, out: &mut Vec<String>) {
        out.push("    fn on_array_start(&mut self) -> bool {".to_string());
        out.push("        match self.location {".to_string());
        for &state in &self.graph.array_nodes {
            let node = self.graph.node(state);
            let element = node.children[0];
            out.push(format!(
                "            {} => self.location = {}, // key {}",
                node.state, element, node.full_name
            ));
        }
        out.push("            _ => die(\"array\", self.location),".to_string());
        out.push("        }".to_string());
        out.push("        true".to_string());
        out.push("    }".to_string());
        out.push(String::new());
    }

    fn array_end_impl(&self, out: &mut Vec<String>) {
        out.push("    fn on_array_end(&mut self) -> bool {".to_string());
        out.push("        match self.location {".to_string());
        for &state in &self.graph.array_nodes {
            let node = self.graph.node(state);
            let element = node.children[0];
            let parent = node.parent.expect("array node without parent");
            out.push(format!(
                "            {} => self.location = {}, // key {}",
                element, parent, node.full_name
            ));
        }
        out.push("            _ => die(\"closing array\", self.location),".to_string());
        out.push("        }".to_string());
        out.push("        true".to_string());
        out.push("    }".to_string());
        out.push(String::new());
    }
}

fn scalar_cast(scalar: ScalarType) -> &'static str {
    use ScalarType::*;
    match scalar {
        Int32 | Sint32 | Sfixed32 => "v as i32",
        Int64 | Sint64 | Sfixed64 => "v",
        Uint32 | Fixed32 => "v as u32",
        Fixed64 => "v as u64",
        _ => unreachable!("non-integer scalar in integer dispatch"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_schema;
    use crate::tokenizer::tokenize_schema;

    fn emit(text: &str, message: &str) -> EmittedParser {
        let tokens = tokenize_schema(text).unwrap();
        let ast = parse_schema(&tokens).unwrap();
        let mut pool = DescriptorPool::new();
        pool.add_file("test.proto", &ast).unwrap();
        let root = pool.find_message(message).expect("root message not found");
        let graph = ParseGraph::build(&pool, root).unwrap();
        generate_parser(&pool, &graph, "crate::pb").unwrap()
    }

    #[test]
    fn test_artifact_names() {
        let emitted = emit("message Point { int32 x = 1; }", "Point");
        assert_eq!(emitted.api_file_name, "point_parser.pb.rs");
        assert_eq!(emitted.sax_file_name, "point_parser_sax.pb.rs");
        assert!(emitted
            .api_source
            .contains("include!(\"point_parser_sax.pb.rs\");"));
    }

    #[test]
    fn test_namespace_wrapping() {
        let emitted = emit("package some.ns; message Point { int32 x = 1; }", "some.ns.Point");
        assert!(emitted.api_source.contains("pub mod some {"));
        assert!(emitted.api_source.contains("pub mod ns {"));
        assert!(emitted.api_source.contains("} // mod ns"));
        assert!(emitted.api_source.contains("} // mod some"));
    }

    #[test]
    fn test_no_namespace_without_package() {
        let emitted = emit("message Point { int32 x = 1; }", "Point");
        assert!(!emitted.api_source.contains("pub mod"));
    }

    #[test]
    fn test_messages_path_alias() {
        let emitted = emit("message Point { int32 x = 1; }", "Point");
        assert!(emitted.api_source.contains("use crate::pb as pb;"));
        assert!(emitted.api_source.contains("pb::Point::default()"));
    }

    #[test]
    fn test_nested_type_naming() {
        let emitted = emit(
            "package p; message Outer { message Inner { bool ok = 1; } Inner i = 1; }",
            "p.Outer",
        );
        assert!(emitted.sax_source.contains("*mut pb::Outer_Inner"));
    }

    #[test]
    fn test_key_hash_constants_match_runtime() {
        let emitted = emit("message Point { int32 x = 1; int32 y = 2; }", "Point");
        let expected = format!("0x{:016x}u64", key_hash(b"x"));
        assert!(emitted.sax_source.contains(&expected));
    }

    #[test]
    fn test_collision_detector_fires() {
        let err = check_distinct_hashes(".", &["alpha", "beta"], |_| 7).unwrap_err();
        match err {
            GenError::KeyHashCollision { parent_path, key_a, key_b } => {
                assert_eq!(parent_path, ".");
                assert_eq!(key_a, "alpha");
                assert_eq!(key_b, "beta");
            }
            other => panic!("expected KeyHashCollision, got {:?}", other),
        }
    }

    #[test]
    fn test_collision_detector_passes_distinct() {
        check_distinct_hashes(".", &["alpha", "beta"], key_hash).unwrap();
    }

    #[test]
    fn test_write_to_missing_dir_fails() {
        let emitted = emit("message Point { int32 x = 1; }", "Point");
        let err = emitted
            .write_to(Path::new("/no/such/directory/anywhere"))
            .unwrap_err();
        assert!(matches!(err, GenError::EmitIo { .. }));
    }
}

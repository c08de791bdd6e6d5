//! The parse graph: a state-numbered tree describing the JSON shape of a
//! root message. Each node is one automaton state; the emitter turns the
//! category indexes into per-event dispatch tables.

use log::{debug, trace};

use crate::{
    error::GenError,
    pool::{DescriptorPool, FieldDescriptor, FieldType, MessageId, ScalarType},
};

/// State number of a node. `0` is reserved for "before any input"; real
/// nodes are numbered densely from `1`.
pub type StateId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Bool,
    Long,
    Double,
    String,
    /// At the field key whose value is a nested message.
    KeyIntoMessage,
    /// Inside the braces of a message.
    InsideMessage,
    /// At the field key whose value is a JSON array.
    Array,
}

/// Back-reference from a node to the schema field it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef {
    pub message: MessageId,
    pub index:   usize,
}

impl FieldRef {
    pub fn get<'p>(&self, pool: &'p DescriptorPool) -> &'p FieldDescriptor {
        &pool.message(self.message).fields[self.index]
    }
}

#[derive(Debug)]
pub struct Node {
    pub state:     StateId,
    pub kind:      NodeKind,
    pub name:      String,
    /// Dotted path from the root; diagnostic only.
    pub full_name: String,
    /// Human-readable type name; diagnostic only.
    pub type_name: String,
    pub field:     Option<FieldRef>,
    /// The message declaring the field (the root message at the root).
    pub owner:     MessageId,
    pub parent:    Option<StateId>,
    pub children:  Vec<StateId>,
}

#[derive(Debug)]
pub struct ParseGraph {
    pub root_message: MessageId,
    nodes: Vec<Node>,

    // Category indexes, in pre-order. A node may appear in several lists:
    // Bool and Double nodes are also indexed into `long_nodes` so JSON
    // integers are accepted where the schema allows the widening.
    pub nullable_nodes:      Vec<StateId>,
    pub bool_nodes:          Vec<StateId>,
    pub long_nodes:          Vec<StateId>,
    pub double_nodes:        Vec<StateId>,
    pub string_nodes:        Vec<StateId>,
    pub message_start_nodes: Vec<StateId>,
    pub key_nodes:           Vec<StateId>,
    pub array_nodes:         Vec<StateId>,
}

impl ParseGraph {
    /// Build the graph for `root`. The returned graph is never mutated.
    pub fn build(pool: &DescriptorPool, root: MessageId) -> Result<ParseGraph, GenError> {
        let mut builder = Builder {
            pool,
            graph: ParseGraph {
                root_message: root,
                nodes: Vec::new(),
                nullable_nodes: Vec::new(),
                bool_nodes: Vec::new(),
                long_nodes: Vec::new(),
                double_nodes: Vec::new(),
                string_nodes: Vec::new(),
                message_start_nodes: Vec::new(),
                key_nodes: Vec::new(),
                array_nodes: Vec::new(),
            },
            in_progress: Vec::new(),
        };

        let root_desc = pool.message(root);
        let root_state = builder.alloc(Node {
            state: 0, // assigned by alloc
            kind: NodeKind::InsideMessage,
            name: ".".to_string(),
            full_name: ".".to_string(),
            type_name: root_desc.name.clone(),
            field: None,
            owner: root,
            parent: None,
            children: Vec::new(),
        });
        builder.index_node(root_state);
        builder.walk_message(root, root_state)?;

        debug!(
            "parse graph for {}: {} states",
            root_desc.full_name,
            builder.graph.nodes.len()
        );
        Ok(builder.graph)
    }

    pub fn node(&self, state: StateId) -> &Node {
        &self.nodes[state - 1]
    }

    pub fn root(&self) -> &Node {
        self.node(1)
    }

    /// Total number of states (states are dense in `1..=total`).
    pub fn total_states(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// The message type whose braces an `InsideMessage` node sits inside.
    pub fn inside_message_type(&self, pool: &DescriptorPool, node: &Node) -> MessageId {
        debug_assert_eq!(node.kind, NodeKind::InsideMessage);
        match node.field {
            None => self.root_message,
            Some(field_ref) => match field_ref.get(pool).field_type {
                FieldType::Message(id) => id,
                _ => unreachable!("InsideMessage node without a message-typed field"),
            },
        }
    }

    /// Render the decorated tree, one node per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_rec(1, 0, &mut out);
        out
    }

    fn dump_rec(&self, state: StateId, depth: usize, out: &mut String) {
        let node = self.node(state);
        out.push_str(&format!(
            "{}{} (type={}, kind={:?}, state={})\n",
            "  ".repeat(depth),
            node.full_name,
            node.type_name,
            node.kind,
            node.state
        ));
        for &child in &node.children {
            self.dump_rec(child, depth + 1, out);
        }
    }
}

/// Map a scalar wire type onto a node kind. `uint64` and `bytes` are the
/// enumerated unsupported set and fail generation.
fn kind_of_scalar(scalar: ScalarType, field_path: &str) -> Result<NodeKind, GenError> {
    use ScalarType::*;
    Ok(match scalar {
        Bool => NodeKind::Bool,
        Int32 | Int64 | Uint32 | Sint32 | Sint64 | Fixed32 | Fixed64 | Sfixed32 | Sfixed64 => {
            NodeKind::Long
        }
        Float | Double => NodeKind::Double,
        String => NodeKind::String,
        Uint64 | Bytes => {
            return Err(GenError::UnsupportedType {
                field_path: field_path.to_string(),
                type_tag:   scalar.proto_name().to_string(),
            })
        }
    })
}

struct Builder<'p> {
    pool:        &'p DescriptorPool,
    graph:       ParseGraph,
    in_progress: Vec<MessageId>,
}

impl<'p> Builder<'p> {
    /// Push a node, assigning the next state number. Returns the state.
    fn alloc(&mut self, mut node: Node) -> StateId {
        let state = self.graph.nodes.len() + 1;
        node.state = state;
        if let Some(parent) = node.parent {
            self.graph.nodes[parent - 1].children.push(state);
        }
        trace!("state {} <- {}", state, node.full_name);
        self.graph.nodes.push(node);
        state
    }

    /// Index a node into its category lists (and `nullable_nodes` when the
    /// originating field is optional).
    fn index_node(&mut self, state: StateId) {
        let node = &self.graph.nodes[state - 1];
        if let Some(field_ref) = node.field {
            if field_ref.get(self.pool).is_optional() {
                self.graph.nullable_nodes.push(state);
            }
        }
        match node.kind {
            NodeKind::Bool => {
                self.graph.bool_nodes.push(state);
                // accept 0/1 integers as booleans
                self.graph.long_nodes.push(state);
            }
            NodeKind::Long => self.graph.long_nodes.push(state),
            NodeKind::Double => {
                self.graph.double_nodes.push(state);
                // accept integers where a float is expected
                self.graph.long_nodes.push(state);
            }
            NodeKind::String => self.graph.string_nodes.push(state),
            NodeKind::InsideMessage => self.graph.message_start_nodes.push(state),
            NodeKind::KeyIntoMessage => self.graph.key_nodes.push(state),
            NodeKind::Array => self.graph.array_nodes.push(state),
        }
    }

    fn walk_message(&mut self, msg_id: MessageId, node_state: StateId) -> Result<(), GenError> {
        if self.in_progress.contains(&msg_id) {
            return Err(GenError::RecursiveMessage {
                path: self.pool.message(msg_id).full_name.clone(),
            });
        }
        self.in_progress.push(msg_id);

        let field_count = self.pool.message(msg_id).fields.len();
        for index in 0..field_count {
            self.walk_field(msg_id, index, node_state)?;
        }

        self.in_progress.pop();
        Ok(())
    }

    fn walk_field(
        &mut self,
        msg_id: MessageId,
        index: usize,
        parent_state: StateId,
    ) -> Result<(), GenError> {
        let field = &self.pool.message(msg_id).fields[index];
        let field_name = field.name.clone();
        let repeated = field.is_repeated();
        let parent_full = self.graph.nodes[parent_state - 1].full_name.clone();
        let field_path = format!("{}{}", parent_full, field_name);

        let (kind, type_name, message_type) = match field.field_type {
            FieldType::Scalar(scalar) => {
                (kind_of_scalar(scalar, &field_path)?, scalar.proto_name().to_string(), None)
            }
            FieldType::Enum(id) => {
                (NodeKind::Long, self.pool.enum_type(id).name.clone(), None)
            }
            FieldType::Message(id) => (
                NodeKind::KeyIntoMessage,
                self.pool.message(id).name.clone(),
                Some(id),
            ),
        };
        let field_ref = FieldRef { message: msg_id, index };

        if !repeated {
            let child = self.alloc(Node {
                state: 0,
                kind,
                name: field_name,
                full_name: field_path,
                type_name,
                field: Some(field_ref),
                owner: msg_id,
                parent: Some(parent_state),
                children: Vec::new(),
            });
            self.index_node(child);
            if let Some(inner_msg) = message_type {
                let inside = self.inject_object_node(child, field_ref);
                self.walk_message(inner_msg, inside)?;
            }
        } else {
            let array = self.alloc(Node {
                state: 0,
                kind: NodeKind::Array,
                name: field_name.clone(),
                full_name: format!("{}[]", parent_full),
                type_name: format!("[{}]", type_name),
                field: Some(field_ref),
                owner: msg_id,
                parent: Some(parent_state),
                children: Vec::new(),
            });
            self.index_node(array);

            // The element node exists so that, once an element is committed,
            // the automaton returns here and stays ready for the next one.
            let element = self.alloc(Node {
                state: 0,
                kind,
                name: field_name,
                full_name: field_path,
                type_name,
                field: Some(field_ref),
                owner: msg_id,
                parent: Some(array),
                children: Vec::new(),
            });
            self.index_node(element);
            if let Some(inner_msg) = message_type {
                let inside = self.inject_object_node(element, field_ref);
                self.walk_message(inner_msg, inside)?;
            }
        }
        Ok(())
    }

    /// Add the `InsideMessage` node beneath a `KeyIntoMessage` key node.
    fn inject_object_node(&mut self, key_state: StateId, field_ref: FieldRef) -> StateId {
        let key = &self.graph.nodes[key_state - 1];
        let node = Node {
            state: 0,
            kind: NodeKind::InsideMessage,
            name: key.name.clone(),
            full_name: format!("{}.", key.full_name),
            type_name: key.type_name.clone(),
            field: Some(field_ref),
            owner: key.owner,
            parent: Some(key_state),
            children: Vec::new(),
        };
        let state = self.alloc(node);
        self.index_node(state);
        state
    }
}

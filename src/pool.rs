//! Descriptor pool: resolved message/enum descriptors built from the AST.
//!
//! Registration and resolution happen in two phases so that a field may
//! reference any type declared in the pool, regardless of declaration order.

use std::collections::HashMap;

use crate::{
    error::GenError,
    types::{AstDef, AstEnum, AstField, AstMessage, FieldLabel, SchemaAst},
    utils::quote,
};

pub type FileId = usize;
pub type MessageId = usize;
pub type EnumId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Float,
    Double,
    String,
    Bytes,
}

impl ScalarType {
    pub fn from_keyword(keyword: &str) -> Option<ScalarType> {
        use ScalarType::*;
        Some(match keyword {
            "bool" => Bool,
            "int32" => Int32,
            "int64" => Int64,
            "uint32" => Uint32,
            "uint64" => Uint64,
            "sint32" => Sint32,
            "sint64" => Sint64,
            "fixed32" => Fixed32,
            "fixed64" => Fixed64,
            "sfixed32" => Sfixed32,
            "sfixed64" => Sfixed64,
            "float" => Float,
            "double" => Double,
            "string" => String,
            "bytes" => Bytes,
            _ => return None,
        })
    }

    pub fn proto_name(&self) -> &'static str {
        use ScalarType::*;
        match self {
            Bool => "bool",
            Int32 => "int32",
            Int64 => "int64",
            Uint32 => "uint32",
            Uint64 => "uint64",
            Sint32 => "sint32",
            Sint64 => "sint64",
            Fixed32 => "fixed32",
            Fixed64 => "fixed64",
            Sfixed32 => "sfixed32",
            Sfixed64 => "sfixed64",
            Float => "float",
            Double => "double",
            String => "string",
            Bytes => "bytes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Scalar(ScalarType),
    Message(MessageId),
    Enum(EnumId),
}

#[derive(Debug)]
pub struct FieldDescriptor {
    pub name:       String,
    pub number:     i32,
    pub label:      FieldLabel,
    pub field_type: FieldType,
}

impl FieldDescriptor {
    pub fn is_repeated(&self) -> bool {
        self.label == FieldLabel::Repeated
    }

    pub fn is_optional(&self) -> bool {
        self.label == FieldLabel::Optional
    }
}

#[derive(Debug)]
pub struct MessageDescriptor {
    pub name:      String,
    pub full_name: String,
    pub fields:    Vec<FieldDescriptor>,
    pub file:      FileId,
}

#[derive(Debug)]
pub struct EnumDescriptor {
    pub name:      String,
    pub full_name: String,
    pub values:    Vec<(String, i32)>,
    pub file:      FileId,
}

#[derive(Debug)]
pub struct FileDescriptor {
    /// Synthetic name, unique within the pool.
    pub name:     String,
    pub package:  Option<String>,
    pub messages: Vec<MessageId>,
    pub enums:    Vec<EnumId>,
}

#[derive(Debug, Clone, Copy)]
enum Symbol {
    Message(MessageId),
    Enum(EnumId),
}

#[derive(Debug, Default)]
pub struct DescriptorPool {
    files:    Vec<FileDescriptor>,
    messages: Vec<MessageDescriptor>,
    enums:    Vec<EnumDescriptor>,
    symbols:  HashMap<String, Symbol>,
}

impl DescriptorPool {
    pub fn new() -> DescriptorPool {
        DescriptorPool::default()
    }

    pub fn file(&self, id: FileId) -> &FileDescriptor {
        &self.files[id]
    }

    pub fn message(&self, id: MessageId) -> &MessageDescriptor {
        &self.messages[id]
    }

    pub fn enum_type(&self, id: EnumId) -> &EnumDescriptor {
        &self.enums[id]
    }

    /// Resolve a fully-qualified message name (a leading `.` is accepted).
    pub fn find_message(&self, full_name: &str) -> Option<MessageId> {
        let name = full_name.strip_prefix('.').unwrap_or(full_name);
        match self.symbols.get(name) {
            Some(Symbol::Message(id)) => Some(*id),
            _ => None,
        }
    }

    /// Register and resolve one parsed file. `name` is usually the file
    /// path; it is made unique within the pool by suffixing `#2`, `#3`, ….
    pub fn add_file(&mut self, name: &str, ast: &SchemaAst) -> Result<FileId, GenError> {
        let file_id = self.files.len();
        self.files.push(FileDescriptor {
            name: self.unique_file_name(name),
            package: ast.package.clone(),
            messages: Vec::new(),
            enums: Vec::new(),
        });

        // Phase one: register every symbol under its full name.
        let scope: Vec<String> = ast.package.iter().flat_map(|p| p.split('.')).map(str::to_string).collect();
        let mut pending: Vec<(MessageId, &AstMessage, Vec<String>)> = Vec::new();
        for def in &ast.definitions {
            self.register_def(file_id, def, &scope, &mut pending)?;
        }

        // Phase two: resolve field types now that all symbols are known.
        for (msg_id, ast_msg, msg_scope) in pending {
            let mut fields = Vec::with_capacity(ast_msg.fields.len());
            let mut numbers: Vec<i32> = Vec::new();
            for field in &ast_msg.fields {
                if fields.iter().any(|f: &FieldDescriptor| f.name == field.name) {
                    return Err(GenError::build(
                        &format!("The field {} is defined twice", quote(&field.name)),
                        field.line,
                        field.column,
                    ));
                }
                if field.number <= 0 {
                    return Err(GenError::build(
                        &format!("The number for field {} must be positive", quote(&field.name)),
                        field.line,
                        field.column,
                    ));
                }
                if numbers.contains(&field.number) {
                    return Err(GenError::build(
                        &format!("The number for field {} is used twice", quote(&field.name)),
                        field.line,
                        field.column,
                    ));
                }
                numbers.push(field.number);

                let field_type = self.resolve_type(&field.type_name, &msg_scope, field)?;
                fields.push(FieldDescriptor {
                    name: field.name.clone(),
                    number: field.number,
                    label: field.label,
                    field_type,
                });
            }
            self.messages[msg_id].fields = fields;
        }

        Ok(file_id)
    }

    fn unique_file_name(&self, name: &str) -> String {
        if !self.files.iter().any(|f| f.name == name) {
            return name.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}#{}", name, n);
            if !self.files.iter().any(|f| f.name == candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn register_def<'a>(
        &mut self,
        file_id: FileId,
        def: &'a AstDef,
        scope: &[String],
        pending: &mut Vec<(MessageId, &'a AstMessage, Vec<String>)>,
    ) -> Result<(), GenError> {
        match def {
            AstDef::Message(msg) => self.register_message(file_id, msg, scope, pending),
            AstDef::Enum(en) => self.register_enum(file_id, en, scope),
        }
    }

    fn register_message<'a>(
        &mut self,
        file_id: FileId,
        msg: &'a AstMessage,
        scope: &[String],
        pending: &mut Vec<(MessageId, &'a AstMessage, Vec<String>)>,
    ) -> Result<(), GenError> {
        let full_name = join_scope(scope, &msg.name);
        self.check_fresh_symbol(&full_name, msg.line, msg.column)?;

        let msg_id = self.messages.len();
        self.messages.push(MessageDescriptor {
            name: msg.name.clone(),
            full_name: full_name.clone(),
            fields: Vec::new(),
            file: file_id,
        });
        self.symbols.insert(full_name, Symbol::Message(msg_id));
        self.files[file_id].messages.push(msg_id);

        let mut inner_scope = scope.to_vec();
        inner_scope.push(msg.name.clone());
        pending.push((msg_id, msg, inner_scope.clone()));

        for nested in &msg.nested {
            self.register_def(file_id, nested, &inner_scope, pending)?;
        }
        Ok(())
    }

    fn register_enum(
        &mut self,
        file_id: FileId,
        en: &AstEnum,
        scope: &[String],
    ) -> Result<(), GenError> {
        let full_name = join_scope(scope, &en.name);
        self.check_fresh_symbol(&full_name, en.line, en.column)?;

        let mut values = Vec::with_capacity(en.values.len());
        for value in &en.values {
            if values.iter().any(|(n, _)| n == &value.name) {
                return Err(GenError::build(
                    &format!("The enum value {} is defined twice", quote(&value.name)),
                    value.line,
                    value.column,
                ));
            }
            values.push((value.name.clone(), value.number));
        }

        let enum_id = self.enums.len();
        self.enums.push(EnumDescriptor {
            name: en.name.clone(),
            full_name: full_name.clone(),
            values,
            file: file_id,
        });
        self.symbols.insert(full_name, Symbol::Enum(enum_id));
        self.files[file_id].enums.push(enum_id);
        Ok(())
    }

    fn check_fresh_symbol(&self, full_name: &str, line: usize, column: usize) -> Result<(), GenError> {
        if self.symbols.contains_key(full_name) {
            return Err(GenError::build(
                &format!("The type {} is defined twice", quote(full_name)),
                line,
                column,
            ));
        }
        Ok(())
    }

    /// Resolve a field's type name. Scalar keywords win; otherwise the name
    /// is looked up innermost scope outward, with a leading `.` forcing an
    /// absolute lookup.
    fn resolve_type(
        &self,
        type_name: &str,
        scope: &[String],
        field: &AstField,
    ) -> Result<FieldType, GenError> {
        if let Some(scalar) = ScalarType::from_keyword(type_name) {
            return Ok(FieldType::Scalar(scalar));
        }

        if let Some(absolute) = type_name.strip_prefix('.') {
            if let Some(symbol) = self.symbols.get(absolute) {
                return Ok(symbol_to_field_type(*symbol));
            }
        } else {
            for depth in (0..=scope.len()).rev() {
                let candidate = join_scope(&scope[..depth], type_name);
                if let Some(symbol) = self.symbols.get(&candidate) {
                    return Ok(symbol_to_field_type(*symbol));
                }
            }
        }

        Err(GenError::build(
            &format!(
                "The type {} is not defined for field {}",
                quote(type_name),
                quote(&field.name)
            ),
            field.line,
            field.column,
        ))
    }
}

fn symbol_to_field_type(symbol: Symbol) -> FieldType {
    match symbol {
        Symbol::Message(id) => FieldType::Message(id),
        Symbol::Enum(id) => FieldType::Enum(id),
    }
}

fn join_scope(scope: &[String], name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope.join("."), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_schema;
    use crate::tokenizer::tokenize_schema;

    fn build(text: &str) -> Result<DescriptorPool, GenError> {
        let tokens = tokenize_schema(text)?;
        let ast = parse_schema(&tokens)?;
        let mut pool = DescriptorPool::new();
        pool.add_file("test.proto", &ast)?;
        Ok(pool)
    }

    #[test]
    fn test_register_and_find() {
        let pool = build("package some.ns; message Point { int32 x = 1; }").unwrap();
        let id = pool.find_message("some.ns.Point").expect("Point not found");
        let msg = pool.message(id);
        assert_eq!(msg.name, "Point");
        assert_eq!(msg.full_name, "some.ns.Point");
        assert_eq!(msg.fields.len(), 1);
        assert_eq!(msg.fields[0].field_type, FieldType::Scalar(ScalarType::Int32));
        assert!(pool.find_message("Point").is_none());
        assert!(pool.find_message(".some.ns.Point").is_some());
    }

    #[test]
    fn test_message_reference_resolution() {
        let pool = build(
            "message Point { int32 x = 1; } message Outer { string name = 1; Point p = 2; }",
        )
        .unwrap();
        let outer = pool.message(pool.find_message("Outer").unwrap());
        let point_id = pool.find_message("Point").unwrap();
        assert_eq!(outer.fields[1].field_type, FieldType::Message(point_id));
    }

    #[test]
    fn test_nested_scope_resolution() {
        let pool = build(
            "package p; message Outer { message Inner { bool ok = 1; } Inner i = 1; }",
        )
        .unwrap();
        let outer = pool.message(pool.find_message("p.Outer").unwrap());
        let inner_id = pool.find_message("p.Outer.Inner").unwrap();
        assert_eq!(outer.fields[0].field_type, FieldType::Message(inner_id));
    }

    #[test]
    fn test_nested_enum_resolution() {
        let pool = build("message E { enum K { A = 0; B = 1; } K k = 1; }").unwrap();
        let e = pool.message(pool.find_message("E").unwrap());
        match e.fields[0].field_type {
            FieldType::Enum(id) => {
                let en = pool.enum_type(id);
                assert_eq!(en.full_name, "E.K");
                assert_eq!(en.values, vec![("A".to_string(), 0), ("B".to_string(), 1)]);
            }
            other => panic!("expected enum type, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_symbol() {
        let err = build("message A { } message A { }").unwrap_err();
        assert!(err.to_string().contains("defined twice"));
    }

    #[test]
    fn test_duplicate_field_number() {
        let err = build("message A { int32 x = 1; int32 y = 1; }").unwrap_err();
        assert!(err.to_string().contains("used twice"));
    }

    #[test]
    fn test_non_positive_field_number() {
        let err = build("message A { int32 x = 0; }").unwrap_err();
        assert!(err.to_string().contains("must be positive"));
    }

    #[test]
    fn test_unresolved_type() {
        let err = build("message A { Missing m = 1; }").unwrap_err();
        assert!(err.to_string().contains("is not defined"));
    }

    #[test]
    fn test_unique_file_names() {
        let text = "message A { }";
        let tokens = tokenize_schema(text).unwrap();
        let ast = parse_schema(&tokens).unwrap();
        let text_b = "message B { }";
        let tokens_b = tokenize_schema(text_b).unwrap();
        let ast_b = parse_schema(&tokens_b).unwrap();

        let mut pool = DescriptorPool::new();
        let f1 = pool.add_file("x.proto", &ast).unwrap();
        let f2 = pool.add_file("x.proto", &ast_b).unwrap();
        assert_eq!(pool.file(f1).name, "x.proto");
        assert_eq!(pool.file(f2).name, "x.proto#2");
    }
}

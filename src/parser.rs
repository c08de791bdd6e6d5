use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::GenError,
    tokenizer::Token,
    types::{AstDef, AstEnum, AstEnumValue, AstField, AstMessage, FieldLabel, SchemaAst},
    utils::quote,
};

lazy_static! {
    static ref IDENTIFIER:       Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref EQUALS:           Regex = Regex::new(r"^=$").unwrap();
    static ref SEMICOLON:        Regex = Regex::new(r"^;$").unwrap();
    static ref INTEGER:          Regex = Regex::new(r"^-?\d+$").unwrap();
    static ref LEFT_BRACE:       Regex = Regex::new(r"^\{$").unwrap();
    static ref RIGHT_BRACE:      Regex = Regex::new(r"^\}$").unwrap();
    static ref DOT:              Regex = Regex::new(r"^\.$").unwrap();
    static ref STRING_LIT:       Regex = Regex::new(r#"^"[^"]*"$"#).unwrap();
    static ref SYNTAX_KEYWORD:   Regex = Regex::new(r"^syntax$").unwrap();
    static ref PACKAGE_KEYWORD:  Regex = Regex::new(r"^package$").unwrap();
    static ref MESSAGE_KEYWORD:  Regex = Regex::new(r"^message$").unwrap();
    static ref ENUM_KEYWORD:     Regex = Regex::new(r"^enum$").unwrap();
    static ref OPTIONAL_KEYWORD: Regex = Regex::new(r"^optional$").unwrap();
    static ref REQUIRED_KEYWORD: Regex = Regex::new(r"^required$").unwrap();
    static ref REPEATED_KEYWORD: Regex = Regex::new(r"^repeated$").unwrap();
    static ref EOF:              Regex = Regex::new(r"^$").unwrap();
}

fn current_token<'a>(tokens: &'a [Token], index: usize) -> &'a Token {
    tokens.get(index).expect("Unexpected end of tokens")
}

fn eat(tokens: &[Token], index: &mut usize, test: &Regex) -> bool {
    if test.is_match(&current_token(tokens, *index).text) {
        *index += 1;
        true
    } else {
        false
    }
}

fn expect(
    tokens: &[Token],
    index: &mut usize,
    test: &Regex,
    expected: &str,
) -> Result<(), GenError> {
    if !eat(tokens, index, test) {
        let tok = current_token(tokens, *index);
        return Err(GenError::parse(
            &format!("Expected {} but found {}", expected, quote(&tok.text)),
            tok.line,
            tok.column,
        ));
    }
    Ok(())
}

fn unexpected_token(tokens: &[Token], index: usize) -> GenError {
    let tok = current_token(tokens, index);
    GenError::parse(
        &format!("Unexpected token {}", quote(&tok.text)),
        tok.line,
        tok.column,
    )
}

fn parse_integer(tokens: &[Token], index: &mut usize) -> Result<i32, GenError> {
    let tok = current_token(tokens, *index);
    expect(tokens, index, &INTEGER, "integer")?;
    tok.text.parse::<i32>().map_err(|_| {
        GenError::parse(
            &format!("Invalid integer {}", quote(&tok.text)),
            tok.line,
            tok.column,
        )
    })
}

/// A possibly-dotted type reference: `Point`, `foo.bar.Baz`, `.pkg.Baz`.
fn parse_type_ref(tokens: &[Token], index: &mut usize) -> Result<String, GenError> {
    let mut name = String::new();
    if eat(tokens, index, &DOT) {
        name.push('.');
    }
    let first = current_token(tokens, *index);
    expect(tokens, index, &IDENTIFIER, "identifier")?;
    name.push_str(&first.text);
    while eat(tokens, index, &DOT) {
        let seg = current_token(tokens, *index);
        expect(tokens, index, &IDENTIFIER, "identifier")?;
        name.push('.');
        name.push_str(&seg.text);
    }
    Ok(name)
}

/// Parse a token stream into a `SchemaAst`.
pub fn parse_schema(tokens: &[Token]) -> Result<SchemaAst, GenError> {
    let mut definitions = Vec::new();
    let mut syntax_text = None;
    let mut package_text = None;
    let mut index = 0;

    // Handle syntax declaration
    if eat(tokens, &mut index, &SYNTAX_KEYWORD) {
        expect(tokens, &mut index, &EQUALS, "\"=\"")?;
        let lit = current_token(tokens, index);
        expect(tokens, &mut index, &STRING_LIT, "string literal")?;
        syntax_text = Some(lit.text.trim_matches('"').to_string());
        expect(tokens, &mut index, &SEMICOLON, "\";\"")?;
    }

    // Handle package declaration
    if eat(tokens, &mut index, &PACKAGE_KEYWORD) {
        let pkg = parse_type_ref(tokens, &mut index)?;
        if pkg.starts_with('.') {
            let tok = current_token(tokens, index);
            return Err(GenError::parse(
                "Package name cannot start with \".\"",
                tok.line,
                tok.column,
            ));
        }
        package_text = Some(pkg);
        expect(tokens, &mut index, &SEMICOLON, "\";\"")?;
    }

    // Parse top-level definitions one by one
    while index < tokens.len() && !eat(tokens, &mut index, &EOF) {
        definitions.push(parse_definition(tokens, &mut index)?);
    }

    Ok(SchemaAst {
        syntax: syntax_text,
        package: package_text,
        definitions,
    })
}

fn parse_definition(tokens: &[Token], index: &mut usize) -> Result<AstDef, GenError> {
    if eat(tokens, index, &MESSAGE_KEYWORD) {
        Ok(AstDef::Message(parse_message(tokens, index)?))
    } else if eat(tokens, index, &ENUM_KEYWORD) {
        Ok(AstDef::Enum(parse_enum(tokens, index)?))
    } else {
        Err(unexpected_token(tokens, *index))
    }
}

/// Parse a message body; the `message` keyword has already been consumed.
fn parse_message(tokens: &[Token], index: &mut usize) -> Result<AstMessage, GenError> {
    let name_tok = current_token(tokens, *index);
    let (name, line, column) = (name_tok.text.clone(), name_tok.line, name_tok.column);
    expect(tokens, index, &IDENTIFIER, "identifier")?;
    expect(tokens, index, &LEFT_BRACE, "\"{\"")?;

    let mut fields = Vec::new();
    let mut nested = Vec::new();
    while !eat(tokens, index, &RIGHT_BRACE) {
        if eat(tokens, index, &MESSAGE_KEYWORD) {
            nested.push(AstDef::Message(parse_message(tokens, index)?));
        } else if eat(tokens, index, &ENUM_KEYWORD) {
            nested.push(AstDef::Enum(parse_enum(tokens, index)?));
        } else {
            fields.push(parse_field(tokens, index)?);
        }
    }

    Ok(AstMessage {
        name,
        line,
        column,
        fields,
        nested,
    })
}

fn parse_field(tokens: &[Token], index: &mut usize) -> Result<AstField, GenError> {
    let label = if eat(tokens, index, &OPTIONAL_KEYWORD) {
        FieldLabel::Optional
    } else if eat(tokens, index, &REQUIRED_KEYWORD) {
        FieldLabel::Required
    } else if eat(tokens, index, &REPEATED_KEYWORD) {
        FieldLabel::Repeated
    } else {
        FieldLabel::None
    };

    let type_name = parse_type_ref(tokens, index)?;

    let name_tok = current_token(tokens, *index);
    let (name, line, column) = (name_tok.text.clone(), name_tok.line, name_tok.column);
    expect(tokens, index, &IDENTIFIER, "identifier")?;

    expect(tokens, index, &EQUALS, "\"=\"")?;
    let number = parse_integer(tokens, index)?;
    expect(tokens, index, &SEMICOLON, "\";\"")?;

    Ok(AstField {
        name,
        line,
        column,
        label,
        type_name,
        number,
    })
}

/// Parse an enum body; the `enum` keyword has already been consumed.
fn parse_enum(tokens: &[Token], index: &mut usize) -> Result<AstEnum, GenError> {
    let name_tok = current_token(tokens, *index);
    let (name, line, column) = (name_tok.text.clone(), name_tok.line, name_tok.column);
    expect(tokens, index, &IDENTIFIER, "identifier")?;
    expect(tokens, index, &LEFT_BRACE, "\"{\"")?;

    let mut values = Vec::new();
    while !eat(tokens, index, &RIGHT_BRACE) {
        let value_tok = current_token(tokens, *index);
        let (value_name, value_line, value_column) =
            (value_tok.text.clone(), value_tok.line, value_tok.column);
        expect(tokens, index, &IDENTIFIER, "identifier")?;
        expect(tokens, index, &EQUALS, "\"=\"")?;
        let number = parse_integer(tokens, index)?;
        expect(tokens, index, &SEMICOLON, "\";\"")?;
        values.push(AstEnumValue {
            name: value_name,
            line: value_line,
            column: value_column,
            number,
        });
    }

    Ok(AstEnum {
        name,
        line,
        column,
        values,
    })
}

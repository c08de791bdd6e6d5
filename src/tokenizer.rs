use lazy_static::lazy_static;
use regex::Regex;

use crate::error::GenError;
use crate::utils::quote;

lazy_static! {
    pub static ref TOKEN_REGEX: Regex = Regex::new(
        r#"((?:-|\b)\d+\b|[=;{}.,\[\]]|"[^"\n]*"|\b[A-Za-z_][A-Za-z0-9_]*\b|//[^\n]*|/\*(?s:.*?)\*/|\s+)"#
    )
    .unwrap();
    pub static ref SKIP_REGEX: Regex = Regex::new(r"^(//.*|\s+)$").unwrap();
}

#[derive(Debug, PartialEq)]
pub struct Token {
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

/// Split proto IDL text into tokens, tracking line/column positions.
/// Comments and whitespace are dropped; a trailing empty token marks EOF.
pub fn tokenize_schema(text: &str) -> Result<Vec<Token>, GenError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;

    for mat in TOKEN_REGEX.find_iter(text) {
        let start = mat.start();
        let end = mat.end();
        let part = mat.as_str();

        if start > last_end {
            let unexpected = &text[last_end..start];
            return Err(GenError::parse(
                &format!("Syntax error {}", quote(unexpected)),
                line,
                column,
            ));
        }

        let is_comment = part.starts_with("//") || part.starts_with("/*");
        if !SKIP_REGEX.is_match(part) && !is_comment {
            tokens.push(Token {
                text: part.to_string(),
                line,
                column,
            });
        }

        // Update line and column
        let newline_count = part.matches('\n').count();
        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = last_line_part.len() + 1;
            }
        } else {
            column += part.len();
        }

        last_end = end;
    }

    if last_end != text.len() {
        let unexpected = &text[last_end..];
        return Err(GenError::parse(
            &format!("Syntax error {}", quote(unexpected)),
            line,
            column,
        ));
    }

    // Add end-of-file token
    tokens.push(Token {
        text: "".to_string(),
        line,
        column,
    });

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_field() {
        let input = "int32 x = 1;";
        let expected_tokens = vec![
            Token { text: "int32".to_string(), line: 1, column: 1 },
            Token { text: "x".to_string(), line: 1, column: 7 },
            Token { text: "=".to_string(), line: 1, column: 9 },
            Token { text: "1".to_string(), line: 1, column: 11 },
            Token { text: ";".to_string(), line: 1, column: 12 },
            Token { text: "".to_string(), line: 1, column: 13 }, // EOF token
        ];

        let tokens = tokenize_schema(input).expect("tokenize failed");
        assert_eq!(tokens, expected_tokens);
    }

    #[test]
    fn test_tokenize_dotted_name() {
        let input = "foo.bar.Baz";
        let tokens = tokenize_schema(input).expect("tokenize failed");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["foo", ".", "bar", ".", "Baz", ""]);
    }

    #[test]
    fn test_tokenize_string_literal() {
        let input = "syntax = \"proto3\";";
        let tokens = tokenize_schema(input).expect("tokenize failed");
        assert_eq!(tokens[2].text, "\"proto3\"");
        assert_eq!(tokens[2].column, 10);
    }

    #[test]
    fn test_tokenize_comments_skipped() {
        let input = "message A { // trailing\n/* block\ncomment */ bool b = 1; }";
        let tokens = tokenize_schema(input).expect("tokenize failed");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["message", "A", "{", "bool", "b", "=", "1", ";", "}", ""]
        );
        // `bool` sits after the block comment on line 3
        assert_eq!(tokens[3].line, 3);
    }

    #[test]
    fn test_tokenize_negative_enum_value() {
        let input = "UNKNOWN = -1;";
        let tokens = tokenize_schema(input).expect("tokenize failed");
        assert_eq!(tokens[2].text, "-1");
    }

    #[test]
    fn test_tokenize_unexpected_text() {
        let input = "int32 x = 1 @";
        let err = tokenize_schema(input).unwrap_err();
        assert!(err.to_string().contains("Syntax error"));
    }
}

//! MiniC Lexer
//!
//! Turns source text into a token stream for the parser. The token set covers
//! the whole MiniC surface: keywords, identifiers, integer literals (decimal,
//! hex and octal), the operator/punctuation set, with `//` and `/* */`
//! comments skipped. Each token remembers its source line for diagnostics.

use crate::compiler::error::CompilerError;

/// A MiniC token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // Keywords
    Int,
    Void,
    Return,
    If,
    Else,
    While,
    Break,
    Continue,

    Ident(String),
    IntConst(i32),

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Not,
    LAnd,
    LOr,
}

impl Token {
    /// Source spelling used in diagnostics.
    pub fn spelling(&self) -> String {
        match self {
            Token::Int => "int".to_string(),
            Token::Void => "void".to_string(),
            Token::Return => "return".to_string(),
            Token::If => "if".to_string(),
            Token::Else => "else".to_string(),
            Token::While => "while".to_string(),
            Token::Break => "break".to_string(),
            Token::Continue => "continue".to_string(),
            Token::Ident(name) => name.clone(),
            Token::IntConst(value) => value.to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::LBrace => "{".to_string(),
            Token::RBrace => "}".to_string(),
            Token::Comma => ",".to_string(),
            Token::Semicolon => ";".to_string(),
            Token::Plus => "+".to_string(),
            Token::Minus => "-".to_string(),
            Token::Star => "*".to_string(),
            Token::Slash => "/".to_string(),
            Token::Percent => "%".to_string(),
            Token::Assign => "=".to_string(),
            Token::Eq => "==".to_string(),
            Token::Ne => "!=".to_string(),
            Token::Lt => "<".to_string(),
            Token::Gt => ">".to_string(),
            Token::Le => "<=".to_string(),
            Token::Ge => ">=".to_string(),
            Token::Not => "!".to_string(),
            Token::LAnd => "&&".to_string(),
            Token::LOr => "||".to_string(),
        }
    }
}

/// A token plus the 1-based source line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken {
    pub token: Token,
    pub line: usize,
}

/// Tokenize `source` into a vector of spanned tokens.
///
/// # Errors
/// Returns [`CompilerError::LexError`] on an unknown character, a malformed
/// number, an unterminated block comment, or a stray `&`/`|`.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, CompilerError> {
    let mut tokens: Vec<SpannedToken> = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut pos: usize = 0;
    let mut line: usize = 1;

    while pos < chars.len() {
        let c = chars[pos];

        if c == '\n' {
            line += 1;
            pos += 1;
            continue;
        }
        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        // Line comment
        if c == '/' && chars.get(pos + 1) == Some(&'/') {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            continue;
        }

        // Block comment
        if c == '/' && chars.get(pos + 1) == Some(&'*') {
            let start_line = line;
            pos += 2;
            loop {
                if pos >= chars.len() {
                    return Err(CompilerError::LexError {
                        line: start_line,
                        message: "unterminated block comment".to_string(),
                    });
                }
                if chars[pos] == '\n' {
                    line += 1;
                }
                if chars[pos] == '*' && chars.get(pos + 1) == Some(&'/') {
                    pos += 2;
                    break;
                }
                pos += 1;
            }
            continue;
        }

        // Identifier or keyword
        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            let token = match word.as_str() {
                "int" => Token::Int,
                "void" => Token::Void,
                "return" => Token::Return,
                "if" => Token::If,
                "else" => Token::Else,
                "while" => Token::While,
                "break" => Token::Break,
                "continue" => Token::Continue,
                _ => Token::Ident(word),
            };
            tokens.push(SpannedToken { token, line });
            continue;
        }

        // Integer literal: decimal, 0x hex, or 0-prefixed octal
        if c.is_ascii_digit() {
            let start = pos;
            while pos < chars.len() && chars[pos].is_ascii_alphanumeric() {
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                i64::from_str_radix(hex, 16)
            } else if text.len() > 1 && text.starts_with('0') {
                i64::from_str_radix(&text[1..], 8)
            } else {
                text.parse::<i64>()
            };
            let value = parsed.map_err(|_| CompilerError::LexError {
                line,
                message: format!("malformed integer literal '{}'", text),
            })?;
            tokens.push(SpannedToken {
                token: Token::IntConst(value as i32),
                line,
            });
            continue;
        }

        // Operators and punctuation
        let two = chars.get(pos + 1).copied();
        let (token, width) = match (c, two) {
            ('=', Some('=')) => (Token::Eq, 2),
            ('!', Some('=')) => (Token::Ne, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('&', Some('&')) => (Token::LAnd, 2),
            ('|', Some('|')) => (Token::LOr, 2),
            ('=', _) => (Token::Assign, 1),
            ('!', _) => (Token::Not, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('{', _) => (Token::LBrace, 1),
            ('}', _) => (Token::RBrace, 1),
            (',', _) => (Token::Comma, 1),
            (';', _) => (Token::Semicolon, 1),
            _ => {
                return Err(CompilerError::LexError {
                    line,
                    message: format!("unexpected character '{}'", c),
                });
            }
        };
        tokens.push(SpannedToken { token, line });
        pos += width;
    }

    Ok(tokens)
}

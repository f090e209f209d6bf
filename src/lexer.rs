use logos::Logos;
use std::fmt;

use crate::Span;

/// Every non-whitespace character belongs to some token, so lexing never fails:
/// parentheses are always tokens of their own and any other run of characters
/// up to the next whitespace or parenthesis is an atom.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"\s+")] // Skip whitespace
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[regex(r"[^\s()]+", |lex| lex.slice().to_string())]
    Atom(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

// Implement Display for easy printing
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Atom(text) => write!(f, "{}", text),
        }
    }
}

/// Splits `input` into a flat, left-to-right token sequence.
pub fn tokenize(input: &str) -> Vec<Token> {
    TokenKind::lexer(input)
        .spanned()
        .map(|(result, range)| Token {
            // The atom pattern matches anything the other rules don't, so an
            // error here can only be a fragment we still treat as an atom.
            kind: result.unwrap_or_else(|_| TokenKind::Atom(input[range.clone()].to_string())),
            span: Span::new(range.start, range.end),
        })
        .collect()
}

use crate::Span;
use crate::lexer::{Token, TokenKind};
use crate::types::{Node, Sexpr};
use std::iter::Peekable;
use std::vec::IntoIter; // To iterate over Vec<Token>
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("SyntaxError: unexpected end of input")]
    UnexpectedEof(Span),
    #[error("SyntaxError: unexpected close paren")]
    UnexpectedCloseParen(Span),
    #[error("SyntaxError: unexpected '{found}' after a complete expression")]
    TrailingInput { found: TokenKind, span: Span },
    #[error("SyntaxError: expression nested deeper than {0} levels")]
    TooDeep(usize, Span),
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedEof(span)
            | ParseError::UnexpectedCloseParen(span)
            | ParseError::TrailingInput { span, .. }
            | ParseError::TooDeep(_, span) => *span,
        }
    }
}

// Result type alias for convenience
pub type ParseResult<T> = Result<T, ParseError>;

/// Deepest list nesting the reader accepts.
pub const MAX_NESTING_DEPTH: usize = 1_024;

pub struct Parser {
    // We iterate over owned Tokens, consuming them.
    tokens: Peekable<IntoIter<Token>>,
    // Where an unexpected end of input gets reported
    end: usize,
    // Lists currently open
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let end = tokens.last().map_or(0, |t| t.span.end);
        Parser {
            tokens: tokens.into_iter().peekable(),
            end,
            depth: 0,
        }
    }

    // Consumes the next token, failing if the input has run out.
    fn next_token(&mut self) -> ParseResult<Token> {
        self.tokens
            .next()
            .ok_or(ParseError::UnexpectedEof(Span::new(self.end, self.end)))
    }

    /// Reads a single S-expression from the front of the token stream.
    pub fn parse_expr(&mut self) -> ParseResult<Node> {
        let token = self.next_token()?;
        match token.kind {
            TokenKind::LParen => self.parse_list(token.span),
            TokenKind::RParen => Err(ParseError::UnexpectedCloseParen(token.span)),
            TokenKind::Atom(text) => Ok(Self::parse_atom(text, token.span)),
        }
    }

    /// Numbers are whatever `f64` accepts; any other atom is a symbol.
    fn parse_atom(text: String, span: Span) -> Node {
        match text.parse::<f64>() {
            Ok(n) => Node::new(Sexpr::Number(n), span),
            Err(_) => Node::new(Sexpr::Symbol(text), span),
        }
    }

    /// Parses list elements up to and including the closing `)`.
    fn parse_list(&mut self, open: Span) -> ParseResult<Node> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::TooDeep(MAX_NESTING_DEPTH, open));
        }
        self.depth += 1;
        let list = self.parse_elements(open);
        self.depth -= 1;
        list
    }

    fn parse_elements(&mut self, open: Span) -> ParseResult<Node> {
        let mut elements = Vec::new();
        loop {
            match self.tokens.peek() {
                Some(Token {
                    kind: TokenKind::RParen,
                    ..
                }) => {
                    let close = self.next_token()?;
                    return Ok(Node::new_list(elements, open.merge(close.span)));
                }
                Some(_) => elements.push(self.parse_expr()?),
                None => return Err(ParseError::UnexpectedEof(Span::new(self.end, self.end))),
            }
        }
    }

    /// Parses exactly one top-level expression; leftover tokens are an error.
    pub fn parse(mut self) -> ParseResult<Node> {
        let expr = self.parse_expr()?;

        if let Some(found) = self.tokens.next() {
            Err(ParseError::TrailingInput {
                found: found.kind,
                span: found.span,
            })
        } else {
            Ok(expr)
        }
    }

    /// Parses every top-level expression in the token stream.
    pub fn parse_all(mut self) -> ParseResult<Vec<Node>> {
        let mut expressions = Vec::new();
        while self.tokens.peek().is_some() {
            expressions.push(self.parse_expr()?);
        }
        Ok(expressions)
    }
}

// Helper function to lex and parse a string directly (useful for tests and REPL)
pub fn parse_str(input: &str) -> ParseResult<Node> {
    let tokens = crate::lexer::tokenize(input);
    Parser::new(tokens).parse()
}

// Declare modules publicly so they are part of the library interface
pub mod cli;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod pretty_print;
pub mod primitives;
pub mod source;
pub mod types;

use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

pub use environment::{EnvError, Environment};
pub use evaluator::{EvalError, EvalResult, evaluate};
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::{ParseError, Parser, parse_str};
pub use source::Span;
pub use types::{Node, Sexpr, Value};

/// Anything that can go wrong between reading a line and producing a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl Error {
    pub fn span(&self) -> Span {
        match self {
            Error::Parse(e) => e.span(),
            Error::Eval(e) => e.span(),
        }
    }
}

/// Parses one form from `input` and evaluates it in `env`.
pub fn eval_str(input: &str, env: &Rc<RefCell<Environment>>) -> Result<Value, Error> {
    let node = parse_str(input)?;
    Ok(evaluate(&node, env)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_eval_str(env: &Rc<RefCell<Environment>>, input: &str, expected: &str) {
        match eval_str(input, env) {
            Ok(value) => assert_eq!(value.to_string(), expected, "Input: '{}'", input),
            Err(e) => panic!("Evaluation failed for input '{}': {}", input, e),
        }
    }

    #[test]
    fn test_session() {
        let env = Environment::new_global_populated();
        assert_eval_str(&env, "(+ 2 2)", "4");
        assert_eval_str(&env, "(* 2 2 2)", "8");
        assert_eval_str(&env, "(define x 10)", "10");
        assert_eval_str(&env, "x", "10");
        assert_eval_str(&env, "(define circle-area (lambda (r) (* pi (* r r))))", "#<lambda (r)>");
        assert_eval_str(&env, "(circle-area 3)", "28.274333886");
        assert_eval_str(&env, "(cdr (quote (5 4 3 2 1)))", "(4 3 2 1)");
        assert_eval_str(&env, "(> 2 1)", "true");
        assert_eval_str(&env, "car", "#<primitive:car>");
        assert_eval_str(&env, "(/ 1 0)", "inf");
    }

    #[test]
    fn test_parse_error_leaves_environment_untouched() {
        let env = Environment::new_global_populated();
        let before = env.borrow().get_identifiers();
        let result = eval_str("(define y (+ 1 2)", &env);
        assert!(matches!(result, Err(Error::Parse(ParseError::UnexpectedEof(_)))));
        assert_eq!(env.borrow().get_identifiers(), before);
    }

    #[test]
    fn test_errors_are_reported_by_kind() {
        let env = Environment::new_global_populated();
        assert!(matches!(
            eval_str(")", &env),
            Err(Error::Parse(ParseError::UnexpectedCloseParen(_)))
        ));
        assert!(matches!(
            eval_str("(car (quote ()))", &env),
            Err(Error::Eval(EvalError::TypeMismatch { .. }))
        ));
        assert!(matches!(
            eval_str("(undefined 1)", &env),
            Err(Error::Eval(EvalError::EnvError(EnvError::UnboundVariable(..))))
        ));
        let err = eval_str("(+ 1 (quote a))", &env).unwrap_err();
        assert_eq!(err.span(), Span::new(0, 15));
    }

    #[test]
    fn test_evaluation_continues_after_errors() {
        let env = Environment::new_global_populated();
        assert!(eval_str("(cdr (quote ()))", &env).is_err());
        assert_eval_str(&env, "(define z 3)", "3");
        assert!(eval_str("(z)", &env).is_err());
        assert_eval_str(&env, "(+ z 1)", "4");
    }
}

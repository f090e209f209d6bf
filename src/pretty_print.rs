use crate::{EnvError, Error, EvalError, ParseError, Span};
use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

const SOURCE_ID: &str = "REPL";

type ReportSpan = (&'static str, Range<usize>);

fn build_report(message: String, span: Span, label: String) -> Report<'static, ReportSpan> {
    // Spans are byte offsets from the lexer
    Report::build(ReportKind::Error, (SOURCE_ID, span.to_range()))
        .with_config(Config::default().with_index_type(IndexType::Byte))
        .with_message(message)
        .with_label(Label::new((SOURCE_ID, span.to_range())).with_message(label))
        .finish()
}

impl EvalError {
    pub fn report(&self) -> Report<'static, ReportSpan> {
        let label = match self {
            EvalError::EnvError(EnvError::UnboundVariable(..)) => {
                "This symbol is not defined in the current scope".to_string()
            }
            EvalError::NotAProcedure(..) => {
                "This expression cannot be called as a procedure".to_string()
            }
            EvalError::NotASymbol(sexpr, _) => format!("Expected a symbol but found {}", sexpr),
            EvalError::TypeMismatch {
                expected, found, ..
            } => format!("Expected {}, found {}", expected, found),
            EvalError::Arity {
                expected, found, ..
            } => format!("Expected {} argument(s), got {}", expected, found),
            EvalError::InvalidSpecialForm(..) => {
                "This special form is malformed or incomplete".to_string()
            }
            EvalError::TooDeep(..) => "Evaluation gave up inside this expression".to_string(),
        };
        build_report(self.to_string(), self.span(), label)
    }
}

impl ParseError {
    pub fn report(&self) -> Report<'static, ReportSpan> {
        let label = match self {
            ParseError::UnexpectedEof(_) => "Input ended before the expression was closed",
            ParseError::UnexpectedCloseParen(_) => "This ')' has no matching '('",
            ParseError::TrailingInput { .. } => "Only one expression is read at a time",
            ParseError::TooDeep(..) => "This list is nested too deeply",
        };
        build_report(self.to_string(), self.span(), label.to_string())
    }
}

impl Error {
    pub fn report(&self) -> Report<'static, ReportSpan> {
        match self {
            Error::Parse(e) => e.report(),
            Error::Eval(e) => e.report(),
        }
    }

    /// Renders the error against the `input` it came from on stderr.
    pub fn pretty_print(&self, input: &str) -> io::Result<()> {
        self.report().eprint((SOURCE_ID, Source::from(input)))
    }

    pub fn write_report<W: io::Write>(&self, input: &str, w: W) -> io::Result<()> {
        self.report().write((SOURCE_ID, Source::from(input)), w)
    }
}

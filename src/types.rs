use crate::environment::Environment;
use crate::{evaluator::EvalResult, source::Span};
use std::cell::RefCell;
use std::fmt; // For custom display formatting
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: Sexpr, // The actual S-expression data
    pub span: Span,  // The source span it covers
}

impl Node {
    pub fn new(kind: Sexpr, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn new_number(n: f64, span: Span) -> Self {
        Node::new(Sexpr::Number(n), span)
    }

    pub fn new_symbol(name: impl Into<String>, span: Span) -> Self {
        Node::new(Sexpr::Symbol(name.into()), span)
    }

    pub fn new_list(elements: Vec<Node>, span: Span) -> Self {
        Node::new(Sexpr::List(elements), span)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Delegate to Sexpr's Display implementation
        write!(f, "{}", self.kind)
    }
}

/// Represents a parsed S-expression. Atoms are numbers or symbols; everything
/// else is a (possibly empty) list of nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Sexpr {
    Symbol(String),  // e.g., +, variable-name, quote
    Number(f64),     // Every number is an f64
    List(Vec<Node>), // e.g., (+ 1 2), (define x 10), ()
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexpr::Symbol(s) => write!(f, "{}", s),
            Sexpr::Number(n) => write_number(f, *n),
            Sexpr::List(list) => write_list(f, list),
        }
    }
}

/// Integral numbers print without a fractional part; everything else prints as
/// a plain decimal.
fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{}", n)
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "(")?;
    let mut first = true;
    for item in items {
        if !first {
            write!(f, " ")?;
        }
        write!(f, "{}", item)?;
        first = false;
    }
    write!(f, ")")
}

/// A runtime value produced by evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Symbol(String),
    Boolean(bool),
    List(Vec<Value>),
    Procedure(Procedure),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Symbol(_) => "symbol",
            Value::Boolean(_) => "boolean",
            Value::List(items) if items.is_empty() => "empty list",
            Value::List(_) => "list",
            Value::Procedure(_) => "procedure",
        }
    }
}

// Quoted code is data: a parse tree converts to a value of the same shape.
impl From<&Node> for Value {
    fn from(node: &Node) -> Self {
        match &node.kind {
            Sexpr::Number(n) => Value::Number(*n),
            Sexpr::Symbol(s) => Value::Symbol(s.clone()),
            Sexpr::List(elements) => Value::List(elements.iter().map(Value::from).collect()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write_number(f, *n),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::List(items) => write_list(f, items),
            Value::Procedure(Procedure::Primitive(_, name)) => write!(f, "#<primitive:{}>", name),
            Value::Procedure(Procedure::Closure(closure)) => {
                write!(f, "#<lambda ")?;
                write_list(f, &closure.params)?;
                write!(f, ">")
            }
        }
    }
}

pub type PrimitiveFunc = fn(Vec<Value>, Span) -> EvalResult;

#[derive(Clone)] // Need Clone for Value::Procedure
pub enum Procedure {
    Primitive(PrimitiveFunc, String), // The function pointer and its name (for display/debug)
    Closure(Rc<Closure>),
}

/// A user-defined procedure created by `lambda`.
pub struct Closure {
    pub params: Vec<String>,
    pub body: Node,
    pub env: Rc<RefCell<Environment>>, // The frame the lambda was evaluated in
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::Primitive(_, name) => write!(f, "Primitive({})", name),
            // The captured environment usually holds this closure, don't walk it
            Procedure::Closure(closure) => {
                write!(f, "Closure({:?} -> {})", closure.params, closure.body)
            }
        }
    }
}

// Function pointers don't implement PartialEq reliably, so primitives compare
// by name. Closures compare by identity.
impl PartialEq for Procedure {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Procedure::Primitive(_, n1), Procedure::Primitive(_, n2)) => n1 == n2,
            (Procedure::Closure(c1), Procedure::Closure(c2)) => Rc::ptr_eq(c1, c2),
            _ => false,
        }
    }
}

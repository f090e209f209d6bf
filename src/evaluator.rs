use crate::environment::{EnvError, Environment};
use crate::source::Span;
use crate::types::{Closure, Node, Procedure, Sexpr, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

// --- Evaluation Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    EnvError(#[from] EnvError), // Errors from environment lookup
    #[error("TypeError: expected a procedure, but got {0}")]
    NotAProcedure(Value, Span), // Tried to call something that isn't a procedure
    #[error("TypeError: expected a symbol, but got {0}")]
    NotASymbol(Sexpr, Span), // define names and lambda parameters
    #[error("TypeError: {name} expected {expected}, found {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
        span: Span,
    },
    #[error("ArityError: {name} expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
        span: Span,
    },
    #[error("Invalid special form: {0}")]
    InvalidSpecialForm(String, Span), // Malformed special form (e.g., (if cond))
    #[error("RecursionError: evaluation nested deeper than {0} levels")]
    TooDeep(usize, Span),
}

impl EvalError {
    pub fn span(&self) -> Span {
        match self {
            EvalError::EnvError(EnvError::UnboundVariable(_, span))
            | EvalError::NotAProcedure(_, span)
            | EvalError::NotASymbol(_, span)
            | EvalError::TypeMismatch { span, .. }
            | EvalError::Arity { span, .. }
            | EvalError::InvalidSpecialForm(_, span)
            | EvalError::TooDeep(_, span) => *span,
        }
    }
}

// Result type alias for convenience
pub type EvalResult<T = Value> = Result<T, EvalError>;

/// How many nested evaluations a single top-level form may open.
pub const MAX_EVAL_DEPTH: usize = 512;

const SPECIAL_FORMS: [&str; 4] = ["quote", "define", "if", "lambda"];

/// Names recognised as special forms rather than looked up as procedures.
pub fn special_form_identifiers() -> HashSet<String> {
    SPECIAL_FORMS.iter().map(|s| s.to_string()).collect()
}

// --- Evaluate Function ---

/// Evaluates a given AST Node within the specified environment.
///
/// The first error aborts the whole evaluation; bindings made by `define`
/// before the failure are kept.
pub fn evaluate(node: &Node, env: &Rc<RefCell<Environment>>) -> EvalResult {
    evaluate_at(node, env, 0)
}

fn evaluate_at(node: &Node, env: &Rc<RefCell<Environment>>, depth: usize) -> EvalResult {
    if depth >= MAX_EVAL_DEPTH {
        return Err(EvalError::TooDeep(MAX_EVAL_DEPTH, node.span));
    }
    let depth = depth + 1;
    log::trace!("evaluate {}", node);
    match &node.kind {
        Sexpr::Number(n) => Ok(Value::Number(*n)),

        Sexpr::Symbol(name) => Ok(env.borrow().get(name, node.span)?),

        Sexpr::List(elements) => match &elements[..] {
            [first, rest @ ..] => match &first.kind {
                Sexpr::Symbol(sym_name) if sym_name == "quote" => evaluate_quote(rest, node.span),
                Sexpr::Symbol(sym_name) if sym_name == "define" => {
                    evaluate_define(rest, env, node.span, depth)
                }
                Sexpr::Symbol(sym_name) if sym_name == "if" => evaluate_if(rest, env, node.span, depth),
                Sexpr::Symbol(sym_name) if sym_name == "lambda" => {
                    evaluate_lambda(rest, env, node.span)
                }
                _ => evaluate_procedure(first, rest, env, node.span, depth),
            },
            [] => Err(EvalError::NotAProcedure(Value::List(vec![]), node.span)),
        },
    }
}

fn evaluate_quote(operands: &[Node], span: Span) -> EvalResult {
    if let [node] = operands {
        Ok(Value::from(node))
    } else {
        Err(EvalError::InvalidSpecialForm(
            "quote expects exactly one argument".to_string(),
            span,
        ))
    }
}

fn evaluate_define(
    operands: &[Node],
    env: &Rc<RefCell<Environment>>,
    span: Span,
    depth: usize,
) -> EvalResult {
    let [name_node, expr] = operands else {
        return Err(EvalError::InvalidSpecialForm(
            "define expects a name and an expression".to_string(),
            span,
        ));
    };
    let Sexpr::Symbol(name) = &name_node.kind else {
        return Err(EvalError::NotASymbol(
            name_node.kind.clone(),
            name_node.span,
        ));
    };

    let value = evaluate_at(expr, env, depth)?;
    log::debug!("define {} = {}", name, value);
    env.borrow_mut().define(name.clone(), value.clone());
    Ok(value)
}

fn evaluate_if(
    operands: &[Node],
    env: &Rc<RefCell<Environment>>,
    span: Span,
    depth: usize,
) -> EvalResult {
    if let [condition, consequent, alternate] = operands {
        // Only the branch that is taken gets evaluated
        match evaluate_at(condition, env, depth)? {
            Value::Boolean(true) => evaluate_at(consequent, env, depth),
            Value::Boolean(false) => evaluate_at(alternate, env, depth),
            other => Err(EvalError::TypeMismatch {
                name: "if".to_string(),
                expected: "a boolean condition",
                found: other.type_name(),
                span: condition.span,
            }),
        }
    } else {
        Err(EvalError::InvalidSpecialForm(
            "if expects a condition, a consequent and an alternate".to_string(),
            span,
        ))
    }
}

fn evaluate_lambda(operands: &[Node], env: &Rc<RefCell<Environment>>, span: Span) -> EvalResult {
    let [params_node, body] = operands else {
        return Err(EvalError::InvalidSpecialForm(
            "lambda expects a parameter list and a body".to_string(),
            span,
        ));
    };
    let Sexpr::List(param_nodes) = &params_node.kind else {
        return Err(EvalError::InvalidSpecialForm(
            "lambda parameters must be a list of symbols".to_string(),
            params_node.span,
        ));
    };

    let params = param_nodes
        .iter()
        .map(|param| match &param.kind {
            Sexpr::Symbol(name) => Ok(name.clone()),
            other => Err(EvalError::NotASymbol(other.clone(), param.span)),
        })
        .collect::<EvalResult<Vec<String>>>()?;

    Ok(Value::Procedure(Procedure::Closure(Rc::new(Closure {
        params,
        body: body.clone(),
        env: env.clone(),
    }))))
}

fn evaluate_procedure(
    operator: &Node,
    operands: &[Node],
    env: &Rc<RefCell<Environment>>,
    span: Span,
    depth: usize,
) -> EvalResult {
    let procedure = match evaluate_at(operator, env, depth)? {
        Value::Procedure(procedure) => procedure,
        other => return Err(EvalError::NotAProcedure(other, operator.span)),
    };

    match procedure {
        Procedure::Primitive(func, name) => {
            let evaluated_args = operands
                .iter()
                .map(|operand| evaluate_at(operand, env, depth))
                .collect::<EvalResult<Vec<Value>>>()?;
            log::trace!("call {} with {} argument(s)", name, evaluated_args.len());
            func(evaluated_args, span)
        }
        Procedure::Closure(closure) => {
            apply_closure(&operator.to_string(), &closure, operands, env, span, depth)
        }
    }
}

/// Arguments are bound one at a time, left to right. Each argument expression
/// is evaluated in the caller's scope extended with the parameters bound so
/// far; the body then runs in a fresh frame enclosed by the closure's own
/// environment.
fn apply_closure(
    name: &str,
    closure: &Closure,
    operands: &[Node],
    env: &Rc<RefCell<Environment>>,
    span: Span,
    depth: usize,
) -> EvalResult {
    if operands.len() != closure.params.len() {
        return Err(EvalError::Arity {
            name: name.to_string(),
            expected: closure.params.len().to_string(),
            found: operands.len(),
            span,
        });
    }

    let binding_scope = Environment::new_enclosed(env.clone());
    let activation = Environment::new_enclosed(closure.env.clone());
    for (param, operand) in closure.params.iter().zip(operands) {
        let value = evaluate_at(operand, &binding_scope, depth)?;
        binding_scope
            .borrow_mut()
            .define(param.clone(), value.clone());
        activation.borrow_mut().define(param.clone(), value);
    }

    log::debug!("apply {} with {} argument(s)", name, operands.len());
    evaluate_at(&closure.body, &activation, depth)
}

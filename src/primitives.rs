use crate::{EvalError, EvalResult, Span, Value};

pub const PI: f64 = 3.141592654;

// Checks the number of arguments
macro_rules! check_arity {
    // Variant for minimum number of args
    ($args:expr, min $expected:expr, $span:expr, $name:expr) => {
        if $args.len() < $expected {
            return Err(EvalError::Arity {
                name: $name.to_string(),
                expected: format!("at least {}", $expected),
                found: $args.len(),
                span: $span,
            });
        }
    };
    ($args:expr, $expected:expr, $span:expr, $name:expr) => {
        if $args.len() != $expected {
            return Err(EvalError::Arity {
                name: $name.to_string(),
                expected: $expected.to_string(),
                found: $args.len(),
                span: $span,
            });
        }
    };
}

// Extracts a number from a Value or returns a TypeMismatch error
macro_rules! expect_number {
    ($value:expr, $span:expr, $name:expr) => {
        match $value {
            Value::Number(n) => *n,
            other => {
                return Err(EvalError::TypeMismatch {
                    name: $name.to_string(),
                    expected: "a number",
                    found: other.type_name(),
                    span: $span,
                });
            }
        }
    };
}

fn expect_one_arg(args: Vec<Value>, span: Span, name: &str) -> EvalResult<Value> {
    match <[Value; 1]>::try_from(args) {
        Ok([arg]) => Ok(arg),
        Err(args) => Err(EvalError::Arity {
            name: name.to_string(),
            expected: "1".to_string(),
            found: args.len(),
            span,
        }),
    }
}

// Extracts the elements of a non-empty list
fn expect_non_empty_list(value: Value, span: Span, name: &str) -> EvalResult<Vec<Value>> {
    match value {
        Value::List(items) if !items.is_empty() => Ok(items),
        other => Err(EvalError::TypeMismatch {
            name: name.to_string(),
            expected: "a non-empty list",
            found: other.type_name(),
            span,
        }),
    }
}

/// Left fold starting from the first argument: `(- 10 3 2)` is `(10 - 3) - 2`.
fn fold_numbers<F: Fn(f64, f64) -> f64>(
    args: Vec<Value>,
    span: Span,
    func: F,
    operator: &str,
) -> EvalResult {
    check_arity!(args, min 1, span, operator);
    let mut acc = expect_number!(&args[0], span, operator);
    for value in &args[1..] {
        let num = expect_number!(value, span, operator);
        acc = func(acc, num);
    }
    Ok(Value::Number(acc))
}

fn compare_numbers<F: Fn(f64, f64) -> bool>(
    args: Vec<Value>,
    span: Span,
    compare: F,
    operator: &str,
) -> EvalResult {
    check_arity!(args, 2, span, operator);
    let left = expect_number!(&args[0], span, operator);
    let right = expect_number!(&args[1], span, operator);
    Ok(Value::Boolean(compare(left, right)))
}

pub fn prim_add(args: Vec<Value>, span: Span) -> EvalResult {
    fold_numbers(args, span, |acc, val| acc + val, "+")
}

pub fn prim_sub(args: Vec<Value>, span: Span) -> EvalResult {
    // (- x) -> x, there is no unary negation
    fold_numbers(args, span, |acc, val| acc - val, "-")
}

pub fn prim_mul(args: Vec<Value>, span: Span) -> EvalResult {
    fold_numbers(args, span, |acc, val| acc * val, "*")
}

pub fn prim_div(args: Vec<Value>, span: Span) -> EvalResult {
    // Division by zero yields inf or NaN
    fold_numbers(args, span, |acc, val| acc / val, "/")
}

pub fn prim_less_than(args: Vec<Value>, span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left < right, "<")
}

pub fn prim_less_than_or_equals(args: Vec<Value>, span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left <= right, "<=")
}

pub fn prim_greater_than(args: Vec<Value>, span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left > right, ">")
}

pub fn prim_greater_than_or_equals(args: Vec<Value>, span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left >= right, ">=")
}

pub fn prim_begin(mut args: Vec<Value>, span: Span) -> EvalResult {
    // Arguments were already evaluated in order by the caller
    args.pop().ok_or(EvalError::Arity {
        name: "begin".to_string(),
        expected: "at least 1".to_string(),
        found: 0,
        span,
    })
}

// --- List Primitives ---

pub fn prim_car(args: Vec<Value>, span: Span) -> EvalResult {
    let list = expect_one_arg(args, span, "car")?;
    let mut items = expect_non_empty_list(list, span, "car")?;
    Ok(items.swap_remove(0))
}

pub fn prim_cdr(args: Vec<Value>, span: Span) -> EvalResult {
    let list = expect_one_arg(args, span, "cdr")?;
    let mut items = expect_non_empty_list(list, span, "cdr")?;
    items.remove(0);
    Ok(Value::List(items))
}

pub fn prim_print(args: Vec<Value>, span: Span) -> EvalResult {
    expect_one_arg(args, span, "print")
}

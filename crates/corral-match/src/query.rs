//! JSON-style boolean query language.
//!
//! An expression is a nested array `[op, operand, operand, ...]`.
//! Comparison ops (`=`, `<`, `>`, `<=`, `>=`, `in`) relate the first
//! operand to every remaining operand; logical ops (`not`, `or`, `and`)
//! combine sub-expressions. A string operand starting with `$` resolves
//! to a host-state field through the caller-supplied resolver.
//!
//! Evaluation fails closed: malformed expressions, unknown operators,
//! and unresolvable field references all evaluate to `false`.

use serde_json::Value;
use tracing::debug;

/// Resolver mapping a `$`-stripped field name to its host-state value.
pub type FieldResolver<'a> = dyn Fn(&str) -> Option<Value> + 'a;

/// Evaluate a query expression against host-state fields.
pub fn evaluate(expr: &Value, resolve: &FieldResolver<'_>) -> bool {
    let Value::Array(parts) = expr else {
        return false;
    };
    let Some(Value::String(op)) = parts.first() else {
        return false;
    };
    let args = &parts[1..];

    match op.as_str() {
        "not" => {
            let [arg] = args else { return false };
            truth(arg, resolve).map(|t| !t).unwrap_or(false)
        }
        "or" => args.iter().any(|arg| truth(arg, resolve).unwrap_or(false)),
        "and" => {
            !args.is_empty() && args.iter().all(|arg| truth(arg, resolve).unwrap_or(false))
        }
        "=" | "<" | ">" | "<=" | ">=" => compare(op, args, resolve),
        "in" => member(args, resolve),
        unknown => {
            debug!(op = unknown, "unknown query operator");
            false
        }
    }
}

/// The first operand must satisfy `op` against every remaining operand.
fn compare(op: &str, args: &[Value], resolve: &FieldResolver<'_>) -> bool {
    if args.len() < 2 {
        return false;
    }
    let Some(first) = operand(&args[0], resolve) else {
        return false;
    };
    args[1..].iter().all(|arg| {
        let Some(other) = operand(arg, resolve) else {
            return false;
        };
        compare_values(op, &first, &other)
    })
}

fn compare_values(op: &str, left: &Value, right: &Value) -> bool {
    if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
        return match op {
            "=" => l == r,
            "<" => l < r,
            ">" => l > r,
            "<=" => l <= r,
            ">=" => l >= r,
            _ => false,
        };
    }
    if let (Value::String(l), Value::String(r)) = (left, right) {
        return match op {
            "=" => l == r,
            "<" => l < r,
            ">" => l > r,
            "<=" => l <= r,
            ">=" => l >= r,
            _ => false,
        };
    }
    // Mixed-type operands only support equality.
    op == "=" && left == right
}

/// `["in", needle, hay...]` — needle is a member of any hay operand;
/// list-valued hay (for example a list-typed host field) matches by
/// element membership.
fn member(args: &[Value], resolve: &FieldResolver<'_>) -> bool {
    if args.len() < 2 {
        return false;
    }
    let Some(needle) = operand(&args[0], resolve) else {
        return false;
    };
    args[1..].iter().any(|arg| match operand(arg, resolve) {
        Some(Value::Array(items)) => items.iter().any(|item| values_equal(item, &needle)),
        Some(other) => values_equal(&other, &needle),
        None => false,
    })
}

fn values_equal(a: &Value, b: &Value) -> bool {
    if let (Some(a), Some(b)) = (as_number(a), as_number(b)) {
        return a == b;
    }
    a == b
}

/// Resolve one operand: sub-expressions evaluate recursively, `$field`
/// strings resolve against host state, everything else is a literal.
fn operand(arg: &Value, resolve: &FieldResolver<'_>) -> Option<Value> {
    match arg {
        Value::Array(_) => Some(Value::Bool(evaluate(arg, resolve))),
        Value::String(s) => match s.strip_prefix('$') {
            Some(field) => resolve(field),
            None => Some(arg.clone()),
        },
        other => Some(other.clone()),
    }
}

fn truth(arg: &Value, resolve: &FieldResolver<'_>) -> Option<bool> {
    Some(match operand(arg, resolve)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    })
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

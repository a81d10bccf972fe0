//! List functions

use super::{CallResult, add, arity, count, list};
use cel_interpreter::{Context, ExecutionError, FunctionContext, Value};
use core::cmp::Ordering;

pub(super) fn register(context: &mut Context<'_>) {
    add(context, "isSorted", is_sorted);
    add(context, "sum", sum);
    add(context, "min", |ftx, this, args| extremum(ftx, this, args, Ordering::Less));
    add(context, "max", |ftx, this, args| extremum(ftx, this, args, Ordering::Greater));
}

pub(super) fn first_position(items: &[Value], element: &Value) -> Value {
    items.iter().position(|item| item == element).map_or(Value::Int(-1), count)
}

pub(super) fn last_position(items: &[Value], element: &Value) -> Value {
    items.iter().rposition(|item| item == element).map_or(Value::Int(-1), count)
}

fn compare(a: &Value, b: &Value) -> Result<Ordering, ExecutionError> {
    a.partial_cmp(b)
        .ok_or_else(|| ExecutionError::ValuesNotComparable(a.clone(), b.clone()))
}

fn is_sorted(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 0, 0)?;
    for pair in list(ftx, this)?.windows(2) {
        if compare(&pair[0], &pair[1])? == Ordering::Greater {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn sum(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 0, 0)?;
    let items = list(ftx, this)?;
    let Some(first) = items.first() else {
        return Ok(Value::Int(0));
    };

    items.iter().skip(1).try_fold(first.clone(), |total, item| match (&total, item) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| ftx.error("integer overflow")),
        (Value::UInt(a), Value::UInt(b)) => a
            .checked_add(*b)
            .map(Value::UInt)
            .ok_or_else(|| ftx.error("unsigned integer overflow")),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
        _ => Err(ftx.error(format!("cannot add {item:?} to {total:?}"))),
    })
}

/// `min`/`max` over a list receiver, a single list argument, or the arguments themselves
fn extremum(ftx: &FunctionContext, this: &Value, args: &[Value], keep: Ordering) -> CallResult {
    let candidates: Vec<Value> = match (this, args) {
        (Value::List(items), []) => items.to_vec(),
        _ => core::iter::once(this.clone()).chain(args.iter().cloned()).collect(),
    };

    let Some(first) = candidates.first() else {
        return Err(ftx.error("cannot take the extremum of an empty list"));
    };

    candidates.iter().skip(1).try_fold(first.clone(), |best, item| {
        Ok(if compare(item, &best)? == keep { item.clone() } else { best })
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::eval;
    use serde_json::json;

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_is_sorted() {
        assert_eq!(eval("[1, 2, 3].isSorted()"), Ok(json!(true)));
        assert_eq!(eval("[1, 3, 2].isSorted()"), Ok(json!(false)));
        assert_eq!(eval("['a', 'b', 'b'].isSorted()"), Ok(json!(true)));
        assert_eq!(eval("[].isSorted()"), Ok(json!(true)));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_sum() {
        assert_eq!(eval("[1, 2, 3].sum()"), Ok(json!(6)));
        assert_eq!(eval("[1.5, 2.5].sum()"), Ok(json!(4.0)));
        assert_eq!(eval("[].sum()"), Ok(json!(0)));
        let _ = eval("[1, 'a'].sum()").unwrap_err();
        let _ = eval("[9223372036854775807, 1].sum()").unwrap_err();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_min_and_max() {
        assert_eq!(eval("[3, 1, 2].min()"), Ok(json!(1)));
        assert_eq!(eval("[3, 1, 2].max()"), Ok(json!(3)));
        assert_eq!(eval("max(4, 9, 2)"), Ok(json!(9)));
        assert_eq!(eval("min([5, 7])"), Ok(json!(5)));
        let _ = eval("[].max()").unwrap_err();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_positions() {
        assert_eq!(eval("[1, 2, 2, 3].indexOf(2)"), Ok(json!(1)));
        assert_eq!(eval("[1, 2, 2, 3].lastIndexOf(2)"), Ok(json!(2)));
        assert_eq!(eval("[1, 2].indexOf(5)"), Ok(json!(-1)));
    }
}

//! Functions Kubernetes makes available to admission expressions
//!
//! The interpreter ships the core language functions only. This module adds
//! the extension libraries the API server installs for admission policies:
//!
//! - string extensions: `charAt`, `indexOf`, `lastIndexOf`, `lowerAscii`,
//!   `upperAscii`, `replace`, `split`, `substring`, `trim`, `join`
//! - lists: `isSorted`, `sum`, `min`, `max`, `indexOf`, `lastIndexOf`
//! - regular expressions: `find`, `findAll`
//! - quantities: `quantity`, `isQuantity` and the quantity methods
//! - URLs: `url`, `isURL` and the URL accessors
//!
//! Every function accepts both the method form (`'a,b'.split(',')`) and the
//! function form (`split('a,b', ',')`).

mod lists;
mod patterns;
mod quantity;
mod strings;
mod urls;

use crate::expr::map_member;
use cel_interpreter::extractors::Arguments;
use cel_interpreter::objects::Map;
use cel_interpreter::{Context, ExecutionError, FunctionContext, Value};
use std::collections::HashMap;
use std::sync::Arc;

type CallResult = Result<Value, ExecutionError>;

/// A library function, given its receiver and the remaining arguments
type Handler = fn(&FunctionContext, &Value, &[Value]) -> CallResult;

/// Register every library function on a root context
pub fn register(context: &mut Context<'_>) {
    strings::register(context);
    lists::register(context);
    patterns::register(context);
    quantity::register(context);
    urls::register(context);
}

fn add(context: &mut Context<'_>, name: &str, handler: Handler) {
    context.add_function(name, move |ftx: &FunctionContext, Arguments(args): Arguments| {
        let (this, rest) = match &ftx.this {
            Some(this) => (this.clone(), args.as_slice()),
            None => match args.split_first() {
                Some((first, rest)) => (first.clone(), rest),
                None => return Err(ExecutionError::missing_argument_or_target()),
            },
        };
        handler(ftx, &this, rest)
    });
}

/// Check the number of arguments after the receiver
fn arity(args: &[Value], min: usize, max: usize) -> Result<(), ExecutionError> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(ExecutionError::invalid_argument_count(max, args.len()))
    }
}

fn string<'a>(ftx: &FunctionContext, value: &'a Value) -> Result<&'a str, ExecutionError> {
    match value {
        Value::String(s) => Ok(s.as_str()),
        other => Err(ftx.error(format!("expected a string, got {other:?}"))),
    }
}

fn int(ftx: &FunctionContext, value: &Value) -> Result<i64, ExecutionError> {
    match value {
        Value::Int(i) => Ok(*i),
        other => Err(ftx.error(format!("expected an int, got {other:?}"))),
    }
}

fn list<'a>(ftx: &FunctionContext, value: &'a Value) -> Result<&'a [Value], ExecutionError> {
    match value {
        Value::List(items) => Ok(items.as_slice()),
        other => Err(ftx.error(format!("expected a list, got {other:?}"))),
    }
}

fn text(s: impl Into<String>) -> Value {
    Value::String(Arc::new(s.into()))
}

fn count(n: usize) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

/// Keys marking the map values that stand for library objects
const HANDLE_KEYS: [&str; 2] = [quantity::HANDLE_KEY, urls::HANDLE_KEY];

fn handle(key: &str, source: &str) -> Value {
    let mut fields: HashMap<Arc<String>, Value> = HashMap::new();
    let _ = fields.insert(Arc::new(key.to_string()), text(source));
    Value::Map(Map::from(fields))
}

fn handle_source<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    match value {
        Value::Map(map) if map.map.len() == 1 => match map_member(map, key)? {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        },
        _ => None,
    }
}

/// The text a quantity or URL value was created from
#[must_use]
pub fn handle_text(map: &Map) -> Option<String> {
    if map.map.len() != 1 {
        return None;
    }

    HANDLE_KEYS.iter().find_map(|key| match map_member(map, key)? {
        Value::String(s) => Some(s.to_string()),
        _ => None,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::eval;
    use serde_json::json;

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_method_and_function_forms_agree() {
        assert_eq!(eval("'ABC'.lowerAscii()"), Ok(json!("abc")));
        assert_eq!(eval("lowerAscii('ABC')"), Ok(json!("abc")));
        assert_eq!(eval("'a,b'.split(',')"), eval("split('a,b', ',')"));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_handles_render_as_their_text() {
        assert_eq!(eval("quantity('1Gi')"), Ok(json!("1Gi")));
        assert_eq!(eval("url('https://example.com/a')"), Ok(json!("https://example.com/a")));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_wrong_argument_count() {
        let err = eval("'abc'.lowerAscii('x')").unwrap_err();
        assert!(err.contains("Invalid argument count"), "{err}");
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_wrong_receiver_type() {
        let err = eval("lowerAscii(1)").unwrap_err();
        assert!(err.contains("expected a string"), "{err}");
    }
}

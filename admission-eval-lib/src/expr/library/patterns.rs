//! Regular expression functions

use super::{CallResult, add, arity, int, string, text};
use cel_interpreter::{Context, ExecutionError, FunctionContext, Value};
use regex::Regex;

pub(super) fn register(context: &mut Context<'_>) {
    add(context, "find", find);
    add(context, "findAll", find_all);
}

fn pattern(ftx: &FunctionContext, value: &Value) -> Result<Regex, ExecutionError> {
    let source = string(ftx, value)?;
    Regex::new(source).map_err(|e| ftx.error(format!("invalid regular expression '{source}': {e}")))
}

/// The first match, or the empty string
fn find(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 1, 1)?;
    let haystack = string(ftx, this)?;
    let regex = pattern(ftx, &args[0])?;
    Ok(text(regex.find(haystack).map_or("", |m| m.as_str())))
}

/// Every match, or at most `limit` of them when the limit is not negative
fn find_all(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 1, 2)?;
    let haystack = string(ftx, this)?;
    let regex = pattern(ftx, &args[0])?;

    let limit = match args.get(1) {
        Some(n) => usize::try_from(int(ftx, n)?).ok(),
        None => None,
    };

    let matches = regex.find_iter(haystack).map(|m| text(m.as_str()));
    let matches: Vec<Value> = match limit {
        Some(n) => matches.take(n).collect(),
        None => matches.collect(),
    };
    Ok(Value::List(matches.into()))
}

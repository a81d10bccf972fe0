//! String extensions
//!
//! Indexes count code points, not bytes.

use super::{CallResult, add, arity, count, int, list, lists, string, text};
use cel_interpreter::{Context, ExecutionError, FunctionContext, Value};

pub(super) fn register(context: &mut Context<'_>) {
    add(context, "charAt", char_at);
    add(context, "indexOf", index_of);
    add(context, "lastIndexOf", last_index_of);
    add(context, "lowerAscii", lower_ascii);
    add(context, "upperAscii", upper_ascii);
    add(context, "replace", replace);
    add(context, "split", split);
    add(context, "substring", substring);
    add(context, "trim", trim);
    add(context, "join", join);
}

/// Convert an index into a position within `0..=len`
fn position(ftx: &FunctionContext, index: i64, len: usize) -> Result<usize, ExecutionError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i <= len)
        .ok_or_else(|| ftx.error(format!("index out of range: {index}")))
}

fn char_at(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 1, 1)?;
    let chars: Vec<char> = string(ftx, this)?.chars().collect();
    let index = position(ftx, int(ftx, &args[0])?, chars.len())?;
    Ok(text(chars.get(index).map(char::to_string).unwrap_or_default()))
}

fn index_of(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    if let Value::List(items) = this {
        arity(args, 1, 1)?;
        return Ok(lists::first_position(items, &args[0]));
    }

    arity(args, 1, 2)?;
    let haystack: Vec<char> = string(ftx, this)?.chars().collect();
    let needle: Vec<char> = string(ftx, &args[0])?.chars().collect();
    let from = match args.get(1) {
        Some(offset) => position(ftx, int(ftx, offset)?, haystack.len())?,
        None => 0,
    };

    if needle.is_empty() {
        return Ok(count(from));
    }

    Ok(haystack
        .get(from..)
        .and_then(|tail| tail.windows(needle.len()).position(|w| w == needle.as_slice()))
        .map_or(Value::Int(-1), |p| count(p + from)))
}

fn last_index_of(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    if let Value::List(items) = this {
        arity(args, 1, 1)?;
        return Ok(lists::last_position(items, &args[0]));
    }

    arity(args, 1, 2)?;
    let haystack: Vec<char> = string(ftx, this)?.chars().collect();
    let needle: Vec<char> = string(ftx, &args[0])?.chars().collect();
    let upto = match args.get(1) {
        Some(offset) => position(ftx, int(ftx, offset)?, haystack.len())?,
        None => haystack.len(),
    };

    if needle.is_empty() {
        return Ok(count(upto));
    }

    Ok(haystack
        .windows(needle.len())
        .enumerate()
        .take(upto + 1)
        .rfind(|(_, w)| *w == needle.as_slice())
        .map_or(Value::Int(-1), |(p, _)| count(p)))
}

fn lower_ascii(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 0, 0)?;
    Ok(text(string(ftx, this)?.to_ascii_lowercase()))
}

fn upper_ascii(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 0, 0)?;
    Ok(text(string(ftx, this)?.to_ascii_uppercase()))
}

fn replace(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 2, 3)?;
    let s = string(ftx, this)?;
    let from = string(ftx, &args[0])?;
    let to = string(ftx, &args[1])?;

    let limit = match args.get(2) {
        Some(n) => usize::try_from(int(ftx, n)?).ok(),
        None => None,
    };

    Ok(text(match limit {
        Some(n) => s.replacen(from, to, n),
        None => s.replace(from, to),
    }))
}

fn split(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 1, 2)?;
    let s = string(ftx, this)?;
    let separator = string(ftx, &args[0])?;

    let limit = match args.get(1) {
        Some(n) => usize::try_from(int(ftx, n)?).ok(),
        None => None,
    };

    let pieces: Vec<String> = match limit {
        Some(0) => Vec::new(),
        Some(n) if separator.is_empty() => {
            let chars: Vec<char> = s.chars().collect();
            let split_at = chars.len().min(n - 1);
            let mut pieces: Vec<String> = chars.iter().take(split_at).map(char::to_string).collect();
            if split_at < chars.len() {
                pieces.push(chars.iter().skip(split_at).collect());
            }
            pieces
        }
        None if separator.is_empty() => s.chars().map(String::from).collect(),
        Some(n) => s.splitn(n, separator).map(String::from).collect(),
        None => s.split(separator).map(String::from).collect(),
    };

    Ok(Value::List(pieces.into_iter().map(text).collect::<Vec<_>>().into()))
}

fn substring(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 1, 2)?;
    let chars: Vec<char> = string(ftx, this)?.chars().collect();
    let start = position(ftx, int(ftx, &args[0])?, chars.len())?;
    let end = match args.get(1) {
        Some(end) => position(ftx, int(ftx, end)?, chars.len())?,
        None => chars.len(),
    };

    if start > end {
        return Err(ftx.error(format!("invalid substring range. start: {start}, end: {end}")));
    }

    Ok(text(chars.get(start..end).unwrap_or_default().iter().collect::<String>()))
}

fn trim(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 0, 0)?;
    Ok(text(string(ftx, this)?.trim()))
}

fn join(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 0, 1)?;
    let separator = match args.first() {
        Some(separator) => string(ftx, separator)?,
        None => "",
    };

    let parts = list(ftx, this)?
        .iter()
        .map(|item| string(ftx, item))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(text(parts.join(separator)))
}

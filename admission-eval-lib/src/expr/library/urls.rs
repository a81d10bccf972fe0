//! URL functions
//!
//! `url()` accepts absolute URLs and absolute paths. The accessors report the
//! host and port as written, so an explicit default port is kept.

use super::{CallResult, add, arity, handle, handle_source, string, text};
use cel_interpreter::objects::Map;
use cel_interpreter::{Context, ExecutionError, FunctionContext, Value};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

pub(super) const HANDLE_KEY: &str = "@url";

/// The parts of a URL the accessors expose
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct UrlParts {
    scheme: String,
    hostname: String,
    port: String,
    escaped_path: String,
    query: Vec<(String, String)>,
}

impl UrlParts {
    fn parse(source: &str) -> Option<Self> {
        if source.starts_with('/') {
            let url = Url::parse("http://localhost").ok()?.join(source).ok()?;
            return Some(Self {
                escaped_path: url.path().to_string(),
                query: query_pairs(&url),
                ..Self::default()
            });
        }

        let url = Url::parse(source).ok()?;
        let (authority, has_path) = match source.split_once("://") {
            Some((_, rest)) => {
                let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
                (rest.get(..end).unwrap_or_default(), rest.get(end..).is_some_and(|tail| tail.starts_with('/')))
            }
            None => ("", true),
        };

        Some(Self {
            scheme: url.scheme().to_string(),
            hostname: url.host_str().unwrap_or_default().to_string(),
            port: written_port(authority).unwrap_or_default().to_string(),
            escaped_path: if has_path { url.path().to_string() } else { String::new() },
            query: query_pairs(&url),
        })
    }

    /// The host, with its port when one was written
    fn host(&self) -> String {
        if self.port.is_empty() {
            self.hostname.clone()
        } else {
            format!("{}:{}", self.hostname, self.port)
        }
    }
}

fn query_pairs(url: &Url) -> Vec<(String, String)> {
    url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
}

/// The port spelled out in an authority such as `user@host:8080` or `[::1]:443`
fn written_port(authority: &str) -> Option<&str> {
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let (_, port) = host_port.rsplit_once(':')?;
    (!port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())).then_some(port)
}

pub(super) fn register(context: &mut Context<'_>) {
    add(context, "url", parse_url);
    add(context, "isURL", is_url);
    add(context, "getScheme", |ftx, this, args| Ok(text(parts(ftx, this, args)?.scheme)));
    add(context, "getHost", |ftx, this, args| Ok(text(parts(ftx, this, args)?.host())));
    add(context, "getHostname", |ftx, this, args| {
        let hostname = parts(ftx, this, args)?.hostname;
        Ok(text(hostname.trim_start_matches('[').trim_end_matches(']')))
    });
    add(context, "getPort", |ftx, this, args| Ok(text(parts(ftx, this, args)?.port)));
    add(context, "getEscapedPath", |ftx, this, args| Ok(text(parts(ftx, this, args)?.escaped_path)));
    add(context, "getQuery", get_query);
}

fn parts(ftx: &FunctionContext, this: &Value, args: &[Value]) -> Result<UrlParts, ExecutionError> {
    arity(args, 0, 0)?;
    handle_source(this, HANDLE_KEY)
        .and_then(UrlParts::parse)
        .ok_or_else(|| ftx.error(format!("expected a URL, got {this:?}")))
}

fn parse_url(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 0, 0)?;
    let source = string(ftx, this)?;
    match UrlParts::parse(source) {
        Some(_) => Ok(handle(HANDLE_KEY, source)),
        None => Err(ftx.error(format!("URL parse error during conversion from string: {source}"))),
    }
}

fn is_url(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    arity(args, 0, 0)?;
    Ok(Value::Bool(UrlParts::parse(string(ftx, this)?).is_some()))
}

/// Query parameters as a map from name to every value given for it
fn get_query(ftx: &FunctionContext, this: &Value, args: &[Value]) -> CallResult {
    let mut grouped: HashMap<Arc<String>, Vec<Value>> = HashMap::new();
    for (name, value) in parts(ftx, this, args)?.query {
        grouped.entry(Arc::new(name)).or_default().push(text(value));
    }

    let fields: HashMap<Arc<String>, Value> = grouped
        .into_iter()
        .map(|(name, values)| (name, Value::List(values.into())))
        .collect();
    Ok(Value::Map(Map::from(fields)))
}

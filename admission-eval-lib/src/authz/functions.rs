//! Exposing authorizer nodes to expressions
//!
//! The interpreter has no notion of opaque receiver objects, so each node is
//! stored in a run-scoped [`NodeArena`] and handed to expressions as a small
//! map carrying its index and kind. The navigation functions are registered on
//! the context and resolve their receiver through the arena.

use super::node::{AuthzError, Method, Node, Reply};
use super::table::AuthorizerTable;
use crate::expr::map_member;
use cel_interpreter::extractors::{Arguments, This};
use cel_interpreter::objects::Map;
use cel_interpreter::{Context, ExecutionError, FunctionContext, Value};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use strum::IntoEnumIterator;

pub(super) const INDEX_KEY: &str = "@authz";
pub(super) const KIND_KEY: &str = "@kind";
const REQUEST_RESOURCE_KEY: &str = "requestResource";

/// Storage for the authorizer nodes created during one run
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Mutex<Vec<Node>>,
}

impl NodeArena {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store a node and return the value expressions see for it
    pub fn insert(&self, node: Node) -> Value {
        let kind = node.kind().to_string();
        handle(self.push(node), kind, None)
    }

    /// Store the root of a table, with the request resource check attached when present
    pub fn insert_root(&self, table: AuthorizerTable, request_resource: Option<Node>) -> Value {
        let request_resource = request_resource.map(|node| self.insert(node));
        let root = Node::root(table);
        let kind = root.kind().to_string();
        handle(self.push(root), kind, request_resource)
    }

    fn push(&self, node: Node) -> u64 {
        let mut nodes = self.nodes.lock().unwrap_or_else(PoisonError::into_inner);
        nodes.push(node);
        (nodes.len() - 1) as u64
    }

    /// Find the node a value refers to
    pub fn resolve(&self, value: &Value) -> Option<Node> {
        let Value::Map(map) = value else {
            return None;
        };
        let Some(Value::UInt(index)) = map_member(map, INDEX_KEY) else {
            return None;
        };

        let nodes = self.nodes.lock().unwrap_or_else(PoisonError::into_inner);
        nodes.get(usize::try_from(*index).ok()?).cloned()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn handle(index: u64, kind: String, request_resource: Option<Value>) -> Value {
    let mut fields: HashMap<Arc<String>, Value> = HashMap::new();
    let _ = fields.insert(Arc::new(INDEX_KEY.to_string()), Value::UInt(index));
    let _ = fields.insert(Arc::new(KIND_KEY.to_string()), Value::String(Arc::new(kind)));
    if let Some(request_resource) = request_resource {
        let _ = fields.insert(Arc::new(REQUEST_RESOURCE_KEY.to_string()), request_resource);
    }
    Value::Map(Map::from(fields))
}

/// Resolve the resource check for the resource named by an admission request
///
/// The walk selects the request's group, resource, namespace and name in turn.
/// Missing request fields select the empty string.
///
/// # Errors
///
/// Returns an error if a navigation step fails
pub fn request_resource(table: &AuthorizerTable, request: &JsonValue) -> Result<Node, AuthzError> {
    let field = |value: Option<&JsonValue>| value.and_then(JsonValue::as_str).unwrap_or_default().to_string();
    let resource = request.get("resource");

    let steps = [
        (Method::Group, field(resource.and_then(|r| r.get("group")))),
        (Method::Resource, field(resource.and_then(|r| r.get("resource")))),
        (Method::Namespace, field(request.get("namespace"))),
        (Method::Name, field(request.get("name"))),
    ];

    steps
        .iter()
        .try_fold(Node::root(table.clone()), |node, (method, arg)| node.navigate(*method, arg))
}

/// Register the navigation functions on a root context
pub fn register(context: &mut Context<'_>, arena: &Arc<NodeArena>) {
    for method in Method::iter() {
        let arena = Arc::clone(arena);
        context.add_function(
            method.as_ref(),
            move |ftx: &FunctionContext, This(target): This<Value>, Arguments(args): Arguments| {
                dispatch(&arena, method, ftx, &target, &args)
            },
        );
    }
}

fn dispatch(
    arena: &NodeArena,
    method: Method,
    ftx: &FunctionContext,
    target: &Value,
    args: &[Value],
) -> Result<Value, ExecutionError> {
    let Some(node) = arena.resolve(target) else {
        return Err(ftx.error(format!("no such overload: {method} is only defined on authorizer values")));
    };

    let args: Vec<Option<&str>> = args
        .iter()
        .map(|arg| match arg {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        })
        .collect();

    match node.receive(method, &args) {
        Ok(Reply::Node(node)) => Ok(arena.insert(node)),
        Ok(Reply::Bool(b)) => Ok(Value::Bool(b)),
        Ok(Reply::String(s)) => Ok(Value::String(Arc::new(s))),
        Err(e) => Err(ftx.error(e.to_string())),
    }
}

//! Emulation of the Kubernetes authorizer
//!
//! Policies may ask whether a principal is allowed to reach a path or act on a
//! resource. Rather than consulting a live authorization service, answers come
//! from a static [`AuthorizerTable`] supplied with the inputs. Expressions
//! navigate the table with method calls such as
//! `authorizer.group('apps').resource('deployments').check('update').allowed()`.

mod functions;
mod node;
mod table;

pub use functions::{NodeArena, register, request_resource};
pub use node::{AuthzError, Method, Node, NodeKind, Reply, ResourceCheck};
pub use table::{AuthorizerTable, Decision, GroupTable, NamespacedChecks, PathTable, ResourceTable};

use crate::expr::map_member;
use cel_interpreter::Value;
use cel_interpreter::objects::Map;

/// The kind of authorizer node a map value stands for, if any
#[must_use]
pub fn node_kind(map: &Map) -> Option<String> {
    if map_member(map, functions::INDEX_KEY).is_none() {
        return None;
    }

    match map_member(map, functions::KIND_KEY)? {
        Value::String(kind) => Some(kind.to_string()),
        _ => None,
    }
}

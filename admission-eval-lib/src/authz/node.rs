//! Navigation over the decision table
//!
//! Every node is an immutable snapshot of part of the table. Navigating from a
//! node yields either the matching child or an empty child of the right kind,
//! so a missing rule never fails navigation; only the terminal [`Decision`]
//! tells that nothing matched.

use super::table::{AuthorizerTable, Decision, GroupTable, PathTable, ResourceTable};
use core::fmt::{self, Display, Formatter};
use std::sync::Arc;
use strum::{AsRefStr, Display as StrumDisplay, EnumIter};

/// The closed set of operations nodes answer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr, StrumDisplay)]
#[strum(serialize_all = "camelCase")]
pub enum Method {
    Path,
    Group,
    ServiceAccount,
    Resource,
    Subresource,
    Namespace,
    Name,
    Check,
    Errored,
    Error,
    Allowed,
    Reason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
pub enum NodeKind {
    Authorizer,
    PathCheck,
    GroupCheck,
    ResourceCheck,
    Decision,
}

/// A navigation contract violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// The node has no operation with this name and argument shape
    NoSuchOverload { receiver: String, method: Method, arity: usize },

    /// A selector that must name something was empty
    EmptySelector(Method),

    /// A selector that may be applied once was applied again
    AlreadyInvoked(Method),
}

impl Display for AuthzError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchOverload { receiver, method, arity } => {
                write!(f, "no such overload: {receiver}.{method} with {arity} argument(s)")
            }
            Self::EmptySelector(Method::Check) => write!(f, "must specify check"),
            Self::EmptySelector(method) => write!(f, "{method} must not be empty"),
            Self::AlreadyInvoked(method) => write!(f, "{method} already invoked"),
        }
    }
}

impl core::error::Error for AuthzError {}

/// A resource check together with the selections made on it so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceCheck {
    table: Arc<ResourceTable>,
    namespace: Option<String>,
    name: Option<String>,
    no_subresource: bool,
}

impl ResourceCheck {
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn decision(&self, check: &str) -> Decision {
        self.table
            .checks
            .get(self.namespace.as_deref().unwrap_or_default())
            .and_then(|named| named.get(self.name.as_deref().unwrap_or_default()))
            .and_then(|checks| checks.get(check))
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Authorizer(Arc<AuthorizerTable>),
    PathCheck(Arc<PathTable>),
    GroupCheck(Arc<GroupTable>),
    ResourceCheck(ResourceCheck),
    Decision(Arc<Decision>),
}

/// What a node hands back for an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Node(Node),
    Bool(bool),
    String(String),
}

impl Node {
    #[must_use]
    pub fn root(table: AuthorizerTable) -> Self {
        Self::Authorizer(Arc::new(table))
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Authorizer(_) => NodeKind::Authorizer,
            Self::PathCheck(_) => NodeKind::PathCheck,
            Self::GroupCheck(_) => NodeKind::GroupCheck,
            Self::ResourceCheck(_) => NodeKind::ResourceCheck,
            Self::Decision(_) => NodeKind::Decision,
        }
    }

    /// Apply an operation to this node
    ///
    /// `args` holds the string arguments of the call; a non-string argument is
    /// passed as `None` and never matches an overload.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthzError`] for an unsupported operation, an empty
    /// selector, or a selector applied twice.
    pub fn receive(&self, method: Method, args: &[Option<&str>]) -> Result<Reply, AuthzError> {
        let no_overload = || AuthzError::NoSuchOverload {
            receiver: self.kind().to_string(),
            method,
            arity: args.len(),
        };

        match (self, method, args) {
            (Self::Authorizer(table), Method::Path, [path]) => {
                let path = path.map(str::trim).ok_or_else(no_overload)?;
                if path.is_empty() {
                    return Err(AuthzError::EmptySelector(Method::Path));
                }
                Ok(child(table.paths.get(path), Self::PathCheck))
            }
            (Self::Authorizer(table), Method::Group, [group]) => {
                let group = group.map(str::trim).ok_or_else(no_overload)?;
                Ok(child(table.groups.get(group), Self::GroupCheck))
            }
            (Self::Authorizer(table), Method::ServiceAccount, [Some(namespace), Some(name)]) => {
                let nested = table
                    .service_accounts
                    .get(namespace.trim())
                    .and_then(|accounts| accounts.get(name.trim()));
                Ok(child(nested, Self::Authorizer))
            }
            (Self::PathCheck(table), Method::Check, [check]) => {
                let check = check.map(str::trim).ok_or_else(no_overload)?;
                if check.is_empty() {
                    return Err(AuthzError::EmptySelector(Method::Check));
                }
                Ok(child(table.checks.get(check), Self::Decision))
            }
            (Self::GroupCheck(table), Method::Resource, [resource]) => {
                let resource = resource.map(str::trim).ok_or_else(no_overload)?;
                let table = table.resources.get(resource).cloned().unwrap_or_default();
                Ok(Reply::Node(Self::ResourceCheck(ResourceCheck {
                    table: Arc::new(table),
                    ..ResourceCheck::default()
                })))
            }
            (Self::ResourceCheck(check), _, [arg]) => check.receive(method, *arg).ok_or_else(no_overload)?,
            (Self::Decision(decision), _, []) => match method {
                Method::Errored => Ok(Reply::Bool(decision.errored())),
                Method::Error => Ok(Reply::String(decision.error.clone())),
                Method::Allowed => Ok(Reply::Bool(decision.allowed())),
                Method::Reason => Ok(Reply::String(decision.reason.clone())),
                _ => Err(no_overload()),
            },
            _ => Err(no_overload()),
        }
    }

    /// Apply a selector that must lead to another node
    ///
    /// # Errors
    ///
    /// Returns an [`AuthzError`] if the operation fails or does not produce a node
    pub fn navigate(&self, method: Method, arg: &str) -> Result<Self, AuthzError> {
        match self.receive(method, &[Some(arg)])? {
            Reply::Node(node) => Ok(node),
            Reply::Bool(_) | Reply::String(_) => Err(AuthzError::NoSuchOverload {
                receiver: self.kind().to_string(),
                method,
                arity: 1,
            }),
        }
    }
}

impl ResourceCheck {
    /// Single-argument operations; `None` when the operation does not exist or the argument is not a string
    fn receive(&self, method: Method, arg: Option<&str>) -> Option<Result<Reply, AuthzError>> {
        match method {
            Method::Subresource => {
                if self.no_subresource {
                    return Some(Err(AuthzError::AlreadyInvoked(Method::Subresource)));
                }
                let subresource = arg?.trim();
                if subresource.is_empty() {
                    return Some(Ok(Reply::Node(Node::ResourceCheck(self.clone()))));
                }
                let table = self.table.subresources.get(subresource).cloned().unwrap_or_default();
                Some(Ok(Reply::Node(Node::ResourceCheck(Self {
                    table: Arc::new(table),
                    namespace: self.namespace.clone(),
                    name: self.name.clone(),
                    no_subresource: true,
                }))))
            }
            Method::Namespace => {
                if self.namespace.is_some() {
                    return Some(Err(AuthzError::AlreadyInvoked(Method::Namespace)));
                }
                let namespace = arg?.trim();
                Some(Ok(Reply::Node(Node::ResourceCheck(Self {
                    namespace: Some(namespace.to_string()),
                    ..self.clone()
                }))))
            }
            Method::Name => {
                if self.name.is_some() {
                    return Some(Err(AuthzError::AlreadyInvoked(Method::Name)));
                }
                let name = arg?.trim();
                if name.is_empty() {
                    return Some(Ok(Reply::Node(Node::ResourceCheck(self.clone()))));
                }
                Some(Ok(Reply::Node(Node::ResourceCheck(Self {
                    name: Some(name.to_string()),
                    ..self.clone()
                }))))
            }
            Method::Check => {
                let check = arg?.trim();
                if check.is_empty() {
                    return Some(Err(AuthzError::EmptySelector(Method::Check)));
                }
                Some(Ok(Reply::Node(Node::Decision(Arc::new(self.decision(check))))))
            }
            _ => None,
        }
    }
}

fn child<T: Clone + Default>(found: Option<&T>, wrap: impl FnOnce(Arc<T>) -> Node) -> Reply {
    Reply::Node(wrap(Arc::new(found.cloned().unwrap_or_default())))
}

//! The static decision table the authorizer model answers from

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decisions for one principal
///
/// ```yaml
/// paths:
///   /healthz:
///     checks:
///       get: { decision: allow }
/// groups:
///   apps:
///     resources:
///       deployments:
///         checks:
///           default:        # namespace ("" for cluster scope)
///             web:          # name ("" for any)
///               update: { decision: deny, reason: frozen }
/// serviceAccounts:
///   kube-system:
///     replicaset-controller:
///       groups: {}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerTable {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub paths: BTreeMap<String, PathTable>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub groups: BTreeMap<String, GroupTable>,

    /// Nested tables keyed by namespace, then service account name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub service_accounts: BTreeMap<String, BTreeMap<String, Self>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PathTable {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub checks: BTreeMap<String, Decision>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GroupTable {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, ResourceTable>,
}

/// Checks for a resource, keyed by namespace, then name, then check
pub type NamespacedChecks = BTreeMap<String, BTreeMap<String, BTreeMap<String, Decision>>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResourceTable {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subresources: BTreeMap<String, Self>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub checks: NamespacedChecks,
}

/// The terminal answer of an authorization check
///
/// An empty decision stands for "no matching rule".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Decision {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub decision: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

impl Decision {
    #[must_use]
    pub fn allowed(&self) -> bool {
        self.decision == "allow"
    }

    #[must_use]
    pub fn errored(&self) -> bool {
        !self.error.is_empty()
    }
}

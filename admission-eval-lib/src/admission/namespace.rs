use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The namespace of the object under admission, visible to validations as `namespaceObject`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Namespace {
    #[serde(default)]
    pub metadata: NamespaceMetadata,

    #[serde(default)]
    pub spec: NamespaceSpec,

    #[serde(default)]
    pub status: NamespaceStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub generate_name: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    #[serde(default)]
    pub uid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,

    #[serde(default)]
    pub deletion_grace_period_seconds: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<String>,

    #[serde(default)]
    pub generation: i64,

    #[serde(default)]
    pub resource_version: String,

    #[serde(default)]
    pub finalizers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NamespaceSpec {
    #[serde(default)]
    pub finalizers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NamespaceStatus {
    #[serde(default)]
    pub conditions: Vec<NamespaceCondition>,

    #[serde(default)]
    pub phase: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceCondition {
    #[serde(default, rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub reason: String,
}

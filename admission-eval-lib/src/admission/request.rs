use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GroupVersionResource {
    #[serde(default)]
    pub group: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub resource: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Vec<String>>,
}

/// The attributes of an admission request visible to expressions as `request`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    #[serde(default)]
    pub kind: GroupVersionKind,

    #[serde(default)]
    pub resource: GroupVersionResource,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub_resource: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_kind: Option<GroupVersionKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_resource: Option<GroupVersionResource>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_sub_resource: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default)]
    pub operation: String,

    #[serde(default)]
    pub user_info: UserInfo,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_are_dropped() {
        let request: AdmissionRequest = serde_yaml::from_str(
            r"
uid: 705ab4f5-6393-11e8-b7cc-42010a800002
kind: { group: apps, version: v1, kind: Deployment }
resource: { group: apps, version: v1, resource: deployments }
name: web
namespace: default
operation: CREATE
userInfo:
  username: admin
  groups: [system:authenticated]
options: { apiVersion: meta.k8s.io/v1, kind: CreateOptions }
",
        )
        .unwrap();

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "kind": { "group": "apps", "version": "v1", "kind": "Deployment" },
                "resource": { "group": "apps", "version": "v1", "resource": "deployments" },
                "name": "web",
                "namespace": "default",
                "operation": "CREATE",
                "userInfo": { "username": "admin", "groups": ["system:authenticated"] }
            })
        );
    }

    #[test]
    fn test_optional_fields_round_trip() {
        let request: AdmissionRequest = serde_yaml::from_str(
            r"
requestResource: { group: apps, version: v1, resource: deployments }
requestSubResource: scale
subResource: scale
dryRun: true
",
        )
        .unwrap();

        assert_eq!(request.dry_run, Some(true));
        assert_eq!(request.sub_resource, "scale");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["requestResource"]["resource"], json!("deployments"));
        assert_eq!(value["requestSubResource"], json!("scale"));
    }
}

use crate::Result;
use ohno::{IntoAppError, app_err};
use serde::Deserialize;

const ADMISSION_GROUP: &str = "admissionregistration.k8s.io";

/// A named expression, used for variables and match conditions
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NamedExpression {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub expression: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    #[serde(default)]
    pub expression: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub message_expression: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditAnnotation {
    #[serde(default)]
    pub key: String,

    #[serde(default, rename = "valueExpression")]
    pub expression: String,
}

/// The expressions of a policy or webhook configuration, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDocument {
    pub name: String,
    pub namespace: String,
    pub variables: Vec<NamedExpression>,
    pub validations: Vec<Validation>,
    pub match_conditions: Vec<NamedExpression>,
    pub audit_annotations: Vec<AuditAnnotation>,

    /// One sequence of match conditions per webhook entry
    pub webhook_match_conditions: Vec<Vec<NamedExpression>>,
}

/// The resource kinds a [`PolicyDocument`] can be read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    ValidatingAdmissionPolicy,
    ValidatingWebhookConfiguration,
    MutatingWebhookConfiguration,
}

impl DocumentKind {
    fn recognize(api_version: &str, kind: &str) -> Option<Self> {
        let (group, version) = api_version.split_once('/')?;
        if group != ADMISSION_GROUP {
            return None;
        }

        match (kind, version) {
            ("ValidatingAdmissionPolicy", "v1" | "v1beta1" | "v1alpha1") => Some(Self::ValidatingAdmissionPolicy),
            ("ValidatingWebhookConfiguration", "v1" | "v1beta1") => Some(Self::ValidatingWebhookConfiguration),
            ("MutatingWebhookConfiguration", "v1" | "v1beta1") => Some(Self::MutatingWebhookConfiguration),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_webhook(self) -> bool {
        matches!(self, Self::ValidatingWebhookConfiguration | Self::MutatingWebhookConfiguration)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    #[serde(default)]
    api_version: String,

    #[serde(default)]
    kind: String,

    #[serde(default)]
    metadata: Metadata,

    #[serde(default)]
    spec: PolicySpec,

    #[serde(default)]
    webhooks: Vec<Webhook>,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    name: String,

    #[serde(default)]
    namespace: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicySpec {
    #[serde(default)]
    variables: Vec<NamedExpression>,

    #[serde(default)]
    validations: Vec<Validation>,

    #[serde(default)]
    match_conditions: Vec<NamedExpression>,

    #[serde(default)]
    audit_annotations: Vec<AuditAnnotation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Webhook {
    #[serde(default)]
    match_conditions: Vec<NamedExpression>,
}

impl PolicyDocument {
    /// Parse a policy or webhook configuration from YAML or JSON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid document or names a kind
    /// this tool does not evaluate
    pub fn parse(text: &str) -> Result<(DocumentKind, Self)> {
        let manifest: Manifest = serde_yaml::from_str(text).into_app_err("failed to decode the policy document")?;

        let Some(kind) = DocumentKind::recognize(&manifest.api_version, &manifest.kind) else {
            return Err(app_err!(
                "expected ValidatingAdmissionPolicy or a webhook configuration, received '{}' in '{}'",
                manifest.kind,
                manifest.api_version
            ));
        };

        let document = Self {
            name: manifest.metadata.name,
            namespace: manifest.metadata.namespace,
            variables: manifest.spec.variables,
            validations: manifest.spec.validations,
            match_conditions: manifest.spec.match_conditions,
            audit_annotations: manifest.spec.audit_annotations,
            webhook_match_conditions: manifest.webhooks.into_iter().map(|w| w.match_conditions).collect(),
        };

        Ok((kind, document))
    }

    /// Parse a `ValidatingAdmissionPolicy`
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid policy
    pub fn parse_policy(text: &str) -> Result<Self> {
        match Self::parse(text)? {
            (DocumentKind::ValidatingAdmissionPolicy, document) => Ok(document),
            (kind, _) => Err(app_err!("expected ValidatingAdmissionPolicy, received {kind:?}")),
        }
    }

    /// Parse a validating or mutating webhook configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid webhook configuration
    pub fn parse_webhook(text: &str) -> Result<Self> {
        match Self::parse(text)? {
            (kind, document) if kind.is_webhook() => Ok(document),
            (kind, _) => Err(app_err!("expected a webhook configuration, received {kind:?}")),
        }
    }
}

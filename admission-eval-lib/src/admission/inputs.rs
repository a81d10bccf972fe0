use super::{AdmissionRequest, Namespace};
use crate::Result;
use crate::authz::AuthorizerTable;
use ohno::{IntoAppError, app_err};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// The serialized context documents supplied with a policy or webhook
///
/// Every document is optional; an empty document counts as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Documents<'a> {
    pub old_object: Option<&'a str>,
    pub object: Option<&'a str>,
    pub namespace: Option<&'a str>,
    pub request: Option<&'a str>,
    pub authorizer: Option<&'a str>,
}

/// Decoded context documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    pub old_object: Option<JsonValue>,
    pub object: Option<JsonValue>,
    pub namespace: Option<JsonValue>,
    pub request: Option<JsonValue>,
    pub authorizer: Option<AuthorizerTable>,
}

impl Inputs {
    /// Decode a set of context documents
    ///
    /// # Errors
    ///
    /// Returns an error naming the first document that cannot be decoded
    pub fn parse(documents: &Documents<'_>) -> Result<Self> {
        Ok(Self {
            old_object: decode_object(documents.old_object, "the old resource value")?,
            object: decode_object(documents.object, "the new resource value")?,
            namespace: decode_normalized::<Namespace>(documents.namespace, "the namespace")?,
            request: decode_normalized::<AdmissionRequest>(documents.request, "the request")?,
            authorizer: decode::<AuthorizerTable>(documents.authorizer, "the authorizer")?,
        })
    }
}

fn decode<T: DeserializeOwned>(text: Option<&str>, what: &str) -> Result<Option<T>> {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return Ok(None);
    };

    let value: serde_yaml::Value = serde_yaml::from_str(text).into_app_err_with(|| format!("failed to decode input for {what}"))?;
    if value.is_null() {
        return Ok(None);
    }

    serde_yaml::from_value(value)
        .map(Some)
        .into_app_err_with(|| format!("failed to decode input for {what}"))
}

fn decode_object(text: Option<&str>, what: &str) -> Result<Option<JsonValue>> {
    match decode::<JsonValue>(text, what)? {
        Some(JsonValue::Object(fields)) => Ok(Some(JsonValue::Object(fields))),
        None => Ok(None),
        Some(_) => Err(app_err!("failed to decode input for {what}: expected a mapping")),
    }
}

/// Decode through a typed model so only the fields the model knows reach expressions
fn decode_normalized<T: DeserializeOwned + Serialize>(text: Option<&str>, what: &str) -> Result<Option<JsonValue>> {
    decode::<T>(text, what)?
        .map(|typed| serde_json::to_value(typed).into_app_err_with(|| format!("failed to normalize {what}")))
        .transpose()
}

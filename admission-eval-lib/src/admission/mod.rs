//! Admission documents
//!
//! Policies and webhook configurations are read into a [`PolicyDocument`]
//! holding just their expressions. The context documents (objects, request,
//! namespace and authorizer table) are decoded into [`Inputs`]. The request and
//! namespace pass through typed models and are re-encoded, so expressions see
//! the fields Kubernetes exposes and nothing else.

mod inputs;
mod namespace;
mod policy_document;
mod request;

pub use inputs::{Documents, Inputs};
pub use namespace::{Namespace, NamespaceCondition, NamespaceMetadata, NamespaceSpec, NamespaceStatus};
pub use policy_document::{AuditAnnotation, DocumentKind, NamedExpression, PolicyDocument, Validation};
pub use request::{AdmissionRequest, GroupVersionKind, GroupVersionResource, UserInfo};

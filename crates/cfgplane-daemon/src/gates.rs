//! Gates consulted before config operations
//!
//! Authorization, schema validation and namespace existence are owned by
//! external services. The daemon only needs a yes/no answer from each, so
//! each one is a trait with an allow-all default for development.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use cfgplane_types::{ConfigId, ConfigKind, Org};
use std::convert::Infallible;
use std::fmt;

/// Identity of the API caller, taken from the `Authorization` header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub token: Option<String>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty());
        Ok(Caller { token })
    }
}

/// Permissions checked by the config services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ConfigGet,
    ConfigPut,
    NamespacePut,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ConfigGet => "config.get",
            Permission::ConfigPut => "config.put",
            Permission::NamespacePut => "namespace.put",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource identifiers as understood by the authorizer
pub mod resource {
    use super::*;

    pub fn namespace(org: &Org, namespace: &str) -> String {
        format!("{org}/{namespace}")
    }

    pub fn config(kind: ConfigKind, id: &ConfigId) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            kind.key_prefix(),
            id.org,
            id.namespace,
            id.name,
            id.version
        )
    }
}

/// Authorization decision point
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, caller: &Caller, permission: Permission, resource: &str) -> bool;

    /// Get the authorizer name
    fn name(&self) -> &str;
}

/// Authorizer that grants every request
pub struct AllowAllAuthorizer;

#[async_trait]
impl Authorizer for AllowAllAuthorizer {
    async fn authorize(&self, _caller: &Caller, _permission: Permission, _resource: &str) -> bool {
        true
    }

    fn name(&self) -> &str {
        "allow-all"
    }
}

/// Reference to a schema registered with the validator
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SchemaRef {
    pub name: String,
    pub version: String,
}

/// External schema validation.
///
/// `Ok(false)` is a negative verdict; `Err` means the validator itself
/// could not be consulted.
#[async_trait]
pub trait SchemaValidator: Send + Sync {
    async fn validate(&self, org: &Org, schema: &SchemaRef, document: &str) -> anyhow::Result<bool>;
}

/// Validator that accepts every document
pub struct AcceptAllValidator;

#[async_trait]
impl SchemaValidator for AcceptAllValidator {
    async fn validate(&self, _org: &Org, _schema: &SchemaRef, _document: &str) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Namespace existence lookups
#[async_trait]
pub trait NamespaceRegistry: Send + Sync {
    async fn exists(&self, org: &Org, namespace: &str) -> anyhow::Result<bool>;
}

/// Registry in which every namespace exists
pub struct OpenNamespaces;

#[async_trait]
impl NamespaceRegistry for OpenNamespaces {
    async fn exists(&self, _org: &Org, _namespace: &str) -> anyhow::Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn caller_from(header: Option<&str>) -> Caller {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Caller::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_caller_extraction() {
        assert_eq!(caller_from(Some("Bearer abc")).await, Caller::with_token("abc"));
        assert_eq!(caller_from(Some("abc")).await, Caller::with_token("abc"));
        assert_eq!(caller_from(Some("Bearer ")).await, Caller::anonymous());
        assert_eq!(caller_from(None).await, Caller::anonymous());
    }

    #[test]
    fn test_resource_ids() {
        let id = ConfigId::new("acme", "prod", "svc", "v1");
        assert_eq!(resource::namespace(&id.org, "prod"), "acme/prod");
        assert_eq!(
            resource::config(ConfigKind::Group, &id),
            "groups/acme/prod/svc/v1"
        );
    }
}

//! Actor profile returned by the identity/authorization service

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One `{method, service}` grant on a resource path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthzGrant {
    /// Action granted, e.g. `create`, `read-storage`, or `*`
    pub method: String,
    /// Service the grant applies to; `*` for any
    pub service: String,
}

impl AuthzGrant {
    /// Creates a grant
    pub fn new(method: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            service: service.into(),
        }
    }

    /// Whether this grant allows `action` on every service
    pub fn allows(&self, action: &str) -> bool {
        (self.method == action || self.method == "*") && self.service == "*"
    }
}

/// Resources and policies of the acting principal
///
/// Read-only input to the authorization gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorProfile {
    /// Principal e-mail / user name
    #[serde(default, alias = "username")]
    pub email: Option<String>,

    /// Resource paths visible to the principal
    #[serde(default)]
    pub resources: Vec<String>,

    /// Grants keyed by resource path
    #[serde(default)]
    pub authz: BTreeMap<String, Vec<AuthzGrant>>,
}

impl ActorProfile {
    /// Creates an empty profile for `email`
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Default::default()
        }
    }

    /// Adds a visible resource path
    pub fn with_resource(mut self, path: impl Into<String>) -> Self {
        self.resources.push(path.into());
        self
    }

    /// Adds a grant on `path`
    pub fn with_grant(mut self, path: impl Into<String>, grant: AuthzGrant) -> Self {
        self.authz.entry(path.into()).or_default().push(grant);
        self
    }
}

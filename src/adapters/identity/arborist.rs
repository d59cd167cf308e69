//! Identity provider backed by the commons user endpoint

use super::IdentityProvider;
use crate::adapters::http::{check_status, connection_error, read_json, HttpClient};
use crate::config::SecretString;
use crate::domain::{ActorProfile, EtlError, Result, StoreError, StoreKind};
use async_trait::async_trait;
use reqwest::Method;
use secrecy::ExposeSecret;

const USER_PATH: &str = "/user/user";

/// Reads the actor profile from `GET /user/user`
pub struct ArboristIdentity {
    http: HttpClient,
}

impl ArboristIdentity {
    /// Creates a provider over `http`
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl IdentityProvider for ArboristIdentity {
    async fn actor_profile(&self, token: &SecretString) -> Result<ActorProfile> {
        if token.expose_secret().is_blank() {
            return Err(EtlError::Authentication("access token is empty".to_string()));
        }

        let response = self
            .http
            .retry_request(|| async {
                let response = self
                    .http
                    .request_url(Method::GET, &self.http.url(USER_PATH))
                    .header("Authorization", token.expose_secret().bearer())
                    .send()
                    .await
                    .map_err(|e| connection_error(StoreKind::Identity, e))?;
                check_status(StoreKind::Identity, response).await
            })
            .await
            .map_err(|e| match e {
                EtlError::Store(StoreError::UnexpectedStatus {
                    status: 401 | 403,
                    message,
                    ..
                }) => EtlError::Authentication(format!("token rejected: {message}")),
                other => other,
            })?;

        let profile: ActorProfile = read_json(StoreKind::Identity, response).await?;
        tracing::debug!(
            user = profile.email.as_deref().unwrap_or("<unknown>"),
            resources = profile.resources.len(),
            "Resolved actor profile"
        );
        Ok(profile)
    }
}

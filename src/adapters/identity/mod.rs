//! Identity provider: resolves an access token to the actor's profile

pub mod arborist;
pub mod memory;

pub use arborist::ArboristIdentity;
pub use memory::MemoryIdentity;

use crate::config::SecretString;
use crate::domain::{ActorProfile, Result};
use async_trait::async_trait;

/// Source of the acting principal's resources and grants
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the profile of the principal owning `token`
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::EtlError::Authentication`] if the token is rejected,
    /// or a store error if the service cannot be reached.
    async fn actor_profile(&self, token: &SecretString) -> Result<ActorProfile>;
}

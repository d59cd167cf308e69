//! In-memory identity provider

use super::IdentityProvider;
use crate::adapters::memory::CallRecorder;
use crate::config::SecretString;
use crate::domain::{ActorProfile, EtlError, Result};
use async_trait::async_trait;

/// Returns a fixed profile, or a fixed authentication failure
pub struct MemoryIdentity {
    profile: Option<ActorProfile>,
    recorder: CallRecorder,
}

impl MemoryIdentity {
    /// Provider that always resolves to `profile`
    pub fn new(profile: ActorProfile) -> Self {
        Self {
            profile: Some(profile),
            recorder: CallRecorder::new(),
        }
    }

    /// Provider that rejects every token
    pub fn rejecting() -> Self {
        Self {
            profile: None,
            recorder: CallRecorder::new(),
        }
    }

    /// Records calls into `recorder`
    pub fn with_recorder(mut self, recorder: CallRecorder) -> Self {
        self.recorder = recorder;
        self
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn actor_profile(&self, _token: &SecretString) -> Result<ActorProfile> {
        self.recorder.record("identity.actor_profile").await;
        self.profile
            .clone()
            .ok_or_else(|| EtlError::Authentication("token rejected".to_string()))
    }
}

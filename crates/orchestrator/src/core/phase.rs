//! Phase trait and the state threaded through a run.
//!
//! Each protocol phase (handshake, authentication, token issuance, resource
//! access) implements [`DemoPhase`]. Outputs a later phase depends on are
//! stored in [`RunArtifacts`] on the shared [`RunContext`].

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::collaborators::{Collaborators, KeyPair, SessionKeys};
use crate::error::{DemoError, Result};
use crate::keys::ServerKeyMaterial;

use super::events::DemoEmitter;
use super::pacing::{Beat, Pacing};

/// Static description of a phase: its position, display name and metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDescriptor {
    /// 1-based position in the fixed phase order
    pub index: u8,
    pub name: &'static str,
    pub details: &'static [(&'static str, &'static str)],
}

impl PhaseDescriptor {
    pub fn details_map(&self) -> BTreeMap<String, String> {
        self.details
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

/// Values produced by one phase and consumed by a later one.
#[derive(Debug, Default)]
pub struct RunArtifacts {
    /// Agreed session keys from the handshake
    pub session: Option<SessionKeys>,
    /// Client-held key the issued token is bound to
    pub client_ephemeral: Option<KeyPair>,
    /// Code returned by the authorization request, redeemed in phase 3
    pub authorization_code: Option<String>,
    pub access_token: Option<String>,
}

impl RunArtifacts {
    pub fn session(&self) -> Result<&SessionKeys> {
        self.session
            .as_ref()
            .ok_or(DemoError::MissingArtifact("session keys"))
    }

    pub fn client_ephemeral(&self) -> Result<&KeyPair> {
        self.client_ephemeral
            .as_ref()
            .ok_or(DemoError::MissingArtifact("client ephemeral keypair"))
    }

    pub fn authorization_code(&self) -> Result<&str> {
        self.authorization_code
            .as_deref()
            .ok_or(DemoError::MissingArtifact("authorization code"))
    }

    pub fn access_token(&self) -> Result<&str> {
        self.access_token
            .as_deref()
            .ok_or(DemoError::MissingArtifact("access token"))
    }
}

/// Everything a phase needs while it runs.
pub struct RunContext {
    pub collaborators: Collaborators,
    pub keys: ServerKeyMaterial,
    pub emitter: DemoEmitter,
    pub pacing: Pacing,
    pub artifacts: RunArtifacts,
}

impl RunContext {
    pub fn new(
        collaborators: Collaborators,
        keys: ServerKeyMaterial,
        emitter: DemoEmitter,
        pacing: Pacing,
    ) -> Self {
        Self {
            collaborators,
            keys,
            emitter,
            pacing,
            artifacts: RunArtifacts::default(),
        }
    }

    /// Pause for presentation pacing.
    pub async fn beat(&self, beat: Beat) {
        self.pacing.wait(beat).await;
    }
}

/// A step of the demonstrated protocol flow.
///
/// `execute` narrates through `ctx.emitter`, delegates the actual work to the
/// collaborators and returns [`DemoError::ValidationFailed`] when its success
/// check does not hold. Boundary events are emitted by the sequencer.
#[async_trait]
pub trait DemoPhase: Send + Sync {
    fn descriptor(&self) -> &'static PhaseDescriptor;

    async fn execute(&self, ctx: &mut RunContext) -> Result<()>;
}

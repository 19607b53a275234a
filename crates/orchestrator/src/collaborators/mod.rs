//! Interfaces to the protocol primitives invoked by the demo phases.
//!
//! The orchestrator treats every collaborator as a black box returning byte
//! sequences or small structured values. [`simulated`] provides hash-based
//! stand-ins so the demo runs without the real post-quantum stack.

pub mod simulated;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CollaboratorError(String);

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type CollabResult<T> = std::result::Result<T, CollaboratorError>;

/// Public/secret key pair as opaque bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub public: Vec<u8>,
    pub secret: Vec<u8>,
}

impl KeyPair {
    pub fn new(public: Vec<u8>, secret: Vec<u8>) -> Self {
        Self { public, secret }
    }

    pub fn is_empty(&self) -> bool {
        self.public.is_empty() || self.secret.is_empty()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_len", &self.public.len())
            .field("secret_len", &self.secret.len())
            .finish()
    }
}

/// Keys agreed by a completed handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKeys {
    pub session_key: Vec<u8>,
    pub session_id: String,
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field("session_key_len", &self.session_key.len())
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// Server side of the transport handshake.
pub trait HandshakeServer: Send {
    /// Produce the server hello using the long-term KEM keys.
    fn initiate(&mut self, longterm: &KeyPair) -> CollabResult<Vec<u8>>;

    /// Consume the client key exchange and derive the session keys.
    fn finalize(&mut self, client_exchange: &[u8]) -> CollabResult<SessionKeys>;
}

/// Client side of the transport handshake.
pub trait HandshakeClient: Send {
    /// Process the server hello and produce the client key exchange.
    fn respond(&mut self, server_hello: &[u8], trusted_longterm_pk: &[u8])
        -> CollabResult<Vec<u8>>;

    /// Session keys derived by the client during `respond`.
    fn session_keys(&self) -> CollabResult<SessionKeys>;
}

/// Creates a fresh client/server endpoint pair per run.
pub trait HandshakeFactory: Send + Sync {
    fn endpoints(&self) -> (Box<dyn HandshakeClient>, Box<dyn HandshakeServer>);
}

pub trait SigningKeyGenerator: Send + Sync {
    fn generate_keypair(&self) -> CollabResult<KeyPair>;
}

/// Relying-party registration used to build authorization requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRegistration {
    pub client_id: String,
    pub redirect_uri: String,
    pub auth_server_url: String,
}

pub trait AuthorizationClient: Send + Sync {
    /// Build the authorization request URL for the interactive flow.
    fn build_authorization_request(
        &self,
        registration: &ClientRegistration,
        scope: &str,
        nonce: &str,
    ) -> CollabResult<String>;
}

/// Identity-token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub nonce: String,
    pub email: String,
    pub name: String,
}

pub trait TokenIssuer: Send + Sync {
    /// Sign `claims` with the issuer keys, binding the token to `subject_binding_key`.
    fn issue(
        &self,
        claims: &TokenClaims,
        issuer: &KeyPair,
        subject_binding_key: &[u8],
    ) -> CollabResult<Vec<u8>>;

    /// Check the token signature against the issuer public key.
    fn verify(&self, token: &[u8], issuer_public: &[u8]) -> CollabResult<bool>;
}

/// Challenge sent by the resource server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub nonce: String,
    pub session_id: String,
    pub issued_at: i64,
}

pub trait ProofOfPossession: Send + Sync {
    fn generate_challenge(&self, session_id: &str) -> CollabResult<Challenge>;

    fn create_proof(
        &self,
        challenge: &Challenge,
        token: &str,
        subject_secret: &[u8],
    ) -> CollabResult<Vec<u8>>;

    fn verify(
        &self,
        challenge: &Challenge,
        proof: &[u8],
        subject_public: &[u8],
        token: &str,
    ) -> CollabResult<bool>;
}

/// The full set of collaborators used by a run.
#[derive(Clone)]
pub struct Collaborators {
    pub handshake: Arc<dyn HandshakeFactory>,
    pub signer: Arc<dyn SigningKeyGenerator>,
    pub authorization: Arc<dyn AuthorizationClient>,
    pub issuer: Arc<dyn TokenIssuer>,
    pub pop: Arc<dyn ProofOfPossession>,
}

impl Collaborators {
    /// Hash-based stand-ins for every collaborator.
    pub fn simulated() -> Self {
        Self {
            handshake: Arc::new(simulated::SimulatedHandshake),
            signer: Arc::new(simulated::SimulatedSigner),
            authorization: Arc::new(simulated::SimulatedAuthorization),
            issuer: Arc::new(simulated::SimulatedTokenIssuer),
            pop: Arc::new(simulated::SimulatedProofOfPossession),
        }
    }

    pub fn with_handshake(mut self, handshake: Arc<dyn HandshakeFactory>) -> Self {
        self.handshake = handshake;
        self
    }

    pub fn with_signer(mut self, signer: Arc<dyn SigningKeyGenerator>) -> Self {
        self.signer = signer;
        self
    }

    pub fn with_authorization(mut self, authorization: Arc<dyn AuthorizationClient>) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn with_issuer(mut self, issuer: Arc<dyn TokenIssuer>) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn with_pop(mut self, pop: Arc<dyn ProofOfPossession>) -> Self {
        self.pop = pop;
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::simulated()
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

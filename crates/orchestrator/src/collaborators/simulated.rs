//! Hash-based stand-ins for the protocol collaborators.
//!
//! These exist so the demo can be driven end to end without the real KEM,
//! signature and token libraries. They are NOT cryptography: signatures are
//! SHA-256 digests keyed by the public key, and anyone holding a public key
//! can produce them. Randomness comes from UUIDv4.

use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{
    AuthorizationClient, Challenge, ClientRegistration, CollabResult, CollaboratorError,
    HandshakeClient, HandshakeFactory, HandshakeServer, KeyPair, ProofOfPossession, SessionKeys,
    SigningKeyGenerator, TokenClaims, TokenIssuer,
};
use crate::keys::ServerKeyMaterial;

const EPHEMERAL_LEN: usize = 32;

fn random_bytes(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len + 16);
    while out.len() < len {
        out.extend_from_slice(Uuid::new_v4().as_bytes());
    }
    out.truncate(len);
    out
}

/// Length-prefixed SHA-256 over all parts.
fn digest(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

fn public_from_secret(secret: &[u8]) -> Vec<u8> {
    digest(&[b"public-key".as_slice(), secret])
}

fn sign(public: &[u8], message: &[u8]) -> Vec<u8> {
    digest(&[b"signature".as_slice(), public, message])
}

fn derive_session(server_ephemeral: &[u8], client_secret: &[u8]) -> SessionKeys {
    let session_key = digest(&[b"session-key".as_slice(), server_ephemeral, client_secret]);
    let id = digest(&[b"session-id".as_slice(), server_ephemeral, client_secret]);
    SessionKeys {
        session_key,
        session_id: format!("session_{}", hex::encode(&id[..8])),
    }
}

/// Fresh simulated long-term server keys.
pub fn generate_server_keys() -> ServerKeyMaterial {
    let kem_secret = random_bytes(64);
    let signing_secret = random_bytes(EPHEMERAL_LEN);
    ServerKeyMaterial {
        kem: KeyPair::new(public_from_secret(&kem_secret), kem_secret),
        signing: KeyPair::new(public_from_secret(&signing_secret), signing_secret),
    }
}

pub struct SimulatedHandshake;

impl HandshakeFactory for SimulatedHandshake {
    fn endpoints(&self) -> (Box<dyn HandshakeClient>, Box<dyn HandshakeServer>) {
        (
            Box::new(SimulatedHandshakeClient::default()),
            Box::new(SimulatedHandshakeServer::default()),
        )
    }
}

#[derive(Default)]
pub struct SimulatedHandshakeServer {
    ephemeral: Option<Vec<u8>>,
}

impl HandshakeServer for SimulatedHandshakeServer {
    fn initiate(&mut self, longterm: &KeyPair) -> CollabResult<Vec<u8>> {
        if longterm.is_empty() {
            return Err(CollaboratorError::new("long-term key pair is empty"));
        }

        let ephemeral = random_bytes(EPHEMERAL_LEN);
        let mut hello = ephemeral.clone();
        hello.extend(digest(&[longterm.public.as_slice()]));
        self.ephemeral = Some(ephemeral);
        Ok(hello)
    }

    fn finalize(&mut self, client_exchange: &[u8]) -> CollabResult<SessionKeys> {
        let ephemeral = self
            .ephemeral
            .as_ref()
            .ok_or_else(|| CollaboratorError::new("finalize called before initiate"))?;
        Ok(derive_session(ephemeral, client_exchange))
    }
}

#[derive(Default)]
pub struct SimulatedHandshakeClient {
    keys: Option<SessionKeys>,
}

impl HandshakeClient for SimulatedHandshakeClient {
    fn respond(
        &mut self,
        server_hello: &[u8],
        trusted_longterm_pk: &[u8],
    ) -> CollabResult<Vec<u8>> {
        if server_hello.len() != EPHEMERAL_LEN * 2 {
            return Err(CollaboratorError::new(format!(
                "malformed server hello ({} bytes)",
                server_hello.len()
            )));
        }

        let (ephemeral, fingerprint) = server_hello.split_at(EPHEMERAL_LEN);
        if fingerprint != digest(&[trusted_longterm_pk]).as_slice() {
            return Err(CollaboratorError::new("server long-term key is not trusted"));
        }

        let secret = random_bytes(EPHEMERAL_LEN);
        self.keys = Some(derive_session(ephemeral, &secret));
        Ok(secret)
    }

    fn session_keys(&self) -> CollabResult<SessionKeys> {
        self.keys
            .clone()
            .ok_or_else(|| CollaboratorError::new("handshake not completed"))
    }
}

pub struct SimulatedSigner;

impl SigningKeyGenerator for SimulatedSigner {
    fn generate_keypair(&self) -> CollabResult<KeyPair> {
        let secret = random_bytes(EPHEMERAL_LEN);
        Ok(KeyPair::new(public_from_secret(&secret), secret))
    }
}

pub struct SimulatedAuthorization;

impl AuthorizationClient for SimulatedAuthorization {
    fn build_authorization_request(
        &self,
        registration: &ClientRegistration,
        scope: &str,
        nonce: &str,
    ) -> CollabResult<String> {
        if registration.client_id.is_empty() {
            return Err(CollaboratorError::new("client_id is required"));
        }

        Ok(format!(
            "{}/authorize?response_type=code&client_id={}&redirect_uri={}&scope={}&nonce={}",
            registration.auth_server_url.trim_end_matches('/'),
            urlencoding::encode(&registration.client_id),
            urlencoding::encode(&registration.redirect_uri),
            urlencoding::encode(scope),
            urlencoding::encode(nonce),
        ))
    }
}

pub struct SimulatedTokenIssuer;

impl TokenIssuer for SimulatedTokenIssuer {
    fn issue(
        &self,
        claims: &TokenClaims,
        issuer: &KeyPair,
        subject_binding_key: &[u8],
    ) -> CollabResult<Vec<u8>> {
        if issuer.is_empty() {
            return Err(CollaboratorError::new("issuer key pair is empty"));
        }

        let header = json!({ "alg": "DILITHIUM3-SIM", "typ": "JWT" });
        let mut payload = serde_json::to_value(claims)
            .map_err(|e| CollaboratorError::new(format!("invalid claims: {}", e)))?;
        payload["cnf"] = json!({ "key": hex::encode(subject_binding_key) });

        let signing_input = format!(
            "{}.{}",
            hex::encode(header.to_string()),
            hex::encode(payload.to_string())
        );
        let signature = sign(&issuer.public, signing_input.as_bytes());

        Ok(format!("{}.{}", signing_input, hex::encode(signature)).into_bytes())
    }

    fn verify(&self, token: &[u8], issuer_public: &[u8]) -> CollabResult<bool> {
        let Ok(token) = std::str::from_utf8(token) else {
            return Ok(false);
        };
        let Some((signing_input, signature_hex)) = token.rsplit_once('.') else {
            return Ok(false);
        };
        let Ok(signature) = hex::decode(signature_hex) else {
            return Ok(false);
        };

        Ok(signature == sign(issuer_public, signing_input.as_bytes()))
    }
}

pub struct SimulatedProofOfPossession;

impl SimulatedProofOfPossession {
    fn proof_input(challenge: &Challenge, token: &str) -> Vec<u8> {
        format!("{}|{}|{}", challenge.nonce, challenge.session_id, token).into_bytes()
    }
}

impl ProofOfPossession for SimulatedProofOfPossession {
    fn generate_challenge(&self, session_id: &str) -> CollabResult<Challenge> {
        Ok(Challenge {
            nonce: hex::encode(random_bytes(EPHEMERAL_LEN)),
            session_id: session_id.to_string(),
            issued_at: Utc::now().timestamp(),
        })
    }

    fn create_proof(
        &self,
        challenge: &Challenge,
        token: &str,
        subject_secret: &[u8],
    ) -> CollabResult<Vec<u8>> {
        if subject_secret.is_empty() {
            return Err(CollaboratorError::new("subject secret key is empty"));
        }

        let public = public_from_secret(subject_secret);
        let signature = sign(&public, &Self::proof_input(challenge, token));
        Ok(hex::encode(signature).into_bytes())
    }

    fn verify(
        &self,
        challenge: &Challenge,
        proof: &[u8],
        subject_public: &[u8],
        token: &str,
    ) -> CollabResult<bool> {
        let expected = hex::encode(sign(subject_public, &Self::proof_input(challenge, token)));
        Ok(proof == expected.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> TokenClaims {
        TokenClaims {
            iss: "http://localhost:5000".to_string(),
            sub: "alice@example.com".to_string(),
            aud: "demo_client".to_string(),
            exp: 2_000_000_000,
            iat: 1_900_000_000,
            nonce: "demo_nonce_12345".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice Smith".to_string(),
        }
    }

    #[test]
    fn test_handshake_agrees_on_keys() {
        let keys = generate_server_keys();
        let (mut client, mut server) = SimulatedHandshake.endpoints();

        let hello = server.initiate(&keys.kem).unwrap();
        let exchange = client.respond(&hello, &keys.kem.public).unwrap();
        let server_keys = server.finalize(&exchange).unwrap();

        assert_eq!(server_keys, client.session_keys().unwrap());
        assert_eq!(server_keys.session_key.len(), 32);
        assert!(server_keys.session_id.starts_with("session_"));
    }

    #[test]
    fn test_handshake_rejects_untrusted_server() {
        let keys = generate_server_keys();
        let other = generate_server_keys();
        let (mut client, mut server) = SimulatedHandshake.endpoints();

        let hello = server.initiate(&keys.kem).unwrap();
        let err = client.respond(&hello, &other.kem.public).unwrap_err();
        assert!(err.to_string().contains("not trusted"));
    }

    #[test]
    fn test_finalize_before_initiate_fails() {
        let mut server = SimulatedHandshakeServer::default();
        assert!(server.finalize(b"exchange").is_err());
    }

    #[test]
    fn test_token_verifies_against_issuer_key() {
        let keys = generate_server_keys();
        let binding = SimulatedSigner.generate_keypair().unwrap();

        let token = SimulatedTokenIssuer
            .issue(&claims(), &keys.signing, &binding.public)
            .unwrap();

        assert!(SimulatedTokenIssuer
            .verify(&token, &keys.signing.public)
            .unwrap());
        assert!(!SimulatedTokenIssuer
            .verify(&token, &generate_server_keys().signing.public)
            .unwrap());
    }

    #[test]
    fn test_tampered_token_fails_verification() {
        let keys = generate_server_keys();
        let mut token = SimulatedTokenIssuer
            .issue(&claims(), &keys.signing, b"binding")
            .unwrap();
        token[0] = if token[0] == b'7' { b'8' } else { b'7' };

        assert!(!SimulatedTokenIssuer
            .verify(&token, &keys.signing.public)
            .unwrap());
        assert!(!SimulatedTokenIssuer
            .verify(b"not-a-token", &keys.signing.public)
            .unwrap());
    }

    #[test]
    fn test_authorization_request_encodes_parameters() {
        let registration = ClientRegistration {
            client_id: "demo_client".to_string(),
            redirect_uri: "http://localhost:8080/callback".to_string(),
            auth_server_url: "http://localhost:5000/".to_string(),
        };

        let url = SimulatedAuthorization
            .build_authorization_request(&registration, "openid profile email", "n1")
            .unwrap();

        assert!(url.starts_with("http://localhost:5000/authorize?"));
        assert!(url.contains("scope=openid%20profile%20email"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcallback"));
        assert!(url.contains("nonce=n1"));
    }

    #[test]
    fn test_pop_proof_round() {
        let pop = SimulatedProofOfPossession;
        let client = SimulatedSigner.generate_keypair().unwrap();
        let challenge = pop.generate_challenge("session_abc").unwrap();

        let proof = pop
            .create_proof(&challenge, "ACCESS_TOKEN", &client.secret)
            .unwrap();

        assert!(pop
            .verify(&challenge, &proof, &client.public, "ACCESS_TOKEN")
            .unwrap());
        assert!(!pop
            .verify(&challenge, &proof, &client.public, "OTHER_TOKEN")
            .unwrap());

        let stranger = SimulatedSigner.generate_keypair().unwrap();
        assert!(!pop
            .verify(&challenge, &proof, &stranger.public, "ACCESS_TOKEN")
            .unwrap());
    }

    #[test]
    fn test_challenges_are_unique() {
        let pop = SimulatedProofOfPossession;
        let a = pop.generate_challenge("s").unwrap();
        let b = pop.generate_challenge("s").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_eq!(a.nonce.len(), 64);
    }
}

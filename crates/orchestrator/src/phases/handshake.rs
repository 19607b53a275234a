//! Phase 1: transport handshake.
//!
//! The server hello is built with the long-term KEM keys, the client checks it
//! against the trusted public key, and both sides derive session keys
//! independently. The phase succeeds only if the two derivations match.

use async_trait::async_trait;
use tracing::debug;

use crate::core::{Beat, DemoPhase, PhaseDescriptor, RunContext};
use crate::error::{DemoError, Result};

pub const DESCRIPTOR: PhaseDescriptor = PhaseDescriptor {
    index: 1,
    name: "KEMTLS Handshake",
    details: &[
        ("protocol", "KEMTLS with Kyber768"),
        ("security_level", "NIST Level 3"),
    ],
};

pub struct HandshakePhase;

#[async_trait]
impl DemoPhase for HandshakePhase {
    fn descriptor(&self) -> &'static PhaseDescriptor {
        &DESCRIPTOR
    }

    async fn execute(&self, ctx: &mut RunContext) -> Result<()> {
        let emitter = ctx.emitter.clone();

        emitter.info("[1/5] KEMTLS HANDSHAKE");
        emitter.info("Loading server long-term keys...");
        emitter.success(format!("✓ Server public key: {} bytes", ctx.keys.kem.public.len()));
        emitter.success(format!("✓ Server secret key: {} bytes", ctx.keys.kem.secret.len()));
        ctx.beat(Beat::Step).await;

        emitter.info("Initializing KEMTLS endpoints...");
        let (mut client, mut server) = ctx.collaborators.handshake.endpoints();
        emitter.success("✓ Client initialized");
        emitter.success("✓ Server initialized");
        ctx.beat(Beat::Step).await;

        emitter.info("[Server → Client] Sending Server Hello...");
        let server_hello = server
            .initiate(&ctx.keys.kem)
            .map_err(DemoError::collaborator("server hello"))?;
        emitter.success(format!("✓ Server Hello: {} bytes", server_hello.len()));
        ctx.beat(Beat::Exchange).await;

        emitter.info("[Client → Server] Processing Server Hello...");
        let client_exchange = client
            .respond(&server_hello, &ctx.keys.kem.public)
            .map_err(DemoError::collaborator("client key exchange"))?;
        emitter.success(format!("✓ Client Key Exchange: {} bytes", client_exchange.len()));
        ctx.beat(Beat::Exchange).await;

        emitter.info("[Server] Processing Client Key Exchange...");
        let server_keys = server
            .finalize(&client_exchange)
            .map_err(DemoError::collaborator("server key derivation"))?;
        let client_keys = client
            .session_keys()
            .map_err(DemoError::collaborator("client key derivation"))?;

        if server_keys != client_keys {
            return Err(DemoError::validation(
                DESCRIPTOR.index,
                "Key agreement failed",
                "Keys do not match",
            ));
        }

        emitter.success("✅ KEY AGREEMENT SUCCESSFUL");
        emitter.success(format!("   Session key: {} bytes", server_keys.session_key.len()));
        emitter.success(format!("   Session ID: {}", server_keys.session_id));
        debug!(session_id = %server_keys.session_id, "Session established");

        ctx.artifacts.session = Some(server_keys);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::collaborators::{
        CollabResult, Collaborators, HandshakeClient, HandshakeFactory, HandshakeServer, KeyPair,
        SessionKeys,
    };
    use crate::phases::test_support::{context, drain};
    use events::Event;

    /// Client and server that derive different session keys.
    struct DivergentHandshake;

    struct DivergentServer;
    struct DivergentClient;

    impl HandshakeServer for DivergentServer {
        fn initiate(&mut self, _longterm: &KeyPair) -> CollabResult<Vec<u8>> {
            Ok(vec![1; 8])
        }

        fn finalize(&mut self, _client_exchange: &[u8]) -> CollabResult<SessionKeys> {
            Ok(SessionKeys {
                session_key: vec![1; 32],
                session_id: "session_server".to_string(),
            })
        }
    }

    impl HandshakeClient for DivergentClient {
        fn respond(&mut self, _hello: &[u8], _trusted: &[u8]) -> CollabResult<Vec<u8>> {
            Ok(vec![2; 8])
        }

        fn session_keys(&self) -> CollabResult<SessionKeys> {
            Ok(SessionKeys {
                session_key: vec![2; 32],
                session_id: "session_client".to_string(),
            })
        }
    }

    impl HandshakeFactory for DivergentHandshake {
        fn endpoints(&self) -> (Box<dyn HandshakeClient>, Box<dyn HandshakeServer>) {
            (Box::new(DivergentClient), Box::new(DivergentServer))
        }
    }

    #[tokio::test]
    async fn test_handshake_agrees_session() {
        let (mut ctx, mut rx) = context(Collaborators::simulated());

        HandshakePhase.execute(&mut ctx).await.unwrap();

        let session = ctx.artifacts.session().unwrap();
        assert!(session.session_id.starts_with("session_"));
        assert!(drain(&mut rx).iter().any(|e| matches!(
            e,
            Event::Log { message, .. } if message.contains("KEY AGREEMENT SUCCESSFUL")
        )));
    }

    #[tokio::test]
    async fn test_mismatched_keys_fail_validation() {
        let collaborators =
            Collaborators::simulated().with_handshake(Arc::new(DivergentHandshake));
        let (mut ctx, _rx) = context(collaborators);

        let err = HandshakePhase.execute(&mut ctx).await.unwrap_err();

        assert_eq!(err.headline(), "Key agreement failed");
        assert_eq!(err.to_string(), "Keys do not match");
        assert!(ctx.artifacts.session.is_none());
    }

    #[tokio::test]
    async fn test_empty_longterm_keys_are_a_collaborator_failure() {
        let (mut ctx, _rx) = context(Collaborators::simulated());
        ctx.keys.kem = KeyPair::new(vec![], vec![]);

        let err = HandshakePhase.execute(&mut ctx).await.unwrap_err();
        assert!(matches!(
            err,
            DemoError::Collaborator {
                operation: "server hello",
                ..
            }
        ));
    }
}

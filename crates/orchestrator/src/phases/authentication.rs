//! Phase 2: OpenID Connect user authentication.

use async_trait::async_trait;
use uuid::Uuid;

use super::{preview, AUTH_SERVER_URL, CLIENT_ID, NONCE, REDIRECT_URI, SCOPE, SUBJECT};
use crate::collaborators::ClientRegistration;
use crate::core::{Beat, DemoPhase, PhaseDescriptor, RunContext};
use crate::error::{DemoError, Result};

pub const DESCRIPTOR: PhaseDescriptor = PhaseDescriptor {
    index: 2,
    name: "User Authentication",
    details: &[("protocol", "OpenID Connect"), ("client_id", CLIENT_ID)],
};

const CHECK: &str = "Authorization request failed";

/// Generates the client ephemeral key the tokens are bound to, then runs
/// the authorization request and (simulated) user consent.
pub struct AuthenticationPhase;

#[async_trait]
impl DemoPhase for AuthenticationPhase {
    fn descriptor(&self) -> &'static PhaseDescriptor {
        &DESCRIPTOR
    }

    async fn execute(&self, ctx: &mut RunContext) -> Result<()> {
        let emitter = ctx.emitter.clone();

        emitter.info("[2/5] USER AUTHENTICATION (OIDC)");
        emitter.info("Generating client ephemeral keypair for PoP...");
        let ephemeral = ctx
            .collaborators
            .signer
            .generate_keypair()
            .map_err(DemoError::collaborator("ephemeral keypair generation"))?;
        if ephemeral.is_empty() {
            return Err(DemoError::validation(
                DESCRIPTOR.index,
                CHECK,
                "Client ephemeral keypair is empty",
            ));
        }
        emitter.success(format!("✓ Public key: {} bytes", ephemeral.public.len()));
        emitter.success(format!("✓ Secret key: {} bytes", ephemeral.secret.len()));
        ctx.beat(Beat::Step).await;

        emitter.info("Initializing OIDC client...");
        let registration = ClientRegistration {
            client_id: CLIENT_ID.to_string(),
            redirect_uri: REDIRECT_URI.to_string(),
            auth_server_url: AUTH_SERVER_URL.to_string(),
        };
        emitter.success("✓ OIDC client configured");
        ctx.beat(Beat::Step).await;

        emitter.info("[Client → Auth Server] Authorization Request...");
        let url = ctx
            .collaborators
            .authorization
            .build_authorization_request(&registration, SCOPE, NONCE)
            .map_err(DemoError::collaborator("authorization request"))?;
        if url.trim().is_empty() {
            return Err(DemoError::validation(
                DESCRIPTOR.index,
                CHECK,
                "Authorization URL is empty",
            ));
        }
        emitter.success("✓ Authorization URL generated");
        ctx.beat(Beat::Step).await;

        emitter.info("[User] Login and consent...");
        emitter.info(format!("   👤 Username: {}", SUBJECT));
        emitter.success("   ✓ User grants permissions");
        ctx.beat(Beat::Step).await;

        let code = format!("AUTH_CODE_{}", Uuid::new_v4().simple());
        emitter.success("[Auth Server → Client] Authorization Response...");
        emitter.success(format!("✓ Authorization code: {}", preview(&code, 20)));

        ctx.artifacts.client_ephemeral = Some(ephemeral);
        ctx.artifacts.authorization_code = Some(code);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::collaborators::{
        AuthorizationClient, CollabResult, Collaborators, KeyPair, SigningKeyGenerator,
    };
    use crate::phases::test_support::context;

    struct EmptySigner;

    impl SigningKeyGenerator for EmptySigner {
        fn generate_keypair(&self) -> CollabResult<KeyPair> {
            Ok(KeyPair::new(vec![], vec![]))
        }
    }

    struct BlankAuthorization;

    impl AuthorizationClient for BlankAuthorization {
        fn build_authorization_request(
            &self,
            _registration: &ClientRegistration,
            _scope: &str,
            _nonce: &str,
        ) -> CollabResult<String> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_authentication_stores_artifacts() {
        let (mut ctx, _rx) = context(Collaborators::simulated());

        AuthenticationPhase.execute(&mut ctx).await.unwrap();

        assert!(!ctx.artifacts.client_ephemeral().unwrap().is_empty());
        let code = ctx.artifacts.authorization_code.as_deref().unwrap();
        assert!(code.starts_with("AUTH_CODE_"));
    }

    #[tokio::test]
    async fn test_empty_ephemeral_keypair_fails() {
        let collaborators = Collaborators::simulated().with_signer(Arc::new(EmptySigner));
        let (mut ctx, _rx) = context(collaborators);

        let err = AuthenticationPhase.execute(&mut ctx).await.unwrap_err();
        assert_eq!(err.headline(), CHECK);
        assert_eq!(err.phase(), Some(2));
    }

    #[tokio::test]
    async fn test_blank_authorization_url_fails() {
        let collaborators =
            Collaborators::simulated().with_authorization(Arc::new(BlankAuthorization));
        let (mut ctx, _rx) = context(collaborators);

        let err = AuthenticationPhase.execute(&mut ctx).await.unwrap_err();
        assert_eq!(err.headline(), CHECK);
        assert!(ctx.artifacts.authorization_code.is_none());
    }
}

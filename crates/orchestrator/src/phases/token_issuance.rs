//! Phase 3: signed token issuance.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{preview, AUTH_SERVER_URL, CLIENT_ID, NONCE, SUBJECT, SUBJECT_NAME, TOKEN_LIFETIME_SECS};
use crate::collaborators::TokenClaims;
use crate::core::{Beat, DemoPhase, PhaseDescriptor, RunContext};
use crate::error::{DemoError, Result};

pub const DESCRIPTOR: PhaseDescriptor = PhaseDescriptor {
    index: 3,
    name: "Token Issuance",
    details: &[
        ("algorithm", "ML-DSA-65 (Dilithium3)"),
        ("token_type", "JWT with PoP binding"),
    ],
};

/// Issues an ID token signed with the server signing key and bound to the
/// client ephemeral key from phase 2, then checks the signature.
pub struct TokenIssuancePhase;

fn claims() -> TokenClaims {
    let now = Utc::now().timestamp();
    TokenClaims {
        iss: AUTH_SERVER_URL.to_string(),
        sub: SUBJECT.to_string(),
        aud: CLIENT_ID.to_string(),
        exp: now + TOKEN_LIFETIME_SECS,
        iat: now,
        nonce: NONCE.to_string(),
        email: SUBJECT.to_string(),
        name: SUBJECT_NAME.to_string(),
    }
}

#[async_trait]
impl DemoPhase for TokenIssuancePhase {
    fn descriptor(&self) -> &'static PhaseDescriptor {
        &DESCRIPTOR
    }

    async fn execute(&self, ctx: &mut RunContext) -> Result<()> {
        let emitter = ctx.emitter.clone();
        let binding_key = ctx.artifacts.client_ephemeral()?.public.clone();
        let code = ctx.artifacts.authorization_code()?.to_string();

        emitter.info("[3/5] TOKEN ISSUANCE");
        emitter.info(format!(
            "[Client → Auth Server] Redeeming authorization code {}",
            preview(&code, 20)
        ));
        emitter.info("[Auth Server] Loading signing keys...");
        emitter.success(format!(
            "✓ Dilithium public key: {} bytes",
            ctx.keys.signing.public.len()
        ));
        emitter.success(format!(
            "✓ Dilithium secret key: {} bytes",
            ctx.keys.signing.secret.len()
        ));
        ctx.beat(Beat::Step).await;

        emitter.info("[Auth Server] Creating tokens...");
        let issuer = &ctx.collaborators.issuer;
        let id_token = issuer
            .issue(&claims(), &ctx.keys.signing, &binding_key)
            .map_err(DemoError::collaborator("token issuance"))?;

        let valid = issuer
            .verify(&id_token, &ctx.keys.signing.public)
            .map_err(DemoError::collaborator("token verification"))?;
        if !valid {
            return Err(DemoError::validation(
                DESCRIPTOR.index,
                "Token verification failed",
                "ID token signature is invalid",
            ));
        }

        emitter.success(format!("✓ ID Token created: {} bytes", id_token.len()));
        emitter.success("   - Algorithm: DILITHIUM3");
        emitter.success("   - PoP Binding: Client ephemeral key embedded");
        ctx.beat(Beat::Exchange).await;

        let access_token = format!("ACCESS_TOKEN_{}", Uuid::new_v4().simple());
        emitter.success(format!("✓ Access Token created: {} chars", access_token.len()));

        ctx.artifacts.authorization_code = None;
        ctx.artifacts.access_token = Some(access_token);
        Ok(())
    }
}

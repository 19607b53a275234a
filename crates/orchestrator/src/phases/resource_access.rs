//! Phase 4: resource access gated by proof of possession.

use async_trait::async_trait;

use super::{preview, SUBJECT};
use crate::core::{Beat, DemoPhase, PhaseDescriptor, RunContext};
use crate::error::{DemoError, Result};

pub const DESCRIPTOR: PhaseDescriptor = PhaseDescriptor {
    index: 4,
    name: "Resource Access",
    details: &[
        ("resource", "/api/userinfo"),
        ("pop_method", "Dilithium3 signature"),
    ],
};

pub struct ResourceAccessPhase;

#[async_trait]
impl DemoPhase for ResourceAccessPhase {
    fn descriptor(&self) -> &'static PhaseDescriptor {
        &DESCRIPTOR
    }

    async fn execute(&self, ctx: &mut RunContext) -> Result<()> {
        let emitter = ctx.emitter.clone();
        let session_id = ctx.artifacts.session()?.session_id.clone();
        let ephemeral = ctx.artifacts.client_ephemeral()?.clone();
        let access_token = ctx.artifacts.access_token()?.to_string();
        let pop = ctx.collaborators.pop.clone();

        emitter.info("[4/5] RESOURCE ACCESS (PoP)");
        emitter.info("[Client] Initializing PoP client...");
        emitter.success("✓ PoP client ready");
        ctx.beat(Beat::Step).await;

        emitter.info("[Client → Resource Server] GET /api/userinfo...");
        ctx.beat(Beat::Step).await;

        emitter.info("[Resource Server → Client] PoP Challenge...");
        let challenge = pop
            .generate_challenge(&session_id)
            .map_err(DemoError::collaborator("challenge generation"))?;
        emitter.success(format!("✓ Challenge nonce: {}", preview(&challenge.nonce, 30)));
        ctx.beat(Beat::Exchange).await;

        emitter.info("[Client] Generating PoP proof...");
        let proof = pop
            .create_proof(&challenge, &access_token, &ephemeral.secret)
            .map_err(DemoError::collaborator("proof creation"))?;
        emitter.success(format!("✓ Proof generated: {} chars", proof.len()));
        ctx.beat(Beat::Exchange).await;

        emitter.info("[Resource Server] Verifying PoP proof...");
        let valid = pop
            .verify(&challenge, &proof, &ephemeral.public, &access_token)
            .map_err(DemoError::collaborator("proof verification"))?;
        if !valid {
            return Err(DemoError::validation(
                DESCRIPTOR.index,
                "PoP verification failed",
                "Invalid proof",
            ));
        }

        emitter.success("✅ PoP VERIFICATION SUCCESSFUL");
        emitter.success("   - Client possesses correct ephemeral key");
        emitter.success("   - Token is valid and not replayed");
        ctx.beat(Beat::Exchange).await;

        emitter.success("[Resource Server → Client] User Info Response...");
        emitter.success("✓ Protected resource accessed:");
        emitter.success(format!(
            "   {{\"sub\": \"{}\", \"email\": \"{}\"}}",
            SUBJECT, SUBJECT
        ));
        Ok(())
    }
}

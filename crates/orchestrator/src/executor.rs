//! Demo run lifecycle.
//!
//! [`DemoOrchestrator::start`] acquires the run guard, announces the run and
//! returns immediately; the benchmark stage and the four phases run on a
//! background task. Whatever happens on that task, including a panic, ends in
//! exactly one terminal event (`demo_complete` or `error`) and the guard is
//! released afterwards.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use events::{DemoSummary, EventBus};
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::benchmark::BenchmarkRunner;
use crate::collaborators::Collaborators;
use crate::config::OrchestratorConfig;
use crate::core::{Beat, DemoEmitter, DemoPhase, Pacing, PhaseSequencer, RunContext};
use crate::error::{DemoError, Result, StartError};
use crate::keys::ServerKeyMaterial;
use crate::phases;
use crate::resources::RunGuard;

pub const SECURITY_LEVEL: &str = "NIST Level 3";
pub const ALGORITHMS: [&str; 2] = ["Kyber768", "ML-DSA-65/Dilithium3"];

/// Result of a run that got through every phase.
#[derive(Debug, Clone, PartialEq)]
pub struct RunCompletion {
    /// Seconds from the first phase preamble to the end of the closing narration
    pub total_time: f64,
    pub summary: DemoSummary,
}

/// Executes one demo run: benchmark stage, key loading, phases, closing
/// narration. Holds no per-run state, so one runner serves every run.
pub struct DemoRunner {
    keys_dir: PathBuf,
    benchmarks: BenchmarkRunner,
    pacing: Pacing,
    collaborators: Collaborators,
    phases: Vec<Box<dyn DemoPhase>>,
}

impl DemoRunner {
    pub fn new(config: OrchestratorConfig, collaborators: Collaborators) -> Self {
        let pacing = config.pacing.pacing();
        Self {
            keys_dir: config.keys.dir,
            benchmarks: BenchmarkRunner::new(config.benchmarks, pacing),
            pacing,
            collaborators,
            phases: phases::standard_sequence(),
        }
    }

    pub async fn run(&self, emitter: &DemoEmitter) -> Result<RunCompletion> {
        let results = self.benchmarks.run(emitter).await;
        debug!(metrics = results.len(), "Benchmark results ready");
        self.pacing.wait(Beat::StageGap).await;

        let started = Instant::now();
        emitter.info("=".repeat(70));
        emitter.info("POST-QUANTUM OIDC + KEMTLS");
        emitter.info("Complete End-to-End Demonstration");
        emitter.info("=".repeat(70));
        emitter.info("");

        let keys = ServerKeyMaterial::load(&self.keys_dir).await?;
        let mut ctx = RunContext::new(
            self.collaborators.clone(),
            keys,
            emitter.clone(),
            self.pacing,
        );

        PhaseSequencer::new(emitter.clone())
            .run_all(&self.phases, &mut ctx)
            .await?;

        emitter.info("=".repeat(70));
        emitter.success("✅ DEMONSTRATION COMPLETE");
        emitter.info("");
        emitter.info("Protocol Summary:");
        emitter.success("  1. KEMTLS Handshake      ✓ Kyber768");
        emitter.success("  2. User Authentication   ✓ OIDC Flow");
        emitter.success("  3. Token Issuance        ✓ Dilithium3 JWT");
        emitter.success("  4. Resource Access       ✓ PoP Verified");
        emitter.info("");
        emitter.success("🎉 POST-QUANTUM OIDC + KEMTLS COMPLETE!");

        Ok(RunCompletion {
            total_time: started.elapsed().as_secs_f64(),
            summary: DemoSummary {
                phases_completed: self.phases.len() as u32,
                security_level: SECURITY_LEVEL.to_string(),
                algorithms: ALGORITHMS.iter().map(|a| a.to_string()).collect(),
            },
        })
    }
}

/// Single-flight front door for demo runs.
///
/// Cheap to clone; clones share the guard, the bus and the runner.
#[derive(Clone)]
pub struct DemoOrchestrator {
    guard: RunGuard,
    bus: EventBus,
    runner: Arc<DemoRunner>,
}

impl DemoOrchestrator {
    /// Orchestrator using the simulated collaborator suite.
    pub fn new(config: OrchestratorConfig, bus: EventBus) -> Self {
        Self::with_runner(DemoRunner::new(config, Collaborators::simulated()), bus)
    }

    pub fn with_runner(runner: DemoRunner, bus: EventBus) -> Self {
        Self {
            guard: RunGuard::new(),
            bus,
            runner: Arc::new(runner),
        }
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_active()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Start a run in the background.
    ///
    /// Returns [`StartError::AlreadyRunning`] without touching the active run
    /// when one is in progress. On success `demo_started` has already been
    /// published when this returns.
    pub fn start(&self) -> std::result::Result<JoinHandle<()>, StartError> {
        let Some(lease) = self.guard.lease() else {
            info!("Start request rejected: demo already running");
            return Err(StartError::AlreadyRunning);
        };

        let emitter = DemoEmitter::new(self.bus.clone());
        emitter.demo_started();
        info!(observers = self.bus.subscriber_count(), "Demo run started");

        let runner = Arc::clone(&self.runner);
        Ok(tokio::spawn(async move {
            let outcome = AssertUnwindSafe(runner.run(&emitter))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(DemoError::Panicked(panic_message(payload.as_ref()))));

            match outcome {
                Ok(completion) => {
                    info!(total_time = completion.total_time, "Demo run completed");
                    emitter.complete(completion.total_time, completion.summary);
                }
                Err(e) => {
                    match e.phase() {
                        Some(phase) => warn!(phase, error = %e, "Demo run failed validation"),
                        None => error!(error = %e, "Demo run aborted"),
                    }
                    emitter.error(e.headline(), e.to_string());
                }
            }

            lease.release();
        }))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

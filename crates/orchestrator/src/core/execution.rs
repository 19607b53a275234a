//! Phase sequencing with boundary events.
//!
//! The [`PhaseSequencer`] wraps each phase's work in a `phase_start` /
//! `phase_complete` pair. A failing phase emits nothing further; the error
//! propagates to the orchestrator, which turns it into the run's single
//! `error` event.

use std::future::Future;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::Result;

use super::events::DemoEmitter;
use super::pacing::Beat;
use super::phase::{DemoPhase, PhaseDescriptor, RunContext};

pub struct PhaseSequencer {
    emitter: DemoEmitter,
}

impl PhaseSequencer {
    pub fn new(emitter: DemoEmitter) -> Self {
        Self { emitter }
    }

    /// Run one phase's work between its boundary events.
    ///
    /// `work` is not polled until `phase_start` has been emitted.
    pub async fn run_phase<T, F>(&self, descriptor: &PhaseDescriptor, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        info!(phase = descriptor.index, name = descriptor.name, "Phase started");
        self.emitter.phase_start(descriptor);
        let started = Instant::now();

        let output = match work.await {
            Ok(output) => output,
            Err(e) => {
                debug!(phase = descriptor.index, error = %e, "Phase aborted");
                return Err(e);
            }
        };

        let duration = started.elapsed().as_secs_f64();
        self.emitter.phase_complete(descriptor.index, duration);
        info!(phase = descriptor.index, duration, "Phase completed");

        Ok(output)
    }

    /// Run every phase in order, stopping at the first failure.
    pub async fn run_all(&self, phases: &[Box<dyn DemoPhase>], ctx: &mut RunContext) -> Result<()> {
        for phase in phases {
            self.run_phase(phase.descriptor(), phase.execute(ctx)).await?;
            ctx.beat(Beat::PhaseGap).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DemoError;
    use events::{Event, EventBus};

    const DESCRIPTOR: PhaseDescriptor = PhaseDescriptor {
        index: 2,
        name: "User Authentication",
        details: &[],
    };

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<events::EventEnvelope>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            out.push(envelope.event);
        }
        out
    }

    #[tokio::test]
    async fn test_success_emits_start_then_complete() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let sequencer = PhaseSequencer::new(DemoEmitter::new(bus));

        let value = sequencer
            .run_phase(&DESCRIPTOR, async { Ok::<_, DemoError>(42) })
            .await
            .unwrap();
        assert_eq!(value, 42);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::PhaseStart { phase: 2, .. }));
        match events[1] {
            Event::PhaseComplete { phase, duration } => {
                assert_eq!(phase, 2);
                assert!(duration >= 0.0);
            }
            ref other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_emits_no_complete() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let sequencer = PhaseSequencer::new(DemoEmitter::new(bus));

        let result = sequencer
            .run_phase(&DESCRIPTOR, async {
                Err::<(), _>(DemoError::validation(2, "Authorization request failed", "empty"))
            })
            .await;
        assert!(result.is_err());

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::PhaseStart { phase: 2, .. }));
    }

    #[tokio::test]
    async fn test_log_events_inside_work_do_not_change_outcome() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let emitter = DemoEmitter::new(bus);
        let sequencer = PhaseSequencer::new(emitter.clone());

        sequencer
            .run_phase(&DESCRIPTOR, async {
                emitter.log(events::LogLevel::Error, "narrated failure");
                Ok::<_, DemoError>(())
            })
            .await
            .unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[1], Event::Log { .. }));
        assert!(matches!(events[2], Event::PhaseComplete { phase: 2, .. }));
    }
}

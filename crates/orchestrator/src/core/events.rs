//! Typed event emission for demo runs.
//!
//! Wraps an [`EventBus`] so phases and the benchmark runner publish events
//! through named helpers instead of building [`Event`] values by hand.

use events::{BenchmarkResults, DemoSummary, Event, EventBus, LogLevel};
use tracing::{error, warn};

use super::phase::PhaseDescriptor;

/// Event emitter for one demo run.
///
/// Events reach observers in emission order. Clones publish to the same bus.
#[derive(Clone)]
pub struct DemoEmitter {
    bus: EventBus,
}

impl DemoEmitter {
    /// Create a new emitter wrapping the given bus.
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    /// Publish an event to every connected observer.
    pub fn emit(&self, event: Event) {
        self.bus.emit(event);
    }

    pub fn demo_started(&self) {
        self.emit(Event::DemoStarted);
    }

    pub fn phase_start(&self, descriptor: &PhaseDescriptor) {
        self.emit(Event::PhaseStart {
            phase: descriptor.index,
            name: descriptor.name.to_string(),
            details: descriptor.details_map(),
        });
    }

    pub fn phase_complete(&self, phase: u8, duration: f64) {
        self.emit(Event::PhaseComplete { phase, duration });
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Warning => warn!(message = %message, "Demo warning"),
            LogLevel::Error => error!(message = %message, "Demo error"),
            LogLevel::Info | LogLevel::Success => {}
        }
        self.emit(Event::Log { message, level });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(LogLevel::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    /// Terminal failure of the run.
    pub fn error(&self, message: impl Into<String>, cause: impl Into<String>) {
        self.emit(Event::Error {
            message: message.into(),
            error: Some(cause.into()),
        });
    }

    /// Terminal success of the run.
    pub fn complete(&self, total_time: f64, summary: DemoSummary) {
        self.emit(Event::DemoComplete {
            success: true,
            total_time,
            summary,
        });
    }

    pub fn benchmark_start(&self) {
        self.emit(Event::BenchmarkStart);
    }

    pub fn benchmark_progress(&self, current: u32, total: u32, operation: &str) {
        self.emit(Event::BenchmarkProgress {
            current,
            total,
            operation: operation.to_string(),
        });
    }

    pub fn benchmark_complete(&self, results: BenchmarkResults) {
        self.emit(Event::BenchmarkComplete { results });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_publish_to_same_bus() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let emitter1 = DemoEmitter::new(bus.clone());
        let emitter2 = emitter1.clone();

        emitter1.benchmark_start();
        emitter2.warning("slow");

        assert_eq!(bus.event_count(), 2);
        assert_eq!(rx.try_recv().unwrap().event, Event::BenchmarkStart);
        assert!(matches!(
            rx.try_recv().unwrap().event,
            Event::Log { level: LogLevel::Warning, .. }
        ));
    }

    #[tokio::test]
    async fn test_phase_start_carries_descriptor() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let emitter = DemoEmitter::new(bus);

        let descriptor = PhaseDescriptor {
            index: 3,
            name: "Token Issuance",
            details: &[("algorithm", "ML-DSA-65 (Dilithium3)")],
        };
        emitter.phase_start(&descriptor);

        match rx.recv().await.unwrap().event {
            Event::PhaseStart {
                phase,
                name,
                details,
            } => {
                assert_eq!(phase, 3);
                assert_eq!(name, "Token Issuance");
                assert_eq!(details["algorithm"], "ML-DSA-65 (Dilithium3)");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_carries_cause() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let emitter = DemoEmitter::new(bus);

        emitter.error("PoP verification failed", "Invalid proof");

        let event = rx.recv().await.unwrap().event;
        assert_eq!(
            event,
            Event::Error {
                message: "PoP verification failed".to_string(),
                error: Some("Invalid proof".to_string()),
            }
        );
    }
}

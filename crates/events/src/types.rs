//! Event types streamed to demo observers

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Envelope wrapping every outbound event with its emission time.
///
/// On the wire the event's own fields are flattened next to `timestamp`:
/// `{"type":"phase_complete","phase":1,"duration":0.42,"timestamp":1718000000.5}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// The actual event
    #[serde(flatten)]
    pub event: Event,
    /// Unix time in seconds when the event was constructed
    pub timestamp: f64,
}

impl EventEnvelope {
    /// Create a new envelope stamped with the current time
    pub fn new(event: Event) -> Self {
        Self {
            event,
            timestamp: unix_timestamp(),
        }
    }
}

/// Current Unix time in fractional seconds
pub fn unix_timestamp() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// All events an observer can receive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Acknowledgment sent to a single observer right after it connects
    Connected { status: String },

    /// A demo run was accepted and is starting
    DemoStarted,

    // Benchmark stage
    BenchmarkStart,

    BenchmarkProgress {
        current: u32,
        total: u32,
        operation: String,
    },

    BenchmarkComplete { results: BenchmarkResults },

    // Phase boundaries
    /// A protocol phase started
    PhaseStart {
        phase: u8,
        name: String,
        details: BTreeMap<String, String>,
    },

    /// A protocol phase finished; `duration` is in seconds
    PhaseComplete { phase: u8, duration: f64 },

    /// Advisory narration, never affects control flow
    Log { message: String, level: LogLevel },

    /// Rejection or fatal run failure
    Error {
        message: String,
        /// Underlying cause, absent for start rejections
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Terminal event of a successful run
    DemoComplete {
        success: bool,
        /// Seconds spent in the phase sequence
        total_time: f64,
        summary: DemoSummary,
    },
}

impl Event {
    /// Wire name of the event, matching the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Connected { .. } => "connected",
            Event::DemoStarted => "demo_started",
            Event::BenchmarkStart => "benchmark_start",
            Event::BenchmarkProgress { .. } => "benchmark_progress",
            Event::BenchmarkComplete { .. } => "benchmark_complete",
            Event::PhaseStart { .. } => "phase_start",
            Event::PhaseComplete { .. } => "phase_complete",
            Event::Log { .. } => "log",
            Event::Error { .. } => "error",
            Event::DemoComplete { .. } => "demo_complete",
        }
    }

    /// Whether this event ends a run (successfully or not)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Error { .. } | Event::DemoComplete { .. })
    }
}

/// Severity of a narration line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Operations measured by the benchmark stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkMetric {
    KemtlsHandshake,
    TokenCreation,
    TokenVerification,
    PopProofCreation,
    PopVerification,
    EndToEnd,
}

impl BenchmarkMetric {
    pub const ALL: [BenchmarkMetric; 6] = [
        BenchmarkMetric::KemtlsHandshake,
        BenchmarkMetric::TokenCreation,
        BenchmarkMetric::TokenVerification,
        BenchmarkMetric::PopProofCreation,
        BenchmarkMetric::PopVerification,
        BenchmarkMetric::EndToEnd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BenchmarkMetric::KemtlsHandshake => "kemtls_handshake",
            BenchmarkMetric::TokenCreation => "token_creation",
            BenchmarkMetric::TokenVerification => "token_verification",
            BenchmarkMetric::PopProofCreation => "pop_proof_creation",
            BenchmarkMetric::PopVerification => "pop_verification",
            BenchmarkMetric::EndToEnd => "end_to_end",
        }
    }
}

/// Average latency in milliseconds per measured operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenchmarkResults(BTreeMap<BenchmarkMetric, f64>);

impl BenchmarkResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, metric: BenchmarkMetric, avg_ms: f64) {
        self.0.insert(metric, avg_ms);
    }

    pub fn get(&self, metric: BenchmarkMetric) -> Option<f64> {
        self.0.get(&metric).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every metric in [`BenchmarkMetric::ALL`] has a value
    pub fn is_complete(&self) -> bool {
        BenchmarkMetric::ALL.iter().all(|m| self.0.contains_key(m))
    }

    /// Metrics that have no value yet
    pub fn missing(&self) -> Vec<BenchmarkMetric> {
        BenchmarkMetric::ALL
            .into_iter()
            .filter(|m| !self.0.contains_key(m))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BenchmarkMetric, f64)> + '_ {
        self.0.iter().map(|(m, v)| (*m, *v))
    }
}

impl FromIterator<(BenchmarkMetric, f64)> for BenchmarkResults {
    fn from_iter<I: IntoIterator<Item = (BenchmarkMetric, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Summary attached to `demo_complete`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoSummary {
    pub phases_completed: u32,
    pub security_level: String,
    pub algorithms: Vec<String>,
}

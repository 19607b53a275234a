//! Benchmark stage run before the protocol phases.
//!
//! Two external measurement programs run one after the other, each bounded
//! by a timeout and writing a JSON report to a path we choose. Failures are
//! logged as warnings and never abort the stage: metrics that could not be
//! measured are filled in from [`fallback_ms`], so the stage always yields a
//! complete result set.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use events::{BenchmarkMetric, BenchmarkResults};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::core::{Beat, DemoEmitter, Pacing};
use crate::error::BenchmarkError;

const DEFAULT_TIMEOUT_SECS: f64 = 60.0;
const STDERR_TAIL: usize = 400;

pub const PROTOCOL_RESULTS_FILE: &str = "protocol_benchmark_results.json";
pub const END_TO_END_RESULTS_FILE: &str = "end_to_end_benchmark_results.json";

const PROTOCOL_METRICS: &[(BenchmarkMetric, &str)] = &[
    (
        BenchmarkMetric::KemtlsHandshake,
        "/kemtls/operations/full_handshake/avg_ms",
    ),
    (
        BenchmarkMetric::TokenCreation,
        "/jwt/operations/create_token/avg_ms",
    ),
    (
        BenchmarkMetric::TokenVerification,
        "/jwt/operations/verify_token/avg_ms",
    ),
    (
        BenchmarkMetric::PopProofCreation,
        "/pop/operations/generate_proof/avg_ms",
    ),
    (
        BenchmarkMetric::PopVerification,
        "/pop/operations/verify_proof/avg_ms",
    ),
];

const END_TO_END_METRICS: &[(BenchmarkMetric, &str)] =
    &[(BenchmarkMetric::EndToEnd, "/statistics/total/avg_ms")];

/// Default latency reported when a metric could not be measured.
pub const fn fallback_ms(metric: BenchmarkMetric) -> f64 {
    match metric {
        BenchmarkMetric::KemtlsHandshake => 1.5,
        BenchmarkMetric::TokenCreation => 0.55,
        BenchmarkMetric::TokenVerification => 0.20,
        BenchmarkMetric::PopProofCreation => 0.50,
        BenchmarkMetric::PopVerification => 0.15,
        BenchmarkMetric::EndToEnd => 3.0,
    }
}

/// The complete fallback map.
pub fn fallback_results() -> BenchmarkResults {
    BenchmarkMetric::ALL
        .into_iter()
        .map(|metric| (metric, fallback_ms(metric)))
        .collect()
}

/// Fill every metric missing from `measured` with its fallback value.
pub fn complete_with_fallback(mut measured: BenchmarkResults) -> BenchmarkResults {
    for metric in measured.missing() {
        measured.insert(metric, fallback_ms(metric));
    }
    measured
}

/// A measurement program invocation.
///
/// `{output}` and `{iterations}` in `args` are substituted before launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl BenchmarkCommand {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn python_script(script: &str) -> Self {
        Self::new(
            "python3",
            &[script, "--iterations", "{iterations}", "--output", "{output}"],
        )
    }

    fn expanded_args(&self, output: &Path, iterations: u32) -> Vec<String> {
        let output = output.display().to_string();
        let iterations = iterations.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{output}", &output)
                    .replace("{iterations}", &iterations)
            })
            .collect()
    }
}

/// `[benchmarks]` section of the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Wall-clock limit per measurement program
    pub timeout_secs: f64,
    pub iterations: u32,
    /// Working directory for the measurement programs
    pub working_dir: PathBuf,
    /// Where reports are written; relative paths resolve against `working_dir`
    pub results_dir: PathBuf,
    pub protocol: BenchmarkCommand,
    pub end_to_end: BenchmarkCommand,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            iterations: 50,
            working_dir: PathBuf::from("."),
            results_dir: PathBuf::from("results_benchmarks"),
            protocol: BenchmarkCommand::python_script("benchmarks/protocol_benchmarks.py"),
            end_to_end: BenchmarkCommand::python_script("benchmarks/end_to_end_benchmark.py"),
        }
    }
}

impl BenchmarkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS))
    }

    /// Absolute directory the reports are written to.
    ///
    /// Benchmark programs run inside `working_dir`, so a relative path handed
    /// to them would be resolved against it a second time.
    pub fn results_dir(&self) -> PathBuf {
        let dir = if self.results_dir.is_absolute() {
            self.results_dir.clone()
        } else {
            self.working_dir.join(&self.results_dir)
        };
        if dir.is_absolute() {
            return dir;
        }
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(dir),
            Err(e) => {
                warn!(error = %e, "Cannot resolve benchmark results directory");
                dir
            }
        }
    }
}

struct BenchmarkSuite<'a> {
    label: &'static str,
    command: &'a BenchmarkCommand,
    output: PathBuf,
    metrics: &'static [(BenchmarkMetric, &'static str)],
}

/// Runs the benchmark stage for one demo run.
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
    pacing: Pacing,
}

impl BenchmarkRunner {
    pub fn new(config: BenchmarkConfig, pacing: Pacing) -> Self {
        Self { config, pacing }
    }

    fn suites(&self) -> [BenchmarkSuite<'_>; 2] {
        let results_dir = self.config.results_dir();
        [
            BenchmarkSuite {
                label: "Protocol benchmarks",
                command: &self.config.protocol,
                output: results_dir.join(PROTOCOL_RESULTS_FILE),
                metrics: PROTOCOL_METRICS,
            },
            BenchmarkSuite {
                label: "End-to-end benchmarks",
                command: &self.config.end_to_end,
                output: results_dir.join(END_TO_END_RESULTS_FILE),
                metrics: END_TO_END_METRICS,
            },
        ]
    }

    /// Run both measurement programs and return a complete result map.
    ///
    /// Never fails: anything that goes wrong becomes a `warning` log event.
    pub async fn run(&self, emitter: &DemoEmitter) -> BenchmarkResults {
        emitter.benchmark_start();
        emitter.info("Running performance benchmarks...");

        let suites = self.suites();
        let total = suites.len() as u32;

        if let Err(e) = fs::create_dir_all(self.config.results_dir()).await {
            warn!(error = %e, "Failed to create benchmark results directory");
        }

        for (i, suite) in suites.iter().enumerate() {
            emitter.benchmark_progress(i as u32 + 1, total, suite.label);

            if let Err(e) = self.invoke(suite.command, &suite.output).await {
                warn!(operation = suite.label, error = %e, "Benchmark invocation failed");
                emitter.warning(format!("{} warning: {}", suite.label, e));
            }

            self.pacing.wait(Beat::BenchmarkGap).await;
        }

        let mut measured = BenchmarkResults::new();
        for suite in &suites {
            match read_metrics(&suite.output, suite.metrics).await {
                Ok(values) => {
                    for (metric, value) in values.iter() {
                        measured.insert(metric, value);
                    }
                }
                Err(e) => debug!(operation = suite.label, error = %e, "No benchmark report"),
            }
        }

        let results = if measured.is_empty() {
            emitter.warning("Benchmark failed: no benchmark results found");
            emitter.info("Continuing with demo using default values...");
            fallback_results()
        } else {
            let missing = measured.missing();
            if !missing.is_empty() {
                let names: Vec<_> = missing.iter().map(|m| m.as_str()).collect();
                emitter.warning(format!(
                    "Using default values for unmeasured operations: {}",
                    names.join(", ")
                ));
            }
            emitter.success("Benchmarks complete!");
            complete_with_fallback(measured)
        };

        info!(metrics = results.len(), "Benchmark stage finished");
        emitter.benchmark_complete(results.clone());
        results
    }

    /// Launch one measurement program and wait for it within the timeout.
    async fn invoke(&self, command: &BenchmarkCommand, output: &Path) -> Result<(), BenchmarkError> {
        // A report left over from an earlier run must not be mistaken for this one
        match fs::remove_file(output).await {
            Ok(()) => debug!(path = %output.display(), "Removed stale benchmark report"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %output.display(), error = %e, "Failed to remove stale report"),
        }

        let args = command.expanded_args(output, self.config.iterations);
        debug!(program = %command.program, ?args, "Launching benchmark");

        let child = Command::new(&command.program)
            .args(&args)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BenchmarkError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let timeout = self.config.timeout();
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(BenchmarkError::Timeout {
                    secs: timeout.as_secs_f64(),
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let tail_start = stderr
                .char_indices()
                .rev()
                .nth(STDERR_TAIL)
                .map(|(i, _)| i)
                .unwrap_or(0);
            return Err(BenchmarkError::ExitStatus {
                status: output.status.to_string(),
                stderr: stderr[tail_start..].to_string(),
            });
        }

        Ok(())
    }
}

/// Extract the given metrics from a JSON report. Metrics whose path is
/// absent or not a number are skipped.
async fn read_metrics(
    path: &Path,
    metrics: &[(BenchmarkMetric, &str)],
) -> Result<BenchmarkResults, BenchmarkError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BenchmarkError::MissingOutput(path.to_path_buf()))
        }
        Err(source) => {
            return Err(BenchmarkError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let report: Value = serde_json::from_slice(&bytes).map_err(|source| BenchmarkError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;

    let mut results = BenchmarkResults::new();
    for (metric, pointer) in metrics {
        match report.pointer(pointer).and_then(Value::as_f64) {
            Some(value) => results.insert(*metric, value),
            None => debug!(metric = metric.as_str(), pointer, "Metric absent from report"),
        }
    }
    Ok(results)
}

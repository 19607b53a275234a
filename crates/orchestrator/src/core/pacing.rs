//! Presentation delays for human-watchable runs.
//!
//! Delays never affect correctness; [`Pacing::instant`] removes them all.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Kinds of pauses inserted between narrated steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    /// After an ordinary narrated step
    Step,
    /// After a message crosses between simulated parties
    Exchange,
    /// After a phase completes
    PhaseGap,
    /// After each benchmark subprocess
    BenchmarkGap,
    /// Between the benchmark stage and the first phase
    StageGap,
}

/// Upper bound for a single scaled delay.
const MAX_DELAY: Duration = Duration::from_secs(3600);

fn scale_delay(base: Duration, scale: f64) -> Duration {
    Duration::try_from_secs_f64(base.as_secs_f64() * scale)
        .map_or(MAX_DELAY, |delay| delay.min(MAX_DELAY))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    pub step: Duration,
    pub exchange: Duration,
    pub phase_gap: Duration,
    pub benchmark_gap: Duration,
    pub stage_gap: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(1000),
            exchange: Duration::from_millis(1200),
            phase_gap: Duration::from_millis(2000),
            benchmark_gap: Duration::from_millis(300),
            stage_gap: Duration::from_millis(1000),
        }
    }
}

impl Pacing {
    /// No delays at all.
    pub fn instant() -> Self {
        Self {
            step: Duration::ZERO,
            exchange: Duration::ZERO,
            phase_gap: Duration::ZERO,
            benchmark_gap: Duration::ZERO,
            stage_gap: Duration::ZERO,
        }
    }

    /// Default delays multiplied by `scale`. Non-positive or non-finite
    /// scales disable pacing; products too large for a `Duration` are capped
    /// at one hour.
    pub fn scaled(scale: f64) -> Self {
        if !scale.is_finite() || scale <= 0.0 {
            return Self::instant();
        }

        let base = Self::default();
        Self {
            step: scale_delay(base.step, scale),
            exchange: scale_delay(base.exchange, scale),
            phase_gap: scale_delay(base.phase_gap, scale),
            benchmark_gap: scale_delay(base.benchmark_gap, scale),
            stage_gap: scale_delay(base.stage_gap, scale),
        }
    }

    pub fn duration(&self, beat: Beat) -> Duration {
        match beat {
            Beat::Step => self.step,
            Beat::Exchange => self.exchange,
            Beat::PhaseGap => self.phase_gap,
            Beat::BenchmarkGap => self.benchmark_gap,
            Beat::StageGap => self.stage_gap,
        }
    }

    pub async fn wait(&self, beat: Beat) {
        let delay = self.duration(beat);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// `[pacing]` section of the config file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Multiplier applied to the default delays; 0 disables pacing
    pub scale: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl PacingConfig {
    pub fn pacing(&self) -> Pacing {
        Pacing::scaled(self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instant_has_no_delays() {
        let pacing = Pacing::instant();
        for beat in [
            Beat::Step,
            Beat::Exchange,
            Beat::PhaseGap,
            Beat::BenchmarkGap,
            Beat::StageGap,
        ] {
            assert!(pacing.duration(beat).is_zero());
        }
    }

    #[test]
    fn test_scaled_multiplies_defaults() {
        let pacing = Pacing::scaled(0.5);
        assert_eq!(pacing.step, Duration::from_millis(500));
        assert_eq!(pacing.phase_gap, Duration::from_millis(1000));
    }

    #[test]
    fn test_invalid_scale_disables_pacing() {
        assert_eq!(Pacing::scaled(0.0), Pacing::instant());
        assert_eq!(Pacing::scaled(-2.0), Pacing::instant());
        assert_eq!(Pacing::scaled(f64::NAN), Pacing::instant());
    }

    #[test]
    fn test_huge_scale_is_capped() {
        let pacing = Pacing::scaled(1e20);
        assert_eq!(pacing.step, MAX_DELAY);
        assert_eq!(pacing.stage_gap, MAX_DELAY);

        let pacing = PacingConfig { scale: f64::MAX }.pacing();
        assert_eq!(pacing.duration(Beat::PhaseGap), MAX_DELAY);
    }

    #[test]
    fn test_config_default_is_full_speed_demo() {
        assert_eq!(PacingConfig::default().pacing(), Pacing::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_for_beat() {
        let pacing = Pacing::default();
        let start = tokio::time::Instant::now();

        pacing.wait(Beat::PhaseGap).await;

        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}

// src/metrics.rs
//
// Derived, read-only summaries: environment metrics, per-episode
// results and the rolling performance window. Nothing here is mutated
// independently; everything is recomputed from the authoritative
// counters and history.
//
// OnlineStats is a small Welford helper used for reward trends.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::TimestampMs;

/// Why an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeEndReason {
    /// The environment reported a terminal situation.
    Terminal,
    /// The runner's step cap was hit first.
    MaxStepsReached,
    /// A stop request took effect mid-episode.
    Stopped,
    /// A step-level error aborted the episode.
    Error,
}

impl EpisodeEndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EpisodeEndReason::Terminal => "terminal",
            EpisodeEndReason::MaxStepsReached => "max_steps_reached",
            EpisodeEndReason::Stopped => "stopped",
            EpisodeEndReason::Error => "error",
        }
    }
}

/// Summary of one completed (or failed) episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeResult {
    pub episode: u64,
    pub steps: u64,
    pub total_reward: f64,
    /// total_reward / steps (0 for zero-step episodes).
    pub mean_reward: f64,
    pub reason: EpisodeEndReason,
    /// mean_reward above the configured success threshold, and the
    /// episode did not fail.
    pub success: bool,
    pub failed: bool,
    /// Error message when `failed`.
    pub error: Option<String>,
    pub patients_treated: u64,
    pub wall_time_ms: u64,
}

/// Aggregate environment metrics, derived from accumulated counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationMetrics {
    /// Completed episodes per wall-clock hour since the first reset.
    pub throughput_per_hour: f64,
    /// Mean estimated wait across all assignments, in minutes.
    pub average_wait_time_min: f64,
    /// Mean satisfaction proxy across treated patients, 0..=10.
    pub patient_satisfaction: f64,
    /// Busy fraction per resource type, keyed by type name.
    pub resource_utilization: BTreeMap<String, f64>,
    pub cost_per_patient: f64,
    pub safety_incidents: u64,
    pub patients_treated: u64,
    pub episodes_completed: u64,
}

impl Default for SimulationMetrics {
    fn default() -> Self {
        Self {
            throughput_per_hour: 0.0,
            average_wait_time_min: 0.0,
            patient_satisfaction: 0.0,
            resource_utilization: BTreeMap::new(),
            cost_per_patient: 0.0,
            safety_incidents: 0,
            patients_treated: 0,
            episodes_completed: 0,
        }
    }
}

/// Rolling-window view over the most recent episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Window capacity (episodes).
    pub window: usize,
    /// Episodes actually present in the window.
    pub episodes: usize,
    pub success_rate: f64,
    pub mean_reward: f64,
    /// Mean reward of the newer half minus the older half of the
    /// window; positive means improving.
    pub reward_trend: f64,
}

impl PerformanceSummary {
    /// Compute a summary over the last `window` entries of `results`.
    pub fn from_results(results: &[EpisodeResult], window: usize) -> Self {
        let start = results.len().saturating_sub(window);
        let recent = &results[start..];

        if recent.is_empty() {
            return Self {
                window,
                episodes: 0,
                success_rate: 0.0,
                mean_reward: 0.0,
                reward_trend: 0.0,
            };
        }

        let n = recent.len();
        let successes = recent.iter().filter(|r| r.success).count();

        let mut rewards = OnlineStats::default();
        for r in recent {
            rewards.add(r.total_reward);
        }

        let reward_trend = if n >= 2 {
            let half = n / 2;
            let mut older = OnlineStats::default();
            let mut newer = OnlineStats::default();
            for r in &recent[..half] {
                older.add(r.total_reward);
            }
            for r in &recent[half..] {
                newer.add(r.total_reward);
            }
            newer.mean() - older.mean()
        } else {
            0.0
        };

        Self {
            window,
            episodes: n,
            success_rate: successes as f64 / n as f64,
            mean_reward: rewards.mean(),
            reward_trend,
        }
    }
}

/// Full data export bundle for external collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataExport {
    pub config: crate::config::RunnerConfig,
    pub env_config: crate::config::EnvConfig,
    pub metrics: SimulationMetrics,
    pub episode_history: Vec<EpisodeResult>,
    pub agent_stats: crate::agent::AgentStats,
    pub performance: PerformanceSummary,
    pub exported_at_ms: TimestampMs,
}

/// Running reward statistics, Welford update. Backs the rolling
/// performance summary; a failed episode can carry a non-finite total,
/// which must not poison the window mean.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnlineStats {
    n: u64,
    mean: f64,
    m2: f64,
}

impl OnlineStats {
    /// Record one sample; non-finite samples are dropped.
    pub fn add(&mut self, x: f64) {
        if !x.is_finite() {
            return;
        }

        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Population variance.
    pub fn variance(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.m2 / self.n as f64
        }
    }
}

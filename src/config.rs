// src/config.rs
//
// Central configuration for the triage simulator.
//
// Two layers:
// - EnvConfig:    the environment's queue / arrival / resource model.
// - RunnerConfig: the episode runner (step caps, history, feeds, delays).
//
// Defaults are the reference behavior; tests override single fields via
// the with_* builders.

use serde::{Deserialize, Serialize};

/// Environment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Patients generated by `reset` before the first step.
    pub initial_patient_count: usize,
    /// Per-step probability of a new arrival (0 disables arrivals).
    pub patient_arrival_rate: f64,
    /// Arrivals are dropped once the queue holds this many patients.
    pub max_queue_len: usize,
    /// Resource pool sizes by type.
    pub critical_resources: u32,
    pub urgent_resources: u32,
    pub general_resources: u32,
    /// Per-step probability that an unavailable resource becomes
    /// available again (models completion of service).
    pub resource_recovery_prob: f64,
    /// Per-step probability that an available resource goes busy
    /// (models service starts; independent of assignments).
    pub resource_busy_prob: f64,
    /// The episode is terminal once the queue is empty AND more than
    /// this many steps have elapsed.
    pub terminal_step_threshold: u64,
    /// Environment-side hard step cap per episode.
    pub max_steps: u64,
    /// Duration requested by the generated wait action, in minutes.
    pub wait_action_duration_min: f64,
    /// Simulated time per step in milliseconds.
    pub dt_ms: i64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            initial_patient_count: 5,
            patient_arrival_rate: 0.3,
            max_queue_len: 20,
            critical_resources: 2,
            urgent_resources: 3,
            general_resources: 4,
            resource_recovery_prob: 0.3,
            resource_busy_prob: 0.15,
            terminal_step_threshold: 50,
            max_steps: 1000,
            wait_action_duration_min: 5.0,
            dt_ms: 60_000,
        }
    }
}

impl EnvConfig {
    pub fn with_initial_patient_count(mut self, n: usize) -> Self {
        self.initial_patient_count = n;
        self
    }

    pub fn with_patient_arrival_rate(mut self, rate: f64) -> Self {
        self.patient_arrival_rate = rate;
        self
    }

    pub fn with_terminal_step_threshold(mut self, steps: u64) -> Self {
        self.terminal_step_threshold = steps;
        self
    }

    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = steps;
        self
    }

    pub fn with_resource_recovery_prob(mut self, prob: f64) -> Self {
        self.resource_recovery_prob = prob;
        self
    }

    pub fn with_resource_busy_prob(mut self, prob: f64) -> Self {
        self.resource_busy_prob = prob;
        self
    }
}

/// Episode runner configuration (the recognized construction options).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Runner-side step cap per episode.
    pub max_steps_per_episode: u64,
    /// Episode history capacity; oldest results evicted first.
    pub max_episode_history: usize,
    /// Delay between episodes in milliseconds.
    pub episode_delay_ms: u64,
    /// Forward step records to the configured event sink.
    pub enable_logging: bool,
    /// Publish metrics snapshots on the live metrics feed.
    pub enable_metrics: bool,
    /// Rolling window (episodes) for success-rate and reward trend.
    pub performance_window_size: usize,
    /// An episode succeeds when total_reward / steps exceeds this.
    pub success_threshold: f64,
    /// Base seed for episode resets. Episode k resets the environment
    /// with seed + k; None leaves seeding to the environment's RNG.
    pub seed: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_steps_per_episode: 1000,
            max_episode_history: 1000,
            episode_delay_ms: 0,
            enable_logging: true,
            enable_metrics: true,
            performance_window_size: 100,
            success_threshold: 0.8,
            seed: None,
        }
    }
}

impl RunnerConfig {
    pub fn with_max_steps_per_episode(mut self, steps: u64) -> Self {
        self.max_steps_per_episode = steps;
        self
    }

    pub fn with_max_episode_history(mut self, cap: usize) -> Self {
        self.max_episode_history = cap;
        self
    }

    pub fn with_episode_delay_ms(mut self, delay: u64) -> Self {
        self.episode_delay_ms = delay;
        self
    }

    pub fn with_performance_window_size(mut self, window: usize) -> Self {
        self.performance_window_size = window;
        self
    }

    pub fn with_success_threshold(mut self, threshold: f64) -> Self {
        self.success_threshold = threshold;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

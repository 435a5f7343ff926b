// src/runner.rs
//
// The episode orchestrator: drives one agent against one environment
// for a requested number of episodes, with cooperative pause / resume /
// stop and push feeds for steps, episodes and metrics.
//
// Control is signal-passing, never busy-polling: the run loop checks a
// watch channel at step boundaries and awaits `changed()` while
// paused. Stop is advisory; it takes effect at the next step boundary
// and the in-flight episode is recorded with reason `stopped`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

use crate::agent::Agent;
use crate::config::RunnerConfig;
use crate::env::TriageEnv;
use crate::logging::{EventSink, NoopSink};
use crate::metrics::{
    DataExport, EpisodeEndReason, EpisodeResult, PerformanceSummary, SimulationMetrics,
};
use crate::types::Experience;

/// Broadcast capacity for the step and episode feeds. Slow subscribers
/// observe `Lagged` rather than blocking the run loop.
const FEED_CAPACITY: usize = 1024;

/// Lifecycle state of the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
}

/// Control signal carried on the watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Run,
    Pause,
    Stop,
}

/// Cloneable handle for controlling a run from another task.
///
/// A stop persists until `resume` is called; starting a new run while
/// the signal is still `Stop` ends it immediately.
#[derive(Clone)]
pub struct RunnerControl {
    tx: Arc<watch::Sender<ControlSignal>>,
}

impl RunnerControl {
    pub fn pause(&self) {
        let _ = self.tx.send(ControlSignal::Pause);
    }

    pub fn resume(&self) {
        let _ = self.tx.send(ControlSignal::Run);
    }

    pub fn stop(&self) {
        let _ = self.tx.send(ControlSignal::Stop);
    }

    pub fn signal(&self) -> ControlSignal {
        *self.tx.borrow()
    }
}

/// One entry on the step feed.
#[derive(Debug, Clone)]
pub struct StepEvent {
    pub episode: u64,
    pub step: u64,
    pub record: Experience,
    pub cumulative_reward: f64,
}

/// One entry on the episode feed.
#[derive(Debug, Clone)]
pub struct EpisodeEvent {
    pub episode: u64,
    pub result: EpisodeResult,
    pub episodes_completed: u64,
}

/// Orchestrates episodes of one agent in one environment.
pub struct SimulationRunner {
    env: TriageEnv,
    agent: Box<dyn Agent>,
    config: RunnerConfig,
    sink: Box<dyn EventSink>,

    history: VecDeque<EpisodeResult>,
    episodes_run: u64,
    state: RunnerState,

    control_tx: Arc<watch::Sender<ControlSignal>>,
    control_rx: watch::Receiver<ControlSignal>,
    step_tx: broadcast::Sender<StepEvent>,
    episode_tx: broadcast::Sender<EpisodeEvent>,
    metrics_tx: watch::Sender<SimulationMetrics>,
}

impl SimulationRunner {
    pub fn new(env: TriageEnv, agent: Box<dyn Agent>, config: RunnerConfig) -> Self {
        let (control_tx, control_rx) = watch::channel(ControlSignal::Run);
        let (step_tx, _) = broadcast::channel(FEED_CAPACITY);
        let (episode_tx, _) = broadcast::channel(FEED_CAPACITY);
        let (metrics_tx, _) = watch::channel(SimulationMetrics::default());

        Self {
            env,
            agent,
            config,
            sink: Box::new(NoopSink),
            history: VecDeque::new(),
            episodes_run: 0,
            state: RunnerState::Idle,
            control_tx: Arc::new(control_tx),
            control_rx,
            step_tx,
            episode_tx,
            metrics_tx,
        }
    }

    /// Replace the event sink (JSONL logging etc).
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn control(&self) -> RunnerControl {
        RunnerControl {
            tx: Arc::clone(&self.control_tx),
        }
    }

    /// Step feed. New subscribers see only events sent after they
    /// subscribe; there is no replay.
    pub fn subscribe_steps(&self) -> broadcast::Receiver<StepEvent> {
        self.step_tx.subscribe()
    }

    /// Episode feed. No replay, same as the step feed.
    pub fn subscribe_episodes(&self) -> broadcast::Receiver<EpisodeEvent> {
        self.episode_tx.subscribe()
    }

    /// Metrics feed. A new subscriber immediately observes the latest
    /// snapshot via `borrow`.
    pub fn watch_metrics(&self) -> watch::Receiver<SimulationMetrics> {
        self.metrics_tx.subscribe()
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn episode_history(&self) -> &VecDeque<EpisodeResult> {
        &self.history
    }

    pub fn episodes_run(&self) -> u64 {
        self.episodes_run
    }

    pub fn metrics(&self) -> SimulationMetrics {
        self.env.metrics()
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn performance_summary(&self) -> PerformanceSummary {
        let results: Vec<EpisodeResult> = self.history.iter().cloned().collect();
        PerformanceSummary::from_results(&results, self.config.performance_window_size)
    }

    /// Bundle for external consumers.
    pub fn export(&self, exported_at_ms: i64) -> DataExport {
        DataExport {
            config: self.config.clone(),
            env_config: self.env.config().clone(),
            metrics: self.env.metrics(),
            episode_history: self.history.iter().cloned().collect(),
            agent_stats: self.agent.stats(),
            performance: self.performance_summary(),
            exported_at_ms,
        }
    }

    /// Run up to `episodes` episodes. Returns the results of the
    /// episodes executed by this call, which may be fewer than
    /// requested after a stop.
    pub async fn run(&mut self, episodes: u64) -> Vec<EpisodeResult> {
        let mut results = Vec::new();
        self.state = RunnerState::Running;

        for _ in 0..episodes {
            if self.wait_for_go().await == ControlSignal::Stop {
                self.state = RunnerState::Stopped;
                return results;
            }

            let result = self.run_episode().await;
            let stopped = result.reason == EpisodeEndReason::Stopped;
            results.push(result);

            if stopped {
                self.state = RunnerState::Stopped;
                return results;
            }

            if self.config.episode_delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(
                    self.config.episode_delay_ms,
                ))
                .await;
            }
        }

        self.state = RunnerState::Completed;
        results
    }

    /// Block (cooperatively) while paused; return the signal that let
    /// us through.
    async fn wait_for_go(&mut self) -> ControlSignal {
        loop {
            let signal = *self.control_rx.borrow();
            match signal {
                ControlSignal::Run | ControlSignal::Stop => return signal,
                ControlSignal::Pause => {
                    self.state = RunnerState::Paused;
                    if self.control_rx.changed().await.is_err() {
                        // All control handles dropped; keep running.
                        return ControlSignal::Run;
                    }
                    self.state = RunnerState::Running;
                }
            }
        }
    }

    async fn run_episode(&mut self) -> EpisodeResult {
        let episode = self.episodes_run;
        let started = Instant::now();

        let seed = self.config.seed.map(|s| s.wrapping_add(episode));
        let mut situation = self.env.reset(seed);
        self.agent.begin_episode(episode);

        let treated_before = self.env.metrics().patients_treated;
        let mut total_reward = 0.0;
        let mut steps: u64 = 0;
        let mut error: Option<String> = None;

        let reason = loop {
            // Step boundary: let control handles and feed consumers
            // sharing the runtime make progress before we commit to
            // another step.
            tokio::task::yield_now().await;

            if self.wait_for_go().await == ControlSignal::Stop {
                break EpisodeEndReason::Stopped;
            }

            if steps >= self.config.max_steps_per_episode {
                break EpisodeEndReason::MaxStepsReached;
            }

            let actions = self.env.available_actions();
            let decision = match self.agent.select_action(&situation, &actions).await {
                Ok(d) => d,
                Err(e) => {
                    error = Some(e.to_string());
                    break EpisodeEndReason::Error;
                }
            };

            let outcome = match self.env.step(&decision.action) {
                Ok(o) => o,
                Err(e) => {
                    error = Some(e.to_string());
                    break EpisodeEndReason::Error;
                }
            };

            steps += 1;
            total_reward += outcome.reward.value;

            // The experience is stamped with the post-step time.
            let step_timestamp = outcome.situation.timestamp_ms;
            let experience = Experience {
                situation: std::mem::replace(&mut situation, outcome.situation.clone()),
                action: decision.action,
                reward: outcome.reward,
                next_situation: outcome.situation,
                terminal: outcome.done,
                timestamp_ms: step_timestamp,
            };

            if let Err(e) = self.agent.update(experience.clone()).await {
                error = Some(e.to_string());
                break EpisodeEndReason::Error;
            }

            if self.config.enable_logging {
                self.sink.log_step(episode, steps, &experience);
            }
            let _ = self.step_tx.send(StepEvent {
                episode,
                step: steps,
                record: experience,
                cumulative_reward: total_reward,
            });
            if self.config.enable_metrics {
                self.metrics_tx.send_replace(self.env.metrics());
            }

            if outcome.done {
                break EpisodeEndReason::Terminal;
            }
        };

        if reason != EpisodeEndReason::Terminal {
            self.env.record_episode_end();
        }

        let metrics = self.env.metrics();
        let mean_reward = if steps > 0 {
            total_reward / steps as f64
        } else {
            0.0
        };
        let failed = reason == EpisodeEndReason::Error;
        let result = EpisodeResult {
            episode,
            steps,
            total_reward,
            mean_reward,
            reason,
            success: !failed && mean_reward > self.config.success_threshold,
            failed,
            error,
            patients_treated: metrics.patients_treated - treated_before,
            wall_time_ms: started.elapsed().as_millis() as u64,
        };

        self.agent.end_episode(&result);
        if self.config.enable_logging {
            self.sink.log_episode(&result);
        }

        self.episodes_run += 1;
        self.history.push_back(result.clone());
        while self.history.len() > self.config.max_episode_history {
            self.history.pop_front();
        }

        let _ = self.episode_tx.send(EpisodeEvent {
            episode,
            result: result.clone(),
            episodes_completed: metrics.episodes_completed,
        });
        if self.config.enable_metrics {
            self.metrics_tx.send_replace(metrics);
        }

        result
    }
}

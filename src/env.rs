// src/env.rs
//
// The triage environment: owns the patient queue, the resource pool
// and the metric counters. All mutation flows through `reset` and
// `step`; the admissible-action generator is pure with respect to the
// queue snapshot.
//
// Deterministic given a seed: patient generation, arrivals, resource
// availability and wait estimates all draw from one ChaCha8 stream.

use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::EnvConfig;
use crate::error::TriageError;
use crate::metrics::SimulationMetrics;
use crate::patient::{PatientGenerator, PatientProfile};
use crate::resource::{ResourcePool, ResourceType};
use crate::reward::{assignment_reward, wait_reward, UNDER_TRIAGE_PENALTY};
use crate::types::{
    Action, ActionKind, Reward, Situation, SituationKind, TimestampMs, TriageLevel,
};

/// Result of one environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub situation: Situation,
    pub reward: Reward,
    pub done: bool,
    pub info: StepInfo,
}

/// Side-channel information about a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Step index within the episode (1-based after the step).
    pub step: u64,
    pub queue_len: usize,
    pub available_resources: usize,
    /// Id of a patient who arrived during this step, if any.
    pub arrival: Option<String>,
    /// Resources that completed service this step.
    pub recovered_resources: u32,
    pub patients_treated: u64,
}

/// The environment. Single-owner mutable state; no external actor may
/// mutate the queue, pool or counters directly.
pub struct TriageEnv {
    config: EnvConfig,
    generator: PatientGenerator,
    pool: ResourcePool,
    queue: VecDeque<PatientProfile>,
    rng: ChaCha8Rng,

    // Episode-local state.
    steps: u64,
    done: bool,
    base_ms: TimestampMs,
    situation_counter: u64,
    seed: u64,

    // Accumulated counters (across episodes; throughput is defined
    // against wall-clock time since the first reset).
    first_reset_at: Option<Instant>,
    episodes_completed: u64,
    patients_treated: u64,
    total_wait_min: f64,
    total_satisfaction: f64,
    total_cost: f64,
    safety_incidents: u64,
    util_busy: BTreeMap<ResourceType, u64>,
    util_samples: u64,
}

impl TriageEnv {
    pub fn new(config: EnvConfig) -> Self {
        let pool = ResourcePool::new(&config);
        Self {
            config,
            generator: PatientGenerator::new(0),
            pool,
            queue: VecDeque::new(),
            rng: ChaCha8Rng::seed_from_u64(0),
            steps: 0,
            done: false,
            base_ms: 0,
            situation_counter: 0,
            seed: 0,
            first_reset_at: None,
            episodes_completed: 0,
            patients_treated: 0,
            total_wait_min: 0.0,
            total_satisfaction: 0.0,
            total_cost: 0.0,
            safety_incidents: 0,
            util_busy: BTreeMap::new(),
            util_samples: 0,
        }
    }

    /// Reset for a new episode: clear the queue, reinitialize the
    /// resource pool, generate the initial batch of patients and
    /// return the first situation. Must be called before `step`.
    pub fn reset(&mut self, seed: Option<u64>) -> Situation {
        let seed = seed.unwrap_or_else(|| self.rng.gen());
        self.seed = seed;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.generator.reseed(seed);

        if self.first_reset_at.is_none() {
            self.first_reset_at = Some(Instant::now());
        }

        self.queue.clear();
        self.pool.reset();
        self.steps = 0;
        self.done = false;
        self.base_ms = (seed % 10_000) as i64;

        for _ in 0..self.config.initial_patient_count {
            let patient = self.generator.generate(self.base_ms);
            self.queue.push_back(patient);
        }

        self.build_situation(SituationKind::Initial {
            waiting: self.queue_snapshot(),
        })
    }

    /// Admissible actions for the current queue snapshot: one
    /// assignment per queued patient per priority level, plus exactly
    /// one wait action. Pure: no side effects on the environment.
    pub fn available_actions(&self) -> Vec<Action> {
        let queue_len = self.queue.len();
        let mut actions = Vec::with_capacity(queue_len * TriageLevel::ALL.len() + 1);

        for patient in &self.queue {
            for level in TriageLevel::ALL {
                actions.push(Action {
                    id: format!("assign-{}-{}", patient.id, level.as_str()),
                    kind: ActionKind::AssignPriority {
                        patient_id: patient.id.clone(),
                        level,
                    },
                    constraints: vec![],
                    estimated_duration_min: Some(self.pool.nominal_wait_min(level, queue_len)),
                });
            }
        }

        actions.push(Action {
            id: "wait".to_string(),
            kind: ActionKind::Wait {
                duration_min: self.config.wait_action_duration_min,
            },
            constraints: vec![],
            estimated_duration_min: Some(self.config.wait_action_duration_min),
        });

        actions
    }

    /// Apply one action. Fails with `InvalidAction` when the id is not
    /// currently admissible; assignment of a missing patient fails with
    /// `EntityNotFound`. The two stochastic updates (arrival, resource
    /// recovery) run after every successful action, whatever its kind.
    pub fn step(&mut self, action: &Action) -> Result<StepOutcome, TriageError> {
        if let ActionKind::Transfer { .. } = action.kind {
            return Err(TriageError::UnsupportedActionKind {
                kind: action.kind.name().to_string(),
            });
        }

        let admissible = self.available_actions();
        if !admissible.iter().any(|a| a.id == action.id) {
            return Err(TriageError::InvalidAction {
                action_id: action.id.clone(),
            });
        }

        let reward = match &action.kind {
            ActionKind::AssignPriority { patient_id, level } => {
                self.apply_assignment(patient_id, *level)?
            }
            ActionKind::Wait { duration_min } => wait_reward(*duration_min),
            ActionKind::Transfer { .. } => unreachable!("rejected above"),
        };

        self.steps += 1;
        let now_ms = self.base_ms + self.steps as i64 * self.config.dt_ms;

        // Stochastic update (a): possible arrival, bounded queue.
        let mut arrival = None;
        if self.queue.len() < self.config.max_queue_len
            && self.config.patient_arrival_rate > 0.0
            && self
                .rng
                .gen_bool(self.config.patient_arrival_rate.clamp(0.0, 1.0))
        {
            let patient = self.generator.generate(now_ms);
            arrival = Some(patient.id.clone());
            self.queue.push_back(patient);
        }

        // Stochastic update (b): independent resource availability.
        let recovered = self.pool.stochastic_update(
            &mut self.rng,
            self.config.resource_recovery_prob,
            self.config.resource_busy_prob,
        );

        self.sample_utilization();

        let terminal = (self.queue.is_empty() && self.steps > self.config.terminal_step_threshold)
            || self.steps >= self.config.max_steps;
        self.done = terminal;
        if terminal {
            self.episodes_completed += 1;
        }

        let kind = if terminal {
            SituationKind::Terminal {
                patients_treated: self.patients_treated,
            }
        } else {
            match &action.kind {
                ActionKind::AssignPriority { patient_id, level } => SituationKind::Assessment {
                    waiting: self.queue_snapshot(),
                    assessed_patient: patient_id.clone(),
                    assigned_level: *level,
                },
                ActionKind::Wait { duration_min } => SituationKind::Waiting {
                    waiting: self.queue_snapshot(),
                    waited_min: *duration_min,
                },
                ActionKind::Transfer { .. } => unreachable!("rejected above"),
            }
        };

        let situation = self.build_situation(kind);
        let info = StepInfo {
            step: self.steps,
            queue_len: self.queue.len(),
            available_resources: self.pool.available_count(),
            arrival,
            recovered_resources: recovered,
            patients_treated: self.patients_treated,
        };

        Ok(StepOutcome {
            situation,
            reward,
            done: terminal,
            info,
        })
    }

    /// Metrics snapshot derived from the accumulated counters.
    pub fn metrics(&self) -> SimulationMetrics {
        let hours = self
            .first_reset_at
            .map(|t| t.elapsed().as_secs_f64() / 3600.0)
            .unwrap_or(0.0);
        let throughput_per_hour = if hours > 0.0 {
            self.episodes_completed as f64 / hours
        } else {
            0.0
        };

        let treated = self.patients_treated.max(1) as f64;
        let mut resource_utilization = BTreeMap::new();
        for kind in ResourceType::ALL {
            let total = self.pool.total_count(kind) as u64 * self.util_samples;
            let busy = self.util_busy.get(&kind).copied().unwrap_or(0);
            let util = if total > 0 {
                busy as f64 / total as f64
            } else {
                0.0
            };
            resource_utilization.insert(kind.as_str().to_string(), util);
        }

        SimulationMetrics {
            throughput_per_hour,
            average_wait_time_min: if self.patients_treated > 0 {
                self.total_wait_min / treated
            } else {
                0.0
            },
            patient_satisfaction: if self.patients_treated > 0 {
                self.total_satisfaction / treated
            } else {
                0.0
            },
            resource_utilization,
            cost_per_patient: if self.patients_treated > 0 {
                self.total_cost / treated
            } else {
                0.0
            },
            safety_incidents: self.safety_incidents,
            patients_treated: self.patients_treated,
            episodes_completed: self.episodes_completed,
        }
    }

    /// Called by the runner when it ends an episode the environment
    /// did not terminate itself (step cap, stop, error), so that
    /// throughput still counts it.
    pub fn record_episode_end(&mut self) {
        if !self.done {
            self.episodes_completed += 1;
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn available_resources(&self) -> usize {
        self.pool.available_count()
    }

    pub fn steps_this_episode(&self) -> u64 {
        self.steps
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    fn apply_assignment(
        &mut self,
        patient_id: &str,
        level: TriageLevel,
    ) -> Result<Reward, TriageError> {
        let position = self
            .queue
            .iter()
            .position(|p| p.id == patient_id)
            .ok_or_else(|| TriageError::EntityNotFound {
                patient_id: patient_id.to_string(),
            })?;

        let queue_len = self.queue.len();
        let est_wait = self.pool.estimate_wait_min(level, queue_len, &mut self.rng);

        // Reward is computed against the profile before removal.
        let reward = {
            let patient = &self.queue[position];
            assignment_reward(patient, level, est_wait)
        };

        // Entity lifecycle ends here; the profile is dropped.
        self.queue.remove(position);

        self.patients_treated += 1;
        self.total_wait_min += est_wait;
        self.total_satisfaction += (10.0 - est_wait / 12.0).clamp(0.0, 10.0);
        self.total_cost +=
            ResourceType::billing_type_for(level).cost_per_hour() * est_wait / 60.0;

        let under_triaged = reward
            .components
            .iter()
            .any(|c| c.name == "safety" && (c.value - UNDER_TRIAGE_PENALTY).abs() < 1e-9);
        if under_triaged {
            self.safety_incidents += 1;
        }

        Ok(reward)
    }

    fn sample_utilization(&mut self) {
        self.util_samples += 1;
        for kind in ResourceType::ALL {
            *self.util_busy.entry(kind).or_insert(0) += self.pool.busy_count(kind) as u64;
        }
    }

    fn queue_snapshot(&self) -> Vec<PatientProfile> {
        self.queue.iter().cloned().collect()
    }

    fn build_situation(&mut self, kind: SituationKind) -> Situation {
        self.situation_counter += 1;
        let terminal = matches!(kind, SituationKind::Terminal { .. });
        Situation {
            id: format!("situation-{}", self.situation_counter),
            timestamp_ms: self.base_ms + self.steps as i64 * self.config.dt_ms,
            kind,
            terminal,
        }
    }
}

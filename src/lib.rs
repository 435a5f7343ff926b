//! Triagesim core library.
//!
//! This crate exposes the emergency-department triage environment, the
//! rule-based agent and the episode runner. The binary (`src/main.rs`)
//! is just a thin simulation / research harness around these
//! components.

pub mod agent;
pub mod config;
pub mod env;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod patient;
pub mod resource;
pub mod reward;
pub mod rules;
pub mod runner;
pub mod types;

// --- Re-exports for ergonomic external use ---------------------------------

pub use agent::{Agent, AgentStats, Decision, NoopAgent, RuleBasedAgent};

pub use config::{EnvConfig, RunnerConfig};

pub use env::{StepInfo, StepOutcome, TriageEnv};

pub use error::TriageError;

pub use logging::{EventSink, FileSink, NoopSink};

pub use metrics::{
    DataExport, EpisodeEndReason, EpisodeResult, OnlineStats, PerformanceSummary,
    SimulationMetrics,
};

pub use patient::{Acuity, PatientGenerator, PatientProfile, Severity, VitalSigns};

pub use resource::{Resource, ResourcePool, ResourceType};

pub use rules::{default_rules, resolve, RuleCondition, RuleResolution, TriageRule};

pub use runner::{
    ControlSignal, EpisodeEvent, RunnerControl, RunnerState, SimulationRunner, StepEvent,
};

pub use types::{
    Action, ActionKind, Experience, Reward, RewardCategory, RewardComponent, Situation,
    SituationKind, TimestampMs, TriageLevel,
};

// --- Cross-module consistency tests -----------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::optimal_priority;

    fn mk_env(seed: u64) -> (TriageEnv, Situation) {
        let mut env = TriageEnv::new(
            EnvConfig::default()
                .with_initial_patient_count(20)
                .with_patient_arrival_rate(0.0),
        );
        let situation = env.reset(Some(seed));
        (env, situation)
    }

    /// The default rule table must agree with the reward ladder on the
    /// cases that matter most: critical patients always resolve to
    /// Immediate, which is also their optimal priority.
    #[test]
    fn rules_and_reward_agree_on_critical() {
        let (_env, situation) = mk_env(17);
        let rules = default_rules();

        for patient in situation.waiting() {
            if patient.condition.acuity == Acuity::Critical {
                let resolution = resolve(&rules, patient);
                assert_eq!(resolution.level, TriageLevel::Immediate);
                assert_eq!(optimal_priority(patient), TriageLevel::Immediate);
            }
        }
    }

    /// Following the rule table never triggers the under-triage
    /// penalty, for any generated patient.
    #[test]
    fn rule_following_avoids_safety_incidents() {
        let (mut env, situation) = mk_env(23);
        let rules = default_rules();

        for patient in situation.waiting() {
            let resolution = resolve(&rules, patient);
            let action = Action {
                id: format!("assign-{}-{}", patient.id, resolution.level.as_str()),
                kind: ActionKind::AssignPriority {
                    patient_id: patient.id.clone(),
                    level: resolution.level,
                },
                constraints: vec![],
                estimated_duration_min: None,
            };
            env.step(&action).unwrap();
        }

        assert_eq!(env.metrics().safety_incidents, 0);
    }
}

// src/agent.rs
//
// Agent contract and the rule-based reference agent.
//
// Agents map a situation and its admissible actions to one chosen
// action. The decision methods return boxed futures so that
// implementations backed by a remote policy can suspend; the runner
// always awaits them in sequence, so there is never more than one
// in-flight decision.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::TriageError;
use crate::metrics::EpisodeResult;
use crate::rules::{resolve, TriageRule};
use crate::types::{Action, ActionKind, Experience, Situation, TimestampMs};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Rolling history caps.
const EXPERIENCE_LOG_CAP: usize = 1000;
const DECISION_LOG_CAP: usize = 1000;

/// A chosen action with the agent's confidence in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    /// Confidence in [0, 1].
    pub confidence: f64,
}

/// One entry of the agent's decision history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub action_id: String,
    pub confidence: f64,
    pub timestamp_ms: TimestampMs,
}

/// Observability counters exposed by every agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub name: String,
    pub decisions: u64,
    pub positive_rewards: u64,
    pub negative_rewards: u64,
    pub experiences_retained: usize,
}

/// The agent contract. Only `select_action` and `update` may suspend;
/// the episode hooks are synchronous bookkeeping.
pub trait Agent: Send {
    fn name(&self) -> &str;

    /// Choose one of `actions` for `situation`.
    fn select_action<'a>(
        &'a mut self,
        situation: &'a Situation,
        actions: &'a [Action],
    ) -> BoxFuture<'a, Result<Decision, TriageError>>;

    /// Feed back one step's experience. The reference agents do not
    /// learn; they only keep a bounded log and counters.
    fn update<'a>(&'a mut self, experience: Experience) -> BoxFuture<'a, Result<(), TriageError>>;

    /// Called at the start of each episode.
    fn begin_episode(&mut self, _episode: u64) {}

    /// Called after every episode, including failed ones.
    fn end_episode(&mut self, _result: &EpisodeResult) {}

    fn stats(&self) -> AgentStats;
}

/// The rule-based agent: a pure table lookup per decision.
pub struct RuleBasedAgent {
    rules: Vec<TriageRule>,
    experiences: VecDeque<Experience>,
    decisions: VecDeque<DecisionRecord>,
    decision_count: u64,
    positive_rewards: u64,
    negative_rewards: u64,
}

impl Default for RuleBasedAgent {
    fn default() -> Self {
        Self::new(crate::rules::default_rules())
    }
}

impl RuleBasedAgent {
    /// Rules are configured once here and immutable afterwards.
    pub fn new(rules: Vec<TriageRule>) -> Self {
        Self {
            rules,
            experiences: VecDeque::new(),
            decisions: VecDeque::new(),
            decision_count: 0,
            positive_rewards: 0,
            negative_rewards: 0,
        }
    }

    pub fn rules(&self) -> &[TriageRule] {
        &self.rules
    }

    pub fn decision_history(&self) -> &VecDeque<DecisionRecord> {
        &self.decisions
    }

    pub fn experience_log(&self) -> &VecDeque<Experience> {
        &self.experiences
    }

    /// The synchronous core of the decision.
    fn decide(
        &mut self,
        situation: &Situation,
        actions: &[Action],
    ) -> Result<Decision, TriageError> {
        // Group assignment actions by patient, preserving encounter
        // order. The first group wins; ranking by urgency signals is a
        // known simplification kept on purpose.
        let mut groups: Vec<(&str, Vec<&Action>)> = Vec::new();
        for action in actions {
            if let ActionKind::AssignPriority { patient_id, .. } = &action.kind {
                match groups.iter_mut().find(|(id, _)| *id == patient_id.as_str()) {
                    Some((_, members)) => members.push(action),
                    None => groups.push((patient_id.as_str(), vec![action])),
                }
            }
        }

        let decision = if let Some((patient_id, members)) = groups.first() {
            let profile = situation.waiting().iter().find(|p| p.id == *patient_id);

            match profile {
                Some(patient) => {
                    let resolution = resolve(&self.rules, patient);
                    let confidence = if resolution.match_count > 0 {
                        (resolution.max_weight * 0.8 + resolution.match_count as f64 * 0.1)
                            .min(0.95)
                    } else {
                        0.3
                    };

                    let chosen = members.iter().find(|a| {
                        matches!(
                            &a.kind,
                            ActionKind::AssignPriority { level, .. } if *level == resolution.level
                        )
                    });

                    let action = match chosen {
                        Some(a) => (*a).clone(),
                        None => {
                            // Generator omitted the resolved level;
                            // degrade rather than fail.
                            eprintln!(
                                "warn: no admissible action at level {} for {}, using first",
                                resolution.level.as_str(),
                                patient_id
                            );
                            members[0].clone()
                        }
                    };

                    Decision { action, confidence }
                }
                None => {
                    // Stale snapshot; take the first admissible action
                    // for this patient with low confidence.
                    Decision {
                        action: members[0].clone(),
                        confidence: 0.3,
                    }
                }
            }
        } else {
            // No assignments are admissible: fall back to wait.
            let wait = actions
                .iter()
                .find(|a| matches!(a.kind, ActionKind::Wait { .. }))
                .ok_or(TriageError::NoValidAction)?;
            Decision {
                action: wait.clone(),
                confidence: 0.5,
            }
        };

        self.decision_count += 1;
        self.decisions.push_back(DecisionRecord {
            action_id: decision.action.id.clone(),
            confidence: decision.confidence,
            timestamp_ms: situation.timestamp_ms,
        });
        while self.decisions.len() > DECISION_LOG_CAP {
            self.decisions.pop_front();
        }

        Ok(decision)
    }
}

impl Agent for RuleBasedAgent {
    fn name(&self) -> &str {
        "rule-based"
    }

    fn select_action<'a>(
        &'a mut self,
        situation: &'a Situation,
        actions: &'a [Action],
    ) -> BoxFuture<'a, Result<Decision, TriageError>> {
        Box::pin(async move { self.decide(situation, actions) })
    }

    fn update<'a>(&'a mut self, experience: Experience) -> BoxFuture<'a, Result<(), TriageError>> {
        Box::pin(async move {
            if experience.reward.value > 0.0 {
                self.positive_rewards += 1;
            } else if experience.reward.value < 0.0 {
                self.negative_rewards += 1;
            }

            self.experiences.push_back(experience);
            while self.experiences.len() > EXPERIENCE_LOG_CAP {
                self.experiences.pop_front();
            }
            Ok(())
        })
    }

    fn stats(&self) -> AgentStats {
        AgentStats {
            name: self.name().to_string(),
            decisions: self.decision_count,
            positive_rewards: self.positive_rewards,
            negative_rewards: self.negative_rewards,
            experiences_retained: self.experiences.len(),
        }
    }
}

/// Trivial agent satisfying the contract: always waits when it can,
/// otherwise takes the first admissible action. Used as the reference
/// stub for orchestrator tests.
pub struct NoopAgent {
    decision_count: u64,
}

impl Default for NoopAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl NoopAgent {
    pub fn new() -> Self {
        Self { decision_count: 0 }
    }
}

impl Agent for NoopAgent {
    fn name(&self) -> &str {
        "noop"
    }

    fn select_action<'a>(
        &'a mut self,
        _situation: &'a Situation,
        actions: &'a [Action],
    ) -> BoxFuture<'a, Result<Decision, TriageError>> {
        Box::pin(async move {
            self.decision_count += 1;
            let action = actions
                .iter()
                .find(|a| matches!(a.kind, ActionKind::Wait { .. }))
                .or_else(|| actions.first())
                .ok_or(TriageError::NoValidAction)?;
            Ok(Decision {
                action: action.clone(),
                confidence: 0.5,
            })
        })
    }

    fn update<'a>(&'a mut self, _experience: Experience) -> BoxFuture<'a, Result<(), TriageError>> {
        Box::pin(async move { Ok(()) })
    }

    fn stats(&self) -> AgentStats {
        AgentStats {
            name: self.name().to_string(),
            decisions: self.decision_count,
            ..AgentStats::default()
        }
    }
}

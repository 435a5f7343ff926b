// src/types.rs
//
// Common data-only types shared across the simulator: situations,
// actions, rewards and experience records. These carry no behavior
// beyond construction helpers and are produced only by the environment
// (situations, actions, rewards) or the runner (experiences).

use serde::{Deserialize, Serialize};

use crate::patient::PatientProfile;

/// Millisecond timestamp on the simulated timebase.
pub type TimestampMs = i64;

/// Ordinal triage priority. Lower number = more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TriageLevel {
    /// Level 1: immediate, life-threatening.
    Immediate,
    /// Level 2: urgent, potentially life-threatening.
    Urgent,
    /// Level 3: less urgent, stable but needs care.
    LessUrgent,
    /// Level 4: non-urgent.
    NonUrgent,
}

impl TriageLevel {
    /// All levels, most urgent first.
    pub const ALL: [TriageLevel; 4] = [
        TriageLevel::Immediate,
        TriageLevel::Urgent,
        TriageLevel::LessUrgent,
        TriageLevel::NonUrgent,
    ];

    /// Numeric rank (1 = most urgent).
    pub fn as_number(&self) -> u8 {
        match self {
            TriageLevel::Immediate => 1,
            TriageLevel::Urgent => 2,
            TriageLevel::LessUrgent => 3,
            TriageLevel::NonUrgent => 4,
        }
    }

    /// The least urgent level (default when no rule matches).
    pub fn least_urgent() -> TriageLevel {
        TriageLevel::NonUrgent
    }

    /// Stable lowercase name, used in action ids and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TriageLevel::Immediate => "immediate",
            TriageLevel::Urgent => "urgent",
            TriageLevel::LessUrgent => "less_urgent",
            TriageLevel::NonUrgent => "non_urgent",
        }
    }
}

/// Situation kind: a tagged union carrying only the fields that kind
/// needs. Non-terminal kinds carry a read-only snapshot of the waiting
/// queue so the rule table can evaluate patient profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SituationKind {
    /// First situation of an episode, straight after reset.
    Initial { waiting: Vec<PatientProfile> },
    /// A priority was just assigned to a patient.
    Assessment {
        waiting: Vec<PatientProfile>,
        assessed_patient: String,
        assigned_level: TriageLevel,
    },
    /// A wait step was taken; the queue is unchanged.
    Waiting {
        waiting: Vec<PatientProfile>,
        waited_min: f64,
    },
    /// The episode is over.
    Terminal { patients_treated: u64 },
}

/// Immutable snapshot of the simulated world at one point in an episode.
/// Produced only by the environment; consumed read-only elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Situation {
    pub id: String,
    pub timestamp_ms: TimestampMs,
    pub kind: SituationKind,
    pub terminal: bool,
}

impl Situation {
    /// Waiting-queue snapshot (empty for terminal situations).
    pub fn waiting(&self) -> &[PatientProfile] {
        match &self.kind {
            SituationKind::Initial { waiting }
            | SituationKind::Assessment { waiting, .. }
            | SituationKind::Waiting { waiting, .. } => waiting,
            SituationKind::Terminal { .. } => &[],
        }
    }

    pub fn queue_len(&self) -> usize {
        self.waiting().len()
    }
}

/// Action kind: a tagged union per action family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Assign a triage priority to a queued patient.
    AssignPriority {
        patient_id: String,
        level: TriageLevel,
    },
    /// Do nothing for `duration_min` simulated minutes.
    Wait { duration_min: f64 },
    /// Reserved: transfer to an external facility. Modeled in the data
    /// layer but not implemented by the environment, which rejects it
    /// with `UnsupportedActionKind`.
    Transfer {
        patient_id: String,
        destination: String,
    },
}

impl ActionKind {
    /// Stable lowercase kind name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::AssignPriority { .. } => "assign_priority",
            ActionKind::Wait { .. } => "wait",
            ActionKind::Transfer { .. } => "transfer",
        }
    }
}

/// An admissible action emitted by the environment's generator.
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub kind: ActionKind,
    /// Free-form constraints (e.g. "requires_bed"); informational only.
    pub constraints: Vec<String>,
    /// Nominal duration estimate in minutes, when meaningful.
    pub estimated_duration_min: Option<f64>,
}

impl Action {
    /// Patient this action targets, if any.
    pub fn patient_id(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::AssignPriority { patient_id, .. }
            | ActionKind::Transfer { patient_id, .. } => Some(patient_id),
            ActionKind::Wait { .. } => None,
        }
    }
}

/// Category tag on a reward component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardCategory {
    Outcome,
    Efficiency,
    Safety,
}

/// One named, weighted component of a reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardComponent {
    pub name: String,
    pub value: f64,
    pub weight: f64,
    pub category: RewardCategory,
}

/// Multi-component reward. Invariant: `value` equals the weighted sum
/// of the components; `from_components` is the only constructor the
/// environment uses, so the invariant holds for every issued reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub value: f64,
    pub components: Vec<RewardComponent>,
    pub reasoning: String,
}

impl Reward {
    /// Build a reward whose scalar value is the weighted component sum.
    pub fn from_components(components: Vec<RewardComponent>, reasoning: String) -> Self {
        let value = components.iter().map(|c| c.value * c.weight).sum();
        Self {
            value,
            components,
            reasoning,
        }
    }

    /// Check the weighted-sum invariant within `tol`.
    pub fn is_consistent(&self, tol: f64) -> bool {
        let sum: f64 = self.components.iter().map(|c| c.value * c.weight).sum();
        (self.value - sum).abs() <= tol
    }
}

/// The atomic unit of one step, passed to the agent's update hook.
/// Created once per step, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub situation: Situation,
    pub action: Action,
    pub reward: Reward,
    pub next_situation: Situation,
    pub terminal: bool,
    pub timestamp_ms: TimestampMs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering_is_urgency_ordering() {
        assert!(TriageLevel::Immediate < TriageLevel::Urgent);
        assert!(TriageLevel::Urgent < TriageLevel::LessUrgent);
        assert_eq!(TriageLevel::Immediate.as_number(), 1);
        assert_eq!(TriageLevel::NonUrgent.as_number(), 4);
        assert_eq!(TriageLevel::least_urgent(), TriageLevel::NonUrgent);
    }

    #[test]
    fn test_reward_from_components_weighted_sum() {
        let reward = Reward::from_components(
            vec![
                RewardComponent {
                    name: "accuracy".to_string(),
                    value: 10.0,
                    weight: 0.4,
                    category: RewardCategory::Outcome,
                },
                RewardComponent {
                    name: "safety".to_string(),
                    value: 5.0,
                    weight: 0.3,
                    category: RewardCategory::Safety,
                },
            ],
            "test".to_string(),
        );

        assert!((reward.value - 5.5).abs() < 1e-9);
        assert!(reward.is_consistent(1e-9));
    }

    #[test]
    fn test_action_patient_id() {
        let assign = Action {
            id: "assign-patient-1-immediate".to_string(),
            kind: ActionKind::AssignPriority {
                patient_id: "patient-1".to_string(),
                level: TriageLevel::Immediate,
            },
            constraints: vec![],
            estimated_duration_min: None,
        };
        assert_eq!(assign.patient_id(), Some("patient-1"));

        let wait = Action {
            id: "wait".to_string(),
            kind: ActionKind::Wait { duration_min: 5.0 },
            constraints: vec![],
            estimated_duration_min: Some(5.0),
        };
        assert_eq!(wait.patient_id(), None);
    }
}

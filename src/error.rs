// src/error.rs
//
// Step-level error taxonomy for the triage environment and agents.
//
// All of these are local failures: the runner catches them, marks the
// in-progress episode as failed, still fires the end-of-episode hooks,
// and continues with the next episode. Nothing in the core aborts the
// process.

/// Errors surfaced by `TriageEnv::step` and agent decision-making.
#[derive(Debug, Clone, PartialEq)]
pub enum TriageError {
    /// The action id is not currently admissible.
    InvalidAction { action_id: String },
    /// An assignment referenced a patient no longer in the queue.
    EntityNotFound { patient_id: String },
    /// The agent could not find any admissible action (no wait fallback
    /// either). Fatal to the episode only.
    NoValidAction,
    /// The environment was given an action kind it does not implement.
    UnsupportedActionKind { kind: String },
}

impl std::fmt::Display for TriageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriageError::InvalidAction { action_id } => {
                write!(f, "Action '{}' is not currently admissible", action_id)
            }
            TriageError::EntityNotFound { patient_id } => {
                write!(f, "Patient '{}' is not in the queue", patient_id)
            }
            TriageError::NoValidAction => {
                write!(f, "No admissible action available to the agent")
            }
            TriageError::UnsupportedActionKind { kind } => {
                write!(f, "Unsupported action kind '{}'", kind)
            }
        }
    }
}

impl std::error::Error for TriageError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages_name_the_offender() {
        let err = TriageError::InvalidAction {
            action_id: "assign-patient-3-2".to_string(),
        };
        assert!(err.to_string().contains("assign-patient-3-2"));

        let err = TriageError::EntityNotFound {
            patient_id: "patient-7".to_string(),
        };
        assert!(err.to_string().contains("patient-7"));
    }
}

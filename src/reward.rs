// src/reward.rs
//
// The reward model: a fixed clinical-severity ladder as ground truth,
// plus weighted accuracy / efficiency / safety components.
//
// Every assignment reward satisfies
//   value == sum(component.value * component.weight)
// because both constructors go through Reward::from_components.

use crate::patient::{Acuity, PatientProfile, Severity};
use crate::types::{Reward, RewardCategory, RewardComponent, TriageLevel};

/// Component weights for assignment rewards.
pub const ACCURACY_WEIGHT: f64 = 0.4;
pub const EFFICIENCY_WEIGHT: f64 = 0.3;
pub const SAFETY_WEIGHT: f64 = 0.3;

/// Safety score when an assignment under-triages a critical patient.
pub const UNDER_TRIAGE_PENALTY: f64 = -20.0;
/// Safety score for every other assignment.
pub const SAFETY_BASELINE: f64 = 5.0;

/// Per-minute penalty rate of the wait action.
pub const WAIT_PENALTY_PER_MIN: f64 = 0.1;

/// The clinical-severity ladder. This is the reward model's ground
/// truth; the rule table is scored against it.
pub fn optimal_priority(patient: &PatientProfile) -> TriageLevel {
    if patient.condition.acuity == Acuity::Critical {
        TriageLevel::Immediate
    } else if patient.condition.severity == Severity::Severe || patient.vitals.is_extreme() {
        TriageLevel::Urgent
    } else if patient.condition.severity == Severity::Moderate
        || patient.condition.pain_scale.map_or(false, |p| p >= 7)
    {
        TriageLevel::LessUrgent
    } else {
        TriageLevel::NonUrgent
    }
}

/// Accuracy score: 10 minus 2 per level of distance from optimal,
/// floored at 0.
pub fn accuracy_score(assigned: TriageLevel, optimal: TriageLevel) -> f64 {
    let distance = (assigned.as_number() as f64 - optimal.as_number() as f64).abs();
    (10.0 - 2.0 * distance).max(0.0)
}

/// Efficiency score: 10 minus a tenth of the estimated wait, floored
/// at 0.
pub fn efficiency_score(estimated_wait_min: f64) -> f64 {
    (10.0 - estimated_wait_min / 10.0).max(0.0)
}

/// Safety score: baseline 5, or the hard under-triage penalty when a
/// critical-acuity patient is assigned anything less urgent than
/// Urgent.
pub fn safety_score(patient: &PatientProfile, assigned: TriageLevel) -> f64 {
    if patient.condition.acuity == Acuity::Critical && assigned > TriageLevel::Urgent {
        UNDER_TRIAGE_PENALTY
    } else {
        SAFETY_BASELINE
    }
}

/// Reward for assigning `assigned` to `patient` with the given wait
/// estimate.
pub fn assignment_reward(
    patient: &PatientProfile,
    assigned: TriageLevel,
    estimated_wait_min: f64,
) -> Reward {
    let optimal = optimal_priority(patient);
    let accuracy = accuracy_score(assigned, optimal);
    let efficiency = efficiency_score(estimated_wait_min);
    let safety = safety_score(patient, assigned);

    let reasoning = format!(
        "assigned {} (optimal {}), est wait {:.1} min",
        assigned.as_str(),
        optimal.as_str(),
        estimated_wait_min
    );

    Reward::from_components(
        vec![
            RewardComponent {
                name: "accuracy".to_string(),
                value: accuracy,
                weight: ACCURACY_WEIGHT,
                category: RewardCategory::Outcome,
            },
            RewardComponent {
                name: "efficiency".to_string(),
                value: efficiency,
                weight: EFFICIENCY_WEIGHT,
                category: RewardCategory::Efficiency,
            },
            RewardComponent {
                name: "safety".to_string(),
                value: safety,
                weight: SAFETY_WEIGHT,
                category: RewardCategory::Safety,
            },
        ],
        reasoning,
    )
}

/// Reward for a wait step: a small negative reward proportional to the
/// requested duration, single component, no weighting split.
pub fn wait_reward(duration_min: f64) -> Reward {
    Reward::from_components(
        vec![RewardComponent {
            name: "wait_penalty".to_string(),
            value: -WAIT_PENALTY_PER_MIN * duration_min,
            weight: 1.0,
            category: RewardCategory::Efficiency,
        }],
        format!("waited {:.1} min", duration_min),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::PatientGenerator;

    fn patient_with(acuity: Acuity, severity: Severity, pain: Option<u8>) -> PatientProfile {
        let mut generator = PatientGenerator::new(5);
        let mut p = generator.generate(0);
        p.condition.acuity = acuity;
        p.condition.severity = severity;
        p.condition.pain_scale = pain;
        p.vitals.heart_rate_bpm = 75.0;
        p.vitals.systolic_bp_mmhg = 120.0;
        p.vitals.respiratory_rate = 16.0;
        p.vitals.temperature_c = 36.8;
        p.vitals.spo2_pct = 98.0;
        p
    }

    #[test]
    fn test_ladder_rungs() {
        let p = patient_with(Acuity::Critical, Severity::Mild, None);
        assert_eq!(optimal_priority(&p), TriageLevel::Immediate);

        let p = patient_with(Acuity::High, Severity::Severe, None);
        assert_eq!(optimal_priority(&p), TriageLevel::Urgent);

        let mut p = patient_with(Acuity::Low, Severity::Mild, None);
        p.vitals.spo2_pct = 85.0; // extreme vitals alone reach Urgent
        assert_eq!(optimal_priority(&p), TriageLevel::Urgent);

        let p = patient_with(Acuity::Moderate, Severity::Moderate, None);
        assert_eq!(optimal_priority(&p), TriageLevel::LessUrgent);

        let p = patient_with(Acuity::Low, Severity::Mild, Some(8));
        assert_eq!(optimal_priority(&p), TriageLevel::LessUrgent);

        let p = patient_with(Acuity::Low, Severity::Mild, Some(2));
        assert_eq!(optimal_priority(&p), TriageLevel::NonUrgent);
    }

    #[test]
    fn test_accuracy_score_drops_two_per_level() {
        assert!((accuracy_score(TriageLevel::Urgent, TriageLevel::Urgent) - 10.0).abs() < 1e-9);
        assert!((accuracy_score(TriageLevel::Immediate, TriageLevel::Urgent) - 8.0).abs() < 1e-9);
        assert!((accuracy_score(TriageLevel::NonUrgent, TriageLevel::Urgent) - 6.0).abs() < 1e-9);
        assert!(
            (accuracy_score(TriageLevel::NonUrgent, TriageLevel::Immediate) - 4.0).abs() < 1e-9
        );
    }

    #[test]
    fn test_efficiency_floor() {
        assert!((efficiency_score(0.0) - 10.0).abs() < 1e-9);
        assert!((efficiency_score(50.0) - 5.0).abs() < 1e-9);
        assert_eq!(efficiency_score(500.0), 0.0);
    }

    #[test]
    fn test_under_triage_penalty_fires_below_urgent_only() {
        let critical = patient_with(Acuity::Critical, Severity::Severe, None);
        assert_eq!(safety_score(&critical, TriageLevel::Immediate), SAFETY_BASELINE);
        assert_eq!(safety_score(&critical, TriageLevel::Urgent), SAFETY_BASELINE);
        assert_eq!(
            safety_score(&critical, TriageLevel::LessUrgent),
            UNDER_TRIAGE_PENALTY
        );
        assert_eq!(
            safety_score(&critical, TriageLevel::NonUrgent),
            UNDER_TRIAGE_PENALTY
        );

        let stable = patient_with(Acuity::Low, Severity::Mild, None);
        assert_eq!(safety_score(&stable, TriageLevel::NonUrgent), SAFETY_BASELINE);
    }

    #[test]
    fn test_assignment_reward_weighted_sum() {
        let p = patient_with(Acuity::Moderate, Severity::Moderate, None);
        let reward = assignment_reward(&p, TriageLevel::LessUrgent, 20.0);

        // accuracy 10 * 0.4 + efficiency 8 * 0.3 + safety 5 * 0.3
        assert!((reward.value - (4.0 + 2.4 + 1.5)).abs() < 1e-9);
        assert!(reward.is_consistent(1e-9));
        assert_eq!(reward.components.len(), 3);
    }

    #[test]
    fn test_wait_reward_scales_with_duration() {
        let reward = wait_reward(5.0);
        assert!((reward.value - (-0.5)).abs() < 1e-9);
        assert_eq!(reward.components.len(), 1);
        assert!(reward.is_consistent(1e-9));
    }
}

// src/rules.rs
//
// Tagged predicate descriptors for the rule-based agent.
//
// Each rule is (condition, target level, weight, reasoning) and is
// immutable after construction; the ordered table is the agent's entire
// decision surface. Resolution semantics: among matching rules the
// lowest level number wins, ties broken by higher weight.

use serde::{Deserialize, Serialize};

use crate::patient::{Acuity, PatientProfile, Severity};
use crate::types::TriageLevel;

/// Predicate over a patient profile, evaluated by a generic matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuleCondition {
    /// Acuity equals the given value.
    AcuityIs(Acuity),
    /// Severity is at least the given value.
    SeverityAtLeast(Severity),
    /// Reported pain scale is at least the given value (no report
    /// never matches).
    PainAtLeast(u8),
    /// Any vital sign is in an extreme band.
    VitalsExtreme,
    /// Age is at least the given value.
    AgeAtLeast(u32),
    /// All sub-conditions match.
    AllOf(Vec<RuleCondition>),
    /// At least one sub-condition matches.
    AnyOf(Vec<RuleCondition>),
}

impl RuleCondition {
    /// Generic matcher.
    pub fn matches(&self, patient: &PatientProfile) -> bool {
        match self {
            RuleCondition::AcuityIs(acuity) => patient.condition.acuity == *acuity,
            RuleCondition::SeverityAtLeast(severity) => patient.condition.severity >= *severity,
            RuleCondition::PainAtLeast(pain) => {
                patient.condition.pain_scale.map_or(false, |p| p >= *pain)
            }
            RuleCondition::VitalsExtreme => patient.vitals.is_extreme(),
            RuleCondition::AgeAtLeast(age) => patient.demographics.age_years >= *age,
            RuleCondition::AllOf(conds) => conds.iter().all(|c| c.matches(patient)),
            RuleCondition::AnyOf(conds) => conds.iter().any(|c| c.matches(patient)),
        }
    }
}

/// One weighted condition -> priority rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageRule {
    pub id: String,
    pub level: TriageLevel,
    pub condition: RuleCondition,
    /// Weight in [0, 1]; clamped at construction.
    pub weight: f64,
    pub reasoning: String,
}

impl TriageRule {
    pub fn new(
        id: &str,
        level: TriageLevel,
        condition: RuleCondition,
        weight: f64,
        reasoning: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            level,
            condition,
            weight: weight.clamp(0.0, 1.0),
            reasoning: reasoning.to_string(),
        }
    }
}

/// Outcome of resolving the rule table against one patient.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleResolution {
    pub level: TriageLevel,
    /// Highest weight among matching rules (0 when none matched).
    pub max_weight: f64,
    /// Number of matching rules.
    pub match_count: usize,
    /// Id of the winning rule, if any matched.
    pub winning_rule: Option<String>,
}

/// Resolve `rules` against `patient`.
///
/// Among matching rules the numerically lowest level wins; ties break
/// toward the higher weight. With no match, the least-urgent level is
/// returned with zero matches.
pub fn resolve(rules: &[TriageRule], patient: &PatientProfile) -> RuleResolution {
    let mut winner: Option<&TriageRule> = None;
    let mut max_weight = 0.0_f64;
    let mut match_count = 0usize;

    for rule in rules {
        if !rule.condition.matches(patient) {
            continue;
        }
        match_count += 1;
        max_weight = max_weight.max(rule.weight);

        let beats = match winner {
            None => true,
            Some(current) => {
                rule.level < current.level
                    || (rule.level == current.level && rule.weight > current.weight)
            }
        };
        if beats {
            winner = Some(rule);
        }
    }

    match winner {
        Some(rule) => RuleResolution {
            level: rule.level,
            max_weight,
            match_count,
            winning_rule: Some(rule.id.clone()),
        },
        None => RuleResolution {
            level: TriageLevel::least_urgent(),
            max_weight: 0.0,
            match_count: 0,
            winning_rule: None,
        },
    }
}

/// The reference rule table.
pub fn default_rules() -> Vec<TriageRule> {
    vec![
        TriageRule::new(
            "critical-acuity",
            TriageLevel::Immediate,
            RuleCondition::AcuityIs(Acuity::Critical),
            0.95,
            "Critical acuity requires immediate attention",
        ),
        TriageRule::new(
            "severe-severity",
            TriageLevel::Urgent,
            RuleCondition::SeverityAtLeast(Severity::Severe),
            0.85,
            "Severe symptoms warrant urgent assessment",
        ),
        TriageRule::new(
            "extreme-vitals",
            TriageLevel::Urgent,
            RuleCondition::VitalsExtreme,
            0.80,
            "Deranged vital signs warrant urgent assessment",
        ),
        TriageRule::new(
            "high-pain",
            TriageLevel::LessUrgent,
            RuleCondition::PainAtLeast(7),
            0.70,
            "High reported pain deserves expedited care",
        ),
        TriageRule::new(
            "moderate-severity",
            TriageLevel::LessUrgent,
            RuleCondition::SeverityAtLeast(Severity::Moderate),
            0.65,
            "Moderate symptoms can wait behind urgent cases",
        ),
        TriageRule::new(
            "elderly-frailty",
            TriageLevel::LessUrgent,
            RuleCondition::AllOf(vec![
                RuleCondition::AgeAtLeast(80),
                RuleCondition::SeverityAtLeast(Severity::Moderate),
            ]),
            0.55,
            "Frail elderly patients decompensate quickly",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::PatientGenerator;

    fn patient_with(acuity: Acuity, severity: Severity, pain: Option<u8>) -> PatientProfile {
        let mut generator = PatientGenerator::new(99);
        let mut p = generator.generate(0);
        p.condition.acuity = acuity;
        p.condition.severity = severity;
        p.condition.pain_scale = pain;
        // Neutral vitals so VitalsExtreme does not fire accidentally.
        p.vitals.heart_rate_bpm = 75.0;
        p.vitals.systolic_bp_mmhg = 120.0;
        p.vitals.respiratory_rate = 16.0;
        p.vitals.temperature_c = 36.8;
        p.vitals.spo2_pct = 98.0;
        p.demographics.age_years = 40;
        p
    }

    #[test]
    fn test_critical_acuity_always_resolves_immediate() {
        let rules = default_rules();
        // Critical must dominate whatever else matches.
        for severity in [Severity::Mild, Severity::Moderate, Severity::Severe] {
            for pain in [None, Some(10)] {
                let p = patient_with(Acuity::Critical, severity, pain);
                let res = resolve(&rules, &p);
                assert_eq!(res.level, TriageLevel::Immediate);
                assert_eq!(res.winning_rule.as_deref(), Some("critical-acuity"));
            }
        }
    }

    #[test]
    fn test_no_match_defaults_to_least_urgent() {
        let rules = default_rules();
        let p = patient_with(Acuity::Low, Severity::Mild, Some(2));
        let res = resolve(&rules, &p);
        assert_eq!(res.level, TriageLevel::NonUrgent);
        assert_eq!(res.match_count, 0);
        assert!(res.winning_rule.is_none());
    }

    #[test]
    fn test_tie_breaks_toward_higher_weight() {
        // Two rules at the same level; the heavier one must win.
        let rules = vec![
            TriageRule::new(
                "light",
                TriageLevel::Urgent,
                RuleCondition::SeverityAtLeast(Severity::Moderate),
                0.5,
                "",
            ),
            TriageRule::new(
                "heavy",
                TriageLevel::Urgent,
                RuleCondition::PainAtLeast(5),
                0.9,
                "",
            ),
        ];
        let p = patient_with(Acuity::Moderate, Severity::Moderate, Some(6));
        let res = resolve(&rules, &p);
        assert_eq!(res.winning_rule.as_deref(), Some("heavy"));
        assert_eq!(res.match_count, 2);
        assert!((res.max_weight - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_lower_level_beats_higher_weight() {
        let rules = vec![
            TriageRule::new(
                "urgent-heavy",
                TriageLevel::Urgent,
                RuleCondition::SeverityAtLeast(Severity::Moderate),
                0.99,
                "",
            ),
            TriageRule::new(
                "immediate-light",
                TriageLevel::Immediate,
                RuleCondition::PainAtLeast(5),
                0.10,
                "",
            ),
        ];
        let p = patient_with(Acuity::Moderate, Severity::Moderate, Some(6));
        let res = resolve(&rules, &p);
        assert_eq!(res.level, TriageLevel::Immediate);
        assert_eq!(res.winning_rule.as_deref(), Some("immediate-light"));
    }

    #[test]
    fn test_missing_pain_report_never_matches_pain_rule() {
        let rules = vec![TriageRule::new(
            "high-pain",
            TriageLevel::LessUrgent,
            RuleCondition::PainAtLeast(7),
            0.7,
            "",
        )];
        let p = patient_with(Acuity::Low, Severity::Mild, None);
        let res = resolve(&rules, &p);
        assert_eq!(res.match_count, 0);
    }

    #[test]
    fn test_weight_clamped_at_construction() {
        let rule = TriageRule::new(
            "overweight",
            TriageLevel::Urgent,
            RuleCondition::VitalsExtreme,
            1.7,
            "",
        );
        assert!((rule.weight - 1.0).abs() < 1e-12);
    }
}

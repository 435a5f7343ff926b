// src/patient.rs
//
// Patient profiles and the seeded generator that produces them.
//
// Profiles are created by the environment's generator, owned by the
// environment's queue until removed by a successful assignment, and
// never shared or referenced after removal. Situations carry cloned
// snapshots for the rule table.
//
// All generation is deterministic given a seed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::types::TimestampMs;

/// Clinical acuity of the presenting condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acuity {
    Low,
    Moderate,
    High,
    Critical,
}

/// Symptom severity, orthogonal to acuity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

/// Point-in-time vital signs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub heart_rate_bpm: f64,
    pub systolic_bp_mmhg: f64,
    pub respiratory_rate: f64,
    pub temperature_c: f64,
    pub spo2_pct: f64,
}

impl VitalSigns {
    /// Whether any vital is outside the hard "extreme" bands used by
    /// the reward ladder and the rule table.
    pub fn is_extreme(&self) -> bool {
        self.heart_rate_bpm > 130.0
            || self.heart_rate_bpm < 40.0
            || self.systolic_bp_mmhg < 90.0
            || self.systolic_bp_mmhg > 200.0
            || self.respiratory_rate > 30.0
            || self.respiratory_rate < 8.0
            || self.temperature_c > 40.0
            || self.spo2_pct < 90.0
    }
}

/// Basic demographics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub age_years: u32,
    pub sex: String,
}

/// Presenting condition, including the severity/acuity pair the reward
/// ladder is scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub chief_complaint: String,
    pub acuity: Acuity,
    pub severity: Severity,
    /// Self-reported pain, 0..=10, when the patient can report one.
    pub pain_scale: Option<u8>,
}

/// Social context relevant to disposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialContext {
    pub arrived_alone: bool,
    pub needs_interpreter: bool,
}

/// A patient waiting for triage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: String,
    pub demographics: Demographics,
    /// Prior diagnoses / notable history items.
    pub history: Vec<String>,
    pub condition: Condition,
    pub vitals: VitalSigns,
    pub social: SocialContext,
    /// Simulated arrival time.
    pub arrived_at_ms: TimestampMs,
}

const COMPLAINTS: &[&str] = &[
    "chest pain",
    "shortness of breath",
    "abdominal pain",
    "laceration",
    "fever",
    "headache",
    "ankle injury",
    "dizziness",
    "back pain",
    "allergic reaction",
];

const HISTORY_ITEMS: &[&str] = &[
    "hypertension",
    "diabetes mellitus",
    "asthma",
    "atrial fibrillation",
    "prior MI",
    "CKD stage 3",
];

/// Deterministic patient generator.
///
/// Same seed => identical sequence of profiles (ids differ only through
/// the monotonic counter, which `reseed` does not rewind so that ids
/// stay unique across episodes).
pub struct PatientGenerator {
    rng: ChaCha8Rng,
    counter: u64,
}

impl PatientGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            counter: 0,
        }
    }

    /// Reseed the draw stream without rewinding the id counter.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Generate one patient arriving at `now_ms`.
    pub fn generate(&mut self, now_ms: TimestampMs) -> PatientProfile {
        self.counter += 1;
        let id = format!("patient-{}", self.counter);

        let acuity = self.sample_acuity();
        let severity = self.sample_severity(acuity);
        let vitals = self.sample_vitals(acuity);

        let pain_scale = if self.rng.gen_bool(0.85) {
            let base = match severity {
                Severity::Mild => self.rng.gen_range(0..=4),
                Severity::Moderate => self.rng.gen_range(3..=7),
                Severity::Severe => self.rng.gen_range(6..=10),
            };
            Some(base)
        } else {
            None
        };

        let age_years = self.rng.gen_range(1..=95);
        let sex = if self.rng.gen_bool(0.5) { "F" } else { "M" };

        let n_history = self.rng.gen_range(0..=3);
        let mut history = Vec::with_capacity(n_history);
        for _ in 0..n_history {
            let item = HISTORY_ITEMS[self.rng.gen_range(0..HISTORY_ITEMS.len())];
            if !history.iter().any(|h: &String| h == item) {
                history.push(item.to_string());
            }
        }

        let complaint = COMPLAINTS[self.rng.gen_range(0..COMPLAINTS.len())];

        PatientProfile {
            id,
            demographics: Demographics {
                age_years,
                sex: sex.to_string(),
            },
            history,
            condition: Condition {
                chief_complaint: complaint.to_string(),
                acuity,
                severity,
                pain_scale,
            },
            vitals,
            social: SocialContext {
                arrived_alone: self.rng.gen_bool(0.4),
                needs_interpreter: self.rng.gen_bool(0.1),
            },
            arrived_at_ms: now_ms,
        }
    }

    fn sample_acuity(&mut self) -> Acuity {
        let roll: f64 = self.rng.gen();
        if roll < 0.10 {
            Acuity::Critical
        } else if roll < 0.30 {
            Acuity::High
        } else if roll < 0.70 {
            Acuity::Moderate
        } else {
            Acuity::Low
        }
    }

    fn sample_severity(&mut self, acuity: Acuity) -> Severity {
        // Severity correlates loosely with acuity but is its own draw.
        let roll: f64 = self.rng.gen();
        match acuity {
            Acuity::Critical | Acuity::High => {
                if roll < 0.6 {
                    Severity::Severe
                } else if roll < 0.9 {
                    Severity::Moderate
                } else {
                    Severity::Mild
                }
            }
            Acuity::Moderate => {
                if roll < 0.2 {
                    Severity::Severe
                } else if roll < 0.7 {
                    Severity::Moderate
                } else {
                    Severity::Mild
                }
            }
            Acuity::Low => {
                if roll < 0.05 {
                    Severity::Severe
                } else if roll < 0.35 {
                    Severity::Moderate
                } else {
                    Severity::Mild
                }
            }
        }
    }

    fn sample_vitals(&mut self, acuity: Acuity) -> VitalSigns {
        // Baseline normals with noise; critical patients drift toward
        // the extreme bands.
        let derange = match acuity {
            Acuity::Critical => 1.0,
            Acuity::High => 0.5,
            Acuity::Moderate => 0.2,
            Acuity::Low => 0.05,
        };

        let hr = 75.0 + self.rng.gen_range(-10.0..10.0) + derange * self.rng.gen_range(0.0..70.0);
        let sbp = 120.0 + self.rng.gen_range(-15.0..15.0) - derange * self.rng.gen_range(0.0..40.0);
        let rr = 16.0 + self.rng.gen_range(-3.0..3.0) + derange * self.rng.gen_range(0.0..18.0);
        let temp = 36.8 + self.rng.gen_range(-0.5..0.5) + derange * self.rng.gen_range(0.0..3.5);
        let spo2 = 98.0 - self.rng.gen_range(0.0..2.0) - derange * self.rng.gen_range(0.0..12.0);

        VitalSigns {
            heart_rate_bpm: hr,
            systolic_bp_mmhg: sbp,
            respiratory_rate: rr,
            temperature_c: temp,
            spo2_pct: spo2.min(100.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_deterministic_given_seed() {
        let mut gen1 = PatientGenerator::new(42);
        let mut gen2 = PatientGenerator::new(42);

        for _ in 0..20 {
            let p1 = gen1.generate(0);
            let p2 = gen2.generate(0);
            assert_eq!(p1, p2);
        }
    }

    #[test]
    fn test_reseed_keeps_ids_unique() {
        let mut gen = PatientGenerator::new(1);
        let a = gen.generate(0);
        gen.reseed(1);
        let b = gen.generate(0);

        // Same draw stream, but the id counter must not rewind.
        assert_ne!(a.id, b.id);
        assert_eq!(a.condition, b.condition);
    }

    #[test]
    fn test_pain_scale_in_range() {
        let mut gen = PatientGenerator::new(7);
        for _ in 0..100 {
            let p = gen.generate(0);
            if let Some(pain) = p.condition.pain_scale {
                assert!(pain <= 10);
            }
        }
    }

    #[test]
    fn test_extreme_vitals_flag() {
        let vitals = VitalSigns {
            heart_rate_bpm: 140.0,
            systolic_bp_mmhg: 120.0,
            respiratory_rate: 16.0,
            temperature_c: 36.8,
            spo2_pct: 98.0,
        };
        assert!(vitals.is_extreme());

        let vitals = VitalSigns {
            heart_rate_bpm: 75.0,
            systolic_bp_mmhg: 120.0,
            respiratory_rate: 16.0,
            temperature_c: 36.8,
            spo2_pct: 98.0,
        };
        assert!(!vitals.is_extreme());
    }
}

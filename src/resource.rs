// src/resource.rs
//
// Shared treatment resources: a fixed-size pool partitioned by type,
// each type eligible for a subset of priority levels.
//
// Availability is an independent stochastic process, deliberately
// decoupled from which patient was assigned: `step` never claims or
// releases a specific instance. The pool only changes through
// `stochastic_update` and `reset`.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::EnvConfig;
use crate::types::TriageLevel;

/// Resource type, by escalation tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Critical,
    Urgent,
    General,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [
        ResourceType::Critical,
        ResourceType::Urgent,
        ResourceType::General,
    ];

    /// Priority levels this type may serve.
    pub fn serves(&self) -> &'static [TriageLevel] {
        match self {
            ResourceType::Critical => &[TriageLevel::Immediate, TriageLevel::Urgent],
            ResourceType::Urgent => &[TriageLevel::Urgent, TriageLevel::LessUrgent],
            ResourceType::General => &[TriageLevel::LessUrgent, TriageLevel::NonUrgent],
        }
    }

    /// Hourly cost rate in simulation dollars.
    pub fn cost_per_hour(&self) -> f64 {
        match self {
            ResourceType::Critical => 500.0,
            ResourceType::Urgent => 250.0,
            ResourceType::General => 100.0,
        }
    }

    /// The type billed for an assignment at `level` (most specific
    /// eligible tier).
    pub fn billing_type_for(level: TriageLevel) -> ResourceType {
        match level {
            TriageLevel::Immediate => ResourceType::Critical,
            TriageLevel::Urgent => ResourceType::Urgent,
            TriageLevel::LessUrgent | TriageLevel::NonUrgent => ResourceType::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Critical => "critical",
            ResourceType::Urgent => "urgent",
            ResourceType::General => "general",
        }
    }
}

/// One pooled resource instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub kind: ResourceType,
    pub capacity: u32,
    pub available: bool,
    pub serves: Vec<TriageLevel>,
    pub cost_per_hour: f64,
}

/// The full resource pool. Owned exclusively by the environment;
/// persists across episodes but is reinitialized on reset.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    resources: Vec<Resource>,
}

/// Base wait in minutes when no eligible resource is free.
fn base_wait_min(level: TriageLevel) -> f64 {
    match level {
        TriageLevel::Immediate => 5.0,
        TriageLevel::Urgent => 15.0,
        TriageLevel::LessUrgent => 30.0,
        TriageLevel::NonUrgent => 60.0,
    }
}

impl ResourcePool {
    pub fn new(cfg: &EnvConfig) -> Self {
        let mut resources = Vec::new();
        let mut push = |kind: ResourceType, count: u32| {
            for i in 0..count {
                resources.push(Resource {
                    id: format!("{}-{}", kind.as_str(), i + 1),
                    kind,
                    capacity: 1,
                    available: true,
                    serves: kind.serves().to_vec(),
                    cost_per_hour: kind.cost_per_hour(),
                });
            }
        };
        push(ResourceType::Critical, cfg.critical_resources);
        push(ResourceType::Urgent, cfg.urgent_resources);
        push(ResourceType::General, cfg.general_resources);
        Self { resources }
    }

    /// Reinitialize all resources to available.
    pub fn reset(&mut self) {
        for r in &mut self.resources {
            r.available = true;
        }
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Whether any resource eligible for `level` is currently free.
    pub fn available_for(&self, level: TriageLevel) -> bool {
        self.resources
            .iter()
            .any(|r| r.available && r.serves.contains(&level))
    }

    /// Count of currently available resources.
    pub fn available_count(&self) -> usize {
        self.resources.iter().filter(|r| r.available).count()
    }

    /// Count of currently busy resources of `kind`.
    pub fn busy_count(&self, kind: ResourceType) -> usize {
        self.resources
            .iter()
            .filter(|r| r.kind == kind && !r.available)
            .count()
    }

    /// Total resources of `kind`.
    pub fn total_count(&self, kind: ResourceType) -> usize {
        self.resources.iter().filter(|r| r.kind == kind).count()
    }

    /// Estimated wait in minutes for an assignment at `level`.
    ///
    /// If any eligible resource is free: a bounded random short wait.
    /// Otherwise: a priority-dependent base wait plus a linear penalty
    /// proportional to the current queue length.
    pub fn estimate_wait_min(
        &self,
        level: TriageLevel,
        queue_len: usize,
        rng: &mut ChaCha8Rng,
    ) -> f64 {
        if self.available_for(level) {
            rng.gen_range(2.0..10.0)
        } else {
            base_wait_min(level) + 2.0 * queue_len as f64
        }
    }

    /// Deterministic wait estimate used on generated actions (the
    /// generator must be pure, so no RNG here): a nominal short wait
    /// when an eligible resource is free, the saturated formula
    /// otherwise.
    pub fn nominal_wait_min(&self, level: TriageLevel, queue_len: usize) -> f64 {
        if self.available_for(level) {
            6.0
        } else {
            base_wait_min(level) + 2.0 * queue_len as f64
        }
    }

    /// The independent availability process, run once per step
    /// regardless of the action taken:
    /// - each unavailable resource recovers with `recovery_prob`;
    /// - each available resource goes busy with `busy_prob`.
    ///
    /// Returns the number of resources that recovered.
    pub fn stochastic_update(
        &mut self,
        rng: &mut ChaCha8Rng,
        recovery_prob: f64,
        busy_prob: f64,
    ) -> u32 {
        let mut recovered = 0;
        for r in &mut self.resources {
            if !r.available {
                if rng.gen_bool(recovery_prob.clamp(0.0, 1.0)) {
                    r.available = true;
                    recovered += 1;
                }
            } else if rng.gen_bool(busy_prob.clamp(0.0, 1.0)) {
                r.available = false;
            }
        }
        recovered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn make_pool() -> ResourcePool {
        ResourcePool::new(&EnvConfig::default())
    }

    #[test]
    fn test_pool_sizes_match_config() {
        let pool = make_pool();
        assert_eq!(pool.total_count(ResourceType::Critical), 2);
        assert_eq!(pool.total_count(ResourceType::Urgent), 3);
        assert_eq!(pool.total_count(ResourceType::General), 4);
        assert_eq!(pool.available_count(), 9);
    }

    #[test]
    fn test_eligibility_partition() {
        let pool = make_pool();
        // With everything free, all levels are served.
        for level in TriageLevel::ALL {
            assert!(pool.available_for(level), "level {:?} unserved", level);
        }
    }

    #[test]
    fn test_wait_estimate_short_when_available() {
        let pool = make_pool();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..50 {
            let w = pool.estimate_wait_min(TriageLevel::Urgent, 10, &mut rng);
            assert!((2.0..10.0).contains(&w));
        }
    }

    #[test]
    fn test_wait_estimate_penalized_when_saturated() {
        let mut pool = make_pool();
        for r in &mut pool.resources {
            r.available = false;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        // base 15 + 2 * 10 = 35 for urgent with queue of 10.
        let w = pool.estimate_wait_min(TriageLevel::Urgent, 10, &mut rng);
        assert!((w - 35.0).abs() < 1e-9);

        // Less urgent waits longer at equal queue length.
        let w2 = pool.estimate_wait_min(TriageLevel::NonUrgent, 10, &mut rng);
        assert!(w2 > w);
    }

    #[test]
    fn test_stochastic_update_recovers_with_certainty() {
        let mut pool = make_pool();
        for r in &mut pool.resources {
            r.available = false;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let recovered = pool.stochastic_update(&mut rng, 1.0, 0.0);
        assert_eq!(recovered as usize, pool.resources().len());
        assert_eq!(pool.available_count(), pool.resources().len());
    }

    #[test]
    fn test_reset_restores_full_availability() {
        let mut pool = make_pool();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        pool.stochastic_update(&mut rng, 0.0, 1.0);
        assert_eq!(pool.available_count(), 0);

        pool.reset();
        assert_eq!(pool.available_count(), pool.resources().len());
    }
}

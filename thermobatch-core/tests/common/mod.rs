use rand::{Rng, SeedableRng, rngs::SmallRng};
use thermobatch_core::{BatchPlan, Operation};

/// Extension time and annealing temperature pairs that form four obvious
/// device groups. Ids are 1-based positions.
pub const SCENARIO: [(f64, f64); 13] = [
    (60.0, 69.0),
    (60.0, 72.0),
    (62.0, 80.0),
    (370.0, 69.0),
    (362.0, 72.0),
    (340.0, 72.0),
    (352.0, 80.0),
    (770.0, 69.0),
    (762.0, 72.0),
    (740.0, 72.0),
    (752.0, 80.0),
    (770.0, 40.0),
    (500.0, 41.0),
];

#[must_use]
pub fn scenario() -> Vec<Operation<u32>> {
    (1..)
        .zip(SCENARIO)
        .map(|(id, (time, temp))| Operation::new(id, time, temp))
        .collect()
}

/// Operations spread over typical extension times and annealing
/// temperatures.
#[must_use]
pub fn random_operations(seed: u64, count: usize) -> Vec<Operation<usize>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|id| {
            let time = f64::from(rng.gen_range(10_u32..900));
            let temp = rng.gen_range(50.0..75.0);
            Operation::new(id, time, temp)
        })
        .collect()
}

/// Member ids of every device group, in plan order.
#[must_use]
pub fn device_groups<I: Copy>(plan: &BatchPlan<'_, I>) -> Vec<Vec<I>> {
    plan.devices()
        .iter()
        .map(|batch| batch.device().ids().copied().collect())
        .collect()
}

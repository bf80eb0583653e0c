use crate::simulation_engine::vehicles::{Direction, Vehicle, VehicleType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Synthesises inbound vehicles for the generation loop.
#[derive(Debug)]
pub struct TrafficGenerator {
    rng: StdRng,
    next_vehicle_id: u64,
    emergency_chance: f64,
}

impl TrafficGenerator {
    pub fn new(emergency_chance: f64) -> Self {
        Self::with_rng(StdRng::from_os_rng(), emergency_chance)
    }

    pub fn seeded(seed: u64, emergency_chance: f64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), emergency_chance)
    }

    fn with_rng(rng: StdRng, emergency_chance: f64) -> Self {
        Self {
            rng,
            next_vehicle_id: 1,
            emergency_chance: emergency_chance.clamp(0.0, 1.0),
        }
    }

    /// Random direction and class; with `emergency_chance` the class is
    /// replaced by an ambulance.
    pub fn next_vehicle(&mut self, tick: u64) -> Vehicle {
        let direction = Direction::ALL[self.rng.random_range(0..Direction::ALL.len())];
        let mut vehicle_type = VehicleType::ALL[self.rng.random_range(0..VehicleType::ALL.len())];
        if self.rng.random_bool(self.emergency_chance) {
            vehicle_type = VehicleType::Ambulance;
        }

        let id = format!("V{}", self.next_vehicle_id);
        self.next_vehicle_id += 1;
        Vehicle::new(id, vehicle_type, direction).with_arrival(tick)
    }

    /// Index of a uniformly chosen target among `len` candidates.
    pub fn choose_target(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.rng.random_range(0..len))
    }

    pub fn generated(&self) -> u64 {
        self.next_vehicle_id - 1
    }
}

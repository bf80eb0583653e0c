// src/shared_data.rs

use crate::simulation_engine::signals::LightState;
use crate::simulation_engine::vehicles::Direction;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current state of one signal as seen from outside the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalReading {
    pub direction: Direction,
    pub state: LightState,
    pub remaining_secs: u32,
}

/// Read-only view of one intersection for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntersectionStatus {
    pub id: String,
    pub emergency_mode: bool,
    pub override_direction: Option<Direction>,
    pub current_phase: usize,
    pub phase_elapsed: u32,
    pub signals: Vec<SignalReading>,
    pub queue_lengths: Vec<(Direction, usize)>,
    pub average_wait_secs: f64,
}

/// Per-direction statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionBreakdown {
    pub admitted: u64,
    pub departed: u64,
    pub average_wait_secs: f64,
}

/// Aggregated statistics handed to reporting. Never mutated by the reader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub timestamp: u64,
    pub runtime_secs: f64,
    pub total_vehicles: u64,
    pub emergency_vehicles: u64,
    pub processed_vehicles: u64,
    pub total_wait_secs: f64,
    pub average_wait_secs: f64,
    pub throughput_per_minute: f64,
    pub efficiency_percent: f64,
    pub emergency_response_rate: u64,
    pub total_cycles: u64,
    pub phase_changes: u64,
    pub emergency_overrides: u64,
    pub vehicles_per_cycle: f64,
    pub average_cycle_secs: f64,
    pub north: DirectionBreakdown,
    pub south: DirectionBreakdown,
    pub east: DirectionBreakdown,
    pub west: DirectionBreakdown,
}

impl StatsSnapshot {
    pub fn direction(&self, direction: Direction) -> &DirectionBreakdown {
        match direction {
            Direction::North => &self.north,
            Direction::South => &self.south,
            Direction::East => &self.east,
            Direction::West => &self.west,
        }
    }
}

pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

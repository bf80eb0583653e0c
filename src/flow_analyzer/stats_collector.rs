use crate::shared_data::{current_timestamp, DirectionBreakdown, StatsSnapshot};
use crate::simulation_engine::vehicles::{Direction, Vehicle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default)]
struct DirectionTotals {
    admitted: u64,
    departed: u64,
    average_wait: f64,
}

impl DirectionTotals {
    fn breakdown(&self) -> DirectionBreakdown {
        DirectionBreakdown {
            admitted: self.admitted,
            departed: self.departed,
            average_wait_secs: self.average_wait,
        }
    }
}

/// Running traffic statistics. Pure aggregation: it observes admissions,
/// departures, cycles and overrides but never controls anything.
#[derive(Debug, Clone)]
pub struct StatsCollector {
    total_vehicles: u64,
    emergency_vehicles: u64,
    processed_vehicles: u64,
    total_wait_secs: f64,
    total_cycles: u64,
    phase_changes: u64,
    emergency_overrides: u64,
    directions: [DirectionTotals; 4],
    started: Instant,
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            total_vehicles: 0,
            emergency_vehicles: 0,
            processed_vehicles: 0,
            total_wait_secs: 0.0,
            total_cycles: 0,
            phase_changes: 0,
            emergency_overrides: 0,
            directions: [DirectionTotals::default(); 4],
            started: Instant::now(),
        }
    }

    pub fn record_admission(&mut self, vehicle: &Vehicle) {
        self.total_vehicles += 1;
        if vehicle.is_emergency() {
            self.emergency_vehicles += 1;
        }
        self.directions[vehicle.direction().index()].admitted += 1;
    }

    pub fn record_departure(&mut self, direction: Direction, wait_secs: f64) {
        self.processed_vehicles += 1;
        self.total_wait_secs += wait_secs;

        let totals = &mut self.directions[direction.index()];
        totals.departed += 1;
        totals.average_wait += (wait_secs - totals.average_wait) / totals.departed as f64;
    }

    pub fn record_cycle(&mut self) {
        self.total_cycles += 1;
    }

    pub fn record_phase_change(&mut self) {
        self.phase_changes += 1;
    }

    pub fn record_override(&mut self) {
        self.emergency_overrides += 1;
    }

    pub fn total_vehicles(&self) -> u64 {
        self.total_vehicles
    }

    pub fn emergency_vehicles(&self) -> u64 {
        self.emergency_vehicles
    }

    pub fn processed_vehicles(&self) -> u64 {
        self.processed_vehicles
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn emergency_overrides(&self) -> u64 {
        self.emergency_overrides
    }

    pub fn average_wait_time(&self) -> f64 {
        if self.processed_vehicles == 0 {
            return 0.0;
        }
        self.total_wait_secs / self.processed_vehicles as f64
    }

    pub fn direction_average_wait(&self, direction: Direction) -> f64 {
        self.directions[direction.index()].average_wait
    }

    pub fn direction_breakdown(&self, direction: Direction) -> DirectionBreakdown {
        self.directions[direction.index()].breakdown()
    }

    /// Lookup by name as used in reports; unknown names report zeros.
    pub fn direction_breakdown_by_name(&self, name: &str) -> DirectionBreakdown {
        name.parse::<Direction>()
            .map(|d| self.direction_breakdown(d))
            .unwrap_or_default()
    }

    /// Vehicles processed per minute over `elapsed`.
    pub fn throughput(&self, elapsed: Duration) -> f64 {
        let minutes = elapsed.as_secs_f64() / 60.0;
        if minutes <= 0.0 {
            return 0.0;
        }
        self.processed_vehicles as f64 / minutes
    }

    /// Share of admitted vehicles that have departed, in percent.
    pub fn efficiency(&self) -> f64 {
        if self.total_vehicles == 0 {
            return 0.0;
        }
        self.processed_vehicles as f64 * 100.0 / self.total_vehicles as f64
    }

    pub fn emergency_response_rate(&self) -> u64 {
        if self.total_vehicles == 0 {
            return 0;
        }
        self.emergency_vehicles * 100 / self.total_vehicles
    }

    pub fn runtime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.snapshot_at(self.runtime())
    }

    /// Snapshot computed as if `elapsed` had passed since the last reset.
    pub fn snapshot_at(&self, elapsed: Duration) -> StatsSnapshot {
        let runtime_secs = elapsed.as_secs_f64();
        let per_cycle = |value: f64| {
            if self.total_cycles == 0 {
                0.0
            } else {
                value / self.total_cycles as f64
            }
        };
        StatsSnapshot {
            timestamp: current_timestamp(),
            runtime_secs,
            total_vehicles: self.total_vehicles,
            emergency_vehicles: self.emergency_vehicles,
            processed_vehicles: self.processed_vehicles,
            total_wait_secs: self.total_wait_secs,
            average_wait_secs: self.average_wait_time(),
            throughput_per_minute: self.throughput(elapsed),
            efficiency_percent: self.efficiency(),
            emergency_response_rate: self.emergency_response_rate(),
            total_cycles: self.total_cycles,
            phase_changes: self.phase_changes,
            emergency_overrides: self.emergency_overrides,
            vehicles_per_cycle: per_cycle(self.processed_vehicles as f64),
            average_cycle_secs: per_cycle(runtime_secs),
            north: self.direction_breakdown(Direction::North),
            south: self.direction_breakdown(Direction::South),
            east: self.direction_breakdown(Direction::East),
            west: self.direction_breakdown(Direction::West),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

use crate::global_variables::SENSOR_RANGE_METERS;
use crate::simulation_engine::vehicles::Direction;

/// Counts arrivals on one approach. Feeds statistics only; it never
/// influences signal control.
#[derive(Debug, Clone)]
pub struct Sensor {
    direction: Direction,
    vehicle_count: u64,
    last_detection: Option<u64>,
    active: bool,
    detection_range: f64,
}

impl Sensor {
    pub fn new(direction: Direction) -> Self {
        Self::with_range(direction, SENSOR_RANGE_METERS)
    }

    pub fn with_range(direction: Direction, detection_range: f64) -> Self {
        Self {
            direction,
            vehicle_count: 0,
            last_detection: None,
            active: true,
            detection_range,
        }
    }

    /// Records one arrival at logical tick `now`. Inactive sensors ignore it.
    pub fn increment_count(&mut self, now: u64) -> bool {
        if !self.active {
            return false;
        }
        self.vehicle_count += 1;
        self.last_detection = Some(now);
        true
    }

    pub fn reset(&mut self) {
        self.vehicle_count = 0;
        self.last_detection = None;
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn vehicle_count(&self) -> u64 {
        self.vehicle_count
    }

    pub fn last_detection(&self) -> Option<u64> {
        self.last_detection
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn detection_range(&self) -> f64 {
        self.detection_range
    }

    /// True when a vehicle was detected within the last `window` ticks.
    pub fn has_recent_activity(&self, now: u64, window: u64) -> bool {
        self.last_detection
            .map(|at| now.saturating_sub(at) <= window)
            .unwrap_or(false)
    }
}

// Default signal durations (seconds) applied by `Signal::change_state`.
pub const DEFAULT_RED_SECS: u32 = 30;
pub const DEFAULT_YELLOW_SECS: u32 = 5;
pub const DEFAULT_GREEN_SECS: u32 = 25;
pub const FLASHING_SECS: u32 = 1;

// Default phase timing per direction: 30s green + 5s yellow = 35s phase.
pub const DEFAULT_PHASE_GREEN_SECS: u32 = 30;
pub const DEFAULT_PHASE_YELLOW_SECS: u32 = 5;

// Vehicle priorities.
pub const EMERGENCY_PRIORITY: u32 = 100;
pub const BUS_PRIORITY: u32 = 20;
pub const TRUCK_PRIORITY: u32 = 15;
pub const CAR_PRIORITY: u32 = 10;
pub const MOTORCYCLE_PRIORITY: u32 = 5;

pub const SENSOR_RANGE_METERS: f64 = 50.0;

// Loop periods.
pub const FAST_PERIOD_MS: u64 = 100;
pub const GENERATION_PERIOD_SECS: u64 = 3;
pub const EMERGENCY_CHANCE: f64 = 0.05;

// Adaptive timing.
pub const QUEUE_PRESSURE_THRESHOLD: usize = 5;
pub const PRESSURE_GREEN_SECS: u32 = 35;
pub const PRESSURE_YELLOW_SECS: u32 = 5;
pub const RUSH_GREEN_SECS: u32 = 40;
pub const RUSH_YELLOW_SECS: u32 = 5;

pub const DEFAULT_INTERSECTION_ID: &str = "Main_Street_Intersection";

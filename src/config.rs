use crate::error::{ControlError, Result};
use crate::flow_analyzer::adaptive_timing::AdaptiveTimingPolicy;
use crate::global_variables::{
    DEFAULT_INTERSECTION_ID, EMERGENCY_CHANCE, FAST_PERIOD_MS, GENERATION_PERIOD_SECS,
};
use crate::simulation_engine::intersections::PhaseTiming;
use crate::simulation_engine::vehicles::Direction;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Green/yellow seconds for one direction, as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionTiming {
    pub direction: Direction,
    pub green: i64,
    pub yellow: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectionConfig {
    pub id: String,
    #[serde(default)]
    pub timings: Vec<DirectionTiming>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Real-time speed multiplier.
    pub simulation_speed: u32,
    pub real_time: bool,
    /// Control-loop period when not running in real time.
    pub fast_period_ms: u64,
    pub generation_period_secs: u64,
    pub emergency_chance: f64,
    /// Seed for the traffic generator; random when absent.
    pub seed: Option<u64>,
    pub adaptive: AdaptiveTimingPolicy,
    pub intersections: Vec<IntersectionConfig>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            simulation_speed: 1,
            real_time: true,
            fast_period_ms: FAST_PERIOD_MS,
            generation_period_secs: GENERATION_PERIOD_SECS,
            emergency_chance: EMERGENCY_CHANCE,
            seed: None,
            adaptive: AdaptiveTimingPolicy::default(),
            intersections: vec![IntersectionConfig {
                id: DEFAULT_INTERSECTION_ID.to_string(),
                timings: Vec::new(),
            }],
        }
    }
}

impl ControllerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ControllerConfig =
            serde_json::from_str(json).map_err(|e| ControlError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.simulation_speed == 0 {
            return Err(ControlError::Config(
                "simulation_speed must be at least 1".to_string(),
            ));
        }
        if self.fast_period_ms == 0 || self.generation_period_secs == 0 {
            return Err(ControlError::Config(
                "loop periods must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.emergency_chance) {
            return Err(ControlError::Config(format!(
                "emergency_chance {} is outside [0, 1]",
                self.emergency_chance
            )));
        }
        for timing in [self.adaptive.pressure_timing, self.adaptive.rush_timing] {
            PhaseTiming::new(timing.green as i64, timing.yellow as i64)?;
        }
        for intersection in &self.intersections {
            for timing in &intersection.timings {
                PhaseTiming::new(timing.green, timing.yellow)?;
            }
        }
        Ok(())
    }

    /// Period of the control loop: `1000 / simulation_speed` ms in real time.
    pub fn control_period(&self) -> Duration {
        if self.real_time {
            Duration::from_millis(1000 / u64::from(self.simulation_speed.max(1)))
        } else {
            Duration::from_millis(self.fast_period_ms)
        }
    }

    pub fn generation_period(&self) -> Duration {
        Duration::from_secs(self.generation_period_secs)
    }
}

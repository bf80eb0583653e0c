use crate::global_variables::{
    PRESSURE_GREEN_SECS, PRESSURE_YELLOW_SECS, QUEUE_PRESSURE_THRESHOLD, RUSH_GREEN_SECS,
    RUSH_YELLOW_SECS,
};
use crate::simulation_engine::intersections::{Intersection, PhaseTiming};
use crate::simulation_engine::vehicles::Direction;
use serde::{Deserialize, Serialize};

/// A timing change proposed for one direction of an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingAdjustment {
    pub direction: Direction,
    pub timing: PhaseTiming,
}

/// Simple queue- and clock-driven timing rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveTimingPolicy {
    pub enabled: bool,
    /// A queue longer than this earns its direction the pressure timing.
    pub queue_pressure_threshold: usize,
    pub pressure_timing: PhaseTiming,
    /// Inclusive `[start, end]` hours of day.
    pub rush_hours: Vec<[u32; 2]>,
    pub rush_timing: PhaseTiming,
}

impl Default for AdaptiveTimingPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_pressure_threshold: QUEUE_PRESSURE_THRESHOLD,
            pressure_timing: PhaseTiming {
                green: PRESSURE_GREEN_SECS,
                yellow: PRESSURE_YELLOW_SECS,
            },
            rush_hours: vec![[7, 9], [17, 19]],
            rush_timing: PhaseTiming {
                green: RUSH_GREEN_SECS,
                yellow: RUSH_YELLOW_SECS,
            },
        }
    }
}

impl AdaptiveTimingPolicy {
    pub fn is_rush_hour(&self, hour: u32) -> bool {
        self.rush_hours
            .iter()
            .any(|&[start, end]| (start..=end).contains(&hour))
    }

    /// The longest queue, if it is over the threshold, gets the pressure
    /// timing. Ties go to the first direction in NORTH, SOUTH, EAST, WEST order.
    pub fn queue_pressure(&self, queue_lengths: [usize; 4]) -> Option<TimingAdjustment> {
        let mut best: Option<(usize, usize)> = None;
        for (i, &len) in queue_lengths.iter().enumerate() {
            if best.map_or(true, |(_, longest)| len > longest) {
                best = Some((i, len));
            }
        }
        let (index, longest) = best?;
        if longest <= self.queue_pressure_threshold {
            return None;
        }
        Some(TimingAdjustment {
            direction: Direction::from_index(index)?,
            timing: self.pressure_timing,
        })
    }

    /// NORTH/SOUTH get the rush timing during rush hours.
    pub fn rush_hour(&self, hour: u32) -> Vec<TimingAdjustment> {
        if !self.is_rush_hour(hour) {
            return Vec::new();
        }
        [Direction::North, Direction::South]
            .into_iter()
            .map(|direction| TimingAdjustment {
                direction,
                timing: self.rush_timing,
            })
            .collect()
    }

    /// Adjustments for one intersection that would actually change its timing.
    pub fn adjustments(&self, intersection: &Intersection, hour: u32) -> Vec<TimingAdjustment> {
        if !self.enabled {
            return Vec::new();
        }
        // Later rules win for the same direction.
        let mut winners: Vec<TimingAdjustment> = Vec::new();
        let candidates = self
            .queue_pressure(intersection.queue_lengths())
            .into_iter()
            .chain(self.rush_hour(hour));
        for candidate in candidates {
            winners.retain(|a| a.direction != candidate.direction);
            winners.push(candidate);
        }
        winners
            .into_iter()
            .filter(|a| intersection.timing(a.direction) != a.timing)
            .collect()
    }
}

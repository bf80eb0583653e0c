use crate::global_variables::{
    DEFAULT_GREEN_SECS, DEFAULT_RED_SECS, DEFAULT_YELLOW_SECS, FLASHING_SECS,
};
use crate::simulation_engine::vehicles::Direction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The possible states for a traffic light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LightState {
    Red,
    Yellow,
    Green,
    FlashingRed,
    FlashingYellow,
}

impl LightState {
    pub fn name(self) -> &'static str {
        match self {
            LightState::Red => "RED",
            LightState::Yellow => "YELLOW",
            LightState::Green => "GREEN",
            LightState::FlashingRed => "FLASHING_RED",
            LightState::FlashingYellow => "FLASHING_YELLOW",
        }
    }

    pub fn is_flashing(self) -> bool {
        matches!(self, LightState::FlashingRed | LightState::FlashingYellow)
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configured duration, in seconds, for each light state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDurations {
    pub red: u32,
    pub yellow: u32,
    pub green: u32,
    pub flashing: u32,
}

impl Default for StateDurations {
    fn default() -> Self {
        Self {
            red: DEFAULT_RED_SECS,
            yellow: DEFAULT_YELLOW_SECS,
            green: DEFAULT_GREEN_SECS,
            flashing: FLASHING_SECS,
        }
    }
}

impl StateDurations {
    pub fn for_state(&self, state: LightState) -> u32 {
        match state {
            LightState::Red => self.red,
            LightState::Yellow => self.yellow,
            LightState::Green => self.green,
            LightState::FlashingRed | LightState::FlashingYellow => self.flashing,
        }
    }
}

/// A single traffic light facing one approach direction.
///
/// The signal only counts down; transitions are driven by the owning
/// intersection's scheduler or by the emergency override.
#[derive(Debug, Clone)]
pub struct Signal {
    direction: Direction,
    state: LightState,
    durations: StateDurations,
    remaining: u32,
    emergency: bool,
}

impl Signal {
    pub fn new(direction: Direction) -> Self {
        let durations = StateDurations::default();
        Self {
            direction,
            state: LightState::Red,
            remaining: durations.red,
            durations,
            emergency: false,
        }
    }

    /// Switches to `state` and restarts the countdown from its configured duration.
    pub fn change_state(&mut self, state: LightState) {
        self.state = state;
        self.remaining = self.durations.for_state(state);
    }

    /// Counts down by the whole seconds elapsed since the previous tick.
    pub fn tick(&mut self, elapsed_secs: u32) {
        self.remaining = self.remaining.saturating_sub(elapsed_secs);
    }

    /// Overrides the countdown of the current state only.
    pub fn set_duration(&mut self, seconds: u32) {
        self.remaining = seconds;
    }

    pub fn set_green_duration(&mut self, seconds: u32) {
        self.durations.green = seconds;
    }

    pub fn set_yellow_duration(&mut self, seconds: u32) {
        self.durations.yellow = seconds;
    }

    pub fn set_red_duration(&mut self, seconds: u32) {
        self.durations.red = seconds;
    }

    pub fn activate_emergency(&mut self) {
        self.emergency = true;
        self.change_state(LightState::Red);
    }

    // The owner restores the normal state.
    pub fn deactivate_emergency(&mut self) {
        self.emergency = false;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> LightState {
        self.state
    }

    pub fn durations(&self) -> StateDurations {
        self.durations
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_emergency_active(&self) -> bool {
        self.emergency
    }

    pub fn is_red(&self) -> bool {
        matches!(self.state, LightState::Red | LightState::FlashingRed)
    }

    pub fn is_yellow(&self) -> bool {
        matches!(self.state, LightState::Yellow | LightState::FlashingYellow)
    }

    pub fn is_green(&self) -> bool {
        self.state == LightState::Green
    }

    pub fn can_proceed(&self) -> bool {
        self.state == LightState::Green
    }
}

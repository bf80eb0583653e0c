use crate::error::{ControlError, Result};
use crate::global_variables::{DEFAULT_PHASE_GREEN_SECS, DEFAULT_PHASE_YELLOW_SECS};
use crate::shared_data::{IntersectionStatus, SignalReading};
use crate::simulation_engine::lanes::{Departure, LaneQueue, LaneQueues};
use crate::simulation_engine::sensors::Sensor;
use crate::simulation_engine::signals::{LightState, Signal};
use crate::simulation_engine::vehicles::{Direction, Vehicle};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Green and yellow time, in seconds, for one direction's phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub green: u32,
    pub yellow: u32,
}

impl Default for PhaseTiming {
    fn default() -> Self {
        Self {
            green: DEFAULT_PHASE_GREEN_SECS,
            yellow: DEFAULT_PHASE_YELLOW_SECS,
        }
    }
}

impl PhaseTiming {
    /// Validates raw durations; zero or negative values are rejected.
    pub fn new(green: i64, yellow: i64) -> Result<Self> {
        let invalid = || ControlError::InvalidDuration { green, yellow };
        if green <= 0 || yellow <= 0 {
            return Err(invalid());
        }
        Ok(Self {
            green: u32::try_from(green).map_err(|_| invalid())?,
            yellow: u32::try_from(yellow).map_err(|_| invalid())?,
        })
    }

    pub fn total(&self) -> u32 {
        self.green + self.yellow
    }
}

/// Result of one scheduler step.
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub departures: Vec<Departure>,
    pub turned_yellow: bool,
    pub phase_changed: bool,
}

/// Directions whose signals are green in `phase`.
pub fn phase_group(phase: usize) -> [Direction; 2] {
    if phase == 0 {
        [Direction::North, Direction::South]
    } else {
        [Direction::East, Direction::West]
    }
}

/// A signalised four-way intersection running a two-phase cycle:
/// phase 0 gives NORTH/SOUTH green, phase 1 gives EAST/WEST green.
#[derive(Debug, Clone)]
pub struct Intersection {
    id: String,
    signals: [Signal; 4],
    sensors: [Sensor; 4],
    lanes: LaneQueues,
    timings: [PhaseTiming; 4],
    current_phase: usize,
    /// Ticks elapsed in the current phase.
    phase_timer: u32,
    emergency_mode: bool,
    override_direction: Option<Direction>,
    /// Scheduler ticks since creation.
    clock: u64,
}

impl Intersection {
    pub fn new(id: impl Into<String>) -> Self {
        let timing = PhaseTiming::default();
        let signals = Direction::ALL.map(|direction| {
            let mut signal = Signal::new(direction);
            signal.set_green_duration(timing.green);
            signal.set_yellow_duration(timing.yellow);
            signal
        });
        let mut intersection = Self {
            id: id.into(),
            signals,
            sensors: Direction::ALL.map(Sensor::new),
            lanes: LaneQueues::default(),
            timings: [timing; 4],
            current_phase: 0,
            phase_timer: 0,
            emergency_mode: false,
            override_direction: None,
            clock: 0,
        };
        intersection.apply_phase(0);
        intersection
    }

    /// Sets the green/yellow time for one direction. Takes effect on the
    /// next phase computation.
    pub fn configure(&mut self, direction: Direction, timing: PhaseTiming) {
        self.timings[direction.index()] = timing;
        let signal = &mut self.signals[direction.index()];
        signal.set_green_duration(timing.green);
        signal.set_yellow_duration(timing.yellow);
        info!(
            "Intersection {} configured {}: green {}s, yellow {}s",
            self.id, direction, timing.green, timing.yellow
        );
    }

    /// Validating form of `configure`; on error the prior timing is kept.
    pub fn configure_timing(&mut self, direction: Direction, green: i64, yellow: i64) -> Result<()> {
        let timing = PhaseTiming::new(green, yellow)?;
        self.configure(direction, timing);
        Ok(())
    }

    pub fn timing(&self, direction: Direction) -> PhaseTiming {
        self.timings[direction.index()]
    }

    /// Effective timing of a phase: the longest green and yellow configured
    /// for either direction of its group, so both signals change together.
    pub fn phase_timing(&self, phase: usize) -> PhaseTiming {
        let [a, b] = phase_group(phase);
        let (ta, tb) = (self.timing(a), self.timing(b));
        PhaseTiming {
            green: ta.green.max(tb.green),
            yellow: ta.yellow.max(tb.yellow),
        }
    }

    /// Appends the vehicle to its direction's lane queue. Never rejects.
    pub fn admit(&mut self, vehicle: Vehicle) {
        let direction = vehicle.direction();
        self.sensors[direction.index()].increment_count(self.clock);
        debug!(
            "Intersection {} admitted {} {} heading {}",
            self.id,
            vehicle.vehicle_type(),
            vehicle.id(),
            direction
        );
        self.lanes.get_mut(direction).push(vehicle, self.clock);
    }

    /// Advances the scheduler by one tick.
    ///
    /// Outside an override the signals must match the current phase; an
    /// intersection that fails that check is not advanced.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        if !self.emergency_mode {
            self.validate()?;
        }

        self.clock += 1;
        for signal in self.signals.iter_mut() {
            signal.tick(1);
        }

        let mut outcome = TickOutcome::default();
        if !self.emergency_mode {
            self.phase_timer += 1;
            let timing = self.phase_timing(self.current_phase);
            if self.phase_timer >= timing.total() {
                self.current_phase = (self.current_phase + 1) % 2;
                self.phase_timer = 0;
                self.apply_phase(self.current_phase);
                outcome.phase_changed = true;
                debug!(
                    "Intersection {} switching to phase {}",
                    self.id, self.current_phase
                );
            } else if self.phase_timer >= timing.green {
                for signal in self.signals.iter_mut().filter(|s| s.is_green()) {
                    signal.change_state(LightState::Yellow);
                    outcome.turned_yellow = true;
                }
            }
        }

        outcome.departures = self.drain();
        Ok(outcome)
    }

    /// Releases one vehicle from every lane whose signal is green.
    fn drain(&mut self) -> Vec<Departure> {
        let now = self.clock;
        let mut departures = Vec::new();
        for direction in Direction::ALL {
            if !self.signals[direction.index()].can_proceed() {
                continue;
            }
            if let Some(departure) = self.lanes.get_mut(direction).release(now) {
                departures.push(departure);
            }
        }
        departures
    }

    fn apply_phase(&mut self, phase: usize) {
        for signal in self.signals.iter_mut() {
            if signal.direction().phase() == phase {
                signal.change_state(LightState::Green);
            } else {
                signal.change_state(LightState::Red);
            }
        }
    }

    /// Checks that exactly the current phase group shows green or yellow and
    /// the other group shows steady red.
    pub fn validate(&self) -> Result<()> {
        for signal in &self.signals {
            let active = signal.direction().phase() == self.current_phase;
            let state = signal.state();
            let consistent = if active {
                matches!(state, LightState::Green | LightState::Yellow)
            } else {
                state == LightState::Red
            };
            if !consistent {
                return Err(ControlError::PhaseConflict {
                    intersection: self.id.clone(),
                    detail: format!(
                        "{} is {} during phase {}",
                        signal.direction(),
                        state,
                        self.current_phase
                    ),
                });
            }
        }
        Ok(())
    }

    /// Suspends the phase cycle and gives `direction` the only green.
    /// Calling it again while overridden retargets the green.
    pub fn override_direction(&mut self, direction: Direction) {
        self.emergency_mode = true;
        self.override_direction = Some(direction);
        for signal in self.signals.iter_mut() {
            signal.activate_emergency();
        }
        self.signals[direction.index()].change_state(LightState::Green);
        info!(
            "Intersection {} EMERGENCY OVERRIDE: green for {}",
            self.id, direction
        );
    }

    /// Leaves override and restarts the cycle at phase 0. Returns false when
    /// the intersection was not overridden.
    pub fn clear_emergency_mode(&mut self) -> bool {
        if !self.emergency_mode {
            return false;
        }
        self.emergency_mode = false;
        self.override_direction = None;
        for signal in self.signals.iter_mut() {
            signal.deactivate_emergency();
        }
        self.current_phase = 0;
        self.phase_timer = 0;
        self.apply_phase(0);
        info!("Clearing emergency override for intersection {}", self.id);
        true
    }

    /// Maintenance hook: puts one signal into an arbitrary state. Outside an
    /// override this usually breaks the phase check until `restore_phase`.
    pub fn force_signal_state(&mut self, direction: Direction, state: LightState) {
        self.signals[direction.index()].change_state(state);
        info!(
            "Intersection {} signal {} forced to {}",
            self.id, direction, state
        );
    }

    /// Re-applies the signals of the current phase (or of the active override).
    pub fn restore_phase(&mut self) {
        let overridden = self.override_direction.filter(|_| self.emergency_mode);
        match overridden {
            Some(direction) => self.override_direction(direction),
            None => {
                self.apply_phase(self.current_phase);
                if self.phase_timer >= self.phase_timing(self.current_phase).green {
                    for signal in self.signals.iter_mut().filter(|s| s.is_green()) {
                        signal.change_state(LightState::Yellow);
                    }
                }
            }
        }
    }

    /// Removes the head vehicle of a lane without it passing a signal.
    pub fn remove_vehicle(&mut self, direction: Direction) -> Option<Vehicle> {
        self.lanes.get_mut(direction).pop()
    }

    pub fn clear_queues(&mut self) {
        self.lanes.clear();
    }

    /// Ids of the emergency vehicles still waiting in any lane.
    pub fn queued_emergency_ids(&self) -> BTreeSet<String> {
        self.lanes
            .iter()
            .flat_map(|lane| lane.iter())
            .filter(|vehicle| vehicle.is_emergency())
            .map(|vehicle| vehicle.id().to_string())
            .collect()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn queue_length(&self, direction: Direction) -> usize {
        self.lanes.get(direction).len()
    }

    pub fn queue(&self, direction: Direction) -> &LaneQueue {
        self.lanes.get(direction)
    }

    pub fn queue_lengths(&self) -> [usize; 4] {
        self.lanes.lengths()
    }

    pub fn total_vehicle_count(&self) -> usize {
        self.lanes.total_len()
    }

    /// Mean current wait, in ticks, of every queued vehicle.
    pub fn average_wait_time(&self) -> f64 {
        let count = self.lanes.total_len();
        if count == 0 {
            return 0.0;
        }
        let total: u64 = self.lanes.iter().map(|l| l.total_wait(self.clock)).sum();
        total as f64 / count as f64
    }

    pub fn signal(&self, direction: Direction) -> &Signal {
        &self.signals[direction.index()]
    }

    pub fn signal_state(&self, direction: Direction) -> SignalReading {
        let signal = self.signal(direction);
        SignalReading {
            direction,
            state: signal.state(),
            remaining_secs: signal.remaining(),
        }
    }

    pub fn sensor(&self, direction: Direction) -> &Sensor {
        &self.sensors[direction.index()]
    }

    pub fn sensor_mut(&mut self, direction: Direction) -> &mut Sensor {
        &mut self.sensors[direction.index()]
    }

    pub fn is_emergency_mode(&self) -> bool {
        self.emergency_mode
    }

    pub fn overridden_direction(&self) -> Option<Direction> {
        self.override_direction
    }

    pub fn current_phase(&self) -> usize {
        self.current_phase
    }

    pub fn phase_elapsed(&self) -> u32 {
        self.phase_timer
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn status(&self) -> IntersectionStatus {
        IntersectionStatus {
            id: self.id.clone(),
            emergency_mode: self.emergency_mode,
            override_direction: self.override_direction,
            current_phase: self.current_phase,
            phase_elapsed: self.phase_timer,
            signals: Direction::ALL.map(|d| self.signal_state(d)).to_vec(),
            queue_lengths: Direction::ALL
                .iter()
                .map(|&d| (d, self.queue_length(d)))
                .collect(),
            average_wait_secs: self.average_wait_time(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::vehicles::VehicleType;

    fn car(id: &str, direction: Direction) -> Vehicle {
        Vehicle::new(id, VehicleType::Car, direction)
    }

    fn states(intersection: &Intersection) -> [LightState; 4] {
        Direction::ALL.map(|d| intersection.signal(d).state())
    }

    fn assert_one_group_active(intersection: &Intersection) {
        let active = |d: Direction| {
            matches!(
                intersection.signal(d).state(),
                LightState::Green | LightState::Yellow
            )
        };
        let red = |d: Direction| intersection.signal(d).state() == LightState::Red;
        let ns_active = active(Direction::North) && active(Direction::South);
        let ew_active = active(Direction::East) && active(Direction::West);
        let ns_red = red(Direction::North) && red(Direction::South);
        let ew_red = red(Direction::East) && red(Direction::West);
        assert!(
            (ns_active && ew_red) || (ew_active && ns_red),
            "states {:?}",
            states(intersection)
        );
    }

    #[test]
    fn starts_with_north_south_green() {
        let intersection = Intersection::new("X");
        assert_eq!(intersection.current_phase(), 0);
        assert_eq!(
            states(&intersection),
            [
                LightState::Green,
                LightState::Green,
                LightState::Red,
                LightState::Red
            ]
        );
        assert_one_group_active(&intersection);
    }

    #[test]
    fn phase_timeline_green_yellow_toggle() {
        let mut intersection = Intersection::new("X");
        for tick in 1..=70 {
            let outcome = intersection.tick().unwrap();
            assert_one_group_active(&intersection);
            let north = intersection.signal(Direction::North).state();
            let east = intersection.signal(Direction::East).state();
            match tick {
                1..=29 => assert_eq!(north, LightState::Green, "tick {}", tick),
                30..=34 => assert_eq!(north, LightState::Yellow, "tick {}", tick),
                35..=64 => {
                    assert_eq!(north, LightState::Red, "tick {}", tick);
                    assert_eq!(east, LightState::Green, "tick {}", tick);
                }
                65..=69 => assert_eq!(east, LightState::Yellow, "tick {}", tick),
                _ => assert_eq!(north, LightState::Green, "tick {}", tick),
            }
            assert_eq!(outcome.phase_changed, tick == 35 || tick == 70);
            assert_eq!(outcome.turned_yellow, tick == 30 || tick == 65);
        }
    }

    #[test]
    fn configured_timing_reflected_in_phase_computation() {
        let mut intersection = Intersection::new("X");
        intersection
            .configure_timing(Direction::North, 40, 5)
            .unwrap();
        assert_eq!(
            intersection.phase_timing(0),
            PhaseTiming {
                green: 40,
                yellow: 5
            }
        );
        assert_eq!(intersection.timing(Direction::North).green, 40);

        for _ in 0..39 {
            intersection.tick().unwrap();
        }
        assert!(intersection.signal(Direction::South).is_green());
        intersection.tick().unwrap();
        assert_eq!(
            intersection.signal(Direction::South).state(),
            LightState::Yellow
        );
        for _ in 0..5 {
            intersection.tick().unwrap();
        }
        assert_eq!(intersection.current_phase(), 1);
    }

    #[test]
    fn asymmetric_group_timings_keep_one_group_active() {
        let mut intersection = Intersection::new("X");
        intersection.configure_timing(Direction::North, 40, 5).unwrap();
        intersection.configure_timing(Direction::South, 30, 3).unwrap();
        intersection.configure_timing(Direction::East, 20, 4).unwrap();
        intersection.configure_timing(Direction::West, 25, 2).unwrap();
        // Each phase takes the longest green and yellow of its pair.
        assert_eq!(intersection.phase_timing(0), PhaseTiming { green: 40, yellow: 5 });
        assert_eq!(intersection.phase_timing(1), PhaseTiming { green: 25, yellow: 4 });

        let cycle = 45 + 29;
        for tick in 1..=3 * cycle {
            let outcome = intersection.tick().unwrap();
            assert_one_group_active(&intersection);
            let position = tick % cycle;
            assert_eq!(
                outcome.phase_changed,
                position == 45 || position == 0,
                "tick {}",
                tick
            );
            assert_eq!(
                outcome.turned_yellow,
                position == 40 || position == 70,
                "tick {}",
                tick
            );
            let expected_phase = if (1..45).contains(&position) { 0 } else { 1 };
            let expected_phase = if position == 0 { 0 } else { expected_phase };
            assert_eq!(intersection.current_phase(), expected_phase, "tick {}", tick);
        }
    }

    #[test]
    fn queued_emergency_ids_track_lanes() {
        let mut intersection = Intersection::new("X");
        intersection.admit(car("C1", Direction::North));
        intersection.admit(Vehicle::new("AMB", VehicleType::Ambulance, Direction::East));
        let ids: Vec<String> = intersection.queued_emergency_ids().into_iter().collect();
        assert_eq!(ids, vec!["AMB".to_string()]);

        intersection.clear_queues();
        assert!(intersection.queued_emergency_ids().is_empty());
    }

    #[test]
    fn invalid_durations_keep_prior_configuration() {
        let mut intersection = Intersection::new("X");
        intersection.configure_timing(Direction::East, 20, 4).unwrap();
        let err = intersection.configure_timing(Direction::East, 0, 5);
        assert!(matches!(err, Err(ControlError::InvalidDuration { .. })));
        let err = intersection.configure_timing(Direction::East, 20, -1);
        assert!(matches!(err, Err(ControlError::InvalidDuration { .. })));
        assert_eq!(
            intersection.timing(Direction::East),
            PhaseTiming {
                green: 20,
                yellow: 4
            }
        );
    }

    #[test]
    fn admission_is_fifo_and_one_vehicle_per_tick() {
        let mut intersection = Intersection::new("X");
        intersection.admit(car("V1", Direction::North));
        assert_eq!(intersection.queue_length(Direction::North), 1);
        intersection.admit(car("V2", Direction::North));
        assert_eq!(intersection.queue_length(Direction::North), 2);
        intersection.admit(car("V3", Direction::East));
        assert_eq!(intersection.sensor(Direction::North).vehicle_count(), 2);

        let outcome = intersection.tick().unwrap();
        let ids: Vec<_> = outcome.departures.iter().map(|d| d.vehicle.id()).collect();
        assert_eq!(ids, vec!["V1"]);
        assert_eq!(outcome.departures[0].wait_ticks, 1);

        let outcome = intersection.tick().unwrap();
        assert_eq!(outcome.departures[0].vehicle.id(), "V2");
        assert!(intersection.tick().unwrap().departures.is_empty());
        // EAST is red the whole time.
        assert_eq!(intersection.queue_length(Direction::East), 1);
    }

    #[test]
    fn override_suspends_phase_cycle() {
        let mut intersection = Intersection::new("X");
        intersection.admit(car("V1", Direction::North));
        intersection.admit(car("V2", Direction::West));
        intersection.override_direction(Direction::West);

        assert!(intersection.is_emergency_mode());
        assert_eq!(
            states(&intersection),
            [
                LightState::Red,
                LightState::Red,
                LightState::Red,
                LightState::Green
            ]
        );

        let outcome = intersection.tick().unwrap();
        let ids: Vec<_> = outcome.departures.iter().map(|d| d.vehicle.id()).collect();
        assert_eq!(ids, vec!["V2"]);

        for _ in 0..100 {
            let outcome = intersection.tick().unwrap();
            assert!(!outcome.phase_changed);
            assert!(intersection.signal(Direction::West).is_green());
        }
        assert_eq!(intersection.current_phase(), 0);
        assert_eq!(intersection.queue_length(Direction::North), 1);
    }

    #[test]
    fn clear_resets_to_phase_zero() {
        let mut intersection = Intersection::new("X");
        for _ in 0..40 {
            intersection.tick().unwrap();
        }
        assert_eq!(intersection.current_phase(), 1);
        intersection.override_direction(Direction::East);
        assert!(intersection.clear_emergency_mode());
        assert!(!intersection.clear_emergency_mode());
        assert_eq!(intersection.current_phase(), 0);
        assert_eq!(intersection.phase_elapsed(), 0);
        assert!(Direction::ALL
            .iter()
            .all(|&d| !intersection.signal(d).is_emergency_active()));

        intersection.tick().unwrap();
        assert!(intersection.signal(Direction::North).is_green());
        assert!(intersection.signal(Direction::South).is_green());
        assert_one_group_active(&intersection);
    }

    #[test]
    fn forced_signal_fails_validation_until_restored() {
        let mut intersection = Intersection::new("X");
        intersection.force_signal_state(Direction::East, LightState::FlashingYellow);
        let err = intersection.tick();
        assert!(matches!(err, Err(ControlError::PhaseConflict { .. })));
        assert_eq!(intersection.clock(), 0);

        intersection.restore_phase();
        assert!(intersection.tick().is_ok());
        assert_eq!(intersection.clock(), 1);
    }

    #[test]
    fn queries_on_empty_lanes() {
        let mut intersection = Intersection::new("X");
        assert!(intersection.remove_vehicle(Direction::South).is_none());
        assert_eq!(intersection.average_wait_time(), 0.0);
        assert!(intersection.tick().unwrap().departures.is_empty());

        intersection.admit(car("V1", Direction::East));
        intersection.tick().unwrap();
        intersection.tick().unwrap();
        assert_eq!(intersection.average_wait_time(), 2.0);
        assert_eq!(intersection.total_vehicle_count(), 1);

        let removed = intersection.remove_vehicle(Direction::East).unwrap();
        assert!(!removed.has_passed());

        intersection.admit(car("V2", Direction::West));
        intersection.clear_queues();
        assert_eq!(intersection.total_vehicle_count(), 0);
    }

    #[test]
    fn signal_reading_reports_remaining_time() {
        let mut intersection = Intersection::new("X");
        intersection.tick().unwrap();
        let reading = intersection.signal_state(Direction::North);
        assert_eq!(reading.state, LightState::Green);
        assert_eq!(reading.remaining_secs, 29);
        let status = intersection.status();
        assert_eq!(status.signals.len(), 4);
        assert_eq!(status.current_phase, 0);
    }
}

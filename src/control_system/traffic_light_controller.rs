use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use chrono::{Local, Timelike};
use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ControllerConfig;
use crate::control_system::emergency_dispatcher::{EmergencyDispatcher, OverrideCommand};
use crate::error::{ControlError, Result};
use crate::flow_analyzer::stats_collector::StatsCollector;
use crate::shared_data::{IntersectionStatus, SignalReading, StatsSnapshot};
use crate::simulation_engine::intersections::{Intersection, PhaseTiming, TickOutcome};
use crate::simulation_engine::traffic_generation::TrafficGenerator;
use crate::simulation_engine::vehicles::{Direction, Vehicle};

type SharedIntersection = Arc<Mutex<Intersection>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Summary of one pass of the control loop.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ControlTickReport {
    pub departures: usize,
    pub phase_changes: usize,
    /// Intersections whose tick failed validation and were skipped.
    pub skipped: Vec<String>,
}

/// Owns every intersection plus the emergency dispatcher and statistics, and
/// drives them from two periodic tasks: the control loop (one scheduler tick
/// per intersection) and the generation loop (synthetic inbound traffic).
///
/// Each intersection has its own lock and at most one is held at a time.
/// The dispatcher lock may be taken while holding an intersection lock, never
/// the other way round.
pub struct TrafficLightController {
    intersections: RwLock<BTreeMap<String, SharedIntersection>>,
    dispatcher: Mutex<EmergencyDispatcher>,
    stats: Mutex<StatsCollector>,
    generator: Mutex<TrafficGenerator>,
    config: ControllerConfig,
    simulation_speed: AtomicU32,
    real_time: AtomicBool,
    running: AtomicBool,
    paused: AtomicBool,
    /// Control-loop passes since creation or the last reset.
    clock: AtomicU64,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TrafficLightController {
    /// Builds the controller and the intersections listed in `config`.
    pub fn new(config: ControllerConfig) -> Result<Self> {
        config.validate()?;
        let generator = match config.seed {
            Some(seed) => TrafficGenerator::seeded(seed, config.emergency_chance),
            None => TrafficGenerator::new(config.emergency_chance),
        };
        let (shutdown, _) = watch::channel(false);
        let controller = Self {
            intersections: RwLock::new(BTreeMap::new()),
            dispatcher: Mutex::new(EmergencyDispatcher::new()),
            stats: Mutex::new(StatsCollector::new()),
            generator: Mutex::new(generator),
            simulation_speed: AtomicU32::new(config.simulation_speed),
            real_time: AtomicBool::new(config.real_time),
            config,
            running: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            clock: AtomicU64::new(0),
            shutdown,
            tasks: Mutex::new(Vec::new()),
        };
        controller.build_configured_intersections()?;
        Ok(controller)
    }

    fn build_configured_intersections(&self) -> Result<()> {
        for intersection_config in &self.config.intersections {
            self.create_intersection(&intersection_config.id)?;
            for timing in &intersection_config.timings {
                self.configure_intersection(
                    &intersection_config.id,
                    timing.direction,
                    timing.green,
                    timing.yellow,
                )?;
            }
        }
        Ok(())
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn create_intersection(&self, id: &str) -> Result<()> {
        let mut intersections = self
            .intersections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if intersections.contains_key(id) {
            return Err(ControlError::DuplicateIntersection(id.to_string()));
        }
        intersections.insert(id.to_string(), Arc::new(Mutex::new(Intersection::new(id))));
        info!("Created intersection {}", id);
        Ok(())
    }

    /// Removes an intersection and any emergency requests waiting on it.
    pub fn remove_intersection(&self, id: &str) -> Result<()> {
        let removed = self
            .intersections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if removed.is_none() {
            return Err(ControlError::IntersectionNotFound(id.to_string()));
        }
        let discarded = lock(&self.dispatcher).discard_intersection(id);
        if discarded > 0 {
            warn!(
                "Dropped {} pending emergency request(s) for removed intersection {}",
                discarded, id
            );
        }
        self.apply_dispatch();
        info!("Removed intersection {}", id);
        Ok(())
    }

    pub fn intersection_ids(&self) -> Vec<String> {
        self.intersections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn intersection_count(&self) -> usize {
        self.intersections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn intersection(&self, id: &str) -> Result<SharedIntersection> {
        self.intersections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| ControlError::IntersectionNotFound(id.to_string()))
    }

    /// Snapshot of the registry so no registry lock is held while ticking.
    fn intersection_handles(&self) -> Vec<(String, SharedIntersection)> {
        self.intersections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
            .collect()
    }

    /// Runs `f` with the intersection locked.
    pub fn with_intersection<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Intersection) -> R,
    ) -> Result<R> {
        let handle = self.intersection(id)?;
        let mut intersection = lock(&handle);
        Ok(f(&mut *intersection))
    }

    /// Validated timing change. On error the previous timing stays in place.
    pub fn configure_intersection(
        &self,
        id: &str,
        direction: Direction,
        green: i64,
        yellow: i64,
    ) -> Result<()> {
        let timing = PhaseTiming::new(green, yellow)?;
        self.with_intersection(id, |intersection| intersection.configure(direction, timing))?;
        info!(
            "Intersection {} {} timing set to {}s green / {}s yellow",
            id, direction, timing.green, timing.yellow
        );
        Ok(())
    }

    /// Queues a vehicle at an intersection. Emergency vehicles are also
    /// handed to the dispatcher, which overrides that intersection.
    pub fn admit(&self, intersection_id: &str, vehicle: Vehicle) -> Result<()> {
        let handle = self.intersection(intersection_id)?;
        let emergency = vehicle.is_emergency().then(|| vehicle.clone());

        lock(&self.stats).record_admission(&vehicle);
        {
            // Queue and dispatcher are updated under the intersection lock so
            // no tick can release the vehicle before its request exists.
            let mut intersection = lock(&handle);
            intersection.admit(vehicle);
            if let Some(vehicle) = emergency.clone() {
                lock(&self.dispatcher).enqueue(intersection_id, vehicle);
            }
        }

        if emergency.is_some() {
            self.apply_dispatch();
        }
        Ok(())
    }

    /// One scheduler step for a single intersection.
    pub fn tick_intersection(&self, id: &str) -> Result<TickOutcome> {
        let handle = self.intersection(id)?;
        let outcome = self.tick_handle(&handle)?;
        self.apply_dispatch();
        Ok(outcome)
    }

    /// Ticks one intersection and settles its emergency requests: departed
    /// vehicles are released and requests whose vehicle left the queue any
    /// other way are dropped.
    fn tick_handle(&self, handle: &SharedIntersection) -> Result<TickOutcome> {
        let result = {
            let mut intersection = lock(handle);
            let result = intersection.tick();
            let queued = intersection.queued_emergency_ids();

            let mut dispatcher = lock(&self.dispatcher);
            if let Ok(outcome) = &result {
                let departed = outcome.departures.iter().filter(|d| d.vehicle.is_emergency());
                for departure in departed {
                    dispatcher.release(intersection.id(), departure.vehicle.id());
                }
            }
            let dropped = dispatcher.retain_queued(intersection.id(), &queued);
            if dropped > 0 {
                warn!(
                    "Dropped {} emergency request(s) at {}: vehicle no longer queued",
                    dropped,
                    intersection.id()
                );
            }
            result
        };
        let outcome = result?;

        let mut stats = lock(&self.stats);
        for departure in &outcome.departures {
            stats.record_departure(departure.direction, departure.wait_ticks as f64);
        }
        if outcome.phase_changed {
            stats.record_phase_change();
        }
        Ok(outcome)
    }

    /// One pass of the control loop: ticks every intersection, then lets the
    /// dispatcher retarget or clear overrides.
    pub fn run_control_tick(&self) -> ControlTickReport {
        let mut report = ControlTickReport::default();
        for (id, handle) in self.intersection_handles() {
            match self.tick_handle(&handle) {
                Ok(outcome) => {
                    report.departures += outcome.departures.len();
                    report.phase_changes += usize::from(outcome.phase_changed);
                }
                Err(e) => {
                    warn!("Skipping intersection {} this tick: {}", id, e);
                    report.skipped.push(id);
                }
            }
        }
        lock(&self.stats).record_cycle();
        self.apply_dispatch();
        self.clock.fetch_add(1, Ordering::SeqCst);
        report
    }

    /// Applies the dispatcher's pending decisions. When the last emergency
    /// has gone, every intersection leaves emergency mode.
    fn apply_dispatch(&self) {
        let (commands, all_clear) = {
            let mut dispatcher = lock(&self.dispatcher);
            let commands = dispatcher.plan();
            (commands, dispatcher.settle())
        };

        for command in commands {
            match command {
                OverrideCommand::Override {
                    intersection_id,
                    direction,
                } => match self.intersection(&intersection_id) {
                    Ok(handle) => {
                        lock(&handle).override_direction(direction);
                        lock(&self.stats).record_override();
                    }
                    Err(e) => warn!("Cannot apply emergency override: {}", e),
                },
                OverrideCommand::Clear { intersection_id } => {
                    if let Ok(handle) = self.intersection(&intersection_id) {
                        lock(&handle).clear_emergency_mode();
                    }
                }
            }
        }

        if all_clear {
            info!("All emergency vehicles cleared, resuming normal operation");
            self.clear_all_overrides();
        }
    }

    fn clear_all_overrides(&self) -> usize {
        self.intersection_handles()
            .iter()
            .filter(|(_, handle)| lock(handle).clear_emergency_mode())
            .count()
    }

    /// Operator override of one intersection. Stays in place until cleared
    /// explicitly or until the dispatcher's emergencies are all gone.
    pub fn override_intersection(&self, id: &str, direction: Direction) -> Result<()> {
        self.with_intersection(id, |intersection| intersection.override_direction(direction))?;
        lock(&self.stats).record_override();
        Ok(())
    }

    /// Returns whether the intersection was in emergency mode.
    pub fn clear_override(&self, id: &str) -> Result<bool> {
        self.with_intersection(id, Intersection::clear_emergency_mode)
    }

    /// Drops every pending emergency and returns all intersections to normal
    /// operation. Returns how many intersections were overridden.
    pub fn clear_emergency_mode(&self) -> usize {
        lock(&self.dispatcher).clear();
        let cleared = self.clear_all_overrides();
        info!("Emergency mode cleared on {} intersection(s)", cleared);
        cleared
    }

    pub fn pending_emergencies(&self) -> usize {
        lock(&self.dispatcher).len()
    }

    pub fn is_emergency_active(&self) -> bool {
        lock(&self.dispatcher).is_active()
    }

    pub fn queue_length(&self, id: &str, direction: Direction) -> Result<usize> {
        self.with_intersection(id, |intersection| intersection.queue_length(direction))
    }

    pub fn average_wait_time(&self, id: &str) -> Result<f64> {
        self.with_intersection(id, |intersection| intersection.average_wait_time())
    }

    pub fn total_vehicle_count(&self, id: &str) -> Result<usize> {
        self.with_intersection(id, |intersection| intersection.total_vehicle_count())
    }

    pub fn signal_state(&self, id: &str, direction: Direction) -> Result<SignalReading> {
        self.with_intersection(id, |intersection| intersection.signal_state(direction))
    }

    pub fn is_emergency_mode(&self, id: &str) -> Result<bool> {
        self.with_intersection(id, |intersection| intersection.is_emergency_mode())
    }

    pub fn intersection_status(&self, id: &str) -> Result<IntersectionStatus> {
        self.with_intersection(id, |intersection| intersection.status())
    }

    pub fn all_statuses(&self) -> Vec<IntersectionStatus> {
        self.intersection_handles()
            .iter()
            .map(|(_, handle)| lock(handle).status())
            .collect()
    }

    pub fn statistics(&self) -> StatsSnapshot {
        lock(&self.stats).snapshot()
    }

    pub fn reset_statistics(&self) {
        lock(&self.stats).reset();
        info!("Statistics reset");
    }

    pub fn clock(&self) -> u64 {
        self.clock.load(Ordering::SeqCst)
    }

    /// One generation step: synthesises a vehicle and admits it at a random
    /// intersection. Returns the vehicle and where it went.
    pub fn generate_traffic(&self) -> Option<(String, Vehicle)> {
        let ids = self.intersection_ids();
        let (target, vehicle) = {
            let mut generator = lock(&self.generator);
            let index = generator.choose_target(ids.len())?;
            (ids[index].clone(), generator.next_vehicle(self.clock()))
        };
        match self.admit(&target, vehicle.clone()) {
            Ok(()) => Some((target, vehicle)),
            Err(e) => {
                // Removed between listing and admission.
                debug!("Generated vehicle {} dropped: {}", vehicle.id(), e);
                None
            }
        }
    }

    /// Applies queue-pressure and rush-hour timing to every intersection.
    /// Returns how many direction timings changed.
    pub fn apply_adaptive_timing(&self, hour: u32) -> usize {
        let policy = &self.config.adaptive;
        let mut changed = 0;
        for (id, handle) in self.intersection_handles() {
            let mut intersection = lock(&handle);
            for adjustment in policy.adjustments(&intersection, hour) {
                intersection.configure(adjustment.direction, adjustment.timing);
                info!(
                    "Adaptive timing: {} {} now {}s green / {}s yellow",
                    id, adjustment.direction, adjustment.timing.green, adjustment.timing.yellow
                );
                changed += 1;
            }
        }
        changed
    }

    pub fn set_simulation_speed(&self, speed: u32) -> Result<()> {
        if speed == 0 {
            return Err(ControlError::Config(
                "simulation speed must be at least 1".to_string(),
            ));
        }
        self.simulation_speed.store(speed, Ordering::SeqCst);
        info!("Simulation speed set to {}x", speed);
        Ok(())
    }

    pub fn simulation_speed(&self) -> u32 {
        self.simulation_speed.load(Ordering::SeqCst)
    }

    pub fn set_real_time_mode(&self, real_time: bool) {
        self.real_time.store(real_time, Ordering::SeqCst);
        info!(
            "Real-time mode {}",
            if real_time { "enabled" } else { "disabled" }
        );
    }

    pub fn is_real_time(&self) -> bool {
        self.real_time.load(Ordering::SeqCst)
    }

    /// `1000 / speed` ms in real time, the fast period otherwise.
    pub fn control_period(&self) -> Duration {
        if self.is_real_time() {
            Duration::from_millis(1000 / u64::from(self.simulation_speed().max(1)))
        } else {
            Duration::from_millis(self.config.fast_period_ms)
        }
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        info!("Controller paused");
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        info!("Controller resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawns the control and generation loops on the current Tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ControlError::NoRuntime)?;
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ControlError::AlreadyRunning);
        }
        self.shutdown.send_replace(false);

        let control = runtime.spawn(Self::control_loop(Arc::clone(self), self.shutdown.subscribe()));
        let generation =
            runtime.spawn(Self::generation_loop(Arc::clone(self), self.shutdown.subscribe()));
        lock(&self.tasks).extend([control, generation]);
        info!(
            "Traffic controller started with {} intersection(s)",
            self.intersection_count()
        );
        Ok(())
    }

    /// Clears the running flag and waits for both loops to finish their
    /// current iteration.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.send_replace(true);
        let tasks: Vec<JoinHandle<()>> = lock(&self.tasks).drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                error!("Controller loop ended abnormally: {}", e);
            }
        }
        info!("Traffic controller stopped");
    }

    /// Stops the loops and discards all intersections, emergencies and
    /// statistics, then rebuilds the configured intersections.
    pub async fn reset(&self) -> Result<()> {
        self.stop().await;
        self.intersections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        lock(&self.dispatcher).clear();
        lock(&self.stats).reset();
        self.clock.store(0, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.build_configured_intersections()?;
        info!("Traffic controller reset");
        Ok(())
    }

    /// Sleeps for `period` unless shutdown is signalled first. Returns false
    /// on shutdown.
    async fn wait(shutdown: &mut watch::Receiver<bool>, period: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(period) => true,
            _ = shutdown.changed() => false,
        }
    }

    async fn control_loop(controller: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!("Control loop started");
        while controller.is_running() {
            if !controller.is_paused() {
                let report = controller.run_control_tick();
                if report.departures > 0 {
                    debug!(
                        "Control tick {}: {} departure(s)",
                        controller.clock(),
                        report.departures
                    );
                }
            }
            if !Self::wait(&mut shutdown, controller.control_period()).await {
                break;
            }
        }
        info!("Control loop stopped");
    }

    async fn generation_loop(controller: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!("Generation loop started");
        let period = controller.config.generation_period();
        while controller.is_running() {
            if !controller.is_paused() {
                if let Some((id, vehicle)) = controller.generate_traffic() {
                    debug!(
                        "Generated {} {} at {} heading {}",
                        vehicle.vehicle_type(),
                        vehicle.id(),
                        id,
                        vehicle.direction()
                    );
                }
                controller.apply_adaptive_timing(Local::now().hour());
            }
            if !Self::wait(&mut shutdown, period).await {
                break;
            }
        }
        info!("Generation loop stopped");
    }
}

use crate::simulation_engine::vehicles::{Direction, Vehicle};
use std::collections::VecDeque;

/// A vehicle waiting in a lane, stamped with the tick it was admitted.
#[derive(Debug, Clone)]
pub struct QueuedVehicle {
    pub vehicle: Vehicle,
    pub admitted_at: u64,
}

/// A vehicle released through the stop line.
#[derive(Debug, Clone)]
pub struct Departure {
    pub vehicle: Vehicle,
    pub direction: Direction,
    /// Ticks spent waiting in the lane queue.
    pub wait_ticks: u64,
}

/// FIFO of waiting vehicles for one approach. Unbounded; callers impose
/// backpressure if they need it.
#[derive(Debug, Clone)]
pub struct LaneQueue {
    direction: Direction,
    waiting: VecDeque<QueuedVehicle>,
}

impl LaneQueue {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            waiting: VecDeque::new(),
        }
    }

    pub fn push(&mut self, vehicle: Vehicle, now: u64) {
        self.waiting.push_back(QueuedVehicle {
            vehicle,
            admitted_at: now,
        });
    }

    /// Removes the head vehicle, marking it passed.
    pub fn release(&mut self, now: u64) -> Option<Departure> {
        let QueuedVehicle {
            mut vehicle,
            admitted_at,
        } = self.waiting.pop_front()?;
        vehicle.mark_passed();
        Some(Departure {
            vehicle,
            direction: self.direction,
            wait_ticks: now.saturating_sub(admitted_at),
        })
    }

    /// Removes the head vehicle without marking it passed.
    pub fn pop(&mut self) -> Option<Vehicle> {
        self.waiting.pop_front().map(|q| q.vehicle)
    }

    pub fn front(&self) -> Option<&Vehicle> {
        self.waiting.front().map(|q| &q.vehicle)
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    pub fn clear(&mut self) {
        self.waiting.clear();
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Sum of the current waits of every queued vehicle.
    pub fn total_wait(&self, now: u64) -> u64 {
        self.waiting
            .iter()
            .map(|q| now.saturating_sub(q.admitted_at))
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.waiting.iter().map(|q| &q.vehicle)
    }
}

/// One lane queue per approach direction.
#[derive(Debug, Clone)]
pub struct LaneQueues {
    lanes: [LaneQueue; 4],
}

impl Default for LaneQueues {
    fn default() -> Self {
        Self {
            lanes: Direction::ALL.map(LaneQueue::new),
        }
    }
}

impl LaneQueues {
    pub fn get(&self, direction: Direction) -> &LaneQueue {
        &self.lanes[direction.index()]
    }

    pub fn get_mut(&mut self, direction: Direction) -> &mut LaneQueue {
        &mut self.lanes[direction.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &LaneQueue> {
        self.lanes.iter()
    }

    pub fn total_len(&self) -> usize {
        self.lanes.iter().map(LaneQueue::len).sum()
    }

    pub fn clear(&mut self) {
        self.lanes.iter_mut().for_each(LaneQueue::clear);
    }

    /// Queue lengths indexed by `Direction::index`.
    pub fn lengths(&self) -> [usize; 4] {
        [
            self.lanes[0].len(),
            self.lanes[1].len(),
            self.lanes[2].len(),
            self.lanes[3].len(),
        ]
    }
}

use crate::simulation_engine::vehicles::{Direction, Vehicle};
use log::{debug, info};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

/// An emergency vehicle waiting for right of way at one intersection.
#[derive(Debug, Clone, PartialEq)]
pub struct EmergencyRequest {
    pub intersection_id: String,
    pub vehicle: Vehicle,
}

impl EmergencyRequest {
    pub fn direction(&self) -> Direction {
        self.vehicle.direction()
    }
}

/// What the controller must do to an intersection to follow the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideCommand {
    Override {
        intersection_id: String,
        direction: Direction,
    },
    Clear {
        intersection_id: String,
    },
}

#[derive(Debug, Clone)]
struct PendingEmergency {
    request: EmergencyRequest,
    /// Enqueue order, the final tiebreak.
    sequence: u64,
}

impl PendingEmergency {
    fn key(&self) -> (u32, std::cmp::Reverse<u64>, std::cmp::Reverse<u64>) {
        (
            self.request.vehicle.priority(),
            std::cmp::Reverse(self.request.vehicle.arrived_at()),
            std::cmp::Reverse(self.sequence),
        )
    }
}

// Max-heap order: highest priority first, then earliest arrival, then
// earliest enqueue.
impl Ord for PendingEmergency {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for PendingEmergency {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PendingEmergency {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingEmergency {}

/// Global priority queue of emergency vehicles. Decides which direction of
/// each intersection is overridden and when overrides end.
#[derive(Debug, Default)]
pub struct EmergencyDispatcher {
    pending: BinaryHeap<PendingEmergency>,
    /// Direction currently overridden at each intersection on our behalf.
    assigned: BTreeMap<String, Direction>,
    active: bool,
    next_sequence: u64,
}

impl EmergencyDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, intersection_id: impl Into<String>, vehicle: Vehicle) {
        let request = EmergencyRequest {
            intersection_id: intersection_id.into(),
            vehicle,
        };
        info!(
            "Emergency vehicle {} {} queued for {} heading {}",
            request.vehicle.vehicle_type(),
            request.vehicle.id(),
            request.intersection_id,
            request.direction()
        );
        self.pending.push(PendingEmergency {
            request,
            sequence: self.next_sequence,
        });
        self.next_sequence += 1;
        self.active = true;
    }

    /// Highest-priority pending request for one intersection.
    pub fn next_for(&self, intersection_id: &str) -> Option<&EmergencyRequest> {
        self.pending
            .iter()
            .filter(|p| p.request.intersection_id == intersection_id)
            .max()
            .map(|p| &p.request)
    }

    /// Removes and returns the highest-priority request overall.
    pub fn pop(&mut self) -> Option<EmergencyRequest> {
        self.pending.pop().map(|p| p.request)
    }

    /// Removes the request for a vehicle that has cleared its intersection.
    pub fn release(
        &mut self,
        intersection_id: &str,
        vehicle_id: &str,
    ) -> Option<EmergencyRequest> {
        let mut released = None;
        self.pending.retain(|p| {
            let matches = p.request.intersection_id == intersection_id
                && p.request.vehicle.id() == vehicle_id;
            if released.is_none() && matches {
                released = Some(p.request.clone());
                false
            } else {
                true
            }
        });
        if let Some(request) = &released {
            debug!(
                "Emergency vehicle {} released at {}",
                request.vehicle.id(),
                request.intersection_id
            );
        }
        released
    }

    /// Drops requests at `intersection_id` whose vehicle is no longer queued
    /// there, e.g. removed from its lane by an operator. Returns how many
    /// were dropped.
    pub fn retain_queued(&mut self, intersection_id: &str, queued: &BTreeSet<String>) -> usize {
        let before = self.pending.len();
        self.pending.retain(|p| {
            p.request.intersection_id != intersection_id
                || queued.contains(p.request.vehicle.id())
        });
        before - self.pending.len()
    }

    /// Brings every intersection's override in line with the pending list:
    /// each intersection with pending requests gets its highest-priority
    /// request's direction, and intersections with none left are cleared.
    /// Only changes are returned.
    pub fn plan(&mut self) -> Vec<OverrideCommand> {
        let mut commands = Vec::new();
        for intersection_id in self.pending_intersections() {
            let Some(direction) = self.next_for(&intersection_id).map(|r| r.direction()) else {
                continue;
            };
            if self.assigned.get(&intersection_id) != Some(&direction) {
                self.assigned.insert(intersection_id.clone(), direction);
                commands.push(OverrideCommand::Override {
                    intersection_id,
                    direction,
                });
            }
        }

        let finished: Vec<String> = self
            .assigned
            .keys()
            .filter(|id| self.next_for(id).is_none())
            .cloned()
            .collect();
        for intersection_id in finished {
            self.assigned.remove(&intersection_id);
            commands.push(OverrideCommand::Clear { intersection_id });
        }
        commands
    }

    pub fn assigned_direction(&self, intersection_id: &str) -> Option<Direction> {
        self.assigned.get(intersection_id).copied()
    }

    /// Drops every request and assignment for an intersection that no longer exists.
    pub fn discard_intersection(&mut self, intersection_id: &str) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|p| p.request.intersection_id != intersection_id);
        self.assigned.remove(intersection_id);
        before - self.pending.len()
    }

    /// Marks the dispatcher inactive once nothing is pending. Returns true on
    /// the transition, i.e. when every override should now be cleared.
    pub fn settle(&mut self) -> bool {
        if self.active && self.pending.is_empty() {
            self.active = false;
            return true;
        }
        false
    }

    /// Pending requests in dispatch order.
    pub fn pending_order(&self) -> Vec<EmergencyRequest> {
        let mut sorted = self.pending.clone().into_sorted_vec();
        sorted.reverse();
        sorted.into_iter().map(|p| p.request).collect()
    }

    pub fn pending_intersections(&self) -> BTreeSet<String> {
        self.pending
            .iter()
            .map(|p| p.request.intersection_id.clone())
            .collect()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.assigned.clear();
        self.active = false;
    }
}

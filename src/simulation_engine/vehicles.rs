use crate::error::ControlError;
use crate::global_variables::{
    BUS_PRIORITY, CAR_PRIORITY, EMERGENCY_PRIORITY, MOTORCYCLE_PRIORITY, TRUCK_PRIORITY,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Approach direction of a lane into an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Position of this direction in per-direction arrays.
    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::South => 1,
            Direction::East => 2,
            Direction::West => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Direction> {
        Direction::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "NORTH",
            Direction::South => "SOUTH",
            Direction::East => "EAST",
            Direction::West => "WEST",
        }
    }

    /// Phase index whose green group contains this direction.
    pub fn phase(self) -> usize {
        match self {
            Direction::North | Direction::South => 0,
            Direction::East | Direction::West => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NORTH" | "N" => Ok(Direction::North),
            "SOUTH" | "S" => Ok(Direction::South),
            "EAST" | "E" => Ok(Direction::East),
            "WEST" | "W" => Ok(Direction::West),
            _ => Err(ControlError::UnknownDirection(s.to_string())),
        }
    }
}

/// Different classes of vehicles that can be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    Car,
    Truck,
    Bus,
    Motorcycle,
    Ambulance,
    FireTruck,
    Police,
    Emergency,
}

impl VehicleType {
    pub const ALL: [VehicleType; 8] = [
        VehicleType::Car,
        VehicleType::Truck,
        VehicleType::Bus,
        VehicleType::Motorcycle,
        VehicleType::Ambulance,
        VehicleType::FireTruck,
        VehicleType::Police,
        VehicleType::Emergency,
    ];

    /// Priority derived from the vehicle class.
    pub fn priority(self) -> u32 {
        match self {
            VehicleType::Ambulance
            | VehicleType::FireTruck
            | VehicleType::Police
            | VehicleType::Emergency => EMERGENCY_PRIORITY,
            VehicleType::Bus => BUS_PRIORITY,
            VehicleType::Truck => TRUCK_PRIORITY,
            VehicleType::Car => CAR_PRIORITY,
            VehicleType::Motorcycle => MOTORCYCLE_PRIORITY,
        }
    }

    pub fn is_emergency(self) -> bool {
        matches!(
            self,
            VehicleType::Ambulance
                | VehicleType::FireTruck
                | VehicleType::Police
                | VehicleType::Emergency
        )
    }

    pub fn is_commercial(self) -> bool {
        matches!(self, VehicleType::Truck | VehicleType::Bus)
    }

    pub fn name(self) -> &'static str {
        match self {
            VehicleType::Car => "CAR",
            VehicleType::Truck => "TRUCK",
            VehicleType::Bus => "BUS",
            VehicleType::Motorcycle => "MOTORCYCLE",
            VehicleType::Ambulance => "AMBULANCE",
            VehicleType::FireTruck => "FIRE_TRUCK",
            VehicleType::Police => "POLICE",
            VehicleType::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A vehicle approaching an intersection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    id: String,
    vehicle_type: VehicleType,
    direction: Direction,
    priority: u32,
    /// Logical tick at which the vehicle entered the system.
    arrived_at: u64,
    passed: bool,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, vehicle_type: VehicleType, direction: Direction) -> Self {
        Self {
            id: id.into(),
            vehicle_type,
            direction,
            priority: vehicle_type.priority(),
            arrived_at: 0,
            passed: false,
        }
    }

    pub fn with_arrival(mut self, tick: u64) -> Self {
        self.arrived_at = tick;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn vehicle_type(&self) -> VehicleType {
        self.vehicle_type
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn arrived_at(&self) -> u64 {
        self.arrived_at
    }

    pub fn has_passed(&self) -> bool {
        self.passed
    }

    pub fn set_priority(&mut self, priority: u32) {
        self.priority = priority;
    }

    pub fn mark_passed(&mut self) {
        self.passed = true;
    }

    pub fn is_emergency(&self) -> bool {
        self.vehicle_type.is_emergency()
    }

    pub fn is_commercial(&self) -> bool {
        self.vehicle_type.is_commercial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_follows_vehicle_class() {
        let expected = [
            (VehicleType::Ambulance, 100),
            (VehicleType::FireTruck, 100),
            (VehicleType::Police, 100),
            (VehicleType::Emergency, 100),
            (VehicleType::Bus, 20),
            (VehicleType::Truck, 15),
            (VehicleType::Car, 10),
            (VehicleType::Motorcycle, 5),
        ];
        for (vehicle_type, priority) in expected {
            let v = Vehicle::new("v", vehicle_type, Direction::North);
            assert_eq!(v.priority(), priority, "{}", vehicle_type);
        }
    }

    #[test]
    fn emergency_and_commercial_predicates() {
        let emergency: Vec<_> = VehicleType::ALL
            .iter()
            .filter(|t| t.is_emergency())
            .collect();
        assert_eq!(emergency.len(), 4);
        assert!(VehicleType::Bus.is_commercial());
        assert!(VehicleType::Truck.is_commercial());
        assert!(!VehicleType::Car.is_commercial());
        assert!(!VehicleType::Ambulance.is_commercial());
    }

    #[test]
    fn priority_override_and_passed_flag() {
        let mut v = Vehicle::new("A1", VehicleType::Ambulance, Direction::East).with_arrival(7);
        v.set_priority(5);
        v.mark_passed();
        assert_eq!(v.priority(), 5);
        assert!(v.has_passed());
        assert!(v.is_emergency());
        assert_eq!(v.arrived_at(), 7);
    }

    #[test]
    fn direction_parsing_and_indexing() {
        assert_eq!("north".parse::<Direction>().unwrap(), Direction::North);
        assert_eq!(" W ".parse::<Direction>().unwrap(), Direction::West);
        assert!(matches!(
            "UP".parse::<Direction>(),
            Err(ControlError::UnknownDirection(_))
        ));
        for d in Direction::ALL {
            assert_eq!(Direction::from_index(d.index()), Some(d));
        }
        assert_eq!(Direction::from_index(4), None);
        assert_eq!(Direction::South.phase(), 0);
        assert_eq!(Direction::West.phase(), 1);
    }

    #[test]
    fn serializes_with_screaming_names() {
        let json = serde_json::to_string(&VehicleType::FireTruck).unwrap();
        assert_eq!(json, "\"FIRE_TRUCK\"");
        let d: Direction = serde_json::from_str("\"EAST\"").unwrap();
        assert_eq!(d, Direction::East);
    }
}

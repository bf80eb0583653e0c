// simulation_engine/mod.rs
pub mod intersections;
pub mod lanes;
pub mod sensors;
pub mod signals;
pub mod traffic_generation;
pub mod vehicles;

pub mod config;
pub mod control_system;
pub mod error;
pub mod flow_analyzer;
pub mod global_variables;
pub mod monitoring;
pub mod shared_data;
pub mod simulation_engine;

pub use config::ControllerConfig;
pub use control_system::traffic_light_controller::TrafficLightController;
pub use error::{ControlError, Result};

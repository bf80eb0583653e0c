pub mod emergency_dispatcher;
pub mod traffic_light_controller;

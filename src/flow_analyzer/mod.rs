pub mod adaptive_timing;
pub mod stats_collector;

// Re-export the items the controller and reports use
pub use adaptive_timing::{AdaptiveTimingPolicy, TimingAdjustment};
pub use stats_collector::StatsCollector;

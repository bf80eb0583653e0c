use log::{error, info};
use signal_control::monitoring::report::{append_snapshot_csv, render_status_line, save_report};
use signal_control::{ControllerConfig, TrafficLightController};
use std::env;
use std::sync::Arc;
use std::time::Duration;

const REPORT_FILE: &str = "traffic_report.txt";
const SNAPSHOT_FILE: &str = "traffic_snapshots.csv";

/// Usage: traffic_control_main [config.json] [run_seconds]
///
/// Without `run_seconds` the controller runs until Ctrl-C.
#[tokio::main]
async fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let config = match args.get(1) {
        Some(path) => match ControllerConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config {}: {}", path, e);
                return;
            }
        },
        None => ControllerConfig::default(),
    };
    let run_for = args
        .get(2)
        .and_then(|secs| secs.parse::<u64>().ok())
        .map(Duration::from_secs);

    let controller = match TrafficLightController::new(config) {
        Ok(controller) => Arc::new(controller),
        Err(e) => {
            error!("Controller error: {}", e);
            return;
        }
    };

    println!("Starting traffic controller...");
    if let Err(e) = controller.start() {
        error!("Controller error: {}", e);
        return;
    }

    let monitor = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(5));
            loop {
                interval.tick().await;
                let snapshot = controller.statistics();
                println!("{}", render_status_line(&snapshot));
                if let Err(e) = append_snapshot_csv(SNAPSHOT_FILE, &snapshot) {
                    error!("Error logging snapshot: {}", e);
                }
            }
        })
    };

    match run_for {
        Some(duration) => tokio::time::sleep(duration).await,
        None => {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for shutdown signal: {}", e);
            }
        }
    }

    info!("Shutting down");
    monitor.abort();
    controller.stop().await;

    if let Err(e) = save_report(REPORT_FILE, &controller.statistics()) {
        error!("Error saving report: {}", e);
    }
}

use crate::error::Result;
use crate::shared_data::StatsSnapshot;
use crate::simulation_engine::vehicles::Direction;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// One CSV row per statistics snapshot. The csv writer needs a flat record,
/// so the per-direction breakdown is spelled out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub timestamp: u64,
    pub runtime_secs: f64,
    pub total_vehicles: u64,
    pub emergency_vehicles: u64,
    pub processed_vehicles: u64,
    pub average_wait_secs: f64,
    pub throughput_per_minute: f64,
    pub efficiency_percent: f64,
    pub total_cycles: u64,
    pub emergency_overrides: u64,
    pub north_admitted: u64,
    pub south_admitted: u64,
    pub east_admitted: u64,
    pub west_admitted: u64,
}

impl From<&StatsSnapshot> for SnapshotRecord {
    fn from(snapshot: &StatsSnapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp,
            runtime_secs: snapshot.runtime_secs,
            total_vehicles: snapshot.total_vehicles,
            emergency_vehicles: snapshot.emergency_vehicles,
            processed_vehicles: snapshot.processed_vehicles,
            average_wait_secs: snapshot.average_wait_secs,
            throughput_per_minute: snapshot.throughput_per_minute,
            efficiency_percent: snapshot.efficiency_percent,
            total_cycles: snapshot.total_cycles,
            emergency_overrides: snapshot.emergency_overrides,
            north_admitted: snapshot.north.admitted,
            south_admitted: snapshot.south.admitted,
            east_admitted: snapshot.east.admitted,
            west_admitted: snapshot.west.admitted,
        }
    }
}

/// Writes the key/value summary.
pub fn write_report<W: Write>(out: &mut W, snapshot: &StatsSnapshot) -> io::Result<()> {
    writeln!(out, "Traffic Management System Report")?;
    writeln!(out, "Generated on: {}", snapshot.timestamp)?;
    writeln!(out)?;
    writeln!(out, "Overall Statistics:")?;
    writeln!(out, "Total Runtime: {:.2} seconds", snapshot.runtime_secs)?;
    writeln!(out, "Total Vehicles: {}", snapshot.total_vehicles)?;
    writeln!(out, "Processed Vehicles: {}", snapshot.processed_vehicles)?;
    writeln!(out, "Emergency Vehicles: {}", snapshot.emergency_vehicles)?;
    writeln!(out, "Average Wait Time: {:.2} seconds", snapshot.average_wait_secs)?;
    writeln!(out, "Throughput: {:.2} vehicles/minute", snapshot.throughput_per_minute)?;
    writeln!(out, "System Efficiency: {:.2}%", snapshot.efficiency_percent)?;
    writeln!(out, "Total Cycles: {}", snapshot.total_cycles)?;
    writeln!(out, "Phase Changes: {}", snapshot.phase_changes)?;
    writeln!(out, "Emergency Overrides: {}", snapshot.emergency_overrides)?;
    writeln!(out)?;
    writeln!(out, "Direction Statistics:")?;
    for direction in Direction::ALL {
        let breakdown = snapshot.direction(direction);
        if breakdown.admitted == 0 && breakdown.departed == 0 {
            continue;
        }
        writeln!(
            out,
            "{}: {} vehicles, {} departed, Avg Wait: {:.2} seconds",
            direction, breakdown.admitted, breakdown.departed, breakdown.average_wait_secs
        )?;
    }
    writeln!(out)?;
    writeln!(out, "Performance Metrics:")?;
    writeln!(
        out,
        "Emergency Response Rate: {}%",
        snapshot.emergency_response_rate
    )?;
    writeln!(
        out,
        "Cycle Efficiency: {:.2} vehicles/cycle",
        snapshot.vehicles_per_cycle
    )?;
    writeln!(
        out,
        "Average Cycle Time: {:.2} seconds",
        snapshot.average_cycle_secs
    )?;
    Ok(())
}

pub fn render_report(snapshot: &StatsSnapshot) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_report(&mut buffer, snapshot);
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Single-line progress display for the console.
pub fn render_status_line(snapshot: &StatsSnapshot) -> String {
    format!(
        "Runtime: {:>4}s | Vehicles: {:>4} | Avg Wait: {:>5.1}s | Throughput: {:>5.1} v/m",
        snapshot.runtime_secs as u64,
        snapshot.total_vehicles,
        snapshot.average_wait_secs,
        snapshot.throughput_per_minute
    )
}

pub fn save_report(path: impl AsRef<Path>, snapshot: &StatsSnapshot) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_report(&mut writer, snapshot)?;
    writer.flush()?;
    info!("Report saved to {}", path.display());
    Ok(())
}

/// Generic helper to append a record to a CSV file, writing the header
/// only when the file is new.
fn log_to_csv<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let file_exists = path.exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    wtr.serialize(record)?;
    wtr.flush()?;
    Ok(())
}

pub fn append_snapshot_csv(path: impl AsRef<Path>, snapshot: &StatsSnapshot) -> Result<()> {
    log_to_csv(path.as_ref(), &SnapshotRecord::from(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_data::DirectionBreakdown;
    use std::fs;
    use std::path::PathBuf;

    fn sample() -> StatsSnapshot {
        StatsSnapshot {
            timestamp: 1_700_000_000,
            runtime_secs: 60.0,
            total_vehicles: 10,
            emergency_vehicles: 1,
            processed_vehicles: 8,
            average_wait_secs: 4.5,
            throughput_per_minute: 8.0,
            efficiency_percent: 80.0,
            emergency_response_rate: 10,
            total_cycles: 60,
            emergency_overrides: 1,
            north: DirectionBreakdown {
                admitted: 6,
                departed: 5,
                average_wait_secs: 3.0,
            },
            ..StatsSnapshot::default()
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}_{}", std::process::id(), name));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn report_lists_totals_and_active_directions() {
        let report = render_report(&sample());
        assert!(report.contains("Total Vehicles: 10"));
        assert!(report.contains("Average Wait Time: 4.50 seconds"));
        assert!(report.contains("System Efficiency: 80.00%"));
        assert!(report.contains("NORTH: 6 vehicles, 5 departed"));
        assert!(!report.contains("EAST:"));
    }

    #[test]
    fn status_line_is_single_line() {
        let line = render_status_line(&sample());
        assert!(!line.contains('\n'));
        assert!(line.starts_with("Runtime:   60s"));
    }

    #[test]
    fn save_report_writes_file() {
        let path = temp_path("signal_control_report.txt");
        save_report(&path, &sample()).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, render_report(&sample()));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn csv_header_written_once() {
        let path = temp_path("signal_control_snapshots.csv");
        append_snapshot_csv(&path, &sample()).unwrap();
        append_snapshot_csv(&path, &sample()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<SnapshotRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].north_admitted, 6);
        assert_eq!(rows[1].total_vehicles, 10);
        fs::remove_file(&path).unwrap();
    }
}

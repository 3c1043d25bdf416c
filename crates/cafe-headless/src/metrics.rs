use std::fs::File;
use std::path::Path;
use std::time::Duration;

use cafe_core::sim::{DisplayMetrics, MetricsSample};
use csv::Writer;

/// Metrics writer for CSV output and performance logging
pub struct MetricsWriter {
    csv_writer: Writer<File>,
    rows: u32,
}

impl MetricsWriter {
    /// Create a new metrics writer
    pub fn new(output_dir: &Path) -> Result<Self, anyhow::Error> {
        let csv_path = output_dir.join("metrics.csv");
        let file = File::create(&csv_path)?;

        let mut csv_writer = Writer::from_writer(file);

        csv_writer.write_record([
            "frame",
            "time",
            "particles",
            "entropy", "mixedness", "complexity", "kinetic", "occupied_cells",
            "display_entropy", "display_mixedness", "display_complexity", "display_kinetic",
            "wall_time_ms",
        ])?;

        Ok(Self { csv_writer, rows: 0 })
    }

    /// Write one metrics sample, raw and shaped for display
    pub fn write_step(
        &mut self,
        frame: u32,
        time: f32,
        particles: u32,
        sample: &MetricsSample,
        frame_time: Duration,
    ) -> Result<(), anyhow::Error> {
        let display = DisplayMetrics::from(sample);
        let wall_time_ms = frame_time.as_secs_f64() * 1000.0;

        self.csv_writer.write_record(&[
            frame.to_string(),
            format!("{:.4}", time),
            particles.to_string(),
            format!("{:.5}", sample.entropy),
            format!("{:.5}", sample.mixedness),
            format!("{:.5}", sample.complexity),
            format!("{:.5}", sample.kinetic),
            sample.count.to_string(),
            format!("{:.5}", display.entropy),
            format!("{:.5}", display.mixedness),
            format!("{:.5}", display.complexity),
            format!("{:.5}", display.kinetic),
            format!("{:.3}", wall_time_ms),
        ])?;

        self.csv_writer.flush()?;
        self.rows += 1;

        Ok(())
    }

    /// Number of rows written
    pub fn rows(&self) -> u32 {
        self.rows
    }
}

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Result;
use cafe_core::constants::{COFFEE_COLOR, CREAM_COLOR};
use cafe_core::sim::Particle;
use cafe_core::GlassConfig;
use csv::Writer;
use image::{ImageBuffer, Rgb, RgbImage};

/// Pixels per world unit in the side projection
const PIXELS_PER_UNIT: f32 = 50.0;
const BACKGROUND: [u8; 3] = [18, 18, 22];

/// Snapshot writer for cream projections and particle dumps
pub struct SnapshotWriter {
    output_dir: PathBuf,
    glass: GlassConfig,
}

impl SnapshotWriter {
    /// Create a new snapshot writer
    pub fn new(output_dir: &Path, glass: &GlassConfig) -> Result<Self> {
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            glass: glass.clone(),
        })
    }

    /// Write a side view (x right, y up) coloured by the cream fraction of each pixel column
    pub fn write_cream_snapshot(&self, frame: u32, particles: &[Particle]) -> Result<PathBuf> {
        let filepath = self.output_dir.join(format!("cream_{:04}.png", frame));
        project_cream(particles, &self.glass).save(&filepath)?;
        Ok(filepath)
    }

    /// Write particle positions, velocities and kinds to CSV
    pub fn write_particles_snapshot(&self, frame: u32, particles: &[Particle]) -> Result<PathBuf> {
        let filepath = self.output_dir.join(format!("particles_{:04}.csv", frame));

        let file = File::create(&filepath)?;
        let mut csv_writer = Writer::from_writer(file);

        csv_writer.write_record(["id", "kind", "x", "y", "z", "vx", "vy", "vz"])?;

        for (i, p) in particles.iter().enumerate() {
            csv_writer.write_record(&[
                i.to_string(),
                if p.is_cream() { "cream" } else { "coffee" }.to_string(),
                p.position[0].to_string(),
                p.position[1].to_string(),
                p.position[2].to_string(),
                p.velocity[0].to_string(),
                p.velocity[1].to_string(),
                p.velocity[2].to_string(),
            ])?;
        }

        csv_writer.flush()?;

        Ok(filepath)
    }
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Project particles onto the x/y plane, blending coffee and cream colours per pixel
pub fn project_cream(particles: &[Particle], glass: &GlassConfig) -> RgbImage {
    let width = ((2.0 * glass.radius * PIXELS_PER_UNIT).ceil() as u32).max(1);
    let height = ((glass.height * PIXELS_PER_UNIT).ceil() as u32).max(1);

    let mut counts = vec![[0u32; 2]; (width * height) as usize];
    for p in particles {
        let px = ((p.position[0] + glass.radius) * PIXELS_PER_UNIT).floor() as i64;
        let py = ((0.5 * glass.height - p.position[1]) * PIXELS_PER_UNIT).floor() as i64;
        if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
            continue;
        }
        let slot = &mut counts[(py as u32 * width + px as u32) as usize];
        slot[usize::from(p.is_cream())] += 1;
    }

    let mut img: RgbImage = ImageBuffer::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let [coffee, cream] = counts[(y * width + x) as usize];
        let total = coffee + cream;
        *pixel = if total == 0 {
            Rgb(BACKGROUND)
        } else {
            let c = cream as f32 / total as f32;
            Rgb([
                to_byte(COFFEE_COLOR[0] + (CREAM_COLOR[0] - COFFEE_COLOR[0]) * c),
                to_byte(COFFEE_COLOR[1] + (CREAM_COLOR[1] - COFFEE_COLOR[1]) * c),
                to_byte(COFFEE_COLOR[2] + (CREAM_COLOR[2] - COFFEE_COLOR[2]) * c),
            ])
        };
    }
    img
}

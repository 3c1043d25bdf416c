//! Mixing metrics over a coarse grid.
//!
//! `MetricsGrid::compute` is the CPU counterpart of `metrics.wgsl`; `MetricsSample::from_words`
//! decodes the GPU accumulator after readback.

use glam::Vec3;
use serde::Serialize;

use cafe_params::{constants, SimulationConfig};

use super::particles::Particle;

/// Per-cell means of the four mixing scalars
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSample {
    pub entropy: f32,
    pub mixedness: f32,
    pub complexity: f32,
    pub kinetic: f32,
    pub count: u32,     // Occupied cells
    pub particles: u32, // Particles binned
}

impl MetricsSample {
    /// Decode the fixed-point accumulator words written by the cell pass
    pub fn from_words(words: &[u32]) -> Self {
        if words.len() < 6 {
            return Self::default();
        }
        let count = words[4];
        let denom = count.max(1) as f32 * constants::METRICS_SCALE;
        Self {
            entropy: words[0] as f32 / denom,
            mixedness: words[1] as f32 / denom,
            complexity: words[2] as f32 / denom,
            kinetic: words[3] as f32 / denom,
            count,
            particles: words[5],
        }
    }
}

/// Binary entropy of a cream fraction, in bits
pub fn binary_entropy(c: f32) -> f32 {
    if c <= 0.0 || c >= 1.0 {
        return 0.0;
    }
    -(c * c.log2() + (1.0 - c) * (1.0 - c).log2())
}

/// 1 at a 50/50 mix, 0 for a single kind
pub fn mixedness(c: f32) -> f32 {
    1.0 - (2.0 * c - 1.0).abs()
}

#[derive(Debug, Clone, Copy, Default)]
struct MetricsCell {
    coffee: u32,
    cream: u32,
    kinetic: f32,
}

impl MetricsCell {
    fn total(&self) -> u32 {
        self.coffee + self.cream
    }
}

/// Coarse `G³` grid over the glass bounding box
pub struct MetricsGrid {
    size: u32,
    origin: Vec3,
    extent: Vec3,
    cells: Vec<MetricsCell>,
}

impl MetricsGrid {
    pub fn new(config: &SimulationConfig) -> Self {
        let size = config.metrics.grid_size;
        let min = Vec3::from_array(config.glass.bounds_min());
        let max = Vec3::from_array(config.glass.bounds_max());
        Self {
            size,
            origin: min,
            extent: max - min,
            cells: vec![MetricsCell::default(); (size * size * size) as usize],
        }
    }

    fn index(&self, x: u32, y: u32, z: u32) -> usize {
        (x + self.size * (y + self.size * z)) as usize
    }

    fn cell_of(&self, position: Vec3) -> usize {
        let g = self.size as f32;
        let rel = (position - self.origin) / self.extent * g;
        let max = (self.size - 1) as i32;
        let c = rel.floor().as_ivec3().clamp(glam::IVec3::ZERO, glam::IVec3::splat(max));
        self.index(c.x as u32, c.y as u32, c.z as u32)
    }

    fn fraction(&self, x: i32, y: i32, z: i32, fallback: f32) -> f32 {
        let g = self.size as i32;
        if x < 0 || y < 0 || z < 0 || x >= g || y >= g || z >= g {
            return fallback;
        }
        let cell = &self.cells[self.index(x as u32, y as u32, z as u32)];
        if cell.total() == 0 {
            fallback
        } else {
            cell.cream as f32 / cell.total() as f32
        }
    }

    /// Bin the particles and reduce to per-cell means
    pub fn compute(&mut self, particles: &[Particle]) -> MetricsSample {
        self.cells.fill(MetricsCell::default());
        for p in particles {
            let idx = self.cell_of(p.position());
            let cell = &mut self.cells[idx];
            if p.is_cream() {
                cell.cream += 1;
            } else {
                cell.coffee += 1;
            }
            cell.kinetic += (0.5 * p.velocity().length_squared()).min(constants::KINETIC_CLAMP);
        }

        let mut sums = [0.0f32; 4];
        let mut count = 0u32;
        let mut total_particles = 0u32;
        let g = self.size as i32;
        for z in 0..g {
            for y in 0..g {
                for x in 0..g {
                    let cell = self.cells[self.index(x as u32, y as u32, z as u32)];
                    let total = cell.total();
                    if total == 0 {
                        continue;
                    }
                    let c = cell.cream as f32 / total as f32;
                    let gx = (self.fraction(x + 1, y, z, c) - self.fraction(x - 1, y, z, c)) * 0.5;
                    let gy = (self.fraction(x, y + 1, z, c) - self.fraction(x, y - 1, z, c)) * 0.5;
                    let gz = (self.fraction(x, y, z + 1, c) - self.fraction(x, y, z - 1, c)) * 0.5;
                    let grad = (gx * gx + gy * gy + gz * gz).sqrt();
                    let mix = mixedness(c);

                    sums[0] += binary_entropy(c);
                    sums[1] += mix;
                    sums[2] += grad.min(1.0) * mix;
                    sums[3] += (cell.kinetic / total as f32).min(constants::KINETIC_CLAMP);
                    count += 1;
                    total_particles += total;
                }
            }
        }

        let denom = count.max(1) as f32;
        MetricsSample {
            entropy: sums[0] / denom,
            mixedness: sums[1] / denom,
            complexity: sums[2] / denom,
            kinetic: sums[3] / denom,
            count,
            particles: total_particles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropy_edges() {
        assert_eq!(binary_entropy(0.0), 0.0);
        assert_eq!(binary_entropy(1.0), 0.0);
        assert!((binary_entropy(0.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn decode_divides_by_occupied_cells() {
        let words = [1500, 2000, 100, 40, 2, 900, 0, 0];
        let sample = MetricsSample::from_words(&words);
        assert!((sample.entropy - 0.75).abs() < 1e-6);
        assert!((sample.mixedness - 1.0).abs() < 1e-6);
        assert!((sample.complexity - 0.05).abs() < 1e-6);
        assert!((sample.kinetic - 0.02).abs() < 1e-6);
        assert_eq!(sample.count, 2);
        assert_eq!(sample.particles, 900);
    }

    #[test]
    fn decode_of_empty_grid_is_zero() {
        let sample = MetricsSample::from_words(&[0; 8]);
        assert_eq!(sample, MetricsSample::default());
    }
}

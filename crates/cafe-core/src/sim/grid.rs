use bytemuck::{Pod, Zeroable};
use glam::{UVec3, Vec3};

use cafe_params::SimulationConfig;

use super::particles::Particle;

/// Derived per-cell quantities, laid out like the WGSL `Cell` struct
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GridCell {
    pub velocity: [f32; 3],
    pub density: f32,
    pub pressure: f32,
    pub cream_fraction: f32,
    pub _pad: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<GridCell>() == 32);

#[derive(Debug, Clone, Copy, Default)]
struct CellAccum {
    count: u32,
    cream: u32,
    mass: f32,
    momentum: Vec3,
}

/// Uniform fluid grid over the glass bounding box
pub struct FluidGrid {
    dims: UVec3,
    cell_size: f32,
    origin: Vec3,
    accum: Vec<CellAccum>,
    cells: Vec<GridCell>,
}

impl FluidGrid {
    pub fn new(config: &SimulationConfig) -> Self {
        let dims = UVec3::from_array(config.fluid.grid_dims);
        let count = (dims.x * dims.y * dims.z) as usize;
        Self {
            dims,
            cell_size: config.glass.cell_size(config.fluid.grid_dims),
            origin: Vec3::from_array(config.glass.bounds_min()),
            accum: vec![CellAccum::default(); count],
            cells: vec![GridCell::default(); count],
        }
    }

    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Integer cell coordinates of a position, clamped into the grid
    pub fn cell_coords(&self, position: Vec3) -> UVec3 {
        let rel = (position - self.origin) / self.cell_size;
        let max = self.dims.as_ivec3() - 1;
        rel.floor().as_ivec3().clamp(glam::IVec3::ZERO, max).as_uvec3()
    }

    pub fn index(&self, c: UVec3) -> usize {
        (c.x + self.dims.x * (c.y + self.dims.y * c.z)) as usize
    }

    pub fn cell_at(&self, position: Vec3) -> &GridCell {
        &self.cells[self.index(self.cell_coords(position))]
    }

    pub fn clear(&mut self) {
        self.accum.fill(CellAccum::default());
        self.cells.fill(GridCell::default());
    }

    /// Scatter particle counts and momentum into their cells
    pub fn bin(&mut self, particles: &[Particle]) {
        for p in particles {
            let idx = self.index(self.cell_coords(p.position()));
            let a = &mut self.accum[idx];
            a.count += 1;
            if p.is_cream() {
                a.cream += 1;
            }
            a.mass += p.mass;
            a.momentum += p.velocity() * p.mass;
        }
    }

    /// Derive density, pressure, velocity and cream fraction from the accumulators
    pub fn resolve(&mut self, rest_density: f32, stiffness: f32) {
        for (cell, a) in self.cells.iter_mut().zip(&self.accum) {
            let density = a.count as f32 / rest_density;
            let velocity = if a.mass > 0.0 { a.momentum / a.mass } else { Vec3::ZERO };
            *cell = GridCell {
                velocity: velocity.to_array(),
                density,
                pressure: stiffness * (density - 1.0).max(0.0),
                cream_fraction: if a.count > 0 { a.cream as f32 / a.count as f32 } else { 0.0 },
                _pad: [0.0; 2],
            };
        }
    }

    /// Central-difference pressure gradient with index-clamped neighbours
    pub fn pressure_gradient(&self, c: UVec3) -> Vec3 {
        let max = self.dims - 1;
        let p = |x: u32, y: u32, z: u32| self.cells[self.index(UVec3::new(x, y, z))].pressure;
        let inv = 1.0 / (2.0 * self.cell_size);
        Vec3::new(
            (p((c.x + 1).min(max.x), c.y, c.z) - p(c.x.saturating_sub(1), c.y, c.z)) * inv,
            (p(c.x, (c.y + 1).min(max.y), c.z) - p(c.x, c.y.saturating_sub(1), c.z)) * inv,
            (p(c.x, c.y, (c.z + 1).min(max.z)) - p(c.x, c.y, c.z.saturating_sub(1))) * inv,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::particles::ParticleKind;

    #[test]
    fn resolve_derives_cell_quantities() {
        let config = SimulationConfig::default();
        let mut grid = FluidGrid::new(&config);
        let pos = Vec3::new(0.01, 0.01, 0.01);
        let mut particles = Vec::new();
        for i in 0..12 {
            let kind = if i < 3 { ParticleKind::Cream } else { ParticleKind::Coffee };
            particles.push(Particle::new(pos, Vec3::new(1.0, 0.0, 0.0), kind));
        }
        grid.clear();
        grid.bin(&particles);
        grid.resolve(config.fluid.rest_density, config.fluid.stiffness);

        let cell = grid.cell_at(pos);
        assert_eq!(cell.density, 2.0);
        assert_eq!(cell.pressure, 4.0);
        assert_eq!(cell.cream_fraction, 0.25);
        assert_eq!(cell.velocity, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn out_of_range_positions_clamp_to_edge_cells() {
        let grid = FluidGrid::new(&SimulationConfig::default());
        let c = grid.cell_coords(Vec3::new(-10.0, 10.0, 0.0));
        assert_eq!(c.x, 0);
        assert_eq!(c.y, grid.dims().y - 1);
    }
}

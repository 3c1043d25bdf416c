//! CPU reference of the fluid step.
//!
//! Same passes as `fluid_sim.wgsl`: clear, bin, resolve, `substeps` particle updates,
//! then the copy into the render layout.

use glam::Vec3;

use cafe_params::{FluidKnobs, SimulationConfig};

use super::controls::{FluidControls, FrameInfo};
use super::grid::FluidGrid;
use super::noise::hash_noise3;
use super::particles::{Particle, ParticleSet, ParticleStats, PosVel};

/// Parameters for one sub-step of the particle update
#[derive(Debug, Clone, Copy)]
pub struct SubstepParams {
    pub h: f32,
    pub time: f32,
    pub noise_tick: u32,
    pub stir_strength: f32,
    pub stir_active: bool,
}

/// Advance one particle by one sub-step against the resolved grid
pub fn integrate_particle(
    p: &mut Particle,
    index: u32,
    grid: &FluidGrid,
    config: &SimulationConfig,
    knobs: &FluidKnobs,
    step: &SubstepParams,
) {
    let fluid = &config.fluid;
    let glass = &config.glass;
    let h = step.h;
    let mut pos = p.position();
    let mut vel = p.velocity();

    let coords = grid.cell_coords(pos);
    let cell = grid.cells()[grid.index(coords)];

    let mut acc = Vec3::new(0.0, fluid.gravity, 0.0);

    let is_cream = if p.is_cream() { 1.0 } else { 0.0 };
    acc.y += knobs.buoyancy * fluid.gravity.abs() * (is_cream - cell.cream_fraction);

    if step.stir_active {
        let s = step.stir_strength;
        let r = (pos.x * pos.x + pos.z * pos.z).sqrt();
        if r > 1e-4 {
            let tangent = Vec3::new(-pos.z, 0.0, pos.x) / r;
            let reach = r / glass.radius;
            acc += tangent * s * reach;
            acc.x -= pos.x / glass.radius * 0.15 * s;
            acc.z -= pos.z / glass.radius * 0.15 * s;
            acc.y += 0.25 * s * (3.0 * pos.z.atan2(pos.x) + 2.0 * step.time).sin() * reach;
        }
    }

    acc -= grid.pressure_gradient(coords) / cell.density.max(0.5);

    vel += acc * h;

    let blend = (knobs.viscosity * 10.0 * h).clamp(0.0, 1.0);
    vel = vel.lerp(Vec3::from_array(cell.velocity), blend);

    let n = Vec3::from_array(hash_noise3(index, step.noise_tick));
    vel += n * knobs.diffusion * h.sqrt() * 2.0;

    vel *= (1.0 - fluid.damping * h).max(0.0);
    let speed = vel.length();
    if speed > fluid.max_speed {
        vel *= fluid.max_speed / speed;
    }

    pos += vel * h;

    let limit = glass.radius - glass.particle_radius;
    let r = (pos.x * pos.x + pos.z * pos.z).sqrt();
    if r > limit {
        let normal = Vec3::new(pos.x / r, 0.0, pos.z / r);
        pos.x = normal.x * limit;
        pos.z = normal.z * limit;
        let vr = vel.dot(normal);
        if vr > 0.0 {
            vel -= normal * (1.0 + fluid.restitution) * vr;
        }
    }

    let floor = -0.5 * glass.height + glass.particle_radius;
    let ceiling = 0.5 * glass.height - glass.particle_radius;
    if pos.y < floor {
        pos.y = floor;
        if vel.y < 0.0 {
            vel.y = -vel.y * fluid.restitution;
        }
    } else if pos.y > ceiling {
        pos.y = ceiling;
        if vel.y > 0.0 {
            vel.y = -vel.y * fluid.restitution;
        }
    }

    p.position = pos.to_array();
    p.velocity = vel.to_array();
}

/// Fluid stepper running entirely on the CPU
pub struct FluidStepper {
    config: SimulationConfig,
    pub controls: FluidControls,
    particles: ParticleSet,
    grid: FluidGrid,
    posvel: Vec<PosVel>,
}

impl FluidStepper {
    pub fn new(config: &SimulationConfig) -> Self {
        Self::with_particles(config, ParticleSet::seed(config))
    }

    pub fn with_particles(config: &SimulationConfig, particles: ParticleSet) -> Self {
        let posvel = particles.particles.iter().map(PosVel::from).collect();
        Self {
            config: config.clone(),
            controls: FluidControls::new(config),
            particles,
            grid: FluidGrid::new(config),
            posvel,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles.particles
    }

    pub fn posvel(&self) -> &[PosVel] {
        &self.posvel
    }

    pub fn grid(&self) -> &FluidGrid {
        &self.grid
    }

    pub fn particle_count(&self) -> u32 {
        self.particles.len()
    }

    pub fn stats(&self) -> ParticleStats {
        self.particles.stats()
    }

    pub fn time(&self) -> f32 {
        self.controls.time()
    }

    pub fn reset(&mut self) {
        self.controls.reset();
        self.particles.reset();
        self.posvel = self.particles.particles.iter().map(PosVel::from).collect();
        log::info!("Simulation reset: {} particles", self.particles.len());
    }

    pub fn add_cream_burst(&mut self, count: u32) -> u32 {
        self.particles.add_cream_burst(count)
    }

    /// Advance by one frame of simulated time
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let frame = self.controls.begin_frame(dt, self.particles.room());
        if frame.pour_count > 0 {
            self.particles.emit_pour(frame.pour_count);
        }
        self.step_frame(&frame);
    }

    fn step_frame(&mut self, frame: &FrameInfo) {
        let fluid = &self.config.fluid;
        self.grid.clear();
        self.grid.bin(&self.particles.particles);
        self.grid.resolve(fluid.rest_density, fluid.stiffness);

        let substeps = fluid.substeps.max(1);
        let knobs = self.controls.knobs;
        for s in 0..substeps {
            let h = frame.dt / substeps as f32;
            let step = SubstepParams {
                h,
                time: frame.time + h * s as f32,
                noise_tick: frame.tick.wrapping_mul(substeps).wrapping_add(s),
                stir_strength: frame.stir_strength,
                stir_active: frame.stir_active,
            };
            for (i, p) in self.particles.particles.iter_mut().enumerate() {
                integrate_particle(p, i as u32, &self.grid, &self.config, &knobs, &step);
            }
        }

        self.posvel.clear();
        self.posvel.extend(self.particles.particles.iter().map(PosVel::from));
    }
}

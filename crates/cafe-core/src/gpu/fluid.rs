use wgpu::{BindGroup, Buffer, CommandEncoder, Device, Queue};

use cafe_params::{bindings, constants, FluidKnobs, SimUniforms, SimulationConfig, StepInfo};

use crate::error::GpuError;
use crate::gpu::layouts::Layouts;
use crate::gpu::pipelines::{workgroups_for, ComputePipelines};
use crate::gpu::readback::read_buffer_blocking;
use crate::sim::{FluidControls, GridCell, Particle, ParticleSet, PosVel};

/// Check the sub-step uniforms a frame of `dt` would produce, before any state advances
fn check_step(config: &SimulationConfig, knobs: &FluidKnobs, dt: f32, substeps: u32) -> Result<(), String> {
    let step = StepInfo {
        dt: dt / substeps.max(1) as f32,
        ..StepInfo::default()
    };
    bindings::validate_sim_uniforms(&SimUniforms::new(config, knobs, step))
}

/// Uniforms and bind group for one sub-step
struct SubstepBinding {
    uniforms: Buffer,
    bind_group: BindGroup,
}

/// Fluid simulation running as compute passes
///
/// The CPU-side `ParticleSet` only spawns particles: once uploaded, their state lives in
/// `particle_buffer` and is read back on demand.
pub struct GpuFluidSimulation {
    config: SimulationConfig,
    pub controls: FluidControls,
    spawner: ParticleSet,
    pub particle_buffer: Buffer,
    pub posvel_buffer: Buffer,
    accum_buffer: Buffer,
    cell_buffer: Buffer,
    substeps: Vec<SubstepBinding>,
}

impl GpuFluidSimulation {
    pub fn new(device: &Device, queue: &Queue, layouts: &Layouts, config: &SimulationConfig) -> Self {
        let capacity = config.particles.max as u64;
        let cell_count = config.fluid.grid_dims.iter().product::<u32>() as u64;

        let particle_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particles"),
            size: capacity * constants::PARTICLE_STRUCT_SIZE,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let posvel_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("posvel"),
            size: capacity * std::mem::size_of::<PosVel>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let accum_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grid_accum"),
            size: cell_count * bindings::ACCUM_WORDS as u64 * 4,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        let cell_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grid_cells"),
            size: cell_count * std::mem::size_of::<GridCell>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let substeps = (0..config.fluid.substeps.max(1))
            .map(|s| {
                let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("sim_params_{}", s)),
                    size: std::mem::size_of::<SimUniforms>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("sim_bg_{}", s)),
                    layout: &layouts.sim,
                    entries: &[
                        wgpu::BindGroupEntry { binding: 0, resource: particle_buffer.as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 1, resource: accum_buffer.as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 2, resource: cell_buffer.as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 3, resource: uniforms.as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 4, resource: posvel_buffer.as_entire_binding() },
                    ],
                });
                SubstepBinding { uniforms, bind_group }
            })
            .collect();

        let mut sim = Self {
            config: config.clone(),
            controls: FluidControls::new(config),
            spawner: ParticleSet::seed(config),
            particle_buffer,
            posvel_buffer,
            accum_buffer,
            cell_buffer,
            substeps,
        };
        sim.upload_from(queue, 0);
        log::info!(
            "GPU fluid: {} particles (capacity {}), grid {:?}, {} sub-steps, {:.1} MiB of buffers",
            sim.num_particles(),
            capacity,
            config.fluid.grid_dims,
            sim.substeps.len(),
            sim.buffer_bytes() as f64 / (1024.0 * 1024.0)
        );
        sim
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn num_particles(&self) -> u32 {
        self.spawner.len()
    }

    pub fn time(&self) -> f32 {
        self.controls.time()
    }

    /// Total size of the storage buffers owned by the simulation
    pub fn buffer_bytes(&self) -> u64 {
        self.particle_buffer.size()
            + self.posvel_buffer.size()
            + self.accum_buffer.size()
            + self.cell_buffer.size()
    }

    fn upload_from(&self, queue: &Queue, start: u32) {
        let new = &self.spawner.particles[start as usize..];
        if new.is_empty() {
            return;
        }
        queue.write_buffer(
            &self.particle_buffer,
            start as u64 * constants::PARTICLE_STRUCT_SIZE,
            bytemuck::cast_slice(new),
        );
        // Spawned particles are drawable before the next copy pass
        let posvel: Vec<PosVel> = new.iter().map(PosVel::from).collect();
        queue.write_buffer(
            &self.posvel_buffer,
            start as u64 * std::mem::size_of::<PosVel>() as u64,
            bytemuck::cast_slice(&posvel),
        );
    }

    pub fn reset(&mut self, queue: &Queue) {
        self.controls.reset();
        self.spawner.reset();
        self.upload_from(queue, 0);
        log::info!("Simulation reset: {} particles", self.num_particles());
    }

    pub fn add_cream_burst(&mut self, queue: &Queue, count: u32) -> u32 {
        let start = self.spawner.len();
        let added = self.spawner.add_cream_burst(count);
        self.upload_from(queue, start);
        added
    }

    /// Encode one frame of the fluid step. Uniform writes land before the encoder is submitted.
    pub fn encode_step(&mut self, queue: &Queue, encoder: &mut CommandEncoder, pipelines: &ComputePipelines, dt: f32) {
        let substeps = self.substeps.len() as u32;
        if let Err(e) = check_step(&self.config, &self.controls.knobs, dt, substeps) {
            if dt > 0.0 {
                log::error!("Skipping fluid step: {}", e);
            }
            return;
        }
        let frame = self.controls.begin_frame(dt, self.spawner.room());
        if frame.pour_count > 0 {
            let start = self.spawner.len();
            self.spawner.emit_pour(frame.pour_count);
            self.upload_from(queue, start);
        }

        let n = self.num_particles();
        let h = dt / substeps as f32;
        for (s, binding) in self.substeps.iter().enumerate() {
            let step = StepInfo {
                dt: h,
                time: frame.time + h * s as f32,
                tick: frame.tick.wrapping_mul(substeps).wrapping_add(s as u32),
                num_particles: n,
                stir_strength: frame.stir_strength,
                stir_active: frame.stir_active,
            };
            let uniforms = SimUniforms::new(&self.config, &self.controls.knobs, step);
            queue.write_buffer(&binding.uniforms, 0, bytemuck::bytes_of(&uniforms));
        }

        let cell_groups = workgroups_for(self.config.fluid.grid_dims.iter().product());
        let particle_groups = workgroups_for(n);
        log::debug!("Fluid dispatch: {} cell groups, {} particle groups", cell_groups, particle_groups);

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("fluid_step"),
            timestamp_writes: None,
        });
        let first = &self.substeps[0].bind_group;

        pass.set_pipeline(&pipelines.clear_grid);
        pass.set_bind_group(0, first, &[]);
        pass.dispatch_workgroups(cell_groups, 1, 1);

        pass.set_pipeline(&pipelines.bin_particles);
        pass.dispatch_workgroups(particle_groups, 1, 1);

        pass.set_pipeline(&pipelines.resolve_grid);
        pass.dispatch_workgroups(cell_groups, 1, 1);

        pass.set_pipeline(&pipelines.simulate);
        for binding in &self.substeps {
            pass.set_bind_group(0, &binding.bind_group, &[]);
            pass.dispatch_workgroups(particle_groups, 1, 1);
        }

        pass.set_pipeline(&pipelines.copy_position);
        pass.set_bind_group(0, first, &[]);
        pass.dispatch_workgroups(particle_groups, 1, 1);
    }

    /// Read the live particle state back to the CPU
    pub fn read_particles(&self, device: &Device, queue: &Queue) -> Result<Vec<Particle>, GpuError> {
        read_buffer_blocking(
            device,
            queue,
            &self.particle_buffer,
            self.num_particles() as u64 * constants::PARTICLE_STRUCT_SIZE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_check_accepts_a_normal_frame() {
        let config = SimulationConfig::default();
        let knobs = FluidControls::new(&config).knobs;
        assert_eq!(check_step(&config, &knobs, 1.0 / 60.0, 2), Ok(()));
    }

    #[test]
    fn step_check_rejects_empty_frames() {
        let config = SimulationConfig::default();
        let knobs = FluidControls::new(&config).knobs;
        assert!(check_step(&config, &knobs, 0.0, 2).is_err());
        assert!(check_step(&config, &knobs, -0.01, 2).is_err());
        assert!(check_step(&config, &knobs, f32::NAN, 2).is_err());
    }
}

use wgpu::{BindGroup, Buffer, CommandEncoder, Device, Queue};

use cafe_params::{bindings, constants, MetricsUniforms, SimulationConfig};

use crate::error::GpuError;
use crate::gpu::layouts::Layouts;
use crate::gpu::pipelines::{workgroups_for, ComputePipelines};
use crate::gpu::readback::{ReadyState, StagingBuffer};
use crate::sim::MetricsSample;

const METRICS_BYTES: u64 = (constants::METRICS_WORDS * 4) as u64;

/// Tags each read with the reset generation it was encoded in
#[derive(Debug, Default, Clone, Copy)]
struct ReadGeneration {
    current: u32,
    encoded: u32,
}

impl ReadGeneration {
    fn mark_encoded(&mut self) {
        self.encoded = self.current;
    }

    fn invalidate(&mut self) {
        self.current = self.current.wrapping_add(1);
    }

    fn is_stale(&self) -> bool {
        self.encoded != self.current
    }
}

/// Mixing metrics reduced on the GPU and read back asynchronously
///
/// At most one read is in flight: `encode` refuses while a previous read has not completed.
pub struct GpuMetrics {
    config: SimulationConfig,
    cell_count: u32,
    counts_buffer: Buffer,
    metrics_buffer: Buffer,
    uniform_buffer: Buffer,
    bind_group: BindGroup,
    staging: StagingBuffer,
    encoded: bool,
    generation: ReadGeneration,
}

impl GpuMetrics {
    pub fn new(device: &Device, layouts: &Layouts, config: &SimulationConfig, particle_buffer: &Buffer) -> Self {
        let g = config.metrics.grid_size;
        let cell_count = g * g * g;

        let counts_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("metrics_counts"),
            size: cell_count as u64 * (constants::METRICS_CELL_WORDS * 4) as u64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        let metrics_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("metrics_accum"),
            size: METRICS_BYTES,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("metrics_params"),
            size: std::mem::size_of::<MetricsUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("metrics_bg"),
            layout: &layouts.metrics,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: particle_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: counts_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: metrics_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: uniform_buffer.as_entire_binding() },
            ],
        });

        Self {
            config: config.clone(),
            cell_count,
            counts_buffer,
            metrics_buffer,
            uniform_buffer,
            bind_group,
            staging: StagingBuffer::new(device, "metrics_staging", METRICS_BYTES),
            encoded: false,
            generation: ReadGeneration::default(),
        }
    }

    /// A read has been encoded or is still mapping
    pub fn in_flight(&self) -> bool {
        self.encoded || self.staging.is_mapping()
    }

    /// Encode the reduction and the copy into the staging buffer.
    ///
    /// Returns false without encoding anything when a read is already in flight.
    pub fn encode(&mut self, queue: &Queue, encoder: &mut CommandEncoder, pipelines: &ComputePipelines, num_particles: u32) -> bool {
        if self.in_flight() {
            return false;
        }

        let uniforms = MetricsUniforms::new(&self.config, num_particles);
        if let Err(e) = bindings::validate_metrics_uniforms(&uniforms, num_particles) {
            log::error!("Skipping metrics read: {}", e);
            return false;
        }
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("metrics"),
                timestamp_writes: None,
            });
            pass.set_bind_group(0, &self.bind_group, &[]);

            pass.set_pipeline(&pipelines.clear_metrics);
            pass.dispatch_workgroups(workgroups_for(self.cell_count.max(constants::METRICS_WORDS as u32)), 1, 1);

            pass.set_pipeline(&pipelines.bin_metrics);
            pass.dispatch_workgroups(workgroups_for(num_particles), 1, 1);

            pass.set_pipeline(&pipelines.reduce_cells);
            pass.dispatch_workgroups(workgroups_for(self.cell_count), 1, 1);
        }

        self.staging.copy_from(encoder, &self.metrics_buffer, METRICS_BYTES);
        self.encoded = true;
        self.generation.mark_encoded();
        true
    }

    /// Start mapping the staging buffer. Call once the encoder from `encode` was submitted.
    pub fn begin_read(&mut self) {
        if self.encoded {
            self.encoded = false;
            self.staging.start_map();
        }
    }

    /// Drop whatever read is in flight; its sample describes particles that no longer exist
    pub fn discard_pending(&mut self) {
        self.generation.invalidate();
    }

    /// Poll the pending read. The latch is released on success and on failure.
    pub fn poll(&mut self) -> Option<Result<MetricsSample, GpuError>> {
        match self.staging.check_ready() {
            ReadyState::Ready => {
                let words: Vec<u32> = self.staging.read(METRICS_BYTES);
                if self.generation.is_stale() {
                    log::debug!("Dropping metrics read from before a reset");
                    return None;
                }
                Some(Ok(MetricsSample::from_words(&words)))
            }
            ReadyState::Failed(msg) => Some(Err(GpuError::BufferMapping(msg))),
            ReadyState::Idle | ReadyState::Pending => None,
        }
    }

    /// Block until the pending read completes
    pub fn wait(&mut self, device: &Device) -> Option<Result<MetricsSample, GpuError>> {
        if !self.staging.is_mapping() {
            return None;
        }
        device.poll(wgpu::Maintain::Wait);
        self.poll()
    }

    pub fn counts_bytes(&self) -> u64 {
        self.counts_buffer.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_encoded_before_a_reset_are_stale() {
        let mut generation = ReadGeneration::default();
        generation.mark_encoded();
        assert!(!generation.is_stale());

        generation.invalidate();
        assert!(generation.is_stale());

        generation.mark_encoded();
        assert!(!generation.is_stale());
    }

    #[test]
    fn reset_without_a_read_keeps_the_next_one() {
        let mut generation = ReadGeneration::default();
        generation.invalidate();
        generation.invalidate();
        generation.mark_encoded();
        assert!(!generation.is_stale());
    }
}

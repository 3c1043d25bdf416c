use wgpu::{BindGroupLayout, ComputePipeline, Device, ShaderModule};

use crate::gpu::layouts::Layouts;
use crate::shaders;

/// Compute pipelines for the fluid step and the metrics reduction
pub struct ComputePipelines {
    pub clear_grid: ComputePipeline,
    pub bin_particles: ComputePipeline,
    pub resolve_grid: ComputePipeline,
    pub simulate: ComputePipeline,
    pub copy_position: ComputePipeline,

    pub clear_metrics: ComputePipeline,
    pub bin_metrics: ComputePipeline,
    pub reduce_cells: ComputePipeline,
}

impl ComputePipelines {
    /// Create all compute pipelines
    pub fn new(device: &Device, layouts: &Layouts) -> Self {
        let sim_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fluid_sim_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::fluid_sim().into()),
        });
        let metrics_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("metrics_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::metrics().into()),
        });

        let sim = |entry: &str| Self::create_pipeline(device, &layouts.sim, &sim_shader, entry);
        let metrics = |entry: &str| Self::create_pipeline(device, &layouts.metrics, &metrics_shader, entry);

        Self {
            clear_grid: sim("clear_grid"),
            bin_particles: sim("bin_particles"),
            resolve_grid: sim("resolve_grid"),
            simulate: sim("simulate"),
            copy_position: sim("copy_position"),
            clear_metrics: metrics("clear_metrics"),
            bin_metrics: metrics("bin_metrics"),
            reduce_cells: metrics("reduce_cells"),
        }
    }

    fn create_pipeline(
        device: &Device,
        bgl: &BindGroupLayout,
        module: &ShaderModule,
        entry_point: &str,
    ) -> ComputePipeline {
        let pl = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{}_pl", entry_point)),
            bind_group_layouts: &[bgl],
            push_constant_ranges: &[],
        });

        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{}_pipeline", entry_point)),
            layout: Some(&pl),
            module,
            entry_point,
        })
    }
}

/// Workgroups needed to cover `count` invocations
pub fn workgroups_for(count: u32) -> u32 {
    count.div_ceil(cafe_params::constants::WORKGROUP_SIZE).max(1)
}

use wgpu::{BindGroupLayout, Device};

/// Centralized registry that owns all compute bind group layouts
///
/// Every entry point of a shader module shares its module's layout, so pipelines and
/// bind groups borrow these by reference.
pub struct Layouts {
    /// Fluid step layout (particles, accumulators, cells, params, render copy)
    pub sim: BindGroupLayout,

    /// Metrics layout (particles, cell counters, accumulator, params)
    pub metrics: BindGroupLayout,
}

impl Layouts {
    /// Create all bind group layouts once
    pub fn new(device: &Device) -> Self {
        Self {
            sim: Self::create_sim_layout(device),
            metrics: Self::create_metrics_layout(device),
        }
    }

    fn create_sim_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sim_bgl"),
            entries: &[
                // @binding(0) particles storage buffer (read_write)
                storage_entry(0, false),
                // @binding(1) atomic grid accumulators
                storage_entry(1, false),
                // @binding(2) resolved cells
                storage_entry(2, false),
                // @binding(3) SimParams uniform buffer
                uniform_entry(3),
                // @binding(4) render copy (PosVel)
                storage_entry(4, false),
            ],
        })
    }

    fn create_metrics_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("metrics_bgl"),
            entries: &[
                // @binding(0) particles storage buffer (read-only)
                storage_entry(0, true),
                // @binding(1) per-cell counters
                storage_entry(1, false),
                // @binding(2) metrics accumulator
                storage_entry(2, false),
                // @binding(3) MetricsParams uniform buffer
                uniform_entry(3),
            ],
        })
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

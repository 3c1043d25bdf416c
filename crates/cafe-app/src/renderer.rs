//! Screen-space fluid renderer for the coffee and cream particles
//!
//! Passes per frame: depth map, colour map, colour blur (X, Y), four bilateral depth
//! filter iterations (X, Y), composite into the swapchain, then the glass overlay.
//! Every size-dependent resource is owned here, so a resize rebuilds the whole renderer.

use bytemuck::{Pod, Zeroable};
use wgpu::{BindGroup, BindGroupLayout, Buffer, CommandEncoder, Device, Queue, RenderPipeline, TextureView};

use cafe_core::{create_buffer_with_data, FilterUniforms, GlassConfig, RenderUniforms};

const DEPTH_MAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;
const COLOR_MAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_TEST_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Depth stored for pixels no particle covers
const EMPTY_DEPTH: f64 = 1e4;
const FILTER_ITERATIONS: usize = 4;
const GLASS_SEGMENTS: u32 = 64;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct GlassUniforms {
    radius: f32,
    height: f32,
    _pad: [f32; 2],
}

/// Per-direction resources for the separable passes
struct DirectionalBindGroups {
    x: BindGroup,
    y: BindGroup,
}

pub struct FluidRenderer {
    width: u32,
    height: u32,

    depth_map_pipeline: RenderPipeline,
    color_map_pipeline: RenderPipeline,
    color_blur_pipeline: RenderPipeline,
    depth_filter_pipeline: RenderPipeline,
    fluid_pipeline: RenderPipeline,
    glass_pipeline: RenderPipeline,

    depth_map_view: TextureView,
    tmp_depth_map_view: TextureView,
    color_map_view: TextureView,
    tmp_color_blur_view: TextureView,
    color_blur_view: TextureView,
    depth_test_view: TextureView,

    render_uniform_buffer: Buffer,
    particle_bind_group: BindGroup,
    color_blur_bind_groups: DirectionalBindGroups,
    depth_filter_bind_groups: DirectionalBindGroups,
    fluid_bind_group: BindGroup,
    glass_bind_group: BindGroup,
}

fn layout_entry(binding: u32, visibility: wgpu::ShaderStages, ty: wgpu::BindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty,
        count: None,
    }
}

fn uniform_binding() -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: false,
        min_binding_size: None,
    }
}

fn texture_binding(filterable: bool) -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Float { filterable },
        view_dimension: wgpu::TextureViewDimension::D2,
        multisampled: false,
    }
}

fn create_target(device: &Device, label: &str, width: u32, height: u32, format: wgpu::TextureFormat) -> TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

struct PipelineSpec<'a> {
    label: &'a str,
    source: &'a str,
    layout: &'a BindGroupLayout,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth: Option<wgpu::DepthStencilState>,
}

fn create_pipeline(device: &Device, spec: PipelineSpec<'_>) -> RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(spec.label),
        source: wgpu::ShaderSource::Wgsl(spec.source.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(spec.label),
        bind_group_layouts: &[spec.layout],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: spec.format,
                blend: spec.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: spec.depth,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

fn depth_state(write: bool) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_TEST_FORMAT,
        depth_write_enabled: write,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

fn clear_depth_value() -> wgpu::Color {
    wgpu::Color {
        r: EMPTY_DEPTH,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    }
}

impl FluidRenderer {
    pub fn new(
        device: &Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        posvel_buffer: &Buffer,
        glass: &GlassConfig,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let fragment = wgpu::ShaderStages::FRAGMENT;
        let both = wgpu::ShaderStages::VERTEX_FRAGMENT;

        // Layouts
        let particle_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("particle_render_layout"),
            entries: &[
                layout_entry(
                    0,
                    wgpu::ShaderStages::VERTEX,
                    wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                ),
                layout_entry(1, both, uniform_binding()),
            ],
        });
        let color_blur_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("color_blur_layout"),
            entries: &[
                layout_entry(0, fragment, texture_binding(true)),
                layout_entry(1, fragment, wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)),
                layout_entry(2, fragment, uniform_binding()),
            ],
        });
        let depth_filter_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("depth_filter_layout"),
            entries: &[
                layout_entry(0, fragment, texture_binding(false)),
                layout_entry(1, fragment, uniform_binding()),
            ],
        });
        let fluid_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fluid_layout"),
            entries: &[
                layout_entry(0, fragment, texture_binding(false)),
                layout_entry(1, fragment, uniform_binding()),
                layout_entry(2, fragment, texture_binding(false)),
            ],
        });
        let glass_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glass_layout"),
            entries: &[layout_entry(0, both, uniform_binding()), layout_entry(1, both, uniform_binding())],
        });

        // Pipelines
        let depth_map_pipeline = create_pipeline(
            device,
            PipelineSpec {
                label: "depth_map",
                source: include_str!("../shaders/depth_map.wgsl"),
                layout: &particle_layout,
                format: DEPTH_MAP_FORMAT,
                blend: None,
                depth: Some(depth_state(true)),
            },
        );
        let color_map_pipeline = create_pipeline(
            device,
            PipelineSpec {
                label: "color_map",
                source: include_str!("../shaders/color_map.wgsl"),
                layout: &particle_layout,
                format: COLOR_MAP_FORMAT,
                blend: Some(alpha_blend()),
                depth: Some(depth_state(true)),
            },
        );
        let color_blur_pipeline = create_pipeline(
            device,
            PipelineSpec {
                label: "color_blur",
                source: include_str!("../shaders/color_blur.wgsl"),
                layout: &color_blur_layout,
                format: COLOR_MAP_FORMAT,
                blend: None,
                depth: None,
            },
        );
        let depth_filter_pipeline = create_pipeline(
            device,
            PipelineSpec {
                label: "bilateral_filter",
                source: include_str!("../shaders/bilateral.wgsl"),
                layout: &depth_filter_layout,
                format: DEPTH_MAP_FORMAT,
                blend: None,
                depth: None,
            },
        );
        let fluid_pipeline = create_pipeline(
            device,
            PipelineSpec {
                label: "fluid_composite",
                source: include_str!("../shaders/fluid.wgsl"),
                layout: &fluid_layout,
                format: surface_format,
                blend: None,
                depth: None,
            },
        );
        let glass_pipeline = create_pipeline(
            device,
            PipelineSpec {
                label: "glass",
                source: include_str!("../shaders/glass.wgsl"),
                layout: &glass_layout,
                format: surface_format,
                blend: Some(alpha_blend()),
                depth: Some(depth_state(false)),
            },
        );

        // Textures
        let depth_map_view = create_target(device, "depth_map", width, height, DEPTH_MAP_FORMAT);
        let tmp_depth_map_view = create_target(device, "tmp_depth_map", width, height, DEPTH_MAP_FORMAT);
        let color_map_view = create_target(device, "color_map", width, height, COLOR_MAP_FORMAT);
        let tmp_color_blur_view = create_target(device, "tmp_color_blur", width, height, COLOR_MAP_FORMAT);
        let color_blur_view = create_target(device, "color_blur", width, height, COLOR_MAP_FORMAT);
        let depth_test_view = create_target(device, "depth_test", width, height, DEPTH_TEST_FORMAT);

        // Buffers
        let render_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("render_uniforms"),
            size: std::mem::size_of::<RenderUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let glass_uniforms = GlassUniforms {
            radius: glass.radius,
            height: glass.height,
            _pad: [0.0; 2],
        };
        let glass_buffer =
            create_buffer_with_data(device, "glass_uniforms", wgpu::BufferUsages::UNIFORM, &[glass_uniforms]);
        let filter_x = FilterUniforms::new([1.0, 0.0], glass.particle_radius, width, height);
        let filter_y = FilterUniforms::new([0.0, 1.0], glass.particle_radius, width, height);
        let filter_x_buffer = create_buffer_with_data(device, "filter_x", wgpu::BufferUsages::UNIFORM, &[filter_x]);
        let filter_y_buffer = create_buffer_with_data(device, "filter_y", wgpu::BufferUsages::UNIFORM, &[filter_y]);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("color_blur_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Bind groups
        let particle_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("particle_render_bg"),
            layout: &particle_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: posvel_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: render_uniform_buffer.as_entire_binding() },
            ],
        });

        let color_blur_group = |label: &str, source: &TextureView, filter: &Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &color_blur_layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(source) },
                    wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&sampler) },
                    wgpu::BindGroupEntry { binding: 2, resource: filter.as_entire_binding() },
                ],
            })
        };
        let color_blur_bind_groups = DirectionalBindGroups {
            x: color_blur_group("color_blur_x_bg", &color_map_view, &filter_x_buffer),
            y: color_blur_group("color_blur_y_bg", &tmp_color_blur_view, &filter_y_buffer),
        };

        let depth_filter_group = |label: &str, source: &TextureView, filter: &Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &depth_filter_layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(source) },
                    wgpu::BindGroupEntry { binding: 1, resource: filter.as_entire_binding() },
                ],
            })
        };
        let depth_filter_bind_groups = DirectionalBindGroups {
            x: depth_filter_group("depth_filter_x_bg", &depth_map_view, &filter_x_buffer),
            y: depth_filter_group("depth_filter_y_bg", &tmp_depth_map_view, &filter_y_buffer),
        };

        let fluid_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fluid_bg"),
            layout: &fluid_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&depth_map_view) },
                wgpu::BindGroupEntry { binding: 1, resource: render_uniform_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::TextureView(&color_blur_view) },
            ],
        });
        let glass_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("glass_bg"),
            layout: &glass_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: render_uniform_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: glass_buffer.as_entire_binding() },
            ],
        });

        log::debug!("Fluid renderer built for {}x{}", width, height);

        Self {
            width,
            height,
            depth_map_pipeline,
            color_map_pipeline,
            color_blur_pipeline,
            depth_filter_pipeline,
            fluid_pipeline,
            glass_pipeline,
            depth_map_view,
            tmp_depth_map_view,
            color_map_view,
            tmp_color_blur_view,
            color_blur_view,
            depth_test_view,
            render_uniform_buffer,
            particle_bind_group,
            color_blur_bind_groups,
            depth_filter_bind_groups,
            fluid_bind_group,
            glass_bind_group,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn write_uniforms(&self, queue: &Queue, uniforms: &RenderUniforms) {
        queue.write_buffer(&self.render_uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Encode every render pass into `target`
    pub fn encode(&self, encoder: &mut CommandEncoder, target: &TextureView, num_particles: u32) {
        // 1. Depth map
        {
            let mut pass = self.begin_pass(encoder, "depth_map", &self.depth_map_view, Some(clear_depth_value()), true);
            pass.set_pipeline(&self.depth_map_pipeline);
            pass.set_bind_group(0, &self.particle_bind_group, &[]);
            pass.draw(0..6, 0..num_particles);
        }

        // 2. Colour map
        {
            let mut pass = self.begin_pass(encoder, "color_map", &self.color_map_view, Some(wgpu::Color::TRANSPARENT), true);
            pass.set_pipeline(&self.color_map_pipeline);
            pass.set_bind_group(0, &self.particle_bind_group, &[]);
            pass.draw(0..6, 0..num_particles);
        }

        // 3. Colour blur
        self.fullscreen(
            encoder,
            "color_blur_x",
            &self.tmp_color_blur_view,
            wgpu::Color::TRANSPARENT,
            &self.color_blur_pipeline,
            &self.color_blur_bind_groups.x,
        );
        self.fullscreen(
            encoder,
            "color_blur_y",
            &self.color_blur_view,
            wgpu::Color::TRANSPARENT,
            &self.color_blur_pipeline,
            &self.color_blur_bind_groups.y,
        );

        // 4. Bilateral depth filter, ping-ponging through the temp map
        for _ in 0..FILTER_ITERATIONS {
            self.fullscreen(
                encoder,
                "depth_filter_x",
                &self.tmp_depth_map_view,
                clear_depth_value(),
                &self.depth_filter_pipeline,
                &self.depth_filter_bind_groups.x,
            );
            self.fullscreen(
                encoder,
                "depth_filter_y",
                &self.depth_map_view,
                clear_depth_value(),
                &self.depth_filter_pipeline,
                &self.depth_filter_bind_groups.y,
            );
        }

        // 5. Composite
        self.fullscreen(encoder, "fluid_composite", target, wgpu::Color::BLACK, &self.fluid_pipeline, &self.fluid_bind_group);

        // 6. Glass, tested against the particle depth from the colour pass
        {
            let mut pass = self.begin_pass(encoder, "glass", target, None, false);
            pass.set_pipeline(&self.glass_pipeline);
            pass.set_bind_group(0, &self.glass_bind_group, &[]);
            pass.draw(0..6 * GLASS_SEGMENTS, 0..1);
        }
    }

    /// Render pass with the shared depth-test attachment.
    ///
    /// `clear` of None loads the colour target; `clear_depth` false loads the depth buffer.
    fn begin_pass<'a>(
        &'a self,
        encoder: &'a mut CommandEncoder,
        label: &'a str,
        view: &'a TextureView,
        clear: Option<wgpu::Color>,
        clear_depth: bool,
    ) -> wgpu::RenderPass<'a> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_test_view,
                depth_ops: Some(wgpu::Operations {
                    load: if clear_depth { wgpu::LoadOp::Clear(1.0) } else { wgpu::LoadOp::Load },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }

    fn fullscreen(
        &self,
        encoder: &mut CommandEncoder,
        label: &str,
        view: &TextureView,
        clear: wgpu::Color,
        pipeline: &RenderPipeline,
        bind_group: &BindGroup,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..6, 0..1);
    }
}

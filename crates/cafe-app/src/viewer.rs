//! Interactive viewer for the entropy café glass

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use wgpu::{Device, Instance, Queue, RequestAdapterOptions, Surface, SurfaceConfiguration};
use winit::{
    dpi::{LogicalSize, PhysicalPosition, PhysicalSize},
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowBuilder},
};

use cafe_core::gpu::{compute_limits, ComputePipelines, GpuFluidSimulation, GpuMetrics, Layouts};
use cafe_core::sim::{MetricsHistory, MetricsSample};
use cafe_core::{bindings, GpuError, SimulationConfig};

use crate::camera::OrbitCamera;
use crate::renderer::FluidRenderer;

const KNOB_STEP: f32 = 0.05;
const SPEED_STEP: f32 = 0.1;
/// Print the HUD every this many metrics samples
const HUD_EVERY: usize = 10;

/// Central GPU context that owns the device and the swapchain
pub struct GpuContext {
    pub device: Device,
    pub queue: Queue,
    pub surface: Surface<'static>,
    pub config: SurfaceConfiguration,
}

/// Main viewer state
pub struct Viewer {
    window: Arc<Window>,
    sim_config: SimulationConfig,

    pipelines: ComputePipelines,
    sim: GpuFluidSimulation,
    metrics: GpuMetrics,
    renderer: FluidRenderer,

    camera: OrbitCamera,
    history: MetricsHistory,
    last_sample: Option<MetricsSample>,
    samples_read: usize,

    last_frame_time: Instant,
    frame_count: u64,

    dragging: bool,
    cursor: Option<PhysicalPosition<f64>>,
}

impl Viewer {
    pub fn new(window: Arc<Window>, gpu: &GpuContext, sim_config: SimulationConfig) -> Self {
        let layouts = Layouts::new(&gpu.device);
        let pipelines = ComputePipelines::new(&gpu.device, &layouts);
        let sim = GpuFluidSimulation::new(&gpu.device, &gpu.queue, &layouts, &sim_config);
        let metrics = GpuMetrics::new(&gpu.device, &layouts, &sim_config, &sim.particle_buffer);
        let renderer = FluidRenderer::new(
            &gpu.device,
            gpu.config.format,
            gpu.config.width,
            gpu.config.height,
            &sim.posvel_buffer,
            &sim_config.glass,
        );
        let history = MetricsHistory::new(sim_config.metrics.history);

        Self {
            window,
            sim_config,
            pipelines,
            sim,
            metrics,
            renderer,
            camera: OrbitCamera::default(),
            history,
            last_sample: None,
            samples_read: 0,
            last_frame_time: Instant::now(),
            frame_count: 0,
            dragging: false,
            cursor: None,
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn resize(&mut self, gpu: &mut GpuContext, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            gpu.config.width = new_size.width;
            gpu.config.height = new_size.height;
            gpu.surface.configure(&gpu.device, &gpu.config);

            // Screen-sized targets and filter constants depend on the size
            self.renderer = FluidRenderer::new(
                &gpu.device,
                gpu.config.format,
                new_size.width,
                new_size.height,
                &self.sim.posvel_buffer,
                &self.sim_config.glass,
            );
        }
    }

    /// Step the simulation, render one frame and collect any finished metrics read
    pub fn frame(&mut self, gpu: &GpuContext) -> Result<(), wgpu::SurfaceError> {
        let now = Instant::now();
        let raw_dt = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;
        let dt = self.sim.controls.frame_dt(raw_dt);

        let output = gpu.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });

        self.sim.encode_step(&gpu.queue, &mut encoder, &self.pipelines, dt);

        let (stir_strength, stir_active) = self.sim.controls.effective_stir();
        let (width, height) = self.renderer.size();
        let uniforms = self.camera.render_uniforms(
            width,
            height,
            self.sim_config.glass.particle_radius,
            self.sim.time(),
            if stir_active { stir_strength } else { 0.0 },
        );
        self.renderer.write_uniforms(&gpu.queue, &uniforms);

        let interval = self.sim_config.metrics.interval.max(1) as u64;
        let wants_metrics = !self.sim.controls.knobs.paused && self.frame_count % interval == 0;
        let metrics_encoded = wants_metrics
            && self.metrics.encode(&gpu.queue, &mut encoder, &self.pipelines, self.sim.num_particles());

        self.renderer.encode(&mut encoder, &view, self.sim.num_particles());

        gpu.queue.submit(Some(encoder.finish()));
        if metrics_encoded {
            self.metrics.begin_read();
        }
        output.present();
        self.frame_count += 1;

        gpu.device.poll(wgpu::Maintain::Poll);
        match self.metrics.poll() {
            Some(Ok(sample)) => self.record_metrics(sample),
            Some(Err(e)) => log::warn!("Metrics read failed: {}", e),
            None => {}
        }

        Ok(())
    }

    fn record_metrics(&mut self, sample: MetricsSample) {
        let shaped = self.history.push(&sample);
        self.last_sample = Some(sample);
        self.samples_read += 1;
        self.window.set_title(&format!(
            "Entropy Café | H {:.2}  mix {:.2}  cx {:.2}  ke {:.2} | {} particles",
            shaped.entropy,
            shaped.mixedness,
            shaped.complexity,
            shaped.kinetic,
            self.sim.num_particles()
        ));

        if self.samples_read % HUD_EVERY == 0 {
            self.print_hud();
        }
    }

    fn print_hud(&self) {
        let knobs = &self.sim.controls.knobs;
        println!("=== HUD (t = {:.1}s, frame {}) ===", self.sim.time(), self.frame_count);
        println!("Particles: {}", self.sim.num_particles());
        if let Some(sample) = &self.last_sample {
            println!(
                "Raw: H={:.3} mix={:.3} cx={:.3} ke={:.3} over {} cells",
                sample.entropy, sample.mixedness, sample.complexity, sample.kinetic, sample.count
            );
        }
        println!("Entropy    {}", self.history.sparkline(|d| d.entropy, 60));
        println!("Mixedness  {}", self.history.sparkline(|d| d.mixedness, 60));
        println!("Complexity {}", self.history.sparkline(|d| d.complexity, 60));
        println!("Kinetic    {}", self.history.sparkline(|d| d.kinetic, 60));
        println!(
            "Viscosity {:.2}  Diffusion {:.2}  Buoyancy {:.2}  Speed {:.1}x  Stir {}  Pour {}{}",
            knobs.viscosity,
            knobs.diffusion,
            knobs.buoyancy,
            knobs.speed,
            if knobs.stirring { "on" } else { "off" },
            if knobs.pouring { "on" } else { "off" },
            if knobs.paused { "  [paused]" } else { "" }
        );
        println!("==================");
    }

    /// Handle a key press for the simulation controls
    pub fn handle_key(&mut self, gpu: &GpuContext, key: &Key) {
        let controls = &mut self.sim.controls;
        match key {
            Key::Named(NamedKey::Space) => {
                let paused = !controls.knobs.paused;
                controls.set_paused(paused);
                log::info!("Paused: {}", paused);
            }
            Key::Character(c) => match c.to_lowercase().as_str() {
                "c" => {
                    let added = self.sim.add_cream_burst(&gpu.queue, self.sim_config.particles.burst_size);
                    log::info!("Cream burst: {} particles ({} total)", added, self.sim.num_particles());
                }
                "s" => {
                    let stirring = !controls.knobs.stirring;
                    controls.set_stirring(stirring);
                    log::info!("Stirring: {}", stirring);
                }
                "o" => {
                    controls.stir_once();
                    log::info!("Stir once");
                }
                "p" => {
                    let pouring = !controls.knobs.pouring;
                    controls.set_pouring(pouring);
                    log::info!("Pouring: {}", pouring);
                }
                "r" => {
                    self.sim.reset(&gpu.queue);
                    self.metrics.discard_pending();
                    self.history.clear();
                    self.last_sample = None;
                }
                "+" | "=" => {
                    controls.set_speed(controls.knobs.speed + SPEED_STEP);
                    log::info!("Speed: {:.1}x", controls.knobs.speed);
                }
                "-" => {
                    controls.set_speed(controls.knobs.speed - SPEED_STEP);
                    log::info!("Speed: {:.1}x", controls.knobs.speed);
                }
                "v" => controls.set_viscosity(controls.knobs.viscosity + KNOB_STEP),
                "b" => controls.set_viscosity(controls.knobs.viscosity - KNOB_STEP),
                "d" => controls.set_diffusion(controls.knobs.diffusion + KNOB_STEP),
                "f" => controls.set_diffusion(controls.knobs.diffusion - KNOB_STEP),
                "u" => controls.set_buoyancy(controls.knobs.buoyancy + KNOB_STEP),
                "j" => controls.set_buoyancy(controls.knobs.buoyancy - KNOB_STEP),
                _ => {}
            },
            _ => {}
        }
    }

    pub fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Left {
            self.dragging = state == ElementState::Pressed;
        }
    }

    pub fn handle_cursor(&mut self, position: PhysicalPosition<f64>) {
        if let (true, Some(last)) = (self.dragging, self.cursor) {
            self.camera.drag((position.x - last.x) as f32, (position.y - last.y) as f32);
        }
        self.cursor = Some(position);
    }

    pub fn handle_wheel(&mut self, delta: MouseScrollDelta) {
        // One wheel line is roughly a hundred pixels
        let pixels = match delta {
            MouseScrollDelta::LineDelta(_, y) => -y * 100.0,
            MouseScrollDelta::PixelDelta(p) => -p.y as f32,
        };
        self.camera.zoom(pixels);
    }
}

/// Run the interactive viewer
pub async fn run_viewer(sim_config: SimulationConfig) -> Result<()> {
    println!("Creating event loop...");
    let event_loop = EventLoop::new()?;

    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Entropy Café")
            .with_inner_size(LogicalSize::new(1024.0, 768.0))
            .build(&event_loop)?,
    );

    let instance = Instance::default();
    let surface = instance.create_surface(window.clone()).map_err(GpuError::from)?;
    let adapter = instance
        .request_adapter(&RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .ok_or(GpuError::NoAdapter)?;
    println!("GPU: {} ({:?})", adapter.get_info().name, adapter.get_info().backend);

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: compute_limits(&adapter),
                label: Some("cafe_viewer_device"),
            },
            None,
        )
        .await
        .map_err(GpuError::from)?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .unwrap_or(surface_caps.formats[0]);
    let size = window.inner_size();
    let config = SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: surface_caps.present_modes[0],
        alpha_mode: surface_caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &config);

    let mut gpu = GpuContext {
        device,
        queue,
        surface,
        config,
    };

    bindings::log_binding_layouts();
    let mut viewer = Viewer::new(window.clone(), &gpu, sim_config);
    println!("Viewer ready. C cream, S stir, O stir once, P pour, R reset, Space pause, Esc quit");

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);
        match event {
            Event::WindowEvent { ref event, window_id } if window_id == viewer.window().id() => match event {
                WindowEvent::CloseRequested => {
                    println!("Window close requested");
                    elwt.exit();
                }
                WindowEvent::Resized(physical_size) => {
                    viewer.resize(&mut gpu, *physical_size);
                    viewer.window().request_redraw();
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            logical_key: Key::Named(NamedKey::Escape),
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => {
                    println!("Escape key pressed");
                    elwt.exit();
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            logical_key,
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => viewer.handle_key(&gpu, logical_key),
                WindowEvent::MouseInput { state, button, .. } => viewer.handle_mouse_button(*button, *state),
                WindowEvent::CursorMoved { position, .. } => viewer.handle_cursor(*position),
                WindowEvent::MouseWheel { delta, .. } => viewer.handle_wheel(*delta),
                WindowEvent::RedrawRequested => match viewer.frame(&gpu) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = viewer.window().inner_size();
                        viewer.resize(&mut gpu, size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Surface out of memory, exiting");
                        elwt.exit();
                    }
                    Err(e) => log::warn!("Frame skipped: {:?}", e),
                },
                _ => {}
            },
            Event::AboutToWait => viewer.window().request_redraw(),
            _ => {}
        }
    })?;

    Ok(())
}

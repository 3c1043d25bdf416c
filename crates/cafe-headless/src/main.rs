mod metrics;
mod snapshots;

use std::path::PathBuf;
use std::time::Instant;

use cafe_core::gpu::{ComputePipelines, GpuDevice, GpuFluidSimulation, GpuMetrics, Layouts};
use cafe_core::sim::{FluidControls, FluidStepper, MetricsGrid, MetricsSample, Particle, ParticleStats};
use cafe_core::{bindings, SimulationConfig};
use clap::Parser;
use metrics::MetricsWriter;
use serde::Serialize;
use snapshots::SnapshotWriter;

#[derive(Parser)]
#[command(name = "cafe-headless")]
#[command(about = "Headless CLI runner for entropy café mixing experiments")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Output directory for results
    #[arg(short, long, value_name = "DIR")]
    out: PathBuf,

    /// Override the frame count from the configuration
    #[arg(short, long)]
    frames: Option<u32>,

    /// Run the CPU reference stepper instead of the GPU
    #[arg(long)]
    cpu: bool,

    /// Frames at which to drop a cream burst
    #[arg(long, value_name = "FRAME", default_values_t = [0u32])]
    burst_at: Vec<u32>,

    /// Frames at which to give the glass a one-shot stir
    #[arg(long, value_name = "FRAME")]
    stir_at: Vec<u32>,

    /// Enable strict mode (configuration warnings become errors)
    #[arg(long)]
    strict: bool,
}

/// Final state written next to the CSV
#[derive(Serialize)]
struct RunSummary {
    backend: &'static str,
    frames: u32,
    sim_time: f32,
    wall_seconds: f64,
    particles: u32,
    coffee: u32,
    cream: u32,
    cream_height: f32,
    metrics_rows: u32,
    final_metrics: MetricsSample,
}

/// The stepper and metrics reduction, on the CPU or the GPU
enum Backend {
    Cpu {
        stepper: FluidStepper,
        metrics: MetricsGrid,
    },
    Gpu {
        gpu: GpuDevice,
        pipelines: ComputePipelines,
        sim: GpuFluidSimulation,
        metrics: GpuMetrics,
    },
}

impl Backend {
    fn cpu(config: &SimulationConfig) -> Self {
        Backend::Cpu {
            stepper: FluidStepper::new(config),
            metrics: MetricsGrid::new(config),
        }
    }

    fn gpu(config: &SimulationConfig) -> Result<Self, anyhow::Error> {
        let gpu = pollster::block_on(GpuDevice::new())?;
        println!("{}", gpu.info());
        bindings::log_binding_layouts();

        let layouts = Layouts::new(&gpu.device);
        let pipelines = ComputePipelines::new(&gpu.device, &layouts);
        let sim = GpuFluidSimulation::new(&gpu.device, &gpu.queue, &layouts, config);
        let metrics = GpuMetrics::new(&gpu.device, &layouts, config, &sim.particle_buffer);
        log::debug!("Metrics counters: {} bytes", metrics.counts_bytes());

        Ok(Backend::Gpu { gpu, pipelines, sim, metrics })
    }

    fn name(&self) -> &'static str {
        match self {
            Backend::Cpu { .. } => "cpu",
            Backend::Gpu { .. } => "gpu",
        }
    }

    fn controls(&mut self) -> &mut FluidControls {
        match self {
            Backend::Cpu { stepper, .. } => &mut stepper.controls,
            Backend::Gpu { sim, .. } => &mut sim.controls,
        }
    }

    fn num_particles(&self) -> u32 {
        match self {
            Backend::Cpu { stepper, .. } => stepper.particle_count(),
            Backend::Gpu { sim, .. } => sim.num_particles(),
        }
    }

    fn time(&self) -> f32 {
        match self {
            Backend::Cpu { stepper, .. } => stepper.time(),
            Backend::Gpu { sim, .. } => sim.time(),
        }
    }

    fn add_cream_burst(&mut self, count: u32) -> u32 {
        match self {
            Backend::Cpu { stepper, .. } => stepper.add_cream_burst(count),
            Backend::Gpu { gpu, sim, .. } => sim.add_cream_burst(&gpu.queue, count),
        }
    }

    fn step(&mut self, dt: f32) {
        match self {
            Backend::Cpu { stepper, .. } => stepper.step(dt),
            Backend::Gpu { gpu, pipelines, sim, .. } => {
                let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("fluid_step"),
                });
                sim.encode_step(&gpu.queue, &mut encoder, pipelines, dt);
                gpu.submit(encoder.finish());
            }
        }
    }

    fn sample_metrics(&mut self) -> Result<MetricsSample, anyhow::Error> {
        match self {
            Backend::Cpu { stepper, metrics } => Ok(metrics.compute(stepper.particles())),
            Backend::Gpu { gpu, pipelines, sim, metrics } => {
                let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("metrics"),
                });
                if !metrics.encode(&gpu.queue, &mut encoder, pipelines, sim.num_particles()) {
                    anyhow::bail!("Metrics read already in flight");
                }
                gpu.submit(encoder.finish());
                metrics.begin_read();
                match metrics.wait(&gpu.device) {
                    Some(result) => Ok(result?),
                    None => anyhow::bail!("Metrics read did not complete"),
                }
            }
        }
    }

    fn particles(&self) -> Result<Vec<Particle>, anyhow::Error> {
        match self {
            Backend::Cpu { stepper, .. } => Ok(stepper.particles().to_vec()),
            Backend::Gpu { gpu, sim, .. } => Ok(sim.read_particles(&gpu.device, &gpu.queue)?),
        }
    }

    fn finish(&self) {
        if let Backend::Gpu { gpu, .. } = self {
            gpu.wait();
        }
    }
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();
    let cli = Cli::parse();

    // Load configuration
    println!("Loading configuration from {}", cli.config.display());
    let mut config: SimulationConfig = serde_yaml::from_str(&std::fs::read_to_string(&cli.config)?)?;
    if let Some(frames) = cli.frames {
        config.run.frames = frames;
    }

    // Validate configuration
    if let Err(e) = config.validate() {
        anyhow::bail!("Invalid configuration: {}", e);
    }
    if config.run.frames == 0 {
        anyhow::bail!("Frame count must be greater than 0.");
    }
    let warnings = config.warnings();
    for w in &warnings {
        log::warn!("{}", w);
        println!("Warning: {}", w);
    }
    if cli.strict && !warnings.is_empty() {
        anyhow::bail!("{} configuration warning(s) in strict mode", warnings.len());
    }

    // Create output directory
    std::fs::create_dir_all(&cli.out)?;

    let mut backend = if cli.cpu {
        println!("Using CPU reference stepper");
        Backend::cpu(&config)
    } else {
        println!("Initializing GPU...");
        Backend::gpu(&config)?
    };

    let mut metrics_writer = MetricsWriter::new(&cli.out)?;
    let snapshot_writer = SnapshotWriter::new(&cli.out, &config.glass)?;

    let frames = config.run.frames;
    let dt = backend.controls().fixed_dt(config.run.dt);
    let snapshot_frames = [0, 200, 1000, frames];

    println!("Starting simulation for {} frames (dt {:.4}) on {}...", frames, dt, backend.name());
    let start_time = Instant::now();
    let mut last_sample = MetricsSample::default();

    for frame in 0..=frames {
        let frame_start = Instant::now();

        if cli.burst_at.contains(&frame) {
            let added = backend.add_cream_burst(config.particles.burst_size);
            println!("Frame {}: cream burst of {} particles", frame, added);
        }
        if cli.stir_at.contains(&frame) {
            backend.controls().stir_once();
            println!("Frame {}: stir", frame);
        }

        if frame > 0 {
            backend.step(dt);
        }

        // Metrics and logging every interval
        if frame % config.metrics.interval == 0 || frame == frames {
            let sample = backend.sample_metrics()?;
            let frame_time = frame_start.elapsed();
            metrics_writer.write_step(frame, backend.time(), backend.num_particles(), &sample, frame_time)?;
            last_sample = sample;

            if frame % config.metrics.interval.saturating_mul(10) == 0 || frame == frames {
                println!(
                    "Frame {}: H={:.3}, mix={:.3}, cx={:.3}, ke={:.3}, particles={}, time={:?}",
                    frame,
                    sample.entropy,
                    sample.mixedness,
                    sample.complexity,
                    sample.kinetic,
                    backend.num_particles(),
                    frame_time
                );
            }
        }

        // Snapshots at specific frames
        if snapshot_frames.contains(&frame) {
            let particles = backend.particles()?;
            snapshot_writer.write_cream_snapshot(frame, &particles)?;
            snapshot_writer.write_particles_snapshot(frame, &particles)?;
            println!("Snapshot written for frame {}", frame);
        }
    }

    backend.finish();
    let total_time = start_time.elapsed();

    let stats = ParticleStats::from_particles(&backend.particles()?);
    let summary = RunSummary {
        backend: backend.name(),
        frames,
        sim_time: backend.time(),
        wall_seconds: total_time.as_secs_f64(),
        particles: backend.num_particles(),
        coffee: stats.coffee,
        cream: stats.cream,
        cream_height: stats.cream_height,
        metrics_rows: metrics_writer.rows(),
        final_metrics: last_sample,
    };
    std::fs::write(cli.out.join("summary.yaml"), serde_yaml::to_string(&summary)?)?;

    println!("Simulation completed in {:?}", total_time);
    println!("Results written to {}", cli.out.display());

    Ok(())
}

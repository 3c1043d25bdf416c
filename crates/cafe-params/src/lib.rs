//! Shared parameter types for the entropy café fluid simulation
//!
//! This crate holds the configuration tree and every GPU-facing uniform struct used by
//! the core engine, the headless runner and the viewer, so the byte layouts the shaders
//! see are defined in exactly one place.

use bytemuck::{Pod, Zeroable};

/// Fixed constants shared by the CPU reference and the WGSL shaders
pub mod constants {
    /// Bytes per particle in the simulation buffer
    pub const PARTICLE_STRUCT_SIZE: u64 = 32;
    /// Fixed-point scale for momentum accumulated with integer atomics
    pub const MOMENTUM_SCALE: f32 = 1000.0;
    /// Fixed-point scale for the metrics accumulators
    pub const METRICS_SCALE: f32 = 1000.0;
    /// Number of u32 words in the metrics accumulator buffer
    pub const METRICS_WORDS: usize = 8;
    /// Number of u32 counters per metrics cell (coffee, cream, kinetic, pad)
    pub const METRICS_CELL_WORDS: usize = 4;
    /// Per-particle kinetic energy clamp used by the metrics reduction
    pub const KINETIC_CLAMP: f32 = 10.0;
    /// Compute workgroup size for particle and cell dispatches
    pub const WORKGROUP_SIZE: u32 = 64;
    /// Maximum frame delta before speed scaling (seconds)
    pub const MAX_FRAME_DT: f32 = 0.05;
    /// Largest metrics interval accepted by `SimulationConfig::validate` (frames)
    pub const MAX_METRICS_INTERVAL: u32 = 100_000;

    pub const COFFEE_COLOR: [f32; 3] = [0.24, 0.14, 0.08];
    pub const CREAM_COLOR: [f32; 3] = [0.96, 0.94, 0.90];
}

/// Glass geometry
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GlassConfig {
    pub radius: f32,
    pub height: f32,
    pub particle_radius: f32,
}

/// Particle counts and seeding
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParticleConfig {
    pub max: u32,
    pub coffee: u32,
    pub cream: u32,
    pub burst_size: u32,
    pub seed: u64,
}

/// Fluid model coefficients
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FluidConfig {
    pub gravity: f32,
    pub viscosity: f32,   // Blend rate toward the grid velocity
    pub diffusion: f32,   // Random-walk amplitude
    pub buoyancy: f32,    // Cream lift relative to local mix
    pub rest_density: f32, // Particles per cell at rest
    pub stiffness: f32,
    pub damping: f32,
    pub restitution: f32,
    pub max_speed: f32,
    pub substeps: u32,
    pub grid_dims: [u32; 3],
}

/// Stirring spoon
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StirConfig {
    pub strength: f32,
    pub active: bool,
    pub impulse_strength: f32,
    pub impulse_duration: f32,
}

/// Continuous cream pour
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PourConfig {
    pub rate: f32, // Particles per second
    pub active: bool,
}

/// Frame loop settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RunConfig {
    pub frames: u32,
    pub dt: f32,
    pub speed: f32,
}

/// Metrics reduction settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MetricsConfig {
    pub grid_size: u32,
    pub interval: u32, // Frames between reads
    pub history: usize,
}

/// Complete simulation configuration
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationConfig {
    pub glass: GlassConfig,
    pub particles: ParticleConfig,
    pub fluid: FluidConfig,
    pub stir: StirConfig,
    pub pour: PourConfig,
    pub run: RunConfig,
    pub metrics: MetricsConfig,
}

impl Default for GlassConfig {
    fn default() -> Self {
        Self {
            radius: 1.5,
            height: 4.0,
            particle_radius: 0.04,
        }
    }
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            max: 50_000,
            coffee: 30_000,
            cream: 0,
            burst_size: 1_200,
            seed: 1337,
        }
    }
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            gravity: -2.0,
            viscosity: 0.42,
            diffusion: 0.28,
            buoyancy: 0.7,
            rest_density: 6.0,
            stiffness: 4.0,
            damping: 0.5,
            restitution: 0.3,
            max_speed: 8.0,
            substeps: 2,
            grid_dims: [24, 32, 24],
        }
    }
}

impl Default for StirConfig {
    fn default() -> Self {
        Self {
            strength: 9.5,
            active: false,
            impulse_strength: 15.0,
            impulse_duration: 0.5,
        }
    }
}

impl Default for PourConfig {
    fn default() -> Self {
        Self {
            rate: 650.0,
            active: false,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frames: 2000,
            dt: 1.0 / 60.0,
            speed: 1.0,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            grid_size: 16,
            interval: 20,
            history: 120,
        }
    }
}

impl GlassConfig {
    /// Edge length of a cubic fluid grid cell for the given x resolution
    pub fn cell_size(&self, grid_dims: [u32; 3]) -> f32 {
        2.0 * self.radius / grid_dims[0].max(1) as f32
    }

    /// Lower corner of the bounding box the grids cover
    pub fn bounds_min(&self) -> [f32; 3] {
        [-self.radius, -0.5 * self.height, -self.radius]
    }

    /// Upper corner of the bounding box the grids cover
    pub fn bounds_max(&self) -> [f32; 3] {
        [self.radius, 0.5 * self.height, self.radius]
    }
}

impl SimulationConfig {
    /// Hard errors that make the configuration unusable
    pub fn validate(&self) -> Result<(), String> {
        let g = &self.glass;
        if !(g.radius > 0.0 && g.height > 0.0) {
            return Err(format!("Glass dimensions must be positive, got radius {} height {}", g.radius, g.height));
        }
        if !(g.particle_radius > 0.0) || g.particle_radius * 4.0 >= g.radius {
            return Err(format!("Particle radius {} is out of range for glass radius {}", g.particle_radius, g.radius));
        }
        if g.particle_radius * 4.0 >= g.height {
            return Err(format!("Particle radius {} is out of range for glass height {}", g.particle_radius, g.height));
        }
        let p = &self.particles;
        if p.max == 0 {
            return Err("Particle capacity must be greater than 0".to_string());
        }
        if p.coffee as u64 + p.cream as u64 > p.max as u64 {
            return Err(format!(
                "Initial fill {} coffee + {} cream exceeds capacity {}",
                p.coffee, p.cream, p.max
            ));
        }
        let f = &self.fluid;
        if f.grid_dims.iter().any(|&d| d < 4) {
            return Err(format!("Fluid grid dims must be at least 4, got {:?}", f.grid_dims));
        }
        if f.substeps == 0 {
            return Err("Sub-step count must be at least 1".to_string());
        }
        if !(f.rest_density > 0.0) {
            return Err("Rest density must be positive".to_string());
        }
        if !(self.run.dt > 0.0) {
            return Err("Time step (dt) must be positive".to_string());
        }
        if !(self.run.speed > 0.0) {
            return Err("Speed must be positive".to_string());
        }
        if self.metrics.grid_size < 2 {
            return Err(format!("Metrics grid size must be at least 2, got {}", self.metrics.grid_size));
        }
        if self.metrics.interval == 0 || self.metrics.interval > constants::MAX_METRICS_INTERVAL {
            return Err(format!(
                "Metrics interval must be between 1 and {} frames, got {}",
                constants::MAX_METRICS_INTERVAL, self.metrics.interval
            ));
        }
        Ok(())
    }

    /// Soft problems worth reporting; callers decide whether they are fatal
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        let p = &self.particles;
        let filled = (p.coffee + p.cream) as f32 / p.max.max(1) as f32;
        if filled > 0.8 {
            out.push(format!("Initial fill uses {:.0}% of capacity; cream bursts will be truncated", filled * 100.0));
        }
        let ratio = self.glass.height / self.glass.cell_size(self.fluid.grid_dims);
        if (ratio - self.fluid.grid_dims[1] as f32).abs() > 0.5 {
            out.push(format!(
                "Grid y resolution {} does not match glass height ({} cells of size {:.3})",
                self.fluid.grid_dims[1],
                ratio,
                self.glass.cell_size(self.fluid.grid_dims)
            ));
        }
        if self.fluid.grid_dims[0] != self.fluid.grid_dims[2] {
            out.push("Grid x and z resolutions differ; cells will not be cubic".to_string());
        }
        if self.run.speed > 5.0 {
            out.push(format!("Speed {} is above the supported range 0.1-5", self.run.speed));
        }
        out
    }
}

/// Live knobs adjusted while the simulation runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidKnobs {
    pub viscosity: f32,
    pub diffusion: f32,
    pub buoyancy: f32,
    pub stir_strength: f32,
    pub stirring: bool,
    pub pour_rate: f32,
    pub pouring: bool,
    pub speed: f32,
    pub paused: bool,
}

impl From<&SimulationConfig> for FluidKnobs {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            viscosity: config.fluid.viscosity,
            diffusion: config.fluid.diffusion,
            buoyancy: config.fluid.buoyancy,
            stir_strength: config.stir.strength,
            stirring: config.stir.active,
            pour_rate: config.pour.rate,
            pouring: config.pour.active,
            speed: config.run.speed,
            paused: false,
        }
    }
}

/// Per-dispatch values that change every frame or sub-step
#[derive(Debug, Clone, Copy, Default)]
pub struct StepInfo {
    pub dt: f32,
    pub time: f32,
    pub tick: u32,
    pub num_particles: u32,
    pub stir_strength: f32,
    pub stir_active: bool,
}

/// GPU-compatible parameters for the fluid compute shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SimUniforms {
    pub glass_radius: f32,
    pub glass_height: f32,
    pub dt: f32, // Sub-step length
    pub gravity: f32,
    pub stir_strength: f32,
    pub stir_active: u32,
    pub time: f32,
    pub num_particles: u32,
    pub viscosity: f32,
    pub diffusion: f32,
    pub buoyancy: f32,
    pub particle_radius: f32,
    pub rest_density: f32,
    pub stiffness: f32,
    pub damping: f32,
    pub restitution: f32,
    pub grid_dims: [u32; 3],
    pub tick: u32, // Noise stream index, advanced per sub-step
    pub cell_size: f32,
    pub max_speed: f32,
    pub _pad: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<SimUniforms>() == 96);

impl SimUniforms {
    pub fn new(config: &SimulationConfig, knobs: &FluidKnobs, step: StepInfo) -> Self {
        Self {
            glass_radius: config.glass.radius,
            glass_height: config.glass.height,
            dt: step.dt,
            gravity: config.fluid.gravity,
            stir_strength: step.stir_strength,
            stir_active: step.stir_active as u32,
            time: step.time,
            num_particles: step.num_particles,
            viscosity: knobs.viscosity,
            diffusion: knobs.diffusion,
            buoyancy: knobs.buoyancy,
            particle_radius: config.glass.particle_radius,
            rest_density: config.fluid.rest_density,
            stiffness: config.fluid.stiffness,
            damping: config.fluid.damping,
            restitution: config.fluid.restitution,
            grid_dims: config.fluid.grid_dims,
            tick: step.tick,
            cell_size: config.glass.cell_size(config.fluid.grid_dims),
            max_speed: config.fluid.max_speed,
            _pad: [0.0; 2],
        }
    }

    pub fn cell_count(&self) -> u32 {
        self.grid_dims[0] * self.grid_dims[1] * self.grid_dims[2]
    }
}

/// GPU-compatible parameters for the metrics shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MetricsUniforms {
    pub grid_size: u32,
    pub num_particles: u32,
    pub glass_radius: f32,
    pub glass_height: f32,
}

const _: () = assert!(std::mem::size_of::<MetricsUniforms>() == 16);

impl MetricsUniforms {
    pub fn new(config: &SimulationConfig, num_particles: u32) -> Self {
        Self {
            grid_size: config.metrics.grid_size,
            num_particles,
            glass_radius: config.glass.radius,
            glass_height: config.glass.height,
        }
    }
}

/// Camera and timing uniforms shared by every render pass (288 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RenderUniforms {
    pub texel_size: [f32; 2],
    pub sphere_size: f32,
    pub _pad0: f32,
    pub inv_projection: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub inv_view: [[f32; 4]; 4],
    pub time: f32,
    pub stir_strength: f32,
    pub _pad1: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<RenderUniforms>() == 288);

/// Screen-space filter settings for one blur direction
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FilterUniforms {
    pub direction: [f32; 2],
    pub depth_threshold: f32,
    pub max_filter_size: f32,
    pub projected_particle_constant: f32,
    pub screen_width: f32,
    pub screen_height: f32,
    pub _pad: f32,
}

const _: () = assert!(std::mem::size_of::<FilterUniforms>() == 32);

impl FilterUniforms {
    pub const MAX_FILTER_SIZE: f32 = 45.0;

    pub fn new(direction: [f32; 2], particle_radius: f32, width: u32, height: u32) -> Self {
        let half_height = height as f32 / 2.0;
        Self {
            direction,
            depth_threshold: particle_radius * 6.0,
            max_filter_size: Self::MAX_FILTER_SIZE,
            projected_particle_constant: (10.0 * particle_radius * 2.0 * 0.05 * half_height)
                / (std::f32::consts::PI / 8.0).tan(),
            screen_width: width as f32,
            screen_height: height as f32,
            _pad: 0.0,
        }
    }
}

/// WGSL binding layout documentation and validation
///
/// The simulation and metrics shaders are shared by the headless runner and the viewer,
/// so the group layouts below are the contract both sides must honour.
pub mod bindings {
    use super::*;

    /// Fluid compute bindings (group 0, every sim shader uses a subset)
    ///
    /// ```wgsl
    /// @group(0) @binding(0) var<storage, read_write> particles: array<Particle>;
    /// @group(0) @binding(1) var<storage, read_write> accum: array<atomic<i32>>;
    /// @group(0) @binding(2) var<storage, read_write> cells: array<Cell>;
    /// @group(0) @binding(3) var<uniform> params: SimParams;
    /// @group(0) @binding(4) var<storage, read_write> posvel: array<PosVel>;
    /// ```
    pub const SIM_BINDINGS: &str =
        "Sim Group 0: Particles SSBO, Accum SSBO (atomic i32 x6/cell), Cells SSBO, SimParams(uniform), PosVel SSBO";

    /// Metrics compute bindings (group 0)
    ///
    /// ```wgsl
    /// @group(0) @binding(0) var<storage, read> particles: array<Particle>;
    /// @group(0) @binding(1) var<storage, read_write> counts: array<atomic<u32>>;
    /// @group(0) @binding(2) var<storage, read_write> metrics: array<atomic<u32>>;
    /// @group(0) @binding(3) var<uniform> params: MetricsParams;
    /// ```
    pub const METRICS_BINDINGS: &str =
        "Metrics Group 0: Particles SSBO(read), Counts SSBO (atomic u32 x4/cell), Metrics SSBO (atomic u32 x8), MetricsParams(uniform)";

    /// Number of i32 accumulators per fluid cell (count, cream, mass, momentum xyz)
    pub const ACCUM_WORDS: u32 = 6;

    /// Check that the uniform grid covers the glass with cubic cells
    pub fn validate_sim_uniforms(params: &SimUniforms) -> Result<(), String> {
        let expected = 2.0 * params.glass_radius / params.grid_dims[0] as f32;
        if (params.cell_size - expected).abs() > 1e-5 {
            return Err(format!("Cell size mismatch: expected {}, got {}", expected, params.cell_size));
        }
        if !(params.dt > 0.0 && params.dt.is_finite()) {
            return Err(format!("Sub-step dt must be positive, got {}", params.dt));
        }
        Ok(())
    }

    /// Check that the metrics uniforms match the particle count being reduced
    pub fn validate_metrics_uniforms(params: &MetricsUniforms, expected_particles: u32) -> Result<(), String> {
        if params.num_particles != expected_particles {
            Err(format!(
                "Particle count mismatch: expected {}, got {}",
                expected_particles, params.num_particles
            ))
        } else {
            Ok(())
        }
    }

    /// Log binding layout information for debugging
    pub fn log_binding_layouts() {
        log::info!("Sim Bindings: {}", SIM_BINDINGS);
        log::info!("Metrics Bindings: {}", METRICS_BINDINGS);
        log::info!("Momentum scale: {}", constants::MOMENTUM_SCALE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert!(config.warnings().is_empty(), "{:?}", config.warnings());
    }

    #[test]
    fn overfilled_config_is_rejected() {
        let mut config = SimulationConfig::default();
        config.particles.cream = 25_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn heavy_fill_warns() {
        let mut config = SimulationConfig::default();
        config.particles.cream = 15_000;
        assert!(config.validate().is_ok());
        assert_eq!(config.warnings().len(), 1);
    }

    #[test]
    fn sim_uniforms_pick_up_cell_size() {
        let config = SimulationConfig::default();
        let knobs = FluidKnobs::from(&config);
        let uniforms = SimUniforms::new(
            &config,
            &knobs,
            StepInfo { dt: 0.008, ..Default::default() },
        );
        assert!((uniforms.cell_size - 0.125).abs() < 1e-6);
        assert_eq!(uniforms.cell_count(), 24 * 32 * 24);
        assert!(bindings::validate_sim_uniforms(&uniforms).is_ok());
    }

    #[test]
    fn filter_constant_matches_screen_height() {
        let f = FilterUniforms::new([1.0, 0.0], 0.04, 800, 600);
        let expected = 10.0 * 0.04 * 2.0 * 0.05 * 300.0 / (std::f32::consts::PI / 8.0).tan();
        assert!((f.projected_particle_constant - expected).abs() < 1e-3);
        assert!((f.depth_threshold - 0.24).abs() < 1e-6);
    }
}

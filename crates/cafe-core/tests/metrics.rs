use cafe_core::sim::{MetricsGrid, MetricsHistory, Particle, ParticleKind, ParticleSet};
use cafe_core::{DisplayMetrics, MetricsSample, SimulationConfig};
use glam::Vec3;

/// One coffee and one cream particle at the centre of every metrics cell
fn checkerboard(config: &SimulationConfig) -> Vec<Particle> {
    let g = config.metrics.grid_size;
    let min = Vec3::from_array(config.glass.bounds_min());
    let extent = Vec3::from_array(config.glass.bounds_max()) - min;
    let mut particles = Vec::new();
    for z in 0..g {
        for y in 0..g {
            for x in 0..g {
                let centre = min + (Vec3::new(x as f32, y as f32, z as f32) + 0.5) / g as f32 * extent;
                particles.push(Particle::new(centre, Vec3::ZERO, ParticleKind::Coffee));
                particles.push(Particle::new(centre, Vec3::ZERO, ParticleKind::Cream));
            }
        }
    }
    particles
}

#[test]
fn layered_state_has_low_entropy() {
    let mut config = SimulationConfig::default();
    config.particles.coffee = 20_000;
    config.particles.cream = 8_000;
    let set = ParticleSet::seed(&config);

    let sample = MetricsGrid::new(&config).compute(&set.particles);
    assert!(sample.entropy < 0.05, "entropy {}", sample.entropy);
    assert!(sample.mixedness < 0.05, "mixedness {}", sample.mixedness);
    assert_eq!(sample.particles, 28_000);
    assert!(sample.count > 0);
}

#[test]
fn even_mix_has_full_entropy_and_mixedness() {
    let config = SimulationConfig::default();
    let particles = checkerboard(&config);
    let sample = MetricsGrid::new(&config).compute(&particles);

    let g = config.metrics.grid_size;
    assert_eq!(sample.count, g * g * g);
    assert!((sample.entropy - 1.0).abs() < 1e-5);
    assert!((sample.mixedness - 1.0).abs() < 1e-5);
    assert!(sample.complexity.abs() < 1e-5);
    assert_eq!(sample.kinetic, 0.0);
}

#[test]
fn single_kind_is_unmixed() {
    let mut config = SimulationConfig::default();
    config.particles.coffee = 5_000;
    let set = ParticleSet::seed(&config);
    let sample = MetricsGrid::new(&config).compute(&set.particles);
    assert_eq!(sample.entropy, 0.0);
    assert_eq!(sample.mixedness, 0.0);
    assert_eq!(sample.complexity, 0.0);
}

#[test]
fn empty_set_yields_zeros() {
    let config = SimulationConfig::default();
    let sample = MetricsGrid::new(&config).compute(&[]);
    assert_eq!(sample, MetricsSample::default());
    assert!(!sample.entropy.is_nan());
}

#[test]
fn kinetic_energy_is_clamped_per_particle() {
    let config = SimulationConfig::default();
    let fast = Particle::new(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0), ParticleKind::Coffee);
    let slow = Particle::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), ParticleKind::Coffee);
    let sample = MetricsGrid::new(&config).compute(&[fast, slow]);
    assert!((sample.kinetic - (10.0 + 0.5) / 2.0).abs() < 1e-5);
}

#[test]
fn interface_between_layers_has_complexity() {
    let config = SimulationConfig::default();
    let g = config.metrics.grid_size;
    let min = Vec3::from_array(config.glass.bounds_min());
    let extent = Vec3::from_array(config.glass.bounds_max()) - min;

    // Cream fraction ramps with height: 0, 0.25, 0.5, 0.75, 1
    let mut particles = Vec::new();
    for (layer, cream) in [0, 1, 2, 3, 4].into_iter().enumerate() {
        let centre = min + (Vec3::new(g as f32 / 2.0, 6.0 + layer as f32, g as f32 / 2.0) + 0.5) / g as f32 * extent;
        for i in 0..4 {
            let kind = if i < cream { ParticleKind::Cream } else { ParticleKind::Coffee };
            particles.push(Particle::new(centre, Vec3::ZERO, kind));
        }
    }
    let sample = MetricsGrid::new(&config).compute(&particles);
    assert_eq!(sample.count, 5);
    assert!(sample.complexity > 0.05);
    assert!(sample.entropy > 0.3 && sample.entropy < 1.0);
}

#[test]
fn display_shaping_clamps_and_zeroes_nan() {
    let wild = MetricsSample {
        entropy: f32::NAN,
        mixedness: 7.0,
        complexity: -1.0,
        kinetic: f32::INFINITY,
        count: 1,
        particles: 1,
    };
    let shaped = DisplayMetrics::from(&wild);
    assert_eq!(shaped.entropy, 0.0);
    assert_eq!(shaped.mixedness, 1.0);
    assert_eq!(shaped.complexity, 0.0);
    assert_eq!(shaped.kinetic, 0.0);
}

#[test]
fn history_keeps_the_latest_samples() {
    let mut history = MetricsHistory::new(120);
    for i in 0..200 {
        history.push(&MetricsSample {
            entropy: i as f32 / 200.0,
            ..Default::default()
        });
    }
    assert_eq!(history.len(), 120);
    assert_eq!(history.sparkline(|m| m.entropy, 40).chars().count(), 40);
    history.clear();
    assert!(history.is_empty());
}

use cafe_core::sim::{ParticleKind, ParticleSet};
use cafe_core::SimulationConfig;

fn inside_glass(config: &SimulationConfig, p: [f32; 3]) -> bool {
    let g = &config.glass;
    let r = (p[0] * p[0] + p[2] * p[2]).sqrt();
    let half = 0.5 * g.height - g.particle_radius;
    r <= g.radius - g.particle_radius + 1e-4 && p[1] >= -half - 1e-4 && p[1] <= half + 1e-4
}

#[test]
fn seeding_matches_configured_counts() {
    let mut config = SimulationConfig::default();
    config.particles.coffee = 4000;
    config.particles.cream = 1000;
    let set = ParticleSet::seed(&config);

    let stats = set.stats();
    assert_eq!(stats.coffee, 4000);
    assert_eq!(stats.cream, 1000);
    assert_eq!(set.len(), 5000);
}

#[test]
fn coffee_sits_below_cream() {
    let mut config = SimulationConfig::default();
    config.particles.coffee = 3000;
    config.particles.cream = 1500;
    let set = ParticleSet::seed(&config);
    let h = config.glass.height;

    for p in &set.particles {
        assert!(inside_glass(&config, p.position), "{:?} outside glass", p.position);
        assert_eq!(p.velocity, [0.0; 3]);
        assert_eq!(p.mass, 1.0);
        match p.kind() {
            ParticleKind::Coffee => assert!(p.position[1] <= -0.5 * h + 0.1 + 0.5 * h),
            ParticleKind::Cream => assert!(p.position[1] >= 0.1 * h),
        }
    }
}

#[test]
fn same_seed_gives_identical_particles() {
    let config = SimulationConfig::default();
    let a = ParticleSet::seed(&config);
    let b = ParticleSet::seed(&config);
    assert_eq!(a.particles, b.particles);

    let mut other = config.clone();
    other.particles.seed += 1;
    let c = ParticleSet::seed(&other);
    assert_ne!(a.particles, c.particles);
}

#[test]
fn reset_restores_the_initial_fill() {
    let config = SimulationConfig::default();
    let mut set = ParticleSet::seed(&config);
    let initial = set.particles.clone();

    set.add_cream_burst(500);
    assert_eq!(set.len(), 30_500);
    set.reset();
    assert_eq!(set.particles, initial);
}

#[test]
fn bursts_stop_at_capacity() {
    let mut config = SimulationConfig::default();
    config.particles.max = 31_000;
    let mut set = ParticleSet::seed(&config);

    assert_eq!(set.add_cream_burst(1200), 1000);
    assert_eq!(set.len(), 31_000);
    assert_eq!(set.add_cream_burst(1200), 0);
    assert_eq!(set.emit_pour(10), 0);
}

#[test]
fn burst_particles_start_near_the_surface_moving_down() {
    let config = SimulationConfig::default();
    let mut set = ParticleSet::seed(&config);
    let start = set.len() as usize;
    let added = set.add_cream_burst(1200);
    assert_eq!(added, 1200);

    let h = config.glass.height;
    for p in &set.particles[start..] {
        assert!(p.is_cream());
        assert!(inside_glass(&config, p.position));
        assert!(p.position[1] >= 0.3 * h - 1e-4);
        assert_eq!(p.velocity, [0.0, -0.6, 0.0]);
    }
}

#[test]
fn pour_stream_falls_from_the_spout() {
    let config = SimulationConfig::default();
    let mut set = ParticleSet::seed(&config);
    let start = set.len() as usize;
    let added = set.emit_pour(500);
    assert_eq!(added, 500);

    let r = config.glass.radius;
    let h = config.glass.height;
    for p in &set.particles[start..] {
        assert!(p.is_cream());
        assert!(inside_glass(&config, p.position));
        let dx = p.position[0] - 0.35 * r;
        let dz = p.position[2];
        assert!((dx * dx + dz * dz).sqrt() <= 0.12 + 1e-5, "{:?}", p.position);
        assert!(p.position[1] <= 0.45 * h + 1e-5 && p.position[1] >= 0.45 * h - 0.1 - 1e-5);
        assert_eq!(p.velocity, [0.0, -1.5, 0.0]);
    }
}

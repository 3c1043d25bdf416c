use cafe_core::sim::{FluidStepper, Particle, ParticleKind, ParticleSet};
use cafe_core::SimulationConfig;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const DT: f32 = 1.0 / 60.0;

fn small_config(coffee: u32, cream: u32) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.particles.coffee = coffee;
    config.particles.cream = cream;
    config.particles.max = 10_000;
    config
}

fn assert_inside(config: &SimulationConfig, particles: &[Particle]) {
    let g = &config.glass;
    let limit = g.radius - g.particle_radius + 1e-4;
    let half = 0.5 * g.height - g.particle_radius + 1e-4;
    for p in particles {
        assert!(p.position.iter().chain(p.velocity.iter()).all(|v| v.is_finite()), "{:?}", p);
        let r = (p.position[0].powi(2) + p.position[2].powi(2)).sqrt();
        assert!(r <= limit, "radial {} > {}", r, limit);
        assert!(p.position[1].abs() <= half, "height {} outside", p.position[1]);
        assert!(p.velocity().length() <= config.fluid.max_speed + 1e-3);
    }
}

fn mean_height(particles: &[Particle], kind: Option<ParticleKind>) -> f32 {
    let picked: Vec<_> = particles
        .iter()
        .filter(|p| kind.map_or(true, |k| p.kind() == k))
        .collect();
    picked.iter().map(|p| p.position[1]).sum::<f32>() / picked.len() as f32
}

/// Coffee and cream interleaved through the same band
fn interleaved(config: &SimulationConfig, n: u32, seed: u64) -> Vec<Particle> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let radius = rng.gen_range(0.0..1.2);
            let y = rng.gen_range(-1.0..0.0);
            let kind = if i % 2 == 0 { ParticleKind::Cream } else { ParticleKind::Coffee };
            Particle::new(Vec3::new(angle.cos() * radius, y, angle.sin() * radius), Vec3::ZERO, kind)
        })
        .take(config.particles.max as usize)
        .collect()
}

#[test]
fn particles_stay_inside_under_heavy_stirring() {
    let config = small_config(4000, 1000);
    let mut stepper = FluidStepper::new(&config);
    stepper.controls.set_stirring(true);
    stepper.controls.set_stir_strength(20.0);
    stepper.controls.set_diffusion(1.0);

    for _ in 0..150 {
        stepper.step(DT);
    }
    assert_inside(&config, stepper.particles());
    assert_eq!(stepper.posvel().len(), stepper.particles().len());
}

#[test]
fn sparse_coffee_settles_under_gravity() {
    let mut config = small_config(2000, 0);
    config.fluid.diffusion = 0.0;
    let mut stepper = FluidStepper::new(&config);
    let start = mean_height(stepper.particles(), None);

    for _ in 0..60 {
        stepper.step(DT);
    }
    let end = mean_height(stepper.particles(), None);
    assert!(end < start, "mean height rose from {} to {}", start, end);
    assert_inside(&config, stepper.particles());
}

#[test]
fn cream_rises_relative_to_coffee() {
    let mut config = small_config(0, 0);
    config.fluid.diffusion = 0.0;
    config.fluid.buoyancy = 1.5;
    let set = ParticleSet::from_particles(&config, interleaved(&config, 4000, 11));
    let mut stepper = FluidStepper::with_particles(&config, set);

    let gap = |s: &FluidStepper| {
        mean_height(s.particles(), Some(ParticleKind::Cream)) - mean_height(s.particles(), Some(ParticleKind::Coffee))
    };
    let before = gap(&stepper);
    for _ in 0..60 {
        stepper.step(DT);
    }
    let after = gap(&stepper);
    assert!(after > before + 0.05, "cream-coffee height gap went {} -> {}", before, after);
}

#[test]
fn stirring_spins_the_fluid() {
    let mut config = small_config(3000, 0);
    config.fluid.diffusion = 0.0;
    let mut stepper = FluidStepper::new(&config);
    stepper.controls.set_stirring(true);

    for _ in 0..30 {
        stepper.step(DT);
    }
    let swirl: f32 = stepper
        .particles()
        .iter()
        .map(|p| p.position[0] * p.velocity[2] - p.position[2] * p.velocity[0])
        .sum();
    assert!(swirl > 1.0, "expected positive swirl about y, got {}", swirl);
}

#[test]
fn identical_runs_are_deterministic() {
    let config = small_config(1500, 500);
    let mut a = FluidStepper::new(&config);
    let mut b = FluidStepper::new(&config);
    for stepper in [&mut a, &mut b] {
        stepper.controls.set_stirring(true);
        for _ in 0..20 {
            stepper.step(DT);
        }
    }
    assert_eq!(a.particles(), b.particles());
}

#[test]
fn zero_dt_changes_nothing() {
    let config = small_config(1000, 0);
    let mut stepper = FluidStepper::new(&config);
    let before = stepper.particles().to_vec();
    stepper.step(0.0);
    assert_eq!(stepper.particles(), &before[..]);
    assert_eq!(stepper.time(), 0.0);
}

#[test]
fn pouring_adds_particles_until_full() {
    let mut config = small_config(9_900, 0);
    config.pour.active = true;
    let mut stepper = FluidStepper::new(&config);

    stepper.step(DT);
    assert_eq!(stepper.particle_count(), 9_910);
    for _ in 0..30 {
        stepper.step(DT);
    }
    assert_eq!(stepper.particle_count(), 10_000);
    assert_inside(&config, stepper.particles());
}

#[test]
fn reset_rewinds_time_and_particles() {
    let config = small_config(1000, 200);
    let mut stepper = FluidStepper::new(&config);
    let initial = stepper.particles().to_vec();

    stepper.add_cream_burst(300);
    for _ in 0..10 {
        stepper.step(DT);
    }
    stepper.reset();
    assert_eq!(stepper.time(), 0.0);
    assert_eq!(stepper.controls.tick(), 0);
    assert_eq!(stepper.particles(), &initial[..]);
}

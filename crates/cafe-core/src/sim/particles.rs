use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use cafe_params::{GlassConfig, SimulationConfig};

/// Particle data structure for GPU compute
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Particle {
    pub position: [f32; 3],
    pub kind: f32, // 0 = coffee, 1 = cream
    pub velocity: [f32; 3],
    pub mass: f32,
}

const _: () = assert!(std::mem::size_of::<Particle>() == 32);

/// Render-side copy of a particle, written by the copy pass
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PosVel {
    pub position: [f32; 3],
    pub kind: f32,
    pub velocity: [f32; 3],
    pub speed: f32,
}

const _: () = assert!(std::mem::size_of::<PosVel>() == 32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    Coffee,
    Cream,
}

impl ParticleKind {
    pub fn tag(self) -> f32 {
        match self {
            ParticleKind::Coffee => 0.0,
            ParticleKind::Cream => 1.0,
        }
    }

    pub fn from_tag(tag: f32) -> Self {
        if tag >= 0.5 {
            ParticleKind::Cream
        } else {
            ParticleKind::Coffee
        }
    }
}

impl Particle {
    pub fn new(position: Vec3, velocity: Vec3, kind: ParticleKind) -> Self {
        Self {
            position: position.to_array(),
            kind: kind.tag(),
            velocity: velocity.to_array(),
            mass: 1.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn velocity(&self) -> Vec3 {
        Vec3::from_array(self.velocity)
    }

    pub fn kind(&self) -> ParticleKind {
        ParticleKind::from_tag(self.kind)
    }

    pub fn is_cream(&self) -> bool {
        self.kind() == ParticleKind::Cream
    }
}

impl From<&Particle> for PosVel {
    fn from(p: &Particle) -> Self {
        Self {
            position: p.position,
            kind: p.kind,
            velocity: p.velocity,
            speed: p.velocity().length(),
        }
    }
}

/// Particle statistics for logging and snapshots
#[derive(Debug, Clone, Default)]
pub struct ParticleStats {
    pub coffee: u32,
    pub cream: u32,
    pub mean_height: f32,
    pub cream_height: f32,
    pub mean_speed: f32,
    pub max_speed: f32,
}

impl ParticleStats {
    pub fn from_particles(particles: &[Particle]) -> Self {
        if particles.is_empty() {
            return Self::default();
        }

        let mut stats = Self::default();
        let mut height_sum = 0.0;
        let mut cream_height_sum = 0.0;
        let mut speed_sum = 0.0;
        for p in particles {
            let speed = p.velocity().length();
            height_sum += p.position[1];
            speed_sum += speed;
            stats.max_speed = stats.max_speed.max(speed);
            if p.is_cream() {
                stats.cream += 1;
                cream_height_sum += p.position[1];
            } else {
                stats.coffee += 1;
            }
        }

        let n = particles.len() as f32;
        stats.mean_height = height_sum / n;
        stats.mean_speed = speed_sum / n;
        stats.cream_height = if stats.cream > 0 {
            cream_height_sum / stats.cream as f32
        } else {
            0.0
        };
        stats
    }
}

/// Push a position back inside the glass, `particle_radius` away from every wall
pub fn confine_to_glass(position: Vec3, glass: &GlassConfig) -> Vec3 {
    let limit = glass.radius - glass.particle_radius;
    let half = 0.5 * glass.height - glass.particle_radius;
    let mut p = position;
    let r = (p.x * p.x + p.z * p.z).sqrt();
    if r > limit {
        let s = limit / r;
        p.x *= s;
        p.z *= s;
    }
    p.y = p.y.clamp(-half, half);
    p
}

/// Particle manager for CPU-side seeding and spawning
///
/// Owns the seeded generator so resets, bursts and pours are reproducible for a given seed.
pub struct ParticleSet {
    pub particles: Vec<Particle>,
    glass: GlassConfig,
    capacity: u32,
    initial_coffee: u32,
    initial_cream: u32,
    seed: u64,
    rng: ChaCha8Rng,
}

impl ParticleSet {
    /// Seed coffee in the lower band and any initial cream in the upper band
    pub fn seed(config: &SimulationConfig) -> Self {
        let mut set = Self {
            particles: Vec::with_capacity(config.particles.max as usize),
            glass: config.glass.clone(),
            capacity: config.particles.max,
            initial_coffee: config.particles.coffee,
            initial_cream: config.particles.cream,
            seed: config.particles.seed,
            rng: ChaCha8Rng::seed_from_u64(config.particles.seed),
        };
        set.fill();
        set
    }

    /// Wrap an explicit particle list, truncated to capacity
    pub fn from_particles(config: &SimulationConfig, mut particles: Vec<Particle>) -> Self {
        particles.truncate(config.particles.max as usize);
        Self {
            particles,
            glass: config.glass.clone(),
            capacity: config.particles.max,
            initial_coffee: config.particles.coffee,
            initial_cream: config.particles.cream,
            seed: config.particles.seed,
            rng: ChaCha8Rng::seed_from_u64(config.particles.seed),
        }
    }

    fn fill(&mut self) {
        let r = self.glass.radius;
        let h = self.glass.height;

        for _ in 0..self.initial_coffee {
            let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let radius = self.rng.gen_range(0.0..(r - 0.2).max(0.01));
            let y = -0.5 * h + 0.1 + self.rng.gen_range(0.0..0.5 * h);
            let pos = Vec3::new(angle.cos() * radius, y, angle.sin() * radius);
            self.particles.push(Particle::new(
                confine_to_glass(pos, &self.glass),
                Vec3::ZERO,
                ParticleKind::Coffee,
            ));
        }

        for _ in 0..self.initial_cream {
            let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let radius = self.rng.gen_range(0.0..(r - 0.25).max(0.01));
            let y = 0.1 * h + self.rng.gen_range(0.0..0.35 * h);
            let pos = Vec3::new(angle.cos() * radius, y, angle.sin() * radius);
            self.particles.push(Particle::new(
                confine_to_glass(pos, &self.glass),
                Vec3::ZERO,
                ParticleKind::Cream,
            ));
        }
    }

    /// Rebuild the initial fill from the configured seed
    pub fn reset(&mut self) {
        self.particles.clear();
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.fill();
    }

    pub fn len(&self) -> u32 {
        self.particles.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Free slots before the buffer is full
    pub fn room(&self) -> u32 {
        self.capacity.saturating_sub(self.len())
    }

    /// Drop a blob of cream near the surface. Returns how many particles were added.
    pub fn add_cream_burst(&mut self, count: u32) -> u32 {
        let n = count.min(self.room());
        if n < count {
            log::warn!("Cream burst truncated to {} of {} (capacity {})", n, count, self.capacity);
        }
        if n == 0 {
            return 0;
        }

        let r = self.glass.radius;
        let h = self.glass.height;
        let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let offset = self.rng.gen_range(0.0..0.5 * r);
        let center = Vec3::new(angle.cos() * offset, 0.0, angle.sin() * offset);
        let blob = 0.35 * r;

        for _ in 0..n {
            let a = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let d = blob * self.rng.gen::<f32>().sqrt();
            let y = self.rng.gen_range(0.3 * h..0.45 * h);
            let pos = Vec3::new(center.x + a.cos() * d, y, center.z + a.sin() * d);
            self.particles.push(Particle::new(
                confine_to_glass(pos, &self.glass),
                Vec3::new(0.0, -0.6, 0.0),
                ParticleKind::Cream,
            ));
        }

        log::debug!("Cream burst: {} particles, total {}", n, self.len());
        n
    }

    /// Emit a thin stream of poured cream. Returns how many particles were added.
    pub fn emit_pour(&mut self, count: u32) -> u32 {
        let n = count.min(self.room());
        let r = self.glass.radius;
        let h = self.glass.height;
        let spout = Vec3::new(0.35 * r, 0.45 * h, 0.0);

        for _ in 0..n {
            let a = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let d = 0.12 * self.rng.gen::<f32>().sqrt();
            let y = spout.y - self.rng.gen_range(0.0..0.1);
            let pos = Vec3::new(spout.x + a.cos() * d, y, spout.z + a.sin() * d);
            self.particles.push(Particle::new(
                confine_to_glass(pos, &self.glass),
                Vec3::new(0.0, -1.5, 0.0),
                ParticleKind::Cream,
            ));
        }
        n
    }

    pub fn stats(&self) -> ParticleStats {
        ParticleStats::from_particles(&self.particles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tag_round_trips() {
        assert_eq!(ParticleKind::from_tag(ParticleKind::Cream.tag()), ParticleKind::Cream);
        assert_eq!(ParticleKind::from_tag(0.49), ParticleKind::Coffee);
    }

    #[test]
    fn confine_pulls_points_inside() {
        let glass = GlassConfig::default();
        let p = confine_to_glass(Vec3::new(3.0, 5.0, 0.0), &glass);
        assert!((p.x - (glass.radius - glass.particle_radius)).abs() < 1e-5);
        assert!((p.y - (0.5 * glass.height - glass.particle_radius)).abs() < 1e-5);
    }

    #[test]
    fn posvel_carries_speed() {
        let p = Particle::new(Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0), ParticleKind::Cream);
        let pv = PosVel::from(&p);
        assert_eq!(pv.speed, 5.0);
        assert_eq!(pv.kind, 1.0);
    }
}

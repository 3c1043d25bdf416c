//! Live knobs, the stir impulse timer and the pour accumulator.
//!
//! Shared by the CPU stepper and the GPU simulation so both react to input the same way.

use cafe_params::{constants, FluidKnobs, SimulationConfig};

/// Remaining time and strength of a one-shot stir
#[derive(Debug, Clone, Copy, PartialEq)]
struct StirImpulse {
    remaining: f32,
    strength: f32,
}

/// Per-frame timing and stir state handed to the stepper
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub dt: f32,
    pub time: f32, // Simulated time at the start of the frame
    pub tick: u32,
    pub stir_strength: f32,
    pub stir_active: bool,
    pub pour_count: u32,
}

pub struct FluidControls {
    pub knobs: FluidKnobs,
    impulse_strength: f32,
    impulse_duration: f32,
    impulse: Option<StirImpulse>,
    pour_accumulator: f32,
    time: f32,
    tick: u32,
}

impl FluidControls {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            knobs: FluidKnobs::from(config),
            impulse_strength: config.stir.impulse_strength,
            impulse_duration: config.stir.impulse_duration,
            impulse: None,
            pour_accumulator: 0.0,
            time: 0.0,
            tick: 0,
        }
    }

    /// Clear time, tick, the pour carry and any running impulse. Knobs are kept.
    pub fn reset(&mut self) {
        self.impulse = None;
        self.pour_accumulator = 0.0;
        self.time = 0.0;
        self.tick = 0;
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Clamp a wall-clock frame delta and apply the speed multiplier
    pub fn frame_dt(&self, raw_dt: f32) -> f32 {
        if self.knobs.paused || !raw_dt.is_finite() {
            return 0.0;
        }
        raw_dt.clamp(0.0, constants::MAX_FRAME_DT) * self.knobs.speed
    }

    /// Scale a fixed step by the speed multiplier, without the wall-clock cap
    pub fn fixed_dt(&self, dt: f32) -> f32 {
        if self.knobs.paused || !dt.is_finite() {
            return 0.0;
        }
        dt.max(0.0) * self.knobs.speed
    }

    pub fn set_viscosity(&mut self, value: f32) {
        self.knobs.viscosity = clamp_knob("viscosity", value, 0.0, 1.0);
    }

    pub fn set_diffusion(&mut self, value: f32) {
        self.knobs.diffusion = clamp_knob("diffusion", value, 0.0, 1.0);
    }

    pub fn set_buoyancy(&mut self, value: f32) {
        self.knobs.buoyancy = clamp_knob("buoyancy", value, 0.0, 2.0);
    }

    pub fn set_stir_strength(&mut self, value: f32) {
        self.knobs.stir_strength = clamp_knob("stir strength", value, 0.0, 20.0);
    }

    pub fn set_stirring(&mut self, on: bool) {
        self.knobs.stirring = on;
    }

    pub fn set_pour_rate(&mut self, value: f32) {
        self.knobs.pour_rate = clamp_knob("pour rate", value, 0.0, 2000.0);
    }

    pub fn set_pouring(&mut self, on: bool) {
        self.knobs.pouring = on;
        if !on {
            self.pour_accumulator = 0.0;
        }
    }

    pub fn set_speed(&mut self, value: f32) {
        self.knobs.speed = clamp_knob("speed", value, 0.1, 5.0);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.knobs.paused = paused;
    }

    /// Start a short stir impulse, measured in simulated time
    pub fn stir_once(&mut self) {
        self.impulse = Some(StirImpulse {
            remaining: self.impulse_duration,
            strength: self.impulse_strength,
        });
    }

    pub fn impulse_active(&self) -> bool {
        self.impulse.is_some()
    }

    /// Stir strength and flag currently in effect
    pub fn effective_stir(&self) -> (f32, bool) {
        match self.impulse {
            Some(impulse) => (impulse.strength, true),
            None => (self.knobs.stir_strength, self.knobs.stirring),
        }
    }

    /// Whole particles to pour this frame; the fraction carries to the next one
    pub fn pour_count(&mut self, dt: f32, room: u32) -> u32 {
        if !self.knobs.pouring || dt <= 0.0 {
            if !self.knobs.pouring {
                self.pour_accumulator = 0.0;
            }
            return 0;
        }
        self.pour_accumulator += self.knobs.pour_rate * dt;
        let whole = self.pour_accumulator.floor();
        if whole as u32 >= room {
            self.pour_accumulator = 0.0;
            return room;
        }
        self.pour_accumulator -= whole;
        whole as u32
    }

    /// Start a frame: resolve the stir state and advance time, tick and the impulse timer
    pub fn begin_frame(&mut self, dt: f32, room: u32) -> FrameInfo {
        let (stir_strength, stir_active) = self.effective_stir();
        let pour_count = self.pour_count(dt, room);
        let info = FrameInfo {
            dt,
            time: self.time,
            tick: self.tick,
            stir_strength,
            stir_active,
            pour_count,
        };

        self.time += dt;
        self.tick = self.tick.wrapping_add(1);
        if let Some(impulse) = &mut self.impulse {
            impulse.remaining -= dt;
            if impulse.remaining <= 1e-5 {
                self.impulse = None;
            }
        }
        info
    }
}

fn clamp_knob(name: &str, value: f32, min: f32, max: f32) -> f32 {
    if !value.is_finite() {
        log::warn!("Ignoring non-finite {}, using {}", name, min);
        return min;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        log::warn!("{} {} clamped to {}", name, value, clamped);
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_dt_clamps_and_scales() {
        let mut controls = FluidControls::new(&SimulationConfig::default());
        controls.set_speed(2.0);
        assert!((controls.frame_dt(0.2) - 0.1).abs() < 1e-6);
        controls.set_paused(true);
        assert_eq!(controls.frame_dt(0.01), 0.0);
    }

    #[test]
    fn fixed_dt_skips_the_frame_cap() {
        let mut controls = FluidControls::new(&SimulationConfig::default());
        controls.set_speed(1.0);
        assert!((controls.fixed_dt(0.1) - 0.1).abs() < 1e-6);
        assert!((controls.frame_dt(0.1) - constants::MAX_FRAME_DT).abs() < 1e-6);
        controls.set_speed(2.0);
        assert!((controls.fixed_dt(0.1) - 0.2).abs() < 1e-6);
        controls.set_paused(true);
        assert_eq!(controls.fixed_dt(0.1), 0.0);
    }

    #[test]
    fn speed_is_clamped() {
        let mut controls = FluidControls::new(&SimulationConfig::default());
        controls.set_speed(9.0);
        assert_eq!(controls.knobs.speed, 5.0);
        controls.set_speed(0.0);
        assert_eq!(controls.knobs.speed, 0.1);
    }

    #[test]
    fn stopping_pour_drops_carry() {
        let mut controls = FluidControls::new(&SimulationConfig::default());
        controls.set_pouring(true);
        controls.set_pour_rate(30.0);
        assert_eq!(controls.pour_count(1.0 / 60.0, 100), 0);
        controls.set_pouring(false);
        controls.set_pouring(true);
        assert_eq!(controls.pour_count(1.0 / 60.0, 100), 0);
    }
}

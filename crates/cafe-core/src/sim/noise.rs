//! Integer hash noise shared with `fluid_sim.wgsl`.
//!
//! Both sides use the same PCG permutation on `u32` so a particle receives the same
//! random kick on the CPU reference and on the GPU.

/// PCG-style 32-bit hash
#[inline]
pub fn pcg_hash(v: u32) -> u32 {
    let state = v.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// Map a hash to [-1, 1]
#[inline]
pub fn unit_signed(h: u32) -> f32 {
    h as f32 / u32::MAX as f32 * 2.0 - 1.0
}

/// Per-particle noise vector for one sub-step
pub fn hash_noise3(index: u32, tick: u32) -> [f32; 3] {
    let seed = pcg_hash(index.wrapping_add(pcg_hash(tick)));
    [
        unit_signed(pcg_hash(seed)),
        unit_signed(pcg_hash(seed.wrapping_add(1))),
        unit_signed(pcg_hash(seed.wrapping_add(2))),
    ]
}

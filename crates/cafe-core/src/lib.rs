//! Entropy Café Core Engine
//!
//! Coffee and cream particles in a glass: seeding, the particle/grid fluid stepper,
//! mixing metrics, and the GPU compute path that mirrors the CPU reference.

pub mod error;
pub mod gpu;
pub mod sim;
pub mod shaders;

// Re-export main types
pub use error::*;
pub use gpu::*;
pub use sim::*;

// Re-export params from cafe-params
pub use cafe_params::*;

/// Fluid step shader (clear_grid, bin_particles, resolve_grid, simulate, copy_position)
pub fn fluid_sim() -> &'static str {
    include_str!("fluid_sim.wgsl")
}

/// Mixing metrics shader (clear_metrics, bin_metrics, reduce_cells)
pub fn metrics() -> &'static str {
    include_str!("metrics.wgsl")
}

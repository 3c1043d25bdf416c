//! Entropy Café Interactive App
//!
//! Real-time view of the glass: stir, pour and burst cream while the mixing metrics update.

mod camera;
mod renderer;
mod viewer;

use std::path::PathBuf;

use anyhow::Result;
use cafe_params::SimulationConfig;
use clap::Parser;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (defaults are used when it does not exist)
    #[arg(short, long, default_value = "configs/default.yaml")]
    config: PathBuf,

    /// Random seed for the initial particle layout
    #[arg(short, long)]
    seed: Option<u64>,
}

fn load_config(path: &PathBuf) -> Result<SimulationConfig> {
    if !path.exists() {
        log::warn!("{} not found, using the default configuration", path.display());
        return Ok(SimulationConfig::default());
    }
    println!("Loading configuration from {}", path.display());
    Ok(serde_yaml::from_str(&std::fs::read_to_string(path)?)?)
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(seed) = cli.seed {
        config.particles.seed = seed;
    }
    if let Err(e) = config.validate() {
        anyhow::bail!("Invalid configuration: {}", e);
    }
    for w in config.warnings() {
        log::warn!("{}", w);
    }

    println!("Starting Entropy Café Viewer");
    println!(
        "Glass: radius {} height {}, grid {:?}",
        config.glass.radius, config.glass.height, config.fluid.grid_dims
    );
    println!(
        "Particles: {} coffee, {} cream (max {})",
        config.particles.coffee, config.particles.cream, config.particles.max
    );
    println!("Seed: {}", config.particles.seed);

    // Run the interactive viewer
    pollster::block_on(viewer::run_viewer(config))?;

    Ok(())
}

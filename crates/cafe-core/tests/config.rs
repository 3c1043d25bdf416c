use cafe_core::SimulationConfig;

#[test]
fn partial_yaml_falls_back_to_defaults() {
    let yaml = r#"
glass:
  radius: 1.5
particles:
  coffee: 12000
  seed: 7
fluid:
  viscosity: 0.6
stir:
  active: true
"#;
    let config: SimulationConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.particles.coffee, 12_000);
    assert_eq!(config.particles.seed, 7);
    assert_eq!(config.particles.max, 50_000);
    assert_eq!(config.fluid.viscosity, 0.6);
    assert_eq!(config.fluid.grid_dims, [24, 32, 24]);
    assert!(config.stir.active);
    assert_eq!(config.stir.strength, 9.5);
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn shipped_config_loads_and_validates() {
    let text = include_str!("../../../configs/default.yaml");
    let config: SimulationConfig = serde_yaml::from_str(text).unwrap();
    assert_eq!(config.validate(), Ok(()));
    assert!(config.warnings().is_empty(), "{:?}", config.warnings());
    assert_eq!(config, SimulationConfig::default());
}

#[test]
fn invalid_values_are_reported() {
    let config: SimulationConfig = serde_yaml::from_str("fluid:\n  substeps: 0\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.contains("Sub-step"), "{}", err);

    let config: SimulationConfig = serde_yaml::from_str("run:\n  dt: -1.0\n").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn glass_too_short_for_particles_is_rejected() {
    let config: SimulationConfig =
        serde_yaml::from_str("glass:\n  height: 0.05\n  particle_radius: 0.04\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.contains("glass height"), "{}", err);

    let config: SimulationConfig = serde_yaml::from_str("glass:\n  height: 0.2\n  particle_radius: 0.04\n").unwrap();
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn metrics_interval_is_bounded() {
    let config: SimulationConfig = serde_yaml::from_str("metrics:\n  interval: 4294967295\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.contains("Metrics interval"), "{}", err);

    let config: SimulationConfig = serde_yaml::from_str("metrics:\n  interval: 0\n").unwrap();
    assert!(config.validate().is_err());
}

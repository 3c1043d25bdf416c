use cafe_core::sim::FluidControls;
use cafe_core::SimulationConfig;

#[test]
fn pour_accumulator_carries_fractions() {
    let mut controls = FluidControls::new(&SimulationConfig::default());
    controls.set_pouring(true);
    controls.set_pour_rate(650.0);

    let dt = 1.0 / 60.0;
    let first: Vec<u32> = (0..3).map(|_| controls.pour_count(dt, u32::MAX)).collect();
    assert_eq!(first, vec![10, 11, 11]);

    let total: u32 = first.iter().sum::<u32>() + (3..60).map(|_| controls.pour_count(dt, u32::MAX)).sum::<u32>();
    assert!((649..=650).contains(&total), "poured {} in one second", total);
}

#[test]
fn pour_truncates_at_capacity_and_clears_carry() {
    let mut controls = FluidControls::new(&SimulationConfig::default());
    controls.set_pouring(true);
    assert_eq!(controls.pour_count(0.1, 20), 20);
    assert_eq!(controls.pour_count(0.1, 0), 0);
}

#[test]
fn stir_impulse_expires_after_half_a_second() {
    let mut controls = FluidControls::new(&SimulationConfig::default());
    assert_eq!(controls.effective_stir(), (9.5, false));

    controls.stir_once();
    for _ in 0..4 {
        let frame = controls.begin_frame(0.1, 0);
        assert!(frame.stir_active);
        assert_eq!(frame.stir_strength, 15.0);
    }
    let last = controls.begin_frame(0.1, 0);
    assert!(last.stir_active);
    assert!(!controls.impulse_active());
    assert_eq!(controls.effective_stir(), (9.5, false));
}

#[test]
fn impulse_overrides_then_restores_user_stirring() {
    let mut controls = FluidControls::new(&SimulationConfig::default());
    controls.set_stirring(true);
    controls.set_stir_strength(4.0);
    controls.stir_once();
    assert_eq!(controls.effective_stir(), (15.0, true));

    controls.begin_frame(0.6, 0);
    assert_eq!(controls.effective_stir(), (4.0, true));
}

#[test]
fn frames_advance_time_and_tick() {
    let mut controls = FluidControls::new(&SimulationConfig::default());
    let a = controls.begin_frame(0.02, 0);
    let b = controls.begin_frame(0.02, 0);
    assert_eq!((a.tick, b.tick), (0, 1));
    assert_eq!(a.time, 0.0);
    assert!((controls.time() - 0.04).abs() < 1e-6);

    controls.reset();
    assert_eq!(controls.tick(), 0);
    assert_eq!(controls.time(), 0.0);
}

use cafe_core::sim::noise::{hash_noise3, pcg_hash};

#[test]
fn pcg_hash_known_values() {
    assert_eq!(pcg_hash(0), 129_708_002);
    assert_eq!(pcg_hash(1), 2_831_084_092);
    assert_eq!(pcg_hash(42), 1_223_963_391);
}

#[test]
fn noise_stays_in_unit_range() {
    for tick in 0..50 {
        for index in (0..50_000).step_by(997) {
            let n = hash_noise3(index, tick);
            assert!(n.iter().all(|v| (-1.0..=1.0).contains(v)), "{:?}", n);
        }
    }
}

#[test]
fn noise_depends_on_index_and_tick() {
    assert_eq!(hash_noise3(7, 3), hash_noise3(7, 3));
    assert_ne!(hash_noise3(7, 3), hash_noise3(8, 3));
    assert_ne!(hash_noise3(7, 3), hash_noise3(7, 4));
}

//! Exact expectation tests: Markov solver and multi-target composition.

use gacha_core::{
    banner::{Banner, ChainState},
    config::BannerConfig,
    error::GachaError,
    expectation::expected_pulls,
    markov,
    registry::BannerRegistry,
    state::PullState,
};

const TOLERANCE: f64 = 1e-6;

/// Expected pulls for one top drop on the 90-pull character curve.
const CHARACTER_CYCLE: f64 = 62.297_332_039_630_95;

fn banner(config: BannerConfig) -> Banner {
    Banner::new(config).expect("builtin banner")
}

fn zero() -> PullState {
    PullState::new(0, false, 0)
}

fn assert_close(actual: f64, expected: f64, what: &str) {
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "{what}: got {actual:.9}, expected {expected:.9}"
    );
}

#[test]
fn hsr_character_single_target_from_zero() {
    let hsr = banner(BannerConfig::hsr_character());
    let mean = expected_pulls(&hsr, &zero(), 1).unwrap();
    assert_close(mean, 89.552_414_806_969_5, "hsr-character");
    // One cycle, plus a second cycle whenever the first drop is off-target.
    assert_close(mean, CHARACTER_CYCLE * (1.0 + 0.4375), "hsr-character closed form");
}

#[test]
fn simple_banners_single_target_from_zero() {
    let cases = [
        (BannerConfig::zzz_character(), 93.445_998_059_446_48),
        (BannerConfig::hsr_lightcone(), 66.547_594_852_425_39),
        (BannerConfig::zzz_weapon(), 62.318_093_949_330_39),
        (BannerConfig::genshin_weapon(), 87.551_161_508_347_6),
    ];
    for (config, expected) in cases {
        let b = banner(config);
        assert_close(expected_pulls(&b, &zero(), 1).unwrap(), expected, &b.key());
    }
}

#[test]
fn guarantee_and_full_fate_points_cost_one_cycle() {
    let weapon = banner(BannerConfig::genshin_weapon());
    let guaranteed = expected_pulls(&weapon, &PullState::new(0, true, 0), 1).unwrap();
    let full_fate = expected_pulls(&weapon, &PullState::new(0, false, 2), 1).unwrap();
    assert_close(guaranteed, 53.877_637_851_290_81, "guaranteed");
    assert_close(full_fate, guaranteed, "fate points at threshold");
}

#[test]
fn capturing_radiance_changes_only_at_the_threshold() {
    let genshin = banner(BannerConfig::genshin_character());
    let e0 = expected_pulls(&genshin, &PullState::new(0, false, 0), 1).unwrap();
    let e2 = expected_pulls(&genshin, &PullState::new(0, false, 2), 1).unwrap();
    let e3 = expected_pulls(&genshin, &PullState::new(0, false, 3), 1).unwrap();
    assert_close(e0, 93.440_391_299_562_92, "radiance 0");
    assert_close(e2, e0, "radiance 2");
    assert_close(e3, CHARACTER_CYCLE, "radiance 3");
}

#[test]
fn pity_progress_lowers_expectation() {
    let hsr = banner(BannerConfig::hsr_character());
    let fresh = expected_pulls(&hsr, &zero(), 1).unwrap();
    let deep = expected_pulls(&hsr, &PullState::new(80, false, 0), 1).unwrap();
    let last = expected_pulls(&hsr, &PullState::new(89, true, 0), 1).unwrap();
    assert!(deep < fresh);
    assert_close(last, 1.0, "hard pity on guarantee");
}

#[test]
fn single_target_stays_within_sanity_bounds() {
    for config in BannerConfig::builtin() {
        let b = banner(config);
        let mean = expected_pulls(&b, &zero(), 1).unwrap();
        let hard = f64::from(b.config.curve.hard_pity);
        // Somewhere between one average cycle and two full hard-pity cycles.
        assert!(mean > hard * 0.6 && mean < 2.0 * hard, "{}: {mean}", b.key());
    }
}

#[test]
fn simple_banners_add_zero_state_cost_per_extra_target() {
    let zzz = banner(BannerConfig::zzz_character());
    let one = expected_pulls(&zzz, &zero(), 1).unwrap();
    for n in [2, 5, 10] {
        let total = expected_pulls(&zzz, &zero(), n).unwrap();
        assert_close(total, one * f64::from(n), "zzz-character multi-target");
    }

    let weapon = banner(BannerConfig::genshin_weapon());
    let from_guarantee = expected_pulls(&weapon, &PullState::new(0, true, 1), 3).unwrap();
    let g = expected_pulls(&weapon, &PullState::new(0, true, 1), 1).unwrap();
    let z = expected_pulls(&weapon, &zero(), 1).unwrap();
    assert_close(from_guarantee, g + 2.0 * z, "genshin-weapon carry resets");
}

#[test]
fn loss_streak_without_forced_win_matches_simple_composition() {
    let hsr = banner(BannerConfig::hsr_character());
    let one = expected_pulls(&hsr, &zero(), 1).unwrap();
    let ten = expected_pulls(&hsr, &zero(), 10).unwrap();
    assert_close(ten, 10.0 * one, "hsr-character ten targets");
}

#[test]
fn radiance_carryover_shortens_long_runs() {
    let genshin = banner(BannerConfig::genshin_character());
    let one = expected_pulls(&genshin, &zero(), 1).unwrap();
    // Radiance reaches 3 no earlier than after three losses, so the first
    // three targets cost exactly one fresh expectation each.
    let three = expected_pulls(&genshin, &zero(), 3).unwrap();
    assert_close(three, 3.0 * one, "three targets");

    let ten = expected_pulls(&genshin, &zero(), 10).unwrap();
    assert!(ten < 10.0 * one - 1e-3, "radiance should help: {ten} vs {}", 10.0 * one);
    assert!(ten > 10.0 * CHARACTER_CYCLE);
}

#[test]
fn absorption_rows_are_distributions() {
    for config in [BannerConfig::genshin_character(), BannerConfig::hsr_character()] {
        let b = banner(config);
        let tables = b.tables().unwrap();
        let absorption = tables.absorption.as_ref().expect("carryover banner");
        assert_eq!(absorption.ncols(), 4);
        for i in 0..b.state_space().len() {
            let row_sum: f64 = absorption.row(i).iter().sum();
            assert!((row_sum - 1.0).abs() < 1e-9, "{} row {i}: {row_sum}", b.key());
            assert!(absorption.row(i).iter().all(|p| *p >= -1e-12));
        }
    }
    let simple = banner(BannerConfig::zzz_weapon());
    assert!(simple.tables().unwrap().absorption.is_none());
}

#[test]
fn absorption_from_zero_splits_between_win_and_guaranteed_win() {
    let genshin = banner(BannerConfig::genshin_character());
    let tables = genshin.tables().unwrap();
    let start = genshin.state_to_index(ChainState::zero(0));
    let row = tables.absorption_row(start).unwrap();
    let (p_win, p_lose) = genshin.win_lose_probability(false, 0);
    assert_close(row[0], p_win, "won directly");
    assert_close(row[1], p_lose, "won on guarantee after one loss");
    assert_close(row[2] + row[3], 0.0, "unreachable");
}

#[test]
fn transition_system_matches_solution() {
    let b = banner(BannerConfig::hsr_lightcone());
    let (a, rhs) = markov::build_transition_system(&b);
    let tables = b.tables().unwrap();
    let x = nalgebra::DVector::from_vec(tables.expected.clone());
    let residual = (&a * &x - &rhs).amax();
    assert!(residual < 1e-9, "residual {residual}");
}

#[test]
fn tables_are_solved_once_and_shared() {
    let b = banner(BannerConfig::genshin_character());
    let first = b.tables().unwrap() as *const _;
    let again = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| b.tables().unwrap() as *const _ as usize))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    });
    assert!(again.iter().all(|p| *p == first as usize));
}

#[test]
fn zero_targets_is_rejected() {
    let b = banner(BannerConfig::zzz_weapon());
    let err = expected_pulls(&b, &zero(), 0).unwrap_err();
    assert!(matches!(err, GachaError::InvalidTargetCount(0)));
}

#[test]
fn registry_rejects_unknown_keys() {
    let registry = BannerRegistry::builtin().unwrap();
    let err = registry.get("genshin-lightcone").err().expect("unknown key");
    assert!(matches!(err, GachaError::UnknownBanner { .. }));
    assert!(err.is_configuration());
    assert_eq!(registry.keys().count(), 6);
    registry.warm_up().unwrap();
}

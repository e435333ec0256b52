//! Property-based tests for factorlab
//!
//! - Design size and shape invariants
//! - Correction bounds and ordering between methods
//! - Statistical tests never produce NaN or out-of-range values
//! - Run with `ProptestConfig::with_cases(100)`

use factorlab::analysis::{
    adjust_p_values, chi_squared_test, contingency_table, one_way_anova, CorrectionMethod,
};
use factorlab::design::{generate_combinations, trial_slots, Factor, Level};
use proptest::prelude::*;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Factors with 1..=4 levels each
fn arb_factors() -> impl Strategy<Value = Vec<Factor>> {
    proptest::collection::vec(1usize..=4, 0..=4).prop_map(|sizes| {
        sizes
            .iter()
            .enumerate()
            .map(|(f, &k)| {
                Factor::new(
                    format!("f{f}"),
                    (0..k).map(|l| Level::new(format!("l{l}"), format!("prompt {f}.{l}"))).collect(),
                )
            })
            .collect()
    })
}

fn arb_p_values() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(0.0f64..=1.0, 1..30)
}

/// Up to four groups of up to 12 observations
fn arb_groups() -> impl Strategy<Value = Vec<(String, Vec<f64>)>> {
    proptest::collection::vec(proptest::collection::vec(-100.0f64..100.0, 0..12), 0..5).prop_map(
        |groups| {
            groups
                .into_iter()
                .enumerate()
                .map(|(i, values)| (format!("g{i}"), values))
                .collect()
        },
    )
}

/// (level, category) observations over 3 levels and 3 categories
fn arb_observations() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec((0usize..3, 0usize..3), 0..60).prop_map(|cells| {
        cells
            .into_iter()
            .map(|(l, c)| (format!("l{l}"), format!("c{c}")))
            .collect()
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: combination count is the product of level counts
    #[test]
    fn prop_combination_count_is_product(factors in arb_factors()) {
        let combinations = generate_combinations(&factors);
        let expected: usize = factors.iter().map(|f| f.levels().len()).product();
        prop_assert_eq!(combinations.len(), expected);
        for combination in &combinations {
            prop_assert_eq!(combination.len(), factors.len());
        }
    }

    /// Property: every trial slot appears exactly once
    #[test]
    fn prop_trial_slots_cover_grid(combinations in 0usize..10, covariates in 0usize..10) {
        let slots = trial_slots(combinations, covariates);
        prop_assert_eq!(slots.len(), combinations * covariates);
        let unique: std::collections::HashSet<_> = slots.iter().collect();
        prop_assert_eq!(unique.len(), slots.len());
    }

    /// Property: adjusted p-values stay in [p, 1]
    #[test]
    fn prop_adjusted_within_bounds(p in arb_p_values()) {
        for method in [CorrectionMethod::Bonferroni, CorrectionMethod::Holm, CorrectionMethod::BenjaminiHochberg] {
            let adjusted = adjust_p_values(&p, method);
            prop_assert_eq!(adjusted.len(), p.len());
            for (raw, adj) in p.iter().zip(&adjusted) {
                prop_assert!(*adj <= 1.0);
                prop_assert!(*adj >= raw - 1e-12, "{} adjusted below raw with {}", adj, method);
            }
        }
    }

    /// Property: BH ≤ Holm ≤ Bonferroni element-wise
    #[test]
    fn prop_method_ordering(p in arb_p_values()) {
        let bonferroni = adjust_p_values(&p, CorrectionMethod::Bonferroni);
        let holm = adjust_p_values(&p, CorrectionMethod::Holm);
        let bh = adjust_p_values(&p, CorrectionMethod::BenjaminiHochberg);
        for i in 0..p.len() {
            prop_assert!(holm[i] <= bonferroni[i] + 1e-12);
            prop_assert!(bh[i] <= holm[i] + 1e-12);
        }
    }

    /// Property: step-wise methods preserve the order of raw p-values
    #[test]
    fn prop_stepwise_methods_monotone(p in arb_p_values()) {
        for method in [CorrectionMethod::Holm, CorrectionMethod::BenjaminiHochberg] {
            let adjusted = adjust_p_values(&p, method);
            for i in 0..p.len() {
                for j in 0..p.len() {
                    if p[i] < p[j] {
                        prop_assert!(adjusted[i] <= adjusted[j] + 1e-12);
                    }
                }
            }
        }
    }

    /// Property: ANOVA output is always finite and in range
    #[test]
    fn prop_anova_well_formed(groups in arb_groups()) {
        let anova = one_way_anova(&groups);
        prop_assert!(anova.p_value.is_finite());
        prop_assert!((0.0..=1.0).contains(&anova.p_value));
        prop_assert!((0.0..=1.0).contains(&anova.eta_squared));
        prop_assert!(anova.f.is_finite() && anova.f >= 0.0);
        if anova.degenerate {
            prop_assert!((anova.p_value - 1.0).abs() < f64::EPSILON);
        }
    }

    /// Property: chi-squared output is always finite and in range
    #[test]
    fn prop_chi_squared_well_formed(observations in arb_observations()) {
        let levels: Vec<String> = (0..3).map(|l| format!("l{l}")).collect();
        let table = contingency_table(&levels, &observations);
        prop_assert_eq!(table.grand_total, observations.len());

        let test = chi_squared_test(table);
        prop_assert!(test.statistic.is_finite() && test.statistic >= 0.0);
        prop_assert!((0.0..=1.0).contains(&test.p_value));
        prop_assert!((0.0..=1.0).contains(&test.cramers_v));
    }
}

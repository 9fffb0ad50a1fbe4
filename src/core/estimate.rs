use crate::domain::model::{DidEstimate, Group, GroupPivot};
use crate::utils::error::{EtlError, Result};

/// Two-sided 95% normal critical value, the conventional default.
pub const DEFAULT_CONFIDENCE_Z: f64 = 1.96;

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Unbiased sample variance (n - 1 denominator). Callers guarantee n >= 2.
fn sample_variance(values: &[f64], mean: f64) -> f64 {
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Difference-in-differences on per-unit log revenue changes.
///
/// `gamma_hat = mean(treated diffs) − mean(untreated diffs)`, with a
/// large-sample normal interval from the two-sample standard error
/// `sqrt(s1²/n1 + s0²/n0)`. Each group needs at least two units so the
/// sample variances exist.
pub fn diff_in_means(treated: &[f64], untreated: &[f64], z: f64) -> Result<DidEstimate> {
    if !z.is_finite() || z <= 0.0 {
        return Err(EtlError::InvalidConfigValueError {
            field: "confidence_z".to_string(),
            value: z.to_string(),
            reason: "critical value must be a positive finite number".to_string(),
        });
    }

    for (diffs, group) in [(treated, Group::Treated), (untreated, Group::Untreated)] {
        match diffs.len() {
            0 => {
                return Err(EtlError::EmptyGroup {
                    group: group.label().to_string(),
                })
            }
            1 => {
                return Err(EtlError::DegenerateSample {
                    group: group.label().to_string(),
                    units: 1,
                })
            }
            _ => {}
        }
    }

    let r_treated = mean(treated);
    let r_untreated = mean(untreated);
    let gamma_hat = r_treated - r_untreated;

    let var_treated = sample_variance(treated, r_treated);
    let var_untreated = sample_variance(untreated, r_untreated);
    let standard_error =
        (var_treated / treated.len() as f64 + var_untreated / untreated.len() as f64).sqrt();

    Ok(DidEstimate {
        gamma_hat,
        standard_error,
        ci_lower: gamma_hat - z * standard_error,
        ci_upper: gamma_hat + z * standard_error,
        z,
        r_treated,
        r_untreated,
        n_treated: treated.len(),
        n_untreated: untreated.len(),
    })
}

/// Estimate from the two group pivots produced by the aggregation step.
pub fn estimate_from_pivots(
    treated: &GroupPivot,
    untreated: &GroupPivot,
    z: f64,
) -> Result<DidEstimate> {
    diff_in_means(&treated.diffs(), &untreated.diffs(), z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_scenario_matches_hand_computation() {
        let treated = [0.10, 0.20, 0.30];
        let untreated = [0.0, 0.0, 0.0];

        let est = diff_in_means(&treated, &untreated, DEFAULT_CONFIDENCE_Z).unwrap();

        assert!((est.gamma_hat - 0.20).abs() < 1e-12);
        // Treated variance is 0.01, untreated variance is 0, so
        // se = sqrt(0.01 / 3) ≈ 0.057735.
        assert!((est.standard_error - (0.01f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((est.standard_error - 0.0577350269).abs() < 1e-9);
        assert!((est.ci_lower - 0.0868393).abs() < 1e-6);
        assert!((est.ci_upper - 0.3131607).abs() < 1e-6);
        assert_eq!(est.n_treated, 3);
        assert_eq!(est.n_untreated, 3);
    }

    #[test]
    fn identical_groups_estimate_zero() {
        let diffs = [0.05, -0.02, 0.11, 0.0];
        let est = diff_in_means(&diffs, &diffs, DEFAULT_CONFIDENCE_Z).unwrap();

        assert!(est.gamma_hat.abs() < 1e-12);
        // Interval is symmetric around zero.
        assert!((est.ci_lower + est.ci_upper).abs() < 1e-12);
        assert!(est.ci_lower <= 0.0 && est.ci_upper >= 0.0);
    }

    #[test]
    fn estimate_is_invariant_to_row_order() {
        let treated = [0.3, -0.1, 0.2, 0.05];
        let untreated = [0.0, 0.01, -0.02];
        let mut treated_rev = treated;
        treated_rev.reverse();
        let mut untreated_rev = untreated;
        untreated_rev.reverse();

        let a = diff_in_means(&treated, &untreated, DEFAULT_CONFIDENCE_Z).unwrap();
        let b = diff_in_means(&treated_rev, &untreated_rev, DEFAULT_CONFIDENCE_Z).unwrap();

        assert!((a.gamma_hat - b.gamma_hat).abs() < 1e-12);
        assert!((a.standard_error - b.standard_error).abs() < 1e-12);
    }

    #[test]
    fn larger_z_widens_the_interval_around_the_same_center() {
        let treated = [0.10, 0.20, 0.30];
        let untreated = [0.0, 0.01, -0.01];

        let narrow = diff_in_means(&treated, &untreated, 1.96).unwrap();
        let wide = diff_in_means(&treated, &untreated, 2.576).unwrap();

        assert!((narrow.gamma_hat - wide.gamma_hat).abs() < 1e-12);
        assert!(wide.ci_lower < narrow.ci_lower);
        assert!(wide.ci_upper > narrow.ci_upper);
    }

    #[test]
    fn levels_transform_preserves_interval_order() {
        let treated = [0.10, 0.20, 0.30];
        let untreated = [0.0, 0.0, 0.0];

        let est = diff_in_means(&treated, &untreated, DEFAULT_CONFIDENCE_Z).unwrap();
        let levels = est.levels();

        assert!(levels.ci_lower < levels.factor);
        assert!(levels.factor < levels.ci_upper);
        assert!((levels.factor - est.gamma_hat.exp()).abs() < 1e-12);
    }

    #[test]
    fn empty_group_is_rejected() {
        let err = diff_in_means(&[], &[0.0, 0.1], DEFAULT_CONFIDENCE_Z).unwrap_err();
        assert!(matches!(err, EtlError::EmptyGroup { .. }));

        let err = diff_in_means(&[0.0, 0.1], &[], DEFAULT_CONFIDENCE_Z).unwrap_err();
        assert!(matches!(err, EtlError::EmptyGroup { .. }));
    }

    #[test]
    fn single_unit_group_is_rejected() {
        let err = diff_in_means(&[0.2], &[0.0, 0.1], DEFAULT_CONFIDENCE_Z).unwrap_err();
        match err {
            EtlError::DegenerateSample { group, units } => {
                assert_eq!(group, "treated");
                assert_eq!(units, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_positive_z_is_rejected() {
        for bad in [0.0, -1.96, f64::NAN, f64::INFINITY] {
            let err = diff_in_means(&[0.1, 0.2], &[0.0, 0.0], bad).unwrap_err();
            assert!(matches!(err, EtlError::InvalidConfigValueError { .. }));
        }
    }
}

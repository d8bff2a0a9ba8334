//! Fixed-effect absorption by alternating projections
//!
//! Each column is demeaned within the levels of every factor in turn until
//! the adjustments vanish. One factor converges in a single sweep; two
//! factors on an unbalanced panel need several.

use rayon::prelude::*;

use crate::algorithm::regression::design::Factor;
use crate::error::{Result, StudyError};

/// Convergence tolerance on the largest mean removed in a sweep
pub const ABSORB_TOLERANCE: f64 = 1e-10;

/// Upper bound on sweeps per column
pub const MAX_SWEEPS: usize = 10_000;

/// Demean `columns` in place within every factor
pub fn demean(columns: &mut [Vec<f64>], factors: &[Factor], weights: Option<&[f64]>) -> Result<()> {
    if factors.is_empty() {
        return Ok(());
    }

    let denominators: Vec<Vec<f64>> = factors
        .iter()
        .map(|f| {
            let mut den = vec![0.0; f.levels];
            for (i, &c) in f.codes.iter().enumerate() {
                den[c] += weights.map_or(1.0, |w| w[i]);
            }
            den
        })
        .collect();

    columns
        .par_iter_mut()
        .map(|col| demean_column(col, factors, &denominators, weights))
        .collect::<Result<Vec<()>>>()?;
    Ok(())
}

fn demean_column(
    col: &mut [f64],
    factors: &[Factor],
    denominators: &[Vec<f64>],
    weights: Option<&[f64]>,
) -> Result<()> {
    let scale = 1.0 + col.iter().fold(0.0_f64, |m, v| m.max(v.abs()));

    for sweep in 0..MAX_SWEEPS {
        let mut largest = 0.0_f64;
        for (factor, den) in factors.iter().zip(denominators) {
            let mut sums = vec![0.0; factor.levels];
            for (i, &c) in factor.codes.iter().enumerate() {
                sums[c] += weights.map_or(1.0, |w| w[i]) * col[i];
            }
            let means: Vec<f64> = sums
                .iter()
                .zip(den)
                .map(|(s, d)| if *d > 0.0 { s / d } else { 0.0 })
                .collect();
            for (i, &c) in factor.codes.iter().enumerate() {
                col[i] -= means[c];
            }
            largest = means.iter().fold(largest, |m, v| m.max(v.abs()));
        }
        if factors.len() == 1 || largest <= ABSORB_TOLERANCE * scale {
            log::trace!("absorbed fixed effects in {} sweeps", sweep + 1);
            return Ok(());
        }
    }

    Err(StudyError::regression(format!(
        "fixed effects did not converge within {MAX_SWEEPS} sweeps"
    )))
}

/// Rank contributed by the intercept plus the absorbed dummies
///
/// Exact for one or two factors; for two it subtracts the connected
/// components of the bipartite level graph. More factors are assumed to
/// share a single connected component.
#[must_use]
pub fn absorbed_rank(factors: &[Factor]) -> usize {
    match factors {
        [] => 1,
        [one] => one.levels,
        [a, b] => a.levels + b.levels - components(a, b),
        many => {
            let total: usize = many.iter().map(|f| f.levels).sum();
            total.saturating_sub(many.len() - 1)
        }
    }
}

fn components(a: &Factor, b: &Factor) -> usize {
    let mut parent: Vec<usize> = (0..a.levels + b.levels).collect();

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for (&ca, &cb) in a.codes.iter().zip(&b.codes) {
        let ra = find(&mut parent, ca);
        let rb = find(&mut parent, a.levels + cb);
        if ra != rb {
            parent[ra] = rb;
        }
    }

    (0..parent.len()).filter(|&x| find(&mut parent, x) == x).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_factor_removes_group_means() {
        let f = Factor::from_keys("g", [0, 0, 1, 1]);
        let mut cols = vec![vec![1.0, 3.0, 10.0, 20.0]];
        demean(&mut cols, &[f], None).unwrap();
        assert_eq!(cols[0], vec![-1.0, 1.0, -5.0, 5.0]);
    }

    #[test]
    fn weighted_means_use_weights() {
        let f = Factor::constant(2);
        let mut cols = vec![vec![0.0, 4.0]];
        demean(&mut cols, &[f], Some(&[3.0, 1.0])).unwrap();
        assert!((cols[0][0] + 1.0).abs() < 1e-12);
        assert!((cols[0][1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn two_factors_on_unbalanced_panel_converge() {
        // unit x time with one cell missing
        let units = [0, 0, 0, 1, 1, 2, 2, 2];
        let times = [0, 1, 2, 0, 1, 0, 1, 2];
        let a = Factor::from_keys("unit", units);
        let b = Factor::from_keys("time", times);
        // purely additive column must vanish
        let unit_effect = [1.0, 5.0, -2.0];
        let time_effect = [0.0, 0.5, 3.0];
        let mut cols = vec![
            units
                .iter()
                .zip(&times)
                .map(|(&u, &t)| unit_effect[u] + time_effect[t])
                .collect::<Vec<f64>>(),
        ];
        demean(&mut cols, &[a, b], None).unwrap();
        assert!(cols[0].iter().all(|v| v.abs() < 1e-8));
    }

    #[test]
    fn rank_counts_connected_components() {
        let a = Factor::from_keys("unit", [0, 0, 1, 1]);
        let b = Factor::from_keys("time", [0, 1, 0, 1]);
        assert_eq!(absorbed_rank(&[a.clone(), b]), 3);

        // two disconnected blocks
        let c = Factor::from_keys("time", [0, 0, 1, 1]);
        assert_eq!(absorbed_rank(&[a.clone(), c]), 2);

        assert_eq!(absorbed_rank(&[a]), 2);
        assert_eq!(absorbed_rank(&[]), 1);
    }
}

//! Least squares with absorbed fixed effects and clustered covariance

use rustc_hash::FxHashMap;

use crate::algorithm::regression::absorb::{absorbed_rank, demean};
use crate::algorithm::regression::design::{Design, Factor};
use crate::algorithm::regression::inference::{Z_95, normal_p_value};
use crate::algorithm::regression::solve::{Cholesky, mat_vec, sandwich};
use crate::error::{Result, StudyError};
use crate::models::Estimate;

/// Covariance estimator used for the standard errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CovarianceKind {
    /// Homoskedastic, `σ² (X'X)⁻¹`
    Classical,
    /// Cluster-robust sandwich with small-sample correction
    Clustered { clusters: usize },
}

/// An estimated model
#[derive(Debug, Clone)]
pub struct Fit {
    pub outcome: String,
    pub coefficients: Vec<Estimate>,
    /// Regressors dropped as collinear with earlier ones or the fixed effects
    pub dropped: Vec<String>,
    pub n_obs: usize,
    /// Full-model rank: kept regressors plus intercept and absorbed dummies
    pub df_model: usize,
    pub covariance: CovarianceKind,
    /// Centered R² of the full model, fixed effects included
    pub r_squared: f64,
    /// R² of the demeaned regression
    pub r_squared_within: f64,
    pub ssr: f64,
}

impl Fit {
    /// Look up a coefficient by term name
    pub fn coefficient(&self, term: &str) -> Result<&Estimate> {
        self.coefficients
            .iter()
            .find(|c| c.term == term)
            .ok_or_else(|| StudyError::MissingCoefficient {
                name: term.to_string(),
                available: self
                    .coefficients
                    .iter()
                    .map(|c| c.term.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Number of clusters, or 0 under classical covariance
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        match self.covariance {
            CovarianceKind::Clustered { clusters } => clusters,
            CovarianceKind::Classical => 0,
        }
    }
}

/// Estimate `design` by (weighted) least squares
///
/// Fixed effects are absorbed by demeaning, so only the regressor block is
/// solved directly. Without fixed effects an intercept is absorbed instead.
pub fn fit(design: &Design) -> Result<Fit> {
    design.validate()?;
    let n = design.n_obs();
    let k = design.regressors.len();
    let weights = design.weights.as_deref();
    let w = |i: usize| weights.map_or(1.0, |w| w[i]);

    let intercept;
    let factors: &[Factor] = if design.fixed_effects.is_empty() {
        intercept = [Factor::constant(n)];
        &intercept
    } else {
        &design.fixed_effects
    };

    let reference: Vec<f64> = design
        .regressors
        .iter()
        .map(|(_, col)| col.iter().enumerate().map(|(i, v)| w(i) * v * v).sum())
        .collect();

    // y first, then each regressor
    let mut columns: Vec<Vec<f64>> = std::iter::once(design.y.clone())
        .chain(design.regressors.iter().map(|(_, col)| col.clone()))
        .collect();
    demean(&mut columns, factors, weights)?;
    let (y_dm, x_dm) = columns.split_first().ok_or_else(|| {
        StudyError::regression("empty design after absorption")
    })?;

    let mut gram = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for a in 0..k {
        for b in 0..=a {
            let s: f64 = (0..n).map(|i| w(i) * x_dm[a][i] * x_dm[b][i]).sum();
            gram[a][b] = s;
            gram[b][a] = s;
        }
        xty[a] = (0..n).map(|i| w(i) * x_dm[a][i] * y_dm[i]).sum();
    }

    let chol = Cholesky::with_drops(&gram, &reference);
    if chol.kept.is_empty() {
        return Err(StudyError::regression(format!(
            "{}: every regressor is collinear with the fixed effects",
            design.outcome
        )));
    }
    let dropped: Vec<String> = chol
        .dropped
        .iter()
        .map(|&j| design.regressors[j].0.clone())
        .collect();
    if !dropped.is_empty() {
        log::debug!("{}: dropped collinear {}", design.outcome, dropped.join(", "));
    }

    let bread = chol.inverse();
    let xty_kept: Vec<f64> = chol.kept.iter().map(|&j| xty[j]).collect();
    let beta = mat_vec(&bread, &xty_kept);
    if beta.iter().any(|b| !b.is_finite()) {
        return Err(StudyError::regression(format!(
            "{}: non-finite coefficients",
            design.outcome
        )));
    }

    let residuals: Vec<f64> = (0..n)
        .map(|i| {
            y_dm[i]
                - chol
                    .kept
                    .iter()
                    .zip(&beta)
                    .map(|(&j, b)| b * x_dm[j][i])
                    .sum::<f64>()
        })
        .collect();

    let total_weight: f64 = (0..n).map(w).sum();
    let y_mean = (0..n).map(|i| w(i) * design.y[i]).sum::<f64>() / total_weight;
    let ssr: f64 = (0..n).map(|i| w(i) * residuals[i] * residuals[i]).sum();
    let tss: f64 = (0..n).map(|i| w(i) * (design.y[i] - y_mean).powi(2)).sum();
    let tss_within: f64 = (0..n).map(|i| w(i) * y_dm[i] * y_dm[i]).sum();

    let df_model = chol.kept.len() + absorbed_rank(factors);
    if n <= df_model {
        return Err(StudyError::regression(format!(
            "{}: {n} observations for {df_model} parameters",
            design.outcome
        )));
    }

    let (vcov, covariance) = match &design.clusters {
        Some(clusters) => {
            let g = clusters.levels;
            if g < 2 {
                return Err(StudyError::regression(format!(
                    "{}: clustered covariance needs at least two clusters",
                    design.outcome
                )));
            }
            let kk = chol.kept.len();
            let mut scores: FxHashMap<usize, Vec<f64>> = FxHashMap::default();
            for i in 0..n {
                let s = scores.entry(clusters.codes[i]).or_insert_with(|| vec![0.0; kk]);
                let wu = w(i) * residuals[i];
                for (slot, &j) in s.iter_mut().zip(&chol.kept) {
                    *slot += wu * x_dm[j][i];
                }
            }
            let mut meat = vec![vec![0.0; kk]; kk];
            for s in scores.values() {
                for a in 0..kk {
                    for b in 0..kk {
                        meat[a][b] += s[a] * s[b];
                    }
                }
            }
            let (gf, nf, kf) = (g as f64, n as f64, df_model as f64);
            let correction = gf / (gf - 1.0) * (nf - 1.0) / (nf - kf);
            let mut v = sandwich(&bread, &meat);
            v.iter_mut().flatten().for_each(|x| *x *= correction);
            (v, CovarianceKind::Clustered { clusters: g })
        }
        None => {
            let sigma2 = ssr / (n - df_model) as f64;
            let v = bread
                .iter()
                .map(|row| row.iter().map(|x| x * sigma2).collect())
                .collect();
            (v, CovarianceKind::Classical)
        }
    };

    let coefficients = chol
        .kept
        .iter()
        .enumerate()
        .map(|(r, &j)| {
            let coef = beta[r];
            let std_error = vcov[r][r].max(0.0).sqrt();
            let z = coef / std_error;
            Estimate {
                term: design.regressors[j].0.clone(),
                coef,
                std_error,
                z,
                p_value: normal_p_value(z),
                ci_lower: coef - Z_95 * std_error,
                ci_upper: coef + Z_95 * std_error,
            }
        })
        .collect();

    Ok(Fit {
        outcome: design.outcome.clone(),
        coefficients,
        dropped,
        n_obs: n,
        df_model,
        covariance,
        r_squared: if tss > 0.0 { 1.0 - ssr / tss } else { f64::NAN },
        r_squared_within: if tss_within > 0.0 {
            1.0 - ssr / tss_within
        } else {
            f64::NAN
        },
        ssr,
    })
}

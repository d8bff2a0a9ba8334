//! Regression design: outcome, regressors, absorbed factors, clusters

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::error::{Result, StudyError};

/// A categorical variable encoded as dense level codes `0..levels`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Factor {
    pub name: String,
    pub codes: Vec<usize>,
    pub levels: usize,
}

impl Factor {
    /// Encode keys in order of first appearance
    pub fn from_keys<K, I>(name: impl Into<String>, keys: I) -> Self
    where
        K: Hash + Eq,
        I: IntoIterator<Item = K>,
    {
        let mut index: FxHashMap<K, usize> = FxHashMap::default();
        let codes = keys
            .into_iter()
            .map(|k| {
                let next = index.len();
                *index.entry(k).or_insert(next)
            })
            .collect();
        Self {
            name: name.into(),
            codes,
            levels: index.len(),
        }
    }

    /// Number of observations per level
    #[must_use]
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.levels];
        for &c in &self.codes {
            counts[c] += 1;
        }
        counts
    }

    /// Single-level factor; absorbing it removes the mean (the intercept)
    #[must_use]
    pub fn constant(n: usize) -> Self {
        Self {
            name: "Intercept".to_string(),
            codes: vec![0; n],
            levels: usize::from(n > 0),
        }
    }
}

/// Everything needed to estimate one linear model
#[derive(Debug, Clone)]
pub struct Design {
    pub outcome: String,
    pub y: Vec<f64>,
    pub regressors: Vec<(String, Vec<f64>)>,
    pub weights: Option<Vec<f64>>,
    pub fixed_effects: Vec<Factor>,
    pub clusters: Option<Factor>,
}

impl Design {
    #[must_use]
    pub fn new(outcome: impl Into<String>, y: Vec<f64>) -> Self {
        Self {
            outcome: outcome.into(),
            y,
            regressors: Vec::new(),
            weights: None,
            fixed_effects: Vec::new(),
            clusters: None,
        }
    }

    #[must_use]
    pub fn regressor(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.regressors.push((name.into(), values));
        self
    }

    /// Absorb a factor as fixed effects
    #[must_use]
    pub fn absorb(mut self, factor: Factor) -> Self {
        self.fixed_effects.push(factor);
        self
    }

    /// Cluster the covariance on a factor
    #[must_use]
    pub fn cluster(mut self, factor: Factor) -> Self {
        self.clusters = Some(factor);
        self
    }

    /// Estimate by weighted least squares
    #[must_use]
    pub fn weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    #[must_use]
    pub fn n_obs(&self) -> usize {
        self.y.len()
    }

    /// Check lengths, finiteness and weights
    pub fn validate(&self) -> Result<()> {
        let n = self.y.len();
        if n == 0 {
            return Err(StudyError::regression(format!("{}: no observations", self.outcome)));
        }
        if self.regressors.is_empty() {
            return Err(StudyError::regression(format!("{}: no regressors", self.outcome)));
        }
        if self.y.iter().any(|v| !v.is_finite()) {
            return Err(StudyError::regression(format!("{}: non-finite outcome", self.outcome)));
        }
        for (name, col) in &self.regressors {
            if col.len() != n {
                return Err(StudyError::regression(format!(
                    "{name}: {} values for {n} observations",
                    col.len()
                )));
            }
            if col.iter().any(|v| !v.is_finite()) {
                return Err(StudyError::regression(format!("{name}: non-finite values")));
            }
        }
        if let Some(w) = &self.weights {
            if w.len() != n {
                return Err(StudyError::regression(format!(
                    "{} weights for {n} observations",
                    w.len()
                )));
            }
            if w.iter().any(|v| !v.is_finite() || *v <= 0.0) {
                return Err(StudyError::regression("weights must be positive and finite"));
            }
        }
        for factor in self.fixed_effects.iter().chain(self.clusters.iter()) {
            if factor.codes.len() != n {
                return Err(StudyError::regression(format!(
                    "factor {}: {} codes for {n} observations",
                    factor.name,
                    factor.codes.len()
                )));
            }
        }
        Ok(())
    }
}

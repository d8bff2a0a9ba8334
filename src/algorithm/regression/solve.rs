//! Dense symmetric solves for the (small) regressor block

/// Relative pivot size under which a column counts as collinear
pub const COLLINEARITY_TOLERANCE: f64 = 1e-9;

/// Cholesky factor of the non-collinear part of a Gram matrix
#[derive(Debug, Clone)]
pub struct Cholesky {
    /// Lower-triangular rows; row `r` has `r + 1` entries
    lower: Vec<Vec<f64>>,
    /// Indices into the original matrix of the kept columns
    pub kept: Vec<usize>,
    /// Indices of columns dropped as collinear
    pub dropped: Vec<usize>,
}

impl Cholesky {
    /// Factor `gram`, dropping columns in order when their pivot is negligible
    ///
    /// `reference[j]` is the squared norm of column `j` before fixed effects
    /// were absorbed; a pivot below `COLLINEARITY_TOLERANCE * reference[j]`
    /// means the column is explained by earlier columns or the absorbed
    /// effects.
    #[must_use]
    pub fn with_drops(gram: &[Vec<f64>], reference: &[f64]) -> Self {
        let mut lower: Vec<Vec<f64>> = Vec::new();
        let mut kept = Vec::new();
        let mut dropped = Vec::new();

        for j in 0..gram.len() {
            let mut row: Vec<f64> = Vec::with_capacity(kept.len() + 1);
            for (r, &p) in kept.iter().enumerate() {
                let partial: f64 = (0..r).map(|q| row[q] * lower[r][q]).sum();
                row.push((gram[j][p] - partial) / lower[r][r]);
            }
            let pivot = gram[j][j] - row.iter().map(|v| v * v).sum::<f64>();
            if pivot > 0.0 && pivot > COLLINEARITY_TOLERANCE * reference[j] {
                row.push(pivot.sqrt());
                lower.push(row);
                kept.push(j);
            } else {
                dropped.push(j);
            }
        }

        Self { lower, kept, dropped }
    }

    /// Inverse of the kept block, `(L Lᵀ)⁻¹`
    #[must_use]
    pub fn inverse(&self) -> Vec<Vec<f64>> {
        let k = self.lower.len();
        // L⁻¹ by forward substitution, column by column
        let mut linv = vec![vec![0.0; k]; k];
        for c in 0..k {
            linv[c][c] = 1.0 / self.lower[c][c];
            for r in c + 1..k {
                let s: f64 = (c..r).map(|q| self.lower[r][q] * linv[q][c]).sum();
                linv[r][c] = -s / self.lower[r][r];
            }
        }
        // (L⁻¹)ᵀ L⁻¹
        let mut inv = vec![vec![0.0; k]; k];
        for i in 0..k {
            for j in 0..=i {
                let s: f64 = (i..k).map(|q| linv[q][i] * linv[q][j]).sum();
                inv[i][j] = s;
                inv[j][i] = s;
            }
        }
        inv
    }
}

/// Matrix-vector product
#[must_use]
pub fn mat_vec(m: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    m.iter()
        .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
        .collect()
}

/// `a · b · a` for symmetric `a` and `b`
#[must_use]
pub fn sandwich(bread: &[Vec<f64>], meat: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let k = bread.len();
    let mut half = vec![vec![0.0; k]; k];
    for i in 0..k {
        for j in 0..k {
            half[i][j] = (0..k).map(|q| bread[i][q] * meat[q][j]).sum();
        }
    }
    let mut out = vec![vec![0.0; k]; k];
    for i in 0..k {
        for j in 0..k {
            out[i][j] = (0..k).map(|q| half[i][q] * bread[q][j]).sum();
        }
    }
    out
}

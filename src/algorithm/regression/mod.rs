//! Linear regression with absorbed fixed effects
//!
//! Designs mirror the regression formulas of the policy models,
//! e.g. `y ~ post + post:treated + C(fips) + C(year)`: interaction terms are
//! precomputed regressor columns and each `C(..)` becomes an absorbed
//! [`Factor`]. Coefficients on the regressors equal those of the full dummy
//! regression; standard errors are clustered when a cluster factor is set.

pub mod absorb;
pub mod design;
pub mod fit;
pub mod inference;
pub mod line;
pub mod solve;

pub use design::{Design, Factor};
pub use fit::{CovarianceKind, Fit, fit};
pub use inference::{Z_95, normal_p_value};
pub use line::{LineFit, line_fit};

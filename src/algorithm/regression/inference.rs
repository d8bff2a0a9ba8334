//! Reference-distribution helpers

/// Two-sided 95% normal critical value
pub const Z_95: f64 = 1.959_963_984_540_054;

/// Two-sided p-value of a z statistic under the standard normal
#[must_use]
pub fn normal_p_value(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    libm::erfc(z.abs() / std::f64::consts::SQRT_2)
}

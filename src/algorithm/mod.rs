//! Panel construction, regression and the policy analyses built on them

pub mod did;
pub mod panel;
pub mod regression;

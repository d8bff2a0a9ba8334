//! Record types shared across the pipeline

pub mod estimates;
pub mod panel;
pub mod sources;

pub use estimates::{
    Conclusion, DidEstimate, DidTableRow, Estimate, Group, Period, PrePostRow, RobustnessCheck,
    RobustnessResult, RobustnessRow, SegmentPoint, TrendPoint, VariantEstimate,
};
pub use panel::{CountyYear, Outcome, PER_CAPITA_SCALE, per_100k};
pub use sources::{
    ArcosCountyYear, ArcosTransaction, CrosswalkRow, MortalityRecord, PopulationRecord,
};

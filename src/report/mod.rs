//! Result tables, terminal summaries and panel inspection

pub mod console;
pub mod inspect;
pub mod tables;

pub use console::{did_summary_table, pre_post_table, robustness_table};
pub use inspect::{ColumnStats, PanelProfile, inspect_parquet};
pub use tables::{
    write_all, write_did_results, write_pre_post, write_robustness, write_summary_json,
    write_trends,
};

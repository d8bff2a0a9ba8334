//! Plain-text summaries for the terminal

use crate::models::{DidEstimate, PrePostRow, RobustnessResult};

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "NaN".to_string(), |v| format!("{v:.3}"))
}

/// Main DiD results, one line per state and outcome
#[must_use]
pub fn did_summary_table(estimates: &[DidEstimate]) -> String {
    let mut output = String::new();
    output.push_str(&"=".repeat(96));
    output.push_str("\nFINAL REGRESSION RESULTS SUMMARY\n");
    output.push_str(&"=".repeat(96));
    output.push('\n');
    output.push_str(&format!(
        "{:<5} | {:<32} | {:>16} | {:>8} | {:>16} | {:>8}\n",
        "State", "Outcome", "M1_DiD_Level", "M1_Pval", "M2_DiD_Slope", "M2_Pval"
    ));
    output.push_str(&format!(
        "{}|{}|{}|{}|{}|{}\n",
        "-".repeat(6),
        "-".repeat(34),
        "-".repeat(18),
        "-".repeat(10),
        "-".repeat(18),
        "-".repeat(9)
    ));

    for e in estimates {
        output.push_str(&format!(
            "{:<5} | {:<32} | {:>16} | {:>8} | {:>16} | {:>8}\n",
            e.state,
            truncate_string(e.outcome.label(), 32),
            cell(e.level.as_ref().map(|x| x.coef)),
            cell(e.level.as_ref().map(|x| x.p_value)),
            cell(e.slope_change.as_ref().map(|x| x.coef)),
            cell(e.slope_change.as_ref().map(|x| x.p_value)),
        ));
    }
    output
}

/// Robustness verdicts with the estimates behind them
#[must_use]
pub fn robustness_table(results: &[RobustnessResult]) -> String {
    let mut output = String::from("ROBUSTNESS CHECKS\n");
    for r in results {
        output.push_str(&format!("\n{} ({}): {:?}\n", r.check.title(), r.state, r.conclusion));
        for v in &r.variants {
            output.push_str(&format!(
                "  {:<28} {:<26} coef={:>14.3} p={:.3} n={}\n",
                truncate_string(&v.variant, 28),
                v.outcome.column(),
                v.estimate.coef,
                v.estimate.p_value,
                v.n_obs
            ));
        }
    }
    output
}

#[must_use]
pub fn pre_post_table(rows: &[PrePostRow]) -> String {
    let mut output = format!(
        "{:<6} | {:<15} | {:<6} | {:>13} | {:>17} | {:>13}\n",
        "State", "Group", "Period", "n_state_years", "mean_total_deaths", "mean_rate_100k"
    );
    for r in rows {
        output.push_str(&format!(
            "{:<6} | {:<15} | {:<6} | {:>13} | {:>17.3} | {:>13.3}\n",
            r.policy_state_abbrev,
            format!("{:?}", r.group),
            format!("{:?}", r.period),
            r.n_state_years,
            r.mean_total_deaths,
            r.mean_death_rate_per_100k
        ));
    }
    output
}

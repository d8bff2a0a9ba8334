//! Pre/post mean mortality for the policy state and its controls

use std::collections::BTreeMap;

use crate::config::PolicyCase;
use crate::models::{CountyYear, Group, Period, PrePostRow, per_100k};

/// Deaths and population summed over the counties of one state in one year
#[derive(Debug, Clone, PartialEq)]
pub struct StateYear {
    pub state_abbrev: String,
    pub year: i32,
    pub total_deaths: f64,
    pub total_population: f64,
    pub death_rate_per_100k: Option<f64>,
}

/// Sum the panel to state-year totals; missing deaths count as zero
#[must_use]
pub fn state_year_totals(panel: &[CountyYear]) -> Vec<StateYear> {
    let mut totals: BTreeMap<(&str, i32), (f64, f64)> = BTreeMap::new();
    for row in panel {
        let entry = totals.entry((row.state_abbrev.as_str(), row.year)).or_default();
        entry.0 += row.drug_deaths.unwrap_or(0.0);
        entry.1 += row.population;
    }
    totals
        .into_iter()
        .map(|((state, year), (deaths, population))| StateYear {
            state_abbrev: state.to_string(),
            year,
            total_deaths: deaths,
            total_population: population,
            death_rate_per_100k: per_100k(Some(deaths), population),
        })
        .collect()
}

/// Mean state-year deaths and rates by group and period
#[must_use]
pub fn pre_post_summary(panel: &[CountyYear], case: &PolicyCase) -> Vec<PrePostRow> {
    let mut cells: BTreeMap<(Group, Period), Vec<StateYear>> = BTreeMap::new();
    for sy in state_year_totals(panel) {
        let group = if sy.state_abbrev == case.policy_state {
            Group::PolicyState
        } else {
            Group::ControlStates
        };
        let period = if sy.year < case.policy_year {
            Period::Pre
        } else {
            Period::Post
        };
        cells.entry((group, period)).or_default().push(sy);
    }

    cells
        .into_iter()
        .map(|((group, period), years)| {
            let n = years.len() as f64;
            let rates: Vec<f64> = years.iter().filter_map(|s| s.death_rate_per_100k).collect();
            PrePostRow {
                policy_state_abbrev: case.policy_state.clone(),
                group,
                period,
                n_state_years: years.len(),
                mean_total_deaths: years.iter().map(|s| s.total_deaths).sum::<f64>() / n,
                mean_death_rate_per_100k: if rates.is_empty() {
                    f64::NAN
                } else {
                    rates.iter().sum::<f64>() / rates.len() as f64
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fips: &str, state: &str, year: i32, deaths: f64, population: f64) -> CountyYear {
        CountyYear {
            fips: fips.into(),
            year,
            state_abbrev: state.into(),
            county_name: None,
            population,
            drug_deaths: Some(deaths),
            death_imputed: false,
            opioid_shipments_mme: None,
            total_pills: None,
            drug_death_rate_per_100k: None,
            mme_per_100k: None,
            is_pre: None,
        }
    }

    #[test]
    fn sums_counties_before_averaging_years() {
        let panel = vec![
            row("12001", "FL", 2009, 10.0, 50_000.0),
            row("12003", "FL", 2009, 30.0, 50_000.0),
            row("12001", "FL", 2010, 20.0, 50_000.0),
            row("12001", "FL", 2011, 40.0, 50_000.0),
            row("13001", "GA", 2009, 5.0, 100_000.0),
            row("13001", "GA", 2010, 7.0, 100_000.0),
        ];
        let summary = pre_post_summary(&panel, &PolicyCase::florida());
        assert_eq!(summary.len(), 4);

        // controls first, post before pre
        assert_eq!((summary[0].group, summary[0].period), (Group::ControlStates, Period::Post));
        assert_eq!(summary[0].mean_total_deaths, 7.0);

        let fl_pre = &summary[3];
        assert_eq!((fl_pre.group, fl_pre.period), (Group::PolicyState, Period::Pre));
        assert_eq!(fl_pre.n_state_years, 1);
        assert_eq!(fl_pre.mean_total_deaths, 40.0);
        assert!((fl_pre.mean_death_rate_per_100k - 40.0).abs() < 1e-9);

        let fl_post = &summary[2];
        assert_eq!(fl_post.n_state_years, 2);
        assert_eq!(fl_post.mean_total_deaths, 30.0);
        assert!((fl_post.mean_death_rate_per_100k - 60.0).abs() < 1e-9);
    }
}

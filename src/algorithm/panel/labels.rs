//! Treatment labels and factor codes for the DiD designs

use crate::algorithm::regression::Factor;
use crate::models::CountyYear;

/// Indicator columns derived from a treated state and a policy year
#[derive(Debug, Clone, PartialEq)]
pub struct DidLabels {
    pub treated: Vec<f64>,
    pub post: Vec<f64>,
    /// `year - policy_year`
    pub year_c: Vec<f64>,
}

impl DidLabels {
    #[must_use]
    pub fn len(&self) -> usize {
        self.treated.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.treated.is_empty()
    }

    /// `post * treated`
    #[must_use]
    pub fn post_treated(&self) -> Vec<f64> {
        product(&[&self.post, &self.treated])
    }

    /// `year_c * treated`
    #[must_use]
    pub fn year_c_treated(&self) -> Vec<f64> {
        product(&[&self.year_c, &self.treated])
    }

    /// `post * year_c`
    #[must_use]
    pub fn post_year_c(&self) -> Vec<f64> {
        product(&[&self.post, &self.year_c])
    }

    /// `post * year_c * treated`
    #[must_use]
    pub fn post_year_c_treated(&self) -> Vec<f64> {
        product(&[&self.post, &self.year_c, &self.treated])
    }
}

fn product(columns: &[&Vec<f64>]) -> Vec<f64> {
    let n = columns.first().map_or(0, |c| c.len());
    (0..n).map(|i| columns.iter().map(|c| c[i]).product()).collect()
}

fn indicator(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

/// Label rows as treated/post relative to `treated_state` and `policy_year`
#[must_use]
pub fn label(rows: &[&CountyYear], treated_state: &str, policy_year: i32) -> DidLabels {
    DidLabels {
        treated: rows
            .iter()
            .map(|r| indicator(r.state_abbrev == treated_state))
            .collect(),
        post: rows.iter().map(|r| indicator(r.year >= policy_year)).collect(),
        year_c: rows.iter().map(|r| f64::from(r.year - policy_year)).collect(),
    }
}

/// County factor, used both as fixed effect and as cluster
#[must_use]
pub fn county_factor(rows: &[&CountyYear]) -> Factor {
    Factor::from_keys("fips", rows.iter().map(|r| r.fips.as_str()))
}

#[must_use]
pub fn year_factor(rows: &[&CountyYear]) -> Factor {
    Factor::from_keys("year", rows.iter().map(|r| r.year))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fips: &str, state: &str, year: i32) -> CountyYear {
        CountyYear {
            fips: fips.into(),
            year,
            state_abbrev: state.into(),
            county_name: None,
            population: 1000.0,
            drug_deaths: Some(1.0),
            death_imputed: false,
            opioid_shipments_mme: None,
            total_pills: None,
            drug_death_rate_per_100k: None,
            mme_per_100k: None,
            is_pre: None,
        }
    }

    #[test]
    fn labels_and_interactions() {
        let rows = [
            row("12001", "FL", 2009),
            row("12001", "FL", 2011),
            row("13001", "GA", 2011),
        ];
        let refs: Vec<&CountyYear> = rows.iter().collect();
        let l = label(&refs, "FL", 2010);
        assert_eq!(l.treated, vec![1.0, 1.0, 0.0]);
        assert_eq!(l.post, vec![0.0, 1.0, 1.0]);
        assert_eq!(l.year_c, vec![-1.0, 1.0, 1.0]);
        assert_eq!(l.post_treated(), vec![0.0, 1.0, 0.0]);
        assert_eq!(l.post_year_c_treated(), vec![0.0, 1.0, 0.0]);
        assert_eq!(l.year_c_treated(), vec![-1.0, 1.0, 0.0]);

        assert_eq!(county_factor(&refs).levels, 2);
        assert_eq!(year_factor(&refs).levels, 2);
    }
}

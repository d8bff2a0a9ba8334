//! ARCOS shipment transactions aggregated to county-years
//!
//! The DEA extract identifies buyers by state and county name only, so a
//! crosswalk maps (state, county name) to FIPS. Transaction files are large;
//! they are streamed through an [`ArcosAggregator`] rather than collected.

use std::ops::RangeInclusive;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::models::{ArcosCountyYear, ArcosTransaction, CrosswalkRow};
use crate::utils::logging::{create_spinner, finish_progress_bar, log_operation_start};

/// Normalize a county name for crosswalk matching
///
/// Uppercases, drops periods and apostrophes, collapses whitespace and strips
/// trailing "COUNTY", "PARISH" or "BOROUGH", so `"St. Johns County"` and
/// `"ST JOHNS"` match.
#[must_use]
pub fn normalize_county_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '.' | '\''))
        .map(|c| if c == '-' { ' ' } else { c.to_ascii_uppercase() })
        .collect();
    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    while words.len() > 1
        && matches!(words.last(), Some(&("COUNTY" | "PARISH" | "BOROUGH")))
    {
        words.pop();
    }
    words.join(" ")
}

/// Year of an ARCOS transaction date
///
/// Accepts `MMDDYYYY` (leading zero optional) and ISO `YYYY-MM-DD`.
#[must_use]
pub fn transaction_year(date: &str) -> Option<i32> {
    let date = date.trim();
    let parsed = if date.contains('-') {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    } else {
        NaiveDate::parse_from_str(&format!("{date:0>8}"), "%m%d%Y").ok()
    };
    parsed.map(|d| d.year())
}

/// County name to FIPS lookup
#[derive(Debug, Clone, Default)]
pub struct Crosswalk {
    entries: FxHashMap<(String, String), String>,
}

impl Crosswalk {
    #[must_use]
    pub fn from_rows(rows: Vec<CrosswalkRow>) -> Self {
        let entries = rows
            .into_iter()
            .map(|r| {
                (
                    (r.state.trim().to_ascii_uppercase(), normalize_county_name(&r.county)),
                    r.fips,
                )
            })
            .collect();
        Self { entries }
    }

    /// FIPS code of a county, if the crosswalk knows it
    #[must_use]
    pub fn lookup(&self, state: &str, county: &str) -> Option<&str> {
        self.entries
            .get(&(state.trim().to_ascii_uppercase(), normalize_county_name(county)))
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counts of transactions kept and dropped during aggregation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArcosSummary {
    pub rows_read: usize,
    pub rows_used: usize,
    pub dropped_unparsable: usize,
    pub dropped_out_of_window: usize,
    pub dropped_unmatched: usize,
}

impl ArcosSummary {
    fn merge(&mut self, other: &Self) {
        self.rows_read += other.rows_read;
        self.rows_used += other.rows_used;
        self.dropped_unparsable += other.dropped_unparsable;
        self.dropped_out_of_window += other.dropped_out_of_window;
        self.dropped_unmatched += other.dropped_unmatched;
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    mme: f64,
    pills: f64,
    pills_seen: bool,
}

/// Running county-year totals over a stream of transactions
#[derive(Debug, Clone)]
pub struct ArcosAggregator<'a> {
    crosswalk: &'a Crosswalk,
    years: RangeInclusive<i32>,
    totals: FxHashMap<(String, i32), Totals>,
    summary: ArcosSummary,
}

impl<'a> ArcosAggregator<'a> {
    #[must_use]
    pub fn new(crosswalk: &'a Crosswalk, years: RangeInclusive<i32>) -> Self {
        Self {
            crosswalk,
            years,
            totals: FxHashMap::default(),
            summary: ArcosSummary::default(),
        }
    }

    /// Add one transaction
    pub fn push(&mut self, tx: &ArcosTransaction) {
        self.summary.rows_read += 1;

        let (Some(year), Some(mme)) = (transaction_year(&tx.transaction_date), tx.mme()) else {
            self.summary.dropped_unparsable += 1;
            return;
        };
        if !self.years.contains(&year) {
            self.summary.dropped_out_of_window += 1;
            return;
        }
        let Some(fips) = self.crosswalk.lookup(&tx.buyer_state, &tx.buyer_county) else {
            self.summary.dropped_unmatched += 1;
            return;
        };

        let entry = self.totals.entry((fips.to_string(), year)).or_default();
        entry.mme += mme;
        if let Some(pills) = tx.dosage_unit {
            entry.pills += pills;
            entry.pills_seen = true;
        }
        self.summary.rows_used += 1;
    }

    fn merge(mut self, other: Self) -> Self {
        for (key, t) in other.totals {
            let entry = self.totals.entry(key).or_default();
            entry.mme += t.mme;
            entry.pills += t.pills;
            entry.pills_seen |= t.pills_seen;
        }
        self.summary.merge(&other.summary);
        self
    }

    /// County-year rows sorted by FIPS then year
    #[must_use]
    pub fn finish(self) -> (Vec<ArcosCountyYear>, ArcosSummary) {
        let mut rows: Vec<ArcosCountyYear> = self
            .totals
            .into_iter()
            .map(|((fips, year), t)| ArcosCountyYear {
                fips,
                year,
                opioid_shipments_mme: t.mme,
                total_pills: t.pills_seen.then_some(t.pills),
            })
            .collect();
        rows.sort_by(|a, b| a.fips.cmp(&b.fips).then(a.year.cmp(&b.year)));

        let summary = self.summary;
        if summary.rows_read > summary.rows_used {
            log::warn!(
                "ARCOS: dropped {} unparsable, {} out-of-window, {} unmatched of {} transactions",
                summary.dropped_unparsable,
                summary.dropped_out_of_window,
                summary.dropped_unmatched,
                summary.rows_read
            );
        }
        (rows, summary)
    }
}

/// Aggregate in-memory transactions in parallel
#[must_use]
pub fn aggregate_arcos(
    transactions: &[ArcosTransaction],
    crosswalk: &Crosswalk,
    years: RangeInclusive<i32>,
) -> (Vec<ArcosCountyYear>, ArcosSummary) {
    transactions
        .par_iter()
        .fold(
            || ArcosAggregator::new(crosswalk, years.clone()),
            |mut agg, tx| {
                agg.push(tx);
                agg
            },
        )
        .reduce(|| ArcosAggregator::new(crosswalk, years.clone()), ArcosAggregator::merge)
        .finish()
}

/// Stream a transaction file (comma or tab separated) into county-year totals
pub fn aggregate_arcos_file(
    path: &Path,
    crosswalk: &Crosswalk,
    years: RangeInclusive<i32>,
) -> Result<(Vec<ArcosCountyYear>, ArcosSummary)> {
    log_operation_start("Aggregating ARCOS transactions from", path);
    let delimiter = if path.extension().is_some_and(|e| e == "tsv" || e == "txt") {
        b'\t'
    } else {
        b','
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let spinner = create_spinner(Some("reading ARCOS transactions"));
    let mut agg = ArcosAggregator::new(crosswalk, years);
    for (i, record) in reader.deserialize::<ArcosTransaction>().enumerate() {
        match record {
            Ok(tx) => agg.push(&tx),
            Err(e) => {
                log::debug!("ARCOS line {} unreadable: {e}", i + 2);
                agg.summary.rows_read += 1;
                agg.summary.dropped_unparsable += 1;
            }
        }
        if i % 1_000_000 == 0 {
            spinner.set_message(format!("{i} ARCOS transactions"));
        }
    }
    finish_progress_bar(&spinner, Some("ARCOS transactions aggregated"));

    let (rows, summary) = agg.finish();
    log::info!(
        "ARCOS: {} county-years from {} transactions",
        rows.len(),
        summary.rows_used
    );
    Ok((rows, summary))
}

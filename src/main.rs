//! Command line entry point for the opioid policy study

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use opioid_did::algorithm::did::{
    CaseAnalysis, pre_post_summary, run_case, run_checks, trend_series,
};
use opioid_did::algorithm::panel::build_and_save;
use opioid_did::models::{CountyYear, Outcome};
use opioid_did::report::{self, did_summary_table, inspect_parquet, pre_post_table, robustness_table};
use opioid_did::utils::io::read_records_async;
use opioid_did::utils::logging::{create_main_progress_bar, finish_progress_bar, log_warning};
use opioid_did::{PolicyCase, StudyConfig, SuppressionPolicy, ingest_raw_sources};

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

#[derive(Parser, Debug)]
#[command(name = "opioid-did")]
#[command(author, version, about = "County-level DiD evaluation of state opioid policies")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON configuration file; missing fields use the defaults
    #[arg(short, long, env = "OPIOID_DID_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Worker threads for parallel estimation
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    /// Directory with processed Parquet files
    #[arg(long, global = true)]
    processed_dir: Option<PathBuf>,

    /// Directory for output tables
    #[arg(long, global = true)]
    tables_dir: Option<PathBuf>,

    /// Only analyse this case (treated state or file stem, e.g. "FL")
    #[arg(long, global = true)]
    case: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build processed inputs from raw ARCOS, CDC WONDER and Census files
    Ingest {
        /// Directory with the raw downloads
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        /// Impute suppressed death counts instead of leaving them missing
        #[arg(long)]
        impute_suppressed: bool,
    },
    /// Merge processed inputs into the full and per-case panels
    BuildPanel,
    /// Print a profile of a Parquet panel
    Inspect {
        /// Panel files; defaults to the clean panel of every case
        paths: Vec<PathBuf>,
    },
    /// Estimate the level and trend DiD models
    Did,
    /// Run the robustness checks
    Robustness,
    /// Mean deaths before and after the policy
    PrePost,
    /// Yearly means with confidence bands and trend lines
    Trends,
    /// Build the panels and run every analysis
    All,
}

fn load_config(cli: &Cli) -> Result<StudyConfig> {
    let mut config = match &cli.config {
        Some(path) => StudyConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => StudyConfig::default(),
    };
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    if let Some(dir) = &cli.processed_dir {
        config.processed_dir.clone_from(dir);
    }
    if let Some(dir) = &cli.tables_dir {
        config.tables_dir.clone_from(dir);
    }
    if let Command::Ingest {
        raw_dir,
        impute_suppressed,
    } = &cli.command
    {
        if let Some(dir) = raw_dir {
            config.raw_dir.clone_from(dir);
        }
        if *impute_suppressed {
            config.suppression = SuppressionPolicy::Impute;
        }
    }
    if let Some(key) = &cli.case {
        let case = config
            .case(key)
            .cloned()
            .with_context(|| format!("no policy case matches '{key}'"))?;
        config.cases = vec![case];
    }
    config.validate()?;
    Ok(config)
}

async fn load_case_panels(config: &StudyConfig) -> Result<Vec<(PolicyCase, Vec<CountyYear>)>> {
    let loads = config.cases.iter().map(|case| {
        let path = config.case_panel_path(case);
        async move {
            let rows = read_records_async::<CountyYear>(path.clone())
                .await
                .with_context(|| {
                    format!("reading {} (run `build-panel` first)", path.display())
                })?;
            if rows.is_empty() {
                log_warning("case panel has no rows", Some(&path));
            }
            Ok::<_, anyhow::Error>((case.clone(), rows))
        }
    });
    futures::future::try_join_all(loads).await
}

fn report_paths(paths: &[PathBuf]) {
    for path in paths {
        info!("Saved {}", path.display());
    }
}

fn inspect(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        let profile = inspect_parquet(path)
            .with_context(|| format!("inspecting {}", path.display()))?;
        println!("{profile}");
    }
    Ok(())
}

fn run_analyses(tables_dir: &Path, panels: &[(PolicyCase, Vec<CountyYear>)]) -> Result<()> {
    let pb = create_main_progress_bar(panels.len() as u64, Some("Analysing policy cases"));
    let analyses: Vec<CaseAnalysis> = panels
        .iter()
        .map(|(case, rows)| {
            let analysis = CaseAnalysis::run(rows, case);
            pb.inc(1);
            analysis
        })
        .collect();
    finish_progress_bar(&pb, Some("All cases analysed"));

    let written = report::write_all(tables_dir, &analyses)?;
    report_paths(&written);

    let estimates: Vec<_> = analyses.iter().flat_map(|a| a.estimates.clone()).collect();
    println!("{}", did_summary_table(&estimates));
    let robustness: Vec<_> = analyses.iter().flat_map(|a| a.robustness.clone()).collect();
    if !robustness.is_empty() {
        println!("{}", robustness_table(&robustness));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = load_config(&cli)?;
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build_global()
        .context("configuring the rayon thread pool")?;
    info!("{config}");

    let start = Instant::now();
    match &cli.command {
        Command::Ingest { .. } => {
            let summary = ingest_raw_sources(&config)?;
            info!(
                "Wrote {} population, {} mortality ({} suppressed, {} imputed) and {} shipment rows",
                summary.population_rows,
                summary.mortality_rows,
                summary.suppressed_rows,
                summary.imputed_rows,
                summary.shipment_rows
            );
        }
        Command::BuildPanel => {
            build_and_save(&config).await?;
        }
        Command::Inspect { paths } => {
            let paths: Vec<PathBuf> = if paths.is_empty() {
                config.cases.iter().map(|c| config.case_panel_path(c)).collect()
            } else {
                paths.clone()
            };
            inspect(&paths)?;
        }
        Command::Did => {
            let panels = load_case_panels(&config).await?;
            let estimates: Vec<_> = panels
                .iter()
                .flat_map(|(case, rows)| run_case(rows, case))
                .collect();
            let path = report::write_did_results(&config.tables_dir, &estimates)?;
            report_paths(&[path]);
            println!("{}", did_summary_table(&estimates));
        }
        Command::Robustness => {
            let panels = load_case_panels(&config).await?;
            let results: Vec<_> = panels
                .iter()
                .flat_map(|(case, rows)| run_checks(rows, case))
                .collect();
            if results.is_empty() {
                info!("No case has robustness settings configured");
            } else {
                let path = report::write_robustness(&config.tables_dir, &results)?;
                report_paths(&[path]);
                println!("{}", robustness_table(&results));
            }
        }
        Command::PrePost => {
            let panels = load_case_panels(&config).await?;
            let rows: Vec<_> = panels
                .iter()
                .flat_map(|(case, rows)| pre_post_summary(rows, case))
                .collect();
            let path = report::write_pre_post(&config.tables_dir, &rows)?;
            report_paths(&[path]);
            println!("{}", pre_post_table(&rows));
        }
        Command::Trends => {
            let panels = load_case_panels(&config).await?;
            for (case, rows) in &panels {
                for outcome in Outcome::ALL {
                    let series = trend_series(rows, case, outcome);
                    let (points, segments) =
                        report::write_trends(&config.tables_dir, &case.file_stem, &series)?;
                    report_paths(&[points, segments]);
                }
            }
        }
        Command::All => {
            let panels = build_and_save(&config).await?;
            run_analyses(&config.tables_dir, &panels)?;
        }
    }

    info!("Done in {:?}", start.elapsed());
    Ok(())
}

//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvFileSource, CsvTradeSource, DEFAULT_PATTERN};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_report_adapter::{TextReportAdapter, render_summary};
use crate::domain::config_validation::{
    parse_metric, parse_metric_date, validate_metrics_config, validate_validator_config,
};
use crate::domain::engine::{SchemaPolicy, ValidatorConfig, validate_source};
use crate::domain::error::TradeAuditError;
use crate::domain::registry::{FrozenRegistry, default_registry};
use crate::domain::report::BatchOutcome;
use crate::domain::summary::{SummaryMetrics, check_summary};
use crate::domain::timezone::NaiveTimePolicy;
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;
use crate::ports::trade_source_port::TradeSourcePort;

pub const DEFAULT_RESULTS_DIR: &str = "backtest-results";

#[derive(Parser, Debug)]
#[command(name = "tradeaudit", about = "Consistency checks for backtest trade exports")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate backtest trade CSVs
    Validate {
        /// Results directory to scan
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Validate these files instead of scanning a directory
        #[arg(short, long)]
        file: Vec<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Skip batches that lack the exit-reason columns
        #[arg(long)]
        strict: bool,
        /// How to read timestamps without an offset: utc or exchange
        #[arg(long)]
        naive_time: Option<String>,
        /// Print every finding instead of the first ten
        #[arg(long)]
        all: bool,
        /// Print remediation hints
        #[arg(long)]
        suggest: bool,
    },
    /// Cross-check the headline metrics of a backtest summary
    Summary {
        #[arg(short, long)]
        metrics: PathBuf,
    },
    /// List the built-in strategies
    Strategies,
}

/// Everything `validate` needs, after flag parsing.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    pub dir: Option<PathBuf>,
    pub files: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub strict: bool,
    pub naive_time: Option<String>,
    pub show_all: bool,
    pub suggest: bool,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Validate {
            dir,
            file,
            config,
            strict,
            naive_time,
            all,
            suggest,
        } => run_validate(&ValidateOptions {
            dir,
            files: file,
            config,
            strict,
            naive_time,
            show_all: all,
            suggest,
        }),
        Command::Summary { metrics } => run_summary(&metrics),
        Command::Strategies => run_strategies(),
    }
}

pub fn read_config(path: &Path) -> Result<FileConfigAdapter, TradeAuditError> {
    FileConfigAdapter::from_file(path).map_err(|e| TradeAuditError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Typed validator settings from the `[validator]` section.
pub fn build_validator_config(config: &dyn ConfigPort) -> Result<ValidatorConfig, TradeAuditError> {
    validate_validator_config(config)?;

    let schema_policy = match config.get_string("validator", "schema_policy") {
        Some(value) => value.parse::<SchemaPolicy>().map_err(|reason| {
            TradeAuditError::ConfigInvalid {
                section: "validator".into(),
                key: "schema_policy".into(),
                reason,
            }
        })?,
        None => SchemaPolicy::default(),
    };
    let naive_time = match config.get_string("validator", "naive_time") {
        Some(value) => parse_naive_time(&value)?,
        None => NaiveTimePolicy::default(),
    };

    Ok(ValidatorConfig {
        schema_policy,
        naive_time,
    })
}

fn parse_naive_time(value: &str) -> Result<NaiveTimePolicy, TradeAuditError> {
    value
        .parse::<NaiveTimePolicy>()
        .map_err(|reason| TradeAuditError::ConfigInvalid {
            section: "validator".into(),
            key: "naive_time".into(),
            reason,
        })
}

/// Typed headline metrics from the `[metrics]` section.
pub fn build_summary_metrics(config: &dyn ConfigPort) -> Result<SummaryMetrics, TradeAuditError> {
    validate_metrics_config(config)?;

    Ok(SummaryMetrics {
        total_return: parse_metric(config, "total_return")?,
        total_pnl: parse_metric(config, "total_pnl")?,
        annualized_return: parse_metric(config, "annualized_return")?,
        win_rate: parse_metric(config, "win_rate")?,
        total_trades: parse_metric(config, "total_trades")? as u64,
        winning_trades: parse_metric(config, "winning_trades")? as u64,
        sharpe_ratio: parse_metric(config, "sharpe_ratio")?,
        initial_capital: parse_metric(config, "initial_capital")?,
        start_date: parse_metric_date(config, "start_date")?,
        end_date: parse_metric_date(config, "end_date")?,
    })
}

/// Pick the trade source: explicit files win over a directory, and a
/// `--dir` flag wins over `results_dir` from the config file.
pub fn build_source(
    dir: Option<&Path>,
    files: &[PathBuf],
    config: Option<&dyn ConfigPort>,
) -> Box<dyn TradeSourcePort> {
    if !files.is_empty() {
        return Box::new(CsvFileSource::new(files.to_vec()));
    }

    let base = match dir {
        Some(d) => d.to_path_buf(),
        None => config
            .and_then(|c| c.get_string("validator", "results_dir"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR)),
    };
    let pattern = config
        .and_then(|c| c.get_string("validator", "pattern"))
        .unwrap_or_else(|| DEFAULT_PATTERN.to_string());

    Box::new(CsvTradeSource::new(base).with_pattern(&pattern))
}

/// Render outcomes in order, labelling each with the strategy its file name
/// points at.
pub fn render_outcomes(
    outcomes: Vec<BatchOutcome>,
    registry: &FrozenRegistry,
    reporter: &dyn ReportPort,
) -> String {
    let labelled: Vec<_> = outcomes
        .into_iter()
        .map(|outcome| {
            let file_name = Path::new(outcome.batch())
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let strategy = registry.resolve_batch(&file_name);
            (outcome, strategy)
        })
        .collect();
    reporter.render_all(&labelled)
}

/// Run `validate` and return the report text.
pub fn validate_report(opts: &ValidateOptions) -> Result<String, TradeAuditError> {
    let file_config = match &opts.config {
        Some(path) => Some(read_config(path)?),
        None => None,
    };
    let config_port = file_config.as_ref().map(|c| c as &dyn ConfigPort);

    let mut validator_config = match config_port {
        Some(c) => build_validator_config(c)?,
        None => ValidatorConfig::default(),
    };
    if opts.strict {
        validator_config.schema_policy = SchemaPolicy::Strict;
    }
    if let Some(value) = &opts.naive_time {
        validator_config.naive_time = parse_naive_time(value)?;
    }

    let show_all =
        opts.show_all || config_port.is_some_and(|c| c.get_bool("validator", "show_all", false));
    let suggest =
        opts.suggest || config_port.is_some_and(|c| c.get_bool("validator", "suggest", false));

    let registry = default_registry()?;
    log::debug!(
        "{} strategies registered: {}",
        registry.len(),
        registry.names().join(", ")
    );
    let source = build_source(opts.dir.as_deref(), &opts.files, config_port);

    log::info!(
        "validating with schema policy {}, naive timestamps as {}",
        validator_config.schema_policy,
        validator_config.naive_time
    );
    let outcomes = validate_source(&*source, &validator_config)?;

    let skipped = outcomes
        .iter()
        .filter(|o| matches!(o, BatchOutcome::Skipped { .. }))
        .count();
    let findings: usize = outcomes.iter().filter_map(|o| o.report()).map(|r| r.total()).sum();
    log::info!(
        "{} batch(es): {} finding(s), {} skipped",
        outcomes.len(),
        findings,
        skipped
    );

    let reporter = TextReportAdapter::new(show_all, suggest);
    Ok(render_outcomes(outcomes, &registry, &reporter))
}

fn run_validate(opts: &ValidateOptions) -> ExitCode {
    match validate_report(opts) {
        Ok(text) => {
            if text.is_empty() {
                println!("No backtest results found to validate.");
            } else {
                print!("{text}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Run `summary` and return the report text.
pub fn summary_report(metrics_path: &Path) -> Result<String, TradeAuditError> {
    let config = read_config(metrics_path)?;
    let metrics = build_summary_metrics(&config)?;
    let anomalies = check_summary(&metrics);
    for anomaly in &anomalies {
        log::warn!("{}: {}", anomaly.check, anomaly.message);
    }
    Ok(render_summary(&anomalies))
}

fn run_summary(metrics_path: &Path) -> ExitCode {
    log::info!("Checking summary metrics from {}", metrics_path.display());
    match summary_report(metrics_path) {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// One block per registered strategy.
pub fn strategies_listing(registry: &FrozenRegistry) -> String {
    let mut output = String::new();
    for profile in registry.iter() {
        output.push_str(&format!(
            "{} ({})\n  {}\n",
            profile.name, profile.display_name, profile.description
        ));
        for param in &profile.params {
            let range = match (param.min, param.max) {
                (Some(min), Some(max)) => format!(" [{min}, {max}]"),
                _ => String::new(),
            };
            output.push_str(&format!(
                "    {} = {}{}\n",
                param.key, param.default, range
            ));
        }
    }
    output
}

fn run_strategies() -> ExitCode {
    match default_registry() {
        Ok(registry) => {
            print!("{}", strategies_listing(&registry));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

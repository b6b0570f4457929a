//! StratLab CLI: list, inspect, run and compare strategies.
//!
//! Commands:
//! - `list`: registered strategies, sorted by label
//! - `info <strategy>`: parameter schema, description, predefined configurations
//! - `run`: backtest one strategy from flags or a TOML run file
//! - `compare`: backtest every predefined configuration of a strategy and rank them

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use stratlab_core::{MarketSeries, ParamMap, ParamValue, StrategyRegistry};
use stratlab_runner::{
    compare_configurations, compare_strategies_detailed, comparison_report, detailed_report,
    export_metrics, meets_profitability_criteria, BacktestConfig, BacktestOrchestrator,
    BacktestResult, CsvProvider, EngineConfig, MarketDataProvider, MetricsExport,
    ProfitabilityCriteria, RankingWeights, SyntheticProvider,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stratlab",
    about = "StratLab CLI - parameterized strategy backtesting and ranking"
)]
struct Cli {
    /// Log filter (e.g. "info", "stratlab_runner=debug"). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered strategies.
    List,
    /// Show a strategy's parameters and predefined configurations.
    Info {
        /// Strategy label or identifier.
        strategy: String,
    },
    /// Backtest one strategy configuration.
    Run {
        /// Strategy label or identifier. Overrides the run file's [strategy] name.
        #[arg(long)]
        strategy: Option<String>,

        /// Parameter override as key=value. Repeatable.
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, ParamValue)>,

        /// TOML run file.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        data: DataArgs,

        /// Include extended statistics in the report and export.
        #[arg(long, default_value_t = false)]
        extended: bool,

        /// Write the result and grouped metrics as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Backtest every predefined configuration of a strategy and rank them.
    Compare {
        /// Strategy label or identifier. Overrides the run file's [strategy] name.
        #[arg(long)]
        strategy: Option<String>,

        /// TOML run file supplying engine, data, criteria and ranking sections.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        data: DataArgs,
    },
}

#[derive(Args)]
struct DataArgs {
    /// CSV file with Date, Open, High, Low, Close, Volume columns.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Use a deterministic synthetic random walk.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Symbol label for the series.
    #[arg(long)]
    symbol: Option<String>,

    /// First date to include (YYYY-MM-DD).
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD).
    #[arg(long)]
    end: Option<NaiveDate>,
}

fn parse_param(raw: &str) -> Result<(String, ParamValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{raw}'"));
    }
    Ok((key.to_string(), ParamValue::parse(value)))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::List => run_list(),
        Commands::Info { strategy } => run_info(&strategy),
        Commands::Run {
            strategy,
            params,
            config,
            data,
            extended,
            output,
        } => run_backtest_cmd(strategy, params, config, data, extended, output),
        Commands::Compare {
            strategy,
            config,
            data,
        } => run_compare(strategy, config, data),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn run_list() -> Result<()> {
    let infos = StrategyRegistry::global().all_strategies_info();
    println!("{:<26} {:<9} {:<18}", "Label", "Short", "Identifier");
    println!("{}", "-".repeat(55));
    for info in &infos {
        println!("{:<26} {:<9} {:<18}", info.label, info.short_label, info.identifier);
    }
    Ok(())
}

fn run_info(name: &str) -> Result<()> {
    let registry = StrategyRegistry::global();
    let entry = registry.resolve(name)?;
    let schema = registry.parameter_info(name)?;
    let default = registry.create(name, &ParamMap::new())?;

    println!("{} ({}) - {}", entry.label, entry.short_label, entry.identifier);
    println!();
    println!("{}", default.describe());
    println!();
    println!("{:<22} {:<8} {:<8} {:<16} Description", "Parameter", "Type", "Default", "Range");
    println!("{}", "-".repeat(80));
    for (key, def) in schema.iter() {
        let range = def
            .range
            .map(|(lo, hi)| format!("{lo} .. {hi}"))
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<22} {:<8} {:<8} {:<16} {}",
            key,
            format!("{:?}", def.kind),
            def.default.to_string(),
            range,
            def.description
        );
    }

    let presets = registry.predefined_configurations(name)?;
    println!();
    println!("Predefined configurations ({}):", presets.len());
    for (i, preset) in presets.iter().enumerate() {
        let built = entry.build(preset)?;
        println!("  {:>2}. {}", i + 1, built.short_description());
    }
    Ok(())
}

/// Everything a command needs once flags and the run file are merged.
struct Resolved {
    strategy: String,
    params: ParamMap,
    engine: EngineConfig,
    criteria: ProfitabilityCriteria,
    weights: RankingWeights,
    symbol: String,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    data_path: Option<PathBuf>,
    synthetic: bool,
}

fn resolve(
    strategy: Option<String>,
    params: Vec<(String, ParamValue)>,
    config: Option<PathBuf>,
    data: DataArgs,
) -> Result<Resolved> {
    let file = config
        .as_deref()
        .map(BacktestConfig::from_file)
        .transpose()?;

    let strategy = match (strategy, &file) {
        (Some(name), _) => name,
        (None, Some(f)) => f.strategy.name.clone(),
        (None, None) => bail!("one of --strategy or --config is required"),
    };

    let mut merged = file
        .as_ref()
        .map(|f| f.strategy.params.clone())
        .unwrap_or_default();
    merged.extend(params);

    let section = file.as_ref().map(|f| f.backtest.clone()).unwrap_or_default();
    let (engine, criteria, weights) = match file {
        Some(f) => (f.engine, f.criteria, f.ranking),
        None => (
            EngineConfig::default(),
            ProfitabilityCriteria::default(),
            RankingWeights::default(),
        ),
    };

    Ok(Resolved {
        strategy,
        params: merged,
        engine,
        criteria,
        weights,
        symbol: data.symbol.unwrap_or(section.symbol),
        start: data.start.or(section.start),
        end: data.end.or(section.end),
        data_path: data.data.or(section.data),
        synthetic: data.synthetic || section.synthetic,
    })
}

fn load_data(resolved: &Resolved) -> Result<MarketSeries> {
    let series = match (&resolved.data_path, resolved.synthetic) {
        (Some(path), _) => CsvProvider::new(path).fetch(&resolved.symbol, resolved.start, resolved.end)?,
        (None, true) => {
            SyntheticProvider::default().fetch(&resolved.symbol, resolved.start, resolved.end)?
        }
        (None, false) => bail!("no market data: pass --data <csv> or --synthetic"),
    };
    Ok(series)
}

#[derive(Serialize)]
struct RunOutput<'a> {
    result: &'a BacktestResult,
    metrics: MetricsExport,
}

fn run_backtest_cmd(
    strategy: Option<String>,
    params: Vec<(String, ParamValue)>,
    config: Option<PathBuf>,
    data: DataArgs,
    extended: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let resolved = resolve(strategy, params, config, data)?;
    let series = load_data(&resolved)?;

    let mut strategy = StrategyRegistry::global().create(&resolved.strategy, &resolved.params)?;
    let orchestrator = BacktestOrchestrator::new(resolved.engine.clone())?;
    let result = orchestrator.execute_strategy_evaluation(
        strategy.as_mut(),
        &series,
        resolved.start,
        resolved.end,
        Some(&resolved.symbol),
    )?;

    println!("{}", detailed_report(&result, extended, true, &resolved.criteria));
    let profitable = meets_profitability_criteria(&result.metrics, &resolved.criteria);
    println!(
        "Verdict: {} ({})",
        if profitable { "PROFITABLE" } else { "NOT PROFITABLE" },
        result.strategy.short_description
    );

    if let Some(path) = output {
        let out = RunOutput {
            result: &result,
            metrics: export_metrics(&result, extended, &resolved.criteria),
        };
        let json = serde_json::to_string_pretty(&out)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "Result written");
    }
    Ok(())
}

fn run_compare(strategy: Option<String>, config: Option<PathBuf>, data: DataArgs) -> Result<()> {
    let resolved = resolve(strategy, Vec::new(), config, data)?;
    let series = load_data(&resolved)?;
    let orchestrator = BacktestOrchestrator::new(resolved.engine.clone())?;

    let report = compare_configurations(
        StrategyRegistry::global(),
        &orchestrator,
        &resolved.strategy,
        None,
        &series,
        resolved.start,
        resolved.end,
        Some(&resolved.symbol),
    )?;

    println!();
    println!("Batch comparison: {} on {}", report.strategy, resolved.symbol);
    println!(
        "{:>3}  {:<32} {:>9} {:>7} {:>9} {:>7}",
        "#", "Configuration", "Return", "Sharpe", "MaxDD", "Trades"
    );
    println!("{}", "-".repeat(74));
    for row in &report.rows {
        match &row.outcome {
            Ok(r) => println!(
                "{:>3}  {:<32} {:>8.2}% {:>7.2} {:>8.2}% {:>7}",
                row.index,
                row.short_description,
                r.total_return() * 100.0,
                r.sharpe_ratio(),
                r.metrics.get_or("max_drawdown", 0.0) * 100.0,
                r.metrics.get_or("total_trades", 0.0) as usize,
            ),
            Err(e) => println!("{:>3}  {:<32} FAILED: {e}", row.index, row.short_description),
        }
    }

    let successes: Vec<BacktestResult> = report.successes().cloned().collect();
    if successes.len() < 2 {
        println!();
        println!(
            "{} successful configuration(s); at least 2 are needed for a comparison report.",
            successes.len()
        );
        return Ok(());
    }

    let ranked = report.ranked(&resolved.weights)?;
    println!();
    println!("Ranking:");
    for r in &ranked {
        let profitable = meets_profitability_criteria(&r.metrics, &resolved.criteria);
        println!(
            "  {:>2}. {:<32} score={:.3}{}",
            r.rank().unwrap_or(0),
            r.strategy.short_description,
            r.score().unwrap_or(0.0),
            if profitable { "  [profitable]" } else { "" }
        );
    }

    let summary = compare_strategies_detailed(&successes, &resolved.criteria, &resolved.weights)?;
    println!("{}", comparison_report(&summary));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn param_flags_parse_typed_values() {
        assert_eq!(
            parse_param("short_window=10").unwrap(),
            ("short_window".to_string(), ParamValue::Int(10))
        );
        assert_eq!(
            parse_param("std_dev = 2.5").unwrap(),
            ("std_dev".to_string(), ParamValue::Float(2.5))
        );
        assert!(parse_param("nonsense").is_err());
        assert!(parse_param("=3").is_err());
    }

    #[test]
    fn flags_override_run_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            r#"
[backtest]
symbol = "QQQ"
synthetic = true

[strategy]
name = "sma_crossover"
params = { short_window = 10, long_window = 30 }
"#,
        )
        .unwrap();

        let resolved = resolve(
            None,
            vec![("long_window".into(), ParamValue::Int(40))],
            Some(path),
            DataArgs {
                data: None,
                synthetic: false,
                symbol: Some("IWM".into()),
                start: None,
                end: None,
            },
        )
        .unwrap();
        assert_eq!(resolved.strategy, "sma_crossover");
        assert_eq!(resolved.symbol, "IWM");
        assert!(resolved.synthetic);
        assert_eq!(resolved.params.get("short_window"), Some(&ParamValue::Int(10)));
        assert_eq!(resolved.params.get("long_window"), Some(&ParamValue::Int(40)));
    }

    #[test]
    fn strategy_is_required_without_run_file() {
        let args = DataArgs {
            data: None,
            synthetic: true,
            symbol: None,
            start: None,
            end: None,
        };
        assert!(resolve(None, Vec::new(), None, args).is_err());
    }
}

//! StratLab Runner: backtest orchestration, portfolio simulation, scoring.
//!
//! This crate builds on `stratlab-core` to provide:
//! - Engine configuration and TOML run files
//! - Market data loading (CSV files, deterministic synthetic walks)
//! - A portfolio simulator behind the `PortfolioSimulator` trait
//! - The staged backtest orchestrator
//! - Base and extended performance metrics
//! - Profitability verdicts, composite scores and ranking
//! - Batch comparison of parameter sets
//! - Text reports and structured metric export

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod orchestrator;
pub mod report;
pub mod result;
pub mod scorer;
pub mod simulator;
pub mod tail_metrics;

pub use batch::{compare_configurations, BatchError, BatchReport, BatchRow};
pub use config::{BacktestConfig, ConfigError, DataSection, EngineConfig, StrategySection};
pub use data_loader::{CsvProvider, LoadError, MarketDataProvider, SyntheticProvider};
pub use metrics::{compute_base_metrics, MetricsBundle};
pub use orchestrator::{BacktestError, BacktestOrchestrator, Stage, StageError};
pub use report::{comparison_report, detailed_report, export_metrics, MetricsExport, Rating};
pub use result::{BacktestPeriod, BacktestResult, RankingAnnotation, StrategySnapshot};
pub use scorer::{
    compare_strategies_detailed, compute_extended_stats, meets_profitability_criteria,
    portfolio_correlation, rank, score, ComparisonSummary, PerformanceScorer,
    ProfitabilityCriteria, RankingWeights, ScoringError,
};
pub use simulator::{
    DrawdownEpisode, PortfolioSimulator, SignalSimulator, SimulationError, SimulationOutput,
    SimulationRequest, TradeRecord,
};
pub use tail_metrics::TailMetrics;

//! StratLab Core: domain types, indicators, parameter schemas, strategies, registry.
//!
//! This crate contains everything a strategy needs to turn prices into signals:
//! - Domain types (bars, market series, signal series)
//! - Indicators (SMA, EMA, RSI, Bollinger Bands)
//! - Declarative parameter schemas with validation
//! - The `Strategy` trait and four concrete strategies
//! - The strategy registry keyed by identifier and display label
//! - Configuration fingerprinting

pub mod components;
pub mod domain;
pub mod fingerprint;
pub mod indicators;
pub mod registry;
pub mod schema;
pub mod strategy;

pub use domain::{Bar, BarField, MarketSeries, SignalSeries, Signals};
pub use fingerprint::{ConfigHash, StrategyConfig};
pub use registry::{RegistryError, StrategyEntry, StrategyInfo, StrategyRegistry};
pub use schema::{ParamMap, ParamType, ParamValue, ParameterDefinition, ParameterSchema};
pub use strategy::{Strategy, StrategyDefinition, StrategyError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types are Send + Sync.
    ///
    /// The registry is shared process-wide, and strategies may be handed to
    /// worker threads by callers.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::MarketSeries>();
        require_sync::<domain::MarketSeries>();
        require_send::<domain::Signals>();
        require_sync::<domain::Signals>();

        require_send::<components::IndicatorValues>();
        require_sync::<components::IndicatorValues>();

        require_send::<schema::ParameterSchema>();
        require_sync::<schema::ParameterSchema>();
        require_send::<fingerprint::StrategyConfig>();
        require_sync::<fingerprint::StrategyConfig>();

        require_send::<Box<dyn strategy::Strategy>>();
        require_sync::<Box<dyn strategy::Strategy>>();
        require_send::<registry::StrategyRegistry>();
        require_sync::<registry::StrategyRegistry>();
    }

    /// Architecture contract: strategies see only market data, never
    /// portfolio state or engine configuration.
    #[test]
    fn generate_signals_takes_only_market_data() {
        fn _check_trait_object_builds(
            strategy: &mut dyn strategy::Strategy,
            data: &domain::MarketSeries,
        ) -> Result<domain::Signals, strategy::StrategyError> {
            strategy.generate_signals(data)
        }
    }
}

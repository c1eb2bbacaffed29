pub mod backtest_config;
pub mod risk;

pub use backtest_config::{OptimizerSettings, SearchMethod, StrategyConfiguration};
pub use risk::{RiskError, RiskParams};

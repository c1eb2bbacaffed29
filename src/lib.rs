//a single-asset, close-to-close backtesting core with indicator parameter search

pub mod config;
pub mod data;
pub mod engine;
pub mod indicators;
pub mod metrics;
pub mod optimizer;
pub mod portfolio;
pub mod signals;

//prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        OptimizerSettings, RiskError, RiskParams, SearchMethod, StrategyConfiguration,
    };
    pub use crate::data::{load_csv, load_csv_for_symbol, Bar, PriceTable};
    pub use crate::engine::{run_backtest, simulate, BacktestEngine, BacktestError, Simulation};
    pub use crate::indicators::{
        augment, augment_in_place, BuiltinIndicators, IndicatorConfig, IndicatorProvider,
        ParamValue, Params,
    };
    pub use crate::metrics::{EquityPoint, ResultRecord};
    pub use crate::optimizer::{
        Assignment, EvalFailure, GridSearch, Objective, Optimizer, ParamRange, RandomSearch,
        SearchError, SearchOutcome, SearchStrategy,
    };
    pub use crate::portfolio::{Position, Side, TradeRecord};
    pub use crate::signals::{Condition, SignalBuilder, SignalSet, StrategySpec};
}

pub mod summary;
pub mod timeseries;

pub use summary::{
    cagr, calmar_ratio, sharpe_ratio, sortino_ratio, win_percentage, ResultRecord,
};
pub use timeseries::{
    calculate_equity_curve, calculate_returns, drawdown_series, max_drawdown, EquityPoint,
};

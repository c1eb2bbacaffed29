pub mod backtest;
pub mod simulator;

pub use backtest::{run_backtest, BacktestEngine, BacktestError};
pub use simulator::{simulate, PositionSimulator, Simulation};

use crate::config::{RiskError, RiskParams};
use crate::data::PriceTable;
use crate::engine::simulator::PositionSimulator;
use crate::metrics::ResultRecord;
use crate::signals::SignalSet;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BacktestError {
    #[error("Invalid risk parameters: {0}")]
    InvalidRisk(#[from] RiskError),
    #[error("Signals cover {found} bars but the price table has {expected}")]
    MisalignedSignals { expected: usize, found: usize },
    #[error("Price table has no 'Close' column")]
    MissingCloseColumn,
    #[error("Missing close price at row {0}")]
    MissingClose(usize),
}

//single evaluation entry point: simulator followed by metrics
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    risk: RiskParams,
}

impl BacktestEngine {
    pub fn new(risk: RiskParams) -> Self {
        BacktestEngine { risk }
    }

    //runs the backtest over the table with precomputed signals
    pub fn run(&self, table: &PriceTable, signals: &SignalSet) -> Result<ResultRecord, BacktestError> {
        self.risk.validate()?;

        if !signals.is_aligned_with(table.len()) {
            return Err(BacktestError::MisalignedSignals {
                expected: table.len(),
                found: signals.len(),
            });
        }

        let closes = close_prices(table)?;
        let simulation = PositionSimulator::new(self.risk).run(table.timestamps(), &closes, signals);

        Ok(ResultRecord::from_simulation(
            table.timestamps(),
            simulation,
            self.risk.initial_capital,
        ))
    }
}

pub fn run_backtest(
    table: &PriceTable,
    signals: &SignalSet,
    risk: &RiskParams,
) -> Result<ResultRecord, BacktestError> {
    BacktestEngine::new(*risk).run(table, signals)
}

fn close_prices(table: &PriceTable) -> Result<Vec<f64>, BacktestError> {
    let column = table.closes().ok_or(BacktestError::MissingCloseColumn)?;

    column
        .iter()
        .enumerate()
        .map(|(row, value)| value.ok_or(BacktestError::MissingClose(row)))
        .collect()
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RiskError {
    #[error("Initial capital must be positive, got {0}")]
    NonPositiveCapital(f64),
    #[error("Position size fraction must be in (0, 1], got {0}")]
    PositionSizeOutOfRange(f64),
    #[error("Stop loss percentage must be >= 0, got {0}")]
    NegativeStopLoss(f64),
    #[error("Take profit percentage must be >= 0, got {0}")]
    NegativeTakeProfit(f64),
}

//risk parameters for a single simulation run
//percentages are whole numbers (5.0 == 5%), 0 disables the rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParams {
    pub initial_capital: f64,
    pub position_size_fraction: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        RiskParams {
            initial_capital: 10_000.0,
            position_size_fraction: 0.95,
            stop_loss_pct: 0.0,
            take_profit_pct: 0.0,
        }
    }
}

impl RiskParams {
    pub fn validate(&self) -> Result<(), RiskError> {
        //written as negated comparisons so NaN is rejected too
        if !(self.initial_capital > 0.0) {
            return Err(RiskError::NonPositiveCapital(self.initial_capital));
        }
        if !(self.position_size_fraction > 0.0 && self.position_size_fraction <= 1.0) {
            return Err(RiskError::PositionSizeOutOfRange(
                self.position_size_fraction,
            ));
        }
        if !(self.stop_loss_pct >= 0.0) {
            return Err(RiskError::NegativeStopLoss(self.stop_loss_pct));
        }
        if !(self.take_profit_pct >= 0.0) {
            return Err(RiskError::NegativeTakeProfit(self.take_profit_pct));
        }
        Ok(())
    }

    pub fn with_stop_loss(mut self, pct: f64) -> Self {
        self.stop_loss_pct = pct;
        self
    }

    pub fn with_take_profit(mut self, pct: f64) -> Self {
        self.take_profit_pct = pct;
        self
    }

    pub fn with_position_size(mut self, fraction: f64) -> Self {
        self.position_size_fraction = fraction;
        self
    }

    pub fn with_initial_capital(mut self, capital: f64) -> Self {
        self.initial_capital = capital;
        self
    }
}

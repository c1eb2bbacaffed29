use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//a point in the equity curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    //fractional decline from the running peak, always <= 0
    pub drawdown: f64,
    pub returns: f64,
}

impl EquityPoint {
    pub fn new(timestamp: DateTime<Utc>, equity: f64, drawdown: f64, returns: f64) -> Self {
        EquityPoint {
            timestamp,
            equity,
            drawdown,
            returns,
        }
    }
}

//zero for anything that is not a finite number
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

//builds the per-bar equity curve with drawdown and bar-over-bar returns
pub fn calculate_equity_curve(
    timestamps: &[DateTime<Utc>],
    equity_values: &[f64],
) -> Vec<EquityPoint> {
    let drawdowns = drawdown_series(equity_values);

    timestamps
        .iter()
        .zip(equity_values)
        .zip(drawdowns)
        .enumerate()
        .map(|(i, ((&timestamp, &equity), drawdown))| {
            let returns = if i == 0 {
                0.0
            } else {
                period_return(equity_values[i - 1], equity)
            };
            EquityPoint::new(timestamp, equity, drawdown, returns)
        })
        .collect()
}

fn period_return(previous: f64, current: f64) -> f64 {
    finite_or_zero(current / previous - 1.0)
}

//bar-over-bar percentage returns, empty for fewer than two values
pub fn calculate_returns(equity_values: &[f64]) -> Vec<f64> {
    equity_values
        .windows(2)
        .map(|w| period_return(w[0], w[1]))
        .collect()
}

//(equity - running peak) / running peak for every bar
pub fn drawdown_series(equity_values: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;

    equity_values
        .iter()
        .map(|&equity| {
            peak = peak.max(equity);
            if peak > 0.0 {
                finite_or_zero((equity - peak) / peak)
            } else {
                0.0
            }
        })
        .collect()
}

//deepest drawdown as a non-positive fraction
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    equity_curve
        .iter()
        .map(|point| point.drawdown)
        .fold(0.0, f64::min)
}

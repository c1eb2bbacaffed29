use crate::engine::Simulation;
use crate::metrics::timeseries::{
    calculate_equity_curve, calculate_returns, finite_or_zero, max_drawdown, EquityPoint,
};
use crate::portfolio::TradeRecord;
use chrono::{DateTime, Utc};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

const TRADING_DAYS: f64 = 252.0;
const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 60.0 * 60.0;

//complete, immutable outcome of one backtest; every float is finite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub equity: Vec<EquityPoint>,
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub max_drawdown: f64,
    pub calmar: f64,
    pub trades: Vec<TradeRecord>,
    pub win_percentage: f64,
    pub num_trades: usize,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub exposure: f64,
}

impl ResultRecord {
    //derives every metric from a finished simulation
    pub fn from_simulation(
        timestamps: &[DateTime<Utc>],
        simulation: Simulation,
        initial_capital: f64,
    ) -> Self {
        let equity_curve = calculate_equity_curve(timestamps, &simulation.equity);

        let final_equity = simulation
            .equity
            .last()
            .copied()
            .unwrap_or(initial_capital);
        let total_return = finite_or_zero(final_equity - initial_capital);

        let cagr = match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) if equity_curve.len() > 1 => {
                cagr(first.timestamp, last.timestamp, final_equity, initial_capital)
            }
            _ => 0.0,
        };

        let returns = calculate_returns(&simulation.equity);
        let max_dd = max_drawdown(&equity_curve);
        let trade_stats = TradeStats::from_trades(&simulation.trades);

        let exposure = if equity_curve.is_empty() {
            0.0
        } else {
            simulation.bars_in_market as f64 / equity_curve.len() as f64
        };

        ResultRecord {
            initial_capital,
            final_equity,
            total_return,
            cagr,
            sharpe: sharpe_ratio(&returns),
            sortino: sortino_ratio(&returns),
            max_drawdown: max_dd,
            calmar: calmar_ratio(cagr, max_dd),
            win_percentage: win_percentage(&simulation.trades),
            num_trades: simulation.trades.len(),
            avg_win: trade_stats.avg_win,
            avg_loss: trade_stats.avg_loss,
            profit_factor: trade_stats.profit_factor,
            exposure,
            equity: equity_curve,
            trades: simulation.trades,
        }
    }

    pub fn total_return_pct(&self) -> f64 {
        finite_or_zero(self.total_return / self.initial_capital)
    }

    //prints metrics in a formatted table
    pub fn pretty_print_table(&self) {
        self.metrics_table().printstd();
    }

    pub fn metrics_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(Row::new(vec![Cell::new("Metric"), Cell::new("Value")]));

        let rows = [
            ("Initial Capital", format!("${:.2}", self.initial_capital)),
            ("Final Equity", format!("${:.2}", self.final_equity)),
            (
                "Total Return",
                format!(
                    "${:.2} ({:.2}%)",
                    self.total_return,
                    self.total_return_pct() * 100.0
                ),
            ),
            ("CAGR", format!("{:.2}%", self.cagr * 100.0)),
            ("Max Drawdown", format!("{:.2}%", self.max_drawdown * 100.0)),
            ("Sharpe Ratio", format!("{:.3}", self.sharpe)),
            ("Sortino Ratio", format!("{:.3}", self.sortino)),
            ("Calmar Ratio", format!("{:.3}", self.calmar)),
            ("Number of Trades", format!("{}", self.num_trades)),
            ("Win %", format!("{:.2}%", self.win_percentage)),
            ("Avg Win", format!("${:.2}", self.avg_win)),
            ("Avg Loss", format!("${:.2}", self.avg_loss)),
            ("Profit Factor", format!("{:.3}", self.profit_factor)),
            ("Exposure", format!("{:.2}%", self.exposure * 100.0)),
        ];

        for (name, value) in rows {
            table.add_row(Row::new(vec![Cell::new(name), Cell::new(&value)]));
        }

        table
    }

    pub fn trades_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(Row::new(
            ["Entry Time", "Exit Time", "Type", "Shares", "Entry Price", "Exit Price", "PnL"]
                .iter()
                .map(|h| Cell::new(h))
                .collect(),
        ));

        for trade in &self.trades {
            table.add_row(Row::new(vec![
                Cell::new(&trade.entry_time.to_rfc3339()),
                Cell::new(&trade.exit_time.to_rfc3339()),
                Cell::new(&trade.side.to_string()),
                Cell::new(&trade.shares.to_string()),
                Cell::new(&format!("{:.2}", trade.entry_price)),
                Cell::new(&format!("{:.2}", trade.exit_price)),
                Cell::new(&format!("{:.2}", trade.pnl)),
            ]));
        }

        table
    }
}

//annualised growth over the wall-clock span between the first and last bar
pub fn cagr(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    final_equity: f64,
    initial_capital: f64,
) -> f64 {
    let years = (end - start).num_seconds() as f64 / SECONDS_PER_YEAR;
    if years <= 0.0 || initial_capital <= 0.0 {
        return 0.0;
    }

    let growth = final_equity / initial_capital;
    if growth <= 0.0 {
        //capital wiped out, a fractional power of a non-positive ratio is undefined
        return -1.0;
    }

    finite_or_zero(growth.powf(1.0 / years) - 1.0)
}

pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }

    let mean = returns.mean();
    let std_dev = returns.std_dev();

    if !std_dev.is_finite() || std_dev == 0.0 {
        return 0.0;
    }

    finite_or_zero(mean / std_dev * TRADING_DAYS.sqrt())
}

//mean return over the sample deviation of the negative returns only
pub fn sortino_ratio(returns: &[f64]) -> f64 {
    let downside: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).copied().collect();
    if downside.is_empty() {
        return 0.0;
    }

    let downside_dev = downside.std_dev();
    if !downside_dev.is_finite() || downside_dev == 0.0 {
        return 0.0;
    }

    finite_or_zero(returns.mean() / downside_dev * TRADING_DAYS.sqrt())
}

pub fn calmar_ratio(cagr: f64, max_drawdown: f64) -> f64 {
    if max_drawdown == 0.0 {
        return 0.0;
    }
    finite_or_zero(cagr / max_drawdown.abs())
}

//share of winning trades in percent (0..=100)
pub fn win_percentage(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.is_win()).count();
    wins as f64 / trades.len() as f64 * 100.0
}

struct TradeStats {
    avg_win: f64,
    avg_loss: f64,
    profit_factor: f64,
}

impl TradeStats {
    fn from_trades(trades: &[TradeRecord]) -> Self {
        let wins: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|&p| p > 0.0).collect();
        let losses: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|&p| p < 0.0).collect();

        let mean_or_zero = |values: &[f64]| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        };

        let gross_win: f64 = wins.iter().sum();
        let gross_loss: f64 = losses.iter().sum::<f64>().abs();

        //undefined without losses, reported as 0 like every other degenerate ratio
        let profit_factor = if gross_loss > 0.0 {
            finite_or_zero(gross_win / gross_loss)
        } else {
            0.0
        };

        TradeStats {
            avg_win: mean_or_zero(&wins),
            avg_loss: mean_or_zero(&losses),
            profit_factor,
        }
    }
}

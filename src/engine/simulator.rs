use crate::config::RiskParams;
use crate::portfolio::{OpenTrade, Position, Side, TradeRecord};
use crate::signals::SignalSet;
use chrono::{DateTime, Utc};
use tracing::trace;

//output of one simulation run: one equity value per bar plus the trade log
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Simulation {
    pub equity: Vec<f64>,
    pub trades: Vec<TradeRecord>,
    //bars that ended with a position open
    pub bars_in_market: usize,
}

//single-asset, single-position simulator
//state lives for exactly one `run` call
#[derive(Debug)]
pub struct PositionSimulator {
    risk: RiskParams,
    capital: f64,
    position: Position,
    trades: Vec<TradeRecord>,
}

impl PositionSimulator {
    pub fn new(risk: RiskParams) -> Self {
        PositionSimulator {
            capital: risk.initial_capital,
            risk,
            position: Position::Flat,
            trades: Vec::new(),
        }
    }

    //replays the bars in order; bar i only ever sees close[i] and the signals at i
    //inputs are expected to be aligned, anything past the shortest slice is ignored
    pub fn run(
        mut self,
        timestamps: &[DateTime<Utc>],
        closes: &[f64],
        signals: &SignalSet,
    ) -> Simulation {
        let bar_count = timestamps
            .len()
            .min(closes.len())
            .min(signals.len());
        let mut equity = Vec::with_capacity(bar_count);
        let mut bars_in_market = 0;

        let flags = signals
            .long_entry
            .iter()
            .zip(&signals.short_entry)
            .zip(&signals.exit);

        for ((&timestamp, &close), ((&long, &short), &exit)) in
            timestamps.iter().zip(closes).zip(flags)
        {
            self.step(timestamp, close, long, short, exit);

            if !self.position.is_flat() {
                bars_in_market += 1;
            }
            equity.push(self.mark_to_market(close));
        }

        Simulation {
            equity,
            trades: self.trades,
            bars_in_market,
        }
    }

    fn step(&mut self, timestamp: DateTime<Utc>, close: f64, long: bool, short: bool, exit: bool) {
        match self.position {
            //long is checked first, so it wins when both entries fire on one bar
            Position::Flat => {
                if long {
                    self.enter(Side::Long, timestamp, close);
                } else if short {
                    self.enter(Side::Short, timestamp, close);
                }
            }
            Position::Long(_) | Position::Short(_) => {
                if exit || self.hit_stop(close) || self.hit_take_profit(close) {
                    self.exit(timestamp, close);
                }
            }
        }
    }

    fn enter(&mut self, side: Side, timestamp: DateTime<Utc>, close: f64) {
        if !(close.is_finite() && close > 0.0) {
            return;
        }

        let budget = self.capital * self.risk.position_size_fraction;
        let shares = (budget / close).floor();

        //not enough capital for a single share: stay flat
        if !(shares.is_finite() && shares >= 1.0) {
            return;
        }

        let trade = OpenTrade::new(close, timestamp, shares as u64);

        match side {
            Side::Long => self.capital -= trade.notional(close),
            //short sale proceeds are held as capital
            Side::Short => self.capital += trade.notional(close),
        }

        trace!(%timestamp, %side, shares = trade.shares, price = close, "entered position");
        self.position = Position::open(side, trade);
    }

    fn exit(&mut self, timestamp: DateTime<Utc>, close: f64) {
        let (side, trade) = match self.position {
            Position::Flat => return,
            Position::Long(trade) => (Side::Long, trade),
            Position::Short(trade) => (Side::Short, trade),
        };

        match side {
            Side::Long => self.capital += trade.notional(close),
            Side::Short => self.capital -= trade.notional(close),
        }

        let record = TradeRecord::close(side, &trade, timestamp, close);
        trace!(%timestamp, %side, pnl = record.pnl, price = close, "closed position");

        self.trades.push(record);
        self.position = Position::Flat;
    }

    fn hit_stop(&self, close: f64) -> bool {
        self.risk.stop_loss_pct > 0.0
            && self.position.price_change(close) <= -self.risk.stop_loss_pct / 100.0
    }

    fn hit_take_profit(&self, close: f64) -> bool {
        self.risk.take_profit_pct > 0.0
            && self.position.price_change(close) >= self.risk.take_profit_pct / 100.0
    }

    fn mark_to_market(&self, close: f64) -> f64 {
        self.capital + self.position.market_value(close)
    }
}

//convenience wrapper around a fresh simulator
pub fn simulate(
    timestamps: &[DateTime<Utc>],
    closes: &[f64],
    signals: &SignalSet,
    risk: &RiskParams,
) -> Simulation {
    PositionSimulator::new(*risk).run(timestamps, closes, signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn index(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| start + Duration::days(i as i64)).collect()
    }

    fn flags(n: usize, on: &[usize]) -> Vec<bool> {
        (0..n).map(|i| on.contains(&i)).collect()
    }

    fn full_size() -> RiskParams {
        RiskParams::default().with_position_size(1.0)
    }

    #[test]
    fn flat_price_round_trip_has_zero_pnl() {
        let n = 10;
        let closes = vec![100.0; n];
        let signals = SignalSet::new(flags(n, &[0]), flags(n, &[]), flags(n, &[5]));

        let sim = simulate(&index(n), &closes, &signals, &full_size());

        assert_eq!(sim.equity.len(), n);
        assert_eq!(sim.trades.len(), 1);
        let trade = &sim.trades[0];
        assert_eq!(trade.shares, 100);
        assert_eq!(trade.entry_price, 100.0);
        assert_eq!(trade.exit_price, 100.0);
        assert_eq!(trade.pnl, 0.0);
        assert!(sim.equity.iter().all(|&e| e == 10_000.0));
        assert_eq!(sim.bars_in_market, 5);
    }

    #[test]
    fn take_profit_closes_at_first_qualifying_bar() {
        let closes = vec![100.0, 102.5, 105.0, 107.5, 110.0];
        let n = closes.len();
        let signals = SignalSet::new(flags(n, &[0]), flags(n, &[]), flags(n, &[]));
        let risk = full_size().with_take_profit(5.0);

        let sim = simulate(&index(n), &closes, &signals, &risk);

        assert_eq!(sim.trades.len(), 1);
        assert_eq!(sim.trades[0].exit_price, 105.0);
        assert_eq!(sim.trades[0].exit_time, index(n)[2]);
        assert_eq!(sim.trades[0].pnl, 500.0);
    }

    #[test]
    fn stop_loss_closes_losing_short() {
        let closes = vec![100.0, 101.0, 103.0, 90.0];
        let n = closes.len();
        let signals = SignalSet::new(flags(n, &[]), flags(n, &[0]), flags(n, &[]));
        let risk = full_size().with_stop_loss(2.0);

        let sim = simulate(&index(n), &closes, &signals, &risk);

        assert_eq!(sim.trades.len(), 1);
        assert_eq!(sim.trades[0].side, Side::Short);
        assert_eq!(sim.trades[0].exit_price, 103.0);
        assert_eq!(sim.trades[0].pnl, -300.0);
        assert_eq!(*sim.equity.last().unwrap(), 9_700.0);
    }

    #[test]
    fn short_marks_to_market_as_liability() {
        let closes = vec![100.0, 80.0];
        let signals = SignalSet::new(flags(2, &[]), flags(2, &[0]), flags(2, &[]));

        let sim = simulate(&index(2), &closes, &signals, &full_size());

        //20_000 capital after the sale, owes 100 shares at 80
        assert_eq!(sim.equity, vec![10_000.0, 12_000.0]);
        assert!(sim.trades.is_empty());
    }

    #[test]
    fn long_wins_when_both_entries_fire() {
        let closes = vec![100.0, 100.0];
        let signals = SignalSet::new(flags(2, &[0]), flags(2, &[0]), flags(2, &[1]));

        let sim = simulate(&index(2), &closes, &signals, &full_size());

        assert_eq!(sim.trades[0].side, Side::Long);
    }

    #[test]
    fn exit_bar_does_not_reenter() {
        let closes = vec![100.0, 110.0, 120.0];
        let signals = SignalSet::new(flags(3, &[0, 1, 2]), flags(3, &[]), flags(3, &[1]));

        let sim = simulate(&index(3), &closes, &signals, &full_size());

        //exit at bar 1, fresh entry only at bar 2
        assert_eq!(sim.trades.len(), 1);
        assert_eq!(sim.trades[0].exit_time, index(3)[1]);
        assert_eq!(sim.bars_in_market, 2);
    }

    #[test]
    fn insufficient_capital_is_a_no_op() {
        let closes = vec![50_000.0, 50_000.0];
        let signals = SignalSet::new(flags(2, &[0, 1]), flags(2, &[]), flags(2, &[]));

        let sim = simulate(&index(2), &closes, &signals, &RiskParams::default());

        assert!(sim.trades.is_empty());
        assert_eq!(sim.equity, vec![10_000.0, 10_000.0]);
        assert_eq!(sim.bars_in_market, 0);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let sim = simulate(&[], &[], &SignalSet::never(0), &RiskParams::default());
        assert_eq!(sim, Simulation::default());
    }

    #[test]
    fn position_open_at_end_stays_open() {
        let closes = vec![100.0, 110.0];
        let signals = SignalSet::new(flags(2, &[0]), flags(2, &[]), flags(2, &[]));

        let sim = simulate(&index(2), &closes, &signals, &full_size());

        assert!(sim.trades.is_empty());
        assert_eq!(sim.equity, vec![10_000.0, 11_000.0]);
    }
}

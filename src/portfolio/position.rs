use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//direction of an open or completed trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    //+1 for long, -1 for short
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "Long"),
            Side::Short => write!(f, "Short"),
        }
    }
}

//state held only while a position is open
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenTrade {
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub shares: u64,
}

impl OpenTrade {
    pub fn new(entry_price: f64, entry_time: DateTime<Utc>, shares: u64) -> Self {
        OpenTrade {
            entry_price,
            entry_time,
            shares,
        }
    }

    pub fn notional(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }
}

//current market exposure of the simulator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Position {
    #[default]
    Flat,
    Long(OpenTrade),
    Short(OpenTrade),
}

impl Position {
    pub fn open(side: Side, trade: OpenTrade) -> Self {
        match side {
            Side::Long => Position::Long(trade),
            Side::Short => Position::Short(trade),
        }
    }

    //returns true if the position is flat (no open position)
    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            Position::Flat => None,
            Position::Long(_) => Some(Side::Long),
            Position::Short(_) => Some(Side::Short),
        }
    }

    pub fn trade(&self) -> Option<&OpenTrade> {
        match self {
            Position::Flat => None,
            Position::Long(trade) | Position::Short(trade) => Some(trade),
        }
    }

    //unrealized return since entry as a fraction, positive when the trade is winning
    pub fn price_change(&self, current_price: f64) -> f64 {
        match (self.side(), self.trade()) {
            (Some(side), Some(trade)) if trade.entry_price != 0.0 => {
                side.sign() * (current_price - trade.entry_price) / trade.entry_price
            }
            _ => 0.0,
        }
    }

    //value the open position contributes to the portfolio at `price`
    //(a short is a liability of the shares owed)
    pub fn market_value(&self, price: f64) -> f64 {
        match self {
            Position::Flat => 0.0,
            Position::Long(trade) => trade.notional(price),
            Position::Short(trade) => -trade.notional(price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn trade(entry: f64, shares: u64) -> OpenTrade {
        OpenTrade::new(entry, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), shares)
    }

    #[test]
    fn price_change_is_signed_by_side() {
        let long = Position::Long(trade(100.0, 10));
        let short = Position::Short(trade(100.0, 10));

        assert!((long.price_change(110.0) - 0.10).abs() < 1e-12);
        assert!((short.price_change(110.0) + 0.10).abs() < 1e-12);
        assert_eq!(Position::Flat.price_change(110.0), 0.0);
    }

    #[test]
    fn market_value_by_side() {
        assert_eq!(Position::Long(trade(100.0, 10)).market_value(50.0), 500.0);
        assert_eq!(Position::Short(trade(100.0, 10)).market_value(50.0), -500.0);
        assert_eq!(Position::Flat.market_value(50.0), 0.0);
    }

    #[test]
    fn flat_has_no_trade_state() {
        assert!(Position::default().is_flat());
        assert!(Position::default().trade().is_none());
        assert_eq!(Position::open(Side::Short, trade(1.0, 1)).side(), Some(Side::Short));
    }
}

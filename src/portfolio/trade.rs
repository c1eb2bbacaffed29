use crate::portfolio::position::{OpenTrade, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//one completed round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: u64,
    pub pnl: f64,
}

impl TradeRecord {
    //closes an open trade at `exit_price`
    pub fn close(
        side: Side,
        open: &OpenTrade,
        exit_time: DateTime<Utc>,
        exit_price: f64,
    ) -> Self {
        let pnl = side.sign() * (exit_price - open.entry_price) * open.shares as f64;

        TradeRecord {
            entry_time: open.entry_time,
            exit_time,
            side,
            entry_price: open.entry_price,
            exit_price,
            shares: open.shares,
            pnl,
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn pnl_follows_side() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let open = OpenTrade::new(100.0, t0, 10);

        let long = TradeRecord::close(Side::Long, &open, t0 + Duration::days(1), 90.0);
        let short = TradeRecord::close(Side::Short, &open, t0 + Duration::days(1), 90.0);

        assert_eq!(long.pnl, -100.0);
        assert_eq!(short.pnl, 100.0);
        assert!(short.is_win());
    }
}

pub mod position;
pub mod trade;

pub use position::{OpenTrade, Position, Side};
pub use trade::TradeRecord;

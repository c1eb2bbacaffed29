pub mod bar;
pub mod loader;
pub mod table;

pub use bar::{Bar, BarError};
pub use loader::{load_csv, load_csv_for_symbol, parse_timestamp};
pub use table::{PriceTable, TableError, CLOSE, HIGH, LOW, OPEN, VOLUME};

use crate::data::bar::Bar;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::sync::Arc;
use thiserror::Error;

pub const OPEN: &str = "Open";
pub const HIGH: &str = "High";
pub const LOW: &str = "Low";
pub const CLOSE: &str = "Close";
pub const VOLUME: &str = "Volume";

//columns are shared between clones and replaced wholesale, never mutated in place
pub type Column = Arc<Vec<Option<f64>>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Timestamps must be strictly increasing (violated at row {0})")]
    NonMonotonicIndex(usize),
    #[error("Column '{column}' has {found} values but the index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),
}

//time-indexed table of named numeric columns
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    timestamps: Arc<Vec<DateTime<Utc>>>,
    columns: IndexMap<String, Column>,
    aliases: IndexMap<String, String>,
}

impl PriceTable {
    //creates an empty table over the given index
    pub fn new(timestamps: Vec<DateTime<Utc>>) -> Result<Self, TableError> {
        if let Some(pos) = timestamps.windows(2).position(|w| w[0] >= w[1]) {
            return Err(TableError::NonMonotonicIndex(pos + 1));
        }

        Ok(PriceTable {
            timestamps: Arc::new(timestamps),
            columns: IndexMap::new(),
            aliases: IndexMap::new(),
        })
    }

    //builds the base ohlcv table from bars
    pub fn from_bars(bars: &[Bar]) -> Result<Self, TableError> {
        let mut table = Self::new(bars.iter().map(|b| b.timestamp).collect())?;

        let fields: [(&str, fn(&Bar) -> f64); 5] = [
            (OPEN, |b| b.open),
            (HIGH, |b| b.high),
            (LOW, |b| b.low),
            (CLOSE, |b| b.close),
            (VOLUME, |b| b.volume),
        ];

        for (name, field) in fields {
            table.insert_column(name, bars.iter().map(|b| Some(field(b))).collect())?;
        }

        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    //column names in insertion order (aliases excluded)
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    //resolves an alias or a real column name to the real column name
    pub fn resolve_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.columns.contains_key(name) {
            return Some(name);
        }
        self.aliases
            .get(name)
            .map(String::as_str)
            .filter(|target| self.columns.contains_key(*target))
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        let resolved = self.resolve_name(name)?;
        self.columns.get(resolved).map(|c| c.as_slice())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.resolve_name(name).is_some()
    }

    pub fn closes(&self) -> Option<&[Option<f64>]> {
        self.column(CLOSE)
    }

    //inserts or replaces a column that covers the whole index
    pub fn insert_column(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<(), TableError> {
        if values.len() != self.len() {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.len(),
                found: values.len(),
            });
        }

        self.columns.insert(name.to_string(), Arc::new(values));
        Ok(())
    }

    //inserts a series aligned to the most recent timestamps, padding the
    //warm-up rows at the start with missing values
    pub fn insert_right_aligned(&mut self, name: &str, series: &[f64]) -> Result<(), TableError> {
        if series.len() > self.len() {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.len(),
                found: series.len(),
            });
        }

        let padding = self.len() - series.len();
        let values = std::iter::repeat(None)
            .take(padding)
            .chain(series.iter().map(|v| v.is_finite().then_some(*v)))
            .collect();

        self.insert_column(name, values)
    }

    pub fn add_alias(&mut self, alias: &str, target: &str) -> Result<(), TableError> {
        if !self.columns.contains_key(target) {
            return Err(TableError::UnknownColumn(target.to_string()));
        }
        self.aliases.insert(alias.to_string(), target.to_string());
        Ok(())
    }

    //values of a column from its first defined row onward; later gaps become NaN
    pub fn defined_values(&self, name: &str) -> Result<Vec<f64>, TableError> {
        let column = self
            .column(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))?;

        Ok(column
            .iter()
            .skip_while(|v| v.is_none())
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    }
}

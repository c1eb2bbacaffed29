use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BarError {
    #[error("Non-finite {field}: {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("Non-positive close: {0}")]
    NonPositiveClose(f64),
    #[error("High ({high}) below low ({low})")]
    InvertedRange { high: f64, low: f64 },
    #[error("{field} ({value}) outside [{low}, {high}]")]
    OutsideRange {
        field: &'static str,
        value: f64,
        low: f64,
        high: f64,
    },
    #[error("Negative volume: {0}")]
    NegativeVolume(f64),
}

//one ohlcv row of a time-indexed price series; the simulator only reads close
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, BarError> {
        for (field, value) in [("open", open), ("high", high), ("low", low), ("close", close), ("volume", volume)] {
            if !value.is_finite() {
                return Err(BarError::NonFinite { field, value });
            }
        }

        if close <= 0.0 {
            return Err(BarError::NonPositiveClose(close));
        }
        if high < low {
            return Err(BarError::InvertedRange { high, low });
        }
        for (field, value) in [("open", open), ("close", close)] {
            if value < low || value > high {
                return Err(BarError::OutsideRange { field, value, low, high });
            }
        }
        if volume < 0.0 {
            return Err(BarError::NegativeVolume(volume));
        }

        Ok(Self::new_unchecked(timestamp, open, high, low, close, volume))
    }

    pub fn new_unchecked(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    //open, high, low and close all at one price, no volume
    pub fn flat(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self::new_unchecked(timestamp, price, price, price, price, 0.0)
    }
}

pub mod augment;
pub mod builtin;
pub mod config;

pub use augment::{augment, augment_in_place, column_name};
pub use builtin::BuiltinIndicators;
pub use config::IndicatorConfig;

use crate::data::{PriceTable, TableError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Unknown indicator '{0}'")]
    UnknownIndicator(String),
    #[error("Unknown input column '{0}'")]
    UnknownInput(String),
    #[error("{indicator} takes {expected} input column(s), got {found}")]
    WrongInputCount {
        indicator: String,
        expected: usize,
        found: usize,
    },
    #[error("{indicator} requires parameter '{param}'")]
    MissingParameter { indicator: String, param: String },
    #[error("{indicator}: invalid value {value} for '{param}': {reason}")]
    InvalidParameter {
        indicator: String,
        param: String,
        value: f64,
        reason: String,
    },
    #[error("{indicator} needs at least {needed} values, only {available} available")]
    InsufficientData {
        indicator: String,
        needed: usize,
        available: usize,
    },
    #[error(transparent)]
    Table(#[from] TableError),
}

//a concrete parameter value; integers stay integers so column names stay stable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            ParamValue::Int(v) => *v as f64,
            ParamValue::Float(v) => *v,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

//named parameters in declaration order
pub type Params = IndexMap<String, ParamValue>;

//output suffix -> series; series may be shorter than the input and are
//aligned to its most recent rows
pub type IndicatorOutput = IndexMap<String, Vec<f64>>;

//computes derived series for a named indicator
pub trait IndicatorProvider: Sync {
    fn compute(
        &self,
        table: &PriceTable,
        name: &str,
        inputs: &[String],
        params: &Params,
    ) -> Result<IndicatorOutput, IndicatorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_values_keep_their_kind() {
        let params: Params = serde_json::from_str(r#"{"period": 20, "stddev": 2.5}"#).unwrap();
        assert_eq!(params["period"], ParamValue::Int(20));
        assert_eq!(params["stddev"], ParamValue::Float(2.5));
        assert_eq!(params["period"].to_string(), "20");
        assert_eq!(ParamValue::Float(2.0).to_string(), "2");
    }
}

pub mod condition;
pub mod strategy;

pub use condition::{evaluate_all, CompareOp, Condition, Operand};
pub use strategy::{SignalRole, StrategySpec};

use crate::data::PriceTable;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("Unknown column '{0}' in condition")]
    UnknownColumn(String),
    #[error("Cannot parse condition '{input}': {reason}")]
    Parse { input: String, reason: String },
    #[error("Signal construction failed: {0}")]
    Build(String),
}

//the three per-bar signal series consumed by the simulator
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalSet {
    pub long_entry: Vec<bool>,
    pub short_entry: Vec<bool>,
    pub exit: Vec<bool>,
}

impl SignalSet {
    pub fn new(long_entry: Vec<bool>, short_entry: Vec<bool>, exit: Vec<bool>) -> Self {
        SignalSet {
            long_entry,
            short_entry,
            exit,
        }
    }

    //no signal ever fires
    pub fn never(len: usize) -> Self {
        Self::new(vec![false; len], vec![false; len], vec![false; len])
    }

    //length of the shortest series
    pub fn len(&self) -> usize {
        self.long_entry
            .len()
            .min(self.short_entry.len())
            .min(self.exit.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    //true when all three series cover exactly `len` bars
    pub fn is_aligned_with(&self, len: usize) -> bool {
        self.long_entry.len() == len && self.short_entry.len() == len && self.exit.len() == len
    }
}

//builds the three signal series from an indicator-augmented table
pub trait SignalBuilder: Sync {
    fn build(&self, table: &PriceTable) -> Result<SignalSet, SignalError>;
}

impl<F> SignalBuilder for F
where
    F: Fn(&PriceTable) -> Result<SignalSet, SignalError> + Sync,
{
    fn build(&self, table: &PriceTable) -> Result<SignalSet, SignalError> {
        self(table)
    }
}

use crate::data::PriceTable;
use crate::signals::condition::{evaluate_all, Condition};
use crate::signals::{SignalBuilder, SignalError, SignalSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalRole {
    LongEntry,
    ShortEntry,
    Exit,
}

impl fmt::Display for SignalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalRole::LongEntry => write!(f, "long entry"),
            SignalRole::ShortEntry => write!(f, "short entry"),
            SignalRole::Exit => write!(f, "exit"),
        }
    }
}

//caller-owned strategy logic: every role is a list of conditions joined with AND
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySpec {
    pub long_entry: Vec<Condition>,
    pub short_entry: Vec<Condition>,
    pub exit: Vec<Condition>,
}

impl StrategySpec {
    pub fn conditions(&self, role: SignalRole) -> &[Condition] {
        match role {
            SignalRole::LongEntry => &self.long_entry,
            SignalRole::ShortEntry => &self.short_entry,
            SignalRole::Exit => &self.exit,
        }
    }

    pub fn evaluate(&self, role: SignalRole, table: &PriceTable) -> Result<Vec<bool>, SignalError> {
        evaluate_all(self.conditions(role), table)
    }

    //a role that fails to evaluate never fires instead of aborting the run
    pub fn build_fail_closed(&self, table: &PriceTable) -> SignalSet {
        let role_or_never = |role: SignalRole| {
            self.evaluate(role, table).unwrap_or_else(|err| {
                warn!(%role, error = %err, "signal construction failed, treating as never");
                vec![false; table.len()]
            })
        };

        SignalSet::new(
            role_or_never(SignalRole::LongEntry),
            role_or_never(SignalRole::ShortEntry),
            role_or_never(SignalRole::Exit),
        )
    }
}

impl SignalBuilder for StrategySpec {
    fn build(&self, table: &PriceTable) -> Result<SignalSet, SignalError> {
        Ok(SignalSet::new(
            self.evaluate(SignalRole::LongEntry, table)?,
            self.evaluate(SignalRole::ShortEntry, table)?,
            self.evaluate(SignalRole::Exit, table)?,
        ))
    }
}

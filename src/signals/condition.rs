use crate::data::PriceTable;
use crate::signals::SignalError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl CompareOp {
    pub const ALL: [CompareOp; 6] = [
        CompareOp::Gt,
        CompareOp::Lt,
        CompareOp::Ge,
        CompareOp::Le,
        CompareOp::Eq,
        CompareOp::Ne,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }

    pub fn apply(&self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Gt => left > right,
            CompareOp::Lt => left < right,
            CompareOp::Ge => left >= right,
            CompareOp::Le => left <= right,
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
        }
    }
}

impl FromStr for CompareOp {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompareOp::ALL
            .into_iter()
            .find(|op| op.symbol() == s)
            .ok_or_else(|| SignalError::Parse {
                input: s.to_string(),
                reason: "unknown comparison operator".to_string(),
            })
    }
}

//one side of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Column(String),
    Literal(f64),
}

impl Operand {
    pub fn column(name: impl Into<String>) -> Self {
        Operand::Column(name.into())
    }

    fn resolve<'a>(&'a self, table: &'a PriceTable) -> Result<Resolved<'a>, SignalError> {
        match self {
            Operand::Literal(value) => Ok(Resolved::Literal(*value)),
            Operand::Column(name) => table
                .column(name)
                .map(Resolved::Column)
                .ok_or_else(|| SignalError::UnknownColumn(name.clone())),
        }
    }
}

//finite numbers are literals, anything else names a column or alias
impl FromStr for Operand {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SignalError::Parse {
                input: s.to_string(),
                reason: "empty operand".to_string(),
            });
        }

        match s.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Operand::Literal(value)),
            _ => Ok(Operand::Column(s.to_string())),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(name) => write!(f, "{}", name),
            Operand::Literal(value) => write!(f, "{}", value),
        }
    }
}

enum Resolved<'a> {
    Column(&'a [Option<f64>]),
    Literal(f64),
}

impl Resolved<'_> {
    fn at(&self, index: usize) -> Option<f64> {
        match self {
            Resolved::Column(values) => values.get(index).copied().flatten(),
            Resolved::Literal(value) => Some(*value),
        }
    }
}

//typed comparison, written and read as "left op right" (eg "RSI_14 < 30")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Condition {
    pub left: Operand,
    pub op: CompareOp,
    pub right: Operand,
}

impl Condition {
    pub fn new(left: Operand, op: CompareOp, right: Operand) -> Self {
        Condition { left, op, right }
    }

    //evaluates the comparison on every row; rows with a missing value are false
    pub fn evaluate(&self, table: &PriceTable) -> Result<Vec<bool>, SignalError> {
        let left = self.left.resolve(table)?;
        let right = self.right.resolve(table)?;

        Ok((0..table.len())
            .map(|i| match (left.at(i), right.at(i)) {
                (Some(l), Some(r)) => self.op.apply(l, r),
                _ => false,
            })
            .collect())
    }
}

impl FromStr for Condition {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_error = |reason: &str| SignalError::Parse {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let start = s
            .find(['<', '>', '=', '!'])
            .ok_or_else(|| parse_error("missing comparison operator"))?;
        let rest = &s[start..];
        let op_len = if rest.len() > 1 && rest.as_bytes()[1] == b'=' { 2 } else { 1 };

        let op: CompareOp = rest[..op_len]
            .parse()
            .map_err(|_| parse_error("unknown comparison operator"))?;
        let left: Operand = s[..start]
            .parse()
            .map_err(|_| parse_error("missing left operand"))?;
        let right: Operand = rest[op_len..]
            .parse()
            .map_err(|_| parse_error("missing right operand"))?;

        Ok(Condition { left, op, right })
    }
}

impl TryFrom<String> for Condition {
    type Error = SignalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Condition> for String {
    fn from(condition: Condition) -> Self {
        condition.to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op.symbol(), self.right)
    }
}

//logical and across all conditions; an empty list never fires
pub fn evaluate_all(conditions: &[Condition], table: &PriceTable) -> Result<Vec<bool>, SignalError> {
    if conditions.is_empty() {
        return Ok(vec![false; table.len()]);
    }

    let mut combined = vec![true; table.len()];
    for condition in conditions {
        let mask = condition.evaluate(table)?;
        for (acc, hit) in combined.iter_mut().zip(mask) {
            *acc &= hit;
        }
    }

    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn table() -> PriceTable {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut table = PriceTable::new((0..4).map(|i| start + Duration::days(i)).collect()).unwrap();
        table
            .insert_column("Close", vec![Some(10.0), Some(20.0), Some(30.0), Some(40.0)])
            .unwrap();
        table.insert_right_aligned("SMA_2", &[15.0, 25.0, 35.0]).unwrap();
        table.add_alias("fast", "SMA_2").unwrap();
        table
    }

    #[test]
    fn parses_all_operators() {
        for op in CompareOp::ALL {
            let text = format!("Close {} 30", op.symbol());
            let condition: Condition = text.parse().unwrap();
            assert_eq!(condition.op, op);
            assert_eq!(condition.left, Operand::column("Close"));
            assert_eq!(condition.right, Operand::Literal(30.0));
        }
    }

    #[test]
    fn parses_without_spaces_and_negative_literals() {
        let condition: Condition = "MACD_12_26_9_histogram<-0.5".parse().unwrap();
        assert_eq!(condition.left, Operand::column("MACD_12_26_9_histogram"));
        assert_eq!(condition.op, CompareOp::Lt);
        assert_eq!(condition.right, Operand::Literal(-0.5));
    }

    #[test]
    fn rejects_malformed_text() {
        assert!("Close 30".parse::<Condition>().is_err());
        assert!("> 30".parse::<Condition>().is_err());
        assert!("Close >".parse::<Condition>().is_err());
        assert!("Close =< 3".parse::<Condition>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        let condition = Condition::new(Operand::column("fast"), CompareOp::Ge, Operand::Literal(2.5));
        assert_eq!(condition.to_string(), "fast >= 2.5");
        assert_eq!(condition.to_string().parse::<Condition>().unwrap(), condition);
    }

    #[test]
    fn missing_values_compare_false() {
        let condition: Condition = "Close > SMA_2".parse().unwrap();
        assert_eq!(condition.evaluate(&table()).unwrap(), vec![false, true, true, true]);

        let not_equal: Condition = "fast != 0".parse().unwrap();
        assert_eq!(not_equal.evaluate(&table()).unwrap(), vec![false, true, true, true]);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let condition: Condition = "RSI_14 < 30".parse().unwrap();
        assert_eq!(
            condition.evaluate(&table()),
            Err(SignalError::UnknownColumn("RSI_14".to_string()))
        );
    }

    #[test]
    fn conditions_are_anded() {
        let conditions: Vec<Condition> = vec![
            "Close > 15".parse().unwrap(),
            "Close < 35".parse().unwrap(),
        ];
        assert_eq!(
            evaluate_all(&conditions, &table()).unwrap(),
            vec![false, true, true, false]
        );
        assert_eq!(evaluate_all(&[], &table()).unwrap(), vec![false; 4]);
    }

    #[test]
    fn serializes_as_text() {
        let condition: Condition = serde_json::from_str("\"Close <= 20\"").unwrap();
        assert_eq!(condition.op, CompareOp::Le);
        assert_eq!(serde_json::to_string(&condition).unwrap(), "\"Close <= 20\"");
    }
}

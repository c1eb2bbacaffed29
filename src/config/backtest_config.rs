use crate::config::RiskParams;
use crate::indicators::IndicatorConfig;
use crate::optimizer::{GridSearch, Objective, ParamRange, RandomSearch, SearchStrategy};
use crate::signals::{CompareOp, Condition, Operand, StrategySpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

//trial-sampling policy selectable from a config file or the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    #[default]
    Random,
    Grid,
}

impl FromStr for SearchMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" => Ok(SearchMethod::Random),
            "grid" => Ok(SearchMethod::Grid),
            other => Err(format!("unknown search method '{}' (expected random or grid)", other)),
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMethod::Random => write!(f, "random"),
            SearchMethod::Grid => write!(f, "grid"),
        }
    }
}

//parameter search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub trials: usize,
    pub method: SearchMethod,
    pub seed: Option<u64>,
    //evenly spaced points per real-valued range in grid mode
    pub grid_points: usize,
    //trials evaluated concurrently; defaults to the rayon pool size
    pub parallelism: Option<usize>,
    pub objective: Objective,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        OptimizerSettings {
            trials: 50,
            method: SearchMethod::Random,
            seed: None,
            grid_points: 5,
            parallelism: None,
            objective: Objective::TotalReturn,
        }
    }
}

impl OptimizerSettings {
    pub fn strategy(&self) -> Box<dyn SearchStrategy> {
        match self.method {
            SearchMethod::Random => Box::new(RandomSearch::new(self.seed)),
            SearchMethod::Grid => Box::new(GridSearch::new(self.grid_points)),
        }
    }
}

//complete strategy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfiguration {
    //data
    pub data_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    //indicators appended to the price table, in order
    #[serde(default)]
    pub indicators: Vec<IndicatorConfig>,

    //entry and exit conditions
    #[serde(default)]
    pub strategy: StrategySpec,

    #[serde(default)]
    pub risk: RiskParams,

    #[serde(default)]
    pub optimizer: OptimizerSettings,

    //optional output paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_equity_csv: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_trades_csv: Option<PathBuf>,
}

fn crossover(left: &str, op: CompareOp, right: &str) -> Condition {
    Condition::new(Operand::column(left), op, Operand::column(right))
}

impl Default for StrategyConfiguration {
    fn default() -> Self {
        StrategyConfiguration {
            data_path: PathBuf::from("data.csv"),
            symbol: None,
            indicators: vec![
                IndicatorConfig::new("sma")
                    .with_alias("fast")
                    .with_param("period", 10)
                    .with_range("period", ParamRange::Int { min: 5, max: 30 }),
                IndicatorConfig::new("sma")
                    .with_alias("slow")
                    .with_param("period", 50)
                    .with_range("period", ParamRange::Int { min: 40, max: 120 }),
            ],
            strategy: StrategySpec {
                long_entry: vec![crossover("fast", CompareOp::Gt, "slow")],
                short_entry: vec![],
                exit: vec![crossover("fast", CompareOp::Lt, "slow")],
            },
            risk: RiskParams::default(),
            optimizer: OptimizerSettings::default(),
            output_equity_csv: None,
            output_trades_csv: None,
        }
    }
}

impl StrategyConfiguration {
    //load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: StrategyConfiguration = serde_json::from_str(&contents)?;
        Ok(config)
    }

    //save configuration to a JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

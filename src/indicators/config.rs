use crate::indicators::{ParamValue, Params};
use crate::optimizer::ParamRange;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

//one indicator in a strategy: fixed parameters for a manual run plus the
//bounds searched by the optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub parameter_space: IndexMap<String, ParamRange>,
}

impl IndicatorConfig {
    pub fn new(name: &str) -> Self {
        IndicatorConfig {
            name: name.to_string(),
            inputs: Vec::new(),
            alias: None,
            params: Params::new(),
            parameter_space: IndexMap::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: &[&str]) -> Self {
        self.inputs = inputs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn with_param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn with_range(mut self, name: &str, range: ParamRange) -> Self {
        self.parameter_space.insert(name.to_string(), range);
        self
    }

    //fixed params overlaid with a searched assignment; searched values win
    pub fn merged_params(&self, searched: &Params) -> Params {
        let mut merged = self.params.clone();
        for (name, value) in searched {
            merged.insert(name.clone(), *value);
        }
        merged
    }
}

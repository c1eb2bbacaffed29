use crate::indicators::{IndicatorConfig, ParamValue, Params};
use crate::optimizer::SearchError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

//inclusive bounds for one searched parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamRange {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
}

impl ParamRange {
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            ParamRange::Int { min, max } if min > max => {
                Err(format!("min {} is greater than max {}", min, max))
            }
            ParamRange::Float { min, max } if !(min.is_finite() && max.is_finite()) => {
                Err("bounds must be finite".to_string())
            }
            ParamRange::Float { min, max } if min > max => {
                Err(format!("min {} is greater than max {}", min, max))
            }
            ParamRange::Float { min, max } if !(max - min).is_finite() => {
                Err(format!("width of [{}, {}] overflows", min, max))
            }
            _ => Ok(()),
        }
    }

    //uniform draw; integer ranges only ever yield integers
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ParamValue {
        match *self {
            ParamRange::Int { min, max } => ParamValue::Int(rng.gen_range(min..=max)),
            ParamRange::Float { min, max } => {
                let value = min + rng.gen::<f64>() * (max - min);
                ParamValue::Float(value.clamp(min, max))
            }
        }
    }

    //points on this axis of the grid: every integer, or `points` evenly
    //spaced reals; saturates instead of overflowing
    pub fn grid_len(&self, points: usize) -> usize {
        match *self {
            ParamRange::Int { min, max } if min > max => 0,
            ParamRange::Int { min, max } => {
                let len = i128::from(max) - i128::from(min) + 1;
                usize::try_from(len).unwrap_or(usize::MAX)
            }
            ParamRange::Float { min, max } if min > max => 0,
            ParamRange::Float { min, max } if points <= 1 || min == max => 1,
            ParamRange::Float { .. } => points,
        }
    }

    //k-th grid point, computed without materialising the axis
    pub fn grid_value(&self, points: usize, k: usize) -> ParamValue {
        match *self {
            ParamRange::Int { min, max } => {
                let value = i128::from(min) + k as i128;
                ParamValue::Int(i64::try_from(value).unwrap_or(max).min(max))
            }
            ParamRange::Float { min, max } => {
                let len = self.grid_len(points);
                if len <= 1 {
                    return ParamValue::Float(min);
                }
                if k >= len - 1 {
                    return ParamValue::Float(max);
                }
                let step = (max - min) / (len - 1) as f64;
                ParamValue::Float(min + step * k as f64)
            }
        }
    }
}

//parameter values chosen for one configured indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorAssignment {
    pub name: String,
    pub params: Params,
}

impl fmt::Display for IndicatorAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{} {{{}}}", self.name.to_uppercase(), params.join(", "))
    }
}

//one assignment per configured indicator, in configuration order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment(pub Vec<IndicatorAssignment>);

impl Assignment {
    pub fn iter(&self) -> impl Iterator<Item = &IndicatorAssignment> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|a| a.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

//checks every declared range, naming the first offending parameter
pub fn validate_space(configs: &[IndicatorConfig]) -> Result<(), SearchError> {
    for config in configs {
        for (param, range) in &config.parameter_space {
            range
                .validate()
                .map_err(|reason| SearchError::InvalidSpace {
                    indicator: config.name.clone(),
                    param: param.clone(),
                    reason,
                })?;
        }
    }
    Ok(())
}

//number of grid points in the whole space, saturating
pub fn grid_size(configs: &[IndicatorConfig], float_points: usize) -> usize {
    configs
        .iter()
        .flat_map(|c| c.parameter_space.values())
        .map(|r| r.grid_len(float_points))
        .fold(1usize, |acc, n| acc.saturating_mul(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn integer_ranges_sample_integers_within_bounds() {
        let range = ParamRange::Int { min: 5, max: 8 };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            match range.sample(&mut rng) {
                ParamValue::Int(v) => assert!((5..=8).contains(&v)),
                other => panic!("expected integer, got {:?}", other),
            }
        }
    }

    #[test]
    fn float_ranges_sample_reals_within_bounds() {
        let range = ParamRange::Float { min: 1.0, max: 2.0 };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            match range.sample(&mut rng) {
                ParamValue::Float(v) => assert!((1.0..=2.0).contains(&v)),
                other => panic!("expected float, got {:?}", other),
            }
        }
    }

    #[test]
    fn grid_points_cover_bounds() {
        let ints = ParamRange::Int { min: 2, max: 4 };
        assert_eq!(ints.grid_len(10), 3);
        assert_eq!(ints.grid_value(10, 0), ParamValue::Int(2));
        assert_eq!(ints.grid_value(10, 2), ParamValue::Int(4));

        let floats = ParamRange::Float { min: 0.0, max: 1.0 };
        assert_eq!(floats.grid_len(5), 5);
        assert_eq!(floats.grid_value(5, 0), ParamValue::Float(0.0));
        assert_eq!(floats.grid_value(5, 2), ParamValue::Float(0.5));
        assert_eq!(floats.grid_value(5, 4), ParamValue::Float(1.0));
        assert_eq!(ParamRange::Float { min: 3.0, max: 3.0 }.grid_len(5), 1);
    }

    #[test]
    fn grid_length_saturates_on_huge_integer_ranges() {
        let full = ParamRange::Int { min: i64::MIN, max: i64::MAX };
        assert_eq!(full.grid_len(5), usize::MAX);
        assert_eq!(full.grid_value(5, 0), ParamValue::Int(i64::MIN));
        assert_eq!(full.grid_value(5, 1), ParamValue::Int(i64::MIN + 1));

        let configs = vec![
            IndicatorConfig::new("sma").with_range("period", ParamRange::Int { min: 1, max: 1 << 40 }),
            IndicatorConfig::new("ema").with_range("period", full),
        ];
        assert_eq!(grid_size(&configs[..1], 5), 1 << 40);
        assert_eq!(grid_size(&configs, 5), usize::MAX);
    }

    #[test]
    fn validation_rejects_inverted_bounds() {
        assert!(ParamRange::Int { min: 9, max: 3 }.validate().is_err());
        assert!(ParamRange::Float { min: 0.0, max: f64::INFINITY }.validate().is_err());
        assert!(ParamRange::Float { min: 1.0, max: 1.0 }.validate().is_ok());
    }

    #[test]
    fn validation_rejects_float_ranges_whose_width_overflows() {
        let range = ParamRange::Float { min: -1e308, max: 1e308 };
        assert!(range.validate().is_err());

        let configs = vec![IndicatorConfig::new("bbands").with_range("stddev", range)];
        assert!(matches!(
            validate_space(&configs),
            Err(SearchError::InvalidSpace { ref param, .. }) if param == "stddev"
        ));
    }

    #[test]
    fn wide_float_ranges_sample_without_panicking() {
        let range = ParamRange::Float { min: -8e307, max: 8e307 };
        assert!(range.validate().is_ok());
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            match range.sample(&mut rng) {
                ParamValue::Float(v) => assert!(v.is_finite() && (-8e307..=8e307).contains(&v)),
                other => panic!("expected float, got {:?}", other),
            }
        }
    }

    #[test]
    fn ranges_deserialize_from_tagged_json() {
        let range: ParamRange = serde_json::from_str(r#"{"type": "int", "min": 5, "max": 50}"#).unwrap();
        assert_eq!(range, ParamRange::Int { min: 5, max: 50 });
    }
}

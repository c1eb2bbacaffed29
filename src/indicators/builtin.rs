use crate::data::{PriceTable, CLOSE, HIGH, LOW};
use crate::indicators::{IndicatorError, IndicatorOutput, IndicatorProvider, Params};

//sma, ema, wma, rsi, roc, mom, stddev, bbands, macd and atr
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinIndicators;

impl IndicatorProvider for BuiltinIndicators {
    fn compute(
        &self,
        table: &PriceTable,
        name: &str,
        inputs: &[String],
        params: &Params,
    ) -> Result<IndicatorOutput, IndicatorError> {
        let key = name.to_lowercase();
        let args = Args {
            indicator: &key,
            params,
        };
        let mut output = IndicatorOutput::new();

        match key.as_str() {
            "sma" | "ema" | "wma" | "rsi" | "roc" | "mom" | "stddev" => {
                let [values] = load_inputs::<1>(table, &key, inputs, [CLOSE])?;
                let period = args.period("period", values.len())?;
                let series = match key.as_str() {
                    "sma" => sma(&values, period),
                    "ema" => ema(&values, period),
                    "wma" => wma(&values, period),
                    "rsi" => {
                        args.require_len(period + 1, values.len())?;
                        rsi(&values, period)
                    }
                    "roc" => {
                        args.require_len(period + 1, values.len())?;
                        roc(&values, period)
                    }
                    "mom" => {
                        args.require_len(period + 1, values.len())?;
                        momentum(&values, period)
                    }
                    _ => rolling_std(&values, period),
                };
                output.insert(key.clone(), series);
            }
            "bbands" => {
                let [values] = load_inputs::<1>(table, &key, inputs, [CLOSE])?;
                let period = args.period("period", values.len())?;
                let width = args.non_negative("stddev")?;

                let middle = sma(&values, period);
                let deviation = rolling_std(&values, period);
                let lower = middle.iter().zip(&deviation).map(|(m, d)| m - width * d).collect();
                let upper = middle.iter().zip(&deviation).map(|(m, d)| m + width * d).collect();

                output.insert("lower_band".to_string(), lower);
                output.insert("middle_band".to_string(), middle);
                output.insert("upper_band".to_string(), upper);
            }
            "macd" => {
                let [values] = load_inputs::<1>(table, &key, inputs, [CLOSE])?;
                let short = args.period("short_period", values.len())?;
                let long = args.period("long_period", values.len())?;
                let signal = args.period("signal_period", values.len())?;
                if short >= long {
                    return Err(args.invalid("short_period", short as f64, "must be below long_period"));
                }

                let (line, signal_line, histogram) = macd(&values, short, long, signal);
                output.insert("macd".to_string(), line);
                output.insert("signal".to_string(), signal_line);
                output.insert("histogram".to_string(), histogram);
            }
            "atr" => {
                let [high, low, close] = load_inputs::<3>(table, &key, inputs, [HIGH, LOW, CLOSE])?;
                let period = args.period("period", close.len())?;
                output.insert(key.clone(), atr(&high, &low, &close, period));
            }
            _ => return Err(IndicatorError::UnknownIndicator(name.to_string())),
        }

        Ok(output)
    }
}

struct Args<'a> {
    indicator: &'a str,
    params: &'a Params,
}

impl Args<'_> {
    fn value(&self, param: &str) -> Result<f64, IndicatorError> {
        self.params
            .get(param)
            .map(|v| v.as_f64())
            .ok_or_else(|| IndicatorError::MissingParameter {
                indicator: self.indicator.to_string(),
                param: param.to_string(),
            })
    }

    fn invalid(&self, param: &str, value: f64, reason: &str) -> IndicatorError {
        IndicatorError::InvalidParameter {
            indicator: self.indicator.to_string(),
            param: param.to_string(),
            value,
            reason: reason.to_string(),
        }
    }

    //window lengths round to the nearest whole bar
    fn period(&self, param: &str, available: usize) -> Result<usize, IndicatorError> {
        let raw = self.value(param)?;
        if !raw.is_finite() || raw.round() < 1.0 {
            return Err(self.invalid(param, raw, "must be at least 1"));
        }

        let period = raw.round() as usize;
        self.require_len(period, available)?;
        Ok(period)
    }

    fn non_negative(&self, param: &str) -> Result<f64, IndicatorError> {
        let raw = self.value(param)?;
        if !(raw.is_finite() && raw >= 0.0) {
            return Err(self.invalid(param, raw, "must be a non-negative number"));
        }
        Ok(raw)
    }

    fn require_len(&self, needed: usize, available: usize) -> Result<(), IndicatorError> {
        if available < needed {
            return Err(IndicatorError::InsufficientData {
                indicator: self.indicator.to_string(),
                needed,
                available,
            });
        }
        Ok(())
    }
}

//reads the input columns (or the defaults), dropping leading warm-up gaps and
//right-aligning them to the shortest one
fn load_inputs<const N: usize>(
    table: &PriceTable,
    indicator: &str,
    inputs: &[String],
    defaults: [&str; N],
) -> Result<[Vec<f64>; N], IndicatorError> {
    let names: Vec<&str> = if inputs.is_empty() {
        defaults.to_vec()
    } else {
        inputs.iter().map(String::as_str).collect()
    };

    if names.len() != N {
        return Err(IndicatorError::WrongInputCount {
            indicator: indicator.to_string(),
            expected: N,
            found: names.len(),
        });
    }

    let mut columns = Vec::with_capacity(N);
    for name in names {
        let values = table
            .defined_values(name)
            .map_err(|_| IndicatorError::UnknownInput(name.to_string()))?;
        columns.push(values);
    }

    let shortest = columns.iter().map(Vec::len).min().unwrap_or(0);
    let aligned: Vec<Vec<f64>> = columns
        .into_iter()
        .map(|c| c[c.len() - shortest..].to_vec())
        .collect();

    aligned.try_into().map_err(|_| IndicatorError::WrongInputCount {
        indicator: indicator.to_string(),
        expected: N,
        found: 0,
    })
}

//simple moving average, one value per full window
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

//exponential moving average seeded with the first value, same length as the input
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());

    for &value in values {
        let next = match out.last() {
            Some(&prev) => prev + alpha * (value - prev),
            None => value,
        };
        out.push(next);
    }

    out
}

//linearly weighted moving average, newest value weighted highest
pub fn wma(values: &[f64], period: usize) -> Vec<f64> {
    let denominator = (period * (period + 1)) as f64 / 2.0;
    values
        .windows(period)
        .map(|w| {
            w.iter()
                .enumerate()
                .map(|(i, v)| v * (i + 1) as f64)
                .sum::<f64>()
                / denominator
        })
        .collect()
}

//relative strength index with wilder smoothing, first value after `period` changes
pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    let changes: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    if changes.len() < period {
        return Vec::new();
    }

    let gain = |c: f64| c.max(0.0);
    let loss = |c: f64| (-c).max(0.0);

    let mut avg_gain = changes[..period].iter().map(|&c| gain(c)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|&c| loss(c)).sum::<f64>() / period as f64;

    let to_rsi = |avg_gain: f64, avg_loss: f64| {
        if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        }
    };

    let mut out = Vec::with_capacity(changes.len() - period + 1);
    out.push(to_rsi(avg_gain, avg_loss));

    for &change in &changes[period..] {
        avg_gain = (avg_gain * (period - 1) as f64 + gain(change)) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss(change)) / period as f64;
        out.push(to_rsi(avg_gain, avg_loss));
    }

    out
}

//rate of change as a fraction of the value `period` bars ago
pub fn roc(values: &[f64], period: usize) -> Vec<f64> {
    values
        .iter()
        .skip(period)
        .zip(values)
        .map(|(now, then)| (now - then) / then)
        .collect()
}

pub fn momentum(values: &[f64], period: usize) -> Vec<f64> {
    values
        .iter()
        .skip(period)
        .zip(values)
        .map(|(now, then)| now - then)
        .collect()
}

//population standard deviation over each full window
pub fn rolling_std(values: &[f64], period: usize) -> Vec<f64> {
    values
        .windows(period)
        .map(|w| {
            let mean = w.iter().sum::<f64>() / period as f64;
            let variance = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
            variance.sqrt()
        })
        .collect()
}

//macd line, signal line and histogram, starting once the long ema has a full window
pub fn macd(
    values: &[f64],
    short: usize,
    long: usize,
    signal: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let fast = ema(values, short);
    let slow = ema(values, long);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();

    let warm_up = long - 1;
    let line = line[warm_up.min(line.len())..].to_vec();
    let signal_line = ema(&line, signal);
    let histogram = line.iter().zip(&signal_line).map(|(m, s)| m - s).collect();

    (line, signal_line, histogram)
}

//average true range with wilder smoothing
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let n = close.len().min(high.len()).min(low.len());
    if n < period {
        return Vec::new();
    }

    let true_range: Vec<f64> = (0..n)
        .map(|i| {
            let range = high[i] - low[i];
            if i == 0 {
                range
            } else {
                range
                    .max((high[i] - close[i - 1]).abs())
                    .max((low[i] - close[i - 1]).abs())
            }
        })
        .collect();

    let mut current = true_range[..period].iter().sum::<f64>() / period as f64;
    let mut out = Vec::with_capacity(n - period + 1);
    out.push(current);

    for &tr in &true_range[period..] {
        current = (current * (period - 1) as f64 + tr) / period as f64;
        out.push(current);
    }

    out
}

pub mod sampler;
pub mod space;

pub use sampler::{GridSearch, RandomSearch, SearchStrategy};
pub use space::{grid_size, validate_space, Assignment, IndicatorAssignment, ParamRange};

use crate::config::RiskParams;
use crate::data::PriceTable;
use crate::engine::{run_backtest, BacktestError};
use crate::indicators::{augment_in_place, IndicatorConfig, IndicatorError, IndicatorProvider, Params};
use crate::metrics::ResultRecord;
use crate::signals::{SignalBuilder, SignalError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

//scalar maximised by the search loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    TotalReturn,
    Sharpe,
    Sortino,
    Calmar,
    Cagr,
    WinPercentage,
}

impl Objective {
    pub fn score(&self, record: &ResultRecord) -> f64 {
        match self {
            Objective::TotalReturn => record.total_return,
            Objective::Sharpe => record.sharpe,
            Objective::Sortino => record.sortino,
            Objective::Calmar => record.calmar,
            Objective::Cagr => record.cagr,
            Objective::WinPercentage => record.win_percentage,
        }
    }
}

//why a single trial could not be scored
#[derive(Error, Debug)]
pub enum EvalFailure {
    #[error("Indicator {indicator} failed: {source}")]
    Indicator {
        indicator: String,
        #[source]
        source: IndicatorError,
    },
    #[error(transparent)]
    Signal(#[from] SignalError),
    #[error(transparent)]
    Backtest(#[from] BacktestError),
}

#[derive(Error, Debug, PartialEq)]
pub enum SearchError {
    #[error("No valid parameter combinations found after {trials} trial(s)")]
    NoValidConfiguration { trials: usize },
    #[error("No indicators configured")]
    EmptyConfiguration,
    #[error("Invalid range for {indicator}.{param}: {reason}")]
    InvalidSpace {
        indicator: String,
        param: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best_assignment: Assignment,
    pub best_result: ResultRecord,
    pub best_objective: f64,
    pub best_trial: usize,
    pub trials_run: usize,
    pub failed_trials: usize,
}

//evaluates parameter assignments against a shared, read-only price table
pub struct Optimizer<'a> {
    provider: &'a dyn IndicatorProvider,
    builder: &'a dyn SignalBuilder,
    risk: RiskParams,
    objective: Objective,
    parallelism: usize,
}

impl<'a> Optimizer<'a> {
    pub fn new(
        provider: &'a dyn IndicatorProvider,
        builder: &'a dyn SignalBuilder,
        risk: RiskParams,
    ) -> Self {
        Optimizer {
            provider,
            builder,
            risk,
            objective: Objective::default(),
            parallelism: rayon::current_num_threads(),
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    //one trial on a private copy of the table; the caller's table is never touched
    pub fn evaluate(
        &self,
        table: &PriceTable,
        configs: &[IndicatorConfig],
        assignment: &Assignment,
    ) -> Result<ResultRecord, EvalFailure> {
        let mut working = table.clone();
        let empty = Params::new();

        for (idx, config) in configs.iter().enumerate() {
            let searched = assignment.0.get(idx).map(|a| &a.params).unwrap_or(&empty);
            let params = config.merged_params(searched);
            augment_in_place(&mut working, config, &params, self.provider).map_err(|source| {
                EvalFailure::Indicator {
                    indicator: config.name.clone(),
                    source,
                }
            })?;
        }

        let signals = self.builder.build(&working)?;
        Ok(run_backtest(&working, &signals, &self.risk)?)
    }

    pub fn search(
        &self,
        table: &PriceTable,
        configs: &[IndicatorConfig],
        strategy: &mut dyn SearchStrategy,
        trial_budget: usize,
    ) -> Result<SearchOutcome, SearchError> {
        if configs.is_empty() {
            return Err(SearchError::EmptyConfiguration);
        }
        validate_space(configs)?;

        info!(
            strategy = strategy.name(),
            trials = trial_budget,
            parallelism = self.parallelism,
            objective = ?self.objective,
            "starting parameter search"
        );

        let mut best: Option<(usize, f64, Assignment, ResultRecord)> = None;
        let mut trials_run = 0;
        let mut failed_trials = 0;

        while trials_run < trial_budget {
            let wanted = self.parallelism.min(trial_budget - trials_run);
            let batch: Vec<Assignment> = (0..wanted)
                .map_while(|_| strategy.next_assignment(configs))
                .collect();
            if batch.is_empty() {
                break;
            }
            let exhausted = batch.len() < wanted;

            let results: Vec<Result<ResultRecord, EvalFailure>> = if self.parallelism > 1 {
                batch
                    .par_iter()
                    .map(|assignment| self.evaluate(table, configs, assignment))
                    .collect()
            } else {
                batch
                    .iter()
                    .map(|assignment| self.evaluate(table, configs, assignment))
                    .collect()
            };

            //folded in trial order so ties keep the earliest trial
            for (assignment, result) in batch.into_iter().zip(results) {
                let trial = trials_run;
                trials_run += 1;

                let record = match result {
                    Ok(record) => record,
                    Err(e) => {
                        failed_trials += 1;
                        debug!(trial, assignment = %assignment, error = %e, "trial failed");
                        strategy.observe(&assignment, f64::NEG_INFINITY);
                        continue;
                    }
                };

                let score = self.objective.score(&record);
                debug!(trial, assignment = %assignment, score, trades = record.num_trades, "trial finished");
                strategy.observe(&assignment, score);

                if !score.is_finite() {
                    continue;
                }
                let improves = match &best {
                    Some((_, best_score, _, _)) => score > *best_score,
                    None => true,
                };
                if improves {
                    best = Some((trial, score, assignment, record));
                }
            }

            if exhausted {
                break;
            }
        }

        match best {
            Some((best_trial, best_objective, best_assignment, best_result)) => {
                info!(
                    trials_run,
                    failed_trials,
                    best_trial,
                    best_objective,
                    best = %best_assignment,
                    "parameter search finished"
                );
                Ok(SearchOutcome {
                    best_assignment,
                    best_result,
                    best_objective,
                    best_trial,
                    trials_run,
                    failed_trials,
                })
            }
            None => {
                info!(trials_run, failed_trials, "parameter search found no valid configuration");
                Err(SearchError::NoValidConfiguration { trials: trials_run })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Bar;
    use crate::indicators::{BuiltinIndicators, ParamValue};
    use crate::signals::SignalSet;
    use chrono::{Duration, TimeZone, Utc};

    fn rising_table() -> PriceTable {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars: Vec<Bar> = (0..20)
            .map(|i| Bar::flat(start + Duration::days(i), 100.0 + i as f64))
            .collect();
        PriceTable::from_bars(&bars).unwrap()
    }

    fn sma_space(min: i64, max: i64) -> Vec<IndicatorConfig> {
        vec![IndicatorConfig::new("sma")
            .with_alias("fast")
            .with_range("period", ParamRange::Int { min, max })]
    }

    fn period_of(outcome: &SearchOutcome) -> ParamValue {
        outcome.best_assignment.0[0].params["period"]
    }

    //goes long on the first bar only when the given column exists
    fn long_if(column: &'static str) -> impl Fn(&PriceTable) -> Result<SignalSet, SignalError> + Sync {
        move |table: &PriceTable| {
            let mut signals = SignalSet::never(table.len());
            if table.has_column(column) {
                signals.long_entry[0] = true;
            }
            Ok(signals)
        }
    }

    #[test]
    fn picks_the_highest_objective() {
        let table = rising_table();
        let builder = long_if("SMA_4");
        let optimizer = Optimizer::new(&BuiltinIndicators, &builder, RiskParams::default());

        let outcome = optimizer
            .search(&table, &sma_space(2, 5), &mut GridSearch::new(5), 10)
            .unwrap();

        assert_eq!(period_of(&outcome), ParamValue::Int(4));
        assert_eq!(outcome.best_trial, 2);
        assert_eq!(outcome.trials_run, 4);
        assert!(outcome.best_result.total_return > 0.0);
    }

    #[test]
    fn failing_signal_construction_scores_negative_infinity_and_never_wins() {
        let table = rising_table();
        let builder = |table: &PriceTable| {
            if table.has_column("SMA_3") {
                return Err(SignalError::Build("bad expression".to_string()));
            }
            let mut signals = SignalSet::never(table.len());
            signals.long_entry[0] = table.has_column("SMA_2");
            Ok(signals)
        };
        let optimizer = Optimizer::new(&BuiltinIndicators, &builder, RiskParams::default());

        let outcome = optimizer
            .search(&table, &sma_space(2, 4), &mut GridSearch::new(5), 3)
            .unwrap();

        assert_eq!(outcome.failed_trials, 1);
        assert_eq!(outcome.trials_run, 3);
        assert_eq!(period_of(&outcome), ParamValue::Int(2));
    }

    #[test]
    fn all_trials_failing_reports_no_valid_configuration() {
        let table = rising_table();
        let builder =
            |_: &PriceTable| -> Result<SignalSet, SignalError> { Err(SignalError::Build("always".to_string())) };
        let optimizer = Optimizer::new(&BuiltinIndicators, &builder, RiskParams::default())
            .with_parallelism(3);

        let result = optimizer.search(&table, &sma_space(2, 10), &mut RandomSearch::seeded(1), 7);
        assert_eq!(result.unwrap_err(), SearchError::NoValidConfiguration { trials: 7 });
    }

    #[test]
    fn indicator_rejection_is_a_failed_trial() {
        let table = rising_table();
        let builder = long_if("fast");
        let optimizer = Optimizer::new(&BuiltinIndicators, &builder, RiskParams::default());

        //periods above the table length are rejected by the indicator
        let outcome = optimizer
            .search(&table, &sma_space(19, 22), &mut GridSearch::new(5), 4)
            .unwrap();
        assert_eq!(outcome.failed_trials, 2);
        assert_eq!(period_of(&outcome), ParamValue::Int(19));
    }

    #[test]
    fn ties_keep_the_first_trial_under_parallel_evaluation() {
        let table = rising_table();
        let builder = |table: &PriceTable| -> Result<SignalSet, SignalError> { Ok(SignalSet::never(table.len())) };
        let optimizer = Optimizer::new(&BuiltinIndicators, &builder, RiskParams::default())
            .with_parallelism(4);

        let outcome = optimizer
            .search(&table, &sma_space(2, 9), &mut GridSearch::new(5), 8)
            .unwrap();
        assert_eq!(outcome.best_trial, 0);
        assert_eq!(period_of(&outcome), ParamValue::Int(2));
        assert_eq!(outcome.best_result.total_return, 0.0);
    }

    #[test]
    fn search_never_mutates_the_callers_table() {
        let table = rising_table();
        let builder = long_if("fast");
        let optimizer = Optimizer::new(&BuiltinIndicators, &builder, RiskParams::default());

        optimizer
            .search(&table, &sma_space(2, 6), &mut RandomSearch::seeded(5), 5)
            .unwrap();
        assert_eq!(table.column_names().count(), 5);
        assert!(!table.has_column("fast"));
    }

    #[test]
    fn budget_caps_the_number_of_trials() {
        let table = rising_table();
        let builder = long_if("fast");
        let optimizer = Optimizer::new(&BuiltinIndicators, &builder, RiskParams::default())
            .with_parallelism(2);

        let outcome = optimizer
            .search(&table, &sma_space(2, 6), &mut RandomSearch::seeded(5), 5)
            .unwrap();
        assert_eq!(outcome.trials_run, 5);
    }

    #[test]
    fn grid_budget_bounds_work_on_a_huge_integer_range() {
        let table = rising_table();
        let builder = long_if("fast");
        let optimizer = Optimizer::new(&BuiltinIndicators, &builder, RiskParams::default());

        let outcome = optimizer
            .search(&table, &sma_space(1, 1 << 40), &mut GridSearch::new(5), 3)
            .unwrap();
        assert_eq!(outcome.trials_run, 3);
        assert_eq!(outcome.failed_trials, 0);
        assert_eq!(period_of(&outcome), ParamValue::Int(1));
    }

    #[test]
    fn rejects_float_ranges_whose_width_overflows() {
        let table = rising_table();
        let builder = long_if("fast");
        let optimizer = Optimizer::new(&BuiltinIndicators, &builder, RiskParams::default());
        let configs = vec![IndicatorConfig::new("bbands")
            .with_param("period", 5)
            .with_range("stddev", ParamRange::Float { min: -1e308, max: 1e308 })];

        assert!(matches!(
            optimizer.search(&table, &configs, &mut RandomSearch::seeded(1), 3),
            Err(SearchError::InvalidSpace { .. })
        ));
    }

    #[test]
    fn rejects_empty_and_inverted_spaces() {
        let table = rising_table();
        let builder = long_if("fast");
        let optimizer = Optimizer::new(&BuiltinIndicators, &builder, RiskParams::default());

        assert_eq!(
            optimizer
                .search(&table, &[], &mut RandomSearch::seeded(1), 3)
                .unwrap_err(),
            SearchError::EmptyConfiguration
        );
        assert!(matches!(
            optimizer.search(&table, &sma_space(9, 2), &mut RandomSearch::seeded(1), 3),
            Err(SearchError::InvalidSpace { .. })
        ));
    }

    #[test]
    fn objective_selects_the_scored_metric() {
        let table = rising_table();
        let builder = long_if("fast");
        let config = IndicatorConfig::new("sma").with_alias("fast").with_param("period", 3);
        let optimizer = Optimizer::new(&BuiltinIndicators, &builder, RiskParams::default())
            .with_objective(Objective::Sharpe);

        let record = optimizer
            .evaluate(&table, &[config], &Assignment::default())
            .unwrap();
        assert_eq!(optimizer.objective().score(&record), record.sharpe);
        assert_eq!(Objective::TotalReturn.score(&record), record.total_return);
    }
}

use crate::indicators::{IndicatorConfig, Params};
use crate::optimizer::space::{Assignment, IndicatorAssignment, ParamRange};
use rand::rngs::StdRng;
use rand::SeedableRng;

//trial-sampling policy behind the search loop
pub trait SearchStrategy: Send {
    //next assignment to try; None once the strategy has nothing left to offer
    fn next_assignment(&mut self, configs: &[IndicatorConfig]) -> Option<Assignment>;

    //feedback hook for adaptive strategies; objective is -inf for failed trials.
    //random and grid search ignore it
    fn observe(&mut self, _assignment: &Assignment, _objective: f64) {}

    fn name(&self) -> &str;
}

//independent uniform draws inside every declared range
pub struct RandomSearch {
    rng: StdRng,
}

impl RandomSearch {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        RandomSearch { rng }
    }

    pub fn seeded(seed: u64) -> Self {
        RandomSearch::new(Some(seed))
    }
}

impl SearchStrategy for RandomSearch {
    fn next_assignment(&mut self, configs: &[IndicatorConfig]) -> Option<Assignment> {
        let assignments = configs
            .iter()
            .map(|config| {
                let params: Params = config
                    .parameter_space
                    .iter()
                    .map(|(name, range)| (name.clone(), range.sample(&mut self.rng)))
                    .collect();
                IndicatorAssignment {
                    name: config.name.clone(),
                    params,
                }
            })
            .collect();
        Some(Assignment(assignments))
    }

    fn name(&self) -> &str {
        "random"
    }
}

//one searched parameter; values are computed from the counter on demand
struct GridAxis {
    config: usize,
    param: String,
    range: ParamRange,
    len: usize,
}

//cartesian product of every range, walked lazily like an odometer with the
//last declared parameter turning fastest
pub struct GridSearch {
    float_points: usize,
    axes: Option<Vec<GridAxis>>,
    counters: Vec<usize>,
    exhausted: bool,
}

impl GridSearch {
    pub fn new(float_points: usize) -> Self {
        GridSearch {
            float_points: float_points.max(1),
            axes: None,
            counters: Vec::new(),
            exhausted: false,
        }
    }

    fn build_axes(&self, configs: &[IndicatorConfig]) -> Vec<GridAxis> {
        configs
            .iter()
            .enumerate()
            .flat_map(|(idx, config)| {
                config.parameter_space.iter().map(move |(param, range)| GridAxis {
                    config: idx,
                    param: param.clone(),
                    range: *range,
                    len: range.grid_len(self.float_points),
                })
            })
            .collect()
    }

    fn advance(&mut self, axes: &[GridAxis]) {
        for pos in (0..axes.len()).rev() {
            self.counters[pos] += 1;
            if self.counters[pos] < axes[pos].len {
                return;
            }
            self.counters[pos] = 0;
        }
        self.exhausted = true;
    }
}

impl SearchStrategy for GridSearch {
    fn next_assignment(&mut self, configs: &[IndicatorConfig]) -> Option<Assignment> {
        if self.axes.is_none() {
            let axes = self.build_axes(configs);
            self.exhausted = axes.iter().any(|axis| axis.len == 0);
            self.counters = vec![0; axes.len()];
            self.axes = Some(axes);
        }
        if self.exhausted {
            return None;
        }

        let axes = self.axes.take()?;
        let mut assignments: Vec<IndicatorAssignment> = configs
            .iter()
            .map(|config| IndicatorAssignment {
                name: config.name.clone(),
                params: Params::new(),
            })
            .collect();
        for (axis, &counter) in axes.iter().zip(&self.counters) {
            if let Some(slot) = assignments.get_mut(axis.config) {
                slot.params.insert(axis.param.clone(), axis.range.grid_value(self.float_points, counter));
            }
        }

        self.advance(&axes);
        self.axes = Some(axes);
        Some(Assignment(assignments))
    }

    fn name(&self) -> &str {
        "grid"
    }
}

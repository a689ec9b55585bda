//! Test providers.

use std::collections::HashMap;

use hdf_core::{ScheduleError, Solution};

use crate::provider::{ScheduleProvider, UnitView};

/// Answers schedule requests from a table keyed by the textual rate key.
#[derive(Debug, Default)]
pub struct Table {
    solutions: HashMap<String, Solution>,
    fallback: Option<Solution>,
    pub calls: usize,
    pub requested: Vec<String>,
}

impl Table {
    /// Returns `solution` for every rate configuration.
    pub fn fixed(solution: Solution) -> Self {
        Self {
            fallback: Some(solution),
            ..Self::default()
        }
    }

    /// Returns `solution` for the configuration rendered as `key`.
    pub fn with(mut self, key: &str, solution: Solution) -> Self {
        self.solutions.insert(key.to_string(), solution);
        self
    }
}

impl ScheduleProvider for Table {
    fn compute_schedule(&mut self, unit: &UnitView<'_>) -> Result<Solution, ScheduleError> {
        self.calls += 1;
        let key = unit.key.to_string();
        self.requested.push(key.clone());

        self.solutions
            .get(&key)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| ScheduleError::Inconsistent(format!("no solution for rates {key}")))
    }
}

//! Interface to the balance-equation solver.

use hdf_core::{Port, RateKey, Schedule, ScheduleError, Solution};

use crate::nested::Entity;

/// Read-only view of the unit a schedule is requested for.
#[derive(Debug, Clone, Copy)]
pub struct UnitView<'a> {
    /// Name of the unit.
    pub name: &'a str,

    /// Rate configuration the schedule must satisfy.
    pub key: &'a RateKey,

    /// The unit's own boundary ports.
    pub ports: &'a [Port],

    /// Contained entities in declaration order.
    pub entities: &'a [Entity],
}

/// Computes schedules for rate configurations.
///
/// Implementations solve the balance equations of a unit for its current
/// rates and report the resulting rates of the unit's boundary ports.
pub trait ScheduleProvider {
    /// Computes a schedule and the external rates it induces.
    fn compute_schedule(&mut self, unit: &UnitView<'_>) -> Result<Solution, ScheduleError>;

    /// Returns how often `schedule` fires `entity` per iteration.
    fn local_firing_count(&self, schedule: &Schedule, entity: &str) -> Option<u64> {
        schedule.firing_count(entity)
    }
}

impl<F> ScheduleProvider for F
where
    F: FnMut(&UnitView<'_>) -> Result<Solution, ScheduleError>,
{
    fn compute_schedule(&mut self, unit: &UnitView<'_>) -> Result<Solution, ScheduleError> {
        self(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_provider() {
        let mut calls = 0;
        let mut provider = |unit: &UnitView<'_>| {
            calls += 1;
            Ok::<_, ScheduleError>(Solution::new(Schedule::new().with_firing(unit.name, 2)))
        };

        let key = RateKey::new([1], [1]);
        let view = UnitView {
            name: "top",
            key: &key,
            ports: &[],
            entities: &[],
        };

        let solution = provider.compute_schedule(&view).unwrap();
        assert_eq!(
            provider.local_firing_count(&solution.schedule, "top"),
            Some(2)
        );
        assert_eq!(calls, 1);
    }
}

//! Propagation of firing multipliers through nested scheduling domains.

use hdf_core::{HdfError, Phase, Result, Schedule};

use crate::nested::{Entity, NestedSchedulable};
use crate::provider::ScheduleProvider;

/// Pushes firing multipliers down a hierarchy of nested units.
///
/// After a pass, every reachable unit's multiplier is the product of the
/// local firing counts on its containment path, times the root multiplier.
pub struct FiringPropagator;

impl FiringPropagator {
    /// Sets the multiplier of `root` and propagates it to everything nested
    /// inside it.
    pub fn propagate(
        root: &mut dyn NestedSchedulable,
        multiplier: u32,
        phase: Phase,
    ) -> Result<()> {
        tracing::debug!(root = root.name(), multiplier, ?phase, "Propagating firing multipliers");
        root.set_firing_multiplier(multiplier);
        root.propagate_to_children(multiplier, phase)
    }

    /// One level of propagation: `multiplier` is the multiplier of `parent`,
    /// whose current schedule is `schedule`.
    ///
    /// Each nested entity receives its local firing count times
    /// `multiplier` and recurses. An entity the schedule never fires, or
    /// fires zero times, is a structural error.
    pub fn descend<P: ScheduleProvider + ?Sized>(
        parent: &str,
        schedule: &Schedule,
        provider: &P,
        entities: &mut [Entity],
        multiplier: u32,
        phase: Phase,
    ) -> Result<()> {
        for unit in entities.iter_mut().filter_map(Entity::as_nested_mut) {
            let local = provider
                .local_firing_count(schedule, unit.name())
                .filter(|&count| count > 0)
                .ok_or_else(|| HdfError::StructuralInconsistency {
                    parent: parent.to_string(),
                    entity: unit.name().to_string(),
                })?;

            let firings = local
                .checked_mul(u64::from(multiplier))
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| HdfError::MultiplierOverflow {
                    unit: parent.to_string(),
                    entity: unit.name().to_string(),
                })?;

            tracing::trace!(parent, entity = unit.name(), local, firings, "Firing multiplier");
            unit.set_firing_multiplier(firings);
            unit.propagate_to_children(firings, phase)?;
        }
        Ok(())
    }
}

//! HDF Engine - Schedule caching and firing propagation for heterochronous
//! dataflow.

mod cache;
mod coordinator;
mod key;
mod mode;
mod nested;
mod propagate;
mod provider;

#[cfg(test)]
mod testing;

pub use cache::{CacheEntry, ScheduleCache};
pub use coordinator::{CoordinatorState, ScheduleCoordinator};
pub use key::{RateKeyBuilder, RateSignature};
pub use mode::{ModeController, ModeSelector};
pub use nested::{Entity, NestedKind, NestedSchedulable};
pub use propagate::FiringPropagator;
pub use provider::{ScheduleProvider, UnitView};

//! HDF Core - Core types for heterochronous dataflow scheduling.

mod actor;
mod config;
mod error;
mod key;
mod port;
mod schedule;
mod tracker;

pub use actor::Actor;
pub use config::{CacheCapacity, DEFAULT_CACHE_SIZE, DirectorConfig};
pub use error::{HdfError, Result, ScheduleError};
pub use key::RateKey;
pub use port::{Port, PortDirection, Rate};
pub use schedule::{ExternalRates, Firing, Schedule, Solution};
pub use tracker::{ChangeTracker, Phase};

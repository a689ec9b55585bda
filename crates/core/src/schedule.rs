//! Static schedules produced for one rate configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::port::Rate;

/// Effective rates of a unit's own boundary ports, keyed by port name.
pub type ExternalRates = BTreeMap<String, Rate>;

/// One step of a schedule: fire `entity` `count` times in a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Firing {
    pub entity: String,
    pub count: u32,
}

/// An ordered firing sequence for the entities of a unit.
///
/// An entity may appear more than once; its firing count per iteration is
/// the sum over all its appearances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    firings: Vec<Firing>,
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a firing step.
    pub fn with_firing(mut self, entity: impl Into<String>, count: u32) -> Self {
        self.push(entity, count);
        self
    }

    /// Appends a firing step.
    pub fn push(&mut self, entity: impl Into<String>, count: u32) {
        self.firings.push(Firing {
            entity: entity.into(),
            count,
        });
    }

    /// Returns the firing steps in order.
    pub fn firings(&self) -> &[Firing] {
        &self.firings
    }

    /// Returns how many times `entity` fires per iteration, or `None` if the
    /// schedule never mentions it.
    ///
    /// The sum is widened to `u64` so that repeated appearances cannot wrap;
    /// callers narrow it and report overflow themselves.
    pub fn firing_count(&self, entity: &str) -> Option<u64> {
        self.firings
            .iter()
            .filter(|f| f.entity == entity)
            .map(|f| u64::from(f.count))
            .reduce(u64::saturating_add)
    }

    pub fn is_empty(&self) -> bool {
        self.firings.is_empty()
    }
}

/// What a schedule provider computes for one rate configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub schedule: Schedule,
    pub external_rates: ExternalRates,
}

impl Solution {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            external_rates: ExternalRates::new(),
        }
    }

    /// Sets the effective rate of one boundary port.
    pub fn with_external_rate(mut self, port: impl Into<String>, rate: Rate) -> Self {
        self.external_rates.insert(port.into(), rate);
        self
    }
}

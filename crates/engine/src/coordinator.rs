//! Schedule coordination for one heterochronous dataflow unit.

use std::sync::Arc;

use hdf_core::{
    Actor, CacheCapacity, ChangeTracker, DirectorConfig, ExternalRates, HdfError, Phase, Port,
    Rate, RateKey, Result, Schedule,
};

use crate::cache::{CacheEntry, ScheduleCache};
use crate::key::RateKeyBuilder;
use crate::nested::{Entity, NestedKind, NestedSchedulable};
use crate::propagate::FiringPropagator;
use crate::provider::{ScheduleProvider, UnitView};

/// Validity of the coordinator's current schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// No schedule was ever requested.
    Uninitialized,

    /// The current schedule matches the current rates.
    Valid,

    /// Rates or structure changed since the last resolution.
    Invalid,
}

/// Decides which schedule applies to a unit whose actors change rates
/// between iterations.
///
/// Schedules are cached per rate configuration, so a recurring
/// configuration is resolved without consulting the provider.
pub struct ScheduleCoordinator<P> {
    /// Unit name.
    name: String,

    /// The unit's own boundary ports; external rates are applied here.
    ports: Vec<Port>,

    /// Contained actors and nested units in declaration order.
    entities: Vec<Entity>,

    /// Balance-equation solver.
    provider: P,

    /// Schedules by rate configuration.
    cache: ScheduleCache,

    /// Model-wide change counter.
    tracker: ChangeTracker,

    /// The last resolved schedule.
    current: Option<CacheEntry>,

    /// Tracker version at which `current` was resolved; `None` once
    /// explicitly invalidated.
    resolved_at: Option<u64>,

    /// Whether a resolution was ever attempted.
    initialized: bool,

    /// Firings of this unit per iteration of the root.
    firings_per_iteration: u32,

    /// Whether this unit is nested in another unit.
    has_container: bool,
}

impl<P: ScheduleProvider> ScheduleCoordinator<P> {
    /// Creates a coordinator for an empty unit.
    pub fn new(name: impl Into<String>, provider: P, tracker: ChangeTracker) -> Self {
        Self {
            name: name.into(),
            ports: Vec::new(),
            entities: Vec::new(),
            provider,
            cache: ScheduleCache::default(),
            tracker,
            current: None,
            resolved_at: None,
            initialized: false,
            firings_per_iteration: 1,
            has_container: false,
        }
    }

    /// Adds a boundary port.
    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    /// Adds an atomic actor.
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.entities.push(Entity::Actor(actor));
        self
    }

    /// Adds a nested unit, which from now on receives its multiplier from
    /// this coordinator.
    pub fn with_nested(mut self, mut unit: impl NestedSchedulable + 'static) -> Self {
        unit.set_has_container(true);
        self.entities.push(Entity::Nested(Box::new(unit)));
        self
    }

    /// Sets the cache capacity.
    pub fn with_cache_capacity(mut self, capacity: CacheCapacity) -> Self {
        self.set_cache_capacity(capacity);
        self
    }

    /// Applies a director configuration.
    pub fn with_config(mut self, config: &DirectorConfig) -> Self {
        self.apply_config(config);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Looks up a boundary port by name.
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Looks up a contained entity by name.
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name() == name)
    }

    /// Looks up a nested unit by name.
    pub fn nested_unit(&self, name: &str) -> Option<&dyn NestedSchedulable> {
        self.entity(name).and_then(Entity::as_nested)
    }

    /// Looks up a nested unit by name for mutation.
    pub fn nested_unit_mut(&mut self, name: &str) -> Option<&mut (dyn NestedSchedulable + 'static)> {
        self.entities
            .iter_mut()
            .find(|e| e.name() == name)
            .and_then(Entity::as_nested_mut)
    }

    pub fn cache(&self) -> &ScheduleCache {
        &self.cache
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Returns the validity of the current schedule.
    pub fn state(&self) -> CoordinatorState {
        match (&self.current, self.resolved_at) {
            (None, _) if !self.initialized => CoordinatorState::Uninitialized,
            (Some(_), Some(version)) if version == self.tracker.version() => {
                CoordinatorState::Valid
            }
            _ => CoordinatorState::Invalid,
        }
    }

    /// Forces the next request to re-resolve the schedule.
    pub fn invalidate(&mut self) {
        self.resolved_at = None;
    }

    /// Returns the last resolved schedule, even if it is no longer valid.
    pub fn current_schedule(&self) -> Option<Arc<Schedule>> {
        self.current.as_ref().map(|e| Arc::clone(&e.schedule))
    }

    /// Returns the external rates of the last resolved schedule.
    pub fn external_rates(&self) -> Option<Arc<ExternalRates>> {
        self.current.as_ref().map(|e| Arc::clone(&e.external_rates))
    }

    /// Returns the rate key for the current rates of the contained entities.
    pub fn rate_key(&self) -> RateKey {
        RateKeyBuilder::build(self.entities.as_slice())
    }

    pub fn director_firings_per_iteration(&self) -> u32 {
        self.firings_per_iteration
    }

    pub fn set_director_firings_per_iteration(&mut self, firings: u32) {
        self.firings_per_iteration = firings;
    }

    /// Changes the cache capacity; a different capacity empties the cache.
    pub fn set_cache_capacity(&mut self, capacity: CacheCapacity) {
        self.cache.set_capacity(capacity);
    }

    /// Applies a director configuration.
    pub fn apply_config(&mut self, config: &DirectorConfig) {
        self.set_cache_capacity(config.cache_capacity());
    }

    /// Changes the rate of a port of a contained actor.
    ///
    /// An actual change invalidates every schedule of the model.
    pub fn set_rate(&mut self, entity: &str, port: &str, rate: Rate) -> Result<()> {
        let actor = self
            .entities
            .iter_mut()
            .find_map(|e| match e {
                Entity::Actor(actor) if actor.name == entity => Some(actor),
                _ => None,
            })
            .ok_or_else(|| HdfError::EntityNotFound {
                unit: self.name.clone(),
                entity: entity.to_string(),
            })?;

        if actor.set_rate(port, rate)? {
            tracing::debug!(unit = %self.name, entity, port, rate, "Rate changed");
            self.tracker.bump();
        }
        Ok(())
    }

    /// Returns the schedule for the current rates.
    ///
    /// A valid schedule is returned as is. Otherwise the rate key is looked
    /// up in the cache, and only on a miss is the provider consulted. The
    /// resolved external rates are written to the boundary ports.
    #[tracing::instrument(level = "debug", skip(self), fields(unit = %self.name))]
    pub fn request_schedule(&mut self) -> Result<Arc<Schedule>> {
        if self.state() == CoordinatorState::Valid {
            if let Some(entry) = &self.current {
                return Ok(Arc::clone(&entry.schedule));
            }
        }

        self.initialized = true;
        let key = self.rate_key();

        let resolved = self.resolve(&key).and_then(|entry| {
            self.apply_external_rates(&entry.external_rates)?;
            Ok(entry)
        });

        let entry = match resolved {
            Ok(entry) => entry,
            Err(e) => {
                self.current = None;
                self.resolved_at = None;
                return Err(e);
            }
        };

        let schedule = Arc::clone(&entry.schedule);
        self.current = Some(entry);
        self.resolved_at = Some(self.tracker.version());
        Ok(schedule)
    }

    /// Prepares a run: sets up nested units, resolves this unit's schedule
    /// and, at the root, seeds propagation with a multiplier of 1.
    #[tracing::instrument(level = "debug", skip(self), fields(unit = %self.name))]
    pub fn on_setup(&mut self) -> Result<()> {
        self.invalidate();

        for unit in self.entities.iter_mut().filter_map(Entity::as_nested_mut) {
            unit.on_setup()?;
        }

        self.request_schedule()?;

        if !self.has_container {
            FiringPropagator::propagate(self, 1, Phase::Setup)?;
        }
        Ok(())
    }

    /// Revalidates after an iteration and, at the root, recomputes the
    /// multipliers of all nested units.
    #[tracing::instrument(level = "debug", skip(self), fields(unit = %self.name))]
    pub fn on_post_iteration(&mut self) -> Result<()> {
        self.request_schedule()?;

        if !self.has_container {
            FiringPropagator::propagate(self, 1, Phase::Iteration)?;
        }
        Ok(())
    }

    fn resolve(&mut self, key: &RateKey) -> Result<CacheEntry> {
        if let Some((recent, entry)) = self.cache.most_recent() {
            if recent == key {
                tracing::trace!(%key, "Rates unchanged since last resolution");
                return Ok(entry.clone());
            }
        }

        if let Some(entry) = self.cache.get(key) {
            tracing::debug!(%key, "Schedule cache hit");
            return Ok(entry);
        }

        tracing::debug!(%key, "Schedule cache miss");
        let view = UnitView {
            name: &self.name,
            key,
            ports: &self.ports,
            entities: &self.entities,
        };
        let solution = self.provider.compute_schedule(&view).map_err(|source| {
            HdfError::SchedulingInconsistency {
                unit: self.name.clone(),
                rates: key.clone(),
                source,
            }
        })?;

        let entry = CacheEntry::from(solution);
        if let Some(evicted) = self.cache.put(key.clone(), entry.clone()) {
            tracing::debug!(%evicted, "Evicted schedule");
        }
        Ok(entry)
    }

    fn apply_external_rates(&mut self, rates: &ExternalRates) -> Result<()> {
        let mut changed = false;

        for (name, &rate) in rates {
            let port = self
                .ports
                .iter_mut()
                .find(|p| &p.name == name)
                .ok_or_else(|| HdfError::PortNotFound {
                    owner: self.name.clone(),
                    port: name.clone(),
                })?;

            if port.rate != rate {
                tracing::trace!(port = %name, from = port.rate, to = rate, "External rate");
                port.rate = rate;
                changed = true;
            }
        }

        if changed {
            self.tracker.bump();
        }
        Ok(())
    }
}

impl<P: ScheduleProvider> NestedSchedulable for ScheduleCoordinator<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    fn kind(&self) -> NestedKind {
        NestedKind::Dataflow
    }

    fn firing_multiplier(&self) -> u32 {
        self.firings_per_iteration
    }

    fn set_firing_multiplier(&mut self, multiplier: u32) {
        self.firings_per_iteration = multiplier;
    }

    fn nested(&self, name: &str) -> Option<&dyn NestedSchedulable> {
        self.nested_unit(name)
    }

    fn nested_mut(&mut self, name: &str) -> Option<&mut (dyn NestedSchedulable + 'static)> {
        self.nested_unit_mut(name)
    }

    fn set_rate(&mut self, entity: &str, port: &str, rate: Rate) -> Result<()> {
        ScheduleCoordinator::set_rate(self, entity, port, rate)
    }

    fn set_has_container(&mut self, has_container: bool) {
        self.has_container = has_container;
    }

    fn on_setup(&mut self) -> Result<()> {
        ScheduleCoordinator::on_setup(self)
    }

    fn on_post_iteration(&mut self) -> Result<()> {
        ScheduleCoordinator::on_post_iteration(self)
    }

    fn propagate_to_children(&mut self, multiplier: u32, phase: Phase) -> Result<()> {
        let schedule = self.request_schedule()?;
        FiringPropagator::descend(
            &self.name,
            &schedule,
            &self.provider,
            &mut self.entities,
            multiplier,
            phase,
        )
    }
}

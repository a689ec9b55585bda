//! Nested schedulable units and the entities a unit contains.

use std::fmt;

use hdf_core::{Actor, HdfError, Phase, Port, Rate, Result};

/// Kind of a nested scheduling domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedKind {
    /// A dataflow domain with its own schedule cache.
    Dataflow,

    /// A region whose active refinement is chosen by a mode controller.
    ModeControlled,
}

/// A contained entity that has its own internal schedule and firing
/// multiplier.
///
/// Propagation dispatches through this trait, whatever the concrete domain.
pub trait NestedSchedulable {
    /// Name of the unit within its container.
    fn name(&self) -> &str;

    /// Boundary ports as seen by the container.
    fn ports(&self) -> &[Port];

    fn kind(&self) -> NestedKind;

    /// Number of times this unit fires per iteration of the root.
    fn firing_multiplier(&self) -> u32;

    fn set_firing_multiplier(&mut self, multiplier: u32);

    /// Looks up a directly nested unit by name.
    fn nested(&self, _name: &str) -> Option<&dyn NestedSchedulable> {
        None
    }

    fn nested_mut(&mut self, _name: &str) -> Option<&mut (dyn NestedSchedulable + 'static)> {
        None
    }

    /// Changes the rate of a port of an actor contained directly in this
    /// unit. An actual change invalidates every schedule of the model.
    fn set_rate(&mut self, entity: &str, _port: &str, _rate: Rate) -> Result<()> {
        Err(HdfError::EntityNotFound {
            unit: self.name().to_string(),
            entity: entity.to_string(),
        })
    }

    /// Marks whether the unit sits inside another unit. Only a unit without
    /// a container seeds propagation.
    fn set_has_container(&mut self, has_container: bool);

    /// Prepares the unit for a run: resolves the schedule of this unit and
    /// everything nested in it.
    fn on_setup(&mut self) -> Result<()>;

    /// Revalidates the unit after one of its iterations completed.
    fn on_post_iteration(&mut self) -> Result<()>;

    /// Pushes `multiplier` (this unit's own multiplier) down to every nested
    /// unit, multiplying by local firing counts along the way.
    fn propagate_to_children(&mut self, multiplier: u32, phase: Phase) -> Result<()>;
}

/// An entity contained in a schedulable unit.
pub enum Entity {
    /// An atomic actor.
    Actor(Actor),

    /// A nested scheduling domain.
    Nested(Box<dyn NestedSchedulable>),
}

impl Entity {
    pub fn name(&self) -> &str {
        match self {
            Entity::Actor(actor) => &actor.name,
            Entity::Nested(unit) => unit.name(),
        }
    }

    /// Ports in declaration order.
    pub fn ports(&self) -> &[Port] {
        match self {
            Entity::Actor(actor) => &actor.ports,
            Entity::Nested(unit) => unit.ports(),
        }
    }

    pub fn as_nested(&self) -> Option<&dyn NestedSchedulable> {
        match self {
            Entity::Nested(unit) => Some(unit.as_ref()),
            Entity::Actor(_) => None,
        }
    }

    pub fn as_nested_mut(&mut self) -> Option<&mut (dyn NestedSchedulable + 'static)> {
        match self {
            Entity::Nested(unit) => Some(unit.as_mut()),
            Entity::Actor(_) => None,
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Actor(actor) => f.debug_tuple("Actor").field(actor).finish(),
            Entity::Nested(unit) => f
                .debug_struct("Nested")
                .field("name", &unit.name())
                .field("kind", &unit.kind())
                .field("firing_multiplier", &unit.firing_multiplier())
                .finish(),
        }
    }
}

impl From<Actor> for Entity {
    fn from(actor: Actor) -> Self {
        Entity::Actor(actor)
    }
}

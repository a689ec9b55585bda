//! Mode-controlled scheduling domains.
//!
//! A mode controller guards a region with a state machine: each mode refines
//! to its own nested unit, and only the active refinement determines the
//! controller's port rates. Changing mode changes those rates, which
//! invalidates the enclosing schedule.

use std::cell::RefCell;
use std::rc::Rc;

use hdf_core::{ChangeTracker, HdfError, Phase, Port, Result};

use crate::nested::{NestedKind, NestedSchedulable};
use crate::propagate::FiringPropagator;

/// A mode and the unit it refines to.
struct Mode {
    name: String,
    refinement: Box<dyn NestedSchedulable>,
}

/// Handle for requesting a mode change from outside the controller.
///
/// The request is taken at the controller's next post-iteration, so a
/// change never happens in the middle of an iteration.
#[derive(Debug, Clone, Default)]
pub struct ModeSelector {
    pending: Rc<RefCell<Option<String>>>,
}

impl ModeSelector {
    /// Requests a switch to `mode`, replacing any earlier request.
    pub fn request(&self, mode: impl Into<String>) {
        *self.pending.borrow_mut() = Some(mode.into());
    }

    /// Returns the pending request, if any.
    pub fn pending(&self) -> Option<String> {
        self.pending.borrow().clone()
    }

    fn take(&self) -> Option<String> {
        self.pending.borrow_mut().take()
    }
}

/// A nested unit whose active refinement is selected by a mode.
pub struct ModeController {
    name: String,
    ports: Vec<Port>,
    modes: Vec<Mode>,
    initial: usize,
    active: usize,
    multiplier: u32,
    has_container: bool,
    tracker: ChangeTracker,
    selector: ModeSelector,
}

impl ModeController {
    pub fn new(name: impl Into<String>, tracker: ChangeTracker) -> Self {
        Self {
            name: name.into(),
            ports: Vec::new(),
            modes: Vec::new(),
            initial: 0,
            active: 0,
            multiplier: 1,
            has_container: false,
            tracker,
            selector: ModeSelector::default(),
        }
    }

    /// Adds a boundary port.
    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    /// Adds a mode refining to `refinement`. The first mode added is the
    /// initial mode.
    pub fn with_mode(
        mut self,
        name: impl Into<String>,
        mut refinement: impl NestedSchedulable + 'static,
    ) -> Self {
        refinement.set_has_container(true);
        self.modes.push(Mode {
            name: name.into(),
            refinement: Box::new(refinement),
        });
        self
    }

    /// Selects the mode entered at setup.
    pub fn with_initial_mode(mut self, mode: &str) -> Result<Self> {
        self.initial = self.index_of(mode)?;
        self.active = self.initial;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Returns a handle for requesting mode changes.
    pub fn selector(&self) -> ModeSelector {
        self.selector.clone()
    }

    /// Returns the name of the active mode.
    pub fn active_mode(&self) -> Option<&str> {
        self.modes.get(self.active).map(|m| m.name.as_str())
    }

    /// Returns the mode names in declaration order.
    pub fn mode_names(&self) -> impl Iterator<Item = &str> {
        self.modes.iter().map(|m| m.name.as_str())
    }

    /// Returns the refinement of a mode.
    pub fn refinement(&self, mode: &str) -> Option<&dyn NestedSchedulable> {
        self.modes
            .iter()
            .find(|m| m.name == mode)
            .map(|m| m.refinement.as_ref())
    }

    /// Activates `mode` and takes over its refinement's port rates.
    ///
    /// A newly entered refinement revalidates its own schedule first, since
    /// its rates may have changed while it was inactive.
    #[tracing::instrument(level = "debug", skip(self), fields(unit = %self.name))]
    pub fn switch_mode(&mut self, mode: &str) -> Result<()> {
        let index = self.index_of(mode)?;
        if index != self.active {
            tracing::debug!(from = ?self.active_mode(), to = mode, "Mode switch");
            self.active = index;
            self.active_refinement_mut()?.on_post_iteration()?;
        }
        self.sync_rates()
    }

    fn index_of(&self, mode: &str) -> Result<usize> {
        self.modes
            .iter()
            .position(|m| m.name == mode)
            .ok_or_else(|| HdfError::ModeNotFound {
                unit: self.name.clone(),
                mode: mode.to_string(),
            })
    }

    fn active_refinement_mut(&mut self) -> Result<&mut (dyn NestedSchedulable + 'static)> {
        match self.modes.get_mut(self.active) {
            Some(mode) => Ok(mode.refinement.as_mut()),
            None => Err(HdfError::NoModes(self.name.clone())),
        }
    }

    /// Copies the active refinement's port rates onto the controller's
    /// ports. Controller ports the refinement lacks get rate 0.
    fn sync_rates(&mut self) -> Result<()> {
        let refinement = self
            .modes
            .get(self.active)
            .map(|m| m.refinement.as_ref())
            .ok_or_else(|| HdfError::NoModes(self.name.clone()))?;

        for port in refinement.ports() {
            if !self.ports.iter().any(|p| p.name == port.name) {
                return Err(HdfError::PortNotFound {
                    owner: self.name.clone(),
                    port: port.name.clone(),
                });
            }
        }

        let mut changed = false;
        for port in &mut self.ports {
            let rate = refinement
                .ports()
                .iter()
                .find(|p| p.name == port.name)
                .map_or(0, |p| p.rate);

            if port.rate != rate {
                port.rate = rate;
                changed = true;
            }
        }

        if changed {
            tracing::debug!(unit = %self.name, "Mode changed port rates");
            self.tracker.bump();
        }
        Ok(())
    }
}

impl NestedSchedulable for ModeController {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> &[Port] {
        &self.ports
    }

    fn kind(&self) -> NestedKind {
        NestedKind::ModeControlled
    }

    fn firing_multiplier(&self) -> u32 {
        self.multiplier
    }

    fn set_firing_multiplier(&mut self, multiplier: u32) {
        self.multiplier = multiplier;
    }

    fn nested(&self, name: &str) -> Option<&dyn NestedSchedulable> {
        self.modes
            .iter()
            .map(|m| m.refinement.as_ref())
            .find(|r| r.name() == name)
    }

    fn nested_mut(&mut self, name: &str) -> Option<&mut (dyn NestedSchedulable + 'static)> {
        self.modes
            .iter_mut()
            .map(|m| m.refinement.as_mut())
            .find(|r| r.name() == name)
    }

    fn set_has_container(&mut self, has_container: bool) {
        self.has_container = has_container;
    }

    fn on_setup(&mut self) -> Result<()> {
        if self.modes.is_empty() {
            return Err(HdfError::NoModes(self.name.clone()));
        }

        self.active = self.initial;
        self.selector.take();
        for mode in &mut self.modes {
            mode.refinement.on_setup()?;
        }
        self.sync_rates()?;

        if !self.has_container {
            FiringPropagator::propagate(self, 1, Phase::Setup)?;
        }
        Ok(())
    }

    fn on_post_iteration(&mut self) -> Result<()> {
        self.active_refinement_mut()?.on_post_iteration()?;

        match self.selector.take() {
            Some(mode) => self.switch_mode(&mode)?,
            None => self.sync_rates()?,
        }

        if !self.has_container {
            FiringPropagator::propagate(self, 1, Phase::Iteration)?;
        }
        Ok(())
    }

    /// Every refinement fires once per firing of the controller.
    fn propagate_to_children(&mut self, multiplier: u32, phase: Phase) -> Result<()> {
        for mode in &mut self.modes {
            mode.refinement.set_firing_multiplier(multiplier);
            mode.refinement.propagate_to_children(multiplier, phase)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::ScheduleCoordinator;
    use crate::testing::Table;
    use hdf_core::{Actor, Schedule, Solution};

    /// A refinement consuming `rate` tokens per firing on `in`.
    fn refinement(
        name: &str,
        rate: u32,
        leaf_count: u32,
        tracker: &ChangeTracker,
    ) -> ScheduleCoordinator<Table> {
        ScheduleCoordinator::new(
            name,
            Table::fixed(
                Solution::new(Schedule::new().with_firing("leaf", leaf_count))
                    .with_external_rate("in", rate),
            ),
            tracker.clone(),
        )
        .with_port(Port::input("in", 1))
        .with_actor(Actor::new("leaf").with_port(Port::input("in", 1)))
    }

    fn controller(tracker: &ChangeTracker) -> ModeController {
        ModeController::new("ctrl", tracker.clone())
            .with_port(Port::input("in", 1))
            .with_port(Port::output("out", 1))
            .with_mode("slow", refinement("slow_ref", 1, 1, tracker))
            .with_mode("fast", refinement("fast_ref", 4, 2, tracker))
    }

    #[test]
    fn test_setup_takes_initial_mode_rates() {
        let tracker = ChangeTracker::new();
        let mut ctrl = controller(&tracker).with_initial_mode("fast").unwrap();

        ctrl.on_setup().unwrap();

        assert_eq!(ctrl.active_mode(), Some("fast"));
        assert_eq!(ctrl.ports()[0].rate, 4);
        // The refinement has no "out" port.
        assert_eq!(ctrl.ports()[1].rate, 0);
    }

    #[test]
    fn test_switch_mode_changes_rates_and_bumps() {
        let tracker = ChangeTracker::new();
        let mut ctrl = controller(&tracker);
        ctrl.on_setup().unwrap();
        assert_eq!(ctrl.ports()[0].rate, 1);

        let before = tracker.version();
        ctrl.switch_mode("fast").unwrap();
        assert_eq!(ctrl.ports()[0].rate, 4);
        assert!(tracker.version() > before);

        let before = tracker.version();
        ctrl.switch_mode("fast").unwrap();
        assert_eq!(tracker.version(), before);
    }

    #[test]
    fn test_unknown_mode() {
        let tracker = ChangeTracker::new();
        let mut ctrl = controller(&tracker);

        assert!(matches!(
            ctrl.switch_mode("turbo"),
            Err(HdfError::ModeNotFound { .. })
        ));
        assert!(controller(&tracker).with_initial_mode("turbo").is_err());
    }

    #[test]
    fn test_no_modes() {
        let mut ctrl = ModeController::new("empty", ChangeTracker::new());

        assert!(matches!(ctrl.on_setup(), Err(HdfError::NoModes(_))));
        assert!(matches!(ctrl.on_post_iteration(), Err(HdfError::NoModes(_))));
    }

    #[test]
    fn test_refinement_port_without_counterpart() {
        let tracker = ChangeTracker::new();
        let mut ctrl = ModeController::new("ctrl", tracker.clone())
            .with_port(Port::output("out", 1))
            .with_mode("only", refinement("only_ref", 2, 1, &tracker));

        let err = ctrl.on_setup().unwrap_err();
        assert!(matches!(err, HdfError::PortNotFound { .. }));
    }

    #[test]
    fn test_root_controller_seeds_propagation() {
        let tracker = ChangeTracker::new();
        let mut ctrl = controller(&tracker);
        ctrl.set_firing_multiplier(9);

        ctrl.on_setup().unwrap();

        assert_eq!(ctrl.firing_multiplier(), 1);
        assert_eq!(ctrl.refinement("fast").unwrap().firing_multiplier(), 1);
        assert_eq!(ctrl.mode_names().collect::<Vec<_>>(), vec!["slow", "fast"]);
    }

    #[test]
    fn test_requested_switch_applies_after_iteration() {
        let tracker = ChangeTracker::new();
        let mut ctrl = controller(&tracker);
        ctrl.on_setup().unwrap();

        let selector = ctrl.selector();
        selector.request("fast");
        assert_eq!(ctrl.active_mode(), Some("slow"));

        ctrl.on_post_iteration().unwrap();
        assert_eq!(ctrl.active_mode(), Some("fast"));
        assert_eq!(selector.pending(), None);
    }

    #[test]
    fn test_switch_revalidates_entered_refinement() {
        let tracker = ChangeTracker::new();
        let consumes = |rate| {
            Solution::new(Schedule::new().with_firing("leaf", 1)).with_external_rate("in", rate)
        };
        let fast = ScheduleCoordinator::new(
            "fast_ref",
            Table::default()
                .with("1", consumes(4))
                .with("2", consumes(8)),
            tracker.clone(),
        )
        .with_port(Port::input("in", 1))
        .with_actor(Actor::new("leaf").with_port(Port::input("in", 1)));
        let mut ctrl = ModeController::new("ctrl", tracker.clone())
            .with_port(Port::input("in", 1))
            .with_mode("slow", refinement("slow_ref", 1, 1, &tracker))
            .with_mode("fast", fast);
        ctrl.on_setup().unwrap();

        // The inactive refinement changes rates.
        ctrl.nested_mut("fast_ref")
            .unwrap()
            .set_rate("leaf", "in", 2)
            .unwrap();
        ctrl.switch_mode("fast").unwrap();

        assert_eq!(ctrl.ports()[0].rate, 8);
        assert_eq!(ctrl.refinement("fast").unwrap().ports()[0].rate, 8);
    }

    #[test]
    fn test_controller_has_no_actors_to_retime() {
        let tracker = ChangeTracker::new();
        let mut ctrl = controller(&tracker);

        assert!(matches!(
            ctrl.set_rate("leaf", "in", 2),
            Err(HdfError::EntityNotFound { .. })
        ));
        assert!(ctrl.nested_mut("missing").is_none());
    }

    #[test_log::test]
    fn test_mode_switch_reuses_enclosing_schedules() {
        let tracker = ChangeTracker::new();
        let ctrl = controller(&tracker);
        let selector = ctrl.selector();

        let provider = Table::default()
            .with(
                "1|0|1",
                Solution::new(Schedule::new().with_firing("src", 1).with_firing("ctrl", 1)),
            )
            .with(
                "4|0|1",
                Solution::new(Schedule::new().with_firing("src", 4).with_firing("ctrl", 1)),
            );
        let mut root = ScheduleCoordinator::new("root", provider, tracker.clone())
            .with_nested(ctrl)
            .with_actor(Actor::new("src").with_port(Port::output("out", 1)));

        root.on_setup().unwrap();
        assert_eq!(root.rate_key().to_string(), "1|0|1");

        for (mode, key) in [("fast", "4|0|1"), ("slow", "1|0|1"), ("fast", "4|0|1")] {
            selector.request(mode);
            root.nested_unit_mut("ctrl").unwrap().on_post_iteration().unwrap();
            root.on_post_iteration().unwrap();
            assert_eq!(root.rate_key().to_string(), key);
        }

        assert_eq!(root.provider().calls, 2);
        assert_eq!(root.cache().len(), 2);
    }

    #[test]
    fn test_propagation_reaches_every_refinement() {
        let tracker = ChangeTracker::new();
        let provider = Table::fixed(Solution::new(
            Schedule::new().with_firing("src", 1).with_firing("ctrl", 3),
        ));
        let mut root = ScheduleCoordinator::new("root", provider, tracker.clone())
            .with_actor(Actor::new("src").with_port(Port::output("out", 1)))
            .with_nested(controller(&tracker));

        root.on_setup().unwrap();

        let ctrl = root.nested_unit("ctrl").unwrap();
        assert_eq!(ctrl.kind(), NestedKind::ModeControlled);
        assert_eq!(ctrl.firing_multiplier(), 3);
        assert_eq!(ctrl.nested("slow_ref").unwrap().firing_multiplier(), 3);
        assert_eq!(ctrl.nested("fast_ref").unwrap().firing_multiplier(), 3);
    }

    #[test]
    fn test_propagation_descends_below_refinements() {
        let tracker = ChangeTracker::new();
        let inner = ScheduleCoordinator::new(
            "inner",
            Table::fixed(Solution::new(Schedule::new())),
            tracker.clone(),
        );
        let refinement = ScheduleCoordinator::new(
            "ref",
            Table::fixed(Solution::new(Schedule::new().with_firing("inner", 5))),
            tracker.clone(),
        )
        .with_nested(inner);
        let ctrl = ModeController::new("ctrl", tracker.clone()).with_mode("only", refinement);

        let provider = Table::fixed(Solution::new(Schedule::new().with_firing("ctrl", 2)));
        let mut root = ScheduleCoordinator::new("root", provider, tracker.clone()).with_nested(ctrl);

        root.on_setup().unwrap();

        let inner = root
            .nested_unit("ctrl")
            .and_then(|c| c.nested("ref"))
            .and_then(|r| r.nested("inner"))
            .unwrap();
        assert_eq!(inner.firing_multiplier(), 10);
    }
}

//! Parallel states: orthogonal regions entered, exited and driven together.

use super::composite::EntryMode;
use super::engine::Machine;
use super::error::MachineError;
use super::node::StateId;
use super::transition::StepResult;
use crate::core::Event;
use chrono::{DateTime, Utc};

/// A parallel whose regions are being processed, with the region
/// transitions that leave it.
#[derive(Debug)]
pub(crate) struct ParallelScope {
    pub(crate) parallel: StateId,
    pub(crate) deferred: Vec<DeferredTransition>,
}

/// A transition selected inside a region that exits the parallel. It
/// fires only after every region has seen the event.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeferredTransition {
    pub(crate) source: StateId,
    pub(crate) index: usize,
    /// Generation of `source` at selection; a source exited or re-entered
    /// in the meantime no longer fires.
    pub(crate) generation: u64,
    /// Whether the transition was selected against the event or on a
    /// conditional check.
    pub(crate) with_event: bool,
}

impl<C, E: Event> Machine<C, E> {
    /// Offer `event` to every region, then to the parallel's own
    /// transitions.
    ///
    /// Every region sees the original event even if an earlier region
    /// consumed it. Region transitions that leave the parallel are held
    /// back until all regions ran, then fired in selection order. The own
    /// check runs last, with no event if any region consumed it.
    pub(crate) fn process_parallel(
        &mut self,
        id: StateId,
        event: Option<&E>,
    ) -> Result<StepResult, MachineError> {
        self.parallel_scopes.push(ParallelScope {
            parallel: id,
            deferred: Vec::new(),
        });
        let processed = self.process_regions(id, event);
        let scope = self.parallel_scopes.pop();
        let mut result = processed?;
        let generation = self.nodes[id.0].generation;

        for deferred in scope.map(|scope| scope.deferred).unwrap_or_default() {
            if !self.is_current(deferred.source, deferred.generation) {
                continue;
            }
            let deferred_event = if deferred.with_event { event } else { None };
            result |= self.fire(deferred.source, deferred.index, deferred_event)?;
        }
        if !self.is_current(id, generation) {
            return Ok(result);
        }

        let own_event = if result.consumed { None } else { event };
        result |= self.check_transitions(id, own_event)?;
        Ok(result)
    }

    fn process_regions(
        &mut self,
        id: StateId,
        event: Option<&E>,
    ) -> Result<StepResult, MachineError> {
        let mut result = StepResult::default();
        for region in self.nodes[id.0].children().to_vec() {
            result |= self.process(region, event)?;
        }
        Ok(result)
    }

    /// Outermost parallel being processed that `domain` lies above.
    /// Transitions with such a domain must wait for that parallel's
    /// remaining regions.
    pub(crate) fn deferring_scope(&self, domain: StateId) -> Option<usize> {
        self.parallel_scopes
            .iter()
            .position(|scope| self.nodes[scope.parallel.0].ancestors.contains(&domain))
    }

    /// Enter every region with the same mode, in declaration order.
    pub(crate) fn commit_region_entry(
        &mut self,
        id: StateId,
        mode: EntryMode,
        now: DateTime<Utc>,
        entered: &mut Vec<StateId>,
    ) {
        for region in self.nodes[id.0].children().to_vec() {
            self.commit_entry(region, mode, now, entered);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::{event_transition, MachineBuilder, TransitionBuilder, ROOT};
    use crate::core::Action;
    use crate::machine::Machine;

    type Log = Vec<String>;

    fn crossing() -> MachineBuilder<Log, &'static str> {
        MachineBuilder::new()
            .parallel("Crossing", ROOT, ["Light", "Walk"])
            .composite("Light", "Crossing", "Red")
            .leaf("Red", "Light")
            .leaf("Green", "Light")
            .composite("Walk", "Crossing", "Walking")
            .leaf("Walking", "Walk")
            .leaf("Waiting", "Walk")
            .leaf("Off", ROOT)
            .initial("Crossing")
            .on_entry(
                "Walking",
                Action::new(|log: &mut Log, _| log.push("enter Walking".to_string())),
            )
            .on_exit(
                "Walking",
                Action::new(|log: &mut Log, _| log.push("exit Walking".to_string())),
            )
    }

    fn started(builder: MachineBuilder<Log, &'static str>) -> Machine<Log, &'static str> {
        let mut machine = builder.build(Log::new()).unwrap();
        machine.start().unwrap();
        machine.context_mut().clear();
        machine
    }

    #[test]
    fn leaving_the_parallel_waits_for_every_region() {
        let mut machine = started(
            crossing()
                .add_transition(event_transition("Red", "Tick", "Off"))
                .transition(
                    TransitionBuilder::new()
                        .from("Walking")
                        .on("Tick")
                        .to("Waiting")
                        .run(|log: &mut Log, _| log.push("walk region moved".to_string())),
                )
                .unwrap(),
        );

        machine.apply_event(Some(&"Tick")).unwrap();

        assert_eq!(machine.active_configuration(), vec!["Off"]);
        assert_eq!(machine.context(), &vec!["exit Walking", "walk region moved"]);
    }

    #[test]
    fn cross_region_transition_reenters_the_parallel() {
        let mut machine = started(crossing().add_transition(event_transition("Red", "Cross", "Waiting")));

        machine.apply_event(Some(&"Cross")).unwrap();

        assert_eq!(
            machine.active_configuration(),
            vec!["Crossing", "Light", "Red", "Walk", "Waiting"]
        );
        assert_eq!(machine.context(), &vec!["exit Walking"]);
    }

    #[test]
    fn stale_deferred_transition_is_dropped() {
        let mut machine = started(
            crossing()
                .add_transition(event_transition("Red", "Tick", "Off"))
                .add_transition(event_transition("Walking", "Tick", "Off"))
                .add_transition(event_transition("Off", "Tick", "Crossing")),
        );

        machine.apply_event(Some(&"Tick")).unwrap();

        assert_eq!(machine.active_configuration(), vec!["Off"]);
        assert_eq!(machine.journal().len(), 1);
        assert_eq!(machine.journal().last().unwrap().from, "Red");
    }

    #[test]
    fn deep_history_restores_every_region() {
        let mut machine = started(
            crossing()
                .add_transition(event_transition("Red", "Tick", "Green"))
                .add_transition(event_transition("Walking", "Tick", "Waiting"))
                .add_transition(event_transition("Crossing", "PowerCut", "Off"))
                .transition(
                    TransitionBuilder::new()
                        .from("Off")
                        .on("PowerOn")
                        .to("Crossing")
                        .history(crate::machine::HistoryKind::Deep),
                )
                .unwrap(),
        );

        for event in ["Tick", "PowerCut", "PowerOn"] {
            machine.apply_event(Some(&event)).unwrap();
        }

        assert_eq!(machine.active_leaves(), vec!["Green", "Waiting"]);
    }
}

//! Property-based tests for machine execution.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated state trees and event sequences.

use proptest::prelude::*;
use statechart::builder::{conditional_transition, event_transition};
use statechart::{
    Action, Machine, MachineBuilder, MachineConfig, MachineError, TransitionBuilder, ROOT,
};

type Log = Vec<String>;

fn logging(builder: MachineBuilder<Log, &'static str>, key: &str) -> MachineBuilder<Log, &'static str> {
    let entry = format!("enter {key}");
    let exit = format!("exit {key}");
    builder
        .on_entry(key, Action::new(move |log: &mut Log, _| log.push(entry.clone())))
        .on_exit(key, Action::new(move |log: &mut Log, _| log.push(exit.clone())))
}

/// Two nested chains `A0 > A1 > .. > A{depth}` and `B0 > .. > B{depth}`
/// with a transition from the innermost A to the innermost B.
fn twin_chains(depth: usize) -> Machine<Log, &'static str> {
    let mut builder = MachineBuilder::new().initial("A0");
    for prefix in ["A", "B"] {
        for level in 0..depth {
            let parent = if level == 0 {
                ROOT.to_string()
            } else {
                format!("{prefix}{}", level - 1)
            };
            builder = builder.composite(
                format!("{prefix}{level}"),
                parent,
                format!("{prefix}{}", level + 1),
            );
        }
        let leaf = format!("{prefix}{depth}");
        let parent = if depth == 0 {
            ROOT.to_string()
        } else {
            format!("{prefix}{}", depth - 1)
        };
        builder = builder.leaf(leaf, parent);
        for level in 0..=depth {
            builder = logging(builder, &format!("{prefix}{level}"));
        }
    }

    builder
        .add_transition(event_transition(
            format!("A{depth}"),
            "Go",
            format!("B{depth}"),
        ))
        .build(Log::new())
        .unwrap()
}

fn crossing(regions: usize) -> Machine<Log, &'static str> {
    let names: Vec<String> = (0..regions).map(|region| format!("R{region}")).collect();
    let mut builder = MachineBuilder::new().parallel("Crossing", ROOT, names.clone());
    for name in &names {
        builder = builder
            .composite(name.clone(), "Crossing", format!("{name}.off"))
            .leaf(format!("{name}.off"), name.clone())
            .leaf(format!("{name}.on"), name.clone())
            .add_transition(event_transition(
                format!("{name}.off"),
                "Toggle",
                format!("{name}.on"),
            ));
    }
    builder.build(Log::new()).unwrap()
}

proptest! {
    #[test]
    fn entries_run_outermost_first(depth in 0usize..8) {
        let mut machine = twin_chains(depth);
        machine.start().unwrap();

        let expected: Vec<String> = (0..=depth).map(|level| format!("enter A{level}")).collect();
        prop_assert_eq!(machine.context(), &expected);
        prop_assert_eq!(machine.active_configuration().len(), depth + 1);
    }

    #[test]
    fn exits_run_innermost_first(depth in 0usize..8) {
        let mut machine = twin_chains(depth);
        machine.start().unwrap();
        machine.context_mut().clear();

        machine.apply_event(Some(&"Go")).unwrap();

        let mut expected: Vec<String> = (0..=depth).rev().map(|level| format!("exit A{level}")).collect();
        expected.extend((0..=depth).map(|level| format!("enter B{level}")));
        prop_assert_eq!(machine.context(), &expected);
    }

    #[test]
    fn start_is_idempotent(repeats in 1usize..5) {
        let mut machine = twin_chains(3);
        machine.start().unwrap();
        let configuration = machine.active_configuration();
        let entries = machine.context().len();

        for _ in 0..repeats {
            let result = machine.start().unwrap();
            prop_assert!(!result.changed());
        }
        prop_assert_eq!(machine.active_configuration(), configuration);
        prop_assert_eq!(machine.context().len(), entries);
    }

    #[test]
    fn every_region_starts_and_sees_the_event(regions in 1usize..6) {
        let mut machine = crossing(regions);
        machine.start().unwrap();

        let off: Vec<String> = (0..regions).map(|region| format!("R{region}.off")).collect();
        prop_assert_eq!(machine.active_leaves(), off);

        machine.apply_event(Some(&"Toggle")).unwrap();
        let on: Vec<String> = (0..regions).map(|region| format!("R{region}.on")).collect();
        prop_assert_eq!(machine.active_leaves(), on);
    }

    #[test]
    fn cycle_guard_stops_after_the_configured_passes(max in 1usize..40) {
        let mut machine = MachineBuilder::<usize, &'static str>::new()
            .composite("Loop", ROOT, "A")
            .leaf("A", "Loop")
            .leaf("B", "Loop")
            .transition(TransitionBuilder::new().from("A").to("B").run(|fired: &mut usize, _| *fired += 1))
            .unwrap()
            .transition(TransitionBuilder::new().from("B").to("A").run(|fired: &mut usize, _| *fired += 1))
            .unwrap()
            .config(MachineConfig::default().with_max_transitions_per_step(max))
            .build(0)
            .unwrap();

        let err = machine.start().unwrap_err();
        let is_unterminated = matches!(err, MachineError::UnterminatedLoop { limit, .. } if limit == max);
        prop_assert!(is_unterminated);
        prop_assert_eq!(*machine.context(), max + 1);
    }

    #[test]
    fn cascade_as_long_as_the_bound_settles(max in 1usize..20) {
        let mut builder = MachineBuilder::<(), &'static str>::new().composite("Chain", ROOT, "S0");
        for index in 0..=max + 1 {
            builder = builder.leaf(format!("S{index}"), "Chain");
        }
        builder = builder.add_transition(event_transition("S0", "Go", "S1"));
        for index in 1..=max {
            builder = builder.add_transition(conditional_transition(
                format!("S{index}"),
                format!("S{}", index + 1),
                |_: &(), _| true,
            ));
        }
        let mut machine = builder
            .config(MachineConfig::default().with_max_transitions_per_step(max))
            .build(())
            .unwrap();
        machine.start().unwrap();

        machine.apply_event(Some(&"Go")).unwrap();

        let last = format!("S{}", max + 1);
        prop_assert_eq!(machine.active_leaves(), vec![last]);
        prop_assert_eq!(machine.journal().len(), max + 1);
    }

    #[test]
    fn journal_keeps_the_most_recent_records(capacity in 1usize..10, events in 0usize..30) {
        let mut machine = MachineBuilder::<(), &'static str>::new()
            .composite("Light", ROOT, "Red")
            .leaf("Red", "Light")
            .leaf("Green", "Light")
            .add_transition(event_transition("Red", "Tick", "Green"))
            .add_transition(event_transition("Green", "Tick", "Red"))
            .config(MachineConfig::default().with_journal_capacity(Some(capacity)))
            .build(())
            .unwrap();
        machine.start().unwrap();

        for _ in 0..events {
            machine.apply_event(Some(&"Tick")).unwrap();
        }

        prop_assert_eq!(machine.journal().len(), events.min(capacity));
        if events > 0 {
            let expected = if events % 2 == 1 { "Green" } else { "Red" };
            prop_assert_eq!(machine.journal().last().unwrap().to.as_deref(), Some(expected));
        }
    }
}

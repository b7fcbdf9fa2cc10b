//! A pedestrian crossing: a traffic light and a walk signal running as two
//! regions of one parallel state, with a maintenance mode that remembers
//! where the crossing was.
//!
//! Run with `cargo run --example traffic_light`.

use statechart::builder::event_transition;
use statechart::dispatch::Dispatcher;
use statechart::{event_enum, Action, HistoryKind, MachineBuilder, TransitionBuilder, ROOT};

event_enum! {
    enum Signal {
        Tick,
        Service,
        Resume,
    }
}

#[derive(Debug, Default)]
struct Crossing {
    cycles: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let machine = MachineBuilder::<Crossing, Signal>::new()
        .parallel("Operating", ROOT, ["Light", "Walk"])
        .composite("Light", "Operating", "Red")
        .leaf("Red", "Light")
        .leaf("Green", "Light")
        .leaf("Yellow", "Light")
        .composite("Walk", "Operating", "Walking")
        .leaf("Walking", "Walk")
        .leaf("Waiting", "Walk")
        .leaf("Maintenance", ROOT)
        .initial("Operating")
        .on_entry(
            "Red",
            Action::new(|crossing: &mut Crossing, _| crossing.cycles += 1),
        )
        .add_transition(event_transition("Red", "Tick", "Green"))
        .add_transition(event_transition("Green", "Tick", "Yellow"))
        .add_transition(event_transition("Yellow", "Tick", "Red"))
        .add_transition(event_transition("Walking", "Tick", "Waiting"))
        .add_transition(event_transition("Waiting", "Tick", "Walking"))
        .add_transition(event_transition("Operating", "Service", "Maintenance"))
        .transition(
            TransitionBuilder::new()
                .from("Maintenance")
                .on("Resume")
                .to("Operating")
                .history(HistoryKind::Deep),
        )?
        .trace(|step| println!("{:?} -> {:?}", step.previous, step.current))
        .build(Crossing::default())?;

    let handle = Dispatcher::spawn(machine, |err| eprintln!("step failed: {err}"));
    for signal in [
        Signal::Tick,
        Signal::Tick,
        Signal::Service,
        Signal::Resume,
        Signal::Tick,
    ] {
        handle.submit(signal)?;
    }

    let machine = handle.shutdown().await?;
    println!(
        "final: {:?} after {} red phases",
        machine.active_leaves(),
        machine.context().cycles
    );
    Ok(())
}

//! Queued mode: a machine owned by a tokio task.
//!
//! [`Dispatcher::spawn`] moves the machine into a worker task that applies
//! submitted events one at a time, in submission order. Errors raised while
//! processing an event are handed to the error sink; the worker keeps
//! going with the next event.

use crate::core::Event;
use crate::machine::{Machine, MachineError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Errors from the queued dispatcher.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Dispatcher is closed; the event was not queued")]
    Closed,

    #[error("Dispatcher worker panicked")]
    WorkerPanicked,
}

enum Command<E> {
    Event(E),
    Shutdown,
}

/// Entry point for queued mode.
pub struct Dispatcher;

impl Dispatcher {
    /// Move `machine` into a new worker task.
    ///
    /// The worker starts the machine if it has not been started yet. Must
    /// be called from within a tokio runtime.
    pub fn spawn<C, E, F>(machine: Machine<C, E>, error_sink: F) -> DispatcherHandle<C, E>
    where
        C: Send + 'static,
        E: Event,
        F: Fn(MachineError) + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(machine, receiver, error_sink));
        DispatcherHandle {
            sender: EventSender { sender },
            worker,
        }
    }
}

async fn run_worker<C, E, F>(
    mut machine: Machine<C, E>,
    mut commands: mpsc::UnboundedReceiver<Command<E>>,
    error_sink: F,
) -> Machine<C, E>
where
    E: Event,
    F: Fn(MachineError),
{
    let id = machine.instance_id();
    debug!(machine = %id, "dispatcher started");

    if !machine.is_started() {
        if let Err(err) = machine.start() {
            warn!(machine = %id, error = %err, "failed to start machine");
            error_sink(err);
        }
    }

    while let Some(command) = commands.recv().await {
        match command {
            Command::Event(event) => {
                if let Err(err) = machine.apply_event(Some(&event)) {
                    warn!(machine = %id, event = event.kind(), error = %err, "event failed");
                    error_sink(err);
                }
            }
            // Anything already queued is still delivered by `recv`.
            Command::Shutdown => commands.close(),
        }
    }

    debug!(machine = %id, steps = machine.steps(), "dispatcher stopped");
    machine
}

/// Submits events to a running dispatcher. Cheap to clone.
pub struct EventSender<E> {
    sender: mpsc::UnboundedSender<Command<E>>,
}

impl<E> Clone for EventSender<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<E: Event> EventSender<E> {
    /// Queue `event` behind everything submitted before it.
    pub fn submit(&self, event: E) -> Result<(), DispatchError> {
        self.sender
            .send(Command::Event(event))
            .map_err(|_| DispatchError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Owner of a dispatcher's worker task.
pub struct DispatcherHandle<C, E: Event> {
    sender: EventSender<E>,
    worker: JoinHandle<Machine<C, E>>,
}

impl<C, E: Event> DispatcherHandle<C, E> {
    /// A sender that can be moved to other tasks or threads.
    pub fn sender(&self) -> EventSender<E> {
        self.sender.clone()
    }

    pub fn submit(&self, event: E) -> Result<(), DispatchError> {
        self.sender.submit(event)
    }

    /// Close the queue, wait for every pending event to be processed and
    /// return the machine.
    ///
    /// Submitting through a cloned [`EventSender`] fails with
    /// [`DispatchError::Closed`] once the queue is closed.
    pub async fn shutdown(self) -> Result<Machine<C, E>, DispatchError> {
        // A failed send means the worker is already gone; the join reports why.
        let _ = self.sender.sender.send(Command::Shutdown);
        self.worker.await.map_err(|_| DispatchError::WorkerPanicked)
    }
}

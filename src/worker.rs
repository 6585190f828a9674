//! Background execution for long-running operations.
//!
//! The front end snapshots its input, hands it to a [`Worker`] by value, and
//! renders the [`Event`]s the job sends back. The job owns everything it
//! touches; the event channel is the only thing the two threads share.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use flume::{Receiver, Sender};
use tracing::error;

use crate::error::{Error, Result};
use crate::types::Stage;

/// A one-way update from a job to the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A packaging stage has started.
    Stage(Stage),

    /// Free-form status line.
    Status(String),

    /// Overall completion in percent, never decreasing within one job.
    Progress(u8),
}

/// The job's end of the event channel.
pub struct Reporter {
    sender: Sender<Event>,
    progress: u8,
}

impl Reporter {
    pub fn new(sender: Sender<Event>) -> Self {
        Self { sender, progress: 0 }
    }

    /// A reporter and the receiver its events arrive on.
    pub fn channel() -> (Self, Receiver<Event>) {
        let (sender, receiver) = flume::unbounded();
        (Self::new(sender), receiver)
    }

    pub fn stage(&self, stage: Stage) {
        self.send(Event::Stage(stage));
    }

    pub fn status(&self, message: impl Into<String>) {
        self.send(Event::Status(message.into()));
    }

    /// Reports progress, capped at 100. Values below the last reported one
    /// are raised to it.
    pub fn progress(&mut self, percent: u8) {
        self.progress = self.progress.max(percent.min(100));
        self.send(Event::Progress(self.progress));
    }

    #[inline]
    pub fn current_progress(&self) -> u8 {
        self.progress
    }

    fn send(&self, event: Event) {
        // The front end may have stopped listening; the job still runs to
        // completion so its cleanup happens.
        let _ = self.sender.send(event);
    }
}

/// Runs one job at a time on a background thread.
#[derive(Debug, Default, Clone)]
pub struct Worker {
    busy: Arc<AtomicBool>,
}

impl Worker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `job` on a new thread named `name`.
    ///
    /// Fails with [`Error::Busy`] while a previous job is still running.
    pub fn spawn<T, F>(&self, name: &str, job: F) -> Result<Job<T>>
    where
        F: FnOnce(Reporter) -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Err(Error::Busy);
        }

        let guard = BusyGuard(Arc::clone(&self.busy));
        let (reporter, events) = Reporter::channel();

        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                let _guard = guard;
                job(reporter)
            })
            .map_err(|e| Error::io("failed to start worker thread", e))?;

        Ok(Job { events, handle })
    }
}

/// Clears the worker's in-flight flag when the job thread ends, including
/// by panic.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to a running job.
pub struct Job<T> {
    events: Receiver<Event>,
    handle: JoinHandle<T>,
}

impl<T> Job<T> {
    /// Feeds every event to `on_event` until the job ends, then returns its
    /// result.
    pub fn drain(self, mut on_event: impl FnMut(Event)) -> Result<T> {
        for event in self.events.iter() {
            on_event(event);
        }
        self.wait()
    }

    /// Waits for the job. A panic in the job becomes [`Error::WorkerPanicked`].
    pub fn wait(self) -> Result<T> {
        self.handle.join().map_err(|payload| {
            let message = panic_message(&*payload);
            error!(%message, "worker thread panicked");
            Error::WorkerPanicked(message)
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

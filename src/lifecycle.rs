//! Worker lifecycle and event lifetime extension.
//!
//! The browser may stop an idle service worker at any time. Work that
//! outlives an event handler's synchronous part must be handed back to the
//! event (`ExtendableEvent.waitUntil`) so the worker stays alive until it
//! settles. [`PendingOperation`] is that unit of work: an abortable local
//! future, registered through [`ExtendableEvent::wait_until`].
//!
//! # States
//!
//! ```text
//! Init ──install──► Active ──terminate──► Terminated
//! ```
//!
//! Events are only dispatched while `Active`.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::future::{AbortHandle, Abortable, Aborted, LocalBoxFuture};
use futures::FutureExt;

use crate::error::{RelayError, RelayResult};

/// Lifecycle state of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Script evaluated, relay not yet installed.
    Init,
    /// Listeners installed and dispatching.
    Active,
    /// Shut down; no further events are handled.
    Terminated,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Init => write!(f, "init"),
            WorkerState::Active => write!(f, "active"),
            WorkerState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Tracks the worker's lifecycle state and enforces its transitions.
#[derive(Debug)]
pub struct WorkerLifecycle {
    state: WorkerState,
}

impl Default for WorkerLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerLifecycle {
    pub fn new() -> Self {
        Self {
            state: WorkerState::Init,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Move from `Init` to `Active`. Installing twice is an error.
    pub fn activate(&mut self) -> RelayResult<()> {
        match self.state {
            WorkerState::Init => {
                self.state = WorkerState::Active;
                Ok(())
            }
            other => Err(RelayError::Lifecycle(format!(
                "cannot install worker in state {other}"
            ))),
        }
    }

    /// Move to `Terminated`. Terminating twice is a no-op.
    pub fn terminate(&mut self) {
        self.state = WorkerState::Terminated;
    }

    /// Fail unless events may be dispatched.
    pub fn ensure_active(&self) -> RelayResult<()> {
        if self.state == WorkerState::Active {
            Ok(())
        } else {
            Err(RelayError::Lifecycle(format!(
                "worker is {}, not dispatching events",
                self.state
            )))
        }
    }
}

/// Asynchronous work that must finish before the worker may be stopped.
pub struct PendingOperation {
    label: &'static str,
    future: Abortable<LocalBoxFuture<'static, RelayResult<()>>>,
    handle: AbortHandle,
    // Dropped when the operation settles or is discarded.
    alive: Rc<()>,
}

impl fmt::Debug for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOperation")
            .field("label", &self.label)
            .field("aborted", &self.handle.is_aborted())
            .finish()
    }
}

impl PendingOperation {
    pub fn new<F>(label: &'static str, future: F) -> Self
    where
        F: Future<Output = RelayResult<()>> + 'static,
    {
        let (handle, registration) = AbortHandle::new_pair();
        Self {
            label,
            future: Abortable::new(future.boxed_local(), registration),
            handle,
            alive: Rc::new(()),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Handle that cancels this operation. An aborted operation completes
    /// successfully without running the rest of its work.
    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.clone()
    }

    /// Drive the operation to completion, logging its outcome.
    pub async fn run(self) -> RelayResult<()> {
        let PendingOperation {
            label,
            future,
            alive: _alive,
            ..
        } = self;
        match future.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                log::error!("[Worker] {label} failed: {e}");
                Err(e)
            }
            Err(Aborted) => {
                log::debug!("[Worker] {label} aborted");
                Ok(())
            }
        }
    }
}

/// Operations handed to events that have not settled yet.
#[derive(Debug, Default)]
pub struct OperationTracker {
    operations: RefCell<Vec<(Weak<()>, AbortHandle)>>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `operation` until it settles.
    pub fn track(&self, operation: &PendingOperation) {
        let mut operations = self.operations.borrow_mut();
        operations.retain(|(alive, _)| alive.strong_count() > 0);
        operations.push((Rc::downgrade(&operation.alive), operation.abort_handle()));
    }

    /// Number of tracked operations that have not settled.
    pub fn in_flight(&self) -> usize {
        self.operations
            .borrow()
            .iter()
            .filter(|(alive, _)| alive.strong_count() > 0)
            .count()
    }

    /// Abort every unsettled operation. Returns how many were aborted.
    pub fn abort_all(&self) -> usize {
        let mut aborted = 0;
        for (alive, handle) in self.operations.borrow_mut().drain(..) {
            if alive.strong_count() > 0 {
                handle.abort();
                aborted += 1;
            }
        }
        aborted
    }
}

/// An event whose lifetime can be extended by pending work.
pub trait ExtendableEvent {
    /// Keep the worker alive until `operation` settles.
    fn wait_until(&self, operation: PendingOperation) -> RelayResult<()>;
}

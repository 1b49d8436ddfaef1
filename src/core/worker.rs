//=========================================================================
// Background Tasks
//=========================================================================
//
// Worker thread wrapper polled by states once per update.
//
// Architecture:
//   BackgroundTask::spawn(job)
//     ├─ worker thread: job(&ProgressReporter) → TaskEvent over crossbeam
//     └─ owning state:  poll() each update → TaskStatus (never blocks)
//
// The state machine never synchronizes on the worker directly. The only
// shared data is the event channel and the cancellation flag.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use log::{debug, warn};

//=== Internal Dependencies ===============================================

use crate::core::error::StateError;
use crate::core::messaging::TaskKind;

//=== TaskStatus ==========================================================

/// Last known status of a background task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Still running; `progress` is in percent.
    Running { progress: u8 },
    Succeeded,
    Failed(String),
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running { .. })
    }
}

//=== ProgressReporter ====================================================

enum TaskEvent {
    Progress(u8),
    Finished(Result<(), String>),
}

/// Handle given to the job to report progress and observe cancellation.
pub struct ProgressReporter {
    sender: Sender<TaskEvent>,
    cancelled: Arc<AtomicBool>,
}

impl ProgressReporter {
    /// Reports progress in percent (clamped to 100).
    pub fn report(&self, percent: u8) {
        // The owner may already be gone.
        let _ = self.sender.send(TaskEvent::Progress(percent.min(100)));
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Reporter whose reports go nowhere.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        let (sender, _) = unbounded();
        Self {
            sender,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

//=== BackgroundTask ======================================================

/// Job running on its own thread.
pub struct BackgroundTask {
    kind: TaskKind,
    receiver: Receiver<TaskEvent>,
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    status: TaskStatus,
}

impl BackgroundTask {
    /// Starts `job` on a new thread.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Task`] if the thread cannot be spawned.
    pub fn spawn<F>(kind: TaskKind, job: F) -> Result<Self, StateError>
    where
        F: FnOnce(&ProgressReporter) -> Result<(), String> + Send + 'static,
    {
        let (sender, receiver) = unbounded();
        let cancelled = Arc::new(AtomicBool::new(false));
        let reporter = ProgressReporter {
            sender,
            cancelled: cancelled.clone(),
        };

        let handle = thread::Builder::new()
            .name(format!("task-{:?}", kind).to_lowercase())
            .spawn(move || {
                let result = job(&reporter);
                let _ = reporter.sender.send(TaskEvent::Finished(result));
            })
            .map_err(|err| StateError::Task {
                task: kind.label().to_string(),
                reason: err.to_string(),
            })?;

        debug!("Spawned background task {:?}", kind);

        Ok(Self {
            kind,
            receiver,
            cancelled,
            handle: Some(handle),
            status: TaskStatus::Running { progress: 0 },
        })
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Drains pending events and returns the updated status.
    pub fn poll(&mut self) -> &TaskStatus {
        while !self.status.is_finished() {
            match self.receiver.try_recv() {
                Ok(TaskEvent::Progress(progress)) => {
                    self.status = TaskStatus::Running { progress };
                }
                Ok(TaskEvent::Finished(Ok(()))) => self.status = TaskStatus::Succeeded,
                Ok(TaskEvent::Finished(Err(reason))) => self.status = TaskStatus::Failed(reason),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Background task {:?} stopped without reporting", self.kind);
                    self.status = TaskStatus::Failed("worker stopped unexpectedly".into());
                }
            }
        }

        if self.status.is_finished() {
            self.join();
        }
        &self.status
    }

    pub fn status(&self) -> &TaskStatus {
        &self.status
    }

    /// Asks the job to stop. The job decides when to observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Background task {:?} panicked", self.kind);
            }
        }
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel();
            self.join();
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

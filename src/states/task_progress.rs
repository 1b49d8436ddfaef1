//=========================================================================
// Task Progress State
//=========================================================================
//
// Overlay that runs a background task and shows its progress.
//
// Flow:
//   enter()  → BackgroundTask::spawn(job)
//   update() → poll (keeps running without window focus)
//            → finished → request end
//   leave()  → TaskFinished posted to the receiver, exactly once
//   Escape   → cancellation requested; the job decides when to stop
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{debug, warn};

//=== Internal Dependencies ===============================================

use crate::core::error::StateError;
use crate::core::input::{KeyCode, Modifiers};
use crate::core::messaging::{Message, TaskKind, TaskOutcome};
use crate::core::render::Renderer;
use crate::core::state::{GameState, StateContext, StateCore, StateFlags, StateId, StateKind};
use crate::core::worker::{BackgroundTask, ProgressReporter, TaskStatus};

//=== TaskProgressState ===================================================

type TaskJob = Box<dyn FnOnce(&ProgressReporter) -> Result<(), String> + Send>;

pub struct TaskProgressState {
    core: StateCore,
    kind: TaskKind,
    receiver: StateId,
    job: Option<TaskJob>,
    task: Option<BackgroundTask>,
    progress: u8,
    outcome: Option<TaskOutcome>,
    delivered: bool,
}

impl TaskProgressState {
    pub fn new<F>(kind: TaskKind, receiver: StateId, job: F) -> Self
    where
        F: FnOnce(&ProgressReporter) -> Result<(), String> + Send + 'static,
    {
        Self {
            core: StateCore::new("task_progress", StateFlags::OVERLAY),
            kind,
            receiver,
            job: Some(Box::new(job)),
            task: None,
            progress: 0,
            outcome: None,
            delivered: false,
        }
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    fn conclude(&mut self, succeeded: bool) {
        self.outcome = Some(TaskOutcome {
            kind: self.kind,
            succeeded,
        });
        self.core.request_end();
    }
}

impl GameState for TaskProgressState {
    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn kind(&self) -> StateKind {
        StateKind::Overlay
    }

    fn enter(&mut self, _ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        let Some(job) = self.job.take() else {
            return Ok(());
        };

        match BackgroundTask::spawn(self.kind, job) {
            Ok(task) => self.task = Some(task),
            Err(err) => {
                warn!("{}: {}", self.kind.label(), err);
                self.conclude(false);
            }
        }
        Ok(())
    }

    fn leave(&mut self, ctx: &mut StateContext<'_>) {
        if self.delivered {
            return;
        }
        self.delivered = true;

        if let Some(task) = self.task.take() {
            if !task.status().is_finished() {
                task.cancel();
            }
        }

        let outcome = self.outcome.unwrap_or(TaskOutcome {
            kind: self.kind,
            succeeded: false,
        });
        ctx.post(Message::TaskFinished(outcome), self.receiver);
    }

    fn update(&mut self, _ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };
        if self.outcome.is_some() {
            return Ok(());
        }

        match task.poll().clone() {
            TaskStatus::Running { progress } => self.progress = progress,
            TaskStatus::Succeeded => {
                debug!("{} done", self.kind.label());
                self.progress = 100;
                self.conclude(true);
            }
            TaskStatus::Failed(reason) => {
                warn!("{} failed: {}", self.kind.label(), reason);
                self.conclude(false);
            }
        }
        Ok(())
    }

    fn update_when_invisible(&self) -> bool {
        true
    }

    fn render(
        &mut self,
        _ctx: &mut StateContext<'_>,
        renderer: &mut dyn Renderer,
    ) -> Result<(), StateError> {
        renderer.draw_dialog(
            &format!("{}... {}%", self.kind.label(), self.progress),
            &[],
            None,
        );
        Ok(())
    }

    fn key_down(
        &mut self,
        _ctx: &mut StateContext<'_>,
        key: KeyCode,
        _modifiers: Modifiers,
        _character: Option<char>,
    ) {
        if key == KeyCode::Escape {
            if let Some(task) = &self.task {
                debug!("Cancelling {}", self.kind.label());
                task.cancel();
            }
        }
    }
}

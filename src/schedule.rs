//! Named per-tick tasks, decoupled from any particular engine scheduler.

use deps::*;

use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// Run again next tick.
    Continue,
    /// Drop the task.
    Done,
}

pub type TaskName = Cow<'static, str>;

type Task<C> = Box<dyn FnMut(&mut C) -> TickResult + Send + Sync>;

/// Runs every scheduled task once per [`tick`](TaskScheduler::tick), in scheduling order,
/// against a shared context `C`.
pub struct TaskScheduler<C> {
    tasks: Vec<(TaskName, Task<C>)>,
}

impl<C> Default for TaskScheduler<C> {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
        }
    }
}

impl<C> std::fmt::Debug for TaskScheduler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tasks.iter().map(|(name, _)| name))
            .finish()
    }
}

impl<C> TaskScheduler<C> {
    /// Returns `true` if a task of the same name was replaced.
    pub fn schedule<F>(&mut self, name: impl Into<TaskName>, task: F) -> bool
    where
        F: FnMut(&mut C) -> TickResult + Send + Sync + 'static,
    {
        let name = name.into();
        let task: Task<C> = Box::new(task);
        if let Some((_, slot)) = self.tasks.iter_mut().find(|(existing, _)| *existing == name) {
            *slot = task;
            tracing::debug!(task = %name, "task rescheduled");
            true
        } else {
            tracing::debug!(task = %name, "task scheduled");
            self.tasks.push((name, task));
            false
        }
    }

    /// Returns `true` if the task was scheduled.
    pub fn cancel(&mut self, name: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|(existing, _)| existing != name);
        let cancelled = self.tasks.len() != before;
        if cancelled {
            tracing::debug!(task = %name, "task cancelled");
        }
        cancelled
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.tasks.iter().any(|(existing, _)| existing == name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tick(&mut self, ctx: &mut C) {
        self.tasks.retain_mut(|(name, task)| match task(ctx) {
            TickResult::Continue => true,
            TickResult::Done => {
                tracing::debug!(task = %name, "task done");
                false
            }
        });
    }
}

use std::collections::VecDeque;

use tracing::debug;

/// Deferred action run against a context, usually the controller.
pub type Command<C> = Box<dyn FnOnce(&mut C) + Send>;

/// Pausable FIFO of commands.
///
/// The scheduler only hands commands out; the owner drains it by calling
/// [`CommandScheduler::next_ready`] in a loop, so a command may pause the
/// scheduler or schedule more work while it runs.
pub struct CommandScheduler<C> {
    queue: VecDeque<Command<C>>,
    paused: bool,
}

impl<C> Default for CommandScheduler<C> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            paused: true,
        }
    }
}

impl<C> CommandScheduler<C> {
    /// New scheduler, paused.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, command: Command<C>) {
        self.queue.push_back(command);
    }

    pub fn pause(&mut self) {
        if !self.paused {
            debug!(queued = self.queue.len(), "scheduler paused");
        }
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            debug!(queued = self.queue.len(), "scheduler resumed");
        }
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pop the oldest command unless paused.
    pub fn next_ready(&mut self) -> Option<Command<C>> {
        if self.paused {
            return None;
        }
        self.queue.pop_front()
    }

    /// Run an action immediately, bypassing the queue.
    pub fn run_now<R>(ctx: &mut C, action: impl FnOnce(&mut C) -> R) -> R {
        action(ctx)
    }
}

//! Bookkeeping for the cancellable per-question countdown task.

use tokio::task::JoinHandle;

/// Slot tracking the currently armed countdown task.
///
/// The generation counter increments every time a countdown is armed, so a
/// timeout raised by a task that has since been replaced can prove itself
/// stale and step aside instead of firing against the wrong question.
#[derive(Default)]
pub struct CountdownSlot {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl CountdownSlot {
    /// Abort any running task and reserve the next generation for a new one.
    pub fn arm(&mut self) -> u64 {
        self.cancel();
        self.generation += 1;
        self.generation
    }

    /// Attach the spawned task for the generation returned by [`Self::arm`].
    pub fn attach(&mut self, handle: JoinHandle<()>) {
        self.handle = Some(handle);
    }

    /// Abort the running countdown task, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether the given generation is still the live countdown.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Detach the running task without aborting it.
    ///
    /// Called by the countdown task itself when it fires, so the terminal
    /// resolution it triggers does not abort its own execution.
    pub fn detach(&mut self) {
        self.handle.take();
    }
}

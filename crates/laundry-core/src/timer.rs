//! Single-shot cycle countdown.
//!
//! A [`CycleTimer`] runs as a task on the tokio runtime and invokes its
//! completion callback once when the countdown elapses. Unlike a detached
//! sleeping thread it can be cancelled; a cancelled timer never calls back.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct CycleTimer {
    task: JoinHandle<()>,
}

impl CycleTimer {
    /// Schedule `on_expire` to run once after `after` on the given runtime.
    pub fn spawn<F>(runtime: &Handle, after: Duration, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = runtime.spawn(async move {
            tokio::time::sleep(after).await;
            on_expire();
        });
        Self { task }
    }

    /// Stop the countdown. Has no effect if the callback already ran.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

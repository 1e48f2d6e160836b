/*!
scheduler.rs - hand-off point for suspending handlers.

The dispatcher never awaits a suspending handler. It submits the task to a
`Scheduler` and moves on; the scheduler drives the task and reports its
failure through the log.
*/

use std::sync::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::command::Task;
use crate::{log_debug, log_error};

/// Accepts suspending work and drives it independently of dispatch.
pub trait Scheduler: Send + Sync {
    fn submit(&self, command: &str, task: Task);
}

/// Spawns tasks onto a tokio runtime and keeps their join handles so a host
/// can wait for outstanding work before shutting down.
pub struct TokioScheduler {
    handle: Handle,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Scheduler bound to the runtime the caller is running in.
    pub fn current() -> anyhow::Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| anyhow::anyhow!("no tokio runtime available for scheduler: {e}"))?;
        Ok(Self::new(handle))
    }

    /// Number of submitted tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .map(|p| p.iter().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }

    /// Wait for every task submitted so far.
    pub async fn drain(&self) {
        let handles = match self.pending.lock() {
            Ok(mut p) => std::mem::take(&mut *p),
            Err(_) => return,
        };
        for h in handles {
            if let Err(e) = h.await {
                log_error!("suspended command task aborted: {e}");
            }
        }
    }
}

impl Scheduler for TokioScheduler {
    fn submit(&self, command: &str, task: Task) {
        let name = command.to_string();
        let handle = self.handle.spawn(async move {
            match task.await {
                Ok(()) => log_debug!("Suspended command {name} completed."),
                Err(e) => log_error!("Suspended command {name} failed: {e:#}"),
            }
        });
        if let Ok(mut p) = self.pending.lock() {
            p.retain(|h| !h.is_finished());
            p.push(handle);
        }
    }
}

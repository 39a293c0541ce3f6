use std::sync::{Arc, OnceLock};

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Semaphore;

/// One runtime for every executor in the process. It is never dropped, so
/// managers can be created and dropped from async code.
static SHARED_RUNTIME: OnceLock<Option<Runtime>> = OnceLock::new();

fn shared_handle() -> Option<Handle> {
    SHARED_RUNTIME
        .get_or_init(|| {
            let runtime = Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("gosub-cookies")
                .build();
            match runtime {
                Ok(runtime) => Some(runtime),
                Err(e) => {
                    log::error!("Cannot start cookie runtime, running cookie tasks inline: {e}");
                    None
                }
            }
        })
        .as_ref()
        .map(|runtime| runtime.handle().clone())
}

/// Runs fire-and-forget cookie work off the caller's thread.
///
/// Work goes to the blocking pool of the process-wide cookie runtime. At most
/// `worker_threads` tasks of one executor run at the same time. If the runtime
/// cannot be created, tasks run inline on the caller thread instead, so
/// anything they hold (such as a pending operation guard) is still released.
pub(crate) struct BackgroundExecutor {
    handle: Option<Handle>,
    permits: Arc<Semaphore>,
    limit: usize,
}

impl BackgroundExecutor {
    pub(crate) fn new(worker_threads: usize) -> Self {
        let limit = worker_threads.max(1);
        Self {
            handle: shared_handle(),
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Creates an executor that always runs tasks on the calling thread.
    #[cfg(test)]
    pub(crate) fn inline() -> Self {
        Self {
            handle: None,
            permits: Arc::new(Semaphore::new(1)),
            limit: 1,
        }
    }

    /// Schedules `task`. The task is enqueued, not guaranteed to run on any particular thread.
    pub(crate) fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(handle) = &self.handle else {
            task();
            return;
        };

        let permits = Arc::clone(&self.permits);
        // Completion is observed through the barrier, not the join handle.
        let _ = handle.spawn(async move {
            let _permit = permits.acquire_owned().await;
            if let Err(e) = tokio::task::spawn_blocking(task).await {
                log::error!("Cookie task failed: {e}");
            }
        });
    }
}

impl std::fmt::Debug for BackgroundExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundExecutor")
            .field("pooled", &self.handle.is_some())
            .field("limit", &self.limit)
            .finish()
    }
}

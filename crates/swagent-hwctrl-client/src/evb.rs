//! Dedicated background thread driving a single-threaded async runtime.
//!
//! All clients of a table share one [`EventBaseThread`]; their network
//! I/O is interleaved on it while callers block on the reply.

use crate::error::{HwCtrlError, HwCtrlResult};
use parking_lot::Mutex;
use std::future::Future;
use std::thread::{self, JoinHandle, ThreadId};
use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;
use tracing::debug;

pub struct EventBaseThread {
    name: String,
    handle: Handle,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl EventBaseThread {
    /// Starts the thread. Fails only if the OS refuses to create it.
    pub fn new(name: impl Into<String>) -> HwCtrlResult<Self> {
        let name = name.into();
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| HwCtrlError::local(format!("Failed to build runtime for {}", name), e))?;
        let handle = runtime.handle().clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                runtime.block_on(async move {
                    let _ = shutdown_rx.await;
                });
            })
            .map_err(|e| HwCtrlError::local(format!("Failed to spawn thread {}", name), e))?;
        let thread_id = thread.thread().id();
        debug!(name = %name, "event base thread started");

        Ok(Self {
            name,
            handle,
            shutdown: Mutex::new(Some(shutdown_tx)),
            thread: Mutex::new(Some(thread)),
            thread_id,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Runs a future on the background thread.
    pub fn spawn<F>(&self, future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Returns true when called from the background thread itself.
    pub fn is_in_event_base_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

impl Drop for EventBaseThread {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(());
        }
        // The last Arc may be released by a task running on the thread.
        if self.is_in_event_base_thread() {
            return;
        }
        if let Some(thread) = self.thread.lock().take() {
            let _ = thread.join();
            debug!(name = %self.name, "event base thread stopped");
        }
    }
}

impl std::fmt::Debug for EventBaseThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBaseThread")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_spawn_runs_on_named_thread() {
        let evb = EventBaseThread::new("TestEvb").unwrap();
        let (tx, rx) = oneshot::channel();
        evb.spawn(async move {
            let _ = tx.send(thread::current().name().map(str::to_string));
        });
        let name = futures::executor::block_on(rx).unwrap();
        assert_eq!(name.as_deref(), Some("TestEvb"));
        assert!(!evb.is_in_event_base_thread());
    }

    #[test]
    fn test_tasks_interleave() {
        let evb = EventBaseThread::new("TestEvb").unwrap();
        let (first_tx, first_rx) = oneshot::channel::<u32>();
        let (done_tx, done_rx) = oneshot::channel::<u32>();

        // The first task waits on the second; both must make progress on
        // the single thread.
        evb.spawn(async move {
            let value = first_rx.await.unwrap_or(0);
            let _ = done_tx.send(value + 1);
        });
        evb.spawn(async move {
            let _ = first_tx.send(41);
        });
        assert_eq!(futures::executor::block_on(done_rx).unwrap(), 42);
    }

    #[test]
    fn test_drop_stops_thread() {
        let evb = EventBaseThread::new("TestEvb").unwrap();
        let handle = evb.handle().clone();
        drop(evb);
        let (tx, rx) = oneshot::channel::<()>();
        handle.spawn(async move {
            let _ = tx.send(());
        });
        assert!(futures::executor::block_on(rx).is_err());
    }
}

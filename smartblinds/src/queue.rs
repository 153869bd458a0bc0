//! Single-flight command queue.
//!
//! BlueZ only tolerates one outstanding GATT operation per device at a time; issuing a second
//! write while the first is still in flight reliably fails. This module serializes writes per
//! session behind a FIFO, retrying the head of the queue in place on failure (short of a
//! not-connected error, which drops it) rather than cycling it to the back.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bluez_async::BluetoothError;
use tokio::sync::Mutex;

/// A unit of work submitted to a [`CommandQueue`]. Boxed so the queue can hold commands against
/// different characteristics and payloads uniformly.
pub struct QueuedCommand {
    description: String,
    /// How many times this command may be retried after its first invocation fails (a non-fatal
    /// failure pushes it back to the head of the queue, up to this many times, before it is
    /// dropped).
    max_retries: u32,
    run: Box<dyn FnMut() -> Pin<Box<dyn Future<Output = Result<(), BluetoothError>> + Send>> + Send>,
}

impl QueuedCommand {
    /// The retry budget used by [`QueuedCommand::new`] when no explicit cap is given.
    pub const DEFAULT_MAX_RETRIES: u32 = 2;

    /// Wrap a fallible, retryable unit of work with the default retry budget
    /// ([`Self::DEFAULT_MAX_RETRIES`]). `run` may be called more than once if the operation fails
    /// and is retried.
    pub fn new<F, Fut>(description: impl Into<String>, run: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BluetoothError>> + Send + 'static,
    {
        Self::with_max_retries(description, Self::DEFAULT_MAX_RETRIES, run)
    }

    /// Wrap a fallible, retryable unit of work with an explicit per-command retry cap.
    pub fn with_max_retries<F, Fut>(
        description: impl Into<String>,
        max_retries: u32,
        mut run: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BluetoothError>> + Send + 'static,
    {
        Self {
            description: description.into(),
            max_retries,
            run: Box::new(move || Box::pin(run())),
        }
    }
}

struct State {
    queue: VecDeque<QueuedCommand>,
    disposed: bool,
    executing: bool,
}

/// Per-session FIFO of [`QueuedCommand`]s, run one at a time by a single pump loop.
///
/// Pushing a command starts the pump if it isn't already running; the pump drains the queue to
/// empty and then stops, so a later push restarts it. The pump always yields to the scheduler
/// between commands (even across retries) to keep stack growth bounded regardless of queue
/// depth.
pub struct CommandQueue {
    state: Arc<Mutex<State>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                queue: VecDeque::new(),
                disposed: false,
                executing: false,
            })),
        }
    }

    /// Enqueue a command. If disposed, the command is dropped immediately.
    pub async fn push(&self, command: QueuedCommand) {
        let mut state = self.state.lock().await;
        if state.disposed {
            log::warn!("dropping {:?}: queue is disposed", command.description);
            return;
        }
        state.queue.push_back(command);
        if !state.executing {
            state.executing = true;
            drop(state);
            self.spawn_pump();
        }
    }

    fn spawn_pump(&self) {
        let state = self.state.clone();
        tokio::spawn(async move {
            loop {
                // Never re-enter the pump synchronously with the previous iteration: this keeps
                // a long-running queue from growing the call stack.
                tokio::task::yield_now().await;

                let mut guard = state.lock().await;
                let Some(mut command) = guard.queue.pop_front() else {
                    guard.executing = false;
                    return;
                };
                let disposed = guard.disposed;
                drop(guard);

                if disposed {
                    let mut guard = state.lock().await;
                    guard.queue.clear();
                    guard.executing = false;
                    return;
                }

                // retryCount (§3/§4.2 of the data model): incremented on every invocation,
                // compared against this command's own `max_retries` rather than a global cap.
                let max_attempts = command.max_retries + 1;
                let mut retry_count = 0;
                loop {
                    retry_count += 1;
                    match (command.run)().await {
                        Ok(()) => break,
                        Err(err) if err.is_not_connected() => {
                            log::warn!(
                                "{:?} dropped, device not connected: {}",
                                command.description,
                                err
                            );
                            break;
                        }
                        Err(err) if retry_count >= max_attempts => {
                            log::error!(
                                "{:?} failed after {} attempts, giving up: {}",
                                command.description,
                                retry_count,
                                err
                            );
                            break;
                        }
                        Err(err) => {
                            log::warn!(
                                "{:?} failed (attempt {}/{}), retrying: {}",
                                command.description,
                                retry_count,
                                max_attempts,
                                err
                            );
                            tokio::task::yield_now().await;
                        }
                    }
                }
            }
        });
    }

    /// Stop accepting new commands, wait for any command currently executing to finish, then
    /// discard whatever is left in the queue. Idempotent: a second call observes `disposed`
    /// already set and returns once nothing is executing.
    pub async fn dispose(&self) {
        {
            let mut state = self.state.lock().await;
            state.disposed = true;
        }
        loop {
            let executing = self.state.lock().await.executing;
            if !executing {
                break;
            }
            tokio::task::yield_now().await;
        }
        self.state.lock().await.queue.clear();
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn busy_error() -> BluetoothError {
        BluetoothError::DbusError(dbus::Error::new_custom("org.bluez.Error.Failed", "Device busy"))
    }

    fn not_connected_error() -> BluetoothError {
        BluetoothError::DbusError(dbus::Error::new_custom(
            "org.bluez.Error.Failed",
            "Not connected",
        ))
    }

    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn runs_commands_in_order() {
        let queue = CommandQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3u32 {
            let order = order.clone();
            queue
                .push(QueuedCommand::new(format!("cmd{i}"), move || {
                    let order = order.clone();
                    async move {
                        order.lock().await.push(i);
                        Ok(())
                    }
                }))
                .await;
        }

        settle().await;
        assert_eq!(*order.lock().await, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn retries_at_head_on_failure_without_concurrent_execution() {
        let queue = CommandQueue::new();
        let concurrent = Arc::new(AtomicU32::new(0));
        let max_concurrent = Arc::new(AtomicU32::new(0));
        let attempts = Arc::new(AtomicU32::new(0));

        {
            let concurrent = concurrent.clone();
            let max_concurrent = max_concurrent.clone();
            let attempts = attempts.clone();
            queue
                .push(QueuedCommand::new("flaky", move || {
                    let concurrent = concurrent.clone();
                    let max_concurrent = max_concurrent.clone();
                    let attempts = attempts.clone();
                    async move {
                        let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                        max_concurrent.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(1)).await;
                        concurrent.fetch_sub(1, Ordering::SeqCst);

                        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                        if attempt < 3 {
                            Err(busy_error())
                        } else {
                            Ok(())
                        }
                    }
                }))
                .await;
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn drops_command_on_not_connected() {
        let queue = CommandQueue::new();
        let attempts = Arc::new(AtomicU32::new(0));

        {
            let attempts = attempts.clone();
            queue
                .push(QueuedCommand::new("disconnected", move || {
                    let attempts = attempts.clone();
                    async move {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        Err(not_connected_error())
                    }
                }))
                .await;
        }

        settle().await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_default_max_attempts() {
        let queue = CommandQueue::new();
        let attempts = Arc::new(AtomicU32::new(0));

        {
            let attempts = attempts.clone();
            queue
                .push(QueuedCommand::new("always_busy", move || {
                    let attempts = attempts.clone();
                    async move {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        Err(busy_error())
                    }
                }))
                .await;
        }

        settle().await;
        assert_eq!(
            attempts.load(Ordering::SeqCst),
            QueuedCommand::DEFAULT_MAX_RETRIES + 1
        );
    }

    #[tokio::test]
    async fn retries_up_to_its_own_max_retries_then_succeeds() {
        // Mirrors the spec's retry-at-head scenario: a command with `max_retries=2` fails twice
        // with a non-connection error, then succeeds on its third invocation.
        let queue = CommandQueue::new();
        let attempts = Arc::new(AtomicU32::new(0));

        {
            let attempts = attempts.clone();
            queue
                .push(QueuedCommand::with_max_retries("flaky_twice", 2, move || {
                    let attempts = attempts.clone();
                    async move {
                        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                        if attempt < 3 {
                            Err(busy_error())
                        } else {
                            Ok(())
                        }
                    }
                }))
                .await;
        }

        settle().await;
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn drops_after_exhausting_a_smaller_custom_retry_budget() {
        let queue = CommandQueue::new();
        let attempts = Arc::new(AtomicU32::new(0));

        {
            let attempts = attempts.clone();
            queue
                .push(QueuedCommand::with_max_retries("always_busy", 0, move || {
                    let attempts = attempts.clone();
                    async move {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        Err(busy_error())
                    }
                }))
                .await;
        }

        settle().await;
        // max_retries=0 means exactly one invocation: no retries at all.
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dispose_drops_queued_and_rejects_future_pushes() {
        let queue = CommandQueue::new();
        let ran = Arc::new(AtomicU32::new(0));

        {
            let ran = ran.clone();
            queue
                .push(QueuedCommand::new("slow", move || {
                    let ran = ran.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        ran.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }))
                .await;
        }

        {
            let ran = ran.clone();
            queue
                .push(QueuedCommand::new("queued_behind", move || {
                    let ran = ran.clone();
                    async move {
                        ran.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }))
                .await;
        }

        queue.dispose().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);

        let after_dispose = Arc::new(AtomicU32::new(0));
        {
            let after_dispose = after_dispose.clone();
            queue
                .push(QueuedCommand::new("post_dispose", move || {
                    let after_dispose = after_dispose.clone();
                    async move {
                        after_dispose.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }))
                .await;
        }
        settle().await;
        assert_eq!(after_dispose.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dispose_is_idempotent() {
        let queue = CommandQueue::new();
        queue.dispose().await;
        queue.dispose().await;
    }
}

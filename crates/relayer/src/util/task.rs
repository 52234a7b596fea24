use core::fmt::Display;
use core::mem;
use core::time::Duration;
use std::sync::{Arc, RwLock};
use std::thread;

use crossbeam_channel::{bounded, Sender};
use tracing::{debug, error, info, warn, Span};

/// A handle to a background task spawned by [`spawn_background_task`].
///
/// Dropping the handle signals the task to shut down and waits for it.
pub struct TaskHandle {
    shutdown_sender: Sender<()>,
    stopped: Arc<RwLock<bool>>,
    join_handle: DropJoinHandle,
}

/// The error a step of a background task may return.
pub enum TaskError<E> {
    /// The task logs the error and keeps running.
    Ignore(E),
    /// The task logs the error and stops.
    Fatal(E),
}

/// What the task does after a successful step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Next {
    Continue,
    Abort,
}

struct DropJoinHandle(Option<thread::JoinHandle<()>>);

/// Spawns a thread that runs `step_runner` in a loop, sleeping
/// `interval_pause` between steps, until the step aborts, fails fatally,
/// or the handle is shut down.
pub fn spawn_background_task<E: Display>(
    span: Span,
    interval_pause: Option<Duration>,
    mut step_runner: impl FnMut() -> Result<Next, TaskError<E>> + Send + 'static,
) -> TaskHandle {
    debug!(parent: &span, "spawning task");

    let stopped = Arc::new(RwLock::new(false));
    let write_stopped = stopped.clone();

    let (shutdown_sender, receiver) = bounded(1);

    let join_handle = thread::spawn(move || {
        let _entered = span.enter();

        loop {
            match receiver.try_recv() {
                Ok(()) => {
                    break;
                }
                _ => match step_runner() {
                    Ok(Next::Continue) => {}
                    Ok(Next::Abort) => {
                        info!("task is aborting");
                        break;
                    }
                    Err(TaskError::Ignore(e)) => {
                        warn!("task encountered ignorable error: {}", e);
                    }
                    Err(TaskError::Fatal(e)) => {
                        error!("task aborting after encountering fatal error: {}", e);
                        break;
                    }
                },
            }

            if let Some(interval) = interval_pause {
                // Wake up early on shutdown instead of sleeping the full interval.
                if receiver.recv_timeout(interval).is_ok() {
                    break;
                }
            }
        }

        if let Ok(mut stopped) = write_stopped.write() {
            *stopped = true;
        }

        debug!("task terminated");
    });

    TaskHandle {
        shutdown_sender,
        stopped,
        join_handle: DropJoinHandle(Some(join_handle)),
    }
}

impl TaskHandle {
    /// Wait for the task to terminate.
    pub fn join(mut self) {
        if let Some(handle) = mem::take(&mut self.join_handle.0) {
            let _ = handle.join();
        }
    }

    /// Signal the task to shut down, without waiting for it.
    pub fn shutdown(&self) {
        let _ = self.shutdown_sender.try_send(());
    }

    pub fn shutdown_and_wait(self) {
        self.shutdown();
        self.join();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.read().map(|stopped| *stopped).unwrap_or(true)
    }
}

impl Drop for DropJoinHandle {
    fn drop(&mut self) {
        if let Some(handle) = mem::take(&mut self.0) {
            let _ = handle.join();
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use test_log::test;
    use tracing::info_span;

    #[test]
    fn task_stops_on_abort() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task_counter = counter.clone();

        let handle = spawn_background_task::<String>(
            info_span!("test"),
            Some(Duration::from_millis(1)),
            move || {
                if task_counter.fetch_add(1, Ordering::SeqCst) >= 2 {
                    Ok(Next::Abort)
                } else {
                    Ok(Next::Continue)
                }
            },
        );

        let start = Instant::now();
        while !handle.is_stopped() && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }

        assert!(handle.is_stopped());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        handle.join();
    }

    #[test]
    fn task_keeps_running_on_ignorable_error() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task_counter = counter.clone();

        let handle = spawn_background_task(
            info_span!("test"),
            Some(Duration::from_millis(1)),
            move || match task_counter.fetch_add(1, Ordering::SeqCst) {
                0 | 1 => Err(TaskError::Ignore("transient".to_string())),
                2 => Err(TaskError::Fatal("broken".to_string())),
                _ => Ok(Next::Continue),
            },
        );

        handle.join();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn shutdown_stops_task() {
        let handle = spawn_background_task::<String>(
            info_span!("test"),
            Some(Duration::from_secs(60)),
            move || Ok(Next::Continue),
        );

        handle.shutdown_and_wait();
    }
}

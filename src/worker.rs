// ── Background worker & UI hand-off ───────────────────────────────────────────
//
// Document I/O runs on exactly one background thread so that at most one load
// or save is in flight at a time.  Results travel back to the UI thread over a
// channel; the UI thread is the only place they are applied.
//
// Both halves are plain values created once in `main` and passed to the shell.
// There is no process-wide executor.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
};

use crate::error::{EditorError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

// ── Worker ────────────────────────────────────────────────────────────────────

/// A single-thread, strictly serialized job queue.
///
/// Jobs run in submission order.  There is no cancellation: a submitted job
/// runs to completion.  A job that panics is logged and the thread carries on
/// with the next one.  Dropping the `Worker` closes the queue and waits for
/// queued jobs to finish.
pub struct Worker {
    tx: Option<mpsc::Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Start the worker thread.
    pub fn spawn(name: &str) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        let thread = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                for job in rx {
                    if let Err(msg) = catch_panic(job) {
                        log::error!("worker job panicked: {msg}");
                    }
                }
                log::debug!("worker queue closed");
            })?;
        Ok(Self {
            tx: Some(tx),
            thread: Some(thread),
        })
    }

    /// Queue `job` behind everything already submitted.
    pub fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let tx = self.tx.as_ref().ok_or(EditorError::WorkerGone)?;
        tx.send(Box::new(job)).map_err(|_| EditorError::WorkerGone)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the sender ends the thread's `for job in rx` loop.
        drop(self.tx.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("worker thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("running", &self.tx.is_some())
            .finish()
    }
}

/// Run `f`, turning a panic into its message.
///
/// Only effective when panics unwind; the release profile aborts instead.
pub fn catch_panic<T>(f: impl FnOnce() -> T) -> std::result::Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

// ── UI hand-off ───────────────────────────────────────────────────────────────

/// Sending half of the UI thread's message queue.  Cheap to clone and safe
/// to move onto the worker.
pub struct UiHandle<T> {
    tx: mpsc::Sender<T>,
    wake: Arc<dyn Fn() + Send + Sync>,
}

impl<T> Clone for UiHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            wake: Arc::clone(&self.wake),
        }
    }
}

impl<T: Send> UiHandle<T> {
    /// Post `msg` to the UI thread and wake its loop.
    ///
    /// Returns `false` when the UI side has already gone away; the message is
    /// dropped.
    pub fn post(&self, msg: T) -> bool {
        if self.tx.send(msg).is_err() {
            log::warn!("UI queue closed; dropping completion");
            return false;
        }
        (self.wake)();
        true
    }
}

/// Receiving half, owned by the UI thread.
pub struct UiQueue<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> UiQueue<T> {
    /// Every message posted so far, without blocking.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        self.rx.try_iter()
    }

    /// Block until the next message arrives.  `None` once every handle is
    /// dropped.
    pub fn wait(&self) -> Option<T> {
        self.rx.recv().ok()
    }
}

/// Create a UI queue.  `wake` runs on the posting thread after each message
/// and should nudge the UI loop (e.g. post a window message).
pub fn ui_channel<T>(wake: impl Fn() + Send + Sync + 'static) -> (UiHandle<T>, UiQueue<T>) {
    let (tx, rx) = mpsc::channel();
    (
        UiHandle {
            tx,
            wake: Arc::new(wake),
        },
        UiQueue { rx },
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn jobs_run_in_order_on_one_thread() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let worker = Worker::spawn("test-worker").expect("spawn");
            for i in 0..50 {
                let seen = Arc::clone(&seen);
                worker
                    .execute(move || {
                        let name = thread::current().name().map(str::to_owned);
                        seen.lock().expect("lock").push((i, name));
                    })
                    .expect("execute");
            }
            // Drop joins after the queue drains.
        }
        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 50);
        for (expected, (i, name)) in seen.iter().enumerate() {
            assert_eq!(*i, expected);
            assert_eq!(name.as_deref(), Some("test-worker"));
        }
    }

    #[test]
    fn panicking_job_does_not_stop_the_worker() {
        let (handle, queue) = ui_channel::<&'static str>(|| {});
        let worker = Worker::spawn("sturdy").expect("spawn");
        worker.execute(|| panic!("job blew up")).expect("execute");
        let h = handle.clone();
        worker
            .execute(move || {
                h.post("still running");
            })
            .expect("execute after panic");
        assert_eq!(queue.wait(), Some("still running"));
    }

    #[test]
    fn catch_panic_reports_message() {
        assert_eq!(catch_panic(|| 5), Ok(5));
        let err = catch_panic(|| -> u8 { panic!("bad {}", 42) }).unwrap_err();
        assert_eq!(err, "bad 42");
        let err = catch_panic(|| -> u8 { panic!("plain") }).unwrap_err();
        assert_eq!(err, "plain");
    }

    #[test]
    fn ui_handle_posts_and_wakes() {
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        let (handle, queue) = ui_channel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let worker = Worker::spawn("io").expect("spawn");
        let h = handle.clone();
        worker
            .execute(move || {
                h.post(7_u32);
            })
            .expect("execute");

        assert_eq!(queue.wait(), Some(7));
        // The wake runs after the send; join before checking it.
        drop(worker);
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
        assert_eq!(queue.drain().count(), 0);
    }

    #[test]
    fn post_after_queue_dropped_reports_false() {
        let (handle, queue) = ui_channel::<u8>(|| {});
        drop(queue);
        assert!(!handle.post(1));
    }
}

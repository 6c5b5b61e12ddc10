//! Notification schedulers
//!
//! A `Scheduler` decides where change-notification handlers run. The store
//! never calls handlers while holding its own locks; it hands each delivery
//! to the scheduler after the commit has released them.

use parking_lot::Mutex;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, warn};

/// A unit of work handed to a scheduler.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs notification deliveries.
pub trait Scheduler: Send + Sync {
    /// Run `task`, now or later.
    fn invoke(&self, task: Task);

    /// Whether the caller is on the thread deliveries run on.
    fn is_on_thread(&self) -> bool;

    /// Whether `invoke` will accept work.
    fn can_invoke(&self) -> bool;

    /// Block until every task invoked so far has run.
    fn drain(&self) {}
}

/// Runs each task inline on the invoking thread.
#[derive(Debug, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn invoke(&self, task: Task) {
        task();
    }

    fn is_on_thread(&self) -> bool {
        true
    }

    fn can_invoke(&self) -> bool {
        true
    }
}

enum Message {
    Run(Task),
    Barrier(SyncSender<()>),
}

/// Runs tasks in order on a dedicated worker thread.
///
/// The queue is bounded; `invoke` blocks when it is full. Dropping the
/// scheduler finishes queued work and joins the worker.
pub struct ThreadScheduler {
    sender: Mutex<Option<SyncSender<Message>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
}

impl ThreadScheduler {
    /// Spawn the worker with a queue of `capacity` pending tasks.
    pub fn new(capacity: usize) -> std::io::Result<Self> {
        let (tx, rx) = sync_channel::<Message>(capacity.max(1));
        let handle = thread::Builder::new()
            .name("dualstore-notify".to_string())
            .spawn(move || Self::run(rx))?;
        let worker_id = handle.thread().id();
        Ok(ThreadScheduler {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(handle)),
            worker_id,
        })
    }

    fn run(rx: Receiver<Message>) {
        while let Ok(message) = rx.recv() {
            match message {
                Message::Run(task) => task(),
                Message::Barrier(done) => {
                    let _ = done.send(());
                }
            }
        }
        debug!("notification worker exiting");
    }

    fn send(&self, message: Message) -> bool {
        let sender = self.sender.lock().clone();
        match sender {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }
}

impl Scheduler for ThreadScheduler {
    fn invoke(&self, task: Task) {
        if !self.send(Message::Run(task)) {
            warn!("notification worker is gone, dropping delivery");
        }
    }

    fn is_on_thread(&self) -> bool {
        thread::current().id() == self.worker_id
    }

    fn can_invoke(&self) -> bool {
        self.sender.lock().is_some()
    }

    fn drain(&self) {
        // A barrier from the worker itself would wait on its own queue.
        if self.is_on_thread() {
            return;
        }
        let (done_tx, done_rx) = sync_channel(1);
        if self.send(Message::Barrier(done_tx)) {
            let _ = done_rx.recv();
        }
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        self.sender.lock().take();
        if let Some(handle) = self.worker.lock().take() {
            if thread::current().id() != self.worker_id && handle.join().is_err() {
                warn!("notification worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for ThreadScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadScheduler")
            .field("worker_id", &self.worker_id)
            .finish()
    }
}

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tails_types::SHUTDOWN_SENTINEL;

/// How many readers may consume the stream at once
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReaderPolicy {
    /// A new subscriber retires the previous one with the shutdown sentinel
    #[default]
    Single,

    /// Every subscriber receives every line
    Broadcast,
}

#[derive(Default)]
struct Registry {
    subscribers: Vec<(u64, mpsc::UnboundedSender<String>)>,
    next_id: u64,
    closed: bool,
}

impl Registry {
    fn close(&mut self) {
        self.closed = true;
        self.subscribers.clear();
    }
}

/// A reader's end of the stream
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next payload, or `None` once the stream has ended for this reader
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

/// Fans lines from one source out to subscribers
pub struct Broker {
    registry: Arc<Mutex<Registry>>,
    failure: Arc<Mutex<Option<String>>>,
    policy: ReaderPolicy,

    /// Cancellation token for stopping the forwarding and source tasks
    cancel: CancellationToken,

    /// Task handles owned by this broker
    tasks: Vec<JoinHandle<()>>,
}

impl Broker {
    /// Start forwarding lines from `source`
    pub fn spawn(source: mpsc::UnboundedReceiver<String>, policy: ReaderPolicy) -> Self {
        let mut broker = Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            failure: Arc::new(Mutex::new(None)),
            policy,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        };
        let task = broker.spawn_forwarder(source);
        broker.tasks.push(task);
        broker
    }

    fn spawn_forwarder(&self, mut source: mpsc::UnboundedReceiver<String>) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        let registry = Arc::clone(&self.registry);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,

                    line = source.recv() => match line {
                        Some(line) => {
                            if line == SHUTDOWN_SENTINEL {
                                warn!("source produced the reserved shutdown line, skipping it");
                                continue;
                            }
                            registry
                                .lock()
                                .subscribers
                                .retain(|(_, tx)| tx.send(line.clone()).is_ok());
                        }
                        None => {
                            debug!("source ended");
                            break;
                        }
                    }
                }
            }
            registry.lock().close();
        })
    }

    /// Register a new reader.
    ///
    /// Under [`ReaderPolicy::Single`] the current reader is sent the shutdown
    /// sentinel and disconnected. Subscribing after the stream has ended
    /// yields a subscription that is already closed.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry.lock();

        let id = registry.next_id;
        registry.next_id += 1;

        if registry.closed {
            return Subscription { id, rx };
        }

        if self.policy == ReaderPolicy::Single {
            for (old_id, old) in registry.subscribers.drain(..) {
                info!(old_id, new_id = id, "retiring previous reader");
                let _ = old.send(SHUTDOWN_SENTINEL.to_string());
            }
        }
        registry.subscribers.push((id, tx));

        Subscription { id, rx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().subscribers.len()
    }

    pub fn policy(&self) -> ReaderPolicy {
        self.policy
    }

    /// Why the source stopped, if it failed
    pub fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }

    pub(crate) fn failure_slot(&self) -> Arc<Mutex<Option<String>>> {
        Arc::clone(&self.failure)
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn attach(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    /// Stop the source and disconnect every reader
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.registry.lock().close();
    }
}

impl Drop for Broker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

//! Request/response waiter table
//!
//! An ordered list of (predicate, resolver) pairs. Every inbound
//! message is offered to the predicates in insertion order; matching
//! entries are removed from the table before their resolvers fire, so
//! one message can never resolve the same waiter twice. Deadlines are
//! the caller's business (`tokio::time::timeout` around the receiver).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::oneshot;

use luxflow_proto::rdmnet::RdmnetMessage;

type Matcher = Box<dyn Fn(&RdmnetMessage) -> bool + Send>;

struct Waiter {
    id: u64,
    matcher: Matcher,
    resolver: oneshot::Sender<RdmnetMessage>,
}

/// Ordered table of pending response waiters
#[derive(Default)]
pub(crate) struct WaiterTable {
    waiters: Mutex<Vec<Waiter>>,
    next_id: AtomicU64,
}

impl WaiterTable {
    /// Register a waiter; the receiver resolves with the first match
    pub fn register<F>(&self, matcher: F) -> (u64, oneshot::Receiver<RdmnetMessage>)
    where
        F: Fn(&RdmnetMessage) -> bool + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.lock().push(Waiter {
            id,
            matcher: Box::new(matcher),
            resolver: tx,
        });
        (id, rx)
    }

    /// Drop a waiter that timed out or was abandoned
    pub fn remove(&self, id: u64) {
        self.lock().retain(|waiter| waiter.id != id);
    }

    /// Offer a message to every waiter, resolving all matches in
    /// insertion order
    pub fn dispatch(&self, message: &RdmnetMessage) {
        let matched: Vec<Waiter> = {
            let mut waiters = self.lock();
            let mut matched = Vec::new();
            let mut index = 0;
            while index < waiters.len() {
                if (waiters[index].matcher)(message) {
                    matched.push(waiters.remove(index));
                } else {
                    index += 1;
                }
            }
            matched
        };
        for waiter in matched {
            // The caller may have given up; a dead receiver is fine.
            let _ = waiter.resolver.send(message.clone());
        }
    }

    /// Reject everything (socket closed); receivers observe a closed
    /// channel
    pub fn reject_all(&self) {
        self.lock().clear();
    }

    /// Number of pending waiters
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Waiter>> {
        self.waiters
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

use std::collections::VecDeque;
use std::fmt;

use tokio::sync::oneshot;

use super::RequestFn;
use crate::{Result, Signature};

/// A request deferred while the cooldown is active
pub(crate) struct QueueItem<T> {
    pub(crate) request: RequestFn<T>,
    pub(crate) signature: Signature,
    pub(crate) respond: oneshot::Sender<Result<T>>,
    pub(crate) retry_count: u32,
}

impl<T> fmt::Debug for QueueItem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueItem")
            .field("signature", &self.signature)
            .field("retry_count", &self.retry_count)
            .finish_non_exhaustive()
    }
}

/// Strict FIFO of deferred requests, executed one at a time
#[derive(Debug)]
pub(crate) struct PendingQueue<T> {
    items: VecDeque<QueueItem<T>>,
    /// Whether a dequeued item is still executing
    busy: bool,
}

impl<T> PendingQueue<T> {
    pub(crate) const fn new() -> Self {
        Self {
            items: VecDeque::new(),
            busy: false,
        }
    }

    pub(crate) fn push(&mut self, item: QueueItem<T>) {
        self.items.push_back(item);
    }

    /// Take the oldest item unless another item is still executing.
    /// The queue stays busy until [`PendingQueue::finish`] is called.
    pub(crate) fn next(&mut self) -> Option<QueueItem<T>> {
        if self.busy {
            return None;
        }
        let item = self.items.pop_front()?;
        self.busy = true;
        Some(item)
    }

    pub(crate) const fn finish(&mut self) {
        self.busy = false;
    }

    /// Remove every waiting item; an executing item is not affected
    pub(crate) fn take_all(&mut self) -> Vec<QueueItem<T>> {
        self.items.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

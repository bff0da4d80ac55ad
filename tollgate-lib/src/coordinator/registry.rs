use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::Pending;
use crate::Signature;

/// Lifecycle of the single execution behind a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing is in flight for the signature
    Idle,
    /// A transport call is outstanding
    Dispatched {
        /// Number of rate-limited attempts before this one
        retry_count: u32,
    },
    /// The last attempt was rate limited; waiting for the backoff timer
    CoolingDown {
        /// Number of the retry that is being waited for, minus one
        retry_count: u32,
    },
    /// The execution finished and is releasing its slot
    Settled,
}

/// A dispatched execution and everyone waiting for it
#[derive(Debug)]
pub(crate) struct InFlight<T: Clone> {
    /// Identifies the execution that owns this entry
    id: u64,
    pending: Pending<T>,
    phase: Phase,
}

/// Maps each signature to its one in-flight execution
#[derive(Debug)]
pub(crate) struct Registry<T: Clone> {
    entries: DashMap<Signature, InFlight<T>>,
}

impl<T: Clone> Registry<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Join the execution registered for `signature`, or call `start` to
    /// create one while the slot is locked.
    ///
    /// `start` may decline by returning `Err`, in which case nothing is
    /// registered and the error value is handed back.
    pub(crate) fn join_or_start<F, E>(&self, signature: &Signature, start: F) -> Joined<T, E>
    where
        F: FnOnce() -> Result<(u64, Pending<T>), E>,
    {
        match self.entries.entry(signature.clone()) {
            Entry::Occupied(entry) => Joined::Existing(entry.get().pending.clone()),
            Entry::Vacant(entry) => match start() {
                Ok((id, pending)) => {
                    entry.insert(InFlight {
                        id,
                        pending: pending.clone(),
                        phase: Phase::Dispatched { retry_count: 0 },
                    });
                    Joined::Started(pending)
                }
                Err(declined) => Joined::Declined(declined),
            },
        }
    }

    /// Record a phase change, if execution `id` still owns the entry
    pub(crate) fn enter(&self, signature: &Signature, id: u64, phase: Phase) {
        if let Some(mut entry) = self.entries.get_mut(signature)
            && entry.id == id
        {
            entry.phase = phase;
        }
    }

    /// Remove the entry of execution `id`
    pub(crate) fn release(&self, signature: &Signature, id: u64) {
        self.entries.remove_if(signature, |_, entry| entry.id == id);
    }

    pub(crate) fn phase(&self, signature: &Signature) -> Phase {
        self.entries
            .get(signature)
            .map_or(Phase::Idle, |entry| entry.phase)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Result of [`Registry::join_or_start`]
pub(crate) enum Joined<T: Clone, E> {
    /// An execution was already registered
    Existing(Pending<T>),
    /// A new execution was registered
    Started(Pending<T>),
    /// Nothing was registered
    Declined(E),
}

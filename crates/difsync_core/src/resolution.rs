//! Sync-or-pending resolution results.
//!
//! Calls that cross into the engine may answer immediately or later,
//! depending on how the engine backend is configured. [`Resolution`]
//! models both without assuming either: a `Ready` value can be consumed
//! on the spot, a `Pending` one completes through its paired
//! [`Completer`]. Synchronous entry points that receive a still-pending
//! resolution fail loudly instead of blocking.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use std::sync::Arc;

type Callback<T> = Box<dyn FnOnce(SyncResult<T>) + Send>;

struct Shared<T> {
    result: Mutex<SlotState<T>>,
}

enum SlotState<T> {
    /// Not yet completed; an optional consumer callback is parked here.
    Waiting(Option<Callback<T>>),
    /// Completed; the result waits for a consumer (None once consumed).
    Done(Option<SyncResult<T>>),
}

/// The engine-side handle of a pending resolution.
///
/// Completing a second time is a no-op; the first result wins.
pub struct Completer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Completer<T> {
    /// Completes the resolution, running the parked consumer if any.
    pub fn complete(self, result: SyncResult<T>) {
        let mut state = self.shared.result.lock();
        let previous = std::mem::replace(&mut *state, SlotState::Done(None));
        match previous {
            SlotState::Waiting(Some(callback)) => {
                // Run the consumer outside the lock.
                drop(state);
                callback(result);
            }
            SlotState::Waiting(None) => {
                *state = SlotState::Done(Some(result));
            }
            done @ SlotState::Done(_) => {
                *state = done;
            }
        }
    }
}

/// The consumer-side handle of a not-yet-ready result.
pub struct Pending<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Pending<T> {
    /// Creates a paired completer and pending handle.
    #[must_use]
    pub fn channel() -> (Completer<T>, Pending<T>) {
        let shared = Arc::new(Shared {
            result: Mutex::new(SlotState::Waiting(None)),
        });
        (
            Completer {
                shared: Arc::clone(&shared),
            },
            Pending { shared },
        )
    }

    /// Registers the consumer, running it immediately if already complete.
    pub fn on_ready(self, callback: impl FnOnce(SyncResult<T>) + Send + 'static) {
        let ready = {
            let mut state = self.shared.result.lock();
            match &mut *state {
                SlotState::Waiting(slot) => {
                    *slot = Some(Box::new(callback));
                    return;
                }
                SlotState::Done(result) => result.take(),
            }
        };
        if let Some(result) = ready {
            callback(result);
        }
    }

    /// Takes the result if the resolution already completed.
    #[must_use]
    pub fn try_take(&self) -> Option<SyncResult<T>> {
        match &mut *self.shared.result.lock() {
            SlotState::Waiting(_) => None,
            SlotState::Done(result) => result.take(),
        }
    }
}

/// A result that is either ready now or will complete later.
pub enum Resolution<T> {
    /// The value is available immediately.
    Ready(T),
    /// The value will arrive through the paired [`Completer`].
    Pending(Pending<T>),
}

impl<T: Send + 'static> Resolution<T> {
    /// Creates an immediately-ready resolution.
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self::Ready(value)
    }

    /// Creates an already-failed resolution.
    #[must_use]
    pub fn failed(error: SyncError) -> Self {
        let (completer, pending) = Pending::channel();
        completer.complete(Err(error));
        Self::Pending(pending)
    }

    /// Consumes the resolution synchronously.
    ///
    /// Fails with [`SyncError::SyncResolutionUnavailable`] when the
    /// resolution has not completed yet.
    pub fn expect_ready(self) -> SyncResult<T> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Pending(pending) => pending
                .try_take()
                .unwrap_or(Err(SyncError::SyncResolutionUnavailable)),
        }
    }

    /// Registers a consumer for the eventual result.
    pub fn on_ready(self, callback: impl FnOnce(SyncResult<T>) + Send + 'static) {
        match self {
            Self::Ready(value) => callback(Ok(value)),
            Self::Pending(pending) => pending.on_ready(callback),
        }
    }

    /// Chains a fallible transformation onto the eventual value.
    #[must_use]
    pub fn and_then<U: Send + 'static>(
        self,
        transform: impl FnOnce(T) -> SyncResult<U> + Send + 'static,
    ) -> Resolution<U> {
        self.chain(move |value| transform(value).map(Resolution::Ready))
    }

    /// Chains a transformation that may itself resolve asynchronously.
    #[must_use]
    pub fn chain<U: Send + 'static>(
        self,
        transform: impl FnOnce(T) -> SyncResult<Resolution<U>> + Send + 'static,
    ) -> Resolution<U> {
        match self {
            Self::Ready(value) => match transform(value) {
                Ok(next) => next,
                Err(error) => Resolution::failed(error),
            },
            Self::Pending(pending) => {
                let (completer, out) = Pending::channel();
                pending.on_ready(move |result| match result.and_then(transform) {
                    Ok(Resolution::Ready(value)) => completer.complete(Ok(value)),
                    Ok(Resolution::Pending(inner)) => {
                        inner.on_ready(move |inner_result| completer.complete(inner_result));
                    }
                    Err(error) => completer.complete(Err(error)),
                });
                Resolution::Pending(out)
            }
        }
    }

    /// Aggregates many resolutions into one.
    ///
    /// Ready only when every input is ready; the first failure fails the
    /// aggregate. Result order matches input order.
    #[must_use]
    pub fn join_all(items: Vec<Resolution<T>>) -> Resolution<Vec<T>> {
        let mut slots: Vec<Option<T>> = Vec::with_capacity(items.len());
        let mut waiting: Vec<(usize, Pending<T>)> = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            match item {
                Resolution::Ready(value) => slots.push(Some(value)),
                Resolution::Pending(pending) => {
                    slots.push(None);
                    waiting.push((index, pending));
                }
            }
        }

        if waiting.is_empty() {
            let values = slots.into_iter().map(|slot| {
                slot.expect("every slot filled when nothing is pending")
            });
            return Resolution::Ready(values.collect());
        }

        let (completer, out) = Pending::channel();
        let join = Arc::new(Mutex::new(JoinState {
            slots,
            remaining: waiting.len(),
            completer: Some(completer),
        }));

        for (index, pending) in waiting {
            let join = Arc::clone(&join);
            pending.on_ready(move |result| {
                let finished = {
                    let mut state = join.lock();
                    if state.completer.is_none() {
                        return;
                    }
                    match result {
                        Ok(value) => {
                            state.slots[index] = Some(value);
                            state.remaining -= 1;
                            if state.remaining == 0 {
                                let completer = state.completer.take();
                                let values = state
                                    .slots
                                    .iter_mut()
                                    .map(|slot| slot.take().expect("all slots filled"))
                                    .collect::<Vec<_>>();
                                completer.map(|c| (c, Ok(values)))
                            } else {
                                None
                            }
                        }
                        Err(error) => state.completer.take().map(|c| (c, Err(error))),
                    }
                };
                if let Some((completer, result)) = finished {
                    completer.complete(result);
                }
            });
        }

        Resolution::Pending(out)
    }
}

struct JoinState<T> {
    slots: Vec<Option<T>>,
    remaining: usize,
    completer: Option<Completer<Vec<T>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_resolves_synchronously() {
        let resolution = Resolution::ready(42);
        assert_eq!(resolution.expect_ready().unwrap(), 42);
    }

    #[test]
    fn pending_fails_synchronous_access() {
        let (_completer, pending) = Pending::<u32>::channel();
        let resolution = Resolution::Pending(pending);
        assert!(matches!(
            resolution.expect_ready(),
            Err(SyncError::SyncResolutionUnavailable)
        ));
    }

    #[test]
    fn completed_pending_is_consumable_synchronously() {
        let (completer, pending) = Pending::channel();
        completer.complete(Ok(7));
        let resolution = Resolution::Pending(pending);
        assert_eq!(resolution.expect_ready().unwrap(), 7);
    }

    #[test]
    fn on_ready_fires_after_completion() {
        let (completer, pending) = Pending::channel();
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        pending.on_ready(move |result: SyncResult<u32>| {
            *seen_clone.lock() = Some(result.unwrap());
        });
        assert!(seen.lock().is_none());
        completer.complete(Ok(9));
        assert_eq!(*seen.lock(), Some(9));
    }

    #[test]
    fn chain_through_pending() {
        let (completer, pending) = Pending::channel();
        let chained = Resolution::Pending(pending).and_then(|v: u32| Ok(v * 2));
        completer.complete(Ok(21));
        assert_eq!(chained.expect_ready().unwrap(), 42);
    }

    #[test]
    fn join_all_ready() {
        let joined = Resolution::join_all(vec![
            Resolution::ready(1),
            Resolution::ready(2),
            Resolution::ready(3),
        ]);
        assert_eq!(joined.expect_ready().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn join_all_waits_for_every_input() {
        let (c1, p1) = Pending::channel();
        let (c2, p2) = Pending::channel();
        let joined = Resolution::join_all(vec![
            Resolution::ready(1),
            Resolution::Pending(p1),
            Resolution::Pending(p2),
        ]);

        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        joined.on_ready(move |result| {
            *seen_clone.lock() = Some(result.unwrap());
        });

        c2.complete(Ok(3));
        assert!(seen.lock().is_none());
        c1.complete(Ok(2));
        assert_eq!(*seen.lock(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn join_all_propagates_first_failure() {
        let (completer, pending) = Pending::channel();
        let joined = Resolution::join_all(vec![Resolution::ready(1), Resolution::Pending(pending)]);
        completer.complete(Err(SyncError::SyncResolutionUnavailable));
        assert!(joined.expect_ready().is_err());
    }

    #[test]
    fn failed_resolution_surfaces_error() {
        let failed: Resolution<u32> = Resolution::failed(SyncError::engine("boom"));
        assert!(matches!(
            failed.expect_ready(),
            Err(SyncError::Engine { .. })
        ));
    }
}

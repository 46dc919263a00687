//! One-shot completion signals.
//!
//! A [`CompletionSource`] is held by whoever finishes the work (the scheduler
//! for a batch, a timeline for an effect) and resolves exactly once by value.
//! Callers poll the cloneable [`Completion`]. A source dropped without
//! resolving leaves its handles `Abandoned`, which is never reported as
//! resolved: cancellation is observably different from completion.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
enum Slot<T> {
    Pending,
    Resolved(T),
    Abandoned,
}

/// Observer side of a completion signal.
pub struct Completion<T = ()> {
    slot: Rc<RefCell<Slot<T>>>,
}

/// Completion of an [`crate::AnimationBatch`].
pub type CompletionHandle = Completion<()>;

/// Resolver side of a completion signal.
pub struct CompletionSource<T = ()> {
    slot: Rc<RefCell<Slot<T>>>,
}

/// Create a linked source/handle pair.
pub fn completion_pair<T>() -> (CompletionSource<T>, Completion<T>) {
    let slot = Rc::new(RefCell::new(Slot::Pending));
    (
        CompletionSource { slot: slot.clone() },
        Completion { slot },
    )
}

impl<T> Completion<T> {
    /// A handle that is already resolved with `value`.
    pub fn resolved(value: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot::Resolved(value))),
        }
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(*self.slot.borrow(), Slot::Resolved(_))
    }

    /// Neither resolved nor abandoned yet.
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(*self.slot.borrow(), Slot::Pending)
    }

    /// The source was dropped (work cancelled) without resolving.
    #[inline]
    pub fn is_abandoned(&self) -> bool {
        matches!(*self.slot.borrow(), Slot::Abandoned)
    }
}

impl<T: Clone> Completion<T> {
    /// Resolved value, if any.
    pub fn value(&self) -> Option<T> {
        match &*self.slot.borrow() {
            Slot::Resolved(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.slot.borrow() {
            Slot::Pending => "pending",
            Slot::Resolved(_) => "resolved",
            Slot::Abandoned => "abandoned",
        };
        f.debug_struct("Completion").field("state", &state).finish()
    }
}

impl<T> CompletionSource<T> {
    /// Resolve every linked handle. Consumes the source, so this happens once.
    pub fn resolve(self, value: T) {
        *self.slot.borrow_mut() = Slot::Resolved(value);
    }

    /// A fresh handle linked to this source.
    pub fn handle(&self) -> Completion<T> {
        Completion {
            slot: self.slot.clone(),
        }
    }
}

impl<T> Drop for CompletionSource<T> {
    fn drop(&mut self) {
        let mut slot = self.slot.borrow_mut();
        if matches!(*slot, Slot::Pending) {
            *slot = Slot::Abandoned;
        }
    }
}

impl<T> fmt::Debug for CompletionSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSource").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_once_with_value() {
        let (source, handle) = completion_pair::<f64>();
        let other = handle.clone();
        assert!(handle.is_pending());
        source.resolve(2.5);
        assert!(handle.is_resolved());
        assert_eq!(other.value(), Some(2.5));
    }

    #[test]
    fn dropped_source_abandons() {
        let (source, handle) = completion_pair::<()>();
        drop(source);
        assert!(handle.is_abandoned());
        assert!(!handle.is_resolved());
        assert!(!handle.is_pending());
    }

    #[test]
    fn pre_resolved_handle() {
        let handle = Completion::resolved(1000.0);
        assert_eq!(handle.value(), Some(1000.0));
    }
}

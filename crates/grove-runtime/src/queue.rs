//! The per-pipeline event queue.
//!
//! A FIFO of fired events. The head entry stays visible while it is
//! being dispatched and is removed afterwards, so an observer that
//! peeks a non-empty queue knows the pipeline still has work. Order is
//! preserved per enqueuing thread; nothing is promised across threads.

use grove_event::Fired;
use parking_lot::Mutex;
use std::collections::VecDeque;

pub(crate) struct EventQueue {
    entries: Mutex<VecDeque<Fired>>,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn push(&self, fired: Fired) {
        self.entries.lock().push_back(fired);
    }

    /// The head entry, left in place.
    pub(crate) fn peek(&self) -> Option<Fired> {
        self.entries.lock().front().cloned()
    }

    /// Drops the head entry after its dispatch finished.
    pub(crate) fn remove_first(&self) {
        self.entries.lock().pop_front();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Empties the queue, handing every entry to the caller. Used when
    /// a queue is merged into another pipeline.
    pub(crate) fn take_all(&self) -> Vec<Fired> {
        self.entries.lock().drain(..).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_event::EventKind;

    struct Tick;
    impl EventKind for Tick {}

    fn entry() -> Fired {
        Fired::wrap(Box::new(Tick))
    }

    #[test]
    fn fifo_order() {
        let queue = EventQueue::new();
        let a = entry();
        let b = entry();
        queue.push(a.clone());
        queue.push(b.clone());

        assert!(queue.peek().expect("head").same(&a));
        // Peek does not remove.
        assert_eq!(queue.len(), 2);

        queue.remove_first();
        assert!(queue.peek().expect("head").same(&b));
        queue.remove_first();
        assert!(queue.is_empty());
    }

    #[test]
    fn remove_on_empty_is_harmless() {
        let queue = EventQueue::new();
        queue.remove_first();
        assert!(queue.is_empty());
    }

    #[test]
    fn take_all_drains_in_order() {
        let queue = EventQueue::new();
        let a = entry();
        let b = entry();
        queue.push(a.clone());
        queue.push(b.clone());

        let drained = queue.take_all();
        assert_eq!(drained.len(), 2);
        assert!(drained[0].same(&a));
        assert!(drained[1].same(&b));
        assert!(queue.is_empty());
    }
}

//! Priority-ordered request queue
//!
//! A plain ordered sequence rather than a heap: depth is expected to be in
//! the tens, and insertion stability matters more than insert cost.

use std::collections::VecDeque;

use crate::domain::Priority;

/// Anything that can sit in a [`RequestQueue`]
pub trait Prioritized {
    fn priority(&self) -> Priority;
}

/// Priority-major, FIFO-minor queue
#[derive(Debug)]
pub struct RequestQueue<T> {
    entries: VecDeque<T>,
}

impl<T> Default for RequestQueue<T> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<T: Prioritized> RequestQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert before the first entry of strictly lower priority, or at the tail
    ///
    /// Returns the position the entry landed at.
    pub fn enqueue(&mut self, item: T) -> usize {
        let rank = item.priority().rank();
        let position = self
            .entries
            .iter()
            .position(|queued| queued.priority().rank() > rank)
            .unwrap_or(self.entries.len());
        self.entries.insert(position, item);
        position
    }

    /// Remove and return the head
    pub fn dequeue(&mut self) -> Option<T> {
        self.entries.pop_front()
    }

    /// Remove every entry in dequeue order
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.entries.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item(&'static str, Priority);

    impl Prioritized for Item {
        fn priority(&self) -> Priority {
            self.1
        }
    }

    fn names(queue: &mut RequestQueue<Item>) -> Vec<&'static str> {
        let mut out = Vec::new();
        while let Some(item) = queue.dequeue() {
            out.push(item.0);
        }
        out
    }

    #[test]
    fn test_high_before_normal_fifo_within_class() {
        let mut queue = RequestQueue::new();
        queue.enqueue(Item("A", Priority::High));
        queue.enqueue(Item("B", Priority::Normal));
        queue.enqueue(Item("C", Priority::High));

        assert_eq!(names(&mut queue), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_mixed_priorities() {
        let mut queue = RequestQueue::new();
        queue.enqueue(Item("low-1", Priority::Low));
        queue.enqueue(Item("normal-1", Priority::Normal));
        queue.enqueue(Item("high-1", Priority::High));
        queue.enqueue(Item("low-2", Priority::Low));
        queue.enqueue(Item("normal-2", Priority::Normal));
        queue.enqueue(Item("high-2", Priority::High));

        assert_eq!(
            names(&mut queue),
            vec!["high-1", "high-2", "normal-1", "normal-2", "low-1", "low-2"]
        );
    }

    #[test]
    fn test_enqueue_returns_position() {
        let mut queue = RequestQueue::new();
        assert_eq!(queue.enqueue(Item("n1", Priority::Normal)), 0);
        assert_eq!(queue.enqueue(Item("n2", Priority::Normal)), 1);
        assert_eq!(queue.enqueue(Item("h1", Priority::High)), 0);
        assert_eq!(queue.enqueue(Item("l1", Priority::Low)), 3);
        assert_eq!(queue.enqueue(Item("n3", Priority::Normal)), 3);
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn test_dequeue_empty() {
        let mut queue: RequestQueue<Item> = RequestQueue::new();
        assert!(queue.dequeue().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_empties_in_order() {
        let mut queue = RequestQueue::new();
        queue.enqueue(Item("b", Priority::Low));
        queue.enqueue(Item("a", Priority::High));

        let drained: Vec<_> = queue.drain().map(|item| item.0).collect();
        assert_eq!(drained, vec!["a", "b"]);
        assert!(queue.is_empty());
    }
}

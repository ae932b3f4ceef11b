//! Per-class bounded FIFO queue with put-back-to-front support (§4.1).
//!
//! Backed by a `VecDeque`, the same ring-buffer-shaped structure the teacher
//! uses for its bounded per-node histories (`Node::push_radio_packet` and
//! friends in the upstream simulation types module): a capacity check before
//! every push, no reallocation once the queue reaches `MAX_QUEUE_SIZE`.

use std::collections::VecDeque;

use crate::error::QueueError;
use crate::types::{MAX_QUEUE_SIZE, QueuedPacket};

/// Bounded FIFO of [`QueuedPacket`]s for a single class.
///
/// The head is always the oldest (and, by construction, earliest-deadline)
/// packet of the class. Packets are value-copied on enqueue and on peek: the
/// queue owns its storage, callers see snapshots.
#[derive(Debug, Default)]
pub struct BoundedQueue {
    items: VecDeque<QueuedPacket>,
}

impl BoundedQueue {
    pub fn new() -> Self {
        Self {
            items: VecDeque::with_capacity(MAX_QUEUE_SIZE),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= MAX_QUEUE_SIZE
    }

    /// Append to the tail. Fails with [`QueueError::Full`] at capacity.
    pub fn enqueue_back(&mut self, packet: QueuedPacket) -> Result<(), QueueError> {
        if self.is_full() {
            return Err(QueueError::Full);
        }
        self.items.push_back(packet);
        Ok(())
    }

    /// Push back onto the head (used for put-back when a dequeued packet
    /// doesn't fit the current TX buffer). Fails with [`QueueError::Full`]
    /// at capacity.
    pub fn enqueue_front(&mut self, packet: QueuedPacket) -> Result<(), QueueError> {
        if self.is_full() {
            return Err(QueueError::Full);
        }
        self.items.push_front(packet);
        Ok(())
    }

    /// Remove and return the head. Fails with [`QueueError::Empty`] if empty.
    pub fn dequeue_front(&mut self) -> Result<QueuedPacket, QueueError> {
        self.items.pop_front().ok_or(QueueError::Empty)
    }

    /// Inspect (without removing) the head. Fails with [`QueueError::Empty`] if empty.
    pub fn peek_front(&self) -> Result<&QueuedPacket, QueueError> {
        self.items.front().ok_or(QueueError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassId, DataType};

    fn packet(deadline_ms: u64) -> QueuedPacket {
        QueuedPacket::new(ClassId::ClassA, DataType::Int8, 1, deadline_ms, vec![7u8]).unwrap()
    }

    #[test]
    fn fifo_order_preserved() {
        let mut q = BoundedQueue::new();
        q.enqueue_back(packet(1)).unwrap();
        q.enqueue_back(packet(2)).unwrap();
        assert_eq!(q.dequeue_front().unwrap().deadline_ms, 1);
        assert_eq!(q.dequeue_front().unwrap().deadline_ms, 2);
    }

    #[test]
    fn enqueue_back_fails_when_full() {
        let mut q = BoundedQueue::new();
        for i in 0..MAX_QUEUE_SIZE {
            q.enqueue_back(packet(i as u64)).unwrap();
        }
        assert_eq!(q.enqueue_back(packet(999)), Err(QueueError::Full));
        assert_eq!(q.len(), MAX_QUEUE_SIZE);
    }

    #[test]
    fn enqueue_front_fails_when_full() {
        let mut q = BoundedQueue::new();
        for i in 0..MAX_QUEUE_SIZE {
            q.enqueue_back(packet(i as u64)).unwrap();
        }
        assert_eq!(q.enqueue_front(packet(999)), Err(QueueError::Full));
    }

    #[test]
    fn dequeue_and_peek_fail_when_empty() {
        let mut q = BoundedQueue::new();
        assert_eq!(q.dequeue_front(), Err(QueueError::Empty));
        assert_eq!(q.peek_front(), Err(QueueError::Empty));
    }

    #[test]
    fn put_back_returns_to_head() {
        let mut q = BoundedQueue::new();
        q.enqueue_back(packet(5)).unwrap();
        let dequeued = q.dequeue_front().unwrap();
        q.enqueue_back(packet(6)).unwrap();
        q.enqueue_front(dequeued).unwrap();
        assert_eq!(q.dequeue_front().unwrap().deadline_ms, 5);
        assert_eq!(q.dequeue_front().unwrap().deadline_ms, 6);
    }
}

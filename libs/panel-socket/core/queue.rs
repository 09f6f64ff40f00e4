use std::collections::VecDeque;

/// Default number of messages held while disconnected
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100;

/// Bounded FIFO of serialized payloads waiting for a connection
///
/// When full, pushing evicts the oldest entry.
#[derive(Debug)]
pub struct MessageQueue {
    entries: VecDeque<String>,
    capacity: usize,
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a payload, returning the evicted one if the bound was hit
    pub fn push(&mut self, payload: String) -> Option<String> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(payload);
        evicted
    }

    /// Take every queued payload in original order
    pub fn drain(&mut self) -> Vec<String> {
        self.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUEUE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_last_hundred_in_order() {
        let mut queue = MessageQueue::default();
        let mut evicted = 0;
        for i in 0..150 {
            if queue.push(format!("m{}", i)).is_some() {
                evicted += 1;
            }
        }

        assert_eq!(evicted, 50);
        let drained = queue.drain();
        assert_eq!(drained.len(), 100);
        assert_eq!(drained.first().map(String::as_str), Some("m50"));
        assert_eq!(drained.last().map(String::as_str), Some("m149"));
        assert!(drained.windows(2).all(|w| {
            let a: usize = w[0][1..].parse().unwrap();
            let b: usize = w[1][1..].parse().unwrap();
            b == a + 1
        }));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_eviction_returns_oldest() {
        let mut queue = MessageQueue::new(2);
        assert_eq!(queue.push("a".into()), None);
        assert_eq!(queue.push("b".into()), None);
        assert_eq!(queue.push("c".into()), Some("a".to_string()));
        assert_eq!(queue.drain(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let queue = MessageQueue::new(0);
        assert_eq!(queue.capacity(), 1);
    }
}

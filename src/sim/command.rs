//! Thread-safe command queue
//!
//! The queue is the sole synchronization boundary between the simulation and
//! the outside world. Producers only append; the step function drains the
//! whole buffer in one swap so a batch is never observed half-applied.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable FIFO handle shared between producers and the simulation
#[derive(Debug)]
pub struct CommandQueue<C> {
    inner: Arc<Mutex<Vec<C>>>,
}

impl<C> Clone for CommandQueue<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> Default for CommandQueue<C> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<C> CommandQueue<C> {
    pub fn new() -> Self {
        Self::default()
    }

    // A producer that panicked mid-push leaves a valid Vec behind, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Vec<C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one command. Never blocks on the simulation beyond the push.
    pub fn enqueue(&self, command: C) {
        self.lock().push(command);
    }

    /// Take every pending command in FIFO order, leaving the queue empty
    pub fn drain(&self) -> Vec<C> {
        std::mem::take(&mut *self.lock())
    }

    /// Drop pending commands without applying them
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_drain_is_fifo_and_clears() {
        let queue = CommandQueue::new();
        queue.enqueue(1);
        queue.enqueue(2);
        queue.enqueue(3);

        assert_eq!(queue.drain(), vec![1, 2, 3]);
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_clones_share_buffer() {
        let queue = CommandQueue::new();
        let producer = queue.clone();
        producer.enqueue("jump");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_concurrent_producers() {
        let queue: CommandQueue<u32> = CommandQueue::new();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let producer = queue.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        producer.enqueue(t * 1000 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let drained = queue.drain();
        assert_eq!(drained.len(), 1000);
        // Per-producer order survives interleaving
        for t in 0..4 {
            let own: Vec<u32> = drained.iter().copied().filter(|c| c / 1000 == t).collect();
            assert!(own.windows(2).all(|w| w[0] < w[1]));
        }
    }
}

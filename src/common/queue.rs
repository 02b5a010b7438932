//! Broadcast queue used to fan run events out to subscribers.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{DagflowError, Result};

/// Broadcast queue for one-to-many message distribution.
///
/// Every subscriber receives every message sent after it subscribed. Slow
/// subscribers lose the oldest messages once `cap` is exceeded.
#[derive(Clone)]
pub struct BroadcastQueue<T> {
    sender: Arc<broadcast::Sender<T>>,
}

impl<T: Clone> BroadcastQueue<T> {
    /// create a new broadcast queue
    pub fn new(cap: usize) -> Arc<Self> {
        let (tx, _) = broadcast::channel(cap);

        Arc::new(Self {
            sender: Arc::new(tx),
        })
    }

    /// send a message to the queue; fails when nobody is subscribed
    pub fn send(
        &self,
        msg: T,
    ) -> Result<()> {
        self.sender.send(msg).map_err(|_| DagflowError::Engine("event queue has no subscribers".to_string()))?;
        Ok(())
    }

    /// subscribe to the queue
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let queue = BroadcastQueue::<u32>::new(8);
        let mut a = queue.subscribe();
        let mut b = queue.subscribe();
        queue.send(7).unwrap();
        assert_eq!(a.recv().await.unwrap(), 7);
        assert_eq!(b.recv().await.unwrap(), 7);
    }

    #[test]
    fn test_send_without_subscribers_errors() {
        let queue = BroadcastQueue::<u32>::new(8);
        assert!(queue.send(1).is_err());
    }
}

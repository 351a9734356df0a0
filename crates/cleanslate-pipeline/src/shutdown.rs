//! Cooperative shutdown signal shared by the watcher, the pipeline and the
//! audit drainer.

use std::sync::Arc;

use tokio::sync::watch;

/// Sending half; flipping it asks every holder of a [`Shutdown`] to stop.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownTrigger {
    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Create another receiver bound to this trigger.
    #[must_use]
    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            receiver: self.sender.subscribe(),
            _keepalive: None,
        }
    }
}

/// Receiving half of the shutdown signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
    _keepalive: Option<Arc<watch::Sender<bool>>>,
}

impl Shutdown {
    /// Create a linked trigger/receiver pair.
    #[must_use]
    pub fn channel() -> (ShutdownTrigger, Self) {
        let (sender, receiver) = watch::channel(false);
        (
            ShutdownTrigger {
                sender: Arc::new(sender),
            },
            Self {
                receiver,
                _keepalive: None,
            },
        )
    }

    /// A signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            receiver,
            _keepalive: Some(Arc::new(sender)),
        }
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once shutdown is requested.
    ///
    /// A dropped trigger without a request is treated as "never".
    pub async fn wait(&mut self) {
        if self.receiver.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_wakes_every_receiver() {
        let (trigger, mut first) = Shutdown::channel();
        let mut second = trigger.subscribe();
        assert!(!first.is_triggered());

        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(1), first.wait())
            .await
            .expect("first receiver woke");
        tokio::time::timeout(Duration::from_secs(1), second.wait())
            .await
            .expect("second receiver woke");
        assert!(second.is_triggered());
    }

    #[tokio::test]
    async fn never_does_not_fire() {
        let mut shutdown = Shutdown::never();
        let waited = tokio::time::timeout(Duration::from_millis(20), shutdown.wait()).await;
        assert!(waited.is_err());
        assert!(!shutdown.is_triggered());
    }

    #[tokio::test]
    async fn dropped_trigger_is_not_a_request() {
        let (trigger, mut shutdown) = Shutdown::channel();
        drop(trigger);
        let waited = tokio::time::timeout(Duration::from_millis(20), shutdown.wait()).await;
        assert!(waited.is_err());
    }
}

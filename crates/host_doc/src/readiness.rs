//! Document readiness phases and the one-shot readiness signal.

use tokio::sync::watch;

/// Observable lifecycle phases of a host document's structure.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DocumentPhase {
    /// Structural content is still being parsed.
    Loading,
    /// Structural content is parsed and available for manipulation.
    Ready,
}

/// A readiness subscription handed out by [`HostDocument::subscribe`].
///
/// The current phase is synchronously readable at any time; `wait_ready`
/// suspends until the one-shot `Loading -> Ready` transition and resolves
/// immediately when readiness was already reached before the call.
///
/// [`HostDocument::subscribe`]: crate::document::HostDocument::subscribe
pub struct ReadinessSignal {
    receiver: watch::Receiver<DocumentPhase>,
}

impl ReadinessSignal {
    pub(crate) const fn new(receiver: watch::Receiver<DocumentPhase>) -> Self {
        Self { receiver }
    }

    /// Synchronously-readable current phase.
    #[must_use]
    pub fn current(&self) -> DocumentPhase {
        *self.receiver.borrow()
    }

    /// Suspend until the document leaves the loading phase.
    ///
    /// A dropped document counts as fired so a waiter can never hang on a
    /// page view that no longer exists. Repeat signals after the first are
    /// absorbed by the underlying watch channel.
    pub async fn wait_ready(&mut self) {
        while *self.receiver.borrow_and_update() == DocumentPhase::Loading {
            if self.receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DocumentPhase, ReadinessSignal};
    use tokio::sync::watch;

    #[tokio::test]
    async fn wait_ready_resolves_immediately_when_already_ready() {
        let (sender, receiver) = watch::channel(DocumentPhase::Ready);
        let mut signal = ReadinessSignal::new(receiver);
        assert_eq!(signal.current(), DocumentPhase::Ready);
        signal.wait_ready().await;
        drop(sender);
    }

    #[tokio::test]
    async fn wait_ready_observes_the_transition() {
        let (sender, receiver) = watch::channel(DocumentPhase::Loading);
        let mut signal = ReadinessSignal::new(receiver);
        assert_eq!(signal.current(), DocumentPhase::Loading);

        let waiter = async {
            signal.wait_ready().await;
            signal.current()
        };
        let fire = async {
            sender.send_replace(DocumentPhase::Ready);
        };
        let (phase, ()) = tokio::join!(waiter, fire);
        assert_eq!(phase, DocumentPhase::Ready);
    }

    #[tokio::test]
    async fn wait_ready_does_not_hang_on_a_dropped_sender() {
        let (sender, receiver) = watch::channel(DocumentPhase::Loading);
        drop(sender);
        let mut signal = ReadinessSignal::new(receiver);
        signal.wait_ready().await;
    }
}

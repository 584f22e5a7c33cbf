use serde::Serialize;
use tokio::sync::broadcast;

use crate::dao::models::ResourceKind;

/// Published after a resource quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUpdated {
    /// Resource whose quantity changed.
    pub kind: ResourceKind,
}

/// Fire-and-forget broadcast hub for [`ResourceUpdated`] notifications.
pub struct ResourceHub {
    sender: broadcast::Sender<ResourceUpdated>,
}

impl ResourceHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ResourceUpdated> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn publish(&self, kind: ResourceKind) {
        let _ = self.sender.send(ResourceUpdated { kind });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_kinds() {
        let hub = ResourceHub::new(4);
        let mut rx = hub.subscribe();

        hub.publish(ResourceKind::Coin);
        hub.publish(ResourceKind::Booster);

        assert_eq!(rx.recv().await.unwrap().kind, ResourceKind::Coin);
        assert_eq!(rx.recv().await.unwrap().kind, ResourceKind::Booster);
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let hub = ResourceHub::new(1);
        hub.publish(ResourceKind::Heart);
    }
}

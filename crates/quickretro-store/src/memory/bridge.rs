use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::bridge::{Bridge, Delivery};
use crate::error::{StoreError, StoreResult};

struct Endpoint {
    tx: mpsc::UnboundedSender<Delivery>,
    channels: HashSet<String>,
}

/// In-process message bus. Every [`attach`](MemoryBus::attach) plays the part
/// of one server process with its own subscriptions.
#[derive(Clone, Default)]
pub struct MemoryBus {
    endpoints: Arc<Mutex<HashMap<u64, Endpoint>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new endpoint. Deliveries for its subscribed channels arrive on
    /// the returned receiver.
    pub fn attach(&self) -> (MemoryBridge, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let endpoint = Endpoint {
            tx,
            channels: HashSet::new(),
        };
        if let Ok(mut endpoints) = self.endpoints.lock() {
            endpoints.insert(id, endpoint);
        }
        (
            MemoryBridge {
                bus: self.clone(),
                id,
            },
            rx,
        )
    }

    fn endpoints(&self) -> StoreResult<MutexGuard<'_, HashMap<u64, Endpoint>>> {
        self.endpoints
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("bus lock poisoned: {e}")))
    }
}

/// One endpoint of a [`MemoryBus`].
#[derive(Clone)]
pub struct MemoryBridge {
    bus: MemoryBus,
    id: u64,
}

impl MemoryBridge {
    /// Channels this endpoint currently listens on, sorted.
    pub fn subscriptions(&self) -> Vec<String> {
        let mut channels: Vec<String> = self
            .bus
            .endpoints()
            .ok()
            .and_then(|endpoints| endpoints.get(&self.id).map(|e| e.channels.iter().cloned().collect()))
            .unwrap_or_default();
        channels.sort();
        channels
    }
}

#[async_trait]
impl Bridge for MemoryBridge {
    async fn publish(&self, channel: &str, payload: String) -> StoreResult<()> {
        let endpoints = self.bus.endpoints()?;
        for endpoint in endpoints.values().filter(|e| e.channels.contains(channel)) {
            // A closed receiver only means that endpoint's hub has stopped.
            let _ = endpoint.tx.send(Delivery {
                channel: channel.to_string(),
                payload: payload.clone(),
            });
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> StoreResult<()> {
        let mut endpoints = self.bus.endpoints()?;
        if let Some(e) = endpoints.get_mut(&self.id) {
            e.channels.insert(channel.to_string());
        }
        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> StoreResult<()> {
        let mut endpoints = self.bus.endpoints()?;
        if let Some(e) = endpoints.get_mut(&self.id) {
            e.channels.remove(channel);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_only_to_subscribed_endpoints() {
        let bus = MemoryBus::new();
        let (a, mut rx_a) = bus.attach();
        let (b, mut rx_b) = bus.attach();

        a.subscribe("b1").await.unwrap();
        b.publish("b1", "hello".into()).await.unwrap();

        let got = rx_a.recv().await.unwrap();
        assert_eq!(got.channel, "b1");
        assert_eq!(got.payload, "hello");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = MemoryBus::new();
        let (a, mut rx) = bus.attach();

        a.subscribe("b1").await.unwrap();
        assert_eq!(a.subscriptions(), vec!["b1".to_string()]);
        a.unsubscribe("b1").await.unwrap();
        assert!(a.subscriptions().is_empty());

        a.publish("b1", "late".into()).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn endpoints_keep_separate_subscriptions() {
        let bus = MemoryBus::new();
        let (a, mut rx_a) = bus.attach();
        let (b, mut rx_b) = bus.attach();

        a.subscribe("b1").await.unwrap();
        b.subscribe("b1").await.unwrap();
        b.subscribe("b2").await.unwrap();
        assert_eq!(a.subscriptions(), vec!["b1".to_string()]);
        assert_eq!(b.subscriptions(), vec!["b1".to_string(), "b2".to_string()]);

        a.publish("b1", "both".into()).await.unwrap();
        assert_eq!(rx_a.recv().await.unwrap().payload, "both");
        assert_eq!(rx_b.recv().await.unwrap().payload, "both");
    }
}

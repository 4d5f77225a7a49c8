use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;
use redis::aio::{MultiplexedConnection, PubSubSink};
use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};

use crate::bridge::{Bridge, Delivery};
use crate::error::StoreResult;

/// Redis PUBLISH/SUBSCRIBE bridge.
///
/// Publishing goes over the shared multiplexed connection. Subscriptions live
/// on a dedicated pub/sub connection; its message stream is forwarded into the
/// delivery channel by a background task.
pub struct RedisBridge {
    conn: MultiplexedConnection,
    sink: Mutex<PubSubSink>,
}

impl RedisBridge {
    pub async fn connect(client: &redis::Client) -> StoreResult<(Self, mpsc::UnboundedReceiver<Delivery>)> {
        let conn = client.get_multiplexed_async_connection().await?;
        let (sink, mut stream) = client.get_async_pubsub().await?.split();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(error = %e, channel = msg.get_channel_name(), "Dropping undecodable pub/sub payload");
                        continue;
                    }
                };
                let delivery = Delivery {
                    channel: msg.get_channel_name().to_string(),
                    payload,
                };
                if tx.send(delivery).is_err() {
                    break;
                }
            }
            info!("Redis pub/sub stream closed");
        });

        Ok((
            Self {
                conn,
                sink: Mutex::new(sink),
            },
            rx,
        ))
    }
}

#[async_trait]
impl Bridge for RedisBridge {
    async fn publish(&self, channel: &str, payload: String) -> StoreResult<()> {
        let _: i64 = self.conn.clone().publish(channel, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> StoreResult<()> {
        self.sink.lock().await.subscribe(channel).await?;
        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> StoreResult<()> {
        self.sink.lock().await.unsubscribe(channel).await?;
        Ok(())
    }
}

//! Response publisher for Zenoh.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{BridgeError, Result};

/// Publisher for sending JSON documents to Zenoh.
///
/// Wraps a Zenoh session and the bridge key prefix.
#[derive(Clone, Debug)]
pub struct Publisher {
    session: Arc<zenoh::Session>,
    key_prefix: String,
}

impl Publisher {
    /// Create a new publisher.
    pub fn new(session: Arc<zenoh::Session>, key_prefix: impl Into<String>) -> Self {
        Self {
            session,
            key_prefix: key_prefix.into(),
        }
    }

    /// Get the key prefix.
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Get a reference to the Zenoh session.
    pub fn session(&self) -> &Arc<zenoh::Session> {
        &self.session
    }

    /// Publish raw bytes to a key.
    pub async fn publish_raw(&self, key: &str, payload: Vec<u8>) -> Result<()> {
        self.session
            .put(key, payload)
            .await
            .map_err(|e| BridgeError::Publish {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    /// Publish a JSON value to a key.
    pub async fn publish_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let payload = serde_json::to_vec(value)?;
        self.publish_raw(key, payload).await
    }

    /// Publish a response document, fire-and-forget.
    ///
    /// Serialization and publish failures are logged and dropped; the caller
    /// has no way to observe them.
    pub async fn respond<T: Serialize>(&self, key: &str, value: &T) {
        match self.publish_json(key, value).await {
            Ok(()) => tracing::debug!(key = %key, "Published response"),
            Err(e) => tracing::error!(key = %key, error = %e, "Failed to publish response"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_respond_publishes_json() {
        let session = Arc::new(zenoh::open(zenoh::Config::default()).await.unwrap());
        let publisher = Publisher::new(session.clone(), "zensight/publisher_test");
        let key = "zensight/publisher_test/read/response";

        let subscriber = session.declare_subscriber(key).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        publisher
            .respond(key, &serde_json::json!({"success": true}))
            .await;

        let sample = tokio::time::timeout(Duration::from_secs(5), subscriber.recv_async())
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&sample.payload().to_bytes()).unwrap();
        assert_eq!(value["success"], true);

        session.close().await.unwrap();
    }
}

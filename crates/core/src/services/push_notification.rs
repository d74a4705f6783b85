//! Push notification delivery.
//!
//! The dispatcher batches messages into fixed-size chunks and hands each
//! chunk to a [`PushSender`]. Delivery is never load-bearing: a failed chunk
//! is logged and counted, and the caller's operation proceeds.

use cityfix_common::{AppError, AppResult};
use serde::Serialize;
use std::sync::Arc;

/// Provider chunk size. The push gateway rejects larger batches.
pub const PUSH_CHUNK_SIZE: usize = 100;

/// One push message addressed to a device token.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    /// Device push token.
    pub to: String,
    pub title: String,
    pub body: String,
    /// Opaque payload delivered alongside the notification, typically the
    /// report id for deep links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Tally of one dispatch run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PushOutcome {
    /// Messages handed to the provider in successful chunks.
    pub sent: usize,
    /// Messages in chunks the provider rejected.
    pub failed: usize,
}

/// Transport for push message chunks.
#[async_trait::async_trait]
pub trait PushSender: Send + Sync {
    /// Deliver one chunk of at most [`PUSH_CHUNK_SIZE`] messages.
    async fn send_chunk(&self, messages: &[PushMessage]) -> AppResult<()>;
}

/// HTTP push sender posting chunks to an Expo-compatible gateway.
pub struct HttpPushSender {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPushSender {
    /// Create a new sender for the given gateway endpoint.
    #[must_use]
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait::async_trait]
impl PushSender for HttpPushSender {
    async fn send_chunk(&self, messages: &[PushMessage]) -> AppResult<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(messages)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::ExternalService(format!(
                "push gateway returned {}",
                response.status()
            )))
        }
    }
}

/// Sender that drops everything. Used where push is not configured.
pub struct NoOpPushSender;

#[async_trait::async_trait]
impl PushSender for NoOpPushSender {
    async fn send_chunk(&self, _messages: &[PushMessage]) -> AppResult<()> {
        Ok(())
    }
}

/// Chunks and dispatches push messages through a sender.
#[derive(Clone)]
pub struct PushDispatcher {
    sender: Arc<dyn PushSender>,
}

impl PushDispatcher {
    /// Create a dispatcher over a sender.
    #[must_use]
    pub fn new(sender: Arc<dyn PushSender>) -> Self {
        Self { sender }
    }

    /// Send all messages in chunks of [`PUSH_CHUNK_SIZE`].
    ///
    /// Chunks fail independently; the outcome tallies both sides.
    pub async fn dispatch(&self, messages: &[PushMessage]) -> PushOutcome {
        let mut outcome = PushOutcome::default();

        for chunk in messages.chunks(PUSH_CHUNK_SIZE) {
            match self.sender.send_chunk(chunk).await {
                Ok(()) => outcome.sent += chunk.len(),
                Err(e) => {
                    outcome.failed += chunk.len();
                    tracing::warn!(
                        chunk_size = chunk.len(),
                        error = %e,
                        "Push chunk delivery failed"
                    );
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSender {
        chunks: Mutex<Vec<usize>>,
        fail_chunk: Option<usize>,
    }

    impl RecordingSender {
        fn new(fail_chunk: Option<usize>) -> Self {
            Self {
                chunks: Mutex::new(Vec::new()),
                fail_chunk,
            }
        }
    }

    #[async_trait::async_trait]
    impl PushSender for RecordingSender {
        async fn send_chunk(&self, messages: &[PushMessage]) -> AppResult<()> {
            let mut chunks = self.chunks.lock().unwrap();
            let index = chunks.len();
            chunks.push(messages.len());
            if self.fail_chunk == Some(index) {
                return Err(AppError::ExternalService("gateway timeout".to_string()));
            }
            Ok(())
        }
    }

    fn messages(n: usize) -> Vec<PushMessage> {
        (0..n)
            .map(|i| PushMessage {
                to: format!("token{i}"),
                title: "CityFix".to_string(),
                body: "Report updated".to_string(),
                data: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_dispatch_chunks_at_provider_limit() {
        let sender = Arc::new(RecordingSender::new(None));
        let dispatcher = PushDispatcher::new(sender.clone());

        let outcome = dispatcher.dispatch(&messages(250)).await;

        assert_eq!(outcome.sent, 250);
        assert_eq!(outcome.failed, 0);
        assert_eq!(*sender.chunks.lock().unwrap(), vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn test_failed_chunk_does_not_stop_later_chunks() {
        let sender = Arc::new(RecordingSender::new(Some(0)));
        let dispatcher = PushDispatcher::new(sender.clone());

        let outcome = dispatcher.dispatch(&messages(150)).await;

        assert_eq!(outcome.sent, 50);
        assert_eq!(outcome.failed, 100);
        assert_eq!(sender.chunks.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_dispatch_is_silent() {
        let sender = Arc::new(RecordingSender::new(None));
        let dispatcher = PushDispatcher::new(sender);

        let outcome = dispatcher.dispatch(&[]).await;

        assert_eq!(outcome.sent, 0);
        assert_eq!(outcome.failed, 0);
    }
}

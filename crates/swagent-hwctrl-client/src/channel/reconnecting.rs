use super::{Connector, RequestChannel};
use crate::error::HwCtrlResult;
use crate::wire::RpcRequest;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Opens the transport on first use and again after it breaks.
///
/// There is no background reconnect timer: a broken transport is only
/// replaced when the next request arrives.
pub struct ReconnectingChannel {
    connector: Arc<dyn Connector>,
    channel: Option<Box<dyn RequestChannel>>,
}

impl ReconnectingChannel {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            channel: None,
        }
    }

    /// Returns true if a usable transport is currently held.
    pub fn is_connected(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| c.is_good())
    }
}

#[async_trait]
impl RequestChannel for ReconnectingChannel {
    async fn send_request(&mut self, request: &RpcRequest) -> HwCtrlResult<Value> {
        let channel = match self.channel.take() {
            Some(channel) if channel.is_good() => self.channel.insert(channel),
            stale => {
                if stale.is_some() {
                    debug!(peer = %self.connector.peer(), "reconnecting to hw agent");
                }
                let fresh = self.connector.connect().await?;
                self.channel.insert(fresh)
            }
        };

        let result = channel.send_request(request).await;
        if let Err(ref e) = result {
            if e.breaks_connection() {
                self.channel = None;
            }
        }
        result
    }

    /// A reconnecting channel is always usable; a broken transport is
    /// replaced on the next request.
    fn is_good(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::{FakeConnector, Step};
    use crate::error::HwCtrlError;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_connects_lazily() {
        let connector = Arc::new(FakeConnector::new(vec![Step::Reply(json!(1))]));
        let mut channel = ReconnectingChannel::new(connector.clone());
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
        assert!(!channel.is_connected());

        let value = channel.send_request(&RpcRequest::empty("m")).await.unwrap();
        assert_eq!(value, json!(1));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert!(channel.is_connected());
    }

    #[tokio::test]
    async fn test_reuses_healthy_connection() {
        let connector = Arc::new(FakeConnector::new(vec![
            Step::Reply(json!(1)),
            Step::Remote("busy"),
            Step::Reply(json!(2)),
        ]));
        let mut channel = ReconnectingChannel::new(connector.clone());

        channel.send_request(&RpcRequest::empty("m")).await.unwrap();
        channel.send_request(&RpcRequest::empty("m")).await.unwrap_err();
        channel.send_request(&RpcRequest::empty("m")).await.unwrap();
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reconnects_after_disconnect() {
        let connector = Arc::new(FakeConnector::new(vec![
            Step::Disconnect,
            Step::Reply(json!("back")),
        ]));
        let mut channel = ReconnectingChannel::new(connector.clone());

        let err = channel
            .send_request(&RpcRequest::empty("m"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(!channel.is_connected());
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);

        let value = channel.send_request(&RpcRequest::empty("m")).await.unwrap();
        assert_eq!(value, json!("back"));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connect_failure_surfaces() {
        let connector = Arc::new(FakeConnector::new(vec![Step::Reply(json!(1))]));
        connector.refuse.store(true, Ordering::SeqCst);
        let mut channel = ReconnectingChannel::new(connector.clone());

        let err = channel
            .send_request(&RpcRequest::empty("m"))
            .await
            .unwrap_err();
        assert!(matches!(err, HwCtrlError::Connect { .. }));
        assert_eq!(connector.calls.load(Ordering::SeqCst), 0);

        connector.refuse.store(false, Ordering::SeqCst);
        let value = channel.send_request(&RpcRequest::empty("m")).await.unwrap();
        assert_eq!(value, json!(1));
    }
}

use super::RequestChannel;
use crate::error::{HwCtrlError, HwCtrlResult};
use crate::wire::RpcRequest;
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 2;

/// Retries requests that fail with a transient transport error.
///
/// Remote (application) errors are returned immediately and unwrapped,
/// even after earlier retries.
pub struct RetryingChannel<C> {
    inner: C,
    max_retries: u32,
}

impl<C: RequestChannel> RetryingChannel<C> {
    pub fn new(inner: C, max_retries: u32) -> Self {
        Self { inner, max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

#[async_trait]
impl<C: RequestChannel> RequestChannel for RetryingChannel<C> {
    async fn send_request(&mut self, request: &RpcRequest) -> HwCtrlResult<Value> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.inner.send_request(request).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt <= self.max_retries => {
                    warn!(
                        method = %request.method,
                        attempt,
                        error = %e,
                        "request failed, retrying"
                    );
                }
                Err(e) if e.is_retryable() && attempt > 1 => {
                    return Err(HwCtrlError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    })
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn is_good(&self) -> bool {
        self.inner.is_good()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::{FakeConnector, Step};
    use crate::channel::ReconnectingChannel;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn stack(steps: Vec<Step>) -> (Arc<FakeConnector>, RetryingChannel<ReconnectingChannel>) {
        let connector = Arc::new(FakeConnector::new(steps));
        let channel = RetryingChannel::new(
            ReconnectingChannel::new(connector.clone()),
            DEFAULT_RETRIES,
        );
        (connector, channel)
    }

    #[tokio::test]
    async fn test_three_attempts_then_error() {
        let (connector, mut channel) =
            stack(vec![Step::Disconnect, Step::Disconnect, Step::Disconnect]);

        let err = channel
            .send_request(&RpcRequest::empty("m"))
            .await
            .unwrap_err();
        match err {
            HwCtrlError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, HwCtrlError::Disconnected { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(connector.calls.load(Ordering::SeqCst), 3);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_recovers_within_retries() {
        let (connector, mut channel) =
            stack(vec![Step::Disconnect, Step::Disconnect, Step::Reply(json!(5))]);

        let value = channel.send_request(&RpcRequest::empty("m")).await.unwrap();
        assert_eq!(value, json!(5));
        assert_eq!(connector.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_remote_error_not_retried() {
        let (connector, mut channel) = stack(vec![Step::Remote("bad request"), Step::Reply(json!(1))]);

        let err = channel
            .send_request(&RpcRequest::empty("m"))
            .await
            .unwrap_err();
        assert!(matches!(err, HwCtrlError::Remote { .. }));
        assert_eq!(connector.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_error_after_retry_not_wrapped() {
        let (connector, mut channel) =
            stack(vec![Step::Disconnect, Step::Remote("bad request"), Step::Reply(json!(1))]);

        let err = channel
            .send_request(&RpcRequest::empty("m"))
            .await
            .unwrap_err();
        assert!(matches!(err, HwCtrlError::Remote { .. }));
        assert_eq!(connector.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refused_connect_retried() {
        let (connector, mut channel) = stack(vec![]);
        connector.refuse.store(true, Ordering::SeqCst);

        let err = channel
            .send_request(&RpcRequest::empty("m"))
            .await
            .unwrap_err();
        assert!(matches!(err, HwCtrlError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_passes_error_through() {
        let connector = Arc::new(FakeConnector::new(vec![Step::Disconnect]));
        let mut channel = RetryingChannel::new(ReconnectingChannel::new(connector.clone()), 0);

        let err = channel
            .send_request(&RpcRequest::empty("m"))
            .await
            .unwrap_err();
        assert!(matches!(err, HwCtrlError::Disconnected { .. }));
    }
}

//! Builds the layered channel for one hw agent.

use crate::channel::{
    ChannelMaker, Connector, PooledChannel, ReconnectingChannel, RequestChannel, RetryingChannel,
    TcpConnector, DEFAULT_RETRIES,
};
use crate::evb::EventBaseThread;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

/// Connection policy shared by every client of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Address the hw agents listen on.
    pub host: IpAddr,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Retries after the first attempt of a failed request.
    pub retries: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: IpAddr::V6(Ipv6Addr::LOCALHOST),
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
            retries: DEFAULT_RETRIES,
        }
    }
}

pub struct ChannelFactory {
    evb: Arc<EventBaseThread>,
    options: ClientOptions,
}

impl ChannelFactory {
    pub fn new(evb: Arc<EventBaseThread>, options: ClientOptions) -> Self {
        Self { evb, options }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns a pooled, retrying, reconnecting channel to the agent on
    /// `port`. Nothing is connected until the first request.
    pub fn create_channel(&self, port: u16) -> PooledChannel {
        let connector = TcpConnector::new(
            SocketAddr::new(self.options.host, port),
            self.options.connect_timeout,
            self.options.request_timeout,
        );
        self.create_channel_with(Arc::new(connector))
    }

    /// Same stack over an arbitrary connector.
    pub fn create_channel_with(&self, connector: Arc<dyn Connector>) -> PooledChannel {
        let retries = self.options.retries;
        let make_channel: ChannelMaker = Arc::new(move || {
            Box::new(RetryingChannel::new(
                ReconnectingChannel::new(Arc::clone(&connector)),
                retries,
            )) as Box<dyn RequestChannel>
        });
        PooledChannel::new(Arc::clone(&self.evb), make_channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::{FakeConnector, Step};
    use crate::error::HwCtrlError;
    use crate::wire::RpcRequest;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_default_options() {
        let options = ClientOptions::default();
        assert_eq!(options.host, IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(options.retries, 2);
    }

    #[test]
    fn test_stack_retries_and_reconnects() {
        let evb = Arc::new(EventBaseThread::new("FactoryTest").unwrap());
        let factory = ChannelFactory::new(evb, ClientOptions::default());
        let connector = Arc::new(FakeConnector::new(vec![
            Step::Disconnect,
            Step::Disconnect,
            Step::Reply(json!("ok")),
        ]));

        let channel = factory.create_channel_with(connector.clone());
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
        let value = channel.sync_request(RpcRequest::empty("m")).unwrap();
        assert_eq!(value, json!("ok"));
        assert_eq!(connector.calls.load(Ordering::SeqCst), 3);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_unreachable_agent_fails_after_retries() {
        let evb = Arc::new(EventBaseThread::new("FactoryTest").unwrap());
        let factory = ChannelFactory::new(evb, ClientOptions::default());
        let connector = Arc::new(FakeConnector::new(vec![]));
        connector.refuse.store(true, Ordering::SeqCst);

        let channel = factory.create_channel_with(connector.clone());
        let err = channel.sync_request(RpcRequest::empty("m")).unwrap_err();
        assert!(matches!(err, HwCtrlError::RetriesExhausted { attempts: 3, .. }));
    }

    #[test]
    fn test_create_channel_does_not_connect() {
        let evb = Arc::new(EventBaseThread::new("FactoryTest").unwrap());
        let factory = ChannelFactory::new(evb, ClientOptions::default());
        let channel = factory.create_channel(1);
        assert!(!channel.is_initialized());
    }
}

use super::RequestChannel;
use crate::error::{HwCtrlError, HwCtrlResult};
use crate::evb::EventBaseThread;
use crate::wire::RpcRequest;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

/// Builds the inner channel stack on the background thread.
pub type ChannelMaker = Arc<dyn Fn() -> Box<dyn RequestChannel> + Send + Sync>;

/// Synchronous front of a channel stack living on a shared
/// [`EventBaseThread`].
///
/// Any thread may call [`PooledChannel::sync_request`]; the request is
/// executed on the background thread and the caller blocks until the
/// reply arrives. The inner stack is created on first use. Must not be
/// called from the background thread itself, nor from inside another
/// async runtime that the remote end depends on.
#[derive(Clone)]
pub struct PooledChannel {
    evb: Arc<EventBaseThread>,
    inner: Arc<Mutex<Option<Box<dyn RequestChannel>>>>,
    make_channel: ChannelMaker,
}

impl PooledChannel {
    pub fn new(evb: Arc<EventBaseThread>, make_channel: ChannelMaker) -> Self {
        Self {
            evb,
            inner: Arc::new(Mutex::new(None)),
            make_channel,
        }
    }

    pub fn sync_request(&self, request: RpcRequest) -> HwCtrlResult<Value> {
        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let make_channel = Arc::clone(&self.make_channel);

        self.evb.spawn(async move {
            let mut guard = inner.lock().await;
            let channel = guard.get_or_insert_with(|| (*make_channel)());
            let result = channel.send_request(&request).await;
            let _ = tx.send(result);
        });

        futures::executor::block_on(rx).map_err(|_| HwCtrlError::ExecutorShutdown {
            name: self.evb.name().to_string(),
        })?
    }

    /// Returns true once the inner stack has been built.
    pub fn is_initialized(&self) -> bool {
        self.inner
            .try_lock()
            .map(|guard| guard.is_some())
            .unwrap_or(true)
    }
}

//! Layered request channels.
//!
//! A client's channel is built from independent decorators over the
//! [`RequestChannel`] trait, outer to inner:
//!
//! ```text
//! caller thread ─> PooledChannel ─> RetryingChannel ─> ReconnectingChannel ─> SocketChannel
//!                  (hops onto the    (up to N retries)  (lazy connect,         (TCP, JSON lines)
//!                   shared executor)                     reconnect on failure)
//! ```
//!
//! Every layer only talks to the trait below it, so each one can be
//! exercised against a fake transport.

mod pooled;
mod reconnecting;
mod retrying;
mod socket;

pub use pooled::{ChannelMaker, PooledChannel};
pub use reconnecting::ReconnectingChannel;
pub use retrying::{RetryingChannel, DEFAULT_RETRIES};
pub use socket::{SocketChannel, TcpConnector};

use crate::error::HwCtrlResult;
use crate::wire::RpcRequest;
use async_trait::async_trait;
use serde_json::Value;

/// An asynchronous request/response channel.
#[async_trait]
pub trait RequestChannel: Send {
    /// Sends one request and waits for its result.
    async fn send_request(&mut self, request: &RpcRequest) -> HwCtrlResult<Value>;

    /// Returns false once the channel has seen a failure that makes it
    /// unusable (closed socket, desynchronized stream).
    fn is_good(&self) -> bool {
        true
    }
}

/// Opens new transport channels.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> HwCtrlResult<Box<dyn RequestChannel>>;

    /// Human readable description of the remote, for logs.
    fn peer(&self) -> String;
}

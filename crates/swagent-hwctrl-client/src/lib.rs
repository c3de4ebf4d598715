//! Per-switch RPC clients for hw agents.
//!
//! A switch agent managing several ASICs talks to one hw agent per ASIC.
//! [`HwSwitchClientTable`] owns one [`HwCtrlClient`] per managed switch;
//! each client sits on a layered channel built by [`ChannelFactory`]:
//!
//! - [`channel::PooledChannel`]: synchronous front, I/O on a shared
//!   [`EventBaseThread`]
//! - [`channel::RetryingChannel`]: retries transient transport failures
//! - [`channel::ReconnectingChannel`]: lazy connect and reconnect
//! - [`channel::SocketChannel`]: TCP with newline-delimited JSON frames
//!
//! [`HwCtrlServer`] is the matching hw agent side.

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod evb;
pub mod factory;
pub mod server;
pub mod table;
pub mod wire;

pub use client::HwCtrlClient;
pub use config::{ClientTableConfig, SwitchEntry};
pub use error::{HwCtrlError, HwCtrlResult};
pub use evb::EventBaseThread;
pub use factory::{ChannelFactory, ClientOptions};
pub use server::{HwCtrlServer, HwCtrlService};
pub use table::{HwSwitchClientTable, EVB_THREAD_NAME};

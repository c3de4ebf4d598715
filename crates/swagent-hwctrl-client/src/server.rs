//! Minimal hw agent side of the protocol.
//!
//! Serves [`HwCtrlService`] over the newline-delimited JSON framing used
//! by [`SocketChannel`](crate::channel::SocketChannel). Connections are
//! handled concurrently; requests on one connection are answered in
//! order.

use crate::error::{HwCtrlError, HwCtrlResult};
use crate::wire::{encode_line, RequestFrame, ResponseFrame, GET_HW_FABRIC_REACHABILITY};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use swagent_types::Reachability;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Operations a hw agent exposes to the control plane.
#[async_trait]
pub trait HwCtrlService: Send + Sync + 'static {
    /// Neighbors seen on the fabric ports of this switch. The error
    /// string is sent back to the caller verbatim.
    async fn get_hw_fabric_reachability(&self) -> Result<Reachability, String>;
}

pub struct HwCtrlServer {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl HwCtrlServer {
    /// Binds `addr` and starts serving on the current runtime.
    pub async fn bind(addr: SocketAddr, service: Arc<dyn HwCtrlService>) -> HwCtrlResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HwCtrlError::local(format!("Failed to bind {}", addr), e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| HwCtrlError::local("Failed to read listener address", e))?;
        let (shutdown, shutdown_rx) = watch::channel(false);

        info!(addr = %local_addr, "hw ctrl server listening");
        let task = tokio::spawn(accept_loop(listener, service, shutdown_rx));
        Ok(Self {
            local_addr,
            shutdown,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting, closes open connections and waits for the
    /// server task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
        debug!(addr = %self.local_addr, "hw ctrl server stopped");
    }
}

async fn accept_loop(
    listener: TcpListener,
    service: Arc<dyn HwCtrlService>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "accepted connection");
                    connections.spawn(serve_connection(stream, peer, Arc::clone(&service)));
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
    connections.shutdown().await;
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, service: Arc<dyn HwCtrlService>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                debug!(peer = %peer, error = %e, "read failed");
                break;
            }
        };

        let frame: RequestFrame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(peer = %peer, error = %e, "dropping connection after malformed request");
                break;
            }
        };

        let response = dispatch(frame, service.as_ref()).await;
        let out = match encode_line(&response) {
            Ok(out) => out,
            Err(e) => {
                warn!(peer = %peer, error = %e, "failed to encode response");
                break;
            }
        };
        if let Err(e) = write_half.write_all(&out).await {
            debug!(peer = %peer, error = %e, "write failed");
            break;
        }
    }
}

async fn dispatch(frame: RequestFrame, service: &dyn HwCtrlService) -> ResponseFrame {
    let seq = frame.seq;
    match frame.request.method.as_str() {
        GET_HW_FABRIC_REACHABILITY => match service.get_hw_fabric_reachability().await {
            Ok(reachability) => match serde_json::to_value(reachability) {
                Ok(value) => ResponseFrame::ok(seq, value),
                Err(e) => ResponseFrame::err(seq, e.to_string()),
            },
            Err(message) => ResponseFrame::err(seq, message),
        },
        other => ResponseFrame::err(seq, format!("unknown method {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Connector, RequestChannel, TcpConnector};
    use crate::wire::RpcRequest;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use swagent_types::FabricEndpoint;

    struct StaticService(Result<Reachability, String>);

    #[async_trait]
    impl HwCtrlService for StaticService {
        async fn get_hw_fabric_reachability(&self) -> Result<Reachability, String> {
            self.0.clone()
        }
    }

    async fn start(result: Result<Reachability, String>) -> HwCtrlServer {
        HwCtrlServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            Arc::new(StaticService(result)),
        )
        .await
        .unwrap()
    }

    fn connector(server: &HwCtrlServer) -> TcpConnector {
        TcpConnector::new(
            server.local_addr(),
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_serves_reachability() {
        let server = start(Ok(Reachability::from([(100, FabricEndpoint::new(3, 7))]))).await;
        let mut channel = connector(&server).connect().await.unwrap();

        let value = channel
            .send_request(&RpcRequest::empty(GET_HW_FABRIC_REACHABILITY))
            .await
            .unwrap();
        assert_eq!(value["100"]["switchId"], json!(3));
        assert_eq!(value["100"]["port"], json!(7));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_service_error_forwarded() {
        let server = start(Err("asic not ready".to_string())).await;
        let mut channel = connector(&server).connect().await.unwrap();

        let err = channel
            .send_request(&RpcRequest::empty(GET_HW_FABRIC_REACHABILITY))
            .await
            .unwrap_err();
        match err {
            HwCtrlError::Remote { method, message } => {
                assert_eq!(method, GET_HW_FABRIC_REACHABILITY);
                assert_eq!(message, "asic not ready");
            }
            other => panic!("unexpected {:?}", other),
        }
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = start(Ok(Reachability::new())).await;
        let mut channel = connector(&server).connect().await.unwrap();

        let err = channel
            .send_request(&RpcRequest::empty("reboot"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown method reboot"));
        assert!(channel.is_good());
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_connections() {
        let server = start(Ok(Reachability::new())).await;
        let mut channel = connector(&server).connect().await.unwrap();
        channel
            .send_request(&RpcRequest::empty(GET_HW_FABRIC_REACHABILITY))
            .await
            .unwrap();

        server.shutdown().await;
        let err = channel
            .send_request(&RpcRequest::empty(GET_HW_FABRIC_REACHABILITY))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}

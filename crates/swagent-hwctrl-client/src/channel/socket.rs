//! TCP transport: newline-delimited JSON frames.

use super::{Connector, RequestChannel};
use crate::error::{HwCtrlError, HwCtrlResult};
use crate::wire::{encode_line, RequestFrame, ResponseFrame, RpcRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

/// One established connection to a hw agent.
///
/// Requests are strictly sequential: the response to a request is read
/// before the next one is written. After any transport failure the
/// channel reports itself as not good and refuses further requests.
pub struct SocketChannel {
    peer: SocketAddr,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    request_timeout: Duration,
    next_seq: u64,
    good: bool,
}

impl SocketChannel {
    pub fn new(stream: TcpStream, peer: SocketAddr, request_timeout: Duration) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            peer,
            reader: BufReader::new(read_half),
            writer: write_half,
            request_timeout,
            next_seq: 1,
            good: true,
        }
    }

    async fn exchange(&mut self, seq: u64, line: &[u8], method: &str) -> HwCtrlResult<Value> {
        let peer = self.peer;
        let io_err = |source| HwCtrlError::Io { peer, source };

        self.writer.write_all(line).await.map_err(io_err)?;
        self.writer.flush().await.map_err(io_err)?;

        let mut response = String::new();
        let read = self.reader.read_line(&mut response).await.map_err(io_err)?;
        if read == 0 {
            return Err(HwCtrlError::Disconnected { peer });
        }

        let frame: ResponseFrame = serde_json::from_str(response.trim_end())?;
        if frame.seq != seq {
            return Err(HwCtrlError::SequenceMismatch {
                peer,
                expected: seq,
                actual: frame.seq,
            });
        }
        frame.into_result(method)
    }
}

#[async_trait]
impl RequestChannel for SocketChannel {
    async fn send_request(&mut self, request: &RpcRequest) -> HwCtrlResult<Value> {
        if !self.good {
            return Err(HwCtrlError::Disconnected { peer: self.peer });
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let line = encode_line(&RequestFrame {
            seq,
            request: request.clone(),
        })?;

        let timeout = self.request_timeout;
        let result = match tokio::time::timeout(timeout, self.exchange(seq, &line, &request.method))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(HwCtrlError::Timeout {
                peer: self.peer,
                operation: "request",
                timeout,
            }),
        };

        if let Err(ref e) = result {
            if e.breaks_connection() {
                debug!(peer = %self.peer, error = %e, "marking connection bad");
                self.good = false;
            }
        }
        result
    }

    fn is_good(&self) -> bool {
        self.good
    }
}

/// Connects to a hw agent listening on a fixed address.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: SocketAddr,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl TcpConnector {
    pub fn new(addr: SocketAddr, connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            addr,
            connect_timeout,
            request_timeout,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> HwCtrlResult<Box<dyn RequestChannel>> {
        let peer = self.addr;
        let stream = match tokio::time::timeout(self.connect_timeout, TcpStream::connect(peer)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(HwCtrlError::Connect { peer, source }),
            Err(_) => {
                return Err(HwCtrlError::Timeout {
                    peer,
                    operation: "connect",
                    timeout: self.connect_timeout,
                })
            }
        };
        stream
            .set_nodelay(true)
            .map_err(|source| HwCtrlError::Io { peer, source })?;
        debug!(peer = %peer, "connected to hw agent");
        Ok(Box::new(SocketChannel::new(
            stream,
            peer,
            self.request_timeout,
        )))
    }

    fn peer(&self) -> String {
        self.addr.to_string()
    }
}

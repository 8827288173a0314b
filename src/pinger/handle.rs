//! Public pinger handle and response stream

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::config::PingerConfig;
use super::dispatch::{read_loop, Dispatcher, Outbound};
use super::resolver::Resolver;
use crate::error::{ExtinfoError, PingerError, Result};

const REQUEST_QUEUE: usize = 64;
const INBOUND_QUEUE: usize = 64;

/// Single-socket UDP request/response multiplexer
///
/// Requests are matched to responses by peer address, so there is at most one
/// outstanding request per game server. Dropping the pinger stops its tasks and
/// closes every pending response stream.
pub struct Pinger {
    requests: mpsc::Sender<Outbound>,
    resolver: Resolver,
    config: PingerConfig,
    local_addr: SocketAddr,
    reader_handle: JoinHandle<()>,
    dispatch_handle: JoinHandle<()>,
}

impl Pinger {
    /// Bind the shared socket and start the reader and dispatcher tasks
    pub async fn bind(config: PingerConfig) -> Result<Self> {
        config.validate()?;
        let socket = Arc::new(UdpSocket::bind(config.bind_addr).await?);
        let local_addr = socket.local_addr()?;

        let (requests_tx, requests_rx) = mpsc::channel(REQUEST_QUEUE);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);

        let reader_handle = tokio::spawn(read_loop(
            Arc::clone(&socket),
            inbound_tx,
            config.max_packet_size,
        ));
        let dispatcher = Dispatcher::new(socket, config.sweep_interval, config.forward_timeout);
        let dispatch_handle = tokio::spawn(dispatcher.run(requests_rx, inbound_rx));

        tracing::info!(addr = %local_addr, "Pinger bound");

        Ok(Self {
            requests: requests_tx,
            resolver: Resolver::new(config.resolve_ttl),
            config,
            local_addr,
            reader_handle,
            dispatch_handle,
        })
    }

    /// Bind with default configuration
    pub async fn bind_default() -> Result<Self> {
        Self::bind(PingerConfig::default()).await
    }

    /// Send `payload` to the info port of the game server at `host:port`
    ///
    /// The returned stream yields every packet the server sends back until the
    /// timeout elapses or the stream is cancelled. A stream that ends without
    /// yielding anything means the server did not answer in time.
    pub async fn send(
        &self,
        host: &str,
        port: u16,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<Response> {
        let addr = self.resolver.resolve(host, port).await?;
        self.send_to(addr, payload, timeout).await
    }

    /// Send to an already resolved info address
    pub async fn send_to(
        &self,
        addr: SocketAddr,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<Response> {
        let (tx, rx) = mpsc::channel(self.config.response_buffer);
        let request = Outbound {
            addr,
            payload,
            responses: tx,
            deadline: Instant::now() + timeout,
        };

        self.requests
            .send(request)
            .await
            .map_err(|_| PingerError::Closed)?;

        Ok(Response { rx, addr })
    }

    /// Send and wait for exactly one response packet
    pub async fn expect_single_packet(
        &self,
        host: &str,
        port: u16,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<Bytes> {
        let mut response = self.send(host, port, payload, timeout).await?;
        let packet = response.recv().await;
        response.cancel();

        packet.ok_or_else(|| {
            ExtinfoError::Timeout {
                addr: response.peer_addr().to_string(),
            }
            .into()
        })
    }

    /// Local address of the shared socket
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the dispatcher is still accepting requests
    pub fn is_running(&self) -> bool {
        !self.requests.is_closed()
    }
}

impl Drop for Pinger {
    fn drop(&mut self) {
        self.reader_handle.abort();
        self.dispatch_handle.abort();
    }
}

impl std::fmt::Debug for Pinger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pinger")
            .field("local_addr", &self.local_addr)
            .field("config", &self.config)
            .finish()
    }
}

/// Stream of response packets for one request
///
/// Ends when the request's deadline passes, when a newer request to the same
/// address replaces it, or when the pinger shuts down.
#[derive(Debug)]
pub struct Response {
    rx: mpsc::Receiver<Bytes>,
    addr: SocketAddr,
}

impl Response {
    /// Next response packet, or `None` once the stream has ended
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Stop accepting packets; already buffered packets can still be read
    pub fn cancel(&mut self) {
        self.rx.close();
    }

    /// Info address the request was sent to
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }
}

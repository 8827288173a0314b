//! Socket reader and request dispatcher tasks

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout_at, Instant, MissedTickBehavior};

/// Request handed from [`Pinger::send`](super::Pinger::send) to the dispatcher
pub(super) struct Outbound {
    pub addr: SocketAddr,
    pub payload: Bytes,
    pub responses: mpsc::Sender<Bytes>,
    pub deadline: Instant,
}

/// Datagram read from the socket
pub(super) struct Inbound {
    pub addr: SocketAddr,
    pub payload: Bytes,
}

struct PendingRequest {
    responses: mpsc::Sender<Bytes>,
    deadline: Instant,
}

/// Read datagrams until the socket fails
pub(super) async fn read_loop(
    socket: Arc<UdpSocket>,
    inbound: mpsc::Sender<Inbound>,
    max_packet_size: usize,
) {
    let mut buf = vec![0u8; max_packet_size];

    loop {
        match socket.recv_from(&mut buf).await {
            Ok((n, addr)) => {
                let packet = Inbound {
                    addr,
                    payload: Bytes::copy_from_slice(&buf[..n]),
                };
                if inbound.send(packet).await.is_err() {
                    break;
                }
            }
            // ICMP port unreachable from an earlier send; the socket is fine
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
                tracing::debug!(error = %e, "Ignoring reset on UDP socket");
            }
            Err(e) => {
                tracing::error!(error = %e, "Reading from UDP socket failed");
                break;
            }
        }
    }
}

/// Owns the pending-request table; all mutation happens on this task
pub(super) struct Dispatcher {
    socket: Arc<UdpSocket>,
    pending: HashMap<SocketAddr, PendingRequest>,
    sweep_interval: Duration,
    /// Upper bound of a single forward
    forward_timeout: Duration,
}

impl Dispatcher {
    pub fn new(socket: Arc<UdpSocket>, sweep_interval: Duration, forward_timeout: Duration) -> Self {
        Self {
            socket,
            pending: HashMap::new(),
            sweep_interval,
            forward_timeout,
        }
    }

    pub async fn run(
        mut self,
        mut requests: mpsc::Receiver<Outbound>,
        mut inbound: mpsc::Receiver<Inbound>,
    ) {
        let mut sweep = interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(request) => self.handle_request(request).await,
                    None => break,
                },
                packet = inbound.recv() => match packet {
                    Some(packet) => self.handle_inbound(packet).await,
                    None => {
                        tracing::warn!("UDP reader stopped, closing pinger");
                        break;
                    }
                },
                _ = sweep.tick() => self.sweep(),
            }
        }

        tracing::debug!(pending = self.pending.len(), "Pinger dispatcher stopped");
    }

    async fn handle_request(&mut self, request: Outbound) {
        let Outbound {
            addr,
            payload,
            responses,
            deadline,
        } = request;

        match timeout_at(deadline, self.socket.send_to(&payload, addr)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::debug!(addr = %addr, error = %e, "Sending request failed");
                return;
            }
            Err(_) => {
                tracing::debug!(addr = %addr, "Sending request timed out");
                return;
            }
        }

        let previous = self.pending.insert(
            addr,
            PendingRequest {
                responses,
                deadline,
            },
        );
        if previous.is_some() {
            tracing::debug!(addr = %addr, "Replaced pending request");
        }
    }

    async fn handle_inbound(&mut self, packet: Inbound) {
        let Inbound { addr, payload } = packet;

        let delivered = match self.pending.get(&addr) {
            Some(request) if Instant::now() >= request.deadline => {
                self.pending.remove(&addr);
                return;
            }
            Some(request) => {
                let until = request.deadline.min(Instant::now() + self.forward_timeout);
                timeout_at(until, request.responses.send(payload)).await
            }
            None => {
                tracing::trace!(addr = %addr, "Dropping unsolicited packet");
                return;
            }
        };

        match delivered {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                // receiver cancelled or dropped
                self.pending.remove(&addr);
            }
            Err(_) => {
                tracing::debug!(addr = %addr, "Response receiver too slow, dropping packet");
            }
        }
    }

    fn sweep(&mut self) {
        let now = Instant::now();
        self.pending.retain(|addr, request| {
            let keep = now < request.deadline && !request.responses.is_closed();
            if !keep {
                tracing::trace!(addr = %addr, "Request expired");
            }
            keep
        });
    }
}

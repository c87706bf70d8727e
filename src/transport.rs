//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Transport adapter: one bound loopback UDP socket per configured input
//! port, multiplexed with `futures::future::select_all` rather than a
//! per-interface spawned read task and channel. A fixed, known-at-startup
//! set of sockets needs no background task or channel; the whole engine
//! stays on a single task with one suspension point per tick.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use futures::future::{self, FutureExt};
use tokio::net::UdpSocket;

use crate::debug::Debug;
use crate::error::{BindError, Error};
use crate::packet::{Message, MAX_DATAGRAM};
use crate::table::Port;

const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// One decoded (and already verified) inbound message, tagged with the
/// local port it arrived on.
pub struct Readable {
    pub local_port: Port,
    pub message: Message,
}

/// Owns the daemon's bound sockets: one per configured input port. The
/// first input socket is reused as the shared sending endpoint, since a
/// datagram's source port carries no protocol meaning here.
pub struct Transport {
    sockets: Vec<(Port, UdpSocket)>,
}

impl Transport {
    /// Binds one UDP socket per input port, in order. `input_ports` must be
    /// non-empty; configuration validation (`config.rs`) guarantees this.
    pub async fn bind(input_ports: &[Port]) -> Result<Self, BindError> {
        let mut sockets = Vec::with_capacity(input_ports.len());
        for &port in input_ports {
            let addr = SocketAddr::new(LOOPBACK, port.get());
            let socket =
                UdpSocket::bind(addr)
                    .await
                    .map_err(|source| BindError { port: port.get(), source })?;
            sockets.push((port, socket));
        }
        Ok(Transport { sockets })
    }

    /// Waits up to `timeout` seconds for a datagram on any bound socket,
    /// decoding and verifying it. Malformed or out-of-range datagrams are
    /// logged and dropped rather than surfaced, so a misbehaving peer can
    /// never stall the loop; a clean timeout yields an empty list.
    pub async fn poll(&self, timeout: std::time::Duration) -> Vec<Readable> {
        let recv_futures = self.sockets.iter().map(|(local_port, socket)| {
            let local_port = *local_port;
            async move {
                let mut buf = [0u8; MAX_DATAGRAM];
                let result = socket.recv_from(&mut buf).await;
                (local_port, result, buf)
            }
            .boxed()
        });

        let sleep = tokio::time::sleep(timeout).fuse();
        futures::pin_mut!(sleep);

        futures::select_biased! {
            ((local_port, result, received), _index, _rest) = future::select_all(recv_futures).fuse() => {
                match result {
                    Ok((len, _src)) => {
                        self.decode_one(local_port, &received[..len])
                            .into_iter()
                            .collect()
                    }
                    Err(source) => {
                        Error::RecvFailed(source).log();
                        Vec::new()
                    }
                }
            }
            () = sleep => Vec::new(),
        }
    }

    fn decode_one(&self, local_port: Port, data: &[u8]) -> Option<Readable> {
        let message = match Message::decode(data) {
            Ok(message) => message,
            Err(error) => {
                Error::DecodeFailed(error).log();
                return None;
            }
        };
        if let Err(error) = crate::packet::verify(&message) {
            Error::VerifyFailed(error).log();
            return None;
        }
        Debug::DatagramRx(local_port, message.sender_id).log();
        Some(Readable { local_port, message })
    }

    /// Sends a single datagram to `(loopback, port)` via the shared sending
    /// endpoint (the first bound socket). Failures are logged, never
    /// propagated: one unreachable neighbor must not halt advertisement to
    /// the rest.
    pub async fn send(&self, payload: &[u8], port: Port) {
        let Some((_, socket)) = self.sockets.first() else {
            return;
        };
        let dst = SocketAddr::new(LOOPBACK, port.get());
        if let Err(source) = socket.send_to(payload, dst).await {
            Error::SendFailed(port.get(), source).log();
        }
    }
}

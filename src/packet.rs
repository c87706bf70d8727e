//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The wire codec: an explicit, versioned framing for advertisement
//! messages, modeled on the 20-octet RIPv2 RTE layout but keyed by router-id
//! instead of IP prefix.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! | command (1)   | version (1)   |         sender_id (2)         |
//! +---------------+---------------+-------------------------------+
//! |                                                               |
//! ~                      Route entry (20 x N)                     ~
//! |                                                               |
//! +---------------+---------------+---------------+---------------+
//! ```
//!
//! Each route entry is:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-------------------------------+-------------------------------+
//! |          dest_id (2)          |           port (2)            |
//! +-------------------------------+-------------------------------+
//! |                          weight (4)                           |
//! +-------------------------------+---------------+---------------+
//! |          next_hop (2)         | update_flag(1)|  reserved (1) |
//! +-------------------------------+---------------+---------------+
//! ```
//!
//! `last_refreshed` is deliberately never placed on the wire: only the
//! receiver's own freshness bookkeeping cares about it, and a receiver is
//! required to ignore whatever value a sender might have quoted anyway, so
//! the simplest conforming choice is to not transmit it at all.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::RangeError;
use crate::table::{Metric, Port, RouterId, UpdateFlag};

/// Fixed RIPv2 version this engine speaks and accepts.
pub const VERSION: u8 = 2;
/// The only command this daemon ever sends or accepts; RIP requests
/// (soliciting an unscheduled response) are not implemented.
const COMMAND_RESPONSE: u8 = 2;

const HDR_LEN: usize = 4;
const ENTRY_LEN: usize = 12;
/// Maximum datagram size.
pub const MAX_DATAGRAM: usize = 1024;
/// Maximum number of entries that fit in one datagram alongside the header.
pub const MAX_ENTRIES: usize = (MAX_DATAGRAM - HDR_LEN) / ENTRY_LEN;

/// A single entry in an advertisement message: one destination's route as
/// seen by the sender.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Entry {
    pub port: Port,
    pub weight: Metric,
    pub next_hop: Port,
    pub update_flag: UpdateFlag,
}

/// A decoded-and-verified advertisement message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    pub sender_id: RouterId,
    pub entries: Vec<(RouterId, Entry)>,
}

impl Message {
    pub fn new(sender_id: RouterId, entries: Vec<(RouterId, Entry)>) -> Self {
        Message { sender_id, entries }
    }

    /// Encodes this message into one or more datagrams, splitting the entry
    /// list so that no single datagram exceeds [`MAX_DATAGRAM`] bytes.
    pub fn encode_chunks(&self) -> Vec<BytesMut> {
        if self.entries.is_empty() {
            return vec![encode_chunk(self.sender_id, &[])];
        }
        self.entries
            .chunks(MAX_ENTRIES)
            .map(|chunk| encode_chunk(self.sender_id, chunk))
            .collect()
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < HDR_LEN
            || (data.len() - HDR_LEN) % ENTRY_LEN != 0
            || data.len() > MAX_DATAGRAM
        {
            return Err(DecodeError::InvalidLength(data.len()));
        }

        let mut buf = Bytes::copy_from_slice(data);
        let command = buf.get_u8();
        if command != COMMAND_RESPONSE {
            return Err(DecodeError::InvalidCommand(command));
        }
        let version = buf.get_u8();
        if version != VERSION {
            return Err(DecodeError::InvalidVersion(version));
        }
        let sender_id_raw = buf.get_u16();

        let mut entries = Vec::with_capacity(buf.remaining() / ENTRY_LEN);
        while buf.remaining() >= ENTRY_LEN {
            let dest_id_raw = buf.get_u16();
            let port_raw = buf.get_u16();
            let weight_raw = buf.get_u32();
            let next_hop_raw = buf.get_u16();
            let update_flag_raw = buf.get_u8();
            let _reserved = buf.get_u8();

            let dest_id = RouterId::new(dest_id_raw)
                .map_err(|_| DecodeError::InvalidRouterId(dest_id_raw))?;
            let port = Port::new(port_raw)
                .map_err(|_| DecodeError::InvalidPort(port_raw))?;
            let weight = if weight_raw > u8::MAX as u32 {
                Err(DecodeError::InvalidWeight(weight_raw))
            } else {
                Metric::new(weight_raw as u8)
                    .map_err(|_| DecodeError::InvalidWeight(weight_raw))
            }?;
            let next_hop = Port::new(next_hop_raw)
                .map_err(|_| DecodeError::InvalidPort(next_hop_raw))?;
            let update_flag = UpdateFlag::from_bit(update_flag_raw)
                .ok_or(DecodeError::InvalidUpdateFlag(update_flag_raw))?;

            entries.push((
                dest_id,
                Entry {
                    port,
                    weight,
                    next_hop,
                    update_flag,
                },
            ));
        }

        let sender_id = RouterId::new(sender_id_raw)
            .map_err(|_| DecodeError::InvalidRouterId(sender_id_raw))?;

        Ok(Message { sender_id, entries })
    }
}

fn encode_chunk(sender_id: RouterId, entries: &[(RouterId, Entry)]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HDR_LEN + entries.len() * ENTRY_LEN);
    buf.put_u8(COMMAND_RESPONSE);
    buf.put_u8(VERSION);
    buf.put_u16(sender_id.get());
    for (dest_id, entry) in entries {
        buf.put_u16(dest_id.get());
        buf.put_u16(entry.port.get());
        buf.put_u32(entry.weight.get() as u32);
        buf.put_u16(entry.next_hop.get());
        buf.put_u8(entry.update_flag.bit());
        buf.put_u8(0);
    }
    buf
}

/// Structural or range decode failure. Every variant results in the
/// datagram being silently discarded; the variants exist purely so the
/// reason is visible in debug logs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DecodeError {
    InvalidLength(usize),
    InvalidCommand(u8),
    InvalidVersion(u8),
    InvalidRouterId(u16),
    InvalidPort(u16),
    InvalidWeight(u32),
    InvalidUpdateFlag(u8),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::InvalidLength(len) => {
                write!(f, "invalid datagram length: {len}")
            }
            DecodeError::InvalidCommand(cmd) => {
                write!(f, "invalid command: {cmd}")
            }
            DecodeError::InvalidVersion(ver) => {
                write!(f, "invalid version: {ver}")
            }
            DecodeError::InvalidRouterId(id) => {
                write!(f, "invalid router-id: {id}")
            }
            DecodeError::InvalidPort(port) => {
                write!(f, "invalid port: {port}")
            }
            DecodeError::InvalidWeight(w) => {
                write!(f, "invalid weight: {w}")
            }
            DecodeError::InvalidUpdateFlag(flag) => {
                write!(f, "invalid update flag: {flag}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Re-validates a decoded message's range rules. Decoding already enforces
/// per-field ranges via the `RouterId`/`Port`/`Metric` newtypes, so a
/// `Message` that decoded successfully has already been verified; `verify`
/// exists as a distinct step from `decode` to give callers an explicit
/// point to apply any additional semantic checks.
pub fn verify(_msg: &Message) -> Result<(), RangeError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(port: u16, weight: u8, next_hop: u16, flag: UpdateFlag) -> Entry {
        Entry {
            port: Port::new(port).unwrap(),
            weight: Metric::new(weight).unwrap(),
            next_hop: Port::new(next_hop).unwrap(),
            update_flag: flag,
        }
    }

    #[test]
    fn round_trip_empty() {
        let msg = Message::new(RouterId::new(1).unwrap(), vec![]);
        let chunks = msg.encode_chunks();
        assert_eq!(chunks.len(), 1);
        let decoded = Message::decode(&chunks[0]).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn round_trip_with_entries() {
        let msg = Message::new(
            RouterId::new(1).unwrap(),
            vec![
                (
                    RouterId::new(2).unwrap(),
                    entry(2000, 1, 2000, UpdateFlag::Active),
                ),
                (
                    RouterId::new(3).unwrap(),
                    entry(2000, 16, 2000, UpdateFlag::Poisoned),
                ),
            ],
        );
        let chunks = msg.encode_chunks();
        assert_eq!(chunks.len(), 1);
        let decoded = Message::decode(&chunks[0]).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn chunking_splits_large_tables() {
        let entries = (0..100)
            .map(|i| {
                let id = RouterId::new(1000 + i).unwrap();
                (id, entry(2000, 1, 2000, UpdateFlag::Active))
            })
            .collect();
        let msg = Message::new(RouterId::new(1).unwrap(), entries);
        let chunks = msg.encode_chunks();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= MAX_DATAGRAM);
        }
        let mut decoded_entries = vec![];
        for chunk in &chunks {
            decoded_entries.extend(Message::decode(chunk).unwrap().entries);
        }
        assert_eq!(decoded_entries, msg.entries);
    }

    #[test]
    fn rejects_wrong_version() {
        let mut buf = BytesMut::new();
        buf.put_u8(COMMAND_RESPONSE);
        buf.put_u8(1); // version 1, not 2
        buf.put_u16(1);
        let err = Message::decode(&buf).unwrap_err();
        assert_eq!(err, DecodeError::InvalidVersion(1));
    }

    #[test]
    fn rejects_bad_length() {
        let err = Message::decode(&[0u8; 5]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidLength(5)));
    }

    #[test]
    fn rejects_out_of_range_router_id() {
        let mut buf = BytesMut::new();
        buf.put_u8(COMMAND_RESPONSE);
        buf.put_u8(VERSION);
        buf.put_u16(0); // sender_id 0 is out of range
        let err = Message::decode(&buf).unwrap_err();
        assert_eq!(err, DecodeError::InvalidRouterId(0));
    }

    #[test]
    fn rejects_out_of_range_weight() {
        let mut buf = BytesMut::new();
        buf.put_u8(COMMAND_RESPONSE);
        buf.put_u8(VERSION);
        buf.put_u16(1);
        buf.put_u16(2); // dest_id
        buf.put_u16(2000); // port
        buf.put_u32(17); // weight out of range
        buf.put_u16(2000); // next_hop
        buf.put_u8(0);
        buf.put_u8(0);
        let err = Message::decode(&buf).unwrap_err();
        assert_eq!(err, DecodeError::InvalidWeight(17));
    }
}

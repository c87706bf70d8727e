//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::{error, warn};

use crate::packet::DecodeError;

/// A value fell outside its specified range. Used both by the wire codec's
/// `verify()` step and by configuration validation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RangeError {
    pub field: &'static str,
    pub min: u32,
    pub max: u32,
    pub value: u32,
}

impl RangeError {
    pub fn new(field: &'static str, min: u32, max: u32, value: u32) -> Self {
        RangeError {
            field,
            min,
            max,
            value,
        }
    }
}

impl std::fmt::Display for RangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} value {} out of range [{}, {}]",
            self.field, self.value, self.min, self.max
        )
    }
}

impl std::error::Error for RangeError {}

/// Fatal at startup: malformed configuration. The process exits with a
/// diagnostic before the event loop starts.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Range(RangeError),
    DuplicateInputPort(u16),
    DuplicateNeighborId(u16),
    InputPortReused(u16),
    SelfNeighbor(u16),
    NoInputPorts,
    NoOutputs,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(error) => {
                write!(f, "failed to read configuration file: {error}")
            }
            ConfigError::Parse(error) => {
                write!(f, "failed to parse configuration file: {error}")
            }
            ConfigError::Range(error) => write!(f, "{error}"),
            ConfigError::DuplicateInputPort(port) => {
                write!(f, "duplicate input port: {port}")
            }
            ConfigError::DuplicateNeighborId(id) => {
                write!(f, "duplicate neighbor router-id: {id}")
            }
            ConfigError::InputPortReused(port) => {
                write!(
                    f,
                    "port {port} is used as both an input port and a neighbor output port"
                )
            }
            ConfigError::SelfNeighbor(id) => {
                write!(f, "neighbor router-id {id} matches this router's own id")
            }
            ConfigError::NoInputPorts => {
                write!(f, "configuration has no input ports")
            }
            ConfigError::NoOutputs => {
                write!(f, "configuration has no neighbor outputs")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Fatal at startup: unable to bind a listening port.
#[derive(Debug)]
pub struct BindError {
    pub port: u16,
    pub source: std::io::Error,
}

impl std::fmt::Display for BindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to bind UDP socket on port {}: {}",
            self.port, self.source
        )
    }
}

impl std::error::Error for BindError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Transient at runtime: the engine logs these and keeps running. A peer
/// emitting malformed traffic must never disrupt routing.
#[derive(Debug)]
pub enum Error {
    DecodeFailed(DecodeError),
    VerifyFailed(RangeError),
    RecvFailed(std::io::Error),
    SendFailed(u16, std::io::Error),
}

impl Error {
    pub fn log(&self) {
        match self {
            Error::DecodeFailed(error) => {
                warn!(%error, "dropping malformed datagram");
            }
            Error::VerifyFailed(error) => {
                warn!(%error, "dropping datagram that failed verification");
            }
            Error::RecvFailed(error) => {
                warn!(%error, "failed to receive datagram");
            }
            Error::SendFailed(port, error) => {
                warn!(port, %error, "failed to send datagram");
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::DecodeFailed(error) => write!(f, "decode error: {error}"),
            Error::VerifyFailed(error) => {
                write!(f, "verification error: {error}")
            }
            Error::RecvFailed(error) => write!(f, "recv error: {error}"),
            Error::SendFailed(port, error) => {
                write!(f, "send error to port {port}: {error}")
            }
        }
    }
}

impl std::error::Error for Error {}

// ===== global functions =====

/// Logs a fatal startup error and exits the process with the given code,
/// matching the "single diagnostic line, non-zero exit code" contract.
pub fn fatal(message: impl std::fmt::Display, code: i32) -> ! {
    error!("{message}");
    eprintln!("ripd: {message}");
    std::process::exit(code);
}

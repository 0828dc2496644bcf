//! Capture configuration and the wire sample format enumeration.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown wire sample type `{0}` (expected cbyte, c4bits or cfloat)")]
    UnknownWireFormat(String),
    #[error("channel count {0} out of range (1..=4)")]
    ChannelCount(usize),
    #[error("{outputs} output channels requested but only {channels} configured")]
    TooManyOutputs { outputs: usize, channels: usize },
}

/// Byte-level layout of one complex sample per channel on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// Interleaved signed bytes, 2 bytes per sample per channel.
    Cbyte,
    /// Two 4-bit components packed in one byte per sample per channel.
    C4bits,
    /// Interleaved IEEE-754 floats, 8 bytes per sample per channel.
    Cfloat,
}

impl WireFormat {
    pub fn bytes_per_channel(self) -> usize {
        match self {
            WireFormat::Cbyte => 2,
            WireFormat::C4bits => 1,
            WireFormat::Cfloat => 8,
        }
    }
}

impl FromStr for WireFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cbyte" => Ok(WireFormat::Cbyte),
            "c4bits" => Ok(WireFormat::C4bits),
            "cfloat" => Ok(WireFormat::Cfloat),
            other => Err(ConfigError::UnknownWireFormat(other.to_string())),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WireFormat::Cbyte => "cbyte",
            WireFormat::C4bits => "c4bits",
            WireFormat::Cfloat => "cfloat",
        })
    }
}

/// Immutable capture parameters, fixed for the lifetime of a source.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Network device to capture frames from.
    pub device: String,
    /// When set, only datagrams from this source address are accepted.
    pub origin_address: Option<Ipv4Addr>,
    /// UDP destination port carrying the sample stream.
    pub port: u16,
    /// Expected UDP payload size in bytes (informational).
    pub payload_size: usize,
    /// Baseband channels multiplexed in each datagram (1..=4).
    pub channels: usize,
    pub wire_format: WireFormat,
    /// Size in bytes of one output item (informational).
    pub item_size: usize,
    /// Swap which decoded component lands in the real part.
    pub iq_swap: bool,
}

impl SourceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels < 1 || self.channels > 4 {
            return Err(ConfigError::ChannelCount(self.channels));
        }
        Ok(())
    }

    /// Bytes one sample occupies on the wire across all channels.
    pub fn bytes_per_sample(&self) -> usize {
        self.channels * self.wire_format.bytes_per_channel()
    }
}

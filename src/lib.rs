//! Capture UDP datagrams carrying baseband I/Q samples off a network
//! interface and serve them, losslessly and in order, to a pull-based
//! consumer.
//!
//! The capture thread filters raw frames and appends UDP payloads to a
//! fixed-capacity circular buffer; the consumer pulls variable-sized
//! sample batches that are decoded on the fly from one of three wire
//! formats (`cbyte`, `c4bits`, `cfloat`).

pub mod args;
pub mod capture;
pub mod config;
pub mod demux;
pub mod fifo;
pub mod filter;

pub use capture::{CaptureUnavailable, PacketSource};
pub use config::{ConfigError, SourceConfig, WireFormat};
pub use demux::{Demultiplexer, Sample};
pub use fifo::{Overflow, SampleFifo};

/// Default ring capacity in bytes: one thousand full 1472-byte payloads.
pub const FIFO_SIZE: usize = 1_472_000;

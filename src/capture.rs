//! Packet capture lifecycle and the pull-side sample interface.
//!
//! The capture thread does one thing as fast as possible: pull frames off
//! the NIC, filter them, and push UDP payloads into the shared ring. The
//! consumer pulls decoded samples at its own pace through
//! [`PacketSource::pull`]; the two sides only ever meet inside the ring's
//! per-operation lock.

use std::net::{Ipv4Addr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, SourceConfig};
use crate::demux::{Demultiplexer, Sample};
use crate::fifo::SampleFifo;
use crate::filter::udp_payload;

/// Capture read timeout; bounds how long `stop()` waits for the loop to
/// notice the stop flag.
const CAPTURE_POLL_MS: i32 = 250;
/// Enough for a full Ethernet frame.
const SNAPLEN: i32 = 1500;

/// The capture source could not be brought up. The driver stays idle;
/// whether to retry is the caller's decision.
#[derive(Debug, Error)]
pub enum CaptureUnavailable {
    #[error("failed to open capture device `{device}`: {source}")]
    DeviceOpen {
        device: String,
        source: pcap::Error,
    },
    #[error("failed to bind control socket on UDP port {port}: {source}")]
    ControlSocketBind {
        port: u16,
        source: std::io::Error,
    },
    #[error("failed to spawn capture thread: {0}")]
    SpawnThread(std::io::Error),
}

/// A UDP I/Q sample source backed by a live packet capture.
///
/// Lifecycle is idle → [`start`](Self::start) → capturing →
/// [`stop`](Self::stop) → idle. Dropping a running source stops it, so
/// the capture thread is always joined before the source goes away.
pub struct PacketSource {
    config: SourceConfig,
    fifo: Arc<SampleFifo>,
    demux: Demultiplexer,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    // Held while capturing so the kernel doesn't answer our port with
    // ICMP port-unreachable
    control_socket: Option<UdpSocket>,
}

impl PacketSource {
    /// Build a source with the default ring capacity
    /// ([`crate::FIFO_SIZE`]). Fails on an invalid configuration.
    pub fn new(config: SourceConfig) -> Result<Self, ConfigError> {
        Self::with_capacity(config, crate::FIFO_SIZE)
    }

    pub fn with_capacity(config: SourceConfig, capacity: usize) -> Result<Self, ConfigError> {
        config.validate()?;
        let demux = Demultiplexer::from_config(&config);
        Ok(Self {
            config,
            fifo: Arc::new(SampleFifo::new(capacity)),
            demux,
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
            control_socket: None,
        })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Open the capture device and start the capture thread.
    pub fn start(&mut self) -> Result<(), CaptureUnavailable> {
        if self.handle.is_some() {
            warn!("capture already running, ignoring start");
            return Ok(());
        }
        let cap = pcap::Capture::from_device(self.config.device.as_str())
            .and_then(|c| {
                c.promisc(true)
                    .immediate_mode(true)
                    .snaplen(SNAPLEN)
                    .timeout(CAPTURE_POLL_MS)
                    .open()
            })
            .map_err(|source| CaptureUnavailable::DeviceOpen {
                device: self.config.device.clone(),
                source,
            })?;
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, self.config.port)).map_err(
            |source| CaptureUnavailable::ControlSocketBind {
                port: self.config.port,
                source,
            },
        )?;

        self.stop.store(false, Ordering::Release);
        let fifo = Arc::clone(&self.fifo);
        let stop = Arc::clone(&self.stop);
        let port = self.config.port;
        let origin = self.config.origin_address;
        let handle = thread::Builder::new()
            .name("packet-capture".to_string())
            .spawn(move || capture_loop(cap, &fifo, &stop, port, origin))
            .map_err(CaptureUnavailable::SpawnThread)?;

        self.control_socket = Some(socket);
        self.handle = Some(handle);
        info!(
            device = %self.config.device,
            port = self.config.port,
            wire_format = %self.config.wire_format,
            channels = self.config.channels,
            "started packet capture"
        );
        Ok(())
    }

    /// Signal the capture loop to break out and join the thread. Safe to
    /// call while the loop is blocked in a capture read (the read timeout
    /// bounds the wait) and a no-op on a source that was never started.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("capture thread panicked");
            }
            info!(
                overflows = self.fifo.overflow_count(),
                "stopped packet capture"
            );
        }
        self.control_socket = None;
    }

    /// Decode up to `requested` samples per channel into `outputs`.
    ///
    /// Returns the number of samples produced per channel, which may be
    /// zero when not enough bytes are buffered; the caller is expected to
    /// poll again later. Requesting more output channels than configured
    /// is a configuration error, surfaced before any decoding.
    pub fn pull(
        &self,
        requested: usize,
        outputs: &mut [&mut [Sample]],
    ) -> Result<usize, ConfigError> {
        if outputs.len() > self.config.channels {
            return Err(ConfigError::TooManyOutputs {
                outputs: outputs.len(),
                channels: self.config.channels,
            });
        }
        let mut fifo = self.fifo.lock();
        Ok(self.demux.demux(&mut fifo, requested, outputs))
    }

    /// Unread bytes currently buffered.
    pub fn buffered_bytes(&self) -> usize {
        self.fifo.available()
    }

    /// Payloads dropped so far because the ring was full.
    pub fn overflow_count(&self) -> u64 {
        self.fifo.overflow_count()
    }
}

impl Drop for PacketSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Blocking capture loop run on the dedicated thread. Each read is
/// timeout-bounded so the stop flag is observed within one poll interval.
fn capture_loop(
    mut cap: pcap::Capture<pcap::Active>,
    fifo: &SampleFifo,
    stop: &AtomicBool,
    port: u16,
    origin: Option<Ipv4Addr>,
) {
    while !stop.load(Ordering::Acquire) {
        let packet = match cap.next() {
            Ok(packet) => packet,
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(e) => {
                warn!("capture read failed: {e}");
                continue;
            }
        };
        // The frame memory is only valid for this iteration; the ring
        // write copies the payload out
        let Some(payload) = udp_payload(packet.data, port, origin) else {
            continue;
        };
        if fifo.write(payload).is_err() {
            debug!(bytes = payload.len(), "ring full, payload dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WireFormat;

    fn config(channels: usize, wire_format: WireFormat) -> SourceConfig {
        SourceConfig {
            device: "lo".to_string(),
            origin_address: None,
            port: 1234,
            payload_size: 1472,
            channels,
            wire_format,
            item_size: std::mem::size_of::<Sample>(),
            iq_swap: false,
        }
    }

    #[test]
    fn invalid_channel_count_rejected_at_construction() {
        assert!(matches!(
            PacketSource::new(config(5, WireFormat::Cbyte)),
            Err(ConfigError::ChannelCount(5))
        ));
    }

    #[test]
    fn stop_before_start_is_a_no_op() {
        let mut source = PacketSource::new(config(1, WireFormat::Cbyte)).unwrap();
        source.stop();
        source.stop();
    }

    #[test]
    fn pull_with_too_many_outputs_is_fatal() {
        let source = PacketSource::new(config(1, WireFormat::Cbyte)).unwrap();
        let mut a = [Sample::default(); 4];
        let mut b = [Sample::default(); 4];
        let mut outputs = [a.as_mut_slice(), b.as_mut_slice()];
        assert!(matches!(
            source.pull(4, &mut outputs),
            Err(ConfigError::TooManyOutputs {
                outputs: 2,
                channels: 1
            })
        ));
    }

    #[test]
    fn pull_on_empty_buffer_underruns() {
        let source = PacketSource::new(config(1, WireFormat::Cfloat)).unwrap();
        let mut buf = [Sample::default(); 8];
        let mut outputs = [buf.as_mut_slice()];
        assert_eq!(source.pull(8, &mut outputs).unwrap(), 0);
    }

    #[test]
    fn pull_drains_buffered_payloads_in_order() {
        let source = PacketSource::with_capacity(config(1, WireFormat::Cbyte), 64).unwrap();
        source.fifo.write(&[1, 2, 3, 4]).unwrap();
        source.fifo.write(&[5, 6]).unwrap();
        assert_eq!(source.buffered_bytes(), 6);
        let mut buf = [Sample::default(); 8];
        let mut outputs = [buf.as_mut_slice()];
        assert_eq!(source.pull(8, &mut outputs).unwrap(), 3);
        assert_eq!(buf[0], Sample::new(2.0, 1.0));
        assert_eq!(buf[1], Sample::new(4.0, 3.0));
        assert_eq!(buf[2], Sample::new(6.0, 5.0));
        assert_eq!(source.buffered_bytes(), 0);
    }

    #[test]
    fn overflow_is_counted_not_fatal() {
        let source = PacketSource::with_capacity(config(1, WireFormat::Cbyte), 16).unwrap();
        source.fifo.write(&[0; 10]).unwrap();
        assert!(source.fifo.write(&[0; 10]).is_err());
        assert_eq!(source.overflow_count(), 1);
        assert_eq!(source.buffered_bytes(), 10);
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use iq_slurper::args::{convert_filter, Args};
use iq_slurper::{PacketSource, Sample, SourceConfig};
use tracing::info;

/// Samples requested per pull.
const PULL_CHUNK: usize = 8192;
const STATS_INTERVAL: Duration = Duration::from_secs(5);

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(convert_filter(args.verbose.log_level_filter()))
        .init();

    let config = SourceConfig {
        device: args.device_name,
        origin_address: args.origin_address,
        port: args.port,
        payload_size: args.payload_size,
        channels: args.channels as usize,
        wire_format: args.wire_format,
        item_size: std::mem::size_of::<Sample>(),
        iq_swap: args.iq_swap,
    };
    info!(
        payload_size = config.payload_size,
        item_size = config.item_size,
        "expecting {} datagrams of {} samples",
        config.wire_format,
        config.payload_size / config.bytes_per_sample()
    );
    let mut source = PacketSource::with_capacity(config, args.capacity)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || r.store(false, Ordering::SeqCst))
        .context("failed to install ctrl-c handler")?;

    source.start()?;

    let channels = source.config().channels;
    let mut buffers = vec![vec![Sample::default(); PULL_CHUNK]; channels];
    let mut total_samples = 0u64;
    let mut last_report = Instant::now();
    let mut last_total = 0u64;
    let mut last_drops = 0u64;
    while running.load(Ordering::SeqCst) {
        let produced = {
            let mut outputs: Vec<&mut [Sample]> =
                buffers.iter_mut().map(|b| b.as_mut_slice()).collect();
            source.pull(PULL_CHUNK, &mut outputs)?
        };
        if produced == 0 {
            // Underrun, give the capture side a moment
            thread::sleep(Duration::from_millis(1));
            continue;
        }
        total_samples += produced as u64;
        if last_report.elapsed() >= STATS_INTERVAL {
            let rate = (total_samples - last_total) as f64 / last_report.elapsed().as_secs_f64();
            let drops = source.overflow_count();
            info!(
                "{:.3} Msps, {} bytes buffered, {} payloads dropped",
                rate / 1e6,
                source.buffered_bytes(),
                drops - last_drops
            );
            last_report = Instant::now();
            last_total = total_samples;
            last_drops = drops;
        }
    }

    source.stop();
    info!(
        "capture finished: {} samples, {} payloads dropped",
        total_samples,
        source.overflow_count()
    );
    Ok(())
}

//! Argument parsing for running from the command line

use std::net::Ipv4Addr;
use std::str::FromStr;

use clap::Parser;

use crate::config::WireFormat;
use crate::FIFO_SIZE;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Network device to capture packets from
    #[clap(short, long)]
    pub device_name: String,
    /// Port to capture UDP data from
    #[clap(short, long, default_value_t = 1234)]
    #[clap(value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,
    /// Only accept datagrams from this source address
    #[clap(short, long)]
    pub origin_address: Option<Ipv4Addr>,
    /// Expected UDP payload size in bytes
    #[clap(long, default_value_t = 1472)]
    pub payload_size: usize,
    /// Number of baseband channels multiplexed in each datagram
    #[clap(short = 'n', long, default_value_t = 1)]
    #[clap(value_parser = clap::value_parser!(u8).range(1..=4))]
    pub channels: u8,
    /// Wire sample format (cbyte, c4bits or cfloat)
    #[clap(short, long, default_value = "cbyte", value_parser = valid_wire_format)]
    pub wire_format: WireFormat,
    /// Swap which decoded component is treated as the real part
    #[clap(long)]
    pub iq_swap: bool,
    /// Ring buffer capacity in bytes
    #[clap(short, long, default_value_t = FIFO_SIZE)]
    pub capacity: usize,
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
}

/// Match verbosity filter with tracing subscriber log levels
pub fn convert_filter(filter: log::LevelFilter) -> tracing_subscriber::filter::LevelFilter {
    match filter {
        log::LevelFilter::Off => tracing_subscriber::filter::LevelFilter::OFF,
        log::LevelFilter::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        log::LevelFilter::Warn => tracing_subscriber::filter::LevelFilter::WARN,
        log::LevelFilter::Info => tracing_subscriber::filter::LevelFilter::INFO,
        log::LevelFilter::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
        log::LevelFilter::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
    }
}

fn valid_wire_format(s: &str) -> Result<WireFormat, String> {
    WireFormat::from_str(s).map_err(|e| e.to_string())
}

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use iq_slurper::demux::{Demultiplexer, Sample};
use iq_slurper::fifo::FifoState;
use iq_slurper::filter::udp_payload;
use iq_slurper::{SourceConfig, WireFormat};
use rand::prelude::*;

const PAYLOAD: usize = 1472;

fn config(wire_format: WireFormat) -> SourceConfig {
    SourceConfig {
        device: "lo".to_string(),
        origin_address: None,
        port: 1234,
        payload_size: PAYLOAD,
        channels: 1,
        wire_format,
        item_size: std::mem::size_of::<Sample>(),
        iq_swap: false,
    }
}

fn benchmark(c: &mut Criterion) {
    let mut rng = rand::thread_rng();

    let mut dummy_payload = [0u8; PAYLOAD];
    rng.fill(&mut dummy_payload[..]);

    for wire_format in [WireFormat::Cbyte, WireFormat::C4bits, WireFormat::Cfloat] {
        let demux = Demultiplexer::from_config(&config(wire_format));
        let samples = PAYLOAD / demux.bytes_per_sample();
        let mut fifo = FifoState::new(4 * PAYLOAD);
        let mut out = vec![Sample::default(); samples];
        c.bench_function(&format!("demux {wire_format}"), |b| {
            b.iter(|| {
                fifo.write(&dummy_payload).unwrap();
                let mut outputs = [out.as_mut_slice()];
                demux.demux(black_box(&mut fifo), samples, &mut outputs)
            })
        });
    }

    // A UDP frame for port 1234 wrapping the dummy payload
    let mut frame = vec![0u8; 42];
    frame[12..14].copy_from_slice(&[0x08, 0x00]);
    frame[14] = 0x45;
    frame[23] = 17;
    frame[36..38].copy_from_slice(&1234u16.to_be_bytes());
    frame[38..40].copy_from_slice(&((8 + PAYLOAD) as u16).to_be_bytes());
    frame.extend_from_slice(&dummy_payload);
    c.bench_function("frame filter", |b| {
        b.iter(|| udp_payload(black_box(&frame), 1234, None))
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);

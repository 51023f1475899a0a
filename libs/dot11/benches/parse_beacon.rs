use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use dot11::{append_fcs, parse_frame};

const BEACON_PAYLOAD: [u8; 203] = [
    // Header
    128, 0, // FrameControl
    0, 0, // Duration id
    255, 255, 255, 255, 255, 255, // First address
    248, 50, 228, 173, 71, 184, // Second address
    248, 50, 228, 173, 71, 184, // Third address
    96, 119, // SequenceControl
    // Data start
    151, 161, 39, 206, 165, 0, 0, 0, // timestamp
    100, 0, // interval
    17, 4, // capability
    0, 15, 77, 121, 32, 102, 97, 99, 101, 32, 119, 104, 101, 110, 32, 73, 80, // SSID
    1, 8, 130, 132, 139, 150, 36, 48, 72, 108, // Supported rates
    3, 1, 36, // DS parameter set
    5, 4, 0, 3, 1, 0, // TIM
    48, 20, 1, 0, 0, 15, 172, 4, 1, 0, 0, 15, 172, 4, 1, 0, 0, 15, 172, 2, 12, 0, // RSN
    50, 4, 12, 18, 24, 96, // Extended rates
    45, 26, 239, 25, 23, 255, 255, 255, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, // HT capabilities
    191, 12, 122, 9, 128, 15, 250, 255, 0, 0, 250, 255, 0, 0, // VHT capabilities
    192, 5, 1, 42, 0, 0, 0, // VHT operation
    255, 26, 35, 5, 0, 0, 0, 0, 0, 12, 0, 0, 128, 1, 0, 0, 0, 0, 0, 0, 250, 255, 250, 255, 0, 0,
    0, 0, // HE capabilities
    221, 24, 0, 80, 242, 2, 1, 1, 132, 0, 3, 164, 0, 0, 39, 164, 0, 0, 66, 67, 94, 0, 98, 50, 47,
    0, // Vendor specific
];

pub fn parse_beacon(crit: &mut Criterion) {
    let mut with_fcs = BEACON_PAYLOAD.to_vec();
    append_fcs(&mut with_fcs);

    // Log raw byte throughput
    let mut group = crit.benchmark_group("parsers");
    group.throughput(Throughput::Bytes(BEACON_PAYLOAD.len() as u64));

    group.bench_function("Parse beacon", |bencher| {
        bencher.iter(|| {
            let frame = parse_frame(&BEACON_PAYLOAD, false).unwrap();
            assert!(frame.elements.is_some_and(|elements| elements.he().is_some()))
        })
    });
    group.bench_function("Parse beacon with FCS", |bencher| {
        bencher.iter(|| assert!(parse_frame(&with_fcs, true).is_ok()))
    });
    group.finish()
}

criterion_group!(benches, parse_beacon);
criterion_main!(benches);

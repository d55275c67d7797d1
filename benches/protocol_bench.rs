use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tn3270r::protocol::DataStreamProcessor;
use tn3270r::screen::Screen;
use tn3270r::telnet::TelnetFramer;

/// A representative logon screen: fields, labels and fill orders
fn sample_record() -> Vec<u8> {
    let mut data = vec![
        0x05, 0xC3, // Erase/Write + WCC
        0x11, 0x40, 0x40, // SBA 0
        0x1D, 0x60, // SF protected
    ];
    // "ENTER USERID" label in EBCDIC
    data.extend_from_slice(&[0xC5, 0xD5, 0xE3, 0xC5, 0xD9, 0x40, 0xE4, 0xE2, 0xC5, 0xD9, 0xC9, 0xC4]);
    data.extend_from_slice(&[0x11, 0xC1, 0x50]); // SBA 80
    data.extend_from_slice(&[0x1D, 0x40]); // SF unprotected
    data.extend_from_slice(&[0x11, 0xC2, 0x60]); // SBA 160
    data.extend_from_slice(&[0x3C, 0xC6, 0x50, 0x5C]); // RA to 400 with '*'
    data.extend_from_slice(&[0x13]); // IC
    data
}

fn bench_order_interpreter(c: &mut Criterion) {
    let record = sample_record();
    c.bench_function("process_write_record", |b| {
        b.iter(|| {
            let mut screen = Screen::new();
            let mut processor = DataStreamProcessor::new();
            black_box(processor.process_record(black_box(&record), &mut screen, false));
        })
    });
}

fn bench_framer(c: &mut Criterion) {
    // a record with scattered escaped IACs
    let mut payload = vec![0u8; 2048];
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte = if i % 37 == 0 { 0xFF } else { (i % 251) as u8 };
    }
    let framed = TelnetFramer::frame_record(&payload);

    c.bench_function("extract_record", |b| {
        b.iter(|| {
            let mut framer = TelnetFramer::new();
            framer.feed(black_box(&framed));
            black_box(framer.next_event())
        })
    });
}

criterion_group!(benches, bench_order_interpreter, bench_framer);
criterion_main!(benches);

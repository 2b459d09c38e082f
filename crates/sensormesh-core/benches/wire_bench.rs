use criterion::{Criterion, black_box, criterion_group, criterion_main};

use sensormesh_core::{DeviceKind, DeviceValue, Frame, Payload};

fn bench_encode(c: &mut Criterion) {
    let frame = Frame::new(
        12,
        0,
        Payload::Device {
            kind: DeviceKind::Level,
            device: 3,
            request: false,
            value: DeviceValue::Float {
                value: 21.5,
                precision: 1,
            },
        },
    );

    c.bench_function("frame_encode_device_float", |b| {
        b.iter(|| black_box(&frame).encode().unwrap())
    });
}

fn bench_decode(c: &mut Criterion) {
    let frame = Frame::new(
        12,
        0,
        Payload::Device {
            kind: DeviceKind::Level,
            device: 3,
            request: false,
            value: DeviceValue::Float {
                value: 21.5,
                precision: 1,
            },
        },
    );
    let bytes = frame.encode().unwrap();

    c.bench_function("frame_decode_device_float", |b| {
        b.iter(|| Frame::decode(black_box(&bytes)).unwrap())
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);

use criterion::{criterion_group, criterion_main, Criterion};
use pdf_objectgraph::dictionary;
use pdf_objectgraph::filters::{decode_stream, encode_stream};

fn sample_bytes() -> Vec<u8> {
    "BT /F1 24 Tf 72 700 Td (Hello World) Tj ET\n"
        .repeat(200)
        .into_bytes()
}

fn bench_flate_round_trip(c: &mut Criterion) {
    let plain = sample_bytes();
    let dict = dictionary! { "Filter" => "FlateDecode" };
    let encoded = encode_stream(&dict, &plain).unwrap();

    c.bench_function("flate_encode", |b| {
        b.iter(|| {
            let _ = encode_stream(&dict, &plain).unwrap();
        })
    });

    c.bench_function("flate_decode", |b| {
        b.iter(|| {
            let _ = decode_stream(&dict, &encoded).unwrap();
        })
    });
}

fn bench_lzw_round_trip(c: &mut Criterion) {
    let plain = sample_bytes();
    let dict = dictionary! { "Filter" => "LZWDecode" };
    let encoded = encode_stream(&dict, &plain).unwrap();

    c.bench_function("lzw_encode", |b| {
        b.iter(|| {
            let _ = encode_stream(&dict, &plain).unwrap();
        })
    });

    c.bench_function("lzw_decode", |b| {
        b.iter(|| {
            let _ = decode_stream(&dict, &encoded).unwrap();
        })
    });
}

fn bench_ascii85_round_trip(c: &mut Criterion) {
    let plain = sample_bytes();
    let dict = dictionary! { "Filter" => "ASCII85Decode" };
    let encoded = encode_stream(&dict, &plain).unwrap();

    c.bench_function("ascii85_encode", |b| {
        b.iter(|| {
            let _ = encode_stream(&dict, &plain).unwrap();
        })
    });

    c.bench_function("ascii85_decode", |b| {
        b.iter(|| {
            let _ = decode_stream(&dict, &encoded).unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_flate_round_trip,
    bench_lzw_round_trip,
    bench_ascii85_round_trip
);
criterion_main!(benches);

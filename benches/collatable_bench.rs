use criterion::{black_box, criterion_group, criterion_main, Criterion};

use dbcore::{CollatableBuilder, CollatableReader};

fn encode_mixed_array() -> Vec<u8> {
    let mut b = CollatableBuilder::new();
    b.begin_array();
    b.add_string("san francisco");
    b.add_number(37.7749);
    b.add_bool(true);
    b.begin_array();
    b.add_number(1.0);
    b.add_number(2.0);
    b.add_number(3.0);
    b.end_array();
    b.end_array();
    b.finish()
}

fn bench_encode(c: &mut Criterion) {
    c.bench_function("collatable encode mixed array", |b| {
        b.iter(|| black_box(encode_mixed_array()));
    });
}

fn bench_decode(c: &mut Criterion) {
    let encoded = encode_mixed_array();
    c.bench_function("collatable decode mixed array", |b| {
        b.iter(|| {
            let mut r = CollatableReader::new(black_box(&encoded));
            r.begin_array().unwrap();
            let _city = r.read_string().unwrap();
            let _lat = r.read_double().unwrap();
            let _flag = r.read_bool().unwrap();
            r.begin_array().unwrap();
            let _a = r.read_double().unwrap();
            let _b = r.read_double().unwrap();
            let _c = r.read_double().unwrap();
            r.end_array().unwrap();
            r.end_array().unwrap();
        });
    });
}

fn bench_string_roundtrip(c: &mut Criterion) {
    c.bench_function("collatable string round trip", |b| {
        b.iter(|| {
            let mut builder = CollatableBuilder::new();
            builder.add_string(black_box("the quick brown fox jumps over the lazy dog"));
            let encoded = builder.finish();
            let mut r = CollatableReader::new(&encoded);
            black_box(r.read_string().unwrap());
        });
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_string_roundtrip);
criterion_main!(benches);

//! Document codec and hashing benchmarks.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use overture_core::json::{parse_object, to_json_bytes};
use overture_core::version_uid;

fn provider_fixture(versions: usize) -> Vec<u8> {
    let mut entries = Vec::with_capacity(versions);
    for i in 0..versions {
        entries.push(format!(
            r#""1.{i}.0":{{"name":"acme/widgets","version":"1.{i}.0","dist":{{"url":"http://host/acme/widgets/1.{i}.0/acme-widgets-1.{i}.0.zip","type":"zip","reference":"{i:040}","shasum":"{i:040}"}},"time":"2024-01-01T00:00:00+00:00","uid":{i},"require":{{"php":">=8.1","acme/core":"^1.{i}"}},"license":["MIT"]}}"#
        ));
    }
    format!(r#"{{"packages":{{"acme/widgets":{{{}}}}}}}"#, entries.join(",")).into_bytes()
}

fn bench_codec(c: &mut Criterion) {
    let bytes = provider_fixture(200);
    let doc = parse_object(&bytes).expect("fixture parses");

    c.bench_function("provider_parse_200", |b| {
        b.iter(|| parse_object(black_box(&bytes)));
    });

    c.bench_function("provider_serialize_200", |b| {
        b.iter(|| to_json_bytes(black_box(&doc)));
    });

    c.bench_function("version_uid", |b| {
        b.iter(|| {
            version_uid(
                black_box("acme/widgets"),
                black_box("1.2.3"),
                black_box("2024-01-01T00:00:00+00:00"),
            )
        });
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);

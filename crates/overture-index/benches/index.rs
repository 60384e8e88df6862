//! Minify and merge benchmarks.

use chrono::{TimeZone, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use overture_core::json::{JsonMap, parse_object};
use overture_index::minify::{decode, encode};
use overture_index::{IndexMerger, MergeInput, ProviderDocument};

fn versions(count: usize) -> Vec<JsonMap> {
    (0..count)
        .map(|i| {
            let json = format!(
                r#"{{"name":"acme/widgets","version":"1.{i}.0","dist":{{"url":"http://host/acme/widgets/1.{i}.0/acme-widgets-1.{i}.0.zip","type":"zip","reference":"{i:040}","shasum":"{i:040}"}},"time":"2024-01-01T00:00:00+00:00","uid":{i},"require":{{"php":">=8.1","acme/core":"^1.{}"}},"license":["MIT"],"description":"Widgets"}}"#,
                i / 10
            );
            parse_object(json.as_bytes()).expect("fixture parses")
        })
        .collect()
}

fn provider(versions: &[JsonMap], reference: &str) -> ProviderDocument {
    let mut doc = ProviderDocument::default();
    for (i, entry) in versions.iter().enumerate() {
        let mut entry = entry.clone();
        entry["dist"]["reference"] = reference.into();
        doc.insert("acme/widgets", format!("1.{i}.0"), entry);
    }
    doc
}

fn bench_minify(c: &mut Criterion) {
    let mut group = c.benchmark_group("minify");
    let input = versions(300);
    let encoded = encode(&input).expect("encodes");

    group.bench_function("encode_300", |b| {
        b.iter(|| encode(black_box(&input)));
    });
    group.bench_function("decode_300", |b| {
        b.iter(|| decode(black_box(&encoded)));
    });
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    let input = versions(300);
    let members = [provider(&input, "a"), provider(&input, "b"), provider(&input, "c")];
    let merger = IndexMerger::new("http://host/repository/group");
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    group.bench_function("provider_3x300", |b| {
        b.iter(|| {
            let inputs: Vec<MergeInput<ProviderDocument>> =
                members.iter().cloned().map(MergeInput::from).collect();
            merger.merge_provider_documents(black_box(inputs), now)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_minify, bench_merge);
criterion_main!(benches);

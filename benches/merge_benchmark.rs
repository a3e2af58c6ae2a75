//! Performance benchmarks for merging and serializing large SBOMs.
//!
//! Run with: cargo bench --bench merge_benchmark

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sbom_merge::formats::annotations::DEFAULT_ANNOTATOR;
use sbom_merge::model::DocumentMetadata;
use sbom_merge::{adapter_for, Document, Edge, GraphMerger, Node, RelationshipKind, SbomFormat};
use std::hint::black_box;

/// Generate a document with `count` components, `overlap` of which are
/// shared with every other generated document.
fn generate_document(prefix: &str, count: usize, overlap: usize) -> Document {
    let root_id = format!("{prefix}-root");
    let mut document = Document::new(
        DocumentMetadata::new(SbomFormat::CycloneDx, "1.5"),
        Node::new(root_id.as_str(), prefix)
            .with_type("container")
            .with_purl(format!("pkg:oci/{prefix}@sha256%3A{}", "0".repeat(64))),
    );

    for i in 0..count {
        let owner = if i < overlap { "shared" } else { prefix };
        let name = format!("{owner}-component-{i}");
        let version = format!("1.{}.{}", i % 10, i % 100);
        let id = format!("{prefix}-{i}");
        document.add_node(
            Node::new(id.as_str(), name.as_str())
                .with_version(version.as_str())
                .with_purl(format!("pkg:npm/{owner}/{name}@{version}")),
        );
        document.add_edge(Edge::new(root_id.as_str(), RelationshipKind::DependsOn, id.as_str()));
    }
    document
}

fn bench_merge(c: &mut Criterion) {
    let adapter = adapter_for(SbomFormat::CycloneDx, DEFAULT_ANNOTATOR);
    let mut group = c.benchmark_group("merge");

    for size in [100, 1_000, 10_000] {
        let documents = vec![
            generate_document("image", size, size / 2),
            generate_document("source", size, size / 2),
            generate_document("prefetch", size, size / 2),
        ];
        group.bench_with_input(BenchmarkId::new("three_inputs", size), &documents, |b, docs| {
            b.iter(|| {
                GraphMerger::new(adapter.as_ref())
                    .merge(black_box(docs))
                    .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_round_trip(c: &mut Criterion) {
    let adapter = adapter_for(SbomFormat::CycloneDx, DEFAULT_ANNOTATOR);
    let mut group = c.benchmark_group("cyclonedx_round_trip");

    for size in [1_000, 10_000] {
        let text = adapter
            .serialize(&generate_document("image", size, 0), 2)
            .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| {
                let document = adapter.parse_str(black_box(text)).unwrap();
                adapter.serialize(&document, 2).unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_merge, bench_round_trip);
criterion_main!(benches);

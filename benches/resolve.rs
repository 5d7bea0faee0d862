use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lsifg::model::{Document, MetaData, Range, RangeData, ReferenceResult};
use lsifg::validate::validate_store;
use lsifg::{Builder, EdgeLabel, Id, RequestKind, Resolver, Snapshot, VertexData};

/// A document with `depth` ranges whose reference results form one long
/// chain: result i points at its range and at result i + 1.
fn chained_graph(depth: u32) -> (Snapshot, Id) {
    let mut builder = Builder::new();
    builder
        .add_vertex(VertexData::MetaData(MetaData {
            version: "0.4.3".to_string(),
        }))
        .unwrap();
    let doc = builder
        .add_vertex(VertexData::Document(Document {
            uri: "file:///bench.ts".to_string(),
            language_id: "typescript".to_string(),
            data: None,
            contents: None,
        }))
        .unwrap();

    let mut ranges = Vec::new();
    for line in 0..depth {
        let range = builder
            .add_vertex(VertexData::Range(RangeData::new(Range::on_line(line, 0, 8))))
            .unwrap();
        builder
            .add_edge(EdgeLabel::Contains, doc.clone(), range.clone())
            .unwrap();
        ranges.push(range);
    }

    // built back to front so every item edge points at an existing result
    let mut next: Option<Id> = None;
    for range in ranges.iter().rev() {
        let result = builder
            .add_vertex(VertexData::ReferenceResult(ReferenceResult::default()))
            .unwrap();
        builder
            .add_item_edge(result.clone(), range.clone(), Some("references".to_string()))
            .unwrap();
        if let Some(next) = next.take() {
            builder.add_item_edge(result.clone(), next, None).unwrap();
        }
        next = Some(result);
    }
    let head = next.unwrap();
    builder
        .add_edge(EdgeLabel::References, ranges[0].clone(), head)
        .unwrap();

    (builder.finish(), ranges[0].clone())
}

fn bench_references(c: &mut Criterion) {
    let mut group = c.benchmark_group("references_chain");
    for depth in [10, 100, 1000].iter() {
        let (snapshot, start) = chained_graph(*depth);
        let resolver = Resolver::new(snapshot);
        group.bench_with_input(format!("depth_{}", depth), depth, |b, _| {
            b.iter(|| {
                let result = resolver.resolve(black_box(&start), black_box(RequestKind::References));
                black_box(result)
            })
        });
    }
    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let (snapshot, _) = chained_graph(1000);
    c.bench_function("validate_chain_1000", |b| {
        b.iter(|| black_box(validate_store(black_box(&snapshot))))
    });
}

criterion_group!(benches, bench_references, bench_validate);
criterion_main!(benches);

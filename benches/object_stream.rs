use std::collections::BTreeMap;

use criterion::{criterion_group, criterion_main, Criterion};
use pdf_objectgraph::{Object, ObjectStream, ObjectStreamBuilder, ObjectStreamConfig, Stream};

fn sample_objects(count: i64) -> BTreeMap<(u32, u16), Object> {
    let mut objects: BTreeMap<(u32, u16), Object> = BTreeMap::new();
    for i in 1..=count {
        let dict = pdf_objectgraph::dictionary! {
            "Type" => "TestObj",
            "Value" => Object::Integer(i),
        };
        objects.insert((i as u32, 0), Object::Dictionary(dict));
    }
    objects
}

fn bench_object_stream_compress(c: &mut Criterion) {
    let objects = sample_objects(100);

    c.bench_function("object_stream_compress", |b| {
        b.iter(|| {
            let config = ObjectStreamConfig::default();
            let builder = ObjectStreamBuilder::new(config);
            let _ = builder.build_object_streams(&objects);
        })
    });
}

fn bench_object_stream_parse(c: &mut Criterion) {
    let objects = sample_objects(100);
    let config = ObjectStreamConfig::default();
    let builder = ObjectStreamBuilder::new(config);
    let chunks = builder.build_object_streams(&objects);
    let chunk = chunks.into_iter().next().unwrap();

    c.bench_function("object_stream_parse", |b| {
        b.iter(|| {
            let mut stream = Stream::new(chunk.dict.clone(), chunk.content.clone());
            let _ = ObjectStream::new(&mut stream).unwrap();
        })
    });
}

criterion_group!(benches, bench_object_stream_compress, bench_object_stream_parse);
criterion_main!(benches);

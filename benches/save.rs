use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};
use pdf_objectgraph::{Document, SaveOptionsBuilder};

/// A minimal but complete single-page document, hand-built rather than
/// read from a fixture file.
fn minimal_pdf_bytes() -> Vec<u8> {
    let body = "%PDF-1.5
1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj
2 0 obj<</Type/Pages/Kids[3 0 R]/Count 1>>endobj
3 0 obj<</Type/Page/Parent 2 0 R/MediaBox[0 0 612 792]>>endobj
";
    let offsets = [
        body.find("1 0 obj").unwrap(),
        body.find("2 0 obj").unwrap(),
        body.find("3 0 obj").unwrap(),
    ];
    let trailer = format!(
        "xref\n0 4\n0000000000 65535 f \n{:010} 00000 n \n{:010} 00000 n \n{:010} 00000 n \ntrailer<</Size 4/Root 1 0 R>>\nstartxref\n{}\n%%EOF",
        offsets[0],
        offsets[1],
        offsets[2],
        body.len(),
    );
    let mut out = body.into_bytes();
    out.extend_from_slice(trailer.as_bytes());
    out
}

fn bench_save_standard(c: &mut Criterion) {
    let buffer = minimal_pdf_bytes();
    let doc = Document::load_from(Cursor::new(&buffer)).unwrap();

    c.bench_function("save_standard", |b| {
        b.iter(|| {
            let mut output = Vec::new();
            let mut doc_clone = doc.clone();
            doc_clone.save(&mut output).unwrap();
        })
    });
}

fn bench_save_modern(c: &mut Criterion) {
    let buffer = minimal_pdf_bytes();
    let doc = Document::load_from(Cursor::new(&buffer)).unwrap();

    c.bench_function("save_modern", |b| {
        b.iter(|| {
            let mut output = Vec::new();
            let options = SaveOptionsBuilder::new()
                .use_xref_streams(true)
                .use_object_streams(true)
                .build();
            let mut doc_clone = doc.clone();
            doc_clone.save_with_options(&mut output, options).unwrap();
        })
    });
}

criterion_group!(benches, bench_save_standard, bench_save_modern);
criterion_main!(benches);

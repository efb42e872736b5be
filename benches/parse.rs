use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};
use pdf_objectgraph::Document;

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

/// A second update section appended via `/Prev`, exercising the
/// incremental-update xref walk.
fn incremental_pdf_bytes() -> Vec<u8> {
    let base = minimal_pdf_bytes();
    let base_len = base.len();
    let mut out = base;
    let update = format!(
        "4 0 obj<</Type/Catalog/Pages 2 0 R/Extra true>>endobj\nxref\n4 1\n{:010} 00000 n \ntrailer<</Size 5/Root 4 0 R/Prev 0>>\nstartxref\n{}\n%%EOF",
        base_len,
        base_len,
    );
    out.extend_from_slice(update.as_bytes());
    out
}

fn bench_load(c: &mut Criterion) {
    let buffer = minimal_pdf_bytes();
    c.bench_function("load", |b| {
        b.iter(|| {
            Document::load_from(Cursor::new(&buffer)).unwrap();
        })
    });
}

fn bench_load_incremental_pdf(c: &mut Criterion) {
    let buffer = incremental_pdf_bytes();
    c.bench_function("load_incremental_pdf", |b| {
        b.iter(|| {
            Document::load_from(Cursor::new(&buffer)).unwrap();
        })
    });
}

criterion_group!(benches, bench_load, bench_load_incremental_pdf);
criterion_main!(benches);

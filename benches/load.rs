use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};
use pdf_objectgraph::Document;

/// A synthetic multi-page document, hand-built rather than read from a
/// fixture file, large enough to give a "large load" benchmark something
/// to chew on.
fn large_pdf_bytes(page_count: u32) -> Vec<u8> {
    let mut body = String::from("%PDF-1.7\n");
    let mut offsets = Vec::new();
    let mut kids = String::new();

    for i in 0..page_count {
        kids.push_str(&format!("{} 0 R ", 3 + i));
    }

    offsets.push(body.len());
    body.push_str("1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj\n");
    offsets.push(body.len());
    body.push_str(&format!("2 0 obj<</Type/Pages/Kids[{kids}]/Count {page_count}>>endobj\n"));

    for i in 0..page_count {
        offsets.push(body.len());
        body.push_str(&format!(
            "{} 0 obj<</Type/Page/Parent 2 0 R/MediaBox[0 0 612 792]>>endobj\n",
            3 + i
        ));
    }

    let size = offsets.len() as u32 + 1;
    let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
    for offset in &offsets {
        xref.push_str(&format!("{:010} 00000 n \n", offset));
    }
    let xref_start = body.len();
    body.push_str(&xref);
    body.push_str(&format!("trailer<</Size {size}/Root 1 0 R>>\nstartxref\n{xref_start}\n%%EOF"));
    body.into_bytes()
}

fn bench_load_large(c: &mut Criterion) {
    let buffer = large_pdf_bytes(500);
    c.bench_function("load_large", |b| {
        b.iter(|| {
            Document::load_from(Cursor::new(&buffer)).unwrap();
        })
    });
}

criterion_group!(benches, bench_load_large);
criterion_main!(benches);

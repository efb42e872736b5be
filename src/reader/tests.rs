use super::*;
use crate::Document;

/// A minimal but complete single-page document, hand-built rather than
/// read from a fixture file (this crate keeps no external PDF binaries;
/// every test byte string here is self-contained).
fn minimal_pdf_bytes() -> Vec<u8> {
    let body = "%PDF-1.5
1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj
2 0 obj<</Type/Pages/Kids[3 0 R]/Count 1>>endobj
3 0 obj<</Type/Page/Parent 2 0 R/MediaBox[0 0 612 792]>>endobj
";
    let offsets = [0usize, body.find("1 0 obj").unwrap(), body.find("2 0 obj").unwrap(), body.find("3 0 obj").unwrap()];
    let trailer = format!(
        "xref\n0 4\n0000000000 65535 f \n{:010} 00000 n \n{:010} 00000 n \n{:010} 00000 n \ntrailer<</Size 4/Root 1 0 R>>\nstartxref\n{}\n%%EOF",
        offsets[1],
        offsets[2],
        offsets[3],
        body.len(),
    );
    let mut out = body.into_bytes();
    out.extend_from_slice(trailer.as_bytes());
    out
}

#[cfg(not(feature = "async"))]
#[test]
fn load_document() {
    let mut doc = Document::load_mem(&minimal_pdf_bytes()).unwrap();
    assert_eq!(doc.version, "1.5");

    // Create temporary folder to store file.
    let temp_dir = tempfile::tempdir().unwrap();
    let file_path = temp_dir.path().join("test_2_load.pdf");
    doc.save_to(file_path).unwrap();
}

#[cfg(feature = "async")]
#[tokio::test]
async fn load_document() {
    let mut doc = Document::load_mem(&minimal_pdf_bytes()).unwrap();
    assert_eq!(doc.version, "1.5");

    // Create temporary folder to store file.
    let temp_dir = tempfile::tempdir().unwrap();
    let file_path = temp_dir.path().join("test_2_load.pdf");
    doc.save_to(file_path).unwrap();
}

#[test]
#[should_panic(expected = "Xref(Start)")]
fn load_short_document() {
    let _doc = Document::load_mem(b"%PDF-1.5\n%%EOF\n").unwrap();
}

#[test]
fn load_document_with_preceding_bytes() {
    let mut content = Vec::new();
    content.extend(b"garbage");
    content.extend(minimal_pdf_bytes());
    let doc = Document::load_mem(&content).unwrap();
    assert_eq!(doc.version, "1.5");
}

#[test]
fn load_many_shallow_brackets() {
    let content: String = std::iter::repeat("()")
        .take(MAX_BRACKET * 10)
        .flat_map(|x| x.chars())
        .collect();
    const STREAM_CRUFT: usize = 33;
    let doc = format!(
        "%PDF-1.5
1 0 obj<</Type/Pages/Kids[5 0 R]/Count 1/Resources 3 0 R/MediaBox[0 0 595 842]>>endobj
2 0 obj<</Type/Font/Subtype/Type1/BaseFont/Courier>>endobj
3 0 obj<</Font<</F1 2 0 R>>>>endobj
5 0 obj<</Type/Page/Parent 1 0 R/Contents[4 0 R]>>endobj
6 0 obj<</Type/Catalog/Pages 1 0 R>>endobj
4 0 obj<</Length {}>>stream
BT
/F1 48 Tf
100 600 Td
({}) Tj
ET
endstream endobj\n",
        content.len() + STREAM_CRUFT,
        content
    );
    let doc = format!(
        "{}xref\n0 7\n0000000000 65535 f \n0000000009 00000 n \n0000000096 00000 n \n0000000155 00000 n \n0000000291 00000 n \n0000000191 00000 n \n0000000248 00000 n \ntrailer\n<</Root 6 0 R/Size 7>>\nstartxref\n{}\n%%EOF",
        doc,
        doc.len()
    );

    let _doc = Document::load_mem(doc.as_bytes()).unwrap();
}

#[test]
fn load_too_deep_brackets() {
    let content: Vec<u8> = std::iter::repeat(b'(')
        .take(MAX_BRACKET + 1)
        .chain(std::iter::repeat(b')').take(MAX_BRACKET + 1))
        .collect();
    let content = String::from_utf8(content).unwrap();
    const STREAM_CRUFT: usize = 33;
    let doc = format!(
        "%PDF-1.5
1 0 obj<</Type/Pages/Kids[5 0 R]/Count 1/Resources 3 0 R/MediaBox[0 0 595 842]>>endobj
2 0 obj<</Type/Font/Subtype/Type1/BaseFont/Courier>>endobj
3 0 obj<</Font<</F1 2 0 R>>>>endobj
5 0 obj<</Type/Page/Parent 1 0 R/Contents[7 0 R 4 0 R]>>endobj
6 0 obj<</Type/Catalog/Pages 1 0 R>>endobj
7 0 obj<</Length 45>>stream
BT /F1 48 Tf 100 600 Td (Hello World!) Tj ET
endstream
endobj
4 0 obj<</Length {}>>stream
BT
/F1 48 Tf
100 600 Td
({}) Tj
ET
endstream endobj\n",
        content.len() + STREAM_CRUFT,
        content
    );
    let doc = format!(
        "{}xref\n0 7\n0000000000 65535 f \n0000000009 00000 n \n0000000096 00000 n \n0000000155 00000 n \n0000000387 00000 n \n0000000191 00000 n \n0000000254 00000 n \n0000000297 00000 n \ntrailer\n<</Root 6 0 R/Size 7>>\nstartxref\n{}\n%%EOF",
        doc,
        doc.len()
    );

    let doc = Document::load_mem(doc.as_bytes()).unwrap();
    let stream = doc.get_object((7, 0)).and_then(Object::as_stream).unwrap();
    assert!(String::from_utf8_lossy(&stream.content).contains("Hello World!"));
}

/// spec.md §8 scenario 3: a `/Prev` chain that points back at an offset
/// already visited must raise `XrefError::CyclicXref`, never loop or be
/// silently tolerated even in non-strict mode. The trailer's own `/Prev`
/// refers to its own xref section's offset, so the second time around the
/// `while let Some(prev) = ...` loop in `Reader::read` revisits it.
fn cyclic_prev_bytes() -> Vec<u8> {
    let body = "%PDF-1.4\n1 0 obj<</Type/Catalog>>endobj\n";
    let obj_offset = body.find("1 0 obj").unwrap();
    let xref_offset = body.len();
    let xref_and_trailer = format!(
        "xref\n0 2\n0000000000 65535 f \n{:010} 00000 n \ntrailer<</Size 2/Root 1 0 R/Prev {}>>\nstartxref\n{}\n%%EOF",
        obj_offset, xref_offset, xref_offset
    );
    let mut out = body.as_bytes().to_vec();
    out.extend_from_slice(xref_and_trailer.as_bytes());
    out
}

#[test]
fn cyclic_prev_xref_is_rejected() {
    let bytes = cyclic_prev_bytes();
    let err = Document::load_mem(&bytes).unwrap_err();
    assert!(matches!(err, Error::Xref(XrefError::CyclicXref(_))), "expected CyclicXref, got {err:?}");
}

#[cfg(not(feature = "async"))]
#[test]
fn search_substring_finds_last_occurrence() {
    assert_eq!(Reader::search_substring(b"hello world", b"xyz", 0), None);
    assert_eq!(Reader::search_substring(b"hello world", b"world", 0), Some(6));

    let buffer = b"%%EOF\ntest%%EOF\nend";
    assert_eq!(Reader::search_substring(buffer, b"%%EOF", 0), Some(10));
    assert_eq!(Reader::search_substring(buffer, b"%%EOF", 6), Some(10));
    assert_eq!(Reader::search_substring(buffer, b"%%EOF", 15), None);
    assert_eq!(Reader::search_substring(b"%%EOF", b"%%EOF", 0), Some(0));

    let buffer_with_many_percents = b"%%%PDF-1.3%%%comment%%%more%%EOF";
    assert_eq!(
        Reader::search_substring(buffer_with_many_percents, b"%%EOF", 0),
        Some(27)
    );
}

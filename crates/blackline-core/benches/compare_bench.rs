use blackline_core::package::OpcPackage;
use blackline_core::{compare, CompareSettings, WmlDocument};
use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

fn fixture(paragraphs: &[String]) -> WmlDocument {
    let body: String = paragraphs
        .iter()
        .map(|text| format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{body}</w:body></w:document>"#
    );
    let mut package = OpcPackage::empty();
    package.set_part(
        "[Content_Types].xml",
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#.to_vec(),
    );
    package.set_part(
        "_rels/.rels",
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#.to_vec(),
    );
    package.set_part("word/document.xml", document.into_bytes());
    WmlDocument::from_bytes(&package.save().unwrap()).unwrap()
}

fn paragraphs(count: usize, stride: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            (0..12)
                .map(|j| format!("word{}", (i * stride + j) % 97))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn bench_compare(c: &mut Criterion) {
    let settings = CompareSettings::new()
        .with_author("bench")
        .with_date_time(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

    let original = fixture(&paragraphs(40, 1));
    let mut edited = paragraphs(40, 1);
    edited[7] = "completely different paragraph content".to_string();
    edited.remove(20);
    edited.insert(30, "a freshly inserted paragraph".to_string());
    let modified = fixture(&edited);

    c.bench_function("compare_40_paragraphs", |b| {
        b.iter(|| compare(&original, &modified, &settings).unwrap())
    });
}

criterion_group!(benches, bench_compare);
criterion_main!(benches);

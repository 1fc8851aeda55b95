//! Round-trip laws: accepting all revisions in a comparison result yields
//! the modified document, rejecting them yields the original.

mod common;

use blackline_core::{
    accept_revisions, compare, reject_revisions, CompareSettings, WmlDocument,
};
use chrono::{TimeZone, Utc};
use common::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn pinned_settings() -> CompareSettings {
    CompareSettings::new()
        .with_author("Reviewer")
        .with_date_time(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
}

fn assert_round_trips(original: &WmlDocument, modified: &WmlDocument) {
    let settings = pinned_settings();
    let result = compare(original, modified, &settings).unwrap();

    let accepted = accept_revisions(&result).unwrap();
    assert_eq!(
        visible_paragraph_texts(&accepted),
        visible_paragraph_texts(modified),
        "accept-all must reproduce the modified document"
    );

    let rejected = reject_revisions(&result).unwrap();
    assert_eq!(
        visible_paragraph_texts(&rejected),
        visible_paragraph_texts(original),
        "reject-all must reproduce the original document"
    );
}

#[test]
fn insertion_round_trips() {
    assert_round_trips(
        &docx_with_paragraphs(&["Hello world."]),
        &docx_with_paragraphs(&["Hello cruel world."]),
    );
}

#[test]
fn deletion_round_trips() {
    assert_round_trips(
        &docx_with_paragraphs(&["The quick brown fox."]),
        &docx_with_paragraphs(&["The fox."]),
    );
}

#[test]
fn replacement_round_trips() {
    assert_round_trips(
        &docx_with_paragraphs(&["rainy monday morning"]),
        &docx_with_paragraphs(&["sunny monday evening"]),
    );
}

#[test]
fn paragraph_insertion_round_trips() {
    assert_round_trips(
        &docx_with_paragraphs(&["first", "third"]),
        &docx_with_paragraphs(&["first", "second", "third"]),
    );
}

#[test]
fn paragraph_deletion_round_trips() {
    assert_round_trips(
        &docx_with_paragraphs(&["first", "second", "third"]),
        &docx_with_paragraphs(&["first", "third"]),
    );
}

#[test]
fn trailing_paragraph_deletion_round_trips() {
    assert_round_trips(
        &docx_with_paragraphs(&["kept", "dropped"]),
        &docx_with_paragraphs(&["kept"]),
    );
}

#[test]
fn table_row_insertion_round_trips() {
    let original = docx_from_body(&table(&[vec!["r1"], vec!["r2"]]));
    let modified = docx_from_body(&table(&[vec!["r1"], vec!["r2"], vec!["r3"]]));
    assert_round_trips(&original, &modified);
}

#[test]
fn table_row_deletion_round_trips() {
    let original = docx_from_body(&table(&[vec!["r1"], vec!["r2"], vec!["r3"]]));
    let modified = docx_from_body(&table(&[vec!["r1"], vec!["r3"]]));
    assert_round_trips(&original, &modified);
}

#[test]
fn cell_edit_round_trips() {
    let original = docx_from_body(&table(&[vec!["alpha", "beta"]]));
    let modified = docx_from_body(&table(&[vec!["alpha", "beta prime"]]));
    assert_round_trips(&original, &modified);
}

#[test]
fn textbox_edit_round_trips() {
    let textbox_para = |text: &str| {
        format!(
            r#"<w:p><w:r><w:pict><v:shape xmlns:v="urn:schemas-microsoft-com:vml" id="s1" style="width:100pt"><v:textbox><w:txbxContent><w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p></w:txbxContent></v:textbox></v:shape></w:pict></w:r></w:p>"#
        )
    };
    assert_round_trips(
        &docx_from_body(&textbox_para("foo")),
        &docx_from_body(&textbox_para("foo bar")),
    );
}

#[test]
fn multi_paragraph_mixed_edits_round_trip() {
    assert_round_trips(
        &docx_with_paragraphs(&["one two three", "four five six", "seven eight"]),
        &docx_with_paragraphs(&["one three", "four five six and more", "seven eight", "nine"]),
    );
}

prop_compose! {
    fn arb_paragraph()(words in prop::collection::vec("[a-d]{1,4}", 1..5)) -> String {
        words.join(" ")
    }
}

prop_compose! {
    fn arb_document()(paragraphs in prop::collection::vec(arb_paragraph(), 1..4)) -> Vec<String> {
        paragraphs
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn arbitrary_documents_round_trip(a in arb_document(), b in arb_document()) {
        let original = docx_with_paragraphs(&a.iter().map(String::as_str).collect::<Vec<_>>());
        let modified = docx_with_paragraphs(&b.iter().map(String::as_str).collect::<Vec<_>>());
        let settings = pinned_settings();
        let result = compare(&original, &modified, &settings).unwrap();

        let accepted = accept_revisions(&result).unwrap();
        prop_assert_eq!(
            visible_paragraph_texts(&accepted),
            visible_paragraph_texts(&modified)
        );

        let rejected = reject_revisions(&result).unwrap();
        prop_assert_eq!(
            visible_paragraph_texts(&rejected),
            visible_paragraph_texts(&original)
        );
    }

    #[test]
    fn comparison_is_deterministic(a in arb_document(), b in arb_document()) {
        let original = docx_with_paragraphs(&a.iter().map(String::as_str).collect::<Vec<_>>());
        let modified = docx_with_paragraphs(&b.iter().map(String::as_str).collect::<Vec<_>>());
        let settings = pinned_settings();
        let first = compare(&original, &modified, &settings).unwrap().to_bytes().unwrap();
        let second = compare(&original, &modified, &settings).unwrap().to_bytes().unwrap();
        prop_assert_eq!(first, second);
    }
}

//! Multi-level LCS correlation.
//!
//! The engine repeatedly rewrites a worklist of sequences: each pass takes
//! the first Unknown sequence and replaces it with a mix of Equal, Deleted,
//! Inserted, and smaller Unknown sequences, until no Unknown remains. Three
//! strategies apply in order: block-hash matching over paragraph/table/row
//! groups, common prefix/suffix detection, and a full contiguous-run LCS
//! with content-type dispatch for the no-match cases.

use crate::error::{Error, Result};
use crate::util::group_adjacent;
use crate::wml::atoms::{ComparisonUnitAtom, ContentKind, CorrelationStatus};
use crate::wml::settings::CompareSettings;
use crate::wml::units::{ComparisonUnit, GroupKind, Hashed};

/// A resolved or pending span of both inputs. Deleted spans have an empty
/// right side, Inserted spans an empty left side.
#[derive(Debug, Clone)]
pub struct CorrelatedSequence {
    pub status: CorrelationStatus,
    pub left: Vec<ComparisonUnit>,
    pub right: Vec<ComparisonUnit>,
}

impl CorrelatedSequence {
    pub fn unknown(left: Vec<ComparisonUnit>, right: Vec<ComparisonUnit>) -> Self {
        Self {
            status: CorrelationStatus::Unknown,
            left,
            right,
        }
    }

    pub fn equal(left: Vec<ComparisonUnit>, right: Vec<ComparisonUnit>) -> Self {
        Self {
            status: CorrelationStatus::Equal,
            left,
            right,
        }
    }

    pub fn deleted(left: Vec<ComparisonUnit>) -> Self {
        Self {
            status: CorrelationStatus::Deleted,
            left,
            right: Vec::new(),
        }
    }

    pub fn inserted(right: Vec<ComparisonUnit>) -> Self {
        Self {
            status: CorrelationStatus::Inserted,
            left: Vec::new(),
            right,
        }
    }
}

/// Appends the right sequence kind for a left/right pair, eliding empty
/// spans.
fn push_span(out: &mut Vec<CorrelatedSequence>, left: Vec<ComparisonUnit>, right: Vec<ComparisonUnit>) {
    match (left.is_empty(), right.is_empty()) {
        (true, true) => {}
        (false, true) => out.push(CorrelatedSequence::deleted(left)),
        (true, false) => out.push(CorrelatedSequence::inserted(right)),
        (false, false) => out.push(CorrelatedSequence::unknown(left, right)),
    }
}

/// Runs correlation to its fixed point.
pub fn correlate(
    left: Vec<ComparisonUnit>,
    right: Vec<ComparisonUnit>,
    settings: &CompareSettings,
) -> Vec<CorrelatedSequence> {
    if let Some(result) = detect_unrelated_sources(&left, &right) {
        return result;
    }

    let mut sequences = vec![CorrelatedSequence::unknown(left, right)];
    loop {
        let Some(idx) = sequences
            .iter()
            .position(|s| s.status == CorrelationStatus::Unknown)
        else {
            return sequences;
        };
        let mut unknown = sequences.remove(idx);
        harmonize_matched_groups(&mut unknown);
        let replacement = correlated_block_match(&unknown)
            .or_else(|| common_edges(&unknown, settings))
            .unwrap_or_else(|| full_lcs(&unknown, settings));
        for seq in replacement.into_iter().rev() {
            sequences.insert(idx, seq);
        }
    }
}

fn for_each_atom_mut(unit: &mut ComparisonUnit, f: &mut impl FnMut(&mut ComparisonUnitAtom)) {
    match unit {
        ComparisonUnit::Word(w) => {
            for atom in &mut w.atoms {
                f(atom);
            }
        }
        ComparisonUnit::Group(g) => {
            for member in &mut g.members {
                for_each_atom_mut(member, f);
            }
        }
    }
}

/// When an Unknown pairs exactly one group against one group of the same
/// kind, the modified side adopts the original's container UNIDs up to and
/// including the group's own element. Without this, content that survives
/// inside a matched table or paragraph reconstructs under a second copy of
/// the container.
fn harmonize_matched_groups(unknown: &mut CorrelatedSequence) {
    if unknown.status != CorrelationStatus::Unknown
        || unknown.left.len() != 1
        || unknown.right.len() != 1
    {
        return;
    }
    let Some(group_left) = unknown.left[0].as_group() else { return };
    let Some(kind_right) = unknown.right[0].group_kind() else { return };
    if group_left.kind != kind_right {
        return;
    }

    let left_unid = group_left.unid.clone();
    let reference = unknown.left[0]
        .atoms()
        .first()
        .map(|a| (a.ancestor_unids.clone(), a.ancestors.len()));
    let Some((ref_unids, _)) = reference else { return };
    let Some(depth) = ref_unids.iter().position(|u| *u == left_unid) else {
        return;
    };

    for_each_atom_mut(&mut unknown.right[0], &mut |atom| {
        for level in 0..=depth {
            let Some(replacement) = ref_unids.get(level) else { break };
            if let Some(slot) = atom.ancestor_unids.get_mut(level) {
                *slot = replacement.clone();
            }
            if let Some(ancestor) = atom.ancestors.get_mut(level) {
                ancestor.unid = replacement.clone();
            }
        }
    });
    if let ComparisonUnit::Group(g) = &mut unknown.right[0] {
        g.unid = left_unid;
    }
}

/// Bails out early when the inputs share nothing at block level: with four
/// or more groups per side and zero hash overlap among the leading groups,
/// the whole comparison degrades to one delete plus one insert.
fn detect_unrelated_sources(
    left: &[ComparisonUnit],
    right: &[ComparisonUnit],
) -> Option<Vec<CorrelatedSequence>> {
    let heads_left: Vec<&str> = left.iter().filter_map(|u| u.as_group()).take(4).map(|g| g.hash()).collect();
    let heads_right: Vec<&str> = right.iter().filter_map(|u| u.as_group()).take(4).map(|g| g.hash()).collect();
    if heads_left.len() <= 3 || heads_right.len() <= 3 {
        return None;
    }
    if heads_left.iter().any(|h| heads_right.contains(h)) {
        return None;
    }
    Some(vec![
        CorrelatedSequence::deleted(left.to_vec()),
        CorrelatedSequence::inserted(right.to_vec()),
    ])
}

/// Block-level fast path: finds the contiguous run of paragraph/table/row
/// groups with pairwise-equal correlated hashes covering the most atoms,
/// and splits around it. Small runs are ignored so the detail threshold
/// logic below still governs fine-grained matching.
fn correlated_block_match(unknown: &CorrelatedSequence) -> Option<Vec<CorrelatedSequence>> {
    let left = &unknown.left;
    let right = &unknown.right;
    if left.len().min(right.len()) < 3 {
        return None;
    }

    let block_kind = |unit: &ComparisonUnit| {
        matches!(
            unit.group_kind(),
            Some(GroupKind::Paragraph) | Some(GroupKind::Table) | Some(GroupKind::Row)
        )
    };
    if !block_kind(left.first()?) || !block_kind(right.first()?) {
        return None;
    }

    let mut best = (0usize, 0usize, 0usize, 0usize); // (i1, i2, len, atoms)
    for i1 in 0..left.len() {
        for i2 in 0..right.len() {
            let mut len = 0usize;
            let mut atoms = 0usize;
            while i1 + len < left.len() && i2 + len < right.len() {
                let (Some(g1), Some(g2)) = (left[i1 + len].as_group(), right[i2 + len].as_group())
                else {
                    break;
                };
                if g1.kind != g2.kind || g1.hash() != g2.hash() {
                    break;
                }
                atoms += left[i1 + len].atom_count();
                len += 1;
            }
            if atoms > best.3 {
                best = (i1, i2, len, atoms);
            }
        }
    }

    let (best_i1, best_i2, best_len, _) = best;
    let worthwhile = match best_len {
        0 => false,
        1 => {
            left[best_i1].atom_count() > 16 && right[best_i2].atom_count() > 16
        }
        2 | 3 => {
            let atoms1: usize = left[best_i1..best_i1 + best_len].iter().map(|u| u.atom_count()).sum();
            let atoms2: usize = right[best_i2..best_i2 + best_len].iter().map(|u| u.atom_count()).sum();
            atoms1 > 32 && atoms2 > 32
        }
        _ => true,
    };
    if !worthwhile {
        return None;
    }

    let mut out = Vec::new();
    push_span(&mut out, left[..best_i1].to_vec(), right[..best_i2].to_vec());
    // Matched groups go back as singleton Unknowns so recursion can align
    // their interiors (and surface formatting-only differences).
    for offset in 0..best_len {
        out.push(CorrelatedSequence::unknown(
            vec![left[best_i1 + offset].clone()],
            vec![right[best_i2 + offset].clone()],
        ));
    }
    push_span(
        &mut out,
        left[best_i1 + best_len..].to_vec(),
        right[best_i2 + best_len..].to_vec(),
    );
    Some(out)
}

fn ends_with_paragraph_mark(unit: &ComparisonUnit) -> bool {
    unit.last_atom()
        .map(|a| a.content.is_paragraph_mark())
        .unwrap_or(false)
}

fn contains_paragraph_mark(unit: &ComparisonUnit) -> bool {
    match unit {
        ComparisonUnit::Word(w) => w.atoms.iter().any(|a| a.content.is_paragraph_mark()),
        ComparisonUnit::Group(_) => ends_with_paragraph_mark(unit),
    }
}

/// Common prefix, or failing that common suffix, by unit hash.
fn common_edges(
    unknown: &CorrelatedSequence,
    settings: &CompareSettings,
) -> Option<Vec<CorrelatedSequence>> {
    let left = &unknown.left;
    let right = &unknown.right;
    let shorter = left.len().min(right.len());
    if shorter == 0 {
        return None;
    }

    let mut prefix = left
        .iter()
        .zip(right.iter())
        .take_while(|(l, r)| l.hash() == r.hash())
        .count();
    if prefix > 0 && (prefix as f64 / shorter as f64) < settings.detail_threshold {
        prefix = 0;
    }
    if prefix > 0 {
        let mut out = vec![CorrelatedSequence::equal(
            left[..prefix].to_vec(),
            right[..prefix].to_vec(),
        )];
        push_span(&mut out, left[prefix..].to_vec(), right[prefix..].to_vec());
        return Some(out);
    }

    let mut suffix = left
        .iter()
        .rev()
        .zip(right.iter().rev())
        .take_while(|(l, r)| l.hash() == r.hash())
        .count();

    // A common region must not begin with a paragraph mark; that would
    // orphan the preceding paragraph's content on one side.
    while suffix > 1 {
        let first = &left[left.len() - suffix];
        if first.is_paragraph_mark_word() {
            suffix -= 1;
        } else {
            break;
        }
    }
    // A suffix that is nothing but the trailing paragraph mark (possibly
    // preceded by one stray word) carries no alignment information.
    let only_paragraph_mark = match suffix {
        1 => left[left.len() - 1].is_paragraph_mark_word(),
        2 => left[left.len() - 1].is_paragraph_mark_word()
            && left[left.len() - 2].as_word().map(|w| w.atoms.len() == 1).unwrap_or(false),
        _ => false,
    };
    if !only_paragraph_mark && suffix > 0 {
        if (suffix as f64 / shorter as f64) < settings.detail_threshold {
            suffix = 0;
        }
    }
    if only_paragraph_mark || suffix == 0 {
        return None;
    }

    // When the suffix contains paragraph marks, the words preceding it
    // that sit inside the same (last, unterminated) paragraph must be
    // correlated against each other rather than against earlier content.
    let suffix_start_left = left.len() - suffix;
    let suffix_start_right = right.len() - suffix;
    let suffix_has_mark = left[suffix_start_left..]
        .iter()
        .any(contains_paragraph_mark);

    let (mut rem_left, mut rem_right) = (0usize, 0usize);
    if suffix_has_mark && left[suffix_start_left].as_word().is_some() {
        rem_left = left[..suffix_start_left]
            .iter()
            .rev()
            .take_while(|u| u.as_word().is_some() && !contains_paragraph_mark(u))
            .count();
        rem_right = right[..suffix_start_right]
            .iter()
            .rev()
            .take_while(|u| u.as_word().is_some() && !contains_paragraph_mark(u))
            .count();
    }

    let before_left = suffix_start_left - rem_left;
    let before_right = suffix_start_right - rem_right;

    let mut out = Vec::new();
    push_span(&mut out, left[..before_left].to_vec(), right[..before_right].to_vec());
    push_span(
        &mut out,
        left[before_left..suffix_start_left].to_vec(),
        right[before_right..suffix_start_right].to_vec(),
    );
    out.push(CorrelatedSequence::equal(
        left[suffix_start_left..].to_vec(),
        right[suffix_start_right..].to_vec(),
    ));
    Some(out)
}

/// Index of the next unit containing a paragraph mark, or `len` if none.
fn next_paragraph_mark(units: &[ComparisonUnit], from: usize) -> usize {
    units[from..]
        .iter()
        .position(contains_paragraph_mark)
        .map(|offset| from + offset)
        .unwrap_or(units.len())
}

/// Index just past the last paragraph mark strictly before `until`, or 0.
fn paragraph_start_before(units: &[ComparisonUnit], until: usize) -> usize {
    units[..until]
        .iter()
        .rposition(contains_paragraph_mark)
        .map(|idx| idx + 1)
        .unwrap_or(0)
}

/// Full LCS over the two unit arrays: finds the longest contiguous run of
/// pairwise-equal hashes, with guards against degenerate matches, then
/// splits the remainders at paragraph boundaries.
fn full_lcs(unknown: &CorrelatedSequence, settings: &CompareSettings) -> Vec<CorrelatedSequence> {
    let left = &unknown.left;
    let right = &unknown.right;

    if left.is_empty() && right.is_empty() {
        return Vec::new();
    }
    if right.is_empty() {
        return vec![CorrelatedSequence::deleted(left.clone())];
    }
    if left.is_empty() {
        return vec![CorrelatedSequence::inserted(right.clone())];
    }

    let mut best_len = 0usize;
    let mut best_i1 = 0usize;
    let mut best_i2 = 0usize;
    for i1 in 0..left.len() {
        if left.len() - i1 <= best_len {
            break;
        }
        for i2 in 0..right.len() {
            if right.len() - i2 <= best_len {
                break;
            }
            let mut len = 0usize;
            while i1 + len < left.len()
                && i2 + len < right.len()
                && left[i1 + len].hash() == right[i2 + len].hash()
            {
                len += 1;
            }
            if len > best_len {
                best_len = len;
                best_i1 = i1;
                best_i2 = i2;
            }
        }
    }

    // Never start a common region with a paragraph mark. A match that is
    // exactly one paragraph mark stays: pairing the marks is what lets the
    // surrounding paragraphs merge.
    while best_len > 1 && left[best_i1].is_paragraph_mark_word() {
        best_len -= 1;
        best_i1 += 1;
        best_i2 += 1;
    }
    let only_paragraph_mark = best_len == 1 && left[best_i1].is_paragraph_mark_word();

    // A lone space aligns nothing.
    if best_len == 1 && !only_paragraph_mark {
        if let Some(word) = right.get(best_i2).and_then(|u| u.as_word()) {
            if word.text() == " " {
                best_len = 0;
            }
        }
    }

    // Matches made purely of word separators are noise unless long.
    if best_len > 0 && best_len <= 3 {
        let all_separator = left[best_i1..best_i1 + best_len].iter().all(|u| {
            u.as_word()
                .map(|w| {
                    w.atoms.iter().all(|a| match a.content {
                        ContentKind::Text(c) => {
                            is_cjk_char(c) || settings.is_word_separator(c)
                        }
                        _ => false,
                    })
                })
                .unwrap_or(false)
        });
        if all_separator {
            best_len = 0;
        }
    }

    // Word-only sequences are additionally gated by the detail threshold.
    if best_len > 0 && !only_paragraph_mark {
        let words_only = left.iter().all(|u| u.as_word().is_some())
            && right.iter().all(|u| u.as_word().is_some());
        if words_only {
            let longest = left.len().max(right.len());
            if (best_len as f64 / longest as f64) < settings.detail_threshold {
                best_len = 0;
            }
        }
    }

    if best_len == 0 {
        return dispatch_no_match(left, right, settings);
    }

    let mut out = Vec::new();

    // Content before the match, split at the last paragraph boundary so
    // cross-paragraph noise never correlates against in-paragraph edits.
    let begins_on_boundary = (best_i1 == 0 && best_i2 == 0)
        || (best_i1 > 0
            && best_i2 > 0
            && contains_paragraph_mark(&left[best_i1 - 1])
            && contains_paragraph_mark(&right[best_i2 - 1]));
    if begins_on_boundary {
        push_span(&mut out, left[..best_i1].to_vec(), right[..best_i2].to_vec());
    } else {
        let para_left = paragraph_start_before(left, best_i1);
        let para_right = paragraph_start_before(right, best_i2);
        push_span(&mut out, left[..para_left].to_vec(), right[..para_right].to_vec());
        push_span(
            &mut out,
            left[para_left..best_i1].to_vec(),
            right[para_right..best_i2].to_vec(),
        );
    }

    out.push(CorrelatedSequence::equal(
        left[best_i1..best_i1 + best_len].to_vec(),
        right[best_i2..best_i2 + best_len].to_vec(),
    ));

    // Content after the match: when the match stops mid-paragraph, the
    // rest of that paragraph on each side correlates first.
    let end_i1 = best_i1 + best_len;
    let end_i2 = best_i2 + best_len;
    let ends_on_boundary = contains_paragraph_mark(&left[end_i1 - 1]);
    if ends_on_boundary || (end_i1 == left.len() && end_i2 == right.len()) {
        push_span(&mut out, left[end_i1..].to_vec(), right[end_i2..].to_vec());
    } else {
        let pm_left = next_paragraph_mark(left, end_i1);
        let pm_right = next_paragraph_mark(right, end_i2);
        let rest_left = (pm_left + 1).min(left.len());
        let rest_right = (pm_right + 1).min(right.len());
        push_span(
            &mut out,
            left[end_i1..rest_left].to_vec(),
            right[end_i2..rest_right].to_vec(),
        );
        push_span(&mut out, left[rest_left..].to_vec(), right[rest_right..].to_vec());
    }

    out
}

fn is_cjk_char(c: char) -> bool {
    (0x4E00..=0x9FFF).contains(&(c as u32))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitClass {
    Word,
    Row,
    Textbox,
    Table,
    Paragraph,
    Cell,
}

fn class_of(unit: &ComparisonUnit) -> UnitClass {
    match unit.group_kind() {
        None => UnitClass::Word,
        Some(GroupKind::Row) => UnitClass::Row,
        Some(GroupKind::Textbox) => UnitClass::Textbox,
        Some(GroupKind::Table) => UnitClass::Table,
        Some(GroupKind::Cell) => UnitClass::Cell,
        Some(GroupKind::Paragraph) => UnitClass::Paragraph,
    }
}

fn adjacent_classes(units: &[ComparisonUnit]) -> Vec<(UnitClass, Vec<ComparisonUnit>)> {
    group_adjacent(units.iter().cloned(), class_of)
}

/// Content-type dispatch once no hash run exists.
fn dispatch_no_match(
    left: &[ComparisonUnit],
    right: &[ComparisonUnit],
    _settings: &CompareSettings,
) -> Vec<CorrelatedSequence> {
    let count = |units: &[ComparisonUnit], class: UnitClass| {
        units.iter().filter(|u| class_of(u) == class).count()
    };

    let words_l = count(left, UnitClass::Word);
    let words_r = count(right, UnitClass::Word);
    let rows_l = count(left, UnitClass::Row);
    let rows_r = count(right, UnitClass::Row);
    let textboxes_l = count(left, UnitClass::Textbox);
    let textboxes_r = count(right, UnitClass::Textbox);
    let tables_l = count(left, UnitClass::Table);
    let tables_r = count(right, UnitClass::Table);
    let paras_l = count(left, UnitClass::Paragraph);
    let paras_r = count(right, UnitClass::Paragraph);

    // Mixed words with rows or textboxes: pair like-class runs in order.
    let mixed_l = left.len() == words_l + rows_l + textboxes_l;
    let mixed_r = right.len() == words_r + rows_r + textboxes_r;
    if (words_l > 0 || words_r > 0)
        && (rows_l + rows_r + textboxes_l + textboxes_r > 0)
        && mixed_l
        && mixed_r
    {
        return pair_adjacent_classes(left, right);
    }

    // Mixed tables and paragraphs.
    if tables_l > 0 && tables_r > 0 && paras_l > 0 && paras_r > 0 && (left.len() > 1 || right.len() > 1)
    {
        return pair_table_para_runs(left, right);
    }

    // Exactly one table on each side: the table-aware branch.
    if tables_l == 1 && left.len() == 1 && tables_r == 1 && right.len() == 1 {
        if let Some(result) = correlate_tables(left, right) {
            return result;
        }
    }

    // Pure block content: descend one level and retry.
    let blocks_only_l = left.len() == tables_l + paras_l + textboxes_l;
    let blocks_only_r = right.len() == tables_r + paras_r + textboxes_r;
    if blocks_only_l && blocks_only_r {
        let flatten = |units: &[ComparisonUnit]| {
            units
                .iter()
                .flat_map(|u| match u {
                    ComparisonUnit::Group(g) => g.members.clone(),
                    ComparisonUnit::Word(w) => vec![ComparisonUnit::Word(w.clone())],
                })
                .collect::<Vec<_>>()
        };
        return vec![CorrelatedSequence::unknown(flatten(left), flatten(right))];
    }

    // Rows lead both sides: align their cells positionally.
    if class_of(&left[0]) == UnitClass::Row && class_of(&right[0]) == UnitClass::Row {
        return correlate_leading_rows(left, right);
    }

    // Cells lead both sides: their contents correlate, the rest follows.
    if class_of(&left[0]) == UnitClass::Cell && class_of(&right[0]) == UnitClass::Cell {
        let (cl, cr) = (
            left[0].as_group().unwrap().members.clone(),
            right[0].as_group().unwrap().members.clone(),
        );
        let mut out = vec![CorrelatedSequence::unknown(cl, cr)];
        push_span(&mut out, left[1..].to_vec(), right[1..].to_vec());
        return out;
    }

    // A row facing words: document flow keeps the row first.
    if class_of(&left[0]) == UnitClass::Word && class_of(&right[0]) == UnitClass::Row {
        return vec![
            CorrelatedSequence::inserted(right.to_vec()),
            CorrelatedSequence::deleted(left.to_vec()),
        ];
    }
    if class_of(&left[0]) == UnitClass::Row && class_of(&right[0]) == UnitClass::Word {
        return vec![
            CorrelatedSequence::deleted(left.to_vec()),
            CorrelatedSequence::inserted(right.to_vec()),
        ];
    }

    // Paragraph-mark priority: the side whose content completes a
    // paragraph is emitted second, preserving reading order.
    let last_is_mark = |units: &[ComparisonUnit]| {
        units
            .iter()
            .filter_map(|u| u.last_atom())
            .last()
            .map(|a| a.content.is_paragraph_mark())
            .unwrap_or(false)
    };
    let left_mark = last_is_mark(left);
    let right_mark = last_is_mark(right);
    if left_mark && !right_mark {
        return vec![
            CorrelatedSequence::inserted(right.to_vec()),
            CorrelatedSequence::deleted(left.to_vec()),
        ];
    }

    vec![
        CorrelatedSequence::deleted(left.to_vec()),
        CorrelatedSequence::inserted(right.to_vec()),
    ]
}

fn pair_adjacent_classes(
    left: &[ComparisonUnit],
    right: &[ComparisonUnit],
) -> Vec<CorrelatedSequence> {
    let runs_l = adjacent_classes(left);
    let runs_r = adjacent_classes(right);
    let mut out = Vec::new();
    let mut i = 0;
    let mut j = 0;
    while i < runs_l.len() && j < runs_r.len() {
        let (class_l, items_l) = &runs_l[i];
        let (class_r, items_r) = &runs_r[j];
        if class_l == class_r {
            out.push(CorrelatedSequence::unknown(items_l.clone(), items_r.clone()));
            i += 1;
            j += 1;
        } else if *class_l == UnitClass::Word {
            out.push(CorrelatedSequence::deleted(items_l.clone()));
            i += 1;
        } else if *class_r == UnitClass::Word {
            out.push(CorrelatedSequence::inserted(items_r.clone()));
            j += 1;
        } else {
            out.push(CorrelatedSequence::deleted(items_l.clone()));
            i += 1;
        }
    }
    while i < runs_l.len() {
        out.push(CorrelatedSequence::deleted(runs_l[i].1.clone()));
        i += 1;
    }
    while j < runs_r.len() {
        out.push(CorrelatedSequence::inserted(runs_r[j].1.clone()));
        j += 1;
    }
    out
}

fn pair_table_para_runs(
    left: &[ComparisonUnit],
    right: &[ComparisonUnit],
) -> Vec<CorrelatedSequence> {
    let runs = |units: &[ComparisonUnit]| {
        group_adjacent(units.iter().cloned(), |u| {
            class_of(u) == UnitClass::Table
        })
    };
    let runs_l = runs(left);
    let runs_r = runs(right);
    let mut out = Vec::new();
    let mut i = 0;
    let mut j = 0;
    while i < runs_l.len() && j < runs_r.len() {
        let (table_l, items_l) = &runs_l[i];
        let (table_r, items_r) = &runs_r[j];
        if table_l == table_r {
            out.push(CorrelatedSequence::unknown(items_l.clone(), items_r.clone()));
            i += 1;
            j += 1;
        } else if !*table_l {
            out.push(CorrelatedSequence::deleted(items_l.clone()));
            i += 1;
        } else {
            out.push(CorrelatedSequence::inserted(items_r.clone()));
            j += 1;
        }
    }
    while i < runs_l.len() {
        out.push(CorrelatedSequence::deleted(runs_l[i].1.clone()));
        i += 1;
    }
    while j < runs_r.len() {
        out.push(CorrelatedSequence::inserted(runs_r[j].1.clone()));
        j += 1;
    }
    out
}

/// Table-specific branch. Returns `None` to fall back to generic
/// correlation over the flattened rows.
fn correlate_tables(
    left: &[ComparisonUnit],
    right: &[ComparisonUnit],
) -> Option<Vec<CorrelatedSequence>> {
    let table_l = left.first()?.as_group()?;
    let table_r = right.first()?.as_group()?;
    if table_l.kind != GroupKind::Table || table_r.kind != GroupKind::Table {
        return None;
    }
    let rows_l: Vec<_> = table_l.rows().collect();
    let rows_r: Vec<_> = table_r.rows().collect();

    if rows_l.len() == rows_r.len()
        && rows_l
            .iter()
            .zip(rows_r.iter())
            .all(|(a, b)| a.hash() == b.hash())
    {
        return Some(
            rows_l
                .iter()
                .zip(rows_r.iter())
                .map(|(a, b)| {
                    CorrelatedSequence::unknown(
                        vec![ComparisonUnit::Group((*a).clone())],
                        vec![ComparisonUnit::Group((*b).clone())],
                    )
                })
                .collect(),
        );
    }

    let merged_l = has_merged_cells(table_l.members.iter());
    let merged_r = has_merged_cells(table_r.members.iter());
    if merged_l || merged_r {
        if table_l.structure_hash() == table_r.structure_hash() && rows_l.len() == rows_r.len() {
            return Some(
                rows_l
                    .iter()
                    .zip(rows_r.iter())
                    .map(|(a, b)| {
                        CorrelatedSequence::unknown(
                            vec![ComparisonUnit::Group((*a).clone())],
                            vec![ComparisonUnit::Group((*b).clone())],
                        )
                    })
                    .collect(),
            );
        }
        // Merged-cell tables with different shapes cannot be aligned
        // safely; degrade to whole-table delete plus insert.
        return Some(vec![
            CorrelatedSequence::deleted(
                rows_l.iter().map(|r| ComparisonUnit::Group((*r).clone())).collect(),
            ),
            CorrelatedSequence::inserted(
                rows_r.iter().map(|r| ComparisonUnit::Group((*r).clone())).collect(),
            ),
        ]);
    }

    None
}

fn has_merged_cells<'a>(members: impl Iterator<Item = &'a ComparisonUnit>) -> bool {
    fn unit_has_merge(unit: &ComparisonUnit) -> bool {
        match unit {
            ComparisonUnit::Word(w) => w.atoms.iter().any(atom_has_merge),
            ComparisonUnit::Group(g) => g.members.iter().any(unit_has_merge),
        }
    }
    fn atom_has_merge(atom: &ComparisonUnitAtom) -> bool {
        atom.ancestors.iter().any(|a| {
            a.props
                .iter()
                .any(|p| p.contains("<w:vMerge") || p.contains("<w:gridSpan"))
        })
    }
    let mut members = members;
    members.any(|m| unit_has_merge(m))
}

fn correlate_leading_rows(
    left: &[ComparisonUnit],
    right: &[ComparisonUnit],
) -> Vec<CorrelatedSequence> {
    let cells = |unit: &ComparisonUnit| -> Vec<ComparisonUnit> {
        unit.as_group()
            .map(|g| g.members.clone())
            .unwrap_or_default()
    };
    let cells_l = cells(&left[0]);
    let cells_r = cells(&right[0]);

    let mut out = Vec::new();
    let longest = cells_l.len().max(cells_r.len());
    for i in 0..longest {
        match (cells_l.get(i), cells_r.get(i)) {
            (Some(a), Some(b)) => out.push(CorrelatedSequence::unknown(
                vec![a.clone()],
                vec![b.clone()],
            )),
            (Some(a), None) => out.push(CorrelatedSequence::deleted(vec![a.clone()])),
            (None, Some(b)) => out.push(CorrelatedSequence::inserted(vec![b.clone()])),
            (None, None) => {}
        }
    }
    push_span(&mut out, left[1..].to_vec(), right[1..].to_vec());
    out
}

/// Flattens fully-resolved sequences to an atom stream with statuses
/// applied. Equal spans link each surviving atom to its counterpart from
/// the original.
pub fn flatten_to_atoms(sequences: &[CorrelatedSequence]) -> Result<Vec<ComparisonUnitAtom>> {
    let mut out = Vec::new();
    for seq in sequences {
        match seq.status {
            CorrelationStatus::Equal => {
                for (ul, ur) in seq.left.iter().zip(seq.right.iter()) {
                    let atoms_l = ul.atoms();
                    let atoms_r = ur.atoms();
                    if atoms_l.len() != atoms_r.len() {
                        return Err(Error::Internal(format!(
                            "equal sequence with mismatched atom counts ({} vs {})",
                            atoms_l.len(),
                            atoms_r.len()
                        )));
                    }
                    for (al, ar) in atoms_l.iter().zip(atoms_r.iter()) {
                        let mut atom = (*ar).clone();
                        atom.status = CorrelationStatus::Equal;
                        atom.before = Some(Box::new((*al).clone()));
                        out.push(atom);
                    }
                }
            }
            CorrelationStatus::Deleted => {
                for unit in &seq.left {
                    for a in unit.atoms() {
                        let mut atom = a.clone();
                        atom.status = CorrelationStatus::Deleted;
                        out.push(atom);
                    }
                }
            }
            CorrelationStatus::Inserted => {
                for unit in &seq.right {
                    for a in unit.atoms() {
                        let mut atom = a.clone();
                        atom.status = CorrelationStatus::Inserted;
                        out.push(atom);
                    }
                }
            }
            CorrelationStatus::Unknown | CorrelationStatus::FormatChanged => {
                return Err(Error::Internal(
                    "unresolved sequence survived correlation".to_string(),
                ));
            }
        }
    }
    Ok(out)
}

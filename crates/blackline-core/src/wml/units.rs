//! Unit grouping: rolls atoms up into Words and hierarchical Groups.
//!
//! Words are maximal runs of non-separator characters; separators, CJK
//! ideographs, and every structural atom stand alone. Words then fold into
//! Paragraph/Row/Cell/Table/Textbox groups along their ancestor UNIDs,
//! mirroring the document's container hierarchy.

use crate::hash::sha1_hex;
use crate::util::group_adjacent;
use crate::wml::atoms::{ComparisonUnitAtom, ContentKind};
use crate::wml::settings::CompareSettings;

/// Anything the correlation engine compares by digest.
pub trait Hashed {
    fn hash(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct ComparisonUnitWord {
    pub atoms: Vec<ComparisonUnitAtom>,
    sha1: String,
}

impl ComparisonUnitWord {
    pub fn new(atoms: Vec<ComparisonUnitAtom>) -> Self {
        let combined: String = atoms.iter().map(|a| a.sha1()).collect();
        let sha1 = sha1_hex(&combined);
        Self { atoms, sha1 }
    }

    pub fn text(&self) -> String {
        self.atoms
            .iter()
            .filter_map(|a| match a.content {
                ContentKind::Text(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn is_paragraph_mark(&self) -> bool {
        self.atoms.len() == 1 && self.atoms[0].content.is_paragraph_mark()
    }

    pub fn first_atom(&self) -> Option<&ComparisonUnitAtom> {
        self.atoms.first()
    }
}

impl Hashed for ComparisonUnitWord {
    fn hash(&self) -> &str {
        &self.sha1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Paragraph,
    Table,
    Row,
    Cell,
    Textbox,
}

impl GroupKind {
    fn from_container(local: &str) -> Option<Self> {
        match local {
            "p" => Some(Self::Paragraph),
            "tbl" => Some(Self::Table),
            "tr" => Some(Self::Row),
            "tc" => Some(Self::Cell),
            "txbxContent" => Some(Self::Textbox),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComparisonUnitGroup {
    pub kind: GroupKind,
    pub members: Vec<ComparisonUnit>,
    pub unid: String,
    /// Content identity: the preprocessing block hash when the container
    /// carries one, otherwise the ordered rollup of member hashes.
    correlated_sha1: String,
    /// Structural skeleton (container kinds and arities only); tables with
    /// merged cells compare by this when content identity fails.
    structure_sha1: String,
}

impl ComparisonUnitGroup {
    pub fn new(
        kind: GroupKind,
        members: Vec<ComparisonUnit>,
        unid: String,
        annotated_hash: Option<String>,
    ) -> Self {
        let rollup: String = members.iter().map(|m| m.hash()).collect();
        let correlated_sha1 = annotated_hash.unwrap_or_else(|| sha1_hex(&rollup));
        let structure_sha1 = sha1_hex(&structure_text_of(kind, &members));
        Self {
            kind,
            members,
            unid,
            correlated_sha1,
            structure_sha1,
        }
    }

    pub fn structure_hash(&self) -> &str {
        &self.structure_sha1
    }

    pub fn rows(&self) -> impl Iterator<Item = &ComparisonUnitGroup> {
        self.members.iter().filter_map(|m| match m {
            ComparisonUnit::Group(g) if g.kind == GroupKind::Row => Some(g),
            _ => None,
        })
    }
}

impl Hashed for ComparisonUnitGroup {
    fn hash(&self) -> &str {
        &self.correlated_sha1
    }
}

fn structure_text_of(kind: GroupKind, members: &[ComparisonUnit]) -> String {
    let mut out = String::new();
    push_structure(&mut out, kind, members);
    out
}

fn push_structure(out: &mut String, kind: GroupKind, members: &[ComparisonUnit]) {
    let tag = match kind {
        GroupKind::Paragraph => "p",
        GroupKind::Table => "tbl",
        GroupKind::Row => "tr",
        GroupKind::Cell => "tc",
        GroupKind::Textbox => "txbx",
    };
    out.push_str(tag);
    out.push('(');
    for member in members {
        match member {
            ComparisonUnit::Word(_) => out.push('W'),
            ComparisonUnit::Group(g) => push_structure(out, g.kind, &g.members),
        }
    }
    out.push(')');
}

#[derive(Debug, Clone)]
pub enum ComparisonUnit {
    Word(ComparisonUnitWord),
    Group(ComparisonUnitGroup),
}

impl ComparisonUnit {
    pub fn as_word(&self) -> Option<&ComparisonUnitWord> {
        match self {
            Self::Word(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&ComparisonUnitGroup> {
        match self {
            Self::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn group_kind(&self) -> Option<GroupKind> {
        self.as_group().map(|g| g.kind)
    }

    pub fn is_paragraph_mark_word(&self) -> bool {
        self.as_word().map(|w| w.is_paragraph_mark()).unwrap_or(false)
    }

    /// All descendant atoms in document order.
    pub fn atoms(&self) -> Vec<&ComparisonUnitAtom> {
        let mut out = Vec::new();
        collect_atoms(self, &mut out);
        out
    }

    pub fn atom_count(&self) -> usize {
        match self {
            Self::Word(w) => w.atoms.len(),
            Self::Group(g) => g.members.iter().map(|m| m.atom_count()).sum(),
        }
    }

    pub fn last_atom(&self) -> Option<&ComparisonUnitAtom> {
        match self {
            Self::Word(w) => w.atoms.last(),
            Self::Group(g) => g.members.last().and_then(|m| m.last_atom()),
        }
    }
}

fn collect_atoms<'a>(unit: &'a ComparisonUnit, out: &mut Vec<&'a ComparisonUnitAtom>) {
    match unit {
        ComparisonUnit::Word(w) => out.extend(w.atoms.iter()),
        ComparisonUnit::Group(g) => {
            for member in &g.members {
                collect_atoms(member, out);
            }
        }
    }
}

impl Hashed for ComparisonUnit {
    fn hash(&self) -> &str {
        match self {
            Self::Word(w) => w.hash(),
            Self::Group(g) => g.hash(),
        }
    }
}

/// Builds the comparison-unit tree for one side.
pub fn build_units(
    atoms: Vec<ComparisonUnitAtom>,
    settings: &CompareSettings,
) -> Vec<ComparisonUnit> {
    if atoms.is_empty() {
        return Vec::new();
    }
    let words = split_into_words(atoms, settings);
    group_words(&words, 0)
}

struct WordWithPath {
    word: ComparisonUnitWord,
    /// Grouping containers of the word's first atom: (kind, unid,
    /// annotated block hash).
    path: Vec<(GroupKind, String, Option<String>)>,
}

fn split_into_words(
    atoms: Vec<ComparisonUnitAtom>,
    settings: &CompareSettings,
) -> Vec<WordWithPath> {
    let keys = word_keys(&atoms, settings);
    group_adjacent(atoms.into_iter().zip(keys), |(_, key)| *key)
        .into_iter()
        .map(|(_, run)| finish_word(run.into_iter().map(|(atom, _)| atom).collect()))
        .collect()
}

fn finish_word(atoms: Vec<ComparisonUnitAtom>) -> WordWithPath {
    let path = atoms
        .first()
        .map(|atom| {
            atom.ancestors
                .iter()
                .filter_map(|a| {
                    GroupKind::from_container(&a.name.local)
                        .map(|kind| (kind, a.unid.clone(), a.content_hash.clone()))
                })
                .collect()
        })
        .unwrap_or_default();
    WordWithPath {
        word: ComparisonUnitWord::new(atoms),
        path,
    }
}

/// Assigns a word-grouping key to every atom. A key change starts a new
/// word; separators and structural atoms always occupy their own key.
fn word_keys(atoms: &[ComparisonUnitAtom], settings: &CompareSettings) -> Vec<usize> {
    let mut keys = Vec::with_capacity(atoms.len());
    let mut next = 0usize;
    for (i, atom) in atoms.iter().enumerate() {
        let key = match &atom.content {
            ContentKind::Text(ch) => {
                let standalone = if *ch == '.' || *ch == ',' {
                    // Decimal and grouping marks stay inside numbers.
                    let digit_before = i
                        .checked_sub(1)
                        .and_then(|j| atoms.get(j))
                        .map(|a| matches!(a.content, ContentKind::Text(c) if c.is_ascii_digit()))
                        .unwrap_or(false);
                    let digit_after = atoms
                        .get(i + 1)
                        .map(|a| matches!(a.content, ContentKind::Text(c) if c.is_ascii_digit()))
                        .unwrap_or(false);
                    !(digit_before || digit_after)
                } else {
                    is_cjk(*ch) || settings.is_word_separator(*ch)
                };
                if standalone {
                    next += 1;
                    let key = next;
                    next += 1;
                    key
                } else {
                    next
                }
            }
            _ => {
                next += 1;
                let key = next;
                next += 1;
                key
            }
        };
        keys.push(key);
    }
    keys
}

fn is_cjk(ch: char) -> bool {
    (0x4E00..=0x9FFF).contains(&(ch as u32))
}

fn group_words(words: &[WordWithPath], level: usize) -> Vec<ComparisonUnit> {
    let refs: Vec<&WordWithPath> = words.iter().collect();
    group_word_runs(&refs, level)
}

fn group_word_runs(words: &[&WordWithPath], level: usize) -> Vec<ComparisonUnit> {
    // The annotated block hash is deliberately not part of the key: the
    // container's identity at this level is its kind and UNID alone.
    let runs = group_adjacent(words.iter().copied(), |w| {
        w.path
            .get(level)
            .map(|(kind, unid, _)| (*kind, unid.clone()))
    });
    let mut out = Vec::new();
    for (key, run) in runs {
        match key {
            None => out.extend(run.iter().map(|w| ComparisonUnit::Word(w.word.clone()))),
            Some((kind, unid)) => {
                let annotated = run
                    .first()
                    .and_then(|w| w.path.get(level))
                    .and_then(|(_, _, hash)| hash.clone());
                let members = group_word_runs(&run, level + 1);
                out.push(ComparisonUnit::Group(ComparisonUnitGroup::new(
                    kind, members, unid, annotated,
                )));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::CanonicalOptions;
    use crate::wml::atoms::{atomize, PartKind};
    use crate::wml::context::UnidAllocator;
    use crate::wml::preprocess::{annotate_block_hashes, assign_unids};
    use crate::xml::parser::parse;
    use pretty_assertions::assert_eq;

    const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    fn units_of(body_xml: &str) -> Vec<ComparisonUnit> {
        let mut tree = parse(body_xml).unwrap();
        let root = tree.root().unwrap();
        let mut unids = UnidAllocator::new();
        assign_unids(&mut tree, root, &mut unids);
        annotate_block_hashes(&mut tree, root, &CanonicalOptions::default());
        let atoms = atomize(
            &tree,
            root,
            PartKind::MainDocument,
            &CanonicalOptions::default(),
            None,
        );
        build_units(atoms, &CompareSettings::default())
    }

    fn paragraph(units: &[ComparisonUnit]) -> &ComparisonUnitGroup {
        units[0].as_group().expect("paragraph group")
    }

    #[test]
    fn words_split_on_spaces() {
        let units = units_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t>ab cd</w:t></w:r></w:p></w:body>"#
        ));
        let para = paragraph(&units);
        let texts: Vec<String> = para
            .members
            .iter()
            .filter_map(|m| m.as_word())
            .map(|w| w.text())
            .collect();
        // "ab", " ", "cd", paragraph mark
        assert_eq!(texts, ["ab", " ", "cd", ""]);
    }

    #[test]
    fn decimal_point_stays_inside_the_number() {
        let units = units_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t>3.14 x.</w:t></w:r></w:p></w:body>"#
        ));
        let para = paragraph(&units);
        let texts: Vec<String> = para
            .members
            .iter()
            .filter_map(|m| m.as_word())
            .map(|w| w.text())
            .collect();
        assert!(texts.contains(&"3.14".to_string()));
        assert!(texts.contains(&".".to_string()));
    }

    #[test]
    fn cjk_characters_stand_alone() {
        let units = units_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t>你好</w:t></w:r></w:p></w:body>"#
        ));
        let para = paragraph(&units);
        let word_count = para
            .members
            .iter()
            .filter(|m| m.as_word().is_some())
            .count();
        // two ideographs + paragraph mark
        assert_eq!(word_count, 3);
    }

    #[test]
    fn tables_group_into_rows_and_cells() {
        let units = units_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:tbl><w:tr><w:tc><w:p><w:r><w:t>a</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>b</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:body>"#
        ));
        let table = units[0].as_group().unwrap();
        assert_eq!(table.kind, GroupKind::Table);
        let row = table.members[0].as_group().unwrap();
        assert_eq!(row.kind, GroupKind::Row);
        assert_eq!(row.members.len(), 2);
        assert!(row
            .members
            .iter()
            .all(|m| m.group_kind() == Some(GroupKind::Cell)));
    }

    #[test]
    fn equal_paragraphs_share_correlated_hash() {
        let units = units_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t>same</w:t></w:r></w:p><w:p><w:r><w:t>same</w:t></w:r></w:p></w:body>"#
        ));
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].hash(), units[1].hash());
    }

    #[test]
    fn structure_hash_ignores_text_content() {
        let a = units_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:tbl><w:tr><w:tc><w:p><w:r><w:t>aa</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:body>"#
        ));
        let b = units_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:tbl><w:tr><w:tc><w:p><w:r><w:t>zz</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:body>"#
        ));
        let (ta, tb) = (a[0].as_group().unwrap(), b[0].as_group().unwrap());
        assert_eq!(ta.structure_hash(), tb.structure_hash());
        assert_ne!(ta.hash(), tb.hash());
    }

    #[test]
    fn atom_count_sums_over_hierarchy() {
        let units = units_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t>abc</w:t></w:r></w:p></w:body>"#
        ));
        assert_eq!(units[0].atom_count(), 4);
    }
}

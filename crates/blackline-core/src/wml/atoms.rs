//! Atomization: decomposes a document part into character-level
//! comparison units.
//!
//! Every character of text becomes one atom; structural leaves (paragraph
//! marks, breaks, tabs, field boundaries, drawings, math, references)
//! become single atoms carrying a content digest. Each atom records the
//! chain of enclosing containers with their UNIDs, which is what makes
//! tree reconstruction after flattening possible.

use crate::hash::canonical::{fold_char, fold_text};
use crate::hash::{canonical_sha1, sha1_hex, sha1_hex_bytes, CanonicalOptions};
use crate::package::OpcPackage;
use crate::wml::formatting::run_signature;
use crate::xml::arena::XmlTree;
use crate::xml::namespaces::{BL, M, MC, O, R, V, W, W10, XMLNS};
use crate::xml::writer::serialize_subtree;
use crate::xml::xname::{XAttribute, XName};
use indextree::NodeId;
use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Correlation state of an atom or a sequence of units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorrelationStatus {
    #[default]
    Unknown,
    Equal,
    Deleted,
    Inserted,
    FormatChanged,
}

impl fmt::Display for CorrelationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "Unknown",
            Self::Equal => "Equal",
            Self::Deleted => "Deleted",
            Self::Inserted => "Inserted",
            Self::FormatChanged => "FormatChanged",
        };
        write!(f, "{}", label)
    }
}

/// Which auxiliary part an atom belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    MainDocument,
    Footnotes,
    Endnotes,
}

/// One enclosing container of an atom, captured at atomization time.
#[derive(Debug, Clone)]
pub struct AncestorInfo {
    pub name: XName,
    pub unid: String,
    /// Attributes minus namespace declarations and bookkeeping. Shared:
    /// one chain is cloned onto every character atom of its element.
    pub attributes: Arc<Vec<XAttribute>>,
    /// Serialized property children preserved verbatim on reconstruction
    /// (`rPr` for runs, `tblPr`/`tblGrid` for tables, VML shape properties,
    /// and so on).
    pub props: Arc<Vec<String>>,
    /// Block-level content hash annotated during preprocessing
    /// (paragraphs, tables, rows). Groups adopt it as their correlated
    /// hash.
    pub content_hash: Option<String>,
}

/// Payload of one atom.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentKind {
    Text(char),
    /// End-of-paragraph marker. Carries the digest of the paragraph's
    /// properties and their serialized form for reconstruction.
    ParagraphMark {
        props_hash: String,
        props_xml: Option<String>,
    },
    Break,
    Tab,
    FieldBegin,
    FieldSeparator,
    FieldEnd,
    FieldInstruction { text: String },
    Symbol { font: String, code: String },
    /// Opaque leaves re-emitted verbatim from their serialized form.
    Drawing { digest: String, xml: String },
    Picture { digest: String, xml: String },
    Math { digest: String, xml: String },
    EmbeddedObject { digest: String, xml: String },
    FootnoteReference { id: String },
    EndnoteReference { id: String },
    CommentRangeStart { id: String },
    CommentRangeEnd { id: String },
    CommentReference { id: String },
    /// Other empty run-content markers (noBreakHyphen, ptab, pgNum, ...).
    RunMarker { name: String },
}

impl ContentKind {
    /// Text fed to the atom's content hash. Character folding has already
    /// been applied where it matters.
    fn hash_text(&self, opts: &CanonicalOptions) -> String {
        match self {
            Self::Text(ch) => format!("t{}", fold_char(*ch, opts)),
            Self::ParagraphMark { props_hash, .. } => format!("pPr{}", props_hash),
            Self::Break => "br".to_string(),
            Self::Tab => "tab".to_string(),
            Self::FieldBegin => "fldBegin".to_string(),
            Self::FieldSeparator => "fldSep".to_string(),
            Self::FieldEnd => "fldEnd".to_string(),
            Self::FieldInstruction { text } => format!("instr{}", fold_text(text, opts)),
            Self::Symbol { font, code } => format!("sym{}:{}", font, code),
            Self::Drawing { digest, .. } => format!("drawing{}", digest),
            Self::Picture { digest, .. } => format!("pict{}", digest),
            Self::Math { digest, .. } => format!("math{}", digest),
            Self::EmbeddedObject { digest, .. } => format!("object{}", digest),
            // Reference ids renumber freely between saves; identity is
            // positional and the note content is compared per reference.
            Self::FootnoteReference { .. } => "footnoteReference".to_string(),
            Self::EndnoteReference { .. } => "endnoteReference".to_string(),
            Self::CommentRangeStart { .. } => "commentRangeStart".to_string(),
            Self::CommentRangeEnd { .. } => "commentRangeEnd".to_string(),
            Self::CommentReference { .. } => "commentReference".to_string(),
            Self::RunMarker { name } => format!("marker{}", name),
        }
    }

    pub fn is_paragraph_mark(&self) -> bool {
        matches!(self, Self::ParagraphMark { .. })
    }
}

/// The indivisible comparison unit.
#[derive(Debug, Clone)]
pub struct ComparisonUnitAtom {
    pub content: ContentKind,
    /// Enclosing containers, root-downward, ending at the atom's own
    /// element (the `w:t` for text, the marker element for markers, the
    /// `w:p` for paragraph marks).
    pub ancestors: Vec<AncestorInfo>,
    /// Parallel hierarchy ids used to regroup atoms into a tree. Rewritten
    /// after correlation so both sides agree on surviving containers.
    pub ancestor_unids: Vec<String>,
    pub status: CorrelationStatus,
    pub part: PartKind,
    /// Formatting signature of the owning run.
    pub run_signature: Option<String>,
    /// The counterpart atom from the original document (Equal and
    /// FormatChanged atoms only).
    pub before: Option<Box<ComparisonUnitAtom>>,
    hash_text: String,
    cached_sha1: OnceCell<String>,
}

impl ComparisonUnitAtom {
    pub fn new(
        content: ContentKind,
        ancestors: Vec<AncestorInfo>,
        part: PartKind,
        opts: &CanonicalOptions,
    ) -> Self {
        let hash_text = content.hash_text(opts);
        let ancestor_unids = ancestors.iter().map(|a| a.unid.clone()).collect();
        Self {
            content,
            ancestors,
            ancestor_unids,
            status: CorrelationStatus::Unknown,
            part,
            run_signature: None,
            before: None,
            hash_text,
            cached_sha1: OnceCell::new(),
        }
    }

    /// Content digest; computed on first use.
    pub fn sha1(&self) -> &str {
        self.cached_sha1.get_or_init(|| sha1_hex(&self.hash_text))
    }

    pub fn unid_at(&self, level: usize) -> Option<&str> {
        self.ancestor_unids.get(level).map(|s| s.as_str())
    }

    pub fn ancestor_named(&self, local: &str) -> Option<&AncestorInfo> {
        self.ancestors.iter().rev().find(|a| a.name.local == local)
    }

    pub fn is_in_textbox(&self) -> bool {
        self.ancestors.iter().any(|a| a.name == W::txbxContent())
    }
}

/// Property children preserved verbatim when a container is rebuilt.
/// Omitting the VML names here loses textbox formatting, so the table is
/// explicit per container type.
pub fn property_children(name: &XName) -> &'static [&'static str] {
    static VML_SHAPE_PROPS: &[&str] = &[
        "fill", "stroke", "shadow", "textpath", "path", "formulas", "handles", "imagedata",
        "lock", "extrusion", "wrap",
    ];
    let ns = name.namespace.as_deref();
    if ns == Some(W::NS) {
        match name.local.as_str() {
            "r" => &["rPr"],
            "tbl" => &["tblPr", "tblGrid", "tblPrEx"],
            "tr" => &["trPr", "tblPrEx"],
            "tc" => &["tcPr", "tblPrEx"],
            "sdt" => &["sdtPr", "sdtEndPr"],
            "smartTag" => &["smartTagPr"],
            "ruby" => &["rubyPr"],
            "pict" => &["shapetype"],
            _ => &[],
        }
    } else if ns == Some(V::NS) {
        match name.local.as_str() {
            "shape" | "rect" | "oval" | "line" | "arc" | "curve" | "polyline" | "roundrect"
            | "group" => VML_SHAPE_PROPS,
            "shapetype" => &["stroke", "path", "fill", "shadow", "formulas", "handles"],
            _ => &[],
        }
    } else {
        &[]
    }
}

/// Containers the walk descends through; their property children are
/// captured on the ancestor chain instead of being atomized.
static RECURSION_CONTAINERS_W: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "ins", "del", "moveFrom", "moveTo", "tbl", "tr", "tc", "txbxContent", "hyperlink",
        "fldSimple", "sdt", "sdtContent", "smartTag", "ruby", "pict",
    ]
    .into_iter()
    .collect()
});

static RECURSION_CONTAINERS_V: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "group", "shape", "rect", "oval", "line", "arc", "curve", "polyline", "roundrect",
        "shapetype", "textbox",
    ]
    .into_iter()
    .collect()
});

/// Empty run-content markers that become single atoms.
static RUN_MARKERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "noBreakHyphen", "softHyphen", "ptab", "pgNum", "dayLong", "dayShort", "monthLong",
        "monthShort", "yearLong", "yearShort", "separator", "continuationSeparator",
    ]
    .into_iter()
    .collect()
});

/// Elements dropped during atomization. `sectPr` is preserved separately
/// by the comparer; reference marks are re-synthesized for note parts.
static DISCARDED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "pPr", "rPr", "tblPr", "tblGrid", "tblPrEx", "trPr", "tcPr", "sectPr", "bookmarkStart",
        "bookmarkEnd", "proofErr", "permStart", "permEnd", "lastRenderedPageBreak",
        "footnoteRef", "endnoteRef", "annotationRef",
    ]
    .into_iter()
    .collect()
});

/// Decomposes the content of `root` (a `w:body`, `w:footnote`, or
/// `w:endnote`) into atoms. `package` enables image-content identity for
/// drawings; without it drawings hash by their XML alone.
pub fn atomize(
    tree: &XmlTree,
    root: NodeId,
    part: PartKind,
    opts: &CanonicalOptions,
    package: Option<&OpcPackage>,
) -> Vec<ComparisonUnitAtom> {
    let mut atoms = Vec::new();
    let rels = package.map(load_image_relationships).unwrap_or_default();
    let mut walker = Walker {
        tree,
        part,
        opts,
        package,
        rels,
        atoms: &mut atoms,
    };
    for child in tree.children(root).collect::<Vec<_>>() {
        walker.walk(child, None);
    }
    atoms
}

struct Walker<'a> {
    tree: &'a XmlTree,
    part: PartKind,
    opts: &'a CanonicalOptions,
    package: Option<&'a OpcPackage>,
    rels: HashMap<String, String>,
    atoms: &'a mut Vec<ComparisonUnitAtom>,
}

impl<'a> Walker<'a> {
    fn walk(&mut self, node: NodeId, run_sig: Option<&str>) {
        let Some(data) = self.tree.get(node) else { return };
        let Some(name) = data.name() else { return };
        let ns = name.namespace.as_deref();
        let local = name.local.as_str();

        if ns == Some(W::NS) && local == "p" {
            for child in self.tree.children(node).collect::<Vec<_>>() {
                if !self.tree.is_named(child, &W::pPr()) {
                    self.walk(child, None);
                }
            }
            self.push_paragraph_mark(node);
            return;
        }

        if ns == Some(W::NS) && local == "r" {
            let signature = run_signature(self.tree, node);
            for child in self.tree.children(node).collect::<Vec<_>>() {
                if !self.tree.is_named(child, &W::rPr()) {
                    self.walk(child, signature.as_deref());
                }
            }
            return;
        }

        if ns == Some(W::NS) && (local == "t" || local == "delText") {
            let text = self.tree.inner_text(node);
            let ancestors = self.ancestor_chain(node);
            for ch in text.chars() {
                let mut atom = ComparisonUnitAtom::new(
                    ContentKind::Text(ch),
                    ancestors.clone(),
                    self.part,
                    self.opts,
                );
                atom.run_signature = run_sig.map(|s| s.to_string());
                self.atoms.push(atom);
            }
            return;
        }

        if ns == Some(W::NS) && (local == "instrText" || local == "delInstrText") {
            let text = self.tree.inner_text(node);
            self.push_leaf(node, ContentKind::FieldInstruction { text }, run_sig);
            return;
        }

        if ns == Some(W::NS) {
            match local {
                "br" | "cr" => {
                    self.push_leaf(node, ContentKind::Break, run_sig);
                    return;
                }
                "tab" => {
                    self.push_leaf(node, ContentKind::Tab, run_sig);
                    return;
                }
                "sym" => {
                    let font = self.attr(node, "font");
                    let code = self.attr(node, "char");
                    self.push_leaf(node, ContentKind::Symbol { font, code }, run_sig);
                    return;
                }
                "fldChar" => {
                    let kind = match self.attr(node, "fldCharType").as_str() {
                        "begin" => ContentKind::FieldBegin,
                        "separate" => ContentKind::FieldSeparator,
                        _ => ContentKind::FieldEnd,
                    };
                    self.push_leaf(node, kind, run_sig);
                    return;
                }
                "footnoteReference" => {
                    let id = self.attr(node, "id");
                    self.push_leaf(node, ContentKind::FootnoteReference { id }, run_sig);
                    return;
                }
                "endnoteReference" => {
                    let id = self.attr(node, "id");
                    self.push_leaf(node, ContentKind::EndnoteReference { id }, run_sig);
                    return;
                }
                "commentRangeStart" => {
                    let id = self.attr(node, "id");
                    self.push_leaf(node, ContentKind::CommentRangeStart { id }, run_sig);
                    return;
                }
                "commentRangeEnd" => {
                    let id = self.attr(node, "id");
                    self.push_leaf(node, ContentKind::CommentRangeEnd { id }, run_sig);
                    return;
                }
                "commentReference" => {
                    let id = self.attr(node, "id");
                    self.push_leaf(node, ContentKind::CommentReference { id }, run_sig);
                    return;
                }
                "drawing" => {
                    let digest = self.drawing_digest(node);
                    let xml = serialize_subtree(self.tree, node).unwrap_or_default();
                    self.push_leaf(node, ContentKind::Drawing { digest, xml }, run_sig);
                    return;
                }
                "object" => {
                    let digest = canonical_sha1(self.tree, node, self.opts);
                    let xml = serialize_subtree(self.tree, node).unwrap_or_default();
                    self.push_leaf(node, ContentKind::EmbeddedObject { digest, xml }, run_sig);
                    return;
                }
                "pict" if !self.contains_textbox(node) => {
                    let digest = canonical_sha1(self.tree, node, self.opts);
                    let xml = serialize_subtree(self.tree, node).unwrap_or_default();
                    self.push_leaf(node, ContentKind::Picture { digest, xml }, run_sig);
                    return;
                }
                _ if RUN_MARKERS.contains(local) => {
                    self.push_leaf(
                        node,
                        ContentKind::RunMarker {
                            name: local.to_string(),
                        },
                        run_sig,
                    );
                    return;
                }
                _ if DISCARDED.contains(local) => return,
                _ => {}
            }
        }

        if ns == Some(M::NS) && (local == "oMath" || local == "oMathPara") {
            let digest = canonical_sha1(self.tree, node, self.opts);
            let xml = serialize_subtree(self.tree, node).unwrap_or_default();
            self.push_leaf(node, ContentKind::Math { digest, xml }, run_sig);
            return;
        }

        if ns == Some(MC::NS) && local == "AlternateContent" {
            // Both representations describe the same content; walking both
            // would duplicate every atom. Prefer the VML fallback.
            let branch = self
                .tree
                .child_named(node, &MC::Fallback())
                .or_else(|| self.tree.child_named(node, &MC::Choice()));
            if let Some(branch) = branch {
                for child in self.tree.children(branch).collect::<Vec<_>>() {
                    self.walk(child, run_sig);
                }
            }
            return;
        }

        let is_container = (ns == Some(W::NS) && RECURSION_CONTAINERS_W.contains(local))
            || (ns == Some(V::NS) && RECURSION_CONTAINERS_V.contains(local))
            || (ns == Some(O::NS) && local == "lock")
            || (ns == Some(W10::NS) && local == "wrap");
        if is_container {
            let skip: HashSet<&str> = property_children(name).iter().copied().collect();
            for child in self.tree.children(node).collect::<Vec<_>>() {
                let child_local = self.tree.name(child).map(|n| n.local.clone());
                if child_local
                    .as_deref()
                    .map(|l| skip.contains(l))
                    .unwrap_or(false)
                {
                    continue;
                }
                self.walk(child, run_sig);
            }
            return;
        }

        for child in self.tree.children(node).collect::<Vec<_>>() {
            self.walk(child, run_sig);
        }
    }

    fn push_paragraph_mark(&mut self, p: NodeId) {
        let ppr = self.tree.child_named(p, &W::pPr());
        let props_hash = ppr
            .map(|n| canonical_sha1(self.tree, n, self.opts))
            .unwrap_or_else(|| sha1_hex(""));
        let props_xml = ppr.and_then(|n| serialize_subtree(self.tree, n).ok());
        let ancestors = self.ancestor_chain(p);
        let atom = ComparisonUnitAtom::new(
            ContentKind::ParagraphMark {
                props_hash,
                props_xml,
            },
            ancestors,
            self.part,
            self.opts,
        );
        self.atoms.push(atom);
    }

    fn push_leaf(&mut self, node: NodeId, content: ContentKind, run_sig: Option<&str>) {
        let ancestors = self.ancestor_chain(node);
        let mut atom = ComparisonUnitAtom::new(content, ancestors, self.part, self.opts);
        atom.run_signature = run_sig.map(|s| s.to_string());
        self.atoms.push(atom);
    }

    fn attr(&self, node: NodeId, local: &str) -> String {
        self.tree
            .get(node)
            .and_then(|d| d.attributes())
            .and_then(|attrs| {
                attrs
                    .iter()
                    .find(|a| a.name.local == local)
                    .map(|a| a.value.clone())
            })
            .unwrap_or_default()
    }

    fn contains_textbox(&self, node: NodeId) -> bool {
        self.tree.descendants(node).any(|d| {
            self.tree.is_named(d, &W::txbxContent())
                || self
                    .tree
                    .name(d)
                    .map(|n| n.is(V::NS, "textbox"))
                    .unwrap_or(false)
        })
    }

    /// Containers from the part root down to (and including) `node`.
    fn ancestor_chain(&self, node: NodeId) -> Vec<AncestorInfo> {
        let mut chain = Vec::new();
        for ancestor in std::iter::once(node).chain(self.tree.ancestors(node)) {
            let Some(data) = self.tree.get(ancestor) else { break };
            let Some(name) = data.name() else { break };
            if name == &W::body() || name == &W::footnote() || name == &W::endnote()
                || name == &W::footnotes() || name == &W::endnotes()
            {
                break;
            }
            let attributes: Arc<Vec<XAttribute>> = Arc::new(
                data.attributes()
                    .map(|attrs| {
                        attrs
                            .iter()
                            .filter(|a| {
                                let ans = a.name.namespace.as_deref();
                                ans != Some(XMLNS::NS)
                                    && ans != Some(BL::NS)
                                    && !(a.name.namespace.is_none() && a.name.local == "xmlns")
                            })
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default(),
            );
            let unid = data
                .attribute(&BL::unid())
                .map(|v| v.to_string())
                .unwrap_or_default();
            let content_hash = data.attribute(&BL::contentHash()).map(|v| v.to_string());
            let props = Arc::new(
                property_children(name)
                    .iter()
                    .filter_map(|prop_local| {
                        self.tree
                            .children(ancestor)
                            .find(|&c| {
                                self.tree
                                    .name(c)
                                    .map(|n| n.local == *prop_local)
                                    .unwrap_or(false)
                            })
                            .and_then(|c| serialize_subtree(self.tree, c).ok())
                    })
                    .collect::<Vec<_>>(),
            );
            chain.push(AncestorInfo {
                name: name.clone(),
                unid,
                attributes,
                props,
                content_hash,
            });
        }
        chain.reverse();
        chain
    }

    fn drawing_digest(&self, node: NodeId) -> String {
        let mut material = canonical_sha1(self.tree, node, self.opts);
        if self.package.is_some() {
            let mut image_digests: Vec<String> = Vec::new();
            for desc in self.tree.descendants(node) {
                let embed = self
                    .tree
                    .attribute(desc, &R::embed())
                    .or_else(|| self.tree.attribute(desc, &R::id()));
                if let Some(rel_id) = embed {
                    if let Some(target) = self.rels.get(rel_id) {
                        if let Some(bytes) = self.package.and_then(|p| p.part(target)) {
                            image_digests.push(sha1_hex_bytes(bytes));
                        }
                    }
                }
            }
            for digest in image_digests {
                material.push_str(&digest);
            }
        }
        sha1_hex(&material)
    }
}

/// Maps relationship ids of the main part to package paths.
fn load_image_relationships(package: &OpcPackage) -> HashMap<String, String> {
    let mut rels = HashMap::new();
    let Ok(tree) = package.xml_part("word/_rels/document.xml.rels") else {
        return rels;
    };
    let Some(root) = tree.root() else { return rels };
    for node in tree.descendants(root) {
        let Some(data) = tree.get(node) else { continue };
        if data.name().map(|n| n.local.as_str()) != Some("Relationship") {
            continue;
        }
        let id = data.attribute(&XName::local("Id")).map(|v| v.to_string());
        let target = data.attribute(&XName::local("Target")).map(|v| v.to_string());
        if let (Some(id), Some(target)) = (id, target) {
            rels.insert(id, format!("word/{}", target.trim_start_matches("./")));
        }
    }
    rels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wml::context::UnidAllocator;
    use crate::wml::preprocess::assign_unids;
    use crate::xml::parser::parse;

    const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    fn atoms_of(body_xml: &str) -> Vec<ComparisonUnitAtom> {
        let mut tree = parse(body_xml).unwrap();
        let root = tree.root().unwrap();
        let mut unids = UnidAllocator::new();
        assign_unids(&mut tree, root, &mut unids);
        atomize(
            &tree,
            root,
            PartKind::MainDocument,
            &CanonicalOptions::default(),
            None,
        )
    }

    #[test]
    fn text_yields_one_atom_per_character_plus_mark() {
        let atoms = atoms_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t>abc</w:t></w:r></w:p></w:body>"#
        ));
        assert_eq!(atoms.len(), 4);
        assert_eq!(atoms[0].content, ContentKind::Text('a'));
        assert_eq!(atoms[2].content, ContentKind::Text('c'));
        assert!(atoms[3].content.is_paragraph_mark());
    }

    #[test]
    fn breaks_and_tabs_are_single_atoms() {
        let atoms = atoms_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t>a</w:t><w:br/><w:tab/></w:r></w:p></w:body>"#
        ));
        let kinds: Vec<&ContentKind> = atoms.iter().map(|a| &a.content).collect();
        assert!(matches!(kinds[1], ContentKind::Break));
        assert!(matches!(kinds[2], ContentKind::Tab));
    }

    #[test]
    fn ancestor_chain_runs_from_part_root_downward() {
        let atoms = atoms_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t>x</w:t></w:r></w:p></w:body>"#
        ));
        let names: Vec<&str> = atoms[0]
            .ancestors
            .iter()
            .map(|a| a.name.local.as_str())
            .collect();
        assert_eq!(names, ["p", "r", "t"]);
        assert!(atoms[0].ancestors.iter().all(|a| !a.unid.is_empty()));
    }

    #[test]
    fn paragraph_mark_hash_covers_paragraph_properties() {
        let plain = atoms_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t>x</w:t></w:r></w:p></w:body>"#
        ));
        let styled = atoms_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>x</w:t></w:r></w:p></w:body>"#
        ));
        let mark_plain = plain.last().unwrap();
        let mark_styled = styled.last().unwrap();
        assert_ne!(mark_plain.sha1(), mark_styled.sha1());
    }

    #[test]
    fn table_cells_keep_full_ancestor_chain() {
        let atoms = atoms_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:tbl><w:tr><w:tc><w:p><w:r><w:t>z</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:body>"#
        ));
        let names: Vec<&str> = atoms[0]
            .ancestors
            .iter()
            .map(|a| a.name.local.as_str())
            .collect();
        assert_eq!(names, ["tbl", "tr", "tc", "p", "r", "t"]);
    }

    #[test]
    fn run_properties_are_captured_for_reconstruction() {
        let atoms = atoms_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:rPr><w:b/></w:rPr><w:t>x</w:t></w:r></w:p></w:body>"#
        ));
        let run = atoms[0].ancestor_named("r").unwrap();
        assert_eq!(run.props.len(), 1);
        assert!(run.props[0].contains("<w:b/>"));
        assert!(atoms[0].run_signature.is_some());
    }

    #[test]
    fn comment_ranges_become_atoms() {
        let atoms = atoms_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:commentRangeStart w:id="3"/><w:r><w:t>x</w:t></w:r><w:commentRangeEnd w:id="3"/></w:p></w:body>"#
        ));
        assert!(matches!(
            &atoms[0].content,
            ContentKind::CommentRangeStart { id } if id == "3"
        ));
        assert!(matches!(
            &atoms[2].content,
            ContentKind::CommentRangeEnd { id } if id == "3"
        ));
    }

    #[test]
    fn nbsp_and_space_hash_identically_when_conflated() {
        let atoms = atoms_of(&format!(
            "<w:body xmlns:w=\"{W_NS}\"><w:p><w:r><w:t>a\u{00A0}b</w:t></w:r></w:p></w:body>"
        ));
        let space_atoms = atoms_of(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t>a b</w:t></w:r></w:p></w:body>"#
        ));
        assert_eq!(atoms[1].sha1(), space_atoms[1].sha1());
    }

    #[test]
    fn alternate_content_walks_only_one_branch() {
        let atoms = atoms_of(&format!(
            r#"<w:body xmlns:w="{W_NS}" xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006"><w:p><w:r><mc:AlternateContent><mc:Choice><w:t>choice</w:t></mc:Choice><mc:Fallback><w:t>fb</w:t></mc:Fallback></mc:AlternateContent></w:r></w:p></w:body>"#
        ));
        let text: String = atoms
            .iter()
            .filter_map(|a| match a.content {
                ContentKind::Text(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(text, "fb");
    }
}

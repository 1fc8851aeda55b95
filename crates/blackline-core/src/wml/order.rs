//! Canonical child ordering per ECMA-376.
//!
//! Reconstruction appends children in atom order (a paragraph's `pPr`
//! arrives last, because the paragraph mark is the paragraph's final
//! atom); Word requires the schema sequence. Ordering runs once, after the
//! tree is fully marked and merged.

use crate::xml::arena::XmlTree;
use crate::xml::namespaces::W;
use crate::xml::xname::XName;
use indextree::NodeId;
use once_cell::sync::Lazy;
use std::collections::HashMap;

fn ranks(pairs: &[(&str, i32)]) -> HashMap<String, i32> {
    pairs.iter().map(|(n, r)| (n.to_string(), *r)).collect()
}

static ORDER_PPR: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    ranks(&[
        ("pStyle", 10), ("keepNext", 20), ("keepLines", 30), ("pageBreakBefore", 40),
        ("framePr", 50), ("widowControl", 60), ("numPr", 70), ("suppressLineNumbers", 80),
        ("pBdr", 90), ("shd", 100), ("tabs", 120), ("suppressAutoHyphens", 130),
        ("kinsoku", 140), ("wordWrap", 150), ("overflowPunct", 160), ("topLinePunct", 170),
        ("autoSpaceDE", 180), ("autoSpaceDN", 190), ("bidi", 200), ("adjustRightInd", 210),
        ("snapToGrid", 220), ("spacing", 230), ("ind", 240), ("contextualSpacing", 250),
        ("mirrorIndents", 260), ("suppressOverlap", 270), ("jc", 280), ("textDirection", 290),
        ("textAlignment", 300), ("textboxTightWrap", 310), ("outlineLvl", 320), ("divId", 330),
        ("cnfStyle", 340), ("rPr", 350), ("sectPr", 360), ("pPrChange", 370),
    ])
});

static ORDER_RPR: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    ranks(&[
        ("ins", 1), ("del", 2), ("moveFrom", 3), ("moveTo", 4),
        ("rStyle", 10), ("rFonts", 20), ("b", 30), ("bCs", 40), ("i", 50), ("iCs", 60),
        ("caps", 70), ("smallCaps", 80), ("strike", 90), ("dstrike", 100), ("outline", 110),
        ("shadow", 120), ("emboss", 130), ("imprint", 140), ("noProof", 150),
        ("snapToGrid", 160), ("vanish", 170), ("webHidden", 180), ("color", 190),
        ("spacing", 200), ("w", 210), ("kern", 220), ("position", 230), ("sz", 240),
        ("szCs", 250), ("highlight", 260), ("u", 270), ("effect", 280), ("bdr", 290),
        ("shd", 300), ("fitText", 310), ("vertAlign", 320), ("rtl", 330), ("cs", 340),
        ("em", 350), ("lang", 360), ("eastAsianLayout", 370), ("specVanish", 380),
        ("oMath", 390), ("rPrChange", 400),
    ])
});

static ORDER_TBLPR: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    ranks(&[
        ("tblStyle", 10), ("tblpPr", 20), ("tblOverlap", 30), ("bidiVisual", 40),
        ("tblStyleRowBandSize", 50), ("tblStyleColBandSize", 60), ("tblW", 70), ("jc", 80),
        ("tblCellSpacing", 90), ("tblInd", 100), ("tblBorders", 110), ("shd", 120),
        ("tblLayout", 130), ("tblCellMar", 140), ("tblLook", 150), ("tblCaption", 160),
        ("tblDescription", 170), ("tblPrChange", 180),
    ])
});

static ORDER_TRPR: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    ranks(&[
        ("cnfStyle", 10), ("divId", 20), ("gridBefore", 30), ("gridAfter", 40),
        ("wBefore", 50), ("wAfter", 60), ("cantSplit", 70), ("trHeight", 80),
        ("tblHeader", 90), ("tblCellSpacing", 100), ("jc", 110), ("hidden", 120),
        ("ins", 130), ("del", 140), ("trPrChange", 150),
    ])
});

static ORDER_TCPR: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    ranks(&[
        ("cnfStyle", 10), ("tcW", 20), ("gridSpan", 30), ("hMerge", 40), ("vMerge", 50),
        ("tcBorders", 60), ("shd", 70), ("noWrap", 80), ("tcMar", 90), ("textDirection", 100),
        ("tcFitText", 110), ("vAlign", 120), ("hideMark", 130), ("headers", 140),
        ("cellIns", 1), ("cellDel", 2), ("cellMerge", 3), ("tcPrChange", 150),
    ])
});

/// Orders every properties element and keeps structural lead children
/// (`pPr`, `tblPr`/`tblGrid`, `trPr`, `tcPr`) first in their containers.
pub fn order_elements_per_schema(tree: &mut XmlTree, root: NodeId) {
    let nodes: Vec<NodeId> = tree.descendants(root).collect();
    for node in nodes {
        let Some(name) = tree.name(node) else { continue };
        if name.namespace.as_deref() != Some(W::NS) {
            continue;
        }
        match name.local.as_str() {
            "pPr" => reorder_children(tree, node, &ORDER_PPR),
            "rPr" => reorder_children(tree, node, &ORDER_RPR),
            "tblPr" => reorder_children(tree, node, &ORDER_TBLPR),
            "trPr" => reorder_children(tree, node, &ORDER_TRPR),
            "tcPr" => reorder_children(tree, node, &ORDER_TCPR),
            "p" => reorder_leading(tree, node, &["pPr"]),
            "tbl" => reorder_leading(tree, node, &["tblPr", "tblGrid"]),
            "tr" => reorder_leading(tree, node, &["tblPrEx", "trPr"]),
            "tc" => reorder_leading(tree, node, &["tcPr"]),
            _ => {}
        }
    }
}

fn reorder_children(tree: &mut XmlTree, parent: NodeId, order: &HashMap<String, i32>) {
    let rank_of = |tree: &XmlTree, id: NodeId| -> i32 {
        tree.name(id)
            .and_then(|n| order.get(&n.local))
            .copied()
            .unwrap_or(900)
    };
    apply_order(tree, parent, rank_of);
}

fn reorder_leading(tree: &mut XmlTree, parent: NodeId, leading: &[&str]) {
    let leading: Vec<XName> = leading.iter().map(|l| XName::new(W::NS, l)).collect();
    let rank_of = move |tree: &XmlTree, id: NodeId| -> i32 {
        tree.name(id)
            .and_then(|n| leading.iter().position(|l| l == n))
            .map(|pos| pos as i32)
            .unwrap_or(100)
    };
    apply_order(tree, parent, rank_of);
}

fn apply_order<F>(tree: &mut XmlTree, parent: NodeId, rank_of: F)
where
    F: Fn(&XmlTree, NodeId) -> i32,
{
    let children: Vec<NodeId> = tree.children(parent).collect();
    let ranked: Vec<(i32, NodeId)> = children.iter().map(|&c| (rank_of(tree, c), c)).collect();
    if ranked.windows(2).all(|w| w[0].0 <= w[1].0) {
        return;
    }
    let mut sorted = ranked.clone();
    // Stable: equal ranks keep document order.
    sorted.sort_by_key(|&(rank, _)| rank);
    for &(_, child) in &sorted {
        tree.detach(child);
        tree.reparent(parent, child);
    }
}

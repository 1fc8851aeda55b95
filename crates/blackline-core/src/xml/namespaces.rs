//! Well-known OOXML namespaces and frequently used qualified names.

#![allow(non_snake_case)]

use super::xname::XName;

/// Namespace of `xmlns:` declarations themselves.
pub mod XMLNS {
    pub const NS: &str = "http://www.w3.org/2000/xmlns/";
}

/// The `xml:` namespace (`xml:space`, `xml:lang`).
pub mod XML {
    use super::XName;
    pub const NS: &str = "http://www.w3.org/XML/1998/namespace";

    pub fn space() -> XName {
        XName::new(NS, "space")
    }
}

/// WordprocessingML main namespace.
pub mod W {
    use super::XName;
    pub const NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    pub fn document() -> XName { XName::new(NS, "document") }
    pub fn body() -> XName { XName::new(NS, "body") }
    pub fn p() -> XName { XName::new(NS, "p") }
    pub fn pPr() -> XName { XName::new(NS, "pPr") }
    pub fn r() -> XName { XName::new(NS, "r") }
    pub fn rPr() -> XName { XName::new(NS, "rPr") }
    pub fn t() -> XName { XName::new(NS, "t") }
    pub fn delText() -> XName { XName::new(NS, "delText") }
    pub fn instrText() -> XName { XName::new(NS, "instrText") }
    pub fn delInstrText() -> XName { XName::new(NS, "delInstrText") }
    pub fn ins() -> XName { XName::new(NS, "ins") }
    pub fn del() -> XName { XName::new(NS, "del") }
    pub fn moveFrom() -> XName { XName::new(NS, "moveFrom") }
    pub fn moveTo() -> XName { XName::new(NS, "moveTo") }
    pub fn rPrChange() -> XName { XName::new(NS, "rPrChange") }
    pub fn pPrChange() -> XName { XName::new(NS, "pPrChange") }
    pub fn cellIns() -> XName { XName::new(NS, "cellIns") }
    pub fn cellDel() -> XName { XName::new(NS, "cellDel") }
    pub fn tbl() -> XName { XName::new(NS, "tbl") }
    pub fn tblPr() -> XName { XName::new(NS, "tblPr") }
    pub fn tblGrid() -> XName { XName::new(NS, "tblGrid") }
    pub fn tblPrEx() -> XName { XName::new(NS, "tblPrEx") }
    pub fn tr() -> XName { XName::new(NS, "tr") }
    pub fn trPr() -> XName { XName::new(NS, "trPr") }
    pub fn tc() -> XName { XName::new(NS, "tc") }
    pub fn tcPr() -> XName { XName::new(NS, "tcPr") }
    pub fn gridSpan() -> XName { XName::new(NS, "gridSpan") }
    pub fn vMerge() -> XName { XName::new(NS, "vMerge") }
    pub fn txbxContent() -> XName { XName::new(NS, "txbxContent") }
    pub fn hyperlink() -> XName { XName::new(NS, "hyperlink") }
    pub fn fldSimple() -> XName { XName::new(NS, "fldSimple") }
    pub fn fldChar() -> XName { XName::new(NS, "fldChar") }
    pub fn br() -> XName { XName::new(NS, "br") }
    pub fn tab() -> XName { XName::new(NS, "tab") }
    pub fn sym() -> XName { XName::new(NS, "sym") }
    pub fn object() -> XName { XName::new(NS, "object") }
    pub fn drawing() -> XName { XName::new(NS, "drawing") }
    pub fn pict() -> XName { XName::new(NS, "pict") }
    pub fn sdt() -> XName { XName::new(NS, "sdt") }
    pub fn sdtContent() -> XName { XName::new(NS, "sdtContent") }
    pub fn smartTag() -> XName { XName::new(NS, "smartTag") }
    pub fn bookmarkStart() -> XName { XName::new(NS, "bookmarkStart") }
    pub fn bookmarkEnd() -> XName { XName::new(NS, "bookmarkEnd") }
    pub fn commentRangeStart() -> XName { XName::new(NS, "commentRangeStart") }
    pub fn commentRangeEnd() -> XName { XName::new(NS, "commentRangeEnd") }
    pub fn commentReference() -> XName { XName::new(NS, "commentReference") }
    pub fn footnoteReference() -> XName { XName::new(NS, "footnoteReference") }
    pub fn endnoteReference() -> XName { XName::new(NS, "endnoteReference") }
    pub fn footnotes() -> XName { XName::new(NS, "footnotes") }
    pub fn footnote() -> XName { XName::new(NS, "footnote") }
    pub fn endnotes() -> XName { XName::new(NS, "endnotes") }
    pub fn endnote() -> XName { XName::new(NS, "endnote") }
    pub fn footnoteRef() -> XName { XName::new(NS, "footnoteRef") }
    pub fn endnoteRef() -> XName { XName::new(NS, "endnoteRef") }
    pub fn sectPr() -> XName { XName::new(NS, "sectPr") }
    pub fn rStyle() -> XName { XName::new(NS, "rStyle") }
    pub fn author() -> XName { XName::new(NS, "author") }
    pub fn date() -> XName { XName::new(NS, "date") }
    pub fn id() -> XName { XName::new(NS, "id") }
    pub fn val() -> XName { XName::new(NS, "val") }
    pub fn name() -> XName { XName::new(NS, "name") }
    pub fn type_() -> XName { XName::new(NS, "type") }
}

/// Office Math namespace.
pub mod M {
    use super::XName;
    pub const NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/math";

    pub fn oMath() -> XName { XName::new(NS, "oMath") }
    pub fn oMathPara() -> XName { XName::new(NS, "oMathPara") }
    pub fn t() -> XName { XName::new(NS, "t") }
    pub fn f() -> XName { XName::new(NS, "f") }
    pub fn fPr() -> XName { XName::new(NS, "fPr") }
    pub fn ctrlPr() -> XName { XName::new(NS, "ctrlPr") }
}

/// VML shape namespace.
pub mod V {
    pub const NS: &str = "urn:schemas-microsoft-com:vml";
}

/// VML office extensions.
pub mod O {
    pub const NS: &str = "urn:schemas-microsoft-com:office:office";
}

/// VML word extensions (`w10:wrap`).
pub mod W10 {
    pub const NS: &str = "urn:schemas-microsoft-com:office:word";
}

/// Word 2010 extensions (`w14:paraId`, `w14:textId`).
pub mod W14 {
    pub const NS: &str = "http://schemas.microsoft.com/office/word/2010/wordml";
}

/// Markup-compatibility namespace.
pub mod MC {
    use super::XName;
    pub const NS: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";

    pub fn AlternateContent() -> XName { XName::new(NS, "AlternateContent") }
    pub fn Choice() -> XName { XName::new(NS, "Choice") }
    pub fn Fallback() -> XName { XName::new(NS, "Fallback") }
}

/// Relationship-reference namespace (`r:id`, `r:embed`).
pub mod R {
    use super::XName;
    pub const NS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    pub fn id() -> XName { XName::new(NS, "id") }
    pub fn embed() -> XName { XName::new(NS, "embed") }
}

/// Core-properties namespaces (docProps/core.xml).
pub mod CP {
    pub const NS: &str =
        "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
}

pub mod DC {
    pub const NS: &str = "http://purl.org/dc/elements/1.1/";
}

pub mod DCTERMS {
    pub const NS: &str = "http://purl.org/dc/terms/";
}

/// Internal bookkeeping namespace. Attributes in this namespace exist only
/// between preprocessing and final serialization; they are stripped from
/// output and excluded from every hash.
pub mod BL {
    use super::XName;
    pub const NS: &str = "urn:blackline:bookkeeping";

    pub fn unid() -> XName { XName::new(NS, "unid") }
    pub fn status() -> XName { XName::new(NS, "status") }
    pub fn contentHash() -> XName { XName::new(NS, "contentHash") }
}

/// Canonical prefix for a well-known namespace. Used by the canonical
/// hasher and as the serializer fallback when no in-scope declaration
/// provides a prefix.
pub fn canonical_prefix(namespace: &str) -> &'static str {
    match namespace {
        W::NS => "w",
        M::NS => "m",
        V::NS => "v",
        O::NS => "o",
        W10::NS => "w10",
        W14::NS => "w14",
        MC::NS => "mc",
        R::NS => "r",
        BL::NS => "bl",
        "http://schemas.openxmlformats.org/drawingml/2006/main" => "a",
        "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" => "wp",
        "http://schemas.openxmlformats.org/drawingml/2006/picture" => "pic",
        XMLNS::NS => "xmlns",
        XML::NS => "xml",
        _ => "ns",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_prefixes_cover_wordprocessing_names() {
        assert_eq!(canonical_prefix(W::NS), "w");
        assert_eq!(canonical_prefix(M::NS), "m");
        assert_eq!(canonical_prefix(XML::NS), "xml");
        assert_eq!(canonical_prefix("urn:unknown"), "ns");
    }

    #[test]
    fn qualified_name_constructors() {
        assert!(W::p().is(W::NS, "p"));
        assert!(MC::AlternateContent().is(MC::NS, "AlternateContent"));
        assert!(BL::unid().is(BL::NS, "unid"));
    }
}

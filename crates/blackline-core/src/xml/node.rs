use super::xname::{XAttribute, XName};

/// Node payload stored in the arena. Elements own their attributes as an
/// ordered sequence; serialization order is storage order.
#[derive(Clone, Debug)]
pub enum XmlNode {
    Element {
        name: XName,
        attributes: Vec<XAttribute>,
    },
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

impl XmlNode {
    pub fn element(name: XName) -> Self {
        Self::Element {
            name,
            attributes: Vec::new(),
        }
    }

    pub fn element_with_attrs(name: XName, attributes: Vec<XAttribute>) -> Self {
        Self::Element { name, attributes }
    }

    pub fn text(content: &str) -> Self {
        Self::Text(content.to_string())
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }

    pub fn name(&self) -> Option<&XName> {
        match self {
            Self::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attributes(&self) -> Option<&[XAttribute]> {
        match self {
            Self::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    pub fn attributes_mut(&mut self) -> Option<&mut Vec<XAttribute>> {
        match self {
            Self::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    pub fn attribute(&self, name: &XName) -> Option<&str> {
        self.attributes()?
            .iter()
            .find(|a| &a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn text_content(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::CData(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_reports_its_name() {
        let name = XName::new("http://example.com", "row");
        let node = XmlNode::element(name.clone());
        assert!(node.is_element());
        assert_eq!(node.name(), Some(&name));
    }

    #[test]
    fn attribute_lookup_by_qualified_name() {
        let id = XName::new("http://example.com", "id");
        let node = XmlNode::element_with_attrs(
            XName::local("e"),
            vec![XAttribute::new(id.clone(), "42")],
        );
        assert_eq!(node.attribute(&id), Some("42"));
        assert_eq!(node.attribute(&XName::local("id")), None);
    }

    #[test]
    fn text_content_covers_text_and_cdata() {
        assert_eq!(XmlNode::text("hi").text_content(), Some("hi"));
        assert_eq!(XmlNode::CData("raw".into()).text_content(), Some("raw"));
        assert_eq!(XmlNode::element(XName::local("e")).text_content(), None);
    }
}

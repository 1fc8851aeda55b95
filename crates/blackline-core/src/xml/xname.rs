use std::fmt;

/// Namespace-qualified name. Equality considers both components.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct XName {
    pub namespace: Option<String>,
    pub local: String,
}

impl XName {
    pub fn new(namespace: &str, local: &str) -> Self {
        Self {
            namespace: if namespace.is_empty() {
                None
            } else {
                Some(namespace.to_string())
            },
            local: local.to_string(),
        }
    }

    pub fn local(local: &str) -> Self {
        Self {
            namespace: None,
            local: local.to_string(),
        }
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == Some(namespace)
    }
}

impl fmt::Display for XName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// A name/value pair. Attribute collections are ordered sequences; the
/// parser preserves document order and the writer emits storage order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XAttribute {
    pub name: XName,
    pub value: String,
}

impl XAttribute {
    pub fn new(name: XName, value: &str) -> Self {
        Self {
            name,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_display() {
        let name = XName::new("http://example.com", "p");
        assert_eq!(name.to_string(), "{http://example.com}p");
    }

    #[test]
    fn unqualified_name_display() {
        assert_eq!(XName::local("xmlns").to_string(), "xmlns");
    }

    #[test]
    fn equality_requires_both_components() {
        let a = XName::new("http://example.com", "p");
        let b = XName::new("http://example.org", "p");
        assert_ne!(a, b);
        assert_eq!(a, XName::new("http://example.com", "p"));
    }

    #[test]
    fn is_matches_namespace_and_local() {
        let name = XName::new("http://example.com", "tbl");
        assert!(name.is("http://example.com", "tbl"));
        assert!(!name.is("http://example.com", "tr"));
    }
}

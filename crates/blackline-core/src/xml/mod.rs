pub mod arena;
pub mod namespaces;
pub mod node;
pub mod parser;
pub mod writer;
pub mod xname;

pub use arena::XmlTree;
pub use node::XmlNode;
pub use xname::{XAttribute, XName};

/// Node identifiers are part of the public tree API.
pub use indextree::NodeId;

pub mod error;
pub mod hash;
pub mod package;
pub mod util;
pub mod wml;
pub mod xml;

pub use error::{Error, Result};

pub use wml::{
    accept_revisions, compare, get_revisions, reject_revisions, CompareSettings, Revision,
    RevisionKind, WmlDocument,
};

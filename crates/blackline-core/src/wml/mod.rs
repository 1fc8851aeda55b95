pub mod accept;
pub mod atoms;
pub mod coalesce;
pub mod comparer;
pub mod context;
pub mod correlate;
pub mod document;
pub mod formatting;
pub mod notes;
pub mod order;
pub mod preprocess;
pub mod revisions;
pub mod settings;
pub mod simplify;
pub mod units;

pub use comparer::{accept_revisions, compare, get_revisions, reject_revisions};
pub use document::WmlDocument;
pub use revisions::{Revision, RevisionKind};
pub use settings::CompareSettings;

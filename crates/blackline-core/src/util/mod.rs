pub mod culture;
pub mod group;
pub mod strings;

pub use culture::to_upper_invariant;
pub use group::group_adjacent;
pub use strings::{make_valid_xml, needs_space_preserve};

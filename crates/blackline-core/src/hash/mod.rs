pub mod canonical;
pub mod sha1;

pub use canonical::{canonical_sha1, canonical_text, CanonicalOptions};
pub use sha1::{sha1_hex, sha1_hex_bytes};

//! Locale-invariant case mapping.
//!
//! Case-insensitive hashing must produce identical digests on every
//! platform, so folding goes through ICU's root-locale mapping rather than
//! whatever locale the host process happens to run under.

use icu::casemap::CaseMapper;
use icu::locid::LanguageIdentifier;
use once_cell::sync::Lazy;

static CASE_MAPPER: Lazy<CaseMapper> = Lazy::new(CaseMapper::new);
static ROOT: Lazy<LanguageIdentifier> = Lazy::new(LanguageIdentifier::default);

pub fn to_upper_invariant(s: &str) -> String {
    CASE_MAPPER.uppercase_to_string(s, &ROOT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_uppercases() {
        assert_eq!(to_upper_invariant("hello"), "HELLO");
    }

    #[test]
    fn accents_survive() {
        assert_eq!(to_upper_invariant("café"), "CAFÉ");
    }

    #[test]
    fn dotted_i_stays_invariant() {
        // Root locale: 'i' maps to 'I', never to 'İ'.
        assert_eq!(to_upper_invariant("i"), "I");
    }
}

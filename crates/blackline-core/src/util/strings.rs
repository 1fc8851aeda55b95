/// True when text must carry `xml:space="preserve"` to survive a
/// whitespace-normalizing consumer.
pub fn needs_space_preserve(text: &str) -> bool {
    let first = text.chars().next();
    let last = text.chars().last();
    matches!(first, Some(c) if c.is_whitespace()) || matches!(last, Some(c) if c.is_whitespace())
}

/// Replaces characters outside the XML 1.0 character range with U+FFFD so
/// reconstructed text always serializes.
pub fn make_valid_xml(s: &str) -> String {
    s.chars()
        .map(|c| if is_valid_xml_char(c) { c } else { '\u{FFFD}' })
        .collect()
}

fn is_valid_xml_char(c: char) -> bool {
    matches!(c,
        '\u{0009}' | '\u{000A}' | '\u{000D}'
        | '\u{0020}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

//! Script-based language detection

use crate::types::LanguageTag;

/// Arabic block, which covers Persian letters
const ARABIC_SCRIPT: std::ops::RangeInclusive<char> = '\u{0600}'..='\u{06FF}';

/// Decide the language of a text from the scripts it contains.
///
/// Any Arabic-script code point makes the text Persian; everything else is
/// treated as English.
pub fn detect_language(text: &str) -> LanguageTag {
    if text.chars().any(|c| ARABIC_SCRIPT.contains(&c)) {
        LanguageTag::Fa
    } else {
        LanguageTag::En
    }
}

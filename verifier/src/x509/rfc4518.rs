// Copyright (c) 2023 The MobileCoin Foundation

//! String preparation per [RFC4518](https://www.rfc-editor.org/rfc/rfc4518),
//! used when comparing attribute values of distinguished names.
//!
//! Only the map, normalize and insignificant space steps are performed.
//! Prohibited characters and bidi checks are skipped, such values simply fail
//! to compare equal to well formed ones.

use unicode_normalization::UnicodeNormalization;

/// Code points mapped to nothing, step 2 of
/// <https://www.rfc-editor.org/rfc/rfc4518#section-2.2>.
///
/// The RFC lists FF00-FE0F, which is an empty range, RFC3454 appendix B.1
/// gives FE00-FE0F.
const MAPPED_TO_NOTHING: &[(char, char)] = &[
    ('\u{0000}', '\u{0008}'),
    ('\u{000E}', '\u{001F}'),
    ('\u{007F}', '\u{0084}'),
    ('\u{0086}', '\u{009F}'),
    ('\u{00AD}', '\u{00AD}'),
    ('\u{034F}', '\u{034F}'),
    ('\u{06DD}', '\u{06DD}'),
    ('\u{070F}', '\u{070F}'),
    ('\u{1806}', '\u{1806}'),
    ('\u{180B}', '\u{180E}'),
    ('\u{200B}', '\u{200F}'),
    ('\u{202A}', '\u{202E}'),
    ('\u{2060}', '\u{2063}'),
    ('\u{206A}', '\u{206F}'),
    ('\u{FE00}', '\u{FE0F}'),
    ('\u{FEFF}', '\u{FEFF}'),
    ('\u{FFF9}', '\u{FFFC}'),
    ('\u{1D173}', '\u{1D17A}'),
    ('\u{E0001}', '\u{E0001}'),
    ('\u{E0020}', '\u{E0074}'),
];

/// A prepared attribute value, ready for case folding and comparison
#[derive(Debug, PartialEq)]
pub struct Rfc4518String {
    prepared: String,
}

impl From<&str> for Rfc4518String {
    fn from(value: &str) -> Self {
        let mapped = value.chars().filter_map(mapped_character).nfkc().collect::<String>();
        Self {
            prepared: insignificant_space_handling(&mapped),
        }
    }
}

impl<'a> From<&'a Rfc4518String> for &'a str {
    fn from(value: &'a Rfc4518String) -> &'a str {
        value.prepared.as_str()
    }
}

fn mapped_character(c: char) -> Option<char> {
    // Covers the code points the RFC maps to SPACE
    if c.is_whitespace() {
        Some(' ')
    } else if MAPPED_TO_NOTHING
        .iter()
        .any(|(first, last)| (*first..=*last).contains(&c))
    {
        None
    } else {
        Some(c)
    }
}

/// <https://www.rfc-editor.org/rfc/rfc4518#section-2.6.1>
///
/// The result starts and ends with one space, inner runs of spaces become
/// two spaces.
fn insignificant_space_handling(value: &str) -> String {
    let words = value.split(' ').filter(|word| !word.is_empty());
    let mut prepared = String::from(" ");
    for (i, word) in words.enumerate() {
        if i > 0 {
            prepared.push_str("  ");
        }
        prepared.push_str(word);
    }
    prepared.push(' ');
    prepared
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Keyboard Script Classification
//!
//! Classifies the characters an OS keyboard layout reports into a writing
//! script, using Unicode block ranges. The dominant script of a calibration
//! run names the layout in diagnostics and in the capabilities report.
//!
//! Only blocks that national keyboard layouts actually emit are modeled;
//! anything else classifies as [`KeyboardScript::Unknown`].
//

use std::fmt;

use serde::{Deserialize, Serialize};

/// Writing script of an OS keyboard layout, derived from reported output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyboardScript {
    #[default]
    Latin,
    Greek,
    Cyrillic,
    Armenian,
    Hebrew,
    Arabic,
    Syriac,
    Thaana,
    Devanagari,
    Bengali,
    Gurmukhi,
    Gujarati,
    Oriya,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
    Sinhala,
    Thai,
    Lao,
    Tibetan,
    Myanmar,
    Georgian,
    Ethiopic,
    Cherokee,
    Khmer,
    Mongolian,
    GreekExtended,
    Unknown,
}

impl fmt::Display for KeyboardScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Latin => "Latin",
            Self::Greek => "Greek",
            Self::Cyrillic => "Cyrillic",
            Self::Armenian => "Armenian",
            Self::Hebrew => "Hebrew",
            Self::Arabic => "Arabic",
            Self::Syriac => "Syriac",
            Self::Thaana => "Thaana",
            Self::Devanagari => "Devanagari",
            Self::Bengali => "Bengali",
            Self::Gurmukhi => "Gurmukhi",
            Self::Gujarati => "Gujarati",
            Self::Oriya => "Oriya",
            Self::Tamil => "Tamil",
            Self::Telugu => "Telugu",
            Self::Kannada => "Kannada",
            Self::Malayalam => "Malayalam",
            Self::Sinhala => "Sinhala",
            Self::Thai => "Thai",
            Self::Lao => "Lao",
            Self::Tibetan => "Tibetan",
            Self::Myanmar => "Myanmar",
            Self::Georgian => "Georgian",
            Self::Ethiopic => "Ethiopic",
            Self::Cherokee => "Cherokee",
            Self::Khmer => "Khmer",
            Self::Mongolian => "Mongolian",
            Self::GreekExtended => "Greek Extended",
            Self::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

//
// Block table. Ranges are inclusive and ordered by start codepoint so the
// lookup can stop at the first range whose start exceeds the probe.
//
const BLOCKS: &[(u32, u32, KeyboardScript)] = &[
    (0x0041, 0x005a, KeyboardScript::Latin),
    (0x0061, 0x007a, KeyboardScript::Latin),
    (0x00c0, 0x024f, KeyboardScript::Latin),
    (0x0370, 0x03ff, KeyboardScript::Greek),
    (0x0400, 0x04ff, KeyboardScript::Cyrillic),
    (0x0500, 0x052f, KeyboardScript::Cyrillic),
    (0x0530, 0x058f, KeyboardScript::Armenian),
    (0x0590, 0x05ff, KeyboardScript::Hebrew),
    (0x0600, 0x06ff, KeyboardScript::Arabic),
    (0x0700, 0x074f, KeyboardScript::Syriac),
    (0x0750, 0x077f, KeyboardScript::Arabic),
    (0x0780, 0x07bf, KeyboardScript::Thaana),
    (0x0900, 0x097f, KeyboardScript::Devanagari),
    (0x0980, 0x09ff, KeyboardScript::Bengali),
    (0x0a00, 0x0a7f, KeyboardScript::Gurmukhi),
    (0x0a80, 0x0aff, KeyboardScript::Gujarati),
    (0x0b00, 0x0b7f, KeyboardScript::Oriya),
    (0x0b80, 0x0bff, KeyboardScript::Tamil),
    (0x0c00, 0x0c7f, KeyboardScript::Telugu),
    (0x0c80, 0x0cff, KeyboardScript::Kannada),
    (0x0d00, 0x0d7f, KeyboardScript::Malayalam),
    (0x0d80, 0x0dff, KeyboardScript::Sinhala),
    (0x0e00, 0x0e7f, KeyboardScript::Thai),
    (0x0e80, 0x0eff, KeyboardScript::Lao),
    (0x0f00, 0x0fff, KeyboardScript::Tibetan),
    (0x1000, 0x109f, KeyboardScript::Myanmar),
    (0x10a0, 0x10ff, KeyboardScript::Georgian),
    (0x1200, 0x137f, KeyboardScript::Ethiopic),
    (0x13a0, 0x13ff, KeyboardScript::Cherokee),
    (0x1780, 0x17ff, KeyboardScript::Khmer),
    (0x1800, 0x18af, KeyboardScript::Mongolian),
    (0x1e00, 0x1eff, KeyboardScript::Latin),
    (0x1f00, 0x1fff, KeyboardScript::GreekExtended),
    (0x2c60, 0x2c7f, KeyboardScript::Latin),
    (0xa720, 0xa7ff, KeyboardScript::Latin),
];

/// Script of a single character, if it belongs to a modeled block.
///
/// ASCII digits, punctuation, and controls carry no script information and
/// return `None`.
#[must_use]
pub fn classify(c: char) -> Option<KeyboardScript> {
    let n = c as u32;
    for &(start, end, script) in BLOCKS {
        if n < start {
            return None;
        }
        if n <= end {
            return Some(script);
        }
    }
    None
}

/// Dominant script over a set of reported characters.
///
/// Layouts that only emit ASCII count as Latin. Ties resolve to the script
/// observed first, which keeps the answer deterministic for a fixed
/// reporting order.
#[must_use]
pub fn dominant_script<I>(reported: I) -> KeyboardScript
where
    I: IntoIterator<Item = char>,
{
    let mut counts: Vec<(KeyboardScript, usize)> = Vec::new();
    for c in reported {
        let Some(script) = classify(c) else { continue };
        match counts.iter_mut().find(|(s, _)| *s == script) {
            Some((_, n)) => *n += 1,
            None => counts.push((script, 1)),
        }
    }
    counts
        .iter()
        .max_by_key(|(_, n)| *n)
        .map_or(KeyboardScript::Latin, |(s, _)| *s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_letters_are_latin() {
        assert_eq!(classify('a'), Some(KeyboardScript::Latin));
        assert_eq!(classify('Z'), Some(KeyboardScript::Latin));
    }

    #[test]
    fn digits_and_punctuation_carry_no_script() {
        assert_eq!(classify('7'), None);
        assert_eq!(classify(';'), None);
        assert_eq!(classify('\u{1d}'), None);
    }

    #[test]
    fn national_layouts_classify() {
        assert_eq!(classify('é'), Some(KeyboardScript::Latin));
        assert_eq!(classify('ж'), Some(KeyboardScript::Cyrillic));
        assert_eq!(classify('λ'), Some(KeyboardScript::Greek));
        assert_eq!(classify('א'), Some(KeyboardScript::Hebrew));
        assert_eq!(classify('ก'), Some(KeyboardScript::Thai));
    }

    #[test]
    fn dominant_script_of_mixed_output() {
        let reported = "abч ж д 123".chars();
        assert_eq!(dominant_script(reported), KeyboardScript::Cyrillic);
    }

    #[test]
    fn pure_ascii_defaults_to_latin() {
        assert_eq!(dominant_script("0123456789".chars()), KeyboardScript::Latin);
    }
}

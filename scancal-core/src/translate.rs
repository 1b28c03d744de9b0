// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Runtime Translator
//!
//! Applies the extended translation tables to arbitrary reported scans.
//! Pre-processing first strips the scanner's prefix and suffix and repairs
//! the submit-time flush artefact of ISO/IEC 15434 payloads, then a single
//! left-to-right pass maps the stream: AIM flag, dead key sequences,
//! scanner-side dead keys, ligatures, direct substitutions, and finally a
//! pass-through with an unknown-character sentinel for codepoints the
//! calibration never saw.
//

use crate::chars::{
    is_ascii_control, is_printable_ascii, EOT_CHAR, HT_CHAR, NULL_CHAR, RS_CHAR, UNKNOWN_CHAR,
};
use crate::data::ExtendedData;
use crate::options::{Preprocessor, PreprocessorFault};

/// Translator output: the decoded text plus any pre-processor faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    pub faults: Vec<PreprocessorFault>,
}

/// Translate one reported scan.
#[must_use]
pub fn process_input(
    reported: &str,
    data: &ExtendedData,
    preprocessors: &[Preprocessor],
) -> Translation {
    let mut faults = Vec::new();
    let mut text = reported.replace(HT_CHAR, "");
    for preprocessor in preprocessors {
        text = preprocessor(&text, &mut faults);
    }

    delete_prefix(&mut text, data);
    delete_suffix(&mut text, data, &mut faults);
    repair_flushed_literals(&mut text, data);

    Translation {
        text: map_stream(&text, data),
        faults,
    }
}

/// Remove the reported prefix when it sits where a prefix can sit: within
/// the first few codepoints, leaving room for a leading AIM identifier.
fn delete_prefix(text: &mut String, data: &ExtendedData) {
    if data.reported_prefix.is_empty() {
        return;
    }
    let window = data.aim_flag_sequence.chars().count() + 2;
    if let Some(byte_pos) = text.find(&data.reported_prefix) {
        let char_pos = text[..byte_pos].chars().count();
        if char_pos <= window {
            text.replace_range(byte_pos..byte_pos + data.reported_prefix.len(), "");
        }
    }
}

/// Remove the reported suffix from the tail, trying the locations scanners
/// actually put it: at the absolute end, just before or after a terminal
/// EOT, and after the last RS. An unexpected trailing run is reported but
/// left intact.
fn delete_suffix(text: &mut String, data: &ExtendedData, faults: &mut Vec<PreprocessorFault>) {
    if data.reported_suffix.is_empty() {
        return;
    }
    let suffix = data.reported_suffix.as_str();

    // Absolute end, ignoring a trailing end-of-line.
    let eol_start = text.len() - trailing_eol_len(text);
    if text[..eol_start].ends_with(suffix) {
        text.replace_range(eol_start - suffix.len()..eol_start, "");
        return;
    }

    // Around a terminal EOT (ISO/IEC 15434 formats keep EOT last).
    if let Some(eot) = text.rfind(EOT_CHAR) {
        if text[..eot].ends_with(suffix) {
            text.replace_range(eot - suffix.len()..eot, "");
            return;
        }
        let after = eot + EOT_CHAR.len_utf8();
        if text[after..].starts_with(suffix) {
            text.replace_range(after..after + suffix.len(), "");
            return;
        }
    }

    // After the last RS.
    if let Some(rs) = text.rfind(RS_CHAR) {
        let after = rs + RS_CHAR.len_utf8();
        if text[after..].starts_with(suffix) {
            text.replace_range(after..after + suffix.len(), "");
            return;
        }
    }

    // Something else trails the data; leave it, note it.
    let tail_start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| !is_ascii_control(*c))
        .last()
        .map(|(i, _)| i);
    if let Some(start) = tail_start {
        if !text[start..].is_empty() && &text[start..] != suffix {
            faults.push(PreprocessorFault::advisory(
                "a trailing sequence was reported that does not match the calibrated suffix",
            ));
        }
    }
}

fn trailing_eol_len(text: &str) -> usize {
    text.chars()
        .rev()
        .take_while(|&c| c == '\r' || c == '\n')
        .map(char::len_utf8)
        .sum()
}

/// Keyboard buffers flush pending dead keys when a 15434 envelope submits,
/// which can strand the literal behind a run of control characters. Move
/// it back next to its NUL marker.
fn repair_flushed_literals(text: &mut String, data: &ExtendedData) {
    if data.dead_key_character_map.is_empty() {
        return;
    }
    let literals: Vec<char> = data.dead_key_character_map.values().copied().collect();
    let chars: Vec<char> = text.chars().collect();
    let mut out: Vec<char> = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == NULL_CHAR && i + 1 < chars.len() && is_ascii_control(chars[i + 1]) {
            let mut j = i + 1;
            while j < chars.len() && is_ascii_control(chars[j]) && chars[j] != NULL_CHAR {
                j += 1;
            }
            if j > i + 1 && j < chars.len() && literals.contains(&chars[j]) {
                out.push(chars[i]);
                out.push(chars[j]);
                out.extend(&chars[i + 1..j]);
                i = j + 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    *text = out.into_iter().collect();
}

/// The left-to-right mapping pass.
fn map_stream(text: &str, data: &ExtendedData) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;

    // A leading AIM identifier: substitute the calibrated flag sequence.
    let aim = &data.aim_flag_sequence;
    if !aim.is_empty() && *aim != "]" && *aim != "\u{0}" {
        let flag: Vec<char> = aim.chars().collect();
        if chars.len() >= flag.len() && chars[..flag.len()] == flag[..] {
            out.push(']');
            i = flag.len();
        }
    }

    while i < chars.len() {
        let c = chars[i];

        // Space and end-of-line pass through untouched.
        if c == ' ' || c == '\r' || c == '\n' {
            out.push(c);
            i += 1;
            continue;
        }

        if c == NULL_CHAR {
            // Three-codepoint dead key forms first (literal-plus-space and
            // chained keys), then the common pair.
            if i + 2 < chars.len() {
                let key: String = chars[i..i + 3].iter().collect();
                if let Some(value) = data.dead_keys_map.get(&key) {
                    out.push_str(value);
                    i += 3;
                    continue;
                }
            }
            if i + 1 < chars.len() {
                let key: String = chars[i..i + 2].iter().collect();
                if let Some(value) = data.dead_keys_map.get(&key) {
                    out.push_str(value);
                    i += 2;
                    continue;
                }
                // A scanner-side dead key whose OS twin is dead reports the
                // same NUL-led pair.
                let pair: String = chars[i..i + 2].iter().collect();
                if let Some((&expected, _)) = data
                    .scanner_dead_keys_map
                    .iter()
                    .find(|(_, reported)| **reported == pair)
                {
                    out.push(expected);
                    i += 2;
                    continue;
                }
            }
            // A bare NUL may carry a control mapping.
            if let Some(&mapped) = data.character_map.get(&NULL_CHAR) {
                out.push(mapped);
            }
            i += 1;
            continue;
        }

        // Scanner-side dead key with an ordinary OS twin: character plus
        // the literal-producing space.
        if i + 1 < chars.len() && chars[i + 1] == ' ' {
            let pair = format!("{c} ");
            if let Some((&expected, _)) = data
                .scanner_dead_keys_map
                .iter()
                .find(|(_, reported)| **reported == pair)
            {
                out.push(expected);
                i += 2;
                continue;
            }
        }

        // Longest ligature prefix.
        if let Some((key, &expected)) = data
            .ligature_map
            .iter()
            .filter(|(key, _)| chars[i..].starts_with(&key.chars().collect::<Vec<_>>()))
            .max_by_key(|(key, _)| key.chars().count())
        {
            out.push(expected);
            i += key.chars().count();
            continue;
        }

        if let Some(&mapped) = data.character_map.get(&c) {
            out.push(mapped);
            i += 1;
            continue;
        }

        if data.line_feed_character == Some(c) {
            out.push('\n');
            i += 1;
            continue;
        }

        if data.invert_case && c.is_ascii_alphabetic() {
            out.push(flip_case(c));
            i += 1;
            continue;
        }

        // Pass through anything the calibration saw, any control, and any
        // printable ASCII; everything else is unknown.
        if data.reported_characters.is_empty()
            || data.reported_characters.contains(&c)
            || is_ascii_control(c)
            || is_printable_ascii(c)
        {
            out.push(c);
        } else {
            out.push(UNKNOWN_CHAR);
        }
        i += 1;
    }

    out
}

fn flip_case(c: char) -> char {
    if c.is_ascii_uppercase() {
        c.to_ascii_lowercase()
    } else {
        c.to_ascii_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> ExtendedData {
        let mut data = ExtendedData::new();
        data.aim_flag_sequence = "]".into();
        for c in "0123456789]dabcqé&\u{1d}".chars() {
            data.reported_characters.insert(c);
        }
        data
    }

    #[test]
    fn identity_tables_pass_data_through() {
        let translation = process_input("]d2123456", &data(), &[]);
        assert_eq!(translation.text, "]d2123456");
        assert!(translation.faults.is_empty());
    }

    #[test]
    fn substitutions_apply() {
        let mut data = data();
        data.character_map.insert('&', '1');
        data.character_map.insert('é', '2');
        let translation = process_input("&é", &data, &[]);
        assert_eq!(translation.text, "12");
    }

    #[test]
    fn dead_key_pairs_map_to_their_sequences() {
        let mut data = data();
        data.dead_keys_map.insert("\u{0}'".into(), "'".into());
        let translation = process_input("\u{0}'A", &data, &[]);
        assert_eq!(translation.text, "'A");
    }

    #[test]
    fn prefix_is_deleted_only_near_the_front() {
        let mut data = data();
        data.reported_prefix = ">".into();
        let translation = process_input(">]d2123", &data, &[]);
        assert_eq!(translation.text, "]d2123");

        // Deep in the data the same character is payload, not prefix.
        let translation = process_input("12345>678", &data, &[]);
        assert_eq!(translation.text, "12345>678");
    }

    #[test]
    fn suffix_is_deleted_from_the_tail() {
        let mut data = data();
        data.reported_suffix = "XY".into();
        let translation = process_input("123XY", &data, &[]);
        assert_eq!(translation.text, "123");
        let translation = process_input("123XY\r\n", &data, &[]);
        assert_eq!(translation.text, "123\r\n");
    }

    #[test]
    fn suffix_before_terminal_eot_is_deleted() {
        let mut data = data();
        data.reported_suffix = "XY".into();
        let translation = process_input("123XY\u{4}", &data, &[]);
        assert_eq!(translation.text, "123\u{4}");
    }

    #[test]
    fn unexpected_tail_is_advisory_only() {
        let mut data = data();
        data.reported_suffix = "XY".into();
        let translation = process_input("123\u{1d}45QQ", &data, &[]);
        assert_eq!(translation.text, "123\u{1d}45QQ");
        assert_eq!(translation.faults.len(), 1);
        assert!(!translation.faults[0].fatal);
    }

    #[test]
    fn flushed_literal_returns_to_its_marker() {
        let mut data = data();
        data.dead_key_character_map.insert("\u{0}'".into(), '\'');
        data.dead_keys_map.insert("\u{0}'".into(), "'".into());
        // The literal was flushed behind two group separators.
        let translation = process_input("\u{0}\u{1d}\u{1d}'", &data, &[]);
        assert_eq!(translation.text, "'\u{1d}\u{1d}");
    }

    #[test]
    fn case_inversion_restores_letter_case() {
        let mut data = data();
        data.invert_case = true;
        let translation = process_input("ABCdef", &data, &[]);
        assert_eq!(translation.text, "abcDEF");
    }

    #[test]
    fn unknown_characters_become_the_sentinel() {
        let translation = process_input("1ø2", &data(), &[]);
        assert_eq!(translation.text, format!("1{UNKNOWN_CHAR}2"));
    }

    #[test]
    fn preprocessors_run_first_and_can_report_faults() {
        fn upper(input: &str, faults: &mut Vec<PreprocessorFault>) -> String {
            faults.push(PreprocessorFault::advisory("upper-cased"));
            input.to_ascii_uppercase()
        }
        let translation = process_input("abc", &data(), &[upper]);
        assert_eq!(translation.text, "ABC");
        assert_eq!(translation.faults.len(), 1);
    }
}

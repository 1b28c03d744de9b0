// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Reported-Stream Segmenter
//!
//! Splits one reported baseline scan into the structure the analysers
//! consume: a scanner prefix, one list of reported sequences per payload
//! segment, and a scanner suffix.
//!
//! The payload separates sequences with single spaces and segments with
//! four-space delimiters. An OS dead key swallows the space that follows
//! it, so a delimiter behind a dead key arrives as three spaces; every
//! delimiter hidden in a space run is therefore rewritten to a temporary
//! stand-in character before splitting. Spaces left over after the
//! delimiters are accounted for are separator content and stay literal,
//! so a character that went dark next to a segment boundary still leaves
//! an empty sequence slot behind. The stand-in is chosen from 0x80..=0xFF
//! and must not occur anywhere in the reported data.
//

use std::fmt;

use crate::chars::{is_ascii_control, is_probed_control, HT_CHAR, NULL_CHAR};
use crate::patterns::ScanPattern;
use crate::payload::probed_controls;

/// One reported encoding of one expected character.
pub type Sequence = Vec<char>;

/// End-of-line transmission observed at the tail of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndOfLine {
    #[default]
    None,
    CarriageReturn,
    LineFeed,
    CrLf,
    LfCr,
}

impl EndOfLine {
    /// True when the scanner transmits any end-of-line sequence.
    #[must_use]
    pub fn is_transmitted(self) -> bool {
        self != Self::None
    }
}

/// Segmentation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentError {
    /// Every codepoint in 0x80..=0xFF occurs in the data; no temporary
    /// delimiter stand-in is available.
    NoTemporaryDelimiterCandidate,
    /// Too few segments; the data cannot be a baseline scan.
    UnrecognisedData,
    /// The boundary between scanner prefix and payload was destroyed and
    /// no reported prefix was declared.
    NoDelimiters,
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTemporaryDelimiterCandidate => {
                write!(f, "no unused temporary delimiter codepoint in 0x80..=0xFF")
            }
            Self::UnrecognisedData => write!(f, "reported data does not segment as a baseline scan"),
            Self::NoDelimiters => {
                write!(f, "prefix boundary not found and no reported prefix declared")
            }
        }
    }
}

impl std::error::Error for SegmentError {}

/// A segmented baseline scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentedScan {
    /// Raw scanner prefix (declared prefix included when one was given).
    pub prefix: String,
    /// Reported sequences per payload segment: index 0 holds the invariant
    /// segment, index 1 the additional ASCII segment, then one segment per
    /// probed control.
    pub segments: Vec<Vec<Sequence>>,
    /// Raw scanner suffix.
    pub suffix: String,
    /// End-of-line sequence stripped from the tail.
    pub end_of_line: EndOfLine,
    /// Control character standing in for LF when the tail carried one that
    /// is not CR or LF.
    pub line_feed_character: Option<char>,
}

/// Segment a reported baseline scan.
///
/// `declared_prefix` is stripped verbatim when the caller has told us what
/// the scanner emits ahead of the data; it is still reported back as part
/// of the captured prefix.
pub fn segmentize(
    reported: &str,
    declared_prefix: &str,
    format_assessment: bool,
) -> Result<SegmentedScan, SegmentError> {
    let mut text = reported.to_string();

    // Trailing end-of-line, then a possible non-CR/LF stand-in for LF.
    let mut end_of_line = EndOfLine::None;
    if let Some(found) = ScanPattern::TrailingEndOfLine.regex().find(&text) {
        end_of_line = classify_end_of_line(found.as_str());
        let start = found.start();
        text.truncate(start);
    }
    let mut line_feed_character = None;
    if end_of_line == EndOfLine::None {
        if let Some(last) = text.chars().last() {
            if is_ascii_control(last)
                && !is_probed_control(last)
                && last != NULL_CHAR
                && last != HT_CHAR
            {
                line_feed_character = Some(last);
                text.pop();
            }
        }
    }

    // Declared scanner prefix comes off verbatim.
    let mut prefix = String::new();
    if !declared_prefix.is_empty() {
        if let Some(rest) = text.strip_prefix(declared_prefix) {
            prefix.push_str(declared_prefix);
            text = rest.to_string();
        }
    }

    // A delimiter stand-in codepoint that does not occur anywhere in the
    // data.
    let holder = (0x80u32..=0xff)
        .filter_map(char::from_u32)
        .find(|&c| !text.contains(c))
        .ok_or(SegmentError::NoTemporaryDelimiterCandidate)?;

    // Rewrite delimiter runs. A run of n >= 3 spaces hides one delimiter
    // per four spaces, less one space per delimiter a dead key swallowed,
    // so n spaces decompose into (n + 1) / 4 delimiters. Spaces left over
    // stay literal: they are sequence separators stranded by a character
    // that went dark at a segment boundary, and they must still split into
    // an empty sequence slot.
    let normalised = {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for found in ScanPattern::DelimiterRun.regex().find_iter(&text) {
            out.push_str(&text[last..found.start()]);
            let n = found.as_str().len();
            let delimiters = (n + 1) / 4;
            for _ in 0..delimiters {
                out.push(holder);
            }
            for _ in 0..n.saturating_sub(4 * delimiters) {
                out.push(' ');
            }
            last = found.end();
        }
        out.push_str(&text[last..]);
        out
    };

    // Split segments on the stand-in.
    let raw: Vec<&str> = normalised.split(holder).collect();
    let body = 2 + probed_controls(format_assessment).len();
    if raw.len() < 3 {
        return Err(SegmentError::UnrecognisedData);
    }
    if raw.len() < body + 2 {
        return Err(if raw.len() == body + 1 && declared_prefix.is_empty() {
            SegmentError::NoDelimiters
        } else {
            SegmentError::UnrecognisedData
        });
    }

    prefix.push_str(raw[0]);

    let segments: Vec<Vec<Sequence>> = raw[1..=body]
        .iter()
        .map(|fragment| {
            fragment
                .split(' ')
                .map(|seq| seq.chars().collect())
                .collect()
        })
        .collect();

    // Anything past the payload belongs to the scanner suffix; fold extra
    // fragments back together with a plain delimiter.
    let suffix = raw[body + 1..].join("   ");

    Ok(SegmentedScan {
        prefix,
        segments,
        suffix,
        end_of_line,
        line_feed_character,
    })
}

fn classify_end_of_line(run: &str) -> EndOfLine {
    let has_cr = run.contains('\r');
    let has_lf = run.contains('\n');
    match (has_cr, has_lf) {
        (true, true) => {
            if run.starts_with('\r') {
                EndOfLine::CrLf
            } else {
                EndOfLine::LfCr
            }
        }
        (true, false) => EndOfLine::CarriageReturn,
        (false, true) => EndOfLine::LineFeed,
        (false, false) => EndOfLine::None,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::chars::{GS_CHAR, INVARIANTS};
    use crate::payload::baseline_payload;

    fn identity_scan(suffix: &str) -> String {
        format!("{}{}", baseline_payload(true), suffix)
    }

    #[test]
    fn identity_scan_segments_cleanly() {
        let scan = segmentize(&identity_scan(""), "", true).unwrap();
        assert_eq!(scan.prefix, "");
        assert_eq!(scan.suffix, "");
        assert_eq!(scan.segments.len(), 7);
        assert_eq!(scan.segments[0].len(), 82);
        assert_eq!(scan.segments[1].len(), 12);
        assert_eq!(scan.segments[2], vec![vec![GS_CHAR]]);
        let reported: String = scan.segments[0].iter().flatten().collect();
        assert_eq!(reported, INVARIANTS);
    }

    #[test]
    fn crlf_tail_is_recorded_and_stripped() {
        let scan = segmentize(&identity_scan("\r\n"), "", true).unwrap();
        assert_eq!(scan.end_of_line, EndOfLine::CrLf);
        assert_eq!(scan.suffix, "");
        assert_eq!(scan.line_feed_character, None);
    }

    #[test]
    fn residual_control_tail_is_the_line_feed_stand_in() {
        let scan = segmentize(&identity_scan("\u{6}"), "", true).unwrap();
        assert_eq!(scan.end_of_line, EndOfLine::None);
        assert_eq!(scan.line_feed_character, Some('\u{6}'));
    }

    #[test]
    fn scanner_prefix_lands_in_segment_zero() {
        let reported = format!(">A{}", baseline_payload(true));
        let scan = segmentize(&reported, "", true).unwrap();
        assert_eq!(scan.prefix, ">A");
        assert_eq!(scan.segments[0].len(), 82);
    }

    #[test]
    fn declared_prefix_with_spaces_is_honoured() {
        let reported = format!("P X {}", baseline_payload(true));
        let scan = segmentize(&reported, "P X ", true).unwrap();
        assert_eq!(scan.prefix, "P X ");
    }

    #[test]
    fn scanner_suffix_is_captured_and_folded() {
        let scan = segmentize(&identity_scan("QRS    TU"), "", true).unwrap();
        assert_eq!(scan.suffix, "QRS   TU");
    }

    #[test]
    fn dead_key_swallowed_delimiter_still_splits() {
        // An OS dead key at the end of the invariant segment eats one
        // delimiter space.
        let payload = baseline_payload(true);
        let tampered = payload.replacen("z    #", "\u{0}z   #", 1);
        let scan = segmentize(&tampered, "", true).unwrap();
        assert_eq!(scan.segments[0].len(), 82);
        let last = scan.segments[0].last().unwrap();
        assert_eq!(last, &vec!['\u{0}', 'z']);
    }

    #[test]
    fn unassigned_character_gap_spills_into_the_next_segment() {
        // The final invariant went dark: its separator joins the delimiter
        // run and surfaces as an empty slot at the front of the following
        // segment, where realignment can shed it against the count.
        let payload = baseline_payload(true);
        let tampered = payload.replacen(" z    #", "     #", 1);
        let scan = segmentize(&tampered, "", true).unwrap();
        assert_eq!(scan.segments[0].len(), 81);
        assert_eq!(scan.segments[1].len(), 13);
        assert!(scan.segments[1][0].is_empty());
    }

    #[test]
    fn unassigned_first_character_keeps_its_slot() {
        // The first invariant went dark: the separator it leaves behind
        // must stay an empty slot at the front of the invariant segment,
        // not shift every other character down by one.
        let payload = baseline_payload(true);
        let tampered = payload.replacen("    ! \"", "     \"", 1);
        let scan = segmentize(&tampered, "", true).unwrap();
        assert_eq!(scan.prefix, "");
        assert_eq!(scan.segments[0].len(), 82);
        assert!(scan.segments[0][0].is_empty());
        assert_eq!(scan.segments[0][1], vec!['"']);
    }

    #[test]
    fn unassigned_control_leaves_an_empty_segment() {
        // GS went dark: two delimiters collapse into one eight-space run,
        // which must still split into two with an empty segment between.
        let payload = baseline_payload(true);
        let tampered = payload.replacen("    \u{1d}    ", "        ", 1);
        let scan = segmentize(&tampered, "", true).unwrap();
        assert_eq!(scan.segments.len(), 7);
        assert_eq!(scan.segments[2], vec![Vec::<char>::new()]);
        // The record separator segment is undisturbed.
        assert_eq!(scan.segments[3], vec![vec!['\u{1e}']]);
    }

    #[test]
    fn garbage_fails_as_unrecognised() {
        assert_eq!(
            segmentize("no calibration here", "", true),
            Err(SegmentError::UnrecognisedData)
        );
    }

    #[test]
    fn destroyed_prefix_boundary_without_declaration_fails() {
        // The leading delimiter never arrives intact, so the prefix runs
        // straight into the invariant segment.
        let reported = format!("P  {}", baseline_payload(true).trim_start());
        let result = segmentize(&reported, "", true);
        assert_eq!(result, Err(SegmentError::NoDelimiters));
    }
}

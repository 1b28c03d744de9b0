// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # ASCII Control Character Assessment
//!
//! Each probed control (GS always; RS, FS, US, EOT under format
//! assessment) occupies its own baseline segment. The reported form decides
//! whether barcodes carrying that control can be read at all, read via a
//! mapping, or only read unreliably.
//!
//! Several controls can collapse onto the single reported NUL slot; the
//! priority GS > RS > EOT > FS > US keeps the mapping most valuable for
//! GS1 and ISO/IEC 15434 reading.
//

use crate::chars::{
    is_invariant, visualized, EOT_CHAR, FS_CHAR, GS_CHAR, NULL_CHAR, RS_CHAR, US_CHAR,
};
use crate::data::MappingOutcome;
use crate::diagnostics::EventCode;
use crate::payload::probed_controls;
use crate::segment::SegmentedScan;
use crate::token::CalibrationToken;

use super::SessionState;

/// NUL-slot contention order.
const NUL_PRIORITY: [char; 5] = [GS_CHAR, RS_CHAR, EOT_CHAR, FS_CHAR, US_CHAR];

/// Analyse the control segments of a baseline scan.
pub fn analyse(
    scan: &SegmentedScan,
    format_assessment: bool,
    token: &mut CalibrationToken,
    state: &mut SessionState,
) {
    let mut nul_claims: Vec<char> = Vec::new();

    for (i, &control) in probed_controls(format_assessment).iter().enumerate() {
        let Some(segment) = scan.segments.get(2 + i) else {
            not_readable(control, token, state);
            continue;
        };
        let seq: Vec<char> = segment.iter().flatten().copied().collect();
        log::trace!(
            "control segment {}: reported {:?}",
            visualized(&control.to_string()),
            visualized(&seq.iter().collect::<String>())
        );

        match seq.as_slice() {
            [] => not_readable(control, token, state),
            [c] if *c == control => {
                supported(control, token);
            }
            [c] if *c == NULL_CHAR => nul_claims.push(control),
            [c] if is_invariant(*c) => invariant_ambiguity(control, *c, token, state),
            [c] => {
                match state.data.insert_mapping(*c, control) {
                    MappingOutcome::InvariantCollision | MappingOutcome::KeptExisting => {
                        not_reliably_readable(control, token, state);
                    }
                    _ => supported(control, token),
                }
            }
            [n, x] if *n == NULL_CHAR && *x != NULL_CHAR => {
                dead_key_form(control, *x, token, state);
            }
            seq if seq[0] != NULL_CHAR => {
                let key: String = seq.iter().collect();
                if state.data.ligature_map.contains_key(&key) {
                    not_reliably_readable(control, token, state);
                } else {
                    state.data.ligature_map.insert(key, control);
                    supported(control, token);
                }
            }
            _ => not_reliably_readable(control, token, state),
        }
    }

    resolve_nul_claims(&nul_claims, token, state);

    if state.unreadable_fs && state.unreadable_us {
        token.log(EventCode::IsoIec15434EdiNotReliablyReadable);
    }
}

/// A control reported as an OS dead key sequence.
fn dead_key_form(control: char, x: char, token: &mut CalibrationToken, state: &mut SessionState) {
    let key = format!("{NULL_CHAR}{x}");
    match state.data.dead_keys_map.get(&key) {
        None => {
            state.data.dead_keys_map.insert(key, control.to_string());
            supported(control, token);
        }
        Some(existing) if existing.len() == 1 => {
            let existing_char = existing.chars().next().unwrap_or(control);
            if existing_char == control {
                supported(control, token);
            } else if NUL_PRIORITY.contains(&existing_char) {
                // Two controls share the same dead key report; the higher
                // priority one keeps the slot.
                if wins(control, existing_char) {
                    state.data.dead_keys_map.insert(key, control.to_string());
                    supported(control, token);
                    not_reliably_readable(existing_char, token, state);
                } else {
                    not_reliably_readable(control, token, state);
                }
            } else if is_invariant(existing_char) {
                invariant_ambiguity(control, existing_char, token, state);
            } else {
                state.data.dead_keys_map.insert(key, control.to_string());
                supported(control, token);
            }
        }
        Some(_) => not_reliably_readable(control, token, state),
    }
}

/// Resolve the controls that all reported as a bare NUL.
fn resolve_nul_claims(claims: &[char], token: &mut CalibrationToken, state: &mut SessionState) {
    if claims.is_empty() {
        return;
    }
    let winner = NUL_PRIORITY
        .iter()
        .copied()
        .find(|c| claims.contains(c))
        .unwrap_or(claims[0]);

    match state.data.insert_mapping(NULL_CHAR, winner) {
        MappingOutcome::Inserted | MappingOutcome::Unchanged => supported(winner, token),
        _ => not_reliably_readable(winner, token, state),
    }
    for &loser in claims.iter().filter(|&&c| c != winner) {
        not_reliably_readable(loser, token, state);
    }
}

fn wins(challenger: char, incumbent: char) -> bool {
    let rank = |c: char| NUL_PRIORITY.iter().position(|&p| p == c).unwrap_or(usize::MAX);
    rank(challenger) < rank(incumbent)
}

fn supported(control: char, token: &mut CalibrationToken) {
    token.log(match control {
        GS_CHAR => EventCode::GroupSeparatorSupported,
        RS_CHAR => EventCode::RecordSeparatorSupported,
        FS_CHAR => EventCode::FileSeparatorSupported,
        US_CHAR => EventCode::UnitSeparatorSupported,
        _ => EventCode::EndOfTransmissionSupported,
    });
}

fn not_readable(control: char, token: &mut CalibrationToken, state: &mut SessionState) {
    match control {
        GS_CHAR => token.fail(EventCode::NoGroupSeparatorMapping),
        RS_CHAR => token.log(EventCode::RecordSeparatorNotReadable),
        FS_CHAR => {
            state.unreadable_fs = true;
            token.log(EventCode::FileSeparatorNotReadable);
        }
        US_CHAR => {
            state.unreadable_us = true;
            token.log(EventCode::UnitSeparatorNotReadable);
        }
        _ => token.log(EventCode::EotNotReadable),
    }
}

fn not_reliably_readable(control: char, token: &mut CalibrationToken, state: &mut SessionState) {
    match control {
        // GS holds top priority everywhere; losing the slot means GS1 data
        // cannot be read.
        GS_CHAR => token.fail(EventCode::NoGroupSeparatorMapping),
        RS_CHAR => token.log(EventCode::RecordSeparatorNotReliablyReadable),
        FS_CHAR => {
            state.unreadable_fs = true;
            token.log(EventCode::FileSeparatorNotReliablyReadable);
        }
        US_CHAR => {
            state.unreadable_us = true;
            token.log(EventCode::UnitSeparatorNotReliablyReadable);
        }
        _ => token.log(EventCode::EotNotReliablyReadable),
    }
}

fn invariant_ambiguity(
    control: char,
    reported: char,
    token: &mut CalibrationToken,
    state: &mut SessionState,
) {
    let arg = reported.to_string();
    match control {
        GS_CHAR => token.log_with(EventCode::GroupSeparatorNotReliablyReadableInvariant, &[&arg]),
        RS_CHAR => token.log_with(EventCode::RecordSeparatorNotReliablyReadableInvariant, &[&arg]),
        FS_CHAR => {
            state.unreadable_fs = true;
            token.log_with(EventCode::FileSeparatorNotReliablyReadableInvariant, &[&arg]);
        }
        US_CHAR => {
            state.unreadable_us = true;
            token.log_with(EventCode::UnitSeparatorNotReliablyReadableInvariant, &[&arg]);
        }
        _ => token.log_with(EventCode::EotNotReliablyReadableInvariant, &[&arg]),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::segment::segmentize;

    fn scan_with_controls(gs: &str, rs: &str, fs: &str, us: &str, eot: &str) -> SegmentedScan {
        use crate::chars::{INVARIANTS, NON_INVARIANTS};
        let inv: String = INVARIANTS
            .chars()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let non: String = NON_INVARIANTS
            .chars()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let reported =
            format!("    {inv}    {non}    {gs}    {rs}    {fs}    {us}    {eot}    ");
        segmentize(&reported, "", true).unwrap()
    }

    #[test]
    fn direct_controls_are_supported() {
        let scan = scan_with_controls("\u{1d}", "\u{1e}", "\u{1c}", "\u{1f}", "\u{4}");
        let mut token = CalibrationToken::default();
        let mut state = SessionState::new();
        analyse(&scan, true, &mut token, &mut state);
        assert!(token.diagnostics.contains(EventCode::GroupSeparatorSupported));
        assert!(token.diagnostics.contains(EventCode::EndOfTransmissionSupported));
        assert!(!token.has_errors());
    }

    #[test]
    fn missing_gs_is_fatal() {
        let scan = scan_with_controls("", "\u{1e}", "\u{1c}", "\u{1f}", "\u{4}");
        let mut token = CalibrationToken::default();
        let mut state = SessionState::new();
        analyse(&scan, true, &mut token, &mut state);
        assert!(token.diagnostics.contains(EventCode::NoGroupSeparatorMapping));
        assert!(token.diagnostics.contains(EventCode::CalibrationFailed));
        assert!(!token.calibration_session_abandoned);
    }

    #[test]
    fn nul_slot_prefers_gs_over_the_rest() {
        let scan = scan_with_controls("\u{0}", "\u{0}", "\u{1c}", "\u{1f}", "\u{4}");
        let mut token = CalibrationToken::default();
        let mut state = SessionState::new();
        analyse(&scan, true, &mut token, &mut state);
        assert_eq!(state.data.character_map.get(&NULL_CHAR), Some(&GS_CHAR));
        assert!(token.diagnostics.contains(EventCode::GroupSeparatorSupported));
        assert!(token
            .diagnostics
            .contains(EventCode::RecordSeparatorNotReliablyReadable));
    }

    #[test]
    fn fs_and_us_on_nul_with_free_slot_prefers_fs() {
        let scan = scan_with_controls("\u{1d}", "\u{1e}", "\u{0}", "\u{0}", "\u{4}");
        let mut token = CalibrationToken::default();
        let mut state = SessionState::new();
        analyse(&scan, true, &mut token, &mut state);
        assert_eq!(state.data.character_map.get(&NULL_CHAR), Some(&FS_CHAR));
        assert!(state.unreadable_us);
        assert!(!state.unreadable_fs);
    }

    #[test]
    fn both_edi_separators_dark_raises_the_edi_verdict() {
        let scan = scan_with_controls("\u{1d}", "\u{1e}", "", "", "\u{4}");
        let mut token = CalibrationToken::default();
        let mut state = SessionState::new();
        analyse(&scan, true, &mut token, &mut state);
        assert!(token
            .diagnostics
            .contains(EventCode::IsoIec15434EdiNotReliablyReadable));
    }

    #[test]
    fn invariant_report_is_an_ambiguity() {
        let scan = scan_with_controls("d", "\u{1e}", "\u{1c}", "\u{1f}", "\u{4}");
        let mut token = CalibrationToken::default();
        let mut state = SessionState::new();
        analyse(&scan, true, &mut token, &mut state);
        assert!(token
            .diagnostics
            .contains(EventCode::GroupSeparatorNotReliablyReadableInvariant));
    }

    #[test]
    fn dead_key_control_lands_in_the_dead_keys_map() {
        let scan = scan_with_controls("\u{0}]", "\u{1e}", "\u{1c}", "\u{1f}", "\u{4}");
        let mut token = CalibrationToken::default();
        let mut state = SessionState::new();
        analyse(&scan, true, &mut token, &mut state);
        assert_eq!(
            state.data.dead_keys_map.get("\u{0}]"),
            Some(&GS_CHAR.to_string())
        );
        assert!(token.diagnostics.contains(EventCode::GroupSeparatorSupported));
    }
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Baseline Analyser
//!
//! Walks the segmented baseline scan against the expected payload and
//! builds the first generation of translation tables: direct substitutions,
//! OS dead keys, scanner-side dead keys, ligatures, and the unassigned set.
//! Duplicate reports among invariant characters are fatal; among the
//! additional ASCII characters they downgrade to warnings and lose any
//! collision against an invariant mapping.
//

use std::collections::HashMap;

use crate::chars::{visualized, INVARIANTS, NON_INVARIANTS, NULL_CHAR};
use crate::data::MappingOutcome;
use crate::diagnostics::EventCode;
use crate::options::CalibrationOptions;
use crate::patterns::ScanPattern;
use crate::script::dominant_script;
use crate::segment::{SegmentedScan, Sequence};
use crate::token::CalibrationToken;

use super::case_inference::{self, CaseObservations};
use super::{controls, SessionState};

/// Position of the AIM flag inside the additional ASCII segment.
const AIM_FLAG_INDEX: usize = 5;

/// Outcome flags the keyboard-match decision needs.
#[derive(Debug, Default)]
struct SegmentFindings {
    mismatch: bool,
    case: CaseObservations,
}

/// Analyse a segmented baseline scan.
pub fn analyse(
    scan: &SegmentedScan,
    format_assessment: bool,
    options: &CalibrationOptions,
    token: &mut CalibrationToken,
    state: &mut SessionState,
) {
    log::debug!(
        "baseline analysis: {} segments, prefix {:?}, suffix {:?}",
        scan.segments.len(),
        visualized(&scan.prefix),
        visualized(&scan.suffix)
    );
    state.end_of_line = scan.end_of_line;
    state.data.line_feed_character = scan.line_feed_character;
    capture_affixes(scan, token, state);

    // Invariant and additional ASCII segments.
    let expected_invariants: Vec<char> = INVARIANTS.chars().collect();
    let aligned_invariants = realign(&scan.segments[0], expected_invariants.len());
    let invariant_findings = classify_segment(
        &expected_invariants,
        &aligned_invariants,
        true,
        token,
        state,
    );

    let expected_extra: Vec<char> = NON_INVARIANTS.chars().collect();
    let aligned_extra = realign(&scan.segments[1], expected_extra.len());
    let extra_findings = classify_segment(&expected_extra, &aligned_extra, false, token, state);

    // Control character segments.
    controls::analyse(scan, format_assessment, token, state);

    // Case and CAPS LOCK inference over the invariant letters.
    case_inference::infer(options.caps_lock, options.platform, invariant_findings.case, token);
    if invariant_findings.case.full_inversion() {
        state.data.invert_case = true;
        strip_inversion_entries(state);
    }

    // The AIM flag's reported form.
    state.data.aim_flag_sequence = aim_flag_sequence(&aligned_extra);
    let aim_matches = state.data.aim_flag_sequence == "]";
    if !aim_matches && !state.data.aim_flag_sequence.is_empty() {
        token.log(EventCode::NonCorrespondingKeyboardLayoutsForAimIdentifier);
    }
    if !state.data.aim_flag_sequence.is_empty() && state.data.aim_flag_sequence != "\u{0}" {
        token.log(EventCode::AimSupported);
    }

    state.data.strip_identity_mappings();

    // Keyboard-match decision: the layouts correspond when nothing but the
    // trivial case inversion separates them.
    state.keyboard_match = state.data.character_map.is_empty()
        && state.data.dead_keys_map.is_empty()
        && state.data.ligature_map.is_empty()
        && state.data.scanner_dead_keys_map.is_empty()
        && state.data.scanner_unassigned_keys.is_empty();
    if state.keyboard_match {
        token.log(EventCode::KeyboardLayoutsCorrespond);
    } else {
        token.log(EventCode::NonCorrespondingKeyboardLayouts);
        if invariant_findings.mismatch {
            token.log(EventCode::NonCorrespondingKeyboardLayoutsForInvariants);
        }
        if extra_findings.mismatch {
            token.log(EventCode::NonCorrespondingKeyboardLayoutsForNonInvariants);
        }
    }

    // Layout script and platform, reported for the capabilities matrix.
    if options.assess_script {
        let observed = scan
            .segments
            .iter()
            .flatten()
            .flatten()
            .copied()
            .chain(scan.prefix.chars())
            .chain(scan.suffix.chars());
        state.script = dominant_script(observed);
        token.log_with(EventCode::KeyboardScript, &[&state.script.to_string()]);
    }
    token.log_with(EventCode::Platform, &[&options.platform.to_string()]);

    // Record the reported alphabet.
    for segment in &scan.segments {
        for seq in segment {
            state.data.reported_characters.extend(seq.iter().copied());
        }
    }

    // Normalised affixes, now that the tables exist.
    let prefix = normalize(&state.data.reported_prefix, &state.data);
    let code = normalize(&state.data.reported_code, &state.data);
    let suffix = normalize(&state.data.reported_suffix, &state.data);
    state.data.prefix = prefix;
    state.data.code = code;
    state.data.suffix = suffix;

    // Supplementary work list: one scan per OS dead key discovered among
    // the payload characters.
    let discovered: Vec<(char, char)> = state
        .data
        .dead_key_character_map
        .iter()
        .filter_map(|(key, &literal)| key.chars().nth(1).map(|k| (k, literal)))
        .collect();
    for (key, literal) in discovered {
        state.queue_dead_key(key, literal);
    }
    log::debug!(
        "baseline analysed: {} direct, {} dead key, {} ligature mappings, {} supplementary scan(s) pending",
        state.data.character_map.len(),
        state.data.dead_keys_map.len(),
        state.data.ligature_map.len(),
        state.pending_dead_keys.len()
    );
}

/// Undo the two stream artefacts that break one-sequence-per-character
/// alignment: OS dead keys swallow their separator and merge with the next
/// sequence, and scanner-side dead keys leave an extra empty sequence
/// behind the marker they split into.
fn realign(raw: &[Sequence], expected_len: usize) -> Vec<Sequence> {
    let mut seqs: Vec<Sequence> = Vec::with_capacity(expected_len);
    for seq in raw {
        let mut rest = seq.as_slice();
        while rest.len() > 2
            && rest[0] == NULL_CHAR
            && rest[1] != NULL_CHAR
            && !(rest.len() == 3 && rest[2] == ' ')
        {
            seqs.push(vec![rest[0], rest[1]]);
            rest = &rest[2..];
        }
        seqs.push(rest.to_vec());
    }

    let mut surplus = seqs.len().saturating_sub(expected_len);
    // An empty slot at the very front while the count runs over is the
    // separator a character on the far side of the segment boundary left
    // behind when it went dark; it belongs to the previous segment's
    // tally, not this one's.
    let mut i = 0;
    while surplus > 0 && seqs.get(i).is_some_and(Vec::is_empty) {
        i += 1;
        surplus -= 1;
    }
    let mut merged: Vec<Sequence> = Vec::with_capacity(expected_len);
    while i < seqs.len() {
        let marker_head = !seqs[i].is_empty()
            && seqs[i].last() != Some(&' ')
            && (seqs[i].len() == 1 || (seqs[i].len() == 2 && seqs[i][0] == NULL_CHAR));
        if surplus > 0 && marker_head && seqs.get(i + 1).is_some_and(Vec::is_empty) {
            let mut marker = seqs[i].clone();
            marker.push(' ');
            merged.push(marker);
            i += 2;
            surplus -= 1;
        } else {
            merged.push(seqs[i].clone());
            i += 1;
        }
    }
    merged.resize(expected_len, Vec::new());
    merged
}

/// Classify one aligned segment, populating tables and diagnostics.
fn classify_segment(
    expected: &[char],
    aligned: &[Sequence],
    invariant: bool,
    token: &mut CalibrationToken,
    state: &mut SessionState,
) -> SegmentFindings {
    let mut findings = SegmentFindings::default();
    let mut seen: HashMap<String, char> = HashMap::new();
    let mut undetected: Vec<char> = Vec::new();

    for (&e, seq) in expected.iter().zip(aligned) {
        // Duplicate reported sequences. Scanner dead key markers carry a
        // trailing space, so a marker never collides with the plain form
        // of the same character.
        if !seq.is_empty() {
            let key: String = seq.iter().collect();
            if let Some(&first) = seen.get(&key) {
                if first != e {
                    duplicate_sequence(seq, invariant, token);
                    continue;
                }
            } else {
                seen.insert(key, e);
            }
        }

        match seq.as_slice() {
            [] => {
                state.unassigned_expected.insert(e);
                undetected.push(e);
            }
            [n] if *n == NULL_CHAR => {
                state.unassigned_expected.insert(e);
                undetected.push(e);
            }
            [c] if *c == e => {
                track_case(e, *c, &mut findings.case);
            }
            [c] => {
                findings.mismatch = true;
                track_case(e, *c, &mut findings.case);
                match state.data.insert_mapping(*c, e) {
                    MappingOutcome::InvariantCollision => {
                        token.log_with(EventCode::MultipleKeys, &[&visualized(&c.to_string())]);
                    }
                    MappingOutcome::KeptExisting if !invariant => {
                        token.log_with(
                            EventCode::MultipleKeysNonInvariantCharacters,
                            &[&visualized(&c.to_string())],
                        );
                    }
                    _ => {}
                }
            }
            [n, x] if *n == NULL_CHAR && *x == ' ' => {
                // Scanner-side dead key whose OS twin is unassigned.
                findings.mismatch = true;
                state.data.scanner_unassigned_keys.insert(e);
            }
            [n, x] if *n == NULL_CHAR => {
                // OS dead key.
                findings.mismatch = true;
                let key = format!("{NULL_CHAR}{x}");
                match state.data.insert_dead_key(key.clone(), e.to_string()) {
                    MappingOutcome::InvariantCollision => {
                        token.log_with(
                            EventCode::DeadKeyMultipleKeys,
                            &[&visualized(&key)],
                        );
                    }
                    _ => {
                        state.data.dead_key_character_map.entry(key).or_insert(*x);
                    }
                }
            }
            [c, sp] if *sp == ' ' => {
                // Scanner-side dead key whose OS twin is an ordinary
                // character.
                findings.mismatch = true;
                state.data.scanner_dead_keys_map.insert(e, format!("{c} "));
            }
            [n, x, sp] if *n == NULL_CHAR && *sp == ' ' => {
                // Scanner-side dead key whose OS twin is itself dead.
                findings.mismatch = true;
                state
                    .data
                    .scanner_dead_keys_map
                    .insert(e, format!("{NULL_CHAR}{x}"));
                state
                    .data
                    .dead_keys_map
                    .entry(format!("{NULL_CHAR}{x} "))
                    .or_insert_with(|| e.to_string());
            }
            [n, m, x] if *n == NULL_CHAR && *m == NULL_CHAR => {
                // Chained dead keys on both layouts.
                findings.mismatch = true;
                state
                    .data
                    .scanner_dead_keys_map
                    .insert(e, format!("{NULL_CHAR}{x}"));
                state
                    .data
                    .dead_keys_map
                    .entry(format!("{NULL_CHAR}{NULL_CHAR}{x}"))
                    .or_insert_with(|| e.to_string());
            }
            multi => {
                // A single scanner key that types several characters.
                findings.mismatch = true;
                let key: String = multi.iter().collect();
                if state.data.ligature_map.contains_key(&key) {
                    duplicate_sequence(seq, invariant, token);
                } else {
                    state.data.ligature_map.insert(key, e);
                }
            }
        }
    }

    if !undetected.is_empty() {
        let list: String = undetected.iter().collect();
        if invariant {
            token.fail_with(
                EventCode::UndetectedInvariantCharacters,
                &[&visualized(&list)],
            );
        } else {
            token.log_with(
                EventCode::NonInvariantCharacterUnrecognised,
                &[&visualized(&list)],
            );
        }
    }

    findings
}

fn duplicate_sequence(seq: &Sequence, invariant: bool, token: &mut CalibrationToken) {
    let shown = visualized(&seq.iter().collect::<String>());
    if !invariant {
        token.log_with(EventCode::MultipleKeysNonInvariantCharacters, &[&shown]);
        return;
    }
    let code = match seq.as_slice() {
        [_] => EventCode::MultipleKeys,
        [n, ..] if *n == NULL_CHAR => EventCode::DeadKeyMultipleKeys,
        _ => EventCode::MultipleSequences,
    };
    token.fail_with(code, &[&shown]);
}

fn track_case(expected: char, reported: char, case: &mut CaseObservations) {
    if expected.is_ascii_uppercase() && reported == expected.to_ascii_lowercase() {
        case.upper_reported_lower += 1;
    }
    if expected.is_ascii_lowercase() && reported == expected.to_ascii_uppercase() {
        case.lower_reported_upper += 1;
    }
}

fn strip_inversion_entries(state: &mut SessionState) {
    state
        .data
        .character_map
        .retain(|k, v| !(k.is_ascii_alphabetic() && *v != *k && v.eq_ignore_ascii_case(k)));
}

/// Record prefix, AIM-in-prefix, code, suffix, and end-of-line behaviour.
fn capture_affixes(scan: &SegmentedScan, token: &mut CalibrationToken, state: &mut SessionState) {
    token.reported_prefix_segment = scan.prefix.clone();
    token.reported_suffix = scan.suffix.clone();

    if !scan.prefix.is_empty() {
        if let Some(found) = ScanPattern::AimIdentifier.regex().find(&scan.prefix) {
            token.log_with(EventCode::AimTransmitted, &[&visualized(found.as_str())]);
            state.data.reported_prefix = scan.prefix[..found.start()].to_string();
            state.data.reported_code = scan.prefix[found.end()..].to_string();
            if !state.data.reported_code.is_empty() {
                token.log_with(
                    EventCode::CodeTransmitted,
                    &[&visualized(&state.data.reported_code)],
                );
            }
        } else {
            state.data.reported_prefix = scan.prefix.clone();
        }
        if !state.data.reported_prefix.is_empty() {
            token.log_with(
                EventCode::PrefixTransmitted,
                &[&visualized(&state.data.reported_prefix)],
            );
        }
    }

    if !scan.suffix.is_empty() {
        state.data.reported_suffix = scan.suffix.clone();
        token.log_with(
            EventCode::SuffixTransmitted,
            &[&visualized(&scan.suffix)],
        );
    }

    if scan.end_of_line.is_transmitted() {
        token.log(EventCode::EndOfLineTransmitted);
    }
}

/// Translate a captured affix through the direct map only; affixes never
/// contain dead key sequences worth preserving.
fn normalize(reported: &str, data: &crate::data::ExtendedData) -> String {
    reported
        .chars()
        .map(|c| data.character_map.get(&c).copied().unwrap_or(c))
        .collect()
}

fn aim_flag_sequence(aligned_extra: &[Sequence]) -> String {
    let Some(seq) = aligned_extra.get(AIM_FLAG_INDEX) else {
        return String::new();
    };
    let mut s: String = seq.iter().collect();
    if s.ends_with(' ') {
        s.pop();
    }
    s
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Dead Key Supplementary Analyser
//!
//! A supplementary scan pairs one discovered OS dead key with every
//! printable ASCII character. Pairs that combine (an accented glyph, say)
//! need their own dead key mapping; pairs that do not combine decompose
//! into mappings the baseline already established and carry the literal
//! dead key character, which also powers the substitute-literal heuristic:
//! some layouts type a reminiscent ASCII glyph instead of the real literal
//! after dead-key-plus-space, and the truth is whatever character leads the
//! most pair reports.
//

use std::collections::HashMap;

use crate::chars::{is_invariant, visualized, INVARIANTS, NON_INVARIANTS, NULL_CHAR};
use crate::data::MappingOutcome;
use crate::diagnostics::EventCode;
use crate::elements::ElementRegistry;
use crate::patterns::ScanPattern;
use crate::token::CalibrationToken;

use super::{PendingDeadKey, SessionState};

/// Analyse one supplementary dead key scan.
pub fn analyse(
    reported: &str,
    pending: PendingDeadKey,
    registry: &dyn ElementRegistry,
    token: &mut CalibrationToken,
    state: &mut SessionState,
) {
    let mut text = reported.to_string();
    if let Some(found) = ScanPattern::TrailingEndOfLine.regex().find(&text) {
        let start = found.start();
        text.truncate(start);
    }
    if !state.data.reported_prefix.is_empty() {
        if let Some(rest) = text.strip_prefix(&state.data.reported_prefix) {
            text = rest.to_string();
        }
    }
    if !state.data.reported_suffix.is_empty() {
        if let Some(rest) = text.strip_suffix(&state.data.reported_suffix) {
            text = rest.to_string();
        }
    }
    state.data.reported_characters.extend(text.chars());

    // One chunk per pair; the OS emits NUL at every dead key press, so the
    // NUL is the reliable split point even when sequences sit shoulder to
    // shoulder.
    let chunks: Vec<Vec<char>> = text
        .split(NULL_CHAR)
        .skip(1)
        .map(|chunk| chunk.chars().collect())
        .collect();

    let literal = resolve_literal(&chunks, pending, token, state);
    let dead_char = state
        .data
        .dead_keys_map
        .get(&format!("{NULL_CHAR}{}", pending.key))
        .and_then(|v| v.chars().next())
        .unwrap_or(pending.literal);

    let expected: Vec<char> = INVARIANTS
        .chars()
        .chain(NON_INVARIANTS.chars())
        .filter(|c| !state.unassigned_expected.contains(c))
        .collect();

    let mut lost_invariants: Vec<char> = Vec::new();
    let mut lost_extra: Vec<char> = Vec::new();

    for (i, &c) in expected.iter().enumerate() {
        let Some(chunk) = chunks.get(i) else {
            if is_invariant(c) {
                lost_invariants.push(c);
            } else {
                lost_extra.push(c);
            }
            continue;
        };
        match chunk.as_slice() {
            [] => {
                if is_invariant(c) {
                    lost_invariants.push(c);
                } else {
                    lost_extra.push(c);
                }
            }
            [x] if *x == literal => {
                // The dead key paired with itself collapses to one literal;
                // for any other character, the paired character went dark.
                if c != dead_char && c != literal {
                    if is_invariant(c) {
                        lost_invariants.push(c);
                    } else {
                        lost_extra.push(c);
                    }
                }
            }
            [x] => {
                // The dead key combined with this character.
                let key = format!("{NULL_CHAR}{x}");
                let value = format!("{dead_char}{c}");
                match state.data.insert_dead_key(key.clone(), value) {
                    MappingOutcome::InvariantCollision => {
                        token.fail_with(EventCode::DeadKeyMultiMapping, &[&visualized(&key)]);
                    }
                    MappingOutcome::KeptExisting => {
                        token.log_with(
                            EventCode::DeadKeyMultiMappingNonInvariantCharacters,
                            &[&visualized(&key)],
                        );
                    }
                    _ => {}
                }
            }
            [x, sp] if *sp == ' ' => {
                // Scanner-side dead key surfaced again; keep it recorded.
                state
                    .data
                    .scanner_dead_keys_map
                    .entry(c)
                    .or_insert_with(|| format!("{x} "));
            }
            _ => {
                // Literal plus unmodified character (or a ligature): every
                // piece already translates through the baseline tables.
            }
        }
    }

    if !lost_invariants.is_empty() {
        let list: String = lost_invariants.iter().collect();
        token.fail_with(
            EventCode::UndetectedInvariantCharacters,
            &[&visualized(&list)],
        );
    }
    if !lost_extra.is_empty() {
        let list: String = lost_extra.iter().collect();
        token.log_with(
            EventCode::NonInvariantCharacterUnrecognised,
            &[&visualized(&list)],
        );
    }

    assess_nul_ambiguity(registry, token, state);
}

/// The most frequent leading character across multi-character pair reports
/// is the true dead key literal.
fn resolve_literal(
    chunks: &[Vec<char>],
    pending: PendingDeadKey,
    token: &mut CalibrationToken,
    state: &mut SessionState,
) -> char {
    let mut counts: HashMap<char, usize> = HashMap::new();
    for chunk in chunks {
        if chunk.len() >= 2 {
            *counts.entry(chunk[0]).or_insert(0) += 1;
        }
    }
    let Some((&literal, _)) = counts
        .iter()
        .max_by_key(|&(&c, &n)| (n, u32::MAX - c as u32))
    else {
        return pending.literal;
    };

    if literal != pending.literal {
        let nominal_key = format!("{NULL_CHAR}{}", pending.key);
        if let Some(target) = state.data.dead_keys_map.get(&nominal_key).cloned() {
            state
                .data
                .dead_keys_map
                .entry(format!("{NULL_CHAR}{literal}"))
                .or_insert(target);
        }
        state.data.dead_key_character_map.insert(nominal_key, literal);
        token.log_with(
            EventCode::DeadKeyLiteralIdentified,
            &[&visualized(&literal.to_string())],
        );
    }
    literal
}

/// A control owns the bare NUL slot while dead key sequences also lead
/// with NUL. The clash only matters when a dead key report could swallow
/// the first character of a recognised data-element identifier right after
/// that control.
fn assess_nul_ambiguity(
    registry: &dyn ElementRegistry,
    token: &mut CalibrationToken,
    state: &mut SessionState,
) {
    if !state.data.character_map.contains_key(&NULL_CHAR) {
        return;
    }
    let offenders: Vec<String> = state
        .data
        .dead_keys_map
        .keys()
        .filter(|key| {
            key.chars().count() == 2
                && key
                    .chars()
                    .nth(1)
                    .is_some_and(|x| registry.is_identifier_start(x))
        })
        .cloned()
        .collect();
    for key in offenders {
        token.fail_with(EventCode::DeadKeyMultiMapping, &[&visualized(&key)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::BuiltinElements;

    fn combined(c: char) -> Option<char> {
        Some(match c {
            'a' => 'á',
            'e' => 'é',
            'i' => 'í',
            'o' => 'ó',
            'u' => 'ú',
            _ => return None,
        })
    }

    /// Simulate scanning a supplementary payload for the apostrophe dead
    /// key on a layout that combines with vowels.
    fn simulated_scan(state: &SessionState, literal: char) -> String {
        let mut reported = String::new();
        for c in INVARIANTS.chars().chain(NON_INVARIANTS.chars()) {
            if state.unassigned_expected.contains(&c) {
                continue;
            }
            reported.push(NULL_CHAR);
            match combined(c) {
                Some(x) => reported.push(x),
                None => {
                    reported.push(literal);
                    reported.push(c);
                }
            }
        }
        reported
    }

    fn seeded_state() -> SessionState {
        let mut state = SessionState::new();
        state
            .data
            .dead_keys_map
            .insert(format!("{NULL_CHAR}'"), "'".to_string());
        state
            .data
            .dead_key_character_map
            .insert(format!("{NULL_CHAR}'"), '\'');
        state
    }

    fn pending() -> PendingDeadKey {
        PendingDeadKey {
            key: '\'',
            literal: '\'',
        }
    }

    #[test]
    fn combining_pairs_gain_two_character_mappings() {
        let mut state = seeded_state();
        let reported = simulated_scan(&state, '\'');
        let mut token = CalibrationToken::default();
        analyse(
            &reported,
            pending(),
            &BuiltinElements::new(),
            &mut token,
            &mut state,
        );
        assert!(!token.has_errors());
        assert_eq!(state.data.dead_keys_map.get("\u{0}á"), Some(&"'a".to_string()));
        assert_eq!(state.data.dead_keys_map.get("\u{0}é"), Some(&"'e".to_string()));
    }

    #[test]
    fn substitute_literal_is_corrected_by_frequency() {
        // The OS types the acute accent, not the apostrophe, after
        // dead-key-plus-space; the apostrophe was only the baseline's
        // nominal guess.
        let mut state = seeded_state();
        let reported = simulated_scan(&state, '\u{b4}');
        let mut token = CalibrationToken::default();
        analyse(
            &reported,
            pending(),
            &BuiltinElements::new(),
            &mut token,
            &mut state,
        );
        assert!(token.diagnostics.contains(EventCode::DeadKeyLiteralIdentified));
        assert_eq!(
            state.data.dead_key_character_map.get("\u{0}'"),
            Some(&'\u{b4}')
        );
        assert_eq!(
            state.data.dead_keys_map.get("\u{0}\u{b4}"),
            Some(&"'".to_string())
        );
    }

    #[test]
    fn colliding_invariant_pairs_are_fatal() {
        let mut state = seeded_state();
        // Both 'a' and 'e' combine into the same glyph.
        let mut reported = String::new();
        for c in INVARIANTS.chars().chain(NON_INVARIANTS.chars()) {
            reported.push(NULL_CHAR);
            match c {
                'a' | 'e' => reported.push('á'),
                _ => {
                    reported.push('\'');
                    reported.push(c);
                }
            }
        }
        let mut token = CalibrationToken::default();
        analyse(
            &reported,
            pending(),
            &BuiltinElements::new(),
            &mut token,
            &mut state,
        );
        assert!(token.has_errors());
        assert!(token.diagnostics.contains(EventCode::DeadKeyMultiMapping));
    }

    #[test]
    fn lost_invariant_pairs_are_fatal() {
        let mut state = seeded_state();
        let mut reported = String::new();
        for c in INVARIANTS.chars().chain(NON_INVARIANTS.chars()) {
            reported.push(NULL_CHAR);
            if c == 'k' {
                continue; // the pair produced nothing at all
            }
            reported.push('\'');
            reported.push(c);
        }
        let mut token = CalibrationToken::default();
        analyse(
            &reported,
            pending(),
            &BuiltinElements::new(),
            &mut token,
            &mut state,
        );
        assert!(token.has_errors());
        assert!(token
            .diagnostics
            .contains(EventCode::UndetectedInvariantCharacters));
    }

    #[test]
    fn nul_owning_control_with_identifier_start_dead_key_is_fatal() {
        let mut state = seeded_state();
        state.data.character_map.insert(NULL_CHAR, '\u{1d}');
        state
            .data
            .dead_keys_map
            .insert(format!("{NULL_CHAR}N"), "n".to_string());
        let reported = simulated_scan(&state, '\'');
        let mut token = CalibrationToken::default();
        analyse(
            &reported,
            pending(),
            &BuiltinElements::new(),
            &mut token,
            &mut state,
        );
        assert!(token.has_errors());
        assert!(token.diagnostics.contains(EventCode::DeadKeyMultiMapping));
    }
}

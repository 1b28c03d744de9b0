// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Extended Translation Tables
//!
//! The product of a successful calibration: every table the runtime
//! translator needs to turn a reported scan back into barcode bytes.
//!
//! All maps are small (well under 256 entries) and ordered, so serialized
//! output is deterministic. Serialized field names are ABI; see the token
//! documentation for the envelope shape.
//

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::chars::is_invariant;

/// Outcome of inserting a direct character mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingOutcome {
    /// No entry existed for the reported character.
    Inserted,
    /// The identical mapping was already present.
    Unchanged,
    /// An entry existed with a non-invariant target; it was replaced by the
    /// new invariant target.
    ReplacedNonInvariant,
    /// The new target is non-invariant and an entry already claims the key;
    /// the existing entry wins.
    KeptExisting,
    /// Both the existing and the new target are invariant. The caller must
    /// treat this as an ambiguity.
    InvariantCollision,
}

/// Translation tables and captured scanner behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtendedData {
    /// Reported character to expected character, one-to-one.
    pub character_map: BTreeMap<char, char>,
    /// Reported `NUL`-prefixed pair (or literal+space triple) to the
    /// expected sequence, typically one or two characters.
    pub dead_keys_map: BTreeMap<String, String>,
    /// Reported `NUL`-prefixed pair to the literal dead key character, used
    /// to build supplementary calibration payloads.
    pub dead_key_character_map: BTreeMap<String, char>,
    /// Expected character to the reported pair for scanner-side dead keys
    /// whose OS twin is itself dead or unassigned.
    pub scanner_dead_keys_map: BTreeMap<char, String>,
    /// Scanner-side dead keys whose OS twin is unassigned.
    pub scanner_unassigned_keys: BTreeSet<char>,
    /// Reported multi-character sequence produced by a single scanner key.
    pub ligature_map: BTreeMap<String, char>,
    /// How the AIM flag `]` is reported. Empty when AIM identifiers cannot
    /// be recognised.
    pub aim_flag_sequence: String,
    /// Normalised prefix, code, and suffix.
    pub prefix: String,
    pub code: String,
    pub suffix: String,
    /// Raw reported prefix, code, and suffix.
    pub reported_prefix: String,
    pub reported_code: String,
    pub reported_suffix: String,
    /// True when calibration confirmed a full upper/lower case inversion
    /// (CAPS LOCK or an inverting scanner); the translator flips letter
    /// case to compensate.
    pub invert_case: bool,
    /// What the OS reports for LF when it is not LF itself.
    pub line_feed_character: Option<char>,
    /// Every codepoint observed during calibration. Characters outside this
    /// alphabet translate to the unknown sentinel.
    pub reported_characters: BTreeSet<char>,
}

impl ExtendedData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a direct mapping, favouring invariant targets on collision.
    pub fn insert_mapping(&mut self, reported: char, expected: char) -> MappingOutcome {
        match self.character_map.get(&reported).copied() {
            None => {
                self.character_map.insert(reported, expected);
                MappingOutcome::Inserted
            }
            Some(existing) if existing == expected => MappingOutcome::Unchanged,
            Some(existing) => match (is_invariant(existing), is_invariant(expected)) {
                (true, true) => MappingOutcome::InvariantCollision,
                (true, false) => MappingOutcome::KeptExisting,
                (false, true) => {
                    self.character_map.insert(reported, expected);
                    MappingOutcome::ReplacedNonInvariant
                }
                (false, false) => MappingOutcome::KeptExisting,
            },
        }
    }

    /// Insert a dead key mapping, favouring invariant targets on collision.
    pub fn insert_dead_key(&mut self, reported: String, expected: String) -> MappingOutcome {
        match self.dead_keys_map.get(&reported) {
            None => {
                self.dead_keys_map.insert(reported, expected);
                MappingOutcome::Inserted
            }
            Some(existing) if *existing == expected => MappingOutcome::Unchanged,
            Some(existing) => {
                let existing_invariant = existing.chars().all(is_invariant);
                let expected_invariant = expected.chars().all(is_invariant);
                match (existing_invariant, expected_invariant) {
                    (true, true) => MappingOutcome::InvariantCollision,
                    (true, false) => MappingOutcome::KeptExisting,
                    (false, true) => {
                        self.dead_keys_map.insert(reported, expected);
                        MappingOutcome::ReplacedNonInvariant
                    }
                    (false, false) => MappingOutcome::KeptExisting,
                }
            }
        }
    }

    /// Drop identity entries; a reported character that already equals its
    /// expected character needs no mapping.
    pub fn strip_identity_mappings(&mut self) {
        self.character_map.retain(|k, v| k != v);
    }

    /// True when no table carries an entry and nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.character_map.is_empty()
            && self.dead_keys_map.is_empty()
            && self.dead_key_character_map.is_empty()
            && self.scanner_dead_keys_map.is_empty()
            && self.scanner_unassigned_keys.is_empty()
            && self.ligature_map.is_empty()
            && self.aim_flag_sequence.is_empty()
            && self.reported_prefix.is_empty()
            && self.reported_suffix.is_empty()
    }

    /// Serialize to the ABI JSON shape.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from the ABI JSON shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn insert_is_first_come_until_invariants_arrive() {
        let mut data = ExtendedData::new();
        assert_eq!(data.insert_mapping('é', '['), MappingOutcome::Inserted);
        // Invariant target evicts the non-invariant entry.
        assert_eq!(
            data.insert_mapping('é', '2'),
            MappingOutcome::ReplacedNonInvariant
        );
        // Later non-invariant target loses.
        assert_eq!(data.insert_mapping('é', '{'), MappingOutcome::KeptExisting);
        assert_eq!(data.character_map[&'é'], '2');
    }

    #[test]
    fn invariant_collision_is_reported() {
        let mut data = ExtendedData::new();
        data.insert_mapping('q', 'a');
        assert_eq!(
            data.insert_mapping('q', 'b'),
            MappingOutcome::InvariantCollision
        );
    }

    #[test]
    fn identity_mappings_strip() {
        let mut data = ExtendedData::new();
        data.insert_mapping('a', 'a');
        data.insert_mapping('q', 'a');
        data.strip_identity_mappings();
        assert_eq!(data.character_map.len(), 1);
        assert_eq!(data.character_map[&'q'], 'a');
    }

    #[test]
    fn json_round_trip_preserves_nul_keys() {
        let mut data = ExtendedData::new();
        data.dead_keys_map.insert("\u{0}'".into(), "'".into());
        data.aim_flag_sequence = "]".into();
        data.reported_characters.insert('a');
        let json = data.to_json().unwrap();
        let back = ExtendedData::from_json(&json).unwrap();
        assert_eq!(back, data);
        assert!(json.contains("deadKeysMap"));
        assert!(json.contains("aimFlagSequence"));
    }
}

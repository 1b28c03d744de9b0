// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Analysis Phases
//!
//! The analysers run as an explicit ordered pipeline over the token and the
//! session state: baseline classification, control character assessment,
//! case inference, then one supplementary pass per discovered OS dead key.
//! Each phase mutates the token's diagnostics and the accumulating
//! [`ExtendedData`] tables; nothing is thrown.
//

pub mod baseline;
pub mod case_inference;
pub mod controls;
pub mod dead_keys;

use std::collections::BTreeSet;

use crate::data::ExtendedData;
use crate::script::KeyboardScript;
use crate::segment::EndOfLine;

/// A dead key discovered in the baseline, waiting for its supplementary
/// scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDeadKey {
    /// The character the OS reports after the NUL marker.
    pub key: char,
    /// Current best guess at the literal dead key character.
    pub literal: char,
}

/// Mutable state accumulated across the calibration session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Translation tables under construction.
    pub data: ExtendedData,
    /// Dead keys awaiting supplementary scans, in discovery order.
    pub pending_dead_keys: Vec<PendingDeadKey>,
    /// Expected characters the baseline showed to be unassigned on the OS
    /// layout; skipped when building supplementary payloads.
    pub unassigned_expected: BTreeSet<char>,
    /// FS could not be disambiguated on the shared NUL slot.
    pub unreadable_fs: bool,
    /// US could not be disambiguated on the shared NUL slot.
    pub unreadable_us: bool,
    /// The scanner and OS layouts correspond.
    pub keyboard_match: bool,
    /// End-of-line behaviour captured from the baseline.
    pub end_of_line: EndOfLine,
    /// Dominant script of the reported layout.
    pub script: KeyboardScript,
    /// Character count of the baseline payload, for throughput estimates.
    pub payload_chars: usize,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: KeyboardScript::Latin,
            ..Self::default()
        }
    }

    /// Queue a supplementary calibration for a discovered dead key unless
    /// the same reported pair already belongs to a scanner-side dead key.
    pub fn queue_dead_key(&mut self, key: char, literal: char) {
        let scanner_side = self
            .data
            .scanner_dead_keys_map
            .values()
            .any(|pair| pair.chars().nth(1) == Some(key));
        if scanner_side {
            return;
        }
        if self.pending_dead_keys.iter().all(|p| p.key != key) {
            self.pending_dead_keys.push(PendingDeadKey { key, literal });
        }
    }
}
